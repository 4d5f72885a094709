use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension appended to script names when looking them up on disk.
pub const SCRIPT_EXTENSION: &str = "js";

/// Source of raw script text, looked up by name.
///
/// The parser asks it whether a bare word names an auto-script, and the
/// assembler asks it for the text of every script it inlines.
pub trait ContentResolver {
    /// Return the raw text stored under `name`, or `None` when nothing matches.
    fn resolve(&self, name: &str) -> Option<String>;

    /// Names of the scripts this resolver can serve, used for listings.
    fn names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Resolver backed by script files under one or more base directories.
///
/// For a name `n` each base path is tried in order with `n`, `n.js`,
/// `scripts/n` and `scripts/n.js`; the first existing file wins. Absolute
/// names are used as-is.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    search_paths: Vec<PathBuf>,
}

impl PathResolver {
    /// Creates a resolver over `search_paths`.
    ///
    /// # Arguments
    /// * `search_paths` - Base directories, tried in order. Earlier entries
    ///   shadow later ones.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Locate the file that holds the script called `name`.
    pub fn find_script_path(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let path = Path::new(name);
        if path.is_absolute() {
            return find_by_path(path).map(Path::to_path_buf);
        }
        for dir in &self.search_paths {
            for candidate in candidates(dir, name) {
                debug!("looking for script at {}", candidate.display());
                if let Some(found) = find_by_path(&candidate) {
                    return Some(found.to_path_buf());
                }
            }
        }
        None
    }
}

/// Paths tried for `name` under one base directory, in lookup order.
fn candidates(dir: &Path, name: &str) -> [PathBuf; 4] {
    let with_ext = format!("{}.{}", name, SCRIPT_EXTENSION);
    [
        dir.join(name),
        dir.join(&with_ext),
        dir.join("scripts").join(name),
        dir.join("scripts").join(&with_ext),
    ]
}

/// Returns `path` only if it names an existing regular file.
fn find_by_path(path: &Path) -> Option<&Path> {
    if path.is_file() { Some(path) } else { None }
}

impl ContentResolver for PathResolver {
    fn resolve(&self, name: &str) -> Option<String> {
        let path = self.find_script_path(name)?;
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("can't read script {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Every `*.js` file directly under a base path or its `scripts/` directory.
    fn names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for dir in &self.search_paths {
            for dir in [dir.clone(), dir.join("scripts")] {
                let Ok(entries) = fs::read_dir(&dir) else {
                    continue;
                };
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !path.is_file()
                        || path.extension().and_then(|e| e.to_str()) != Some(SCRIPT_EXTENSION)
                    {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.insert(stem.to_string());
                    }
                }
            }
        }
        names.into_iter().collect()
    }
}

/// Resolver serving scripts from an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    scripts: HashMap<String, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryResolver::insert`].
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Stores `text` under `name`, replacing any earlier entry.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.scripts.insert(name.into(), text.into());
    }
}

impl ContentResolver for MemoryResolver {
    fn resolve(&self, name: &str) -> Option<String> {
        self.scripts.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scripts.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!(
            "resolver_test_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(p.join("scripts").join("auto")).expect("create temp dir");
        p
    }

    #[test]
    fn test_finds_script_with_and_without_extension() {
        let base = make_unique_temp_dir("ext");
        fs::write(base.join("plain"), "plain text").unwrap();
        fs::write(base.join("scripts").join("withext.js"), "js text").unwrap();
        fs::write(base.join("scripts").join("auto").join("acommand.js"), "acommand script text").unwrap();

        let resolver = PathResolver::new(vec![base.clone()]);
        assert_eq!(resolver.resolve("plain").as_deref(), Some("plain text"));
        assert_eq!(resolver.resolve("withext").as_deref(), Some("js text"));
        assert_eq!(
            resolver.resolve("auto/acommand").as_deref(),
            Some("acommand script text")
        );
        assert_eq!(resolver.resolve("missing"), None);
        assert_eq!(resolver.resolve(""), None);

        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn test_earlier_search_path_wins() {
        let first = make_unique_temp_dir("first");
        let second = make_unique_temp_dir("second");
        fs::write(first.join("dup.js"), "from first").unwrap();
        fs::write(second.join("dup.js"), "from second").unwrap();
        fs::write(second.join("only.js"), "only second").unwrap();

        let resolver = PathResolver::new(vec![first.clone(), second.clone()]);
        assert_eq!(resolver.resolve("dup").as_deref(), Some("from first"));
        assert_eq!(resolver.resolve("only").as_deref(), Some("only second"));

        let _ = fs::remove_dir_all(first);
        let _ = fs::remove_dir_all(second);
    }

    #[test]
    fn test_absolute_name_is_used_directly() {
        let base = make_unique_temp_dir("abs");
        let file = base.join("direct.js");
        fs::write(&file, "direct").unwrap();

        let resolver = PathResolver::new(Vec::new());
        let name = file.to_string_lossy().to_string();
        assert_eq!(resolver.resolve(&name).as_deref(), Some("direct"));

        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn test_names_lists_js_files_once() {
        let base = make_unique_temp_dir("names");
        fs::write(base.join("a.js"), "").unwrap();
        fs::write(base.join("notes.txt"), "").unwrap();
        fs::write(base.join("scripts").join("b.js"), "").unwrap();
        fs::write(base.join("scripts").join("a.js"), "").unwrap();

        let resolver = PathResolver::new(vec![base.clone(), base.join("nonexistent")]);
        assert_eq!(resolver.names(), vec!["a".to_string(), "b".to_string()]);

        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn test_memory_resolver() {
        let resolver = MemoryResolver::new().with("b", "bee").with("a", "ay");
        assert_eq!(resolver.resolve("a").as_deref(), Some("ay"));
        assert_eq!(resolver.resolve("c"), None);
        assert_eq!(resolver.names(), vec!["a".to_string(), "b".to_string()]);
    }
}
