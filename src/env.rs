use crate::error::Result;
use crate::resolver::PathResolver;
use crate::script::PlaceholderPattern;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Variable holding extra script search paths, separated like `PATH`.
pub const SCRIPT_PATH_VAR: &str = "SCENARIO_PATH";

/// Variable holding a regex that replaces the default placeholder syntax.
pub const PLACEHOLDER_VAR: &str = "SCENARIO_PLACEHOLDER";

/// User-level view of the process environment the interpreter is configured from.
///
/// The environment contains:
/// - `vars`: a snapshot of environment variables.
/// - `current_dir`: the working directory, always searched last for scripts.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Get the value of an environment variable from the snapshot.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override an environment variable in the snapshot.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Directories to search for scripts, in priority order.
    ///
    /// `includes` (from `--include`) come first, then every entry of
    /// `SCENARIO_PATH`, then the current directory.
    pub fn script_search_paths(&self, includes: &[PathBuf]) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = includes
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    self.current_dir.join(p)
                }
            })
            .collect();
        if let Some(value) = self.get_var(SCRIPT_PATH_VAR) {
            paths.extend(stdenv::split_paths(&value).filter(|p| !p.as_os_str().is_empty()));
        }
        paths.push(self.current_dir.clone());
        paths
    }

    pub fn script_resolver(&self, includes: &[PathBuf]) -> PathResolver {
        PathResolver::new(self.script_search_paths(includes))
    }

    /// The placeholder syntax configured through `SCENARIO_PLACEHOLDER`, or the default.
    pub fn placeholder_pattern(&self) -> Result<PlaceholderPattern> {
        match self.get_var(PLACEHOLDER_VAR) {
            Some(pattern) if !pattern.is_empty() => PlaceholderPattern::new(&pattern),
            _ => Ok(PlaceholderPattern::default()),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use crate::script::DEFAULT_PLACEHOLDER_PATTERN;

    fn empty_env(dir: &str) -> Environment {
        Environment {
            vars: HashMap::new(),
            current_dir: PathBuf::from(dir),
        }
    }

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = empty_env("/work");
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);
        env.set_var("KEY", "VALUE");
        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    #[cfg(unix)]
    fn test_search_path_order() {
        let mut env = empty_env("/work");
        env.set_var(SCRIPT_PATH_VAR, "/opt/a::/opt/b");
        let paths = env.script_search_paths(&[PathBuf::from("inc"), PathBuf::from("/abs")]);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/work/inc"),
                PathBuf::from("/abs"),
                PathBuf::from("/opt/a"),
                PathBuf::from("/opt/b"),
                PathBuf::from("/work"),
            ]
        );
        assert_eq!(env.script_resolver(&[]).search_paths().len(), 3);
    }

    #[test]
    fn test_placeholder_pattern_override() {
        let mut env = empty_env(".");
        assert_eq!(
            env.placeholder_pattern().unwrap().as_str(),
            DEFAULT_PLACEHOLDER_PATTERN
        );

        env.set_var(PLACEHOLDER_VAR, r"%(?P<name>\w+)%");
        assert_eq!(env.placeholder_pattern().unwrap().as_str(), r"%(?P<name>\w+)%");

        env.set_var(PLACEHOLDER_VAR, r"%(\w+)%");
        assert!(matches!(
            env.placeholder_pattern(),
            Err(CliError::InvalidPattern(_))
        ));
    }
}
