//! Script assembly: loading named scripts, filling in their placeholders, and
//! turning a whole command sequence into one scenario program.

use crate::command::{CmdType, Command};
use crate::error::{CliError, Result};
use crate::options::GlobalOptions;
use crate::parser::auto_script_name;
use crate::resolver::ContentResolver;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::debug;

/// Prefix of the text substituted for a placeholder nobody supplied a value for.
pub const UNSET_PREFIX: &str = "UNSET:";

/// Placeholder syntax understood out of the box: `<<name>>`, `<<name:default>>`,
/// `TEMPLATE(name)` and `TEMPLATE(name,default)`.
pub const DEFAULT_PLACEHOLDER_PATTERN: &str = concat!(
    r"<<(?P<name>[A-Za-z_][\w.-]*)(?::(?P<default>[^>]*))?>>",
    r"|TEMPLATE\((?P<name_t>[A-Za-z_][\w.-]*)(?:,(?P<default_t>[^)]*))?\)",
);

/// Regex describing where placeholders sit in script text.
///
/// Capture groups whose names start with `name` carry the parameter name and
/// groups whose names start with `default` carry an optional fallback value.
/// Several alternatives can each bring their own pair of groups.
#[derive(Debug, Clone)]
pub struct PlaceholderPattern {
    regex: Regex,
    name_groups: Vec<String>,
    default_groups: Vec<String>,
}

impl PlaceholderPattern {
    /// Compiles `pattern` and records which of its groups carry names and defaults.
    ///
    /// # Arguments
    /// * `pattern` - A regex with at least one group whose name starts with `name`.
    ///
    /// # Returns
    /// The compiled pattern, or [`CliError::InvalidPattern`] when the regex does
    /// not compile or has no name group.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| CliError::InvalidPattern(e.to_string()))?;
        let groups_starting_with = |prefix: &str| -> Vec<String> {
            regex
                .capture_names()
                .flatten()
                .filter(|n| n.starts_with(prefix))
                .map(str::to_string)
                .collect()
        };
        let name_groups = groups_starting_with("name");
        let default_groups = groups_starting_with("default");
        if name_groups.is_empty() {
            return Err(CliError::InvalidPattern(format!(
                "'{}' has no capture group called 'name'",
                pattern
            )));
        }
        Ok(Self {
            regex,
            name_groups,
            default_groups,
        })
    }

    /// Source text of the underlying regex.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Replace every placeholder in `text`.
    ///
    /// A supplied parameter wins over the placeholder's own default; with
    /// neither, the placeholder becomes `UNSET:<name>`.
    pub fn interpolate(&self, text: &str, params: &BTreeMap<String, String>) -> String {
        self.regex
            .replace_all(text, |caps: &Captures| {
                let Some(name) = first_group(caps, &self.name_groups) else {
                    return caps[0].to_string();
                };
                if let Some(value) = params.get(name) {
                    return value.clone();
                }
                match first_group(caps, &self.default_groups) {
                    Some(default) => default.to_string(),
                    None => {
                        debug!(placeholder = name, "no value for placeholder");
                        format!("{}{}", UNSET_PREFIX, name)
                    }
                }
            })
            .into_owned()
    }
}

impl Default for PlaceholderPattern {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER_PATTERN).expect("default placeholder pattern compiles")
    }
}

/// Text of the first group in `groups` that took part in the match.
fn first_group<'t>(caps: &Captures<'t>, groups: &[String]) -> Option<&'t str> {
    groups
        .iter()
        .find_map(|g| caps.name(g))
        .map(|m| m.as_str())
}

/// A resolved script together with the parameters used to resolve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptData {
    script_text: String,
    script_params: BTreeMap<String, String>,
}

impl ScriptData {
    /// # Arguments
    /// * `script_text` - Script text with placeholders already filled in.
    /// * `script_params` - The parameters that were used to fill them.
    pub fn new(script_text: String, script_params: BTreeMap<String, String>) -> Self {
        Self {
            script_text,
            script_params,
        }
    }

    /// The resolved text alone.
    pub fn script_text_ignoring_params(&self) -> &str {
        &self.script_text
    }

    pub fn script_params(&self) -> &BTreeMap<String, String> {
        &self.script_params
    }

    /// The script text preceded by a comment block listing its parameters.
    ///
    /// Line breaks inside keys or values are escaped so every parameter stays
    /// on its own comment line.
    pub fn script_params_and_text(&self) -> String {
        let mut out = String::from("// params:\n");
        for (k, v) in &self.script_params {
            out.push_str(&format!("//   {}={}\n", one_line(k), one_line(v)));
        }
        out.push_str("// script:\n");
        out.push_str(&self.script_text);
        out
    }
}

/// Builds script text from commands, reading script bodies through a resolver.
pub struct ScriptAssembler<'a> {
    resolver: &'a dyn ContentResolver,
    pattern: PlaceholderPattern,
}

impl<'a> ScriptAssembler<'a> {
    pub fn new(resolver: &'a dyn ContentResolver, pattern: PlaceholderPattern) -> Self {
        Self { resolver, pattern }
    }

    /// Load and interpolate the script a `script` or bare command refers to.
    pub fn assemble(&self, command: &Command) -> Result<ScriptData> {
        let name = match command.cmd_type {
            CmdType::Script => command.spec.clone(),
            CmdType::Fragment => auto_script_name(&command.spec),
            other => return Err(CliError::NotAScript(other)),
        };
        let raw = self
            .resolver
            .resolve(&name)
            .ok_or_else(|| CliError::ScriptNotFound(name.clone()))?;
        debug!(script = %name, params = command.args.len(), "assembling script");
        let text = self.pattern.interpolate(&raw, &command.args);
        Ok(ScriptData::new(text, command.args.clone()))
    }

    /// Render a whole command sequence as one scenario program.
    ///
    /// Each command becomes one statement preceded by a comment naming it.
    /// When the sequence is a single script, that script's parameters become
    /// the parameters of the result.
    pub fn assemble_scenario(
        &self,
        commands: &[Command],
        options: &GlobalOptions,
    ) -> Result<ScriptData> {
        let mut out = String::new();
        let mut params = BTreeMap::new();

        if let Some(session) = &options.session_name {
            out.push_str(&format!("// session: {}\n", one_line(session)));
        }

        for command in commands {
            out.push_str(&format!("// from CLI as {}\n", one_line(&command.to_string())));
            match command.cmd_type {
                CmdType::Start | CmdType::Run => out.push_str(&format!(
                    "scenario.{}('{}');\n",
                    command.cmd_type,
                    escape(&command.spec, '\'')
                )),
                CmdType::Stop => out.push_str(&format!(
                    "scenario.stop(\"{}\");\n",
                    escape(&command.spec, '"')
                )),
                CmdType::Await => out.push_str(&format!(
                    "scenario.awaitActivity(\"{}\");\n",
                    escape(&command.spec, '"')
                )),
                CmdType::WaitMillis => {
                    out.push_str(&format!("scenario.waitMillis({});\n", command.spec))
                }
                CmdType::Script | CmdType::Fragment => {
                    let script = self.assemble(command)?;
                    if commands.len() == 1 {
                        out.push_str(script.script_text_ignoring_params());
                        params = script.script_params().clone();
                    } else {
                        out.push_str(&script.script_params_and_text());
                    }
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
            }
        }

        Ok(ScriptData::new(out, params))
    }
}

/// Escape `s` for use inside a string literal delimited by `quote`.
///
/// Backslashes and the delimiter get a backslash; line terminators become
/// escape sequences so a value can never end the literal's line.
fn escape(s: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            c if c == quote => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => push_line_safe(&mut escaped, c),
        }
    }
    escaped
}

/// `s` with line terminators written as escape sequences, for comment lines.
fn one_line(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        push_line_safe(&mut out, c);
    }
    out
}

fn push_line_safe(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\u{2028}' => out.push_str("\\u2028"),
        '\u{2029}' => out.push_str("\\u2029"),
        c => out.push(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_args;
    use crate::resolver::MemoryResolver;

    const INTERPOLATE: &str = "var foo=<<parameter1>>;\nvar bar=<<parameter2>>;\n";

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_script_interpolation() {
        let scripts = MemoryResolver::new().with("script_to_interpolate", INTERPOLATE);
        let parsed = parse_args(
            ["script", "script_to_interpolate", "parameter1=replaced"],
            &scripts,
        )
        .unwrap();
        let assembler = ScriptAssembler::new(&scripts, PlaceholderPattern::default());
        let data = assembler.assemble(&parsed.commands[0]).unwrap();

        assert!(data.script_text_ignoring_params().contains("var foo=replaced;"));
        assert!(data.script_text_ignoring_params().contains("var bar=UNSET:parameter2"));
        assert_eq!(data.script_params(), &params(&[("parameter1", "replaced")]));
    }

    #[test]
    fn test_assembly_is_repeatable() {
        let scripts = MemoryResolver::new().with("s", INTERPOLATE);
        let assembler = ScriptAssembler::new(&scripts, PlaceholderPattern::default());
        let cmd = Command::with_args(CmdType::Script, "s", params(&[("parameter2", "x")]));
        assert_eq!(
            assembler.assemble(&cmd).unwrap(),
            assembler.assemble(&cmd).unwrap()
        );
    }

    #[test]
    fn test_auto_script_command() {
        let scripts = MemoryResolver::new().with("auto/acommand", "acommand script text");
        let parsed = parse_args(["acommand"], &scripts).unwrap();
        let assembler = ScriptAssembler::new(&scripts, PlaceholderPattern::default());
        let data = assembler
            .assemble_scenario(&parsed.commands, &parsed.options)
            .unwrap();
        assert!(data.script_text_ignoring_params().contains("acommand script text"));
    }

    #[test]
    fn test_missing_script() {
        let scripts = MemoryResolver::new();
        let assembler = ScriptAssembler::new(&scripts, PlaceholderPattern::default());
        let cmd = Command::new(CmdType::Script, "nothere");
        assert_eq!(
            assembler.assemble(&cmd).unwrap_err(),
            CliError::ScriptNotFound("nothere".to_string())
        );
    }

    #[test]
    fn test_only_script_commands_assemble() {
        let scripts = MemoryResolver::new();
        let assembler = ScriptAssembler::new(&scripts, PlaceholderPattern::default());
        assert_eq!(
            assembler
                .assemble(&Command::new(CmdType::Stop, "x"))
                .unwrap_err(),
            CliError::NotAScript(CmdType::Stop)
        );
    }

    #[test]
    fn test_defaults_and_template_form() {
        let pattern = PlaceholderPattern::default();
        let text = "a=<<a:1>> b=<<b:>> c=TEMPLATE(c,3) d=TEMPLATE(d) e=<<e>>";
        let out = pattern.interpolate(text, &params(&[("a", "x"), ("e", "y")]));
        assert_eq!(out, "a=x b= c=3 d=UNSET:d e=y");
    }

    #[test]
    fn test_values_are_inserted_verbatim() {
        let pattern = PlaceholderPattern::default();
        let out = pattern.interpolate("v=<<v>>", &params(&[("v", "$1 <<w>>")]));
        assert_eq!(out, "v=$1 <<w>>");
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = PlaceholderPattern::new(r"\$\{(?P<name>\w+)\}").unwrap();
        let out = pattern.interpolate("x=${x} y=${y} z=<<z>>", &params(&[("x", "1")]));
        assert_eq!(out, "x=1 y=UNSET:y z=<<z>>");

        assert!(matches!(
            PlaceholderPattern::new(r"\$\{(\w+)\}"),
            Err(CliError::InvalidPattern(_))
        ));
        assert!(matches!(
            PlaceholderPattern::new(r"(?P<name>"),
            Err(CliError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_params_and_text() {
        let data = ScriptData::new("body\n".to_string(), params(&[("b", "2"), ("a", "1")]));
        assert_eq!(
            data.script_params_and_text(),
            "// params:\n//   a=1\n//   b=2\n// script:\nbody\n"
        );
    }

    #[test]
    fn test_scenario_statements() {
        let scripts = MemoryResolver::new();
        let parsed = parse_args(
            [
                "--session-name",
                "demo",
                "start",
                "driver=stdout",
                "alias=it's",
                "waitmillis",
                "500",
                "await",
                "a",
                "run",
                "stop",
                "a",
            ],
            &scripts,
        )
        .unwrap();
        let assembler = ScriptAssembler::new(&scripts, PlaceholderPattern::default());
        let data = assembler
            .assemble_scenario(&parsed.commands, &parsed.options)
            .unwrap();
        assert_eq!(
            data.script_text_ignoring_params(),
            concat!(
                "// session: demo\n",
                "// from CLI as start driver=stdout;alias=it's;\n",
                "scenario.start('driver=stdout;alias=it\\'s;');\n",
                "// from CLI as waitmillis 500\n",
                "scenario.waitMillis(500);\n",
                "// from CLI as await a\n",
                "scenario.awaitActivity(\"a\");\n",
                "// from CLI as run\n",
                "scenario.run('');\n",
                "// from CLI as stop a\n",
                "scenario.stop(\"a\");\n",
            )
        );
        assert!(data.script_params().is_empty());
    }

    #[test]
    fn test_scenario_with_several_scripts_keeps_params_inline() {
        let scripts = MemoryResolver::new()
            .with("one", "one(<<p>>);")
            .with("two", "two(<<p>>);\n");
        let parsed = parse_args(["script", "one", "p=1", "script", "two"], &scripts).unwrap();
        let assembler = ScriptAssembler::new(&scripts, PlaceholderPattern::default());
        let data = assembler
            .assemble_scenario(&parsed.commands, &parsed.options)
            .unwrap();
        assert_eq!(
            data.script_text_ignoring_params(),
            concat!(
                "// from CLI as script one p=1\n",
                "// params:\n",
                "//   p=1\n",
                "// script:\n",
                "one(1);\n",
                "// from CLI as script two\n",
                "// params:\n",
                "// script:\n",
                "two(UNSET:p);\n",
            )
        );
        assert!(data.script_params().is_empty());
    }

    #[test]
    fn test_line_breaks_cannot_start_new_statements() {
        let scripts = MemoryResolver::new().with("s", "s();\n");
        let parsed = parse_args(
            [
                "--session-name",
                "x\nevil();",
                "stop",
                "a\nevil();",
                "start",
                "alias=b\r\nevil();",
                "await",
                "c\u{2028}evil();",
                "script",
                "s",
                "p=1\nevil();",
            ],
            &scripts,
        )
        .unwrap();
        let assembler = ScriptAssembler::new(&scripts, PlaceholderPattern::default());
        let data = assembler
            .assemble_scenario(&parsed.commands, &parsed.options)
            .unwrap();
        let text = data.script_text_ignoring_params();

        assert!(text.lines().all(|line| !line.starts_with("evil();")));
        assert!(!text.contains('\u{2028}'));
        assert!(text.contains("// session: x\\nevil();\n"));
        assert!(text.contains("// from CLI as stop a\\nevil();\n"));
        assert!(text.contains("scenario.stop(\"a\\nevil();\");\n"));
        assert!(text.contains("scenario.start('alias=b\\r\\nevil();;');\n"));
        assert!(text.contains("scenario.awaitActivity(\"c\\u2028evil();\");\n"));
        assert!(text.contains("//   p=1\\nevil();\n"));
    }

    #[test]
    fn test_escape_keeps_other_quote() {
        assert_eq!(escape(r#"a'b"c\d"#, '\''), r#"a\'b"c\\d"#);
        assert_eq!(escape(r#"a'b"c"#, '"'), r#"a'b\"c"#);
        assert_eq!(one_line("a\r\nb"), "a\\r\\nb");
    }

    #[test]
    fn test_scenario_fails_on_first_missing_script() {
        let scripts = MemoryResolver::new();
        let assembler = ScriptAssembler::new(&scripts, PlaceholderPattern::default());
        let commands = vec![
            Command::new(CmdType::Start, "a=b;"),
            Command::new(CmdType::Script, "gone"),
        ];
        assert_eq!(
            assembler
                .assemble_scenario(&commands, &GlobalOptions::default())
                .unwrap_err(),
            CliError::ScriptNotFound("gone".to_string())
        );
    }
}
