use crate::command::{CmdType, Command};
use crate::error::{CliError, Result};
use crate::lexer::TokenCursor;
use crate::options::{GlobalFlag, GlobalOptions};
use crate::resolver::ContentResolver;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::trace;

/// Lookup prefix under which bare command words are searched as scripts.
pub const AUTO_SCRIPT_PREFIX: &str = "auto/";

/// Name used to look up the auto-script behind a bare command word.
pub fn auto_script_name(word: &str) -> String {
    format!("{}{}", AUTO_SCRIPT_PREFIX, word)
}

/// Everything one parse produces: the ordered commands and the global options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub commands: Vec<Command>,
    pub options: GlobalOptions,
}

/// Walks the token cursor once, collecting commands and global options.
///
/// A builder is created per parse and consumed by [`CommandBuilder::build`], so
/// no state survives from one argument vector to the next.
struct CommandBuilder<'a> {
    cursor: TokenCursor,
    scripts: &'a dyn ContentResolver,
    commands: Vec<Command>,
    options: GlobalOptions,
}

impl<'a> CommandBuilder<'a> {
    /// Creates a builder over `cursor`.
    ///
    /// # Arguments
    /// * `cursor` - The tokens to parse, positioned at the first one.
    /// * `scripts` - Resolver asked whether a bare word names an auto-script.
    fn new(cursor: TokenCursor, scripts: &'a dyn ContentResolver) -> Self {
        Self {
            cursor,
            scripts,
            commands: Vec::new(),
            options: GlobalOptions::default(),
        }
    }

    /// Runs the top-level loop until the cursor is exhausted.
    ///
    /// Each token is tried as a global flag, then as a verb keyword, then as a
    /// bare auto-script word.
    ///
    /// # Returns
    /// The complete [`ParsedArgs`], or the first [`CliError`] met on the way.
    fn build(mut self) -> Result<ParsedArgs> {
        while let Some(word) = self.cursor.advance() {
            if let Some(flag) = GlobalFlag::from_token(&word) {
                self.parse_flag(flag, &word)?;
                continue;
            }

            let command = match CmdType::from_verb(&word) {
                Some(cmd_type) => self.parse_verb(cmd_type)?,
                None => self.parse_bare(word)?,
            };
            trace!(command = %command, "parsed command");
            self.commands.push(command);
        }

        Ok(ParsedArgs {
            commands: self.commands,
            options: self.options,
        })
    }

    /// Apply one verb's shape rule to the tokens following it.
    ///
    /// `start` and `run` take a run of `key=value` operands joined as
    /// `k=v;` pairs; `stop`, `await` and `waitmillis` take exactly one token;
    /// `script` takes a name followed by a run of parameters.
    ///
    /// # Arguments
    /// * `cmd_type` - The type named by the verb keyword just consumed.
    ///
    /// # Returns
    /// The validated [`Command`], or the error describing the shape violation.
    fn parse_verb(&mut self, cmd_type: CmdType) -> Result<Command> {
        let verb = cmd_type.as_str();
        match cmd_type {
            CmdType::Start | CmdType::Run => {
                let spec: String = self
                    .take_assignments(verb)?
                    .iter()
                    .map(|pair| format!("{};", pair))
                    .collect();
                Ok(Command::new(cmd_type, spec))
            }
            CmdType::Stop | CmdType::Await => {
                let name = self.expect_operand(verb)?;
                if name.contains('=') {
                    return Err(CliError::invalid(verb, &name, "expected an activity name"));
                }
                Ok(Command::new(cmd_type, name))
            }
            CmdType::WaitMillis => {
                let millis = self.expect_operand(verb)?;
                millis
                    .parse::<u64>()
                    .map_err(|_| CliError::number(verb, &millis))?;
                Ok(Command::new(cmd_type, millis))
            }
            CmdType::Script => {
                let name = self.expect_operand(verb)?;
                if name.contains('=') {
                    return Err(CliError::invalid(
                        verb,
                        &name,
                        "expected a script name before any parameters",
                    ));
                }
                let args = self.take_params(verb)?;
                Ok(Command::with_args(cmd_type, name, args))
            }
            CmdType::Fragment => unreachable!("fragments have no verb keyword"),
        }
    }

    /// A word that is neither verb nor flag must name an auto-script.
    fn parse_bare(&mut self, word: String) -> Result<Command> {
        if self.scripts.resolve(&auto_script_name(&word)).is_none() {
            return Err(CliError::MalformedCommand(word));
        }
        let args = self.take_params(&word)?;
        Ok(Command::with_args(CmdType::Fragment, word, args))
    }

    /// Record one global flag, consuming its operand when it has one.
    ///
    /// `--help` takes the following token as its topic only when that token
    /// does not look like another option.
    fn parse_flag(&mut self, flag: GlobalFlag, token: &str) -> Result<()> {
        let operand = if flag.requires_operand() {
            Some(self.expect_operand(token)?)
        } else {
            None
        };

        let opts = &mut self.options;
        match (flag, operand) {
            (GlobalFlag::VersionShort, _) => opts.version_short = true,
            (GlobalFlag::VersionCoords, _) => opts.version_coords = true,
            (GlobalFlag::Help, _) => {
                opts.basic_help = true;
                let has_topic = self.cursor.peek().is_some_and(|t| !t.starts_with('-'));
                if has_topic {
                    opts.help_topic = self.cursor.advance();
                }
            }
            (GlobalFlag::ListActivityTypes, _) => opts.list_activity_types = true,
            (GlobalFlag::ListWorkloads, _) => opts.list_workloads = true,
            (GlobalFlag::Verbose(n), _) => opts.verbosity = opts.verbosity.saturating_add(n),
            (GlobalFlag::Interactive, _) => opts.interactive = true,
            (GlobalFlag::ReportGraphiteTo, Some(target)) => opts.report_graphite_to = Some(target),
            (GlobalFlag::ReportInterval, Some(seconds)) => {
                let interval = seconds
                    .parse::<u64>()
                    .map_err(|_| CliError::number(token, &seconds))?;
                opts.report_interval = Some(interval);
            }
            (GlobalFlag::ReportCsvTo, Some(dir)) => opts.report_csv_to = Some(dir),
            (GlobalFlag::Progress, Some(spec)) => opts.progress = Some(spec),
            (GlobalFlag::SessionName, Some(name)) => opts.session_name = Some(name),
            (GlobalFlag::Include, Some(path)) => opts.include_paths.push(PathBuf::from(path)),
            (_, None) => return Err(CliError::missing(token)),
        }
        Ok(())
    }

    /// Consume the next token whatever its shape, failing at end of input.
    fn expect_operand(&mut self, verb: &str) -> Result<String> {
        self.cursor.advance().ok_or_else(|| CliError::missing(verb))
    }

    /// Consume the run of `key=value` tokens that follows a verb.
    ///
    /// The run ends at a verb keyword, a global flag, a token without `=`,
    /// or the end of input. A pair with nothing before its `=` is rejected.
    fn take_assignments(&mut self, verb: &str) -> Result<Vec<String>> {
        let mut pairs = Vec::new();
        while let Some(token) = self.cursor.peek() {
            if is_keyword(token) || !token.contains('=') {
                break;
            }
            if token.starts_with('=') {
                return Err(CliError::invalid(verb, token, "parameter name is empty"));
            }
            if let Some(pair) = self.cursor.advance() {
                pairs.push(pair);
            }
        }
        Ok(pairs)
    }

    /// Consume a run of `key=value` tokens into a parameter map.
    ///
    /// The value is everything after the first `=`, so values may contain
    /// `=` themselves. A repeated key keeps its last value.
    fn take_params(&mut self, verb: &str) -> Result<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        for pair in self.take_assignments(verb)? {
            if let Some((key, value)) = pair.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            }
        }
        Ok(params)
    }
}

/// Whether `token` starts a new verb or flag and so ends an operand run.
fn is_keyword(token: &str) -> bool {
    CmdType::from_verb(token).is_some() || GlobalFlag::from_token(token).is_some()
}

/// Turn an argument vector into a command sequence and global options.
///
/// `scripts` is only consulted to decide whether a bare word names an
/// auto-script. The first grammar violation aborts the parse; no partial
/// results are returned.
///
/// # Arguments
/// * `args` - The argument vector, without the program name.
/// * `scripts` - Resolver used for the bare-word fallback.
///
/// # Returns
/// `Result<ParsedArgs, CliError>`: the commands in encounter order with the
/// global options, or the first grammar violation.
pub fn parse_args<I, S>(args: I, scripts: &dyn ContentResolver) -> Result<ParsedArgs>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    CommandBuilder::new(TokenCursor::new(args), scripts).build()
}

/// Collect the options that have to be known before the real parse runs.
///
/// Only `--include` paths and `-v` levels are gathered: the former decide
/// where bare words are looked up, the latter how much the parse itself logs.
/// Tokens are skipped with the same operand positions the parser uses, so an
/// `--include` that is really the operand of `stop` or of another flag is not
/// taken as a search path. Nothing is validated here.
pub fn prescan_options(args: &[String]) -> GlobalOptions {
    let mut opts = GlobalOptions::default();
    let mut cursor = TokenCursor::new(args.iter().cloned());

    while let Some(word) = cursor.advance() {
        if let Some(flag) = GlobalFlag::from_token(&word) {
            match flag {
                GlobalFlag::Verbose(n) => opts.verbosity = opts.verbosity.saturating_add(n),
                GlobalFlag::Include => {
                    if let Some(path) = cursor.advance() {
                        opts.include_paths.push(PathBuf::from(path));
                    }
                }
                GlobalFlag::Help => {
                    if cursor.peek().is_some_and(|t| !t.starts_with('-')) {
                        cursor.advance();
                    }
                }
                other if other.requires_operand() => {
                    cursor.advance();
                }
                _ => {}
            }
            continue;
        }

        let takes_one_operand = matches!(
            CmdType::from_verb(&word),
            Some(CmdType::Stop | CmdType::Await | CmdType::WaitMillis | CmdType::Script)
        );
        if takes_one_operand {
            cursor.advance();
        }
    }
    opts
}
