use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::CliError;
use crate::lexer;
use crate::parser::{self, ParsedArgs};
use crate::resolver::{ContentResolver, PathResolver};
use crate::script::ScriptAssembler;
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use tracing::{debug, info};

const USAGE: &str = "\
Usage: scenario [options] [commands]

Commands:
  start <key=value>...    start an activity in the background
  run <key=value>...      run an activity to completion
  stop <activity>         stop a running activity
  await <activity>        wait for an activity to finish
  waitmillis <millis>     pause the scenario
  script <name> [k=v]...  include a script, filling in its parameters
  <name> [k=v]...         include the auto-script called <name>

Options:
  --version                       print the version
  --version-coords                print the package coordinates
  --help [topic]                  show this help, or help about a command
  --list-activity-types           list known activity types (alias --list-drivers)
  --list-workloads                list scripts found on the search path
  --report-graphite-to <target>   send metrics to a graphite endpoint
  --report-interval <seconds>     metrics reporting interval
  --report-csv-to <dir>           write metrics as CSV
  --progress <spec>               progress reporting
  --session-name <name>           name of this scenario session
  --include <path>                add a script search path
  -v, -vv, -vvv                   more logging
  --repl                          read further commands interactively
";

fn help_for(topic: &str) -> Option<&'static str> {
    let text = match topic {
        "start" => "start <key=value>...\n  Starts an activity defined by the given parameters and continues.\n",
        "run" => "run <key=value>...\n  Runs an activity defined by the given parameters until it completes.\n",
        "stop" => "stop <activity>\n  Stops the named activity.\n",
        "await" => "await <activity>\n  Blocks until the named activity completes.\n",
        "waitmillis" => "waitmillis <millis>\n  Pauses the scenario for the given number of milliseconds.\n",
        "script" => concat!(
            "script <name> [key=value]...\n",
            "  Includes the named script. Placeholders like <<key>>, <<key:default>>\n",
            "  or TEMPLATE(key,default) are replaced by the given values; placeholders\n",
            "  without a value or default become UNSET:<key>.\n",
        ),
        _ => return None,
    };
    Some(text)
}

/// Command-line front end: turns argument vectors into printed scenario scripts.
///
/// The interpreter never runs the scenario it builds. It prints the assembled
/// program, or the informational output asked for by global flags.
///
/// Example
/// ```
/// use scenario_cli::Interpreter;
/// let sh = Interpreter::default();
/// let mut out = Vec::new();
/// let code = sh.run(&["stop".to_string(), "a".to_string()], &mut out).unwrap();
/// assert_eq!(code, 0);
/// assert!(String::from_utf8(out).unwrap().contains("scenario.stop(\"a\");"));
/// ```
pub struct Interpreter {
    env: Environment,
    activity_types: Vec<String>,
}

impl Interpreter {
    /// Creates an interpreter reading its configuration from `env`.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            activity_types: Vec::new(),
        }
    }

    /// Register the activity types reported by `--list-activity-types`.
    pub fn with_activity_types(mut self, types: Vec<String>) -> Self {
        self.activity_types = types;
        self
    }

    /// Parse an argument vector and build the resolver its scripts are read from.
    ///
    /// The `--include` paths are gathered by a prescan first, since bare words
    /// are checked against the search path while parsing.
    pub fn parse(&self, args: &[String]) -> Result<(ParsedArgs, PathResolver), CliError> {
        let includes = parser::prescan_options(args).include_paths;
        let resolver = self.env.script_resolver(&includes);
        let parsed = parser::parse_args(args.iter().cloned(), &resolver)?;
        Ok((parsed, resolver))
    }

    /// Parse and execute one argument vector, writing the result to `out`.
    pub fn run(&self, args: &[String], out: &mut dyn Write) -> anyhow::Result<ExitCode> {
        let (parsed, resolver) = self.parse(args)?;
        self.execute(&parsed, &resolver, out)
    }

    /// Produce the output a parsed command line asks for.
    ///
    /// Informational flags are answered first and suppress the scenario. An
    /// empty command sequence prints the usage text.
    pub fn execute(
        &self,
        parsed: &ParsedArgs,
        resolver: &dyn ContentResolver,
        out: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        let opts = &parsed.options;

        if opts.version_short {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
        }
        if opts.version_coords {
            writeln!(out, "{}:{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
        }
        if let Some(topic) = &opts.help_topic {
            match help_for(topic) {
                Some(text) => out.write_all(text.as_bytes())?,
                None => writeln!(out, "no help available for '{}'", topic)?,
            }
        } else if opts.basic_help {
            out.write_all(USAGE.as_bytes())?;
        }
        if opts.list_activity_types {
            for name in &self.activity_types {
                writeln!(out, "{}", name)?;
            }
        }
        if opts.list_workloads {
            for name in resolver.names() {
                writeln!(out, "{}", name)?;
            }
        }
        if opts.suppresses_commands() {
            return Ok(0);
        }

        if parsed.commands.is_empty() {
            if !opts.interactive {
                out.write_all(USAGE.as_bytes())?;
            }
            return Ok(0);
        }

        if let Some(target) = &opts.report_graphite_to {
            info!(endpoint = %target, interval = ?opts.report_interval, "graphite reporting requested");
        }
        if let Some(dir) = &opts.report_csv_to {
            info!(dir = %dir, interval = ?opts.report_interval, "csv reporting requested");
        }
        if let Some(progress) = &opts.progress {
            info!(progress = %progress, "progress reporting requested");
        }

        let pattern = self.env.placeholder_pattern()?;
        let assembler = ScriptAssembler::new(resolver, pattern);
        let scenario = assembler.assemble_scenario(&parsed.commands, opts)?;
        debug!(
            commands = parsed.commands.len(),
            params = scenario.script_params().len(),
            "assembled scenario"
        );
        out.write_all(scenario.script_text_ignoring_params().as_bytes())
            .context("can't write scenario")?;
        out.flush()?;
        Ok(0)
    }

    /// Interactive loop: every line is parsed and executed like an argument vector.
    pub fn repl(&self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();

        loop {
            match rl.readline("scenario> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line)?;
                    if line == "exit" || line == "quit" {
                        break;
                    }
                    let tokens = match lexer::split_into_tokens(line) {
                        Ok(tokens) => tokens,
                        Err(e) => {
                            eprintln!("error: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = self.run(&tokens, &mut stdout) {
                        eprintln!("error: {:#}", e);
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    /// An interpreter configured from the current process environment.
    fn default() -> Self {
        Self::new(Environment::new())
    }
}
