//! A small command-language interpreter for scenario command lines.
//!
//! An argument vector such as `start driver=stdout cycles=10 waitmillis 500 stop a`
//! is parsed into a sequence of typed [`Command`]s plus the [`GlobalOptions`]
//! set by flags like `--help` or `--report-interval`. Commands that name a
//! script are expanded by the [`ScriptAssembler`], which fills the script's
//! placeholders from `key=value` parameters and marks the ones left without a
//! value as `UNSET:<name>`.
//!
//! Nothing here runs a scenario. The [`Interpreter`] front end prints the
//! assembled program and leaves execution to whoever consumes it.

pub mod command;
pub mod env;
pub mod error;
mod interpreter;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod resolver;
pub mod script;

pub use command::{CmdType, Command};
pub use error::CliError;
/// Just a convenient re-export of the command-line front end.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use options::GlobalOptions;
pub use parser::{ParsedArgs, parse_args, prescan_options};
pub use resolver::{ContentResolver, MemoryResolver, PathResolver};
pub use script::{PlaceholderPattern, ScriptAssembler, ScriptData};
