use crate::command::CmdType;
use thiserror::Error;

/// Errors raised while parsing an argument vector or assembling a script.
///
/// Every variant is a user input error: none of them is retried, and the first
/// one encountered aborts the whole parse or assembly call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// A token in verb position is not a verb, a global flag, or a known auto-script.
    #[error("unrecognized command or option: '{0}'")]
    MalformedCommand(String),

    /// A verb or flag that needs an operand reached the end of the input.
    #[error("'{verb}' requires an operand")]
    MissingOperand { verb: String },

    /// An operand does not have the shape its verb expects.
    #[error("invalid operand '{operand}' for '{verb}': {reason}")]
    InvalidOperand {
        verb: String,
        operand: String,
        reason: &'static str,
    },

    /// An operand that must be an integer is not one.
    #[error("'{operand}' is not a valid integer for '{verb}'")]
    NumberFormat { verb: String, operand: String },

    /// The content resolver has nothing for the requested script name.
    #[error("no script content found for '{0}'")]
    ScriptNotFound(String),

    /// Only `script` and bare commands can be assembled into script text.
    #[error("'{0}' commands do not reference a script")]
    NotAScript(CmdType),

    /// A placeholder pattern failed to compile or lacks a `name` group.
    #[error("invalid placeholder pattern: {0}")]
    InvalidPattern(String),
}

impl CliError {
    pub(crate) fn missing(verb: &str) -> Self {
        CliError::MissingOperand {
            verb: verb.to_string(),
        }
    }

    pub(crate) fn invalid(verb: &str, operand: &str, reason: &'static str) -> Self {
        CliError::InvalidOperand {
            verb: verb.to_string(),
            operand: operand.to_string(),
            reason,
        }
    }

    pub(crate) fn number(verb: &str, operand: &str) -> Self {
        CliError::NumberFormat {
            verb: verb.to_string(),
            operand: operand.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
