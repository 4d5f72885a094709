use std::collections::BTreeMap;
use std::fmt;

/// Conventional process exit code type used by the front end.
///
/// 0 means success, 2 a rejected command line, 1 any other failure.
pub type ExitCode = i32;

/// The closed set of command kinds a parse can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmdType {
    /// Start an activity in the background.
    Start,
    /// Run an activity to completion.
    Run,
    /// Stop a named activity.
    Stop,
    /// Wait for a named activity to finish.
    Await,
    /// Pause the scenario for a number of milliseconds.
    WaitMillis,
    /// Load a named script with parameters.
    Script,
    /// A bare word naming an auto-script.
    Fragment,
}

impl CmdType {
    /// Look up the verb keyword that introduces a command of this type.
    ///
    /// `Fragment` has no keyword; bare words are recognized by elimination.
    pub fn from_verb(token: &str) -> Option<Self> {
        match token {
            "start" => Some(CmdType::Start),
            "run" => Some(CmdType::Run),
            "stop" => Some(CmdType::Stop),
            "await" => Some(CmdType::Await),
            "waitmillis" => Some(CmdType::WaitMillis),
            "script" => Some(CmdType::Script),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CmdType::Start => "start",
            CmdType::Run => "run",
            CmdType::Stop => "stop",
            CmdType::Await => "await",
            CmdType::WaitMillis => "waitmillis",
            CmdType::Script => "script",
            CmdType::Fragment => "fragment",
        }
    }
}

impl fmt::Display for CmdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recognized unit of work.
///
/// The shape of `spec` depends on `cmd_type`: joined `key=value;` pairs for
/// `start` and `run`, a bare name for `stop`, `await`, `script` and bare
/// commands, the raw integer text for `waitmillis`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub cmd_type: CmdType,
    pub spec: String,
    /// Named parameters. Only `script` and bare commands populate this.
    pub args: BTreeMap<String, String>,
}

impl Command {
    pub fn new(cmd_type: CmdType, spec: impl Into<String>) -> Self {
        Self {
            cmd_type,
            spec: spec.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn with_args(
        cmd_type: CmdType,
        spec: impl Into<String>,
        args: BTreeMap<String, String>,
    ) -> Self {
        Self {
            cmd_type,
            spec: spec.into(),
            args,
        }
    }
}

impl fmt::Display for Command {
    /// Renders the command the way it would be typed on the command line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cmd_type {
            CmdType::Fragment => f.write_str(&self.spec)?,
            _ if self.spec.is_empty() => write!(f, "{}", self.cmd_type)?,
            _ => write!(f, "{} {}", self.cmd_type, self.spec)?,
        }
        for (k, v) in &self.args {
            write!(f, " {}={}", k, v)?;
        }
        Ok(())
    }
}
