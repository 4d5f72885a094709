use std::path::PathBuf;

/// Interpreter-wide settings collected from global flags during one parse.
///
/// These are returned alongside the command sequence; nothing here is static.
/// Repeating a flag overwrites the earlier value, except `--include` which
/// accumulates and `-v` which adds up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub version_short: bool,
    pub version_coords: bool,
    pub basic_help: bool,
    pub help_topic: Option<String>,
    pub list_activity_types: bool,
    pub list_workloads: bool,
    pub report_graphite_to: Option<String>,
    pub report_interval: Option<u64>,
    pub report_csv_to: Option<String>,
    pub progress: Option<String>,
    pub session_name: Option<String>,
    pub include_paths: Vec<PathBuf>,
    pub verbosity: u8,
    pub interactive: bool,
}

impl GlobalOptions {
    pub fn wants_basic_help(&self) -> bool {
        self.basic_help && self.help_topic.is_none()
    }

    pub fn wants_topical_help(&self) -> bool {
        self.help_topic.is_some()
    }

    /// True when a flag asks for informational output instead of a scenario.
    pub fn suppresses_commands(&self) -> bool {
        self.version_short
            || self.version_coords
            || self.basic_help
            || self.help_topic.is_some()
            || self.list_activity_types
            || self.list_workloads
    }
}

/// The fixed set of global flag spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GlobalFlag {
    VersionShort,
    VersionCoords,
    Help,
    ListActivityTypes,
    ListWorkloads,
    ReportGraphiteTo,
    ReportInterval,
    ReportCsvTo,
    Progress,
    SessionName,
    Include,
    Verbose(u8),
    Interactive,
}

impl GlobalFlag {
    pub(crate) fn from_token(token: &str) -> Option<Self> {
        let flag = match token {
            "--version" => GlobalFlag::VersionShort,
            "--version-coords" => GlobalFlag::VersionCoords,
            "--help" => GlobalFlag::Help,
            "--list-activity-types" | "--list-drivers" => GlobalFlag::ListActivityTypes,
            "--list-workloads" => GlobalFlag::ListWorkloads,
            "--report-graphite-to" => GlobalFlag::ReportGraphiteTo,
            "--report-interval" => GlobalFlag::ReportInterval,
            "--report-csv-to" => GlobalFlag::ReportCsvTo,
            "--progress" => GlobalFlag::Progress,
            "--session-name" => GlobalFlag::SessionName,
            "--include" => GlobalFlag::Include,
            "-v" => GlobalFlag::Verbose(1),
            "-vv" => GlobalFlag::Verbose(2),
            "-vvv" => GlobalFlag::Verbose(3),
            "--repl" => GlobalFlag::Interactive,
            _ => return None,
        };
        Some(flag)
    }

    /// Whether the flag must be followed by an operand token.
    pub(crate) fn requires_operand(&self) -> bool {
        matches!(
            self,
            GlobalFlag::ReportGraphiteTo
                | GlobalFlag::ReportInterval
                | GlobalFlag::ReportCsvTo
                | GlobalFlag::Progress
                | GlobalFlag::SessionName
                | GlobalFlag::Include
        )
    }
}
