use serde::{Deserialize, Serialize};

/// Ordinal severity attached to a shipped log call.
///
/// `Off` is the suppress-all sentinel: a call carrying it is accepted and
/// dropped before any other processing. Unknown ordinals decode to `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Severity {
    Off,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Critical,
}

/// Result of encoding a severity ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelEncoding {
    pub label: &'static str,
    pub suppressed: bool,
}

impl Severity {
    pub const DEFAULT_ORDINAL: i64 = 2;

    pub fn from_ordinal(level: i64) -> Self {
        match level {
            0 => Severity::Off,
            1 => Severity::Debug,
            2 => Severity::Info,
            3 => Severity::Warn,
            4 => Severity::Error,
            5 => Severity::Critical,
            _ => Severity::Info,
        }
    }

    pub fn ordinal(self) -> i64 {
        match self {
            Severity::Off => 0,
            Severity::Debug => 1,
            Severity::Info => 2,
            Severity::Warn => 3,
            Severity::Error => 4,
            Severity::Critical => 5,
        }
    }

    /// Canonical label prefixed to every record message.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Off => "OFF",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn is_suppressed(self) -> bool {
        self == Severity::Off
    }
}

/// Maps an integer severity to its label and suppression flag.
pub fn encode(level: i64) -> LevelEncoding {
    let severity = Severity::from_ordinal(level);
    LevelEncoding {
        label: severity.label(),
        suppressed: severity.is_suppressed(),
    }
}

impl From<i64> for Severity {
    fn from(level: i64) -> Self {
        Severity::from_ordinal(level)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
