//! MCP log severity levels and level-based filtering

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::Level;

use crate::Error;

/// The eight MCP logging levels, ordered from least to most severe.
///
/// Ordering is by ordinal, not lexical: `debug < info < notice < warning
/// < error < critical < alert < emergency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogLevel {
    /// Ordinal priority of this level; higher is more severe.
    pub fn priority(self) -> u8 {
        self as u8
    }

    /// Whether a record at this level passes a minimum-level filter.
    ///
    /// This is the sole filtering rule, applied before any enrichment or
    /// buffering work.
    pub fn should_emit(self, min_level: LogLevel) -> bool {
        self.priority() >= min_level.priority()
    }

    /// Parse a protocol-supplied level string. Unknown strings map to
    /// `info` rather than failing, per the MCP logging convention.
    pub fn from_protocol(value: &str) -> LogLevel {
        value.parse().unwrap_or(LogLevel::Info)
    }

    /// The lowercase wire name of this level.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
            LogLevel::Alert => "alert",
            LogLevel::Emergency => "emergency",
        }
    }

    pub(crate) fn from_priority(value: u8) -> LogLevel {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Notice,
            3 => LogLevel::Warning,
            4 => LogLevel::Error,
            5 => LogLevel::Critical,
            6 => LogLevel::Alert,
            _ => LogLevel::Emergency,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "notice" => Ok(LogLevel::Notice),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            "alert" => Ok(LogLevel::Alert),
            "emergency" => Ok(LogLevel::Emergency),
            other => Err(Error::Config {
                message: format!("Unknown log level '{}'", other),
            }),
        }
    }
}

/// Mapping onto the local `tracing` severity scale, used by the fallback
/// logger. The four levels above `error` have no local equivalent and
/// collapse onto `ERROR`.
impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info | LogLevel::Notice => Level::INFO,
            LogLevel::Warning => Level::WARN,
            LogLevel::Error
            | LogLevel::Critical
            | LogLevel::Alert
            | LogLevel::Emergency => Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Notice < LogLevel::Warning);
        assert!(LogLevel::Error < LogLevel::Emergency);
        assert_eq!(LogLevel::Debug.priority(), 0);
        assert_eq!(LogLevel::Emergency.priority(), 7);
    }

    #[test]
    fn test_should_emit() {
        assert!(LogLevel::Error.should_emit(LogLevel::Info));
        assert!(LogLevel::Info.should_emit(LogLevel::Info));
        assert!(!LogLevel::Debug.should_emit(LogLevel::Info));
        assert!(LogLevel::Debug.should_emit(LogLevel::Debug));
    }

    #[test]
    fn test_strict_parse() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("verbose".parse::<LogLevel>().is_err());
        // Wire names are lowercase only
        assert!("WARNING".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_protocol_parse_defaults_to_info() {
        assert_eq!(LogLevel::from_protocol("alert"), LogLevel::Alert);
        assert_eq!(LogLevel::from_protocol("verbose"), LogLevel::Info);
        assert_eq!(LogLevel::from_protocol(""), LogLevel::Info);
    }

    #[test]
    fn test_serde_wire_names() {
        let value = serde_json::to_value(LogLevel::Emergency).unwrap();
        assert_eq!(value, serde_json::json!("emergency"));
        let level: LogLevel = serde_json::from_value(serde_json::json!("notice")).unwrap();
        assert_eq!(level, LogLevel::Notice);
    }

    #[test]
    fn test_tracing_mapping() {
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(LogLevel::Notice), Level::INFO);
        assert_eq!(Level::from(LogLevel::Warning), Level::WARN);
        assert_eq!(Level::from(LogLevel::Critical), Level::ERROR);
    }

    #[test]
    fn test_priority_round_trip() {
        for priority in 0..8 {
            assert_eq!(LogLevel::from_priority(priority).priority(), priority);
        }
    }
}
