//! Telemetry configuration and environment overrides

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::level::LogLevel;
use crate::{Error, Result};

/// Main telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Global enable/disable toggle
    pub enabled: bool,

    /// Logging and dispatch configuration
    pub logging: LoggingConfig,

    /// Privacy and sanitization settings
    pub privacy: PrivacyConfig,

    /// Remote telemetry backend settings
    pub exporter: ExporterConfig,
}

/// Logging-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum severity accepted by dispatchers
    pub min_level: LogLevel,

    /// Output format (Json, Pretty, Compact)
    pub format: LogFormat,

    /// Where local log lines go
    pub output: LogOutput,

    /// Directory for log files
    pub log_dir: PathBuf,

    /// Base filename for logs
    pub log_file_name: String,

    /// Record buffer capacity; 0 disables buffering
    pub buffer_size: usize,

    /// Seconds between time-triggered buffer flushes, checked when the
    /// next record arrives
    pub flush_interval_secs: u64,

    /// Attach trace_id/span_id fields to dispatched records
    pub include_trace_info: bool,

    /// Context keys copied into records by the field-extraction hook
    pub context_fields: Vec<String>,

    /// Completions slower than this are escalated to warnings (ms);
    /// 0 disables the escalation
    pub slow_op_threshold_ms: u64,
}

/// Privacy and sanitization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Field names replaced by the redaction marker, exact match
    pub redacted_fields: Vec<String>,

    /// Payloads serializing larger than this are truncated wholesale
    pub max_payload_bytes: usize,
}

/// Remote telemetry backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Enable the remote backend
    pub enabled: bool,

    /// Collector endpoint
    pub endpoint: String,

    /// Bearer token attached to exported batches
    pub auth_token: Option<String>,

    /// Fall back to local logging when a remote call fails
    pub fallback_enabled: bool,

    /// Fraction of sub-threshold records kept by the sampling hook
    pub sample_rate: f64,

    /// Records at or above this level bypass sampling
    pub sample_always_level: LogLevel,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// Structured JSON format
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Local log destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutput {
    /// Stderr only; stdout belongs to the protocol transport
    Stderr,
    /// Rotating log file only
    File,
    /// Both stderr and file
    Both,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            logging: LoggingConfig {
                min_level: LogLevel::Info,
                format: LogFormat::Pretty,
                output: LogOutput::Stderr,
                log_dir: PathBuf::from("./logs"),
                log_file_name: "corsac".to_string(),
                buffer_size: 0,
                flush_interval_secs: 5,
                include_trace_info: true,
                context_fields: Vec::new(),
                slow_op_threshold_ms: 1_000,
            },
            privacy: PrivacyConfig {
                redacted_fields: vec![
                    "password".to_string(),
                    "api_key".to_string(),
                    "secret".to_string(),
                    "token".to_string(),
                    "authorization".to_string(),
                ],
                max_payload_bytes: 64 * 1024,
            },
            exporter: ExporterConfig {
                enabled: false,
                endpoint: String::new(),
                auth_token: None,
                fallback_enabled: true,
                sample_rate: 1.0,
                sample_always_level: LogLevel::Warning,
            },
        }
    }
}

impl TelemetryConfig {
    /// Load configuration from a TOML file, or defaults plus environment
    /// overrides when the file does not exist.
    pub async fn load(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = tokio::fs::read_to_string(config_path).await?;
            let config: TelemetryConfig = toml::from_str(&content).map_err(|e| Error::Config {
                message: format!("Failed to parse telemetry config: {}", e),
            })?;
            Ok(config)
        } else {
            let mut config = Self::default();
            config.load_env_overrides();
            Ok(config)
        }
    }

    /// Save configuration to a TOML file.
    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            message: format!("Failed to serialize telemetry config: {}", e),
        })?;

        tokio::fs::write(config_path, content).await?;
        Ok(())
    }

    /// Load environment variable overrides. Unparseable values keep the
    /// current setting.
    pub fn load_env_overrides(&mut self) {
        if let Ok(enabled) = std::env::var("CORSAC_TELEMETRY_ENABLED") {
            self.enabled = enabled.parse().unwrap_or(self.enabled);
        }

        if let Ok(level) = std::env::var("CORSAC_LOG_LEVEL") {
            if let Ok(level) = level.to_lowercase().parse::<LogLevel>() {
                self.logging.min_level = level;
            }
        }

        if let Ok(format) = std::env::var("CORSAC_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                _ => self.logging.format,
            };
        }

        if let Ok(output) = std::env::var("CORSAC_LOG_OUTPUT") {
            self.logging.output = match output.to_lowercase().as_str() {
                "stderr" => LogOutput::Stderr,
                "file" => LogOutput::File,
                "both" => LogOutput::Both,
                _ => self.logging.output,
            };
        }

        if let Ok(dir) = std::env::var("CORSAC_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }

        if let Ok(size) = std::env::var("CORSAC_LOG_BUFFER_SIZE") {
            self.logging.buffer_size = size.parse().unwrap_or(self.logging.buffer_size);
        }

        if let Ok(enabled) = std::env::var("CORSAC_EXPORTER_ENABLED") {
            self.exporter.enabled = enabled.parse().unwrap_or(self.exporter.enabled);
        }

        if let Ok(endpoint) = std::env::var("CORSAC_EXPORTER_ENDPOINT") {
            self.exporter.endpoint = endpoint;
        }
    }

    /// Time-based flush interval for buffered dispatchers.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.logging.flush_interval_secs)
    }

    /// Slow-operation escalation threshold, when enabled.
    pub fn slow_threshold(&self) -> Option<Duration> {
        if self.logging.slow_op_threshold_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.logging.slow_op_threshold_ms))
        }
    }

    /// Validate configuration. Failures here are fatal to setup; nothing
    /// past setup returns an error.
    pub fn validate(&self) -> Result<()> {
        if self.logging.buffer_size > 0 && self.logging.flush_interval_secs == 0 {
            return Err(Error::Config {
                message: "flush_interval_secs must be greater than 0 when buffering is enabled"
                    .to_string(),
            });
        }

        if self.privacy.max_payload_bytes == 0 {
            return Err(Error::Config {
                message: "max_payload_bytes must be greater than 0".to_string(),
            });
        }

        if !(self.exporter.sample_rate > 0.0 && self.exporter.sample_rate <= 1.0) {
            return Err(Error::Config {
                message: format!(
                    "sample_rate must be in (0, 1], got {}",
                    self.exporter.sample_rate
                ),
            });
        }

        if self.exporter.enabled && self.exporter.endpoint.is_empty() {
            return Err(Error::Config {
                message: "exporter.endpoint must be set when the exporter is enabled".to_string(),
            });
        }

        if self.logging.output != LogOutput::Stderr {
            if !self.logging.log_dir.exists() {
                std::fs::create_dir_all(&self.logging.log_dir)?;
            }

            // Test write permissions
            let test_file = self.logging.log_dir.join(".corsac_test");
            std::fs::write(&test_file, "test")?;
            std::fs::remove_file(&test_file)?;
        }

        Ok(())
    }
}
