//! # Corsac Telemetry
//!
//! Observability core for the Corsac MCP server: structured, leveled,
//! sanitized log records with buffered fan-out and dual-backend export.
//!
//! ## Features
//!
//! - **Severity Scale**: the eight ordered MCP log levels with cheap
//!   minimum-level filtering
//! - **Sanitization**: field redaction and payload size guards applied
//!   before any record leaves the process
//! - **Hook Chain**: composable enrichment steps (trace context, session
//!   tags, counters, sampling) run per record, in order, panic-isolated
//! - **Buffered Dispatch**: per-logger record buffering with size- and
//!   time-based flush triggers, evaluated at append time
//! - **Dual-Backend Export**: one API for logs, metrics, and spans that
//!   falls back from a remote backend to local `tracing` silently
//! - **Protocol Forwarding**: records as `notifications/message` params
//!   through a caller-supplied send capability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use corsac_telemetry::{LogContext, LogLevel, TelemetryConfig, TelemetrySystem};
//!
//! fn main() -> corsac_telemetry::Result<()> {
//!     let config = TelemetryConfig::default();
//!     let _guard = TelemetrySystem::init(&config)?;
//!
//!     let logger = TelemetrySystem::build_logger("server", &config, None, None);
//!     logger.log(
//!         &LogContext::new().with_session_id("sess-1"),
//!         LogLevel::Info,
//!         serde_json::json!({"msg": "server started"}),
//!     );
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod exporter;
pub mod handlers;
pub mod hooks;
pub mod level;
pub mod notify;
pub mod record;
pub mod request;
pub mod sanitization;
pub mod system;


pub use config::{ExporterConfig, LogFormat, LogOutput, TelemetryConfig};
pub use dispatch::{BufferPolicy, Dispatcher, Handler};
pub use exporter::{SpanHandle, TelemetryClient, TelemetryExporter};
pub use hooks::{CompositeHook, Hook, HookAction};
pub use level::LogLevel;
pub use notify::{NotificationSender, LOG_NOTIFICATION_METHOD};
pub use record::{LogContext, LogRecord, TraceInfo};
pub use request::RequestLogger;
pub use sanitization::Sanitizer;
pub use system::{TelemetryGuard, TelemetrySystem};

// Re-export commonly used tracing items for convenience
pub use tracing::{debug, error, info, trace, warn};

/// Result type for telemetry setup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Telemetry-specific errors. Only setup paths return these; runtime
/// logging, metric, and span calls are infallible by design.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Telemetry system error: {message}")]
    System { message: String },
}
