//! Terminal sinks for dispatched records

use serde_json::{Map, Value};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use crate::dispatch::Handler;
use crate::exporter::TelemetryExporter;
use crate::level::LogLevel;
use crate::record::{LogContext, LogRecord};

/// Forwards records to the process-local `tracing` subscriber at the
/// mapped severity.
#[derive(Debug, Default)]
pub struct TracingHandler;

impl Handler for TracingHandler {
    fn handle(&self, _ctx: &LogContext, record: &LogRecord) {
        let extra = Value::Object(
            record
                .extra
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        );

        match record.level {
            LogLevel::Debug => {
                tracing::debug!(logger = %record.logger, level = %record.level, data = %record.data, extra = %extra, "log record");
            }
            LogLevel::Info | LogLevel::Notice => {
                tracing::info!(logger = %record.logger, level = %record.level, data = %record.data, extra = %extra, "log record");
            }
            LogLevel::Warning => {
                tracing::warn!(logger = %record.logger, level = %record.level, data = %record.data, extra = %extra, "log record");
            }
            LogLevel::Error
            | LogLevel::Critical
            | LogLevel::Alert
            | LogLevel::Emergency => {
                tracing::error!(logger = %record.logger, level = %record.level, data = %record.data, extra = %extra, "log record");
            }
        }
    }
}

/// Writes records as JSON lines to a durable byte sink, typically a
/// rotating file appender. Write failures are swallowed; a full disk
/// must not fail the request being logged.
pub struct WriterHandler {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl WriterHandler {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn line(record: &LogRecord) -> Value {
        let mut line = Map::new();
        line.insert(
            "timestamp".to_string(),
            Value::from(record.timestamp.to_rfc3339()),
        );
        line.insert("level".to_string(), Value::from(record.level.as_str()));
        line.insert("logger".to_string(), Value::from(record.logger.clone()));
        line.insert("data".to_string(), record.data.clone());
        for (key, value) in &record.extra {
            line.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(line)
    }
}

impl Handler for WriterHandler {
    fn handle(&self, _ctx: &LogContext, record: &LogRecord) {
        let line = Self::line(record);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if serde_json::to_writer(&mut *writer, &line).is_ok() {
            let _ = writer.write_all(b"\n");
        }
    }
}

/// Forwards records into the dual-backend telemetry exporter.
pub struct ExporterHandler {
    exporter: Arc<TelemetryExporter>,
}

impl ExporterHandler {
    pub fn new(exporter: Arc<TelemetryExporter>) -> Self {
        Self { exporter }
    }
}

impl Handler for ExporterHandler {
    fn handle(&self, _ctx: &LogContext, record: &LogRecord) {
        let message = match &record.data {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };

        let mut attrs: Vec<(&str, Value)> = vec![("logger", Value::from(record.logger.clone()))];
        for (key, value) in &record.extra {
            attrs.push((key.as_str(), value.clone()));
        }

        self.exporter.log(record.level, &message, &attrs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    /// Shared in-memory sink for WriterHandler tests.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_handler_emits_one_json_line() {
        let buf = SharedBuf::default();
        let handler = WriterHandler::new(Box::new(buf.clone()));

        let mut record = LogRecord::new(LogLevel::Warning, "server", json!({"msg": "slow"}));
        record.insert_extra("request_id", json!("req-1"));
        handler.handle(&LogContext::new(), &record);

        let contents = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);

        let parsed: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["level"], "warning");
        assert_eq!(parsed["logger"], "server");
        assert_eq!(parsed["data"]["msg"], "slow");
        assert_eq!(parsed["request_id"], "req-1");
        assert!(parsed["timestamp"].is_string());
    }

    #[test]
    fn test_writer_handler_extra_cannot_shadow_fixed_fields() {
        let buf = SharedBuf::default();
        let handler = WriterHandler::new(Box::new(buf.clone()));

        let mut record = LogRecord::new(LogLevel::Info, "server", json!("payload"));
        record.insert_extra("level", json!("spoofed"));
        handler.handle(&LogContext::new(), &record);

        let contents = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let parsed: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["level"], "info");
    }

    #[test]
    fn test_writer_handler_swallows_write_failures() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let handler = WriterHandler::new(Box::new(Broken));
        let record = LogRecord::new(LogLevel::Info, "server", json!("x"));
        // Must not panic or propagate
        handler.handle(&LogContext::new(), &record);
    }

    #[test]
    fn test_tracing_handler_is_infallible() {
        let handler = TracingHandler;
        for level in [LogLevel::Debug, LogLevel::Notice, LogLevel::Warning, LogLevel::Alert] {
            let record = LogRecord::new(level, "server", json!({"k": 1}));
            handler.handle(&LogContext::new(), &record);
        }
    }

    #[test]
    fn test_exporter_handler_forwards_without_backend() {
        let handler = ExporterHandler::new(Arc::new(TelemetryExporter::disabled()));
        let record = LogRecord::new(LogLevel::Error, "server", json!({"fail": true}));
        // Routes to the local fallback; nothing to observe but absence
        // of panics and errors.
        handler.handle(&LogContext::new(), &record);
    }
}
