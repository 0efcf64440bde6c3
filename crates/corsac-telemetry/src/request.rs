//! Call-site operation timing and structured completion records

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::exporter::{SpanHandle, TelemetryExporter};
use crate::level::LogLevel;
use crate::record::{LogContext, LogRecord};

/// Times one operation and emits a single structured completion record,
/// plus a duration histogram, when finished.
///
/// When tracing is requested, a span is opened on start and its handle
/// becomes part of the ambient context, so span-event hooks see it for
/// any records logged during the operation. The span is ended exactly
/// once, with the completion error when there is one.
pub struct RequestLogger {
    dispatcher: Arc<Dispatcher>,
    exporter: Arc<TelemetryExporter>,
    ctx: LogContext,
    operation: String,
    correlation_id: String,
    started: Instant,
    slow_threshold: Option<Duration>,
    span: SpanHandle,
    completed: bool,
}

impl RequestLogger {
    /// Start timing `operation` within the given ambient context.
    pub fn start(
        dispatcher: Arc<Dispatcher>,
        exporter: Arc<TelemetryExporter>,
        ctx: LogContext,
        operation: &str,
        traced: bool,
    ) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let span = if traced {
            exporter.start_span(
                operation,
                &[("correlation_id", Value::from(correlation_id.clone()))],
            )
        } else {
            SpanHandle::NONE
        };
        let ctx = ctx.with_span(span.clone());

        Self {
            dispatcher,
            exporter,
            ctx,
            operation: operation.to_string(),
            correlation_id,
            started: Instant::now(),
            slow_threshold: None,
            span,
            completed: false,
        }
    }

    /// Escalate successful completions slower than `threshold` to
    /// `warning`.
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    /// The ambient context for this operation, including the span handle
    /// when one was opened.
    pub fn context(&self) -> &LogContext {
        &self.ctx
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Complete successfully.
    pub fn success(mut self) {
        self.finish(None);
    }

    /// Complete with an error.
    pub fn error(mut self, error: &str) {
        self.finish(Some(error));
    }

    fn finish(&mut self, error: Option<&str>) {
        if self.completed {
            return;
        }
        self.completed = true;

        let elapsed = self.started.elapsed();
        let duration_ms = elapsed.as_millis() as u64;
        let success = error.is_none();

        let mut level = if success { LogLevel::Info } else { LogLevel::Error };
        let mut data = Map::new();
        data.insert("operation".to_string(), Value::from(self.operation.clone()));
        data.insert(
            "correlation_id".to_string(),
            Value::from(self.correlation_id.clone()),
        );
        data.insert("duration_ms".to_string(), Value::from(duration_ms));
        data.insert("success".to_string(), Value::from(success));
        if let Some(error) = error {
            data.insert("error".to_string(), Value::from(error));
        }

        if success {
            if let Some(threshold) = self.slow_threshold {
                if elapsed >= threshold {
                    level = LogLevel::Warning;
                    data.insert("slow".to_string(), Value::from(true));
                }
            }
        }

        self.dispatcher.emit(
            &self.ctx,
            LogRecord::new(level, self.dispatcher.name(), Value::Object(data)),
        );
        self.exporter.histogram(
            "corsac.operation.duration_ms",
            duration_ms as f64,
            &[("method", Value::from(self.operation.clone()))],
        );
        self.exporter.end_span(&self.span, error);
    }
}

impl Drop for RequestLogger {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(
                correlation_id = %self.correlation_id,
                operation = %self.operation,
                "Operation logger dropped without explicit completion"
            );
            self.exporter
                .end_span(&self.span, Some("dropped without completion"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Handler;
    use serde_json::json;
    use std::sync::Mutex;
    use std::thread;

    #[derive(Default)]
    struct Capture {
        records: Mutex<Vec<LogRecord>>,
    }

    impl Capture {
        fn records(&self) -> Vec<LogRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl Handler for Capture {
        fn handle(&self, _ctx: &LogContext, record: &LogRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    fn wired() -> (Arc<Capture>, Arc<Dispatcher>, Arc<TelemetryExporter>) {
        let capture = Arc::new(Capture::default());
        let dispatcher = Arc::new(Dispatcher::new("requests", LogLevel::Debug));
        dispatcher.add_handler(capture.clone());
        let exporter = Arc::new(TelemetryExporter::disabled());
        exporter.initialize();
        (capture, dispatcher, exporter)
    }

    #[test]
    fn test_success_emits_one_record() {
        let (capture, dispatcher, exporter) = wired();

        let logger = RequestLogger::start(
            dispatcher,
            exporter,
            LogContext::new(),
            "tools/call",
            false,
        );
        logger.success();

        let records = capture.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, LogLevel::Info);
        assert_eq!(records[0].data["operation"], json!("tools/call"));
        assert_eq!(records[0].data["success"], json!(true));
        assert!(records[0].data["correlation_id"].is_string());
        assert!(records[0].data["duration_ms"].is_u64());
    }

    #[test]
    fn test_error_completion_is_error_level() {
        let (capture, dispatcher, exporter) = wired();

        let logger =
            RequestLogger::start(dispatcher, exporter, LogContext::new(), "tools/call", false);
        logger.error("tool not found");

        let records = capture.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, LogLevel::Error);
        assert_eq!(records[0].data["error"], json!("tool not found"));
        assert_eq!(records[0].data["success"], json!(false));
    }

    #[test]
    fn test_slow_completion_escalates_to_warning() {
        let (capture, dispatcher, exporter) = wired();

        let logger =
            RequestLogger::start(dispatcher, exporter, LogContext::new(), "slow/op", false)
                .with_slow_threshold(Duration::from_millis(10));
        thread::sleep(Duration::from_millis(20));
        logger.success();

        let records = capture.records();
        assert_eq!(records[0].level, LogLevel::Warning);
        assert_eq!(records[0].data["slow"], json!(true));
    }

    #[test]
    fn test_fast_completion_stays_info() {
        let (capture, dispatcher, exporter) = wired();

        let logger =
            RequestLogger::start(dispatcher, exporter, LogContext::new(), "fast/op", false)
                .with_slow_threshold(Duration::from_secs(60));
        logger.success();

        assert_eq!(capture.records()[0].level, LogLevel::Info);
    }

    #[test]
    fn test_context_keeps_caller_fields() {
        let (capture, dispatcher, exporter) = wired();
        dispatcher.add_hook(Arc::new(crate::hooks::SessionHook));

        let ctx = LogContext::new().with_session_id("sess-3");
        let logger = RequestLogger::start(dispatcher, exporter, ctx, "op", false);
        logger.success();

        assert_eq!(capture.records()[0].extra["session_id"], json!("sess-3"));
    }

    #[test]
    fn test_untraced_operation_has_no_span() {
        let (_capture, dispatcher, exporter) = wired();
        let logger = RequestLogger::start(dispatcher, exporter, LogContext::new(), "op", false);
        assert!(!logger.context().span().is_active());
        logger.success();
    }

    #[test]
    fn test_drop_without_completion_emits_no_record() {
        let (capture, dispatcher, exporter) = wired();

        {
            let _logger =
                RequestLogger::start(dispatcher, exporter, LogContext::new(), "op", false);
            // Dropped here without success()/error()
        }

        assert!(capture.records().is_empty());
    }
}
