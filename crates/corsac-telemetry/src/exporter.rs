//! Dual-backend telemetry export with transparent local fallback
//!
//! Every logging, metric, and span call is routed to the primary remote
//! backend when one is configured and initialized, and recovered locally
//! otherwise. Callers never see an error from this module: logs fall
//! back to the process-local `tracing` logger, metric and span failures
//! are dropped silently to avoid feedback loops.

use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::config::ExporterConfig;
use crate::level::LogLevel;

/// Handle for a span opened through the exporter.
///
/// The default value is the "no span" sentinel returned when the primary
/// backend is unavailable; every span operation on it is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanHandle(Option<u64>);

impl SpanHandle {
    /// The "no span" sentinel.
    pub const NONE: SpanHandle = SpanHandle(None);

    pub fn new(id: u64) -> Self {
        SpanHandle(Some(id))
    }

    pub fn is_active(&self) -> bool {
        self.0.is_some()
    }

    pub fn id(&self) -> Option<u64> {
        self.0
    }
}

/// The primary remote telemetry backend.
///
/// Implementations are opaque to this core: any method may block on I/O
/// and may fail, and the exporter recovers from both without surfacing
/// an error to the call site.
pub trait TelemetryClient: Send + Sync {
    fn initialize(&self) -> anyhow::Result<()>;
    fn shutdown(&self) -> anyhow::Result<()>;
    fn flush(&self) -> anyhow::Result<()>;

    fn log(&self, level: LogLevel, message: &str, attrs: &[(&str, Value)]) -> anyhow::Result<()>;

    fn record_counter(&self, name: &str, value: u64, attrs: &[(&str, Value)])
        -> anyhow::Result<()>;
    fn record_gauge(&self, name: &str, value: f64, attrs: &[(&str, Value)]) -> anyhow::Result<()>;
    fn record_histogram(
        &self,
        name: &str,
        value: f64,
        attrs: &[(&str, Value)],
    ) -> anyhow::Result<()>;

    fn start_span(&self, name: &str, attrs: &[(&str, Value)]) -> anyhow::Result<SpanHandle>;
    fn end_span(&self, span: &SpanHandle, error: Option<&str>) -> anyhow::Result<()>;
    fn span_event(
        &self,
        span: &SpanHandle,
        name: &str,
        attrs: &[(&str, Value)],
    ) -> anyhow::Result<()>;
}

/// Where a routed call ended up.
enum Route<T> {
    /// The primary client handled it.
    Primary(T),
    /// The primary client was invoked and failed.
    Failed,
    /// No primary client, or not initialized.
    Unavailable,
}

/// Exporter lifecycle. Each transition happens at most once: an adapter
/// that has been shut down stays down, and re-initializing it is a
/// successful no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdapterState {
    Created,
    Initialized,
    ShutDown,
}

/// One API surface for logs, metrics, and spans with automatic, silent
/// fallback from the remote backend to local logging.
///
/// Process-scoped: construct once at startup, share by reference, shut
/// down once. `initialize` and `shutdown` are idempotent and never
/// return an error.
pub struct TelemetryExporter {
    client: Option<Arc<dyn TelemetryClient>>,
    fallback: bool,
    state: RwLock<AdapterState>,
}

impl TelemetryExporter {
    pub fn new(client: Option<Arc<dyn TelemetryClient>>) -> Self {
        Self {
            client,
            fallback: true,
            state: RwLock::new(AdapterState::Created),
        }
    }

    /// Exporter with no remote backend: logs route to the local logger,
    /// metrics and spans are dropped.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// When disabled, a failing remote call is dropped instead of being
    /// retried locally. Absence of a backend still logs locally.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Build from configuration. A disabled exporter ignores any client
    /// it is handed; the fallback flag comes from the config.
    pub fn from_config(config: &ExporterConfig, client: Option<Arc<dyn TelemetryClient>>) -> Self {
        let client = if config.enabled { client } else { None };
        Self::new(client).with_fallback(config.fallback_enabled)
    }

    /// Mark the exporter ready. A missing backend or a backend that
    /// fails to initialize leaves the fallback path active; neither is
    /// an error for the caller. Calling again, including after
    /// shutdown, is a successful no-op.
    pub fn initialize(&self) {
        let mut state = self.write_state();
        if *state != AdapterState::Created {
            return;
        }

        match &self.client {
            None => {
                tracing::info!(
                    telemetry.event = "exporter_initialized",
                    backend = "local",
                    "No remote telemetry backend configured; using local logging only"
                );
            }
            Some(client) => {
                if let Err(error) = client.initialize() {
                    tracing::warn!(
                        telemetry.event = "exporter_init_failed",
                        error = %error,
                        "Remote telemetry backend failed to initialize; falling back to local logging"
                    );
                }
            }
        }

        *state = AdapterState::Initialized;
    }

    /// Tear the exporter down. Backend shutdown failures are logged
    /// locally and not propagated. A no-op unless initialized.
    pub fn shutdown(&self) {
        let mut state = self.write_state();
        if *state != AdapterState::Initialized {
            return;
        }

        if let Some(client) = &self.client {
            if let Err(error) = client.shutdown() {
                tracing::warn!(
                    telemetry.event = "exporter_shutdown_failed",
                    error = %error,
                    "Remote telemetry backend failed to shut down cleanly"
                );
            }
        }

        *state = AdapterState::ShutDown;
    }

    pub fn is_initialized(&self) -> bool {
        *self.read_state() == AdapterState::Initialized
    }

    /// Emit one structured log line, preferring the remote backend.
    pub fn log(&self, level: LogLevel, message: &str, attrs: &[(&str, Value)]) {
        match self.route(|client| client.log(level, message, attrs)) {
            Route::Primary(()) => {}
            Route::Unavailable => local_log(level, message, attrs),
            Route::Failed => {
                if self.fallback {
                    local_log(level, message, attrs);
                }
            }
        }
    }

    /// Record a counter increment. Dropped when no remote backend can
    /// take it; there is no local equivalent.
    pub fn counter(&self, name: &str, value: u64, attrs: &[(&str, Value)]) {
        let _ = self.route(|client| client.record_counter(name, value, attrs));
    }

    pub fn gauge(&self, name: &str, value: f64, attrs: &[(&str, Value)]) {
        let _ = self.route(|client| client.record_gauge(name, value, attrs));
    }

    pub fn histogram(&self, name: &str, value: f64, attrs: &[(&str, Value)]) {
        let _ = self.route(|client| client.record_histogram(name, value, attrs));
    }

    /// Open a span, or return the no-span sentinel when the remote
    /// backend is unavailable or the call fails.
    pub fn start_span(&self, name: &str, attrs: &[(&str, Value)]) -> SpanHandle {
        match self.route(|client| client.start_span(name, attrs)) {
            Route::Primary(span) => span,
            Route::Failed | Route::Unavailable => SpanHandle::NONE,
        }
    }

    /// End a span. A no-span sentinel is ignored; backend failures are
    /// dropped silently.
    pub fn end_span(&self, span: &SpanHandle, error: Option<&str>) {
        if !span.is_active() {
            return;
        }
        let _ = self.route(|client| client.end_span(span, error));
    }

    /// Attach an event to a span. A no-span sentinel is ignored.
    pub fn span_event(&self, span: &SpanHandle, name: &str, attrs: &[(&str, Value)]) {
        if !span.is_active() {
            return;
        }
        let _ = self.route(|client| client.span_event(span, name, attrs));
    }

    /// Run `op` inside a span.
    ///
    /// The span is ended exactly once with the operation's error, and
    /// the operation's own result is returned unchanged: tracing
    /// failures never alter the outcome of the wrapped work.
    pub fn traced<T, E>(
        &self,
        name: &str,
        attrs: &[(&str, Value)],
        op: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
    {
        let span = self.start_span(name, attrs);
        let result = op();
        match &result {
            Ok(_) => self.end_span(&span, None),
            Err(error) => self.end_span(&span, Some(&error.to_string())),
        }
        result
    }

    // ---- MCP protocol event conveniences -------------------------------
    //
    // Fixed attribute vocabulary across event types: request_id, method,
    // session_id, duration_ms, success, error, type.

    /// Record an incoming protocol request.
    pub fn request_received(&self, method: &str, request_id: &str, session_id: Option<&str>) {
        self.log(
            LogLevel::Info,
            "request received",
            &[
                ("method", Value::from(method)),
                ("request_id", Value::from(request_id)),
                ("session_id", Value::from(session_id)),
                ("type", Value::from("request")),
            ],
        );
        self.counter(
            "corsac.requests.received",
            1,
            &[("method", Value::from(method))],
        );
    }

    /// Record a completed response with its outcome and latency.
    pub fn response_completed(
        &self,
        method: &str,
        request_id: &str,
        duration: Duration,
        error: Option<&str>,
    ) {
        let duration_ms = duration.as_millis() as u64;
        let success = error.is_none();
        let level = if success { LogLevel::Info } else { LogLevel::Error };

        self.log(
            level,
            "response completed",
            &[
                ("method", Value::from(method)),
                ("request_id", Value::from(request_id)),
                ("duration_ms", Value::from(duration_ms)),
                ("success", Value::from(success)),
                ("error", Value::from(error)),
                ("type", Value::from("response")),
            ],
        );
        self.counter(
            "corsac.responses.completed",
            1,
            &[
                ("method", Value::from(method)),
                ("success", Value::from(success)),
            ],
        );
        self.histogram(
            "corsac.request.duration_ms",
            duration_ms as f64,
            &[("method", Value::from(method))],
        );
    }

    /// Record a tool invocation.
    pub fn tool_call(
        &self,
        tool: &str,
        session_id: Option<&str>,
        duration: Duration,
        error: Option<&str>,
    ) {
        let duration_ms = duration.as_millis() as u64;
        let success = error.is_none();
        let level = if success { LogLevel::Info } else { LogLevel::Error };

        self.log(
            level,
            "tool call completed",
            &[
                ("method", Value::from(tool)),
                ("session_id", Value::from(session_id)),
                ("duration_ms", Value::from(duration_ms)),
                ("success", Value::from(success)),
                ("error", Value::from(error)),
                ("type", Value::from("tool_call")),
            ],
        );
        self.counter(
            "corsac.tool_calls.completed",
            1,
            &[
                ("method", Value::from(tool)),
                ("success", Value::from(success)),
            ],
        );
        self.histogram(
            "corsac.tool_call.duration_ms",
            duration_ms as f64,
            &[("method", Value::from(tool))],
        );
    }

    /// Record a session lifecycle event (created, resumed, closed, ...).
    pub fn session_event(&self, session_id: &str, event: &str) {
        self.log(
            LogLevel::Info,
            "session event",
            &[
                ("session_id", Value::from(session_id)),
                ("error", Value::Null),
                ("type", Value::from(event)),
            ],
        );
        self.counter(
            "corsac.session.events",
            1,
            &[("type", Value::from(event))],
        );
    }

    // ---- routing -------------------------------------------------------

    /// The single routing point shared by every remote call, so all
    /// methods have identical fallback semantics.
    fn route<T>(&self, call: impl FnOnce(&dyn TelemetryClient) -> anyhow::Result<T>) -> Route<T> {
        if *self.read_state() != AdapterState::Initialized {
            return Route::Unavailable;
        }
        match self.client.as_deref() {
            None => Route::Unavailable,
            Some(client) => match call(client) {
                Ok(value) => Route::Primary(value),
                Err(_) => Route::Failed,
            },
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, AdapterState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AdapterState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One local fallback line with the protocol severity mapped onto the
/// `tracing` scale.
fn local_log(level: LogLevel, message: &str, attrs: &[(&str, Value)]) {
    let attrs: Map<String, Value> = attrs
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect();
    let attrs = Value::Object(attrs);

    match level {
        LogLevel::Debug => {
            tracing::debug!(level = %level, attrs = %attrs, "{}", message);
        }
        LogLevel::Info | LogLevel::Notice => {
            tracing::info!(level = %level, attrs = %attrs, "{}", message);
        }
        LogLevel::Warning => {
            tracing::warn!(level = %level, attrs = %attrs, "{}", message);
        }
        LogLevel::Error | LogLevel::Critical | LogLevel::Alert | LogLevel::Emergency => {
            tracing::error!(level = %level, attrs = %attrs, "{}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Client that records every call and always succeeds.
    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<String>>,
        next_span: AtomicU64,
    }

    impl RecordingClient {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl TelemetryClient for RecordingClient {
        fn initialize(&self) -> anyhow::Result<()> {
            self.record("initialize".to_string());
            Ok(())
        }

        fn shutdown(&self) -> anyhow::Result<()> {
            self.record("shutdown".to_string());
            Ok(())
        }

        fn flush(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn log(
            &self,
            level: LogLevel,
            message: &str,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            self.record(format!("log:{}:{}", level, message));
            Ok(())
        }

        fn record_counter(
            &self,
            name: &str,
            value: u64,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            self.record(format!("counter:{}:{}", name, value));
            Ok(())
        }

        fn record_gauge(
            &self,
            name: &str,
            _value: f64,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            self.record(format!("gauge:{}", name));
            Ok(())
        }

        fn record_histogram(
            &self,
            name: &str,
            _value: f64,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            self.record(format!("histogram:{}", name));
            Ok(())
        }

        fn start_span(&self, name: &str, _attrs: &[(&str, Value)]) -> anyhow::Result<SpanHandle> {
            let id = self.next_span.fetch_add(1, Ordering::Relaxed) + 1;
            self.record(format!("start_span:{}:{}", name, id));
            Ok(SpanHandle::new(id))
        }

        fn end_span(&self, span: &SpanHandle, error: Option<&str>) -> anyhow::Result<()> {
            self.record(format!(
                "end_span:{}:{}",
                span.id().unwrap(),
                error.unwrap_or("ok")
            ));
            Ok(())
        }

        fn span_event(
            &self,
            span: &SpanHandle,
            name: &str,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            self.record(format!("span_event:{}:{}", span.id().unwrap(), name));
            Ok(())
        }
    }

    /// Client that fails every call.
    struct FailingClient;

    impl TelemetryClient for FailingClient {
        fn initialize(&self) -> anyhow::Result<()> {
            anyhow::bail!("unreachable collector")
        }

        fn shutdown(&self) -> anyhow::Result<()> {
            anyhow::bail!("unreachable collector")
        }

        fn flush(&self) -> anyhow::Result<()> {
            anyhow::bail!("unreachable collector")
        }

        fn log(
            &self,
            _level: LogLevel,
            _message: &str,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            anyhow::bail!("unreachable collector")
        }

        fn record_counter(
            &self,
            _name: &str,
            _value: u64,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            anyhow::bail!("unreachable collector")
        }

        fn record_gauge(
            &self,
            _name: &str,
            _value: f64,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            anyhow::bail!("unreachable collector")
        }

        fn record_histogram(
            &self,
            _name: &str,
            _value: f64,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            anyhow::bail!("unreachable collector")
        }

        fn start_span(&self, _name: &str, _attrs: &[(&str, Value)]) -> anyhow::Result<SpanHandle> {
            anyhow::bail!("unreachable collector")
        }

        fn end_span(&self, _span: &SpanHandle, _error: Option<&str>) -> anyhow::Result<()> {
            anyhow::bail!("unreachable collector")
        }

        fn span_event(
            &self,
            _span: &SpanHandle,
            _name: &str,
            _attrs: &[(&str, Value)],
        ) -> anyhow::Result<()> {
            anyhow::bail!("unreachable collector")
        }
    }

    fn recording_exporter() -> (Arc<RecordingClient>, TelemetryExporter) {
        let client = Arc::new(RecordingClient::default());
        let exporter = TelemetryExporter::new(Some(client.clone() as Arc<dyn TelemetryClient>));
        (client, exporter)
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (client, exporter) = recording_exporter();

        exporter.initialize();
        exporter.initialize();
        assert!(exporter.is_initialized());
        assert_eq!(client.calls(), vec!["initialize"]);
    }

    #[test]
    fn test_lifecycle_transitions_happen_once() {
        let (client, exporter) = recording_exporter();

        // Shutdown before initialize is a no-op
        exporter.shutdown();
        assert!(client.calls().is_empty());

        exporter.initialize();
        exporter.shutdown();
        assert!(!exporter.is_initialized());

        // Re-initializing after shutdown succeeds without reviving the
        // backend
        exporter.initialize();
        assert!(!exporter.is_initialized());
        exporter.shutdown();
        assert_eq!(client.calls(), vec!["initialize", "shutdown"]);
    }

    #[test]
    fn test_calls_before_initialize_do_not_reach_client() {
        let (client, exporter) = recording_exporter();

        exporter.log(LogLevel::Info, "early", &[]);
        exporter.counter("c", 1, &[]);
        assert_eq!(exporter.start_span("op", &[]), SpanHandle::NONE);
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_primary_path_once_initialized() {
        let (client, exporter) = recording_exporter();
        exporter.initialize();

        exporter.log(LogLevel::Warning, "hello", &[("k", json!(1))]);
        exporter.counter("corsac.test", 2, &[]);

        let calls = client.calls();
        assert!(calls.contains(&"log:warning:hello".to_string()));
        assert!(calls.contains(&"counter:corsac.test:2".to_string()));
    }

    /// Shared in-memory writer for capturing local fallback output.
    #[derive(Clone, Default)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl SharedWriter {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl std::io::Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedWriter {
        type Writer = SharedWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_local<F: FnOnce()>(f: F) -> String {
        let writer = SharedWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        writer.contents()
    }

    #[test]
    fn test_failing_client_logs_fall_back_with_one_local_line() {
        let exporter = TelemetryExporter::new(Some(Arc::new(FailingClient)));
        exporter.initialize();

        let output = capture_local(|| {
            exporter.log(LogLevel::Warning, "collector down", &[]);
        });

        let lines: Vec<&str> = output.lines().filter(|l| l.contains("collector down")).collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("WARN"));
    }

    #[test]
    fn test_failing_client_metric_and_span_failures_stay_silent() {
        let exporter = TelemetryExporter::new(Some(Arc::new(FailingClient)));
        exporter.initialize();

        let output = capture_local(|| {
            exporter.counter("c", 1, &[]);
            exporter.histogram("h", 1.0, &[]);
            let span = exporter.start_span("op", &[]);
            exporter.end_span(&span, None);
        });

        assert!(output.is_empty());
    }

    #[test]
    fn test_uninitialized_exporter_logs_locally() {
        let (client, exporter) = recording_exporter();

        let output = capture_local(|| {
            exporter.log(LogLevel::Error, "too early", &[]);
        });

        assert!(client.calls().is_empty());
        assert!(output.contains("ERROR"));
        assert!(output.contains("too early"));
    }

    #[test]
    fn test_failing_client_never_panics_or_errors() {
        let exporter = TelemetryExporter::new(Some(Arc::new(FailingClient)));
        exporter.initialize();
        assert!(exporter.is_initialized());

        exporter.log(LogLevel::Error, "boom", &[]);
        exporter.counter("c", 1, &[]);
        exporter.gauge("g", 0.5, &[]);
        exporter.histogram("h", 10.0, &[]);

        let span = exporter.start_span("op", &[]);
        assert_eq!(span, SpanHandle::NONE);
        exporter.end_span(&span, Some("ignored"));
        exporter.span_event(&span, "event", &[]);

        exporter.shutdown();
        assert!(!exporter.is_initialized());
    }

    #[test]
    fn test_from_config_disabled_ignores_client() {
        let client = Arc::new(RecordingClient::default());
        let config = ExporterConfig {
            enabled: false,
            endpoint: String::new(),
            auth_token: None,
            fallback_enabled: true,
            sample_rate: 1.0,
            sample_always_level: LogLevel::Warning,
        };

        let exporter =
            TelemetryExporter::from_config(&config, Some(client.clone() as Arc<dyn TelemetryClient>));
        exporter.initialize();
        exporter.log(LogLevel::Info, "ignored backend", &[]);
        exporter.shutdown();

        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_disabled_exporter_routes_logs_locally() {
        let exporter = TelemetryExporter::disabled();
        exporter.initialize();

        // Nothing to assert on a remote side; the point is these are
        // infallible and silent.
        exporter.log(LogLevel::Notice, "local only", &[]);
        exporter.counter("dropped", 1, &[]);
        assert_eq!(exporter.start_span("op", &[]), SpanHandle::NONE);
    }

    #[test]
    fn test_traced_returns_ok_unchanged() {
        let (client, exporter) = recording_exporter();
        exporter.initialize();

        let result: Result<u32, String> = exporter.traced("op", &[], || Ok(7));
        assert_eq!(result, Ok(7));
        assert!(client.calls().contains(&"end_span:1:ok".to_string()));
    }

    #[test]
    fn test_traced_returns_error_unchanged_and_ends_span_once() {
        let (client, exporter) = recording_exporter();
        exporter.initialize();

        let result: Result<(), String> =
            exporter.traced("op", &[], || Err("tool exploded".to_string()));
        assert_eq!(result, Err("tool exploded".to_string()));

        let ends: Vec<String> = client
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("end_span:"))
            .collect();
        assert_eq!(ends, vec!["end_span:1:tool exploded"]);
    }

    #[test]
    fn test_traced_without_backend_runs_operation() {
        let exporter = TelemetryExporter::disabled();
        exporter.initialize();

        let result: Result<&str, String> = exporter.traced("op", &[], || Ok("done"));
        assert_eq!(result, Ok("done"));
    }

    #[test]
    fn test_protocol_conveniences_reach_primary() {
        let (client, exporter) = recording_exporter();
        exporter.initialize();

        exporter.request_received("tools/call", "42", Some("sess-1"));
        exporter.response_completed("tools/call", "42", Duration::from_millis(12), None);
        exporter.tool_call("search", Some("sess-1"), Duration::from_millis(5), Some("timeout"));
        exporter.session_event("sess-1", "created");

        let calls = client.calls();
        assert!(calls.contains(&"log:info:request received".to_string()));
        assert!(calls.contains(&"counter:corsac.requests.received:1".to_string()));
        assert!(calls.contains(&"histogram:corsac.request.duration_ms".to_string()));
        assert!(calls.contains(&"log:error:tool call completed".to_string()));
        assert!(calls.contains(&"counter:corsac.session.events:1".to_string()));
    }
}
