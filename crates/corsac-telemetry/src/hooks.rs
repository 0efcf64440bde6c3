//! Composable enrichment hooks applied to records before dispatch

use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::exporter::TelemetryExporter;
use crate::level::LogLevel;
use crate::record::{LogContext, LogRecord, TraceInfo};

/// Outcome of a single hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Keep processing the record.
    Continue,
    /// Discard the record without dispatching it.
    Suppress,
}

/// One enrichment/observation step applied to each outgoing record.
///
/// Hooks run in registration order, each seeing the effects of prior
/// hooks. The signature is infallible on purpose: a hook cannot abort
/// emission of the underlying application event.
pub trait Hook: Send + Sync {
    fn process(&self, ctx: &LogContext, record: &mut LogRecord) -> HookAction;
}

/// Ordered hook chain.
///
/// Children run in insertion order. A panicking child is caught and
/// skipped for that record, so a broken hook implementation never takes
/// the application event down with it.
#[derive(Default)]
pub struct CompositeHook {
    children: Vec<Arc<dyn Hook>>,
}

impl CompositeHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Arc<dyn Hook>) {
        self.children.push(hook);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Hook for CompositeHook {
    fn process(&self, ctx: &LogContext, record: &mut LogRecord) -> HookAction {
        for child in &self.children {
            match catch_unwind(AssertUnwindSafe(|| child.process(ctx, &mut *record))) {
                Ok(HookAction::Continue) => {}
                Ok(HookAction::Suppress) => return HookAction::Suppress,
                Err(_) => {
                    tracing::warn!(
                        telemetry.event = "hook_panicked",
                        "Log hook panicked; skipped for this record"
                    );
                }
            }
        }
        HookAction::Continue
    }
}

/// Reports the active trace/span identifiers for a call, when a valid
/// pair exists.
pub trait SpanContextProvider: Send + Sync {
    fn span_context(&self, ctx: &LogContext) -> Option<TraceInfo>;
}

/// Default provider: reads the trace info the request layer stored on
/// the ambient context.
#[derive(Debug, Default)]
pub struct ContextTraceProvider;

impl SpanContextProvider for ContextTraceProvider {
    fn span_context(&self, ctx: &LogContext) -> Option<TraceInfo> {
        ctx.trace().cloned()
    }
}

/// Injects `trace_id`/`span_id` fields from the ambient tracing context.
pub struct TraceContextHook {
    provider: Arc<dyn SpanContextProvider>,
}

impl TraceContextHook {
    pub fn new(provider: Arc<dyn SpanContextProvider>) -> Self {
        Self { provider }
    }
}

impl Hook for TraceContextHook {
    fn process(&self, ctx: &LogContext, record: &mut LogRecord) -> HookAction {
        if let Some(trace) = self.provider.span_context(ctx) {
            record.insert_extra("trace_id", Value::from(trace.trace_id));
            record.insert_extra("span_id", Value::from(trace.span_id));
        }
        HookAction::Continue
    }
}

/// Tags records with the session id from the ambient context.
#[derive(Debug, Default)]
pub struct SessionHook;

impl Hook for SessionHook {
    fn process(&self, ctx: &LogContext, record: &mut LogRecord) -> HookAction {
        if let Some(session_id) = ctx.session_id() {
            record.insert_extra("session_id", Value::from(session_id));
        }
        HookAction::Continue
    }
}

/// Copies an allow-list of context keys into the record's extra fields.
pub struct ContextFieldHook {
    keys: Vec<String>,
}

impl ContextFieldHook {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

impl Hook for ContextFieldHook {
    fn process(&self, ctx: &LogContext, record: &mut LogRecord) -> HookAction {
        for key in &self.keys {
            if let Some(value) = ctx.value(key) {
                record.insert_extra(key, value.clone());
            }
        }
        HookAction::Continue
    }
}

/// Counter capability incremented once per record, keyed by severity.
pub trait RecordCounter: Send + Sync {
    fn increment(&self, level: LogLevel);
}

/// Production counter backed by the `metrics` registry.
#[derive(Debug, Default)]
pub struct MetricsRecordCounter;

impl RecordCounter for MetricsRecordCounter {
    fn increment(&self, level: LogLevel) {
        metrics::counter!("corsac.log.records", "level" => level.to_string()).increment(1);
    }
}

/// Increments an external counter for every record that reaches it.
pub struct LevelCounterHook {
    counter: Arc<dyn RecordCounter>,
}

impl LevelCounterHook {
    pub fn new(counter: Arc<dyn RecordCounter>) -> Self {
        Self { counter }
    }
}

impl Hook for LevelCounterHook {
    fn process(&self, _ctx: &LogContext, record: &mut LogRecord) -> HookAction {
        self.counter.increment(record.level);
        HookAction::Continue
    }
}

/// Probabilistically discards low-severity records.
///
/// Records at or above the always-log threshold are never sampled away.
/// Below it, a record passes only when the monotonically increasing call
/// counter lands on the sampling interval (`round(1/rate)`, minimum 1).
/// The counter wraps at `u64::MAX`; at that scale the momentary cadence
/// disturbance is immaterial.
pub struct SamplingHook {
    interval: u64,
    always_at: LogLevel,
    counter: AtomicU64,
}

impl SamplingHook {
    pub fn new(rate: f64, always_at: LogLevel) -> Self {
        let interval = if rate > 0.0 {
            ((1.0 / rate).round() as u64).max(1)
        } else {
            u64::MAX
        };
        Self {
            interval,
            always_at,
            counter: AtomicU64::new(0),
        }
    }
}

impl Hook for SamplingHook {
    fn process(&self, _ctx: &LogContext, record: &mut LogRecord) -> HookAction {
        if record.level.should_emit(self.always_at) {
            return HookAction::Continue;
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        if n % self.interval == 0 {
            HookAction::Continue
        } else {
            HookAction::Suppress
        }
    }
}

/// Mirrors each record onto the context's active span as a span event.
///
/// Records at `error` severity or above carry an `error: true` attribute
/// so the backend marks the span failed.
pub struct SpanEventHook {
    exporter: Arc<TelemetryExporter>,
}

impl SpanEventHook {
    pub fn new(exporter: Arc<TelemetryExporter>) -> Self {
        Self { exporter }
    }
}

impl Hook for SpanEventHook {
    fn process(&self, ctx: &LogContext, record: &mut LogRecord) -> HookAction {
        let span = ctx.span();
        if span.is_active() {
            let failed = record.level >= LogLevel::Error;
            self.exporter.span_event(
                span,
                "log",
                &[
                    ("level", Value::from(record.level.as_str())),
                    ("data", record.data.clone()),
                    ("error", Value::from(failed)),
                ],
            );
        }
        HookAction::Continue
    }
}
