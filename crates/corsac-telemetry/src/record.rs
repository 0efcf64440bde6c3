//! Log records and the ambient call context they travel with

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::exporter::SpanHandle;
use crate::level::LogLevel;

/// One structured, leveled observability event.
///
/// A record is created per call and enriched synchronously by the hook
/// chain before dispatch; handlers only ever see it behind a shared
/// reference.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub logger: String,
    /// Payload; may be any structured value (scalar, mapping, sequence).
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    /// Derived fields added by hooks, merged at the top level of the
    /// wire representation. Ordered so output is stable.
    pub extra: BTreeMap<String, Value>,
}

impl LogRecord {
    pub fn new(level: LogLevel, logger: &str, data: Value) -> Self {
        Self {
            level,
            logger: logger.to_string(),
            data,
            timestamp: Utc::now(),
            extra: BTreeMap::new(),
        }
    }

    /// Add a derived field. Used by enrichment hooks; later hooks see
    /// fields added by earlier ones.
    pub fn insert_extra(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }
}

/// Trace identifiers for an active span, in their string wire forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceInfo {
    pub trace_id: String,
    pub span_id: String,
}

/// Ambient per-call context carried alongside each record through hooks
/// and handlers.
///
/// The typed value bag is the lookup capability field-extraction hooks
/// read from; callers populate it with whatever request-scoped data they
/// want surfaced in records.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    request_id: Option<String>,
    session_id: Option<String>,
    trace: Option<TraceInfo>,
    span: SpanHandle,
    values: HashMap<String, Value>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }

    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn with_trace(mut self, trace: TraceInfo) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_span(mut self, span: SpanHandle) -> Self {
        self.span = span;
        self
    }

    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn trace(&self) -> Option<&TraceInfo> {
        self.trace.as_ref()
    }

    /// The span opened for the current operation, or the no-span
    /// sentinel when tracing is inactive.
    pub fn span(&self) -> &SpanHandle {
        &self.span
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}
