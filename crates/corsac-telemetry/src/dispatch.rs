//! Leveled record dispatch with optional bounded buffering
//!
//! The central fan-out point: severity filtering, sanitization, the hook
//! chain, and handler fan-out all happen here, synchronously on the
//! calling thread. There is no background timer; the time-based flush
//! trigger is evaluated only when a new record arrives.

use serde_json::Value;
use std::mem;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::hooks::{CompositeHook, Hook, HookAction};
use crate::level::LogLevel;
use crate::record::{LogContext, LogRecord};
use crate::sanitization::Sanitizer;

/// A terminal sink invoked with each fully enriched record.
///
/// Handlers run while the dispatch lock is held, so they must be fast
/// and non-blocking; a slow handler serializes every concurrent caller
/// behind it.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &LogContext, record: &LogRecord);
}

/// Buffering parameters for a dispatcher.
#[derive(Debug, Clone)]
pub struct BufferPolicy {
    /// Flush when `pending` reaches this many records.
    pub capacity: usize,
    /// Flush when this much time has passed since the last flush, checked
    /// only when the next record arrives.
    pub flush_interval: Duration,
}

struct Buffer {
    policy: BufferPolicy,
    pending: Vec<(LogContext, LogRecord)>,
    last_flush: Instant,
}

struct Inner {
    handlers: Vec<Arc<dyn Handler>>,
    hooks: CompositeHook,
    buffer: Option<Buffer>,
}

/// One logical logger instance: filters by severity, sanitizes, runs the
/// hook chain, and fans records out to registered handlers, either
/// immediately or through a bounded buffer.
///
/// The public surface is infallible: nothing here can fail the caller's
/// request. One mutex protects the handler list, hook chain, and buffer;
/// it is held for the duration of a flush, including handler calls.
pub struct Dispatcher {
    name: String,
    min_level: AtomicU8,
    sanitizer: Option<Sanitizer>,
    inner: Mutex<Inner>,
}

impl Dispatcher {
    /// An unbuffered dispatcher: accepted records fan out immediately.
    pub fn new(name: &str, min_level: LogLevel) -> Self {
        Self::build(name, min_level, None)
    }

    /// A buffered dispatcher with size- and time-based flush triggers.
    pub fn buffered(name: &str, min_level: LogLevel, policy: BufferPolicy) -> Self {
        Self::build(name, min_level, Some(policy))
    }

    fn build(name: &str, min_level: LogLevel, policy: Option<BufferPolicy>) -> Self {
        Self {
            name: name.to_string(),
            min_level: AtomicU8::new(min_level.priority()),
            sanitizer: None,
            inner: Mutex::new(Inner {
                handlers: Vec::new(),
                hooks: CompositeHook::new(),
                buffer: policy.map(|policy| Buffer {
                    policy,
                    pending: Vec::new(),
                    last_flush: Instant::now(),
                }),
            }),
        }
    }

    /// Sanitize every accepted record's payload with `sanitizer`.
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current minimum level. Takes effect for the next record
    /// evaluated; buffered records are not re-filtered.
    pub fn level(&self) -> LogLevel {
        LogLevel::from_priority(self.min_level.load(Ordering::Relaxed))
    }

    /// Change the minimum level. Safe to call concurrently with
    /// dispatch.
    pub fn set_level(&self, level: LogLevel) {
        self.min_level.store(level.priority(), Ordering::Relaxed);
    }

    /// Register a terminal sink. Registration order is dispatch order.
    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.lock().handlers.push(handler);
    }

    /// Append a hook to the enrichment chain. Call before dispatch
    /// begins; hooks run in registration order.
    pub fn add_hook(&self, hook: Arc<dyn Hook>) {
        self.lock().hooks.push(hook);
    }

    /// Accept one record with the given payload.
    pub fn log(&self, ctx: &LogContext, level: LogLevel, data: Value) {
        if !level.should_emit(self.level()) {
            return;
        }
        self.emit(ctx, LogRecord::new(level, &self.name, data));
    }

    /// Accept a pre-built record.
    ///
    /// Severity filtering is the first, cheapest rejection point: a
    /// filtered record does no sanitization, enrichment, or buffering
    /// work and leaves the buffer untouched.
    pub fn emit(&self, ctx: &LogContext, mut record: LogRecord) {
        if !record.level.should_emit(self.level()) {
            return;
        }

        if let Some(sanitizer) = &self.sanitizer {
            record.data = sanitizer.sanitize_value(mem::take(&mut record.data));
        }

        let mut guard = self.lock();
        let inner = &mut *guard;

        if inner.hooks.process(ctx, &mut record) == HookAction::Suppress {
            return;
        }

        match &mut inner.buffer {
            None => {
                for handler in &inner.handlers {
                    handler.handle(ctx, &record);
                }
            }
            Some(buffer) => {
                buffer.pending.push((ctx.clone(), record));
                let size_due = buffer.pending.len() >= buffer.policy.capacity;
                let time_due = buffer.last_flush.elapsed() >= buffer.policy.flush_interval;
                if size_due || time_due {
                    Self::drain(buffer, &inner.handlers);
                }
            }
        }
    }

    /// Drain any buffered records unconditionally.
    ///
    /// Because the time trigger only fires when a record arrives, a
    /// logger that goes quiet holds its buffer indefinitely; callers
    /// needing bounded staleness invoke this on a timer or at shutdown.
    /// A no-op on an empty buffer.
    pub fn flush(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if let Some(buffer) = &mut inner.buffer {
            if buffer.pending.is_empty() {
                return;
            }
            Self::drain(buffer, &inner.handlers);
        }
    }

    /// Number of records currently awaiting flush.
    pub fn pending(&self) -> usize {
        self.lock()
            .buffer
            .as_ref()
            .map(|buffer| buffer.pending.len())
            .unwrap_or(0)
    }

    fn drain(buffer: &mut Buffer, handlers: &[Arc<dyn Handler>]) {
        for (ctx, record) in buffer.pending.drain(..) {
            for handler in handlers {
                handler.handle(&ctx, &record);
            }
        }
        buffer.last_flush = Instant::now();
    }

    // A panicking handler must not poison logging for the rest of the
    // process; the lock contents stay valid across an unwind.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
