//! Outbound MCP log notifications

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::dispatch::Handler;
use crate::record::{LogContext, LogRecord};

/// Notification method log records are forwarded under.
pub const LOG_NOTIFICATION_METHOD: &str = "notifications/message";

/// Capability for sending protocol notifications to the connected
/// client. Supplied by the transport layer.
pub trait NotificationSender: Send + Sync {
    fn send(&self, method: &str, params: Value) -> anyhow::Result<()>;
}

/// Forwards dispatched records to the client as `notifications/message`.
///
/// Send failures are swallowed: a broken transport must never feed back
/// into logging, and there is nobody left to notify about it anyway.
pub struct NotificationHandler {
    sender: Arc<dyn NotificationSender>,
}

impl NotificationHandler {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self { sender }
    }

    /// Wire shape: `{level, logger, data}` with extra fields merged at
    /// the top level. Extras cannot shadow the three fixed keys.
    fn params(record: &LogRecord) -> Value {
        let mut params = Map::new();
        params.insert("level".to_string(), Value::from(record.level.as_str()));
        params.insert("logger".to_string(), Value::from(record.logger.clone()));
        params.insert("data".to_string(), record.data.clone());
        for (key, value) in &record.extra {
            params.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(params)
    }
}

impl Handler for NotificationHandler {
    fn handle(&self, _ctx: &LogContext, record: &LogRecord) {
        let _ = self.sender.send(LOG_NOTIFICATION_METHOD, Self::params(record));
    }
}
