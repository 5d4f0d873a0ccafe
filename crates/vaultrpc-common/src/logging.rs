//! Structured event logging collaborator.
//!
//! The transport reports notable events (`rpc.timing`,
//! `rpc.malformed_payload`, ...) through the [`Logger`] trait. Logging is
//! fire-and-forget: [`Logger::log`] is synchronous, never fails, and never
//! waits on the underlying sink. Persisted events can be read back through
//! [`Logger::list`]; loggers that keep nothing return an empty page.
//!
//! # Implementations
//!
//! - [`VoidLogger`]: builds events and drops them
//! - [`TracingLogger`]: forwards events to `tracing`
//! - [`MultiLogger`]: fans out to several loggers, the first one is primary
//! - [`BackgroundLogger`]: queues events to a task that persists them
//!   through a [`LogSink`], swallowing sink failures

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;

use crate::protocol::{DeviceInfo, Location};

static EVENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Account the event is attributed to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Who and where an event came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// A single logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub time: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,
}

impl LogEvent {
    pub fn new(kind: impl Into<String>, data: Option<Value>, context: Option<LogContext>) -> Self {
        let time = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            id: generate_event_id(time),
            time,
            kind: kind.into(),
            data,
            context,
        }
    }
}

fn generate_event_id(time_ms: u64) -> String {
    // Upper bits from the clock, lower bits from a process-wide counter.
    let counter = EVENT_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{:012x}{:08x}", time_ms, counter & 0xFFFF_FFFF)
}

/// Page of persisted events to read back, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogQuery {
    /// Only events of this type
    pub kind: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, event: &LogEvent) -> bool {
        self.kind.as_deref().map_or(true, |kind| event.kind == kind)
    }

    /// Filters and pages `events`, which must already be in time order.
    pub fn apply<'a>(&self, events: impl IntoIterator<Item = &'a LogEvent>) -> Vec<LogEvent> {
        events
            .into_iter()
            .filter(|event| self.matches(event))
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Fire-and-forget structured event logger.
#[async_trait]
pub trait Logger: Send + Sync {
    /// Records an event and returns it. Must not block or fail.
    fn log(&self, kind: &str, data: Option<Value>) -> LogEvent;

    /// Returns a logger that attaches `context` to every event.
    fn with_context(&self, context: LogContext) -> Arc<dyn Logger>;

    /// Reads back persisted events. Loggers without storage return nothing.
    async fn list(&self, _query: LogQuery) -> anyhow::Result<Vec<LogEvent>> {
        Ok(Vec::new())
    }
}

/// Builds events and discards them.
#[derive(Debug, Clone, Default)]
pub struct VoidLogger {
    context: Option<LogContext>,
}

impl VoidLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for VoidLogger {
    fn log(&self, kind: &str, data: Option<Value>) -> LogEvent {
        LogEvent::new(kind, data, self.context.clone())
    }

    fn with_context(&self, context: LogContext) -> Arc<dyn Logger> {
        Arc::new(VoidLogger {
            context: Some(context),
        })
    }
}

/// Emits every event as a `tracing` info event on the `vaultrpc::events`
/// target.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    context: Option<LogContext>,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for TracingLogger {
    fn log(&self, kind: &str, data: Option<Value>) -> LogEvent {
        let event = LogEvent::new(kind, data, self.context.clone());
        let data = event
            .data
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        tracing::info!(target: "vaultrpc::events", id = %event.id, kind = %event.kind, data = %data);
        event
    }

    fn with_context(&self, context: LogContext) -> Arc<dyn Logger> {
        Arc::new(TracingLogger {
            context: Some(context),
        })
    }
}

/// Fans events out to several loggers.
///
/// The event returned is the one produced by the first (primary) logger.
#[derive(Clone)]
pub struct MultiLogger {
    loggers: Vec<Arc<dyn Logger>>,
}

impl MultiLogger {
    pub fn new(loggers: Vec<Arc<dyn Logger>>) -> Self {
        Self { loggers }
    }
}

#[async_trait]
impl Logger for MultiLogger {
    fn log(&self, kind: &str, data: Option<Value>) -> LogEvent {
        let mut loggers = self.loggers.iter();
        let Some(primary) = loggers.next() else {
            return LogEvent::new(kind, data, None);
        };

        let event = primary.log(kind, data.clone());
        for logger in loggers {
            logger.log(kind, data.clone());
        }
        event
    }

    fn with_context(&self, context: LogContext) -> Arc<dyn Logger> {
        Arc::new(MultiLogger {
            loggers: self
                .loggers
                .iter()
                .map(|logger| logger.with_context(context.clone()))
                .collect(),
        })
    }

    /// Reads from the primary logger only.
    async fn list(&self, query: LogQuery) -> anyhow::Result<Vec<LogEvent>> {
        match self.loggers.first() {
            Some(primary) => primary.list(query).await,
            None => Ok(Vec::new()),
        }
    }
}

/// Persistent destination for log events.
#[async_trait]
pub trait LogSink: Send + Sync + 'static {
    async fn save(&self, event: LogEvent) -> anyhow::Result<()>;

    async fn list(&self, _query: LogQuery) -> anyhow::Result<Vec<LogEvent>> {
        Ok(Vec::new())
    }
}

/// Logger that persists events from a background task.
///
/// [`Logger::log`] only enqueues the event. A task spawned on the current
/// tokio runtime drains the queue into the sink; sink errors are reported
/// through `tracing` and otherwise ignored. The task ends once every clone
/// of the logger has been dropped. [`Logger::list`] goes straight to the
/// sink, so events still in the queue are not visible yet.
#[derive(Clone)]
pub struct BackgroundLogger {
    queue: mpsc::UnboundedSender<LogEvent>,
    sink: Arc<dyn LogSink>,
    context: Option<LogContext>,
}

impl BackgroundLogger {
    /// Spawns the writer task. Must be called from within a tokio runtime.
    pub fn spawn<S: LogSink>(sink: S) -> Self {
        let (queue, mut events) = mpsc::unbounded_channel::<LogEvent>();
        let sink: Arc<dyn LogSink> = Arc::new(sink);
        let writer = sink.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let id = event.id.clone();
                if let Err(e) = writer.save(event).await {
                    tracing::warn!("Failed to persist log event {}: {}", id, e);
                }
            }
        });

        Self {
            queue,
            sink,
            context: None,
        }
    }
}

#[async_trait]
impl Logger for BackgroundLogger {
    fn log(&self, kind: &str, data: Option<Value>) -> LogEvent {
        let event = LogEvent::new(kind, data, self.context.clone());
        if self.queue.send(event.clone()).is_err() {
            tracing::debug!("Log writer stopped, dropping event {}", event.id);
        }
        event
    }

    fn with_context(&self, context: LogContext) -> Arc<dyn Logger> {
        Arc::new(BackgroundLogger {
            queue: self.queue.clone(),
            sink: self.sink.clone(),
            context: Some(context),
        })
    }

    async fn list(&self, query: LogQuery) -> anyhow::Result<Vec<LogEvent>> {
        self.sink.list(query).await
    }
}
