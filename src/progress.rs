//! Progress channel
//!
//! Ordered, append-only stream of typed events produced while a request runs.
//! Every stage holds a [`ProgressSender`]; the transport layer drains the
//! matching [`ProgressReceiver`]. Events are mirrored to `tracing` as they are
//! emitted.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Log,
    Nav,
    Info,
    Result,
    Abort,
    Error,
}

impl EventType {
    pub fn is_terminal(self) -> bool {
        matches!(self, EventType::Result | EventType::Abort | EventType::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub content: String,
    #[serde(rename = "eventType")]
    pub event_type: EventType,
}

impl ProgressEvent {
    pub fn new(event_type: EventType, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            event_type,
        }
    }
}

/// Create a connected sender/receiver pair for one request.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    pub fn emit(&self, event: ProgressEvent) {
        match event.event_type {
            EventType::Log => debug!(target: "statq::progress", "{}", event.content),
            EventType::Nav | EventType::Info => info!(target: "statq::progress", "{}", event.content),
            EventType::Result => info!(target: "statq::progress", "result ready ({} bytes)", event.content.len()),
            EventType::Abort => warn!(target: "statq::progress", "aborted: {}", event.content),
            EventType::Error => error!(target: "statq::progress", "{}", event.content),
        }
        // A dropped receiver means nobody is listening any more; the request still completes.
        let _ = self.tx.send(event);
    }

    pub fn log(&self, content: impl Into<String>) {
        self.emit(ProgressEvent::new(EventType::Log, content));
    }

    pub fn nav(&self, content: impl Into<String>) {
        self.emit(ProgressEvent::new(EventType::Nav, content));
    }

    pub fn info(&self, content: impl Into<String>) {
        self.emit(ProgressEvent::new(EventType::Info, content));
    }

    pub fn result(&self, content: impl Into<String>) {
        self.emit(ProgressEvent::new(EventType::Result, content));
    }

    pub fn abort(&self, content: impl Into<String>) {
        self.emit(ProgressEvent::new(EventType::Abort, content));
    }

    pub fn error(&self, content: impl Into<String>) {
        self.emit(ProgressEvent::new(EventType::Error, content));
    }
}

#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Next event, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Drain until every sender has been dropped.
    pub async fn collect(mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }
}
