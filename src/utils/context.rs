use crate::models::event::{ErrorKind, ModEvent};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// Outbound notification channel handed to the core at construction.
/// Sending never blocks, so it is safe from blocking worker threads.
#[derive(Clone, Debug, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<ModEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, UnboundedReceiver<ModEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: ModEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(event).is_err() {
            trace!("event receiver dropped");
        }
    }

    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) {
        self.emit(ModEvent::Error {
            kind,
            message: message.into(),
        });
    }
}
