use crate::models::error::SError;
use derive_more::Display;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum OperationKind {
    #[display("download")]
    Download,
    #[display("install")]
    Install,
    #[display("uninstall")]
    Uninstall,
    #[display("delete")]
    Delete,
    #[display("import")]
    Import,
    #[display("update check")]
    UpdateCheck,
}

/// Process-wide slot for the one long-running operation allowed at a time.
/// Nothing is queued: a second request fails immediately.
#[derive(Debug, Default)]
pub struct OperationGuard {
    current: Mutex<Option<OperationKind>>,
    cancel: AtomicBool,
}

/// Holds the slot until dropped.
#[derive(Debug)]
pub struct OperationTicket<'a> {
    guard: &'a OperationGuard,
    kind: OperationKind,
}

impl OperationGuard {
    pub fn try_begin(&self, kind: OperationKind) -> Result<OperationTicket<'_>, SError> {
        let mut current = self.current.lock();
        match *current {
            Some(OperationKind::Download) if kind == OperationKind::Download => {
                Err(SError::AlreadyDownloading)
            }
            Some(running) => Err(SError::OperationInProgress(running.to_string())),
            None => {
                *current = Some(kind);
                self.cancel.store(false, Ordering::SeqCst);
                debug!("operation started: {kind}");
                Ok(OperationTicket { guard: self, kind })
            }
        }
    }

    pub fn current(&self) -> Option<OperationKind> {
        *self.current.lock()
    }

    /// Asks the running operation to stop at its next chunk or file boundary.
    pub fn cancel(&self) -> bool {
        let running = self.current.lock().is_some();
        if running {
            self.cancel.store(true, Ordering::SeqCst);
        }
        running
    }

    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel
    }
}

impl OperationTicket<'_> {
    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.guard.cancel
    }
}

impl Drop for OperationTicket<'_> {
    fn drop(&mut self) {
        *self.guard.current.lock() = None;
        self.guard.cancel.store(false, Ordering::SeqCst);
        debug!("operation finished: {}", self.kind);
    }
}
