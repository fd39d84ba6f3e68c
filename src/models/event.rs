use crate::models::mod_dto::Mod;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ErrorKind {
    Network,
    Persistence,
    Integrity,
    Operation,
}

/// Notifications pushed to the shell. The core owns the lists; these carry snapshots.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ModEvent {
    AvailableChanged(Vec<Mod>),
    InstalledChanged(Vec<Mod>),
    SelectionChanged(Option<String>),
    DownloadStarted { url: String },
    DownloadProgress { percent: u8 },
    DownloadComplete { slug: String },
    DownloadFailed { message: String },
    ModBroken { slug: String },
    UpdateAvailable { slug: String },
    Error { kind: ErrorKind, message: String },
}
