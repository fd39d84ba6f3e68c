use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Display)]
pub enum SError {
    #[display("network error: {_0}")]
    Network(String),
    #[display("package '{_0}' is not compatible")]
    IncompatiblePackage(String),
    #[display("file collision: {_0:?}")]
    FileCollision(Vec<String>),
    #[display("staged file missing: {_0}")]
    MissingStagedFile(String),
    #[display("backup missing for: {_0:?}")]
    BackupMissing(Vec<String>),
    #[display("content hash mismatch: {_0:?}")]
    IntegrityMismatch(Vec<String>),
    #[display("failed to persist registry: {_0}")]
    Persistence(String),
    #[display("a download is already in progress")]
    AlreadyDownloading,
    #[display("another operation is in progress: {_0}")]
    OperationInProgress(String),
    #[display("operation cancelled")]
    Cancelled,
    #[display("mod not found: {_0}")]
    ModNotFound(String),
    #[display("mod is not available for install: {_0}")]
    ModNotAvailable(String),
    #[display("mod is not installed: {_0}")]
    ModNotInstalled(String),
    #[display("incomplete mod record: {_0}")]
    IncompleteRecord(String),
    #[display("duplicate slug: {_0}")]
    DuplicateSlug(String),
    #[display("invalid registry: {_0}")]
    InvalidRegistry(String),
    #[display("invalid target root: {_0}")]
    InvalidTargetRoot(String),
    #[display("target root disappeared: {_0}")]
    TargetRootMissing(String),
    #[display("io error: {_0}")]
    IOError(String),
    #[display("parse error: {_0}")]
    ParseError(String),
    #[display("async runtime error: {_0}")]
    AsyncRuntimeError(String),
    #[display("unexpected: {_0:?}")]
    Unexpected(Option<String>),
}

impl std::error::Error for SError {}

impl From<std::io::Error> for SError {
    fn from(e: std::io::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<walkdir::Error> for SError {
    fn from(e: walkdir::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<zip::result::ZipError> for SError {
    fn from(e: zip::result::ZipError) -> Self {
        SError::ParseError(format!("archive: {e}"))
    }
}

impl From<serde_json::Error> for SError {
    fn from(e: serde_json::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<toml::de::Error> for SError {
    fn from(e: toml::de::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<toml::ser::Error> for SError {
    fn from(e: toml::ser::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<chrono::ParseError> for SError {
    fn from(e: chrono::ParseError) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<std::path::StripPrefixError> for SError {
    fn from(e: std::path::StripPrefixError) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<confy::ConfyError> for SError {
    fn from(e: confy::ConfyError) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<ureq::Error> for SError {
    fn from(e: ureq::Error) -> Self {
        SError::Network(e.to_string())
    }
}
