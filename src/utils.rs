pub mod context;
pub mod file;
pub mod hash;
pub mod icon;
pub mod id;
pub mod logging;
pub mod thread;
pub mod toml;
