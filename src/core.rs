pub mod acquisition;
pub mod collision;
pub mod content_registry;
pub mod copier;
pub mod decompression;
pub mod dto_builder;
pub mod integrity;
pub mod mod_backup;
pub mod mod_fs;
pub mod mod_manager;
pub mod operation;
pub mod registry;
pub mod remote;
