pub mod error;
pub mod event;
pub mod mod_dto;
pub mod paths;
pub mod registry_dto;
pub mod remote;
