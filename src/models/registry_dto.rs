use crate::models::mod_dto::Mod;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// On-disk shape of `registry.toml`.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RegistryDTO {
    pub target_root: Utf8PathBuf,
    #[serde(default)]
    pub available: Vec<Mod>,
    #[serde(default)]
    pub installed: Vec<Mod>,
}
