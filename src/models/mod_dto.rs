use camino::Utf8PathBuf;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Mod {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub author: String,
    pub description: String,
    pub thumbnail: String,
    pub source_url: String,
    pub package_url: String,
    pub last_modified: NaiveDateTime,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub update_available: bool,
    #[serde(default)]
    pub needs_repair: bool,
    #[serde(skip)]
    pub busy: bool,
    #[serde(skip)]
    pub broken: bool,
    // Written target-relative paths; only set while installed.
    #[serde(default)]
    pub files: Vec<Utf8PathBuf>,
    // Hash of the file that existed at each path before install.
    #[serde(default)]
    pub contents_hash: BTreeMap<Utf8PathBuf, String>,
}

impl Mod {
    /// Mods created from a local archive only carry a name and a slug.
    pub fn is_complete(&self) -> bool {
        let base = !self.slug.trim().is_empty() && !self.name.trim().is_empty();
        if self.is_local {
            return base;
        }
        base && !self.id.is_empty() && !self.source_url.is_empty() && !self.package_url.is_empty()
    }

    pub fn clear_install_state(&mut self) {
        self.files.clear();
        self.contents_hash.clear();
        self.update_available = false;
        self.needs_repair = false;
        self.broken = false;
    }

    /// Short status suffix the shell shows next to the mod name.
    pub fn tool_info(&self) -> String {
        let mut info = String::new();
        if self.broken {
            info.push_str("(Broken)");
        }
        if self.needs_repair {
            info.push_str("(Needs Repair)");
        }
        if self.update_available {
            info.push_str("(Update Available)");
        }
        info
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModState {
    Available,
    Installed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ToggleOutcome {
    Installed,
    Uninstalled,
    Ignored,
}

/// Presenter data for the currently selected mod.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ModDetails {
    pub slug: String,
    pub name: String,
    pub author: String,
    pub description: String,
    pub state: ModState,
    pub tool_info: String,
    pub thumbnail_data: Option<String>,
    pub can_install_uninstall: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub can_view_online: bool,
}
