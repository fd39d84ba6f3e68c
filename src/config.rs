use crate::core::copier::CopySettings;
use crate::models::paths::TargetLayout;
use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const APP_NAME: &str = "overlay_keeper";

pub const DEFAULT_API_BASE_URL: &str = "http://pso2mod.com/wp-json/wp/v2/posts/";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub version: u8,
    pub home: Utf8PathBuf,
    pub api_base_url: String,
    /// Where unmodified game files are fetched from when a backup is unusable.
    pub patch_base_url: Option<String>,
    pub target_layout: TargetLayout,
    pub reserved_files: Vec<String>,
    pub copy: CopySettings,
    pub http_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        let base_dir = ProjectDirs::from("com", "martes", APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe_path| exe_path.parent().map(|p| p.to_path_buf()))
            })
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            version: 0,
            home: Utf8PathBuf::from_path_buf(base_dir).unwrap_or_else(|_| Utf8PathBuf::from(".")),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            patch_base_url: None,
            target_layout: TargetLayout::default(),
            reserved_files: vec![
                "settings.csv".into(),
                "targets.csv".into(),
                "options.csv".into(),
            ],
            copy: CopySettings::default(),
            http_timeout_secs: 60,
        }
    }
}

impl AppSettings {
    pub fn load() -> Result<AppSettings, confy::ConfyError> {
        confy::load(APP_NAME, None)
    }

    /// Settings rooted at `home`, for portable setups and tests.
    pub fn with_home(home: impl Into<Utf8PathBuf>) -> Self {
        Self {
            home: home.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: AppSettings = toml::from_str(
            r#"
            home = "/tmp/ok"
            patch_base_url = "http://patch.example/"
            "#,
        )
        .unwrap();

        assert_eq!(settings.home, Utf8PathBuf::from("/tmp/ok"));
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.reserved_files.len(), 3);
        assert_eq!(settings.copy, CopySettings::default());
    }
}
