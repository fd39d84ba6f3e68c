use crate::models::error::SError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

macro_rules! define_paths {
    ($name:ident { $($field:ident : $default:expr),* $(,)? }) => {
        #[derive(Clone, Debug)]
        pub struct $name {
            $(pub $field: Utf8PathBuf,)*
        }

        impl $name {
            pub fn to_absolute(mut self, base: &Utf8Path) -> Self {
                $(self.$field = base.join(self.$field);)*
                self
            }

            pub fn new(base: &Utf8Path) -> Self {
                Self::default().to_absolute(base)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default.into(),)*
                }
            }
        }
    };
}

define_paths!(ManagerPaths {
    mods: "mods",
    backups: "backups",
    thumbnails: "thumbnails",
    downloads: "downloads",
    logs: "logs",
    registry: "registry.toml",
});

impl ManagerPaths {
    pub fn ensure_dirs(&self) -> Result<(), SError> {
        for dir in [&self.mods, &self.backups, &self.thumbnails, &self.downloads] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn staged_dir(&self, slug: &str) -> Utf8PathBuf {
        self.mods.join(slug)
    }

    pub fn thumbnail(&self, file_name: &str) -> Utf8PathBuf {
        self.thumbnails.join(file_name)
    }
}

/// Shape the target tree must have before anything is written into it.
///
/// `marker` is resolved against the root and may climb out of it (`../../pso2.exe`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TargetLayout {
    pub dir_name: Option<String>,
    pub marker: Utf8PathBuf,
}

impl Default for TargetLayout {
    fn default() -> Self {
        Self {
            dir_name: Some("win32".into()),
            marker: "../../pso2.exe".into(),
        }
    }
}

impl TargetLayout {
    pub fn validate(&self, root: &Utf8Path) -> Result<(), SError> {
        if !root.is_dir() {
            return Err(SError::TargetRootMissing(root.to_string()));
        }

        if let Some(expected) = &self.dir_name {
            if root.file_name() != Some(expected.as_str()) {
                return Err(SError::InvalidTargetRoot(format!(
                    "{root} is not a '{expected}' directory"
                )));
            }
        }

        let marker = root.join(&self.marker);
        if !marker.is_file() {
            return Err(SError::InvalidTargetRoot(format!("marker {marker} not found")));
        }

        Ok(())
    }
}
