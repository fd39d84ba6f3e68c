use crate::models::error::SError;
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};

/// Reserved user-editable settings files. They are never backed up, overwritten or
/// counted as touched.
pub fn is_reserved(path: &Utf8Path, reserved: &[String]) -> bool {
    path.file_name()
        .map(|name| reserved.iter().any(|r| r.eq_ignore_ascii_case(name)))
        .unwrap_or(false)
}

/// File list of a staged package, relative to the package root and therefore to the
/// target tree.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedManifest {
    pub root: Utf8PathBuf,
    pub files: Vec<Utf8PathBuf>,
}

impl StagedManifest {
    pub fn read(root: &Utf8Path, reserved: &[String]) -> Result<Self, SError> {
        if !root.is_dir() {
            return Err(SError::MissingStagedFile(root.to_string()));
        }

        let files = FileUtils::relative_files(root)?
            .into_iter()
            .filter(|f| !is_reserved(f, reserved))
            .collect();

        Ok(Self {
            root: root.to_owned(),
            files,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn source(&self, rel: &Utf8Path) -> Utf8PathBuf {
        self.root.join(rel)
    }
}
