use crate::models::error::SError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

pub struct FileUtils;

impl FileUtils {
    pub fn remove_file_if_exists(path: &Utf8Path) -> Result<(), SError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn remove_dir_if_exists(path: &Utf8Path) -> Result<(), SError> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Hidden sibling used while a file is being written, e.g. `dir/.name.suffix`.
    pub fn sibling(path: &Utf8Path, suffix: &str) -> Utf8PathBuf {
        let name = path.file_name().unwrap_or("file");
        path.with_file_name(format!(".{name}.{suffix}"))
    }

    pub fn ensure_parent(path: &Utf8Path) -> Result<(), SError> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Creates the missing ancestors of `path`, recording each one in `created` before it
    /// is made, outermost first.
    pub fn create_parents(path: &Utf8Path, created: &mut Vec<Utf8PathBuf>) -> Result<(), SError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        let missing: Vec<&Utf8Path> = parent
            .ancestors()
            .take_while(|dir| !dir.as_str().is_empty() && !dir.exists())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        created.extend(missing.iter().rev().map(|dir| dir.to_path_buf()));
        fs::create_dir_all(parent)?;
        Ok(())
    }

    /// Removes `dirs` deepest first, skipping any that are not empty.
    pub fn prune_dirs(dirs: &[Utf8PathBuf]) {
        let mut dirs: Vec<&Utf8PathBuf> = dirs.iter().collect();
        dirs.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
        for dir in dirs {
            let _ = fs::remove_dir(dir);
        }
    }

    /// Moves every direct child of `src` into `dst`, then removes `src`.
    pub fn move_children(src: &Utf8Path, dst: &Utf8Path) -> Result<(), SError> {
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            let name = entry.file_name();
            fs::rename(entry.path(), dst.as_std_path().join(name))?;
        }
        fs::remove_dir(src)?;
        Ok(())
    }

    /// Lists files below `base` as relative paths, sorted.
    pub fn relative_files(base: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SError> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(base).min_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
                SError::ParseError(format!("Invalid UTF-8 path: {:?}", entry.path()))
            })?;
            files.push(path.strip_prefix(base)?.to_path_buf());
        }
        files.sort();
        Ok(files)
    }
}
