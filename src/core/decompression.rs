use crate::models::error::SError;
use crate::utils::file::FileUtils;
use camino::Utf8Path;
use std::fs::{self, File};
use std::io;
use tracing::debug;

pub struct Decompression;

impl Decompression {
    /// Unpacks `archive_path` into `destination`, then lifts the payload out of a single
    /// wrapping folder if the archive has one.
    pub fn unpack(archive_path: &Utf8Path, destination: &Utf8Path) -> Result<(), SError> {
        if !archive_path.is_file() {
            return Err(SError::IOError(format!("archive not found: {archive_path}")));
        }
        FileUtils::remove_dir_if_exists(destination)?;
        fs::create_dir_all(destination)?;

        Self::extract(archive_path, destination)?;
        Self::flatten_single_root(destination)
    }

    pub fn extract(archive_path: &Utf8Path, destination: &Utf8Path) -> Result<(), SError> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;

            // enclosed_name() rejects entries escaping the destination (zip slip).
            let safe_path = match file.enclosed_name() {
                Some(path) => path.to_owned(),
                None => continue,
            };

            let output_path = destination.as_std_path().join(&safe_path);

            if file.is_dir() {
                fs::create_dir_all(&output_path)?;
            } else {
                if let Some(parent) = output_path.parent() {
                    if !parent.exists() {
                        fs::create_dir_all(parent)?;
                    }
                }

                let mut outfile = File::create(&output_path)?;
                io::copy(&mut file, &mut outfile)?;
            }
        }

        Ok(())
    }

    /// Packages are often zipped as `name/…`; move the contents of a lone top-level
    /// directory up one level.
    pub fn flatten_single_root(destination: &Utf8Path) -> Result<(), SError> {
        let mut entries = fs::read_dir(destination)?.collect::<Result<Vec<_>, _>>()?;
        if entries.len() != 1 || !entries[0].file_type()?.is_dir() {
            return Ok(());
        }

        let wrapper = entries.remove(0).path();
        // Rename first so a child sharing the wrapper's name can move up without clashing.
        let parked = destination
            .as_std_path()
            .join(format!(".flatten-{}", uuid::Uuid::new_v4().simple()));
        fs::rename(&wrapper, &parked)?;

        let parked = camino::Utf8PathBuf::from_path_buf(parked)
            .map_err(|p| SError::ParseError(format!("Invalid UTF-8 path: {p:?}")))?;
        debug!("flattening wrapper directory in {destination}");
        FileUtils::move_children(&parked, destination)
    }
}
