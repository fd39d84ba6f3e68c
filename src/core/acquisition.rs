use crate::core::copier::BufferedCopier;
use crate::core::decompression::Decompression;
use crate::core::remote::RemoteSource;
use crate::models::error::SError;
use crate::models::event::{ErrorKind, ModEvent};
use crate::models::mod_dto::Mod;
use crate::models::paths::ManagerPaths;
use crate::models::remote::RemoteModRecord;
use crate::utils::context::EventSink;
use crate::utils::file::FileUtils;
use crate::utils::icon::thumbnail_extension;
use crate::utils::id::{local_slug, sanitize_slug};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const ARCHIVE_NAME: &str = "package.zip";
const PAYLOAD_DIR: &str = "payload";

/// A fetched and unpacked package still sitting in its private work directory.
/// Nothing under the mods or thumbnails roots has changed yet.
#[derive(Clone, Debug)]
pub struct StagedDownload {
    pub work_dir: Utf8PathBuf,
    pub payload_dir: Utf8PathBuf,
    pub thumbnail: Option<Utf8PathBuf>,
    pub mod_info: Mod,
}

impl StagedDownload {
    pub fn discard(&self) {
        if let Err(e) = FileUtils::remove_dir_if_exists(&self.work_dir) {
            warn!("failed to clean up {}: {e}", self.work_dir);
        }
    }
}

pub struct AcquisitionService {
    downloads: Utf8PathBuf,
    api_base_url: String,
    remote: Arc<dyn RemoteSource>,
    copier: BufferedCopier,
}

impl AcquisitionService {
    pub fn new(
        paths: &ManagerPaths,
        api_base_url: &str,
        remote: Arc<dyn RemoteSource>,
        copier: BufferedCopier,
    ) -> Self {
        Self {
            downloads: paths.downloads.clone(),
            api_base_url: api_base_url.to_string(),
            remote,
            copier,
        }
    }

    /// Metadata URL of a remote mod, used for update checks and re-downloads.
    pub fn update_url(&self, m: &Mod) -> String {
        format!("{}/{}", self.api_base_url.trim_end_matches('/'), m.id)
    }

    /// Fetches metadata, thumbnail and archive for `url` and unpacks the archive.
    pub fn download(
        &self,
        url: &str,
        events: &EventSink,
        cancel: &AtomicBool,
    ) -> Result<StagedDownload, SError> {
        info!("fetching {url}");
        events.emit(ModEvent::DownloadStarted {
            url: url.to_string(),
        });

        let result = self.fetch_record(url).and_then(|record| {
            let slug = sanitize_slug(&record.slug)?;
            self.in_work_dir(|work| self.fetch_payload(work, url, &slug, record, events, cancel))
        });

        match &result {
            Ok(staged) => events.emit(ModEvent::DownloadComplete {
                slug: staged.mod_info.slug.clone(),
            }),
            Err(e) => {
                warn!("download of {url} failed: {e}");
                events.emit(ModEvent::DownloadFailed {
                    message: e.to_string(),
                });
            }
        }

        result
    }

    fn fetch_record(&self, url: &str) -> Result<RemoteModRecord, SError> {
        let record = self.remote.fetch_record(url)?;
        if !record.compatible {
            return Err(SError::IncompatiblePackage(record.title));
        }
        Ok(record)
    }

    fn fetch_payload(
        &self,
        work: &Utf8Path,
        url: &str,
        slug: &str,
        record: RemoteModRecord,
        events: &EventSink,
        cancel: &AtomicBool,
    ) -> Result<StagedDownload, SError> {
        let mut thumbnail = None;
        let mut thumbnail_name = String::new();

        if !record.image_url.is_empty() {
            let name = format!("{slug}.{}", thumbnail_extension(&record.image_url));
            let path = work.join(&name);
            match self
                .remote
                .download(&record.image_url, &path, &mut |_| {}, cancel)
            {
                Ok(_) => {
                    thumbnail = Some(path);
                    thumbnail_name = name;
                }
                Err(SError::Cancelled) => return Err(SError::Cancelled),
                Err(e) => warn!("thumbnail for {slug} unavailable: {e}"),
            }
        }

        let archive = work.join(ARCHIVE_NAME);
        self.remote.download(
            &record.package_url,
            &archive,
            &mut |percent| events.emit(ModEvent::DownloadProgress { percent }),
            cancel,
        )?;

        let payload_dir = self.unpack(work, &archive, cancel)?;

        Ok(StagedDownload {
            work_dir: work.to_owned(),
            payload_dir,
            thumbnail,
            mod_info: Mod {
                id: record.id,
                slug: slug.to_string(),
                name: record.title,
                author: record.author,
                description: record.description,
                thumbnail: thumbnail_name,
                source_url: url.to_string(),
                package_url: record.package_url,
                last_modified: record.modified,
                ..Default::default()
            },
        })
    }

    /// Imports an archive from disk as a local mod with a generated slug.
    pub fn stage_local(&self, archive: &Utf8Path, cancel: &AtomicBool) -> Result<StagedDownload, SError> {
        if !archive.is_file() {
            return Err(SError::IOError(format!("{archive} is not a file")));
        }

        let name = archive
            .file_stem()
            .filter(|stem| !stem.trim().is_empty())
            .ok_or_else(|| SError::ParseError(format!("cannot derive a name from {archive}")))?
            .to_string();

        info!("importing local archive {archive}");
        self.in_work_dir(|work| {
            let copy = work.join(ARCHIVE_NAME);
            self.copier.copy_cancellable(archive, &copy, cancel)?;
            let payload_dir = self.unpack(work, &copy, cancel)?;

            Ok(StagedDownload {
                work_dir: work.to_owned(),
                payload_dir,
                thumbnail: None,
                mod_info: Mod {
                    slug: local_slug(),
                    name,
                    last_modified: chrono::Local::now().naive_local(),
                    is_local: true,
                    ..Default::default()
                },
            })
        })
    }

    /// Slugs of remote mods whose post was modified after the recorded timestamp.
    /// A mod whose check fails is reported as an error event and skipped.
    pub fn check_updates(&self, mods: &[Mod], events: &EventSink) -> Vec<String> {
        let mut outdated = Vec::new();

        for m in mods.iter().filter(|m| !m.is_local) {
            let url = self.update_url(m);
            match self.remote.fetch_record(&url) {
                Ok(record) if record.modified > m.last_modified => {
                    info!("update available for {}", m.slug);
                    events.emit(ModEvent::UpdateAvailable {
                        slug: m.slug.clone(),
                    });
                    outdated.push(m.slug.clone());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("update check for {} failed: {e}", m.slug);
                    events.error(
                        ErrorKind::Network,
                        format!("update check for '{}' failed: {e}", m.name),
                    );
                }
            }
        }

        outdated
    }

    /// Removes work directories left behind by an interrupted run.
    pub fn purge_work_dirs(&self) -> Result<(), SError> {
        FileUtils::remove_dir_if_exists(&self.downloads)?;
        std::fs::create_dir_all(&self.downloads)?;
        Ok(())
    }

    fn unpack(
        &self,
        work: &Utf8Path,
        archive: &Utf8Path,
        cancel: &AtomicBool,
    ) -> Result<Utf8PathBuf, SError> {
        if cancel.load(Ordering::Relaxed) {
            return Err(SError::Cancelled);
        }
        let payload_dir = work.join(PAYLOAD_DIR);
        Decompression::unpack(archive, &payload_dir)?;
        Ok(payload_dir)
    }

    fn in_work_dir<F>(&self, f: F) -> Result<StagedDownload, SError>
    where
        F: FnOnce(&Utf8Path) -> Result<StagedDownload, SError>,
    {
        let work = self.downloads.join(uuid::Uuid::new_v4().simple().to_string());
        std::fs::create_dir_all(&work)?;

        let result = f(&work);
        if result.is_err() {
            let _ = FileUtils::remove_dir_if_exists(&work);
        }
        result
    }
}
