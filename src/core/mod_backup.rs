use crate::core::copier::BufferedCopier;
use crate::core::mod_fs::is_reserved;
use crate::core::remote::RemoteSource;
use crate::models::error::SError;
use crate::models::mod_dto::Mod;
use crate::utils::file::FileUtils;
use crate::utils::hash::hash_file;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Pre-install copies taken by a snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackupSet {
    pub slug: String,
    pub dir: Utf8PathBuf,
    /// Hash of every target file that existed before install, keyed by relative path.
    pub hashes: BTreeMap<Utf8PathBuf, String>,
}

impl BackupSet {
    pub fn pre_existed(&self, rel: &Utf8Path) -> bool {
        self.hashes.contains_key(rel)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RestoreReport {
    pub restored: Vec<Utf8PathBuf>,
    pub fetched: Vec<Utf8PathBuf>,
    pub deleted: Vec<Utf8PathBuf>,
}

enum Restored {
    FromBackup,
    Fetched,
    Deleted,
}

/// Owns `backups/<slug>/`, which mirrors the relative paths a mod overwrote.
#[derive(Clone, Debug)]
pub struct BackupVault {
    root: Utf8PathBuf,
    copier: BufferedCopier,
    reserved: Vec<String>,
}

impl BackupVault {
    pub fn new(root: &Utf8Path, copier: BufferedCopier, reserved: Vec<String>) -> Self {
        Self {
            root: root.to_owned(),
            copier,
            reserved,
        }
    }

    pub fn dir(&self, slug: &str) -> Utf8PathBuf {
        self.root.join(slug)
    }

    /// Copies every existing target file in `files` into a fresh backup directory.
    /// Nothing is left behind if this fails.
    pub fn snapshot(
        &self,
        slug: &str,
        files: &[Utf8PathBuf],
        target_root: &Utf8Path,
        cancel: &AtomicBool,
    ) -> Result<BackupSet, SError> {
        let dir = self.dir(slug);
        FileUtils::remove_dir_if_exists(&dir)?;
        std::fs::create_dir_all(&dir)?;

        match self.snapshot_into(&dir, files, target_root, cancel) {
            Ok(hashes) => {
                info!("backed up {} file(s) for {slug}", hashes.len());
                Ok(BackupSet {
                    slug: slug.to_string(),
                    dir,
                    hashes,
                })
            }
            Err(e) => {
                warn!("snapshot of {slug} failed: {e}");
                let _ = FileUtils::remove_dir_if_exists(&dir);
                Err(e)
            }
        }
    }

    fn snapshot_into(
        &self,
        dir: &Utf8Path,
        files: &[Utf8PathBuf],
        target_root: &Utf8Path,
        cancel: &AtomicBool,
    ) -> Result<BTreeMap<Utf8PathBuf, String>, SError> {
        let mut hashes = BTreeMap::new();

        for rel in files.iter().filter(|f| !is_reserved(f, &self.reserved)) {
            if cancel.load(Ordering::Relaxed) {
                return Err(SError::Cancelled);
            }

            let live = target_root.join(rel);
            if !live.is_file() {
                continue;
            }

            hashes.insert(rel.clone(), hash_file(&live)?);
            self.copier.copy_cancellable(&live, &dir.join(rel), cancel)?;
            debug!("backed up {rel}");
        }

        Ok(hashes)
    }

    /// Puts a single backed-up file back, or removes `rel` if it did not pre-exist.
    pub fn revert_file(
        &self,
        set: &BackupSet,
        rel: &Utf8Path,
        target_root: &Utf8Path,
    ) -> Result<(), SError> {
        let target = target_root.join(rel);
        if set.pre_existed(rel) {
            self.copier.copy(&set.dir.join(rel), &target)?;
        } else {
            FileUtils::remove_file_if_exists(&target)?;
        }
        Ok(())
    }

    /// Brings every touched file back to its pre-install state.
    ///
    /// Files whose backup is missing or does not match the recorded hash are fetched from
    /// `fallback`. Paths that still cannot be restored, including ones hitting an I/O error,
    /// are returned as `BackupMissing`; the rest stay restored so the call can be repeated.
    pub fn restore(
        &self,
        m: &Mod,
        touched: &[Utf8PathBuf],
        target_root: &Utf8Path,
        fallback: &dyn RemoteSource,
    ) -> Result<RestoreReport, SError> {
        let dir = self.dir(&m.slug);
        let mut report = RestoreReport::default();
        let mut missing = Vec::new();

        for rel in touched.iter().filter(|f| !is_reserved(f, &self.reserved)) {
            match self.restore_file(m, &dir, rel, target_root, fallback) {
                Ok(Restored::FromBackup) => report.restored.push(rel.clone()),
                Ok(Restored::Fetched) => report.fetched.push(rel.clone()),
                Ok(Restored::Deleted) => report.deleted.push(rel.clone()),
                Err(e) => {
                    warn!("cannot restore {rel} for {}: {e}", m.slug);
                    missing.push(rel.to_string());
                }
            }
        }

        if !missing.is_empty() {
            return Err(SError::BackupMissing(missing));
        }

        info!(
            "restored {}: {} from backup, {} fetched, {} removed",
            m.slug,
            report.restored.len(),
            report.fetched.len(),
            report.deleted.len()
        );
        Ok(report)
    }

    fn restore_file(
        &self,
        m: &Mod,
        dir: &Utf8Path,
        rel: &Utf8Path,
        target_root: &Utf8Path,
        fallback: &dyn RemoteSource,
    ) -> Result<Restored, SError> {
        let target = target_root.join(rel);
        let entry = dir.join(rel);

        // Records without hashes trust whatever the backup holds.
        if m.contents_hash.is_empty() {
            if entry.is_file() {
                self.copier.copy(&entry, &target)?;
                return Ok(Restored::FromBackup);
            }
            FileUtils::remove_file_if_exists(&target)?;
            return Ok(Restored::Deleted);
        }

        let Some(expected) = m.contents_hash.get(rel) else {
            FileUtils::remove_file_if_exists(&target)?;
            return Ok(Restored::Deleted);
        };

        if backup_matches(&entry, expected) {
            match self.copier.copy(&entry, &target) {
                Ok(_) => return Ok(Restored::FromBackup),
                Err(e) => warn!("restoring {rel} from backup failed: {e}"),
            }
        } else {
            warn!("backup of {rel} for {} is missing or corrupt", m.slug);
        }

        fallback.fetch_original(rel, &target)?;
        Ok(Restored::Fetched)
    }

    pub fn discard(&self, slug: &str) -> Result<(), SError> {
        FileUtils::remove_dir_if_exists(&self.dir(slug))
    }
}

fn backup_matches(entry: &Utf8Path, expected: &str) -> bool {
    entry.is_file() && hash_file(entry).map(|h| h == expected).unwrap_or(false)
}
