use crate::config::AppSettings;
use crate::core::acquisition::StagedDownload;
use crate::core::collision;
use crate::core::content_registry::ContentRegistry;
use crate::core::copier::BufferedCopier;
use crate::core::integrity;
use crate::core::mod_backup::{BackupSet, BackupVault};
use crate::core::mod_fs::{is_reserved, StagedManifest};
use crate::core::remote::RemoteSource;
use crate::models::error::SError;
use crate::models::event::{ErrorKind, ModEvent};
use crate::models::mod_dto::{Mod, ModState, ToggleOutcome};
use crate::models::paths::ManagerPaths;
use crate::utils::context::EventSink;
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Install/uninstall state machine over the target tree.
///
/// All changes to the target tree and to the registry go through here.
pub struct ModManager {
    pub registry: ContentRegistry,
    paths: ManagerPaths,
    vault: BackupVault,
    copier: BufferedCopier,
    reserved: Vec<String>,
    remote: Arc<dyn RemoteSource>,
    events: EventSink,
}

struct PendingFile {
    rel: Utf8PathBuf,
    pending: Utf8PathBuf,
    dest: Utf8PathBuf,
}

impl ModManager {
    pub fn new(
        registry: ContentRegistry,
        settings: &AppSettings,
        remote: Arc<dyn RemoteSource>,
        events: EventSink,
    ) -> Self {
        let paths = registry.paths().clone();
        let copier = BufferedCopier::new(settings.copy);
        let reserved = settings.reserved_files.clone();

        Self {
            vault: BackupVault::new(&paths.backups, copier, reserved.clone()),
            registry,
            paths,
            copier,
            reserved,
            remote,
            events,
        }
    }

    pub fn paths(&self) -> &ManagerPaths {
        &self.paths
    }

    pub fn target_root(&self) -> &Utf8Path {
        self.registry.target_root()
    }

    pub fn install(&mut self, slug: &str, cancel: &AtomicBool) -> Result<Mod, SError> {
        let m = match self.registry.find(slug) {
            Some((ModState::Available, m)) => m.clone(),
            Some((ModState::Installed, _)) => return Err(SError::ModNotAvailable(slug.into())),
            None => return Err(SError::ModNotFound(slug.into())),
        };
        info!("installing {slug}");

        let manifest =
            collision::candidate_manifest(&self.paths.staged_dir(slug), &self.reserved)?;
        if manifest.is_empty() {
            return Err(SError::MissingStagedFile(manifest.root.to_string()));
        }
        collision::detect(
            &manifest,
            self.registry.installed(),
            &self.paths.mods,
            &self.reserved,
        )?;

        let target_root = self.target_root().to_owned();
        let backup = self
            .vault
            .snapshot(slug, &manifest.files, &target_root, cancel)?;

        if let Err(e) = self.apply(&manifest, &target_root, &backup, cancel) {
            warn!("install of {slug} aborted: {e}");
            if let Err(discard_err) = self.vault.discard(slug) {
                warn!("failed to discard backup of {slug}: {discard_err}");
            }
            return Err(e);
        }

        let mut installed = m;
        installed.broken = false;
        installed.needs_repair = false;
        installed.files = manifest.files;
        installed.contents_hash = backup.hashes;
        self.registry.move_to_installed(installed.clone())?;

        info!("installed {slug} ({} files)", installed.files.len());
        Ok(installed)
    }

    /// Copies everything to pending siblings first so a failure never leaves the target
    /// half-written, then renames them into place.
    fn apply(
        &self,
        manifest: &StagedManifest,
        target_root: &Utf8Path,
        backup: &BackupSet,
        cancel: &AtomicBool,
    ) -> Result<(), SError> {
        let mut pending = Vec::with_capacity(manifest.files.len());
        let mut created_dirs = Vec::new();

        for rel in &manifest.files {
            let prepared =
                self.prepare(manifest, rel, target_root, cancel, &mut pending, &mut created_dirs);
            if let Err(e) = prepared {
                remove_pending(&pending);
                FileUtils::prune_dirs(&created_dirs);
                return Err(e);
            }
        }

        for (i, file) in pending.iter().enumerate() {
            if let Err(e) = std::fs::rename(&file.pending, &file.dest) {
                error!("failed to move {} into place: {e}", file.dest);
                self.roll_back(&pending[..i], target_root, backup);
                remove_pending(&pending[i..]);
                FileUtils::prune_dirs(&created_dirs);
                return Err(e.into());
            }
            debug!("wrote {}", file.rel);
        }

        Ok(())
    }

    fn prepare(
        &self,
        manifest: &StagedManifest,
        rel: &Utf8Path,
        target_root: &Utf8Path,
        cancel: &AtomicBool,
        pending: &mut Vec<PendingFile>,
        created_dirs: &mut Vec<Utf8PathBuf>,
    ) -> Result<(), SError> {
        if cancel.load(Ordering::Relaxed) {
            return Err(SError::Cancelled);
        }

        let source = manifest.source(rel);
        if !source.is_file() {
            return Err(SError::MissingStagedFile(source.to_string()));
        }

        let dest = target_root.join(rel);
        FileUtils::create_parents(&dest, created_dirs)?;
        let file = PendingFile {
            rel: rel.to_owned(),
            pending: FileUtils::sibling(&dest, "pending"),
            dest,
        };
        self.copier
            .copy_cancellable(&source, &file.pending, cancel)?;
        pending.push(file);
        Ok(())
    }

    fn roll_back(&self, committed: &[PendingFile], target_root: &Utf8Path, backup: &BackupSet) {
        for file in committed.iter().rev() {
            if let Err(e) = self.vault.revert_file(backup, &file.rel, target_root) {
                error!("rollback of {} failed: {e}", file.rel);
            }
        }
    }

    pub fn uninstall(&mut self, slug: &str) -> Result<Mod, SError> {
        let m = match self.registry.find(slug) {
            Some((ModState::Installed, m)) => m.clone(),
            Some((ModState::Available, _)) => return Err(SError::ModNotInstalled(slug.into())),
            None => return Err(SError::ModNotFound(slug.into())),
        };
        info!("uninstalling {slug}");

        let touched = self.touched_files(&m)?;
        let restored = self.vault.restore(
            &m,
            &touched,
            self.registry.target_root(),
            self.remote.as_ref(),
        );

        match restored {
            Ok(report) => debug!("{slug}: {report:?}"),
            Err(SError::BackupMissing(paths)) => {
                warn!("{slug} could not be fully restored, {} file(s) missing", paths.len());
                let mut flagged = m;
                flagged.needs_repair = true;
                self.registry.update(flagged)?;
                self.events.error(
                    ErrorKind::Integrity,
                    format!("backup of '{slug}' is incomplete, a file check is needed"),
                );
                return Err(SError::BackupMissing(paths));
            }
            Err(e) => return Err(e),
        }

        let mut available = m;
        available.clear_install_state();
        self.registry.move_to_available(available.clone())?;

        if let Err(e) = self.vault.discard(slug) {
            warn!("failed to discard backup of {slug}: {e}");
        }

        info!("uninstalled {slug}");
        Ok(available)
    }

    /// Recorded files, or the staged listing for records written before files were tracked.
    fn touched_files(&self, m: &Mod) -> Result<Vec<Utf8PathBuf>, SError> {
        if !m.files.is_empty() {
            return Ok(m.files.clone());
        }
        let staged = self.paths.staged_dir(&m.slug);
        Ok(FileUtils::relative_files(&staged)?
            .into_iter()
            .filter(|f| !is_reserved(f, &self.reserved))
            .collect())
    }

    pub fn delete(&mut self, slug: &str) -> Result<Mod, SError> {
        let (state, _) = self
            .registry
            .find(slug)
            .ok_or_else(|| SError::ModNotFound(slug.into()))?;

        if state == ModState::Installed {
            self.uninstall(slug)?;
        }

        let removed = self.registry.remove(slug)?;
        self.remove_artifacts(&removed)?;
        info!("deleted {slug}");
        Ok(removed)
    }

    fn remove_artifacts(&self, m: &Mod) -> Result<(), SError> {
        FileUtils::remove_dir_if_exists(&self.paths.staged_dir(&m.slug))?;
        self.vault.discard(&m.slug)?;
        if !m.thumbnail.is_empty() {
            FileUtils::remove_file_if_exists(&self.paths.thumbnail(&m.thumbnail))?;
        }
        Ok(())
    }

    pub fn toggle_install(&mut self, slug: &str, cancel: &AtomicBool) -> Result<ToggleOutcome, SError> {
        match self.registry.find(slug).map(|(state, _)| state) {
            Some(ModState::Available) => self.install(slug, cancel).map(|_| ToggleOutcome::Installed),
            Some(ModState::Installed) => self.uninstall(slug).map(|_| ToggleOutcome::Uninstalled),
            None => Ok(ToggleOutcome::Ignored),
        }
    }

    /// Moves a finished download into the mods and thumbnails roots and lists it as
    /// Available. A mod with the same slug is deleted first.
    pub fn commit_download(&mut self, staged: StagedDownload) -> Result<Mod, SError> {
        let result = self.commit_inner(&staged);
        staged.discard();
        result
    }

    fn commit_inner(&mut self, staged: &StagedDownload) -> Result<Mod, SError> {
        let m = staged.mod_info.clone();
        if !m.is_complete() {
            return Err(SError::IncompleteRecord(m.slug));
        }

        if self.registry.contains(&m.slug) {
            info!("replacing existing {}", m.slug);
            self.delete(&m.slug)?;
        }
        self.remove_artifacts(&m)?;

        if let Some(thumbnail) = &staged.thumbnail {
            let dest = self.paths.thumbnail(&m.thumbnail);
            FileUtils::ensure_parent(&dest)?;
            std::fs::rename(thumbnail, &dest)?;
        }

        let staged_dir = self.paths.staged_dir(&m.slug);
        FileUtils::ensure_parent(&staged_dir)?;
        std::fs::rename(&staged.payload_dir, &staged_dir)?;

        self.registry.add(m.clone())?;
        info!("staged {} as {}", m.name, m.slug);
        Ok(m)
    }

    /// Flags installed mods whose files no longer match what was installed.
    pub fn verify_integrity(&mut self) -> Vec<String> {
        let broken = integrity::find_broken(
            self.registry.installed(),
            &self.paths.mods,
            self.registry.target_root(),
            &self.reserved,
        );

        let flags: Vec<(String, bool)> = self
            .registry
            .installed()
            .iter()
            .map(|m| (m.slug.clone(), m.broken))
            .collect();

        for (slug, was_broken) in flags {
            let is_broken = broken.iter().any(|(b, _)| *b == slug);
            if is_broken == was_broken {
                continue;
            }
            if let Err(e) = self.registry.mark_transient(&slug, |m| m.broken = is_broken) {
                warn!("cannot flag {slug}: {e}");
            }
        }

        for (slug, paths) in &broken {
            warn!("{slug} is broken: {} file(s) changed", paths.len());
            self.events.emit(ModEvent::ModBroken { slug: slug.clone() });
        }

        broken.into_iter().map(|(slug, _)| slug).collect()
    }
}

fn remove_pending(pending: &[PendingFile]) {
    for file in pending {
        if let Err(e) = FileUtils::remove_file_if_exists(&file.pending) {
            warn!("failed to remove {}: {e}", file.pending);
        }
    }
}
