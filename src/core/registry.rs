use crate::config::AppSettings;
use crate::core::acquisition::AcquisitionService;
use crate::core::content_registry::ContentRegistry;
use crate::core::copier::BufferedCopier;
use crate::core::dto_builder::build_mod_details;
use crate::core::mod_manager::ModManager;
use crate::core::operation::{OperationGuard, OperationKind};
use crate::core::remote::RemoteSource;
use crate::models::error::SError;
use crate::models::event::{ErrorKind, ModEvent};
use crate::models::mod_dto::{Mod, ModDetails, ModState, ToggleOutcome};
use crate::models::paths::ManagerPaths;
use crate::utils::context::EventSink;
use crate::utils::thread::{with_manager, with_manager_mut};
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Shared handle the shell talks to. Cloning is cheap; all clones see the same state.
#[derive(Clone)]
pub struct AppRegistry {
    pub manager: Arc<Mutex<ModManager>>,
    pub acquisition: Arc<AcquisitionService>,
    pub guard: Arc<OperationGuard>,
    pub events: EventSink,
    selected: Arc<Mutex<Option<String>>>,
}

impl AppRegistry {
    /// Opens the registry under `settings.home`. `Ok(None)` means first run: call
    /// [`AppRegistry::initialize`] with a target root.
    pub fn open(
        settings: &AppSettings,
        remote: Arc<dyn RemoteSource>,
        events: EventSink,
    ) -> Result<Option<Self>, SError> {
        let paths = ManagerPaths::new(&settings.home);
        paths.ensure_dirs()?;

        let Some(registry) = ContentRegistry::load(&paths, &settings.target_layout, events.clone())?
        else {
            return Ok(None);
        };

        Ok(Some(Self::assemble(registry, settings, remote, events)))
    }

    /// Starts over with an empty registry for `target_root`, replacing any existing one.
    pub fn initialize(
        settings: &AppSettings,
        target_root: &Utf8Path,
        remote: Arc<dyn RemoteSource>,
        events: EventSink,
    ) -> Result<Self, SError> {
        let paths = ManagerPaths::new(&settings.home);
        paths.ensure_dirs()?;

        let registry =
            ContentRegistry::create(&paths, target_root, &settings.target_layout, events.clone())?;
        Ok(Self::assemble(registry, settings, remote, events))
    }

    fn assemble(
        registry: ContentRegistry,
        settings: &AppSettings,
        remote: Arc<dyn RemoteSource>,
        events: EventSink,
    ) -> Self {
        let acquisition = AcquisitionService::new(
            registry.paths(),
            &settings.api_base_url,
            remote.clone(),
            BufferedCopier::new(settings.copy),
        );
        if let Err(e) = acquisition.purge_work_dirs() {
            warn!("failed to clear stale downloads: {e}");
        }

        let manager = ModManager::new(registry, settings, remote, events.clone());

        let app = Self {
            manager: Arc::new(Mutex::new(manager)),
            acquisition: Arc::new(acquisition),
            guard: Arc::new(OperationGuard::default()),
            events,
            selected: Arc::new(Mutex::new(None)),
        };

        let broken = app.verify_integrity();
        info!("registry ready, {} broken mod(s)", broken.len());
        app
    }

    /// Runs `f` on the manager while holding the operation slot for `kind`.
    fn run_exclusive<F, R>(&self, kind: OperationKind, slug: &str, f: F) -> Result<R, SError>
    where
        F: FnOnce(&mut ModManager, &AtomicBool) -> Result<R, SError>,
    {
        let ticket = self.guard.try_begin(kind)?;
        let result = with_manager_mut(&self.manager, |manager| {
            let _ = manager.registry.mark_transient(slug, |m| m.busy = true);
            let result = f(manager, ticket.cancel_flag());
            let _ = manager.registry.mark_transient(slug, |m| m.busy = false);
            result
        });

        if let Err(e) = &result {
            self.report(kind, e);
        }
        result
    }

    fn report(&self, kind: OperationKind, e: &SError) {
        match e {
            // Already surfaced by the manager.
            SError::BackupMissing(_) => {}
            _ => self
                .events
                .error(ErrorKind::Operation, format!("{kind} failed: {e}")),
        }
    }

    #[instrument(skip(self))]
    pub fn install(&self, slug: &str) -> Result<Mod, SError> {
        self.run_exclusive(OperationKind::Install, slug, |manager, cancel| {
            manager.install(slug, cancel)
        })
    }

    #[instrument(skip(self))]
    pub fn uninstall(&self, slug: &str) -> Result<Mod, SError> {
        self.run_exclusive(OperationKind::Uninstall, slug, |manager, _| {
            manager.uninstall(slug)
        })
    }

    #[instrument(skip(self))]
    pub fn delete(&self, slug: &str) -> Result<Mod, SError> {
        let removed = self.run_exclusive(OperationKind::Delete, slug, |manager, _| {
            manager.delete(slug)
        })?;

        let mut selected = self.selected.lock();
        if selected.as_deref() == Some(slug) {
            *selected = None;
            self.events.emit(ModEvent::SelectionChanged(None));
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub fn toggle_install(&self, slug: &str) -> Result<ToggleOutcome, SError> {
        let kind = match self.state_of(slug) {
            Some(ModState::Installed) => OperationKind::Uninstall,
            Some(ModState::Available) => OperationKind::Install,
            None => return Ok(ToggleOutcome::Ignored),
        };
        self.run_exclusive(kind, slug, |manager, cancel| {
            manager.toggle_install(slug, cancel)
        })
    }

    /// Downloads the mod behind a metadata URL and lists it as Available.
    /// The manager is only locked once the download is complete.
    #[instrument(skip(self))]
    pub fn fetch_and_stage(&self, url: &str) -> Result<Mod, SError> {
        let ticket = self.guard.try_begin(OperationKind::Download)?;
        let staged = self
            .acquisition
            .download(url, &self.events, ticket.cancel_flag())?;

        let result = with_manager_mut(&self.manager, |manager| manager.commit_download(staged));
        if let Err(e) = &result {
            self.report(OperationKind::Download, e);
        }
        result
    }

    #[instrument(skip(self))]
    pub fn add_local(&self, archive: &Utf8Path) -> Result<Mod, SError> {
        let ticket = self.guard.try_begin(OperationKind::Import)?;
        let result = self
            .acquisition
            .stage_local(archive, ticket.cancel_flag())
            .and_then(|staged| {
                with_manager_mut(&self.manager, |manager| manager.commit_download(staged))
            });

        if let Err(e) = &result {
            self.report(OperationKind::Import, e);
        }
        result
    }

    /// Polls every remote mod and flags those with a newer post. Returns their slugs.
    #[instrument(skip(self))]
    pub fn check_updates(&self) -> Result<Vec<String>, SError> {
        let _ticket = self.guard.try_begin(OperationKind::UpdateCheck)?;
        let mods: Vec<Mod> = with_manager(&self.manager, |manager| {
            let registry = &manager.registry;
            registry
                .available()
                .iter()
                .chain(registry.installed())
                .cloned()
                .collect()
        });

        let outdated = self.acquisition.check_updates(&mods, &self.events);

        with_manager_mut(&self.manager, |manager| {
            for slug in &outdated {
                let Some((_, m)) = manager.registry.find(slug) else {
                    continue;
                };
                if m.update_available {
                    continue;
                }
                let mut flagged = m.clone();
                flagged.update_available = true;
                manager.registry.update(flagged)?;
            }
            Ok::<_, SError>(())
        })?;

        Ok(outdated)
    }

    /// Re-downloads a remote mod. An installed mod is reinstalled afterwards.
    #[instrument(skip(self))]
    pub fn update_mod(&self, slug: &str) -> Result<Mod, SError> {
        let ticket = self.guard.try_begin(OperationKind::Download)?;
        let (state, current) = with_manager(&self.manager, |manager| {
            manager
                .registry
                .find(slug)
                .map(|(state, m)| (state, m.clone()))
        })
        .ok_or_else(|| SError::ModNotFound(slug.into()))?;

        if current.is_local {
            return Err(SError::Unexpected(Some(format!(
                "'{slug}' was imported from disk and has no remote source"
            ))));
        }

        let url = self.acquisition.update_url(&current);
        let staged = self
            .acquisition
            .download(&url, &self.events, ticket.cancel_flag())?;

        let result = with_manager_mut(&self.manager, |manager| {
            if staged.mod_info.slug != slug {
                manager.delete(slug)?;
            }
            let updated = manager.commit_download(staged)?;
            if state == ModState::Installed {
                return manager.install(&updated.slug, ticket.cancel_flag());
            }
            Ok(updated)
        });

        if let Err(e) = &result {
            self.report(OperationKind::Download, e);
        }
        result
    }

    /// Requests cancellation of the running operation. Returns false when idle.
    pub fn cancel(&self) -> bool {
        let cancelled = self.guard.cancel();
        if cancelled {
            info!("cancellation requested");
        }
        cancelled
    }

    pub fn verify_integrity(&self) -> Vec<String> {
        with_manager_mut(&self.manager, |manager| manager.verify_integrity())
    }

    pub fn target_root(&self) -> Utf8PathBuf {
        with_manager(&self.manager, |manager| manager.target_root().to_owned())
    }

    pub fn available_mods(&self) -> Vec<Mod> {
        with_manager(&self.manager, |manager| manager.registry.available().to_vec())
    }

    pub fn installed_mods(&self) -> Vec<Mod> {
        with_manager(&self.manager, |manager| manager.registry.installed().to_vec())
    }

    pub fn select(&self, slug: Option<String>) {
        *self.selected.lock() = slug.clone();
        self.events.emit(ModEvent::SelectionChanged(slug));
    }

    pub fn selected_mod(&self) -> Option<Mod> {
        let slug = self.selected.lock().clone()?;
        with_manager(&self.manager, |manager| {
            manager.registry.find(&slug).map(|(_, m)| m.clone())
        })
    }

    pub fn selected_details(&self) -> Option<ModDetails> {
        let slug = self.selected.lock().clone()?;
        let running = self.guard.current().is_some();
        with_manager(&self.manager, |manager| {
            build_mod_details(&manager.registry, &slug, running)
        })
    }

    fn state_of(&self, slug: &str) -> Option<ModState> {
        with_manager(&self.manager, |manager| {
            manager.registry.find(slug).map(|(state, _)| state)
        })
    }
}
