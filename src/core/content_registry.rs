use crate::models::error::SError;
use crate::models::event::{ErrorKind, ModEvent};
use crate::models::mod_dto::{Mod, ModState};
use crate::models::paths::{ManagerPaths, TargetLayout};
use crate::models::registry_dto::RegistryDTO;
use crate::utils::context::EventSink;
use crate::utils::toml::Toml;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use tracing::{debug, error, info};

/// Durable Available/Installed lists plus the target root they apply to.
///
/// Every mutation is written to `registry.toml` straight away. A failed write is reported
/// through the event sink and the in-memory state is kept as is.
#[derive(Debug)]
pub struct ContentRegistry {
    paths: ManagerPaths,
    layout: TargetLayout,
    target_root: Utf8PathBuf,
    available: Vec<Mod>,
    installed: Vec<Mod>,
    events: EventSink,
}

impl ContentRegistry {
    /// `Ok(None)` means there is no registry yet and the caller has to pick a target root.
    pub fn load(
        paths: &ManagerPaths,
        layout: &TargetLayout,
        events: EventSink,
    ) -> Result<Option<Self>, SError> {
        if !paths.registry.exists() {
            info!("no registry at {}", paths.registry);
            return Ok(None);
        }

        let dto: RegistryDTO =
            Toml::read(&paths.registry).map_err(|e| SError::InvalidRegistry(e.to_string()))?;

        let registry = Self {
            paths: paths.clone(),
            layout: layout.clone(),
            target_root: dto.target_root,
            available: dto.available,
            installed: dto.installed,
            events,
        };

        registry
            .validate()
            .map_err(|e| SError::InvalidRegistry(e.to_string()))?;

        info!(
            "loaded registry: {} available, {} installed",
            registry.available.len(),
            registry.installed.len()
        );
        Ok(Some(registry))
    }

    pub fn create(
        paths: &ManagerPaths,
        target_root: &Utf8Path,
        layout: &TargetLayout,
        events: EventSink,
    ) -> Result<Self, SError> {
        layout.validate(target_root)?;

        let registry = Self {
            paths: paths.clone(),
            layout: layout.clone(),
            target_root: target_root.to_owned(),
            available: Vec::new(),
            installed: Vec::new(),
            events,
        };

        registry.save()?;
        info!("created registry for {target_root}");
        Ok(registry)
    }

    pub fn validate(&self) -> Result<(), SError> {
        self.layout.validate(&self.target_root)?;

        let mut seen = HashSet::new();
        for m in self.available.iter().chain(&self.installed) {
            if !m.is_complete() {
                return Err(SError::InvalidRegistry(format!(
                    "incomplete mod record '{}'",
                    m.slug
                )));
            }
            if !seen.insert(m.slug.as_str()) {
                return Err(SError::DuplicateSlug(m.slug.clone()));
            }
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn save(&self) -> Result<(), SError> {
        Toml::write(&self.paths.registry, &self.to_dto())
            .map_err(|e| SError::Persistence(e.to_string()))
    }

    pub fn to_dto(&self) -> RegistryDTO {
        RegistryDTO {
            target_root: self.target_root.clone(),
            available: self.available.clone(),
            installed: self.installed.clone(),
        }
    }

    pub fn target_root(&self) -> &Utf8Path {
        &self.target_root
    }

    pub fn paths(&self) -> &ManagerPaths {
        &self.paths
    }

    pub fn available(&self) -> &[Mod] {
        &self.available
    }

    pub fn installed(&self) -> &[Mod] {
        &self.installed
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.find(slug).is_some()
    }

    pub fn find(&self, slug: &str) -> Option<(ModState, &Mod)> {
        if let Some(m) = self.available.iter().find(|m| m.slug == slug) {
            return Some((ModState::Available, m));
        }
        self.installed
            .iter()
            .find(|m| m.slug == slug)
            .map(|m| (ModState::Installed, m))
    }

    pub fn add(&mut self, m: Mod) -> Result<(), SError> {
        ensure_complete(&m)?;
        if self.contains(&m.slug) {
            return Err(SError::DuplicateSlug(m.slug));
        }

        debug!("registry add {}", m.slug);
        self.available.push(m);
        self.persist();
        self.emit_available();
        Ok(())
    }

    pub fn remove(&mut self, slug: &str) -> Result<Mod, SError> {
        if let Some(pos) = self.available.iter().position(|m| m.slug == slug) {
            let removed = self.available.remove(pos);
            self.persist();
            self.emit_available();
            return Ok(removed);
        }

        if let Some(pos) = self.installed.iter().position(|m| m.slug == slug) {
            let removed = self.installed.remove(pos);
            self.persist();
            self.emit_installed();
            return Ok(removed);
        }

        Err(SError::ModNotFound(slug.to_string()))
    }

    /// Replaces the Available entry with `m` and moves it to Installed.
    pub fn move_to_installed(&mut self, m: Mod) -> Result<(), SError> {
        ensure_complete(&m)?;
        let pos = self
            .available
            .iter()
            .position(|a| a.slug == m.slug)
            .ok_or_else(|| SError::ModNotAvailable(m.slug.clone()))?;

        self.available.remove(pos);
        self.installed.push(m);
        self.persist();
        self.emit_available();
        self.emit_installed();
        Ok(())
    }

    /// Replaces the Installed entry with `m` and moves it to Available.
    pub fn move_to_available(&mut self, m: Mod) -> Result<(), SError> {
        ensure_complete(&m)?;
        let pos = self
            .installed
            .iter()
            .position(|i| i.slug == m.slug)
            .ok_or_else(|| SError::ModNotInstalled(m.slug.clone()))?;

        self.installed.remove(pos);
        self.available.push(m);
        self.persist();
        self.emit_available();
        self.emit_installed();
        Ok(())
    }

    /// Overwrites the record with the same slug in whichever list holds it.
    pub fn update(&mut self, m: Mod) -> Result<(), SError> {
        ensure_complete(&m)?;
        if let Some(slot) = self.available.iter_mut().find(|a| a.slug == m.slug) {
            *slot = m;
            self.persist();
            self.emit_available();
            return Ok(());
        }

        if let Some(slot) = self.installed.iter_mut().find(|i| i.slug == m.slug) {
            *slot = m;
            self.persist();
            self.emit_installed();
            return Ok(());
        }

        Err(SError::ModNotFound(m.slug))
    }

    /// Changes only non-persisted flags (`busy`, `broken`).
    pub fn mark_transient<F>(&mut self, slug: &str, f: F) -> Result<(), SError>
    where
        F: FnOnce(&mut Mod),
    {
        if let Some(m) = self.available.iter_mut().find(|m| m.slug == slug) {
            f(m);
            self.emit_available();
            return Ok(());
        }
        if let Some(m) = self.installed.iter_mut().find(|m| m.slug == slug) {
            f(m);
            self.emit_installed();
            return Ok(());
        }
        Err(SError::ModNotFound(slug.to_string()))
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("failed to persist registry: {e}");
            self.events.error(ErrorKind::Persistence, e.to_string());
        }
    }

    fn emit_available(&self) {
        self.events
            .emit(ModEvent::AvailableChanged(self.available.clone()));
    }

    fn emit_installed(&self) {
        self.events
            .emit(ModEvent::InstalledChanged(self.installed.clone()));
    }
}

/// Records the loader would reject never enter the lists.
fn ensure_complete(m: &Mod) -> Result<(), SError> {
    if m.is_complete() {
        return Ok(());
    }
    Err(SError::IncompleteRecord(m.slug.clone()))
}
