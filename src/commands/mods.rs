use crate::commands::blocking;
use crate::core::registry::AppRegistry;
use crate::models::error::SError;
use crate::models::mod_dto::{Mod, ModDetails, ToggleOutcome};
use camino::Utf8PathBuf;
use tracing::instrument;

#[instrument(skip(state))]
pub async fn install_mod(state: &AppRegistry, slug: String) -> Result<Mod, SError> {
    let registry = state.clone();
    blocking(move || registry.install(&slug)).await
}

#[instrument(skip(state))]
pub async fn uninstall_mod(state: &AppRegistry, slug: String) -> Result<Mod, SError> {
    let registry = state.clone();
    blocking(move || registry.uninstall(&slug)).await
}

#[instrument(skip(state))]
pub async fn delete_mod(state: &AppRegistry, slug: String) -> Result<Mod, SError> {
    let registry = state.clone();
    blocking(move || registry.delete(&slug)).await
}

#[instrument(skip(state))]
pub async fn toggle_install(state: &AppRegistry, slug: String) -> Result<ToggleOutcome, SError> {
    let registry = state.clone();
    blocking(move || registry.toggle_install(&slug)).await
}

#[instrument(skip(state))]
pub async fn fetch_and_stage(state: &AppRegistry, url: String) -> Result<Mod, SError> {
    let registry = state.clone();
    blocking(move || registry.fetch_and_stage(&url)).await
}

#[instrument(skip(state))]
pub async fn add_local_mod(state: &AppRegistry, path: String) -> Result<Mod, SError> {
    let registry = state.clone();
    let archive = Utf8PathBuf::from(path);
    blocking(move || registry.add_local(&archive)).await
}

/// Returns true when at least one mod has an update.
#[instrument(skip(state))]
pub async fn check_updates(state: &AppRegistry) -> Result<bool, SError> {
    let registry = state.clone();
    blocking(move || registry.check_updates().map(|outdated| !outdated.is_empty())).await
}

#[instrument(skip(state))]
pub async fn update_mod(state: &AppRegistry, slug: String) -> Result<Mod, SError> {
    let registry = state.clone();
    blocking(move || registry.update_mod(&slug)).await
}

#[instrument(skip(state))]
pub async fn verify_integrity(state: &AppRegistry) -> Result<Vec<String>, SError> {
    let registry = state.clone();
    blocking(move || Ok(registry.verify_integrity())).await
}

pub fn cancel_operation(state: &AppRegistry) -> bool {
    state.cancel()
}

pub async fn get_available_mods(state: &AppRegistry) -> Result<Vec<Mod>, SError> {
    let registry = state.clone();
    blocking(move || Ok(registry.available_mods())).await
}

pub async fn get_installed_mods(state: &AppRegistry) -> Result<Vec<Mod>, SError> {
    let registry = state.clone();
    blocking(move || Ok(registry.installed_mods())).await
}

pub fn select_mod(state: &AppRegistry, slug: Option<String>) {
    state.select(slug);
}

pub async fn get_selected_details(state: &AppRegistry) -> Result<Option<ModDetails>, SError> {
    let registry = state.clone();
    blocking(move || Ok(registry.selected_details())).await
}
