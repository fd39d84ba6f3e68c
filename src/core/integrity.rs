use crate::core::mod_fs::is_reserved;
use crate::models::error::SError;
use crate::models::mod_dto::Mod;
use crate::utils::hash::hash_file;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

/// Compares every installed file of `m` with its staged copy.
///
/// A target file that is gone or differs from what was installed (for example after the
/// game patched it) yields `IntegrityMismatch` with the offending paths.
pub fn check_mod(
    m: &Mod,
    mods_root: &Utf8Path,
    target_root: &Utf8Path,
    reserved: &[String],
) -> Result<(), SError> {
    let staged_root = mods_root.join(&m.slug);
    let drifted: Vec<String> = m
        .files
        .iter()
        .filter(|f| !is_reserved(f, reserved))
        .filter(|f| !same_content(&target_root.join(f), &staged_root.join(f)))
        .map(|f| f.to_string())
        .collect();

    if drifted.is_empty() {
        return Ok(());
    }

    debug!("{} drifted: {:?}", m.slug, drifted);
    Err(SError::IntegrityMismatch(drifted))
}

/// Slugs of installed mods that fail [`check_mod`].
pub fn find_broken(
    installed: &[Mod],
    mods_root: &Utf8Path,
    target_root: &Utf8Path,
    reserved: &[String],
) -> Vec<(String, Vec<Utf8PathBuf>)> {
    installed
        .iter()
        .filter_map(|m| match check_mod(m, mods_root, target_root, reserved) {
            Err(SError::IntegrityMismatch(paths)) => Some((
                m.slug.clone(),
                paths.into_iter().map(Utf8PathBuf::from).collect(),
            )),
            _ => None,
        })
        .collect()
}

fn same_content(live: &Utf8Path, staged: &Utf8Path) -> bool {
    match (hash_file(live), hash_file(staged)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
