use crate::core::mod_fs::{is_reserved, StagedManifest};
use crate::models::error::SError;
use crate::models::mod_dto::Mod;
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Checks a candidate manifest against every installed mod.
///
/// An installed mod's touched set is its recorded `files`. Records without one fall back
/// to the mod's staged directory. Anything that cannot be enumerated counts as a collision.
pub fn detect(
    candidate: &StagedManifest,
    installed: &[Mod],
    mods_root: &Utf8Path,
    reserved: &[String],
) -> Result<(), SError> {
    let owners = touched_by_installed(installed, mods_root, reserved)?;

    let collisions: BTreeSet<String> = candidate
        .files
        .iter()
        .filter_map(|path| {
            owners
                .get(path)
                .map(|owner| format!("'{}' is already provided by '{}'", path, owner))
        })
        .collect();

    if collisions.is_empty() {
        return Ok(());
    }

    Err(SError::FileCollision(collisions.into_iter().collect()))
}

/// Reads the candidate's staged manifest. A directory that cannot be enumerated blocks the
/// install as a collision rather than letting it proceed blind.
pub fn candidate_manifest(root: &Utf8Path, reserved: &[String]) -> Result<StagedManifest, SError> {
    StagedManifest::read(root, reserved).map_err(|e| {
        warn!("cannot enumerate staged directory {root}: {e}");
        SError::FileCollision(vec![format!("staged directory '{root}' cannot be enumerated")])
    })
}

/// Whether installing `candidate` would overlap an installed mod.
pub fn has_collision(
    candidate: &StagedManifest,
    installed: &[Mod],
    mods_root: &Utf8Path,
    reserved: &[String],
) -> bool {
    detect(candidate, installed, mods_root, reserved).is_err()
}

fn touched_by_installed(
    installed: &[Mod],
    mods_root: &Utf8Path,
    reserved: &[String],
) -> Result<HashMap<Utf8PathBuf, String>, SError> {
    let mut owners = HashMap::new();

    for m in installed {
        let files = if m.files.is_empty() {
            FileUtils::relative_files(&mods_root.join(&m.slug)).map_err(|e| {
                warn!("cannot enumerate files of installed mod {}: {e}", m.slug);
                SError::FileCollision(vec![format!(
                    "files of installed mod '{}' cannot be determined",
                    m.slug
                )])
            })?
        } else {
            m.files.clone()
        };

        for f in files.into_iter().filter(|f| !is_reserved(f, reserved)) {
            owners.entry(f).or_insert_with(|| m.slug.clone());
        }
    }

    Ok(owners)
}
