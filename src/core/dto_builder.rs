use crate::core::content_registry::ContentRegistry;
use crate::models::mod_dto::ModDetails;
use crate::utils::icon::load_thumbnail_as_data_uri;

/// Builds the detail view of one mod, with its thumbnail inlined as a data URI.
pub fn build_mod_details(
    registry: &ContentRegistry,
    slug: &str,
    operation_running: bool,
) -> Option<ModDetails> {
    let (state, m) = registry.find(slug)?;

    let thumbnail_data = (!m.thumbnail.is_empty())
        .then(|| registry.paths().thumbnail(&m.thumbnail))
        .and_then(|path| load_thumbnail_as_data_uri(&path));

    let idle = !operation_running && !m.busy;

    Some(ModDetails {
        slug: m.slug.clone(),
        name: m.name.clone(),
        author: m.author.clone(),
        description: m.description.clone(),
        can_install_uninstall: idle,
        can_update: idle && !m.is_local && m.update_available,
        can_delete: idle,
        can_view_online: !m.is_local && !m.source_url.is_empty(),
        tool_info: m.tool_info(),
        thumbnail_data,
        state,
    })
}
