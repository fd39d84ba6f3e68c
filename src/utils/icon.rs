use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use camino::Utf8Path;
use std::fs;

/// Loads a thumbnail and encodes it as a data URI string.
/// Returns None if the file doesn't exist or has an unsupported extension.
pub fn load_thumbnail_as_data_uri(path: &Utf8Path) -> Option<String> {
    let mime_type = match path.extension()?.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => return None,
    };

    let bytes = fs::read(path).ok()?;
    Some(format!("data:{};base64,{}", mime_type, BASE64.encode(&bytes)))
}

/// Picks the thumbnail extension from the image URL, defaulting to jpg.
pub fn thumbnail_extension(image_url: &str) -> String {
    let path = image_url.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default();
    match name.rsplit_once('.') {
        Some((_, ext)) if matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg" | "webp" | "gif") => {
            ext.to_ascii_lowercase()
        }
        _ => "jpg".to_string(),
    }
}
