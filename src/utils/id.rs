use crate::models::error::SError;
use regex::Regex;
use std::sync::OnceLock;

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("static regex"))
}

/// Makes a remote slug usable as a directory name: every invalid path character
/// becomes a space.
pub fn sanitize_slug(raw: &str) -> Result<String, SError> {
    let slug = invalid_chars().replace_all(raw, " ").trim().to_string();
    if slug.is_empty() || slug == "." || slug == ".." {
        return Err(SError::ParseError(format!("unusable slug: {raw:?}")));
    }
    Ok(slug)
}

pub fn local_slug() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_invalid_characters() {
        assert_eq!(sanitize_slug("cool-outfit").unwrap(), "cool-outfit");
        assert_eq!(sanitize_slug("a/b:c").unwrap(), "a b c");
        assert_eq!(sanitize_slug("  ..\\x  ").unwrap(), ".. x");
    }

    #[test]
    fn rejects_empty_and_dot_slugs() {
        assert!(sanitize_slug("///").is_err());
        assert!(sanitize_slug("..").is_err());
    }

    #[test]
    fn local_slugs_are_unique() {
        assert_ne!(local_slug(), local_slug());
    }
}
