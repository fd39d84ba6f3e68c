use crate::models::error::SError;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

const MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Validated view of a remote package post.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteModRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub modified: NaiveDateTime,
    pub compatible: bool,
    pub image_url: String,
    pub package_url: String,
}

#[derive(Deserialize)]
struct Rendered {
    rendered: String,
}

#[derive(Deserialize)]
struct WirePost {
    id: Value,
    slug: String,
    title: Rendered,
    #[serde(default)]
    content: Option<Rendered>,
    #[serde(default)]
    author_name: String,
    modified: String,
    #[serde(default)]
    compatible: String,
    #[serde(default)]
    image: String,
    #[serde(rename = "File")]
    file: String,
}

impl RemoteModRecord {
    pub fn from_json(raw: &str) -> Result<Self, SError> {
        let post: WirePost = serde_json::from_str(raw)?;

        let id = match post.id {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => return Err(SError::ParseError(format!("unexpected id: {other}"))),
        };

        for (field, value) in [("id", &id), ("title", &post.title.rendered), ("File", &post.file)] {
            if value.trim().is_empty() {
                return Err(SError::ParseError(format!("post field '{field}' is empty")));
            }
        }

        Ok(Self {
            id,
            slug: post.slug,
            title: post.title.rendered,
            description: post.content.map(|c| c.rendered).unwrap_or_default(),
            author: post.author_name,
            modified: parse_modified(&post.modified)?,
            compatible: post.compatible == "Yes",
            image_url: post.image,
            package_url: post.file,
        })
    }
}

pub fn parse_modified(raw: &str) -> Result<NaiveDateTime, SError> {
    Ok(NaiveDateTime::parse_from_str(&raw.replace('T', " "), MODIFIED_FORMAT)?)
}
