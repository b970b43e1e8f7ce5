//! Adapter layer: convert asset library DTOs to the domain model
//!
//! This is the ONLY place where library items become `SourceRecord`s.

use super::dto;
use crate::model::{FieldValue, SourceKind, SourceRecord, SourceSchema};

/// Record field holding the fingerprint recovered from tags
pub const FINGERPRINT_FIELD: &str = "fingerprint";
/// Record field holding the item's source URL
pub const URL_FIELD: &str = "url";
/// Record field holding the external ID recovered from tags
pub const EXTERNAL_ID_FIELD: &str = "external_id";
/// Record field holding the item's file name
pub const FILE_FIELD: &str = "file";
/// Record field holding the raw tag list
pub const TAGS_FIELD: &str = "tags";

/// How identifiers are encoded as tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConventions {
    /// e.g. `fingerprint:` for `fingerprint:<hash>`
    pub fingerprint_prefix: String,
    /// e.g. `spotify:` for `spotify:<track id>`
    pub external_id_prefix: String,
}

impl Default for TagConventions {
    fn default() -> Self {
        Self {
            fingerprint_prefix: "fingerprint:".to_string(),
            external_id_prefix: "spotify:".to_string(),
        }
    }
}

impl TagConventions {
    pub fn fingerprint_tag(&self, hash: &str) -> String {
        format!("{}{}", self.fingerprint_prefix, hash)
    }

    pub fn external_id_tag(&self, id: &str) -> String {
        format!("{}{}", self.external_id_prefix, id)
    }
}

/// Fields the library exposes to the matcher.
pub fn library_schema() -> SourceSchema {
    SourceSchema {
        fingerprint_fields: vec![FINGERPRINT_FIELD.to_string()],
        url_fields: vec![URL_FIELD.to_string()],
        external_id_field: Some(EXTERNAL_ID_FIELD.to_string()),
        file_fields: vec![FILE_FIELD.to_string()],
    }
}

/// Convert a library item to a record.
pub fn to_record(item: dto::Item, tags: &TagConventions) -> SourceRecord {
    let (artist, title) = split_display_name(&item.name);

    let mut record = SourceRecord::new(SourceKind::AssetLibrary, item.id);
    record.title = title;
    record.artist = artist;
    record.external_id = tag_value(&item.tags, &tags.external_id_prefix);

    if let Some(hash) = tag_value(&item.tags, &tags.fingerprint_prefix) {
        record.fields.insert(FINGERPRINT_FIELD.into(), FieldValue::Text(hash));
    }
    if let Some(id) = &record.external_id {
        record
            .fields
            .insert(EXTERNAL_ID_FIELD.into(), FieldValue::Text(id.clone()));
    }
    if !item.url.trim().is_empty() {
        record.fields.insert(URL_FIELD.into(), FieldValue::Url(item.url));
    }
    if !item.name.is_empty() {
        let file = if item.ext.is_empty() {
            item.name.clone()
        } else {
            format!("{}.{}", item.name, item.ext)
        };
        record.fields.insert(FILE_FIELD.into(), FieldValue::Files(vec![file]));
    }
    if let Some(secs) = item.duration {
        record.fields.insert("duration".into(), FieldValue::Number(secs));
    }
    record
        .fields
        .insert(TAGS_FIELD.into(), FieldValue::Tags(item.tags));

    record
}

/// Split "Artist - Title" into its parts.
///
/// Names without the separator are all title.
fn split_display_name(name: &str) -> (Option<String>, Option<String>) {
    let non_empty = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());

    match name.split_once(" - ") {
        Some((artist, title)) => (non_empty(artist), non_empty(title)),
        None => (None, non_empty(name)),
    }
}

/// Value of the first tag starting with `prefix`.
fn tag_value(tags: &[String], prefix: &str) -> Option<String> {
    tags.iter()
        .find_map(|t| t.strip_prefix(prefix))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, tags: &[&str]) -> dto::Item {
        dto::Item {
            id: "ITEM1".into(),
            name: name.into(),
            ext: "m4a".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            url: "https://soundcloud.com/a/b".into(),
            annotation: String::new(),
            duration: Some(200.0),
        }
    }

    #[test]
    fn test_item_to_record() {
        let record = to_record(
            item("New Order - Blue Monday", &["fingerprint:H1", "spotify:abc", "synth"]),
            &TagConventions::default(),
        );

        assert_eq!(record.source, SourceKind::AssetLibrary);
        assert_eq!(record.artist.as_deref(), Some("New Order"));
        assert_eq!(record.title.as_deref(), Some("Blue Monday"));
        assert_eq!(record.external_id.as_deref(), Some("abc"));
        assert_eq!(
            record.field(FINGERPRINT_FIELD),
            Some(&FieldValue::Text("H1".into()))
        );
        assert_eq!(
            record.field(FILE_FIELD),
            Some(&FieldValue::Files(vec!["New Order - Blue Monday.m4a".into()]))
        );
        assert!(record.has_field(URL_FIELD));
    }

    #[test]
    fn test_name_without_separator() {
        let record = to_record(item("Untitled Demo", &[]), &TagConventions::default());
        assert_eq!(record.title.as_deref(), Some("Untitled Demo"));
        assert!(record.artist.is_none());
        assert!(record.external_id.is_none());
        assert!(!record.has_field(FINGERPRINT_FIELD));
    }

    #[test]
    fn test_custom_tag_prefixes() {
        let tags = TagConventions {
            fingerprint_prefix: "fp/".into(),
            external_id_prefix: "sp/".into(),
        };
        let record = to_record(item("A - B", &["fp/xyz", "sp/123"]), &tags);
        assert_eq!(record.external_id.as_deref(), Some("123"));
        assert_eq!(tags.fingerprint_tag("xyz"), "fp/xyz");
    }
}
