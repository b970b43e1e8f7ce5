//! Adapter layer: convert remote store DTOs to and from the domain model
//!
//! This is the ONLY place where remote DTOs become `SourceRecord`s and where
//! domain values become filter or property JSON. If the wire format changes,
//! only this file and dto.rs need to change.

use serde_json::{Value, json};

use super::dto;
use crate::model::{FieldValue, SourceKind, SourceRecord, SourceSchema};
use crate::sources::RecordUpdate;

/// Which database properties carry what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSchema {
    pub title_field: String,
    pub artist_field: String,
    pub external_id_field: Option<String>,
    /// One per audio format
    pub fingerprint_fields: Vec<String>,
    pub url_fields: Vec<String>,
    pub file_fields: Vec<String>,
    pub downloaded_field: Option<String>,
}

impl Default for RemoteSchema {
    fn default() -> Self {
        Self {
            title_field: "Title".to_string(),
            artist_field: "Artist".to_string(),
            external_id_field: Some("Spotify ID".to_string()),
            fingerprint_fields: vec![
                "M4A Fingerprint".to_string(),
                "FLAC Fingerprint".to_string(),
                "MP3 Fingerprint".to_string(),
            ],
            url_fields: vec![
                "Spotify URL".to_string(),
                "SoundCloud URL".to_string(),
                "YouTube URL".to_string(),
            ],
            file_fields: vec![
                "M4A File Path".to_string(),
                "FLAC File Path".to_string(),
                "MP3 File Path".to_string(),
            ],
            downloaded_field: Some("Downloaded".to_string()),
        }
    }
}

impl RemoteSchema {
    /// The matcher-facing view of this schema.
    pub fn source_schema(&self) -> SourceSchema {
        SourceSchema {
            fingerprint_fields: self.fingerprint_fields.clone(),
            url_fields: self.url_fields.clone(),
            external_id_field: self.external_id_field.clone(),
            file_fields: self.file_fields.clone(),
        }
    }
}

/// Convert a page to a record.
pub fn to_record(page: dto::Page, schema: &RemoteSchema) -> SourceRecord {
    let mut record = SourceRecord::new(SourceKind::RemoteStore, page.id);

    for (name, value) in page.properties {
        let Some(value) = to_field_value(value) else {
            continue;
        };

        if name == schema.title_field {
            record.title = value.as_text().map(str::to_string).filter(|s| !s.is_empty());
        } else if name == schema.artist_field {
            record.artist = value.as_text().map(str::to_string).filter(|s| !s.is_empty());
        } else if schema.external_id_field.as_deref() == Some(name.as_str()) {
            record.external_id = value.as_text().map(str::to_string).filter(|s| !s.is_empty());
        }
        record.fields.insert(name, value);
    }

    record
}

/// Convert one property value; `None` for empty or unsupported values.
fn to_field_value(value: dto::PropertyValue) -> Option<FieldValue> {
    use dto::PropertyValue as P;

    match value {
        P::Title { title: parts } | P::RichText { rich_text: parts } => {
            Some(FieldValue::Text(plain_text(&parts)))
        }
        P::Url { url } => url.map(FieldValue::Url),
        P::Number { number } => number.map(FieldValue::Number),
        P::Checkbox { checkbox } => Some(FieldValue::Flag(checkbox)),
        P::Select { select } => select.map(|o| FieldValue::Text(o.name)),
        P::MultiSelect { multi_select } => Some(FieldValue::Tags(
            multi_select.into_iter().map(|o| o.name).collect(),
        )),
        P::Files { files } => Some(FieldValue::Files(
            files
                .into_iter()
                .map(|f| {
                    f.external
                        .or(f.file)
                        .map(|link| link.url)
                        .unwrap_or(f.name)
                })
                .collect(),
        )),
        P::Unsupported => None,
    }
}

fn plain_text(parts: &[dto::RichText]) -> String {
    parts.iter().map(|p| p.plain_text.as_str()).collect()
}

/// Equality filter for a property of the given live type.
///
/// `None` when the value cannot be expressed for that type (a non-numeric
/// value against a number property, or a type with no equality filter).
pub fn equals_filter(field: &str, property_type: &str, value: &str) -> Option<Value> {
    let condition = match property_type {
        "title" | "rich_text" | "url" | "email" | "phone_number" => json!({ "equals": value }),
        "select" | "status" => json!({ "equals": value }),
        "multi_select" => json!({ "contains": value }),
        "number" => json!({ "equals": value.trim().parse::<f64>().ok()? }),
        "checkbox" => json!({ "equals": value.trim().parse::<bool>().ok()? }),
        _ => return None,
    };

    let mut filter = serde_json::Map::new();
    filter.insert("property".to_string(), Value::from(field));
    filter.insert(property_type.to_string(), condition);
    Some(Value::Object(filter))
}

/// Substring filter on the title property, keyed by its live type.
///
/// `None` for types without a text `contains` condition.
pub fn title_contains_filter(title_field: &str, property_type: &str, prefix: &str) -> Option<Value> {
    if !matches!(property_type, "title" | "rich_text") {
        return None;
    }
    let mut filter = serde_json::Map::new();
    filter.insert("property".to_string(), Value::from(title_field));
    filter.insert(property_type.to_string(), json!({ "contains": prefix }));
    Some(Value::Object(filter))
}

/// Property JSON for a page update.
///
/// Fields missing from the live schema are skipped, as are values that do
/// not fit the property's type.
pub fn to_properties(update: &RecordUpdate, live: &dto::Database) -> Value {
    let mut properties = serde_json::Map::new();

    for (name, value) in update {
        let Some(schema) = live.properties.get(name) else {
            continue;
        };
        if let Some(property) = property_json(&schema.kind, value) {
            properties.insert(name.clone(), property);
        }
    }

    Value::Object(properties)
}

fn property_json(kind: &str, value: &FieldValue) -> Option<Value> {
    let text = |s: &str| json!([{ "type": "text", "text": { "content": s } }]);

    Some(match (kind, value) {
        ("title", v) => json!({ "title": text(v.as_text()?) }),
        ("rich_text", v) => json!({ "rich_text": text(v.as_text()?) }),
        ("url", v) => json!({ "url": v.as_text()? }),
        ("select", v) => json!({ "select": { "name": v.as_text()? } }),
        ("number", FieldValue::Number(n)) => json!({ "number": n }),
        ("checkbox", FieldValue::Flag(b)) => json!({ "checkbox": b }),
        ("multi_select", FieldValue::Tags(tags)) => {
            json!({ "multi_select": tags.iter().map(|t| json!({ "name": t })).collect::<Vec<_>>() })
        }
        _ => return None,
    })
}
