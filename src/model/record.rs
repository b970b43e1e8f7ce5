//! Records as the backing stores see them.
//!
//! Every adapter converts its native shape into a [`SourceRecord`]; nothing
//! past the adapter boundary knows which wire format a record came from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which backing store produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Structured remote metadata store (database pages)
    RemoteStore,
    /// Local asset-management library
    AssetLibrary,
    /// Raw filesystem
    Filesystem,
    /// A candidate taking part in a batch run
    Candidate,
}

impl SourceKind {
    /// Stable string form for logs and persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::RemoteStore => "remote_store",
            SourceKind::AssetLibrary => "asset_library",
            SourceKind::Filesystem => "filesystem",
            SourceKind::Candidate => "candidate",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote_store" => Ok(SourceKind::RemoteStore),
            "asset_library" => Ok(SourceKind::AssetLibrary),
            "filesystem" => Ok(SourceKind::Filesystem),
            "candidate" => Ok(SourceKind::Candidate),
            other => Err(format!("unknown source kind: {other}")),
        }
    }
}

/// Stable identity of a record: the adapter that owns it plus its opaque ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordRef {
    pub source: SourceKind,
    pub id: String,
}

impl RecordRef {
    pub fn new(source: SourceKind, id: impl Into<String>) -> Self {
        Self {
            source,
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

/// A single field value on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Url(String),
    Number(f64),
    Flag(bool),
    Files(Vec<String>),
    Tags(Vec<String>),
}

impl FieldValue {
    /// Whether the field carries anything useful.
    ///
    /// Empty strings and lists count as absent, and so does a `false` flag.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Url(s) => !s.trim().is_empty(),
            FieldValue::Number(_) => true,
            FieldValue::Flag(b) => *b,
            FieldValue::Files(v) | FieldValue::Tags(v) => v.iter().any(|s| !s.trim().is_empty()),
        }
    }

    /// Textual view of the value, if it has one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Url(s) => Some(s.as_str()),
            FieldValue::Files(v) | FieldValue::Tags(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

/// A record from any backing store, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: SourceKind,
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Platform-assigned track ID (e.g. a Spotify track ID)
    pub external_id: Option<String>,
    /// Everything else, keyed by the store's own field name
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl SourceRecord {
    pub fn new(source: SourceKind, id: impl Into<String>) -> Self {
        Self {
            source,
            id: id.into(),
            title: None,
            artist: None,
            external_id: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn identity(&self) -> RecordRef {
        RecordRef::new(self.source, self.id.clone())
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// True when the named field exists and is non-empty.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(FieldValue::is_present)
    }
}

/// The fields an adapter exposes to the matcher.
///
/// The matcher only issues queries for fields listed here, so an adapter that
/// lacks a capability simply declares nothing for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSchema {
    /// One fingerprint field per audio format
    pub fingerprint_fields: Vec<String>,
    /// URL-typed fields (source links)
    pub url_fields: Vec<String>,
    /// Field holding the platform-assigned track ID
    pub external_id_field: Option<String>,
    /// Fields holding local file paths or attachments
    pub file_fields: Vec<String>,
}
