//! The asset being checked for duplication, and the boundary normalizers
//! that build one from whatever shape the caller has on hand.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::record::{FieldValue, RecordRef, SourceKind, SourceRecord, SourceSchema};
use crate::canonical::CompletenessRules;

/// A candidate asset. Immutable for the duration of a check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateAsset {
    /// Opaque caller-side identifier
    pub local_id: String,
    pub title: String,
    pub artist: String,
    /// Platform-assigned track ID
    pub external_id: Option<String>,
    // SmallVec: candidates almost always carry zero to two source links
    pub source_urls: SmallVec<[String; 2]>,
    /// Duration in seconds
    pub duration: Option<f64>,
    pub file_path: Option<PathBuf>,
    /// Precomputed fingerprint hashes keyed by format
    pub fingerprints: BTreeMap<String, String>,
    /// The stored record this candidate was built from. Never reported as
    /// a match for the candidate itself.
    #[serde(default)]
    pub origin: Option<RecordRef>,
}

impl CandidateAsset {
    pub fn new(
        local_id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            local_id: local_id.into(),
            title: title.into(),
            artist: artist.into(),
            ..Default::default()
        }
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.source_urls.push(url.into());
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_fingerprint(mut self, format: impl Into<String>, hash: impl Into<String>) -> Self {
        self.fingerprints.insert(format.into(), hash.into());
        self
    }

    pub fn with_origin(mut self, origin: RecordRef) -> Self {
        self.origin = Some(origin);
        self
    }

    /// `record` is the stored record this candidate came from.
    pub fn is_origin(&self, record: &RecordRef) -> bool {
        self.origin.as_ref() == Some(record)
    }

    /// Title and artist are both usable for fuzzy matching.
    pub fn has_title_and_artist(&self) -> bool {
        !self.title.trim().is_empty() && !self.artist.trim().is_empty()
    }

    /// Build a candidate from a backing-store record.
    ///
    /// Fingerprints are keyed by the field they came from, URLs are collected
    /// from every URL field the schema names, and the first non-empty file
    /// field becomes the local file path. The record's identity is kept as
    /// the candidate's origin.
    pub fn from_record(record: &SourceRecord, schema: &SourceSchema) -> Self {
        let mut candidate = Self::new(
            record.id.clone(),
            record.title.clone().unwrap_or_default(),
            record.artist.clone().unwrap_or_default(),
        )
        .with_origin(record.identity());
        candidate.external_id = record.external_id.clone().or_else(|| {
            schema
                .external_id_field
                .as_deref()
                .and_then(|f| record.field(f))
                .and_then(FieldValue::as_text)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        });

        for field in &schema.url_fields {
            if let Some(url) = record.field(field).and_then(FieldValue::as_text)
                && !url.trim().is_empty()
            {
                candidate.source_urls.push(url.to_string());
            }
        }

        for field in &schema.fingerprint_fields {
            if let Some(hash) = record.field(field).and_then(FieldValue::as_text)
                && !hash.trim().is_empty()
            {
                candidate.fingerprints.insert(field.clone(), hash.to_string());
            }
        }

        candidate.file_path = schema
            .file_fields
            .iter()
            .filter_map(|f| record.field(f).and_then(FieldValue::as_text))
            .find(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        if let Some(FieldValue::Number(secs)) = record.field("duration") {
            candidate.duration = Some(*secs);
        }

        candidate
    }

    /// Build a candidate from a loosely-typed record dictionary.
    ///
    /// Recognised keys: `id`/`local_id`, `title`, `artist`,
    /// `external_id`/`spotify_id`, `url`/`urls`, `duration`, `file_path`, and
    /// `fingerprints` (an object of format -> hash). Returns `None` when the
    /// value is not an object.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| {
            obj.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let mut candidate = Self::new(
            text("id")
                .or_else(|| text("local_id"))
                .or_else(|| obj.get("id").and_then(|v| v.as_i64()).map(|n| n.to_string()))
                .unwrap_or_default(),
            text("title").unwrap_or_default(),
            text("artist").unwrap_or_default(),
        );
        candidate.external_id = text("external_id").or_else(|| text("spotify_id"));
        candidate.duration = obj.get("duration").and_then(|v| v.as_f64());
        candidate.file_path = text("file_path").map(PathBuf::from);

        if let Some(url) = text("url") {
            candidate.source_urls.push(url);
        }
        if let Some(urls) = obj.get("urls").and_then(|v| v.as_array()) {
            candidate.source_urls.extend(
                urls.iter()
                    .filter_map(|u| u.as_str())
                    .filter(|u| !u.trim().is_empty())
                    .map(str::to_string),
            );
        }
        if let Some(fps) = obj.get("fingerprints").and_then(|v| v.as_object()) {
            for (format, hash) in fps {
                if let Some(hash) = hash.as_str().filter(|h| !h.is_empty()) {
                    candidate.fingerprints.insert(format.clone(), hash.to_string());
                }
            }
        }

        Some(candidate)
    }

    /// Project the candidate into record shape for clustering.
    ///
    /// A candidate with an origin takes the origin's identity, so it
    /// clusters as the stored record rather than as a separate node. The
    /// file path lands in the first file field of `rules` and the
    /// fingerprints fill the fingerprint fields in format order.
    pub fn to_record(&self, rules: &CompletenessRules) -> SourceRecord {
        let mut record = match &self.origin {
            Some(origin) => SourceRecord::new(origin.source, origin.id.clone()),
            None => SourceRecord::new(SourceKind::Candidate, self.local_id.clone()),
        };
        record.title = Some(self.title.clone()).filter(|s| !s.trim().is_empty());
        record.artist = Some(self.artist.clone()).filter(|s| !s.trim().is_empty());
        record.external_id = self.external_id.clone();

        if let (Some(path), Some(field)) = (&self.file_path, rules.file_fields.first()) {
            record.fields.insert(
                field.clone(),
                FieldValue::Text(path.to_string_lossy().into_owned()),
            );
        }
        for (field, hash) in rules.fingerprint_fields.iter().zip(self.fingerprints.values()) {
            record
                .fields
                .insert(field.clone(), FieldValue::Text(hash.clone()));
        }
        if let Some(url) = self.source_urls.first() {
            record
                .fields
                .insert("url".to_string(), FieldValue::Url(url.clone()));
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_full() {
        let raw = json!({
            "id": "row-7",
            "title": "Test Track",
            "artist": "Test Artist",
            "spotify_id": "abc",
            "urls": ["https://open.spotify.com/track/abc", ""],
            "duration": 180.5,
            "file_path": "/music/test.m4a",
            "fingerprints": {"m4a": "h1", "flac": ""}
        });

        let candidate = CandidateAsset::from_json(&raw).unwrap();
        assert_eq!(candidate.local_id, "row-7");
        assert_eq!(candidate.external_id.as_deref(), Some("abc"));
        assert_eq!(candidate.source_urls.len(), 1);
        assert_eq!(candidate.duration, Some(180.5));
        assert_eq!(candidate.file_path, Some(PathBuf::from("/music/test.m4a")));
        assert_eq!(candidate.fingerprints.len(), 1);
        assert_eq!(candidate.fingerprints["m4a"], "h1");
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(CandidateAsset::from_json(&json!(["not", "an", "object"])).is_none());
    }

    #[test]
    fn test_from_record_uses_schema() {
        let schema = SourceSchema {
            fingerprint_fields: vec!["M4A Fingerprint".into()],
            url_fields: vec!["SoundCloud URL".into(), "Spotify URL".into()],
            external_id_field: Some("Spotify ID".into()),
            file_fields: vec!["M4A File Path".into()],
        };
        let record = SourceRecord::new(SourceKind::RemoteStore, "page-1")
            .with_title("Song")
            .with_artist("Band")
            .with_field("M4A Fingerprint", FieldValue::Text("fp-hash".into()))
            .with_field("Spotify URL", FieldValue::Url("https://open.spotify.com/track/x".into()))
            .with_field("Spotify ID", FieldValue::Text("x".into()))
            .with_field("M4A File Path", FieldValue::Text("/m/song.m4a".into()));

        let candidate = CandidateAsset::from_record(&record, &schema);
        assert_eq!(candidate.local_id, "page-1");
        assert!(candidate.is_origin(&RecordRef::new(SourceKind::RemoteStore, "page-1")));
        assert_eq!(candidate.external_id.as_deref(), Some("x"));
        assert_eq!(candidate.source_urls.as_slice(), ["https://open.spotify.com/track/x"]);
        assert_eq!(candidate.fingerprints["M4A Fingerprint"], "fp-hash");
        assert_eq!(candidate.file_path, Some(PathBuf::from("/m/song.m4a")));
    }

    #[test]
    fn test_title_and_artist_presence() {
        assert!(CandidateAsset::new("1", "Song", "Band").has_title_and_artist());
        assert!(!CandidateAsset::new("1", "Song", "  ").has_title_and_artist());
    }

    #[test]
    fn test_to_record_projects_fields() {
        let rules = CompletenessRules {
            file_fields: vec!["File".into()],
            fingerprint_fields: vec!["Fingerprint".into()],
            downloaded_field: None,
        };
        let record = CandidateAsset::new("c1", "Song", "Band")
            .with_file("/music/song.flac")
            .with_fingerprint("spectral", "abc")
            .to_record(&rules);

        assert_eq!(record.source, SourceKind::Candidate);
        assert!(record.has_field("File"));
        assert!(record.has_field("Fingerprint"));
        assert_eq!(record.artist.as_deref(), Some("Band"));
    }

    #[test]
    fn test_to_record_keeps_origin_identity() {
        let stored = SourceRecord::new(SourceKind::AssetLibrary, "item-9").with_title("Song");
        let record = CandidateAsset::from_record(&stored, &SourceSchema::default())
            .to_record(&CompletenessRules::default());

        assert_eq!(record.identity(), stored.identity());
        assert!(CandidateAsset::from_json(&json!({"id": "x"})).unwrap().origin.is_none());
    }
}
