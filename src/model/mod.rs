//! Core data model for duplicate detection.
//!
//! - [`CandidateAsset`]: the asset being checked
//! - [`SourceRecord`]: a record from any backing store, normalized
//! - [`MatchCandidate`]: one hit from one adapter using one strategy
//! - [`DuplicateVerdict`]: the outcome of a check
//!
//! All of these are plain values; the only shared state in the crate is the
//! fingerprint cache.

mod candidate;
mod record;

pub use candidate::CandidateAsset;
pub use record::{FieldValue, RecordRef, SourceKind, SourceRecord, SourceSchema};

use serde::{Deserialize, Serialize};

/// How a match was found.
///
/// Variants are declared in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    Fingerprint,
    ExternalUrl,
    ExternalId,
    /// Title and artist agreed at or above the exact-match cutoff
    Exact,
    FuzzyTitleArtist,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Fingerprint => "fingerprint",
            MatchStrategy::ExternalUrl => "external-url",
            MatchStrategy::ExternalId => "external-id",
            MatchStrategy::Exact => "exact",
            MatchStrategy::FuzzyTitleArtist => "fuzzy-title-artist",
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single hit from one source adapter using one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Snapshot of the matched record
    pub record: SourceRecord,
    /// Similarity in [0, 1]
    pub score: f64,
    pub strategy: MatchStrategy,
    pub fingerprint_match: bool,
    pub metadata_match: bool,
}

impl MatchCandidate {
    pub fn identity(&self) -> RecordRef {
        self.record.identity()
    }

    pub fn title(&self) -> Option<&str> {
        self.record.title.as_deref()
    }

    pub fn artist(&self) -> Option<&str> {
        self.record.artist.as_deref()
    }
}

/// Outcome of checking one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicateVerdict {
    /// True iff the best score is at or above the duplicate threshold
    pub is_duplicate: bool,
    pub best_match: Option<RecordRef>,
    pub score: f64,
    pub strategy: Option<MatchStrategy>,
    pub fingerprint_match: bool,
    pub metadata_match: bool,
    /// Full ranked match list, best first
    pub matches: Vec<MatchCandidate>,
    /// Degradations that did not fail the check (adapter outages etc.)
    pub warnings: Vec<String>,
    /// Why the candidate's file could not be fingerprinted, if it could not
    pub fingerprint_error: Option<String>,
}

impl DuplicateVerdict {
    /// Build a verdict from a ranked match list.
    pub fn from_ranked(matches: Vec<MatchCandidate>, duplicate_threshold: f64) -> Self {
        let Some(top) = matches.first() else {
            return Self::default();
        };
        Self {
            is_duplicate: top.score >= duplicate_threshold,
            best_match: Some(top.identity()),
            score: top.score,
            strategy: Some(top.strategy),
            fingerprint_match: top.fingerprint_match,
            metadata_match: top.metadata_match,
            matches,
            warnings: Vec::new(),
            fingerprint_error: None,
        }
    }

    pub fn top(&self) -> Option<&MatchCandidate> {
        self.matches.first()
    }
}
