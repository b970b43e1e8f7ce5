//! Keep / skip / merge decisions from a ranked match list.
//!
//! A pure function of the top match; nothing is persisted.
//!
//! | Top match | Action |
//! |---|---|
//! | none | keep ("no duplicates found") |
//! | fingerprint match, score >= 0.98 | skip (exact duplicate) |
//! | metadata match only | merge (may be a different version) |
//! | score below the duplicate threshold | keep |
//! | anything else | skip |

use serde::{Deserialize, Serialize};

use crate::model::MatchCandidate;

/// What the caller should do with the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// New asset, import it
    Keep,
    /// Already present, do not import
    Skip,
    /// Probably an alternate version; link rather than delete
    Merge,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Keep => "keep",
            Action::Skip => "skip",
            Action::Merge => "merge",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(Action::Keep),
            "skip" => Ok(Action::Skip),
            "merge" => Ok(Action::Merge),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// Which rule produced a [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    NoDuplicates,
    ExactFingerprint,
    MetadataOnly,
    BelowThreshold,
    Duplicate,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::NoDuplicates => "no_duplicates",
            ReasonCode::ExactFingerprint => "exact_fingerprint",
            ReasonCode::MetadataOnly => "metadata_only",
            ReasonCode::BelowThreshold => "below_threshold",
            ReasonCode::Duplicate => "duplicate",
        }
    }
}

impl std::str::FromStr for ReasonCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ReasonCode::NoDuplicates,
            ReasonCode::ExactFingerprint,
            ReasonCode::MetadataOnly,
            ReasonCode::BelowThreshold,
            ReasonCode::Duplicate,
        ]
        .into_iter()
        .find(|code| code.as_str() == s)
        .ok_or_else(|| format!("unknown reason code: {s}"))
    }
}

/// Action plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub action: Action,
    pub code: ReasonCode,
    pub reason: String,
}

impl Resolution {
    fn new(action: Action, code: ReasonCode, reason: impl Into<String>) -> Self {
        Self {
            action,
            code,
            reason: reason.into(),
        }
    }
}

/// Thresholds for [`ResolutionPolicy::resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionPolicy {
    pub duplicate_threshold: f64,
    /// Fingerprint matches at or above this are exact duplicates
    pub exact_fingerprint_threshold: f64,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.95,
            exact_fingerprint_threshold: 0.98,
        }
    }
}

impl ResolutionPolicy {
    pub fn new(duplicate_threshold: f64) -> Self {
        Self {
            duplicate_threshold,
            ..Default::default()
        }
    }

    /// Decide from a ranked (best first) match list.
    pub fn resolve(&self, ranked: &[MatchCandidate]) -> Resolution {
        let Some(top) = ranked.first() else {
            return Resolution::new(Action::Keep, ReasonCode::NoDuplicates, "no duplicates found");
        };

        if top.fingerprint_match && top.score >= self.exact_fingerprint_threshold {
            return Resolution::new(
                Action::Skip,
                ReasonCode::ExactFingerprint,
                format!("exact fingerprint duplicate of {}", top.identity()),
            );
        }

        if top.metadata_match && !top.fingerprint_match {
            return Resolution::new(
                Action::Merge,
                ReasonCode::MetadataOnly,
                "metadata match only - may be a different version",
            );
        }

        if top.score < self.duplicate_threshold {
            return Resolution::new(
                Action::Keep,
                ReasonCode::BelowThreshold,
                "similarity below threshold",
            );
        }

        Resolution::new(
            Action::Skip,
            ReasonCode::Duplicate,
            format!("duplicate of {}", top.identity()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchStrategy, SourceKind, SourceRecord};

    fn top(score: f64, fingerprint_match: bool, metadata_match: bool) -> Vec<MatchCandidate> {
        vec![MatchCandidate {
            record: SourceRecord::new(SourceKind::RemoteStore, "page-9"),
            score,
            strategy: if fingerprint_match {
                MatchStrategy::Fingerprint
            } else {
                MatchStrategy::FuzzyTitleArtist
            },
            fingerprint_match,
            metadata_match,
        }]
    }

    #[test]
    fn test_empty_keeps() {
        let r = ResolutionPolicy::default().resolve(&[]);
        assert_eq!(r.action, Action::Keep);
        assert_eq!(r.reason, "no duplicates found");
        assert_eq!(r.code, ReasonCode::NoDuplicates);
    }

    #[test]
    fn test_exact_fingerprint_skips() {
        let r = ResolutionPolicy::default().resolve(&top(0.99, true, false));
        assert_eq!(r.action, Action::Skip);
        assert_eq!(r.code, ReasonCode::ExactFingerprint);
        assert!(r.reason.contains("remote_store:page-9"));
    }

    #[test]
    fn test_metadata_only_merges() {
        let r = ResolutionPolicy::new(0.95).resolve(&top(0.85, false, true));
        assert_eq!(r.action, Action::Merge);
        assert_eq!(r.code, ReasonCode::MetadataOnly);
    }

    #[test]
    fn test_below_threshold_keeps() {
        // Fingerprint match too weak for the exact rule and below threshold
        let r = ResolutionPolicy::new(0.95).resolve(&top(0.90, true, false));
        assert_eq!(r.action, Action::Keep);
        assert_eq!(r.reason, "similarity below threshold");
    }

    #[test]
    fn test_strong_fingerprint_below_exact_skips() {
        let r = ResolutionPolicy::new(0.95).resolve(&top(0.96, true, false));
        assert_eq!(r.action, Action::Skip);
        assert_eq!(r.code, ReasonCode::Duplicate);
        assert!(r.reason.starts_with("duplicate of"));
    }

    #[test]
    fn test_only_top_match_matters() {
        let mut ranked = top(0.99, true, false);
        ranked.extend(top(0.5, false, true));
        assert_eq!(
            ResolutionPolicy::default().resolve(&ranked).action,
            Action::Skip
        );
    }

    #[test]
    fn test_stable_strings() {
        assert_eq!(Action::Merge.as_str(), "merge");
        assert_eq!(ReasonCode::BelowThreshold.as_str(), "below_threshold");
        assert_eq!(serde_json::to_string(&Action::Skip).unwrap(), "\"skip\"");
        assert_eq!("merge".parse::<Action>(), Ok(Action::Merge));
        assert_eq!("metadata_only".parse::<ReasonCode>(), Ok(ReasonCode::MetadataOnly));
        assert!("delete".parse::<Action>().is_err());
    }
}
