//! Multi-source matching.
//!
//! For one candidate, every applicable strategy runs against every adapter:
//!
//! 1. **Fingerprint** - each known hash against each fingerprint field (score 1.0)
//! 2. **External URL** - raw and normalized URL against each URL field (score 1.0)
//! 3. **External ID** - exact match on the external-ID field (score 1.0)
//! 4. **Fuzzy title/artist** - title-prefix query, then 60% title + 40% artist
//!    similarity, kept at or above the fuzzy threshold
//!
//! All queries run concurrently, each under its own timeout. Adapter errors
//! and timeouts are logged and count as "no matches"; they never fail the
//! check. A candidate built from a stored record never matches that record.
//! Hits are deduplicated per record (highest score wins, ties go to
//! the first discovery) and stably sorted by score, so identical inputs and
//! store state always give the same ranked list.

mod normalize;

pub use normalize::{normalize_text, normalize_url, similarity, title_prefix};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::fingerprint::{Fingerprint, FingerprintGenerator};
use crate::model::{
    CandidateAsset, DuplicateVerdict, MatchCandidate, MatchStrategy, RecordRef, SourceKind,
    SourceRecord,
};
use crate::sources::{AdapterError, SourceAdapter};

/// Fuzzy scores at or above this are tagged [`MatchStrategy::Exact`].
pub const EXACT_MATCH_SCORE: f64 = 0.95;

const TITLE_WEIGHT: f64 = 0.6;
const ARTIST_WEIGHT: f64 = 0.4;

/// Matcher thresholds and limits.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Minimum combined title/artist score for a fuzzy hit
    pub fuzzy_threshold: f64,
    /// Minimum top score for a duplicate verdict
    pub duplicate_threshold: f64,
    /// Per-query timeout
    pub query_timeout: Duration,
    /// Characters of lowercased title sent as the fuzzy query
    pub title_prefix_len: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            duplicate_threshold: 0.95,
            query_timeout: Duration::from_secs(10),
            title_prefix_len: 20,
        }
    }
}

/// Everything learned while matching one candidate.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Deduplicated, best first
    pub matches: Vec<MatchCandidate>,
    pub warnings: Vec<String>,
    /// The candidate's computed fingerprint, if one was computed
    pub fingerprint: Option<Arc<Fingerprint>>,
    pub fingerprint_error: Option<String>,
    /// Cancellation stopped some queries from being issued
    pub cancelled: bool,
}

impl MatchOutcome {
    pub fn into_verdict(self, duplicate_threshold: f64) -> DuplicateVerdict {
        let mut verdict = DuplicateVerdict::from_ranked(self.matches, duplicate_threshold);
        verdict.warnings = self.warnings;
        verdict.fingerprint_error = self.fingerprint_error;
        verdict
    }
}

/// Finds a candidate's counterparts across all configured sources.
pub struct MultiSourceMatcher {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    config: MatcherConfig,
    fingerprinter: Option<FingerprintGenerator>,
    cancel: CancellationToken,
}

/// One query to issue.
struct Query<'a> {
    adapter: &'a dyn SourceAdapter,
    strategy: MatchStrategy,
    lookup: Lookup,
}

enum Lookup {
    Exact { field: String, value: String },
    TitlePrefix(String),
}

enum QueryResult {
    Records(Vec<SourceRecord>),
    FieldAbsent,
    Failed(AdapterError),
    Skipped,
}

impl MultiSourceMatcher {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, config: MatcherConfig) -> Self {
        Self {
            adapters,
            config,
            fingerprinter: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Fingerprint candidates that carry a file path.
    pub fn with_fingerprinter(mut self, generator: FingerprintGenerator) -> Self {
        self.fingerprinter = Some(generator);
        self
    }

    /// Stop issuing queries once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    pub fn fingerprinter(&self) -> Option<&FingerprintGenerator> {
        self.fingerprinter.as_ref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Ranked matches for a candidate, best first.
    pub async fn find_matches(&self, candidate: &CandidateAsset) -> Vec<MatchCandidate> {
        self.evaluate(candidate).await.matches
    }

    /// Verdict for a candidate.
    pub async fn check_duplicate(&self, candidate: &CandidateAsset) -> DuplicateVerdict {
        self.evaluate(candidate)
            .await
            .into_verdict(self.config.duplicate_threshold)
    }

    /// Fingerprint the candidate (if possible) and run every strategy.
    pub async fn evaluate(&self, candidate: &CandidateAsset) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        if let (Some(generator), Some(path)) = (&self.fingerprinter, &candidate.file_path) {
            match generator.generate_async(path).await {
                Ok(fp) => outcome.fingerprint = Some(fp),
                Err(e) => {
                    warn!(
                        candidate = %candidate.local_id,
                        path = %path.display(),
                        error = %e,
                        "Could not fingerprint candidate, continuing with metadata strategies"
                    );
                    outcome.fingerprint_error = Some(e.to_string());
                }
            }
        }

        let hashes = fingerprint_hashes(candidate, outcome.fingerprint.as_deref());
        let queries = self.plan(candidate, &hashes);
        let results = join_all(queries.iter().map(|q| self.run_query(q))).await;

        let mut attempted = 0usize;
        let mut failed = 0usize;
        let mut failing: Vec<(SourceKind, String)> = Vec::new();
        let mut hits = Vec::new();

        for (query, result) in queries.iter().zip(results) {
            match result {
                QueryResult::Records(records) => {
                    attempted += 1;
                    hits.extend(
                        records
                            .into_iter()
                            .filter_map(|r| self.score(candidate, query.strategy, r)),
                    );
                }
                QueryResult::FieldAbsent => {}
                QueryResult::Failed(e) => {
                    attempted += 1;
                    failed += 1;
                    let kind = query.adapter.kind();
                    if !failing.iter().any(|(k, _)| *k == kind) {
                        failing.push((kind, e.to_string()));
                    }
                }
                QueryResult::Skipped => outcome.cancelled = true,
            }
        }

        for (kind, error) in failing {
            outcome
                .warnings
                .push(format!("{kind} queries failed: {error}"));
        }
        if attempted > 0 && failed == attempted {
            outcome
                .warnings
                .push("all source queries failed; no duplicates could be confirmed".to_string());
        }
        if outcome.cancelled {
            outcome
                .warnings
                .push("check cancelled before all queries were issued".to_string());
        }

        outcome.matches = rank(hits);
        debug!(
            candidate = %candidate.local_id,
            matches = outcome.matches.len(),
            queries = queries.len(),
            failed,
            "Matching complete"
        );
        outcome
    }

    /// Queries in strategy priority order, then adapter order.
    fn plan<'a>(&'a self, candidate: &CandidateAsset, hashes: &[String]) -> Vec<Query<'a>> {
        let mut queries = Vec::new();
        let exact = |adapter: &'a Arc<dyn SourceAdapter>, strategy, field: &str, value: &str| Query {
            adapter: adapter.as_ref(),
            strategy,
            lookup: Lookup::Exact {
                field: field.to_string(),
                value: value.to_string(),
            },
        };

        for adapter in &self.adapters {
            for field in &adapter.schema().fingerprint_fields {
                for hash in hashes {
                    queries.push(exact(adapter, MatchStrategy::Fingerprint, field, hash));
                }
            }
        }

        let mut url_forms: Vec<String> = Vec::new();
        for url in candidate.source_urls.iter().filter(|u| !u.trim().is_empty()) {
            for form in [url.trim().to_string(), normalize_url(url)] {
                if !url_forms.contains(&form) {
                    url_forms.push(form);
                }
            }
        }
        for adapter in &self.adapters {
            for field in &adapter.schema().url_fields {
                for form in &url_forms {
                    queries.push(exact(adapter, MatchStrategy::ExternalUrl, field, form));
                }
            }
        }

        if let Some(id) = candidate.external_id.as_deref().filter(|s| !s.trim().is_empty()) {
            for adapter in &self.adapters {
                if let Some(field) = &adapter.schema().external_id_field {
                    queries.push(exact(adapter, MatchStrategy::ExternalId, field, id.trim()));
                }
            }
        }

        if candidate.has_title_and_artist() {
            let prefix = title_prefix(&candidate.title, self.config.title_prefix_len);
            if !prefix.is_empty() {
                for adapter in &self.adapters {
                    queries.push(Query {
                        adapter: adapter.as_ref(),
                        strategy: MatchStrategy::FuzzyTitleArtist,
                        lookup: Lookup::TitlePrefix(prefix.clone()),
                    });
                }
            }
        }

        queries
    }

    async fn run_query(&self, query: &Query<'_>) -> QueryResult {
        if self.cancel.is_cancelled() {
            return QueryResult::Skipped;
        }

        let kind = query.adapter.kind();
        let timeout = self.config.query_timeout;
        let call = async {
            match &query.lookup {
                Lookup::Exact { field, value } => query.adapter.query_exact(field, value).await,
                Lookup::TitlePrefix(prefix) => query.adapter.query_fuzzy_title(prefix).await,
            }
        };

        let result = tokio::time::timeout(timeout, call)
            .await
            .unwrap_or(Err(AdapterError::Timeout(timeout)));

        match result {
            Ok(records) => QueryResult::Records(records),
            Err(AdapterError::FieldAbsent(field)) => {
                debug!(source = %kind, field = %field, "Field not in schema, skipping");
                QueryResult::FieldAbsent
            }
            Err(e) => {
                warn!(
                    source = %kind,
                    strategy = %query.strategy,
                    error = %e,
                    "Source query failed, treating as no matches"
                );
                QueryResult::Failed(e)
            }
        }
    }

    /// Score one hit; `None` for the candidate's own origin record or a
    /// fuzzy hit below the threshold.
    fn score(
        &self,
        candidate: &CandidateAsset,
        strategy: MatchStrategy,
        record: SourceRecord,
    ) -> Option<MatchCandidate> {
        if candidate.is_origin(&record.identity()) {
            return None;
        }
        let (score, strategy, fingerprint_match) = match strategy {
            MatchStrategy::Fingerprint => (1.0, strategy, true),
            MatchStrategy::ExternalUrl | MatchStrategy::ExternalId => (1.0, strategy, false),
            MatchStrategy::Exact | MatchStrategy::FuzzyTitleArtist => {
                let title = similarity(&candidate.title, record.title.as_deref().unwrap_or(""));
                let artist =
                    similarity(&candidate.artist, record.artist.as_deref().unwrap_or(""));
                let combined = TITLE_WEIGHT * title + ARTIST_WEIGHT * artist;
                if combined < self.config.fuzzy_threshold {
                    return None;
                }
                let tag = if combined >= EXACT_MATCH_SCORE {
                    MatchStrategy::Exact
                } else {
                    MatchStrategy::FuzzyTitleArtist
                };
                (combined.min(1.0), tag, false)
            }
        };

        Some(MatchCandidate {
            record,
            score,
            strategy,
            fingerprint_match,
            metadata_match: !fingerprint_match,
        })
    }
}

/// Every fingerprint hash known for the candidate, in stable order.
fn fingerprint_hashes(candidate: &CandidateAsset, computed: Option<&Fingerprint>) -> Vec<String> {
    let mut hashes: Vec<String> = Vec::new();
    let known = candidate.fingerprints.values().map(String::as_str);
    for hash in known.chain(computed.map(|fp| fp.hash.as_str())) {
        let hash = hash.trim();
        if !hash.is_empty() && !hashes.iter().any(|h| h == hash) {
            hashes.push(hash.to_string());
        }
    }
    hashes
}

/// Keep the best hit per record, then stable-sort best first.
fn rank(hits: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    let mut ranked: Vec<MatchCandidate> = Vec::with_capacity(hits.len());
    let mut seen: HashMap<RecordRef, usize> = HashMap::new();

    for hit in hits {
        match seen.get(&hit.identity()) {
            Some(&idx) => {
                if hit.score > ranked[idx].score {
                    ranked[idx] = hit;
                }
            }
            None => {
                seen.insert(hit.identity(), ranked.len());
                ranked.push(hit);
            }
        }
    }

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldValue, SourceSchema};
    use crate::sources::memory::InMemoryAdapter;
    use crate::sources::mocks::FailingAdapter;
    use crate::test_utils::{spectral_generator, store_schema};

    fn store(records: Vec<SourceRecord>) -> Arc<dyn SourceAdapter> {
        Arc::new(InMemoryAdapter::new(
            SourceKind::RemoteStore,
            store_schema(),
            records,
        ))
    }

    fn record(id: &str, title: &str, artist: &str) -> SourceRecord {
        SourceRecord::new(SourceKind::RemoteStore, id)
            .with_title(title)
            .with_artist(artist)
    }

    fn matcher(adapters: Vec<Arc<dyn SourceAdapter>>) -> MultiSourceMatcher {
        MultiSourceMatcher::new(adapters, MatcherConfig::default())
    }

    #[tokio::test]
    async fn test_shared_fingerprint_hash_is_duplicate() {
        let adapter = store(vec![
            record("p1", "One", "A").with_field("fingerprint", FieldValue::Text("H1".into())),
            record("p2", "Two", "B").with_field("fingerprint", FieldValue::Text("H1".into())),
        ]);
        let candidate = CandidateAsset::new("c", "Unrelated", "Nobody").with_fingerprint("m4a", "H1");

        let verdict = matcher(vec![adapter]).check_duplicate(&candidate).await;
        assert!(verdict.is_duplicate);
        assert!(verdict.fingerprint_match);
        assert!(!verdict.metadata_match);
        assert_eq!(verdict.score, 1.0);
        assert_eq!(verdict.strategy, Some(MatchStrategy::Fingerprint));
        assert_eq!(verdict.matches.len(), 2);
    }

    #[tokio::test]
    async fn test_computed_fingerprint_is_queried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.wav");
        crate::test_utils::write_ramp_wav(&path, 440.0, 2.0, 22050, true);

        let generator = spectral_generator();
        let hash = generator.generate_uncached(&path).unwrap().hash;
        let adapter = store(vec![
            record("p1", "x", "y").with_field("fingerprint", FieldValue::Text(hash.clone())),
        ]);
        let candidate = CandidateAsset::new("c", "Song", "Band").with_file(&path);

        let outcome = matcher(vec![adapter])
            .with_fingerprinter(generator)
            .evaluate(&candidate)
            .await;
        assert_eq!(outcome.fingerprint.as_ref().unwrap().hash, hash);
        assert!(outcome.matches[0].fingerprint_match);
    }

    #[tokio::test]
    async fn test_exact_title_and_artist() {
        let adapter = store(vec![record("p1", "Test Track", "Test Artist")]);
        let candidate = CandidateAsset::new("c", "Test Track", "Test Artist");

        let matches = matcher(vec![adapter]).find_matches(&candidate).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].strategy, MatchStrategy::Exact);
        assert!(matches[0].score >= 0.95);
        assert!(matches[0].metadata_match);
    }

    #[tokio::test]
    async fn test_fuzzy_below_exact() {
        // Title contains the candidate's title; artist identical
        let adapter = store(vec![record("p1", "Blue Monday 88", "New Order")]);
        let candidate = CandidateAsset::new("c", "Blue Monday", "New Order");

        let matches = matcher(vec![adapter]).find_matches(&candidate).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].strategy, MatchStrategy::FuzzyTitleArtist);
        assert!(matches[0].score >= 0.85 && matches[0].score < 0.95);
    }

    #[tokio::test]
    async fn test_fuzzy_below_threshold_dropped() {
        let adapter = store(vec![record("p1", "Blue Monday", "Someone Else")]);
        let candidate = CandidateAsset::new("c", "Blue Monday", "New Order");
        assert!(matcher(vec![adapter]).find_matches(&candidate).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_overlap() {
        let adapter = store(vec![record("p1", "Blue Monday", "New Order")]);
        let candidate = CandidateAsset::new("c", "Zzz", "Qqq")
            .with_external_id("nope")
            .with_url("https://example.com/none");

        let verdict = matcher(vec![adapter]).check_duplicate(&candidate).await;
        assert!(!verdict.is_duplicate);
        assert_eq!(verdict.score, 0.0);
        assert!(verdict.best_match.is_none());
        assert!(verdict.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_external_id_end_to_end() {
        let adapter = store(vec![record("p1", "Other Title", "Other").with_external_id("abc")]);
        let candidate = CandidateAsset::from_json(&serde_json::json!({
            "title": "Test Track",
            "artist": "Test Artist",
            "spotify_id": "abc"
        }))
        .unwrap();

        let verdict = matcher(vec![adapter]).check_duplicate(&candidate).await;
        assert!(verdict.is_duplicate);
        assert_eq!(verdict.score, 1.0);
        assert_eq!(verdict.strategy, Some(MatchStrategy::ExternalId));
        assert_eq!(
            verdict.best_match,
            Some(RecordRef::new(SourceKind::RemoteStore, "p1"))
        );
    }

    #[tokio::test]
    async fn test_url_matches_normalized_form() {
        let adapter = store(vec![record("p1", "x", "y").with_field(
            "url",
            FieldValue::Url("https://open.spotify.com/track/abc".into()),
        )]);
        let candidate = CandidateAsset::new("c", "Song", "Band")
            .with_url("https://Open.Spotify.com/track/ABC/?si=xyz");

        let matches = matcher(vec![adapter]).find_matches(&candidate).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].strategy, MatchStrategy::ExternalUrl);
        assert!(matches[0].metadata_match);
    }

    #[tokio::test]
    async fn test_record_hit_twice_keeps_best() {
        let adapter = store(vec![
            record("p1", "Blue Monday 88", "New Order").with_external_id("abc"),
        ]);
        let candidate = CandidateAsset::new("c", "Blue Monday", "New Order").with_external_id("abc");

        let matches = matcher(vec![adapter]).find_matches(&candidate).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 1.0);
        assert_eq!(matches[0].strategy, MatchStrategy::ExternalId);
    }

    #[tokio::test]
    async fn test_ranking_is_stable_and_idempotent() {
        let adapter = store(vec![
            record("p1", "Blue Monday 88", "New Order"),
            record("p2", "Blue Monday", "New Order"),
            record("p3", "Blue Monday", "New Order").with_external_id("abc"),
            record("p4", "Blue Monday 2016", "New Order"),
        ]);
        let candidate = CandidateAsset::new("c", "Blue Monday", "New Order").with_external_id("abc");
        let m = matcher(vec![adapter]);

        let first = m.find_matches(&candidate).await;
        let second = m.find_matches(&candidate).await;
        assert_eq!(first, second);

        let ids: Vec<&str> = first.iter().map(|c| c.record.id.as_str()).collect();
        // External ID hit is discovered before the equal-scoring exact hit
        assert_eq!(ids[..2], ["p3", "p2"]);
        assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_failing_adapter_is_absorbed() {
        let failing = Arc::new(FailingAdapter::new(
            SourceKind::AssetLibrary,
            AdapterError::Network("connection refused".into()),
        ));
        let working = store(vec![record("p1", "x", "y").with_external_id("abc")]);
        let candidate = CandidateAsset::new("c", "Song", "Band").with_external_id("abc");

        let verdict = matcher(vec![failing.clone() as Arc<dyn SourceAdapter>, working])
            .check_duplicate(&candidate)
            .await;
        assert!(verdict.is_duplicate);
        assert!(failing.calls() > 0);
        assert_eq!(verdict.warnings.len(), 1);
        assert!(verdict.warnings[0].contains("asset_library"));
    }

    #[tokio::test]
    async fn test_all_adapters_failing_yields_warning() {
        let a: Arc<dyn SourceAdapter> = Arc::new(FailingAdapter::new(
            SourceKind::RemoteStore,
            AdapterError::Api {
                status: 500,
                message: "boom".into(),
            },
        ));
        let b: Arc<dyn SourceAdapter> = Arc::new(FailingAdapter::new(
            SourceKind::AssetLibrary,
            AdapterError::Network("down".into()),
        ));
        let candidate = CandidateAsset::new("c", "Song", "Band").with_external_id("abc");

        let verdict = matcher(vec![a, b]).check_duplicate(&candidate).await;
        assert!(!verdict.is_duplicate);
        assert_eq!(verdict.score, 0.0);
        assert!(verdict.warnings.iter().any(|w| w.contains("all source queries failed")));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let slow: Arc<dyn SourceAdapter> = Arc::new(
            InMemoryAdapter::new(
                SourceKind::RemoteStore,
                store_schema(),
                vec![record("p1", "Song", "Band")],
            )
            .with_latency(Duration::from_millis(500)),
        );
        let config = MatcherConfig {
            query_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let candidate = CandidateAsset::new("c", "Song", "Band");

        let verdict = MultiSourceMatcher::new(vec![slow], config)
            .check_duplicate(&candidate)
            .await;
        assert!(!verdict.is_duplicate);
        assert!(verdict.warnings.iter().any(|w| w.contains("timed out")));
    }

    #[tokio::test]
    async fn test_absent_fields_are_quiet() {
        // Store without URL or external-ID fields
        let schema = SourceSchema {
            fingerprint_fields: vec!["fingerprint".into()],
            ..Default::default()
        };
        let adapter: Arc<dyn SourceAdapter> = Arc::new(InMemoryAdapter::new(
            SourceKind::RemoteStore,
            schema,
            vec![],
        ));
        let candidate = CandidateAsset::new("c", "Song", "Band")
            .with_external_id("abc")
            .with_url("https://x.com/1");

        let verdict = matcher(vec![adapter]).check_duplicate(&candidate).await;
        assert!(verdict.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_fingerprint_failure_does_not_abort() {
        let adapter = store(vec![record("p1", "x", "y").with_external_id("abc")]);
        let candidate = CandidateAsset::new("c", "Song", "Band")
            .with_external_id("abc")
            .with_file("/nonexistent/song.flac");

        let verdict = matcher(vec![adapter])
            .with_fingerprinter(spectral_generator())
            .check_duplicate(&candidate)
            .await;
        assert!(verdict.is_duplicate);
        assert!(verdict.fingerprint_error.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_matcher_issues_no_queries() {
        let adapter = Arc::new(InMemoryAdapter::new(
            SourceKind::RemoteStore,
            store_schema(),
            vec![record("p1", "Song", "Band")],
        ));
        let token = CancellationToken::new();
        token.cancel();

        let outcome = matcher(vec![adapter.clone() as Arc<dyn SourceAdapter>])
            .with_cancellation(token)
            .evaluate(&CandidateAsset::new("c", "Song", "Band"))
            .await;
        assert!(outcome.cancelled);
        assert!(outcome.matches.is_empty());
        assert_eq!(adapter.query_count(), 0);
    }

    #[tokio::test]
    async fn test_record_never_matches_itself() {
        let adapter = store(vec![
            record("p1", "Blue Monday", "New Order")
                .with_external_id("abc")
                .with_field("fingerprint", FieldValue::Text("H1".into()))
                .with_field("url", FieldValue::Url("https://x.com/1".into())),
            record("p2", "Age of Consent", "New Order")
                .with_field("fingerprint", FieldValue::Text("H2".into())),
        ]);
        let stored = adapter.query_exact("fingerprint", "H1").await.unwrap();
        let candidate = CandidateAsset::from_record(&stored[0], adapter.schema());

        let verdict = matcher(vec![adapter]).check_duplicate(&candidate).await;
        assert!(!verdict.is_duplicate);
        assert!(verdict.matches.is_empty());
    }

    #[tokio::test]
    async fn test_origin_only_excludes_its_own_record() {
        let adapter = store(vec![
            record("p1", "One", "A").with_field("fingerprint", FieldValue::Text("H1".into())),
            record("p2", "Two", "B").with_field("fingerprint", FieldValue::Text("H1".into())),
        ]);
        let candidate = CandidateAsset::new("p1", "One", "A")
            .with_fingerprint("fingerprint", "H1")
            .with_origin(RecordRef::new(SourceKind::RemoteStore, "p1"));

        let verdict = matcher(vec![adapter]).check_duplicate(&candidate).await;
        assert!(verdict.is_duplicate);
        assert_eq!(
            verdict.best_match,
            Some(RecordRef::new(SourceKind::RemoteStore, "p2"))
        );
        assert_eq!(verdict.matches.len(), 1);
    }

    #[tokio::test]
    async fn test_punctuated_title_is_exact() {
        let adapter = store(vec![record("p1", "Don't Stop Me Now", "Queen")]);
        let candidate = CandidateAsset::new("c", "Don't Stop Me Now", "Queen");

        let matches = matcher(vec![adapter]).find_matches(&candidate).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].strategy, MatchStrategy::Exact);
    }

    #[test]
    fn test_fingerprint_hashes_dedup() {
        let candidate = CandidateAsset::new("c", "t", "a")
            .with_fingerprint("flac", "H1")
            .with_fingerprint("m4a", "H1")
            .with_fingerprint("mp3", " ");
        assert_eq!(fingerprint_hashes(&candidate, None), vec!["H1".to_string()]);
    }
}
