//! Batch duplicate checks.
//!
//! Candidates are checked concurrently up to a limit. Per-candidate results
//! stream out as events as they complete, while duplicate groups are built
//! only once every candidate has finished, since cluster membership depends
//! on the whole match graph.
//!
//! Cancellation is cooperative: once the token fires no new candidate is
//! started and no new query is issued, but in-flight queries drain and
//! everything finished so far is returned.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::canonical::{CompletenessRules, DuplicateGraph, DuplicateGroup};
use crate::fingerprint::{Fingerprint, compare};
use crate::matcher::MultiSourceMatcher;
use crate::model::{CandidateAsset, DuplicateVerdict, FieldValue};
use crate::resolution::{Resolution, ResolutionPolicy};
use crate::sources::{RecordUpdate, SourceAdapter};

/// Progress is logged every this many candidates.
const PROGRESS_INTERVAL: usize = 10;

/// Batch behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Candidates checked at once
    pub max_concurrent: usize,
    /// Also link candidates whose fingerprints match each other
    pub compare_within_batch: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            compare_within_batch: true,
        }
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// One candidate finished
    CandidateChecked {
        index: usize,
        local_id: String,
        resolution: Resolution,
        score: f64,
    },
    Progress {
        completed: usize,
        total: usize,
    },
    Finished {
        checked: usize,
        groups: usize,
        cancelled: bool,
    },
}

/// Result for one candidate.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Position in the input
    pub index: usize,
    pub candidate: CandidateAsset,
    pub verdict: DuplicateVerdict,
    pub resolution: Resolution,
    /// The candidate's computed fingerprint, if any
    pub fingerprint: Option<Arc<Fingerprint>>,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// In input order; candidates not started before cancellation are absent
    pub items: Vec<BatchItem>,
    pub groups: Vec<DuplicateGroup>,
    pub cancelled: bool,
}

impl BatchReport {
    /// Items whose verdict is a duplicate.
    pub fn duplicates(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|i| i.verdict.is_duplicate)
    }
}

/// Runs duplicate checks over many candidates.
pub struct BatchRunner {
    matcher: Arc<MultiSourceMatcher>,
    policy: ResolutionPolicy,
    rules: CompletenessRules,
    config: BatchConfig,
    cancel: CancellationToken,
}

impl BatchRunner {
    /// The runner shares the matcher's cancellation token, so cancelling the
    /// batch also stops queries the matcher has not issued yet.
    pub fn new(
        matcher: Arc<MultiSourceMatcher>,
        policy: ResolutionPolicy,
        rules: CompletenessRules,
        config: BatchConfig,
    ) -> Self {
        let cancel = matcher.cancellation_token().clone();
        Self {
            matcher,
            policy,
            rules,
            config,
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check every candidate and group the duplicates found.
    pub async fn run(
        &self,
        candidates: Vec<CandidateAsset>,
        events: Option<mpsc::Sender<BatchEvent>>,
    ) -> BatchReport {
        let total = candidates.len();
        let threshold = self.matcher.config().duplicate_threshold;
        let cancel = self.cancel.clone();

        info!(total, max_concurrent = self.config.max_concurrent, "Starting batch");

        let checks = stream::iter(candidates.into_iter().enumerate())
            .take_while(move |_| futures::future::ready(!cancel.is_cancelled()))
            .map(|(index, candidate)| async move {
                let outcome = self.matcher.evaluate(&candidate).await;
                (index, candidate, outcome)
            })
            .buffer_unordered(self.config.max_concurrent.max(1));
        let mut checks = std::pin::pin!(checks);

        let mut items = Vec::with_capacity(total);
        while let Some((index, candidate, outcome)) = checks.next().await {
            let resolution = self.policy.resolve(&outcome.matches);
            let fingerprint = outcome.fingerprint.clone();
            let verdict = outcome.into_verdict(threshold);

            emit(
                &events,
                BatchEvent::CandidateChecked {
                    index,
                    local_id: candidate.local_id.clone(),
                    resolution: resolution.clone(),
                    score: verdict.score,
                },
            )
            .await;

            items.push(BatchItem {
                index,
                candidate,
                verdict,
                resolution,
                fingerprint,
            });

            let completed = items.len();
            if completed % PROGRESS_INTERVAL == 0 || completed == total {
                info!(completed, total, "Batch progress");
                emit(&events, BatchEvent::Progress { completed, total }).await;
            }
        }

        items.sort_by_key(|item| item.index);
        let cancelled = self.cancel.is_cancelled();
        let groups = self.build_groups(&items, threshold);

        info!(
            checked = items.len(),
            groups = groups.len(),
            cancelled,
            "Batch finished"
        );
        emit(
            &events,
            BatchEvent::Finished {
                checked: items.len(),
                groups: groups.len(),
                cancelled,
            },
        )
        .await;

        BatchReport {
            items,
            groups,
            cancelled,
        }
    }

    /// Cluster candidates and their strong matches.
    ///
    /// A candidate built from a stored record joins the graph as that record.
    fn build_groups(&self, items: &[BatchItem], threshold: f64) -> Vec<DuplicateGroup> {
        let mut graph = DuplicateGraph::new();
        let records: Vec<_> = items
            .iter()
            .map(|item| item.candidate.to_record(&self.rules))
            .collect();

        for (item, record) in items.iter().zip(&records) {
            graph.add(record.clone());
            for hit in item.verdict.matches.iter().filter(|m| m.score >= threshold) {
                graph.link(record.clone(), hit.record.clone());
            }
        }

        if self.config.compare_within_batch {
            for (i, a) in items.iter().enumerate() {
                let Some(fa) = &a.fingerprint else { continue };
                for (j, b) in items.iter().enumerate().skip(i + 1) {
                    if let Some(fb) = &b.fingerprint
                        && compare(fa, fb) >= threshold
                    {
                        graph.link(records[i].clone(), records[j].clone());
                    }
                }
            }
        }

        graph.groups(&self.rules)
    }
}

async fn emit(events: &Option<mpsc::Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening
        let _ = tx.send(event).await;
    }
}

/// Write a duplicate-of marker onto every non-canonical record owned by
/// `adapter`. Returns how many records were updated.
///
/// Failures are logged and skipped.
pub async fn mark_duplicates(report: &BatchReport, adapter: &dyn SourceAdapter, field: &str) -> usize {
    let kind = adapter.kind();
    let mut updated = 0;

    for group in &report.groups {
        let mut update = RecordUpdate::new();
        update.insert(field.to_string(), FieldValue::Text(group.canonical.to_string()));

        for duplicate in group.duplicates().filter(|r| r.source == kind) {
            match adapter.update_record(&duplicate.id, &update).await {
                Ok(()) => updated += 1,
                Err(e) => {
                    warn!(
                        source = %kind,
                        record = %duplicate.id,
                        error = %e,
                        "Failed to mark duplicate"
                    );
                }
            }
        }
    }

    updated
}
