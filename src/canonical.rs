//! Canonical record selection for clusters of mutual duplicates.
//!
//! Records are grouped transitively: if A matches B and B matches C, all
//! three form one cluster. The most complete record in each cluster is
//! canonical; ties go to the record discovered first.

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::model::{RecordRef, SourceRecord};

/// At most this many file fields and fingerprint fields count toward completeness.
const MAX_COUNTED_FIELDS: usize = 3;

bitflags! {
    /// Which completeness signals a record carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Completeness: u16 {
        const FILE_1 = 1 << 0;
        const FILE_2 = 1 << 1;
        const FILE_3 = 1 << 2;
        const FINGERPRINT_1 = 1 << 3;
        const FINGERPRINT_2 = 1 << 4;
        const FINGERPRINT_3 = 1 << 5;
        const DOWNLOADED = 1 << 6;
        const ARTIST = 1 << 7;
        const EXTERNAL_ID = 1 << 8;

        const FILES = Self::FILE_1.bits() | Self::FILE_2.bits() | Self::FILE_3.bits();
        const FINGERPRINTS = Self::FINGERPRINT_1.bits()
            | Self::FINGERPRINT_2.bits()
            | Self::FINGERPRINT_3.bits();
    }
}

impl Completeness {
    const FILE_SLOTS: [Completeness; MAX_COUNTED_FIELDS] =
        [Self::FILE_1, Self::FILE_2, Self::FILE_3];
    const FINGERPRINT_SLOTS: [Completeness; MAX_COUNTED_FIELDS] =
        [Self::FINGERPRINT_1, Self::FINGERPRINT_2, Self::FINGERPRINT_3];

    /// Score in [0, 1]: 0.1 per file or fingerprint slot, 0.2 for
    /// downloaded, 0.1 each for artist and external ID.
    pub fn score(self) -> f64 {
        let files = self.intersection(Self::FILES).bits().count_ones() as f64;
        let fingerprints = self.intersection(Self::FINGERPRINTS).bits().count_ones() as f64;
        let mut score = 0.1 * files + 0.1 * fingerprints;
        if self.contains(Self::DOWNLOADED) {
            score += 0.2;
        }
        if self.contains(Self::ARTIST) {
            score += 0.1;
        }
        if self.contains(Self::EXTERNAL_ID) {
            score += 0.1;
        }
        score.min(1.0)
    }
}

/// Which record fields count toward completeness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessRules {
    /// File-present fields, in preference order
    pub file_fields: Vec<String>,
    /// Fingerprint-present fields, in preference order
    pub fingerprint_fields: Vec<String>,
    /// Boolean "downloaded/complete" field
    pub downloaded_field: Option<String>,
}

impl CompletenessRules {
    /// Completeness signals present on a record.
    pub fn assess(&self, record: &SourceRecord) -> Completeness {
        let mut flags = Completeness::empty();

        let present_files = self.file_fields.iter().filter(|f| record.has_field(f));
        for (slot, _) in Completeness::FILE_SLOTS.iter().zip(present_files) {
            flags |= *slot;
        }
        let present_fps = self.fingerprint_fields.iter().filter(|f| record.has_field(f));
        for (slot, _) in Completeness::FINGERPRINT_SLOTS.iter().zip(present_fps) {
            flags |= *slot;
        }

        if self
            .downloaded_field
            .as_deref()
            .and_then(|f| record.field(f))
            .and_then(|v| v.as_flag())
            .unwrap_or(false)
        {
            flags |= Completeness::DOWNLOADED;
        }
        if record.artist.as_deref().is_some_and(|a| !a.trim().is_empty()) {
            flags |= Completeness::ARTIST;
        }
        if record
            .external_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
        {
            flags |= Completeness::EXTERNAL_ID;
        }

        flags
    }

    pub fn score(&self, record: &SourceRecord) -> f64 {
        self.assess(record).score()
    }
}

/// The most complete record; ties go to the earliest in `records`.
pub fn select_canonical(records: &[SourceRecord], rules: &CompletenessRules) -> Option<RecordRef> {
    let mut best: Option<(&SourceRecord, f64)> = None;
    for record in records {
        let score = rules.score(record);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((record, score));
        }
    }
    best.map(|(r, _)| r.identity())
}

/// A cluster member with its completeness score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: RecordRef,
    pub title: Option<String>,
    pub completeness: f64,
}

/// A cluster of mutual duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// In discovery order
    pub members: Vec<ScoredRecord>,
    pub canonical: RecordRef,
}

impl DuplicateGroup {
    /// Every member except the canonical one.
    pub fn duplicates(&self) -> impl Iterator<Item = &RecordRef> {
        self.members
            .iter()
            .map(|m| &m.record)
            .filter(move |r| **r != self.canonical)
    }
}

/// Match graph over records, clustered with union-find.
///
/// Records keep the order in which they were first added, which is the
/// tie-break order for canonical selection and the order of groups.
#[derive(Debug, Default)]
pub struct DuplicateGraph {
    records: Vec<SourceRecord>,
    index: HashMap<RecordRef, usize>,
    parent: Vec<usize>,
}

impl DuplicateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; a record seen before keeps its first snapshot.
    pub fn add(&mut self, record: SourceRecord) -> usize {
        let identity = record.identity();
        if let Some(&idx) = self.index.get(&identity) {
            return idx;
        }
        let idx = self.records.len();
        self.records.push(record);
        self.parent.push(idx);
        self.index.insert(identity, idx);
        idx
    }

    /// Record that `a` and `b` are duplicates of each other.
    pub fn link(&mut self, a: SourceRecord, b: SourceRecord) {
        let a = self.add(a);
        let b = self.add(b);
        self.union(a, b);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn find(&mut self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            self.parent[idx] = self.parent[self.parent[idx]];
            idx = self.parent[idx];
        }
        idx
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Earliest-discovered member stays the root
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }

    /// Clusters of two or more records, in order of first discovery.
    pub fn groups(&mut self, rules: &CompletenessRules) -> Vec<DuplicateGroup> {
        let mut order: Vec<usize> = Vec::new();
        let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();

        for idx in 0..self.records.len() {
            let root = self.find(idx);
            clusters
                .entry(root)
                .or_insert_with(|| {
                    order.push(root);
                    Vec::new()
                })
                .push(idx);
        }

        order
            .into_iter()
            .filter_map(|root| {
                let members = clusters.remove(&root)?;
                if members.len() < 2 {
                    return None;
                }
                let records: Vec<SourceRecord> =
                    members.iter().map(|&i| self.records[i].clone()).collect();
                let canonical = select_canonical(&records, rules)?;
                Some(DuplicateGroup {
                    members: records
                        .iter()
                        .map(|r| ScoredRecord {
                            record: r.identity(),
                            title: r.title.clone(),
                            completeness: rules.score(r),
                        })
                        .collect(),
                    canonical,
                })
            })
            .collect()
    }
}
