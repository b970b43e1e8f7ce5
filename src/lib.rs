//! Music Dedupe - cross-source duplicate detection for music assets.
//!
//! Before a track is imported it is checked against every configured backing
//! store (a remote metadata database, a local asset library) using audio
//! fingerprints, source URLs, external IDs and fuzzy title/artist matching.
//! Each check yields a [`DuplicateVerdict`](model::DuplicateVerdict) and a
//! keep/skip/merge [`Resolution`](resolution::Resolution). Batch runs also
//! cluster duplicates across stores and nominate a canonical record.

pub mod batch;
pub mod canonical;
pub mod config;
pub mod db;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod resolution;
pub mod sources;
#[cfg(test)]
pub mod test_utils;
