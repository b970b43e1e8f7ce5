//! Backing stores the matcher queries.
//!
//! Every store sits behind [`SourceAdapter`], a small request/response
//! interface with two query capabilities. A store that lacks a capability
//! returns an empty result set (or [`AdapterError::FieldAbsent`] for an
//! undeclared field) instead of forcing capability checks on the caller.
//!
//! # Adapters
//!
//! - [`remote`] - structured remote metadata store (Notion-compatible database API)
//! - [`library`] - local asset-management library (Eagle-compatible API)
//! - [`filesystem`] - resolved-path lookup, directory scan, tag reading
//! - [`memory`] - records already held in memory
//!
//! Remote APIs are split the same way everywhere: `client` does HTTP, `dto`
//! mirrors the wire format exactly, and `adapter` is the only place DTOs
//! become [`SourceRecord`]s.

pub mod filesystem;
pub mod library;
pub mod memory;
pub mod remote;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

pub use crate::model::SourceSchema;
use crate::model::{FieldValue, SourceKind, SourceRecord};

/// Field writes applied by [`SourceAdapter::update_record`].
pub type RecordUpdate = BTreeMap<String, FieldValue>;

/// Errors from a single adapter call.
///
/// The matcher absorbs all of these; they only reach callers from direct
/// calls such as [`SourceAdapter::update_record`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The field is not part of this store's schema. A fast no-op, not a
    /// failure of the store.
    #[error("Field not present in schema: {0}")]
    FieldAbsent(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation not supported by this source: {0}")]
    Unsupported(&'static str),
}

impl AdapterError {
    /// Schema drift rather than a store failure.
    pub fn is_field_absent(&self) -> bool {
        matches!(self, AdapterError::FieldAbsent(_))
    }
}

/// One backing store as seen by the matcher.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which store this is; stamped on every record it returns.
    fn kind(&self) -> SourceKind;

    /// Fields the matcher may query.
    fn schema(&self) -> &SourceSchema;

    /// Records whose `field` equals `value` exactly.
    async fn query_exact(&self, field: &str, value: &str)
    -> Result<Vec<SourceRecord>, AdapterError>;

    /// Records whose title contains `prefix`.
    async fn query_fuzzy_title(&self, prefix: &str) -> Result<Vec<SourceRecord>, AdapterError>;

    /// Write fields onto an existing record.
    async fn update_record(&self, _id: &str, _update: &RecordUpdate) -> Result<(), AdapterError> {
        Err(AdapterError::Unsupported("update_record"))
    }
}

/// Test doubles for [`SourceAdapter`].
#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adapter that fails every query with the same error.
    pub struct FailingAdapter {
        pub kind: SourceKind,
        pub schema: SourceSchema,
        pub error: AdapterError,
        pub calls: AtomicUsize,
    }

    impl FailingAdapter {
        pub fn new(kind: SourceKind, error: AdapterError) -> Self {
            Self {
                kind,
                schema: SourceSchema {
                    fingerprint_fields: vec!["fingerprint".into()],
                    url_fields: vec!["url".into()],
                    external_id_field: Some("spotify_id".into()),
                    file_fields: vec![],
                },
                error,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceAdapter for FailingAdapter {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn schema(&self) -> &SourceSchema {
            &self.schema
        }

        async fn query_exact(
            &self,
            _field: &str,
            _value: &str,
        ) -> Result<Vec<SourceRecord>, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }

        async fn query_fuzzy_title(
            &self,
            _prefix: &str,
        ) -> Result<Vec<SourceRecord>, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_absent_is_distinguishable() {
        assert!(AdapterError::FieldAbsent("Spotify ID".into()).is_field_absent());
        assert!(!AdapterError::Network("reset".into()).is_field_absent());
    }

    #[test]
    fn test_error_messages() {
        let err = AdapterError::Api {
            status: 400,
            message: "validation_error".into(),
        };
        assert_eq!(err.to_string(), "API error (400): validation_error");
        assert!(
            AdapterError::Timeout(Duration::from_secs(10))
                .to_string()
                .contains("10s")
        );
    }
}
