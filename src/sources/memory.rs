//! Adapter over records already held in memory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{AdapterError, RecordUpdate, SourceAdapter, SourceSchema};
use crate::model::{FieldValue, SourceKind, SourceRecord};

/// A [`SourceAdapter`] over a list of records.
///
/// Exact queries compare a field's text (or any of its list entries) with
/// the value; fuzzy title queries match records whose title contains the
/// prefix, ignoring case, the way remote stores do. Failure and latency can be injected.
pub struct InMemoryAdapter {
    kind: SourceKind,
    schema: SourceSchema,
    records: RwLock<Vec<SourceRecord>>,
    failure: Option<AdapterError>,
    latency: Option<Duration>,
    queries: AtomicUsize,
}

impl InMemoryAdapter {
    pub fn new(kind: SourceKind, schema: SourceSchema, records: Vec<SourceRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|mut r| {
                r.source = kind;
                r
            })
            .collect();
        Self {
            kind,
            schema,
            records: RwLock::new(records),
            failure: None,
            latency: None,
            queries: AtomicUsize::new(0),
        }
    }

    /// Fail every query with `error`.
    pub fn failing_with(mut self, error: AdapterError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Delay every query by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push(&self, mut record: SourceRecord) {
        record.source = self.kind;
        self.records.write().push(record);
    }

    pub fn records(&self) -> Vec<SourceRecord> {
        self.records.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<SourceRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }

    /// Number of queries issued against this adapter.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn declares(&self, field: &str) -> bool {
        let s = &self.schema;
        s.fingerprint_fields.iter().any(|f| f == field)
            || s.url_fields.iter().any(|f| f == field)
            || s.file_fields.iter().any(|f| f == field)
            || s.external_id_field.as_deref() == Some(field)
    }

    async fn before_query(&self) -> Result<(), AdapterError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn field_equals(value: &FieldValue, expected: &str) -> bool {
    match value {
        FieldValue::Text(s) | FieldValue::Url(s) => s == expected,
        FieldValue::Files(v) | FieldValue::Tags(v) => v.iter().any(|s| s == expected),
        FieldValue::Number(n) => expected.parse::<f64>().is_ok_and(|e| e == *n),
        FieldValue::Flag(b) => expected.parse::<bool>().is_ok_and(|e| e == *b),
    }
}

#[async_trait]
impl SourceAdapter for InMemoryAdapter {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn schema(&self) -> &SourceSchema {
        &self.schema
    }

    async fn query_exact(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<SourceRecord>, AdapterError> {
        if !self.declares(field) {
            return Err(AdapterError::FieldAbsent(field.to_string()));
        }
        self.before_query().await?;

        let is_external_id = self.schema.external_id_field.as_deref() == Some(field);
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| {
                r.field(field).is_some_and(|v| field_equals(v, value))
                    || (is_external_id && r.external_id.as_deref() == Some(value))
            })
            .cloned()
            .collect())
    }

    async fn query_fuzzy_title(&self, prefix: &str) -> Result<Vec<SourceRecord>, AdapterError> {
        self.before_query().await?;

        let needle = prefix.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| {
                r.title
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn update_record(&self, id: &str, update: &RecordUpdate) -> Result<(), AdapterError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AdapterError::Api {
                status: 404,
                message: format!("no record with id {id}"),
            })?;
        for (field, value) in update {
            record.fields.insert(field.clone(), value.clone());
        }
        Ok(())
    }
}
