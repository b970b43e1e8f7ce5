//! Local asset-management library.
//!
//! The library has no typed fields, only names, URLs and free-form tags.
//! Fingerprints and external IDs are stored as prefixed tags, so exact
//! queries become tag searches and title queries become keyword searches.

mod adapter;
mod client;
pub mod dto;

pub use adapter::{
    EXTERNAL_ID_FIELD, FILE_FIELD, FINGERPRINT_FIELD, TAGS_FIELD, TagConventions, URL_FIELD,
    library_schema,
};
pub use client::{DEFAULT_BASE_URL, LibraryClient};

use async_trait::async_trait;

use super::{AdapterError, SourceAdapter, SourceSchema};
use crate::model::{FieldValue, SourceKind, SourceRecord};

/// [`SourceAdapter`] over the asset library.
pub struct AssetLibrary {
    client: LibraryClient,
    tags: TagConventions,
    schema: SourceSchema,
}

impl AssetLibrary {
    pub fn new(client: LibraryClient, tags: TagConventions) -> Self {
        Self {
            client,
            tags,
            schema: library_schema(),
        }
    }

    fn to_records(&self, items: Vec<dto::Item>) -> Vec<SourceRecord> {
        items
            .into_iter()
            .map(|item| adapter::to_record(item, &self.tags))
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for AssetLibrary {
    fn kind(&self) -> SourceKind {
        SourceKind::AssetLibrary
    }

    fn schema(&self) -> &SourceSchema {
        &self.schema
    }

    async fn query_exact(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<SourceRecord>, AdapterError> {
        let (items, tag) = match field {
            FINGERPRINT_FIELD => {
                let tag = self.tags.fingerprint_tag(value);
                (self.client.search_by_fingerprint_tag(&tag).await?, Some(tag))
            }
            EXTERNAL_ID_FIELD => {
                let tag = self.tags.external_id_tag(value);
                (self.client.search_by_tag(&[tag.as_str()]).await?, Some(tag))
            }
            URL_FIELD => (self.client.search_by_keyword(value).await?, None),
            other => return Err(AdapterError::FieldAbsent(other.to_string())),
        };

        // Keyword and tag searches are broader than equality
        Ok(self
            .to_records(items)
            .into_iter()
            .filter(|r| match &tag {
                Some(tag) => {
                    matches!(r.field(TAGS_FIELD), Some(FieldValue::Tags(t)) if t.contains(tag))
                }
                None => r.field(field).and_then(|v| v.as_text()) == Some(value),
            })
            .collect())
    }

    async fn query_fuzzy_title(&self, prefix: &str) -> Result<Vec<SourceRecord>, AdapterError> {
        if prefix.trim().is_empty() {
            return Ok(Vec::new());
        }
        let items = self.client.search_by_keyword(prefix).await?;
        Ok(self.to_records(items))
    }
}
