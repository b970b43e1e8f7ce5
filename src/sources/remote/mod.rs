//! Structured remote metadata store.
//!
//! A Notion-compatible database where each page is one track. The live
//! property schema is fetched once and used to pick the filter shape for
//! each property type, and to answer "field absent" without a request when
//! a deployment's database lacks a configured property.

mod adapter;
mod client;
pub mod dto;

pub use adapter::RemoteSchema;
pub use client::{DEFAULT_API_VERSION, DEFAULT_BASE_URL, RemoteStoreClient};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::{AdapterError, RecordUpdate, SourceAdapter, SourceSchema};
use crate::model::{SourceKind, SourceRecord};

/// [`SourceAdapter`] over a remote database.
pub struct RemoteStore {
    client: RemoteStoreClient,
    schema: RemoteSchema,
    source_schema: SourceSchema,
    live: OnceCell<dto::Database>,
}

impl RemoteStore {
    pub fn new(client: RemoteStoreClient, schema: RemoteSchema) -> Self {
        let source_schema = schema.source_schema();
        Self {
            client,
            schema,
            source_schema,
            live: OnceCell::new(),
        }
    }

    pub fn remote_schema(&self) -> &RemoteSchema {
        &self.schema
    }

    /// The database's live property schema, fetched on first use.
    async fn live_schema(&self) -> Result<&dto::Database, AdapterError> {
        self.live
            .get_or_try_init(|| async {
                let db = self.client.retrieve_database().await?;
                tracing::debug!(
                    database = %db.id,
                    properties = db.properties.len(),
                    "Fetched remote schema"
                );
                Ok(db)
            })
            .await
    }

    /// Live type of a property, or `FieldAbsent`.
    async fn property_type(&self, field: &str) -> Result<String, AdapterError> {
        let live = self.live_schema().await?;
        live.properties
            .get(field)
            .map(|p| p.kind.clone())
            .ok_or_else(|| AdapterError::FieldAbsent(field.to_string()))
    }

    async fn run_query(&self, filter: serde_json::Value) -> Result<Vec<SourceRecord>, AdapterError> {
        let pages = self.client.query(filter).await?;
        Ok(pages
            .into_iter()
            .map(|page| adapter::to_record(page, &self.schema))
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for RemoteStore {
    fn kind(&self) -> SourceKind {
        SourceKind::RemoteStore
    }

    fn schema(&self) -> &SourceSchema {
        &self.source_schema
    }

    async fn query_exact(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<SourceRecord>, AdapterError> {
        let property_type = self.property_type(field).await?;

        let Some(filter) = adapter::equals_filter(field, &property_type, value) else {
            tracing::debug!(field, property_type = %property_type, "No equality filter for property type");
            return Ok(Vec::new());
        };

        self.run_query(filter).await
    }

    async fn query_fuzzy_title(&self, prefix: &str) -> Result<Vec<SourceRecord>, AdapterError> {
        if prefix.trim().is_empty() {
            return Ok(Vec::new());
        }
        let field = &self.schema.title_field;
        let property_type = self.property_type(field).await?;

        let Some(filter) = adapter::title_contains_filter(field, &property_type, prefix) else {
            tracing::debug!(field = %field, property_type = %property_type, "No contains filter for property type");
            return Ok(Vec::new());
        };

        self.run_query(filter).await
    }

    async fn update_record(&self, id: &str, update: &RecordUpdate) -> Result<(), AdapterError> {
        let live = self.live_schema().await?;
        let properties = adapter::to_properties(update, live);

        if properties.as_object().is_none_or(|p| p.is_empty()) {
            return Err(AdapterError::FieldAbsent(
                update.keys().cloned().collect::<Vec<_>>().join(", "),
            ));
        }

        self.client.update_page(id, properties).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatcherConfig, MultiSourceMatcher};
    use crate::model::{CandidateAsset, MatchStrategy};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DB: &str = "db-1";

    fn default_properties() -> Value {
        json!({
            "Title": {"type": "title"},
            "Artist": {"type": "rich_text"},
            "Spotify ID": {"type": "rich_text"},
            "Spotify URL": {"type": "url"},
            "M4A Fingerprint": {"type": "rich_text"},
            "Downloaded": {"type": "checkbox"}
        })
    }

    fn page(id: &str, title: &str, artist: &str) -> Value {
        json!({
            "id": id,
            "properties": {
                "Title": {"type": "title", "title": [{"plain_text": title}]},
                "Artist": {"type": "rich_text", "rich_text": [{"plain_text": artist}]}
            }
        })
    }

    fn results(pages: Vec<Value>, next_cursor: Option<&str>) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "results": pages,
            "has_more": next_cursor.is_some(),
            "next_cursor": next_cursor
        }))
    }

    /// A store whose live schema is fetched exactly once, and whose query
    /// endpoint answers with no results unless a more specific stub matches.
    async fn stub_store(properties: Value, schema: RemoteSchema) -> (MockServer, RemoteStore) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/databases/{DB}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": DB, "properties": properties })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/databases/{DB}/query")))
            .respond_with(results(vec![], None))
            .with_priority(10)
            .mount(&server)
            .await;

        let client = RemoteStoreClient::new(server.uri(), "secret", DB, DEFAULT_API_VERSION).unwrap();
        (server, RemoteStore::new(client, schema))
    }

    /// Filters sent to the query endpoint, in order.
    async fn sent_filters(server: &MockServer) -> Vec<Value> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().ends_with("/query"))
            .filter_map(|r| r.body_json::<Value>().ok())
            .map(|body| body["filter"].clone())
            .collect()
    }

    #[tokio::test]
    async fn test_punctuated_title_found_by_matcher() {
        let (server, store) = stub_store(default_properties(), RemoteSchema::default()).await;
        Mock::given(method("POST"))
            .and(path(format!("/databases/{DB}/query")))
            .and(body_partial_json(json!({
                "filter": {"property": "Title", "title": {"contains": "don't stop me now"}}
            })))
            .respond_with(results(vec![page("p1", "Don't Stop Me Now", "Queen")], None))
            .mount(&server)
            .await;

        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(store)];
        let matches = MultiSourceMatcher::new(adapters, MatcherConfig::default())
            .find_matches(&CandidateAsset::new("c", "Don't Stop Me Now", "Queen"))
            .await;

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.id, "p1");
        assert_eq!(matches[0].strategy, MatchStrategy::Exact);
    }

    #[tokio::test]
    async fn test_exact_filter_follows_live_type() {
        let (server, store) = stub_store(default_properties(), RemoteSchema::default()).await;

        store.query_exact("Spotify URL", "https://x.com/1").await.unwrap();
        store.query_exact("Spotify ID", "abc").await.unwrap();

        let filters = sent_filters(&server).await;
        assert_eq!(
            filters,
            vec![
                json!({"property": "Spotify URL", "url": {"equals": "https://x.com/1"}}),
                json!({"property": "Spotify ID", "rich_text": {"equals": "abc"}}),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_property_is_absent_without_query() {
        let (server, store) = stub_store(default_properties(), RemoteSchema::default()).await;

        let err = store.query_exact("MP3 Fingerprint", "h").await.unwrap_err();
        assert!(err.is_field_absent());
        assert!(sent_filters(&server).await.is_empty());
    }

    #[tokio::test]
    async fn test_query_follows_cursor() {
        let (server, store) = stub_store(default_properties(), RemoteSchema::default()).await;
        let mut archived = page("p0", "Old", "Queen");
        archived["archived"] = json!(true);
        Mock::given(method("POST"))
            .and(path(format!("/databases/{DB}/query")))
            .and(body_partial_json(json!({"start_cursor": "c2"})))
            .respond_with(results(vec![page("p2", "Two", "Queen")], None))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/databases/{DB}/query")))
            .respond_with(results(vec![page("p1", "One", "Queen"), archived], Some("c2")))
            .with_priority(5)
            .mount(&server)
            .await;

        let records = store.query_exact("Spotify ID", "abc").await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["p1", "p2"]);
        assert!(records.iter().all(|r| r.source == SourceKind::RemoteStore));
    }

    #[tokio::test]
    async fn test_rich_text_title_property() {
        let schema = RemoteSchema {
            title_field: "Name".into(),
            ..Default::default()
        };
        let (server, store) = stub_store(json!({"Name": {"type": "rich_text"}}), schema).await;

        store.query_fuzzy_title("blue monday").await.unwrap();
        assert_eq!(
            sent_filters(&server).await,
            vec![json!({"property": "Name", "rich_text": {"contains": "blue monday"}})]
        );
    }

    #[tokio::test]
    async fn test_api_error_body_is_reported() {
        let (server, store) = stub_store(default_properties(), RemoteSchema::default()).await;
        Mock::given(method("POST"))
            .and(path(format!("/databases/{DB}/query")))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": 400,
                "code": "validation_error",
                "message": "bad filter"
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        let err = store.query_fuzzy_title("blue").await.unwrap_err();
        assert!(matches!(err, AdapterError::Api { status: 400, .. }));
        assert!(err.to_string().contains("validation_error"));
    }
}
