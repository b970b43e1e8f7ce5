//! Remote store HTTP client
//!
//! Talks to a Notion-compatible database API.
//! See: https://developers.notion.com/reference/intro
//!
//! Every request carries the bearer token and the pinned API version header.
//! Retry and backoff are left to the caller.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::dto;
use crate::sources::AdapterError;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
/// API version the DTOs were written against
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

const USER_AGENT: &str = concat!("MusicDedupe/", env!("CARGO_PKG_VERSION"));
/// Largest page size the query endpoint accepts
const PAGE_SIZE: u32 = 100;

/// Remote store API client
#[derive(Debug, Clone)]
pub struct RemoteStoreClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
    database_id: String,
    api_version: String,
}

impl RemoteStoreClient {
    /// Create a client for one database.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        database_id: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| AdapterError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            database_id: database_id.into(),
            api_version: api_version.into(),
        })
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// Fetch the database definition (its property schema).
    pub async fn retrieve_database(&self) -> Result<dto::Database, AdapterError> {
        let url = format!("{}/databases/{}", self.base_url, self.database_id);
        self.send(self.http_client.get(&url)).await
    }

    /// Run a filtered query, following pagination to the end.
    pub async fn query(&self, filter: Value) -> Result<Vec<dto::Page>, AdapterError> {
        let url = format!("{}/databases/{}/query", self.base_url, self.database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "filter": filter, "page_size": PAGE_SIZE });
            if let Some(ref c) = cursor {
                body["start_cursor"] = Value::from(c.as_str());
            }

            let response: dto::QueryResponse =
                self.send(self.http_client.post(&url).json(&body)).await?;
            pages.extend(response.results.into_iter().filter(|p| !p.archived));

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(database = %self.database_id, pages = pages.len(), "Remote query complete");
        Ok(pages)
    }

    /// Update properties on one page.
    pub async fn update_page(
        &self,
        page_id: &str,
        properties: Value,
    ) -> Result<dto::Page, AdapterError> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        let body = json!({ "properties": properties });
        self.send(self.http_client.patch(&url).json(&body)).await
    }

    /// Send an authenticated request and parse the response body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AdapterError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
            .send()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            // Try to parse error response
            if let Ok(error) = response.json::<dto::ApiError>().await {
                return Err(AdapterError::Api {
                    status: error.status,
                    message: format!("{}: {}", error.code, error.message),
                });
            }
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }
}
