//! Asset library HTTP client
//!
//! The library exposes a local, unauthenticated API (Eagle-compatible,
//! default `http://localhost:41595`).

use super::dto;
use crate::sources::AdapterError;

/// Default local API root
pub const DEFAULT_BASE_URL: &str = "http://localhost:41595";

/// Most items returned per search
const SEARCH_LIMIT: u32 = 200;

/// Asset library API client
#[derive(Debug, Clone)]
pub struct LibraryClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl LibraryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AdapterError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| AdapterError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Items tagged with the given fingerprint tag.
    pub async fn search_by_fingerprint_tag(
        &self,
        tag: &str,
    ) -> Result<Vec<dto::Item>, AdapterError> {
        self.search_by_tag(&[tag]).await
    }

    /// Items whose name, annotation or URL contains `text`.
    pub async fn search_by_keyword(&self, text: &str) -> Result<Vec<dto::Item>, AdapterError> {
        let url = format!(
            "{}/api/item/list?keyword={}&limit={}",
            self.base_url,
            urlencoding::encode(text),
            SEARCH_LIMIT
        );
        self.list(&url).await
    }

    /// Items carrying every one of `tags`.
    pub async fn search_by_tag(&self, tags: &[&str]) -> Result<Vec<dto::Item>, AdapterError> {
        let joined = tags.join(",");
        let url = format!(
            "{}/api/item/list?tags={}&limit={}",
            self.base_url,
            urlencoding::encode(&joined),
            SEARCH_LIMIT
        );
        self.list(&url).await
    }

    async fn list(&self, url: &str) -> Result<Vec<dto::Item>, AdapterError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response
            .json::<dto::ItemListResponse>()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        if body.status != "success" {
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: body.message.unwrap_or(body.status),
            });
        }

        Ok(body.data)
    }
}
