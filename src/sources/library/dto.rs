//! Asset library API Data Transfer Objects
//!
//! These types match what the library's local API returns (Eagle-compatible).
//! Do not use them outside the library module; convert in `adapter.rs`.
//!
//! Endpoint used: `GET api/item/list?keyword=..&tags=..&limit=..`

use serde::{Deserialize, Serialize};

/// Envelope of `api/item/list`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemListResponse {
    /// "success" or "error"
    pub status: String,
    #[serde(default)]
    pub data: Vec<Item>,
    /// Present on errors
    pub message: Option<String>,
}

/// One library item
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Item {
    pub id: String,
    /// Display name, conventionally "Artist - Title"
    #[serde(default)]
    pub name: String,
    /// File extension without the dot
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Source URL the item was saved from
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub annotation: String,
    /// Duration in seconds, audio items only
    pub duration: Option<f64>,
}
