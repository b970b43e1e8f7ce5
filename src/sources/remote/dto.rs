//! Remote store API Data Transfer Objects
//!
//! These types match what the database API returns (Notion-compatible,
//! `2022-06-28` version). Do not add fields the API does not send, and do
//! not use these types outside the remote module; convert in `adapter.rs`.
//!
//! Endpoints used:
//! - `GET databases/{id}` -> [`Database`]
//! - `POST databases/{id}/query` -> [`QueryResponse`]
//! - `PATCH pages/{id}` -> [`Page`]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Database object (schema only; rows come from queries)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Database {
    pub id: String,
    /// Property name -> property definition
    #[serde(default)]
    pub properties: HashMap<String, PropertySchema>,
}

/// Property definition on a database
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertySchema {
    pub id: Option<String>,
    /// Property type: "title", "rich_text", "url", "number", "checkbox", ...
    #[serde(rename = "type")]
    pub kind: String,
}

/// Paginated query result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// A database row
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

/// Value of one property on a page, tagged by `type`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Url {
        url: Option<String>,
    },
    Number {
        number: Option<f64>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: bool,
    },
    Select {
        select: Option<SelectOption>,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: Vec<SelectOption>,
    },
    Files {
        #[serde(default)]
        files: Vec<FileObject>,
    },
    /// Formulas, relations, rollups and anything newer
    #[serde(other)]
    Unsupported,
}

/// Rich text segment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

/// Select / multi-select option
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectOption {
    pub name: String,
}

/// File attachment (hosted or external link)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileObject {
    #[serde(default)]
    pub name: String,
    pub external: Option<FileLink>,
    pub file: Option<FileLink>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileLink {
    pub url: String,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub status: u16,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
