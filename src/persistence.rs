use crate::constants::EDIT_ENDPOINT_PREFIX;
use crate::models::PageMetadata;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// Fallback reason when the backend rejects a save without a message.
pub const GENERIC_SAVE_FAILURE: &str = "Save failed";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Post,
    Page,
}

impl ResourceKind {
    /// Anything that is not under `/post/` is treated as a page.
    pub fn from_path(path: &str) -> Self {
        if path.contains("/post/") {
            ResourceKind::Post
        } else {
            ResourceKind::Page
        }
    }

    pub fn segment(self) -> &'static str {
        match self {
            ResourceKind::Post => "post",
            ResourceKind::Page => "page",
        }
    }
}

/// What the rendered page tells us about the resource being edited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageContext {
    pub kind: ResourceKind,
    pub content_id: Option<String>,
    pub staff_user: bool,
    pub csrf_token: Option<String>,
}

impl PageContext {
    pub fn from_page(url: &Url, metadata: &PageMetadata) -> Self {
        static DETAIL_PATH: OnceLock<Regex> = OnceLock::new();
        let detail_path =
            DETAIL_PATH.get_or_init(|| Regex::new(r"/(post|page)/([^/]+)/").unwrap());

        let path = url.path();
        // The id only counts on post/page detail URLs.
        let content_id = if detail_path.is_match(path) {
            metadata.content_id.clone()
        } else {
            None
        };

        Self {
            kind: ResourceKind::from_path(path),
            content_id,
            staff_user: metadata.staff_user,
            csrf_token: metadata.csrf_token.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistenceTarget {
    pub kind: ResourceKind,
    pub id: String,
}

impl PersistenceTarget {
    pub fn endpoint(&self) -> String {
        format!("{}/{}/{}/", EDIT_ENDPOINT_PREFIX, self.kind.segment(), self.id)
    }
}

impl fmt::Display for PersistenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint())
    }
}

/// Request body: `{ "<label>": "<markup>" }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SavePayload(BTreeMap<String, String>);

impl SavePayload {
    pub fn new(label: &str, markup: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(label.to_string(), markup.to_string());
        Self(fields)
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveReceipt {
    pub message: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("could not read server response: {0}")]
    Decode(String),
    #[error("{0}")]
    Rejected(String),
}

impl SaveResponse {
    pub fn into_result(self) -> Result<SaveReceipt, PersistError> {
        if self.success {
            Ok(SaveReceipt {
                message: self.message,
            })
        } else {
            let reason = self
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_SAVE_FAILURE.to_string());
            Err(PersistError::Rejected(reason))
        }
    }
}

#[async_trait]
pub trait Persistence: Send + Sync {
    async fn save(&self, endpoint: &str, payload: &SavePayload) -> Result<SaveReceipt, PersistError>;
}

/// Posts edits to the blog backend. Holds no state between calls beyond the
/// shared HTTP client.
#[derive(Clone)]
pub struct PersistenceClient {
    client: Client,
    base: Url,
    csrf_token: Option<String>,
}

impl PersistenceClient {
    pub fn new(client: Client, base: Url) -> Self {
        Self {
            client,
            base,
            csrf_token: None,
        }
    }

    pub fn with_csrf_token(mut self, token: Option<String>) -> Self {
        self.csrf_token = token;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl Persistence for PersistenceClient {
    async fn save(&self, endpoint: &str, payload: &SavePayload) -> Result<SaveReceipt, PersistError> {
        let url = self
            .base
            .join(endpoint)
            .map_err(|e| PersistError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        tracing::info!(%url, "saving region");
        let mut request = self.client.post(url.clone()).json(payload);
        if let Some(token) = &self.csrf_token {
            request = request.header("X-CSRFToken", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PersistError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PersistError::Transport(e.to_string()))?;
        tracing::debug!(%url, %status, bytes = body.len(), "save response received");

        let parsed: SaveResponse =
            serde_json::from_str(&body).map_err(|e| PersistError::Decode(e.to_string()))?;
        parsed.into_result()
    }
}
