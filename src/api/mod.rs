//! # Storefront backend client
//!
//! All data comes from the storefront REST API. Requests carry the stored
//! bearer token when there is one; a `401` clears it. GET responses are cached
//! per path until they expire or a mutation invalidates them. Nothing is
//! retried, a failed request needs the user to act again.
mod cache;

pub use cache::ResponseCache;

use crate::model::Document;
use crate::preview::StoredBio;
use crate::render::{render_content, ContentInput, Rendered};
use displaydoc::Display;
use log::*;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;
use urlencoding::encode;

/// Error when talking to the backend
#[derive(Debug, Error, Display)]
pub enum ApiError {
    /// Request failed: {0}
    Transport(#[from] reqwest::Error),
    /// {message} (HTTP {status})
    Server { status: u16, message: String },
    /// Not signed in, or the session expired
    Unauthorized,
    /// Unexpected response body: {0}
    Decode(#[from] serde_json::Error),
    /// Invalid request: {0}
    Invalid(&'static str),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Map a non-success response onto the error taxonomy
    pub fn from_response(status: u16, body: &[u8], reason: Option<&str>) -> Self {
        if status == StatusCode::UNAUTHORIZED.as_u16() {
            return ApiError::Unauthorized;
        }
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .or_else(|| reason.map(str::to_owned))
            .unwrap_or_else(|| String::from("Request failed"));
        ApiError::Server { status, message }
    }
}

/// Stored statistics about a product's content
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    #[serde(default)]
    pub has_rich_content: bool,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub read_time: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    /// Document JSON, either encoded as a string or inline
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub content_metadata: Option<ContentMetadata>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProductEnvelope {
    Wrapped { product: Product },
    Bare(Product),
}

impl From<ProductEnvelope> for Product {
    fn from(envelope: ProductEnvelope) -> Self {
        match envelope {
            ProductEnvelope::Wrapped { product } | ProductEnvelope::Bare(product) => product,
        }
    }
}

impl Product {
    pub fn render(&self) -> Rendered {
        render_content(ContentInput::Value(&self.content))
    }

    /// Minutes to read, from the stored metadata or estimated from the content
    pub fn read_time(&self) -> Option<u64> {
        if let Some(meta) = self.content_metadata.as_ref().filter(|m| m.read_time > 0) {
            return Some(meta.read_time);
        }
        let doc = match &self.content {
            Value::String(raw) => raw.parse::<Document>().ok(),
            Value::Null => None,
            other => Document::from_value(other.clone()).ok(),
        };
        doc.map(|d| d.read_time_minutes() as u64)
    }
}

/// Handle to the backend, cheap to clone
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Arc<str>,
    token: Arc<RwLock<Option<String>>>,
    cache: ResponseCache,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("cache", &self.cache)
            .finish()
    }
}

fn segment(value: &str) -> Result<String, ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::Invalid("empty path segment"))
    } else {
        Ok(encode(value))
    }
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, cache_ttl: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: Arc::new(RwLock::new(token)),
            cache: ResponseCache::new(cache_ttl),
        })
    }

    pub async fn is_signed_in(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Forget the stored credential
    pub async fn sign_out(&self) {
        if self.token.write().await.take().is_some() {
            info!("Cleared stored credentials");
        }
        self.cache.clear();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder, require_auth: bool) -> Result<Value, ApiError> {
        let req = match self.token.read().await.as_deref() {
            Some(token) => req.bearer_auth(token),
            None if require_auth => return Err(ApiError::Unauthorized),
            None => req,
        };
        let res = req.send().await?;
        let status = res.status();
        let body = res.bytes().await?;
        if status == StatusCode::UNAUTHORIZED {
            self.sign_out().await;
        }
        if !status.is_success() {
            return Err(ApiError::from_response(
                status.as_u16(),
                &body,
                status.canonical_reason(),
            ));
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: String, require_auth: bool) -> Result<T, ApiError> {
        if let Some(hit) = self.cache.get(&path).await {
            trace!("Cache hit for {}", path);
            return Ok(serde_json::from_value(hit)?);
        }
        let value = self.send(self.http.get(self.url(&path)), require_auth).await?;
        self.cache.insert(path, value.clone()).await;
        Ok(serde_json::from_value(value)?)
    }

    #[instrument(skip(self))]
    pub async fn product(&self, id: &str) -> Result<Product, ApiError> {
        let path = format!("/products/{}", segment(id)?);
        let envelope: ProductEnvelope = self.get_json(path, false).await?;
        Ok(envelope.into())
    }

    #[instrument(skip(self))]
    pub async fn product_by_slug(&self, username: &str, slug: &str) -> Result<Product, ApiError> {
        let path = format!("/products/{}/{}", segment(username)?, segment(slug)?);
        let envelope: ProductEnvelope = self.get_json(path, false).await?;
        Ok(envelope.into())
    }

    #[instrument(skip(self))]
    pub async fn product_by_short_slug(&self, slug: &str) -> Result<Product, ApiError> {
        let path = format!("/products/slug/{}", segment(slug)?);
        let envelope: ProductEnvelope = self.get_json(path, false).await?;
        Ok(envelope.into())
    }

    /// The purchased content, only for the buyer
    #[instrument(skip(self))]
    pub async fn purchase_content(&self, purchase_id: &str) -> Result<Product, ApiError> {
        let path = format!("/purchases/{}/content", segment(purchase_id)?);
        let envelope: ProductEnvelope = self.get_json(path, true).await?;
        Ok(envelope.into())
    }

    #[instrument(skip(self))]
    pub async fn bio(&self, username: &str) -> Result<StoredBio, ApiError> {
        let path = format!("/bio/{}", segment(username)?);
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum BioEnvelope {
            Wrapped { bio: StoredBio },
            Bare(StoredBio),
        }
        match self.get_json(path, false).await? {
            BioEnvelope::Wrapped { bio } | BioEnvelope::Bare(bio) => Ok(bio),
        }
    }

    /// Persist a new block order
    #[instrument(skip(self, ids))]
    pub async fn reorder_blocks(&self, username: &str, ids: &[String]) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Err(ApiError::Invalid("no blocks to reorder"));
        }
        let path = format!("/bio/{}/blocks/order", segment(username)?);
        let req = self
            .http
            .put(self.url(&path))
            .json(&json!({ "blockIds": ids }));
        let res = self.send(req, true).await;
        self.cache
            .invalidate_matching(&format!("/bio/{}", segment(username)?));
        res.map(|_| ())
    }
}
