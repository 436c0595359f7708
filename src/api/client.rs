//! HTTP implementation of [`LayersApi`].
//!
//! Endpoints are joined onto the configured base URL (`.../api/`), so the
//! client works both against the service root and behind a path prefix.

use std::time::Duration;

use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::LayersApi;
use super::types::{
    ApiError, CollectionDetail, CollectionId, CollectionPage, CollectionPayload, CreatedCollection, TimelineFilters,
};
use crate::config::{MapperConfig, Timeouts};

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpLayersClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpLayersClient {
    /// # Errors
    ///
    /// Returns `InvalidUrl` if `base_url` does not parse, or
    /// `HttpClientBuild` if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeouts: Timeouts) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(timeouts.connect_secs));
        if let Some(secs) = timeouts.request_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    /// # Errors
    ///
    /// See [`HttpLayersClient::new`].
    pub fn from_config(config: &MapperConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.timeouts)
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        parse_response(status, &text)
    }
}

#[async_trait::async_trait]
impl LayersApi for HttpLayersClient {
    async fn create_collection(&self, payload: &CollectionPayload) -> Result<CreatedCollection, ApiError> {
        let url = self.endpoint("layers/")?;
        debug!(%url, curves = payload.rhodoneas.len(), "creating collection");
        let created: CreatedCollection = self.send_json(self.http.post(url).json(payload)).await?;
        debug!(id = created.id, "collection created");
        Ok(created)
    }

    async fn list_collections(&self, filters: &TimelineFilters) -> Result<CollectionPage, ApiError> {
        let url = self.endpoint("layers/")?;
        debug!(%url, offset = filters.offset, limit = filters.limit, "listing collections");
        self.send_json(self.http.get(url).query(&filters.query_pairs()))
            .await
    }

    async fn fetch_collection(&self, id: CollectionId) -> Result<CollectionDetail, ApiError> {
        let url = self.endpoint(&format!("layers/{id}/"))?;
        debug!(%url, "fetching collection");
        self.send_json(self.http.get(url)).await
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    if !(200..300).contains(&status) {
        let err = ApiError::from_response(status, body);
        warn!(status, error = %err, "layers service returned an error");
        return Err(err);
    }
    serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
