//! Layers service client.
//!
//! DESIGN
//! ======
//! The editor and timeline talk to the service only through the
//! [`LayersApi`] trait, so tests swap in an in-memory fake. The production
//! implementation is [`client::HttpLayersClient`], a thin `reqwest` wrapper
//! with the response classification kept in pure functions.

pub mod client;
pub mod types;

pub use client::HttpLayersClient;
pub use types::{
    ApiError, CollectionDetail, CollectionId, CollectionPage, CollectionPayload, CollectionSummary, CreatedCollection,
    RhodoneaRecord, TimelineFilters,
};

/// Remote persistence of curve collections.
#[async_trait::async_trait]
pub trait LayersApi: Send + Sync {
    /// `POST layers/`: publish a new collection.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` with the field errors when the service refuses the
    /// payload, or a transport/parse error.
    async fn create_collection(&self, payload: &CollectionPayload) -> Result<CreatedCollection, ApiError>;

    /// `GET layers/`: one page of collections matching `filters`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or the body is malformed.
    async fn list_collections(&self, filters: &TimelineFilters) -> Result<CollectionPage, ApiError>;

    /// `GET layers/{id}/`: every curve of one collection.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or the body is malformed.
    async fn fetch_collection(&self, id: CollectionId) -> Result<CollectionDetail, ApiError>;
}
