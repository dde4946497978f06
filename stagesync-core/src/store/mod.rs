//! Remote store client capability.
//!
//! This module defines the object-safe trait every engine component receives
//! as its handle on the remote document store, along with the wire-side
//! types those calls exchange. Components take the capability explicitly
//! (`Arc<dyn StoreClient>`) instead of reaching for shared process state,
//! which also lets tests substitute an in-memory fake.

use crate::error::{Result, StageSyncError};
use crate::models::{AttributeSpec, DocumentRecord, FileSpec, FunctionSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub mod http;

pub use http::HttpStoreClient;

/// API key wrapper that is wiped from memory on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Grants access to the underlying secret for request signing.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

/// Connection settings for a remote store project.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: Url,
    pub project_id: String,
    pub api_key: ApiKey,
}

impl StoreConfig {
    /// Builds a config, validating the endpoint URL up front.
    pub fn new(
        endpoint: &str,
        project_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            StageSyncError::configuration(format!("endpoint is not a valid URL: {}", e))
        })?;
        Ok(Self {
            endpoint,
            project_id: project_id.into(),
            api_key: ApiKey::new(api_key),
        })
    }
}

/// Features a store implementation may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFeature {
    /// Creating a whole chunk of documents in one call
    BatchDocumentCreation,
}

/// Server-side ordering for document pagination.
///
/// The ordering key is the store's creation-sequence marker, so repeated
/// pagination over a mutating collection has a deterministic order; there is
/// no way to request pagination with an unspecified key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOrder {
    SequenceDescending,
    SequenceAscending,
}

impl DocumentOrder {
    /// Value used in list-documents query strings.
    pub fn query_value(self) -> &'static str {
        match self {
            DocumentOrder::SequenceDescending => "sequence-desc",
            DocumentOrder::SequenceAscending => "sequence-asc",
        }
    }
}

/// One page worth of document listing parameters.
#[derive(Debug, Clone, Copy)]
pub struct DocumentQuery {
    pub limit: u64,
    pub offset: u64,
    pub order: DocumentOrder,
}

impl DocumentQuery {
    pub fn page(limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset,
            order: DocumentOrder::SequenceDescending,
        }
    }
}

/// A page of raw documents as returned by the store.
///
/// Documents keep their store-internal `$` keys here; filtering happens in
/// the extractor so the wire layer stays a faithful transcript.
#[derive(Debug, Clone, Default)]
pub struct DocumentPage {
    pub documents: Vec<Map<String, Value>>,
}

impl DocumentPage {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Readiness of a collection's attribute schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionState {
    /// Attributes are indexed and the collection accepts documents
    Available,
    /// Attribute builds are still propagating
    Pending,
    /// Any other state the server reports (failed, stuck, ...)
    Other(String),
}

impl CollectionState {
    pub fn from_status(status: &str) -> Self {
        match status {
            "available" => CollectionState::Available,
            "pending" | "processing" => CollectionState::Pending,
            other => CollectionState::Other(other.to_string()),
        }
    }
}

/// Listing entry for a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSummary {
    pub id: String,
    pub name: String,
}

/// Listing entry for a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub id: String,
    pub name: String,
}

/// Listing entry for a storage bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSummary {
    pub id: String,
    pub name: String,
}

/// Object-safe capability interface onto the remote document store.
///
/// All listing calls are read-only; creation calls are only reached from the
/// restore and upload paths. Implementations must be safe to share behind an
/// `Arc`; the engine itself issues calls strictly sequentially.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>>;

    async fn create_database(&self, database_id: &str, name: &str) -> Result<()>;

    async fn list_collections(&self, database_id: &str) -> Result<Vec<CollectionSummary>>;

    async fn create_collection(
        &self,
        database_id: &str,
        collection_id: &str,
        name: &str,
        permissions: &[String],
    ) -> Result<()>;

    async fn list_attributes(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Vec<AttributeSpec>>;

    /// Creates one typed attribute; the implementation dispatches on the
    /// attribute kind to the matching typed endpoint.
    async fn create_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        attribute: &AttributeSpec,
    ) -> Result<()>;

    async fn collection_status(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<CollectionState>;

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        query: &DocumentQuery,
    ) -> Result<DocumentPage>;

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<()>;

    /// Creates a whole chunk of documents in one call, preserving each
    /// document's identity. Only meaningful when
    /// [`StoreFeature::BatchDocumentCreation`] is supported.
    async fn create_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        documents: &[DocumentRecord],
    ) -> Result<()>;

    async fn list_functions(&self) -> Result<Vec<FunctionSpec>>;

    /// Creates a function shell from metadata; code and deployments are out
    /// of scope.
    async fn create_function(&self, function: &FunctionSpec) -> Result<()>;

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>>;

    async fn create_bucket(&self, bucket_id: &str, name: &str) -> Result<()>;

    async fn list_files(&self, bucket_id: &str) -> Result<Vec<FileSpec>>;

    /// Capability probe; implementations without a feature should override.
    fn supports(&self, _feature: StoreFeature) -> bool {
        true
    }
}
