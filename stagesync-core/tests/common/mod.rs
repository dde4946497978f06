//! Shared test doubles: an in-memory store and a recording sleeper.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Map, Value};
use stagesync_core::models::{AttributeSpec, DocumentRecord, FileSpec, FunctionSpec};
use stagesync_core::retry::Sleeper;
use stagesync_core::store::{
    BucketSummary, CollectionState, CollectionSummary, DatabaseSummary, DocumentPage,
    DocumentQuery, StoreClient, StoreFeature,
};
use stagesync_core::{Result, StageSyncError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type ResourceKey = (String, String);

/// In-memory project state with scripted failure injection.
#[derive(Default)]
pub struct FakeState {
    pub databases: Vec<DatabaseSummary>,
    pub collections: HashMap<String, Vec<CollectionSummary>>,
    pub attributes: HashMap<ResourceKey, Vec<AttributeSpec>>,
    /// Raw wire documents per (database, collection), system keys included.
    pub documents: HashMap<ResourceKey, Vec<Map<String, Value>>>,
    pub functions: Vec<FunctionSpec>,
    pub buckets: Vec<BucketSummary>,
    pub files: HashMap<String, Vec<FileSpec>>,
    /// Status override per collection; collections default to available.
    pub statuses: HashMap<ResourceKey, CollectionState>,

    /// Every create call in invocation order, for ordering assertions.
    pub creation_order: Vec<String>,

    /// list_databases fails while set.
    pub fail_list_databases: bool,
    /// list_attributes fails for these collections.
    pub fail_attributes_for: Vec<ResourceKey>,
    /// list_files fails for these buckets.
    pub fail_files_for: Vec<String>,
    /// list_documents fails once the requested offset reaches this value.
    pub fail_documents_at_offset: Option<u64>,
    /// The next N batch-create calls fail.
    pub batch_failures_remaining: u32,
    /// Number of batch-create calls observed.
    pub batch_calls: u32,
    /// Advertised batch capability.
    pub supports_batch: bool,
}

/// In-memory [`StoreClient`] for tests.
pub struct FakeStore {
    pub state: Mutex<FakeState>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                supports_batch: true,
                ..FakeState::default()
            }),
        }
    }

    /// Seeds a database with one collection holding `count` raw documents.
    pub fn with_documents(database_id: &str, collection_id: &str, count: usize) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().unwrap();
            state.databases.push(DatabaseSummary {
                id: database_id.to_string(),
                name: database_id.to_string(),
            });
            state.collections.insert(
                database_id.to_string(),
                vec![CollectionSummary {
                    id: collection_id.to_string(),
                    name: collection_id.to_string(),
                }],
            );
            let docs = (0..count)
                .map(|i| {
                    let mut doc = Map::new();
                    doc.insert("$id".to_string(), Value::String(format!("doc-{i}")));
                    doc.insert("$sequence".to_string(), Value::from(i as u64));
                    doc.insert("index".to_string(), Value::from(i as u64));
                    doc
                })
                .collect();
            state
                .documents
                .insert((database_id.to_string(), collection_id.to_string()), docs);
        }
        store
    }

    fn unavailable(context: &str) -> StageSyncError {
        StageSyncError::api(503, context)
    }
}

#[async_trait]
impl StoreClient for FakeStore {
    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>> {
        let state = self.state.lock().unwrap();
        if state.fail_list_databases {
            return Err(Self::unavailable("list databases"));
        }
        Ok(state.databases.clone())
    }

    async fn create_database(&self, database_id: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.databases.push(DatabaseSummary {
            id: database_id.to_string(),
            name: name.to_string(),
        });
        state.creation_order.push(format!("database:{database_id}"));
        Ok(())
    }

    async fn list_collections(&self, database_id: &str) -> Result<Vec<CollectionSummary>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .collections
            .get(database_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_collection(
        &self,
        database_id: &str,
        collection_id: &str,
        name: &str,
        _permissions: &[String],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.databases.iter().any(|db| db.id == database_id) {
            return Err(StageSyncError::api(
                404,
                format!("create collection {collection_id}: database {database_id} missing"),
            ));
        }
        state
            .collections
            .entry(database_id.to_string())
            .or_default()
            .push(CollectionSummary {
                id: collection_id.to_string(),
                name: name.to_string(),
            });
        state
            .creation_order
            .push(format!("collection:{database_id}/{collection_id}"));
        Ok(())
    }

    async fn list_attributes(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Vec<AttributeSpec>> {
        let state = self.state.lock().unwrap();
        let key = (database_id.to_string(), collection_id.to_string());
        if state.fail_attributes_for.contains(&key) {
            return Err(Self::unavailable("list attributes"));
        }
        Ok(state.attributes.get(&key).cloned().unwrap_or_default())
    }

    async fn create_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        attribute: &AttributeSpec,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let collection_exists = state
            .collections
            .get(database_id)
            .is_some_and(|cols| cols.iter().any(|col| col.id == collection_id));
        if !collection_exists {
            return Err(StageSyncError::api(
                404,
                format!(
                    "create attribute {}: collection {database_id}/{collection_id} missing",
                    attribute.key
                ),
            ));
        }
        state
            .attributes
            .entry((database_id.to_string(), collection_id.to_string()))
            .or_default()
            .push(attribute.clone());
        state.creation_order.push(format!(
            "attribute:{database_id}/{collection_id}/{}",
            attribute.key
        ));
        Ok(())
    }

    async fn collection_status(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<CollectionState> {
        let state = self.state.lock().unwrap();
        Ok(state
            .statuses
            .get(&(database_id.to_string(), collection_id.to_string()))
            .cloned()
            .unwrap_or(CollectionState::Available))
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        query: &DocumentQuery,
    ) -> Result<DocumentPage> {
        let state = self.state.lock().unwrap();
        if let Some(fail_at) = state.fail_documents_at_offset {
            if query.offset >= fail_at {
                return Err(Self::unavailable("list documents"));
            }
        }
        let documents = state
            .documents
            .get(&(database_id.to_string(), collection_id.to_string()))
            .cloned()
            .unwrap_or_default();

        let start = (query.offset as usize).min(documents.len());
        let end = (start + query.limit as usize).min(documents.len());
        Ok(DocumentPage {
            documents: documents[start..end].to_vec(),
        })
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut raw = Map::new();
        raw.insert("$id".to_string(), Value::String(document_id.to_string()));
        raw.extend(fields.clone());
        state
            .documents
            .entry((database_id.to_string(), collection_id.to_string()))
            .or_default()
            .push(raw);
        state
            .creation_order
            .push(format!("document:{database_id}/{collection_id}/{document_id}"));
        Ok(())
    }

    async fn create_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        documents: &[DocumentRecord],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.batch_calls += 1;
        if state.batch_failures_remaining > 0 {
            state.batch_failures_remaining -= 1;
            return Err(Self::unavailable("create documents batch"));
        }
        let collection_exists = state
            .collections
            .get(database_id)
            .is_some_and(|cols| cols.iter().any(|col| col.id == collection_id));
        if !collection_exists {
            return Err(StageSyncError::api(
                404,
                format!("create documents: collection {database_id}/{collection_id} missing"),
            ));
        }
        for document in documents {
            let mut raw = Map::new();
            raw.insert("$id".to_string(), Value::String(document.id.clone()));
            raw.extend(document.create_fields());
            state
                .documents
                .entry((database_id.to_string(), collection_id.to_string()))
                .or_default()
                .push(raw);
        }
        state
            .creation_order
            .push(format!("batch:{database_id}/{collection_id}"));
        Ok(())
    }

    async fn list_functions(&self) -> Result<Vec<FunctionSpec>> {
        Ok(self.state.lock().unwrap().functions.clone())
    }

    async fn create_function(&self, function: &FunctionSpec) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.functions.push(function.clone());
        state.creation_order.push(format!("function:{}", function.id));
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        Ok(self.state.lock().unwrap().buckets.clone())
    }

    async fn create_bucket(&self, bucket_id: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.buckets.push(BucketSummary {
            id: bucket_id.to_string(),
            name: name.to_string(),
        });
        state.creation_order.push(format!("bucket:{bucket_id}"));
        Ok(())
    }

    async fn list_files(&self, bucket_id: &str) -> Result<Vec<FileSpec>> {
        let state = self.state.lock().unwrap();
        if state.fail_files_for.iter().any(|id| id == bucket_id) {
            return Err(Self::unavailable("list files"));
        }
        Ok(state.files.get(bucket_id).cloned().unwrap_or_default())
    }

    fn supports(&self, feature: StoreFeature) -> bool {
        match feature {
            StoreFeature::BatchDocumentCreation => self.state.lock().unwrap().supports_batch,
        }
    }
}

/// Sleeper that records requested delays instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
