//! HTTP implementation of the store client capability.
//!
//! Speaks the store's REST surface with reqwest. Wire shapes live entirely
//! in this module as per-call response structs; nothing outside it depends
//! on the transport.

use crate::error::{Result, StageSyncError};
use crate::models::{AttributeKind, AttributeSpec, DocumentRecord, FileSpec, FunctionSpec};
use crate::store::{
    BucketSummary, CollectionState, CollectionSummary, DatabaseSummary, DocumentPage,
    DocumentQuery, StoreClient, StoreConfig, StoreFeature,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Project header carrying the target project id.
const PROJECT_HEADER: &str = "X-Project";
/// Auth header carrying the API key.
const KEY_HEADER: &str = "X-Key";

/// Remote store client over HTTP.
pub struct HttpStoreClient {
    http: reqwest::Client,
    config: StoreConfig,
    base: String,
}

/// Listing entry shape shared by databases, collections, and buckets.
#[derive(Deserialize)]
struct ResourceSummary {
    #[serde(rename = "$id")]
    id: String,
    name: String,
}

impl HttpStoreClient {
    pub fn new(config: StoreConfig) -> Self {
        let base = config.endpoint.as_str().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            config,
            base,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)], context: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .get(self.url(path))
            .header(PROJECT_HEADER, &self.config.project_id)
            .header(KEY_HEADER, self.config.api_key.expose())
            .query(query)
            .send()
            .await
            .map_err(|e| StageSyncError::store_failed(context.to_string(), e))?;

        if !response.status().is_success() {
            return Err(StageSyncError::api(response.status().as_u16(), context));
        }

        response
            .json()
            .await
            .map_err(|e| StageSyncError::store_failed(format!("{context}: decode response"), e))
    }

    async fn post_json(&self, path: &str, body: Value, context: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .header(PROJECT_HEADER, &self.config.project_id)
            .header(KEY_HEADER, self.config.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| StageSyncError::store_failed(context.to_string(), e))?;

        if !response.status().is_success() {
            return Err(StageSyncError::api(response.status().as_u16(), context));
        }

        Ok(())
    }

    /// Path segment of the typed creation endpoint for an attribute kind.
    fn attribute_endpoint(kind: &AttributeKind) -> Option<&'static str> {
        match kind {
            AttributeKind::String { .. } => Some("string"),
            AttributeKind::Integer { .. } => Some("integer"),
            AttributeKind::Float { .. } => Some("float"),
            AttributeKind::Boolean => Some("boolean"),
            AttributeKind::Email => Some("email"),
            AttributeKind::Url => Some("url"),
            AttributeKind::Ip => Some("ip"),
            AttributeKind::Enum { .. } => Some("enum"),
            AttributeKind::Datetime => Some("datetime"),
            AttributeKind::Relationship { .. } => Some("relationship"),
            AttributeKind::Unknown => None,
        }
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>> {
        #[derive(Deserialize)]
        struct DatabasesResponse {
            databases: Vec<ResourceSummary>,
        }

        let response: DatabasesResponse =
            self.get_json("databases", &[], "list databases").await?;
        Ok(response
            .databases
            .into_iter()
            .map(|db| DatabaseSummary {
                id: db.id,
                name: db.name,
            })
            .collect())
    }

    async fn create_database(&self, database_id: &str, name: &str) -> Result<()> {
        self.post_json(
            "databases",
            json!({ "databaseId": database_id, "name": name }),
            &format!("create database {database_id}"),
        )
        .await
    }

    async fn list_collections(&self, database_id: &str) -> Result<Vec<CollectionSummary>> {
        #[derive(Deserialize)]
        struct CollectionsResponse {
            collections: Vec<ResourceSummary>,
        }

        let response: CollectionsResponse = self
            .get_json(
                &format!("databases/{database_id}/collections"),
                &[],
                &format!("list collections of {database_id}"),
            )
            .await?;
        Ok(response
            .collections
            .into_iter()
            .map(|col| CollectionSummary {
                id: col.id,
                name: col.name,
            })
            .collect())
    }

    async fn create_collection(
        &self,
        database_id: &str,
        collection_id: &str,
        name: &str,
        permissions: &[String],
    ) -> Result<()> {
        self.post_json(
            &format!("databases/{database_id}/collections"),
            json!({
                "collectionId": collection_id,
                "name": name,
                "permissions": permissions,
            }),
            &format!("create collection {database_id}/{collection_id}"),
        )
        .await
    }

    async fn list_attributes(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Vec<AttributeSpec>> {
        #[derive(Deserialize)]
        struct AttributesResponse {
            attributes: Vec<AttributeSpec>,
        }

        let response: AttributesResponse = self
            .get_json(
                &format!("databases/{database_id}/collections/{collection_id}/attributes"),
                &[],
                &format!("list attributes of {database_id}/{collection_id}"),
            )
            .await?;
        Ok(response.attributes)
    }

    async fn create_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        attribute: &AttributeSpec,
    ) -> Result<()> {
        let Some(endpoint) = Self::attribute_endpoint(&attribute.kind) else {
            return Err(StageSyncError::configuration(format!(
                "attribute '{}' has an unknown kind and no creation endpoint",
                attribute.key
            )));
        };

        let body = serde_json::to_value(attribute).map_err(|e| {
            StageSyncError::serialization_failed(
                format!("encode attribute '{}'", attribute.key),
                e,
            )
        })?;

        self.post_json(
            &format!(
                "databases/{database_id}/collections/{collection_id}/attributes/{endpoint}"
            ),
            body,
            &format!(
                "create {} attribute {database_id}/{collection_id}/{}",
                attribute.kind.name(),
                attribute.key
            ),
        )
        .await
    }

    async fn collection_status(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<CollectionState> {
        #[derive(Deserialize)]
        struct CollectionResponse {
            status: String,
        }

        let response: CollectionResponse = self
            .get_json(
                &format!("databases/{database_id}/collections/{collection_id}"),
                &[],
                &format!("get status of {database_id}/{collection_id}"),
            )
            .await?;
        Ok(CollectionState::from_status(&response.status))
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        query: &DocumentQuery,
    ) -> Result<DocumentPage> {
        #[derive(Deserialize)]
        struct DocumentsResponse {
            documents: Vec<Map<String, Value>>,
        }

        let response: DocumentsResponse = self
            .get_json(
                &format!("databases/{database_id}/collections/{collection_id}/documents"),
                &[
                    ("limit", query.limit.to_string()),
                    ("offset", query.offset.to_string()),
                    ("order", query.order.query_value().to_string()),
                ],
                &format!(
                    "list documents of {database_id}/{collection_id} at offset {}",
                    query.offset
                ),
            )
            .await?;
        Ok(DocumentPage {
            documents: response.documents,
        })
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<()> {
        self.post_json(
            &format!("databases/{database_id}/collections/{collection_id}/documents"),
            json!({ "documentId": document_id, "data": fields }),
            &format!("create document {database_id}/{collection_id}/{document_id}"),
        )
        .await
    }

    async fn create_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        documents: &[DocumentRecord],
    ) -> Result<()> {
        let payload: Vec<Value> = documents
            .iter()
            .map(|doc| {
                let mut body = Map::new();
                body.insert("$id".to_string(), Value::String(doc.id.clone()));
                body.extend(doc.create_fields());
                Value::Object(body)
            })
            .collect();

        self.post_json(
            &format!("databases/{database_id}/collections/{collection_id}/documents/batch"),
            json!({ "documents": payload }),
            &format!(
                "create batch of {} documents in {database_id}/{collection_id}",
                documents.len()
            ),
        )
        .await
    }

    async fn list_functions(&self) -> Result<Vec<FunctionSpec>> {
        #[derive(Deserialize)]
        struct FunctionEntry {
            #[serde(rename = "$id")]
            id: String,
            name: String,
            runtime: String,
        }

        #[derive(Deserialize)]
        struct FunctionsResponse {
            functions: Vec<FunctionEntry>,
        }

        let response: FunctionsResponse =
            self.get_json("functions", &[], "list functions").await?;
        Ok(response
            .functions
            .into_iter()
            .map(|f| FunctionSpec {
                id: f.id,
                name: f.name,
                runtime: f.runtime,
            })
            .collect())
    }

    async fn create_function(&self, function: &FunctionSpec) -> Result<()> {
        self.post_json(
            "functions",
            json!({
                "functionId": function.id,
                "name": function.name,
                "runtime": function.runtime,
            }),
            &format!("create function {}", function.id),
        )
        .await
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        #[derive(Deserialize)]
        struct BucketsResponse {
            buckets: Vec<ResourceSummary>,
        }

        let response: BucketsResponse =
            self.get_json("storage/buckets", &[], "list buckets").await?;
        Ok(response
            .buckets
            .into_iter()
            .map(|bucket| BucketSummary {
                id: bucket.id,
                name: bucket.name,
            })
            .collect())
    }

    async fn create_bucket(&self, bucket_id: &str, name: &str) -> Result<()> {
        self.post_json(
            "storage/buckets",
            json!({ "bucketId": bucket_id, "name": name }),
            &format!("create bucket {bucket_id}"),
        )
        .await
    }

    async fn list_files(&self, bucket_id: &str) -> Result<Vec<FileSpec>> {
        #[derive(Deserialize)]
        struct FilesResponse {
            files: Vec<FileSpec>,
        }

        let response: FilesResponse = self
            .get_json(
                &format!("storage/buckets/{bucket_id}/files"),
                &[],
                &format!("list files of bucket {bucket_id}"),
            )
            .await?;
        Ok(response.files)
    }

    fn supports(&self, feature: StoreFeature) -> bool {
        match feature {
            StoreFeature::BatchDocumentCreation => true,
        }
    }
}
