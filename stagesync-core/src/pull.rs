//! Full project snapshot assembly.
//!
//! Walks the resource hierarchy (databases, collections, attributes,
//! documents, functions, storage buckets, files) one resource at a time.
//! Every resource-level call is fault-isolated: a failed attribute listing
//! does not stop document extraction for the same collection, and a failed
//! bucket does not stop its siblings. Only an inability to list databases at
//! all aborts the walk, and even then the partial tree is handed back so the
//! caller can persist it with `completed = false`.

use crate::checkpoint::CheckpointStore;
use crate::error::StageSyncError;
use crate::extract::DocumentExtractor;
use crate::models::{BucketNode, CollectionNode, DatabaseNode, ProjectSnapshot};
use crate::store::StoreClient;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of one pull: the snapshot, the walk log, and, when the walk
/// itself could not proceed, the catastrophic error alongside the partial
/// tree, so nothing already fetched is dropped on the floor.
#[derive(Debug)]
pub struct PullOutcome {
    pub snapshot: ProjectSnapshot,
    pub log: Vec<String>,
    pub fatal: Option<StageSyncError>,
}

impl PullOutcome {
    /// True when the walk finished without a catastrophic error.
    pub fn is_clean(&self) -> bool {
        self.fatal.is_none()
    }
}

/// Assembles a [`ProjectSnapshot`] from the remote store.
pub struct ProjectPuller {
    client: Arc<dyn StoreClient>,
    extractor: DocumentExtractor,
}

impl ProjectPuller {
    pub fn new(client: Arc<dyn StoreClient>, checkpoints: CheckpointStore) -> Self {
        let extractor = DocumentExtractor::new(Arc::clone(&client), checkpoints);
        Self { client, extractor }
    }

    /// Pulls the full project state, extracting documents per collection
    /// through the checkpointed extractor.
    ///
    /// `completed` on the returned snapshot reflects "the walk finished",
    /// not "every resource completed"; `completed_resources` lists the
    /// reliable subset.
    pub async fn pull(&self, resume: bool) -> PullOutcome {
        let mut snapshot = ProjectSnapshot::new();
        let mut log = Vec::new();

        let databases = match self.client.list_databases().await {
            Ok(databases) => databases,
            Err(e) => {
                let line = format!("cannot list databases: {}", e);
                error!("{line}");
                log.push(line);
                return PullOutcome {
                    snapshot,
                    log,
                    fatal: Some(e),
                };
            }
        };

        for database in databases {
            let mut database_node = DatabaseNode::new(&database.name);

            match self.client.list_collections(&database.id).await {
                Ok(collections) => {
                    for collection in collections {
                        let mut collection_node = CollectionNode::new(&collection.name);

                        match self
                            .client
                            .list_attributes(&database.id, &collection.id)
                            .await
                        {
                            Ok(attributes) => collection_node.attributes = attributes,
                            Err(e) => {
                                let line = format!(
                                    "could not fetch attributes for {}/{}: {}",
                                    database.id, collection.id, e
                                );
                                warn!("{line}");
                                log.push(line);
                            }
                        }

                        match self
                            .extractor
                            .extract(&database.id, &collection.id, resume)
                            .await
                        {
                            Ok(outcome) => {
                                log.extend(outcome.log);
                                collection_node.documents = outcome.documents;
                                if outcome.completed {
                                    snapshot.mark_resource_completed(format!(
                                        "{}::{}",
                                        database.name, collection.name
                                    ));
                                }
                            }
                            Err(e) => {
                                let line = format!(
                                    "could not extract documents for {}/{}: {}",
                                    database.id, collection.id, e
                                );
                                warn!("{line}");
                                log.push(line);
                            }
                        }

                        database_node
                            .collections
                            .insert(collection.id, collection_node);
                    }
                }
                Err(e) => {
                    let line =
                        format!("could not list collections of {}: {}", database.id, e);
                    warn!("{line}");
                    log.push(line);
                }
            }

            snapshot.databases.insert(database.id, database_node);
        }

        match self.client.list_functions().await {
            Ok(functions) => {
                info!("fetched {} functions", functions.len());
                snapshot.functions = functions;
                snapshot.mark_resource_completed("functions");
            }
            Err(e) => {
                let line = format!("could not fetch functions: {}", e);
                warn!("{line}");
                log.push(line);
            }
        }

        match self.client.list_buckets().await {
            Ok(buckets) => {
                for bucket in buckets {
                    let mut bucket_node = BucketNode::new(&bucket.name);
                    match self.client.list_files(&bucket.id).await {
                        Ok(files) => {
                            bucket_node.files = files;
                            snapshot
                                .mark_resource_completed(format!("bucket::{}", bucket.name));
                        }
                        Err(e) => {
                            let line = format!(
                                "could not fetch files in bucket {}: {}",
                                bucket.id, e
                            );
                            warn!("{line}");
                            log.push(line);
                        }
                    }
                    snapshot.storage.buckets.insert(bucket.id, bucket_node);
                }
            }
            Err(e) => {
                let line = format!("could not fetch storage buckets: {}", e);
                warn!("{line}");
                log.push(line);
            }
        }

        // The walk finished; individual gaps are visible in the log and in
        // the completed_resources list.
        snapshot.completed = true;
        info!(
            "pull finished: {} databases, {} collections, {} documents",
            snapshot.databases.len(),
            snapshot.collection_count(),
            snapshot.document_count()
        );

        PullOutcome {
            snapshot,
            log,
            fatal: None,
        }
    }
}
