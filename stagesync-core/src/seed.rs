//! Snapshot restore orchestration.
//!
//! Replays a snapshot into a fresh target project in strictly ordered
//! phases: databases and collections first, then attributes, then a bounded
//! readiness wait per collection, then documents, then (optionally) function
//! and bucket metadata. Each phase is a best-effort pass: a failure on one
//! resource is logged and skipped, and never blocks later phases or sibling
//! resources.

use crate::models::{AttributeKind, ProjectSnapshot};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::store::{CollectionState, StoreClient};
use crate::upload::BulkUploader;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Settings for one seeding run.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Recreate function metadata (phase 5)
    pub include_functions: bool,
    /// Recreate bucket metadata (phase 6)
    pub include_storage: bool,
    /// Permissions attached to every created collection
    pub collection_permissions: Vec<String>,
    /// Delay between readiness polls
    pub readiness_poll_interval: Duration,
    /// Total budget for one collection's readiness wait
    pub readiness_timeout: Duration,
    /// Retry policy for the document upload phase
    pub retry: RetryPolicy,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            include_functions: false,
            include_storage: false,
            collection_permissions: vec![
                "read(\"any\")".to_string(),
                "create(\"any\")".to_string(),
                "update(\"any\")".to_string(),
                "delete(\"any\")".to_string(),
            ],
            readiness_poll_interval: Duration::from_millis(500),
            readiness_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl SeedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to enable function seeding.
    pub fn with_functions(mut self, enabled: bool) -> Self {
        self.include_functions = enabled;
        self
    }

    /// Builder method to enable storage seeding.
    pub fn with_storage(mut self, enabled: bool) -> Self {
        self.include_storage = enabled;
        self
    }

    /// Builder method to set collection permissions.
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.collection_permissions = permissions;
        self
    }

    /// Builder method to tune the readiness poll.
    pub fn with_readiness(mut self, interval: Duration, timeout: Duration) -> Self {
        self.readiness_poll_interval = interval;
        self.readiness_timeout = timeout;
        self
    }

    /// Builder method to set the upload retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Manifest and log of one seeding run.
#[derive(Debug, Clone, Default)]
pub struct SeedOutcome {
    /// Human-readable label for every successfully created resource, in
    /// creation order.
    pub created: Vec<String>,
    pub log: Vec<String>,
}

/// Replays snapshots into a target project.
pub struct ProjectSeeder {
    client: Arc<dyn StoreClient>,
    sleeper: Arc<dyn Sleeper>,
    config: SeedConfig,
}

impl ProjectSeeder {
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self {
            client,
            sleeper: Arc::new(TokioSleeper),
            config: SeedConfig::default(),
        }
    }

    /// Builder method to set the seeding configuration.
    pub fn with_config(mut self, config: SeedConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder method to substitute the sleep implementation.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Seeds the snapshot into the target project, phase by phase.
    pub async fn seed(&self, snapshot: &ProjectSnapshot) -> SeedOutcome {
        let mut outcome = SeedOutcome::default();

        self.create_databases_and_collections(snapshot, &mut outcome)
            .await;
        self.create_attributes(snapshot, &mut outcome).await;
        self.await_collections_ready(snapshot, &mut outcome).await;
        self.create_documents(snapshot, &mut outcome).await;

        if self.config.include_functions {
            self.create_functions(snapshot, &mut outcome).await;
        }
        if self.config.include_storage {
            self.create_buckets(snapshot, &mut outcome).await;
        }

        info!(
            "seeding finished: {} resources created, {} log entries",
            outcome.created.len(),
            outcome.log.len()
        );
        outcome
    }

    /// Phase 1: every database, then every collection within it, identities
    /// preserved.
    async fn create_databases_and_collections(
        &self,
        snapshot: &ProjectSnapshot,
        outcome: &mut SeedOutcome,
    ) {
        for (database_id, database) in &snapshot.databases {
            match self.client.create_database(database_id, &database.name).await {
                Ok(()) => {
                    info!("created database {} ({})", database_id, database.name);
                    outcome
                        .created
                        .push(format!("database {} ({})", database_id, database.name));
                }
                Err(e) => {
                    let line = format!("could not create database {}: {}", database_id, e);
                    warn!("{line}");
                    outcome.log.push(line);
                }
            }

            for (collection_id, collection) in &database.collections {
                match self
                    .client
                    .create_collection(
                        database_id,
                        collection_id,
                        &collection.name,
                        &self.config.collection_permissions,
                    )
                    .await
                {
                    Ok(()) => {
                        info!("created collection {}/{}", database_id, collection_id);
                        outcome.created.push(format!(
                            "collection {}::{}",
                            database.name, collection.name
                        ));
                    }
                    Err(e) => {
                        let line = format!(
                            "could not create collection {}/{}: {}",
                            database_id, collection_id, e
                        );
                        warn!("{line}");
                        outcome.log.push(line);
                    }
                }
            }
        }
    }

    /// Phase 2: every attribute, dispatched by kind; an unknown kind is
    /// logged and skipped, never coerced to a known one.
    async fn create_attributes(&self, snapshot: &ProjectSnapshot, outcome: &mut SeedOutcome) {
        for (database_id, database) in &snapshot.databases {
            for (collection_id, collection) in &database.collections {
                for attribute in &collection.attributes {
                    if attribute.kind == AttributeKind::Unknown {
                        let line = format!(
                            "skipped attribute '{}' on {}/{}: unknown kind",
                            attribute.key, database_id, collection_id
                        );
                        warn!("{line}");
                        outcome.log.push(line);
                        continue;
                    }

                    match self
                        .client
                        .create_attribute(database_id, collection_id, attribute)
                        .await
                    {
                        Ok(()) => {
                            outcome.created.push(format!(
                                "attribute {}/{}/{}",
                                database_id, collection_id, attribute.key
                            ));
                        }
                        Err(e) => {
                            let line = format!(
                                "could not create {} attribute '{}' on {}/{}: {}",
                                attribute.kind.name(),
                                attribute.key,
                                database_id,
                                collection_id,
                                e
                            );
                            warn!("{line}");
                            outcome.log.push(line);
                        }
                    }
                }
            }
        }
    }

    /// Phase 3: poll each attributed collection until it reports available,
    /// warn and move on after the timeout. Document creation is attempted
    /// either way.
    async fn await_collections_ready(
        &self,
        snapshot: &ProjectSnapshot,
        outcome: &mut SeedOutcome,
    ) {
        let interval = self.config.readiness_poll_interval.max(Duration::from_millis(1));
        let max_polls =
            (self.config.readiness_timeout.as_millis() / interval.as_millis()).max(1) as u32;

        for (database_id, database) in &snapshot.databases {
            for (collection_id, collection) in &database.collections {
                if collection.attributes.is_empty() {
                    continue;
                }

                let mut ready = false;
                for _ in 0..max_polls {
                    match self.client.collection_status(database_id, collection_id).await {
                        Ok(CollectionState::Available) => {
                            ready = true;
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            let line = format!(
                                "readiness probe failed for {}/{}: {}",
                                database_id, collection_id, e
                            );
                            warn!("{line}");
                            outcome.log.push(line);
                        }
                    }
                    self.sleeper.sleep(interval).await;
                }

                if !ready {
                    let line = format!(
                        "collection {}/{} not available after {:?}, creating documents anyway",
                        database_id, collection_id, self.config.readiness_timeout
                    );
                    warn!("{line}");
                    outcome.log.push(line);
                }
            }
        }
    }

    /// Phase 4: documents with their original identity, through the chunked
    /// upload pipeline.
    async fn create_documents(&self, snapshot: &ProjectSnapshot, outcome: &mut SeedOutcome) {
        let uploader = BulkUploader::new(Arc::clone(&self.client))
            .with_policy(self.config.retry)
            .with_sleeper(Arc::clone(&self.sleeper));

        for (database_id, database) in &snapshot.databases {
            for (collection_id, collection) in &database.collections {
                if collection.documents.is_empty() {
                    continue;
                }

                let report = uploader
                    .upload(database_id, collection_id, &collection.documents)
                    .await;
                outcome.log.extend(report.log.iter().cloned());

                if report.is_complete() {
                    outcome.created.push(format!(
                        "documents {}/{} ({})",
                        database_id,
                        collection_id,
                        collection.documents.len()
                    ));
                } else {
                    let line = format!(
                        "documents {}/{}: {} of {} chunks failed",
                        database_id, collection_id, report.chunks_failed, report.chunks_total
                    );
                    warn!("{line}");
                    outcome.log.push(line);
                }
            }
        }
    }

    /// Phase 5: function shells from metadata.
    async fn create_functions(&self, snapshot: &ProjectSnapshot, outcome: &mut SeedOutcome) {
        for function in &snapshot.functions {
            match self.client.create_function(function).await {
                Ok(()) => {
                    outcome
                        .created
                        .push(format!("function {} ({})", function.id, function.name));
                }
                Err(e) => {
                    let line =
                        format!("could not create function {}: {}", function.id, e);
                    warn!("{line}");
                    outcome.log.push(line);
                }
            }
        }
    }

    /// Phase 6: bucket shells from metadata; file contents are never
    /// transferred.
    async fn create_buckets(&self, snapshot: &ProjectSnapshot, outcome: &mut SeedOutcome) {
        for (bucket_id, bucket) in &snapshot.storage.buckets {
            match self.client.create_bucket(bucket_id, &bucket.name).await {
                Ok(()) => {
                    outcome
                        .created
                        .push(format!("bucket {} ({})", bucket_id, bucket.name));
                }
                Err(e) => {
                    let line = format!("could not create bucket {}: {}", bucket_id, e);
                    warn!("{line}");
                    outcome.log.push(line);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_config_defaults() {
        let config = SeedConfig::default();
        assert!(!config.include_functions);
        assert!(!config.include_storage);
        assert_eq!(config.readiness_poll_interval, Duration::from_millis(500));
        assert_eq!(config.readiness_timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 10);
        assert!(!config.collection_permissions.is_empty());
    }

    #[test]
    fn test_seed_config_builder() {
        let config = SeedConfig::new()
            .with_functions(true)
            .with_storage(true)
            .with_readiness(Duration::from_millis(100), Duration::from_secs(2))
            .with_retry(RetryPolicy::new().with_max_attempts(3));

        assert!(config.include_functions);
        assert!(config.include_storage);
        assert_eq!(config.readiness_poll_interval, Duration::from_millis(100));
        assert_eq!(config.readiness_timeout, Duration::from_secs(2));
        assert_eq!(config.retry.max_attempts, 3);
    }
}
