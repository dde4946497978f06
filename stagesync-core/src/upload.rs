//! Chunked, retried document upload.
//!
//! Documents are partitioned into fixed-size chunks and each chunk is
//! submitted as one batch-create call. A failed chunk is retried whole with
//! exponential backoff; exhausting the attempt budget logs the failure and
//! moves on to the next chunk, so one bad chunk never aborts the rest of a
//! collection's upload.

use crate::error::Result;
use crate::models::DocumentRecord;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::store::{StoreClient, StoreFeature};
use rand::Rng;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fixed number of documents per batch-create call.
pub const CHUNK_SIZE: usize = 100;

/// Per-collection upload tally.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub chunks_total: usize,
    pub chunks_uploaded: usize,
    pub chunks_failed: usize,
    pub log: Vec<String>,
}

impl UploadReport {
    /// True when every chunk made it through.
    pub fn is_complete(&self) -> bool {
        self.chunks_failed == 0
    }
}

/// Uploads documents in retried chunks.
pub struct BulkUploader {
    client: Arc<dyn StoreClient>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl BulkUploader {
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self {
            client,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
        }
    }

    /// Builder method to set the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder method to substitute the sleep implementation.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Uploads `documents` into `(database_id, collection_id)`.
    ///
    /// Success or exhaustion are both terminal per chunk; the report says
    /// which chunks made it and carries a log line for every retry and every
    /// give-up.
    pub async fn upload(
        &self,
        database_id: &str,
        collection_id: &str,
        documents: &[DocumentRecord],
    ) -> UploadReport {
        let mut report = UploadReport::default();
        if documents.is_empty() {
            return report;
        }

        info!(
            "uploading {} documents to {}/{} in chunks of {}",
            documents.len(),
            database_id,
            collection_id,
            CHUNK_SIZE
        );

        for (chunk_index, chunk) in documents.chunks(CHUNK_SIZE).enumerate() {
            report.chunks_total += 1;

            for attempt in 1..=self.policy.max_attempts {
                match self.submit_chunk(database_id, collection_id, chunk).await {
                    Ok(()) => {
                        report.chunks_uploaded += 1;
                        break;
                    }
                    Err(e) if attempt == self.policy.max_attempts => {
                        let line = format!(
                            "giving up on chunk {} of {}/{} after {} attempts: {}",
                            chunk_index, database_id, collection_id, attempt, e
                        );
                        error!("{line}");
                        report.log.push(line);
                        report.chunks_failed += 1;
                    }
                    Err(e) => {
                        let jitter: f64 = rand::rng().random();
                        let delay = self.policy.delay_for(attempt, jitter);
                        let line = format!(
                            "attempt {} failed for chunk {} of {}/{}, retrying in {:.2}s: {}",
                            attempt,
                            chunk_index,
                            database_id,
                            collection_id,
                            delay.as_secs_f64(),
                            e
                        );
                        warn!("{line}");
                        report.log.push(line);
                        self.sleeper.sleep(delay).await;
                    }
                }
            }
        }

        info!(
            "upload to {}/{} finished: {}/{} chunks uploaded",
            database_id, collection_id, report.chunks_uploaded, report.chunks_total
        );
        report
    }

    /// Submits one chunk atomically: as a single batch call when the store
    /// supports it, otherwise document by document with the chunk failing as
    /// a unit on the first error.
    async fn submit_chunk(
        &self,
        database_id: &str,
        collection_id: &str,
        chunk: &[DocumentRecord],
    ) -> Result<()> {
        if self.client.supports(StoreFeature::BatchDocumentCreation) {
            self.client
                .create_documents(database_id, collection_id, chunk)
                .await
        } else {
            for document in chunk {
                self.client
                    .create_document(
                        database_id,
                        collection_id,
                        &document.id,
                        &document.create_fields(),
                    )
                    .await?;
            }
            Ok(())
        }
    }
}
