//! Paginated document extraction with durable resume.
//!
//! Documents are fetched one fixed-size page at a time, ordered by the
//! server's creation-sequence key, and the checkpoint is persisted after
//! every page, so an ungraceful termination loses at most the in-flight
//! page.
//! A transient remote error stops the loop without marking completion; the
//! prescribed recovery is a later call with `resume = true`, which picks up
//! at the persisted offset.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::Result;
use crate::models::DocumentRecord;
use crate::store::{DocumentQuery, StoreClient};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fixed page size for document listing.
pub const PAGE_SIZE: u64 = 100;

/// Result of one extraction run.
///
/// `documents` always holds whatever was accumulated, even when the run
/// aborted early, so callers treating partial data as best-effort are
/// well-defined.
#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    pub documents: Vec<DocumentRecord>,
    pub log: Vec<String>,
    pub completed: bool,
}

/// Extracts all documents of one collection, checkpointing every page.
pub struct DocumentExtractor {
    client: Arc<dyn StoreClient>,
    checkpoints: CheckpointStore,
}

impl DocumentExtractor {
    pub fn new(client: Arc<dyn StoreClient>, checkpoints: CheckpointStore) -> Self {
        Self {
            client,
            checkpoints,
        }
    }

    /// Extracts every document of `(database_id, collection_id)`.
    ///
    /// With `resume = true` an existing checkpoint is loaded and extraction
    /// continues at its persisted offset; otherwise extraction starts from
    /// offset zero.
    ///
    /// Remote fetch errors never surface as `Err`: they end the run with
    /// `completed = false` and a log entry, leaving the checkpoint of the
    /// last successful page on disk. The `Err` path is reserved for
    /// checkpoint I/O and lock acquisition, where resumability itself is at
    /// stake.
    pub async fn extract(
        &self,
        database_id: &str,
        collection_id: &str,
        resume: bool,
    ) -> Result<ExtractOutcome> {
        let _lock = self.checkpoints.lock(database_id, collection_id)?;

        let mut checkpoint = if resume {
            match self.checkpoints.load(database_id, collection_id)? {
                Some(existing) if existing.completed => {
                    debug!(
                        "extraction of {}/{} already completed, returning checkpoint as-is",
                        database_id, collection_id
                    );
                    return Ok(ExtractOutcome {
                        documents: existing.documents,
                        log: existing.log,
                        completed: true,
                    });
                }
                Some(mut existing) => {
                    let line = format!(
                        "resuming {}/{} at offset {} with {} documents",
                        database_id,
                        collection_id,
                        existing.next_offset,
                        existing.documents.len()
                    );
                    info!("{line}");
                    existing.log.push(line);
                    existing
                }
                None => Checkpoint::new(database_id, collection_id),
            }
        } else {
            Checkpoint::new(database_id, collection_id)
        };

        loop {
            let query = DocumentQuery::page(PAGE_SIZE, checkpoint.next_offset);
            let page = match self
                .client
                .list_documents(database_id, collection_id, &query)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    let line = format!(
                        "document fetch failed for {}/{} at offset {}: {}",
                        database_id, collection_id, checkpoint.next_offset, e
                    );
                    warn!("{line}");
                    checkpoint.log.push(line);
                    self.checkpoints.save(&checkpoint)?;
                    break;
                }
            };

            if page.is_empty() {
                checkpoint.mark_completed();
                let line = format!(
                    "completed {}/{} with {} documents",
                    database_id,
                    collection_id,
                    checkpoint.documents.len()
                );
                info!("{line}");
                checkpoint.log.push(line);
                self.checkpoints.save(&checkpoint)?;
                break;
            }

            let raw_count = page.documents.len();
            let documents: Vec<DocumentRecord> = page
                .documents
                .iter()
                .filter_map(DocumentRecord::from_raw)
                .collect();
            if documents.len() < raw_count {
                debug!(
                    "dropped {} documents without identity from {}/{}",
                    raw_count - documents.len(),
                    database_id,
                    collection_id
                );
            }

            checkpoint.log.push(format!(
                "fetched page at offset {} ({} documents)",
                checkpoint.next_offset,
                documents.len()
            ));
            checkpoint.record_page(documents, PAGE_SIZE);
            self.checkpoints.save(&checkpoint)?;
        }

        Ok(ExtractOutcome {
            documents: checkpoint.documents,
            log: checkpoint.log,
            completed: checkpoint.completed,
        })
    }
}
