//! Core data structures and synchronization engine for StageSync.
//!
//! StageSync captures the full resource tree of a remote document store
//! project (databases, collections, attributes, documents, functions, and
//! storage buckets) into a portable snapshot, compares two snapshots
//! structurally, and replays a snapshot into a fresh target project in
//! dependency-correct phases.
//!
//! # Architecture
//! - The remote store is consumed through the [`store::StoreClient`]
//!   capability trait, passed explicitly to every component; tests
//!   substitute an in-memory fake.
//! - Document extraction checkpoints after every page
//!   ([`extract::DocumentExtractor`]), so a crash loses at most one page and
//!   a later `--resume` run continues where the checkpoint left off.
//! - Traversal is strictly sequential; the only suspension points are
//!   network awaits and the injectable backoff/readiness sleeps.

pub mod checkpoint;
pub mod diff;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod pull;
pub mod retry;
pub mod seed;
pub mod store;
pub mod upload;

// Re-export commonly used types
pub use checkpoint::{Checkpoint, CheckpointStore, CHECKPOINT_FORMAT_VERSION};
pub use diff::{compare, Change, DiffEntry, DiffResult};
pub use error::{Result, StageSyncError};
pub use extract::{DocumentExtractor, ExtractOutcome, PAGE_SIZE};
pub use logging::init_logging;
pub use models::{
    AttributeKind, AttributeSpec, BucketNode, CollectionNode, DatabaseNode, DocumentRecord,
    FileSpec, FunctionSpec, OnDelete, ProjectSnapshot, RelationType, StorageNode,
    SNAPSHOT_FORMAT_VERSION,
};
pub use pull::{ProjectPuller, PullOutcome};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use seed::{ProjectSeeder, SeedConfig, SeedOutcome};
pub use store::{
    ApiKey, BucketSummary, CollectionState, CollectionSummary, DatabaseSummary, DocumentOrder,
    DocumentPage, DocumentQuery, HttpStoreClient, StoreClient, StoreConfig, StoreFeature,
};
pub use upload::{BulkUploader, UploadReport, CHUNK_SIZE};
