//! Snapshot file I/O.
//!
//! A snapshot is one pretty-printed JSON document, loaded and saved as a
//! unit so it stays reviewable with ordinary diff tools.

use stagesync_core::{ProjectSnapshot, Result, StageSyncError};
use std::path::Path;

/// Saves a snapshot to `path` as pretty-printed JSON.
pub async fn save_snapshot(snapshot: &ProjectSnapshot, path: &Path) -> Result<()> {
    let json_data = serde_json::to_string_pretty(snapshot)
        .map_err(|e| StageSyncError::serialization_failed("encode snapshot", e))?;

    tokio::fs::write(path, json_data)
        .await
        .map_err(|e| StageSyncError::io_failed(
            format!("Failed to write snapshot to {}", path.display()),
            e,
        ))?;
    Ok(())
}

/// Loads a snapshot from `path`.
pub async fn load_snapshot(path: &Path) -> Result<ProjectSnapshot> {
    let data = tokio::fs::read_to_string(path).await.map_err(|e| {
        StageSyncError::io_failed(
            format!("Failed to read snapshot from {}", path.display()),
            e,
        )
    })?;

    serde_json::from_str(&data).map_err(|e| {
        StageSyncError::serialization_failed(
            format!("parse snapshot {}", path.display()),
            e,
        )
    })
}
