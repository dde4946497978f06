//! Core data models for project snapshots.
//!
//! This module defines the serializable resource tree captured from a remote
//! document store: databases containing collections, collections containing
//! typed attributes and documents, plus project-level functions and storage
//! buckets. Snapshot files are plain JSON renderings of [`ProjectSnapshot`].
//!
//! Maps are `BTreeMap` so serialized snapshots have a stable key order and
//! stay diffable with ordinary text tools.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Snapshot file format version.
pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0";

/// Store-internal metadata keys that are preserved in extracted documents.
///
/// All other `$`-prefixed keys are dropped during extraction; `$id` is lifted
/// into [`DocumentRecord::id`] and `$sequence` stays in the field map as the
/// server-side creation-order marker.
pub const ALLOWED_SYSTEM_KEYS: &[&str] = &["$id", "$sequence"];

/// Complete point-in-time capture of a project's resource tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub format_version: String,
    pub databases: BTreeMap<String, DatabaseNode>,
    pub functions: Vec<FunctionSpec>,
    pub storage: StorageNode,
    /// True only when the full walk finished without a catastrophic error.
    /// Individual resources may still be missing; consult
    /// `completed_resources` for the reliable subset.
    pub completed: bool,
    /// Human-readable tags of resources whose extraction fully completed,
    /// e.g. `"maindb::orders"`, `"functions"`, `"bucket::avatars"`.
    pub completed_resources: Vec<String>,
    pub pulled_at: chrono::DateTime<chrono::Utc>,
    pub tool_version: String,
}

impl ProjectSnapshot {
    /// Creates an empty snapshot stamped with the current time and tool version.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION.to_string(),
            databases: BTreeMap::new(),
            functions: Vec::new(),
            storage: StorageNode::default(),
            completed: false,
            completed_resources: Vec::new(),
            pulled_at: chrono::Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Records a resource whose sub-extraction reported completion.
    pub fn mark_resource_completed(&mut self, tag: impl Into<String>) {
        self.completed_resources.push(tag.into());
    }

    /// Total number of collections across all databases.
    pub fn collection_count(&self) -> usize {
        self.databases.values().map(|db| db.collections.len()).sum()
    }

    /// Total number of documents across all collections.
    pub fn document_count(&self) -> usize {
        self.databases
            .values()
            .flat_map(|db| db.collections.values())
            .map(|col| col.documents.len())
            .sum()
    }
}

impl Default for ProjectSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// One database and its collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseNode {
    pub name: String,
    pub collections: BTreeMap<String, CollectionNode>,
}

impl DatabaseNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: BTreeMap::new(),
        }
    }
}

/// One collection: its attribute schema and extracted documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionNode {
    pub name: String,
    pub attributes: Vec<AttributeSpec>,
    pub documents: Vec<DocumentRecord>,
}

impl CollectionNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            documents: Vec::new(),
        }
    }
}

/// A typed collection attribute.
///
/// The kind-specific payload is flattened next to the common fields, so the
/// serialized form reads as one object tagged by `"type"`:
///
/// ```json
/// { "key": "title", "type": "string", "size": 256, "required": false,
///   "array": false, "default": null }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub key: String,
    pub required: bool,
    pub array: bool,
    pub default: Option<Value>,
    #[serde(flatten)]
    pub kind: AttributeKind,
}

/// Closed union of attribute kinds the store supports.
///
/// A kind outside this set deserializes as [`AttributeKind::Unknown`]; the
/// restore path logs and skips it rather than guessing a replacement kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttributeKind {
    String {
        size: u64,
    },
    Integer {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Float {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Boolean,
    Email,
    Url,
    Ip,
    Enum {
        elements: Vec<String>,
    },
    Datetime,
    #[serde(rename_all = "camelCase")]
    Relationship {
        related_collection: String,
        relation_type: RelationType,
        two_way: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        two_way_key: Option<String>,
        on_delete: OnDelete,
    },
    /// Catch-all for kinds introduced by a newer store version.
    #[serde(other)]
    Unknown,
}

impl AttributeKind {
    /// Stable lowercase name of the kind, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::String { .. } => "string",
            AttributeKind::Integer { .. } => "integer",
            AttributeKind::Float { .. } => "float",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Email => "email",
            AttributeKind::Url => "url",
            AttributeKind::Ip => "ip",
            AttributeKind::Enum { .. } => "enum",
            AttributeKind::Datetime => "datetime",
            AttributeKind::Relationship { .. } => "relationship",
            AttributeKind::Unknown => "unknown",
        }
    }
}

/// Cardinality of a relationship attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Referential action when a related document is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnDelete {
    Cascade,
    Restrict,
    SetNull,
}

/// One extracted document: its preserved identity plus user-visible fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// System-assigned identity, preserved across extraction and restore.
    pub id: String,
    /// Field map with store-internal keys removed, except the allow-listed
    /// `$sequence` marker.
    pub fields: Map<String, Value>,
}

impl DocumentRecord {
    /// Builds a record from a raw wire document, dropping store-internal
    /// keys not on the allow-list. Returns `None` if the document carries
    /// no `$id`.
    pub fn from_raw(raw: &Map<String, Value>) -> Option<Self> {
        let id = raw.get("$id")?.as_str()?.to_string();
        let fields = raw
            .iter()
            .filter(|(key, _)| !key.starts_with('$') || key.as_str() == "$sequence")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Some(Self { id, fields })
    }

    /// Field map suitable for replaying a create call: every remaining
    /// system key (including `$sequence`, which the target store assigns
    /// itself) is stripped.
    pub fn create_fields(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(key, _)| !key.starts_with('$'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Read-only snapshot of a serverless function's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub id: String,
    pub name: String,
    pub runtime: String,
}

/// Project storage: buckets and their file metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageNode {
    pub buckets: BTreeMap<String, BucketNode>,
}

/// One storage bucket and the metadata of its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketNode {
    pub name: String,
    pub files: Vec<FileSpec>,
}

impl BucketNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }
}

/// File metadata only; contents are never transferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
}
