//! Structural snapshot comparison.
//!
//! Both snapshots are first normalized into JSON trees in which documents,
//! files, and functions are keyed by their identity and attributes by their
//! key, making list order insignificant. The normalized trees are then
//! compared recursively, key by key, and every divergence is reported as an
//! added/removed/changed entry at its path.
//!
//! Extraction bookkeeping (`completed`, `completed_resources`, timestamps,
//! versions) is not project state and never appears in a diff.

use crate::models::ProjectSnapshot;
use serde_json::{Map, Value};
use std::fmt;

/// Outcome of comparing two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffResult {
    /// The two snapshots describe the same project state.
    NoDifferences,
    /// At least one divergence, each at its own path.
    Differences(Vec<DiffEntry>),
}

impl DiffResult {
    pub fn is_identical(&self) -> bool {
        matches!(self, DiffResult::NoDifferences)
    }

    /// All divergence entries; empty for [`DiffResult::NoDifferences`].
    pub fn entries(&self) -> &[DiffEntry] {
        match self {
            DiffResult::NoDifferences => &[],
            DiffResult::Differences(entries) => entries,
        }
    }
}

impl fmt::Display for DiffResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffResult::NoDifferences => write!(f, "no differences"),
            DiffResult::Differences(entries) => {
                for entry in entries {
                    writeln!(f, "{entry}")?;
                }
                Ok(())
            }
        }
    }
}

/// One divergence between source and destination.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub path: String,
    pub change: Change,
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change {
            Change::Added(value) => write!(f, "+ {}: {}", self.path, value),
            Change::Removed(value) => write!(f, "- {}: {}", self.path, value),
            Change::Changed {
                source,
                destination,
            } => write!(f, "~ {}: {} -> {}", self.path, source, destination),
        }
    }
}

/// Classification of a divergence, from the source's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Present only in the destination
    Added(Value),
    /// Present only in the source
    Removed(Value),
    /// Present in both with different values
    Changed { source: Value, destination: Value },
}

/// Compares two snapshots structurally, order-insensitively.
pub fn compare(source: &ProjectSnapshot, destination: &ProjectSnapshot) -> DiffResult {
    let source_tree = normalize(source);
    let destination_tree = normalize(destination);

    let mut entries = Vec::new();
    diff_value("", &source_tree, &destination_tree, &mut entries);

    if entries.is_empty() {
        DiffResult::NoDifferences
    } else {
        DiffResult::Differences(entries)
    }
}

/// Renders the compared project state as a JSON tree with identity-keyed
/// maps in place of ordered lists.
fn normalize(snapshot: &ProjectSnapshot) -> Value {
    let mut root = Map::new();

    let mut databases = Map::new();
    for (database_id, database) in &snapshot.databases {
        let mut collections = Map::new();
        for (collection_id, collection) in &database.collections {
            let mut attributes = Map::new();
            for attribute in &collection.attributes {
                attributes.insert(
                    attribute.key.clone(),
                    serde_json::to_value(attribute).unwrap_or(Value::Null),
                );
            }

            let mut documents = Map::new();
            for document in &collection.documents {
                documents.insert(
                    document.id.clone(),
                    Value::Object(document.fields.clone()),
                );
            }

            let mut node = Map::new();
            node.insert("name".to_string(), Value::String(collection.name.clone()));
            node.insert("attributes".to_string(), Value::Object(attributes));
            node.insert("documents".to_string(), Value::Object(documents));
            collections.insert(collection_id.clone(), Value::Object(node));
        }

        let mut node = Map::new();
        node.insert("name".to_string(), Value::String(database.name.clone()));
        node.insert("collections".to_string(), Value::Object(collections));
        databases.insert(database_id.clone(), Value::Object(node));
    }
    root.insert("databases".to_string(), Value::Object(databases));

    let mut functions = Map::new();
    for function in &snapshot.functions {
        let mut node = Map::new();
        node.insert("name".to_string(), Value::String(function.name.clone()));
        node.insert("runtime".to_string(), Value::String(function.runtime.clone()));
        functions.insert(function.id.clone(), Value::Object(node));
    }
    root.insert("functions".to_string(), Value::Object(functions));

    let mut buckets = Map::new();
    for (bucket_id, bucket) in &snapshot.storage.buckets {
        let mut files = Map::new();
        for file in &bucket.files {
            let mut node = Map::new();
            node.insert("name".to_string(), Value::String(file.name.clone()));
            node.insert("sizeBytes".to_string(), Value::from(file.size_bytes));
            files.insert(file.id.clone(), Value::Object(node));
        }

        let mut node = Map::new();
        node.insert("name".to_string(), Value::String(bucket.name.clone()));
        node.insert("files".to_string(), Value::Object(files));
        buckets.insert(bucket_id.clone(), Value::Object(node));
    }
    root.insert("storage".to_string(), Value::Object(buckets));

    Value::Object(root)
}

/// Recursive key-by-key comparison; non-object values compare atomically.
fn diff_value(path: &str, source: &Value, destination: &Value, entries: &mut Vec<DiffEntry>) {
    match (source, destination) {
        (Value::Object(source_map), Value::Object(destination_map)) => {
            for (key, source_value) in source_map {
                let child = join(path, key);
                match destination_map.get(key) {
                    Some(destination_value) => {
                        diff_value(&child, source_value, destination_value, entries);
                    }
                    None => entries.push(DiffEntry {
                        path: child,
                        change: Change::Removed(source_value.clone()),
                    }),
                }
            }
            for (key, destination_value) in destination_map {
                if !source_map.contains_key(key) {
                    entries.push(DiffEntry {
                        path: join(path, key),
                        change: Change::Added(destination_value.clone()),
                    });
                }
            }
        }
        _ => {
            if source != destination {
                entries.push(DiffEntry {
                    path: path.to_string(),
                    change: Change::Changed {
                        source: source.clone(),
                        destination: destination.clone(),
                    },
                });
            }
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}/{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AttributeKind, AttributeSpec, CollectionNode, DatabaseNode, DocumentRecord, FileSpec,
        FunctionSpec, BucketNode,
    };
    use serde_json::json;

    fn document(id: &str, fields: Value) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    fn sample_snapshot() -> ProjectSnapshot {
        let mut snapshot = ProjectSnapshot::new();

        let mut collection = CollectionNode::new("orders");
        collection.attributes.push(AttributeSpec {
            key: "total".to_string(),
            required: true,
            array: false,
            default: None,
            kind: AttributeKind::Float {
                min: Some(0.0),
                max: None,
            },
        });
        collection
            .documents
            .push(document("doc-1", json!({ "total": 19.5 })));
        collection
            .documents
            .push(document("doc-2", json!({ "total": 7.0 })));

        let mut database = DatabaseNode::new("main");
        database
            .collections
            .insert("orders".to_string(), collection);
        snapshot.databases.insert("maindb".to_string(), database);

        snapshot.functions.push(FunctionSpec {
            id: "fn-1".to_string(),
            name: "mailer".to_string(),
            runtime: "node-18".to_string(),
        });

        let mut bucket = BucketNode::new("avatars");
        bucket.files.push(FileSpec {
            id: "file-1".to_string(),
            name: "a.png".to_string(),
            size_bytes: 2048,
        });
        snapshot.storage.buckets.insert("avatars".to_string(), bucket);

        snapshot
    }

    #[test]
    fn test_compare_is_reflexive() {
        let snapshot = sample_snapshot();
        assert_eq!(compare(&snapshot, &snapshot), DiffResult::NoDifferences);
    }

    #[test]
    fn test_document_order_is_insignificant() {
        let source = sample_snapshot();
        let mut destination = sample_snapshot();
        destination
            .databases
            .get_mut("maindb")
            .unwrap()
            .collections
            .get_mut("orders")
            .unwrap()
            .documents
            .reverse();

        assert_eq!(compare(&source, &destination), DiffResult::NoDifferences);
    }

    #[test]
    fn test_bookkeeping_fields_are_not_compared() {
        let source = sample_snapshot();
        let mut destination = sample_snapshot();
        destination.completed = true;
        destination.completed_resources.push("functions".to_string());
        destination.tool_version = "9.9.9".to_string();

        assert_eq!(compare(&source, &destination), DiffResult::NoDifferences);
    }

    #[test]
    fn test_single_field_change_is_one_entry_at_the_right_path() {
        let source = sample_snapshot();
        let mut destination = sample_snapshot();
        destination
            .databases
            .get_mut("maindb")
            .unwrap()
            .collections
            .get_mut("orders")
            .unwrap()
            .documents[0]
            .fields
            .insert("total".to_string(), json!(21.0));

        let result = compare(&source, &destination);
        let entries = result.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].path,
            "databases/maindb/collections/orders/documents/doc-1/total"
        );
        assert!(matches!(entries[0].change, Change::Changed { .. }));
    }

    #[test]
    fn test_added_and_removed_documents_are_classified() {
        let source = sample_snapshot();
        let mut destination = sample_snapshot();
        let collection = destination
            .databases
            .get_mut("maindb")
            .unwrap()
            .collections
            .get_mut("orders")
            .unwrap();
        collection.documents.remove(0); // doc-1 gone
        collection
            .documents
            .push(document("doc-3", json!({ "total": 1.0 })));

        let result = compare(&source, &destination);
        let entries = result.entries();
        assert_eq!(entries.len(), 2);

        let removed = entries
            .iter()
            .find(|e| matches!(e.change, Change::Removed(_)))
            .unwrap();
        assert_eq!(
            removed.path,
            "databases/maindb/collections/orders/documents/doc-1"
        );

        let added = entries
            .iter()
            .find(|e| matches!(e.change, Change::Added(_)))
            .unwrap();
        assert_eq!(
            added.path,
            "databases/maindb/collections/orders/documents/doc-3"
        );
    }

    #[test]
    fn test_attribute_order_is_insignificant() {
        let mut source = sample_snapshot();
        let mut destination = sample_snapshot();

        let extra = AttributeSpec {
            key: "status".to_string(),
            required: false,
            array: false,
            default: None,
            kind: AttributeKind::Enum {
                elements: vec!["open".to_string(), "paid".to_string()],
            },
        };
        // Same attributes, inserted in a different order on each side.
        source
            .databases
            .get_mut("maindb")
            .unwrap()
            .collections
            .get_mut("orders")
            .unwrap()
            .attributes
            .push(extra.clone());
        destination
            .databases
            .get_mut("maindb")
            .unwrap()
            .collections
            .get_mut("orders")
            .unwrap()
            .attributes
            .insert(0, extra);

        assert_eq!(compare(&source, &destination), DiffResult::NoDifferences);
    }

    #[test]
    fn test_function_runtime_change_is_reported() {
        let source = sample_snapshot();
        let mut destination = sample_snapshot();
        destination.functions[0].runtime = "node-20".to_string();

        let result = compare(&source, &destination);
        let entries = result.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "functions/fn-1/runtime");
    }

    #[test]
    fn test_missing_bucket_is_removed_at_bucket_path() {
        let source = sample_snapshot();
        let mut destination = sample_snapshot();
        destination.storage.buckets.clear();

        let result = compare(&source, &destination);
        let entries = result.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "storage/avatars");
        assert!(matches!(entries[0].change, Change::Removed(_)));
    }

    #[test]
    fn test_display_formats_change_direction() {
        let source = sample_snapshot();
        let mut destination = sample_snapshot();
        destination.functions[0].runtime = "node-20".to_string();

        let rendered = compare(&source, &destination).to_string();
        assert!(rendered.contains("~ functions/fn-1/runtime"));
        assert!(rendered.contains("node-18"));
        assert!(rendered.contains("node-20"));
    }
}
