//! A process-local JSON document collection with unique indexes.
//!
//! Documents are stored as raw `serde_json::Value`s, the way a document
//! database stores them, so decoding happens on read and a corrupt
//! document only affects the reads that touch it. Every mutation runs
//! under the collection's write lock, which makes the unique-index check
//! and the write a single atomic step.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use schoolhub_core::error::AppError;
use schoolhub_core::result::AppResult;

/// Field equality filter: every `(field, value)` pair must match.
pub type Filter<'a> = &'a [(&'a str, Value)];

/// A unique index over one or more top-level fields.
///
/// Documents missing any indexed field are not indexed.
#[derive(Debug, Clone)]
pub struct UniqueIndex {
    name: &'static str,
    fields: &'static [&'static str],
}

impl UniqueIndex {
    fn key<'a>(&self, body: &'a Value) -> Option<Vec<&'a Value>> {
        self.fields
            .iter()
            .map(|field| body.get(*field).filter(|v| !v.is_null()))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct StoredDocument {
    /// Insertion sequence; defines natural order.
    seq: u64,
    body: Value,
}

#[derive(Debug, Default)]
struct CollectionState {
    documents: HashMap<Uuid, StoredDocument>,
    next_seq: u64,
}

/// An in-memory document collection.
#[derive(Debug)]
pub struct DocumentCollection {
    name: &'static str,
    unique_indexes: Vec<UniqueIndex>,
    state: RwLock<CollectionState>,
}

impl DocumentCollection {
    /// Create an empty collection.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            unique_indexes: Vec::new(),
            state: RwLock::new(CollectionState::default()),
        }
    }

    /// Declare a unique index.
    pub fn with_unique_index(mut self, name: &'static str, fields: &'static [&'static str]) -> Self {
        self.unique_indexes.push(UniqueIndex { name, fields });
        self
    }

    /// The collection name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Insert a new document.
    ///
    /// Fails with `Conflict` if the id is taken or a unique index would be
    /// violated.
    pub async fn insert(&self, id: Uuid, body: Value) -> AppResult<()> {
        if !body.is_object() {
            return Err(AppError::validation(format!(
                "Documents in '{}' must be JSON objects",
                self.name
            )));
        }

        let mut state = self.state.write().await;
        if state.documents.contains_key(&id) {
            return Err(AppError::conflict(format!(
                "Document '{id}' already exists in '{}'",
                self.name
            )));
        }
        self.check_unique(&state, id, &body)?;

        let seq = state.next_seq;
        state.next_seq += 1;
        state.documents.insert(id, StoredDocument { seq, body });
        Ok(())
    }

    /// Replace an existing document that matches `filter`, keeping its
    /// insertion position.
    ///
    /// Fields listed in `pinned` keep their stored values regardless of
    /// what `body` contains. Returns the stored document. Fails with
    /// `NotFound` if no matching document exists.
    pub async fn replace(
        &self,
        id: Uuid,
        mut body: Value,
        filter: Filter<'_>,
        pinned: &[&str],
    ) -> AppResult<Value> {
        let mut state = self.state.write().await;
        let existing = state
            .documents
            .get(&id)
            .filter(|doc| matches(&doc.body, filter))
            .ok_or_else(|| {
                AppError::not_found(format!("Document '{id}' not found in '{}'", self.name))
            })?;

        let Some(fields) = body.as_object_mut() else {
            return Err(AppError::validation(format!(
                "Documents in '{}' must be JSON objects",
                self.name
            )));
        };
        for field in pinned {
            match existing.body.get(*field) {
                Some(value) => {
                    fields.insert((*field).to_string(), value.clone());
                }
                None => {
                    fields.remove(*field);
                }
            }
        }

        let seq = existing.seq;
        self.check_unique(&state, id, &body)?;
        state.documents.insert(
            id,
            StoredDocument {
                seq,
                body: body.clone(),
            },
        );
        Ok(body)
    }

    /// Apply `update` in place to the first document (in insertion order)
    /// matching `filter`. The read and the write happen under one write
    /// lock, so concurrent updates never overwrite each other. Returns the
    /// updated document, or `None` when nothing matches.
    pub async fn update_first<F>(&self, filter: Filter<'_>, update: F) -> AppResult<Option<Value>>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut state = self.state.write().await;
        let Some(id) = state
            .documents
            .iter()
            .filter(|(_, doc)| matches(&doc.body, filter))
            .min_by_key(|(_, doc)| doc.seq)
            .map(|(id, _)| *id)
        else {
            return Ok(None);
        };

        let mut body = state.documents[&id].body.clone();
        let Some(fields) = body.as_object_mut() else {
            return Err(AppError::validation(format!(
                "Documents in '{}' must be JSON objects",
                self.name
            )));
        };
        update(fields);
        self.check_unique(&state, id, &body)?;

        if let Some(doc) = state.documents.get_mut(&id) {
            doc.body = body.clone();
        }
        Ok(Some(body))
    }

    /// Fetch a document by id if it matches `filter`.
    pub async fn get(&self, id: Uuid, filter: Filter<'_>) -> Option<Value> {
        let state = self.state.read().await;
        state
            .documents
            .get(&id)
            .filter(|doc| matches(&doc.body, filter))
            .map(|doc| doc.body.clone())
    }

    /// All documents matching `filter`, in insertion order.
    pub async fn scan(&self, filter: Filter<'_>) -> Vec<Value> {
        let state = self.state.read().await;
        let mut docs: Vec<&StoredDocument> = state
            .documents
            .values()
            .filter(|doc| matches(&doc.body, filter))
            .collect();
        docs.sort_by_key(|doc| doc.seq);
        docs.into_iter().map(|doc| doc.body.clone()).collect()
    }

    /// Remove a document by id if it matches `filter`. Returns whether a
    /// document was removed.
    pub async fn remove(&self, id: Uuid, filter: Filter<'_>) -> bool {
        let mut state = self.state.write().await;
        let matched = state
            .documents
            .get(&id)
            .is_some_and(|doc| matches(&doc.body, filter));
        if matched {
            state.documents.remove(&id);
        }
        matched
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    /// Whether the collection is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_unique(&self, state: &CollectionState, id: Uuid, body: &Value) -> AppResult<()> {
        for index in &self.unique_indexes {
            let Some(key) = index.key(body) else {
                continue;
            };
            let duplicate = state
                .documents
                .iter()
                .filter(|(other_id, _)| **other_id != id)
                .any(|(_, other)| index.key(&other.body).as_ref() == Some(&key));
            if duplicate {
                return Err(AppError::conflict(format!(
                    "Duplicate key in '{}' violates unique index '{}'",
                    self.name, index.name
                )));
            }
        }
        Ok(())
    }
}

fn matches(body: &Value, filter: Filter<'_>) -> bool {
    filter
        .iter()
        .all(|(field, expected)| body.get(*field) == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_core::error::ErrorKind;
    use serde_json::json;

    fn installs() -> DocumentCollection {
        DocumentCollection::new("installed_plugins")
            .with_unique_index("tenant_plugin", &["tenant_id", "plugin_id"])
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicates() {
        let collection = installs();
        collection
            .insert(Uuid::new_v4(), json!({ "tenant_id": "t1", "plugin_id": "sms" }))
            .await
            .unwrap();
        collection
            .insert(Uuid::new_v4(), json!({ "tenant_id": "t2", "plugin_id": "sms" }))
            .await
            .unwrap();

        let err = collection
            .insert(Uuid::new_v4(), json!({ "tenant_id": "t1", "plugin_id": "sms" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(collection.len().await, 2);
    }

    #[tokio::test]
    async fn test_documents_missing_index_fields_are_not_indexed() {
        let collection = installs();
        collection.insert(Uuid::new_v4(), json!({ "tenant_id": "t1" })).await.unwrap();
        collection.insert(Uuid::new_v4(), json!({ "tenant_id": "t1" })).await.unwrap();
        assert_eq!(collection.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_update_first_applies_concurrent_updates_in_place() {
        let collection = std::sync::Arc::new(DocumentCollection::new("plugins"));
        let id = Uuid::new_v4();
        collection
            .insert(id, json!({ "plugin_id": "sms", "downloads": 0, "status": "published" }))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let collection = std::sync::Arc::clone(&collection);
            tasks.push(tokio::spawn(async move {
                collection
                    .update_first(&[("plugin_id", json!("sms"))], |fields| {
                        let n = fields.get("downloads").and_then(Value::as_u64).unwrap_or(0);
                        fields.insert("downloads".to_string(), json!(n + 1));
                    })
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_some());
        }

        let stored = collection.get(id, &[]).await.unwrap();
        assert_eq!(stored["downloads"], json!(50));
        assert_eq!(stored["status"], json!("published"));

        let missing = collection
            .update_first(&[("plugin_id", json!("other"))], |_| {})
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_scan_keeps_insertion_order_across_replace() {
        let collection = DocumentCollection::new("plugins");
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        collection.insert(first, json!({ "n": 1 })).await.unwrap();
        collection.insert(second, json!({ "n": 2 })).await.unwrap();
        collection.replace(first, json!({ "n": 10 }), &[], &[]).await.unwrap();

        let docs = collection.scan(&[]).await;
        assert_eq!(docs, vec![json!({ "n": 10 }), json!({ "n": 2 })]);
    }

    #[tokio::test]
    async fn test_replace_pins_fields_and_respects_filter() {
        let collection = installs();
        let id = Uuid::new_v4();
        collection
            .insert(id, json!({ "tenant_id": "t1", "plugin_id": "sms", "status": "installed" }))
            .await
            .unwrap();

        let stored = collection
            .replace(
                id,
                json!({ "tenant_id": "t1", "plugin_id": "other", "status": "enabled" }),
                &[("tenant_id", json!("t1"))],
                &["plugin_id"],
            )
            .await
            .unwrap();
        assert_eq!(stored["plugin_id"], "sms");
        assert_eq!(stored["status"], "enabled");

        let err = collection
            .replace(id, json!({ "status": "disabled" }), &[("tenant_id", json!("t2"))], &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove_is_filtered_and_idempotent() {
        let collection = installs();
        let id = Uuid::new_v4();
        collection
            .insert(id, json!({ "tenant_id": "t1", "plugin_id": "sms" }))
            .await
            .unwrap();

        assert!(!collection.remove(id, &[("tenant_id", json!("t2"))]).await);
        assert!(collection.remove(id, &[("tenant_id", json!("t1"))]).await);
        assert!(!collection.remove(id, &[("tenant_id", json!("t1"))]).await);
        assert!(collection.is_empty().await);
    }

    #[tokio::test]
    async fn test_non_object_documents_are_rejected() {
        let collection = DocumentCollection::new("plugins");
        let err = collection.insert(Uuid::new_v4(), json!([1, 2])).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
