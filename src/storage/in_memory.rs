//! In-memory document store.
//!
//! Thread-safe implementation of [`DocumentStore`] over nested `HashMap`s,
//! intended for tests, development, and as the reference semantics for real
//! backends. Live queries are backed by `tokio::sync::watch`: every mutation
//! to a collection pushes a fresh snapshot to each subscription registered on
//! that collection, so subscribers observe monotonically-recent state (they
//! may skip intermediate snapshots, never regress).
//!
//! Subscription handles deregister themselves when dropped, which removes the
//! leaked-listener bug class: a screen that goes away takes its live query
//! with it.
//!
//! # Example
//!
//! ```rust
//! use academy_server::storage::{DocumentStore, Filter, InMemoryStore};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! let mut sub = store
//!     .subscribe("students", Filter::new().with_eq("academyId", "a1"))
//!     .await?;
//! assert!(sub.current().is_empty());
//!
//! store
//!     .insert("students", json!({"academyId": "a1", "studentName": "Kim"}))
//!     .await?;
//! sub.changed().await;
//! assert_eq!(sub.current().len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::storage::{Document, DocumentStore, Filter, StorageError, Subscription};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

type Collections = HashMap<String, HashMap<String, Value>>;

struct SubEntry {
    collection: String,
    filter: Filter,
    tx: watch::Sender<Vec<Document>>,
}

type Registry = Mutex<HashMap<u64, SubEntry>>;

/// Thread-safe in-memory store: `collection` → `document id` → fields.
#[derive(Clone)]
pub struct InMemoryStore {
    data: Arc<RwLock<Collections>>,
    subscribers: Arc<Registry>,
    next_sub_id: Arc<AtomicU64>,
}

/// Counts reported by [`InMemoryStore::stats`], for debugging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryStoreStats {
    pub collection_count: usize,
    pub document_count: usize,
    pub subscription_count: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_sub_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Current storage and subscription counts.
    pub async fn stats(&self) -> InMemoryStoreStats {
        let data = self.data.read().await;
        let document_count = data.values().map(HashMap::len).sum();
        let subscription_count = self
            .subscribers
            .lock()
            .map(|reg| reg.len())
            .unwrap_or_default();
        InMemoryStoreStats {
            collection_count: data.len(),
            document_count,
            subscription_count,
        }
    }

    /// Remove all documents. Active subscriptions observe empty snapshots.
    pub async fn clear(&self) {
        let mut data = self.data.write().await;
        let collections: Vec<String> = data.keys().cloned().collect();
        data.clear();
        for collection in collections {
            self.notify(&collection, &data);
        }
    }

    fn require_object(data: &Value) -> Result<(), StorageError> {
        if data.is_object() {
            Ok(())
        } else {
            Err(StorageError::InvalidData(
                "document data must be a JSON object".to_string(),
            ))
        }
    }

    fn snapshot(collection_data: Option<&HashMap<String, Value>>, filter: &Filter) -> Vec<Document> {
        let docs = collection_data
            .map(|m| {
                m.iter()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .filter(|doc| filter.matches(doc))
                    .collect()
            })
            .unwrap_or_default();
        filter.arrange(docs)
    }

    /// Push fresh snapshots to every subscription on `collection`.
    /// Called with the data lock held so snapshots cannot interleave with a
    /// concurrent mutation.
    fn notify(&self, collection: &str, data: &Collections) {
        let Ok(registry) = self.subscribers.lock() else {
            return;
        };
        for entry in registry.values().filter(|e| e.collection == collection) {
            let docs = Self::snapshot(data.get(collection), &entry.filter);
            entry.tx.send_replace(docs);
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryStore {
    type Error = StorageError;

    async fn insert(&self, collection: &str, data: Value) -> Result<Document, Self::Error> {
        Self::require_object(&data)?;
        let id = Uuid::new_v4().to_string();
        let mut guard = self.data.write().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data.clone());
        self.notify(collection, &guard);
        Ok(Document::new(id, data))
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> Result<Document, Self::Error> {
        Self::require_object(&data)?;
        let mut guard = self.data.write().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data.clone());
        self.notify(collection, &guard);
        Ok(Document::new(id, data))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Self::Error> {
        let guard = self.data.read().await;
        Ok(guard
            .get(collection)
            .and_then(|m| m.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Document, Self::Error> {
        let Value::Object(patch) = patch else {
            return Err(StorageError::InvalidData(
                "field patch must be a JSON object".to_string(),
            ));
        };
        let mut guard = self.data.write().await;
        let existing = guard
            .get_mut(collection)
            .and_then(|m| m.get_mut(id))
            .ok_or_else(|| StorageError::not_found(collection, id))?;
        let Value::Object(fields) = existing else {
            return Err(StorageError::InvalidData(format!(
                "stored document {collection}/{id} is not an object"
            )));
        };
        for (key, value) in patch {
            fields.insert(key, value);
        }
        let updated = Document::new(id, existing.clone());
        self.notify(collection, &guard);
        Ok(updated)
    }

    async fn soft_delete(&self, collection: &str, id: &str) -> Result<(), Self::Error> {
        self.update_fields(collection, id, serde_json::json!({"isDeleted": true}))
            .await
            .map(|_| ())
    }

    async fn hard_delete(&self, collection: &str, id: &str) -> Result<bool, Self::Error> {
        let mut guard = self.data.write().await;
        let existed = guard
            .get_mut(collection)
            .map(|m| m.remove(id).is_some())
            .unwrap_or(false);
        if existed {
            self.notify(collection, &guard);
        }
        Ok(existed)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, Self::Error> {
        let guard = self.data.read().await;
        Ok(Self::snapshot(guard.get(collection), filter))
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, Self::Error> {
        let guard = self.data.read().await;
        Ok(guard
            .get(collection)
            .map(|m| {
                m.iter()
                    .filter(|(id, data)| {
                        filter.matches(&Document::new((*id).clone(), (*data).clone()))
                    })
                    .count()
            })
            .unwrap_or(0))
    }

    async fn subscribe(&self, collection: &str, filter: Filter) -> Result<Subscription, Self::Error> {
        let guard = self.data.read().await;
        let initial = Self::snapshot(guard.get(collection), &filter);
        let (tx, rx) = watch::channel(initial);
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        let mut registry = self
            .subscribers
            .lock()
            .map_err(|_| StorageError::Unavailable("subscriber registry poisoned".to_string()))?;
        registry.insert(
            id,
            SubEntry {
                collection: collection.to_string(),
                filter,
                tx,
            },
        );
        let guard = RegistryGuard {
            id,
            registry: Arc::clone(&self.subscribers),
        };
        Ok(Subscription::new(rx, Box::new(guard)))
    }
}

/// Removes the subscription entry when the handle is dropped.
struct RegistryGuard {
    id: u64,
    registry: Arc<Registry>,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SortOrder;
    use serde_json::json;

    #[tokio::test]
    async fn insert_get_roundtrip() {
        let store = InMemoryStore::new();
        let doc = store
            .insert("classes", json!({"name": "Physics", "academyId": "a1"}))
            .await
            .unwrap();

        let fetched = store.get("classes", &doc.id).await.unwrap().unwrap();
        assert_eq!(fetched, doc);
        assert!(store.get("classes", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_rejects_non_object() {
        let store = InMemoryStore::new();
        let err = store.insert("classes", json!("plain")).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[tokio::test]
    async fn update_fields_merges_and_errors_on_missing() {
        let store = InMemoryStore::new();
        let doc = store
            .insert("students", json!({"studentName": "Kim", "status": "pending"}))
            .await
            .unwrap();

        let updated = store
            .update_fields("students", &doc.id, json!({"status": "active", "classId": "c1"}))
            .await
            .unwrap();
        assert_eq!(updated.str_field("status"), Some("active"));
        assert_eq!(updated.str_field("classId"), Some("c1"));
        assert_eq!(updated.str_field("studentName"), Some("Kim"));

        let err = store
            .update_fields("students", "missing", json!({"status": "active"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn soft_delete_sets_flag_without_removing() {
        let store = InMemoryStore::new();
        let doc = store
            .insert("academies", json!({"name": "Sunshine", "isDeleted": false}))
            .await
            .unwrap();

        store.soft_delete("academies", &doc.id).await.unwrap();
        let fetched = store.get("academies", &doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.field("isDeleted"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn hard_delete_reports_existence() {
        let store = InMemoryStore::new();
        let doc = store.insert("academyAssignments", json!({})).await.unwrap();
        assert!(store.hard_delete("academyAssignments", &doc.id).await.unwrap());
        assert!(!store.hard_delete("academyAssignments", &doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn find_applies_filter_and_order() {
        let store = InMemoryStore::new();
        store
            .insert(
                "submissions",
                json!({"academyId": "a1", "createdAt": "2025-01-02T00:00:00Z"}),
            )
            .await
            .unwrap();
        store
            .insert(
                "submissions",
                json!({"academyId": "a1", "createdAt": "2025-01-03T00:00:00Z"}),
            )
            .await
            .unwrap();
        store
            .insert(
                "submissions",
                json!({"academyId": "a2", "createdAt": "2025-01-01T00:00:00Z"}),
            )
            .await
            .unwrap();

        let filter = Filter::new()
            .with_eq("academyId", "a1")
            .order_by("createdAt", SortOrder::Descending);
        let docs = store.find("submissions", &filter).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs[0].str_field("createdAt"),
            Some("2025-01-03T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn subscription_sees_initial_and_updates() {
        let store = InMemoryStore::new();
        store
            .insert("students", json!({"academyId": "a1", "status": "pending"}))
            .await
            .unwrap();

        let mut sub = store
            .subscribe("students", Filter::new().with_eq("academyId", "a1"))
            .await
            .unwrap();
        assert_eq!(sub.current().len(), 1);

        store
            .insert("students", json!({"academyId": "a1", "status": "active"}))
            .await
            .unwrap();
        assert!(sub.changed().await);
        assert_eq!(sub.current().len(), 2);

        // Another tenant's write does not surface in the snapshot.
        store
            .insert("students", json!({"academyId": "a2", "status": "pending"}))
            .await
            .unwrap();
        assert!(sub.changed().await);
        assert_eq!(sub.current().len(), 2);
    }

    #[tokio::test]
    async fn dropping_subscription_deregisters_it() {
        let store = InMemoryStore::new();
        let sub = store.subscribe("students", Filter::new()).await.unwrap();
        assert_eq!(store.stats().await.subscription_count, 1);

        drop(sub);
        assert_eq!(store.stats().await.subscription_count, 0);

        let sub2 = store.subscribe("students", Filter::new()).await.unwrap();
        sub2.unsubscribe();
        assert_eq!(store.stats().await.subscription_count, 0);
    }

    #[tokio::test]
    async fn clear_empties_active_snapshots() {
        let store = InMemoryStore::new();
        store.insert("classes", json!({"academyId": "a1"})).await.unwrap();
        let mut sub = store.subscribe("classes", Filter::new()).await.unwrap();
        assert_eq!(sub.current().len(), 1);

        store.clear().await;
        assert!(sub.changed().await);
        assert!(sub.current().is_empty());
    }
}
