//! Shared fixtures for the integration tests: logging setup, document
//! seeding, and instrumented store wrappers for failure and latency
//! injection.

#![allow(dead_code)]

use academy_server::storage::{Document, DocumentStore, Filter, InMemoryStore, StorageError, Subscription};
use serde_json::{Value, json};
use std::time::Duration;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const SUNSHINE_ADMIN: &str = "admin@sunshine-academy.com";
pub const MOONLIGHT_ADMIN: &str = "admin@moonlight-academy.com";
pub const PLATFORM_OPS: &str = "ops@rulemakers.co.kr";

pub async fn seed_academy(store: &InMemoryStore, name: &str, admin_email: &str) -> String {
    store
        .insert(
            "academies",
            json!({
                "name": name,
                "adminEmail": admin_email,
                "createdAt": "2025-01-01T00:00:00Z",
                "isDeleted": false,
            }),
        )
        .await
        .expect("seed academy")
        .id
}

pub async fn seed_class(store: &InMemoryStore, academy_id: &str, name: &str) -> String {
    store
        .insert(
            "classes",
            json!({
                "academyId": academy_id,
                "name": name,
                "createdAt": "2025-01-02T00:00:00Z",
                "isDeleted": false,
            }),
        )
        .await
        .expect("seed class")
        .id
}

pub async fn seed_student(
    store: &InMemoryStore,
    academy_id: &str,
    name: &str,
    status: &str,
) -> String {
    store
        .insert(
            "students",
            json!({
                "academyId": academy_id,
                "studentName": name,
                "status": status,
                "isDeleted": false,
                "createdAt": "2025-01-03T00:00:00Z",
            }),
        )
        .await
        .expect("seed student")
        .id
}

/// Store wrapper that delays every `find`, for exercising in-flight
/// resolution being superseded.
#[derive(Clone)]
pub struct SlowStore {
    inner: InMemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: InMemoryStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl DocumentStore for SlowStore {
    type Error = StorageError;

    async fn insert(&self, collection: &str, data: Value) -> Result<Document, Self::Error> {
        self.inner.insert(collection, data).await
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> Result<Document, Self::Error> {
        self.inner.put(collection, id, data).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Self::Error> {
        self.inner.get(collection, id).await
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Document, Self::Error> {
        self.inner.update_fields(collection, id, patch).await
    }

    async fn soft_delete(&self, collection: &str, id: &str) -> Result<(), Self::Error> {
        self.inner.soft_delete(collection, id).await
    }

    async fn hard_delete(&self, collection: &str, id: &str) -> Result<bool, Self::Error> {
        self.inner.hard_delete(collection, id).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, Self::Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.find(collection, filter).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, Self::Error> {
        self.inner.count(collection, filter).await
    }

    async fn subscribe(&self, collection: &str, filter: Filter) -> Result<Subscription, Self::Error> {
        self.inner.subscribe(collection, filter).await
    }
}

/// Store wrapper whose queries always fail, for exercising the fail-closed
/// path of role resolution.
#[derive(Clone)]
pub struct UnavailableStore {
    inner: InMemoryStore,
}

impl UnavailableStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
        }
    }

    fn unavailable() -> StorageError {
        StorageError::Unavailable("directory offline".to_string())
    }
}

impl DocumentStore for UnavailableStore {
    type Error = StorageError;

    async fn insert(&self, collection: &str, data: Value) -> Result<Document, Self::Error> {
        self.inner.insert(collection, data).await
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> Result<Document, Self::Error> {
        self.inner.put(collection, id, data).await
    }

    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Document>, Self::Error> {
        Err(Self::unavailable())
    }

    async fn update_fields(
        &self,
        _collection: &str,
        _id: &str,
        _patch: Value,
    ) -> Result<Document, Self::Error> {
        Err(Self::unavailable())
    }

    async fn soft_delete(&self, _collection: &str, _id: &str) -> Result<(), Self::Error> {
        Err(Self::unavailable())
    }

    async fn hard_delete(&self, _collection: &str, _id: &str) -> Result<bool, Self::Error> {
        Err(Self::unavailable())
    }

    async fn find(&self, _collection: &str, _filter: &Filter) -> Result<Vec<Document>, Self::Error> {
        Err(Self::unavailable())
    }

    async fn count(&self, _collection: &str, _filter: &Filter) -> Result<usize, Self::Error> {
        Err(Self::unavailable())
    }

    async fn subscribe(
        &self,
        _collection: &str,
        _filter: Filter,
    ) -> Result<Subscription, Self::Error> {
        Err(Self::unavailable())
    }
}
