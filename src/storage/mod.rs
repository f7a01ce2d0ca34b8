//! Document-store abstraction for academy data.
//!
//! This module provides a clean separation between storage concerns and the
//! administrative logic built on top. The [`DocumentStore`] trait defines the
//! primitives the rest of the crate consumes: point lookups by id, equality
//! predicate queries (AND-combinable, optionally ordered and paginated), live
//! subscriptions, and document mutation with soft-delete support.
//!
//! The storage layer is responsible for:
//! - PUT/GET/DELETE operations on JSON documents grouped into collections
//! - Predicate evaluation and result ordering for `find`
//! - Delivering fresh snapshots to live subscriptions after each mutation
//!
//! The storage layer is NOT responsible for:
//! - Tenant scoping (that lives in [`crate::scope`]; callers compose a
//!   scoped [`Filter`] before reaching this layer)
//! - Role checks or any other business logic
//!
//! # Example
//!
//! ```rust
//! use academy_server::storage::{DocumentStore, Filter, InMemoryStore};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//!
//! let doc = store
//!     .insert("classes", json!({"academyId": "a1", "name": "Physics", "isDeleted": false}))
//!     .await?;
//!
//! let found = store
//!     .find("classes", &Filter::new().with_eq("academyId", "a1"))
//!     .await?;
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].id, doc.id);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;

pub use errors::StorageError;
pub use in_memory::{InMemoryStore, InMemoryStoreStats};

use chrono::DateTime;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use tokio::sync::watch;

/// A stored document: an id plus its JSON fields.
///
/// The id is held outside the field map, the way the backing document
/// database separates document names from document data.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Look up a top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Top-level string field, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(Value::as_str)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.data)
    }
}

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// An equality-predicate query over one collection.
///
/// Conditions are combined with AND, matching the expressiveness of the
/// external document database: no inequality predicates, no OR. Ordering and
/// offset/limit pagination are applied after filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
    order_by: Option<(String, SortOrder)>,
    offset: Option<usize>,
    limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition on a top-level field.
    pub fn with_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Order results by a top-level field.
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The equality conditions, in insertion order.
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Whether a document satisfies every condition.
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| doc.field(field) == Some(expected))
    }

    /// Apply ordering and pagination to an already-filtered result set.
    pub fn arrange(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some((field, order)) = &self.order_by {
            docs.sort_by(|a, b| {
                let ord = cmp_field_values(a.field(field), b.field(field));
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        } else {
            // Stable default order so pagination is deterministic.
            docs.sort_by(|a, b| a.id.cmp(&b.id));
        }
        let offset = self.offset.unwrap_or(0);
        let docs: Vec<Document> = docs.into_iter().skip(offset).collect();
        match self.limit {
            Some(limit) => docs.into_iter().take(limit).collect(),
            None => docs,
        }
    }
}

/// Compare two field values for ordering purposes.
///
/// Strings that both parse as RFC 3339 timestamps are compared
/// chronologically; raw lexicographic comparison would mis-order timestamps
/// with differing sub-second precision.
fn cmp_field_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (
                DateTime::parse_from_rfc3339(a),
                DateTime::parse_from_rfc3339(b),
            ) {
                (Ok(ta), Ok(tb)) => ta.cmp(&tb),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Handle to a live query, independent of the backing store.
///
/// Holds the current result snapshot and wakes on every newer one.
/// Subscribers observe monotonically-recent snapshots: intermediates may be
/// skipped, state never regresses. Dropping the handle releases the
/// underlying registration; [`Subscription::unsubscribe`] does the same
/// explicitly.
pub struct Subscription {
    rx: watch::Receiver<Vec<Document>>,
    // Releases the backend-side registration when dropped.
    _guard: Box<dyn Send + Sync>,
}

impl Subscription {
    /// Wrap a snapshot receiver and a backend release guard.
    pub fn new(rx: watch::Receiver<Vec<Document>>, guard: Box<dyn Send + Sync>) -> Self {
        Self { rx, _guard: guard }
    }

    /// The most recent result snapshot.
    pub fn current(&self) -> Vec<Document> {
        self.rx.borrow().clone()
    }

    /// Wait for a snapshot newer than the last one observed. Returns `false`
    /// once the store side has gone away.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Tear the subscription down explicitly.
    pub fn unsubscribe(self) {
        // Dropping the guard performs the deregistration.
    }
}

/// Core trait for document-store backends.
///
/// Implementations focus solely on persistence and retrieval; they know
/// nothing about viewers, roles, or tenants beyond the field values callers
/// put into filters.
///
/// Design notes, following the external database's semantics:
/// - `insert` assigns the id; `put` replaces the whole document at a known id
/// - `update_fields` merges a field set into an existing document
/// - `soft_delete` flips `isDeleted`; `hard_delete` removes the document and
///   reports whether it existed
/// - `subscribe` registers a live query whose handle releases the
///   subscription when dropped
pub trait DocumentStore: Send + Sync {
    /// The error type returned by storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store a new document with a generated id and return it.
    fn insert(
        &self,
        collection: &str,
        data: Value,
    ) -> impl Future<Output = Result<Document, Self::Error>> + Send;

    /// Replace the document at `id`, creating it if absent.
    fn put(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> impl Future<Output = Result<Document, Self::Error>> + Send;

    /// Point lookup by id.
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send;

    /// Merge a set of top-level fields into an existing document and return
    /// the updated document. Fails if the document does not exist.
    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> impl Future<Output = Result<Document, Self::Error>> + Send;

    /// Mark a document deleted by setting `isDeleted: true`.
    /// Fails if the document does not exist.
    fn soft_delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Remove a document entirely. Returns whether it existed.
    fn hard_delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Run an equality-predicate query.
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send;

    /// Count documents matching a filter.
    fn count(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// Register a live query. The subscription observes the current result
    /// set immediately and a fresh snapshot after every mutation that
    /// touches the collection.
    fn subscribe(
        &self,
        collection: &str,
        filter: Filter,
    ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        Document::new(id, data)
    }

    #[test]
    fn filter_matches_all_conditions() {
        let filter = Filter::new()
            .with_eq("academyId", "a1")
            .with_eq("isDeleted", false);

        assert!(filter.matches(&doc("1", json!({"academyId": "a1", "isDeleted": false}))));
        assert!(!filter.matches(&doc("2", json!({"academyId": "a2", "isDeleted": false}))));
        assert!(!filter.matches(&doc("3", json!({"academyId": "a1", "isDeleted": true}))));
        assert!(!filter.matches(&doc("4", json!({"academyId": "a1"}))));
    }

    #[test]
    fn arrange_orders_timestamps_chronologically() {
        // Differing sub-second precision; lexicographic order would invert these.
        let filter = Filter::new().order_by("createdAt", SortOrder::Descending);
        let arranged = filter.arrange(vec![
            doc("a", json!({"createdAt": "2025-01-01T10:00:00Z"})),
            doc("b", json!({"createdAt": "2025-01-01T10:00:00.500Z"})),
        ]);
        assert_eq!(arranged[0].id, "b");
        assert_eq!(arranged[1].id, "a");
    }

    #[test]
    fn arrange_paginates_after_ordering() {
        let filter = Filter::new().with_offset(1).with_limit(2);
        let arranged = filter.arrange(vec![
            doc("c", json!({})),
            doc("a", json!({})),
            doc("d", json!({})),
            doc("b", json!({})),
        ]);
        let ids: Vec<&str> = arranged.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn document_field_access() {
        let d = doc("s1", json!({"studentName": "Kim", "score": 85}));
        assert_eq!(d.str_field("studentName"), Some("Kim"));
        assert_eq!(d.field("score"), Some(&json!(85)));
        assert_eq!(d.field("missing"), None);
    }
}
