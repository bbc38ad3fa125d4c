//! crates/life_engine_core/src/memory.rs
//!
//! An in-process `DocumentStore`. It backs the service when no database is
//! configured and is the store every test runs against.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{CollectionPath, Document, Fields};
use crate::ports::{
    ensure_patch_allowed, ChangeEvent, CollectionQuery, DocumentStore, FieldFilter, FilterOp,
    FilterValue, PortError, PortResult, SortDirection,
};

const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Default)]
struct Inner {
    /// Documents per collection path, in insertion order.
    collections: HashMap<String, Vec<Document>>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// The store clock. Never goes backwards, so `createdAt` is monotonic.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(stamp);
        stamp
    }
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: RwLock::new(Inner::default()),
            changes,
        }
    }

    fn publish(&self, path: &CollectionPath, document_id: Uuid) {
        // No receivers simply means no live bindings right now.
        let _ = self.changes.send(ChangeEvent {
            path: path.clone(),
            document_id,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add_document(&self, path: &CollectionPath, fields: Fields) -> PortResult<Document> {
        ensure_patch_allowed(&fields)?;
        let document = {
            let mut inner = self.inner.write().await;
            let document = Document {
                id: Uuid::new_v4(),
                user_id: path.user_id().clone(),
                created_at: inner.next_timestamp(),
                fields,
            };
            inner
                .collections
                .entry(path.to_string())
                .or_default()
                .push(document.clone());
            document
        };
        debug!("Stored document {} in {}", document.id, path);
        self.publish(path, document.id);
        Ok(document)
    }

    async fn get_document(&self, path: &CollectionPath, id: Uuid) -> PortResult<Document> {
        let inner = self.inner.read().await;
        inner
            .collections
            .get(&path.to_string())
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found in {}", id, path)))
    }

    async fn query(&self, query: &CollectionQuery) -> PortResult<Vec<Document>> {
        let inner = self.inner.read().await;
        let mut docs: Vec<Document> = inner
            .collections
            .get(&query.path.to_string())
            .map(|docs| {
                docs.iter()
                    .filter(|d| query.filters.iter().all(|f| matches_filter(d, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_optional(&a.value(&order.field), &b.value(&order.field));
                match order.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn update_fields(
        &self,
        path: &CollectionPath,
        id: Uuid,
        patch: Fields,
    ) -> PortResult<Document> {
        ensure_patch_allowed(&patch)?;
        let updated = {
            let mut inner = self.inner.write().await;
            let document = inner
                .collections
                .get_mut(&path.to_string())
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| {
                    PortError::NotFound(format!("Document {} not found in {}", id, path))
                })?;
            document.fields.extend(patch);
            document.clone()
        };
        self.publish(path, id);
        Ok(updated)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

//=========================================================================================
// Value Comparison
//=========================================================================================

fn matches_filter(document: &Document, filter: &FieldFilter) -> bool {
    let Some(value) = document.value(&filter.field) else {
        return false;
    };
    let ordering = match &filter.value {
        FilterValue::Timestamp(expected) => as_timestamp(&value).map(|actual| actual.cmp(expected)),
        FilterValue::Number(expected) => value
            .as_f64()
            .and_then(|actual| actual.partial_cmp(expected)),
        FilterValue::Text(expected) => value.as_str().map(|actual| actual.cmp(expected.as_str())),
        FilterValue::Bool(expected) => value.as_bool().map(|actual| actual.cmp(expected)),
    };
    match (ordering, filter.op) {
        (None, _) => false,
        (Some(ord), FilterOp::Eq) => ord == Ordering::Equal,
        (Some(ord), FilterOp::Lt) => ord == Ordering::Less,
        (Some(ord), FilterOp::Lte) => ord != Ordering::Greater,
        (Some(ord), FilterOp::Gt) => ord == Ordering::Greater,
        (Some(ord), FilterOp::Gte) => ord != Ordering::Less,
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Missing values sort before present ones, as in most document stores.
fn compare_optional(a: &Option<Value>, b: &Option<Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => match (as_timestamp(a), as_timestamp(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Collection, UserId};
    use crate::ports::OrderBy;
    use serde_json::json;

    fn path() -> CollectionPath {
        CollectionPath::new(&UserId::parse("u1").unwrap(), Collection::ExpenseManagements)
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn add_document_injects_owner_id_and_monotonic_timestamps() {
        let store = MemoryStore::new();
        let first = store
            .add_document(&path(), fields(json!({"amount": 1})))
            .await
            .unwrap();
        let second = store
            .add_document(&path(), fields(json!({"amount": 2})))
            .await
            .unwrap();
        assert_eq!(first.user_id.as_str(), "u1");
        assert_ne!(first.id, second.id);
        assert!(second.created_at > first.created_at);
    }

    #[tokio::test]
    async fn store_owned_keys_cannot_be_written() {
        let store = MemoryStore::new();
        let err = store
            .add_document(&path(), fields(json!({"createdAt": "2000-01-01T00:00:00Z"})))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }

    #[tokio::test]
    async fn query_filters_orders_and_limits() {
        let store = MemoryStore::new();
        for amount in [5, 1, 9, 3] {
            store
                .add_document(&path(), fields(json!({"amount": amount})))
                .await
                .unwrap();
        }
        let docs = store
            .query(
                &CollectionQuery::new(path())
                    .filter(FieldFilter::new("amount", FilterOp::Gte, FilterValue::Number(3.0)))
                    .order_by(OrderBy::desc("amount"))
                    .limit(2),
            )
            .await
            .unwrap();
        let amounts: Vec<f64> = docs.iter().filter_map(|d| d.f64_field("amount")).collect();
        assert_eq!(amounts, vec![9.0, 5.0]);
    }

    #[tokio::test]
    async fn timestamp_filters_compare_chronologically() {
        let store = MemoryStore::new();
        for start in ["2024-07-22T09:00:00Z", "2024-07-29T09:00:00Z"] {
            store
                .add_document(&path(), fields(json!({"startTime": start})))
                .await
                .unwrap();
        }
        let bound = DateTime::parse_from_rfc3339("2024-07-29T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let docs = store
            .query(&CollectionQuery::new(path()).filter(FieldFilter::new(
                "startTime",
                FilterOp::Lt,
                FilterValue::Timestamp(bound),
            )))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].str_field("startTime"), Some("2024-07-22T09:00:00Z"));
    }

    #[tokio::test]
    async fn collections_are_isolated_per_user() {
        let store = MemoryStore::new();
        store
            .add_document(&path(), fields(json!({"amount": 1})))
            .await
            .unwrap();
        let other = CollectionPath::new(
            &UserId::parse("u2").unwrap(),
            Collection::ExpenseManagements,
        );
        assert!(store.query(&CollectionQuery::new(other)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_fields_merges_and_notifies() {
        let store = MemoryStore::new();
        let doc = store
            .add_document(&path(), fields(json!({"completed": false, "title": "t"})))
            .await
            .unwrap();
        let mut changes = store.changes();
        let updated = store
            .update_fields(&path(), doc.id, fields(json!({"completed": true})))
            .await
            .unwrap();
        assert_eq!(updated.fields["completed"], json!(true));
        assert_eq!(updated.fields["title"], json!("t"));
        assert_eq!(updated.created_at, doc.created_at);
        let event = changes.recv().await.unwrap();
        assert_eq!(event.document_id, doc.id);
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let store = MemoryStore::new();
        let err = store.get_document(&path(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
