//! Store doubles shared by the unit tests.

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{CollectionPath, Document, Fields};
use crate::ports::{ChangeEvent, CollectionQuery, DocumentStore, PortError, PortResult};

/// A store whose every call fails with `offline`.
pub struct FailingStore {
    changes: broadcast::Sender<ChangeEvent>,
}

impl FailingStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(4);
        Self { changes }
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn add_document(&self, _: &CollectionPath, _: Fields) -> PortResult<Document> {
        Err(PortError::Unexpected("offline".into()))
    }
    async fn get_document(&self, _: &CollectionPath, _: Uuid) -> PortResult<Document> {
        Err(PortError::Unexpected("offline".into()))
    }
    async fn query(&self, _: &CollectionQuery) -> PortResult<Vec<Document>> {
        Err(PortError::Unexpected("offline".into()))
    }
    async fn update_fields(
        &self,
        _: &CollectionPath,
        _: Uuid,
        _: Fields,
    ) -> PortResult<Document> {
        Err(PortError::Unexpected("offline".into()))
    }
    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
