//! crates/life_engine_core/src/form.rs
//!
//! The creation form: validates input against a record schema and appends
//! exactly one document. The dialog keeps what the user typed until the
//! write is confirmed.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{CollectionPath, Document, Fields};
use crate::ports::{DocumentStore, PortError, PortResult};
use crate::schema::{FieldErrors, RecordSchema, ValidationContext};

/// Validates `input` and stores the resulting record under `path`.
///
/// Only the schema's fields are written; the store adds `id`, `userId` and
/// `createdAt`.
pub async fn create_record(
    store: &dyn DocumentStore,
    path: &CollectionPath,
    schema: &RecordSchema,
    input: &Fields,
    ctx: &ValidationContext,
) -> PortResult<Document> {
    let fields = schema.validate(input, ctx).map_err(PortError::Validation)?;
    let document = store.add_document(path, fields).await?;
    info!("{} {} created in {}", schema.noun, document.id, path);
    Ok(document)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient message for the user, shown after a submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: Option<String>,
}

impl Notification {
    pub fn created(noun: &str) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: format!("{} logged!", noun),
            description: None,
        }
    }

    pub fn write_failed(noun: &str) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: "Error".to_string(),
            description: Some(format!(
                "Could not save the {}. Please try again.",
                noun.to_lowercase()
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was written.
    Invalid(FieldErrors),
    /// The write failed; input is kept for a retry.
    Failed(Notification),
    Created {
        document: Document,
        notification: Notification,
    },
}

/// Dialog state for one schema.
#[derive(Debug)]
pub struct CreationForm {
    schema: &'static RecordSchema,
    ctx: ValidationContext,
    values: Fields,
    errors: FieldErrors,
    open: bool,
    submitting: bool,
}

impl CreationForm {
    pub fn new(schema: &'static RecordSchema, ctx: ValidationContext) -> Self {
        Self {
            schema,
            ctx,
            values: Fields::new(),
            errors: FieldErrors::new(),
            open: false,
            submitting: false,
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.errors.remove(field);
        self.values.insert(field.to_string(), value);
    }

    pub fn values(&self) -> &Fields {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub async fn submit(
        &mut self,
        store: &dyn DocumentStore,
        path: &CollectionPath,
    ) -> SubmitOutcome {
        self.submitting = true;
        let result = create_record(store, path, self.schema, &self.values, &self.ctx).await;
        self.submitting = false;

        match result {
            Ok(document) => {
                self.values.clear();
                self.errors = FieldErrors::new();
                self.open = false;
                SubmitOutcome::Created {
                    document,
                    notification: Notification::created(self.schema.noun),
                }
            }
            Err(PortError::Validation(errors)) => {
                self.errors = errors.clone();
                SubmitOutcome::Invalid(errors)
            }
            Err(e) => {
                warn!("Failed to create {} in {}: {}", self.schema.noun, path, e);
                SubmitOutcome::Failed(Notification::write_failed(self.schema.noun))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Collection, UserId};
    use crate::memory::MemoryStore;
    use crate::ports::{ChangeEvent, CollectionQuery};
    use crate::schema;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::broadcast;
    use uuid::Uuid;

    fn expenses() -> CollectionPath {
        CollectionPath::new(&UserId::parse("u1").unwrap(), Collection::ExpenseManagements)
    }

    #[tokio::test]
    async fn valid_submission_stores_schema_fields_only() {
        let store = MemoryStore::new();
        let mut form = CreationForm::new(&schema::EXPENSE, ValidationContext::default());
        form.open();
        form.set("category", json!("Education"));
        form.set("description", json!("Course subscription"));
        form.set("amount", json!("49.99"));
        form.set("createdAt", json!("1999-01-01T00:00:00Z"));
        form.set("bogus", json!(true));

        let SubmitOutcome::Created {
            document,
            notification,
        } = form.submit(&store, &expenses()).await
        else {
            panic!("expected a created record");
        };
        assert_eq!(notification.title, "Expense logged!");
        assert!(!form.is_open());
        assert!(form.values().is_empty());

        let mut keys: Vec<&str> = document.fields.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["amount", "category", "description"]);
        assert_eq!(document.fields["amount"], json!(49.99));
        assert_eq!(document.user_id.as_str(), "u1");
        assert_ne!(document.created_at.to_rfc3339(), "1999-01-01T00:00:00+00:00");

        let stored = store.query(&CollectionQuery::new(expenses())).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn invalid_submission_blocks_the_write() {
        let store = MemoryStore::new();
        let mut form = CreationForm::new(&schema::EXPENSE, ValidationContext::default());
        form.open();
        form.set("amount", json!(-3));

        let SubmitOutcome::Invalid(errors) = form.submit(&store, &expenses()).await else {
            panic!("expected validation errors");
        };
        assert!(errors.get("category").is_some());
        assert!(errors.get("amount").is_some());
        assert!(form.is_open());
        assert_eq!(form.values()["amount"], json!(-3));
        assert!(store.query(&CollectionQuery::new(expenses())).await.unwrap().is_empty());

        form.set("amount", json!(3));
        assert!(form.errors().get("amount").is_none());
    }

    struct ReadOnlyStore {
        changes: broadcast::Sender<ChangeEvent>,
    }

    #[async_trait]
    impl DocumentStore for ReadOnlyStore {
        async fn add_document(&self, _: &CollectionPath, _: Fields) -> PortResult<Document> {
            Err(PortError::Unexpected("write rejected".into()))
        }
        async fn get_document(&self, _: &CollectionPath, _: Uuid) -> PortResult<Document> {
            Err(PortError::NotFound("none".into()))
        }
        async fn query(&self, _: &CollectionQuery) -> PortResult<Vec<Document>> {
            Ok(Vec::new())
        }
        async fn update_fields(
            &self,
            _: &CollectionPath,
            _: Uuid,
            _: Fields,
        ) -> PortResult<Document> {
            Err(PortError::Unexpected("write rejected".into()))
        }
        fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
            self.changes.subscribe()
        }
    }

    #[tokio::test]
    async fn write_failure_keeps_values_for_retry() {
        let (changes, _) = broadcast::channel(1);
        let store = ReadOnlyStore { changes };
        let mut form = CreationForm::new(&schema::EXPENSE, ValidationContext::default());
        form.open();
        form.set("category", json!("Food"));
        form.set("description", json!("Lunch"));
        form.set("amount", json!(12));

        let SubmitOutcome::Failed(notification) = form.submit(&store, &expenses()).await else {
            panic!("expected a failed write");
        };
        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(form.is_open());
        assert_eq!(form.values()["description"], json!("Lunch"));
        assert!(!form.is_submitting());
    }
}
