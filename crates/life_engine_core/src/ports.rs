//! crates/life_engine_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete document store and the hosted AI model.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{CollectionPath, Document, Fields};
use crate::flows::{CrossDomainInsights, InsightScores, ProgressionRequest, ProgressionSuggestion};
use crate::schema::FieldErrors;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Query Description
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Desc,
        }
    }

    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// The typed right-hand side of a filter. Timestamps compare chronologically
/// against RFC 3339 string fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    Timestamp(DateTime<Utc>),
    Number(f64),
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FieldFilter {
    pub fn new(field: &str, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.to_string(),
            op,
            value,
        }
    }
}

/// A filtered, ordered query against exactly one collection path.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
    pub path: CollectionPath,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl CollectionQuery {
    pub fn new(path: CollectionPath) -> Self {
        Self {
            path,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Published by a store after every successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub path: CollectionPath,
    pub document_id: Uuid,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Appends a document. The store assigns `id` and `createdAt` and injects
    /// `userId` from the path owner.
    async fn add_document(&self, path: &CollectionPath, fields: Fields) -> PortResult<Document>;

    async fn get_document(&self, path: &CollectionPath, id: Uuid) -> PortResult<Document>;

    async fn query(&self, query: &CollectionQuery) -> PortResult<Vec<Document>>;

    /// Merges `patch` into an existing document's fields. Store-owned keys are
    /// rejected.
    async fn update_fields(
        &self,
        path: &CollectionPath,
        id: Uuid,
        patch: Fields,
    ) -> PortResult<Document>;

    /// A feed of write notifications for live bindings.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

#[async_trait]
pub trait AdaptiveProgressionService: Send + Sync {
    /// Suggests the next challenge level from a performance summary.
    async fn suggest_next_level(
        &self,
        request: &ProgressionRequest,
    ) -> PortResult<ProgressionSuggestion>;
}

#[async_trait]
pub trait CrossDomainInsightsService: Send + Sync {
    /// Correlates averaged domain scores into insights and recommendations.
    async fn analyze(&self, scores: &InsightScores) -> PortResult<CrossDomainInsights>;
}

/// Rejects patches that try to overwrite store-owned keys.
pub fn ensure_patch_allowed(patch: &Fields) -> PortResult<()> {
    if let Some(key) = crate::domain::RESERVED_KEYS
        .iter()
        .find(|key| patch.contains_key(**key))
    {
        return Err(PortError::Unexpected(format!(
            "Field '{}' is owned by the store and cannot be updated",
            key
        )));
    }
    Ok(())
}

