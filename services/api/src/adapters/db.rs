//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DocumentStore` port from the `core` crate. Every collection lives in one
//! `documents` table keyed by its collection path, with the domain fields kept as
//! JSONB.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use life_engine_core::domain::{CollectionPath, Document, Fields, UserId};
use life_engine_core::ports::{
    ensure_patch_allowed, ChangeEvent, CollectionQuery, DocumentStore, FieldFilter, FilterOp,
    FilterValue, PortError, PortResult, SortDirection,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

const CHANGE_FEED_CAPACITY: usize = 256;
const RETURNING: &str = " RETURNING id, user_id, created_at, fields";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` port.
///
/// Change notifications cover writes made through this adapter, which is every
/// write when one service process owns the database.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { pool, changes }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn publish(&self, path: &CollectionPath, document_id: Uuid) {
        let _ = self.changes.send(ChangeEvent {
            path: path.clone(),
            document_id,
        });
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    user_id: String,
    created_at: DateTime<Utc>,
    fields: Json<Fields>,
}

impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        Ok(Document {
            id: self.id,
            user_id: UserId::parse(&self.user_id)?,
            created_at: self.created_at,
            fields: self.fields.0,
        })
    }
}

fn db_error(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// Query Building
//=========================================================================================

fn sql_operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => " = ",
        FilterOp::Lt => " < ",
        FilterOp::Lte => " <= ",
        FilterOp::Gt => " > ",
        FilterOp::Gte => " >= ",
    }
}

/// Pushes the SQL expression that reads `field` with the given cast. The
/// store-owned keys map onto their columns.
fn push_field(builder: &mut QueryBuilder<'_, Postgres>, field: &str, cast: &str) {
    match field {
        "id" => {
            builder.push("id::text");
        }
        "userId" => {
            builder.push("user_id");
        }
        "createdAt" => {
            builder.push("created_at");
        }
        _ => {
            builder.push("(fields->>");
            builder.push_bind(field.to_string());
            builder.push(")");
            builder.push(cast);
        }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &FieldFilter) {
    builder.push(" AND ");
    match &filter.value {
        FilterValue::Timestamp(at) => {
            push_field(builder, &filter.field, "::timestamptz");
            builder.push(sql_operator(filter.op));
            builder.push_bind(*at);
        }
        FilterValue::Number(n) => {
            push_field(builder, &filter.field, "::float8");
            builder.push(sql_operator(filter.op));
            builder.push_bind(*n);
        }
        FilterValue::Text(text) => {
            push_field(builder, &filter.field, "");
            builder.push(sql_operator(filter.op));
            builder.push_bind(text.clone());
        }
        FilterValue::Bool(flag) => {
            push_field(builder, &filter.field, "::boolean");
            builder.push(sql_operator(filter.op));
            builder.push_bind(*flag);
        }
    }
}

fn build_select(query: &CollectionQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT id, user_id, created_at, fields FROM documents WHERE collection_path = ",
    );
    builder.push_bind(query.path.to_string());
    for filter in &query.filters {
        push_filter(&mut builder, filter);
    }

    if let Some(order) = &query.order_by {
        builder.push(" ORDER BY ");
        match order.field.as_str() {
            "id" | "userId" | "createdAt" => push_field(&mut builder, &order.field, ""),
            field => {
                builder.push("fields->");
                builder.push_bind(field.to_string());
            }
        }
        // Missing values rank lowest, as in the in-memory store.
        builder.push(match order.direction {
            SortDirection::Asc => " ASC NULLS FIRST",
            SortDirection::Desc => " DESC NULLS LAST",
        });
    } else {
        builder.push(" ORDER BY created_at ASC");
    }

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit as i64);
    }
    builder
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn add_document(&self, path: &CollectionPath, fields: Fields) -> PortResult<Document> {
        ensure_patch_allowed(&fields)?;
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO documents (id, collection_path, user_id, fields) VALUES (",
        );
        let mut values = builder.separated(", ");
        values.push_bind(Uuid::new_v4());
        values.push_bind(path.to_string());
        values.push_bind(path.user_id().to_string());
        values.push_bind(Json(fields));
        builder.push(")");
        builder.push(RETURNING);

        let document = builder
            .build_query_as::<DocumentRecord>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?
            .to_domain()?;
        debug!("Stored document {} in {}", document.id, path);
        self.publish(path, document.id);
        Ok(document)
    }

    async fn get_document(&self, path: &CollectionPath, id: Uuid) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, user_id, created_at, fields FROM documents \
             WHERE collection_path = $1 AND id = $2",
        )
        .bind(path.to_string())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| PortError::NotFound(format!("Document {} not found in {}", id, path)))?;
        record.to_domain()
    }

    async fn query(&self, query: &CollectionQuery) -> PortResult<Vec<Document>> {
        let records = build_select(query)
            .build_query_as::<DocumentRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        records.into_iter().map(DocumentRecord::to_domain).collect()
    }

    async fn update_fields(
        &self,
        path: &CollectionPath,
        id: Uuid,
        patch: Fields,
    ) -> PortResult<Document> {
        ensure_patch_allowed(&patch)?;
        let record = sqlx::query_as::<_, DocumentRecord>(
            "UPDATE documents SET fields = fields || $1 WHERE collection_path = $2 AND id = $3 \
             RETURNING id, user_id, created_at, fields",
        )
        .bind(Json(patch))
        .bind(path.to_string())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| PortError::NotFound(format!("Document {} not found in {}", id, path)))?;

        let document = record.to_domain()?;
        debug!("Updated document {} in {}", document.id, path);
        self.publish(path, document.id);
        Ok(document)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use life_engine_core::domain::Collection;
    use life_engine_core::ports::OrderBy;

    #[test]
    fn select_binds_field_names_instead_of_splicing_them() {
        let user = UserId::parse("u1").unwrap();
        let query = CollectionQuery::new(CollectionPath::new(&user, Collection::TimeBlocks))
            .filter(FieldFilter::new(
                "startTime",
                FilterOp::Gte,
                FilterValue::Timestamp(Utc::now()),
            ))
            .order_by(OrderBy::asc("startTime"))
            .limit(5);

        let builder = build_select(&query);
        assert_eq!(
            builder.sql(),
            "SELECT id, user_id, created_at, fields FROM documents WHERE collection_path = $1 \
             AND (fields->>$2)::timestamptz >= $3 ORDER BY fields->$4 ASC NULLS FIRST LIMIT $5"
        );
    }

    #[test]
    fn store_owned_keys_read_their_columns() {
        let user = UserId::parse("u1").unwrap();
        let query = CollectionQuery::new(CollectionPath::new(&user, Collection::Projects))
            .order_by(OrderBy::desc("createdAt"));
        let builder = build_select(&query);
        assert!(builder.sql().ends_with("ORDER BY created_at DESC NULLS LAST"));
    }
}
