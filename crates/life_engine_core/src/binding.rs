//! crates/life_engine_core/src/binding.rs
//!
//! Live, per-user collection subscriptions. A binding runs the query once,
//! then re-runs it whenever the store reports a write to the same path, and
//! publishes every result through a `watch` channel. Dropping the binding
//! cancels its background task.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{Collection, CollectionPath, Document, UserContext};
use crate::ports::{CollectionQuery, DocumentStore, FieldFilter, OrderBy};

/// What to bind to, before the owning user is known.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRequest {
    pub collection: Collection,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl BindingRequest {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
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

    /// Resolves the request against a user's namespace.
    pub fn resolve(&self, ctx: &UserContext) -> CollectionQuery {
        CollectionQuery {
            path: CollectionPath::new(&ctx.user_id, self.collection),
            filters: self.filters.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
        }
    }
}

/// The latest state of a binding. `data` is `None` until the first query
/// resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingSnapshot {
    pub data: Option<Vec<Document>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl BindingSnapshot {
    fn pending() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }

    fn inert() -> Self {
        Self {
            data: Some(Vec::new()),
            loading: false,
            error: None,
        }
    }

    /// The resolved records, or an empty slice while unresolved.
    pub fn records(&self) -> &[Document] {
        self.data.as_deref().unwrap_or(&[])
    }
}

pub struct CollectionBinding {
    rx: watch::Receiver<BindingSnapshot>,
    cancel: CancellationToken,
}

impl CollectionBinding {
    /// Binds to one of the user's top-level collections. Without a user the
    /// binding is inert: it never queries and reports an empty result.
    pub fn open(
        store: Arc<dyn DocumentStore>,
        ctx: Option<&UserContext>,
        request: &BindingRequest,
    ) -> Self {
        match ctx {
            Some(ctx) => Self::for_query(store, request.resolve(ctx)),
            None => Self::inert(),
        }
    }

    /// Binds to an already resolved query.
    pub fn for_query(store: Arc<dyn DocumentStore>, query: CollectionQuery) -> Self {
        let (tx, rx) = watch::channel(BindingSnapshot::pending());
        let cancel = CancellationToken::new();
        tokio::spawn(run_binding(store, query, tx, cancel.clone()));
        Self { rx, cancel }
    }

    pub fn inert() -> Self {
        let (_tx, rx) = watch::channel(BindingSnapshot::inert());
        Self {
            rx,
            cancel: CancellationToken::new(),
        }
    }

    pub fn snapshot(&self) -> BindingSnapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next published snapshot. Returns `false` once the
    /// binding can no longer change.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Waits until the binding is no longer loading and returns that state.
    pub async fn settled(&mut self) -> BindingSnapshot {
        let settled = match self.rx.wait_for(|snapshot| !snapshot.loading).await {
            Ok(snapshot) => Some(snapshot.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.snapshot())
    }
}

impl Drop for CollectionBinding {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_binding(
    store: Arc<dyn DocumentStore>,
    query: CollectionQuery,
    tx: watch::Sender<BindingSnapshot>,
    cancel: CancellationToken,
) {
    // Subscribe before the first read so no write between the two is missed.
    let mut changes = store.changes();
    debug!("Binding opened on {}", query.path);

    'refresh: loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break 'refresh,
            _ = tx.closed() => break 'refresh,
            result = store.query(&query) => result,
        };
        match result {
            Ok(docs) => {
                tx.send_replace(BindingSnapshot {
                    data: Some(docs),
                    loading: false,
                    error: None,
                });
            }
            Err(e) => {
                warn!("Query on {} failed: {}", query.path, e);
                tx.send_modify(|snapshot| {
                    snapshot.loading = false;
                    snapshot.error = Some(e.to_string());
                });
            }
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break 'refresh,
                _ = tx.closed() => break 'refresh,
                event = changes.recv() => match event {
                    Ok(event) if event.path == query.path => continue 'refresh,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(
                            "Binding on {} lagged by {} events, re-querying",
                            query.path, skipped
                        );
                        continue 'refresh;
                    }
                    Err(RecvError::Closed) => break 'refresh,
                },
            }
        }
    }

    debug!("Binding closed on {}", query.path);
}
