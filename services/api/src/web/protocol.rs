//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol for live collection bindings. A
//! client opens any number of subscriptions over one socket; each one streams
//! binding snapshots until it is unsubscribed or the socket closes.

use life_engine_core::binding::{BindingRequest, BindingSnapshot};
use life_engine_core::domain::{Collection, Document};
use life_engine_core::ports::{FieldFilter, OrderBy, SortDirection};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens a binding. Reusing an id replaces the earlier binding.
    Subscribe {
        subscription_id: String,
        collection: Collection,
        /// Every filter must match.
        #[serde(default)]
        filters: Vec<FieldFilter>,
        #[serde(default)]
        order_by: Option<String>,
        #[serde(default)]
        direction: Option<SortDirection>,
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Releases a binding. Unknown ids are ignored.
    Unsubscribe { subscription_id: String },
}

/// Builds the binding request a `Subscribe` describes. Ordering defaults to
/// newest first.
pub fn subscription_request(
    collection: Collection,
    filters: Vec<FieldFilter>,
    order_by: Option<String>,
    direction: Option<SortDirection>,
    limit: Option<usize>,
) -> BindingRequest {
    let field = order_by.unwrap_or_else(|| "createdAt".to_string());
    let order = match direction.unwrap_or(SortDirection::Desc) {
        SortDirection::Asc => OrderBy::asc(&field),
        SortDirection::Desc => OrderBy::desc(&field),
    };
    let request = filters
        .into_iter()
        .fold(BindingRequest::new(collection), BindingRequest::filter)
        .order_by(order);
    match limit {
        Some(limit) => request.limit(limit),
        None => request,
    }
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The latest state of one subscription.
    Snapshot {
        subscription_id: String,
        data: Option<Vec<Document>>,
        loading: bool,
        error: Option<String>,
    },

    /// Reports a message the server could not act on.
    Error { message: String },
}

impl ServerMessage {
    pub fn snapshot(subscription_id: &str, snapshot: BindingSnapshot) -> Self {
        ServerMessage::Snapshot {
            subscription_id: subscription_id.to_string(),
            data: snapshot.data,
            loading: snapshot.loading,
            error: snapshot.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use life_engine_core::ports::{FilterOp, FilterValue};
    use serde_json::json;

    #[test]
    fn subscribe_parses_with_optional_ordering() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "subscribe",
            "subscription_id": "sleep",
            "collection": "sleepOptimizations",
            "direction": "asc"
        }))
        .unwrap();
        let ClientMessage::Subscribe {
            subscription_id,
            collection,
            filters,
            order_by,
            direction,
            limit,
        } = msg
        else {
            panic!("expected a subscribe message");
        };
        assert_eq!(subscription_id, "sleep");
        assert_eq!(collection, Collection::SleepOptimizations);

        let request = subscription_request(collection, filters, order_by, direction, limit);
        assert!(request.filters.is_empty());
        assert_eq!(request.order_by, Some(OrderBy::asc("createdAt")));
        assert_eq!(request.limit, None);
    }

    #[test]
    fn subscribe_carries_field_filters() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "subscribe",
            "subscription_id": "week",
            "collection": "timeBlocks",
            "filters": [
                {
                    "field": "startTime",
                    "op": "gte",
                    "value": {"type": "timestamp", "value": "2024-07-22T00:00:00Z"}
                },
                {"field": "completed", "op": "eq", "value": {"type": "bool", "value": false}}
            ],
            "order_by": "startTime"
        }))
        .unwrap();
        let ClientMessage::Subscribe {
            collection,
            filters,
            order_by,
            direction,
            limit,
            ..
        } = msg
        else {
            panic!("expected a subscribe message");
        };

        let request = subscription_request(collection, filters, order_by, direction, limit);
        assert_eq!(request.filters.len(), 2);
        assert_eq!(request.filters[0].field, "startTime");
        assert_eq!(request.filters[0].op, FilterOp::Gte);
        assert_eq!(request.filters[1].value, FilterValue::Bool(false));
        assert_eq!(request.order_by, Some(OrderBy::desc("startTime")));
    }

    #[test]
    fn unknown_collections_are_rejected() {
        let parsed = serde_json::from_value::<ClientMessage>(json!({
            "type": "subscribe",
            "subscription_id": "x",
            "collection": "recipes"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn snapshots_serialize_with_their_subscription() {
        let msg = ServerMessage::Snapshot {
            subscription_id: "tasks".into(),
            data: None,
            loading: true,
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "snapshot",
                "subscription_id": "tasks",
                "data": null,
                "loading": true,
                "error": null
            })
        );
    }
}
