//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Every subscription owns one `CollectionBinding` inside a forwarding task;
//! ending the task drops the binding, which releases its listener.

use crate::web::{
    protocol::{subscription_request, ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use life_engine_core::binding::CollectionBinding;
use life_engine_core::domain::UserContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, ctx))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, ctx: UserContext) {
    info!("New WebSocket connection established for user: {}", ctx.user_id);

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));
    let mut subscriptions: HashMap<String, JoinHandle<()>> = HashMap::new();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_text_message(text.as_str(), &app_state, &ctx, &ws_sender, &mut subscriptions)
                    .await;
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive failed: {}", e);
                break;
            }
        }
    }

    // --- Cleanup ---
    for (_, handle) in subscriptions.drain() {
        handle.abort();
    }
    info!("WebSocket connection closed for user: {}", ctx.user_id);
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    ctx: &UserContext,
    ws_sender: &WsSender,
    subscriptions: &mut HashMap<String, JoinHandle<()>>,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe {
            subscription_id,
            collection,
            filters,
            order_by,
            direction,
            limit,
        }) => {
            info!("Subscribing {} to {}", subscription_id, collection);
            let request = subscription_request(collection, filters, order_by, direction, limit);
            let binding = CollectionBinding::open(app_state.store.clone(), Some(ctx), &request);
            let task = tokio::spawn(forward_snapshots(
                subscription_id.clone(),
                binding,
                ws_sender.clone(),
            ));
            if let Some(previous) = subscriptions.insert(subscription_id, task) {
                previous.abort();
            }
        }
        Ok(ClientMessage::Unsubscribe { subscription_id }) => {
            if let Some(handle) = subscriptions.remove(&subscription_id) {
                info!("Unsubscribed {}", subscription_id);
                handle.abort();
            }
        }
        Err(e) => {
            warn!("Failed to parse client message: {}", e);
            let reply = ServerMessage::Error {
                message: format!("Unrecognised message: {}", e),
            };
            send_message(ws_sender, &reply).await;
        }
    }
}

/// Sends the current snapshot, then every later one, until the binding ends
/// or the client goes away.
async fn forward_snapshots(
    subscription_id: String,
    mut binding: CollectionBinding,
    ws_sender: WsSender,
) {
    loop {
        let message = ServerMessage::snapshot(&subscription_id, binding.snapshot());
        if !send_message(&ws_sender, &message).await {
            break;
        }
        if !binding.changed().await {
            break;
        }
    }
    debug!("Subscription {} finished", subscription_id);
}

/// Returns `false` once the socket can no longer be written to.
async fn send_message(ws_sender: &WsSender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .is_ok()
}
