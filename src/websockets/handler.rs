use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::shared::AppState;

use super::socket::{Connection, MessageHandler};

/// WebSocket endpoint: GET /ws
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, app_state))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(socket: axum::extract::ws::WebSocket, app_state: AppState) {
    let conn_id = Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "WebSocket connection established");

    // Create the outbound channel (app -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    app_state
        .broadcaster
        .add_connection(&conn_id, outbound_sender)
        .await;
    app_state.router.connect(&conn_id).await;

    let message_handler: Arc<dyn MessageHandler> = app_state.router.clone();
    let connection = Connection::new(
        conn_id.clone(),
        Box::new(socket),
        outbound_receiver,
        message_handler,
    );

    // Run the connection until disconnect
    match connection.run().await {
        Ok(()) => {
            info!(conn_id = %conn_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            warn!(conn_id = %conn_id, error = ?e, "WebSocket connection error");
        }
    }

    // Cleanup: session state, room membership, broadcaster registration
    app_state.router.handle_disconnect(&conn_id).await;
    info!(conn_id = %conn_id, "WebSocket connection cleaned up");
}
