use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coda::game::GameRegistry;
use coda::room::InMemoryRoomRepository;
use coda::shared::AppState;
use coda::user::InMemoryUserRegistry;
use coda::websockets::{
    websocket_handler, InMemoryRoomBroadcaster, MessageRouter, RoomBroadcaster,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coda=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tile game server");

    // Wire up shared application state with dependency injection
    let users = Arc::new(InMemoryUserRegistry::new());
    let rooms = Arc::new(InMemoryRoomRepository::new());
    let games = Arc::new(GameRegistry::new());
    let broadcaster: Arc<dyn RoomBroadcaster> = Arc::new(InMemoryRoomBroadcaster::new());

    let router = Arc::new(MessageRouter::new(users, rooms, games, broadcaster.clone()));
    let app_state = AppState::new(router, broadcaster);

    let app = Router::new()
        .route("/", get(|| async { "OK" }))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await.unwrap();
}
