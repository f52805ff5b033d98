use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use coda::game::GameRegistry;
use coda::room::InMemoryRoomRepository;
use coda::user::InMemoryUserRegistry;
use coda::websockets::{
    InMemoryRoomBroadcaster, MessageHandler, MessageRouter, MessageType, RoomBroadcaster,
    ServerMessage,
};

/// A router wired to in-memory stores, with clients simulated as plain
/// channels in place of real sockets.
pub struct TestServer {
    pub router: Arc<MessageRouter>,
    pub broadcaster: Arc<dyn RoomBroadcaster>,
}

impl TestServer {
    pub fn new() -> Self {
        let users = Arc::new(InMemoryUserRegistry::new());
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let games = Arc::new(GameRegistry::new());
        let broadcaster: Arc<dyn RoomBroadcaster> = Arc::new(InMemoryRoomBroadcaster::new());

        let router = Arc::new(MessageRouter::new(
            users,
            rooms,
            games,
            broadcaster.clone(),
        ));

        Self {
            router,
            broadcaster,
        }
    }

    /// Simulates an accepted connection and returns its client handle.
    pub async fn connect(&self, conn_id: &str) -> TestClient {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.broadcaster.add_connection(conn_id, sender).await;
        self.router.connect(conn_id).await;

        TestClient {
            conn_id: conn_id.to_string(),
            receiver,
        }
    }

    pub async fn send(&self, client: &TestClient, request: Value) {
        self.router
            .handle_message(&client.conn_id, request.to_string())
            .await;
    }

    pub async fn disconnect(&self, client: &TestClient) {
        self.router.handle_disconnect(&client.conn_id).await;
    }
}

pub struct TestClient {
    pub conn_id: String,
    receiver: mpsc::UnboundedReceiver<String>,
}

impl TestClient {
    /// Pulls every message queued for this client since the last drain.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(text) = self.receiver.try_recv() {
            messages.push(serde_json::from_str(&text).expect("valid outbound envelope"));
        }
        messages
    }

    pub fn clear(&mut self) {
        while self.receiver.try_recv().is_ok() {}
    }

    /// Drains and returns the first message of the given type, panicking
    /// with the full backlog if none arrived.
    pub fn expect_message(&mut self, message_type: MessageType) -> ServerMessage {
        let messages = self.drain();
        messages
            .iter()
            .find(|m| m.message_type == message_type)
            .cloned()
            .unwrap_or_else(|| {
                panic!(
                    "expected {:?} but received {:?}",
                    message_type,
                    messages.iter().map(|m| m.message_type).collect::<Vec<_>>()
                )
            })
    }
}

/// Registers a user over the wire and returns the issued user id.
pub async fn register_user(server: &TestServer, client: &mut TestClient, name: &str) -> String {
    server
        .send(client, json!({"type": "registerUser", "name": name}))
        .await;
    let reply = client.expect_message(MessageType::Registered);
    assert_eq!(reply.data["success"], true);
    reply.data["userId"]
        .as_str()
        .expect("userId in register reply")
        .to_string()
}

/// Creates a room owned by `user_id` and returns the room id.
pub async fn create_room(
    server: &TestServer,
    client: &mut TestClient,
    user_id: &str,
    room_name: &str,
) -> String {
    server
        .send(
            client,
            json!({"type": "createRoom", "userId": user_id, "roomName": room_name}),
        )
        .await;
    let reply = client.expect_message(MessageType::RoomInfo);
    assert_eq!(reply.data["success"], true);
    reply.data["room"]["roomId"]
        .as_str()
        .expect("roomId in create reply")
        .to_string()
}

pub async fn enter_room(
    server: &TestServer,
    client: &mut TestClient,
    user_id: &str,
    room_id: &str,
) {
    server
        .send(
            client,
            json!({"type": "enterRoom", "userId": user_id, "roomId": room_id}),
        )
        .await;
    let reply = client.expect_message(MessageType::RoomInfo);
    assert_eq!(reply.data["success"], true);
}

/// Fetches the viewer-projected game state for `user_id` through their own
/// connection.
pub async fn fetch_game_state(
    server: &TestServer,
    client: &mut TestClient,
    user_id: &str,
    room_id: &str,
) -> Value {
    server
        .send(
            client,
            json!({"type": "getGameState", "roomId": room_id, "userId": user_id}),
        )
        .await;
    let reply = client.expect_message(MessageType::GameState);
    assert_eq!(reply.data["success"], true);
    reply.data["state"].clone()
}

/// A registered player and their connection, bundled for game tests.
pub struct TestPlayer {
    pub user_id: String,
    pub client: TestClient,
}

/// Registers `names`, has the first create a room and the rest join it,
/// then starts the game. Returns the room id and the players in turn order.
pub async fn start_game(server: &TestServer, names: &[&str]) -> (String, Vec<TestPlayer>) {
    let mut players = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let mut client = server.connect(&format!("conn-{}", i)).await;
        let user_id = register_user(server, &mut client, name).await;
        players.push(TestPlayer { user_id, client });
    }

    let owner_id = players[0].user_id.clone();
    let room_id = create_room(server, &mut players[0].client, &owner_id, "table").await;
    for player in players.iter_mut().skip(1) {
        let user_id = player.user_id.clone();
        enter_room(server, &mut player.client, &user_id, &room_id).await;
    }

    for player in &mut players {
        player.client.clear();
    }

    server
        .send(&players[0].client, json!({"type": "startGame", "roomId": room_id}))
        .await;
    let reply = players[0].client.expect_message(MessageType::StartResult);
    assert_eq!(reply.data["success"], true);

    (room_id, players)
}

/// Reads the true number of `owner_id`'s tile at `index` out of their own
/// projection (the owner always sees their own numbers).
pub fn own_tile_number(state: &Value, owner_id: &str, index: usize) -> u8 {
    state["players"][owner_id]["tiles"][index]["number"]
        .as_i64()
        .expect("tile number") as u8
}
