use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::game::{GameRegistry, GameSession, GameStatus};
use crate::room::{
    JoinRoomResult, LeaveRoomResult, RoomModel, RoomRepository, RoomStatus, DEFAULT_MAX_MEMBERS,
};
use crate::shared::AppError;
use crate::user::{User, UserRegistry};

use super::broadcaster::RoomBroadcaster;
use super::messages::{ClientRequest, RoomMember, RoomSummary, ServerMessage};
use super::socket::MessageHandler;

/// Transport-level view of one connection: which user registered on it and
/// which room it is currently in. Both start unset.
#[derive(Debug, Clone, Default)]
struct SessionState {
    user_id: Option<String>,
    room_id: Option<String>,
}

/// The boundary component: decodes inbound requests, dispatches each one to
/// exactly one handler, and emits the private reply and/or room broadcast
/// that handler's outcome calls for. Validation failures are reported only
/// to the requesting connection; nothing here is fatal to the connection or
/// the process.
pub struct MessageRouter {
    users: Arc<dyn UserRegistry>,
    rooms: Arc<dyn RoomRepository>,
    games: Arc<GameRegistry>,
    broadcaster: Arc<dyn RoomBroadcaster>,
    sessions: RwLock<HashMap<String, SessionState>>,
}

#[async_trait]
impl MessageHandler for MessageRouter {
    async fn handle_message(&self, conn_id: &str, message: String) {
        debug!(conn_id = %conn_id, message = %message, "Received message");

        let request = match serde_json::from_str::<ClientRequest>(&message) {
            Ok(request) => request,
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "Malformed request");
                let error = AppError::MalformedRequest(e.to_string());
                self.broadcaster
                    .send_to_connection(conn_id, &ServerMessage::error(&error.to_string()))
                    .await;
                return;
            }
        };

        let reply_type = request.reply_type();
        if let Err(error) = self.dispatch(conn_id, request).await {
            debug!(conn_id = %conn_id, error = %error, "Request failed");
            self.broadcaster
                .send_to_connection(
                    conn_id,
                    &ServerMessage::failure(reply_type, &error.to_string()),
                )
                .await;
        }
    }
}

impl MessageRouter {
    pub fn new(
        users: Arc<dyn UserRegistry>,
        rooms: Arc<dyn RoomRepository>,
        games: Arc<GameRegistry>,
        broadcaster: Arc<dyn RoomBroadcaster>,
    ) -> Self {
        Self {
            users,
            rooms,
            games,
            broadcaster,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a fresh session for a newly accepted connection.
    pub async fn connect(&self, conn_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(conn_id.to_string(), SessionState::default());
    }

    /// Tears down everything a lost connection held: the session, its spot
    /// in the room's fan-out set, and its room membership (which may delete
    /// the room under the owner/empty rules). An in-progress game keeps the
    /// player's state; their turn simply stays open.
    #[instrument(skip(self))]
    pub async fn handle_disconnect(&self, conn_id: &str) {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(conn_id)
        };

        if let Some(SessionState {
            user_id: Some(user_id),
            room_id: Some(room_id),
        }) = session
        {
            info!(
                conn_id = %conn_id,
                user_id = %user_id,
                room_id = %room_id,
                "Connection lost, removing user from room"
            );
            if let LeaveRoomResult::RoomDeleted = self.rooms.leave_room(&room_id, &user_id).await {
                self.teardown_room(&room_id).await;
            }
        }

        self.broadcaster.remove_connection(conn_id).await;
    }

    async fn dispatch(&self, conn_id: &str, request: ClientRequest) -> Result<(), AppError> {
        match request {
            ClientRequest::RegisterUser { name } => self.handle_register(conn_id, &name).await,
            ClientRequest::ListRooms => self.handle_list_rooms(conn_id).await,
            ClientRequest::CreateRoom {
                user_id,
                room_name,
                max_members,
            } => {
                self.handle_create_room(conn_id, &user_id, &room_name, max_members)
                    .await
            }
            ClientRequest::EnterRoom { user_id, room_id } => {
                self.handle_enter_room(conn_id, &user_id, &room_id).await
            }
            ClientRequest::LeaveRoom { user_id, room_id } => {
                self.handle_leave_room(conn_id, &user_id, &room_id).await
            }
            ClientRequest::SendChat {
                user_id,
                room_id,
                msg,
            } => self.handle_send_chat(conn_id, &user_id, &room_id, &msg).await,
            ClientRequest::StartGame { room_id } => self.handle_start_game(conn_id, &room_id).await,
            ClientRequest::DrawTile {
                room_id,
                user_id,
                from_revealed,
            } => {
                self.handle_draw_tile(conn_id, &room_id, &user_id, from_revealed)
                    .await
            }
            ClientRequest::Guess {
                room_id,
                user_id,
                target_user_id,
                tile_index,
                guessed_number,
            } => {
                self.handle_guess(
                    conn_id,
                    &room_id,
                    &user_id,
                    &target_user_id,
                    tile_index,
                    guessed_number,
                )
                .await
            }
            ClientRequest::EndTurn { room_id, user_id } => {
                self.handle_end_turn(conn_id, &room_id, &user_id).await
            }
            ClientRequest::GetGameState { room_id, user_id } => {
                self.handle_get_game_state(conn_id, &room_id, &user_id).await
            }
        }
    }

    async fn handle_register(&self, conn_id: &str, name: &str) -> Result<(), AppError> {
        let user = self.users.create(name).await;

        {
            let mut sessions = self.sessions.write().await;
            if let Some(session) = sessions.get_mut(conn_id) {
                session.user_id = Some(user.user_id.clone());
            }
        }
        self.broadcaster.bind_user(conn_id, &user.user_id).await;

        self.broadcaster
            .send_to_connection(conn_id, &ServerMessage::registered(&user))
            .await;
        Ok(())
    }

    async fn handle_list_rooms(&self, conn_id: &str) -> Result<(), AppError> {
        let rooms = self.room_summaries().await;
        self.broadcaster
            .send_to_connection(conn_id, &ServerMessage::room_list(rooms))
            .await;
        Ok(())
    }

    async fn handle_create_room(
        &self,
        conn_id: &str,
        user_id: &str,
        room_name: &str,
        max_members: usize,
    ) -> Result<(), AppError> {
        let user = self.users.get(user_id).await.ok_or(AppError::UserNotFound)?;
        if !(2..=DEFAULT_MAX_MEMBERS).contains(&max_members) {
            return Err(AppError::MalformedRequest(
                "maxMembers must be between 2 and 4".to_string(),
            ));
        }

        let room = self
            .rooms
            .create_room(room_name, &user.user_id, max_members)
            .await;

        self.set_session_room(conn_id, Some(room.room_id.clone())).await;
        self.broadcaster.join_room(&room.room_id, conn_id).await;

        let summary = self.room_summary(&room).await;
        self.broadcaster
            .send_to_connection(conn_id, &ServerMessage::room_info("Room created", summary))
            .await;

        self.broadcaster
            .broadcast(
                &room.room_id,
                &ServerMessage::chat(format!("[room : {}] room was created", room.name)),
            )
            .await;
        let rooms = self.room_summaries().await;
        self.broadcaster
            .broadcast(&room.room_id, &ServerMessage::room_list(rooms))
            .await;

        Ok(())
    }

    async fn handle_enter_room(
        &self,
        conn_id: &str,
        user_id: &str,
        room_id: &str,
    ) -> Result<(), AppError> {
        let user = self.users.get(user_id).await.ok_or(AppError::UserNotFound)?;

        let room = match self.rooms.try_join_room(room_id, &user.user_id).await {
            JoinRoomResult::Success(room) => room,
            JoinRoomResult::RoomFull => return Err(AppError::RoomFull),
            JoinRoomResult::AlreadyMember => return Err(AppError::AlreadyMember),
            JoinRoomResult::RoomNotFound => return Err(AppError::RoomNotFound),
        };

        self.set_session_room(conn_id, Some(room.room_id.clone())).await;
        self.broadcaster.join_room(&room.room_id, conn_id).await;

        let summary = self.room_summary(&room).await;
        self.broadcaster
            .send_to_connection(conn_id, &ServerMessage::room_info("Joined room", summary))
            .await;

        self.broadcaster
            .broadcast(
                &room.room_id,
                &ServerMessage::chat(format!("{} entered", user.display_name)),
            )
            .await;

        Ok(())
    }

    async fn handle_leave_room(
        &self,
        conn_id: &str,
        user_id: &str,
        room_id: &str,
    ) -> Result<(), AppError> {
        let user = self.users.get(user_id).await.ok_or(AppError::UserNotFound)?;

        match self.rooms.leave_room(room_id, &user.user_id).await {
            LeaveRoomResult::Success(_) => {
                self.broadcaster
                    .broadcast(
                        room_id,
                        &ServerMessage::chat(format!("{} left", user.display_name)),
                    )
                    .await;
                self.broadcaster.leave_room(room_id, conn_id).await;
            }
            LeaveRoomResult::RoomDeleted => {
                self.broadcaster
                    .broadcast(
                        room_id,
                        &ServerMessage::chat(format!("{} left", user.display_name)),
                    )
                    .await;
                self.teardown_room(room_id).await;
            }
            LeaveRoomResult::NotAMember => return Err(AppError::NotAMember),
            LeaveRoomResult::RoomNotFound => return Err(AppError::RoomNotFound),
        }

        self.set_session_room(conn_id, None).await;

        let rooms = self.room_summaries().await;
        self.broadcaster
            .send_to_connection(conn_id, &ServerMessage::room_list(rooms))
            .await;
        Ok(())
    }

    async fn handle_send_chat(
        &self,
        conn_id: &str,
        user_id: &str,
        room_id: &str,
        msg: &str,
    ) -> Result<(), AppError> {
        let user = self.users.get(user_id).await.ok_or(AppError::UserNotFound)?;
        let room = self
            .rooms
            .get_room(room_id)
            .await
            .ok_or(AppError::RoomNotFound)?;

        self.broadcaster
            .broadcast(
                &room.room_id,
                &ServerMessage::chat(format!("[{}]: {}", user.display_name, msg)),
            )
            .await;

        self.broadcaster
            .send_to_connection(conn_id, &ServerMessage::ack("Message sent"))
            .await;
        Ok(())
    }

    async fn handle_start_game(&self, conn_id: &str, room_id: &str) -> Result<(), AppError> {
        let room = self
            .rooms
            .get_room(room_id)
            .await
            .ok_or(AppError::RoomNotFound)?;

        let mut players = Vec::with_capacity(room.member_ids.len());
        for member_id in &room.member_ids {
            let user = self
                .users
                .get(member_id)
                .await
                .ok_or(AppError::UserNotFound)?;
            players.push(user);
        }

        let handle = self.games.create(&room.room_id, &players).await?;
        let first_player = {
            let mut game = handle.lock().await;
            let first_player = game.start()?;
            self.rooms
                .set_status(&room.room_id, RoomStatus::Playing)
                .await;

            info!(
                room_id = %room.room_id,
                players = players.len(),
                first_player = %first_player,
                "Game started"
            );

            self.broadcaster
                .broadcast(
                    &room.room_id,
                    &ServerMessage::game_started(first_player.clone()),
                )
                .await;
            self.push_game_states(&game).await;
            first_player
        };

        self.broadcaster
            .send_to_connection(conn_id, &ServerMessage::start_result(first_player))
            .await;
        Ok(())
    }

    async fn handle_draw_tile(
        &self,
        conn_id: &str,
        room_id: &str,
        user_id: &str,
        from_revealed: bool,
    ) -> Result<(), AppError> {
        let handle = self
            .games
            .get(room_id)
            .await
            .ok_or(AppError::GameNotFound)?;
        let mut game = handle.lock().await;

        let tile = game.draw_tile(user_id, from_revealed)?;

        // Full tile info goes to the drawer alone; the room only learns
        // that a draw happened.
        self.broadcaster
            .send_to_connection(conn_id, &ServerMessage::draw_result(tile.info(false)))
            .await;
        self.broadcaster
            .broadcast_except(
                room_id,
                conn_id,
                &ServerMessage::player_drew(user_id.to_string(), from_revealed),
            )
            .await;
        self.push_game_states(&game).await;

        Ok(())
    }

    async fn handle_guess(
        &self,
        conn_id: &str,
        room_id: &str,
        user_id: &str,
        target_user_id: &str,
        tile_index: usize,
        guessed_number: u8,
    ) -> Result<(), AppError> {
        let handle = self
            .games
            .get(room_id)
            .await
            .ok_or(AppError::GameNotFound)?;
        let mut game = handle.lock().await;

        let outcome = game.guess(user_id, target_user_id, tile_index, guessed_number)?;

        let result = ServerMessage::guess_result(
            user_id.to_string(),
            target_user_id.to_string(),
            tile_index,
            guessed_number,
            outcome,
        );
        self.broadcaster.send_to_connection(conn_id, &result).await;
        self.broadcaster.broadcast(room_id, &result).await;
        self.push_game_states(&game).await;

        if game.status() == GameStatus::Ended {
            let winner = game.winner().map(str::to_string);
            info!(room_id = %room_id, winner = ?winner, "Game ended");

            self.broadcaster
                .broadcast(room_id, &ServerMessage::game_ended(winner))
                .await;
            self.rooms.set_status(room_id, RoomStatus::Ended).await;

            // Ended sessions are torn down eagerly instead of accumulating.
            drop(game);
            self.games.remove(room_id).await;
        }

        Ok(())
    }

    async fn handle_end_turn(
        &self,
        conn_id: &str,
        room_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        let handle = self
            .games
            .get(room_id)
            .await
            .ok_or(AppError::GameNotFound)?;
        let mut game = handle.lock().await;

        let current_player = game.end_turn(user_id)?;

        self.broadcaster
            .send_to_connection(
                conn_id,
                &ServerMessage::end_turn_result(current_player.clone()),
            )
            .await;
        self.broadcaster
            .broadcast(room_id, &ServerMessage::turn_changed(current_player))
            .await;
        self.push_game_states(&game).await;

        Ok(())
    }

    async fn handle_get_game_state(
        &self,
        conn_id: &str,
        room_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        let handle = self
            .games
            .get(room_id)
            .await
            .ok_or(AppError::GameNotFound)?;
        let game = handle.lock().await;

        self.broadcaster
            .send_to_connection(conn_id, &ServerMessage::game_state(game.state_for(user_id)))
            .await;
        Ok(())
    }

    /// Sends every participant their own projection of the game. Never a
    /// single shared payload: each viewer gets exactly what they are
    /// entitled to see.
    async fn push_game_states(&self, game: &GameSession) {
        for user_id in game.player_ids() {
            self.broadcaster
                .send_to_user(user_id, &ServerMessage::game_state(game.state_for(user_id)))
                .await;
        }
    }

    /// Deletes everything room-scoped once the room itself is gone.
    async fn teardown_room(&self, room_id: &str) {
        self.games.remove(room_id).await;
        self.broadcaster.drop_room(room_id).await;
        info!(room_id = %room_id, "Room torn down");
    }

    async fn set_session_room(&self, conn_id: &str, room_id: Option<String>) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(conn_id) {
            session.room_id = room_id;
        }
    }

    async fn room_summary(&self, room: &RoomModel) -> RoomSummary {
        let mut members = Vec::with_capacity(room.member_ids.len());
        for member_id in &room.member_ids {
            let display_name = match self.users.get(member_id).await {
                Some(User { display_name, .. }) => display_name,
                None => member_id.clone(),
            };
            members.push(RoomMember {
                user_id: member_id.clone(),
                display_name,
            });
        }

        RoomSummary {
            room_id: room.room_id.clone(),
            name: room.name.clone(),
            owner_id: room.owner_id.clone(),
            member_count: room.member_count(),
            max_members: room.max_members,
            status: room.status,
            members,
        }
    }

    async fn room_summaries(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.list_rooms().await;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in &rooms {
            summaries.push(self.room_summary(room).await);
        }
        summaries
    }
}
