use std::{collections::HashMap, sync::Arc, time::Instant};

use dashmap::DashMap;
use rand::Rng;
use rocket::futures::{SinkExt, future::join_all, stream::SplitSink};
use rocket_ws::{Message, stream::DuplexStream};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use turnsweeper_common::{
    models::{GameParams, Pos, SessionStatus},
    protocol::{BoardSnapshot, ServerMessage},
};

use crate::{
    data::{MineField, RevealOutcome},
    turns::TurnCoordinator,
};

pub type Games = Arc<DashMap<String, Arc<Mutex<Game>>>>;

/// One match: board, turn order, and lifecycle state. All methods are
/// synchronous and must run under the session lock; they return the
/// notifications to broadcast, in application order.
pub struct Session {
    status: SessionStatus,
    field: Option<MineField>,
    turns: TurnCoordinator,
}

impl Session {
    pub fn new(params: Option<GameParams>) -> Self {
        let mut session = Self {
            status: SessionStatus::Idle,
            field: None,
            turns: TurnCoordinator::new(),
        };
        if let Some(params) = params {
            session.create_board(params);
        }
        session
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn join(&mut self, conn: Uuid) -> Option<u8> {
        self.turns.join(conn)
    }

    /// Removes the connection from the turn order. Returns the renumbered
    /// connections and, if the departure moved the turn, the new turn
    /// holder.
    pub fn leave(&mut self, conn: &Uuid) -> (Vec<(Uuid, u8)>, Option<u8>) {
        let before = self.turns.current_turn();
        let reassigned = self.turns.leave(conn);

        let turn_changed = (self.status == SessionStatus::InProgress
            && self.turns.player_count() > 0
            && self.turns.current_turn() != before)
            .then(|| self.turns.current_turn());

        (reassigned, turn_changed)
    }

    fn create_board(&mut self, params: GameParams) -> Vec<ServerMessage> {
        if !params.dimensions_valid() {
            warn!(
                "rejecting board creation: invalid dimensions {}x{}",
                params.width, params.height
            );
            return Vec::new();
        }

        // The previous board is dropped wholesale, never reused.
        let field = MineField::new(params);
        let created = ServerMessage::BoardCreated {
            width: field.width(),
            height: field.height(),
            mines: field.mine_count(),
        };
        self.field = Some(field);
        self.turns.reset();
        self.status = SessionStatus::InProgress;

        vec![
            created,
            ServerMessage::TurnChanged {
                player: self.turns.current_turn(),
            },
        ]
    }

    /// Creates (or replaces) the board. Only the session host, slot 1, has
    /// the authority; anything else is a silent no-op.
    pub fn handle_create(&mut self, conn: &Uuid, params: GameParams) -> Vec<ServerMessage> {
        if self.turns.slot_of(conn) != Some(1) {
            debug!("ignoring create from non-host connection");
            return Vec::new();
        }
        self.create_board(params)
    }

    /// Reveals a cell for the current-turn player. The first reveal on a
    /// fresh board only places the mines, excluding the clicked cell, and
    /// reveals nothing; the player is expected to click again.
    pub fn handle_reveal(
        &mut self,
        conn: &Uuid,
        pos: Pos,
        rng: &mut impl Rng,
    ) -> Vec<ServerMessage> {
        if self.status != SessionStatus::InProgress || !self.turns.is_turn(conn) {
            return Vec::new();
        }
        let Some(field) = self.field.as_mut() else {
            return Vec::new();
        };

        if !field.in_bounds(pos) {
            warn!("reveal out of bounds: ({}, {})", pos.x, pos.y);
            return Vec::new();
        }

        if !field.mines_placed() {
            field.place_mines(pos, rng);
            debug!("first click placed mines, reveal deferred to next input");
            return Vec::new();
        }

        let mut updates = Vec::new();
        match field.reveal(pos, &mut updates) {
            RevealOutcome::Unchanged => Vec::new(),
            RevealOutcome::MineHit => {
                field.reveal_mines(&mut updates);
                self.status = SessionStatus::Lost;
                info!("player {} hit a mine", self.turns.current_turn());
                vec![ServerMessage::Update { updates }, ServerMessage::GameLost]
            }
            RevealOutcome::Revealed { won: true, .. } => {
                self.status = SessionStatus::Won;
                info!("all safe cells revealed, game won");
                vec![ServerMessage::Update { updates }, ServerMessage::GameWon]
            }
            RevealOutcome::Revealed { .. } => {
                self.turns.advance();
                vec![
                    ServerMessage::Update { updates },
                    ServerMessage::TurnChanged {
                        player: self.turns.current_turn(),
                    },
                ]
            }
        }
    }

    /// Toggles a flag for the current-turn player. Flagging does not
    /// consume the turn.
    pub fn handle_flag(&mut self, conn: &Uuid, pos: Pos) -> Vec<ServerMessage> {
        if self.status != SessionStatus::InProgress || !self.turns.is_turn(conn) {
            return Vec::new();
        }
        let Some(field) = self.field.as_mut() else {
            return Vec::new();
        };

        match field.toggle_flag(pos) {
            Some(flagged) => vec![ServerMessage::CellFlagged { pos, flagged }],
            None => Vec::new(),
        }
    }

    pub fn init_message(&self) -> ServerMessage {
        ServerMessage::Init {
            status: self.status,
            current_turn: self.turns.current_turn(),
            players: self.turns.player_count(),
            board: self.field.as_ref().map(|field| BoardSnapshot {
                width: field.width(),
                height: field.height(),
                mines: field.mine_count(),
                cells: field.snapshot(),
            }),
        }
    }
}

/// A registered session plus its connected WebSocket sinks. Broadcasts
/// happen under the same lock as the mutation that produced them, so every
/// client observes state changes in application order.
pub struct Game {
    session: Session,
    streams: HashMap<Uuid, SplitSink<DuplexStream, Message>>,
    created_at: Instant,
    last_activity: Instant,
}

async fn send(stream: &mut SplitSink<DuplexStream, Message>, message: &ServerMessage) {
    if let Ok(text) = serde_json::to_string(message) {
        let _ = stream.send(Message::Text(text)).await;
    }
}

async fn broadcast(
    streams: &mut HashMap<Uuid, SplitSink<DuplexStream, Message>>,
    message: &ServerMessage,
) {
    let futures: Vec<_> = streams
        .iter_mut()
        .map(|(_, stream)| send(stream, message))
        .collect();

    join_all(futures).await;
}

impl Game {
    pub fn new(params: Option<GameParams>) -> Self {
        Self {
            session: Session::new(params),
            streams: HashMap::new(),
            created_at: Instant::now(),
            last_activity: Instant::now(),
        }
    }

    /// Registers a connection: sends it the current session snapshot,
    /// assigns it a player slot if one is free, and keeps its sink for
    /// broadcasts. Past the slot cap it stays a spectator.
    pub async fn add_stream(&mut self, mut stream: SplitSink<DuplexStream, Message>) -> Uuid {
        let conn = Uuid::new_v4();
        let slot = self.session.join(conn);

        send(&mut stream, &self.session.init_message()).await;
        send(&mut stream, &ServerMessage::SlotAssigned { slot }).await;

        self.streams.insert(conn, stream);
        self.last_activity = Instant::now();

        match slot {
            Some(slot) => info!("connection {} joined as player {}", conn, slot),
            None => info!("connection {} joined as spectator", conn),
        }
        conn
    }

    /// Drops a connection, renumbers the remaining players, and tells every
    /// affected client its new slot (and the new turn holder, if the
    /// departure moved the turn).
    pub async fn remove_stream(&mut self, conn: &Uuid) {
        self.streams.remove(conn);
        self.last_activity = Instant::now();

        let (reassigned, turn_changed) = self.session.leave(conn);
        for (other, slot) in reassigned {
            if let Some(stream) = self.streams.get_mut(&other) {
                send(stream, &ServerMessage::SlotAssigned { slot: Some(slot) }).await;
            }
        }
        if let Some(player) = turn_changed {
            broadcast(&mut self.streams, &ServerMessage::TurnChanged { player }).await;
        }
    }

    pub async fn reveal(&mut self, conn: &Uuid, pos: Pos) {
        self.last_activity = Instant::now();
        let messages = self.session.handle_reveal(conn, pos, &mut rand::rng());
        self.broadcast_all(messages).await;
    }

    pub async fn flag(&mut self, conn: &Uuid, pos: Pos) {
        self.last_activity = Instant::now();
        let messages = self.session.handle_flag(conn, pos);
        self.broadcast_all(messages).await;
    }

    pub async fn create(&mut self, conn: &Uuid, params: GameParams) {
        self.last_activity = Instant::now();
        let messages = self.session.handle_create(conn, params);
        self.broadcast_all(messages).await;
    }

    async fn broadcast_all(&mut self, messages: Vec<ServerMessage>) {
        for message in &messages {
            broadcast(&mut self.streams, message).await;
        }
    }

    pub fn has_active_connections(&self) -> bool {
        !self.streams.is_empty()
    }

    pub fn should_cleanup(&self, inactive_timeout_secs: u64, active_timeout_secs: u64) -> bool {
        let now = Instant::now();

        if now.duration_since(self.created_at).as_secs() > active_timeout_secs {
            return true;
        }

        if self.has_active_connections() {
            return false;
        }

        now.duration_since(self.last_activity).as_secs() > inactive_timeout_secs
    }
}
