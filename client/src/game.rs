use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use turnsweeper_common::{
    models::{CellView, GameParams, Pos, Preset, SessionStatus},
    protocol::{ClientMessage, ServerMessage},
};

use crate::{Result, TurnsweeperClient, TurnsweeperWebSocket};

/// Events emitted while following a session
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// Received the full session snapshot after connecting
    SessionSynced,
    /// Our slot assignment changed (None means spectator)
    SlotAssigned { slot: Option<u8> },
    /// A new board was created
    BoardCreated {
        width: usize,
        height: usize,
        mines: usize,
    },
    /// The board changed at the listed positions
    BoardUpdated { changed_positions: Vec<Pos> },
    /// The turn moved to another player
    TurnChanged { player: u8, is_me: bool },
    /// The game ended
    GameOver { won: bool },
    /// Connection was lost
    ConnectionLost,
}

/// The board as mirrored from server notifications
#[derive(Debug, Clone)]
pub struct BoardState {
    pub width: usize,
    pub height: usize,
    pub mines: usize,
    pub cells: Vec<Vec<CellView>>,
}

impl BoardState {
    fn hidden(width: usize, height: usize, mines: usize) -> Self {
        Self {
            width,
            height,
            mines,
            cells: vec![vec![CellView::Hidden; width]; height],
        }
    }

    fn set_cell(&mut self, pos: Pos, value: CellView) {
        if let Some(cell) = self
            .cells
            .get_mut(pos.y)
            .and_then(|row| row.get_mut(pos.x))
        {
            *cell = value;
        }
    }
}

/// Local mirror of one session, built purely from notifications applied in
/// arrival order. Never computes game rules itself; the server is the
/// authority.
#[derive(Debug, Clone)]
pub struct GameState {
    pub status: SessionStatus,
    pub board: Option<BoardState>,
    pub my_slot: Option<u8>,
    pub current_turn: u8,
    pub players: u8,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            board: None,
            my_slot: None,
            current_turn: 1,
            players: 0,
        }
    }
}

impl GameState {
    /// Get the cell at the specified position
    pub fn cell(&self, pos: Pos) -> Option<CellView> {
        let board = self.board.as_ref()?;
        board.cells.get(pos.y)?.get(pos.x).copied()
    }

    pub fn is_my_turn(&self) -> bool {
        self.status == SessionStatus::InProgress && self.my_slot == Some(self.current_turn)
    }

    pub fn is_game_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn is_won(&self) -> bool {
        self.status == SessionStatus::Won
    }

    /// Apply one notification, returning the event it maps to.
    pub fn apply(&mut self, message: ServerMessage) -> Option<GameEvent> {
        match message {
            ServerMessage::Init {
                status,
                current_turn,
                players,
                board,
            } => {
                self.status = status;
                self.current_turn = current_turn;
                self.players = players;
                self.board = board.map(|b| BoardState {
                    width: b.width,
                    height: b.height,
                    mines: b.mines,
                    cells: b.cells,
                });
                Some(GameEvent::SessionSynced)
            }
            ServerMessage::SlotAssigned { slot } => {
                self.my_slot = slot;
                Some(GameEvent::SlotAssigned { slot })
            }
            ServerMessage::BoardCreated {
                width,
                height,
                mines,
            } => {
                self.status = SessionStatus::InProgress;
                self.board = Some(BoardState::hidden(width, height, mines));
                Some(GameEvent::BoardCreated {
                    width,
                    height,
                    mines,
                })
            }
            ServerMessage::Update { updates } => {
                let board = self.board.as_mut()?;
                let changed_positions: Vec<Pos> = updates.iter().map(|u| u.pos).collect();
                for update in updates {
                    board.set_cell(update.pos, update.value);
                }
                Some(GameEvent::BoardUpdated { changed_positions })
            }
            ServerMessage::CellFlagged { pos, flagged } => {
                let board = self.board.as_mut()?;
                board.set_cell(
                    pos,
                    if flagged {
                        CellView::Flagged
                    } else {
                        CellView::Hidden
                    },
                );
                Some(GameEvent::BoardUpdated {
                    changed_positions: vec![pos],
                })
            }
            ServerMessage::TurnChanged { player } => {
                self.current_turn = player;
                Some(GameEvent::TurnChanged {
                    player,
                    is_me: self.my_slot == Some(player),
                })
            }
            ServerMessage::GameWon => {
                self.status = SessionStatus::Won;
                Some(GameEvent::GameOver { won: true })
            }
            ServerMessage::GameLost => {
                self.status = SessionStatus::Lost;
                Some(GameEvent::GameOver { won: false })
            }
        }
    }
}

/// Connection state - all fields are required when connected
struct ConnectionState {
    websocket_sender: mpsc::UnboundedSender<ClientMessage>,
    session_id: String,
    background_task: JoinHandle<()>,
}

impl ConnectionState {
    fn send_message(&self, message: ClientMessage) -> Result<()> {
        self.websocket_sender
            .send(message)
            .map_err(|_| "WebSocket sender closed")?;
        Ok(())
    }

    async fn abort_and_wait_background_task(self) {
        self.background_task.abort();
        let _ = self.background_task.await;
    }
}

/// High-level client that joins a session and keeps a local state mirror
pub struct TurnsweeperGame {
    client: TurnsweeperClient,
    connection_state: Arc<RwLock<Option<ConnectionState>>>,
    event_sender: Arc<RwLock<Option<mpsc::UnboundedSender<GameEvent>>>>,
    state: Arc<RwLock<GameState>>,
}

impl TurnsweeperGame {
    pub fn new(server_url: &str) -> Result<Self> {
        let client = TurnsweeperClient::new(server_url)?;
        Ok(Self {
            client,
            connection_state: Arc::new(RwLock::new(None)),
            event_sender: Arc::new(RwLock::new(None)),
            state: Arc::new(RwLock::new(GameState::default())),
        })
    }

    /// Subscribe to game events. Returns a receiver for game events.
    pub async fn subscribe_to_events(&self) -> mpsc::UnboundedReceiver<GameEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut event_sender = self.event_sender.write().await;
        *event_sender = Some(sender);
        receiver
    }

    /// Create a session on the server and join it. With `Some(params)` the
    /// board exists immediately; with `None` the session waits for the
    /// host's create command.
    pub async fn start_session(&self, params: Option<GameParams>) -> Result<()> {
        let session_id = self.client.create_session(params).await?;
        info!("Created session with ID: {}", session_id);

        self.join_session(session_id).await
    }

    pub async fn join_session(&self, session_id: String) -> Result<()> {
        info!("Joining session with ID: {}", session_id);

        let mut conn_state = self.connection_state.write().await;

        // Stop any existing background task
        if let Some(existing_conn) = conn_state.take() {
            existing_conn.abort_and_wait_background_task().await;
        }
        *self.state.write().await = GameState::default();

        let ws_url = self.client.websocket_url(&session_id)?;
        let websocket = TurnsweeperWebSocket::connect(&ws_url).await?;
        let websocket_sender = websocket.get_sender();

        let background_task = self.start_background_listener(websocket);

        *conn_state = Some(ConnectionState {
            websocket_sender,
            session_id,
            background_task,
        });

        Ok(())
    }

    async fn send_client_message(&self, message: ClientMessage) -> Result<()> {
        let conn_state = self.connection_state.read().await;

        if let Some(ref conn) = *conn_state {
            conn.send_message(message)?;
        } else {
            return Err("Not connected to a session. Call start_session() first.".into());
        }

        Ok(())
    }

    /// Reveal a cell. The server ignores this unless it is our turn, and a
    /// first click on a fresh board only places the mines; click again to
    /// reveal.
    pub async fn reveal(&self, pos: Pos) -> Result<()> {
        debug!("Revealing cell at ({}, {})", pos.x, pos.y);
        self.send_client_message(ClientMessage::Reveal { pos }).await
    }

    /// Flag/unflag a cell at the specified position
    pub async fn flag(&self, pos: Pos) -> Result<()> {
        debug!("Flagging cell at ({}, {})", pos.x, pos.y);
        self.send_client_message(ClientMessage::Flag { pos }).await
    }

    /// Create a new board (host only)
    pub async fn create_board(&self, params: GameParams) -> Result<()> {
        info!(
            "Requesting new board: {}x{} with {} mines",
            params.width, params.height, params.mines
        );
        self.send_client_message(ClientMessage::Create { params })
            .await
    }

    /// Create a new board from a difficulty preset (host only)
    pub async fn create_preset(&self, preset: Preset) -> Result<()> {
        self.send_client_message(ClientMessage::Preset { preset })
            .await
    }

    /// Get a snapshot of the current game state
    pub async fn get_state(&self) -> GameState {
        self.state.read().await.clone()
    }

    pub async fn my_slot(&self) -> Option<u8> {
        self.state.read().await.my_slot
    }

    pub async fn is_my_turn(&self) -> bool {
        self.state.read().await.is_my_turn()
    }

    /// Get the session ID
    pub async fn session_id(&self) -> Option<String> {
        let conn_state = self.connection_state.read().await;
        conn_state.as_ref().map(|conn| conn.session_id.clone())
    }

    /// Check if we're connected to a session
    pub async fn is_connected(&self) -> bool {
        let conn_state = self.connection_state.read().await;
        conn_state.is_some()
    }

    /// Close the connection and clean up
    pub async fn disconnect(&self) -> Result<()> {
        let mut conn_state = self.connection_state.write().await;

        if let Some(conn) = conn_state.take() {
            conn.abort_and_wait_background_task().await;
        }

        *self.event_sender.write().await = None;
        *self.state.write().await = GameState::default();

        info!("Disconnected from session");
        Ok(())
    }

    fn start_background_listener(&self, mut websocket: TurnsweeperWebSocket) -> JoinHandle<()> {
        let state = self.state.clone();
        let event_sender = self.event_sender.clone();

        tokio::spawn(async move {
            Self::background_message_handler(&mut websocket, state, event_sender).await;
        })
    }

    /// Applies incoming notifications to the local mirror, in order, and
    /// forwards the resulting events.
    async fn background_message_handler(
        websocket: &mut TurnsweeperWebSocket,
        state: Arc<RwLock<GameState>>,
        event_sender: Arc<RwLock<Option<mpsc::UnboundedSender<GameEvent>>>>,
    ) {
        loop {
            let message = match websocket.receive_message().await {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    if let Some(ref sender) = *event_sender.read().await {
                        let _ = sender.send(GameEvent::ConnectionLost);
                    }
                    break;
                }
                Err(e) => {
                    warn!("Error receiving WebSocket message: {}", e);
                    if let Some(ref sender) = *event_sender.read().await {
                        let _ = sender.send(GameEvent::ConnectionLost);
                    }
                    break;
                }
            };

            let event = state.write().await.apply(message);

            if let Some(event) = event
                && let Some(ref sender) = *event_sender.read().await
            {
                let _ = sender.send(event);
            }
        }
    }
}
