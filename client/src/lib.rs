//! Turnsweeper Client Library
//!
//! This library provides a Rust client for the turnsweeper multiplayer
//! server: HTTP session creation plus a WebSocket connection for real-time,
//! turn-based play. The server is authoritative; the client only mirrors
//! state from the notifications it receives.
//!
//! ## Usage
//!
//! ### High-Level Interface (Recommended)
//!
//! The `TurnsweeperGame` struct manages the session state locally and
//! provides convenient methods for game actions:
//!
//! ```rust,no_run
//! use turnsweeper_client::{GameParams, Pos, TurnsweeperGame};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let game = TurnsweeperGame::new("http://localhost:8000")?;
//!
//!     // Create a session with a board; we join as player 1, the host.
//!     let params = GameParams { width: 9, height: 9, mines: 10 };
//!     game.start_session(Some(params)).await?;
//!
//!     // First click places the mines; the second one reveals.
//!     game.reveal(Pos { x: 4, y: 4 }).await?;
//!     game.reveal(Pos { x: 4, y: 4 }).await?;
//!     game.flag(Pos { x: 0, y: 0 }).await?;
//!
//!     let state = game.get_state().await;
//!     println!("My turn: {}, over: {}", state.is_my_turn(), state.is_game_over());
//!
//!     game.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Low-Level Interface
//!
//! For more control, use `TurnsweeperClient` and `TurnsweeperWebSocket`
//! directly:
//!
//! ```rust,no_run
//! use turnsweeper_client::{ClientMessage, Pos, TurnsweeperClient, TurnsweeperWebSocket};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = TurnsweeperClient::new("http://localhost:8000")?;
//!     let session_id = client.create_session(None).await?;
//!
//!     let ws_url = client.websocket_url(&session_id)?;
//!     let mut ws = TurnsweeperWebSocket::connect(&ws_url).await?;
//!
//!     // Receive the snapshot and our slot assignment
//!     while let Some(message) = ws.receive_message().await? {
//!         println!("Received: {:?}", message);
//!     }
//!
//!     ws.send_message(ClientMessage::Reveal { pos: Pos { x: 0, y: 0 } }).await?;
//!
//!     ws.close().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod game;
mod websocket;

pub use client::TurnsweeperClient;
pub use game::{BoardState, GameEvent, GameState, TurnsweeperGame};
pub use websocket::TurnsweeperWebSocket;

// Re-export common types for convenience
pub use turnsweeper_common::{models::*, protocol::*};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
