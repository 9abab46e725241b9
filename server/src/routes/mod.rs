use std::sync::Arc;

use dashmap::Entry;
use nanoid::nanoid;
use rocket::{State, futures::StreamExt, get, http::Status, post, serde::json::Json};
use rocket_ws::{Channel, Message, WebSocket};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use turnsweeper_common::{
    models::{CreateResponse, GameParams},
    protocol::ClientMessage,
};

use crate::{
    logic::{Game, Games},
    rate_limit::{ClientIp, RateLimiter, check_rate_limit},
};

#[instrument(level = "trace", skip(games, game))]
fn add_game(games: &State<Games>, game: Game) -> String {
    let mut id_length = 5;
    let max_attempts_per_length = 10;

    loop {
        for _ in 0..max_attempts_per_length {
            let id = nanoid!(id_length);
            match games.entry(id.clone()) {
                Entry::Occupied(_) => {
                    debug!("session ID collision, trying another: {}", id);
                    continue;
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(Mutex::new(game)));
                    info!("registered session {}", id);
                    return id;
                }
            }
        }

        warn!(
            "exhausted ID attempts at length {}, increasing to {}",
            id_length,
            id_length + 1
        );
        id_length += 1;
    }
}

/// Registers a new session. With a body, the board is created immediately;
/// without one, the session stays idle until the host sends a create or
/// preset command over the WebSocket.
#[post("/create", data = "<params>")]
#[instrument(level = "trace", skip(games, rate_limiter), fields(client_ip = %client_ip.0))]
pub fn create_session(
    params: Option<Json<GameParams>>,
    games: &State<Games>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<CreateResponse>, Status> {
    if let Err(status) = check_rate_limit(rate_limiter, &client_ip) {
        warn!("rate limit exceeded for client {}", client_ip.0);
        return Err(status);
    }

    let params = params.map(|p| p.0);
    if let Some(params) = &params {
        info!(
            "session creation from {}: {}x{} with {} mines",
            client_ip.0, params.width, params.height, params.mines
        );
        if !params.dimensions_valid() {
            warn!("rejecting session with invalid dimensions");
            return Err(Status::UnprocessableEntity);
        }
    } else {
        info!("idle session creation from {}", client_ip.0);
    }

    let id = add_game(games, Game::new(params));
    Ok(Json(CreateResponse { id }))
}

#[get("/ws?<id>")]
#[instrument(level = "trace", skip(ws, games), fields(session_id = %id))]
pub fn websocket_handler(
    ws: WebSocket,
    games: &State<Games>,
    id: String,
) -> Result<Channel<'static>, Status> {
    let game = match games.get(&id) {
        None => {
            warn!("WebSocket connection attempt for unknown session: {}", id);
            return Err(Status::NotFound);
        }
        Some(value) => value.value().clone(),
    };

    Ok(ws.channel(move |stream| {
        let session_id = id.clone();
        Box::pin(async move {
            let (write, mut read) = stream.split();

            let conn = {
                let mut game = game.lock().await;
                game.add_stream(write).await
            };

            info!("client connected to session {} ({})", session_id, conn);

            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => {
                            debug!("command in session {}: {:?}", session_id, message);
                            match message {
                                ClientMessage::Reveal { pos } => {
                                    let mut game = game.lock().await;
                                    game.reveal(&conn, pos).await;
                                }
                                ClientMessage::Flag { pos } => {
                                    let mut game = game.lock().await;
                                    game.flag(&conn, pos).await;
                                }
                                ClientMessage::Create { params } => {
                                    let mut game = game.lock().await;
                                    game.create(&conn, params).await;
                                }
                                ClientMessage::Preset { preset } => {
                                    let mut game = game.lock().await;
                                    game.create(&conn, preset.into()).await;
                                }
                            }
                        }
                        Err(e) => {
                            warn!(
                                "invalid message in session {}: {} - {}",
                                session_id, text, e
                            );
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("connection closed in session {} ({})", session_id, conn);
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket error in session {} ({}): {}", session_id, conn, e);
                        break;
                    }
                    _ => {
                        debug!("ignoring non-text message in session {}", session_id);
                    }
                }
            }

            {
                let mut game = game.lock().await;
                game.remove_stream(&conn).await;
            }

            info!("client disconnected from session {} ({})", session_id, conn);
            Ok(())
        })
    }))
}
