use reqwest::Client;
use turnsweeper_common::models::{CreateResponse, GameParams};
use url::Url;

use crate::Result;

/// HTTP client for the turnsweeper server API.
pub struct TurnsweeperClient {
    client: Client,
    base_url: Url,
}

impl TurnsweeperClient {
    /// Create a new client connecting to the specified server URL
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = Client::new();

        Ok(Self { client, base_url })
    }

    /// Register a new session. With `Some(params)` the board exists right
    /// away; with `None` the session idles until the host sends a create
    /// command. Returns the session ID used to connect via WebSocket.
    pub async fn create_session(&self, params: Option<GameParams>) -> Result<String> {
        let create_url = self.base_url.join("/create")?;

        let mut request = self.client.post(create_url);
        if let Some(params) = params {
            request = request.json(&params);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(format!("Failed to create session: {}", response.status()).into());
        }

        let create_response: CreateResponse = response.json().await?;
        Ok(create_response.id)
    }

    /// Get the WebSocket URL for a session
    pub fn websocket_url(&self, session_id: &str) -> Result<String> {
        let mut ws_url = self.base_url.clone();
        ws_url
            .set_scheme(match self.base_url.scheme() {
                "https" => "wss",
                _ => "ws",
            })
            .map_err(|_| "Failed to set WebSocket scheme")?;
        ws_url.set_path("/ws");
        ws_url.set_query(Some(&format!("id={}", session_id)));

        Ok(ws_url.to_string())
    }
}
