use turnsweeper_client::{
    ClientMessage, GameParams, Pos, ServerMessage, TurnsweeperClient, TurnsweeperWebSocket,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let client = TurnsweeperClient::new("http://localhost:8000")?;

    // Create a session with a board already in place
    let params = GameParams {
        width: 9,
        height: 9,
        mines: 10,
    };
    let session_id = client.create_session(Some(params)).await?;
    println!("Created session with ID: {}", session_id);

    let ws_url = client.websocket_url(&session_id)?;
    let mut ws = TurnsweeperWebSocket::connect(&ws_url).await?;

    // The server sends the session snapshot first, then our slot.
    if let Some(ServerMessage::Init {
        status,
        current_turn,
        players,
        board,
    }) = ws.receive_message().await?
    {
        println!(
            "Session state: {:?}, turn: player {}, {} players connected",
            status, current_turn, players
        );
        if let Some(board) = board {
            println!(
                "Board: {}x{} with {} mines",
                board.width, board.height, board.mines
            );
        }
    }

    if let Some(ServerMessage::SlotAssigned { slot }) = ws.receive_message().await? {
        match slot {
            Some(slot) => println!("Joined as player {}", slot),
            None => println!("Joined as spectator"),
        }
    }

    // First reveal on a fresh board only places the mines.
    let pos = Pos { x: 4, y: 4 };
    ws.send_message(ClientMessage::Reveal { pos }).await?;
    println!("Sent first reveal for (4, 4) - this places the mines");

    // The same click again actually reveals.
    ws.send_message(ClientMessage::Reveal { pos }).await?;

    while let Some(message) = ws.receive_message().await? {
        match message {
            ServerMessage::Update { updates } => {
                println!("Received update: {} cells", updates.len());
                for update in updates {
                    println!(
                        "  Cell ({}, {}) -> {:?}",
                        update.pos.x, update.pos.y, update.value
                    );
                }
            }
            ServerMessage::TurnChanged { player } => {
                println!("It is now player {}'s turn", player);
                break;
            }
            ServerMessage::GameWon => {
                println!("Game won!");
                break;
            }
            ServerMessage::GameLost => {
                println!("Game lost!");
                break;
            }
            other => println!("Received: {:?}", other),
        }
    }

    ws.close().await?;
    println!("Connection closed");

    Ok(())
}
