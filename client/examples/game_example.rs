use tokio::time::{Duration, sleep};
use turnsweeper_client::{CellView, GameEvent, GameState, Pos, Preset, TurnsweeperGame};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let game = TurnsweeperGame::new("http://localhost:8000")?;

    // Subscribe to game events for background listening
    let mut event_receiver = game.subscribe_to_events().await;

    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_receiver.recv().await {
            match event {
                GameEvent::SessionSynced => println!("Synced with session"),
                GameEvent::SlotAssigned { slot } => match slot {
                    Some(slot) => println!("Playing as player {}", slot),
                    None => println!("Watching as spectator"),
                },
                GameEvent::BoardCreated {
                    width,
                    height,
                    mines,
                } => {
                    println!("New board: {}x{} with {} mines", width, height, mines);
                }
                GameEvent::BoardUpdated { changed_positions } => {
                    println!("{} cells updated", changed_positions.len());
                }
                GameEvent::TurnChanged { player, is_me } => {
                    if is_me {
                        println!("Your turn!");
                    } else {
                        println!("Waiting for player {}", player);
                    }
                }
                GameEvent::GameOver { won } => {
                    if won {
                        println!("All safe cells revealed - game won!");
                    } else {
                        println!("Mine hit - game lost!");
                    }
                }
                GameEvent::ConnectionLost => {
                    println!("Connection lost!");
                    break;
                }
            }
        }
    });

    // Create an idle session and, as host, pick a preset board.
    game.start_session(None).await?;
    println!(
        "Session started! ID: {}",
        game.session_id().await.unwrap_or_default()
    );

    game.create_preset(Preset::Beginner).await?;
    sleep(Duration::from_millis(100)).await;

    // First click places the mines (excluding the clicked cell), the second
    // one reveals.
    println!("\nFirst click at (4, 4) places the mines...");
    game.reveal(Pos { x: 4, y: 4 }).await?;
    sleep(Duration::from_millis(100)).await;

    println!("Second click reveals...");
    game.reveal(Pos { x: 4, y: 4 }).await?;
    sleep(Duration::from_millis(100)).await;

    let state = game.get_state().await;
    display_board(&state);

    // Flag a suspicious cell
    println!("\nFlagging cell (0, 0)...");
    game.flag(Pos { x: 0, y: 0 }).await?;
    sleep(Duration::from_millis(100)).await;

    let state = game.get_state().await;
    display_board(&state);
    if state.is_game_over() {
        println!("Game over! Won: {}", state.is_won());
    }

    game.disconnect().await?;
    println!("\nDisconnected from session");

    event_handler.abort();
    let _ = event_handler.await;

    Ok(())
}

fn display_board(state: &GameState) {
    let Some(board) = &state.board else {
        println!("No board yet");
        return;
    };

    println!("Board state:");
    for (y, row) in board.cells.iter().enumerate() {
        print!("  ");
        for cell in row {
            let symbol = match cell {
                CellView::Hidden => "·".to_string(),
                CellView::Flagged => "F".to_string(),
                CellView::Revealed { adjacent: 0 } => " ".to_string(),
                CellView::Revealed { adjacent } => adjacent.to_string(),
                CellView::Mine => "*".to_string(),
            };
            print!("{:2}", symbol);
        }
        println!("  {}", y);
    }

    print!("  ");
    for x in 0..board.width {
        print!("{:2}", x);
    }
    println!();
}
