use serde::{Deserialize, Serialize};

use crate::models::{CellView, GameParams, Pos, Preset, SessionStatus};

/// Commands a client may send. Every command carries an implicit sender
/// identity (the connection it arrived on); the server resolves that to a
/// player slot before validating turn order and authority.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "action")]
pub enum ClientMessage {
    #[serde(rename = "reveal")]
    Reveal { pos: Pos },
    #[serde(rename = "flag")]
    Flag { pos: Pos },
    #[serde(rename = "create")]
    Create {
        #[serde(default)]
        params: GameParams,
    },
    #[serde(rename = "preset")]
    Preset { preset: Preset },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellUpdate {
    pub pos: Pos,
    pub value: CellView,
}

/// Full board snapshot, sent only inside `Init` so that late joiners can
/// catch up; everything afterwards is incremental.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BoardSnapshot {
    pub width: usize,
    pub height: usize,
    pub mines: usize,
    pub cells: Vec<Vec<CellView>>,
}

/// Notifications broadcast by the server. Clients render incrementally from
/// these, in the exact order the authority applied the mutations.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Complete session state, sent once to each connection when it joins.
    #[serde(rename = "init")]
    Init {
        status: SessionStatus,
        current_turn: u8,
        players: u8,
        board: Option<BoardSnapshot>,
    },
    /// The slot assigned to the receiving connection. `None` marks a
    /// spectator. Re-sent whenever a disconnect renumbers the slots.
    #[serde(rename = "slot")]
    SlotAssigned { slot: Option<u8> },
    #[serde(rename = "board")]
    BoardCreated {
        width: usize,
        height: usize,
        mines: usize,
    },
    /// Batched cell reveals from a single command, cascade included.
    #[serde(rename = "update")]
    Update { updates: Vec<CellUpdate> },
    #[serde(rename = "flagged")]
    CellFlagged { pos: Pos, flagged: bool },
    #[serde(rename = "turn")]
    TurnChanged { player: u8 },
    #[serde(rename = "won")]
    GameWon,
    #[serde(rename = "lost")]
    GameLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"reveal","pos":{"x":3,"y":4}}"#).unwrap();
        match msg {
            ClientMessage::Reveal { pos } => assert_eq!((pos.x, pos.y), (3, 4)),
            other => panic!("unexpected message: {other:?}"),
        }

        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"preset","preset":"expert"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Preset {
                preset: Preset::Expert
            }
        ));
    }

    #[test]
    fn create_params_default_on_missing_input() {
        // Malformed or absent dimension input at the boundary falls back to
        // the default board instead of surfacing an error.
        let msg: ClientMessage = serde_json::from_str(r#"{"action":"create"}"#).unwrap();
        match msg {
            ClientMessage::Create { params } => assert_eq!(params, GameParams::default()),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn notifications_round_trip() {
        let text = serde_json::to_string(&ServerMessage::TurnChanged { player: 2 }).unwrap();
        assert_eq!(text, r#"{"type":"turn","player":2}"#);

        let text = serde_json::to_string(&ServerMessage::SlotAssigned { slot: None }).unwrap();
        assert_eq!(text, r#"{"type":"slot","slot":null}"#);

        let update = ServerMessage::Update {
            updates: vec![CellUpdate {
                pos: Pos { x: 0, y: 0 },
                value: CellView::Revealed { adjacent: 1 },
            }],
        };
        let parsed: ServerMessage =
            serde_json::from_str(&serde_json::to_string(&update).unwrap()).unwrap();
        match parsed {
            ServerMessage::Update { updates } => {
                assert_eq!(updates[0].value, CellView::Revealed { adjacent: 1 })
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
