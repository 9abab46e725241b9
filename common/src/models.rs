use serde::{Deserialize, Serialize};

/// Maximum number of cells a board may hold, inherited from the display
/// ceiling of the original engine.
pub const MAX_CELLS: usize = 2800;

/// Maximum number of player slots per session. Further connections join as
/// spectators.
pub const MAX_PLAYERS: u8 = 4;

/// A cell as seen by clients. The server never leaks mine positions through
/// this type: hidden cells look identical whether mined or not, and `Mine`
/// only appears once the cell has actually been revealed.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "state")]
pub enum CellView {
    #[serde(rename = "hidden")]
    Hidden,
    #[serde(rename = "flagged")]
    Flagged,
    #[serde(rename = "revealed")]
    Revealed { adjacent: u8 },
    #[serde(rename = "mine")]
    Mine,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct GameParams {
    pub width: usize,
    pub height: usize,
    pub mines: usize,
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            width: 9,
            height: 9,
            mines: 10,
        }
    }
}

impl GameParams {
    /// Dimension check only; an excessive mine count is clamped by the
    /// server rather than rejected.
    pub fn dimensions_valid(&self) -> bool {
        self.width >= 1
            && self.height >= 1
            && self
                .width
                .checked_mul(self.height)
                .is_some_and(|cells| cells <= MAX_CELLS)
    }
}

/// Fixed difficulty tiers, pure parameter bundles over a create command.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Beginner,
    Intermediate,
    Expert,
}

impl From<Preset> for GameParams {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Beginner => GameParams {
                width: 9,
                height: 9,
                mines: 10,
            },
            Preset::Intermediate => GameParams {
                width: 16,
                height: 16,
                mines: 40,
            },
            Preset::Expert => GameParams {
                width: 16,
                height: 30,
                mines: 99,
            },
        }
    }
}

/// Session lifecycle. `Idle` means no board has been created yet; terminal
/// states are only left through a new create command.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    InProgress,
    Won,
    Lost,
}

impl SessionStatus {
    pub fn is_over(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_params_match_networked_tiers() {
        let beginner: GameParams = Preset::Beginner.into();
        assert_eq!((beginner.width, beginner.height, beginner.mines), (9, 9, 10));

        let intermediate: GameParams = Preset::Intermediate.into();
        assert_eq!(
            (intermediate.width, intermediate.height, intermediate.mines),
            (16, 16, 40)
        );

        let expert: GameParams = Preset::Expert.into();
        assert_eq!((expert.width, expert.height, expert.mines), (16, 30, 99));
    }

    #[test]
    fn default_params_are_beginner_sized() {
        assert_eq!(GameParams::default(), Preset::Beginner.into());
    }

    #[test]
    fn dimension_ceiling() {
        let ok = GameParams {
            width: 35,
            height: 80,
            mines: 10,
        };
        assert!(ok.dimensions_valid());

        let too_big = GameParams {
            width: 35,
            height: 81,
            mines: 10,
        };
        assert!(!too_big.dimensions_valid());

        let degenerate = GameParams {
            width: 0,
            height: 5,
            mines: 0,
        };
        assert!(!degenerate.dimensions_valid());
    }
}
