//! The shared game-state table.
//!
//! Every game variant moves through the same four states. Variants decide
//! *when* to move; this table decides *whether* a move is legal.
//!
//! ```text
//!                 start            start-turn
//! WaitingRoom ──────────→ TurnStart ──────────→ TurnActive
//!      ↑                      ↑                    │    │
//!      │                      └── timer / round ───┘    │
//!      │      rematch                                   │
//!      └─────────────── GameOver ←──── last card ───────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// The state tag of a game session.
///
/// Serialized in kebab-case (`"waiting-room"`, `"turn-start"`, ...) since
/// clients switch on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameState {
    /// Players gather, pick teams and settings.
    WaitingRoom,
    /// Waiting for the current player to start their turn.
    TurnStart,
    /// A turn is running and its timer is ticking.
    TurnActive,
    /// Final scores are shown.
    GameOver,
}

impl GameState {
    /// Every state, in table order.
    pub const ALL: [GameState; 4] = [
        GameState::WaitingRoom,
        GameState::TurnStart,
        GameState::TurnActive,
        GameState::GameOver,
    ];

    /// The states reachable from `self` in one step.
    pub fn successors(self) -> &'static [GameState] {
        match self {
            Self::WaitingRoom => &[Self::TurnStart],
            Self::TurnStart => &[Self::TurnActive],
            Self::TurnActive => &[Self::TurnStart, Self::GameOver],
            Self::GameOver => &[Self::WaitingRoom],
        }
    }

    /// Returns `true` if `self -> target` is an edge of the table.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.successors().contains(&target)
    }

    /// The wire name of this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaitingRoom => "waiting-room",
            Self::TurnStart => "turn-start",
            Self::TurnActive => "turn-active",
            Self::GameOver => "game-over",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
