//! Codenames wire types: settings, action bodies, and the events sent to
//! players. Field names are camelCase on the wire.

use std::fmt;

use gamenight_protocol::RoomCode;
use gamenight_room::GameState;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Owner-editable game settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Whether guessers race a clock once the clue is given.
    pub use_timer: bool,
    /// Seconds the guessers get, when `use_timer` is set.
    pub timer_length: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_timer: false,
            timer_length: 60,
        }
    }
}

impl Settings {
    /// Returns `false` for settings no game could be played with.
    pub fn is_playable(&self) -> bool {
        !self.use_timer || self.timer_length > 0
    }
}

// ---------------------------------------------------------------------------
// Seats and cards
// ---------------------------------------------------------------------------

/// The two seats at each team's side of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sees the key and gives the clue.
    Spymaster,
    /// Picks cards from the clue.
    Guesser,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Spymaster => "spymaster",
            Role::Guesser => "guesser",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a card belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardOwner {
    /// One of the two teams' agents.
    Team(usize),
    /// An innocent bystander: ends the turn, scores nothing.
    Neutral,
    /// Picking it loses the game on the spot.
    Assassin,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Actions handled by a Codenames session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodenamesAction {
    MovePlayer,
    ChangeSettings,
    StartTurn,
    EndTurn,
}

impl CodenamesAction {
    pub const ALL: [CodenamesAction; 4] = [
        CodenamesAction::MovePlayer,
        CodenamesAction::ChangeSettings,
        CodenamesAction::StartTurn,
        CodenamesAction::EndTurn,
    ];

    pub fn lookup(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == action)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CodenamesAction::MovePlayer => "move-player",
            CodenamesAction::ChangeSettings => "change-settings",
            CodenamesAction::StartTurn => "start-turn",
            CodenamesAction::EndTurn => "end-turn",
        }
    }
}

impl fmt::Display for CodenamesAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `move-player`. The seat's previous occupant, if any, takes the
/// moved player's old seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePlayerRequest {
    pub player_name: String,
    pub to_team: usize,
    #[serde(default)]
    pub to_team_spymaster_role: bool,
}

impl MovePlayerRequest {
    pub fn role(&self) -> Role {
        if self.to_team_spymaster_role {
            Role::Spymaster
        } else {
            Role::Guesser
        }
    }
}

/// Body of `change-settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSettingsRequest {
    pub settings: Settings,
}

/// Body of `start-turn`: the spymaster's clue count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTurnRequest {
    pub num_cards: usize,
}

/// Body of `end-turn`: the guesser's picks, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndTurnRequest {
    #[serde(default)]
    pub cards: Vec<String>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A player as the other players see them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_room_owner: bool,
}

/// One team's seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamView {
    pub spymaster: Option<PlayerView>,
    pub guesser: Option<PlayerView>,
}

/// One card on the board.
///
/// `owner` is always filled in for spymasters; everyone else only learns
/// it once the card has been guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<CardOwner>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub guessed: bool,
}

/// Body of `created-game`, sent to the room's creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGameEvent {
    pub room_code: RoomCode,
    pub game_type: String,
    pub teams: Vec<TeamView>,
}

/// Body of `updated-room`, sent while the game is in the waiting room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedRoomEvent {
    pub game_type: String,
    pub teams: Vec<TeamView>,
    pub settings: Settings,
}

/// Body of `updated-game`, sent once the game has started.
///
/// `game_type`, `teams` and `settings` are only filled in for a rejoin
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedGameEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<TeamView>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,

    pub state: GameState,
    pub board: Vec<CardView>,
    /// The running clue's card count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_cards: Option<usize>,
    /// When the guessers' clock started, in milliseconds since the Unix
    /// epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_server_time: Option<u64>,
    /// Seconds on the guessers' clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_length: Option<u64>,
    /// The picks of the last finished turn.
    pub last_guesses: Vec<String>,
    /// Unguessed agents per team.
    pub num_cards_left: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_team: Option<usize>,
    pub currently_playing_team: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_default_wire_shape() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value, json!({ "useTimer": false, "timerLength": 60 }));
    }

    #[test]
    fn test_is_playable_rejects_zero_timer_only_when_used() {
        assert!(Settings::default().is_playable());
        let untimed = Settings {
            use_timer: false,
            timer_length: 0,
        };
        let broken = Settings {
            use_timer: true,
            timer_length: 0,
        };
        assert!(untimed.is_playable());
        assert!(!broken.is_playable());
    }

    #[test]
    fn test_action_lookup_round_trips_every_action() {
        for action in CodenamesAction::ALL {
            assert_eq!(CodenamesAction::lookup(action.as_str()), Some(action));
        }
        assert_eq!(CodenamesAction::lookup("change-card"), None);
    }

    #[test]
    fn test_card_owner_wire_names() {
        assert_eq!(serde_json::to_value(CardOwner::Team(1)).unwrap(), json!({ "team": 1 }));
        assert_eq!(serde_json::to_value(CardOwner::Neutral).unwrap(), json!("neutral"));
        assert_eq!(serde_json::to_value(CardOwner::Assassin).unwrap(), json!("assassin"));
    }

    #[test]
    fn test_move_player_role_defaults_to_guesser() {
        let req: MovePlayerRequest =
            serde_json::from_value(json!({ "playerName": "bob", "toTeam": 1 })).unwrap();
        assert_eq!(req.role(), Role::Guesser);
    }

    #[test]
    fn test_card_view_hides_unknown_owner() {
        let hidden = CardView {
            word: "ANCHOR".into(),
            owner: None,
            guessed: false,
        };
        assert_eq!(serde_json::to_value(hidden).unwrap(), json!({ "word": "ANCHOR" }));
    }
}
