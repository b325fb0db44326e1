//! Fishbowl wire types: settings, action bodies, and the events sent to
//! players. Field names are camelCase on the wire.

use std::fmt;

use gamenight_protocol::RoomCode;
use gamenight_room::GameState;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// How the cards are acted out in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Round {
    /// Describe the card with any words except the ones on it.
    Describe,
    /// Exactly one word.
    #[serde(rename = "single")]
    SingleWord,
    /// No words at all.
    Charades,
}

/// Owner-editable game settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub rounds: Vec<Round>,
    /// Seconds per turn, before the start-of-turn grace period.
    pub timer_length: u64,
    pub num_words_required: usize,
    pub max_skips_per_turn: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rounds: vec![Round::Describe, Round::SingleWord, Round::Charades],
            timer_length: 30,
            num_words_required: 5,
            max_skips_per_turn: 1,
        }
    }
}

impl Settings {
    /// Returns `false` for settings no game could be played with.
    pub fn is_playable(&self) -> bool {
        !self.rounds.is_empty() && self.timer_length > 0
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Actions handled by a Fishbowl session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FishbowlAction {
    AddTeam,
    RemoveTeam,
    MovePlayer,
    ChangeSettings,
    SubmitWords,
    StartTurn,
    ChangeCard,
}

impl FishbowlAction {
    pub const ALL: [FishbowlAction; 7] = [
        FishbowlAction::AddTeam,
        FishbowlAction::RemoveTeam,
        FishbowlAction::MovePlayer,
        FishbowlAction::ChangeSettings,
        FishbowlAction::SubmitWords,
        FishbowlAction::StartTurn,
        FishbowlAction::ChangeCard,
    ];

    pub fn lookup(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == action)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FishbowlAction::AddTeam => "add-team",
            FishbowlAction::RemoveTeam => "remove-team",
            FishbowlAction::MovePlayer => "move-player",
            FishbowlAction::ChangeSettings => "change-settings",
            FishbowlAction::SubmitWords => "submit-words",
            FishbowlAction::StartTurn => "start-turn",
            FishbowlAction::ChangeCard => "change-card",
        }
    }
}

impl fmt::Display for FishbowlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `add-team`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTeamRequest {}

/// Body of `remove-team`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveTeamRequest {
    pub team: usize,
}

/// Body of `move-player`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePlayerRequest {
    pub player_name: String,
    pub from_team: usize,
    pub to_team: usize,
}

/// Body of `change-settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSettingsRequest {
    pub settings: Settings,
}

/// Body of `submit-words`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitWordsRequest {
    pub words: Vec<String>,
}

/// Body of `start-turn`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTurnRequest {}

/// What the current player did with the card in front of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Correct,
    Skip,
}

/// Body of `change-card`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeCardRequest {
    pub change_type: ChangeType,
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
    pub words_submitted: bool,
}

/// Body of `created-game`, sent to the room's creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGameEvent {
    pub room_code: RoomCode,
    pub game_type: String,
    pub teams: Vec<Vec<PlayerView>>,
}

/// Body of `updated-room`, sent while the game is in the waiting room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedRoomEvent {
    pub game_type: String,
    pub teams: Vec<Vec<PlayerView>>,
    pub settings: Settings,
}

/// Body of `updated-game`, sent once the game has started.
///
/// `game_type`, `teams` and `settings` are only filled in for a rejoin
/// snapshot. `current_card` is only in the current player's copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedGameEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<Vec<PlayerView>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,

    pub state: GameState,
    /// When the running turn started, in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_server_time: Option<u64>,
    /// Seconds on the running turn's clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_length: Option<u64>,
    pub last_card_guessed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_card: Option<String>,
    pub total_num_cards: usize,
    pub num_cards_left_in_round: usize,
    pub num_cards_guessed_in_turn: u32,
    pub team_scores_by_round: Vec<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_team: Option<usize>,
    pub current_round: usize,
    pub current_players: Vec<usize>,
    pub currently_playing_team: usize,
}
