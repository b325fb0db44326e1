//! Message envelopes and hub-level request bodies.
//!
//! Every frame a browser sends is an [`IncomingMessage`]:
//!
//! ```text
//! { "action": "join-game", "body": { "roomCode": "4821", "name": "Bob" } }
//! ```
//!
//! The `action` string picks the handler; the `body` stays an untyped
//! JSON value until that handler knows which request struct to decode it
//! into. Hub actions ([`HubAction`]) are decoded here; anything else is
//! forwarded untouched to the room's game.
//!
//! Every frame the server sends is an [`OutgoingMessage`]:
//!
//! ```text
//! { "event": "error", "error": "You are not the game owner.", "body": null }
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::{ProtocolError, RoomCode};

// ---------------------------------------------------------------------------
// Inbound envelope
// ---------------------------------------------------------------------------

/// A message from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Which operation the client wants, e.g. `"start-turn"`.
    pub action: String,

    /// Action-specific payload. Missing and `null` both mean "no fields".
    #[serde(default)]
    pub body: Value,
}

impl IncomingMessage {
    /// Builds a message. Mostly useful in tests and clients.
    pub fn new(action: impl Into<String>, body: Value) -> Self {
        Self {
            action: action.into(),
            body,
        }
    }

    /// Decodes the body into a concrete request type.
    ///
    /// A `null` body is treated as `{}` so that field-less requests like
    /// `start-game` decode even when the client omits the body.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the body doesn't match `T`.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        decode_body(&self.body)
    }
}

/// Decodes an action body, treating `null` as an empty object.
///
/// Game variants receive the raw body value rather than the whole
/// envelope, so this is exposed on its own as well.
pub fn decode_body<T: DeserializeOwned>(body: &Value) -> Result<T, ProtocolError> {
    let result = match body {
        Value::Null => T::deserialize(&Value::Object(Map::new())),
        body => T::deserialize(body),
    };
    result.map_err(ProtocolError::Decode)
}

// ---------------------------------------------------------------------------
// Outbound envelope
// ---------------------------------------------------------------------------

/// The kind of update an [`OutgoingMessage`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Event {
    /// Sent only to the creator of a room.
    CreatedGame,
    /// Roster or settings changed while the room is in the waiting room.
    UpdatedRoom,
    /// Game state changed after the game started.
    UpdatedGame,
    /// Something the requester did was rejected.
    Error,
}

impl Event {
    /// The wire name of this event.
    pub fn as_str(self) -> &'static str {
        match self {
            Event::CreatedGame => "created-game",
            Event::UpdatedRoom => "updated-room",
            Event::UpdatedGame => "updated-game",
            Event::Error => "error",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message to a client.
///
/// Generic over the body so game variants can broadcast their own typed
/// event structs without first converting them to a `serde_json::Value`.
/// The default body type is `Value`, which is what clients (and tests)
/// decode into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage<B = Value> {
    pub event: Event,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When true the client should drop back to the landing page: the
    /// room it was talking to is gone.
    #[serde(default, skip_serializing_if = "is_false")]
    pub error_is_fatal: bool,

    pub body: B,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl<B> OutgoingMessage<B> {
    /// Builds a non-error message.
    pub fn new(event: Event, body: B) -> Self {
        Self {
            event,
            error: None,
            error_is_fatal: false,
            body,
        }
    }
}

impl OutgoingMessage<Value> {
    /// Builds an `error` event with a user-facing message and no body.
    pub fn error(text: impl Into<String>, fatal: bool) -> Self {
        Self {
            event: Event::Error,
            error: Some(text.into()),
            error_is_fatal: fatal,
            body: Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Hub actions
// ---------------------------------------------------------------------------

/// Actions the hub handles itself, for every game type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HubAction {
    CreateGame,
    JoinGame,
    KickPlayer,
    StartGame,
    Rematch,
}

impl HubAction {
    /// Every hub action, in wire order.
    pub const ALL: [HubAction; 5] = [
        HubAction::CreateGame,
        HubAction::JoinGame,
        HubAction::KickPlayer,
        HubAction::StartGame,
        HubAction::Rematch,
    ];

    /// Maps a wire action string to a hub action.
    ///
    /// Returns `None` for actions that belong to a game variant.
    pub fn lookup(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == action)
    }

    /// The wire name of this action.
    pub fn as_str(self) -> &'static str {
        match self {
            HubAction::CreateGame => "create-game",
            HubAction::JoinGame => "join-game",
            HubAction::KickPlayer => "kick-player",
            HubAction::StartGame => "start-game",
            HubAction::Rematch => "rematch",
        }
    }
}

impl fmt::Display for HubAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `create-game`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub game_type: String,
    pub name: String,
}

/// Body of `join-game`. Also presented by a resuming connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    pub room_code: RoomCode,
    pub name: String,
}

/// Body of `kick-player`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickPlayerRequest {
    pub player_name: String,
}

/// Body of `start-game`. Carries no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGameRequest {}

/// Body of `rematch`. Carries no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RematchRequest {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =====================================================================
    // IncomingMessage
    // =====================================================================

    #[test]
    fn test_incoming_message_missing_body_defaults_to_null() {
        let msg: IncomingMessage =
            serde_json::from_str(r#"{"action":"start-game"}"#).unwrap();
        assert_eq!(msg.action, "start-game");
        assert!(msg.body.is_null());
    }

    #[test]
    fn test_decode_body_null_body_decodes_empty_request() {
        let msg = IncomingMessage::new("rematch", Value::Null);
        let req: RematchRequest = msg.decode_body().unwrap();
        assert_eq!(req, RematchRequest {});
    }

    #[test]
    fn test_decode_body_join_game_reads_camel_case_fields() {
        let msg = IncomingMessage::new(
            "join-game",
            json!({ "roomCode": "4821", "name": "Bob" }),
        );
        let req: JoinGameRequest = msg.decode_body().unwrap();
        assert_eq!(req.room_code, RoomCode::new("4821"));
        assert_eq!(req.name, "Bob");
    }

    #[test]
    fn test_decode_body_missing_field_returns_decode_error() {
        let msg = IncomingMessage::new("kick-player", json!({}));
        let result: Result<KickPlayerRequest, _> = msg.decode_body();
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    // =====================================================================
    // OutgoingMessage
    // =====================================================================

    #[test]
    fn test_outgoing_message_new_omits_error_fields() {
        let msg = OutgoingMessage::new(Event::UpdatedRoom, json!({ "teams": [] }));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({ "event": "updated-room", "body": { "teams": [] } }));
    }

    #[test]
    fn test_outgoing_message_error_non_fatal_omits_fatal_flag() {
        let msg = OutgoingMessage::error("You are not the game owner.", false);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "error",
                "error": "You are not the game owner.",
                "body": null,
            })
        );
    }

    #[test]
    fn test_outgoing_message_error_fatal_sets_camel_case_flag() {
        let msg = OutgoingMessage::error("This game no longer exists.", true);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["errorIsFatal"], json!(true));
    }

    #[test]
    fn test_outgoing_message_typed_body_serializes_inline() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Created {
            room_code: RoomCode,
        }
        let msg = OutgoingMessage::new(
            Event::CreatedGame,
            Created { room_code: RoomCode::new("1234") },
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "created-game");
        assert_eq!(value["body"]["roomCode"], "1234");
    }

    #[test]
    fn test_outgoing_message_decodes_back_into_value_body() {
        let json = r#"{"event":"updated-game","body":{"state":"turn-start"}}"#;
        let msg: OutgoingMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.event, Event::UpdatedGame);
        assert_eq!(msg.error, None);
        assert!(!msg.error_is_fatal);
        assert_eq!(msg.body["state"], "turn-start");
    }

    // =====================================================================
    // HubAction / Event
    // =====================================================================

    #[test]
    fn test_hub_action_lookup_known_actions() {
        for action in HubAction::ALL {
            assert_eq!(HubAction::lookup(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_hub_action_lookup_game_action_returns_none() {
        assert_eq!(HubAction::lookup("start-turn"), None);
        assert_eq!(HubAction::lookup(""), None);
    }

    #[test]
    fn test_event_display_matches_serde_name() {
        for event in [Event::CreatedGame, Event::UpdatedRoom, Event::UpdatedGame, Event::Error] {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{event}\""));
        }
    }
}
