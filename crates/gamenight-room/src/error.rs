//! Error types for the room layer.
//!
//! The `Display` text of user-facing variants is exactly what the client
//! shows, so it is written as a sentence for a player, not for a log.

use gamenight_protocol::{ProtocolError, RoomCode};
use gamenight_session::SessionError;

use crate::GameState;

/// Errors that can occur while handling a room or game action.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The sender has not created or joined a room.
    #[error("You are not in a game.")]
    NotInGame,

    /// No room is registered under this code.
    #[error("This room code does not exist.")]
    NotFound(RoomCode),

    /// The sender's room was swept (its code may even name a new room).
    #[error("This game no longer exists.")]
    Expired,

    /// Owner-only action from a non-owner.
    #[error("You are not the game owner.")]
    NotOwner,

    /// Turn action from someone whose turn it isn't.
    #[error("You are not the current player.")]
    NotCurrentPlayer,

    /// The move isn't an edge of the state table.
    #[error("You cannot perform that action at this time.")]
    InvalidTransition { from: GameState, to: GameState },

    /// The action is only allowed in some other state.
    #[error("You cannot perform that action at this time.")]
    WrongState(GameState),

    /// A new player tried to join after the waiting room closed.
    #[error("You cannot join a game that has already started.")]
    AlreadyStarted,

    /// `create-game` named a game type nobody registered.
    #[error("That game type does not exist.")]
    UnknownGameType(String),

    /// A create or join without a usable name.
    #[error("Please enter a name.")]
    MissingName,

    /// Every room code is taken.
    #[error("No room codes are available. Please try again later.")]
    DirectoryFull,

    /// A variant-specific rule rejected the action; the text is shown
    /// to the player as-is.
    #[error("{0}")]
    Rejected(String),

    /// Nobody handles this action string.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// The action body didn't decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The registry disagreed with the room. Never the player's fault.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RoomError {
    /// Shorthand for [`RoomError::Rejected`].
    pub fn rejected(text: impl Into<String>) -> Self {
        Self::Rejected(text.into())
    }

    /// Fatal errors tell the client its room is gone.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Expired)
    }

    /// Whether the requester is told about this error at all.
    ///
    /// Protocol problems and internal inconsistencies are only logged.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::UnknownAction(_) | Self::Protocol(_) | Self::Session(_)
        )
    }
}
