//! Unified error type for Game Night.

use gamenight_protocol::ProtocolError;
use gamenight_room::RoomError;
use gamenight_session::SessionError;
use gamenight_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GameNightError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry error (unknown or duplicate connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room or game error.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamenight_protocol::RoomCode;
    use gamenight_transport::ConnectionId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let wrapped: GameNightError = err.into();
        assert!(matches!(wrapped, GameNightError::Transport(_)));
        assert!(wrapped.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let wrapped: GameNightError = err.into();
        assert!(matches!(wrapped, GameNightError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AlreadyRegistered(ConnectionId::new(3));
        let wrapped: GameNightError = err.into();
        assert!(matches!(wrapped, GameNightError::Session(_)));
    }

    #[test]
    fn test_from_room_error_keeps_user_text() {
        let err = RoomError::NotFound(RoomCode::new("1234"));
        let wrapped: GameNightError = err.into();
        assert!(matches!(wrapped, GameNightError::Room(_)));
        assert_eq!(wrapped.to_string(), "This room code does not exist.");
    }
}
