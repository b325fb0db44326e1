//! Error types for the session layer.

use gamenight_protocol::PlayerId;
use gamenight_transport::ConnectionId;

/// Errors raised by the [`PlayerRegistry`](crate::PlayerRegistry).
///
/// None of these are caused by a player doing something wrong; they mean
/// a caller asked about a connection or player the registry doesn't know.
/// The hub logs them at `error` and sends nothing to the client.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection has no binding: it was never registered, or it was
    /// already unregistered or evicted.
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// No player record exists for this id.
    #[error("player {0} not found")]
    UnknownPlayer(PlayerId),

    /// `register` was called twice for the same connection.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
}
