//! Error types for the protocol layer.
//!
//! Each crate in Game Night defines its own error enum. A `ProtocolError`
//! always means the bytes on the wire were the problem, never the game
//! state behind them.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a body missing a required field,
    /// or a field with the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates protocol rules, e.g. an action
    /// string nobody handles.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
