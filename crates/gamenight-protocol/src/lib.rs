//! Wire protocol for Game Night.
//!
//! This crate defines the "language" browsers and the server speak:
//!
//! - **Identity types** ([`PlayerId`], [`RoomId`], [`RoomCode`]).
//! - **Envelopes** ([`IncomingMessage`], [`OutgoingMessage`], [`Event`])
//!   and the hub-level request bodies.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become
//!   bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer doesn't know about connections, players or rooms.
//! It only knows the shape of a message.
//!
//! ```text
//! Transport (bytes) → Protocol (envelope) → Hub (player + room context)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod message;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use message::{
    CreateGameRequest, Event, HubAction, IncomingMessage, JoinGameRequest,
    KickPlayerRequest, OutgoingMessage, RematchRequest, StartGameRequest,
    decode_body,
};
pub use types::{PlayerId, RoomCode, RoomId};
