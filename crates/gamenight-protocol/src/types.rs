//! Identity types shared by every layer above the transport.
//!
//! These are "newtype wrappers": a primitive wrapped in a named struct so
//! a `RoomId` can never be passed where a `PlayerId` is expected, even
//! though both are `u64` underneath.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A process-unique identifier for a player.
///
/// A player identity outlives any single connection: when a browser
/// reconnects and rejoins under the same name, the new connection is
/// bound to the existing `PlayerId`.
///
/// `#[serde(transparent)]` serializes `PlayerId(42)` as plain `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A process-unique identifier for a room.
///
/// Room codes are recycled once a room is swept, so players hold on to
/// the `RoomId` as well: a code that now names a *different* room is
/// detected by comparing ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// The short code players type to join a room, e.g. `"4821"`.
///
/// Always a 4-digit numeric string when produced by the room directory,
/// but clients can send anything, so it is stored as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a code string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}
