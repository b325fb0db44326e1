//! The player record: who someone is, independent of how they're connected.
//!
//! A player is created blank when a connection registers, gets a name and
//! a room when a create or join succeeds, and survives disconnects for as
//! long as it sits in a room's roster.
//!
//! ```text
//!   register ──→ [blank] ──(create/join)──→ [in room, connected]
//!                   │                          │        ↑
//!              unregister               unregister    rebind
//!                   │                          ▼        │
//!                   ▼                    [in room, disconnected]
//!               (dropped)
//! ```

use std::net::IpAddr;

use gamenight_protocol::{PlayerId, RoomId};
use gamenight_transport::ConnectionId;

/// A single player known to the server.
///
/// Fields are private: only the [`PlayerRegistry`](crate::PlayerRegistry)
/// mutates them, so the connection ↔ player maps can't drift apart.
#[derive(Debug, Clone)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) connection: Option<ConnectionId>,
    pub(crate) origin: Option<IpAddr>,
    pub(crate) name: String,
    pub(crate) room: Option<RoomId>,
    pub(crate) is_room_owner: bool,
}

impl Player {
    pub(crate) fn blank(
        id: PlayerId,
        connection: ConnectionId,
        origin: Option<IpAddr>,
    ) -> Self {
        Self {
            id,
            connection: Some(connection),
            origin,
            name: String::new(),
            room: None,
            is_room_owner: false,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// The live connection, or `None` while the player is disconnected.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    /// Last-known remote IP, compared when someone rejoins under this
    /// player's name.
    pub fn origin(&self) -> Option<IpAddr> {
        self.origin
    }

    /// Display name; empty until the player creates or joins a room.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn room(&self) -> Option<RoomId> {
        self.room
    }

    pub fn is_room_owner(&self) -> bool {
        self.is_room_owner
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}
