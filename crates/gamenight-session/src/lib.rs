//! Player identity and message fan-out for Game Night.
//!
//! This crate handles everything between "a socket connected" and "a
//! player is in a room":
//!
//! 1. **Registry**: which connection belongs to which player
//!    ([`PlayerRegistry`]), including the rejoin path that moves an
//!    existing player onto a new connection ([`PlayerRegistry::rebind`]).
//! 2. **Broadcast**: sending a primary message to one connection and a
//!    secondary message to everyone else in scope ([`Broadcast`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub (above)          ← owns the registry behind the hub mutex
//!     ↕
//! Session (this crate) ← player identity and outbound queues
//!     ↕
//! Protocol / Transport ← PlayerId, RoomId, ConnectionId, codecs
//! ```

mod broadcast;
mod error;
mod player;
mod registry;

pub use broadcast::{Broadcast, Delivery, Frame, Scope};
pub use error::SessionError;
pub use player::Player;
pub use registry::{PlayerRegistry, Rebind};
