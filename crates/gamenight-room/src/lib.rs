//! Rooms and game sessions for Game Night.
//!
//! A room is a 4-digit code, a roster, and one game session. All of it
//! lives behind the hub lock, so nothing here spawns tasks of its own
//! except the turn timer.
//!
//! # Key types
//!
//! - [`GameSession`]: the trait each game variant implements
//! - [`SessionCore`]: state tag plus turn timer, embedded by variants
//! - [`GameState`]: the shared four-state table
//! - [`SessionContext`]: what a variant sees while handling an action
//! - [`RoomDirectory`]: code allocation, lookup, idle sweep
//! - [`GameCatalog`]: game type name to session factory
//! - [`TurnExpiry`]: how a fired timer gets back under the lock

mod catalog;
mod error;
mod logic;
mod machine;
mod manager;
mod room;
mod state;

pub use catalog::{GameCatalog, GameFactory};
pub use error::RoomError;
pub use logic::{ExpiryFuture, GameSession, TurnExpiry};
pub use machine::SessionCore;
pub use manager::{CODE_SPACE, MAX_CODE, MIN_CODE, RoomDirectory};
pub use room::{Room, RoomInfo, SessionContext};
pub use state::GameState;
