//! # Game Night
//!
//! Real-time hub for turn-based party games played from a browser.
//!
//! Players create a room, share its 4-digit code, and play a game variant
//! together over WebSocket. The hub owns every player and room behind one
//! lock; game variants implement [`GameSession`] and only ever see a
//! [`SessionContext`] for their own room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gamenight::prelude::*;
//!
//! # async fn run() -> Result<(), GameNightError> {
//! let server = GameNightServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .game(gamenight_fishbowl::GAME_TYPE, gamenight_fishbowl::new_session)
//!     .game(gamenight_codenames::GAME_TYPE, gamenight_codenames::new_session)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! [`GameSession`]: gamenight_room::GameSession
//! [`SessionContext`]: gamenight_room::SessionContext

mod config;
mod error;
mod handler;
mod hub;
mod server;

pub use config::HubConfig;
pub use error::GameNightError;
pub use hub::Hub;
pub use server::{GameNightServer, GameNightServerBuilder};

/// The types needed to run a server or write a game variant.
pub mod prelude {
    pub use crate::{GameNightError, GameNightServer, GameNightServerBuilder, Hub, HubConfig};
    pub use gamenight_protocol::{
        Event, IncomingMessage, OutgoingMessage, PlayerId, RoomCode, RoomId,
    };
    pub use gamenight_room::{
        GameCatalog, GameSession, GameState, RoomError, SessionContext, SessionCore,
    };
    pub use gamenight_timer::TimerTicket;
}
