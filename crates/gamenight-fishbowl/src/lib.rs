//! Fishbowl for Game Night.
//!
//! Every player drops a few words into the bowl. Teams take turns: the
//! current player draws cards and gets their team to guess them before
//! the clock runs out. The same deck is played once per round, and each
//! round is harder than the last:
//!
//! ```text
//! round 0: describe  (any words except the card)
//! round 1: single    (exactly one word)
//! round 2: charades  (no words)
//! ```
//!
//! A turn cut short by the end of a round carries its remaining time into
//! the next round. The game ends after the last round, or as soon as the
//! leading team can no longer be caught.
//!
//! Register it with the hub under [`GAME_TYPE`]:
//!
//! ```
//! use gamenight_room::GameCatalog;
//!
//! let catalog = GameCatalog::new().with(gamenight_fishbowl::GAME_TYPE, gamenight_fishbowl::new_session);
//! assert!(catalog.contains("fishbowl"));
//! ```

pub mod api;
mod convert;
mod game;

use gamenight_room::GameSession;

pub use api::{FishbowlAction, Round, Settings};
pub use game::{Fishbowl, TURN_GRACE_SECS};

/// The name clients use in `create-game`.
pub const GAME_TYPE: &str = "fishbowl";

/// A fresh session with default settings.
pub fn new_session() -> Box<dyn GameSession> {
    Box::new(Fishbowl::default())
}
