//! Codenames for Game Night.
//!
//! Two teams face a board of 25 words. Each team has a spymaster, who
//! sees which words belong to which team, and a guesser, who doesn't. A
//! turn goes:
//!
//! ```text
//! turn-start:  spymaster gives a clue and a card count   (start-turn)
//! turn-active: guesser picks up to that many cards        (end-turn)
//! ```
//!
//! Picks are revealed in order. A miss (a bystander or the other team's
//! agent) ends the turn early, and the assassin loses the game outright.
//! The first team to uncover all of its agents wins. With the timer
//! turned on, guessers who run out of time pass the turn without a pick.
//!
//! Register it with the hub under [`GAME_TYPE`]:
//!
//! ```
//! use gamenight_room::GameCatalog;
//!
//! let catalog = GameCatalog::new().with(gamenight_codenames::GAME_TYPE, gamenight_codenames::new_session);
//! assert!(catalog.contains("codenames"));
//! ```

pub mod api;
mod board;
mod game;

use gamenight_room::GameSession;

pub use api::{CardOwner, CodenamesAction, Role, Settings};
pub use board::{BOARD_SIZE, Board, TEAM_CARDS};
pub use game::{Codenames, NUM_TEAMS, Seats};

/// The name clients use in `create-game`.
pub const GAME_TYPE: &str = "codenames";

/// A fresh session with default settings and a newly dealt board.
pub fn new_session() -> Box<dyn GameSession> {
    Box::new(Codenames::default())
}
