//! The `GameSession` trait: the contract every game variant implements.
//!
//! The hub never branches on which game a room is running. It resolves
//! the room, runs the generic checks (in a room, room still exists, owner
//! where required), and hands the rest to the room's `Box<dyn GameSession>`
//! through these methods.
//!
//! Every method runs with the hub lock held, so a variant may read and
//! mutate its own state freely and broadcast through the
//! [`SessionContext`] before returning. An `Err` is reported to the
//! requester by the hub; variants don't send their own error messages.

use std::future::Future;
use std::pin::Pin;

use gamenight_protocol::{JoinGameRequest, PlayerId, RoomCode, RoomId};
use gamenight_timer::TimerTicket;
use serde_json::Value;

use crate::{GameState, RoomError, SessionContext};

/// One game instance, owned by its room.
///
/// Object-safe so rooms of different variants can sit in the same
/// directory. `Send` because the hub state is shared across tasks.
pub trait GameSession: Send + 'static {
    /// Current state tag.
    fn state(&self) -> GameState;

    /// The room's creator, already admitted as owner, joins the game.
    ///
    /// Sends `created-game` to the creator.
    fn add_player(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
    ) -> Result<(), RoomError>;

    /// A player joins.
    ///
    /// `is_new_player == false` means an existing player moved onto a new
    /// connection: send them a full snapshot and nobody else anything.
    /// Otherwise validate, admit the player via
    /// [`SessionContext::admit`] and update the whole room.
    fn join(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        is_new_player: bool,
        req: &JoinGameRequest,
    ) -> Result<(), RoomError>;

    /// Owner asked to start. The hub has already checked ownership.
    fn start(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
    ) -> Result<(), RoomError>;

    /// Owner asked for a rematch. The hub has already checked ownership.
    fn rematch(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
    ) -> Result<(), RoomError>;

    /// `player` (named `player_name`) was removed from the roster by the
    /// owner. Drop any per-player state and update the room.
    fn kick(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        player_name: &str,
    ) -> Result<(), RoomError>;

    /// Any action the hub doesn't handle itself.
    ///
    /// Return [`RoomError::UnknownAction`] for actions the variant
    /// doesn't know.
    fn handle_action(
        &mut self,
        ctx: &mut SessionContext<'_>,
        player: PlayerId,
        action: &str,
        body: &Value,
    ) -> Result<(), RoomError>;

    /// The turn timer started with `ticket` fired.
    ///
    /// Implementations call [`SessionCore::expire_turn`](crate::SessionCore::expire_turn)
    /// first and do nothing if it returns `false`.
    fn turn_expired(&mut self, ctx: &mut SessionContext<'_>, ticket: TimerTicket);
}

/// A boxed future, as returned by [`TurnExpiry::expire`].
pub type ExpiryFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Where a fired turn timer goes to get the lock back.
///
/// Implemented by the hub. The returned future acquires the hub lock,
/// resolves `(room, code)` and calls [`GameSession::turn_expired`]; if
/// the room is gone in the meantime it does nothing.
pub trait TurnExpiry: Send + Sync + 'static {
    fn expire(&self, room: RoomId, code: RoomCode, ticket: TimerTicket) -> ExpiryFuture;
}
