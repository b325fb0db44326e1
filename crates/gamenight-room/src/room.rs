//! A room: its code, its roster, and the game session it owns.
//!
//! Rooms are plain data behind the hub lock. Any code that has a
//! `&mut Room` already holds that lock, so nothing here synchronizes.
//!
//! Game variants never see the [`Room`] itself. They get a
//! [`SessionContext`] that borrows the room's metadata and the player
//! registry side by side, which is everything a handler needs: who is in
//! the room, how to reach them, and how to get back in when a timer fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gamenight_protocol::{PlayerId, RoomCode, RoomId};
use gamenight_session::{Broadcast, Player, PlayerRegistry, Scope};
use gamenight_transport::ConnectionId;
use serde::Serialize;
use tokio::time::Instant;

use crate::{GameSession, RoomError, TurnExpiry};

/// Process-wide counter for room ids. Codes get reused; ids never do.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_room_id() -> RoomId {
    RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed))
}

// ---------------------------------------------------------------------------
// RoomInfo
// ---------------------------------------------------------------------------

/// Everything about a room except its game.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    id: RoomId,
    code: RoomCode,
    game_type: String,
    /// Roster, in join order. Kicked players are removed; disconnected
    /// ones stay.
    players: Vec<PlayerId>,
    last_interaction: Instant,
}

impl RoomInfo {
    pub fn new(id: RoomId, code: RoomCode, game_type: impl Into<String>) -> Self {
        Self {
            id,
            code,
            game_type: game_type.into(),
            players: Vec::new(),
            last_interaction: Instant::now(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn game_type(&self) -> &str {
        &self.game_type
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn last_interaction(&self) -> Instant {
        self.last_interaction
    }

    /// Records activity; rooms idle for too long are swept.
    pub fn touch(&mut self) {
        self.last_interaction = Instant::now();
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A room in the directory.
pub struct Room {
    info: RoomInfo,
    game: Box<dyn GameSession>,
}

impl Room {
    pub fn new(info: RoomInfo, game: Box<dyn GameSession>) -> Self {
        Self { info, game }
    }

    pub fn info(&self) -> &RoomInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut RoomInfo {
        &mut self.info
    }

    pub fn id(&self) -> RoomId {
        self.info.id
    }

    pub fn code(&self) -> &RoomCode {
        &self.info.code
    }

    pub fn game(&self) -> &dyn GameSession {
        self.game.as_ref()
    }

    /// Splits the room into its game and a context for calling into it.
    pub fn session<'a>(
        &'a mut self,
        registry: &'a mut PlayerRegistry,
        expiry: &'a Arc<dyn TurnExpiry>,
    ) -> (&'a mut dyn GameSession, SessionContext<'a>) {
        let ctx = SessionContext::new(&mut self.info, registry, expiry);
        (self.game.as_mut(), ctx)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("info", &self.info)
            .field("state", &self.game.state())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

/// What a game variant can see and do while handling one action.
pub struct SessionContext<'a> {
    room: &'a mut RoomInfo,
    registry: &'a mut PlayerRegistry,
    expiry: &'a Arc<dyn TurnExpiry>,
}

impl<'a> SessionContext<'a> {
    pub fn new(
        room: &'a mut RoomInfo,
        registry: &'a mut PlayerRegistry,
        expiry: &'a Arc<dyn TurnExpiry>,
    ) -> Self {
        Self {
            room,
            registry,
            expiry,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room.id
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room.code
    }

    pub fn game_type(&self) -> &str {
        &self.room.game_type
    }

    /// The room's roster, in join order.
    pub fn roster(&self) -> &[PlayerId] {
        &self.room.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.registry.get(id)
    }

    /// Finds a roster member by name. Names are matched exactly.
    pub fn find_player(&self, name: &str) -> Option<PlayerId> {
        self.room
            .players
            .iter()
            .copied()
            .find(|id| self.registry.get(*id).is_some_and(|p| p.name() == name))
    }

    /// The live connection of a player, if they have one.
    pub fn connection_of(&self, id: PlayerId) -> Option<ConnectionId> {
        self.registry.get(id).and_then(Player::connection)
    }

    /// Adds `player` to the roster under `name`.
    pub fn admit(
        &mut self,
        player: PlayerId,
        name: &str,
        is_room_owner: bool,
    ) -> Result<(), RoomError> {
        self.registry
            .admit(player, self.room.id, name, is_room_owner)?;
        if !self.room.players.contains(&player) {
            self.room.players.push(player);
        }
        Ok(())
    }

    /// Removes the roster member called `name`.
    ///
    /// The player keeps their connection (if any) but is no longer in a
    /// room, so broadcasts to this room stop reaching them.
    pub fn remove(&mut self, name: &str) -> Result<PlayerId, RoomError> {
        let id = self
            .find_player(name)
            .ok_or_else(|| RoomError::rejected("That player is not in the game."))?;
        self.room.players.retain(|p| *p != id);
        self.registry.detach(id)?;
        tracing::info!(room_code = %self.room.code, player_id = %id, "player removed from room");
        Ok(id)
    }

    /// Starts a broadcast on the registry.
    pub fn broadcast(&mut self) -> Broadcast<'_> {
        self.registry.broadcast()
    }

    /// The scope that reaches every connected roster member.
    pub fn scope(&self) -> Scope {
        Scope::Room(self.room.id)
    }

    /// Sends `msg` to one player only. Does nothing if they're offline.
    pub fn send_to<M: Serialize>(&mut self, player: PlayerId, msg: &M) {
        let conn = self.connection_of(player);
        let _ = self.registry.broadcast().to(conn, msg).send();
    }

    /// Sends `primary` to `player` and `secondary` to the rest of the room.
    pub fn send_split<P: Serialize, S: Serialize>(
        &mut self,
        player: Option<PlayerId>,
        primary: &P,
        secondary: &S,
    ) {
        let conn = player.and_then(|p| self.connection_of(p));
        let scope = self.scope();
        let _ = self
            .registry
            .broadcast()
            .to(conn, primary)
            .to_scope(scope, secondary)
            .send();
    }

    /// Sends the same message to everyone in the room.
    pub fn send_room<M: Serialize>(&mut self, msg: &M) {
        let scope = self.scope();
        let _ = self.registry.broadcast().to_scope(scope, msg).send();
    }

    pub fn expiry(&self) -> &Arc<dyn TurnExpiry> {
        self.expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use gamenight_timer::TimerTicket;
    use tokio::sync::mpsc;

    use crate::ExpiryFuture;

    struct NoExpiry;

    impl TurnExpiry for NoExpiry {
        fn expire(&self, _: RoomId, _: RoomCode, _: TimerTicket) -> ExpiryFuture {
            Box::pin(async {})
        }
    }

    fn registered(
        registry: &mut PlayerRegistry,
        conn: u64,
    ) -> (PlayerId, mpsc::Receiver<gamenight_session::Frame>) {
        let (tx, rx) = mpsc::channel(8);
        let id = registry
            .register(ConnectionId::new(conn), None, tx)
            .unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn test_admit_and_find_player_by_name() {
        let expiry: Arc<dyn TurnExpiry> = Arc::new(NoExpiry);
        let mut registry = PlayerRegistry::new();
        let (alice, _rx) = registered(&mut registry, 1);
        let mut info = RoomInfo::new(RoomId(7), RoomCode::new("4821"), "fishbowl");
        let mut ctx = SessionContext::new(&mut info, &mut registry, &expiry);

        ctx.admit(alice, "alice", true).unwrap();

        assert_eq!(ctx.roster(), &[alice]);
        assert_eq!(ctx.find_player("alice"), Some(alice));
        assert_eq!(ctx.find_player("Alice"), None);
        assert!(ctx.player(alice).unwrap().is_room_owner());
    }

    #[tokio::test]
    async fn test_remove_unknown_name_is_rejected() {
        let expiry: Arc<dyn TurnExpiry> = Arc::new(NoExpiry);
        let mut registry = PlayerRegistry::new();
        let mut info = RoomInfo::new(RoomId(7), RoomCode::new("4821"), "fishbowl");
        let mut ctx = SessionContext::new(&mut info, &mut registry, &expiry);

        let err = ctx.remove("nobody").unwrap_err();
        assert_eq!(err.to_string(), "That player is not in the game.");
    }

    #[tokio::test]
    async fn test_remove_takes_player_out_of_room_scope() {
        let expiry: Arc<dyn TurnExpiry> = Arc::new(NoExpiry);
        let mut registry = PlayerRegistry::new();
        let (alice, mut alice_rx) = registered(&mut registry, 1);
        let (bob, mut bob_rx) = registered(&mut registry, 2);
        let mut info = RoomInfo::new(RoomId(7), RoomCode::new("4821"), "fishbowl");
        let mut ctx = SessionContext::new(&mut info, &mut registry, &expiry);
        ctx.admit(alice, "alice", true).unwrap();
        ctx.admit(bob, "bob", false).unwrap();

        assert_eq!(ctx.remove("bob").unwrap(), bob);
        ctx.send_room(&"hello");

        assert_eq!(ctx.roster(), &[alice]);
        assert!(alice_rx.try_recv().is_ok());
        assert!(bob_rx.try_recv().is_err());
        assert!(ctx.player(bob).is_some_and(|p| p.room().is_none()));
    }

    #[tokio::test]
    async fn test_send_split_primary_gets_only_its_copy() {
        let expiry: Arc<dyn TurnExpiry> = Arc::new(NoExpiry);
        let mut registry = PlayerRegistry::new();
        let (alice, mut alice_rx) = registered(&mut registry, 1);
        let (bob, mut bob_rx) = registered(&mut registry, 2);
        let mut info = RoomInfo::new(RoomId(7), RoomCode::new("4821"), "fishbowl");
        let mut ctx = SessionContext::new(&mut info, &mut registry, &expiry);
        ctx.admit(alice, "alice", true).unwrap();
        ctx.admit(bob, "bob", false).unwrap();

        ctx.send_split(Some(alice), &"with-card", &"without-card");

        assert_eq!(&*alice_rx.try_recv().unwrap(), b"\"with-card\"");
        assert!(alice_rx.try_recv().is_err());
        assert_eq!(&*bob_rx.try_recv().unwrap(), b"\"without-card\"");
    }
}
