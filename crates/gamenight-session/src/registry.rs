//! The player registry: which connection belongs to which player.
//!
//! The registry owns two maps that must always agree:
//!
//! ```text
//!   bindings: ConnectionId ──→ Binding { player, outbound, origin }
//!   players:  PlayerId     ──→ Player  { connection, room, ... }
//! ```
//!
//! A binding exists for every live connection. A player exists for every
//! live connection *and* for every disconnected player still sitting in a
//! room roster, so they can rejoin later.
//!
//! # Concurrency note
//!
//! `PlayerRegistry` is not thread-safe by itself. It lives inside the
//! hub's state behind the single hub mutex, together with the room
//! directory, so a lookup and the mutation that follows it can never
//! interleave with another task.

use std::collections::HashMap;
use std::net::IpAddr;

use gamenight_protocol::{PlayerId, RoomId};
use gamenight_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::broadcast::Broadcast;
use crate::{Frame, Player, SessionError};

/// The per-connection half of the registry.
struct Binding {
    player: PlayerId,
    outbound: mpsc::Sender<Frame>,
    origin: Option<IpAddr>,
}

/// Outcome of [`PlayerRegistry::rebind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebind {
    /// The connection that was bound to the player before, now evicted.
    pub stale: Option<ConnectionId>,
    /// The player's origin before the rebind.
    pub previous_origin: Option<IpAddr>,
    /// The origin of the connection that took over.
    pub origin: Option<IpAddr>,
}

impl Rebind {
    /// True when both origins are known and differ.
    pub fn origin_changed(&self) -> bool {
        matches!((self.previous_origin, self.origin), (Some(a), Some(b)) if a != b)
    }
}

/// Maps live connections to player identities.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ admit() ──→ unregister() ──→ rebind() (rejoin)
///     │             │             │
///     ▼             ▼             ▼
///  [blank]      [in room]   [disconnected] ──(room swept)──→ forget()
/// ```
#[derive(Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
    bindings: HashMap<ConnectionId, Binding>,
    next_player_id: u64,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> PlayerId {
        self.next_player_id += 1;
        PlayerId(self.next_player_id)
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Binds a new connection to a fresh, blank player.
    ///
    /// `outbound` is the sending half of the connection's bounded queue;
    /// the writer task owns the receiving half.
    ///
    /// # Errors
    /// [`SessionError::AlreadyRegistered`] if the connection is bound.
    pub fn register(
        &mut self,
        conn: ConnectionId,
        origin: Option<IpAddr>,
        outbound: mpsc::Sender<Frame>,
    ) -> Result<PlayerId, SessionError> {
        if self.bindings.contains_key(&conn) {
            return Err(SessionError::AlreadyRegistered(conn));
        }

        let id = self.allocate_id();
        self.players.insert(id, Player::blank(id, conn, origin));
        self.bindings.insert(
            conn,
            Binding {
                player: id,
                outbound,
                origin,
            },
        );

        tracing::debug!(conn_id = %conn, player_id = %id, "connection registered");
        Ok(id)
    }

    /// Drops a connection's binding and its outbound queue.
    ///
    /// A blank player goes with it. A player in a room stays behind,
    /// disconnected, so they can rejoin under the same name.
    ///
    /// Returns the player the connection was bound to, or `None` if it
    /// was already gone (e.g. evicted by a broadcast).
    pub fn unregister(&mut self, conn: ConnectionId) -> Option<PlayerId> {
        let binding = self.bindings.remove(&conn)?;
        self.release(binding.player, conn);
        tracing::debug!(conn_id = %conn, player_id = %binding.player, "connection unregistered");
        Some(binding.player)
    }

    /// Removes a connection whose outbound queue is full or closed.
    pub(crate) fn evict(&mut self, conn: ConnectionId) {
        if let Some(binding) = self.bindings.remove(&conn) {
            self.release(binding.player, conn);
            tracing::warn!(conn_id = %conn, player_id = %binding.player, "evicted slow or closed connection");
        }
    }

    /// Detaches `player` from `conn`; discards the player if it is blank.
    fn release(&mut self, player: PlayerId, conn: ConnectionId) {
        let Some(record) = self.players.get_mut(&player) else {
            return;
        };
        if record.connection == Some(conn) {
            record.connection = None;
        }
        if record.room.is_none() && record.connection.is_none() {
            self.players.remove(&player);
        }
    }

    // -----------------------------------------------------------------------
    // Identity changes
    // -----------------------------------------------------------------------

    /// Moves `player` onto `conn` (the rejoin path).
    ///
    /// Everything is validated before anything changes. Then:
    ///
    /// 1. The player's previous connection, if it is a different one, is
    ///    evicted: its binding and outbound queue are dropped, which ends
    ///    its writer task and closes the socket.
    /// 2. `conn` is re-pointed at `player`.
    /// 3. The identity `conn` carried before is released (discarded if
    ///    blank, left disconnected if it was in a room).
    ///
    /// Rebinding a player to the connection it already has is a no-op.
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`] or [`SessionError::UnknownPlayer`].
    pub fn rebind(
        &mut self,
        player: PlayerId,
        conn: ConnectionId,
    ) -> Result<Rebind, SessionError> {
        let binding = self
            .bindings
            .get(&conn)
            .ok_or(SessionError::UnknownConnection(conn))?;
        let record = self
            .players
            .get(&player)
            .ok_or(SessionError::UnknownPlayer(player))?;

        let previous_identity = binding.player;
        let origin = binding.origin;
        let previous_origin = record.origin;
        let stale = record.connection.filter(|c| *c != conn);

        if let Some(stale_conn) = stale {
            self.bindings.remove(&stale_conn);
            tracing::info!(conn_id = %stale_conn, player_id = %player, "stale connection replaced on rejoin");
        }

        if let Some(binding) = self.bindings.get_mut(&conn) {
            binding.player = player;
        }
        if let Some(record) = self.players.get_mut(&player) {
            record.connection = Some(conn);
            record.origin = origin;
        }
        if previous_identity != player {
            self.release(previous_identity, conn);
        }

        Ok(Rebind {
            stale,
            previous_origin,
            origin,
        })
    }

    /// Gives `conn` a fresh blank identity.
    ///
    /// Used when a connection whose player is already in a room creates or
    /// joins another one: the old player stays in its roster, disconnected,
    /// and the connection starts over.
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`].
    pub fn fork(&mut self, conn: ConnectionId) -> Result<PlayerId, SessionError> {
        let binding = self
            .bindings
            .get(&conn)
            .ok_or(SessionError::UnknownConnection(conn))?;
        let previous = binding.player;
        let origin = binding.origin;

        let id = self.allocate_id();
        self.players.insert(id, Player::blank(id, conn, origin));
        if let Some(binding) = self.bindings.get_mut(&conn) {
            binding.player = id;
        }
        self.release(previous, conn);

        tracing::debug!(conn_id = %conn, from = %previous, to = %id, "connection forked to a new identity");
        Ok(id)
    }

    /// Records that `player` joined `room` under `name`.
    ///
    /// # Errors
    /// [`SessionError::UnknownPlayer`].
    pub fn admit(
        &mut self,
        player: PlayerId,
        room: RoomId,
        name: &str,
        is_room_owner: bool,
    ) -> Result<(), SessionError> {
        let record = self
            .players
            .get_mut(&player)
            .ok_or(SessionError::UnknownPlayer(player))?;
        record.name = name.to_owned();
        record.room = Some(room);
        record.is_room_owner = is_room_owner;
        Ok(())
    }

    /// Clears the player's room (kick, or a stale room on re-create).
    ///
    /// A disconnected player has nothing left to hold on to afterwards
    /// and is discarded.
    ///
    /// # Errors
    /// [`SessionError::UnknownPlayer`].
    pub fn detach(&mut self, player: PlayerId) -> Result<(), SessionError> {
        let record = self
            .players
            .get_mut(&player)
            .ok_or(SessionError::UnknownPlayer(player))?;
        record.room = None;
        record.is_room_owner = false;
        if record.connection.is_none() {
            self.players.remove(&player);
        }
        Ok(())
    }

    /// Removes a player record outright, along with any binding it has.
    ///
    /// Called for the disconnected players of a swept room.
    pub fn forget(&mut self, player: PlayerId) -> Option<Player> {
        let record = self.players.remove(&player)?;
        if let Some(conn) = record.connection {
            self.bindings.remove(&conn);
        }
        Some(record)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// The player bound to a live connection.
    pub fn player_for(&self, conn: ConnectionId) -> Option<&Player> {
        let binding = self.bindings.get(&conn)?;
        self.players.get(&binding.player)
    }

    pub fn get(&self, player: PlayerId) -> Option<&Player> {
        self.players.get(&player)
    }

    /// True if the connection currently has a binding.
    pub fn is_registered(&self, conn: ConnectionId) -> bool {
        self.bindings.contains_key(&conn)
    }

    /// Number of player records, connected or not.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.bindings.len()
    }

    // -----------------------------------------------------------------------
    // Broadcast
    // -----------------------------------------------------------------------

    /// Starts a broadcast. See [`Broadcast`].
    pub fn broadcast(&mut self) -> Broadcast<'_> {
        Broadcast::new(self)
    }

    /// Every binding as `(connection, room of its player, queue)`.
    pub(crate) fn targets(
        &self,
    ) -> impl Iterator<Item = (ConnectionId, Option<RoomId>, &mpsc::Sender<Frame>)> {
        self.bindings.iter().map(|(conn, binding)| {
            let room = self.players.get(&binding.player).and_then(|p| p.room);
            (*conn, room, &binding.outbound)
        })
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `PlayerRegistry`.
    //!
    //! Naming: `test_{function}_{scenario}_{expected}`.

    use super::*;
    use std::net::Ipv4Addr;

    // -- Helpers ----------------------------------------------------------

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn ip(last: u8) -> Option<IpAddr> {
        Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)))
    }

    fn queue() -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        mpsc::channel(8)
    }

    // =====================================================================
    // register() / unregister()
    // =====================================================================

    #[test]
    fn test_register_new_connection_creates_blank_player() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();

        let id = reg.register(conn(1), ip(1), tx).unwrap();

        let player = reg.player_for(conn(1)).expect("bound");
        assert_eq!(player.id(), id);
        assert_eq!(player.name(), "");
        assert_eq!(player.room(), None);
        assert_eq!(player.connection(), Some(conn(1)));
        assert_eq!(player.origin(), ip(1));
    }

    #[test]
    fn test_register_twice_returns_already_registered() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        reg.register(conn(1), None, tx.clone()).unwrap();

        let result = reg.register(conn(1), None, tx);

        assert!(matches!(result, Err(SessionError::AlreadyRegistered(c)) if c == conn(1)));
    }

    #[test]
    fn test_register_allocates_distinct_player_ids() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let a = reg.register(conn(1), None, tx.clone()).unwrap();
        let b = reg.register(conn(2), None, tx).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unregister_blank_player_discards_player() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let id = reg.register(conn(1), None, tx).unwrap();

        assert_eq!(reg.unregister(conn(1)), Some(id));

        assert!(reg.get(id).is_none());
        assert!(reg.is_empty());
        assert_eq!(reg.connection_count(), 0);
    }

    #[test]
    fn test_unregister_player_in_room_keeps_disconnected_player() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let id = reg.register(conn(1), None, tx).unwrap();
        reg.admit(id, RoomId(1), "Alice", true).unwrap();

        reg.unregister(conn(1));

        let player = reg.get(id).expect("player persists");
        assert!(!player.is_connected());
        assert_eq!(player.room(), Some(RoomId(1)));
        assert!(reg.player_for(conn(1)).is_none());
    }

    #[test]
    fn test_unregister_closes_outbound_queue() {
        let mut reg = PlayerRegistry::new();
        let (tx, mut rx) = queue();
        reg.register(conn(1), None, tx).unwrap();

        reg.unregister(conn(1));

        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_unregister_unknown_connection_returns_none() {
        let mut reg = PlayerRegistry::new();
        assert_eq!(reg.unregister(conn(9)), None);
    }

    // =====================================================================
    // rebind()
    // =====================================================================

    #[test]
    fn test_rebind_disconnected_player_moves_to_new_connection() {
        let mut reg = PlayerRegistry::new();
        let (tx1, _rx1) = queue();
        let alice = reg.register(conn(1), ip(1), tx1).unwrap();
        reg.admit(alice, RoomId(1), "Alice", true).unwrap();
        reg.unregister(conn(1));

        let (tx2, _rx2) = queue();
        let blank = reg.register(conn(2), ip(1), tx2).unwrap();
        let outcome = reg.rebind(alice, conn(2)).unwrap();

        assert_eq!(outcome.stale, None);
        assert!(!outcome.origin_changed());
        assert_eq!(reg.player_for(conn(2)).unwrap().id(), alice);
        assert!(reg.get(blank).is_none(), "blank identity is discarded");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_rebind_connected_player_evicts_stale_connection() {
        let mut reg = PlayerRegistry::new();
        let (tx1, mut rx1) = queue();
        let alice = reg.register(conn(1), ip(1), tx1).unwrap();
        reg.admit(alice, RoomId(1), "Alice", true).unwrap();

        let (tx2, _rx2) = queue();
        reg.register(conn(2), ip(2), tx2).unwrap();
        let outcome = reg.rebind(alice, conn(2)).unwrap();

        assert_eq!(outcome.stale, Some(conn(1)));
        assert!(outcome.origin_changed());
        assert!(!reg.is_registered(conn(1)));
        assert!(matches!(
            rx1.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert_eq!(reg.get(alice).unwrap().origin(), ip(2));
    }

    #[test]
    fn test_rebind_same_connection_is_noop() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let alice = reg.register(conn(1), None, tx).unwrap();
        reg.admit(alice, RoomId(1), "Alice", false).unwrap();

        let outcome = reg.rebind(alice, conn(1)).unwrap();

        assert_eq!(outcome.stale, None);
        assert_eq!(reg.player_for(conn(1)).unwrap().id(), alice);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_rebind_unknown_connection_changes_nothing() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let alice = reg.register(conn(1), None, tx).unwrap();
        reg.admit(alice, RoomId(1), "Alice", false).unwrap();

        let result = reg.rebind(alice, conn(7));

        assert!(matches!(result, Err(SessionError::UnknownConnection(_))));
        assert_eq!(reg.player_for(conn(1)).unwrap().id(), alice);
    }

    #[test]
    fn test_rebind_unknown_player_changes_nothing() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let blank = reg.register(conn(1), None, tx).unwrap();

        let result = reg.rebind(PlayerId(99), conn(1));

        assert!(matches!(result, Err(SessionError::UnknownPlayer(_))));
        assert_eq!(reg.player_for(conn(1)).unwrap().id(), blank);
    }

    // =====================================================================
    // fork() / admit() / detach() / forget()
    // =====================================================================

    #[test]
    fn test_fork_player_in_room_leaves_old_identity_disconnected() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let old = reg.register(conn(1), ip(3), tx).unwrap();
        reg.admit(old, RoomId(1), "Alice", true).unwrap();

        let new = reg.fork(conn(1)).unwrap();

        assert_ne!(old, new);
        assert_eq!(reg.player_for(conn(1)).unwrap().id(), new);
        assert_eq!(reg.get(new).unwrap().origin(), ip(3));
        let old_record = reg.get(old).expect("still in its room");
        assert!(!old_record.is_connected());
    }

    #[test]
    fn test_admit_sets_name_room_and_owner() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let id = reg.register(conn(1), None, tx).unwrap();

        reg.admit(id, RoomId(4), "Bob", false).unwrap();

        let player = reg.get(id).unwrap();
        assert_eq!(player.name(), "Bob");
        assert_eq!(player.room(), Some(RoomId(4)));
        assert!(!player.is_room_owner());
    }

    #[test]
    fn test_detach_connected_player_clears_room() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let id = reg.register(conn(1), None, tx).unwrap();
        reg.admit(id, RoomId(4), "Bob", true).unwrap();

        reg.detach(id).unwrap();

        let player = reg.get(id).unwrap();
        assert_eq!(player.room(), None);
        assert!(!player.is_room_owner());
    }

    #[test]
    fn test_detach_disconnected_player_discards_it() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let id = reg.register(conn(1), None, tx).unwrap();
        reg.admit(id, RoomId(4), "Bob", false).unwrap();
        reg.unregister(conn(1));

        reg.detach(id).unwrap();

        assert!(reg.get(id).is_none());
    }

    #[test]
    fn test_forget_removes_player_and_binding() {
        let mut reg = PlayerRegistry::new();
        let (tx, _rx) = queue();
        let id = reg.register(conn(1), None, tx).unwrap();
        reg.admit(id, RoomId(4), "Bob", false).unwrap();

        let forgotten = reg.forget(id).expect("existed");

        assert_eq!(forgotten.name(), "Bob");
        assert!(reg.get(id).is_none());
        assert!(!reg.is_registered(conn(1)));
    }
}
