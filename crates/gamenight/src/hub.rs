//! The hub: one lock around every player and every room.
//!
//! Every inbound action, every turn-timer expiry and every sweep takes
//! the same `tokio::sync::Mutex<HubState>`, so game code never sees two
//! things happen at once. Broadcasts are queued onto per-connection
//! channels while the lock is held; the socket writes happen on each
//! connection's writer task.
//!
//! ```text
//!   reader task ──handle_message──┐
//!   timer task ───TurnExpiry──────┼──→ Mutex<HubState> ──→ outbound queues
//!   sweeper ──────sweep───────────┘     (registry, rooms)     (writer tasks)
//! ```
//!
//! The hub handles room membership (`create-game`, `join-game`,
//! `kick-player`) and the owner-only `start-game` / `rematch` itself.
//! Every other action goes to the sender's game session unchanged.

use std::net::IpAddr;
use std::sync::{Arc, Weak};

use gamenight_protocol::{
    Codec, CreateGameRequest, HubAction, IncomingMessage, JoinGameRequest, JsonCodec,
    KickPlayerRequest, OutgoingMessage, PlayerId, RematchRequest, RoomCode, RoomId,
    StartGameRequest,
};
use gamenight_room::{
    ExpiryFuture, GameCatalog, GameState, Room, RoomDirectory, RoomError, TurnExpiry,
};
use gamenight_session::{Frame, PlayerRegistry, SessionError};
use gamenight_timer::TimerTicket;
use gamenight_transport::ConnectionId;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{GameNightError, HubConfig};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything behind the hub lock.
#[derive(Default)]
struct HubState {
    registry: PlayerRegistry,
    rooms: RoomDirectory,
}

struct HubInner {
    state: Mutex<HubState>,
    catalog: GameCatalog,
    config: HubConfig,
    expiry: Arc<dyn TurnExpiry>,
}

/// Shared handle to the hub. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

/// Routes fired turn timers back through the hub lock.
struct HubExpiry {
    hub: Weak<HubInner>,
}

impl TurnExpiry for HubExpiry {
    fn expire(&self, room: RoomId, code: RoomCode, ticket: TimerTicket) -> ExpiryFuture {
        let hub = self.hub.clone();
        Box::pin(async move {
            let Some(inner) = hub.upgrade() else {
                return;
            };
            let mut state = inner.state.lock().await;
            let HubState { registry, rooms } = &mut *state;
            match rooms.resolve(room, &code) {
                Ok(room) => {
                    let (game, mut ctx) = room.session(registry, &inner.expiry);
                    game.turn_expired(&mut ctx, ticket);
                }
                Err(_) => debug!(room_code = %code, %ticket, "timer fired for a room that is gone"),
            }
        })
    }
}

impl Hub {
    pub fn new(catalog: GameCatalog, config: HubConfig) -> Self {
        let inner = Arc::new_cyclic(|weak| HubInner {
            state: Mutex::new(HubState::default()),
            catalog,
            config,
            expiry: Arc::new(HubExpiry { hub: weak.clone() }),
        });
        Self { inner }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> &GameCatalog {
        &self.inner.catalog
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Registers a new connection.
    ///
    /// Returns the receiving end of its outbound queue; the caller's
    /// writer task drains it onto the socket. The queue closing means the
    /// connection was evicted or replaced by a rejoin.
    pub async fn connect(
        &self,
        conn: ConnectionId,
        origin: Option<IpAddr>,
    ) -> Result<mpsc::Receiver<Frame>, GameNightError> {
        let (tx, rx) = mpsc::channel(self.inner.config.outbound_buffer);
        let mut state = self.inner.state.lock().await;
        let player = state.registry.register(conn, origin, tx)?;
        info!(conn_id = %conn, player_id = %player, "connection opened");
        Ok(rx)
    }

    /// Registers a connection that presents the room code and name it
    /// played under before.
    ///
    /// If that name is on the room's roster the connection takes the
    /// player over at once, exactly like a rejoining `join-game`.
    /// Otherwise it is registered blank and nothing is sent.
    pub async fn register_resuming(
        &self,
        conn: ConnectionId,
        origin: Option<IpAddr>,
        resume: JoinGameRequest,
    ) -> Result<mpsc::Receiver<Frame>, GameNightError> {
        let (tx, rx) = mpsc::channel(self.inner.config.outbound_buffer);
        let mut state = self.inner.state.lock().await;
        let HubState { registry, rooms } = &mut *state;
        let blank = registry.register(conn, origin, tx)?;
        info!(conn_id = %conn, player_id = %blank, "connection opened");

        let Some(room) = rooms.get_mut(&resume.room_code) else {
            debug!(conn_id = %conn, room_code = %resume.room_code, "resume names an unknown room");
            return Ok(rx);
        };
        let Some(player) = roster_member(room, registry, resume.name.trim()) else {
            debug!(conn_id = %conn, room_code = %resume.room_code, "resume names an unknown player");
            return Ok(rx);
        };
        room.info_mut().touch();
        if let Err(err) = self.rejoin(room, registry, player, conn, &resume) {
            report(registry, conn, HubAction::JoinGame.as_str(), err);
        }
        Ok(rx)
    }

    /// Drops a connection. Its player stays in their room, disconnected.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let mut state = self.inner.state.lock().await;
        if let Some(player) = state.registry.unregister(conn) {
            info!(conn_id = %conn, player_id = %player, "connection closed");
        }
    }

    /// Handles one inbound frame from `conn`.
    ///
    /// Errors never escape: user-facing ones go back to the sender as an
    /// `error` event, the rest are logged.
    pub async fn handle_message(&self, conn: ConnectionId, data: &[u8]) {
        let msg: IncomingMessage = match JsonCodec.decode(data) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(conn_id = %conn, error = %e, "malformed message dropped");
                return;
            }
        };

        let mut state = self.inner.state.lock().await;
        debug!(conn_id = %conn, action = %msg.action, "incoming action");
        if let Err(err) = self.dispatch(&mut state, conn, &msg) {
            report(&mut state.registry, conn, &msg.action, err);
        }
    }

    fn dispatch(
        &self,
        state: &mut HubState,
        conn: ConnectionId,
        msg: &IncomingMessage,
    ) -> Result<(), RoomError> {
        match HubAction::lookup(&msg.action) {
            Some(HubAction::CreateGame) => self.create_game(state, conn, msg.decode_body()?),
            Some(HubAction::JoinGame) => self.join_game(state, conn, msg.decode_body()?),
            Some(HubAction::KickPlayer) => self.kick_player(state, conn, msg.decode_body()?),
            Some(HubAction::StartGame) => {
                let _: StartGameRequest = msg.decode_body()?;
                let (player, room, registry) = member_room(state, conn, true)?;
                let (game, mut ctx) = room.session(registry, &self.inner.expiry);
                game.start(&mut ctx, player)
            }
            Some(HubAction::Rematch) => {
                let _: RematchRequest = msg.decode_body()?;
                let (player, room, registry) = member_room(state, conn, true)?;
                let (game, mut ctx) = room.session(registry, &self.inner.expiry);
                game.rematch(&mut ctx, player)
            }
            None => {
                let (player, room, registry) = match member_room(state, conn, false) {
                    Err(RoomError::NotInGame) => {
                        return Err(RoomError::UnknownAction(msg.action.clone()));
                    }
                    other => other?,
                };
                let (game, mut ctx) = room.session(registry, &self.inner.expiry);
                game.handle_action(&mut ctx, player, &msg.action, &msg.body)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Hub actions
    // -----------------------------------------------------------------------

    fn create_game(
        &self,
        state: &mut HubState,
        conn: ConnectionId,
        req: CreateGameRequest,
    ) -> Result<(), RoomError> {
        let name = valid_name(&req.name)?;
        let game = self.inner.catalog.create(&req.game_type)?;
        let HubState { registry, rooms } = state;

        let player = fresh_identity(registry, conn)?;
        let room = rooms.create_room(&req.game_type, game)?;
        let (game, mut ctx) = room.session(registry, &self.inner.expiry);
        ctx.admit(player, name, true)?;
        info!(room_code = %ctx.room_code(), player_id = %player, name, "game created");
        game.add_player(&mut ctx, player)
    }

    fn join_game(
        &self,
        state: &mut HubState,
        conn: ConnectionId,
        req: JoinGameRequest,
    ) -> Result<(), RoomError> {
        let name = valid_name(&req.name)?.to_owned();
        let HubState { registry, rooms } = state;
        let room = rooms
            .get_mut(&req.room_code)
            .ok_or_else(|| RoomError::NotFound(req.room_code.clone()))?;
        room.info_mut().touch();

        if let Some(existing) = roster_member(room, registry, &name) {
            return self.rejoin(room, registry, existing, conn, &req);
        }

        if room.game().state() != GameState::WaitingRoom {
            return Err(RoomError::AlreadyStarted);
        }
        let player = fresh_identity(registry, conn)?;
        let req = JoinGameRequest {
            room_code: req.room_code,
            name,
        };
        info!(room_code = %req.room_code, player_id = %player, name = %req.name, "player joined");
        let (game, mut ctx) = room.session(registry, &self.inner.expiry);
        game.join(&mut ctx, player, true, &req)
    }

    /// Moves `player` onto `conn` and sends them a snapshot.
    fn rejoin(
        &self,
        room: &mut Room,
        registry: &mut PlayerRegistry,
        player: PlayerId,
        conn: ConnectionId,
        req: &JoinGameRequest,
    ) -> Result<(), RoomError> {
        let rebind = registry.rebind(player, conn)?;
        if rebind.origin_changed() {
            warn!(
                room_code = %req.room_code,
                player_id = %player,
                previous = ?rebind.previous_origin,
                current = ?rebind.origin,
                "player rejoined from a different address"
            );
        }
        info!(room_code = %req.room_code, player_id = %player, conn_id = %conn, "player rejoined");
        let (game, mut ctx) = room.session(registry, &self.inner.expiry);
        game.join(&mut ctx, player, false, req)
    }

    fn kick_player(
        &self,
        state: &mut HubState,
        conn: ConnectionId,
        req: KickPlayerRequest,
    ) -> Result<(), RoomError> {
        let (player, room, registry) = member_room(state, conn, true)?;
        if registry.get(player).is_some_and(|p| p.name() == req.player_name) {
            return Err(RoomError::rejected("You cannot kick yourself."));
        }
        let (game, mut ctx) = room.session(registry, &self.inner.expiry);
        let target = ctx.remove(&req.player_name)?;
        game.kick(&mut ctx, target, &req.player_name)
    }

    // -----------------------------------------------------------------------
    // Sweeping
    // -----------------------------------------------------------------------

    /// Removes rooms idle for longer than the configured timeout.
    ///
    /// Disconnected players of a swept room are forgotten; connected ones
    /// keep their (now dangling) room and get a fatal error on their next
    /// action. Returns the number of rooms removed.
    pub async fn sweep(&self) -> usize {
        let mut state = self.inner.state.lock().await;
        let HubState { registry, rooms } = &mut *state;
        let swept = rooms.sweep_idle(Instant::now(), self.inner.config.idle_timeout);
        for room in &swept {
            for player in room.info().players() {
                if registry.get(*player).is_some_and(|p| !p.is_connected()) {
                    registry.forget(*player);
                }
            }
        }
        if !swept.is_empty() {
            info!(swept = swept.len(), remaining = rooms.len(), "idle rooms swept");
        }
        swept.len()
    }

    /// Runs [`sweep`](Self::sweep) every `sweep_interval` until the hub is
    /// dropped.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let hub = Arc::downgrade(&self.inner);
        let period = self.inner.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = hub.upgrade() else {
                    break;
                };
                Hub { inner }.sweep().await;
            }
        })
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub async fn room_count(&self) -> usize {
        self.inner.state.lock().await.rooms.len()
    }

    /// Player records, connected or not.
    pub async fn player_count(&self) -> usize {
        self.inner.state.lock().await.registry.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.state.lock().await.registry.connection_count()
    }

    pub async fn room_state(&self, code: &RoomCode) -> Option<GameState> {
        let state = self.inner.state.lock().await;
        state.rooms.get(code).map(|room| room.game().state())
    }

    /// Names on a room's roster, in join order.
    pub async fn roster(&self, code: &RoomCode) -> Option<Vec<String>> {
        let state = self.inner.state.lock().await;
        let room = state.rooms.get(code)?;
        Some(
            room.info()
                .players()
                .iter()
                .filter_map(|id| state.registry.get(*id))
                .map(|p| p.name().to_owned())
                .collect(),
        )
    }

    /// The room code `conn`'s player is in, if that room still exists.
    pub async fn room_of(&self, conn: ConnectionId) -> Option<RoomCode> {
        let state = self.inner.state.lock().await;
        let room = state.registry.player_for(conn)?.room()?;
        state
            .rooms
            .codes()
            .find(|code| state.rooms.get(code).is_some_and(|r| r.id() == room))
            .cloned()
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("catalog", &self.inner.catalog)
            .field("config", &self.inner.config)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn valid_name(name: &str) -> Result<&str, RoomError> {
    let name = name.trim();
    if name.is_empty() {
        Err(RoomError::MissingName)
    } else {
        Ok(name)
    }
}

/// The identity `conn` should create or join a room with.
///
/// A connection whose player is already in a room gets a new blank
/// identity; the old one stays behind in its roster.
fn fresh_identity(registry: &mut PlayerRegistry, conn: ConnectionId) -> Result<PlayerId, RoomError> {
    let player = registry
        .player_for(conn)
        .ok_or(SessionError::UnknownConnection(conn))?;
    if player.room().is_some() {
        Ok(registry.fork(conn)?)
    } else {
        Ok(player.id())
    }
}

fn roster_member(room: &Room, registry: &PlayerRegistry, name: &str) -> Option<PlayerId> {
    room.info()
        .players()
        .iter()
        .copied()
        .find(|id| registry.get(*id).is_some_and(|p| p.name() == name))
}

/// Runs the checks every in-room action shares, in order: the sender is
/// in a room, that room still exists, (activity is recorded), the sender
/// owns it if `owner_only`.
fn member_room(
    state: &mut HubState,
    conn: ConnectionId,
    owner_only: bool,
) -> Result<(PlayerId, &mut Room, &mut PlayerRegistry), RoomError> {
    let HubState { registry, rooms } = state;
    let player = registry.player_for(conn).ok_or(RoomError::NotInGame)?;
    let (id, is_owner) = (player.id(), player.is_room_owner());
    let room_id = player.room().ok_or(RoomError::NotInGame)?;

    let room = rooms.find_by_id(room_id).ok_or(RoomError::Expired)?;
    room.info_mut().touch();
    if owner_only && !is_owner {
        return Err(RoomError::NotOwner);
    }
    Ok((id, room, registry))
}

fn report(registry: &mut PlayerRegistry, conn: ConnectionId, action: &str, err: RoomError) {
    if err.is_user_facing() {
        debug!(conn_id = %conn, action, error = %err, "action rejected");
        let msg = OutgoingMessage::error(err.to_string(), err.is_fatal());
        let _ = registry.broadcast().to(Some(conn), &msg).send();
        return;
    }
    match err {
        RoomError::Session(e) => error!(conn_id = %conn, action, error = %e, "registry inconsistency"),
        other => warn!(conn_id = %conn, action, error = %other, "action dropped"),
    }
}
