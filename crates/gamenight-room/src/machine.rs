//! `SessionCore`: the state tag and turn timer every variant embeds.
//!
//! The state field is private. The only way to change it is
//! [`SessionCore::transition`], which checks the table in
//! [`GameState::can_transition_to`] first and leaves the state untouched
//! on failure.

use std::sync::Arc;
use std::time::Duration;

use gamenight_timer::{TimerTicket, TurnTimer};
use tracing::debug;

use crate::{GameState, RoomError, SessionContext};

/// State tag plus the single turn timer of a game session.
#[derive(Debug)]
pub struct SessionCore {
    state: GameState,
    timer: TurnTimer,
}

impl Default for SessionCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCore {
    /// A fresh session in the waiting room with no timer.
    pub fn new() -> Self {
        Self {
            state: GameState::WaitingRoom,
            timer: TurnTimer::new(),
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// Checks `state -> to` without changing anything.
    ///
    /// Variants call this before mutating their own fields so that a
    /// rejected action leaves the whole session untouched.
    pub fn check_transition(&self, to: GameState) -> Result<(), RoomError> {
        if self.state.can_transition_to(to) {
            Ok(())
        } else {
            Err(RoomError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    /// Moves to `to` if the table allows it.
    pub fn transition(&mut self, to: GameState) -> Result<(), RoomError> {
        self.check_transition(to)?;
        debug!(from = %self.state, %to, "game state transition");
        self.state = to;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Turn timer
    // -----------------------------------------------------------------------

    /// Starts (or restarts) the turn timer for this room.
    ///
    /// On expiry the room's [`TurnExpiry`](crate::TurnExpiry) takes the
    /// hub lock and calls back into the session with the returned ticket.
    pub fn start_timer(
        &mut self,
        ctx: &SessionContext<'_>,
        duration: Duration,
    ) -> TimerTicket {
        let expiry = Arc::clone(ctx.expiry());
        let room = ctx.room_id();
        let code = ctx.room_code().clone();
        self.timer
            .start(duration, move |ticket| expiry.expire(room, code, ticket))
    }

    /// Cancels the turn timer. Returns the time it had left.
    pub fn stop_timer(&mut self) -> Option<Duration> {
        self.timer.stop()
    }

    /// Time left on the turn timer, if one is pending.
    pub fn timer_remaining(&self) -> Option<Duration> {
        self.timer.remaining()
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Handles a fired timer.
    ///
    /// Returns `true` only when `ticket` is the current timer *and* the
    /// session is still in `turn-active`; the state has then moved to
    /// `turn-start` and the variant should advance to the next turn. In
    /// every other case nothing changes and the expiry is stale.
    pub fn expire_turn(&mut self, ticket: TimerTicket) -> bool {
        if !self.timer.take_expired(ticket) {
            debug!(%ticket, "stale turn timer ignored");
            return false;
        }
        if self.state != GameState::TurnActive {
            debug!(%ticket, state = %self.state, "turn already over when timer fired");
            return false;
        }
        // TurnActive -> TurnStart is always in the table.
        self.state = GameState::TurnStart;
        debug!(%ticket, "turn ended by timer");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use gamenight_protocol::{RoomCode, RoomId};
    use gamenight_session::PlayerRegistry;

    use crate::{ExpiryFuture, RoomInfo, TurnExpiry};

    /// Records every expiry instead of taking a lock.
    #[derive(Default)]
    struct Recorder {
        fired: Mutex<Vec<TimerTicket>>,
    }

    impl TurnExpiry for Recorder {
        fn expire(&self, _room: RoomId, _code: RoomCode, ticket: TimerTicket) -> ExpiryFuture {
            if let Ok(mut fired) = self.fired.lock() {
                fired.push(ticket);
            }
            Box::pin(async {})
        }
    }

    fn walk_to(core: &mut SessionCore, target: GameState) {
        let path = [
            GameState::TurnStart,
            GameState::TurnActive,
            GameState::GameOver,
        ];
        for step in path {
            if core.state() == target {
                return;
            }
            core.transition(step).unwrap();
        }
    }

    #[test]
    fn test_transition_soundness_over_all_pairs() {
        for from in GameState::ALL {
            for to in GameState::ALL {
                let mut core = SessionCore::new();
                walk_to(&mut core, from);
                assert_eq!(core.state(), from);

                let result = core.transition(to);

                if from.can_transition_to(to) {
                    assert!(result.is_ok(), "{from} -> {to} should pass");
                    assert_eq!(core.state(), to);
                } else {
                    assert!(
                        matches!(result, Err(RoomError::InvalidTransition { .. })),
                        "{from} -> {to} should fail"
                    );
                    assert_eq!(core.state(), from, "state unchanged on rejection");
                }
            }
        }
    }

    #[test]
    fn test_check_transition_does_not_mutate() {
        let core = SessionCore::new();
        assert!(core.check_transition(GameState::TurnStart).is_ok());
        assert_eq!(core.state(), GameState::WaitingRoom);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_turn_current_ticket_in_turn_active_moves_to_turn_start() {
        let recorder: Arc<dyn TurnExpiry> = Arc::new(Recorder::default());
        let mut registry = PlayerRegistry::new();
        let mut info = RoomInfo::new(RoomId(1), RoomCode::new("1234"), "test");
        let ctx = SessionContext::new(&mut info, &mut registry, &recorder);

        let mut core = SessionCore::new();
        walk_to(&mut core, GameState::TurnActive);
        let ticket = core.start_timer(&ctx, Duration::from_secs(30));

        assert!(core.expire_turn(ticket));
        assert_eq!(core.state(), GameState::TurnStart);
        assert!(!core.timer_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_turn_after_turn_already_ended_is_noop() {
        let recorder: Arc<dyn TurnExpiry> = Arc::new(Recorder::default());
        let mut registry = PlayerRegistry::new();
        let mut info = RoomInfo::new(RoomId(1), RoomCode::new("1234"), "test");
        let ctx = SessionContext::new(&mut info, &mut registry, &recorder);

        let mut core = SessionCore::new();
        walk_to(&mut core, GameState::TurnActive);
        let ticket = core.start_timer(&ctx, Duration::from_secs(30));
        // A player action ends the turn before the timer gets the lock.
        core.transition(GameState::TurnStart).unwrap();

        assert!(!core.expire_turn(ticket));
        assert_eq!(core.state(), GameState::TurnStart);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_turn_replaced_ticket_is_noop() {
        let recorder: Arc<dyn TurnExpiry> = Arc::new(Recorder::default());
        let mut registry = PlayerRegistry::new();
        let mut info = RoomInfo::new(RoomId(1), RoomCode::new("1234"), "test");
        let ctx = SessionContext::new(&mut info, &mut registry, &recorder);

        let mut core = SessionCore::new();
        walk_to(&mut core, GameState::TurnActive);
        let old = core.start_timer(&ctx, Duration::from_secs(30));
        let new = core.start_timer(&ctx, Duration::from_secs(30));

        assert!(!core.expire_turn(old));
        assert_eq!(core.state(), GameState::TurnActive);
        assert!(core.expire_turn(new));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_timer_returns_remaining() {
        let recorder: Arc<dyn TurnExpiry> = Arc::new(Recorder::default());
        let mut registry = PlayerRegistry::new();
        let mut info = RoomInfo::new(RoomId(1), RoomCode::new("1234"), "test");
        let ctx = SessionContext::new(&mut info, &mut registry, &recorder);

        let mut core = SessionCore::new();
        core.start_timer(&ctx, Duration::from_secs(32));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(core.stop_timer(), Some(Duration::from_secs(30)));
        assert!(!core.timer_running());
        assert_eq!(core.stop_timer(), None);
    }
}
