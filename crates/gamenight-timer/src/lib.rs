//! Cancellable turn timer for Game Night.
//!
//! A turn-based game only needs one clock per room: "this turn ends in
//! 32 seconds unless something else ends it first". [`TurnTimer`] is that
//! clock. It holds at most one pending expiry task at a time.
//!
//! # Racing user input
//!
//! The expiry task runs on its own, outside the hub lock. When its sleep
//! finishes it has to go back through the lock like any player action,
//! and by then the turn may already be over. Every start hands out a new
//! [`TimerTicket`]; the callback receives the ticket it was started with
//! and the game checks [`TurnTimer::is_current`] under the lock before
//! touching any state.
//!
//! ```text
//!   start(t1) ──sleep──→ fire(t1) ──wait for lock──→ is_current(t1)?
//!        │                                              │
//!   start(t2) / stop()                              no → ignore
//!   (t1 is no longer current)
//! ```
//!
//! Cancelling also aborts the sleeping task, so in the common case a
//! stale expiry never even reaches the lock; the ticket check covers the
//! window where it already has.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// TimerTicket
// ---------------------------------------------------------------------------

/// Identifies one start of a [`TurnTimer`].
///
/// Tickets are only meaningful for the timer that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTicket(u64);

impl TimerTicket {
    /// Returns the underlying sequence number.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TurnTimer
// ---------------------------------------------------------------------------

struct ActiveTimer {
    ticket: TimerTicket,
    started_at: Instant,
    duration: Duration,
    handle: JoinHandle<()>,
}

/// A single-slot, cancellable delayed callback.
///
/// Owned by a game session and only touched while the hub lock is held.
/// Dropping the timer (e.g. when its room is swept) aborts the pending
/// task.
#[derive(Default)]
pub struct TurnTimer {
    next_ticket: u64,
    active: Option<ActiveTimer>,
}

impl TurnTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the timer, replacing any pending one.
    ///
    /// After `duration`, `on_expire` is called with the returned ticket on
    /// a spawned task. The previous ticket (if any) stops being current
    /// and its task is aborted.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F, Fut>(&mut self, duration: Duration, on_expire: F) -> TimerTicket
    where
        F: FnOnce(TimerTicket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.active.take() {
            previous.handle.abort();
            trace!(ticket = %previous.ticket, "turn timer replaced");
        }

        self.next_ticket += 1;
        let ticket = TimerTicket(self.next_ticket);
        let started_at = Instant::now();
        let deadline = started_at + duration;

        let handle = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            trace!(%ticket, "turn timer fired");
            on_expire(ticket).await;
        });

        debug!(%ticket, secs = duration.as_secs_f64(), "turn timer started");
        self.active = Some(ActiveTimer {
            ticket,
            started_at,
            duration,
            handle,
        });
        ticket
    }

    /// Cancels the pending timer.
    ///
    /// Returns how much time it had left, or `None` if nothing was
    /// pending.
    pub fn stop(&mut self) -> Option<Duration> {
        let active = self.active.take()?;
        active.handle.abort();
        let remaining = remaining_of(&active);
        debug!(ticket = %active.ticket, remaining_secs = remaining.as_secs_f64(), "turn timer stopped");
        Some(remaining)
    }

    /// True if `ticket` belongs to the pending timer.
    pub fn is_current(&self, ticket: TimerTicket) -> bool {
        self.active.as_ref().is_some_and(|a| a.ticket == ticket)
    }

    /// True if a timer is pending.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// The ticket of the pending timer, if any.
    pub fn current(&self) -> Option<TimerTicket> {
        self.active.as_ref().map(|a| a.ticket)
    }

    /// Time left on the pending timer. Zero once it is overdue.
    pub fn remaining(&self) -> Option<Duration> {
        self.active.as_ref().map(remaining_of)
    }

    /// Clears the slot for a timer that has fired.
    ///
    /// Called from the expiry callback, which runs *inside* the task being
    /// cleared, so the task is detached rather than aborted. Returns
    /// `false` (and changes nothing) if `ticket` is not current.
    pub fn take_expired(&mut self, ticket: TimerTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.active = None;
        true
    }
}

fn remaining_of(active: &ActiveTimer) -> Duration {
    active.duration.saturating_sub(active.started_at.elapsed())
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.abort();
        }
    }
}

impl fmt::Debug for TurnTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnTimer")
            .field("current", &self.current())
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_display() {
        assert_eq!(TimerTicket(3).to_string(), "timer-3");
    }

    #[test]
    fn test_new_timer_is_idle() {
        let timer = TurnTimer::new();
        assert!(!timer.is_running());
        assert_eq!(timer.current(), None);
        assert_eq!(timer.remaining(), None);
        assert!(!timer.is_current(TimerTicket(1)));
    }

    #[test]
    fn test_stop_idle_timer_returns_none() {
        let mut timer = TurnTimer::new();
        assert_eq!(timer.stop(), None);
    }

    #[test]
    fn test_take_expired_unknown_ticket_returns_false() {
        let mut timer = TurnTimer::new();
        assert!(!timer.take_expired(TimerTicket(1)));
    }
}
