//! Integration tests for the turn timer.
//!
//! Every test runs with the Tokio clock paused. With a paused clock the
//! runtime jumps straight to the next pending timer whenever it is idle,
//! so a `timeout` shorter than the turn proves nothing fired yet and a
//! longer one proves it did, without any real waiting.

use std::time::Duration;

use gamenight_timer::{TimerTicket, TurnTimer};
use tokio::sync::mpsc;
use tokio::time::timeout;

// =========================================================================
// Helpers
// =========================================================================

/// Starts `timer` with a callback that reports its ticket on `tx`.
fn start_reporting(
    timer: &mut TurnTimer,
    secs: u64,
    tx: &mpsc::UnboundedSender<TimerTicket>,
) -> TimerTicket {
    let tx = tx.clone();
    timer.start(Duration::from_secs(secs), move |ticket| async move {
        let _ = tx.send(ticket);
    })
}

// =========================================================================
// start()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_fires_after_duration() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timer = TurnTimer::new();

    let ticket = start_reporting(&mut timer, 32, &tx);
    assert!(timer.is_running());
    assert!(timer.is_current(ticket));

    assert!(
        timeout(Duration::from_secs(31), rx.recv()).await.is_err(),
        "must not fire early"
    );
    let fired = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("should fire")
        .expect("channel open");
    assert_eq!(fired, ticket);
}

#[tokio::test(start_paused = true)]
async fn test_start_again_invalidates_previous_ticket() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timer = TurnTimer::new();

    let first = start_reporting(&mut timer, 10, &tx);
    let second = start_reporting(&mut timer, 20, &tx);

    assert_ne!(first, second);
    assert!(!timer.is_current(first));
    assert!(timer.is_current(second));

    // The first timer's deadline passes without a callback.
    assert!(timeout(Duration::from_secs(15), rx.recv()).await.is_err());
    let fired = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("second should fire")
        .unwrap();
    assert_eq!(fired, second);
    assert!(rx.try_recv().is_err(), "exactly one expiry");
}

// =========================================================================
// stop() / remaining()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_returns_remaining_and_prevents_expiry() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timer = TurnTimer::new();
    let ticket = start_reporting(&mut timer, 30, &tx);

    tokio::time::advance(Duration::from_secs(12)).await;
    let remaining = timer.stop().expect("was running");

    assert_eq!(remaining, Duration::from_secs(18));
    assert!(!timer.is_running());
    assert!(!timer.is_current(ticket));
    assert!(timeout(Duration::from_secs(60), rx.recv()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_remaining_counts_down() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut timer = TurnTimer::new();
    start_reporting(&mut timer, 30, &tx);

    assert_eq!(timer.remaining(), Some(Duration::from_secs(30)));
    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(timer.remaining(), Some(Duration::from_secs(25)));
}

// =========================================================================
// take_expired() / Drop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_take_expired_current_ticket_clears_slot() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timer = TurnTimer::new();
    let ticket = start_reporting(&mut timer, 5, &tx);

    let fired = timeout(Duration::from_secs(6), rx.recv()).await.unwrap().unwrap();
    assert!(timer.take_expired(fired));
    assert!(!timer.is_running());
    assert!(!timer.take_expired(ticket), "second take is stale");
}

#[tokio::test(start_paused = true)]
async fn test_take_expired_stale_ticket_keeps_current_timer() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut timer = TurnTimer::new();
    let stale = start_reporting(&mut timer, 5, &tx);
    let current = start_reporting(&mut timer, 5, &tx);

    assert!(!timer.take_expired(stale));
    assert!(timer.is_current(current));
}

#[tokio::test(start_paused = true)]
async fn test_drop_aborts_pending_timer() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timer = TurnTimer::new();
    start_reporting(&mut timer, 5, &tx);
    drop(tx);

    drop(timer);

    // The callback (and the sender it owned) is gone without firing.
    assert_eq!(timeout(Duration::from_secs(10), rx.recv()).await.unwrap(), None);
}
