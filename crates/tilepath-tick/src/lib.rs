//! Per-turn deadline timer for Tilepath.
//!
//! A turn-based game has no fixed tick; it only needs to know when the
//! player on turn has been idle for too long. [`TurnTimer`] waits for a
//! deadline while watching a [`watch`] channel that publishes the current
//! turn. As soon as the turn moves on, the wait ends without firing.
//!
//! # Integration
//!
//! The timer sits inside a spawned watchdog task:
//!
//! ```ignore
//! let mut turns = session.subscribe_turns();
//! match TurnTimer::new(limit).run(&mut turns, &stamp.turn).await {
//!     TimerOutcome::Expired { .. } => session.force_move(stamp).await,
//!     TimerOutcome::Superseded => {}
//! }
//! ```
//!
//! Cancellation is observational: the timer never blocks whoever changes
//! the watched value, it only notices.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{trace, warn};

/// How a [`TurnTimer::run`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// The limit elapsed while the bound value was still current.
    Expired {
        /// Time actually waited. Never less than the limit.
        waited: Duration,
    },
    /// The watched value moved away from the bound value first, or its
    /// sender was dropped.
    Superseded,
}

impl TimerOutcome {
    /// Returns `true` for [`TimerOutcome::Expired`].
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

/// A one-shot deadline bound to a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTimer {
    limit: Duration,
}

impl TurnTimer {
    /// Shortest limit accepted. A zero limit would force every turn the
    /// instant it starts.
    pub const MIN_LIMIT: Duration = Duration::from_millis(10);

    /// Creates a timer with the given limit, raised to
    /// [`Self::MIN_LIMIT`] if shorter.
    pub fn new(limit: Duration) -> Self {
        let limit = if limit < Self::MIN_LIMIT {
            warn!(?limit, min = ?Self::MIN_LIMIT, "turn limit too short, clamping");
            Self::MIN_LIMIT
        } else {
            limit
        };
        Self { limit }
    }

    /// The configured limit.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Waits until `limit` has elapsed or the value in `turns` differs
    /// from `bound`, whichever comes first.
    ///
    /// If the value already differs when called, returns
    /// [`TimerOutcome::Superseded`] immediately.
    pub async fn run<T>(&self, turns: &mut watch::Receiver<T>, bound: &T) -> TimerOutcome
    where
        T: PartialEq + Send + Sync,
    {
        let started = Instant::now();
        let deadline = started + self.limit;

        tokio::select! {
            biased;
            // A closed channel means nobody is running turns any more.
            _ = turns.wait_for(|current| current != bound) => {
                trace!(elapsed = ?started.elapsed(), "turn timer superseded");
                TimerOutcome::Superseded
            }
            () = time::sleep_until(deadline) => {
                let waited = started.elapsed();
                trace!(?waited, "turn timer expired");
                TimerOutcome::Expired { waited }
            }
        }
    }
}
