//! The [`Session`] handle.

use std::sync::{Arc, Weak};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tilepath_board::Board;
use tilepath_protocol::{Codec, JsonCodec, PlayerId};
use tilepath_transport::Connection;
use tokio::sync::{Mutex, mpsc, watch};

use crate::player::PlayerSnapshot;
use crate::state::{Progress, SessionSnapshot, SessionState};
use crate::{RoundConfig, SessionError};

/// The session server's shared game state and the tasks that drive it.
///
/// Cheap to clone: every clone is a handle to the same session. All game
/// state sits behind one mutex; turn changes and the connected count are
/// published on watch channels so waiters never poll.
///
/// `Session::new` spawns the task that removes evicted players, so it
/// must be called inside a Tokio runtime.
pub struct Session<B, C, K = JsonCodec> {
    pub(crate) inner: Arc<Inner<B, C, K>>,
}

pub(crate) struct Inner<B, C, K> {
    pub(crate) state: Mutex<SessionState<B, C>>,
    pub(crate) config: RoundConfig,
    pub(crate) codec: Arc<K>,
    pub(crate) turns: watch::Receiver<u64>,
    pub(crate) connected: watch::Receiver<usize>,
}

impl<B, C, K> Clone for Session<B, C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, C, K> Session<B, C, K>
where
    B: Board,
    C: Connection,
    K: Codec,
{
    /// Creates a session with an OS-seeded random source.
    pub fn new(config: RoundConfig, board: B, codec: K) -> Self {
        Self::with_rng(config, board, codec, StdRng::from_os_rng())
    }

    /// Creates a session whose shuffles and tile draws are reproducible.
    pub fn with_seed(config: RoundConfig, board: B, codec: K, seed: u64) -> Self {
        Self::with_rng(config, board, codec, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: RoundConfig, board: B, codec: K, rng: StdRng) -> Self {
        let config = config.validated();
        let (evict_tx, evict_rx) = mpsc::unbounded_channel();
        let state = SessionState::new(config.clone(), board, rng, evict_tx);
        let turns = state.subscribe_turns();
        let connected = state.subscribe_connected();

        let inner = Arc::new(Inner {
            state: Mutex::new(state),
            config,
            codec: Arc::new(codec),
            turns,
            connected,
        });
        tokio::spawn(reap(Arc::downgrade(&inner), evict_rx));
        Self { inner }
    }

    /// A consistent copy of the session's bookkeeping.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    /// A copy of one connected player's state.
    ///
    /// # Errors
    /// [`SessionError::UnknownPlayer`] if `id` is not connected.
    pub async fn player(&self, id: PlayerId) -> Result<PlayerSnapshot, SessionError> {
        let state = self.inner.state.lock().await;
        state
            .players
            .get(&id)
            .map(|p| p.snapshot())
            .ok_or(SessionError::UnknownPlayer(id))
    }

    /// Runs the follow-up work for a turn change: a new turn gets its
    /// watchdog when auto-play is on.
    pub(crate) fn after(&self, progress: Option<Progress>) {
        if let Some(Progress::Turn(stamp)) = progress {
            if self.inner.config.auto_play {
                self.spawn_watchdog(stamp);
            }
        }
    }
}

/// Removes players reported by failed sends, one at a time, outside of
/// whatever code reported them.
async fn reap<B, C, K>(
    inner: Weak<Inner<B, C, K>>,
    mut evictions: mpsc::UnboundedReceiver<PlayerId>,
) where
    B: Board,
    C: Connection,
    K: Codec,
{
    while let Some(id) = evictions.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        Session { inner }.remove_player(id).await;
    }
}
