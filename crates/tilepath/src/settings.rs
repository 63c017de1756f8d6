//! Process configuration: command line flags, each with an environment
//! variable fallback.

use std::fmt;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use tilepath_session::RoundConfig;

/// Which wire the server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportKind {
    /// Raw TCP byte stream.
    #[default]
    Tcp,
    /// WebSocket; each binary or text frame carries stream bytes.
    Websocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Websocket => write!(f, "websocket"),
        }
    }
}

/// Server settings. Flags win over environment variables, which win over
/// the defaults.
#[derive(Debug, Clone, Parser)]
#[command(name = "tilepath-server", version, about = "Tilepath session server")]
pub struct Settings {
    /// Address to listen on.
    #[arg(long, env = "TILEPATH_BIND", default_value = "localhost:30020")]
    pub bind: String,

    /// Wire protocol for client connections.
    #[arg(long, env = "TILEPATH_TRANSPORT", value_enum, default_value_t = TransportKind::Tcp)]
    pub transport: TransportKind,

    /// Connected players needed to start a round.
    #[arg(long, env = "TILEPATH_PLAYER_LIMIT", default_value_t = 4)]
    pub player_limit: usize,

    /// Tiles in each player's hand.
    #[arg(long, env = "TILEPATH_HAND_SIZE", default_value_t = 4)]
    pub hand_size: usize,

    /// Seconds a player may idle before a move is made for them.
    #[arg(long, env = "TILEPATH_TURN_TIME_LIMIT", default_value = "10", value_parser = parse_secs)]
    pub turn_time_limit: Duration,

    /// Make moves for idle players.
    #[arg(long, env = "TILEPATH_AUTO_PLAY", default_value_t = true, action = ArgAction::Set)]
    pub auto_play: bool,

    /// Start a new round after each one ends.
    #[arg(long, env = "TILEPATH_AUTO_RESTART", default_value_t = true, action = ArgAction::Set)]
    pub auto_restart: bool,

    /// Seconds between the end of a round and the next.
    #[arg(long, env = "TILEPATH_RESTART_DELAY", default_value = "3", value_parser = parse_secs)]
    pub restart_delay: Duration,

    /// Seed for shuffles and tile draws. Random when unset.
    #[arg(long, env = "TILEPATH_SEED")]
    pub seed: Option<u64>,
}

impl Settings {
    /// The round rules these settings describe. Out-of-range values
    /// are clamped by the session when it is built.
    pub fn round_config(&self) -> RoundConfig {
        RoundConfig {
            player_limit: self.player_limit,
            hand_size: self.hand_size,
            turn_time_limit: self.turn_time_limit,
            auto_play: self.auto_play,
            auto_restart: self.auto_restart,
            restart_delay: self.restart_delay,
        }
    }
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{s:?} is not a number: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{s:?} is not a valid duration: {e}"))
}
