//! `ServerBuilder` and the accept loop.
//!
//! This is the entry point for running a Tilepath server. It ties the
//! layers together: transport → protocol → session, with the board
//! plugged into the session.

use std::net::SocketAddr;

use tilepath_board::{Board, TileBoard};
use tilepath_protocol::JsonCodec;
use tilepath_session::{RoundConfig, Session, SessionSnapshot};
use tilepath_transport::{
    TcpConnection, TcpTransport, Transport, WebSocketConnection, WebSocketTransport,
};

use crate::handler::spawn_registration;
use crate::{TilepathError, TransportKind};

/// Builder for configuring and starting a Tilepath server.
///
/// # Example
///
/// ```rust,no_run
/// use tilepath::{ServerBuilder, TransportKind};
///
/// # async fn example() -> Result<(), tilepath::TilepathError> {
/// let server = ServerBuilder::new()
///     .bind("0.0.0.0:30020")
///     .transport(TransportKind::Websocket)
///     .build()
///     .await?;
/// server.run().await;
/// # Ok(())
/// # }
/// ```
pub struct ServerBuilder<B = TileBoard> {
    bind_addr: String,
    transport: TransportKind,
    round_config: RoundConfig,
    board: B,
    seed: Option<u64>,
}

impl ServerBuilder {
    /// Creates a builder with default settings and a [`TileBoard`].
    pub fn new() -> Self {
        Self {
            bind_addr: "localhost:30020".to_string(),
            transport: TransportKind::Tcp,
            round_config: RoundConfig::default(),
            board: TileBoard::new(),
            seed: None,
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Board> ServerBuilder<B> {
    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the wire protocol clients connect with.
    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.transport = kind;
        self
    }

    /// Sets the round configuration.
    pub fn round_config(mut self, config: RoundConfig) -> Self {
        self.round_config = config;
        self
    }

    /// Makes shuffles and tile draws reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Swaps in another board implementation.
    pub fn board<B2: Board>(self, board: B2) -> ServerBuilder<B2> {
        ServerBuilder {
            bind_addr: self.bind_addr,
            transport: self.transport,
            round_config: self.round_config,
            board,
            seed: self.seed,
        }
    }

    /// Binds the listener and sets up the session.
    ///
    /// Must be called inside a Tokio runtime. Uses `JsonCodec` framing.
    ///
    /// # Errors
    /// [`TilepathError::Transport`] if the address cannot be bound.
    pub async fn build(self) -> Result<Server<B>, TilepathError> {
        let listener = match self.transport {
            TransportKind::Tcp => Listener::Tcp(Serving::new(
                TcpTransport::bind(&self.bind_addr).await?,
                self.round_config,
                self.board,
                self.seed,
            )),
            TransportKind::Websocket => Listener::WebSocket(Serving::new(
                WebSocketTransport::bind(&self.bind_addr).await?,
                self.round_config,
                self.board,
                self.seed,
            )),
        };
        Ok(Server { listener })
    }
}

/// A transport paired with the session its connections join.
struct Serving<B, T: Transport> {
    transport: T,
    session: Session<B, T::Connection, JsonCodec>,
}

impl<B: Board, T: Transport> Serving<B, T> {
    fn new(transport: T, config: RoundConfig, board: B, seed: Option<u64>) -> Self {
        let session = match seed {
            Some(seed) => Session::with_seed(config, board, JsonCodec, seed),
            None => Session::new(config, board, JsonCodec),
        };
        Self { transport, session }
    }

    async fn run(mut self) {
        let lifecycle = self.session.clone();
        tokio::spawn(async move { lifecycle.run().await });

        loop {
            match self.transport.accept().await {
                Ok(conn) => spawn_registration(&self.session, conn),
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}

enum Listener<B: Board> {
    Tcp(Serving<B, TcpTransport>),
    WebSocket(Serving<B, WebSocketTransport>),
}

/// A read-only view of a running server's session.
///
/// The variant follows the transport the server was built with, since the
/// session is generic over its connection type.
pub enum Monitor<B: Board> {
    /// Session of a server listening on raw TCP.
    Tcp(Session<B, TcpConnection>),
    /// Session of a server listening for WebSocket upgrades.
    WebSocket(Session<B, WebSocketConnection>),
}

impl<B: Board> Monitor<B> {
    /// A consistent copy of the session's bookkeeping.
    pub async fn snapshot(&self) -> SessionSnapshot {
        match self {
            Self::Tcp(session) => session.snapshot().await,
            Self::WebSocket(session) => session.snapshot().await,
        }
    }
}

/// A bound Tilepath server.
///
/// Call [`run()`](Self::run) to start rounds and accept connections.
pub struct Server<B: Board = TileBoard> {
    listener: Listener<B>,
}

impl Server {
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }
}

impl<B: Board> Server<B> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        match &self.listener {
            Listener::Tcp(s) => s.transport.local_addr(),
            Listener::WebSocket(s) => s.transport.local_addr(),
        }
    }

    /// Returns the wire protocol clients connect with.
    pub fn transport_kind(&self) -> TransportKind {
        match self.listener {
            Listener::Tcp(_) => TransportKind::Tcp,
            Listener::WebSocket(_) => TransportKind::Websocket,
        }
    }

    /// A handle for reading the session's state while the server runs.
    pub fn monitor(&self) -> Monitor<B> {
        match &self.listener {
            Listener::Tcp(s) => Monitor::Tcp(s.session.clone()),
            Listener::WebSocket(s) => Monitor::WebSocket(s.session.clone()),
        }
    }

    /// Spawns the round lifecycle and runs the accept loop.
    ///
    /// Accept failures are logged and the loop carries on; it runs until
    /// the process is terminated.
    pub async fn run(self) {
        tracing::info!(transport = %self.transport_kind(), "tilepath server running");
        match self.listener {
            Listener::Tcp(s) => s.run().await,
            Listener::WebSocket(s) => s.run().await,
        }
    }
}
