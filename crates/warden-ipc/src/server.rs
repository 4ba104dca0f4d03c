// crates/warden-ipc/src/server.rs
// ============================================================================
// Module: IPC Socket Server
// Description: Unix domain socket server for the Gateway side of the channel.
// Purpose: Accept one Core connection and deliver whole frames to a handler.
// Dependencies: crate::framing, async-trait, tokio
// ============================================================================

//! ## Overview
//! The server owns the listening socket. One client connection is served at a
//! time; additional connections are dropped at accept. Frame reading is
//! decoupled from handling through a channel so a disconnect is observable
//! while a handler is still working; handlers watch the session to cancel.
//! Malformed framing closes the connection without delivering anything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::sync::watch;

use crate::framing::DEFAULT_MAX_FRAME_BYTES;
use crate::framing::FramingError;
use crate::framing::read_frame;
use crate::framing::write_frame;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Capacity of the per-connection inbound frame channel.
const FRAME_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// IPC transport errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum IpcError {
    /// Socket could not be bound.
    #[error("ipc bind failed: {0}")]
    Bind(String),
    /// Accepting a connection failed.
    #[error("ipc accept failed: {0}")]
    Accept(String),
    /// Connecting to the socket failed.
    #[error("ipc connect failed: {0}")]
    Connect(String),
    /// Frame codec failure on an established stream.
    #[error("ipc frame error: {0}")]
    Frame(String),
    /// Message encoding or decoding failed.
    #[error("ipc decode failed: {0}")]
    Decode(String),
    /// Connection closed before a response arrived.
    #[error("ipc connection closed")]
    Closed,
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// IPC server configuration.
///
/// # Invariants
/// - `socket_path` points at a file path, not a directory.
#[derive(Debug, Clone)]
pub struct IpcServerConfig {
    /// Filesystem path of the listening socket.
    pub socket_path: PathBuf,
    /// Maximum accepted frame payload size in bytes.
    pub max_frame_bytes: usize,
}

impl IpcServerConfig {
    /// Creates a configuration with the default frame cap.
    #[must_use]
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

// ============================================================================
// SECTION: Handler Contract
// ============================================================================

/// Per-connection session view handed to the message handler.
///
/// Handlers select on [`SessionHandle::closed`] to cancel work when the peer
/// disconnects mid-dispatch.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Becomes true when the connection's read side ends.
    closed: watch::Receiver<bool>,
    /// Keeps the close sender alive for detached sessions.
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl SessionHandle {
    /// Returns true once the connection has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves when the connection ends.
    pub async fn closed(&self) {
        let mut rx = self.closed.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Builds a session that never closes, for handlers driven outside a
    /// live connection.
    #[must_use]
    pub fn detached() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            closed: rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }
}

/// Message handler driven by the server for each inbound frame.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one inbound frame and returns the response frame.
    async fn handle(&self, frame: Vec<u8>, session: &SessionHandle) -> Vec<u8>;

    /// Called when a client connection is established.
    fn connected(&self) {}

    /// Called when a client connection ends.
    fn disconnected(&self) {}

    /// Called when a connection dies from a framing or I/O error.
    fn transport_error(&self, _message: &str) {}
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Control handle for a running IPC server.
#[derive(Debug, Clone)]
pub struct IpcServerHandle {
    /// Shutdown signal shared with the accept loop.
    shutdown: watch::Sender<bool>,
    /// Whether a client connection is currently active.
    connected: Arc<AtomicBool>,
}

impl IpcServerHandle {
    /// Signals the server to stop accepting and serving.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Returns true while a client connection is active.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Unix domain socket server accepting a single Core connection.
pub struct IpcServer {
    /// Bound listening socket.
    listener: UnixListener,
    /// Server configuration.
    config: IpcServerConfig,
    /// Whether a client connection is currently active.
    connected: Arc<AtomicBool>,
    /// Shutdown signal.
    shutdown: watch::Sender<bool>,
}

impl IpcServer {
    /// Binds the listening socket, replacing a stale socket file.
    ///
    /// The socket file mode is restricted to the owning user.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Bind`] when the socket cannot be bound or its
    /// permissions cannot be restricted.
    pub fn bind(config: IpcServerConfig) -> Result<Self, IpcError> {
        if config.socket_path.exists() {
            std::fs::remove_file(&config.socket_path)
                .map_err(|err| IpcError::Bind(err.to_string()))?;
        }
        let listener =
            UnixListener::bind(&config.socket_path).map_err(|err| IpcError::Bind(err.to_string()))?;
        restrict_socket_mode(&config.socket_path)?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            listener,
            config,
            connected: Arc::new(AtomicBool::new(false)),
            shutdown,
        })
    }

    /// Returns a control handle usable while the server runs.
    #[must_use]
    pub fn handle(&self) -> IpcServerHandle {
        IpcServerHandle {
            shutdown: self.shutdown.clone(),
            connected: Arc::clone(&self.connected),
        }
    }

    /// Serves connections until the handle signals stop.
    ///
    /// One client is served at a time; a second client connecting while one
    /// is active is dropped at accept.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Accept`] when the listener fails irrecoverably.
    pub async fn serve(self, handler: Arc<dyn MessageHandler>) -> Result<(), IpcError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut active: Option<tokio::task::JoinHandle<()>> = None;
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, _) = accepted.map_err(|err| IpcError::Accept(err.to_string()))?;
                    if self.connected.swap(true, Ordering::SeqCst) {
                        drop(stream);
                        continue;
                    }
                    handler.connected();
                    let conn_handler = Arc::clone(&handler);
                    let conn_shutdown = shutdown_rx.clone();
                    let connected = Arc::clone(&self.connected);
                    let max_frame_bytes = self.config.max_frame_bytes;
                    active = Some(tokio::spawn(async move {
                        serve_connection(
                            stream,
                            max_frame_bytes,
                            Arc::clone(&conn_handler),
                            conn_shutdown,
                        )
                        .await;
                        connected.store(false, Ordering::SeqCst);
                        conn_handler.disconnected();
                    }));
                }
                _ = signalled(&mut shutdown_rx) => break,
            }
        }
        if let Some(task) = active {
            let _ = task.await;
        }
        let _ = std::fs::remove_file(&self.config.socket_path);
        Ok(())
    }
}

/// Restricts the socket file mode to the owning user.
fn restrict_socket_mode(path: &std::path::Path) -> Result<(), IpcError> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, permissions).map_err(|err| IpcError::Bind(err.to_string()))
}

/// Resolves when the watch flag becomes true or its sender is dropped.
async fn signalled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Serves a single connection until close, framing error, or shutdown.
async fn serve_connection(
    stream: UnixStream,
    max_frame_bytes: usize,
    handler: Arc<dyn MessageHandler>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<u8>>(FRAME_CHANNEL_CAPACITY);
    let (closed_tx, closed_rx) = watch::channel(false);
    let reader_handler = Arc::clone(&handler);
    let reader = tokio::spawn(async move {
        let mut read_half = read_half;
        loop {
            match read_frame(&mut read_half, max_frame_bytes).await {
                Ok(frame) => {
                    if frame_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(FramingError::Closed) => break,
                Err(err) => {
                    reader_handler.transport_error(&err.to_string());
                    break;
                }
            }
        }
        let _ = closed_tx.send(true);
    });

    let session = SessionHandle {
        closed: closed_rx,
        _keepalive: None,
    };
    loop {
        tokio::select! {
            maybe_frame = frame_rx.recv() => {
                let Some(frame) = maybe_frame else { break };
                let response = handler.handle(frame, &session).await;
                if write_frame(&mut write_half, &response).await.is_err() {
                    break;
                }
            }
            _ = signalled(&mut shutdown_rx) => break,
        }
    }
    drop(frame_rx);
    reader.abort();
    let _ = reader.await;
}
