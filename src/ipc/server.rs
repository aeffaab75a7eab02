//! Unix domain socket server for IPC
//!
//! Provides request-response status queries and command injection, and
//! turns subscribed connections into session event streams.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::SessionEvent;
use crate::voice::VoiceOutput;

use super::protocol::{AvatarStatus, Notification, Request, Response};

/// Largest accepted request body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
    event_tx: broadcast::Sender<SessionEvent>,
    command_tx: mpsc::Sender<VoiceOutput>,
}

/// Shared server state
struct ServerState {
    status: AvatarStatus,
    start_time: std::time::Instant,
}

/// Per-connection handles
#[derive(Clone)]
struct ClientContext {
    state: Arc<RwLock<ServerState>>,
    event_tx: broadcast::Sender<SessionEvent>,
    command_tx: mpsc::Sender<VoiceOutput>,
}

impl Server {
    /// Bind the IPC socket
    pub fn new(
        socket_path: &Path,
        event_tx: broadcast::Sender<SessionEvent>,
        command_tx: mpsc::Sender<VoiceOutput>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path)
            .context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: AvatarStatus::default(),
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            state,
            shutdown_tx,
            event_tx,
            command_tx,
        })
    }

    /// Publish the latest avatar status
    pub async fn set_status(&self, status: AvatarStatus) {
        let mut server_state = self.state.write().await;
        if server_state.status.paused != status.paused {
            info!(paused = status.paused, "IPC server: pause state updated");
        }
        server_state.status = status;
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let ctx = ClientContext {
                        state: Arc::clone(&self.state),
                        event_tx: self.event_tx.clone(),
                        command_tx: self.command_tx.clone(),
                    };
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, ctx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(mut stream: UnixStream, ctx: ClientContext) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match stream.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            stream.read_exact(&mut msg_buf).await?;

            let response = match serde_json::from_slice::<Request>(&msg_buf) {
                Ok(Request::Subscribe) => {
                    debug!("client subscribed to session events");
                    let event_rx = ctx.event_tx.subscribe();
                    Self::send_message(&mut stream, &Response::Subscribed).await?;
                    return Self::stream_events(stream, event_rx).await;
                }
                Ok(request) => {
                    debug!(?request, "received request");
                    Self::process_request(request, &ctx).await
                }
                Err(e) => Response::Error {
                    code: "bad_request".to_string(),
                    message: e.to_string(),
                },
            };

            Self::send_message(&mut stream, &response).await?;
        }
    }

    /// Push session events until the client goes away
    async fn stream_events(
        mut stream: UnixStream,
        mut event_rx: broadcast::Receiver<SessionEvent>,
    ) -> Result<()> {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    Self::send_message(&mut stream, &Notification::SessionEvent(event)).await?;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(stream: &mut UnixStream, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        stream.write_all(&msg_len).await?;
        stream.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    async fn process_request(request: Request, ctx: &ClientContext) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let mut state = ctx.state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                Response::Status(state.status.clone())
            }

            Request::Command { label } => {
                info!(%label, "command received via IPC");
                match ctx.command_tx.send(VoiceOutput::Label(label)).await {
                    Ok(()) => Response::Accepted,
                    Err(_) => Response::Error {
                        code: "unavailable".to_string(),
                        message: "dispatcher is not running".to_string(),
                    },
                }
            }

            Request::Subscribe => Response::Subscribed,
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}
