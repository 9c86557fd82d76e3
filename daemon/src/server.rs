use shared::ipc::{Command, Response};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::audio::capture::AudioCapture;
use crate::config::Config;
use crate::rate_limit::CommandRateLimiter;
use crate::state::DaemonState;

/// Clients send one command and shut down their write half.
const MAX_COMMAND_BYTES: u64 = 64 * 1024;

pub struct DaemonServer {
    socket_path: PathBuf,
    state: Arc<Mutex<DaemonState>>,
    rate_limiter: Arc<CommandRateLimiter>,
    operation_timeout: Duration,
}

impl DaemonServer {
    pub fn new(config: &Config, state: Arc<Mutex<DaemonState>>) -> Self {
        Self {
            socket_path: config.server.resolved_socket_path(),
            state,
            rate_limiter: Arc::new(CommandRateLimiter::from_config(&config.rate_limit)),
            operation_timeout: Duration::from_secs(
                config.timeouts.socket_operation_timeout_seconds,
            ),
        }
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let socket_path = self.socket_path.clone();

        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }

        info!("Starting socket server at {}", socket_path.display());

        let listener = UnixListener::bind(&socket_path)?;
        debug!("Listener bound successfully");

        loop {
            debug!("Waiting for connection...");
            let state = Arc::clone(&self.state);
            let rate_limiter = Arc::clone(&self.rate_limiter);
            let operation_timeout = self.operation_timeout;
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("Connection accepted");
                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_connection(state, rate_limiter, operation_timeout, stream)
                                .await
                        {
                            error!("Error handling connection: {}", e);
                        } else {
                            debug!("Connection handled successfully");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }

    async fn handle_connection(
        state: Arc<Mutex<DaemonState>>,
        rate_limiter: Arc<CommandRateLimiter>,
        operation_timeout: Duration,
        mut stream: UnixStream,
    ) -> anyhow::Result<()> {
        let mut buffer = Vec::new();
        let n = tokio::time::timeout(
            operation_timeout,
            (&mut stream).take(MAX_COMMAND_BYTES).read_to_end(&mut buffer),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Timed out reading command"))??;

        if n == 0 {
            return Ok(());
        }

        let response = match serde_json::from_slice::<Command>(&buffer) {
            Ok(command) if rate_limiter.check() => {
                info!("Received command: {:?}", command);
                Self::dispatch(&state, command).await
            }
            Ok(command) => {
                warn!("Rate limit exceeded, rejecting {:?}", command);
                Response::Error("Rate limit exceeded".to_string())
            }
            Err(e) => Response::Error(format!("Invalid command: {}", e)),
        };

        let response_json = serde_json::to_vec(&response)?;
        tokio::time::timeout(operation_timeout, stream.write_all(&response_json))
            .await
            .map_err(|_| anyhow::anyhow!("Timed out writing response"))??;

        info!("Sent response: {:?}", response);

        Ok(())
    }

    pub async fn dispatch(state: &Arc<Mutex<DaemonState>>, command: Command) -> Response {
        let result = match command {
            Command::Start => Self::start(state).await,
            Command::Stop => Self::stop(state).await,
            Command::Toggle => {
                let is_active = state.lock().await.is_active().await;
                if is_active {
                    Self::stop(state).await
                } else {
                    Self::start(state).await
                }
            }
            Command::Status => Ok(Response::Status(state.lock().await.get_status().await)),
            Command::Reset => {
                state.lock().await.reset_detector().await;
                Ok(Response::Ok)
            }
        };

        result.unwrap_or_else(|e| {
            error!("Command failed: {}", e);
            Response::Error(e.to_string())
        })
    }

    async fn start(state: &Arc<Mutex<DaemonState>>) -> anyhow::Result<Response> {
        let mut state_guard = state.lock().await;

        if state_guard.is_active().await {
            return Err(anyhow::anyhow!("Detection already running"));
        }

        let mut capture = AudioCapture::new(&state_guard.config.audio)?;
        let (audio_tx, audio_rx) = block_channel(state_guard.config.buffer.broadcast_capacity);
        capture.start(audio_tx)?;

        if let Err(e) = state_guard.start_detection(audio_rx).await {
            capture.stop().await?;
            return Err(e);
        }

        *state_guard.audio_capture.lock().await = Some(capture);
        state_guard.activate().await?;

        info!("Activated audio capture");
        Ok(Response::Ok)
    }

    async fn stop(state: &Arc<Mutex<DaemonState>>) -> anyhow::Result<Response> {
        let mut state_guard = state.lock().await;
        state_guard.stop_detection().await;

        let capture = state_guard.audio_capture.lock().await.take();
        if let Some(mut capture) = capture {
            capture.stop().await?;
        }

        state_guard.deactivate().await?;
        info!("Deactivated audio capture");
        Ok(Response::Ok)
    }
}

fn block_channel(
    capacity: usize,
) -> (broadcast::Sender<Vec<i16>>, broadcast::Receiver<Vec<i16>>) {
    broadcast::channel(capacity.max(1))
}

impl Drop for DaemonServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}
