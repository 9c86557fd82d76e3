use shared::ipc::{Command, IpcError, Response};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::{timeout, Duration};
use tracing::warn;

/// Timeout for socket operations (5 seconds)
const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: Option<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.unwrap_or_else(shared::default_socket_path),
        }
    }

    pub async fn send_command(&self, cmd: Command) -> Result<Response, IpcError> {
        let mut stream = match timeout(SOCKET_TIMEOUT, UnixStream::connect(&self.socket_path)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IpcError::ConnectionRefused);
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                return Err(IpcError::ConnectionRefused);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                warn!(
                    "Connection timeout: failed to connect to daemon at {} within {:?}",
                    self.socket_path.display(),
                    SOCKET_TIMEOUT
                );
                return Err(IpcError::Timeout);
            }
        };

        let command_json = serde_json::to_vec(&cmd)?;

        let write = async {
            stream.write_all(&command_json).await?;
            stream.shutdown().await
        };
        match timeout(SOCKET_TIMEOUT, write).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Write timeout: failed to send command to daemon within {:?}", SOCKET_TIMEOUT);
                return Err(IpcError::Timeout);
            }
        }

        let mut buffer = Vec::new();
        match timeout(SOCKET_TIMEOUT, stream.read_to_end(&mut buffer)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Read timeout: failed to receive response from daemon within {:?}", SOCKET_TIMEOUT);
                return Err(IpcError::Timeout);
            }
        };

        let response: Response = serde_json::from_slice(&buffer)?;

        Ok(response)
    }
}
