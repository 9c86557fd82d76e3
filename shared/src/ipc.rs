use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const SOCKET_NAME: &str = "wakegated.sock";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    Status,
    Reset,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Response {
    Ok,
    Error(String),
    Status(StatusInfo),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusInfo {
    pub is_running: bool,
    pub is_active: bool,
    pub threshold: u32,
    pub required: u32,
    pub consecutive: u32,
    pub blocks_processed: u64,
    pub triggers: u64,
}

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection refused: is wakegated running?")]
    ConnectionRefused,

    #[error("Connection timeout")]
    Timeout,
}

/// Socket the daemon listens on when no path is configured.
/// Uses the XDG runtime directory if available, falls back to /tmp.
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(SOCKET_NAME)
}
