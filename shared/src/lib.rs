pub mod detector;
pub mod ipc;
pub mod pcm;

pub use detector::{average_magnitude, Detector, Observation, DEFAULT_REQUIRED, DEFAULT_THRESHOLD};
pub use ipc::{default_socket_path, Command, IpcError, Response, StatusInfo};
