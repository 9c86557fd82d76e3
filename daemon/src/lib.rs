pub mod audio;
pub mod config;
pub mod detection;
pub mod output;
pub mod rate_limit;
pub mod server;
pub mod state;

pub use audio::capture::AudioCapture;
pub use audio::block::BlockAssembler;
pub use detection::{DetectionPipeline, DetectionStats, TriggerEvent};
pub use output::action::TriggerAction;
pub use rate_limit::CommandRateLimiter;
pub use server::DaemonServer;
pub use state::DaemonState;
