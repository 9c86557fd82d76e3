pub mod block;
pub mod capture;

pub use block::BlockAssembler;
pub use capture::AudioCapture;
