mod audio_thread;
pub mod backend;
pub mod commands;
pub mod engine;
pub mod handle;
pub mod osc_client;

pub use engine::{AudioEngine, EngineEvent, ServerStatus, Transport};
pub use handle::AudioHandle;
pub use osc_client::ServerMonitor;
