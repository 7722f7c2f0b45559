//! Audio command and feedback types for the audio thread abstraction.
//!
//! `AudioHandle` serializes commands through an MPSC channel to a dedicated
//! audio thread and consumes feedback updates each loop iteration.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crate::state::SceneCatalog;

/// Commands sent from the app thread to the audio engine.
///
/// Commands either carry their own data or use reply channels for
/// synchronous operations.
#[derive(Debug)]
pub enum AudioCmd {
    // ── Server lifecycle ──────────────────────────────────────────
    StartServer {
        scsynth_path: Option<String>,
        port: u16,
        reply: Sender<Result<(), String>>,
    },
    StopServer,
    Connect {
        server_addr: String,
        reply: Sender<std::io::Result<()>>,
    },
    Disconnect,
    CompileSynthDefs {
        scd_path: PathBuf,
        sclang_path: Option<String>,
    },
    LoadSynthDefs {
        dir: PathBuf,
        reply: Sender<Result<(), String>>,
    },
    /// Ask scsynth for a fresh /status.reply; results land on the monitor.
    RequestStatus,

    // ── Source & transport ────────────────────────────────────────
    LoadSource {
        path: PathBuf,
        reply: Sender<Result<(), String>>,
    },
    Play,
    Pause,
    Stop,
    /// Player amplitude into the effect chain (0.0..=1.0).
    SetSourceGain(f32),

    // ── Scenes ────────────────────────────────────────────────────
    SetCatalog(SceneCatalog),
    RequestScene(String),
    ResetScene,
    SetRate {
        value: f32,
        ramp_secs: Option<f32>,
    },

    // ── Lifecycle ─────────────────────────────────────────────────
    Shutdown,
}

/// Feedback sent from the audio thread back to the app thread.
#[derive(Debug, Clone)]
pub enum AudioFeedback {
    ServerStatus {
        status: super::ServerStatus,
        message: String,
        server_running: bool,
    },
    CompileResult(Result<String, String>),
    SourceLoaded {
        path: PathBuf,
        channels: u16,
        duration_secs: f32,
    },
    /// A scene's recipe landed after its settle window.
    SceneApplied(String),
    /// A request that could not take effect (unknown id, no source loaded).
    SceneRejected {
        scene_id: String,
        reason: String,
    },
    /// A transport command (play/pause/stop) that could not take effect.
    TransportRejected {
        action: String,
        reason: String,
    },
    /// The scsynth server process crashed or became unreachable.
    ServerCrashed {
        message: String,
    },
}
