//! AudioHandle: main-thread interface to the audio engine.
//!
//! Owns the command/feedback channels and the shared server monitor. The
//! AudioEngine and transition ticking live on the audio thread.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::commands::{AudioCmd, AudioFeedback};
use super::osc_client::ServerMonitor;
use super::ServerStatus;
use crate::state::{SceneCatalog, RESET_ID};

pub struct AudioHandle {
    cmd_tx: Sender<AudioCmd>,
    feedback_rx: Receiver<AudioFeedback>,
    monitor: ServerMonitor,
    status: ServerStatus,
    server_running: bool,
    is_running: bool,
    join_handle: Option<JoinHandle<()>>,
}

impl AudioHandle {
    pub fn new() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (feedback_tx, feedback_rx) = mpsc::channel();
        let monitor = ServerMonitor::new();
        let thread_monitor = monitor.clone();

        let join_handle = thread::spawn(move || {
            let thread =
                super::audio_thread::AudioThread::new(cmd_rx, feedback_tx, thread_monitor);
            thread.run();
        });

        Self {
            cmd_tx,
            feedback_rx,
            monitor,
            status: ServerStatus::Stopped,
            server_running: false,
            is_running: false,
            join_handle: Some(join_handle),
        }
    }

    pub fn send_cmd(&self, cmd: AudioCmd) -> Result<(), String> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| "Audio thread disconnected".to_string())
    }

    pub fn drain_feedback(&mut self) -> Vec<AudioFeedback> {
        let mut out = Vec::new();
        while let Ok(msg) = self.feedback_rx.try_recv() {
            self.apply_feedback(&msg);
            out.push(msg);
        }
        out
    }

    fn apply_feedback(&mut self, feedback: &AudioFeedback) {
        match feedback {
            AudioFeedback::ServerStatus { status, server_running, .. } => {
                self.status = *status;
                self.server_running = *server_running;
                self.is_running = matches!(status, ServerStatus::Connected);
            }
            AudioFeedback::ServerCrashed { .. } => {
                self.status = ServerStatus::Error;
                self.server_running = false;
                self.is_running = false;
            }
            AudioFeedback::CompileResult(_) => {}
            AudioFeedback::SourceLoaded { .. } => {}
            AudioFeedback::SceneApplied(_) => {}
            AudioFeedback::SceneRejected { .. } => {}
            AudioFeedback::TransportRejected { .. } => {}
        }
    }

    // ── State accessors ───────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn server_running(&self) -> bool {
        self.server_running
    }

    pub fn monitor(&self) -> &ServerMonitor {
        &self.monitor
    }

    // ── Server lifecycle ──────────────────────────────────────────

    pub fn start_server(&mut self, scsynth_path: Option<&str>, port: u16) -> Result<(), String> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send_cmd(AudioCmd::StartServer {
            scsynth_path: scsynth_path.map(|s| s.to_string()),
            port,
            reply: reply_tx,
        })?;
        match reply_rx.recv() {
            Ok(result) => {
                if result.is_ok() {
                    self.status = ServerStatus::Running;
                    self.server_running = true;
                } else {
                    self.status = ServerStatus::Error;
                }
                result
            }
            Err(_) => Err("Audio thread disconnected".to_string()),
        }
    }

    pub fn stop_server(&mut self) {
        let _ = self.send_cmd(AudioCmd::StopServer);
        self.status = ServerStatus::Stopped;
        self.server_running = false;
        self.is_running = false;
    }

    pub fn connect(&mut self, server_addr: &str) -> std::io::Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx
            .send(AudioCmd::Connect {
                server_addr: server_addr.to_string(),
                reply: reply_tx,
            })
            .map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "Audio thread disconnected")
            })?;
        match reply_rx.recv() {
            Ok(result) => {
                if result.is_ok() {
                    self.status = ServerStatus::Connected;
                    self.is_running = true;
                } else {
                    self.status = ServerStatus::Error;
                    self.is_running = false;
                }
                result
            }
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "Audio thread disconnected",
            )),
        }
    }

    pub fn disconnect(&mut self) {
        let _ = self.send_cmd(AudioCmd::Disconnect);
        self.is_running = false;
        self.status = if self.server_running {
            ServerStatus::Running
        } else {
            ServerStatus::Stopped
        };
    }

    /// Fire-and-forget; the outcome arrives later as a CompileResult.
    pub fn compile_synthdefs(&self, scd_path: &Path, sclang_path: Option<&str>) -> Result<(), String> {
        self.send_cmd(AudioCmd::CompileSynthDefs {
            scd_path: scd_path.to_path_buf(),
            sclang_path: sclang_path.map(|s| s.to_string()),
        })
    }

    pub fn load_synthdefs(&self, dir: &Path) -> Result<(), String> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send_cmd(AudioCmd::LoadSynthDefs {
            dir: dir.to_path_buf(),
            reply: reply_tx,
        })?;
        match reply_rx.recv() {
            Ok(result) => result,
            Err(_) => Err("Audio thread disconnected".to_string()),
        }
    }

    pub fn request_status(&self) {
        let _ = self.send_cmd(AudioCmd::RequestStatus);
    }

    // ── Source & transport ────────────────────────────────────────

    pub fn load_source(&self, path: &Path) -> Result<(), String> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send_cmd(AudioCmd::LoadSource {
            path: path.to_path_buf(),
            reply: reply_tx,
        })?;
        match reply_rx.recv() {
            Ok(result) => result,
            Err(_) => Err("Audio thread disconnected".to_string()),
        }
    }

    pub fn play(&self) {
        let _ = self.send_cmd(AudioCmd::Play);
    }

    pub fn pause(&self) {
        let _ = self.send_cmd(AudioCmd::Pause);
    }

    pub fn stop(&self) {
        let _ = self.send_cmd(AudioCmd::Stop);
    }

    pub fn set_source_gain(&self, gain: f32) {
        let _ = self.send_cmd(AudioCmd::SetSourceGain(gain));
    }

    // ── Scenes ────────────────────────────────────────────────────

    pub fn set_catalog(&self, catalog: SceneCatalog) {
        let _ = self.send_cmd(AudioCmd::SetCatalog(catalog));
    }

    /// Route a raw signal line. The reserved "reset" signal returns to
    /// baseline; any other token is treated as a scene id.
    pub fn send_signal(&self, signal: &str) -> Result<(), String> {
        let trimmed = signal.trim();
        if trimmed.is_empty() {
            return Err("Empty signal".to_string());
        }
        if trimmed == RESET_ID {
            self.send_cmd(AudioCmd::ResetScene)
        } else {
            self.send_cmd(AudioCmd::RequestScene(trimmed.to_string()))
        }
    }

    pub fn request_scene(&self, scene_id: &str) -> Result<(), String> {
        self.send_cmd(AudioCmd::RequestScene(scene_id.to_string()))
    }

    pub fn reset_scene(&self) -> Result<(), String> {
        self.send_cmd(AudioCmd::ResetScene)
    }

    pub fn set_rate(&self, value: f32, ramp_secs: Option<f32>) {
        let _ = self.send_cmd(AudioCmd::SetRate { value, ramp_secs });
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        let _ = self.send_cmd(AudioCmd::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for AudioHandle {
    fn default() -> Self {
        Self::new()
    }
}
