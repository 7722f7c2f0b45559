use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::commands::{AudioCmd, AudioFeedback};
use super::engine::{AudioEngine, EngineEvent};
use super::osc_client::ServerMonitor;
use super::ServerStatus;

pub(crate) struct AudioThread {
    engine: AudioEngine,
    cmd_rx: Receiver<AudioCmd>,
    feedback_tx: Sender<AudioFeedback>,
    monitor: ServerMonitor,
    last_tick: Instant,
}

fn config_synthdefs_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home)
            .join(".config")
            .join("samhain")
            .join("synthdefs")
    } else {
        PathBuf::from("synthdefs")
    }
}

impl AudioThread {
    pub(crate) fn new(
        cmd_rx: Receiver<AudioCmd>,
        feedback_tx: Sender<AudioFeedback>,
        monitor: ServerMonitor,
    ) -> Self {
        Self {
            engine: AudioEngine::new(),
            cmd_rx,
            feedback_tx,
            monitor,
            last_tick: Instant::now(),
        }
    }

    pub(crate) fn run(mut self) {
        loop {
            if self.drain_commands() {
                break;
            }

            let now = Instant::now();
            if now.duration_since(self.last_tick) >= Duration::from_millis(1) {
                self.last_tick = now;
                for event in self.engine.tick(now) {
                    match event {
                        EngineEvent::SceneApplied { scene_id } => {
                            let _ = self
                                .feedback_tx
                                .send(AudioFeedback::SceneApplied(scene_id));
                        }
                    }
                }
            }

            self.poll_engine();
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn drain_commands(&mut self) -> bool {
        loop {
            match self.cmd_rx.try_recv() {
                Ok(cmd) => {
                    if self.handle_cmd(cmd) {
                        return true;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => return false,
                Err(mpsc::TryRecvError::Disconnected) => return true,
            }
        }
    }

    fn handle_cmd(&mut self, cmd: AudioCmd) -> bool {
        match cmd {
            AudioCmd::StartServer { scsynth_path, port, reply } => {
                let result = self.engine.start_server(scsynth_path.as_deref(), port);
                match &result {
                    Ok(()) => self.send_server_status(ServerStatus::Running, "Server started"),
                    Err(err) => self.send_server_status(ServerStatus::Error, err),
                }
                let _ = reply.send(result);
            }
            AudioCmd::StopServer => {
                self.engine.stop_server();
                self.send_server_status(ServerStatus::Stopped, "Server stopped");
            }
            AudioCmd::Connect { server_addr, reply } => {
                let result = self.engine.connect(&server_addr, self.monitor.clone());
                match &result {
                    Ok(()) => {
                        let message = match self.load_default_synthdefs() {
                            Ok(()) => "Connected".to_string(),
                            Err(e) => format!("Connected (synthdef warning: {})", e),
                        };
                        self.send_server_status(ServerStatus::Connected, message);
                    }
                    Err(err) => {
                        self.send_server_status(ServerStatus::Error, err.to_string());
                    }
                }
                let _ = reply.send(result);
            }
            AudioCmd::Disconnect => {
                self.engine.disconnect();
                self.send_server_status(self.engine.status(), "Disconnected");
            }
            AudioCmd::CompileSynthDefs { scd_path, sclang_path } => {
                if let Err(e) = self
                    .engine
                    .compile_synthdefs_async(&scd_path, sclang_path.as_deref())
                {
                    let _ = self.feedback_tx.send(AudioFeedback::CompileResult(Err(e)));
                }
            }
            AudioCmd::LoadSynthDefs { dir, reply } => {
                let _ = reply.send(self.engine.load_synthdefs(&dir));
            }
            AudioCmd::RequestStatus => {
                self.engine.request_status();
            }
            AudioCmd::LoadSource { path, reply } => match self.engine.load_source(&path) {
                Ok(info) => {
                    let _ = reply.send(Ok(()));
                    let _ = self.feedback_tx.send(AudioFeedback::SourceLoaded {
                        path: info.path,
                        channels: info.channels,
                        duration_secs: info.duration_secs,
                    });
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            AudioCmd::Play => {
                if let Err(reason) = self.engine.play() {
                    self.send_transport_rejected("play", reason);
                }
            }
            AudioCmd::Pause => {
                if let Err(reason) = self.engine.pause() {
                    self.send_transport_rejected("pause", reason);
                }
            }
            AudioCmd::Stop => {
                if let Err(reason) = self.engine.stop() {
                    self.send_transport_rejected("stop", reason);
                }
            }
            AudioCmd::SetSourceGain(gain) => {
                self.engine.set_source_gain(gain);
            }
            AudioCmd::SetCatalog(catalog) => {
                self.engine.set_catalog(catalog);
            }
            AudioCmd::RequestScene(scene_id) => {
                if let Err(reason) = self.engine.request_scene(&scene_id, Instant::now()) {
                    let _ = self
                        .feedback_tx
                        .send(AudioFeedback::SceneRejected { scene_id, reason });
                }
            }
            AudioCmd::ResetScene => match self.engine.reset_scene(Instant::now()) {
                Ok(()) => {
                    let _ = self
                        .feedback_tx
                        .send(AudioFeedback::SceneApplied("reset".to_string()));
                }
                Err(reason) => {
                    let _ = self.feedback_tx.send(AudioFeedback::SceneRejected {
                        scene_id: "reset".to_string(),
                        reason,
                    });
                }
            },
            AudioCmd::SetRate { value, ramp_secs } => {
                self.engine.set_playback_rate(value, ramp_secs, Instant::now());
            }
            AudioCmd::Shutdown => return true,
        }
        false
    }

    fn send_server_status(&self, status: ServerStatus, message: impl Into<String>) {
        let _ = self.feedback_tx.send(AudioFeedback::ServerStatus {
            status,
            message: message.into(),
            server_running: self.engine.server_running(),
        });
    }

    fn send_transport_rejected(&self, action: &str, reason: String) {
        let _ = self.feedback_tx.send(AudioFeedback::TransportRejected {
            action: action.to_string(),
            reason,
        });
    }

    fn load_default_synthdefs(&self) -> Result<(), String> {
        let builtin_result = self.engine.load_synthdefs(Path::new("synthdefs"));

        let config_dir = config_synthdefs_dir();
        let custom_result = if config_dir.exists() {
            self.engine.load_synthdefs(&config_dir)
        } else {
            Ok(())
        };

        match (builtin_result, custom_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    fn poll_engine(&mut self) {
        if let Some(result) = self.engine.poll_compile_result() {
            let result = match result {
                Ok(msg) => {
                    // Auto-reload synthdefs after a successful compile
                    let mut reload_msg = msg;
                    let builtin_dir = Path::new("synthdefs");
                    if builtin_dir.exists() && self.engine.is_running() {
                        match self.engine.load_synthdefs(builtin_dir) {
                            Ok(()) => reload_msg += " (reloaded)",
                            Err(e) => reload_msg += &format!(" (reload failed: {e})"),
                        }
                    }
                    let config_dir = config_synthdefs_dir();
                    if config_dir.exists() && self.engine.is_running() {
                        let _ = self.engine.load_synthdefs(&config_dir);
                    }
                    Ok(reload_msg)
                }
                Err(e) => Err(e),
            };
            let _ = self.feedback_tx.send(AudioFeedback::CompileResult(result));
        }

        if let Some(message) = self.engine.check_server_health() {
            let _ = self
                .feedback_tx
                .send(AudioFeedback::ServerCrashed { message });
        }
    }
}
