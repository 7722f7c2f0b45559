use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use regex::Regex;

use super::{AudioEngine, ServerStatus, GROUP_OUTPUT, GROUP_PROCESSING, GROUP_SOURCES};
use crate::audio::backend::{AudioBackend, ScBackend};
use crate::audio::osc_client::{OscClient, OscClientLike, ServerMonitor};

const SCSYNTH_PATHS: &[&str] = &[
    "scsynth",
    "/Applications/SuperCollider.app/Contents/Resources/scsynth",
    "/usr/local/bin/scsynth",
    "/usr/bin/scsynth",
];

const SCLANG_PATHS: &[&str] = &[
    "sclang",
    "/Applications/SuperCollider.app/Contents/MacOS/sclang",
    "/usr/local/bin/sclang",
    "/usr/bin/sclang",
];

impl AudioEngine {
    /// Spawn scsynth listening on a UDP port. `scsynth_path` overrides the
    /// usual install locations when set.
    pub fn start_server(&mut self, scsynth_path: Option<&str>, port: u16) -> Result<(), String> {
        if self.scsynth_process.is_some() {
            return Err("Server already running".to_string());
        }

        self.server_status = ServerStatus::Starting;

        let args = ["-u".to_string(), port.to_string()];

        // Redirect scsynth output to a log file for crash diagnostics
        let log_path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("samhain")
            .join("scsynth.log");
        if let Some(dir) = log_path.parent() {
            let _ = fs::create_dir_all(dir);
        }
        let stdout_file = fs::File::create(&log_path).ok();

        let mut candidates: Vec<&str> = Vec::new();
        if let Some(path) = scsynth_path {
            candidates.push(path);
        }
        candidates.extend(SCSYNTH_PATHS);

        let mut child = None;
        for path in candidates {
            match Command::new(path)
                .args(&args)
                .stdout(
                    stdout_file
                        .as_ref()
                        .and_then(|f| f.try_clone().ok())
                        .map(Stdio::from)
                        .unwrap_or_else(Stdio::null),
                )
                .stderr(
                    stdout_file
                        .as_ref()
                        .and_then(|f| f.try_clone().ok())
                        .map(Stdio::from)
                        .unwrap_or_else(Stdio::null),
                )
                .spawn()
            {
                Ok(c) => {
                    child = Some(c);
                    break;
                }
                Err(_) => continue,
            }
        }

        match child {
            Some(mut c) => {
                self.server_status = ServerStatus::Running;
                thread::sleep(Duration::from_millis(500));

                // Verify scsynth didn't crash during startup
                match c.try_wait() {
                    Ok(Some(status)) => {
                        self.server_status = ServerStatus::Error;
                        Err(format!(
                            "scsynth crashed ({}) — see {}",
                            status,
                            log_path.display()
                        ))
                    }
                    _ => {
                        self.scsynth_process = Some(c);
                        Ok(())
                    }
                }
            }
            None => {
                self.server_status = ServerStatus::Error;
                Err("Could not find scsynth. Install SuperCollider.".to_string())
            }
        }
    }

    /// Check if a spawned scsynth has exited unexpectedly. Returns
    /// `Some(message)` if it died, `None` if healthy (or externally managed).
    pub fn check_server_health(&mut self) -> Option<String> {
        let child = self.scsynth_process.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                self.scsynth_process = None;
                self.backend = None;
                self.is_running = false;
                self.groups_created = false;
                self.rig = None;
                self.pending = None;
                self.rate_ramp = None;
                self.current_scene = None;
                self.current_rate = 1.0;
                self.transport = super::Transport::Stopped;
                self.server_status = ServerStatus::Error;
                Some(format!("scsynth exited ({})", status))
            }
            _ => None,
        }
    }

    pub fn stop_server(&mut self) {
        self.disconnect();
        if let Some(mut child) = self.scsynth_process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.server_status = ServerStatus::Stopped;
    }

    /// Kick off sclang compilation of a .scd file on a worker thread.
    /// Skipped when every SynthDef named in the file already has a newer
    /// .scsyndef beside it.
    pub fn compile_synthdefs_async(
        &mut self,
        scd_path: &Path,
        sclang_path: Option<&str>,
    ) -> Result<(), String> {
        if self.is_compiling {
            return Err("Compilation already in progress".to_string());
        }
        if !scd_path.exists() {
            return Err(format!("File not found: {}", scd_path.display()));
        }

        if Self::synthdefs_are_fresh(scd_path) {
            let (tx, rx) = mpsc::channel();
            self.compile_receiver = Some(rx);
            self.is_compiling = true;
            let _ = tx.send(Ok("Synthdefs up-to-date, skipped compilation".to_string()));
            return Ok(());
        }

        let path = scd_path.to_path_buf();
        let sclang = sclang_path.map(|s| s.to_string());
        let (tx, rx) = mpsc::channel();
        self.compile_receiver = Some(rx);
        self.is_compiling = true;

        thread::spawn(move || {
            let result = Self::run_sclang(&path, sclang.as_deref());
            let _ = tx.send(result);
        });

        Ok(())
    }

    /// True when every `.scsyndef` named by `SynthDef(...)` in the file is
    /// newer than the file itself.
    fn synthdefs_are_fresh(scd_path: &Path) -> bool {
        let dir = match scd_path.parent() {
            Some(d) => d,
            None => return false,
        };

        let scd_mtime = match fs::metadata(scd_path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => return false,
        };

        let content = match fs::read_to_string(scd_path) {
            Ok(c) => c,
            Err(_) => return false,
        };

        let name_re = match Regex::new(r#"SynthDef\s*\(\s*[\\"]([\w]+)"#) {
            Ok(re) => re,
            Err(_) => return false,
        };

        let mut names: HashSet<String> = HashSet::new();
        for caps in name_re.captures_iter(&content) {
            if let Some(name) = caps.get(1).map(|m| m.as_str().to_string()) {
                names.insert(name);
            }
        }

        if names.is_empty() {
            return false;
        }

        for name in names {
            let path = dir.join(format!("{name}.scsyndef"));
            let def_mtime = match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(_) => return false,
            };
            if def_mtime <= scd_mtime {
                return false;
            }
        }

        true
    }

    pub fn poll_compile_result(&mut self) -> Option<Result<String, String>> {
        let rx = self.compile_receiver.as_ref()?;
        match rx.try_recv() {
            Ok(result) => {
                self.compile_receiver = None;
                self.is_compiling = false;
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.compile_receiver = None;
                self.is_compiling = false;
                Some(Err("Compilation thread terminated unexpectedly".to_string()))
            }
        }
    }

    fn run_sclang(scd_path: &Path, sclang_path: Option<&str>) -> Result<String, String> {
        let mut candidates: Vec<&str> = Vec::new();
        if let Some(path) = sclang_path {
            candidates.push(path);
        }
        candidates.extend(SCLANG_PATHS);

        for path in candidates {
            match Command::new(path).arg(scd_path).output() {
                Ok(output) => {
                    if output.status.success() {
                        return Ok("Synthdefs compiled successfully".to_string());
                    } else {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        return Err(format!("Compilation failed: {}", stderr));
                    }
                }
                Err(_) => continue,
            }
        }

        Err("Could not find sclang. Install SuperCollider.".to_string())
    }

    /// Open an OSC connection and register for server notifications.
    pub fn connect(&mut self, server_addr: &str, monitor: ServerMonitor) -> std::io::Result<()> {
        let client = OscClient::new_with_monitor(server_addr, monitor)?;
        client.send_message("/notify", vec![rosc::OscType::Int(1)])?;
        self.backend = Some(Box::new(ScBackend::new(Box::new(client))));
        self.is_running = true;
        self.server_status = ServerStatus::Connected;
        Ok(())
    }

    /// Tear down everything tied to the connection. The effect chain and
    /// buffer are freed server-side first if the link is still up.
    pub fn disconnect(&mut self) {
        self.teardown_rig();
        self.pending = None;
        self.rate_ramp = None;
        self.current_rate = 1.0;
        self.current_scene = None;
        self.backend = None;
        self.groups_created = false;
        self.is_running = false;
        self.server_status = if self.scsynth_process.is_some() {
            ServerStatus::Running
        } else {
            ServerStatus::Stopped
        };
    }

    pub fn load_synthdefs(&self, dir: &Path) -> Result<(), String> {
        if !dir.exists() {
            return Err(format!("Synthdef directory not found: {}", dir.display()));
        }
        let backend = self.backend.as_deref().ok_or("Not connected")?;
        backend.load_synthdef_dir(dir).map_err(|e| e.to_string())
    }

    /// Ask for a fresh /status.reply; the answer lands on the monitor.
    pub fn request_status(&self) {
        if let Some(backend) = self.backend.as_deref() {
            let _ = backend.request_status();
        }
    }

    pub(super) fn ensure_groups(&mut self) -> Result<(), String> {
        if self.groups_created {
            return Ok(());
        }
        let backend = self.backend.as_deref().ok_or("Not connected")?;
        backend
            .create_group(GROUP_SOURCES, 1, 0)
            .map_err(|e| e.to_string())?;
        backend
            .create_group(GROUP_PROCESSING, 1, 0)
            .map_err(|e| e.to_string())?;
        backend
            .create_group(GROUP_OUTPUT, 1, 0)
            .map_err(|e| e.to_string())?;
        self.groups_created = true;
        Ok(())
    }
}
