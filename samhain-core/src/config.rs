//! Runtime configuration from `<config_dir>/samhain/config.toml`.
//!
//! Every field has a default, so a missing or partial file still yields a
//! working setup. A malformed file falls back to defaults with a warning
//! rather than refusing to start.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// scsynth UDP address.
    pub server_addr: String,
    /// TCP address the signal listener binds.
    pub signal_addr: String,
    /// Player amplitude into the effect chain (0.0..=1.0).
    pub master_gain: f32,
    /// Override for the scsynth binary.
    pub scsynth_path: Option<String>,
    /// Override for the sclang binary.
    pub sclang_path: Option<String>,
    /// Boot scsynth and connect on startup.
    pub autostart: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:57110".to_string(),
            signal_addr: "127.0.0.1:9002".to_string(),
            master_gain: 0.85,
            scsynth_path: None,
            sclang_path: None,
            autostart: true,
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("samhain"))
}

pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// User scene recipes that extend the builtin catalog.
pub fn scenes_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("scenes.json"))
}

impl Config {
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) => {
                log::warn!("Could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_toml(contents: &str) -> Self {
        match toml::from_str(contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Malformed config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// UDP port parsed out of `server_addr`, for booting scsynth on the
    /// same port the client will dial.
    pub fn server_port(&self) -> u16 {
        self.server_addr
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(57110)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml"));
        assert_eq!(config.server_addr, "127.0.0.1:57110");
        assert_eq!(config.signal_addr, "127.0.0.1:9002");
        assert!(config.autostart);
    }

    #[test]
    fn partial_file_keeps_defaults_for_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "signal_addr = \"0.0.0.0:9100\"").unwrap();
        writeln!(f, "master_gain = 0.5").unwrap();
        drop(f);

        let config = Config::load_from(&path);
        assert_eq!(config.signal_addr, "0.0.0.0:9100");
        assert!((config.master_gain - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.server_addr, "127.0.0.1:57110");
        assert_eq!(config.scsynth_path, None);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let config = Config::from_toml("signal_addr = [not toml");
        assert_eq!(config.signal_addr, "127.0.0.1:9002");
    }

    #[test]
    fn server_port_parses_from_addr() {
        let mut config = Config::default();
        assert_eq!(config.server_port(), 57110);
        config.server_addr = "10.0.0.2:57200".to_string();
        assert_eq!(config.server_port(), 57200);
        config.server_addr = "garbage".to_string();
        assert_eq!(config.server_port(), 57110);
    }
}
