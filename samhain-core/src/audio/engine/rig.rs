//! Source rig: the node graph built for one loaded sound file.
//!
//! A rig is a buffer, an optional looping player, the fixed 13-unit effect
//! chain, and an output limiter. The chain processes `CHAIN_BUS` in place,
//! so unit order on the server is the mix order. Loading a new source tears
//! the whole rig down and builds a fresh one at schema defaults.

use std::path::{Path, PathBuf};

use super::{
    AudioEngine, Transport, CHAIN_BUS, GROUP_OUTPUT, GROUP_PROCESSING, GROUP_SOURCES,
};
use crate::audio::backend::AudioBackend;
use crate::state::EffectKind;

/// SuperCollider buffer number holding the current source file. There is
/// only ever one source; the slot is freed and reused on reload.
const SOURCE_BUFNUM: i32 = 0;

/// Per-source node graph.
#[derive(Debug)]
pub struct SourceRig {
    pub path: PathBuf,
    pub bufnum: i32,
    pub channels: u16,
    pub duration_secs: f32,
    /// Present from play until stop; paused players keep their node.
    pub player_node: Option<i32>,
    /// Chain units in server execution order.
    pub effect_nodes: Vec<(EffectKind, i32)>,
    pub output_node: i32,
}

impl SourceRig {
    pub fn node_for(&self, kind: EffectKind) -> Option<i32> {
        self.effect_nodes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, id)| *id)
    }
}

/// What `load_source` reports back.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub channels: u16,
    pub duration_secs: f32,
}

impl AudioEngine {
    /// Load a sound file and build its rig. Any previous rig, pending
    /// transition, or rate ramp is discarded first; the new chain starts
    /// at schema defaults with playback stopped.
    pub fn load_source(&mut self, path: &Path) -> Result<SourceInfo, String> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| format!("Cannot open {}: {}", path.display(), e))?;
        let spec = reader.spec();
        let channels = spec.channels;
        if channels == 0 || channels > 2 {
            return Err(format!(
                "{}: {} channels (only mono and stereo sources are supported)",
                path.display(),
                channels
            ));
        }
        let duration_secs = reader.duration() as f32 / spec.sample_rate as f32;
        drop(reader);

        if self.backend.is_none() {
            return Err("Not connected".to_string());
        }
        self.ensure_groups()?;
        self.teardown_rig();
        self.pending = None;
        self.rate_ramp = None;
        self.current_rate = 1.0;
        self.current_scene = None;

        let backend = self.backend.as_deref().ok_or("Not connected")?;
        backend
            .load_buffer(SOURCE_BUFNUM, path)
            .map_err(|e| e.to_string())?;

        let mut effect_nodes = Vec::with_capacity(EffectKind::all().len());
        for kind in EffectKind::all() {
            let node_id = self.next_node_id;
            self.next_node_id += 1;
            let mut params: Vec<(String, f32)> = vec![("bus".to_string(), CHAIN_BUS as f32)];
            for p in kind.default_params() {
                params.push((p.name.clone(), p.value.to_control(self.bpm)));
            }
            backend
                .create_synth(kind.synth_def_name(), node_id, GROUP_PROCESSING, &params)
                .map_err(|e| e.to_string())?;
            effect_nodes.push((kind, node_id));
        }

        let output_node = self.next_node_id;
        self.next_node_id += 1;
        backend
            .create_synth(
                "samhain_limiter",
                output_node,
                GROUP_OUTPUT,
                &[("bus".to_string(), CHAIN_BUS as f32)],
            )
            .map_err(|e| e.to_string())?;

        self.rig = Some(SourceRig {
            path: path.to_path_buf(),
            bufnum: SOURCE_BUFNUM,
            channels,
            duration_secs,
            player_node: None,
            effect_nodes,
            output_node,
        });
        self.transport = Transport::Stopped;

        log::info!(
            "Loaded {} ({} ch, {:.1}s)",
            path.display(),
            channels,
            duration_secs
        );
        Ok(SourceInfo {
            path: path.to_path_buf(),
            channels,
            duration_secs,
        })
    }

    /// Start (or resume) playback. A stopped transport spawns a looping
    /// player at the current rate; a paused one resumes its node.
    pub fn play(&mut self) -> Result<(), String> {
        let (channels, bufnum) = match &self.rig {
            Some(rig) => (rig.channels, rig.bufnum),
            None => return Err("No source loaded".to_string()),
        };

        match self.transport {
            Transport::Playing => Ok(()),
            Transport::Paused => {
                let backend = self.backend.as_deref().ok_or("Not connected")?;
                if let Some(player) = self.rig.as_ref().and_then(|r| r.player_node) {
                    backend.run_node(player, true).map_err(|e| e.to_string())?;
                }
                self.transport = Transport::Playing;
                Ok(())
            }
            Transport::Stopped => {
                let node_id = self.next_node_id;
                self.next_node_id += 1;
                let def = if channels == 1 {
                    "samhain_player_mono"
                } else {
                    "samhain_player"
                };
                let params: Vec<(String, f32)> = vec![
                    ("bufnum".to_string(), bufnum as f32),
                    ("out".to_string(), CHAIN_BUS as f32),
                    ("rate".to_string(), self.current_rate),
                    ("amp".to_string(), self.source_gain),
                ];
                let backend = self.backend.as_deref().ok_or("Not connected")?;
                backend
                    .create_synth(def, node_id, GROUP_SOURCES, &params)
                    .map_err(|e| e.to_string())?;
                if let Some(rig) = self.rig.as_mut() {
                    rig.player_node = Some(node_id);
                }
                self.transport = Transport::Playing;
                Ok(())
            }
        }
    }

    /// Suspend the player in place. Scene transitions and rate ramps keep
    /// working against the paused node.
    pub fn pause(&mut self) -> Result<(), String> {
        match self.transport {
            Transport::Playing => {
                let backend = self.backend.as_deref().ok_or("Not connected")?;
                let player = self
                    .rig
                    .as_ref()
                    .and_then(|r| r.player_node)
                    .ok_or("Not playing")?;
                backend.run_node(player, false).map_err(|e| e.to_string())?;
                self.transport = Transport::Paused;
                Ok(())
            }
            Transport::Paused => Ok(()),
            Transport::Stopped => Err("Not playing".to_string()),
        }
    }

    /// Free the player but keep the rig; a later play starts a fresh one.
    pub fn stop(&mut self) -> Result<(), String> {
        if self.rig.is_none() {
            return Err("No source loaded".to_string());
        }
        if let Some(rig) = self.rig.as_mut() {
            if let Some(player) = rig.player_node.take() {
                if let Some(backend) = self.backend.as_deref() {
                    let _ = backend.free_node(player);
                }
            }
        }
        self.transport = Transport::Stopped;
        Ok(())
    }

    /// Free every node and buffer belonging to the current rig.
    pub(super) fn teardown_rig(&mut self) {
        if let Some(rig) = self.rig.take() {
            if let Some(backend) = self.backend.as_deref() {
                if let Some(player) = rig.player_node {
                    let _ = backend.free_node(player);
                }
                for (_, node_id) in &rig.effect_nodes {
                    let _ = backend.free_node(*node_id);
                }
                let _ = backend.free_node(rig.output_node);
                let _ = backend.free_buffer(rig.bufnum);
            }
        }
        self.transport = Transport::Stopped;
    }
}
