//! Scene transitions: the request/reset/apply cycle and manual rate ramps.
//!
//! Every request follows the same shape: drop whatever was queued, glide
//! the whole chain back to baseline, then fire the scene's directives after
//! a short settle window. Overlapping requests therefore collapse to the
//! newest one, and parameters never drift because each scene starts from
//! the same known state.

use std::time::Instant;

use super::{
    AudioEngine, PendingTransition, RateRamp, APPLY_DELAY, RATE_RESET_SECS, RATE_TICK,
    RESET_RAMP_SECS,
};
use crate::audio::backend::AudioBackend;
use crate::state::EffectKind;

/// Send one parameter, pairing it with its `_lag` companion when the unit
/// can glide. Value and lag time travel in a single message so the server
/// never sees one without the other.
fn send_param(
    backend: &dyn AudioBackend,
    node_id: i32,
    name: &str,
    value: f32,
    rampable: bool,
    ramp_secs: Option<f32>,
) -> Result<(), String> {
    if rampable {
        let lag = format!("{name}_lag");
        let secs = ramp_secs.unwrap_or(0.0).max(0.0);
        backend
            .set_params(node_id, &[(name, value), (lag.as_str(), secs)])
            .map_err(|e| e.to_string())
    } else {
        if ramp_secs.is_some() {
            log::debug!("Parameter '{}' does not glide; setting immediately", name);
        }
        backend
            .set_param(node_id, name, value)
            .map_err(|e| e.to_string())
    }
}

impl AudioEngine {
    /// Queue a scene: reset to baseline now, apply the recipe after the
    /// settle window. A request that lands while another is queued replaces
    /// it (latest wins).
    pub fn request_scene(&mut self, scene_id: &str, now: Instant) -> Result<(), String> {
        if self.catalog.lookup(scene_id).is_none() {
            return Err(format!("Unknown scene '{}'", scene_id));
        }
        if self.rig.is_none() {
            return Err("No source loaded".to_string());
        }

        self.pending = None;
        self.reset_to_baseline(now)?;
        self.pending = Some(PendingTransition {
            scene_id: scene_id.to_string(),
            due: now + APPLY_DELAY,
        });
        log::debug!("Scene '{}' queued", scene_id);
        Ok(())
    }

    /// Return to baseline and stay there: cancels any queued scene.
    pub fn reset_scene(&mut self, now: Instant) -> Result<(), String> {
        if self.rig.is_none() {
            return Err("No source loaded".to_string());
        }
        self.pending = None;
        self.reset_to_baseline(now)
    }

    /// Glide every rampable parameter home, snap the structural ones, and
    /// start the slow rate ramp back to 1.0. Writing absolute defaults to
    /// every unit makes this safe to run from any state, any number of times.
    fn reset_to_baseline(&mut self, now: Instant) -> Result<(), String> {
        {
            let backend = self.backend.as_deref().ok_or("Not connected")?;
            let rig = self.rig.as_ref().ok_or("No source loaded")?;
            for (kind, node_id) in &rig.effect_nodes {
                for param in kind.default_params() {
                    let value = param.value.to_control(self.bpm);
                    let ramp_secs = if param.ramp { Some(RESET_RAMP_SECS) } else { None };
                    send_param(backend, *node_id, &param.name, value, param.ramp, ramp_secs)?;
                }
            }
        }
        self.start_rate_ramp(1.0, Some(RATE_RESET_SECS), now);
        self.current_scene = None;
        Ok(())
    }

    /// Fire a recipe's directives. Runs from `tick` once the settle window
    /// has elapsed; by then the chain is (or is gliding) home. Directives
    /// that no longer resolve are skipped, not fatal.
    pub(super) fn apply_scene(&mut self, scene_id: &str, now: Instant) -> Result<(), String> {
        let recipe = match self.catalog.lookup(scene_id) {
            Some(r) => r.clone(),
            None => return Err(format!("Scene '{}' vanished from the catalog", scene_id)),
        };

        {
            let backend = self.backend.as_deref().ok_or("Not connected")?;
            let rig = self.rig.as_ref().ok_or("No source loaded")?;
            for d in &recipe.directives {
                let kind = match EffectKind::from_key(&d.unit) {
                    Some(k) => k,
                    None => {
                        log::warn!("Scene '{}': unknown unit '{}'", scene_id, d.unit);
                        continue;
                    }
                };
                let node_id = match rig.node_for(kind) {
                    Some(id) => id,
                    None => {
                        log::warn!("Scene '{}': no node for '{}'", scene_id, d.unit);
                        continue;
                    }
                };
                let schema = match kind.param(&d.param) {
                    Some(p) => p,
                    None => {
                        log::warn!(
                            "Scene '{}': '{}' has no parameter '{}'",
                            scene_id,
                            d.unit,
                            d.param
                        );
                        continue;
                    }
                };
                let value = d.value.to_control(self.bpm).clamp(schema.min, schema.max);
                send_param(backend, node_id, &d.param, value, schema.ramp, d.ramp_secs)?;
            }
        }

        if let Some(rate) = &recipe.rate {
            self.start_rate_ramp(rate.value, rate.ramp_secs, now);
        }
        self.current_scene = Some(scene_id.to_string());
        log::info!("Scene '{}' applied", scene_id);
        Ok(())
    }

    /// Move the playback rate, immediately or over `ramp_secs`. Rate changes
    /// always interpolate on this side of the wire so the player's pitch
    /// follows a line we control, never a server-side lag curve.
    pub fn set_playback_rate(&mut self, value: f32, ramp_secs: Option<f32>, now: Instant) {
        self.start_rate_ramp(value, ramp_secs, now);
    }

    /// Replace any in-flight interpolation with one from the current value.
    pub(super) fn start_rate_ramp(&mut self, target: f32, ramp_secs: Option<f32>, now: Instant) {
        match ramp_secs {
            Some(secs) if secs > 0.0 => {
                let steps = ((secs / RATE_TICK.as_secs_f32()).ceil() as u32).max(1);
                let step = (target - self.current_rate) / steps as f32;
                self.rate_ramp = Some(RateRamp {
                    target,
                    step,
                    steps_left: steps,
                    next_due: now + RATE_TICK,
                });
            }
            _ => {
                self.rate_ramp = None;
                self.current_rate = target;
                self.send_rate(target);
            }
        }
    }

    /// Advance the rate interpolation past any elapsed step deadlines. The
    /// final step assigns the target outright so float error cannot leave
    /// the rate a hair off after a long ramp.
    pub(super) fn tick_rate_ramp(&mut self, now: Instant) {
        while let Some(ramp) = self.rate_ramp.as_mut() {
            if now < ramp.next_due {
                return;
            }
            ramp.next_due += RATE_TICK;
            ramp.steps_left -= 1;
            let finished = ramp.steps_left == 0;
            let value = if finished {
                ramp.target
            } else {
                self.current_rate + ramp.step
            };
            if finished {
                self.rate_ramp = None;
            }
            self.current_rate = value;
            self.send_rate(value);
            if finished {
                return;
            }
        }
    }

    fn send_rate(&self, value: f32) {
        if let (Some(backend), Some(rig)) = (self.backend.as_deref(), self.rig.as_ref()) {
            if let Some(player) = rig.player_node {
                let _ = backend.set_param(player, "rate", value);
            }
        }
    }
}
