mod rig;
mod server;
mod transition;

use std::process::Child;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use super::backend::AudioBackend;
use crate::state::SceneCatalog;

pub use rig::{SourceInfo, SourceRig};

// SuperCollider group IDs for execution ordering
pub const GROUP_SOURCES: i32 = 100;
pub const GROUP_PROCESSING: i32 = 200;
pub const GROUP_OUTPUT: i32 = 300;

/// Private audio bus the player writes to and the effect chain processes
/// in place. Buses 0..15 are hardware channels on a stock scsynth.
pub const CHAIN_BUS: i32 = 16;

/// Default player amplitude feeding the chain.
pub const SOURCE_GAIN: f32 = 0.85;

/// Glide time for the return to baseline that precedes every scene.
pub const RESET_RAMP_SECS: f32 = 0.5;

/// Settle window between the baseline reset and the scene's own directives.
pub const APPLY_DELAY: Duration = Duration::from_millis(120);

/// Step interval for manual playback-rate interpolation.
pub const RATE_TICK: Duration = Duration::from_millis(20);

/// How long the baseline reset takes to bring the rate back to 1.0.
pub const RATE_RESET_SECS: f32 = 5.0;

/// Tempo used to resolve note-length values to seconds.
const DEFAULT_BPM: f32 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Connected,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Playing,
    Paused,
}

/// Events surfaced from `tick` for the audio thread to forward as feedback.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A requested scene's directives landed after its settle window.
    SceneApplied { scene_id: String },
}

/// A scene waiting out the settle window. At most one exists; a newer
/// request replaces it before it fires.
#[derive(Debug)]
struct PendingTransition {
    scene_id: String,
    due: Instant,
}

/// An in-flight playback-rate interpolation. At most one exists; starting
/// another replaces it from the current value.
#[derive(Debug)]
struct RateRamp {
    target: f32,
    step: f32,
    steps_left: u32,
    next_due: Instant,
}

pub struct AudioEngine {
    backend: Option<Box<dyn AudioBackend>>,
    next_node_id: i32,
    is_running: bool,
    scsynth_process: Option<Child>,
    server_status: ServerStatus,
    compile_receiver: Option<Receiver<Result<String, String>>>,
    is_compiling: bool,
    groups_created: bool,
    catalog: SceneCatalog,
    bpm: f32,
    source_gain: f32,
    rig: Option<SourceRig>,
    transport: Transport,
    current_rate: f32,
    current_scene: Option<String>,
    pending: Option<PendingTransition>,
    rate_ramp: Option<RateRamp>,
}

impl AudioEngine {
    pub fn new() -> Self {
        Self {
            backend: None,
            next_node_id: 1000,
            is_running: false,
            scsynth_process: None,
            server_status: ServerStatus::Stopped,
            compile_receiver: None,
            is_compiling: false,
            groups_created: false,
            catalog: SceneCatalog::builtin(),
            bpm: DEFAULT_BPM,
            source_gain: SOURCE_GAIN,
            rig: None,
            transport: Transport::Stopped,
            current_rate: 1.0,
            current_scene: None,
            pending: None,
            rate_ramp: None,
        }
    }

    /// Advance deferred work: fire a pending scene whose settle window has
    /// elapsed and step any rate interpolation. Call frequently; deadlines
    /// are checked against `now`, not against call cadence.
    pub fn tick(&mut self, now: Instant) -> Vec<EngineEvent> {
        let mut events = Vec::new();

        if let Some(pending) = self.pending.take() {
            if now >= pending.due {
                match self.apply_scene(&pending.scene_id, now) {
                    Ok(()) => events.push(EngineEvent::SceneApplied {
                        scene_id: pending.scene_id,
                    }),
                    Err(e) => log::warn!("Scene '{}' failed to apply: {}", pending.scene_id, e),
                }
            } else {
                self.pending = Some(pending);
            }
        }

        self.tick_rate_ramp(now);

        events
    }

    /// Replace the recipe book. Scenes already applied are unaffected.
    pub fn set_catalog(&mut self, catalog: SceneCatalog) {
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &SceneCatalog {
        &self.catalog
    }

    /// Player amplitude for the next (and any current) player synth.
    pub fn set_source_gain(&mut self, gain: f32) {
        self.source_gain = gain.clamp(0.0, 1.0);
        if let (Some(backend), Some(rig)) = (self.backend.as_deref(), self.rig.as_ref()) {
            if let Some(player) = rig.player_node {
                let _ = backend.set_param(player, "amp", self.source_gain);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn status(&self) -> ServerStatus {
        self.server_status
    }

    pub fn server_running(&self) -> bool {
        self.scsynth_process.is_some()
    }

    pub fn is_compiling(&self) -> bool {
        self.is_compiling
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn current_rate(&self) -> f32 {
        self.current_rate
    }

    pub fn current_scene(&self) -> Option<&str> {
        self.current_scene.as_deref()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop_server();
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{TestBackend, TestOp};
    use crate::state::{Directive, EffectKind, SceneRecipe};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn connected_engine() -> (AudioEngine, Arc<TestBackend>) {
        let backend = Arc::new(TestBackend::new());
        let mut engine = AudioEngine::new();
        engine.backend = Some(Box::new(backend.clone()));
        engine.is_running = true;
        engine.server_status = ServerStatus::Connected;
        (engine, backend)
    }

    fn write_wav(dir: &tempfile::TempDir, name: &str, channels: u16) -> PathBuf {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = dir.path().join(name);
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..4410i32 {
            for _ in 0..channels {
                writer.write_sample(((i % 80) * 64) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
        path
    }

    fn loaded_engine(channels: u16) -> (AudioEngine, Arc<TestBackend>, tempfile::TempDir) {
        let (mut engine, backend) = connected_engine();
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(&dir, "source.wav", channels);
        engine.load_source(&path).expect("load source");
        (engine, backend, dir)
    }

    fn node_of(engine: &AudioEngine, kind: EffectKind) -> i32 {
        engine.rig.as_ref().unwrap().node_for(kind).unwrap()
    }

    fn player_node(engine: &AudioEngine) -> i32 {
        engine.rig.as_ref().unwrap().player_node.unwrap()
    }

    /// Drive `tick` in 5ms increments over [from, until], collecting events.
    fn run_ticks(engine: &mut AudioEngine, from: Instant, until: Instant) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let mut t = from;
        while t <= until {
            events.extend(engine.tick(t));
            t += Duration::from_millis(5);
        }
        events
    }

    #[test]
    fn load_source_builds_effect_chain_in_order() {
        let (engine, backend, _dir) = loaded_engine(2);

        assert!(backend
            .find(|op| matches!(op, TestOp::LoadBuffer { bufnum: 0, .. }))
            .is_some());
        assert_eq!(
            backend.count(|op| matches!(op, TestOp::CreateGroup { .. })),
            3
        );

        let synths = backend.synths_created();
        // 13 chain units plus the output limiter; no player until play()
        assert_eq!(synths.len(), 14);
        let names: Vec<String> = synths
            .iter()
            .filter_map(|op| match op {
                TestOp::CreateSynth { def_name, .. } => Some(def_name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names[0], "samhain_compressor");
        assert_eq!(names[1], "samhain_eq3");
        assert_eq!(names[12], "samhain_reverb");
        assert_eq!(names[13], "samhain_limiter");

        // every node in the chain processes the shared bus in place
        for op in &synths {
            if let TestOp::CreateSynth { params, .. } = op {
                assert!(params.iter().any(|(k, v)| k == "bus" && *v == CHAIN_BUS as f32));
            }
        }
        assert!(engine.rig.as_ref().unwrap().player_node.is_none());
        assert_eq!(engine.transport(), Transport::Stopped);
    }

    #[test]
    fn effect_nodes_start_at_schema_defaults() {
        let (engine, backend, _dir) = loaded_engine(2);

        let lowpass = node_of(&engine, EffectKind::Lowpass);
        let op = backend
            .find(|op| matches!(op, TestOp::CreateSynth { node_id, .. } if *node_id == lowpass))
            .unwrap();
        if let TestOp::CreateSynth { params, group_id, .. } = op {
            assert_eq!(group_id, GROUP_PROCESSING);
            assert!(params.contains(&("frequency".to_string(), 20000.0)));
            assert!(params.contains(&("rolloff".to_string(), -12.0)));
        }

        // note-length defaults resolve to seconds at the engine tempo
        let delay = node_of(&engine, EffectKind::FeedbackDelay);
        let op = backend
            .find(|op| matches!(op, TestOp::CreateSynth { node_id, .. } if *node_id == delay))
            .unwrap();
        if let TestOp::CreateSynth { params, .. } = op {
            assert!(params.contains(&("delay_time".to_string(), 0.25)));
        }
    }

    #[test]
    fn reload_tears_down_previous_rig() {
        let (mut engine, backend, dir) = loaded_engine(2);
        let old_nodes: Vec<i32> = engine
            .rig
            .as_ref()
            .unwrap()
            .effect_nodes
            .iter()
            .map(|(_, id)| *id)
            .collect();
        let old_output = engine.rig.as_ref().unwrap().output_node;

        let path = write_wav(&dir, "other.wav", 2);
        engine.load_source(&path).unwrap();

        let freed = backend.nodes_freed();
        for id in old_nodes {
            assert!(freed.contains(&id));
        }
        assert!(freed.contains(&old_output));
        assert!(backend
            .find(|op| matches!(op, TestOp::FreeBuffer(0)))
            .is_some());
        // groups persist across reloads
        assert_eq!(
            backend.count(|op| matches!(op, TestOp::CreateGroup { .. })),
            3
        );
    }

    #[test]
    fn load_source_rejects_unreadable_file() {
        let (mut engine, backend) = connected_engine();
        let err = engine
            .load_source(Path::new("/nonexistent/source.wav"))
            .unwrap_err();
        assert!(err.contains("source.wav"));
        assert!(backend.operations().is_empty());
    }

    #[test]
    fn play_pause_stop_lifecycle() {
        let (mut engine, backend, _dir) = loaded_engine(2);

        engine.play().unwrap();
        let player = player_node(&engine);
        let create = backend
            .find(|op| matches!(op, TestOp::CreateSynth { node_id, .. } if *node_id == player))
            .unwrap();
        if let TestOp::CreateSynth {
            def_name,
            group_id,
            params,
            ..
        } = create
        {
            assert_eq!(def_name, "samhain_player");
            assert_eq!(group_id, GROUP_SOURCES);
            assert!(params.contains(&("bufnum".to_string(), 0.0)));
            assert!(params.contains(&("out".to_string(), CHAIN_BUS as f32)));
            assert!(params.contains(&("rate".to_string(), 1.0)));
            assert!(params.contains(&("amp".to_string(), SOURCE_GAIN)));
        }

        engine.pause().unwrap();
        assert!(backend
            .find(|op| matches!(op, TestOp::RunNode { node_id, on: false } if *node_id == player))
            .is_some());
        assert_eq!(engine.transport(), Transport::Paused);

        engine.play().unwrap();
        assert!(backend
            .find(|op| matches!(op, TestOp::RunNode { node_id, on: true } if *node_id == player))
            .is_some());
        // resume reuses the paused node
        assert_eq!(
            backend.count(
                |op| matches!(op, TestOp::CreateSynth { def_name, .. } if def_name == "samhain_player")
            ),
            1
        );

        engine.stop().unwrap();
        assert!(backend.nodes_freed().contains(&player));
        assert!(engine.rig.is_some());
        assert!(engine.rig.as_ref().unwrap().player_node.is_none());
        assert_eq!(engine.transport(), Transport::Stopped);

        // play after stop spawns a fresh player
        engine.play().unwrap();
        assert_ne!(player_node(&engine), player);
    }

    #[test]
    fn mono_source_uses_mono_player() {
        let (mut engine, backend, _dir) = loaded_engine(1);
        engine.play().unwrap();
        assert!(backend
            .find(|op| {
                matches!(op, TestOp::CreateSynth { def_name, .. } if def_name == "samhain_player_mono")
            })
            .is_some());
    }

    #[test]
    fn pause_without_player_is_rejected() {
        let (mut engine, _backend, _dir) = loaded_engine(2);
        assert!(engine.pause().is_err());
    }

    #[test]
    fn custom_gain_applies_to_player() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.set_source_gain(0.5);
        engine.play().unwrap();
        let player = player_node(&engine);
        let create = backend
            .find(|op| matches!(op, TestOp::CreateSynth { node_id, .. } if *node_id == player))
            .unwrap();
        if let TestOp::CreateSynth { params, .. } = create {
            assert!(params.contains(&("amp".to_string(), 0.5)));
        }
        // live change reaches the playing node
        engine.set_source_gain(0.7);
        assert_eq!(backend.last_param(player, "amp"), Some(0.7));
    }

    #[test]
    fn scene_request_glides_to_baseline_first() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();
        backend.clear();

        let t0 = Instant::now();
        engine.request_scene("lofi", t0).unwrap();

        // rampable params glide home over the reset window
        let eq = node_of(&engine, EffectKind::Eq3);
        let op = backend
            .find(|op| matches!(op, TestOp::SetParams { node_id, .. } if *node_id == eq))
            .unwrap();
        if let TestOp::SetParams { params, .. } = op {
            assert_eq!(
                params,
                vec![("low".to_string(), 0.0), ("low_lag".to_string(), RESET_RAMP_SECS)]
            );
        }

        // structural params snap home with a plain set
        let crusher = node_of(&engine, EffectKind::BitCrusher);
        assert!(backend
            .find(|op| {
                matches!(op, TestOp::SetParam { node_id, param, value }
                    if *node_id == crusher && param == "bits" && *value == 8.0)
            })
            .is_some());

        // the scene itself has not fired yet
        assert!(engine.pending.is_some());
        assert_eq!(backend.last_param(eq, "low"), Some(0.0));
    }

    #[test]
    fn scene_applies_after_settle_delay() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();

        let t0 = Instant::now();
        engine.request_scene("lofi", t0).unwrap();
        backend.clear();

        assert!(engine.tick(t0 + Duration::from_millis(119)).is_empty());
        let eq = node_of(&engine, EffectKind::Eq3);
        assert_eq!(backend.last_param(eq, "low"), None);

        let events = engine.tick(t0 + Duration::from_millis(121));
        assert_eq!(
            events,
            vec![EngineEvent::SceneApplied {
                scene_id: "lofi".to_string()
            }]
        );

        assert_eq!(backend.last_param(eq, "low"), Some(-12.0));
        assert_eq!(backend.last_param(eq, "low_lag"), Some(1.0));

        // an unramped directive on a glidable param moves with zero lag
        let chorus = node_of(&engine, EffectKind::Chorus);
        assert_eq!(backend.last_param(chorus, "frequency"), Some(3.0));
        assert_eq!(backend.last_param(chorus, "frequency_lag"), Some(0.0));

        // structural params go out as single-value sets
        assert!(backend
            .find(|op| {
                matches!(op, TestOp::SetParam { node_id, param, value }
                    if *node_id == chorus && param == "depth" && *value == 0.7)
            })
            .is_some());

        assert_eq!(engine.current_scene.as_deref(), Some("lofi"));
        assert!(engine.pending.is_none());
    }

    #[test]
    fn latest_request_wins() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();

        let t0 = Instant::now();
        engine.request_scene("epic", t0).unwrap();
        engine
            .request_scene("lofi", t0 + Duration::from_millis(50))
            .unwrap();

        // nothing fires at the first request's would-be deadline
        assert!(engine.tick(t0 + Duration::from_millis(125)).is_empty());

        let events = engine.tick(t0 + Duration::from_millis(171));
        assert_eq!(
            events,
            vec![EngineEvent::SceneApplied {
                scene_id: "lofi".to_string()
            }]
        );

        // the superseded scene's directives never landed
        let widener = node_of(&engine, EffectKind::StereoWidener);
        assert_eq!(backend.last_param(widener, "width"), Some(0.5));
        assert_eq!(engine.current_scene.as_deref(), Some("lofi"));
    }

    #[test]
    fn reset_signal_cancels_pending_scene() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();

        let t0 = Instant::now();
        engine.request_scene("epic", t0).unwrap();
        engine.reset_scene(t0 + Duration::from_millis(60)).unwrap();
        assert!(engine.pending.is_none());

        let events = run_ticks(
            &mut engine,
            t0 + Duration::from_millis(60),
            t0 + Duration::from_millis(400),
        );
        assert!(events.is_empty());

        let reverb = node_of(&engine, EffectKind::Reverb);
        assert_eq!(backend.last_param(reverb, "wet"), Some(0.0));
        assert_eq!(engine.current_scene, None);
    }

    #[test]
    fn reset_is_idempotent() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();
        let reverb = node_of(&engine, EffectKind::Reverb);

        let t0 = Instant::now();
        engine.reset_scene(t0).unwrap();
        let first: Vec<TestOp> = backend
            .operations()
            .into_iter()
            .filter(|op| matches!(op, TestOp::SetParams { node_id, .. } if *node_id == reverb))
            .collect();
        assert!(!first.is_empty());

        backend.clear();
        engine.reset_scene(t0 + Duration::from_secs(1)).unwrap();
        let second: Vec<TestOp> = backend
            .operations()
            .into_iter()
            .filter(|op| matches!(op, TestOp::SetParams { node_id, .. } if *node_id == reverb))
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn unknown_scene_is_rejected_without_side_effects() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        backend.clear();
        let err = engine.request_scene("wat", Instant::now()).unwrap_err();
        assert!(err.contains("wat"));
        assert!(engine.pending.is_none());
        assert!(backend.operations().is_empty());
    }

    #[test]
    fn scene_without_source_is_rejected() {
        let (mut engine, _backend) = connected_engine();
        let err = engine.request_scene("epic", Instant::now()).unwrap_err();
        assert!(err.contains("No source"));
        assert!(engine.reset_scene(Instant::now()).is_err());
    }

    #[test]
    fn rate_ramp_steps_linearly_and_lands_exactly() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();
        let player = player_node(&engine);
        backend.clear();

        let t0 = Instant::now();
        engine.set_playback_rate(0.9, Some(0.1), t0);
        // first step waits out a full tick interval
        assert!(backend.operations().is_empty());

        run_ticks(&mut engine, t0, t0 + Duration::from_millis(200));
        let rates: Vec<f32> = backend
            .operations()
            .iter()
            .filter_map(|op| match op {
                TestOp::SetParam {
                    node_id,
                    param,
                    value,
                } if *node_id == player && param == "rate" => Some(*value),
                _ => None,
            })
            .collect();

        assert_eq!(rates.len(), 5); // 100ms of ramp at 20ms per step
        assert_eq!(*rates.last().unwrap(), 0.9); // assigned, not accumulated
        for pair in rates.windows(2) {
            assert!(pair[1] < pair[0]);
        }
        assert!(engine.rate_ramp.is_none());
        assert_eq!(engine.current_rate, 0.9);
    }

    #[test]
    fn immediate_rate_set_skips_interpolation() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();
        let player = player_node(&engine);
        backend.clear();

        engine.set_playback_rate(1.2, None, Instant::now());
        assert_eq!(backend.last_param(player, "rate"), Some(1.2));
        assert!(engine.rate_ramp.is_none());
    }

    #[test]
    fn new_rate_ramp_replaces_in_flight() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();
        let player = player_node(&engine);

        let t0 = Instant::now();
        engine.set_playback_rate(0.5, Some(10.0), t0);
        run_ticks(&mut engine, t0, t0 + Duration::from_secs(1));
        let partway = engine.current_rate;
        assert!(partway < 1.0 && partway > 0.9);

        engine.set_playback_rate(1.01, Some(0.1), t0 + Duration::from_secs(1));
        run_ticks(
            &mut engine,
            t0 + Duration::from_secs(1),
            t0 + Duration::from_secs(2),
        );
        assert_eq!(engine.current_rate, 1.01);
        assert_eq!(backend.last_param(player, "rate"), Some(1.01));

        // nothing keeps stepping once the ramp has landed
        backend.clear();
        run_ticks(
            &mut engine,
            t0 + Duration::from_secs(2),
            t0 + Duration::from_secs(3),
        );
        assert!(backend.operations().is_empty());
    }

    #[test]
    fn scene_rate_change_steps_manually_not_via_lag() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();

        let t0 = Instant::now();
        engine.request_scene("epic", t0).unwrap();
        run_ticks(&mut engine, t0, t0 + Duration::from_secs(6));

        assert_eq!(engine.current_rate, 0.985);
        assert!(backend
            .find(|op| {
                matches!(op, TestOp::SetParams { params, .. }
                    if params.iter().any(|(k, _)| k == "rate_lag"))
            })
            .is_none());
        assert!(backend
            .find(|op| matches!(op, TestOp::SetParam { param, .. } if param == "rate"))
            .is_some());
    }

    #[test]
    fn ramp_on_structural_param_degrades_to_set() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        let mut catalog = SceneCatalog::builtin();
        catalog.insert(SceneRecipe {
            id: "crushy".to_string(),
            rate: None,
            directives: vec![Directive::ramp("bit_crusher", "bits", 4.0, 2.0)],
        });
        engine.set_catalog(catalog);
        engine.play().unwrap();

        let t0 = Instant::now();
        engine.request_scene("crushy", t0).unwrap();
        backend.clear();
        engine.tick(t0 + APPLY_DELAY);

        let crusher = node_of(&engine, EffectKind::BitCrusher);
        assert!(backend
            .find(|op| {
                matches!(op, TestOp::SetParam { node_id, param, value }
                    if *node_id == crusher && param == "bits" && *value == 4.0)
            })
            .is_some());
        assert_eq!(backend.last_param(crusher, "bits_lag"), None);
    }

    #[test]
    fn out_of_range_directive_is_clamped() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        let mut catalog = SceneCatalog::builtin();
        catalog.insert(SceneRecipe {
            id: "hot".to_string(),
            rate: None,
            directives: vec![Directive::set("feedback_delay", "feedback", 2.0)],
        });
        engine.set_catalog(catalog);
        engine.play().unwrap();

        let t0 = Instant::now();
        engine.request_scene("hot", t0).unwrap();
        engine.tick(t0 + APPLY_DELAY);

        let delay = node_of(&engine, EffectKind::FeedbackDelay);
        assert_eq!(backend.last_param(delay, "feedback"), Some(0.95));
    }

    #[test]
    fn new_source_discards_pending_transition() {
        let (mut engine, _backend, dir) = loaded_engine(2);
        engine.play().unwrap();

        let t0 = Instant::now();
        engine.request_scene("epic", t0).unwrap();
        engine.set_playback_rate(0.9, Some(5.0), t0);

        let path = write_wav(&dir, "other.wav", 2);
        engine.load_source(&path).unwrap();

        assert!(engine.pending.is_none());
        assert!(engine.rate_ramp.is_none());
        assert_eq!(engine.current_rate, 1.0);
        let events = run_ticks(&mut engine, t0, t0 + Duration::from_millis(300));
        assert!(events.is_empty());
    }

    #[test]
    fn disconnect_frees_rig_and_resets_status() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();
        let player = player_node(&engine);
        let nodes: Vec<i32> = engine
            .rig
            .as_ref()
            .unwrap()
            .effect_nodes
            .iter()
            .map(|(_, id)| *id)
            .collect();
        let output = engine.rig.as_ref().unwrap().output_node;

        engine.disconnect();

        let freed = backend.nodes_freed();
        assert!(freed.contains(&player));
        for id in nodes {
            assert!(freed.contains(&id));
        }
        assert!(freed.contains(&output));
        assert!(backend
            .find(|op| matches!(op, TestOp::FreeBuffer(0)))
            .is_some());
        assert!(engine.rig.is_none());
        assert_eq!(engine.status(), ServerStatus::Stopped);
        assert!(!engine.is_running());
    }

    #[test]
    fn baseline_round_trip_after_scene() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();

        let t0 = Instant::now();
        engine.request_scene("lofi", t0).unwrap();
        engine.tick(t0 + APPLY_DELAY);
        engine.reset_scene(t0 + Duration::from_secs(1)).unwrap();

        let eq = node_of(&engine, EffectKind::Eq3);
        let chorus = node_of(&engine, EffectKind::Chorus);
        let dist = node_of(&engine, EffectKind::Distortion);
        assert_eq!(backend.last_param(eq, "low"), Some(0.0));
        assert_eq!(backend.last_param(eq, "high"), Some(0.0));
        assert_eq!(backend.last_param(chorus, "wet"), Some(0.0));
        assert_eq!(backend.last_param(chorus, "depth"), Some(0.9));
        assert_eq!(backend.last_param(chorus, "frequency"), Some(10.0));
        assert_eq!(backend.last_param(dist, "distortion"), Some(0.4));
        assert_eq!(backend.last_param(dist, "wet"), Some(0.0));
        assert_eq!(engine.current_scene, None);
    }

    #[test]
    fn repeated_transitions_leave_no_residue() {
        let (mut engine, backend, _dir) = loaded_engine(2);
        engine.play().unwrap();

        let scenes = [
            "epic", "lofi", "horror", "warmth", "panic", "suspense", "cold", "intimacy",
            "anxiety", "heroic",
        ];
        let mut t = Instant::now();
        let mut applied = 0;
        for id in &scenes {
            engine.request_scene(id, t).unwrap();
            applied += run_ticks(&mut engine, t, t + Duration::from_millis(200)).len();
            t += Duration::from_millis(200);
        }

        assert_eq!(applied, scenes.len());
        assert!(engine.pending.is_none());

        // exactly one baseline glide per transition on a probe param
        let reverb = node_of(&engine, EffectKind::Reverb);
        let baseline_glides = backend.count(|op| {
            matches!(op, TestOp::SetParams { node_id, params }
                if *node_id == reverb
                    && *params == vec![
                        ("room_size".to_string(), 0.3),
                        ("room_size_lag".to_string(), RESET_RAMP_SECS),
                    ])
        });
        assert_eq!(baseline_glides, scenes.len());
    }
}
