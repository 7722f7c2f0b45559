use serde::{Deserialize, Serialize};

use super::param::{NoteLen, Param, ParamValue};

/// The fixed bank of effect units, in signal-chain order.
///
/// The chain is: player -> compressor -> eq3 -> bit crusher -> distortion ->
/// highpass -> lowpass -> tremolo -> vibrato -> chorus -> feedback delay ->
/// auto panner -> stereo widener -> reverb -> limiter -> out. `all()` returns
/// this order and the rig builds from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Compressor,
    Eq3,
    BitCrusher,
    Distortion,
    Highpass,
    Lowpass,
    Tremolo,
    Vibrato,
    Chorus,
    FeedbackDelay,
    AutoPanner,
    StereoWidener,
    Reverb,
}

impl EffectKind {
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Compressor => "Compressor",
            EffectKind::Eq3 => "EQ3",
            EffectKind::BitCrusher => "Bit Crusher",
            EffectKind::Distortion => "Distortion",
            EffectKind::Highpass => "Highpass",
            EffectKind::Lowpass => "Lowpass",
            EffectKind::Tremolo => "Tremolo",
            EffectKind::Vibrato => "Vibrato",
            EffectKind::Chorus => "Chorus",
            EffectKind::FeedbackDelay => "Feedback Delay",
            EffectKind::AutoPanner => "Auto Panner",
            EffectKind::StereoWidener => "Stereo Widener",
            EffectKind::Reverb => "Reverb",
        }
    }

    /// Stable lookup key used by scene recipes and the rig's registry.
    pub fn key(&self) -> &'static str {
        match self {
            EffectKind::Compressor => "compressor",
            EffectKind::Eq3 => "eq3",
            EffectKind::BitCrusher => "bit_crusher",
            EffectKind::Distortion => "distortion",
            EffectKind::Highpass => "highpass",
            EffectKind::Lowpass => "lowpass",
            EffectKind::Tremolo => "tremolo",
            EffectKind::Vibrato => "vibrato",
            EffectKind::Chorus => "chorus",
            EffectKind::FeedbackDelay => "feedback_delay",
            EffectKind::AutoPanner => "auto_panner",
            EffectKind::StereoWidener => "stereo_widener",
            EffectKind::Reverb => "reverb",
        }
    }

    pub fn from_key(key: &str) -> Option<EffectKind> {
        EffectKind::all().into_iter().find(|e| e.key() == key)
    }

    pub fn synth_def_name(&self) -> &'static str {
        match self {
            EffectKind::Compressor => "samhain_compressor",
            EffectKind::Eq3 => "samhain_eq3",
            EffectKind::BitCrusher => "samhain_bitcrusher",
            EffectKind::Distortion => "samhain_distortion",
            EffectKind::Highpass => "samhain_highpass",
            EffectKind::Lowpass => "samhain_lowpass",
            EffectKind::Tremolo => "samhain_tremolo",
            EffectKind::Vibrato => "samhain_vibrato",
            EffectKind::Chorus => "samhain_chorus",
            EffectKind::FeedbackDelay => "samhain_delay",
            EffectKind::AutoPanner => "samhain_autopan",
            EffectKind::StereoWidener => "samhain_widener",
            EffectKind::Reverb => "samhain_reverb",
        }
    }

    /// Baseline parameter schema: the neutral defaults every reset restores.
    /// Wet mixes default to 0 so an idle chain passes audio untouched.
    pub fn default_params(&self) -> Vec<Param> {
        match self {
            EffectKind::Compressor => vec![
                Param { name: "threshold".to_string(), value: ParamValue::Float(-24.0), min: -60.0, max: 0.0, ramp: true },
                Param { name: "ratio".to_string(), value: ParamValue::Float(3.0), min: 1.0, max: 20.0, ramp: true },
                Param { name: "attack".to_string(), value: ParamValue::Float(0.05), min: 0.001, max: 1.0, ramp: true },
                Param { name: "release".to_string(), value: ParamValue::Float(0.2), min: 0.01, max: 1.0, ramp: true },
            ],
            EffectKind::Eq3 => vec![
                Param { name: "low".to_string(), value: ParamValue::Float(0.0), min: -60.0, max: 6.0, ramp: true },
                Param { name: "mid".to_string(), value: ParamValue::Float(0.0), min: -60.0, max: 6.0, ramp: true },
                Param { name: "high".to_string(), value: ParamValue::Float(0.0), min: -60.0, max: 6.0, ramp: true },
                Param { name: "low_freq".to_string(), value: ParamValue::Float(400.0), min: 50.0, max: 1000.0, ramp: true },
                Param { name: "high_freq".to_string(), value: ParamValue::Float(2500.0), min: 1000.0, max: 8000.0, ramp: true },
            ],
            EffectKind::BitCrusher => vec![
                Param { name: "bits".to_string(), value: ParamValue::Int(8), min: 1.0, max: 16.0, ramp: false },
                Param { name: "wet".to_string(), value: ParamValue::Float(0.0), min: 0.0, max: 1.0, ramp: true },
            ],
            EffectKind::Distortion => vec![
                Param { name: "distortion".to_string(), value: ParamValue::Float(0.4), min: 0.0, max: 1.0, ramp: false },
                Param { name: "wet".to_string(), value: ParamValue::Float(0.0), min: 0.0, max: 1.0, ramp: true },
            ],
            EffectKind::Highpass => vec![
                Param { name: "frequency".to_string(), value: ParamValue::Float(10.0), min: 10.0, max: 20000.0, ramp: true },
                Param { name: "q".to_string(), value: ParamValue::Float(1.0), min: 0.1, max: 10.0, ramp: true },
                Param { name: "rolloff".to_string(), value: ParamValue::Int(-12), min: -96.0, max: -12.0, ramp: false },
            ],
            EffectKind::Lowpass => vec![
                Param { name: "frequency".to_string(), value: ParamValue::Float(20000.0), min: 10.0, max: 20000.0, ramp: true },
                Param { name: "q".to_string(), value: ParamValue::Float(1.0), min: 0.1, max: 10.0, ramp: true },
                Param { name: "rolloff".to_string(), value: ParamValue::Int(-12), min: -96.0, max: -12.0, ramp: false },
            ],
            EffectKind::Tremolo => vec![
                Param { name: "frequency".to_string(), value: ParamValue::Float(10.0), min: 0.1, max: 20.0, ramp: true },
                Param { name: "depth".to_string(), value: ParamValue::Float(0.5), min: 0.0, max: 1.0, ramp: true },
                Param { name: "wet".to_string(), value: ParamValue::Float(0.0), min: 0.0, max: 1.0, ramp: true },
            ],
            EffectKind::Vibrato => vec![
                Param { name: "frequency".to_string(), value: ParamValue::Float(5.0), min: 0.1, max: 20.0, ramp: true },
                Param { name: "depth".to_string(), value: ParamValue::Float(0.1), min: 0.0, max: 1.0, ramp: true },
                Param { name: "wet".to_string(), value: ParamValue::Float(0.0), min: 0.0, max: 1.0, ramp: true },
            ],
            EffectKind::Chorus => vec![
                Param { name: "frequency".to_string(), value: ParamValue::Float(10.0), min: 0.1, max: 20.0, ramp: true },
                Param { name: "depth".to_string(), value: ParamValue::Float(0.9), min: 0.0, max: 1.0, ramp: false },
                Param { name: "delay_time".to_string(), value: ParamValue::Float(0.1), min: 0.0, max: 20.0, ramp: false },
                Param { name: "spread".to_string(), value: ParamValue::Float(180.0), min: 0.0, max: 360.0, ramp: false },
                Param { name: "wet".to_string(), value: ParamValue::Float(0.0), min: 0.0, max: 1.0, ramp: true },
            ],
            EffectKind::FeedbackDelay => vec![
                Param { name: "delay_time".to_string(), value: ParamValue::NoteLen(NoteLen::Eighth), min: 0.0, max: 4.0, ramp: false },
                Param { name: "feedback".to_string(), value: ParamValue::Float(0.2), min: 0.0, max: 0.95, ramp: true },
                Param { name: "wet".to_string(), value: ParamValue::Float(0.0), min: 0.0, max: 1.0, ramp: true },
            ],
            EffectKind::AutoPanner => vec![
                Param { name: "frequency".to_string(), value: ParamValue::Float(1.0), min: 0.1, max: 20.0, ramp: true },
                Param { name: "depth".to_string(), value: ParamValue::Float(1.0), min: 0.0, max: 1.0, ramp: true },
                Param { name: "wet".to_string(), value: ParamValue::Float(0.0), min: 0.0, max: 1.0, ramp: true },
            ],
            EffectKind::StereoWidener => vec![
                Param { name: "width".to_string(), value: ParamValue::Float(0.5), min: 0.0, max: 1.0, ramp: true },
                Param { name: "wet".to_string(), value: ParamValue::Float(0.0), min: 0.0, max: 1.0, ramp: true },
            ],
            EffectKind::Reverb => vec![
                Param { name: "room_size".to_string(), value: ParamValue::Float(0.3), min: 0.0, max: 1.0, ramp: true },
                Param { name: "wet".to_string(), value: ParamValue::Float(0.0), min: 0.0, max: 1.0, ramp: true },
            ],
        }
    }

    /// Look up one schema entry by parameter name.
    pub fn param(&self, name: &str) -> Option<Param> {
        self.default_params().into_iter().find(|p| p.name == name)
    }

    pub fn all() -> Vec<EffectKind> {
        vec![
            EffectKind::Compressor,
            EffectKind::Eq3,
            EffectKind::BitCrusher,
            EffectKind::Distortion,
            EffectKind::Highpass,
            EffectKind::Lowpass,
            EffectKind::Tremolo,
            EffectKind::Vibrato,
            EffectKind::Chorus,
            EffectKind::FeedbackDelay,
            EffectKind::AutoPanner,
            EffectKind::StereoWidener,
            EffectKind::Reverb,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique_and_resolvable() {
        let all = EffectKind::all();
        for e in &all {
            assert_eq!(EffectKind::from_key(e.key()), Some(*e));
        }
        let mut keys: Vec<&str> = all.iter().map(|e| e.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), all.len());
        assert_eq!(EffectKind::from_key("jc_reverb"), None);
    }

    #[test]
    fn test_wet_defaults_to_zero_everywhere() {
        // an idle chain must pass audio untouched
        for e in EffectKind::all() {
            if let Some(wet) = e.param("wet") {
                assert_eq!(wet.value, ParamValue::Float(0.0), "{} wet", e.key());
            }
        }
    }

    #[test]
    fn test_stepped_params_are_not_rampable() {
        for e in EffectKind::all() {
            for p in e.default_params() {
                if matches!(p.value, ParamValue::Int(_) | ParamValue::NoteLen(_)) {
                    assert!(!p.ramp, "{}.{} cannot ramp", e.key(), p.name);
                }
            }
        }
    }

    #[test]
    fn test_chain_order_is_fixed() {
        let all = EffectKind::all();
        assert_eq!(all.len(), 13);
        assert_eq!(all.first(), Some(&EffectKind::Compressor));
        assert_eq!(all.last(), Some(&EffectKind::Reverb));
    }
}
