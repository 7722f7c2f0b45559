use std::path::Path;

use crate::state::param::NoteLen;
use crate::state::scene::{Directive, RateTarget, SceneRecipe};

/// The recipe book: scene id -> directives. Pure data; adding a scene never
/// touches the transition engine.
#[derive(Debug, Clone)]
pub struct SceneCatalog {
    scenes: Vec<SceneRecipe>,
}

/// Reserved signal id: not a scene, maps to a baseline reset.
pub const RESET_ID: &str = "reset";

impl SceneCatalog {
    pub fn lookup(&self, id: &str) -> Option<&SceneRecipe> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.scenes.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Add a recipe, replacing any existing one with the same id.
    pub fn insert(&mut self, recipe: SceneRecipe) {
        if recipe.id == RESET_ID {
            log::warn!("Ignoring scene recipe with reserved id '{}'", RESET_ID);
            return;
        }
        if let Some(existing) = self.scenes.iter_mut().find(|s| s.id == recipe.id) {
            *existing = recipe;
        } else {
            self.scenes.push(recipe);
        }
    }

    /// Merge user recipes from a JSON file (an array of recipes). Returns how
    /// many were merged. A missing file is not an error.
    pub fn load_user_scenes(&mut self, path: &Path) -> Result<usize, String> {
        if !path.exists() {
            return Ok(0);
        }
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let recipes: Vec<SceneRecipe> = serde_json::from_str(&data)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
        let count = recipes.len();
        for recipe in recipes {
            self.insert(recipe);
        }
        Ok(count)
    }

    pub fn builtin() -> SceneCatalog {
        let scenes = vec![
            // Slower and heavier; restrained EQ lift, wide chorus bed.
            SceneRecipe {
                id: "epic".to_string(),
                rate: Some(RateTarget { value: 0.985, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::ramp("eq3", "low", 2.0, 1.0),
                    Directive::ramp("eq3", "mid", 0.0, 1.0),
                    Directive::ramp("eq3", "high", 1.0, 1.0),
                    Directive::set("reverb", "room_size", 0.5),
                    Directive::ramp("reverb", "wet", 0.1, 1.0),
                    Directive::ramp("stereo_widener", "width", 0.8, 1.0),
                    Directive::ramp("stereo_widener", "wet", 0.5, 1.0),
                    Directive::set("chorus", "frequency", 0.5),
                    Directive::set("chorus", "depth", 0.8),
                    Directive::ramp("chorus", "wet", 0.2, 1.0),
                ],
            },
            // Rolled-off ends plus light grit and warble.
            SceneRecipe {
                id: "lofi".to_string(),
                rate: None,
                directives: vec![
                    Directive::ramp("eq3", "low", -12.0, 1.0),
                    Directive::ramp("eq3", "mid", 0.0, 1.0),
                    Directive::ramp("eq3", "high", -12.0, 1.0),
                    Directive::set("distortion", "distortion", 0.2),
                    Directive::ramp("distortion", "wet", 0.2, 1.0),
                    Directive::set("chorus", "frequency", 3.0),
                    Directive::set("chorus", "depth", 0.7),
                    Directive::ramp("chorus", "wet", 0.3, 1.0),
                ],
            },
            // Claustrophobia: choked highs, tiny room.
            SceneRecipe {
                id: "claustro".to_string(),
                rate: None,
                directives: vec![
                    Directive::ramp("eq3", "low", -5.0, 1.0),
                    Directive::ramp("eq3", "mid", 0.0, 1.0),
                    Directive::ramp("eq3", "high", -40.0, 1.0),
                    Directive::set("reverb", "room_size", 0.2),
                    Directive::ramp("reverb", "wet", 0.2, 1.0),
                ],
            },
            // Slightly fast, mid-forward, fluttering tremolo, one short echo.
            SceneRecipe {
                id: "anxiety".to_string(),
                rate: Some(RateTarget { value: 1.015, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::ramp("eq3", "low", -1.0, 0.5),
                    Directive::ramp("eq3", "mid", 1.0, 0.5),
                    Directive::ramp("eq3", "high", -1.0, 0.5),
                    Directive::set("distortion", "distortion", 0.5),
                    Directive::ramp("distortion", "wet", 0.1, 0.2),
                    Directive::ramp("tremolo", "frequency", 10.0, 0.5),
                    Directive::ramp("tremolo", "depth", 0.8, 0.5),
                    Directive::ramp("tremolo", "wet", 0.3, 0.5),
                    Directive::set("feedback_delay", "delay_time", NoteLen::Eighth),
                    Directive::ramp("feedback_delay", "feedback", 0.15, 0.5),
                    Directive::ramp("feedback_delay", "wet", 0.2, 0.5),
                ],
            },
            SceneRecipe {
                id: "heroic".to_string(),
                rate: Some(RateTarget { value: 1.0, ramp_secs: Some(1.0) }),
                directives: vec![
                    Directive::ramp("eq3", "low", 0.0, 1.0),
                    Directive::ramp("eq3", "mid", 2.0, 1.0),
                    Directive::ramp("eq3", "high", 2.0, 1.0),
                    Directive::set("distortion", "distortion", 0.1),
                    Directive::ramp("distortion", "wet", 0.05, 1.0),
                    Directive::set("reverb", "room_size", 0.4),
                    Directive::ramp("reverb", "wet", 0.15, 1.0),
                ],
            },
            SceneRecipe {
                id: "warmth".to_string(),
                rate: Some(RateTarget { value: 0.99, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::ramp("eq3", "low", 2.0, 1.0),
                    Directive::ramp("eq3", "mid", 1.0, 1.0),
                    Directive::ramp("eq3", "high", -2.0, 1.0),
                    Directive::set("distortion", "distortion", 0.05),
                    Directive::ramp("distortion", "wet", 0.1, 1.0),
                    Directive::set("chorus", "depth", 0.3),
                    Directive::ramp("chorus", "wet", 0.1, 1.0),
                ],
            },
            // Close and dry: present mids, narrowed field.
            SceneRecipe {
                id: "intimacy".to_string(),
                rate: Some(RateTarget { value: 1.0, ramp_secs: Some(1.0) }),
                directives: vec![
                    Directive::ramp("eq3", "high", -2.0, 1.0),
                    Directive::ramp("eq3", "mid", 3.0, 1.0),
                    Directive::ramp("stereo_widener", "width", 0.5, 1.0),
                    Directive::ramp("stereo_widener", "wet", 1.0, 1.0),
                ],
            },
            SceneRecipe {
                id: "cold".to_string(),
                rate: Some(RateTarget { value: 1.0, ramp_secs: Some(1.0) }),
                directives: vec![
                    Directive::ramp("eq3", "low", -5.0, 1.0),
                    Directive::ramp("eq3", "high", 2.0, 1.0),
                    Directive::set("bit_crusher", "bits", 12),
                    Directive::ramp("bit_crusher", "wet", 0.1, 1.0),
                    Directive::set("reverb", "room_size", 0.2),
                    Directive::ramp("reverb", "wet", 0.1, 1.0),
                ],
            },
            // Fast pan wobble and a touch of edge.
            SceneRecipe {
                id: "panic".to_string(),
                rate: Some(RateTarget { value: 1.008, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::set("auto_panner", "frequency", 10.0),
                    Directive::set("auto_panner", "depth", 1.0),
                    Directive::ramp("auto_panner", "wet", 0.2, 0.2),
                    Directive::set("distortion", "distortion", 0.2),
                    Directive::ramp("distortion", "wet", 0.05, 0.2),
                ],
            },
            SceneRecipe {
                id: "suspense".to_string(),
                rate: Some(RateTarget { value: 0.975, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::ramp("eq3", "low", -3.0, 1.0),
                    Directive::ramp("eq3", "high", -5.0, 1.0),
                    Directive::set("vibrato", "frequency", 2.0),
                    Directive::set("vibrato", "depth", 0.1),
                    Directive::ramp("vibrato", "wet", 0.3, 1.0),
                    Directive::set("feedback_delay", "delay_time", NoteLen::Quarter),
                    Directive::set("feedback_delay", "feedback", 0.3),
                    Directive::ramp("feedback_delay", "wet", 0.25, 1.0),
                ],
            },
            // Slow, degraded, cavernous. All wets creep in over 2s.
            SceneRecipe {
                id: "horror".to_string(),
                rate: Some(RateTarget { value: 0.972, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::set("bit_crusher", "bits", 8),
                    Directive::ramp("bit_crusher", "wet", 0.08, 2.0),
                    Directive::set("reverb", "room_size", 0.8),
                    Directive::ramp("reverb", "wet", 0.07, 2.0),
                    Directive::set("tremolo", "frequency", 2.0),
                    Directive::set("tremolo", "depth", 0.8),
                    Directive::ramp("tremolo", "wet", 0.07, 2.0),
                ],
            },
            // Single-unit scene kept for parameter debugging.
            SceneRecipe {
                id: "test".to_string(),
                rate: None,
                directives: vec![
                    Directive::ramp("tremolo", "frequency", 10.0, 0.5),
                    Directive::ramp("tremolo", "depth", 0.8, 0.5),
                    Directive::ramp("tremolo", "wet", 0.2, 0.5),
                ],
            },
            // Deserted space: thinned floor, long empty tail, narrow image.
            SceneRecipe {
                id: "empty".to_string(),
                rate: Some(RateTarget { value: 0.99, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::ramp("eq3", "low", -8.0, 1.0),
                    Directive::ramp("eq3", "mid", -4.0, 1.0),
                    Directive::ramp("highpass", "frequency", 200.0, 2.0),
                    Directive::set("reverb", "room_size", 0.7),
                    Directive::ramp("reverb", "wet", 0.12, 2.0),
                    Directive::ramp("stereo_widener", "width", 0.2, 1.0),
                    Directive::ramp("stereo_widener", "wet", 0.5, 1.0),
                ],
            },
            // Everything above ~600 Hz sinks; slow wobble.
            SceneRecipe {
                id: "underwater".to_string(),
                rate: Some(RateTarget { value: 0.97, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::ramp("lowpass", "frequency", 600.0, 1.5),
                    Directive::set("vibrato", "frequency", 1.0),
                    Directive::set("vibrato", "depth", 0.3),
                    Directive::ramp("vibrato", "wet", 0.4, 1.5),
                    Directive::set("reverb", "room_size", 0.6),
                    Directive::ramp("reverb", "wet", 0.15, 1.5),
                ],
            },
            SceneRecipe {
                id: "dreamy".to_string(),
                rate: Some(RateTarget { value: 0.98, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::ramp("lowpass", "frequency", 4000.0, 2.0),
                    Directive::set("chorus", "frequency", 1.5),
                    Directive::set("chorus", "depth", 0.5),
                    Directive::ramp("chorus", "wet", 0.3, 2.0),
                    Directive::set("reverb", "room_size", 0.6),
                    Directive::ramp("reverb", "wet", 0.2, 2.0),
                    Directive::set("feedback_delay", "delay_time", NoteLen::Half),
                    Directive::ramp("feedback_delay", "feedback", 0.35, 2.0),
                    Directive::ramp("feedback_delay", "wet", 0.15, 2.0),
                ],
            },
            // Weightless: no body, huge room, maximum width.
            SceneRecipe {
                id: "ethereal".to_string(),
                rate: None,
                directives: vec![
                    Directive::ramp("eq3", "low", -6.0, 1.0),
                    Directive::ramp("eq3", "high", 3.0, 1.0),
                    Directive::ramp("highpass", "frequency", 300.0, 2.0),
                    Directive::set("reverb", "room_size", 0.9),
                    Directive::ramp("reverb", "wet", 0.3, 2.0),
                    Directive::ramp("stereo_widener", "width", 1.0, 2.0),
                    Directive::ramp("stereo_widener", "wet", 0.7, 2.0),
                ],
            },
            SceneRecipe {
                id: "retro".to_string(),
                rate: None,
                directives: vec![
                    Directive::set("bit_crusher", "bits", 10),
                    Directive::ramp("bit_crusher", "wet", 0.25, 1.0),
                    Directive::ramp("eq3", "low", 1.0, 1.0),
                    Directive::ramp("eq3", "high", -6.0, 1.0),
                    Directive::ramp("lowpass", "frequency", 7000.0, 1.0),
                    Directive::set("chorus", "frequency", 0.3),
                    Directive::set("chorus", "depth", 0.2),
                    Directive::ramp("chorus", "wet", 0.15, 1.0),
                ],
            },
            // Squashed and overdriven.
            SceneRecipe {
                id: "dirty".to_string(),
                rate: None,
                directives: vec![
                    Directive::set("distortion", "distortion", 0.6),
                    Directive::ramp("distortion", "wet", 0.3, 0.5),
                    Directive::ramp("eq3", "low", 2.0, 0.5),
                    Directive::ramp("eq3", "mid", -1.0, 0.5),
                    Directive::ramp("compressor", "threshold", -30.0, 0.5),
                    Directive::ramp("compressor", "ratio", 6.0, 0.5),
                ],
            },
            SceneRecipe {
                id: "robotic".to_string(),
                rate: Some(RateTarget { value: 1.0, ramp_secs: Some(1.0) }),
                directives: vec![
                    Directive::set("bit_crusher", "bits", 6),
                    Directive::ramp("bit_crusher", "wet", 0.2, 0.5),
                    Directive::ramp("tremolo", "frequency", 18.0, 0.5),
                    Directive::ramp("tremolo", "depth", 0.9, 0.5),
                    Directive::ramp("tremolo", "wet", 0.25, 0.5),
                    Directive::set("feedback_delay", "delay_time", NoteLen::Sixteenth),
                    Directive::ramp("feedback_delay", "feedback", 0.4, 0.5),
                    Directive::ramp("feedback_delay", "wet", 0.15, 0.5),
                    Directive::ramp("eq3", "low", -4.0, 0.5),
                ],
            },
            // Stutter: everything arrives fast and broken.
            SceneRecipe {
                id: "glitch".to_string(),
                rate: Some(RateTarget { value: 1.02, ramp_secs: Some(2.0) }),
                directives: vec![
                    Directive::set("bit_crusher", "bits", 4),
                    Directive::ramp("bit_crusher", "wet", 0.3, 0.3),
                    Directive::ramp("tremolo", "frequency", 16.0, 0.3),
                    Directive::ramp("tremolo", "depth", 1.0, 0.3),
                    Directive::ramp("tremolo", "wet", 0.3, 0.3),
                    Directive::set("feedback_delay", "delay_time", NoteLen::Sixteenth),
                    Directive::ramp("feedback_delay", "feedback", 0.5, 0.3),
                    Directive::ramp("feedback_delay", "wet", 0.2, 0.3),
                    Directive::set("auto_panner", "frequency", 8.0),
                    Directive::set("auto_panner", "depth", 1.0),
                    Directive::ramp("auto_panner", "wet", 0.3, 0.3),
                ],
            },
            SceneRecipe {
                id: "psychedelic".to_string(),
                rate: Some(RateTarget { value: 0.995, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::set("chorus", "frequency", 2.5),
                    Directive::set("chorus", "depth", 0.9),
                    Directive::ramp("chorus", "wet", 0.4, 2.0),
                    Directive::set("auto_panner", "frequency", 0.3),
                    Directive::set("auto_panner", "depth", 1.0),
                    Directive::ramp("auto_panner", "wet", 0.5, 2.0),
                    Directive::set("vibrato", "frequency", 6.0),
                    Directive::set("vibrato", "depth", 0.2),
                    Directive::ramp("vibrato", "wet", 0.3, 2.0),
                    Directive::set("feedback_delay", "delay_time", NoteLen::Quarter),
                    Directive::ramp("feedback_delay", "feedback", 0.45, 2.0),
                    Directive::ramp("feedback_delay", "wet", 0.2, 2.0),
                ],
            },
            // Flashback: dulled, distant, tape-warbled.
            SceneRecipe {
                id: "memory".to_string(),
                rate: Some(RateTarget { value: 0.96, ramp_secs: Some(5.0) }),
                directives: vec![
                    Directive::ramp("lowpass", "frequency", 3000.0, 2.0),
                    Directive::ramp("eq3", "low", -2.0, 2.0),
                    Directive::ramp("eq3", "mid", 1.0, 2.0),
                    Directive::ramp("eq3", "high", -8.0, 2.0),
                    Directive::set("reverb", "room_size", 0.7),
                    Directive::ramp("reverb", "wet", 0.25, 2.0),
                    Directive::set("vibrato", "frequency", 3.0),
                    Directive::set("vibrato", "depth", 0.15),
                    Directive::ramp("vibrato", "wet", 0.35, 2.0),
                ],
            },
        ];
        SceneCatalog { scenes }
    }
}
