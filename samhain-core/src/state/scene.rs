use serde::{Deserialize, Serialize};

use super::param::ParamValue;

/// One parameter move in a scene recipe.
///
/// Unit and param are plain strings, resolved against the live rig at apply
/// time; pairs the rig does not know are skipped, so recipes stay compatible
/// across schema revisions. `ramp_secs` absent or non-positive means an
/// immediate set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub unit: String,
    pub param: String,
    pub value: ParamValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp_secs: Option<f32>,
}

impl Directive {
    pub fn set(unit: &str, param: &str, value: impl Into<ParamValue>) -> Directive {
        Directive {
            unit: unit.to_string(),
            param: param.to_string(),
            value: value.into(),
            ramp_secs: None,
        }
    }

    pub fn ramp(unit: &str, param: &str, value: f32, secs: f32) -> Directive {
        Directive {
            unit: unit.to_string(),
            param: param.to_string(),
            value: ParamValue::Float(value),
            ramp_secs: Some(secs),
        }
    }
}

/// Playback-rate move carried by a scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateTarget {
    pub value: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp_secs: Option<f32>,
}

/// A named mood: a rate target plus an ordered list of parameter directives.
/// Recipes are pure data; all sequencing lives in the transition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecipe {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<RateTarget>,
    #[serde(default)]
    pub directives: Vec<Directive>,
}
