use serde::{Deserialize, Serialize};

/// One entry in an effect unit's parameter schema.
///
/// `ramp` records whether the unit's synthdef exposes a `<name>_lag` companion
/// control, i.e. whether the server can glide this parameter. Integer and
/// note-length parameters never ramp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
    pub min: f32,
    pub max: f32,
    pub ramp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
    NoteLen(NoteLen),
}

impl ParamValue {
    /// Control-rate value as sent to the server. Note lengths convert to
    /// seconds at the given tempo.
    pub fn to_control(&self, bpm: f32) -> f32 {
        match self {
            ParamValue::Int(v) => *v as f32,
            ParamValue::Float(v) => *v,
            ParamValue::NoteLen(n) => n.seconds(bpm),
        }
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<NoteLen> for ParamValue {
    fn from(n: NoteLen) -> Self {
        ParamValue::NoteLen(n)
    }
}

/// Musical note-length token, as scene recipes write delay times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteLen {
    #[serde(rename = "1n")]
    Whole,
    #[serde(rename = "2n")]
    Half,
    #[serde(rename = "4n")]
    Quarter,
    #[serde(rename = "8n")]
    Eighth,
    #[serde(rename = "16n")]
    Sixteenth,
}

impl NoteLen {
    pub fn parse(s: &str) -> Option<NoteLen> {
        match s {
            "1n" => Some(NoteLen::Whole),
            "2n" => Some(NoteLen::Half),
            "4n" => Some(NoteLen::Quarter),
            "8n" => Some(NoteLen::Eighth),
            "16n" => Some(NoteLen::Sixteenth),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            NoteLen::Whole => "1n",
            NoteLen::Half => "2n",
            NoteLen::Quarter => "4n",
            NoteLen::Eighth => "8n",
            NoteLen::Sixteenth => "16n",
        }
    }

    /// Duration in seconds at the given tempo (a quarter note is one beat).
    pub fn seconds(&self, bpm: f32) -> f32 {
        let beat = 60.0 / bpm;
        match self {
            NoteLen::Whole => 4.0 * beat,
            NoteLen::Half => 2.0 * beat,
            NoteLen::Quarter => beat,
            NoteLen::Eighth => beat / 2.0,
            NoteLen::Sixteenth => beat / 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_len_parse_round_trip() {
        for token in ["1n", "2n", "4n", "8n", "16n"] {
            let n = NoteLen::parse(token).unwrap();
            assert_eq!(n.token(), token);
        }
        assert_eq!(NoteLen::parse("3n"), None);
        assert_eq!(NoteLen::parse(""), None);
    }

    #[test]
    fn test_note_len_seconds_at_120_bpm() {
        assert_eq!(NoteLen::Quarter.seconds(120.0), 0.5);
        assert_eq!(NoteLen::Eighth.seconds(120.0), 0.25);
        assert_eq!(NoteLen::Whole.seconds(120.0), 2.0);
    }

    #[test]
    fn test_to_control_converts_note_len_by_tempo() {
        let v = ParamValue::NoteLen(NoteLen::Eighth);
        assert_eq!(v.to_control(120.0), 0.25);
        assert_eq!(v.to_control(60.0), 0.5);
        assert_eq!(ParamValue::Float(0.3).to_control(120.0), 0.3);
        assert_eq!(ParamValue::Int(8).to_control(120.0), 8.0);
    }

    #[test]
    fn test_param_value_json_forms() {
        // scenes.json writes bare numbers and note tokens
        let f: ParamValue = serde_json::from_str("0.25").unwrap();
        assert_eq!(f, ParamValue::Float(0.25));
        let i: ParamValue = serde_json::from_str("12").unwrap();
        assert_eq!(i, ParamValue::Int(12));
        let n: ParamValue = serde_json::from_str("\"8n\"").unwrap();
        assert_eq!(n, ParamValue::NoteLen(NoteLen::Eighth));
    }
}
