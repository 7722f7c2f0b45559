pub mod catalog;
pub mod effect;
pub mod param;
pub mod scene;

pub use catalog::{SceneCatalog, RESET_ID};
pub use effect::EffectKind;
pub use param::{NoteLen, Param, ParamValue};
pub use scene::{Directive, RateTarget, SceneRecipe};
