//! Persona domain module.
//!
//! # Module Structure
//!
//! - `model`: Persona and sampling parameter models
//! - `preset`: Built-in characters
//! - `registry`: Read-only lookup by id

mod model;
mod preset;
mod registry;

pub use model::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P, Persona, SamplingParams,
};
pub use preset::get_default_presets;
pub use registry::{CharacterRegistry, StaticRegistry};
