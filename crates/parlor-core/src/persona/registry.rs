//! Character registry.
//!
//! Read-only lookup of personas by id.

use super::model::Persona;
use super::preset::get_default_presets;

/// Lookup interface over the available personas.
///
/// Implementations are immutable after construction, so a registry can be
/// shared freely between the orchestrator and the presentation layer.
pub trait CharacterRegistry: Send + Sync {
    /// Returns the persona with the given id, if any.
    fn get(&self, id: &str) -> Option<&Persona>;

    /// Returns every persona in display order.
    fn all(&self) -> &[Persona];

    /// Returns whether `id` names a known persona.
    fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

/// A registry over a fixed list of personas.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    personas: Vec<Persona>,
}

impl StaticRegistry {
    /// Creates a registry from an explicit persona list.
    ///
    /// Later entries with a duplicate id are dropped.
    pub fn new(personas: Vec<Persona>) -> Self {
        let mut unique: Vec<Persona> = Vec::with_capacity(personas.len());
        for persona in personas {
            if unique.iter().any(|p| p.id == persona.id) {
                tracing::warn!(id = %persona.id, "Duplicate persona id ignored");
                continue;
            }
            unique.push(persona);
        }
        Self { personas: unique }
    }

    /// Creates a registry holding the built-in presets.
    pub fn with_presets() -> Self {
        Self::new(get_default_presets())
    }
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self::with_presets()
    }
}

impl CharacterRegistry for StaticRegistry {
    fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    fn all(&self) -> &[Persona] {
        &self.personas
    }
}
