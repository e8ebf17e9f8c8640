//! Effect libraries and attribute default tables loaded from RON files.
//!
//! An effect library file looks like:
//!
//! ```ron
//! (
//!     effects: [
//!         (
//!             name: "scald",
//!             display_name: Some("Scald"),
//!             target_set: "CharacterAttributes",
//!             duration: ForDuration(2.0),
//!             modifiers: [
//!                 Float(operation: Add, attribute: "temperature", value: Constant(15.0)),
//!             ],
//!         ),
//!     ],
//! )
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::effect::{DurationMode, Effect};
use crate::error::{AssetError, EffectError};
use crate::modifier::{EffectModifier, Modifier, Operation};
use crate::provider::ValueProvider;
use crate::scalar::{AttributeScalar, Scalar};
use crate::set::{AttributeSet, AttributeSetRegistry};

/// Top level of an effect library file.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EffectLibraryFile {
    pub effects: Vec<EffectDef>,
}

/// Effect definition as authored.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EffectDef {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>, // Falls back to name
    #[serde(default)]
    pub description: String,
    /// Registered attribute set type name.
    pub target_set: String,
    #[serde(default)]
    pub duration: DurationMode,
    #[serde(default)]
    pub modifiers: Vec<ModifierDef>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum ModifierDef {
    Float {
        operation: Operation,
        attribute: String,
        value: ValueDef<f32>,
    },
    Int {
        operation: Operation,
        attribute: String,
        value: ValueDef<i32>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum ValueDef<T> {
    Constant(T),
    FromAttribute {
        attribute: String,
        #[serde(default)]
        use_snapshot: bool,
    },
}

impl<T: AttributeScalar> ValueDef<T> {
    fn to_provider(&self) -> ValueProvider<T> {
        match self {
            Self::Constant(value) => ValueProvider::Constant(*value),
            Self::FromAttribute {
                attribute,
                use_snapshot,
            } => ValueProvider::from_attribute(attribute.clone(), *use_snapshot),
        }
    }
}

impl ModifierDef {
    fn to_modifier(&self) -> EffectModifier {
        match self {
            Self::Float {
                operation,
                attribute,
                value,
            } => Modifier::new(*operation, attribute.clone(), value.to_provider()).into(),
            Self::Int {
                operation,
                attribute,
                value,
            } => Modifier::new(*operation, attribute.clone(), value.to_provider()).into(),
        }
    }
}

impl EffectDef {
    /// Resolves the target set in `registry` and validates the effect.
    pub fn to_effect(&self, registry: &AttributeSetRegistry) -> Result<Effect, EffectError> {
        let Some(set_type) = registry.get(&self.target_set) else {
            return Err(EffectError::UnknownSetType {
                effect: self.name.clone(),
                set: self.target_set.clone(),
            });
        };

        let mut builder = Effect::builder(self.name.clone())
            .description(self.description.clone())
            .duration(self.duration);
        if let Some(display_name) = &self.display_name {
            builder = builder.display_name(display_name.clone());
        }
        self.modifiers
            .iter()
            .fold(builder, |builder, modifier| builder.modifier(modifier.to_modifier()))
            .build_for(set_type)
    }
}

/// Resource holding every validated effect by name.
#[derive(Resource, Debug, Default)]
pub struct EffectLibrary {
    effects: BTreeMap<String, Arc<Effect>>,
}

impl EffectLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a library. `path` only labels errors.
    pub fn from_ron_str(source: &str, path: &str, registry: &AttributeSetRegistry) -> Result<Self, AssetError> {
        let mut library = Self::new();
        library.extend_from_ron_str(source, path, registry)?;
        Ok(library)
    }

    pub fn load(path: impl AsRef<Path>, registry: &AttributeSetRegistry) -> Result<Self, AssetError> {
        let mut library = Self::new();
        library.extend_from_file(path, registry)?;
        Ok(library)
    }

    /// Adds the effects of another library file. Returns how many were added.
    ///
    /// Nothing is added unless every effect in the file is valid.
    pub fn extend_from_ron_str(
        &mut self,
        source: &str,
        path: &str,
        registry: &AttributeSetRegistry,
    ) -> Result<usize, AssetError> {
        let file: EffectLibraryFile = ron::from_str(source).map_err(|e| AssetError::ParseError {
            path: path.to_string(),
            details: e.to_string(),
        })?;

        let mut effects = Vec::with_capacity(file.effects.len());
        for def in &file.effects {
            let effect = def.to_effect(registry)?;
            if self.contains(effect.name()) || effects.iter().any(|e: &Effect| e.name() == effect.name()) {
                return Err(AssetError::DuplicateEffect(effect.name().to_string()));
            }
            effects.push(effect);
        }

        let added = effects.len();
        for effect in effects {
            self.effects.insert(effect.name().to_string(), Arc::new(effect));
        }
        info!("Loaded {} effects from {}", added, path);
        Ok(added)
    }

    pub fn extend_from_file(&mut self, path: impl AsRef<Path>, registry: &AttributeSetRegistry) -> Result<usize, AssetError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let source = fs::read_to_string(path).map_err(|e| AssetError::ReadError {
            path: label.clone(),
            details: e.to_string(),
        })?;
        self.extend_from_ron_str(&source, &label, registry)
    }

    /// Adds an effect built in code.
    pub fn insert(&mut self, effect: Effect) -> Result<Arc<Effect>, AssetError> {
        if self.contains(effect.name()) {
            return Err(AssetError::DuplicateEffect(effect.name().to_string()));
        }
        let effect = Arc::new(effect);
        self.effects.insert(effect.name().to_string(), effect.clone());
        Ok(effect)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Effect>> {
        self.effects.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.effects.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Authored default values for one attribute set type.
///
/// ```ron
/// (
///     set: "CharacterAttributes",
///     defaults: {
///         "max_temperature": Float(120.0),
///         "armor": Int(4),
///     },
/// )
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AttributeSetConfig {
    pub set: String,
    #[serde(default)]
    pub defaults: BTreeMap<String, Scalar>,
}

impl AttributeSetConfig {
    pub fn from_ron_str(source: &str, path: &str) -> Result<Self, AssetError> {
        ron::from_str(source).map_err(|e| AssetError::ParseError {
            path: path.to_string(),
            details: e.to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let source = fs::read_to_string(path).map_err(|e| AssetError::ReadError {
            path: label.clone(),
            details: e.to_string(),
        })?;
        Self::from_ron_str(&source, &label)
    }

    /// Builds `S::default()` with the listed attributes re-seeded.
    ///
    /// Each listed value becomes the attribute's default, base and current
    /// value.
    pub fn build<S: AttributeSet + Default>(&self) -> Result<S, AssetError> {
        if self.set != S::NAME {
            return Err(AssetError::SetMismatch {
                expected: S::NAME.to_string(),
                found: self.set.clone(),
            });
        }

        let mut set = S::default();
        for (name, value) in &self.defaults {
            let Some(field) = S::find_field(name) else {
                return Err(AssetError::UnknownAttribute {
                    set: self.set.clone(),
                    attribute: name.clone(),
                });
            };
            let seeded = set
                .field_mut(field.name)
                .is_some_and(|attribute| attribute.reset_default(*value));
            if !seeded {
                return Err(AssetError::KindMismatch {
                    set: self.set.clone(),
                    attribute: name.clone(),
                    expected: field.kind,
                    found: value.kind(),
                });
            }
        }
        debug!("Built {} with {} authored defaults", S::NAME, self.defaults.len());
        Ok(set)
    }
}
