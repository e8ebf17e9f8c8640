//! Authored effects: a bundle of modifiers with a duration mode.

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EffectError;
use crate::modifier::{EffectModifier, Modifier, Operation};
use crate::provider::ValueProvider;
use crate::scalar::AttributeScalar;
use crate::set::{AttributeSet, AttributeSetInfo};

/// How long an effect's modifiers stay applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
#[reflect(Debug, PartialEq)]
pub enum DurationMode {
    /// Applied once to the base value, never reversed.
    Instant,
    /// Applied to the current value and reversed after this many seconds.
    ForDuration(f32),
    /// Applied to the current value until explicitly removed.
    UntilRemoved,
}

impl DurationMode {
    #[inline]
    #[must_use]
    pub fn is_instant(&self) -> bool {
        matches!(self, Self::Instant)
    }

    /// The expiry delay of a timed effect.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::ForDuration(secs) if secs.is_finite() && *secs >= 0.0 => {
                Some(Duration::from_secs_f32(*secs))
            }
            _ => None,
        }
    }
}

impl Default for DurationMode {
    fn default() -> Self {
        Self::Instant
    }
}

/// Immutable, validated effect data targeting one attribute set type.
///
/// An `Effect` can only be obtained from [`EffectBuilder`] or an effect
/// library, both of which validate every selector against the target set
/// type. Share it as `Arc<Effect>`.
///
/// # Examples
///
/// ```rust
/// use msg_attribute_effect::prelude::*;
///
/// pub struct Heat {
///     pub temperature: AttributeValue<f32>,
/// }
///
/// attribute_fields!(Heat { temperature: f32 });
///
/// impl AttributeSet for Heat {}
///
/// let scald = Effect::builder("scald")
///     .display_name("Scald")
///     .duration(DurationMode::ForDuration(2.0))
///     .modifier(Modifier::add("temperature", 15.0_f32))
///     .build::<Heat>()
///     .unwrap();
///
/// assert_eq!(scald.target_set(), "Heat");
/// assert_eq!(scald.modifiers().len(), 1);
///
/// let broken = Effect::builder("broken")
///     .modifier(Modifier::add("pressure", 1.0_f32))
///     .build::<Heat>();
/// assert!(broken.is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Effect {
    name: String,
    display_name: String,
    description: String,
    duration: DurationMode,
    target_set: AttributeSetInfo,
    modifiers: Vec<EffectModifier>,
}

impl Effect {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EffectBuilder {
        EffectBuilder::new(name)
    }

    /// Unique identifier within an effect library.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> DurationMode {
        self.duration
    }

    /// Name of the attribute set type this effect applies to.
    #[must_use]
    pub fn target_set(&self) -> &'static str {
        self.target_set.name
    }

    #[must_use]
    pub fn target_set_info(&self) -> AttributeSetInfo {
        self.target_set
    }

    /// Modifiers in application order.
    #[must_use]
    pub fn modifiers(&self) -> &[EffectModifier] {
        &self.modifiers
    }

    /// Whether any modifier reads or writes `attribute`.
    #[must_use]
    pub fn references(&self, attribute: &str) -> bool {
        self.modifiers
            .iter()
            .any(|modifier| modifier.referenced_attributes().any(|name| name == attribute))
    }
}

/// Assembles and validates an [`Effect`].
#[derive(Debug, Clone)]
pub struct EffectBuilder {
    name: String,
    display_name: Option<String>,
    description: String,
    duration: DurationMode,
    modifiers: Vec<EffectModifier>,
}

impl EffectBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: String::new(),
            duration: DurationMode::Instant,
            modifiers: Vec::new(),
        }
    }

    /// Defaults to the effect name.
    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: DurationMode) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn modifier(mut self, modifier: impl Into<EffectModifier>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    pub fn build<S: AttributeSet>(self) -> Result<Effect, EffectError> {
        self.build_for(S::info())
    }

    /// Validates every modifier against `set_type` and freezes the effect.
    pub fn build_for(mut self, set_type: AttributeSetInfo) -> Result<Effect, EffectError> {
        if let DurationMode::ForDuration(secs) = self.duration {
            if !secs.is_finite() || secs < 0.0 {
                return Err(EffectError::InvalidDuration {
                    effect: self.name,
                    duration: secs,
                });
            }
        }

        for (index, modifier) in self.modifiers.iter_mut().enumerate() {
            match modifier {
                EffectModifier::Float(m) => validate_modifier(&self.name, index, m, set_type)?,
                EffectModifier::Int(m) => validate_modifier(&self.name, index, m, set_type)?,
            }
        }

        if self.modifiers.is_empty() {
            warn!("Effect '{}' has no modifiers", self.name);
        }

        Ok(Effect {
            display_name: self.display_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            description: self.description,
            duration: self.duration,
            target_set: set_type,
            modifiers: self.modifiers,
        })
    }
}

fn validate_modifier<T: AttributeScalar>(
    effect: &str,
    index: usize,
    modifier: &mut Modifier<T>,
    set_type: AttributeSetInfo,
) -> Result<(), EffectError> {
    // Binding drops names the set type does not have, so keep them for errors.
    let target_name = modifier.target().selected().unwrap_or_default().to_string();
    let value_name = modifier
        .value_provider()
        .selector()
        .and_then(|selector| selector.selected())
        .unwrap_or_default()
        .to_string();
    modifier.bind(set_type);

    let invalid = |field: &'static str, attribute: String| EffectError::InvalidSelector {
        effect: effect.to_string(),
        index,
        field,
        attribute,
        set: set_type.name.to_string(),
    };

    let target = modifier.target();
    if !target.is_valid() {
        return Err(invalid("target", target_name));
    }

    match modifier.value_provider() {
        ValueProvider::FromAttribute { selector, .. } if !selector.is_valid() => {
            return Err(invalid("value", value_name));
        }
        ValueProvider::Constant(value) if modifier.operation() == Operation::Divide && value.is_zero() => {
            return Err(EffectError::ZeroDivisor {
                effect: effect.to_string(),
                index,
                attribute: target.selected().unwrap_or_default().to_string(),
            });
        }
        _ => {}
    }

    Ok(())
}
