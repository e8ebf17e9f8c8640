//! # msg_attribute_effect
//!
//! Attribute sets with change notification and timed effect application for
//! Bevy games.
//!
//! A character's stats live in an [`AttributeSet`]: a struct of
//! [`AttributeValue`]s whose field table is generated by [`attribute_fields!`].
//! [`Effect`]s bundle [`Modifier`]s and are applied through an
//! [`Attributes`] host, which keeps every current value derived from its base
//! value and the effects still active.
//!
//! ## Key Features
//!
//! - **Change Notification**: Pre/post listeners per attribute, plus set-level hooks for derived logic
//! - **Validated Authoring**: Effects are checked against their target set type when built or loaded
//! - **Reversible Effects**: Timed effects are removed exactly, in any order
//! - **Observer-Based**: [`ApplyEffect`], [`CancelEffect`] and [`RemoveEffect`] are dispatched through Bevy observers
//!
//! ## Quick Start
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_attribute_effect::prelude::*;
//!
//! // Declare an attribute set (must implement Default to be auto-inserted)
//! pub struct Thermal {
//!     pub temperature: AttributeValue<f32>,
//!     pub max_temperature: AttributeValue<f32>,
//! }
//!
//! impl Default for Thermal {
//!     fn default() -> Self {
//!         Self {
//!             temperature: AttributeValue::new(20.0),
//!             max_temperature: AttributeValue::new(100.0),
//!         }
//!     }
//! }
//!
//! attribute_fields!(Thermal { temperature: f32, max_temperature: f32 });
//!
//! impl AttributeSet for Thermal {
//!     fn post_attribute_change(&mut self, field: &'static AttributeField, new_value: Scalar) {
//!         if field.name == "temperature" && new_value.as_f32() >= self.max_temperature.current_value() {
//!             info!("Overheated");
//!         }
//!     }
//! }
//!
//! // Register in your plugin
//! fn plugin(app: &mut App) {
//!     app.add_plugins(AttributeSetPlugin::<Thermal>::default());
//! }
//!
//! // Apply effects in a system (example usage)
//! fn scald(mut commands: Commands, entity: Entity) {
//!     let effect = Effect::builder("scald")
//!         .duration(DurationMode::ForDuration(2.0))
//!         .modifier(Modifier::add("temperature", 15.0_f32))
//!         .build::<Thermal>()
//!         .unwrap();
//!     commands.trigger_targets(ApplyEffect::new(effect.into()), entity);
//! }
//! ```

mod asset;
mod attribute;
mod effect;
mod engine;
mod error;
mod modifier;
mod plugin;
mod provider;
mod scalar;
mod selector;
mod set;

#[cfg(test)]
mod testing;

pub use asset::{AttributeSetConfig, EffectDef, EffectLibrary, EffectLibraryFile, ModifierDef, ValueDef};
pub use attribute::{AttributeValue, SubscriptionId};
pub use effect::{DurationMode, Effect, EffectBuilder};
pub use engine::{
    ApplicationHandle, ApplicationId, Attributes, DEFAULT_MAGNITUDE, EffectInstance, ExpiredEffect,
};
pub use error::{ApplyError, AssetError, EffectError, SelectorError};
pub use modifier::{EffectModifier, Modifier, Operation};
pub use plugin::{
    ApplyEffect, AttributeSetPlugin, CancelEffect, EffectApplied, EffectExpired,
    EffectObserverMarker, RemoveEffect, expire_timed_effects,
};
pub use provider::{AttributeSnapshot, ProviderKind, ValueProvider};
pub use scalar::{AttributeScalar, Scalar, ScalarKind};
pub use selector::{AttributeSelector, SelectorState};
pub use set::{
    AttributeField, AttributeFields, AttributeMut, AttributeRef, AttributeSet, AttributeSetInfo,
    AttributeSetRegistry,
};

pub mod prelude {
    pub use bevy_enum_event::EnumEvent;

    pub use crate::{
        ApplyEffect, AttributeField, AttributeFields, AttributeSelector, AttributeSet,
        AttributeSetConfig, AttributeSetPlugin, AttributeSetRegistry, AttributeValue, Attributes,
        CancelEffect, DEFAULT_MAGNITUDE, DurationMode, Effect, EffectApplied, EffectExpired,
        EffectLibrary, Modifier, Operation, RemoveEffect, Scalar, ValueProvider, attribute_fields,
        effect_observer,
    };
}
