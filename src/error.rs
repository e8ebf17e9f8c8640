//! Error types for effect authoring, asset loading and effect application.

use thiserror::Error;

use crate::scalar::ScalarKind;

/// Authoring errors found while validating an effect against its target set type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectError {
    /// The effect names a set type that is not a registered attribute set.
    #[error("Effect '{effect}' targets unknown attribute set '{set}'")]
    UnknownSetType { effect: String, set: String },

    /// A target or value selector does not resolve on the target set type.
    #[error("Effect '{effect}' modifier #{index}: {field} attribute '{attribute}' is not valid for '{set}'")]
    InvalidSelector {
        effect: String,
        index: usize,
        field: &'static str,
        attribute: String,
        set: String,
    },

    /// A `Divide` modifier with a constant zero operand.
    #[error("Effect '{effect}' modifier #{index} divides '{attribute}' by zero")]
    ZeroDivisor {
        effect: String,
        index: usize,
        attribute: String,
    },

    /// A timed effect whose duration is negative or not finite.
    #[error("Effect '{effect}' has invalid duration {duration}")]
    InvalidDuration { effect: String, duration: f32 },
}

/// Errors that can occur when loading effect libraries or attribute defaults.
#[derive(Debug, Error)]
pub enum AssetError {
    /// File could not be read.
    #[error("Failed to read file '{path}': {details}")]
    ReadError { path: String, details: String },

    /// RON parsing failed.
    #[error("Parse error in '{path}': {details}")]
    ParseError { path: String, details: String },

    /// Two effects share a name.
    #[error("Duplicate effect '{0}'")]
    DuplicateEffect(String),

    /// A default table was built for a different set type than it names.
    #[error("Defaults for '{found}' cannot build '{expected}'")]
    SetMismatch { expected: String, found: String },

    /// A default table names an attribute the set does not have.
    #[error("Attribute set '{set}' has no attribute '{attribute}'")]
    UnknownAttribute { set: String, attribute: String },

    /// A default value has the wrong value type.
    #[error("Attribute '{set}.{attribute}' holds {expected:?} values, got {found:?}")]
    KindMismatch {
        set: String,
        attribute: String,
        expected: ScalarKind,
        found: ScalarKind,
    },

    /// An effect failed validation.
    #[error(transparent)]
    Effect(#[from] EffectError),
}

/// Explicit selection of an attribute that a selector cannot offer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("Cannot select '{attribute}' before the selector is initialized for a set type")]
    NotInitialized { attribute: String },

    #[error("'{attribute}' is not a selectable attribute of '{set}'")]
    UnknownOption { attribute: String, set: String },
}

/// Runtime rejection of an effect application.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    /// The effect was authored for another attribute set type.
    #[error("Effect '{effect}' targets '{expected}', not '{actual}'")]
    TargetMismatch {
        effect: String,
        expected: String,
        actual: &'static str,
    },

    /// The magnitude is NaN or infinite.
    #[error("Effect '{effect}' cannot be applied with magnitude {magnitude}")]
    InvalidMagnitude { effect: String, magnitude: f32 },
}
