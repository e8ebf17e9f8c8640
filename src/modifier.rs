//! Modifiers: an operation, a target attribute and an operand source.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::provider::{AttributeSnapshot, ProviderKind, ValueProvider};
use crate::scalar::{AttributeScalar, ScalarKind};
use crate::selector::AttributeSelector;
use crate::set::{AttributeSet, AttributeSetInfo};

/// How a modifier's operand combines with the attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
#[reflect(Debug, PartialEq, Hash)]
pub enum Operation {
    Add,
    Multiply,
    Divide,
    /// Ignores the attribute's value entirely.
    Replace,
}

impl Operation {
    /// Whether an application magnitude scales the operand.
    ///
    /// Only `Add` and `Multiply` are scaled. A scaled integer divisor could
    /// round to zero, so `Divide` keeps its validated operand.
    #[inline]
    #[must_use]
    pub fn scales_with_magnitude(self) -> bool {
        matches!(self, Self::Add | Self::Multiply)
    }
}

/// Binds an [`Operation`], a target attribute and a [`ValueProvider`].
///
/// The modifier only supplies the operand; the effect host combines it with
/// the target attribute.
#[derive(Debug, Clone)]
pub struct Modifier<T> {
    operation: Operation,
    target: AttributeSelector<T>,
    value_provider: ValueProvider<T>,
}

impl<T: AttributeScalar> Modifier<T> {
    /// A modifier whose selectors are checked when the owning effect is built.
    #[must_use]
    pub fn new(operation: Operation, target: impl Into<String>, value_provider: ValueProvider<T>) -> Self {
        Self {
            operation,
            target: AttributeSelector::named(target),
            value_provider,
        }
    }

    #[must_use]
    pub fn add(target: impl Into<String>, value: T) -> Self {
        Self::new(Operation::Add, target, ValueProvider::Constant(value))
    }

    #[must_use]
    pub fn multiply(target: impl Into<String>, value: T) -> Self {
        Self::new(Operation::Multiply, target, ValueProvider::Constant(value))
    }

    #[must_use]
    pub fn divide(target: impl Into<String>, value: T) -> Self {
        Self::new(Operation::Divide, target, ValueProvider::Constant(value))
    }

    #[must_use]
    pub fn replace(target: impl Into<String>, value: T) -> Self {
        Self::new(Operation::Replace, target, ValueProvider::Constant(value))
    }

    #[inline]
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn target(&self) -> &AttributeSelector<T> {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut AttributeSelector<T> {
        &mut self.target
    }

    #[must_use]
    pub fn value_provider(&self) -> &ValueProvider<T> {
        &self.value_provider
    }

    pub fn set_operation(&mut self, operation: Operation) {
        self.operation = operation;
    }

    /// The operand for one application.
    pub fn apply<S: AttributeSet>(&self, target_set: &S, snapshot: &AttributeSnapshot) -> T {
        self.value_provider.get_value(target_set, snapshot)
    }

    /// Retargets the modifier to another set type.
    ///
    /// Re-validates the target selector and replaces the value provider with a
    /// default one of the same kind.
    pub fn initialize_for_set_type(&mut self, set_type: Option<AttributeSetInfo>) {
        self.target.initialize_for_set_type(set_type);
        self.value_provider = ValueProvider::default_for(self.value_provider.kind(), set_type);
    }

    /// Switches the provider variant, generating a default for the current set type.
    pub fn set_provider_kind(&mut self, kind: ProviderKind) {
        if self.value_provider.kind() == kind {
            return;
        }
        self.value_provider = ValueProvider::default_for(kind, self.target.set_info());
    }

    /// Initializes the selectors of the current target and provider without
    /// resetting either.
    pub(crate) fn bind(&mut self, set_type: AttributeSetInfo) {
        self.target.initialize_for_set_type(Some(set_type));
        if let Some(selector) = self.value_provider.selector_mut() {
            selector.initialize_for_set_type(Some(set_type));
        }
    }

    /// Attributes this modifier reads or writes, target first.
    pub fn referenced_attributes(&self) -> impl Iterator<Item = &str> {
        self.target
            .selected()
            .into_iter()
            .chain(self.value_provider.selector().and_then(AttributeSelector::selected))
    }
}

/// A modifier of either value type, as stored in an effect.
#[derive(Debug, Clone)]
pub enum EffectModifier {
    Float(Modifier<f32>),
    Int(Modifier<i32>),
}

impl EffectModifier {
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Float(_) => ScalarKind::Float,
            Self::Int(_) => ScalarKind::Int,
        }
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Float(m) => m.operation(),
            Self::Int(m) => m.operation(),
        }
    }

    #[must_use]
    pub fn target_attribute(&self) -> Option<&str> {
        match self {
            Self::Float(m) => m.target().selected(),
            Self::Int(m) => m.target().selected(),
        }
    }

    pub fn referenced_attributes(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Self::Float(m) => Box::new(m.referenced_attributes()),
            Self::Int(m) => Box::new(m.referenced_attributes()),
        }
    }
}

impl From<Modifier<f32>> for EffectModifier {
    fn from(modifier: Modifier<f32>) -> Self {
        Self::Float(modifier)
    }
}

impl From<Modifier<i32>> for EffectModifier {
    fn from(modifier: Modifier<i32>) -> Self {
        Self::Int(modifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::AttributeFields;
    use crate::testing::{CharacterAttributes, TurretAttributes};

    #[test]
    fn only_replace_ignores_magnitude() {
        assert!(Operation::Add.scales_with_magnitude());
        assert!(Operation::Multiply.scales_with_magnitude());
        assert!(!Operation::Divide.scales_with_magnitude());
        assert!(!Operation::Replace.scales_with_magnitude());
    }

    #[test]
    fn apply_returns_operand_not_result() {
        let mut modifier = Modifier::multiply("movement_speed", 2.0_f32);
        modifier.bind(CharacterAttributes::info());

        let set = CharacterAttributes::default();
        let operand = modifier.apply(&set, &AttributeSnapshot::new());

        assert!((operand - 2.0).abs() < 0.001);
        assert!((set.movement_speed.current_value() - 5.0).abs() < 0.001);
    }

    #[test]
    fn apply_reads_dependency_through_provider() {
        let mut modifier = Modifier::new(
            Operation::Add,
            "temperature",
            ValueProvider::<f32>::from_attribute("max_temperature", false),
        );
        modifier.bind(CharacterAttributes::info());

        let operand = modifier.apply(&CharacterAttributes::default(), &AttributeSnapshot::new());
        assert!((operand - 100.0).abs() < 0.001);
    }

    #[test]
    fn retargeting_revalidates_and_resets_provider() {
        let mut modifier = Modifier::new(
            Operation::Add,
            "temperature",
            ValueProvider::<f32>::from_attribute("max_temperature", true),
        );
        modifier.bind(CharacterAttributes::info());
        assert!(modifier.target().is_valid());

        modifier.initialize_for_set_type(Some(TurretAttributes::info()));

        assert!(!modifier.target().is_valid());
        assert_eq!(modifier.target().options(), &["fire_rate"]);
        let provider = modifier.value_provider();
        assert_eq!(provider.kind(), ProviderKind::FromAttribute);
        let selector = provider.selector().unwrap();
        assert_eq!(selector.selected(), None);
        assert_eq!(selector.set_type(), Some("TurretAttributes"));
        assert!(matches!(
            provider,
            ValueProvider::FromAttribute {
                use_snapshot: false,
                ..
            }
        ));
    }

    #[test]
    fn switching_provider_kind_generates_default() {
        let mut modifier = Modifier::add("armor", 3_i32);
        modifier.bind(CharacterAttributes::info());

        modifier.set_provider_kind(ProviderKind::FromAttribute);
        let selector = modifier.value_provider().selector().unwrap();
        assert_eq!(selector.options(), &["armor"]);

        modifier.set_provider_kind(ProviderKind::Constant);
        assert!(matches!(modifier.value_provider(), ValueProvider::Constant(0)));
    }

    #[test]
    fn referenced_attributes_lists_target_then_dependency() {
        let modifier = EffectModifier::from(Modifier::new(
            Operation::Replace,
            "temperature",
            ValueProvider::<f32>::from_attribute("max_temperature", false),
        ));

        let names: Vec<_> = modifier.referenced_attributes().collect();
        assert_eq!(names, vec!["temperature", "max_temperature"]);
        assert_eq!(modifier.kind(), ScalarKind::Float);
        assert_eq!(modifier.operation(), Operation::Replace);
        assert_eq!(modifier.target_attribute(), Some("temperature"));
    }
}
