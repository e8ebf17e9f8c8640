//! Operand sources for modifiers and the per-application snapshot they read.

use std::collections::HashMap;

use crate::scalar::{AttributeScalar, Scalar};
use crate::selector::AttributeSelector;
use crate::set::{AttributeSet, AttributeSetInfo};

/// Pre-application current values of the attributes one effect touches.
///
/// Only attributes referenced by the effect are recorded, so a lookup miss is
/// normal and callers fall back to the live value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSnapshot {
    values: HashMap<&'static str, Scalar>,
}

impl AttributeSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` for `attribute` unless it was already recorded.
    pub fn record(&mut self, attribute: &'static str, value: Scalar) {
        self.values.entry(attribute).or_insert(value);
    }

    #[must_use]
    pub fn get<T: AttributeScalar>(&self, attribute: &str) -> Option<T> {
        self.values.get(attribute).copied().and_then(T::from_scalar)
    }

    #[must_use]
    pub fn contains(&self, attribute: &str) -> bool {
        self.values.contains_key(attribute)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Which [`ValueProvider`] variant an authoring tool should generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Constant,
    FromAttribute,
}

/// Where a modifier's operand comes from.
#[derive(Debug, Clone)]
pub enum ValueProvider<T> {
    Constant(T),
    /// Another attribute of the target set.
    FromAttribute {
        selector: AttributeSelector<T>,
        /// Read the value from before the current effect application started.
        use_snapshot: bool,
    },
}

impl<T: AttributeScalar> ValueProvider<T> {
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    #[must_use]
    pub fn from_attribute(attribute: impl Into<String>, use_snapshot: bool) -> Self {
        Self::FromAttribute {
            selector: AttributeSelector::named(attribute),
            use_snapshot,
        }
    }

    /// A fresh provider of `kind` for the given set type.
    #[must_use]
    pub fn default_for(kind: ProviderKind, set_type: Option<AttributeSetInfo>) -> Self {
        match kind {
            ProviderKind::Constant => Self::Constant(T::default()),
            ProviderKind::FromAttribute => {
                let mut selector = AttributeSelector::new();
                selector.initialize_for_set_type(set_type);
                Self::FromAttribute {
                    selector,
                    use_snapshot: false,
                }
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Constant(_) => ProviderKind::Constant,
            Self::FromAttribute { .. } => ProviderKind::FromAttribute,
        }
    }

    #[must_use]
    pub fn selector(&self) -> Option<&AttributeSelector<T>> {
        match self {
            Self::Constant(_) => None,
            Self::FromAttribute { selector, .. } => Some(selector),
        }
    }

    pub fn selector_mut(&mut self) -> Option<&mut AttributeSelector<T>> {
        match self {
            Self::Constant(_) => None,
            Self::FromAttribute { selector, .. } => Some(selector),
        }
    }

    /// Resolves the operand against `target`.
    ///
    /// A snapshot miss falls back to the attribute's live current value.
    ///
    /// # Panics
    ///
    /// If a `FromAttribute` selector is not valid for `target`. Effects are
    /// validated when they are built, so this indicates corrupted data.
    pub fn get_value<S: AttributeSet>(&self, target: &S, snapshot: &AttributeSnapshot) -> T {
        match self {
            Self::Constant(value) => *value,
            Self::FromAttribute {
                selector,
                use_snapshot,
            } => {
                let Some(attribute) = selector.get_selected_attribute(target) else {
                    panic!(
                        "value selector `{}` is not valid for `{}`",
                        selector.selected().unwrap_or("<none>"),
                        S::NAME
                    );
                };
                let live = attribute.current_value();
                if !*use_snapshot {
                    return live;
                }
                selector
                    .selected()
                    .and_then(|name| snapshot.get::<T>(name))
                    .unwrap_or(live)
            }
        }
    }
}

impl<T: AttributeScalar> Default for ValueProvider<T> {
    fn default() -> Self {
        Self::Constant(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::{AttributeFields, write_current_value};
    use crate::testing::CharacterAttributes;

    fn bound(attribute: &str, use_snapshot: bool) -> ValueProvider<f32> {
        let mut provider = ValueProvider::from_attribute(attribute, use_snapshot);
        if let Some(selector) = provider.selector_mut() {
            selector.initialize_for::<CharacterAttributes>();
        }
        provider
    }

    #[test]
    fn constant_ignores_target_and_snapshot() {
        let provider = ValueProvider::constant(7.5_f32);
        let mut snapshot = AttributeSnapshot::new();
        snapshot.record("temperature", Scalar::Float(1.0));

        let value = provider.get_value(&CharacterAttributes::default(), &snapshot);
        assert!((value - 7.5).abs() < 0.001);
        assert_eq!(provider.kind(), ProviderKind::Constant);
    }

    #[test]
    fn from_attribute_reads_live_value() {
        let mut set = CharacterAttributes::default();
        write_current_value(&mut set, "movement_speed", 8.0_f32);
        let mut snapshot = AttributeSnapshot::new();
        snapshot.record("movement_speed", Scalar::Float(5.0));

        let value = bound("movement_speed", false).get_value(&set, &snapshot);
        assert!((value - 8.0).abs() < 0.001);
    }

    #[test]
    fn from_attribute_prefers_snapshot_when_asked() {
        let mut set = CharacterAttributes::default();
        write_current_value(&mut set, "movement_speed", 8.0_f32);
        let mut snapshot = AttributeSnapshot::new();
        snapshot.record("movement_speed", Scalar::Float(5.0));

        let value = bound("movement_speed", true).get_value(&set, &snapshot);
        assert!((value - 5.0).abs() < 0.001);
    }

    #[test]
    fn snapshot_miss_falls_back_to_live_value() {
        let mut set = CharacterAttributes::default();
        write_current_value(&mut set, "max_temperature", 140.0_f32);

        let value = bound("max_temperature", true).get_value(&set, &AttributeSnapshot::new());
        assert!((value - 140.0).abs() < 0.001);
        assert!(value != 0.0);
    }

    #[test]
    fn snapshot_keeps_first_recorded_value() {
        let mut snapshot = AttributeSnapshot::new();
        assert!(snapshot.is_empty());
        snapshot.record("armor", Scalar::Int(10));
        snapshot.record("armor", Scalar::Int(99));

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains("armor"));
        assert_eq!(snapshot.get::<i32>("armor"), Some(10));
        assert_eq!(snapshot.get::<f32>("armor"), None);
    }

    #[test]
    fn default_for_kind_builds_initialized_selector() {
        let provider = ValueProvider::<f32>::default_for(
            ProviderKind::FromAttribute,
            Some(CharacterAttributes::info()),
        );
        let selector = provider.selector().unwrap();
        assert_eq!(selector.set_type(), Some("CharacterAttributes"));
        assert_eq!(selector.options().len(), 3);
        assert!(!selector.is_valid());

        let constant = ValueProvider::<i32>::default_for(ProviderKind::Constant, None);
        assert!(matches!(constant, ValueProvider::Constant(0)));
    }

    #[test]
    #[should_panic(expected = "value selector `movement_speed` is not valid")]
    fn unbound_selector_panics_on_resolution() {
        let provider = ValueProvider::<f32>::from_attribute("movement_speed", false);
        provider.get_value(&CharacterAttributes::default(), &AttributeSnapshot::new());
    }
}
