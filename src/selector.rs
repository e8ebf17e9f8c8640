//! Validated references to one attribute of an attribute set type.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::attribute::AttributeValue;
use crate::error::SelectorError;
use crate::scalar::AttributeScalar;
use crate::set::{AttributeField, AttributeSet, AttributeSetInfo};

/// Lifecycle of an [`AttributeSelector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectorState {
    /// Never initialized for a set type.
    #[default]
    Uninitialized,
    Valid,
    Invalid,
}

/// A string-keyed reference to an attribute of type `T` within one
/// [`AttributeSet`] type.
///
/// The selector is re-validated by every call to
/// [`initialize_for_set_type`](Self::initialize_for_set_type). A selection
/// that does not exist on the new set type is dropped and the selector stays
/// invalid until [`select`](Self::select) picks a new one.
#[derive(Debug, Clone)]
pub struct AttributeSelector<T> {
    set_type: Option<AttributeSetInfo>,
    selected: Option<String>,
    options: Vec<&'static str>,
    state: SelectorState,
    _marker: PhantomData<fn() -> T>,
}

impl<T: AttributeScalar> AttributeSelector<T> {
    /// An uninitialized selector with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self {
            set_type: None,
            selected: None,
            options: Vec::new(),
            state: SelectorState::Uninitialized,
            _marker: PhantomData,
        }
    }

    /// An uninitialized selector with a pending selection, checked on the
    /// next [`initialize_for_set_type`](Self::initialize_for_set_type).
    #[must_use]
    pub fn named(attribute: impl Into<String>) -> Self {
        Self {
            selected: Some(attribute.into()),
            ..Self::new()
        }
    }

    /// Re-validates the selector against a set type.
    ///
    /// `None` stands for a type that is not an attribute set: the selector
    /// becomes invalid but keeps its stored name.
    pub fn initialize_for_set_type(&mut self, set_type: Option<AttributeSetInfo>) {
        let Some(info) = set_type else {
            self.set_type = None;
            self.options.clear();
            self.state = SelectorState::Invalid;
            return;
        };

        let mut options: Vec<_> = info.names_of_kind(T::KIND).collect();
        options.sort_unstable();
        self.options = options;
        self.set_type = Some(info);

        self.state = match self.selected.as_deref() {
            Some(name) if self.options.iter().any(|option| *option == name) => SelectorState::Valid,
            Some(name) => {
                debug!(
                    "Selector lost attribute `{}`: not a {:?} attribute of {}",
                    name,
                    T::KIND,
                    info.name
                );
                self.selected = None;
                SelectorState::Invalid
            }
            None => SelectorState::Invalid,
        };
    }

    /// Shorthand for initializing against a concrete set type.
    pub fn initialize_for<S: AttributeSet>(&mut self) {
        self.initialize_for_set_type(Some(S::info()));
    }

    /// Selects one of the current options.
    pub fn select(&mut self, attribute: &str) -> Result<(), SelectorError> {
        let Some(set) = self.set_type.map(|info| info.name) else {
            return Err(SelectorError::NotInitialized {
                attribute: attribute.to_string(),
            });
        };
        if !self.options.iter().any(|option| *option == attribute) {
            return Err(SelectorError::UnknownOption {
                attribute: attribute.to_string(),
                set: set.to_string(),
            });
        }
        self.selected = Some(attribute.to_string());
        self.state = SelectorState::Valid;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state == SelectorState::Valid
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> SelectorState {
        self.state
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn set_type(&self) -> Option<&'static str> {
        self.set_type.map(|info| info.name)
    }

    /// The set type this selector was last initialized for.
    #[must_use]
    pub fn set_info(&self) -> Option<AttributeSetInfo> {
        self.set_type
    }

    /// Sorted names of the set's attributes holding `T` values.
    #[must_use]
    pub fn options(&self) -> &[&'static str] {
        &self.options
    }

    /// Resolves the selection on a live set.
    ///
    /// Returns `None` while the selector is not valid.
    ///
    /// # Panics
    ///
    /// If the selector was initialized for another set type or names an
    /// attribute `set` does not have. Both mean corrupted data, not a missing
    /// configuration.
    pub fn get_selected_attribute<'a, S: AttributeSet>(&self, set: &'a S) -> Option<&'a AttributeValue<T>> {
        let field = self.selected_field::<S>()?;
        Some(set.bound_attribute::<T>(field.name))
    }

    /// The field table entry of the selection on `S`, `None` while invalid.
    ///
    /// # Panics
    ///
    /// Same conditions as [`get_selected_attribute`](Self::get_selected_attribute).
    pub fn selected_field<S: AttributeSet>(&self) -> Option<&'static AttributeField> {
        if !self.is_valid() {
            return None;
        }
        let name = self.selected.as_deref()?;
        assert_eq!(
            self.set_type(),
            Some(S::NAME),
            "selector for `{name}` resolved against `{}`",
            S::NAME
        );
        match S::find_field(name) {
            Some(field) if field.kind == T::KIND => Some(field),
            _ => panic!("selector names `{name}`, which `{}` has no {:?} attribute for", S::NAME, T::KIND),
        }
    }
}

impl<T: AttributeScalar> Default for AttributeSelector<T> {
    fn default() -> Self {
        Self::new()
    }
}
