//! Attribute sets: a character's stat block and its field table.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::attribute::{AttributeValue, SubscriptionId};
use crate::scalar::{AttributeScalar, Scalar, ScalarKind};

/// One entry of an attribute set's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeField {
    /// Stable attribute name, the declared field name.
    pub name: &'static str,
    pub kind: ScalarKind,
}

impl AttributeField {
    #[must_use]
    pub const fn new(name: &'static str, kind: ScalarKind) -> Self {
        Self { name, kind }
    }
}

/// Shared borrow of an attribute whose value type is only known at runtime.
#[derive(Debug, Clone, Copy)]
pub enum AttributeRef<'a> {
    Float(&'a AttributeValue<f32>),
    Int(&'a AttributeValue<i32>),
}

impl AttributeRef<'_> {
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Float(_) => ScalarKind::Float,
            Self::Int(_) => ScalarKind::Int,
        }
    }

    #[must_use]
    pub fn current(&self) -> Scalar {
        match self {
            Self::Float(a) => Scalar::Float(a.current_value()),
            Self::Int(a) => Scalar::Int(a.current_value()),
        }
    }

    #[must_use]
    pub fn base(&self) -> Scalar {
        match self {
            Self::Float(a) => Scalar::Float(a.base_value()),
            Self::Int(a) => Scalar::Int(a.base_value()),
        }
    }
}

/// Exclusive borrow of an attribute whose value type is only known at runtime.
#[derive(Debug)]
pub enum AttributeMut<'a> {
    Float(&'a mut AttributeValue<f32>),
    Int(&'a mut AttributeValue<i32>),
}

impl AttributeMut<'_> {
    /// Re-seeds the attribute from an authored default. Returns `false` on a
    /// kind mismatch.
    pub(crate) fn reset_default(self, value: Scalar) -> bool {
        match (self, value) {
            (Self::Float(a), Scalar::Float(v)) => {
                a.reset_default(v);
                true
            }
            (Self::Int(a), Scalar::Int(v)) => {
                a.reset_default(v);
                true
            }
            _ => false,
        }
    }
}

/// Static description of an attribute set type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSetInfo {
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [AttributeField],
}

impl AttributeSetInfo {
    #[must_use]
    pub fn of<S: AttributeFields>() -> Self {
        Self {
            name: S::NAME,
            fields: S::fields(),
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static AttributeField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Names of all fields holding `kind` values, in declaration order.
    pub fn names_of_kind(&self, kind: ScalarKind) -> impl Iterator<Item = &'static str> {
        self.fields
            .iter()
            .filter(move |field| field.kind == kind)
            .map(|field| field.name)
    }
}

/// Field table of an attribute set, normally generated by [`attribute_fields!`].
///
/// Replaces runtime discovery of attribute members: the table is a static
/// list of `(name, kind)` pairs plus name-keyed accessors.
pub trait AttributeFields {
    /// Type name used by authored data to reference this set.
    const NAME: &'static str;

    /// All attribute fields in declaration order.
    fn fields() -> &'static [AttributeField];

    fn field(&self, name: &str) -> Option<AttributeRef<'_>>;

    fn field_mut(&mut self, name: &str) -> Option<AttributeMut<'_>>;

    fn find_field(name: &str) -> Option<&'static AttributeField> {
        Self::fields().iter().find(|field| field.name == name)
    }

    fn info() -> AttributeSetInfo
    where
        Self: Sized,
    {
        AttributeSetInfo::of::<Self>()
    }
}

/// A named, ordered collection of attributes owned by one character.
///
/// The four `*_attribute_change` hooks are the extension point for derived
/// attribute logic, e.g. killing a character when its temperature reaches the
/// maximum. Every write goes through the owning
/// [`Attributes`](crate::Attributes) host and runs, in order: the set's pre
/// hook, the attribute's pre listeners, the store, the attribute's post
/// listeners, the set's post hook.
///
/// Hooks and listeners only observe writes. A current value is always
/// `base` folded with the host's active modifiers, so the set itself offers
/// no way to store one directly.
pub trait AttributeSet: AttributeFields + Send + Sync + 'static {
    fn pre_attribute_change(&mut self, _field: &'static AttributeField, _new_value: Scalar) {}

    fn post_attribute_change(&mut self, _field: &'static AttributeField, _new_value: Scalar) {}

    fn pre_attribute_base_change(&mut self, _field: &'static AttributeField, _new_value: Scalar) {}

    fn post_attribute_base_change(&mut self, _field: &'static AttributeField, _new_value: Scalar) {}

    /// Typed lookup by name. `None` for unknown names or another value type.
    fn attribute<T: AttributeScalar>(&self, name: &str) -> Option<&AttributeValue<T>> {
        self.field(name).and_then(T::unwrap_ref)
    }

    fn attribute_mut<T: AttributeScalar>(&mut self, name: &str) -> Option<&mut AttributeValue<T>> {
        self.field_mut(name).and_then(T::unwrap_mut)
    }

    /// Typed lookup of an attribute the caller knows to be bound.
    ///
    /// # Panics
    ///
    /// If the set has no attribute `name` holding `T` values.
    fn bound_attribute<T: AttributeScalar>(&self, name: &str) -> &AttributeValue<T> {
        bound_field::<Self, T>(name);
        match self.attribute::<T>(name) {
            Some(attribute) => attribute,
            None => panic!("`{}` lists `{name}` but has no accessor for it", Self::NAME),
        }
    }

    fn current_value<T: AttributeScalar>(&self, name: &str) -> Option<T> {
        self.attribute::<T>(name).map(AttributeValue::current_value)
    }

    fn base_value<T: AttributeScalar>(&self, name: &str) -> Option<T> {
        self.attribute::<T>(name).map(AttributeValue::base_value)
    }

    fn subscribe_post_change<T: AttributeScalar>(
        &mut self,
        name: &str,
        listener: impl FnMut(T) + Send + Sync + 'static,
    ) -> Option<SubscriptionId> {
        self.attribute_mut::<T>(name)
            .map(|attribute| attribute.subscribe_post_change(listener))
    }

    fn subscribe_post_base_change<T: AttributeScalar>(
        &mut self,
        name: &str,
        listener: impl FnMut(T) + Send + Sync + 'static,
    ) -> Option<SubscriptionId> {
        self.attribute_mut::<T>(name)
            .map(|attribute| attribute.subscribe_post_base_change(listener))
    }

    fn unsubscribe(&mut self, name: &str, id: SubscriptionId) -> bool {
        match self.field_mut(name) {
            Some(AttributeMut::Float(attribute)) => attribute.unsubscribe(id),
            Some(AttributeMut::Int(attribute)) => attribute.unsubscribe(id),
            None => false,
        }
    }
}

/// Notification-guarded write of the current value.
///
/// # Panics
///
/// If the set has no attribute `name` holding `T` values.
pub(crate) fn write_current_value<S: AttributeSet, T: AttributeScalar>(set: &mut S, name: &str, value: T) {
    let field = bound_field::<S, T>(name);
    set.pre_attribute_change(field, value.into_scalar());
    if let Some(attribute) = set.attribute_mut::<T>(name) {
        attribute.set_current_value(value);
    }
    set.post_attribute_change(field, value.into_scalar());
}

/// Notification-guarded write of the base value. Leaves the current value
/// alone; the host re-derives it.
///
/// # Panics
///
/// If the set has no attribute `name` holding `T` values.
pub(crate) fn write_base_value<S: AttributeSet, T: AttributeScalar>(set: &mut S, name: &str, value: T) {
    let field = bound_field::<S, T>(name);
    set.pre_attribute_base_change(field, value.into_scalar());
    if let Some(attribute) = set.attribute_mut::<T>(name) {
        attribute.set_base_value(value);
    }
    set.post_attribute_base_change(field, value.into_scalar());
}

fn bound_field<S: AttributeFields + ?Sized, T: AttributeScalar>(name: &str) -> &'static AttributeField {
    match S::find_field(name) {
        Some(field) if field.kind == T::KIND => field,
        Some(field) => panic!(
            "attribute `{}.{name}` holds {:?} values, not {:?}",
            S::NAME,
            field.kind,
            T::KIND
        ),
        None => panic!("`{}` has no attribute named `{name}`", S::NAME),
    }
}

/// Load-time registry of the attribute set types known to the game.
///
/// Authoring and validation resolve the set type named by effect data here.
/// The runtime engine never consults it.
#[derive(Resource, Debug, Default)]
pub struct AttributeSetRegistry {
    sets: BTreeMap<&'static str, AttributeSetInfo>,
}

impl AttributeSetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AttributeSet>(&mut self) -> &mut Self {
        if self.sets.insert(S::NAME, S::info()).is_none() {
            debug!("Registered attribute set {} ({} fields)", S::NAME, S::fields().len());
        }
        self
    }

    /// Looks up a set type by name. `None` means the name does not denote a
    /// registered attribute set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<AttributeSetInfo> {
        self.sets.get(name).copied()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sets.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Implements [`AttributeFields`] for a struct whose attributes are
/// [`AttributeValue`] fields.
///
/// Each listed field must be declared as `AttributeValue<ty>`; a mismatch is a
/// compile error. Attribute names are the field names.
///
/// # Usage
///
/// ```rust
/// use msg_attribute_effect::prelude::*;
///
/// pub struct Mobility {
///     pub speed: AttributeValue<f32>,
///     pub jumps: AttributeValue<i32>,
/// }
///
/// attribute_fields!(Mobility { speed: f32, jumps: i32 });
///
/// impl AttributeSet for Mobility {}
///
/// let mobility = Mobility {
///     speed: AttributeValue::new(4.0),
///     jumps: AttributeValue::new(2),
/// };
/// assert_eq!(Mobility::NAME, "Mobility");
/// assert_eq!(mobility.current_value::<i32>("jumps"), Some(2));
/// ```
#[macro_export]
macro_rules! attribute_fields {
    ($set:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        impl $crate::AttributeFields for $set {
            const NAME: &'static str = stringify!($set);

            fn fields() -> &'static [$crate::AttributeField] {
                const FIELDS: &[$crate::AttributeField] = &[
                    $($crate::AttributeField::new(
                        stringify!($field),
                        <$ty as $crate::AttributeScalar>::KIND,
                    ),)*
                ];
                FIELDS
            }

            fn field(&self, name: &str) -> Option<$crate::AttributeRef<'_>> {
                $(
                    if name == stringify!($field) {
                        return Some(<$ty as $crate::AttributeScalar>::wrap_ref(&self.$field));
                    }
                )*
                let _ = name;
                None
            }

            fn field_mut(&mut self, name: &str) -> Option<$crate::AttributeMut<'_>> {
                $(
                    if name == stringify!($field) {
                        return Some(<$ty as $crate::AttributeScalar>::wrap_mut(&mut self.$field));
                    }
                )*
                let _ = name;
                None
            }
        }
    };
}
