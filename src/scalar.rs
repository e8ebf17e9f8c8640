//! Numeric value types an attribute can hold.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeValue;
use crate::modifier::Operation;
use crate::set::{AttributeMut, AttributeRef};

/// Declared value type of an attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Float,
    Int,
}

/// An attribute value with its type erased.
///
/// Used wherever attributes of different value types meet: set-level hooks,
/// snapshots, the active-modifier ledger and authored default tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Float(f32),
    Int(i32),
}

impl Scalar {
    /// The value type this scalar carries.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Float(_) => ScalarKind::Float,
            Self::Int(_) => ScalarKind::Int,
        }
    }

    /// Lossy view as `f32`, handy for threshold checks in hooks.
    #[inline]
    #[must_use]
    pub fn as_f32(&self) -> f32 {
        match self {
            Self::Float(v) => *v,
            Self::Int(v) => *v as f32,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}

/// Numeric types usable as the `T` of [`AttributeValue<T>`].
///
/// Implemented for `f32` and `i32`. The trait carries the arithmetic for the
/// four modifier [`Operation`]s so that neither attributes nor modifiers have
/// to know which concrete type they hold.
pub trait AttributeScalar:
    Copy + Default + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Kind tag stored in attribute field tables.
    const KIND: ScalarKind;

    fn into_scalar(self) -> Scalar;

    /// Returns `None` when `value` holds another kind.
    fn from_scalar(value: Scalar) -> Option<Self>;

    fn wrap_ref(attribute: &AttributeValue<Self>) -> AttributeRef<'_>;

    fn wrap_mut(attribute: &mut AttributeValue<Self>) -> AttributeMut<'_>;

    fn unwrap_ref<'a>(attribute: AttributeRef<'a>) -> Option<&'a AttributeValue<Self>>;

    fn unwrap_mut<'a>(attribute: AttributeMut<'a>) -> Option<&'a mut AttributeValue<Self>>;

    fn is_zero(self) -> bool;

    /// Multiplies the value by an application magnitude.
    fn scaled(self, magnitude: f32) -> Self;

    /// Combines `self` (the value being modified) with `operand`.
    fn combine(self, operation: Operation, operand: Self) -> Self;
}

impl AttributeScalar for f32 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn into_scalar(self) -> Scalar {
        Scalar::Float(self)
    }

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Float(v) => Some(v),
            Scalar::Int(_) => None,
        }
    }

    fn wrap_ref(attribute: &AttributeValue<Self>) -> AttributeRef<'_> {
        AttributeRef::Float(attribute)
    }

    fn wrap_mut(attribute: &mut AttributeValue<Self>) -> AttributeMut<'_> {
        AttributeMut::Float(attribute)
    }

    fn unwrap_ref<'a>(attribute: AttributeRef<'a>) -> Option<&'a AttributeValue<Self>> {
        match attribute {
            AttributeRef::Float(a) => Some(a),
            AttributeRef::Int(_) => None,
        }
    }

    fn unwrap_mut<'a>(attribute: AttributeMut<'a>) -> Option<&'a mut AttributeValue<Self>> {
        match attribute {
            AttributeMut::Float(a) => Some(a),
            AttributeMut::Int(_) => None,
        }
    }

    fn is_zero(self) -> bool {
        self == 0.0
    }

    fn scaled(self, magnitude: f32) -> Self {
        self * magnitude
    }

    fn combine(self, operation: Operation, operand: Self) -> Self {
        match operation {
            Operation::Add => self + operand,
            Operation::Multiply => self * operand,
            Operation::Divide => self / operand,
            Operation::Replace => operand,
        }
    }
}

impl AttributeScalar for i32 {
    const KIND: ScalarKind = ScalarKind::Int;

    fn into_scalar(self) -> Scalar {
        Scalar::Int(self)
    }

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Int(v) => Some(v),
            Scalar::Float(_) => None,
        }
    }

    fn wrap_ref(attribute: &AttributeValue<Self>) -> AttributeRef<'_> {
        AttributeRef::Int(attribute)
    }

    fn wrap_mut(attribute: &mut AttributeValue<Self>) -> AttributeMut<'_> {
        AttributeMut::Int(attribute)
    }

    fn unwrap_ref<'a>(attribute: AttributeRef<'a>) -> Option<&'a AttributeValue<Self>> {
        match attribute {
            AttributeRef::Int(a) => Some(a),
            AttributeRef::Float(_) => None,
        }
    }

    fn unwrap_mut<'a>(attribute: AttributeMut<'a>) -> Option<&'a mut AttributeValue<Self>> {
        match attribute {
            AttributeMut::Int(a) => Some(a),
            AttributeMut::Float(_) => None,
        }
    }

    fn is_zero(self) -> bool {
        self == 0
    }

    fn scaled(self, magnitude: f32) -> Self {
        (self as f32 * magnitude).round() as i32
    }

    fn combine(self, operation: Operation, operand: Self) -> Self {
        match operation {
            Operation::Add => self.saturating_add(operand),
            Operation::Multiply => self.saturating_mul(operand),
            // Zero divisors are filtered before combining.
            Operation::Divide => self.checked_div(operand).unwrap_or(self),
            Operation::Replace => operand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_combine_covers_all_operations() {
        assert!((10.0_f32.combine(Operation::Add, 5.0) - 15.0).abs() < 0.001);
        assert!((10.0_f32.combine(Operation::Multiply, 1.5) - 15.0).abs() < 0.001);
        assert!((10.0_f32.combine(Operation::Divide, 4.0) - 2.5).abs() < 0.001);
        assert!((10.0_f32.combine(Operation::Replace, -3.0) + 3.0).abs() < 0.001);
    }

    #[test]
    fn int_combine_uses_integer_arithmetic() {
        assert_eq!(10_i32.combine(Operation::Add, -4), 6);
        assert_eq!(10_i32.combine(Operation::Multiply, 3), 30);
        assert_eq!(10_i32.combine(Operation::Divide, 4), 2);
        assert_eq!(10_i32.combine(Operation::Replace, 7), 7);
        assert_eq!(i32::MAX.combine(Operation::Add, 1), i32::MAX);
    }

    #[test]
    fn int_scaling_rounds_to_nearest() {
        assert_eq!(3_i32.scaled(1.5), 5);
        assert_eq!(-3_i32.scaled(2.0), -6);
        assert_eq!(7_i32.scaled(0.0), 0);
    }

    #[test]
    fn scalar_conversions_respect_kind() {
        assert_eq!(f32::from_scalar(Scalar::Float(2.5)), Some(2.5));
        assert_eq!(f32::from_scalar(Scalar::Int(2)), None);
        assert_eq!(i32::from_scalar(Scalar::Int(2)), Some(2));
        assert_eq!(Scalar::Int(4).kind(), ScalarKind::Int);
        assert!((Scalar::Int(4).as_f32() - 4.0).abs() < 0.001);
        assert_eq!(Scalar::Float(1.5).to_string(), "1.5");
    }
}
