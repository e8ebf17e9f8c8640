//! Attribute sets shared by the unit tests.

use crate::attribute::AttributeValue;
use crate::attribute_fields;
use crate::set::{AttributeField, AttributeSet};
use crate::scalar::Scalar;

/// Stat block of a character that dies of overheating.
#[derive(Debug)]
pub(crate) struct CharacterAttributes {
    pub temperature: AttributeValue<f32>,
    pub max_temperature: AttributeValue<f32>,
    pub movement_speed: AttributeValue<f32>,
    pub armor: AttributeValue<i32>,
    pub deaths: u32,
    /// Post-change notifications seen for `temperature`.
    pub temperature_changes: u32,
}

impl Default for CharacterAttributes {
    fn default() -> Self {
        Self {
            temperature: AttributeValue::new(0.0),
            max_temperature: AttributeValue::new(100.0),
            movement_speed: AttributeValue::new(5.0),
            armor: AttributeValue::new(10),
            deaths: 0,
            temperature_changes: 0,
        }
    }
}

attribute_fields!(CharacterAttributes {
    temperature: f32,
    max_temperature: f32,
    movement_speed: f32,
    armor: i32,
});

impl AttributeSet for CharacterAttributes {
    fn post_attribute_change(&mut self, field: &'static AttributeField, new_value: Scalar) {
        if field.name != "temperature" {
            return;
        }
        self.temperature_changes += 1;
        if self.deaths == 0 && new_value.as_f32() >= self.max_temperature.current_value() {
            self.deaths += 1;
        }
    }
}

/// A second set type, for mismatched-target checks.
#[derive(Debug)]
pub(crate) struct TurretAttributes {
    pub ammo: AttributeValue<i32>,
    pub fire_rate: AttributeValue<f32>,
}

impl Default for TurretAttributes {
    fn default() -> Self {
        Self {
            ammo: AttributeValue::new(30),
            fire_rate: AttributeValue::new(2.0),
        }
    }
}

attribute_fields!(TurretAttributes { ammo: i32, fire_rate: f32 });

impl AttributeSet for TurretAttributes {}
