//! Thermal character example demonstrating the msg_attribute_effect crate.
//!
//! This example shows how to:
//! - Declare an attribute set with a derived "overheated" rule
//! - Load effects from RON and validate them against the set
//! - Trigger instant, timed and until-removed effects on an entity
//! - React to expiring effects with an organized observer
//!
//! Run with: `cargo run --example thermal_character`

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use msg_attribute_effect::prelude::*;

// ============================================================================
// Attribute set
// ============================================================================

/// Heat state of a character. Reaching the maximum temperature overheats it.
pub struct Thermal {
    pub temperature: AttributeValue<f32>,
    pub max_temperature: AttributeValue<f32>,
    pub burns: AttributeValue<i32>,
    pub overheated: bool,
}

impl Default for Thermal {
    fn default() -> Self {
        Self {
            temperature: AttributeValue::new(20.0),
            max_temperature: AttributeValue::new(100.0),
            burns: AttributeValue::new(0),
            overheated: false,
        }
    }
}

attribute_fields!(Thermal {
    temperature: f32,
    max_temperature: f32,
    burns: i32,
});

impl AttributeSet for Thermal {
    fn post_attribute_change(&mut self, field: &'static AttributeField, new_value: Scalar) {
        if field.name == "temperature"
            && !self.overheated
            && new_value.as_f32() >= self.max_temperature.current_value()
        {
            self.overheated = true;
            println!("  !! Overheated at {:.1} degrees", new_value.as_f32());
        }
    }
}

// ============================================================================
// Authored effects
// ============================================================================

const EFFECTS: &str = r#"
(
    effects: [
        (
            name: "campfire",
            display_name: Some("Campfire"),
            target_set: "Thermal",
            duration: ForDuration(1.0),
            modifiers: [
                Float(operation: Add, attribute: "temperature", value: Constant(30.0)),
            ],
        ),
        (
            name: "heatwave",
            target_set: "Thermal",
            duration: UntilRemoved,
            modifiers: [
                Float(operation: Multiply, attribute: "temperature", value: Constant(1.5)),
            ],
        ),
        (
            name: "lava",
            description: "Adds the maximum temperature on top of the current one.",
            target_set: "Thermal",
            modifiers: [
                Float(
                    operation: Add,
                    attribute: "temperature",
                    value: FromAttribute(attribute: "max_temperature", use_snapshot: true),
                ),
                Int(operation: Add, attribute: "burns", value: Constant(1)),
            ],
        ),
    ],
)
"#;

// ============================================================================
// Plugin setup
// ============================================================================

fn main() {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(250)))
        .add_plugins(AttributeSetPlugin::<Thermal>::default())
        .add_systems(Startup, (load_effects, setup))
        .add_systems(Update, apply_effects_demo);

    effect_observer!(app, on_effect_expired);

    app.run();
}

/// Marker component to track our demo entity
#[derive(Component)]
struct Player;

/// Counter to track demo progression
#[derive(Resource, Default)]
struct DemoState {
    frame: u32,
}

fn load_effects(mut commands: Commands, registry: Res<AttributeSetRegistry>) {
    match EffectLibrary::from_ron_str(EFFECTS, "thermal_effects.ron", &registry) {
        Ok(library) => commands.insert_resource(library),
        Err(e) => {
            eprintln!("Could not load effects: {e}");
            std::process::exit(1);
        }
    }
}

fn setup(mut commands: Commands) {
    commands.spawn((Player, Attributes::<Thermal>::default()));
    commands.insert_resource(DemoState::default());

    println!("=== msg_attribute_effect Example ===\n");
    println!("Initial temperature: 20.0 / 100.0\n");
}

fn on_effect_expired(trigger: Trigger<EffectExpired>) {
    println!("  '{}' wore off", trigger.event().effect);
}

fn apply_effects_demo(
    mut commands: Commands,
    library: Res<EffectLibrary>,
    query: Query<(Entity, &Attributes<Thermal>), With<Player>>,
    mut state: ResMut<DemoState>,
    time: Res<Time>,
) {
    state.frame += 1;

    let Ok((entity, attributes)) = query.single() else {
        return;
    };
    let temperature = attributes.current_value::<f32>("temperature").unwrap_or_default();
    let base = attributes.base_value::<f32>("temperature").unwrap_or_default();

    let mut apply = |name: &str| {
        if let Some(effect) = library.get(name) {
            println!("Frame {}: Applying '{}'", state.frame, effect.display_name());
            commands.trigger_targets(ApplyEffect::new(effect), entity);
        }
    };

    match state.frame {
        // Frame 2: One second next to a campfire
        2 => apply("campfire"),
        // Frame 4: A heatwave multiplies whatever the temperature is
        4 => {
            println!("Frame {}: Temperature {:.1} (base {:.1})", state.frame, temperature, base);
            apply("heatwave");
        }
        // Frame 5: Both effects active
        5 => {
            println!("Frame {}: Temperature {:.1} (base {:.1})\n", state.frame, temperature, base);
        }
        // Frame 8: The campfire has expired, the heatwave remains
        8 => {
            println!("Frame {}: Temperature {:.1} after the campfire", state.frame, temperature);
            for instance in attributes.active_effects(time.elapsed()) {
                println!("  still active: {}", instance.effect);
            }
            commands.trigger_targets(RemoveEffect::new("heatwave"), entity);
            println!("Frame {}: Removing the heatwave\n", state.frame);
        }
        // Frame 9: Back to base
        9 => {
            println!("Frame {}: Temperature {:.1} (base {:.1})", state.frame, temperature, base);
            apply("lava");
        }
        // Frame 10: Instant effects change the base for good
        10 => {
            println!(
                "Frame {}: Temperature {:.1} (base {:.1}), burns {}, overheated: {}\n",
                state.frame,
                temperature,
                base,
                attributes.current_value::<i32>("burns").unwrap_or_default(),
                attributes.set().overheated
            );
            println!("=== Demo Complete ===");
            std::process::exit(0);
        }
        _ => {}
    }
}
