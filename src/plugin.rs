//! Bevy integration: effect events, observers and the per-set plugin.

use std::marker::PhantomData;
use std::sync::Arc;

use bevy::prelude::*;

use crate::asset::EffectLibrary;
use crate::effect::Effect;
use crate::engine::{ApplicationId, Attributes, DEFAULT_MAGNITUDE};
use crate::set::{AttributeSet, AttributeSetRegistry};

/// Applies an effect to the targeted entity.
///
/// Only the [`AttributeSetPlugin`] of the effect's target set type reacts.
/// A successful application is reported with [`EffectApplied`]. A timed
/// application lives until it expires, a [`CancelEffect`] names its id or a
/// [`RemoveEffect`] names its effect.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_attribute_effect::prelude::*;
///
/// fn ignite(mut commands: Commands, library: Res<EffectLibrary>, target: Entity) {
///     if let Some(effect) = library.get("ignite") {
///         commands.trigger_targets(ApplyEffect::new(effect).with_magnitude(2.0), target);
///     }
/// }
/// ```
#[derive(Event, Clone, Debug)]
pub struct ApplyEffect {
    pub effect: Arc<Effect>,
    pub magnitude: f32,
}

impl ApplyEffect {
    #[must_use]
    pub fn new(effect: Arc<Effect>) -> Self {
        Self {
            effect,
            magnitude: DEFAULT_MAGNITUDE,
        }
    }

    #[must_use]
    pub fn with_magnitude(mut self, magnitude: f32) -> Self {
        self.magnitude = magnitude;
        self
    }
}

/// Removes every active application of the named effect from the targeted entity.
#[derive(Event, Clone, Debug)]
pub struct RemoveEffect {
    pub effect: String,
}

impl RemoveEffect {
    #[must_use]
    pub fn new(effect: impl Into<String>) -> Self {
        Self { effect: effect.into() }
    }
}

/// Cancels one application on the targeted entity.
#[derive(Event, Clone, Debug, PartialEq, Eq)]
pub struct CancelEffect {
    pub application: ApplicationId,
}

/// Triggered on an entity after an [`ApplyEffect`] was applied to it.
///
/// For timed effects, `application` can be sent back in a [`CancelEffect`].
#[derive(Event, Clone, Debug, PartialEq, Eq)]
pub struct EffectApplied {
    pub effect: String,
    pub application: ApplicationId,
}

/// Triggered on an entity when one of its timed applications expires.
#[derive(Event, Clone, Debug, PartialEq, Eq)]
pub struct EffectExpired {
    pub effect: String,
    pub application: ApplicationId,
}

/// Generic observer that applies an [`ApplyEffect`] to `Attributes<S>`.
///
/// If the target entity doesn't have the component, it will be automatically
/// inserted with its default value before applying the effect.
fn apply_effect_observer<S: AttributeSet + Default>(
    trigger: Trigger<ApplyEffect>,
    time: Res<Time>,
    mut q: Query<&mut Attributes<S>>,
    mut commands: Commands,
) {
    let event = trigger.event();
    if event.effect.target_set() != S::NAME {
        return;
    }

    let entity = trigger.target();
    if let Ok(mut attributes) = q.get_mut(entity) {
        match attributes.apply_effect(&event.effect, event.magnitude, time.elapsed()) {
            Ok(handle) => commands.trigger_targets(
                EffectApplied {
                    effect: event.effect.name().to_string(),
                    application: handle.id(),
                },
                entity,
            ),
            Err(e) => error!("{}", e),
        }
    } else if let Ok(mut entity_commands) = commands.get_entity(entity) {
        entity_commands.insert(Attributes::<S>::default());
        commands.trigger_targets(event.clone(), entity);
    }
}

fn remove_effect_observer<S: AttributeSet>(trigger: Trigger<RemoveEffect>, mut q: Query<&mut Attributes<S>>) {
    if let Ok(mut attributes) = q.get_mut(trigger.target()) {
        attributes.remove_effects_named(&trigger.event().effect);
    }
}

fn cancel_effect_observer<S: AttributeSet>(trigger: Trigger<CancelEffect>, mut q: Query<&mut Attributes<S>>) {
    if let Ok(mut attributes) = q.get_mut(trigger.target()) {
        attributes.cancel_application(trigger.event().application);
    }
}

/// Expires timed applications against virtual time, so pausing the game
/// pauses every effect.
pub fn expire_timed_effects<S: AttributeSet>(
    time: Res<Time>,
    mut q: Query<(Entity, &mut Attributes<S>)>,
    mut commands: Commands,
) {
    let now = time.elapsed();
    for (entity, mut attributes) in &mut q {
        if attributes.next_expiry().is_none_or(|at| at > now) {
            continue;
        }
        for expired in attributes.tick(now) {
            commands.trigger_targets(
                EffectExpired {
                    effect: expired.effect,
                    application: expired.application,
                },
                entity,
            );
        }
    }
}

/// Plugin hosting one attribute set type on entities as `Attributes<S>`.
///
/// Registers `S` in the [`AttributeSetRegistry`], makes sure an
/// [`EffectLibrary`] exists, expires timed effects every `Update` and
/// observes [`ApplyEffect`], [`CancelEffect`] and [`RemoveEffect`].
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_attribute_effect::prelude::*;
///
/// #[derive(Default)]
/// pub struct Stamina {
///     pub stamina: AttributeValue<f32>,
/// }
///
/// attribute_fields!(Stamina { stamina: f32 });
///
/// impl AttributeSet for Stamina {}
///
/// fn plugin(app: &mut App) {
///     app.add_plugins(AttributeSetPlugin::<Stamina>::default());
/// }
/// ```
pub struct AttributeSetPlugin<S> {
    _marker: PhantomData<fn() -> S>,
}

impl<S> Default for AttributeSetPlugin<S> {
    fn default() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<S: AttributeSet + Default> Plugin for AttributeSetPlugin<S> {
    fn build(&self, app: &mut App) {
        app.init_resource::<AttributeSetRegistry>();
        app.init_resource::<EffectLibrary>();
        app.world_mut()
            .resource_mut::<AttributeSetRegistry>()
            .register::<S>();
        app.add_systems(Update, expire_timed_effects::<S>);
        app.add_observer(apply_effect_observer::<S>);
        app.add_observer(remove_effect_observer::<S>);
        app.add_observer(cancel_effect_observer::<S>);
    }
}

/// Marker component used to organize effect observers in the entity hierarchy.
///
/// When using [`effect_observer!`], observers are attached to entities
/// with this marker, making them easier to inspect in debugging tools.
#[derive(Component, Reflect)]
#[reflect(Component)]
pub struct EffectObserverMarker;

/// Registers a global observer on a marker entity named after the observer
/// function.
///
/// # Usage
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_attribute_effect::prelude::*;
///
/// fn on_effect_expired(trigger: Trigger<EffectExpired>) {
///     info!("{} wore off on {}", trigger.event().effect, trigger.target());
/// }
///
/// fn plugin(app: &mut App) {
///     effect_observer!(app, on_effect_expired);
/// }
/// ```
#[macro_export]
macro_rules! effect_observer {
    ($app:expr, $observer_fn:ident) => {{
        $app.world_mut().spawn((
            ::bevy::prelude::Name::new(stringify!($observer_fn)),
            $crate::EffectObserverMarker,
            ::bevy::ecs::observer::Observer::new($observer_fn),
        ));
    }};
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::time::TimeUpdateStrategy;

    use super::*;
    use crate::effect::DurationMode;
    use crate::modifier::Modifier;
    use crate::testing::{CharacterAttributes, TurretAttributes};

    #[derive(Resource, Default)]
    struct ExpiredLog(Vec<String>);

    fn record_expiry(trigger: Trigger<EffectExpired>, mut log: ResMut<ExpiredLog>) {
        log.0.push(trigger.event().effect.clone());
    }

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)));
        app.add_plugins(AttributeSetPlugin::<CharacterAttributes>::default());
        app.init_resource::<ExpiredLog>();
        app.add_observer(record_expiry);
        app
    }

    fn effect(name: &str, duration: DurationMode, value: f32) -> Arc<Effect> {
        Arc::new(
            Effect::builder(name)
                .duration(duration)
                .modifier(Modifier::add("temperature", value))
                .build::<CharacterAttributes>()
                .unwrap(),
        )
    }

    fn temperature(app: &App, entity: Entity) -> f32 {
        app.world()
            .get::<Attributes<CharacterAttributes>>(entity)
            .and_then(|attributes| attributes.current_value::<f32>("temperature"))
            .unwrap()
    }

    #[test]
    fn plugin_registers_set_and_resources() {
        let mut app = app();
        app.add_plugins(AttributeSetPlugin::<TurretAttributes>::default());
        app.update();

        let registry = app.world().resource::<AttributeSetRegistry>();
        assert!(registry.contains("CharacterAttributes"));
        assert!(registry.contains("TurretAttributes"));
        assert!(app.world().resource::<EffectLibrary>().is_empty());
    }

    #[test]
    fn apply_effect_event_updates_attributes() {
        let mut app = app();
        let entity = app
            .world_mut()
            .spawn(Attributes::<CharacterAttributes>::default())
            .id();
        app.update();

        app.world_mut().commands().trigger_targets(
            ApplyEffect::new(effect("warm", DurationMode::Instant, 5.0)).with_magnitude(2.0),
            entity,
        );
        app.update();

        assert!((temperature(&app, entity) - 10.0).abs() < 0.001);
    }

    #[test]
    fn apply_effect_auto_inserts_attributes() {
        let mut app = app();
        let entity = app.world_mut().spawn_empty().id();
        app.update();

        app.world_mut()
            .commands()
            .trigger_targets(ApplyEffect::new(effect("warm", DurationMode::Instant, 7.0)), entity);

        // First update: observer runs, queues insert + re-trigger
        app.update();
        // Second update: re-triggered observer applies the effect
        app.update();

        assert!((temperature(&app, entity) - 7.0).abs() < 0.001);
    }

    #[test]
    fn effects_for_other_set_types_are_ignored() {
        let mut app = app();
        app.add_plugins(AttributeSetPlugin::<TurretAttributes>::default());
        let entity = app
            .world_mut()
            .spawn((
                Attributes::<CharacterAttributes>::default(),
                Attributes::<TurretAttributes>::default(),
            ))
            .id();
        app.update();

        app.world_mut()
            .commands()
            .trigger_targets(ApplyEffect::new(effect("warm", DurationMode::Instant, 3.0)), entity);
        app.update();

        assert!((temperature(&app, entity) - 3.0).abs() < 0.001);
        let turret = app.world().get::<Attributes<TurretAttributes>>(entity).unwrap();
        assert!((turret.current_value::<f32>("fire_rate").unwrap() - 2.0).abs() < 0.001);
        assert_eq!(turret.active_count(), 0);
    }

    #[test]
    fn timed_effects_expire_with_virtual_time() {
        let mut app = app();
        let entity = app
            .world_mut()
            .spawn(Attributes::<CharacterAttributes>::default())
            .id();
        app.update();

        app.world_mut().commands().trigger_targets(
            ApplyEffect::new(effect("burn", DurationMode::ForDuration(0.5), 20.0)),
            entity,
        );
        app.update();
        app.update();
        app.update();

        assert!((temperature(&app, entity) - 20.0).abs() < 0.001);
        assert!(app.world().resource::<ExpiredLog>().0.is_empty());

        for _ in 0..10 {
            app.update();
        }

        assert!(temperature(&app, entity).abs() < 0.001);
        assert_eq!(app.world().resource::<ExpiredLog>().0, vec!["burn".to_string()]);
    }

    #[test]
    fn pausing_virtual_time_pauses_expiry() {
        let mut app = app();
        let entity = app
            .world_mut()
            .spawn(Attributes::<CharacterAttributes>::default())
            .id();
        app.update();

        app.world_mut().commands().trigger_targets(
            ApplyEffect::new(effect("burn", DurationMode::ForDuration(0.3), 20.0)),
            entity,
        );
        app.update();
        app.world_mut().resource_mut::<Time<Virtual>>().pause();

        for _ in 0..10 {
            app.update();
        }
        assert!((temperature(&app, entity) - 20.0).abs() < 0.001);

        app.world_mut().resource_mut::<Time<Virtual>>().unpause();
        for _ in 0..10 {
            app.update();
        }
        assert!(temperature(&app, entity).abs() < 0.001);
    }

    #[test]
    fn remove_effect_event_clears_applications() {
        let mut app = app();
        let entity = app
            .world_mut()
            .spawn(Attributes::<CharacterAttributes>::default())
            .id();
        app.update();

        let aura = effect("aura", DurationMode::UntilRemoved, 4.0);
        app.world_mut()
            .commands()
            .trigger_targets(ApplyEffect::new(aura.clone()), entity);
        app.world_mut()
            .commands()
            .trigger_targets(ApplyEffect::new(aura), entity);
        app.update();
        assert!((temperature(&app, entity) - 8.0).abs() < 0.001);

        app.world_mut()
            .commands()
            .trigger_targets(RemoveEffect::new("aura"), entity);
        app.update();

        assert!(temperature(&app, entity).abs() < 0.001);
        assert!(app.world().resource::<ExpiredLog>().0.is_empty());
    }

    #[test]
    fn effect_on_despawned_entity_does_not_panic() {
        let mut app = app();
        let entity = app.world_mut().spawn_empty().id();
        app.world_mut().despawn(entity);
        app.update();

        app.world_mut()
            .commands()
            .trigger_targets(ApplyEffect::new(effect("warm", DurationMode::Instant, 1.0)), entity);

        // Should not panic
        app.update();
    }

    #[derive(Resource, Default)]
    struct AppliedIds(Vec<ApplicationId>);

    fn record_application(trigger: Trigger<EffectApplied>, mut ids: ResMut<AppliedIds>) {
        ids.0.push(trigger.event().application);
    }

    #[test]
    fn cancel_effect_event_removes_one_application() {
        let mut app = app();
        app.init_resource::<AppliedIds>();
        app.add_observer(record_application);
        let entity = app
            .world_mut()
            .spawn(Attributes::<CharacterAttributes>::default())
            .id();
        app.update();

        let aura = effect("aura", DurationMode::UntilRemoved, 4.0);
        app.world_mut()
            .commands()
            .trigger_targets(ApplyEffect::new(aura.clone()), entity);
        app.world_mut()
            .commands()
            .trigger_targets(ApplyEffect::new(aura), entity);
        app.update();
        app.update();

        let ids = app.world().resource::<AppliedIds>().0.clone();
        assert_eq!(ids.len(), 2);
        assert!((temperature(&app, entity) - 8.0).abs() < 0.001);

        app.world_mut()
            .commands()
            .trigger_targets(CancelEffect { application: ids[0] }, entity);
        app.update();

        let attributes = app.world().get::<Attributes<CharacterAttributes>>(entity).unwrap();
        assert!((temperature(&app, entity) - 4.0).abs() < 0.001);
        assert_eq!(attributes.active_count(), 1);
        assert_eq!(attributes.active_effects(Duration::ZERO)[0].application, ids[1]);
    }

    #[test]
    fn non_finite_magnitude_is_not_applied() {
        let mut app = app();
        app.init_resource::<AppliedIds>();
        app.add_observer(record_application);
        let entity = app
            .world_mut()
            .spawn(Attributes::<CharacterAttributes>::default())
            .id();
        app.update();

        app.world_mut().commands().trigger_targets(
            ApplyEffect::new(effect("warm", DurationMode::Instant, 5.0)).with_magnitude(f32::NAN),
            entity,
        );
        app.update();
        app.update();

        assert!(temperature(&app, entity).abs() < 0.001);
        assert!(app.world().resource::<AppliedIds>().0.is_empty());
    }

    #[derive(Resource, Default)]
    struct AppliedLog(Vec<String>);

    fn on_effect_applied(trigger: Trigger<ApplyEffect>, mut log: ResMut<AppliedLog>) {
        log.0.push(trigger.event().effect.name().to_string());
    }

    #[test]
    fn effect_observer_macro_creates_named_global_observer() {
        let mut app = app();
        app.init_resource::<AppliedLog>();
        effect_observer!(app, on_effect_applied);

        let entity = app
            .world_mut()
            .spawn(Attributes::<CharacterAttributes>::default())
            .id();
        app.update();

        let names: Vec<String> = app
            .world_mut()
            .query_filtered::<&Name, With<EffectObserverMarker>>()
            .iter(app.world())
            .map(|name| name.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["on_effect_applied".to_string()]);

        app.world_mut()
            .commands()
            .trigger_targets(ApplyEffect::new(effect("warm", DurationMode::Instant, 1.0)), entity);
        app.update();

        assert_eq!(app.world().resource::<AppliedLog>().0, vec!["warm".to_string()]);
    }
}
