//! The effect application engine: applies effects to an owned attribute set
//! and keeps every current value derived from its base value.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bevy::prelude::*;

use crate::effect::Effect;
use crate::error::ApplyError;
use crate::modifier::{EffectModifier, Modifier, Operation};
use crate::provider::AttributeSnapshot;
use crate::scalar::{AttributeScalar, Scalar, ScalarKind};
use crate::set::{AttributeField, AttributeSet, write_base_value, write_current_value};

/// Magnitude at which modifier operands are used unscaled.
pub const DEFAULT_MAGNITUDE: f32 = 1.0;

static NEXT_HOST: AtomicU64 = AtomicU64::new(1);

/// Identifies one application of an effect on one attribute host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApplicationId(u64);

/// Proof of an effect application, redeemable once through
/// [`Attributes::cancel_effect`].
///
/// The handle is neither `Clone` nor `Copy`, so an application cannot be
/// cancelled twice.
#[derive(Debug, PartialEq, Eq)]
pub struct ApplicationHandle {
    id: ApplicationId,
    host: u64,
}

impl ApplicationHandle {
    #[must_use]
    pub fn id(&self) -> ApplicationId {
        self.id
    }
}

/// Read-only view of an active timed application.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectInstance {
    pub application: ApplicationId,
    pub effect: String,
    pub magnitude: f32,
    pub started_at: Duration,
    /// `None` for effects that last until removed.
    pub remaining: Option<Duration>,
}

/// A timed application that ran out during [`Attributes::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredEffect {
    pub effect: String,
    pub application: ApplicationId,
}

#[derive(Debug, Clone, Copy)]
struct LedgerEntry {
    application: ApplicationId,
    operation: Operation,
    operand: Scalar,
}

#[derive(Debug)]
struct ActiveRecord {
    effect: String,
    magnitude: f32,
    started_at: Duration,
    expires_at: Option<Duration>,
    touched: Vec<&'static AttributeField>,
}

/// Active-modifier ledger and expiry queue of one attribute host.
#[derive(Debug)]
struct ActiveEffects {
    host: u64,
    next_application: u64,
    records: BTreeMap<ApplicationId, ActiveRecord>,
    /// Timed modifier operands per attribute, in application order.
    ledger: HashMap<&'static str, Vec<LedgerEntry>>,
    expiries: BinaryHeap<Reverse<(Duration, ApplicationId)>>,
}

impl Default for ActiveEffects {
    fn default() -> Self {
        Self {
            host: NEXT_HOST.fetch_add(1, Ordering::Relaxed),
            next_application: 0,
            records: BTreeMap::new(),
            ledger: HashMap::new(),
            expiries: BinaryHeap::new(),
        }
    }
}

impl ActiveEffects {
    fn allocate(&mut self) -> ApplicationId {
        self.next_application += 1;
        ApplicationId(self.next_application)
    }

    fn push_entry(&mut self, attribute: &'static str, entry: LedgerEntry) {
        self.ledger.entry(attribute).or_default().push(entry);
    }

    fn insert(&mut self, application: ApplicationId, record: ActiveRecord) {
        if let Some(at) = record.expires_at {
            self.expiries.push(Reverse((at, application)));
        }
        self.records.insert(application, record);
    }

    /// Drops the record and its ledger entries.
    fn remove(&mut self, application: ApplicationId) -> Option<ActiveRecord> {
        let record = self.records.remove(&application)?;
        for field in &record.touched {
            if let Some(entries) = self.ledger.get_mut(field.name) {
                entries.retain(|entry| entry.application != application);
                if entries.is_empty() {
                    self.ledger.remove(field.name);
                }
            }
        }
        if record.expires_at.is_some() {
            self.expiries.retain(|Reverse((_, id))| *id != application);
        }
        Some(record)
    }

    fn pop_due(&mut self, now: Duration) -> Option<ApplicationId> {
        let due = matches!(self.expiries.peek(), Some(Reverse((at, _))) if *at <= now);
        if !due {
            return None;
        }
        self.expiries.pop().map(|Reverse((_, id))| id)
    }

    fn fold<T: AttributeScalar>(&self, attribute: &str, base: T) -> T {
        self.ledger
            .get(attribute)
            .into_iter()
            .flatten()
            .filter_map(|entry| T::from_scalar(entry.operand).map(|operand| (entry.operation, operand)))
            .fold(base, |value, (operation, operand)| value.combine(operation, operand))
    }
}

/// Attribute host component: an [`AttributeSet`] plus the effects active on it.
///
/// Every attribute keeps `current = fold(base, active timed modifiers)` in
/// application order. Instant effects rewrite the base value; timed effects
/// only add ledger entries, so removing them restores the exact prior value.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use msg_attribute_effect::prelude::*;
///
/// #[derive(Default)]
/// pub struct Vitals {
///     pub health: AttributeValue<f32>,
/// }
///
/// attribute_fields!(Vitals { health: f32 });
///
/// impl AttributeSet for Vitals {}
///
/// let regen = Effect::builder("regen")
///     .duration(DurationMode::ForDuration(3.0))
///     .modifier(Modifier::add("health", 10.0_f32))
///     .build::<Vitals>()
///     .unwrap();
///
/// let mut vitals = Attributes::new(Vitals::default());
/// vitals.apply_effect(&regen, DEFAULT_MAGNITUDE, Duration::ZERO).unwrap();
/// assert_eq!(vitals.current_value::<f32>("health"), Some(10.0));
///
/// vitals.tick(Duration::from_secs(3));
/// assert_eq!(vitals.current_value::<f32>("health"), Some(0.0));
/// ```
#[derive(Component, Debug)]
pub struct Attributes<S: AttributeSet> {
    set: S,
    active: ActiveEffects,
}

impl<S: AttributeSet + Default> Default for Attributes<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: AttributeSet> Attributes<S> {
    #[must_use]
    pub fn new(set: S) -> Self {
        Self {
            set,
            active: ActiveEffects::default(),
        }
    }

    #[must_use]
    pub fn set(&self) -> &S {
        &self.set
    }

    /// Mutable access for subscriptions and custom state.
    ///
    /// Attribute values can only be written through
    /// [`set_base_value`](Self::set_base_value) and effects. Neither the set
    /// nor its attributes accept a current value:
    ///
    /// ```compile_fail
    /// # use msg_attribute_effect::prelude::*;
    /// # #[derive(Default)]
    /// # pub struct Heat { pub temperature: AttributeValue<f32> }
    /// # attribute_fields!(Heat { temperature: f32 });
    /// # impl AttributeSet for Heat {}
    /// let mut host = Attributes::new(Heat::default());
    /// host.set_mut().set_current_value("temperature", 50.0_f32);
    /// ```
    ///
    /// ```compile_fail
    /// # use msg_attribute_effect::prelude::*;
    /// # #[derive(Default)]
    /// # pub struct Heat { pub temperature: AttributeValue<f32> }
    /// # attribute_fields!(Heat { temperature: f32 });
    /// # impl AttributeSet for Heat {}
    /// let mut host = Attributes::new(Heat::default());
    /// host.set_mut().temperature.set_current_value(150.0);
    /// ```
    pub fn set_mut(&mut self) -> &mut S {
        &mut self.set
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.set
    }

    #[must_use]
    pub fn current_value<T: AttributeScalar>(&self, name: &str) -> Option<T> {
        self.set.current_value(name)
    }

    #[must_use]
    pub fn base_value<T: AttributeScalar>(&self, name: &str) -> Option<T> {
        self.set.base_value(name)
    }

    /// Writes a base value and re-derives the current value from it.
    ///
    /// # Panics
    ///
    /// If the set has no attribute `name` holding `T` values.
    pub fn set_base_value<T: AttributeScalar>(&mut self, name: &str, value: T) {
        write_base_value(&mut self.set, name, value);
        self.refresh::<T>(name);
    }

    /// Applies `effect` at `now`, scaling operands by `magnitude`.
    ///
    /// Operands read from attributes with `use_snapshot` see the values from
    /// before this call. Only `Add` and `Multiply` operands are scaled. The
    /// returned handle cancels timed applications; for instant effects it is
    /// inert.
    ///
    /// # Panics
    ///
    /// In debug builds, if `magnitude` is not [`DEFAULT_MAGNITUDE`] and the
    /// effect contains a `Replace` modifier, or if a `Divide` operand
    /// resolves to zero.
    pub fn apply_effect(
        &mut self,
        effect: &Effect,
        magnitude: f32,
        now: Duration,
    ) -> Result<ApplicationHandle, ApplyError> {
        if effect.target_set() != S::NAME {
            return Err(ApplyError::TargetMismatch {
                effect: effect.name().to_string(),
                expected: effect.target_set().to_string(),
                actual: S::NAME,
            });
        }
        if !magnitude.is_finite() {
            return Err(ApplyError::InvalidMagnitude {
                effect: effect.name().to_string(),
                magnitude,
            });
        }

        let snapshot = self.snapshot(effect);
        let application = self.active.allocate();
        let mut touched = Vec::new();

        for modifier in effect.modifiers() {
            let field = match modifier {
                EffectModifier::Float(m) => self.apply_modifier(effect, application, m, magnitude, &snapshot),
                EffectModifier::Int(m) => self.apply_modifier(effect, application, m, magnitude, &snapshot),
            };
            if let Some(field) = field {
                if !touched.contains(&field) {
                    touched.push(field);
                }
            }
        }

        if effect.duration().is_instant() {
            debug!("Applied instant effect '{}' to {}", effect.name(), S::NAME);
        } else {
            debug!(
                "Applied effect '{}' to {} as {:?} (magnitude {})",
                effect.name(),
                S::NAME,
                application,
                magnitude
            );
            self.active.insert(
                application,
                ActiveRecord {
                    effect: effect.name().to_string(),
                    magnitude,
                    started_at: now,
                    expires_at: effect.duration().duration().map(|delay| now + delay),
                    touched,
                },
            );
        }

        Ok(ApplicationHandle {
            id: application,
            host: self.active.host,
        })
    }

    /// Removes an active application immediately.
    ///
    /// Returns `false` when the application already expired or was instant.
    ///
    /// # Panics
    ///
    /// If `handle` was issued by another attribute host.
    pub fn cancel_effect(&mut self, handle: ApplicationHandle) -> bool {
        assert_eq!(
            handle.host, self.active.host,
            "application handle {:?} belongs to another attribute host",
            handle.id
        );
        self.cancel_application(handle.id)
    }

    /// Removes an active application by id, as reported by
    /// [`EffectApplied`](crate::EffectApplied).
    ///
    /// Ids are only unique per host. Returns `false` for ids this host has no
    /// active application for.
    pub fn cancel_application(&mut self, application: ApplicationId) -> bool {
        match self.active.remove(application) {
            Some(record) => {
                debug!("Cancelled effect '{}' on {}", record.effect, S::NAME);
                self.refresh_fields(&record.touched);
                true
            }
            None => false,
        }
    }

    /// Removes every active application of the effect named `effect`.
    pub fn remove_effects_named(&mut self, effect: &str) -> usize {
        let applications: Vec<_> = self
            .active
            .records
            .iter()
            .filter(|(_, record)| record.effect == effect)
            .map(|(id, _)| *id)
            .collect();

        let mut touched: Vec<&'static AttributeField> = Vec::new();
        for application in &applications {
            if let Some(record) = self.active.remove(*application) {
                for field in record.touched {
                    if !touched.contains(&field) {
                        touched.push(field);
                    }
                }
            }
        }
        self.refresh_fields(&touched);

        if !applications.is_empty() {
            debug!("Removed {} application(s) of '{}' from {}", applications.len(), effect, S::NAME);
        }
        applications.len()
    }

    /// Expires every timed application due at or before `now`.
    ///
    /// Applications expiring at the same instant are removed in application
    /// order.
    pub fn tick(&mut self, now: Duration) -> Vec<ExpiredEffect> {
        let mut expired = Vec::new();
        while let Some(application) = self.active.pop_due(now) {
            let Some(record) = self.active.remove(application) else {
                continue;
            };
            debug!("Effect '{}' expired on {}", record.effect, S::NAME);
            self.refresh_fields(&record.touched);
            expired.push(ExpiredEffect {
                effect: record.effect,
                application,
            });
        }
        expired
    }

    /// Active timed applications in application order.
    #[must_use]
    pub fn active_effects(&self, now: Duration) -> Vec<EffectInstance> {
        self.active
            .records
            .iter()
            .map(|(application, record)| EffectInstance {
                application: *application,
                effect: record.effect.clone(),
                magnitude: record.magnitude,
                started_at: record.started_at,
                remaining: record.expires_at.map(|at| at.saturating_sub(now)),
            })
            .collect()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.records.len()
    }

    /// Earliest pending expiry.
    #[must_use]
    pub fn next_expiry(&self) -> Option<Duration> {
        self.active.expiries.peek().map(|Reverse((at, _))| *at)
    }

    fn snapshot(&self, effect: &Effect) -> AttributeSnapshot {
        let mut snapshot = AttributeSnapshot::new();
        for modifier in effect.modifiers() {
            for name in modifier.referenced_attributes() {
                let Some(field) = S::find_field(name) else {
                    continue;
                };
                if let Some(attribute) = self.set.field(field.name) {
                    snapshot.record(field.name, attribute.current());
                }
            }
        }
        snapshot
    }

    /// Applies one modifier and returns the attribute it changed.
    fn apply_modifier<T: AttributeScalar>(
        &mut self,
        effect: &Effect,
        application: ApplicationId,
        modifier: &Modifier<T>,
        magnitude: f32,
        snapshot: &AttributeSnapshot,
    ) -> Option<&'static AttributeField> {
        let Some(field) = modifier.target().selected_field::<S>() else {
            panic!(
                "effect '{}' has an invalid target `{}` for {}",
                effect.name(),
                modifier.target().selected().unwrap_or("<none>"),
                S::NAME
            );
        };

        let operation = modifier.operation();
        let mut operand = modifier.apply(&self.set, snapshot);
        if magnitude != DEFAULT_MAGNITUDE {
            if operation.scales_with_magnitude() {
                operand = operand.scaled(magnitude);
            } else if operation == Operation::Replace {
                warn!(
                    "Effect '{}' replaces {} with magnitude {}; the operand is not scaled",
                    effect.name(),
                    field.name,
                    magnitude
                );
                if cfg!(debug_assertions) {
                    panic!(
                        "magnitude {magnitude} applied to a Replace modifier of effect '{}'",
                        effect.name()
                    );
                }
            }
        }

        if operation == Operation::Divide && operand.is_zero() {
            if cfg!(debug_assertions) {
                panic!("effect '{}' divides `{}` by zero", effect.name(), field.name);
            }
            error!(
                "Effect '{}' divides {} by zero; modifier skipped",
                effect.name(),
                field.name
            );
            return None;
        }

        if effect.duration().is_instant() {
            let base = self.set.bound_attribute::<T>(field.name).base_value();
            write_base_value(&mut self.set, field.name, base.combine(operation, operand));
        } else {
            self.active.push_entry(
                field.name,
                LedgerEntry {
                    application,
                    operation,
                    operand: operand.into_scalar(),
                },
            );
        }
        self.refresh::<T>(field.name);
        Some(field)
    }

    fn refresh_fields(&mut self, fields: &[&'static AttributeField]) {
        for field in fields {
            match field.kind {
                ScalarKind::Float => self.refresh::<f32>(field.name),
                ScalarKind::Int => self.refresh::<i32>(field.name),
            }
        }
    }

    fn refresh<T: AttributeScalar>(&mut self, name: &str) {
        let base = self.set.bound_attribute::<T>(name).base_value();
        let current = self.active.fold(name, base);
        write_current_value(&mut self.set, name, current);
    }
}
