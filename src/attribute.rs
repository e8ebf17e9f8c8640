//! Single attribute values with change notification.

use std::fmt;

use crate::scalar::AttributeScalar;

/// Identifies one listener registered on an [`AttributeValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Box<dyn FnMut(T) + Send + Sync>;

/// Ordered multicast list of listeners for one notification.
struct ChangeHook<T> {
    listeners: Vec<(SubscriptionId, Listener<T>)>,
}

impl<T: Copy> ChangeHook<T> {
    fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    fn fire(&mut self, value: T) {
        for (_, listener) in &mut self.listeners {
            listener(value);
        }
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }
}

/// A named numeric quantity with a default, a base and a current value.
///
/// - `base_value` excludes temporary modifiers.
/// - `current_value` includes them. Effect hosts derive it from the base value
///   and the active modifier ledger.
///
/// Both setters fire the pre-change listeners with the new value, store it,
/// then fire the post-change listeners. Listeners run synchronously in
/// registration order. No arithmetic happens here.
///
/// The setters are crate-private: values change only through the owning
/// [`Attributes`](crate::Attributes) host, which also runs the set's hooks.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
/// use msg_attribute_effect::prelude::*;
///
/// #[derive(Default)]
/// pub struct Mobility {
///     pub speed: AttributeValue<f32>,
/// }
///
/// attribute_fields!(Mobility { speed: f32 });
///
/// impl AttributeSet for Mobility {}
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let mut host = Attributes::new(Mobility {
///     speed: AttributeValue::new(5.0),
/// });
///
/// let log = seen.clone();
/// host.set_mut().speed.subscribe_post_change(move |v| log.lock().unwrap().push(v));
///
/// let sprint = Effect::builder("sprint")
///     .duration(DurationMode::UntilRemoved)
///     .modifier(Modifier::multiply("speed", 1.5_f32))
///     .build::<Mobility>()
///     .unwrap();
/// host.apply_effect(&sprint, DEFAULT_MAGNITUDE, Duration::ZERO).unwrap();
///
/// assert_eq!(host.set().speed.current_value(), 7.5);
/// assert_eq!(host.set().speed.base_value(), 5.0);
/// assert_eq!(*seen.lock().unwrap(), vec![7.5]);
/// ```
pub struct AttributeValue<T> {
    default_value: T,
    base_value: T,
    current_value: T,
    pre_change: ChangeHook<T>,
    post_change: ChangeHook<T>,
    pre_base_change: ChangeHook<T>,
    post_base_change: ChangeHook<T>,
    next_subscription: u64,
}

impl<T: AttributeScalar> AttributeValue<T> {
    /// Creates an attribute whose base and current values start at `default_value`.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            base_value: default_value,
            current_value: default_value,
            pre_change: ChangeHook::new(),
            post_change: ChangeHook::new(),
            pre_base_change: ChangeHook::new(),
            post_base_change: ChangeHook::new(),
            next_subscription: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn default_value(&self) -> T {
        self.default_value
    }

    #[inline]
    #[must_use]
    pub fn base_value(&self) -> T {
        self.base_value
    }

    #[inline]
    #[must_use]
    pub fn current_value(&self) -> T {
        self.current_value
    }

    pub(crate) fn set_base_value(&mut self, value: T) {
        self.pre_base_change.fire(value);
        self.base_value = value;
        self.post_base_change.fire(value);
    }

    pub(crate) fn set_current_value(&mut self, value: T) {
        self.pre_change.fire(value);
        self.current_value = value;
        self.post_change.fire(value);
    }

    pub fn subscribe_pre_change(&mut self, listener: impl FnMut(T) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.allocate_subscription();
        self.pre_change.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn subscribe_post_change(&mut self, listener: impl FnMut(T) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.allocate_subscription();
        self.post_change.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn subscribe_pre_base_change(
        &mut self,
        listener: impl FnMut(T) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.allocate_subscription();
        self.pre_base_change.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn subscribe_post_base_change(
        &mut self,
        listener: impl FnMut(T) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.allocate_subscription();
        self.post_base_change.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener from whichever notification it was registered on.
    ///
    /// Returns `false` if the id is unknown (already removed or foreign).
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.pre_change.remove(id)
            || self.post_change.remove(id)
            || self.pre_base_change.remove(id)
            || self.post_base_change.remove(id)
    }

    /// Total number of listeners across all four notifications.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.pre_change.listeners.len()
            + self.post_change.listeners.len()
            + self.pre_base_change.listeners.len()
            + self.post_base_change.listeners.len()
    }

    /// Re-seeds default, base and current value without notifying.
    ///
    /// Only used while a set is being constructed from an authored default table.
    pub(crate) fn reset_default(&mut self, value: T) {
        self.default_value = value;
        self.base_value = value;
        self.current_value = value;
    }

    fn allocate_subscription(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        id
    }
}

impl<T: AttributeScalar> Default for AttributeValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for AttributeValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeValue")
            .field("default_value", &self.default_value)
            .field("base_value", &self.base_value)
            .field("current_value", &self.current_value)
            .finish_non_exhaustive()
    }
}
