//! A [`PartialRecord`] that tells listeners about every change made to it.


mod update;
pub use update::*;

mod attached;
pub use attached::*;

use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell};

use log::{error, trace};
use partwise_core::{BoxedValue, FieldId, FieldKey, FieldNotSet, FieldValue, PartialRecord, Record};

use crate::{Subscription, SubscriptionId, Unsubscribe};

type FieldCallback = dyn FnMut(&ErasedUpdate<'_>);
type AnyCallback<R> = dyn FnMut(FieldId, &ObservableBuilder<R>);

/// One registered callback. Cloning shares the callback.
struct Listener<F: ?Sized> {
    id: SubscriptionId,
    active: Rc<Cell<bool>>,
    callback: Rc<RefCell<F>>,
}

impl<F: ?Sized> Listener<F> {
    /// Calls the callback through `call`, unless the listener was cancelled.
    fn invoke(&self, field: FieldId, call: impl FnOnce(&mut F)) {
        if !self.active.get() {
            return;
        }
        // Only the outermost dispatch of a builder calls its listeners, so a
        // callback is never running twice.
        match self.callback.try_borrow_mut() {
            Ok(mut callback) => call(&mut *callback),
            Err(_) => error!("listener {:?} is already running, cannot notify it of {field}", self.id),
        }
    }
}

impl<F: ?Sized> Clone for Listener<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: Rc::clone(&self.active),
            callback: Rc::clone(&self.callback),
        }
    }
}

/// Moves the cancelled listeners of `list` out
fn split_off_inactive<F: ?Sized>(list: &mut Vec<Listener<F>>) -> Vec<Listener<F>> {
    let (active, inactive) = core::mem::take(list)
        .into_iter()
        .partition(|listener| listener.active.get());
    *list = active;
    inactive
}

struct Registry<R: Record> {
    /// indexed by `Field::index`
    fields: Vec<Vec<Listener<FieldCallback>>>,
    any: Vec<Listener<AnyCallback<R>>>,
}

impl<R: Record> Registry<R> {
    fn new() -> Self {
        Self {
            fields: (0..R::SHAPE.fields.len()).map(|_| Vec::new()).collect(),
            any: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.fields.iter().map(Vec::len).sum::<usize>() + self.any.len()
    }

    /// Removes every cancelled listener and hands them back, so the caller can
    /// drop them once the registry is no longer borrowed: a callback may own
    /// subscriptions of its own, which unsubscribe when dropped.
    fn prune(&mut self) -> Self {
        Self {
            fields: self.fields.iter_mut().map(split_off_inactive).collect(),
            any: split_off_inactive(&mut self.any),
        }
    }

    /// Cancels every listener and hands them all back, for the same reason.
    fn cancel_all(&mut self) -> Self {
        let all = core::mem::replace(self, Self::new());
        for listener in all.fields.iter().flatten() {
            listener.active.set(false);
        }
        for listener in &all.any {
            listener.active.set(false);
        }
        all
    }
}

/// How many changes one dispatch delivers before it gives up: listeners
/// that keep reacting to their own changes would otherwise never stop.
pub const CASCADE_LIMIT: usize = 1024;

struct Shared<R: Record> {
    partial: RefCell<PartialRecord<R>>,
    registry: RefCell<Registry<R>>,
    /// changes made while a dispatch is running, delivered by that dispatch
    pending: RefCell<VecDeque<PendingUpdate>>,
    dispatching: Cell<bool>,
}

/// Ends a dispatch, even when a listener panics: changes it left undelivered
/// are dropped rather than handed to the next one.
struct Dispatching<'a, R: Record>(&'a Shared<R>);

impl<R: Record> Drop for Dispatching<'_, R> {
    fn drop(&mut self) {
        self.0.pending.borrow_mut().clear();
        self.0.dispatching.set(false);
    }
}

impl<R: Record> Unsubscribe for Shared<R> {
    fn unsubscribe(&self, _id: SubscriptionId) {
        // The listener is already inactive; if the registry is busy, the next
        // registration prunes it instead.
        let pruned = match self.registry.try_borrow_mut() {
            Ok(mut registry) => registry.prune(),
            Err(_) => return,
        };
        drop(pruned);
    }
}

/// Builds an `R` field by field, notifying listeners of every change.
///
/// All mutating methods take `&self`: listeners receive the builder itself
/// and are free to read it, mutate it, or subscribe to it while they run.
/// Notifications are delivered synchronously, before the mutating call
/// returns, to per-field listeners first and then to
/// [`subscribe_to_all`](Self::subscribe_to_all) listeners, each in
/// registration order.
///
/// A change made while the builder is already notifying (by one of its
/// listeners, directly or through [attached builders](AttachedBuilder)) is
/// queued and delivered to every listener once the current change has been
/// delivered, before the outermost mutating call returns. Listeners are never
/// re-entered and every change reaches them. Listeners that keep changing the
/// builder in reaction to their own changes are cut off after
/// [`CASCADE_LIMIT`](crate::CASCADE_LIMIT) deliveries, with an error logged.
pub struct ObservableBuilder<R: Record> {
    shared: Rc<Shared<R>>,
}

impl<R: Record> ObservableBuilder<R> {
    /// Creates a builder with no field set.
    pub fn new() -> Self {
        Self::from_partial(PartialRecord::new())
    }

    /// Creates a builder holding `partial`.
    pub fn from_partial(partial: PartialRecord<R>) -> Self {
        Self {
            shared: Rc::new(Shared {
                partial: RefCell::new(partial),
                registry: RefCell::new(Registry::new()),
                pending: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
            }),
        }
    }

    /// Creates a builder with every field of `record` set.
    pub fn from_record(record: R) -> Self {
        Self::from_partial(PartialRecord::from_record(record))
    }

    /// Sets the field behind `key` and notifies its listeners.
    pub fn set<V: FieldValue>(&self, key: FieldKey<R, V>, value: V) -> &Self {
        let new_value = BoxedValue::new(value.clone());
        let old_value = self
            .shared
            .partial
            .borrow_mut()
            .replace(key, value)
            .map(BoxedValue::new);
        self.notify(PendingUpdate {
            field: key.id(),
            new_value: Some(new_value),
            old_value,
        });
        self
    }

    /// Unsets the field behind `key` and notifies its listeners, returning
    /// the value it held.
    ///
    /// Removing a field that is not set changes nothing, so nobody is notified.
    pub fn remove<V: FieldValue>(&self, key: FieldKey<R, V>) -> Option<V> {
        let old = self.shared.partial.borrow_mut().remove(key)?;
        self.notify(PendingUpdate {
            field: key.id(),
            new_value: None,
            old_value: Some(BoxedValue::new(old.clone())),
        });
        Some(old)
    }

    /// Sets a record-typed field from that record's partial.
    ///
    /// If `nested` is incomplete, its own [`FieldNotSet`] is returned, nothing
    /// changes, and nobody is notified.
    pub fn set_from_nested<U>(
        &self,
        key: FieldKey<R, U>,
        nested: &PartialRecord<U>,
    ) -> Result<&Self, FieldNotSet>
    where
        U: Record + FieldValue,
    {
        let value = nested.build()?;
        Ok(self.set(key, value))
    }

    /// Like [`set_from_nested`](Self::set_from_nested), for an optional field.
    pub fn set_from_nested_optional<U>(
        &self,
        key: FieldKey<R, Option<U>>,
        nested: &PartialRecord<U>,
    ) -> Result<&Self, FieldNotSet>
    where
        U: Record + FieldValue,
    {
        let value = nested.build()?;
        Ok(self.set(key, Some(value)))
    }

    /// A copy of the value behind `key`.
    pub fn value<V: FieldValue>(&self, key: FieldKey<R, V>) -> Result<V, FieldNotSet> {
        self.shared.partial.borrow().value(key).cloned()
    }

    /// A copy of an optional field's value, treating "unset" and "set to `None`" alike.
    pub fn optional<V: FieldValue>(&self, key: FieldKey<R, Option<V>>) -> Option<V> {
        self.shared.partial.borrow().optional(key).cloned()
    }

    /// Returns true if `field` currently has a value.
    pub fn contains(&self, field: impl Into<FieldId>) -> bool {
        self.shared.partial.borrow().contains(field)
    }

    /// Returns true if every required field has a value.
    pub fn is_complete(&self) -> bool {
        self.shared.partial.borrow().is_complete()
    }

    /// Required fields that have no value, in declared order.
    pub fn missing_fields(&self) -> Vec<FieldId> {
        self.shared.partial.borrow().missing_fields().collect()
    }

    /// Builds the complete record; see [`PartialRecord::build`].
    pub fn build(&self) -> Result<R, FieldNotSet> {
        self.shared.partial.borrow().build()
    }

    /// Read access to the underlying partial.
    ///
    /// # Panics
    ///
    /// Mutating the builder while the returned guard is alive panics.
    pub fn partial(&self) -> Ref<'_, PartialRecord<R>> {
        self.shared.partial.borrow()
    }

    /// A copy of the fields set so far
    pub fn snapshot(&self) -> PartialRecord<R> {
        self.shared.partial.borrow().clone()
    }

    /// Cancels every listener and returns the fields set so far.
    pub fn into_partial(self) -> PartialRecord<R> {
        let cancelled = self.shared.registry.borrow_mut().cancel_all();
        drop(cancelled);
        match Rc::try_unwrap(self.shared) {
            Ok(shared) => shared.partial.into_inner(),
            // an attached child is forwarding into us right now
            Err(shared) => shared.partial.borrow().clone(),
        }
    }

    /// Number of listeners that have not been cancelled yet
    pub fn listener_count(&self) -> usize {
        let pruned = self.shared.registry.borrow_mut().prune();
        drop(pruned);
        self.shared.registry.borrow().len()
    }

    /// Calls `listener` after every change to the field behind `key`.
    ///
    /// The listener is not called for the value the field holds right now,
    /// only for later changes.
    pub fn subscribe<V, F>(&self, key: FieldKey<R, V>, mut listener: F) -> Subscription
    where
        V: FieldValue,
        F: FnMut(&FieldUpdate<'_, V>) + 'static,
    {
        let field = key.id();
        let callback = move |update: &ErasedUpdate<'_>| match update.typed::<V>() {
            Some(update) => listener(&update),
            None => error!(
                "listener on {field} expects `{}`, but the update carries another type",
                core::any::type_name::<V>()
            ),
        };
        let callback: Rc<RefCell<FieldCallback>> = Rc::new(RefCell::new(callback));
        self.register(callback, |registry, listener| {
            registry.fields[field.index()].push(listener);
        })
    }

    /// Calls `listener` with the field's id and this builder after every
    /// change to any field.
    pub fn subscribe_to_all<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(FieldId, &ObservableBuilder<R>) + 'static,
    {
        let callback: Rc<RefCell<AnyCallback<R>>> = Rc::new(RefCell::new(listener));
        self.register(callback, |registry, listener| registry.any.push(listener))
    }

    fn register<F: ?Sized>(
        &self,
        callback: Rc<RefCell<F>>,
        insert: impl FnOnce(&mut Registry<R>, Listener<F>),
    ) -> Subscription {
        let id = SubscriptionId::next();
        let active = Rc::new(Cell::new(true));
        let listener = Listener {
            id,
            active: Rc::clone(&active),
            callback,
        };

        let pruned = {
            let mut registry = self.shared.registry.borrow_mut();
            let pruned = registry.prune();
            insert(&mut registry, listener);
            pruned
        };
        drop(pruned);

        let owner = Rc::downgrade(&self.shared);
        let owner: Weak<dyn Unsubscribe> = owner;
        Subscription::new(id, active, owner)
    }

    fn notify(&self, update: PendingUpdate) {
        self.shared.pending.borrow_mut().push_back(update);
        if self.shared.dispatching.replace(true) {
            trace!("queued a change behind the one being dispatched");
            return;
        }
        let _dispatching = Dispatching(&*self.shared);

        let mut delivered = 0;
        loop {
            let next = self.shared.pending.borrow_mut().pop_front();
            let Some(update) = next else {
                break;
            };
            if delivered == CASCADE_LIMIT {
                let dropped = {
                    let mut pending = self.shared.pending.borrow_mut();
                    let dropped = pending.len() + 1;
                    pending.clear();
                    dropped
                };
                error!(
                    "{} listeners changed the builder {CASCADE_LIMIT} times in a row, dropping {dropped} pending changes",
                    R::SHAPE
                );
                break;
            }
            delivered += 1;
            self.deliver(&update.erased());
        }
    }

    fn deliver(&self, update: &ErasedUpdate<'_>) {
        // Listeners may subscribe or cancel while we dispatch, so work from a
        // copy of the lists and re-check `active` before each call.
        let (field_listeners, any_listeners) = {
            let registry = self.shared.registry.borrow();
            (
                registry.fields[update.field.index()].clone(),
                registry.any.clone(),
            )
        };
        trace!(
            "{} {}, notifying {} + {} listeners",
            update.field,
            if update.new_value.is_some() { "set" } else { "removed" },
            field_listeners.len(),
            any_listeners.len()
        );

        for listener in &field_listeners {
            listener.invoke(update.field, |callback| callback(update));
        }
        for listener in &any_listeners {
            listener.invoke(update.field, |callback| callback(update.field, self));
        }
    }

    /// A handle on the same builder, for code that must not keep it alive
    fn downgrade(&self) -> Weak<Shared<R>> {
        Rc::downgrade(&self.shared)
    }

    fn upgrade(shared: &Weak<Shared<R>>) -> Option<Self> {
        shared.upgrade().map(|shared| Self { shared })
    }
}

impl<R: Record> Default for ObservableBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> From<PartialRecord<R>> for ObservableBuilder<R> {
    fn from(partial: PartialRecord<R>) -> Self {
        Self::from_partial(partial)
    }
}

impl<R: Record> core::fmt::Debug for ObservableBuilder<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct("ObservableBuilder");
        match self.shared.partial.try_borrow() {
            Ok(partial) => s.field("partial", &*partial),
            Err(_) => s.field("partial", &format_args!("<being mutated>")),
        };
        if let Ok(registry) = self.shared.registry.try_borrow() {
            s.field("listeners", &registry.len());
        }
        s.finish()
    }
}

#[cfg(feature = "serde")]
impl<R: partwise_core::PartialCodable> serde::Serialize for ObservableBuilder<R> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&*self.partial(), serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, R: partwise_core::PartialCodable> serde::Deserialize<'de> for ObservableBuilder<R> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <PartialRecord<R> as serde::Deserialize>::deserialize(deserializer).map(Self::from_partial)
    }
}
