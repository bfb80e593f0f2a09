use alloc::rc::Weak;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::ops::Deref;

use log::{debug, trace};
use partwise_core::{FieldId, FieldKey, FieldValue, PartialRecord, Record};

use super::{ObservableBuilder, Shared};
use crate::Subscription;

impl<R: Record> ObservableBuilder<R> {
    /// A builder for the record-typed field behind `key`, which keeps that
    /// field in sync until it is [detached](AttachedBuilder::detach).
    ///
    /// It starts out holding the field's current value, if there is one.
    /// From then on, every change made through it sets the field to the built
    /// value if the child is complete, and removes the field if it is not.
    pub fn builder<U>(&self, key: FieldKey<R, U>) -> AttachedBuilder<U>
    where
        U: Record + FieldValue,
    {
        let seed = self.value(key).ok();
        self.attach(key, seed, |value| value)
    }

    /// Like [`builder`](Self::builder), for an optional field: the built value
    /// is stored as `Some`, and an incomplete child removes the field.
    ///
    /// A field that is set to `None` starts the child out empty.
    pub fn builder_for_optional<U>(&self, key: FieldKey<R, Option<U>>) -> AttachedBuilder<U>
    where
        U: Record + FieldValue,
    {
        let seed = self.optional(key);
        self.attach(key, seed, Some)
    }

    fn attach<U, V>(&self, key: FieldKey<R, V>, seed: Option<U>, wrap: fn(U) -> V) -> AttachedBuilder<U>
    where
        U: Record,
        V: FieldValue,
    {
        let parent_field = key.id();
        let builder = match seed {
            Some(seed) => ObservableBuilder::from_record(seed),
            None => ObservableBuilder::new(),
        };

        let weak_parent = self.downgrade();
        let parent_gone = Cell::new(false);
        let forwarding = builder.subscribe_to_all(move |changed, child: &ObservableBuilder<U>| {
            let Some(parent) = ObservableBuilder::upgrade(&weak_parent) else {
                if !parent_gone.replace(true) {
                    debug!("parent of {} was dropped, {changed} no longer reaches {parent_field}", U::SHAPE);
                }
                return;
            };
            match child.build() {
                Ok(value) => {
                    trace!("{changed} completed {}, forwarding into {parent_field}", U::SHAPE);
                    parent.set(key, wrap(value));
                }
                Err(missing) => {
                    trace!("{missing}, clearing {parent_field}");
                    parent.remove(key);
                }
            }
        });
        debug!("attached a {} builder to {parent_field}", U::SHAPE);

        let parent: Weak<Shared<R>> = self.downgrade();
        let parent: Weak<dyn Any> = parent;
        AttachedBuilder {
            builder,
            parent_field,
            parent,
            forwarding: RefCell::new(Some(forwarding)),
        }
    }
}

/// An [`ObservableBuilder`] for one record-typed field of a parent builder.
///
/// Obtained from [`ObservableBuilder::builder`]. While attached, each change
/// to this builder writes the built value into the parent's field (or removes
/// the field while this builder is incomplete), which in turn notifies the
/// parent's own listeners. The parent is only referenced weakly: once it is
/// dropped, changes here go nowhere.
///
/// Derefs to the underlying [`ObservableBuilder`]; dropping the attached
/// builder detaches it.
pub struct AttachedBuilder<U: Record> {
    builder: ObservableBuilder<U>,
    parent_field: FieldId,
    parent: Weak<dyn Any>,
    forwarding: RefCell<Option<Subscription>>,
}

impl<U: Record> AttachedBuilder<U> {
    /// Stops writing into the parent. The parent's field keeps whatever it
    /// holds right now. Detaching twice does nothing more.
    pub fn detach(&self) {
        let forwarding = self.forwarding.borrow_mut().take();
        if let Some(forwarding) = forwarding {
            forwarding.cancel();
            debug!("detached the {} builder from {}", U::SHAPE, self.parent_field);
        }
    }

    /// Returns true while changes here still reach the parent.
    pub fn is_attached(&self) -> bool {
        self.forwarding
            .borrow()
            .as_ref()
            .is_some_and(Subscription::is_active)
            && self.parent.strong_count() > 0
    }

    /// The parent field this builder feeds
    pub fn parent_field(&self) -> FieldId {
        self.parent_field
    }

    /// Detaches, and returns the builder to keep using it on its own.
    pub fn into_builder(self) -> ObservableBuilder<U> {
        self.detach();
        self.builder
    }

    /// Detaches, and returns the fields set so far.
    pub fn into_partial(self) -> PartialRecord<U> {
        self.into_builder().into_partial()
    }
}

impl<U: Record> Deref for AttachedBuilder<U> {
    type Target = ObservableBuilder<U>;

    fn deref(&self) -> &Self::Target {
        &self.builder
    }
}

impl<U: Record> core::fmt::Debug for AttachedBuilder<U> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AttachedBuilder")
            .field("parent_field", &self.parent_field)
            .field("attached", &self.is_attached())
            .field("builder", &self.builder)
            .finish()
    }
}
