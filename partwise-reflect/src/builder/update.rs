use partwise_core::{BoxedValue, FieldId};

/// What happened to a field
#[derive(Debug, PartialEq, Eq)]
pub enum Change<'a, V> {
    /// The field was set to this value
    Set(&'a V),
    /// The field was unset
    Removed,
}

/// One change to one field, as delivered to per-field listeners.
#[derive(Debug, PartialEq, Eq)]
pub struct FieldUpdate<'a, V> {
    /// The field that changed
    pub field: FieldId,
    /// What happened to it
    pub change: Change<'a, V>,
    /// What it held before, if anything
    pub old_value: Option<&'a V>,
}

impl<V> Clone for Change<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Change<'_, V> {}

impl<V> Clone for FieldUpdate<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for FieldUpdate<'_, V> {}

impl<'a, V> FieldUpdate<'a, V> {
    /// What the field holds now, if anything
    pub fn new_value(&self) -> Option<&'a V> {
        match self.change {
            Change::Set(value) => Some(value),
            Change::Removed => None,
        }
    }

    /// Returns true if the field was unset by this change
    pub fn is_removal(&self) -> bool {
        matches!(self.change, Change::Removed)
    }
}

/// A [`FieldUpdate`] before the listener's value type is known.
pub(crate) struct ErasedUpdate<'a> {
    pub(crate) field: FieldId,
    pub(crate) new_value: Option<&'a BoxedValue>,
    pub(crate) old_value: Option<&'a BoxedValue>,
}

impl<'a> ErasedUpdate<'a> {
    /// `None` if either value is not a `V`
    pub(crate) fn typed<V: 'static>(&self) -> Option<FieldUpdate<'a, V>> {
        let old_value = match self.old_value {
            Some(old) => Some(old.downcast_ref::<V>()?),
            None => None,
        };
        let change = match self.new_value {
            Some(new) => Change::Set(new.downcast_ref::<V>()?),
            None => Change::Removed,
        };
        Some(FieldUpdate {
            field: self.field,
            change,
            old_value,
        })
    }
}

/// An owned change waiting for its turn to be dispatched.
pub(crate) struct PendingUpdate {
    pub(crate) field: FieldId,
    pub(crate) new_value: Option<BoxedValue>,
    pub(crate) old_value: Option<BoxedValue>,
}

impl PendingUpdate {
    pub(crate) fn erased(&self) -> ErasedUpdate<'_> {
        ErasedUpdate {
            field: self.field,
            new_value: self.new_value.as_ref(),
            old_value: self.old_value.as_ref(),
        }
    }
}
