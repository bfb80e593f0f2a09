//! Sparse, type-checked storage for the fields of a record that is still being filled in.

#[cfg(test)]
mod tests;

use alloc::vec::Vec;
use core::marker::PhantomData;

use log::trace;

use crate::{BoxedValue, FieldId, FieldKey, FieldNotSet, FieldValue, Record, RecordShape};

/// Any subset of the fields of `R`, each type-checked against `R::SHAPE`.
///
/// A field is either *unset* or holds a value of exactly its declared type.
/// For optional fields (declared as `Option<T>`), holding `None` is different
/// from being unset: `value` returns `Ok(&None)` for the former and
/// [`FieldNotSet`] for the latter. Both count as "no value" once the record is
/// built.
///
/// Clones are deep: two `PartialRecord`s never share field storage.
pub struct PartialRecord<R> {
    /// one slot per declared field, indexed by `Field::index`
    slots: Vec<Option<BoxedValue>>,

    _record: PhantomData<fn() -> R>,
}

impl<R: Record> PartialRecord<R> {
    /// Creates a partial with no field set.
    pub fn new() -> Self {
        Self {
            slots: (0..R::SHAPE.fields.len()).map(|_| None).collect(),
            _record: PhantomData,
        }
    }

    /// Creates a partial with every field of `record` set.
    pub fn from_record(record: R) -> Self {
        let mut partial = Self::new();
        record.disassemble(&mut partial);
        partial
    }

    /// The shape of the record being built
    pub fn shape(&self) -> &'static RecordShape {
        R::SHAPE
    }

    /// Sets the field behind `key` to `value`, overwriting any previous value.
    pub fn set<V: FieldValue>(&mut self, key: FieldKey<R, V>, value: V) -> &mut Self {
        self.replace(key, value);
        self
    }

    /// Sets the field behind `key` to `value` and returns what it held before.
    pub fn replace<V: FieldValue>(&mut self, key: FieldKey<R, V>, value: V) -> Option<V> {
        let index = key.field().index;
        trace!("set {:?} = {value:?}", key);
        self.slots[index]
            .replace(BoxedValue::new(value))
            .and_then(|previous| previous.downcast::<V>().ok())
    }

    /// Unsets the field behind `key`, returning its value. Does nothing if the
    /// field was not set.
    pub fn remove<V: FieldValue>(&mut self, key: FieldKey<R, V>) -> Option<V> {
        let index = key.field().index;
        let previous = self.slots[index].take()?;
        trace!("removed {:?}", key);
        previous.downcast::<V>().ok()
    }

    /// Reads the field behind `key`.
    ///
    /// Fails with [`FieldNotSet`] if the field has no value, including an
    /// optional field that was never set.
    pub fn value<V: FieldValue>(&self, key: FieldKey<R, V>) -> Result<&V, FieldNotSet> {
        let index = key.field().index;
        self.slots[index]
            .as_ref()
            .and_then(|value| value.downcast_ref::<V>())
            .ok_or_else(|| FieldNotSet::new(key))
    }

    /// Reads an optional field, treating "unset" and "set to `None`" alike.
    pub fn optional<V: FieldValue>(&self, key: FieldKey<R, Option<V>>) -> Option<&V> {
        self.value(key).ok().and_then(Option::as_ref)
    }

    /// Returns true if `field` currently has a value (`None` counts, for optional fields).
    pub fn contains(&self, field: impl Into<FieldId>) -> bool {
        self.get(field.into()).is_some()
    }

    /// The erased value of `field`, if it has one.
    ///
    /// # Panics
    ///
    /// Panics if `field` is not a field of `R`.
    pub fn get(&self, field: FieldId) -> Option<&BoxedValue> {
        assert!(
            field.belongs_to::<R>(),
            "{field} is not a field of {}",
            R::SHAPE
        );
        self.slots[field.index()].as_ref()
    }

    /// Present fields and their erased values, in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &BoxedValue)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|value| (FieldId::new(R::SHAPE, index), value))
        })
    }

    /// Number of fields that currently have a value
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns true if no field has a value
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Unsets every field.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Copies every field that has a value in `other` into `self`, overwriting
    /// what `self` held for those fields. Fields unset in `other` are left alone.
    pub fn merge(&mut self, other: &PartialRecord<R>) -> &mut Self {
        for (slot, theirs) in self.slots.iter_mut().zip(&other.slots) {
            if let Some(theirs) = theirs {
                *slot = Some(theirs.clone());
            }
        }
        self
    }

    /// Required fields that have no value, in declared order.
    pub fn missing_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        R::SHAPE
            .required_fields()
            .filter(|id| self.slots[id.index()].is_none())
    }

    /// Returns true if every required field has a value.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().next().is_none()
    }

    /// Builds the complete record.
    ///
    /// Fails with [`FieldNotSet`] for the first required field (in declared
    /// order) that has no value. Optional fields without a value become `None`.
    /// The partial is left untouched either way.
    pub fn build(&self) -> Result<R, FieldNotSet> {
        if let Some(missing) = self.missing_fields().next() {
            return Err(FieldNotSet::new(missing));
        }
        R::assemble(self)
    }

    /// Sets a field whose type is itself a record from that record's partial.
    ///
    /// If `nested` is incomplete, its own [`FieldNotSet`] (which names a field
    /// of `U`, not of `R`) is returned unchanged and `self` is not modified.
    pub fn set_from_nested<U>(
        &mut self,
        key: FieldKey<R, U>,
        nested: &PartialRecord<U>,
    ) -> Result<&mut Self, FieldNotSet>
    where
        U: Record + FieldValue,
    {
        let value = nested.build()?;
        Ok(self.set(key, value))
    }

    /// Like [`set_from_nested`](Self::set_from_nested), for an optional field:
    /// the built record is stored as `Some`.
    pub fn set_from_nested_optional<U>(
        &mut self,
        key: FieldKey<R, Option<U>>,
        nested: &PartialRecord<U>,
    ) -> Result<&mut Self, FieldNotSet>
    where
        U: Record + FieldValue,
    {
        let value = nested.build()?;
        Ok(self.set(key, Some(value)))
    }
}

impl<R: Record> Default for PartialRecord<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> From<R> for PartialRecord<R> {
    fn from(record: R) -> Self {
        Self::from_record(record)
    }
}

impl<R> Clone for PartialRecord<R> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            _record: PhantomData,
        }
    }
}

impl<R> PartialEq for PartialRecord<R> {
    fn eq(&self, other: &Self) -> bool {
        self.slots == other.slots
    }
}

impl<R: Record> core::fmt::Debug for PartialRecord<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct(R::SHAPE.type_identifier);
        for (id, value) in self.iter() {
            s.field(id.name(), value);
        }
        if self.is_complete() {
            s.finish()
        } else {
            s.finish_non_exhaustive()
        }
    }
}
