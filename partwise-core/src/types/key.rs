use core::any::TypeId;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use super::{Field, RecordShape};
use crate::{FieldValue, Record};

/// Identifies one field of one record type.
///
/// Two ids are equal when they denote the same field of the same record type.
/// Ids of different record types never compare equal, even at the same index.
#[derive(Clone, Copy)]
pub struct FieldId {
    shape: &'static RecordShape,
    index: usize,
}

impl FieldId {
    /// Creates the id of the field at `index` in `shape`.
    ///
    /// # Panics
    ///
    /// Panics if `shape` has no field at `index`.
    pub fn new(shape: &'static RecordShape, index: usize) -> Self {
        assert!(
            index < shape.fields.len(),
            "{shape} has {} fields, there is no field #{index}",
            shape.fields.len()
        );
        Self { shape, index }
    }

    /// The shape of the record this field belongs to
    pub fn shape(&self) -> &'static RecordShape {
        self.shape
    }

    /// Position of the field in the record's declared order
    pub fn index(&self) -> usize {
        self.index
    }

    /// The field descriptor
    pub fn field(&self) -> &'static Field {
        &self.shape.fields[self.index]
    }

    /// The field's declared name
    pub fn name(&self) -> &'static str {
        self.field().name
    }

    /// Whether this is a field of the record type `R`
    pub fn belongs_to<R: 'static>(&self) -> bool {
        self.shape.is::<R>()
    }
}

impl PartialEq for FieldId {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.shape.same_as(other.shape)
    }
}

impl Eq for FieldId {}

impl Hash for FieldId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.shape.id)().hash(state);
        self.index.hash(state);
    }
}

impl core::fmt::Debug for FieldId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}::{}", self.shape.type_identifier, self.name())
    }
}

impl core::fmt::Display for FieldId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}::{}", self.shape.type_identifier, self.name())
    }
}

/// A typed handle on field #`index` of record `R`, whose declared value type is `V`.
///
/// `FieldKey`s are normally declared as associated constants by [`record!`](crate::record).
/// Every access through a key checks `V` against the record's shape, so a
/// mis-declared key panics on first use instead of reading the wrong type.
pub struct FieldKey<R, V> {
    index: usize,
    _marker: PhantomData<fn() -> (R, V)>,
}

impl<R, V> FieldKey<R, V> {
    /// Creates a key for the field declared at `index`
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Position of the field in the record's declared order
    pub const fn index(self) -> usize {
        self.index
    }
}

impl<R: Record, V: FieldValue> FieldKey<R, V> {
    /// The field descriptor.
    ///
    /// # Panics
    ///
    /// Panics if `R` has no field at this index, or if that field is not
    /// declared with value type `V`.
    pub fn field(self) -> &'static Field {
        let Some(field) = R::SHAPE.fields.get(self.index) else {
            panic!(
                "{} has {} fields, there is no field #{}",
                R::SHAPE,
                R::SHAPE.fields.len(),
                self.index
            );
        };
        assert!(
            field.value_type_id() == TypeId::of::<V>(),
            "field `{}::{}` is declared as `{}`, but was accessed as `{}`",
            R::SHAPE,
            field.name,
            field.value_type_name(),
            core::any::type_name::<V>(),
        );
        field
    }

    /// The untyped id of this field
    pub fn id(self) -> FieldId {
        FieldId::new(R::SHAPE, self.field().index)
    }
}

impl<R, V> Clone for FieldKey<R, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, V> Copy for FieldKey<R, V> {}

impl<R: Record, V: FieldValue> From<FieldKey<R, V>> for FieldId {
    fn from(key: FieldKey<R, V>) -> Self {
        key.id()
    }
}

impl<R: Record, V: FieldValue> PartialEq<FieldId> for FieldKey<R, V> {
    fn eq(&self, other: &FieldId) -> bool {
        self.id() == *other
    }
}

impl<R: Record, V: FieldValue> PartialEq<FieldKey<R, V>> for FieldId {
    fn eq(&self, other: &FieldKey<R, V>) -> bool {
        *self == other.id()
    }
}

impl<R: Record, V: FieldValue> core::fmt::Debug for FieldKey<R, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.id(), f)
    }
}
