use core::any::TypeId;

use super::{Field, FieldId};

/// Schema of a record type: which type it is, and which fields it has
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct RecordShape {
    /// Unique type identifier of the record, provided by the compiler.
    pub id: fn() -> TypeId,

    /// The record's name, without generic parameters
    pub type_identifier: &'static str,

    /// All fields of the record, in declared order. `fields[i].index == i`.
    pub fields: &'static [Field],

    /// Doc comment lines
    pub doc: &'static [&'static str],
}

impl RecordShape {
    /// Returns a builder for the shape of record type `R`.
    pub const fn builder<R: 'static>() -> RecordShapeBuilder {
        RecordShapeBuilder::new(TypeId::of::<R> as fn() -> TypeId)
    }

    /// Check if this shape describes the record type `R`
    pub fn is<R: 'static>(&self) -> bool {
        (self.id)() == TypeId::of::<R>()
    }

    /// Returns true if both shapes describe the same record type
    pub fn same_as(&self, other: &RecordShape) -> bool {
        (self.id)() == (other.id)()
    }

    /// The id of the field at `index`, if there is one
    pub fn field_id(&'static self, index: usize) -> Option<FieldId> {
        (index < self.fields.len()).then(|| FieldId::new(self, index))
    }

    /// Looks up a field by the name it was declared with
    pub fn field_named(&'static self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|field| field.name == name)
            .map(|index| FieldId::new(self, index))
    }

    /// Ids of all fields, in declared order
    pub fn field_ids(&'static self) -> impl Iterator<Item = FieldId> {
        (0..self.fields.len()).map(move |index| FieldId::new(self, index))
    }

    /// Ids of the fields a complete record needs, in declared order
    pub fn required_fields(&'static self) -> impl Iterator<Item = FieldId> {
        self.field_ids().filter(|id| !id.field().is_optional())
    }
}

impl core::fmt::Display for RecordShape {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.type_identifier)
    }
}

/// Builder for [`RecordShape`]
pub struct RecordShapeBuilder {
    id: fn() -> TypeId,
    type_identifier: Option<&'static str>,
    fields: &'static [Field],
    doc: &'static [&'static str],
}

impl RecordShapeBuilder {
    /// Creates a new `RecordShapeBuilder` for the type identified by `id`.
    pub const fn new(id: fn() -> TypeId) -> Self {
        Self {
            id,
            type_identifier: None,
            fields: &[],
            doc: &[],
        }
    }

    /// Sets the `type_identifier` field of the `RecordShapeBuilder`.
    #[inline]
    pub const fn type_identifier(mut self, type_identifier: &'static str) -> Self {
        self.type_identifier = Some(type_identifier);
        self
    }

    /// Sets the `fields` field of the `RecordShapeBuilder`.
    #[inline]
    pub const fn fields(mut self, fields: &'static [Field]) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the `doc` field of the `RecordShapeBuilder`.
    #[inline]
    pub const fn doc(mut self, doc: &'static [&'static str]) -> Self {
        self.doc = doc;
        self
    }

    /// Builds a `RecordShape` from the `RecordShapeBuilder`.
    ///
    /// # Panics
    ///
    /// This method will panic if `type_identifier` was not set, or if a
    /// field's `index` does not match its position in `fields`.
    #[inline]
    pub const fn build(self) -> RecordShape {
        let mut i = 0;
        while i < self.fields.len() {
            if self.fields[i].index != i {
                panic!("RecordShape::builder(): field index does not match its position");
            }
            i += 1;
        }

        RecordShape {
            id: self.id,
            type_identifier: match self.type_identifier {
                Some(type_identifier) => type_identifier,
                None => panic!("RecordShape::builder(): type_identifier is required"),
            },
            fields: self.fields,
            doc: self.doc,
        }
    }
}
