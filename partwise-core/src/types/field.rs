use core::any::TypeId;

use bitflags::bitflags;

/// Describes a field of a record
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct Field {
    /// name of the field, as written in the record definition
    pub name: &'static str,

    /// 0-based position of the field in the record's declared order
    pub index: usize,

    /// identifier of the field's declared value type
    pub type_id: fn() -> TypeId,

    /// name of the field's declared value type, for diagnostics
    pub type_name: fn() -> &'static str,

    /// flags for the field (e.g. optional)
    pub flags: FieldFlags,

    /// doc comments
    pub doc: &'static [&'static str],
}

impl Field {
    /// Returns a builder for Field
    pub const fn builder() -> FieldBuilder {
        FieldBuilder::new()
    }

    /// Whether this field may be left unset (or set to `None`) in a complete record
    pub fn is_optional(&self) -> bool {
        self.flags.contains(FieldFlags::OPTIONAL)
    }

    /// The `TypeId` of the field's declared value type
    pub fn value_type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// The name of the field's declared value type
    pub fn value_type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Returns true if `V` is exactly the field's declared value type
    pub fn holds<V: 'static>(&self) -> bool {
        self.value_type_id() == TypeId::of::<V>()
    }
}

/// Builder for Field
pub struct FieldBuilder {
    name: Option<&'static str>,
    index: Option<usize>,
    type_id: Option<fn() -> TypeId>,
    type_name: Option<fn() -> &'static str>,
    flags: FieldFlags,
    doc: &'static [&'static str],
}

impl FieldBuilder {
    /// Creates a new FieldBuilder
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            name: None,
            index: None,
            type_id: None,
            type_name: None,
            flags: FieldFlags::EMPTY,
            doc: &[],
        }
    }

    /// Sets the name for the Field
    pub const fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Sets the declared position of the Field
    pub const fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Sets the declared value type of the Field
    pub const fn value_type<V: 'static>(mut self) -> Self {
        self.type_id = Some(TypeId::of::<V> as fn() -> TypeId);
        self.type_name = Some(core::any::type_name::<V> as fn() -> &'static str);
        self
    }

    /// Sets the flags for the Field
    pub const fn flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the doc comments for the Field
    pub const fn doc(mut self, doc: &'static [&'static str]) -> Self {
        self.doc = doc;
        self
    }

    /// Builds the Field
    ///
    /// # Panics
    ///
    /// Panics if the name, index or value type were not set.
    pub const fn build(self) -> Field {
        Field {
            name: match self.name {
                Some(name) => name,
                None => panic!("Field::builder(): name is required"),
            },
            index: match self.index {
                Some(index) => index,
                None => panic!("Field::builder(): index is required"),
            },
            type_id: match self.type_id {
                Some(type_id) => type_id,
                None => panic!("Field::builder(): value_type is required"),
            },
            type_name: match self.type_name {
                Some(type_name) => type_name,
                None => panic!("Field::builder(): value_type is required"),
            },
            flags: self.flags,
            doc: self.doc,
        }
    }
}

bitflags! {
    /// Flags that can be applied to fields to modify their behavior
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u64 {
        /// An empty set of flags
        const EMPTY = 0;

        /// The field holds an `Option`: it does not block completeness, and
        /// reads as `None` in the built record when it was never set.
        const OPTIONAL = 1 << 0;
    }
}

impl Default for FieldFlags {
    #[inline(always)]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl core::fmt::Display for FieldFlags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.contains(FieldFlags::OPTIONAL) {
            write!(f, "optional")
        } else {
            write!(f, "required")
        }
    }
}
