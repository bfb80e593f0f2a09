use owo_colors::OwoColorize;

use crate::FieldId;

/// A field had no value when one was needed.
///
/// Returned when reading a field that was never set (or was removed), when
/// building a record that is still missing a required field, and when setting
/// a field from a nested partial that is itself incomplete. In that last case
/// the id points into the nested record, not the outer one.
///
/// This is an expected condition while a record is being filled in, not a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldNotSet {
    /// The field that had no value
    pub field: FieldId,
}

impl FieldNotSet {
    /// Creates the error for `field`
    pub fn new(field: impl Into<FieldId>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// The field that had no value
    pub fn field(&self) -> FieldId {
        self.field
    }
}

impl core::fmt::Display for FieldNotSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Field '{}::{}' is not set",
            self.field.shape().blue(),
            self.field.name().yellow()
        )
    }
}

impl core::error::Error for FieldNotSet {}
