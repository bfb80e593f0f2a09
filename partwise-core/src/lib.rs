#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod macros;

mod error;
pub use error::*;

mod types;
pub use types::*;

mod value;
pub use value::*;

mod partial;
pub use partial::*;

#[cfg(feature = "serde")]
mod codec;
#[cfg(feature = "serde")]
pub use codec::*;

/// A record type with a fixed, ordered list of fields, which can be assembled
/// from (and taken apart into) a [`PartialRecord`].
///
/// Usually implemented through [`record!`], but nothing stops you from writing
/// it by hand: describe the fields in [`Record::SHAPE`], hand out one
/// [`FieldKey`] per field, and make `assemble`/`disassemble` agree with them.
pub trait Record: Sized + 'static {
    /// The shape of this record: its name and its fields, in declared order.
    const SHAPE: &'static RecordShape;

    /// Builds a complete value out of `partial`.
    ///
    /// [`PartialRecord::build`] only calls this once every required field is
    /// present. Optional fields that were never set come out as `None`.
    fn assemble(partial: &PartialRecord<Self>) -> Result<Self, FieldNotSet>;

    /// Moves every field of `self` into `partial`.
    fn disassemble(self, partial: &mut PartialRecord<Self>);
}
