//! shape and field descriptors for records

mod field;
pub use field::*;

mod shape;
pub use shape::*;

mod key;
pub use key::*;
