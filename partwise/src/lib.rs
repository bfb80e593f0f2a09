#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub use partwise_core::*;

#[cfg(feature = "reflect")]
pub use partwise_reflect::*;

pub use static_assertions;

static_assertions::assert_impl_all!(FieldId: Send, Sync, Copy, core::hash::Hash);
static_assertions::assert_impl_all!(FieldNotSet: Send, Sync, Copy, core::error::Error);

// Builders share state through `Rc`, so they must stay on one thread.
#[cfg(feature = "reflect")]
static_assertions::assert_not_impl_any!(Subscription: Send, Sync);
