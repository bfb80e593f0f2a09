use alloc::boxed::Box;
use core::any::{Any, TypeId};
use core::fmt;

/// Anything that can be stored in a field: owned, clonable, comparable and printable.
///
/// Implemented automatically for every type that qualifies.
pub trait FieldValue: Any + Clone + PartialEq + fmt::Debug {}

impl<T: Any + Clone + PartialEq + fmt::Debug> FieldValue for T {}

trait DynValue: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_boxed(&self) -> Box<dyn DynValue>;
    fn eq_dyn(&self, other: &dyn DynValue) -> bool;
    fn type_name(&self) -> &'static str;
}

impl<T: FieldValue> DynValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_boxed(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn DynValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}

/// A type-erased field value.
///
/// Remembers its concrete type, so it can only ever be read back as that type.
pub struct BoxedValue(Box<dyn DynValue>);

impl BoxedValue {
    /// Erases `value`
    pub fn new<V: FieldValue>(value: V) -> Self {
        Self(Box::new(value))
    }

    /// Returns true if the erased value is a `V`
    pub fn is<V: 'static>(&self) -> bool {
        self.0.as_any().is::<V>()
    }

    /// Borrows the erased value as a `V`, if that is what it is
    pub fn downcast_ref<V: 'static>(&self) -> Option<&V> {
        self.0.as_any().downcast_ref::<V>()
    }

    /// Takes the value back out, if it is a `V`. Gives `self` back otherwise.
    pub fn downcast<V: 'static>(self) -> Result<V, Self> {
        if !self.is::<V>() {
            return Err(self);
        }
        self.0
            .into_any()
            .downcast::<V>()
            .map(|boxed| *boxed)
            .map_err(|_| unreachable!("type was checked above"))
    }

    /// The `TypeId` of the erased value (not of `BoxedValue` itself)
    pub fn value_type_id(&self) -> TypeId {
        self.0.as_any().type_id()
    }

    /// The name of the erased value's type
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl Clone for BoxedValue {
    fn clone(&self) -> Self {
        Self(self.0.clone_boxed())
    }
}

impl PartialEq for BoxedValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_dyn(&*other.0)
    }
}

impl fmt::Debug for BoxedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
