use alloc::rc::{Rc, Weak};
use core::cell::Cell;
use core::sync::atomic::{AtomicU64, Ordering};

use log::trace;

/// A stable identifier for one listener registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Whatever holds the listener a [`Subscription`] refers to.
pub(crate) trait Unsubscribe {
    fn unsubscribe(&self, id: SubscriptionId);
}

/// A listener registration on an [`ObservableBuilder`](crate::ObservableBuilder).
///
/// The listener stays registered for as long as the `Subscription` is alive
/// and not cancelled. Once [`cancel`](Self::cancel)led (or dropped), the
/// listener is never called again, not even by a notification that is already
/// being delivered, and the builder releases it.
///
/// Every subscription is distinct, even two registered for the same field
/// with the same callback.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    id: SubscriptionId,
    active: Rc<Cell<bool>>,
    owner: Weak<dyn Unsubscribe>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, active: Rc<Cell<bool>>, owner: Weak<dyn Unsubscribe>) -> Self {
        Self { id, active, owner }
    }

    /// This subscription's identity
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns true until the subscription is cancelled
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Stops the listener for good. Cancelling twice does nothing more.
    pub fn cancel(&self) {
        if !self.active.replace(false) {
            return;
        }
        trace!("cancelled subscription {:?}", self.id);
        if let Some(owner) = self.owner.upgrade() {
            owner.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscription {}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
