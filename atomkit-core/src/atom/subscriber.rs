//! Subscriber types for atoms.
//!
//! A subscriber is any callback that wants to hear about an atom's new value.
//! Callbacks are identified by the address of their `Arc` allocation, so
//! registering the same `Arc` twice collapses into a single registration.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

/// Unique identifier for an atom.
///
/// Clones of an [`Atom`](super::Atom) share the same ID. The ID is what a
/// derived atom uses to remember which upstream atoms it already follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(u64);

impl AtomId {
    /// Generate a new unique atom ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for AtomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

/// A callback invoked with an atom's value after every applied recomputation.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identity of a registered callback: the address of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CallbackKey(usize);

impl CallbackKey {
    pub(crate) fn of<T>(callback: &Callback<T>) -> Self {
        Self(Arc::as_ptr(callback) as *const () as usize)
    }
}

/// The set of callbacks subscribed to one atom, in insertion order.
pub(crate) struct SubscriberSet<T> {
    callbacks: RwLock<IndexMap<CallbackKey, Callback<T>>>,
}

impl<T: 'static> SubscriberSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            callbacks: RwLock::new(IndexMap::new()),
        }
    }

    /// Register a callback. Re-registering the same `Arc` is a no-op.
    pub(crate) fn insert(&self, callback: Callback<T>) -> CallbackKey {
        let key = CallbackKey::of(&callback);
        self.callbacks.write().entry(key).or_insert(callback);
        key
    }

    /// Remove a callback, keeping the order of the others.
    pub(crate) fn remove(&self, key: CallbackKey) -> bool {
        self.callbacks.write().shift_remove(&key).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Invoke every callback with the value `current` returns at the time
    /// of each call.
    ///
    /// The callback list is copied out first so callbacks may subscribe,
    /// unsubscribe or set atoms without deadlocking on this set. A callback
    /// that sets the atom again makes the later callbacks see the newer value.
    pub(crate) fn notify<F>(&self, current: F)
    where
        F: Fn() -> T,
    {
        let callbacks: Vec<Callback<T>> = self.callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback(&current());
        }
    }

    /// Build the handle that removes `key` from this set.
    pub(crate) fn subscription(self: &Arc<Self>, key: CallbackKey) -> Subscription
    where
        T: Send + Sync,
    {
        let set: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(set) = set.upgrade() {
                set.remove(key);
            }
        })
    }
}

/// Handle to a registered callback.
///
/// Dropping the handle (or calling [`unsubscribe`](Self::unsubscribe))
/// deregisters exactly the callback it was created for. Use
/// [`detach`](Self::detach) to keep the callback registered for as long as
/// the atom lives.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Deregister the callback now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Give up the handle without deregistering the callback.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, AtomicUsize};

    #[test]
    fn atom_ids_are_unique() {
        let id1 = AtomId::new();
        let id2 = AtomId::new();
        let id3 = AtomId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn same_callback_registers_once() {
        let set = Arc::new(SubscriberSet::<i32>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let callback: Callback<i32> = Arc::new(move |_: &i32| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let first = set.insert(callback.clone());
        let second = set.insert(callback);
        assert_eq!(first, second);
        assert_eq!(set.len(), 1);

        set.notify(|| 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notify_runs_in_insertion_order() {
        let set = Arc::new(SubscriberSet::<i32>::new());
        let order = Arc::new(RwLock::new(Vec::new()));

        for tag in 0..3 {
            let order = order.clone();
            set.insert(Arc::new(move |_: &i32| order.write().push(tag)));
        }

        set.notify(|| 0);
        assert_eq!(*order.read(), vec![0, 1, 2]);
    }

    #[test]
    fn notify_reads_current_value_per_callback() {
        let set = Arc::new(SubscriberSet::<i32>::new());
        let live = Arc::new(AtomicI32::new(1));
        let seen = Arc::new(RwLock::new(Vec::new()));

        let bump = live.clone();
        set.insert(Arc::new(move |_: &i32| bump.store(2, Ordering::SeqCst)));
        let record = seen.clone();
        set.insert(Arc::new(move |v: &i32| record.write().push(*v)));

        let reader = live.clone();
        set.notify(move || reader.load(Ordering::SeqCst));
        assert_eq!(*seen.read(), vec![2]);
    }

    #[test]
    fn dropping_subscription_removes_callback() {
        let set = Arc::new(SubscriberSet::<i32>::new());
        let seen = Arc::new(AtomicI32::new(0));
        let seen_clone = seen.clone();

        let key = set.insert(Arc::new(move |v: &i32| seen_clone.store(*v, Ordering::SeqCst)));
        let subscription = set.subscription(key);
        assert_eq!(set.len(), 1);

        drop(subscription);
        assert_eq!(set.len(), 0);

        set.notify(|| 7);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detached_subscription_stays_registered() {
        let set = Arc::new(SubscriberSet::<i32>::new());
        let key = set.insert(Arc::new(|_: &i32| {}));

        set.subscription(key).detach();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn subscription_outliving_set_is_harmless() {
        let set = Arc::new(SubscriberSet::<i32>::new());
        let key = set.insert(Arc::new(|_: &i32| {}));
        let subscription = set.subscription(key);

        drop(set);
        subscription.unsubscribe();
    }
}
