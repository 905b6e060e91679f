//! External Store Binding
//!
//! A [`StoreBinding`] connects a push-based store (something you can
//! subscribe to) with a pull-based snapshot to a host component that needs
//! re-rendering when the snapshot changes.
//!
//! # Lifecycle
//!
//! 1. When created, the binding reads the store's snapshot and holds it as
//!    its state.
//!
//! 2. When the host mounts the component it calls [`StoreBinding::activate`].
//!    The binding subscribes to the store and immediately re-checks the
//!    snapshot once, which catches changes that happened between creation
//!    and mounting.
//!
//! 3. On every change notification the binding reads the snapshot again.
//!    If it differs from the held state, the state is replaced and the host
//!    is asked to render.
//!
//! 4. When the host unmounts the component it calls
//!    [`StoreBinding::deactivate`], which unsubscribes. Dropping the binding
//!    does the same.
//!
//! The binding never polls and never memoizes the store for the caller.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::atom::{Atom, Subscription};

/// Callback a store invokes when it may have changed.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// A store exposing a subscription and a synchronous snapshot.
pub trait ExternalStore: Clone + Send + Sync + 'static {
    /// The snapshot type. Equality decides whether the host re-renders.
    type Snapshot: Clone + PartialEq + Send + Sync + 'static;

    /// Register `on_change`; dropping the returned handle deregisters it.
    fn subscribe(&self, on_change: ChangeCallback) -> Subscription;

    /// Read the current snapshot.
    fn snapshot(&self) -> Self::Snapshot;
}

impl<T> ExternalStore for Atom<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Snapshot = T;

    fn subscribe(&self, on_change: ChangeCallback) -> Subscription {
        Atom::subscribe(self, Arc::new(move |_: &T| on_change()))
    }

    fn snapshot(&self) -> T {
        self.get()
    }
}

/// The host framework's side of a binding.
pub trait Host: Send + Sync {
    /// Schedule the bound component to render again.
    fn schedule_render(&self);
}

impl<F> Host for F
where
    F: Fn() + Send + Sync,
{
    fn schedule_render(&self) {
        self()
    }
}

/// Subscription lifecycle object bridging an [`ExternalStore`] to a [`Host`].
pub struct StoreBinding<S: ExternalStore> {
    store: S,

    /// Snapshot the host last rendered with (or will render with next).
    state: Arc<RwLock<S::Snapshot>>,

    /// Present while the binding is active.
    subscription: Mutex<Option<Subscription>>,
}

impl<S: ExternalStore> StoreBinding<S> {
    /// Capture the store's current snapshot as the initial state.
    pub fn new(store: S) -> Self {
        let initial = store.snapshot();
        Self {
            store,
            state: Arc::new(RwLock::new(initial)),
            subscription: Mutex::new(None),
        }
    }

    /// The snapshot to render with.
    pub fn current(&self) -> S::Snapshot {
        self.state.read().clone()
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_active(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Subscribe to the store and re-check the snapshot once.
    ///
    /// Activating an already active binding replaces its subscription.
    pub fn activate<H>(&self, host: H)
    where
        H: Host + 'static,
    {
        self.deactivate();

        let store = self.store.clone();
        let state = Arc::clone(&self.state);
        let host: Arc<dyn Host> = Arc::new(host);
        let check: ChangeCallback = Arc::new(move || {
            let next = store.snapshot();
            {
                let mut held = state.write();
                if *held == next {
                    return;
                }
                *held = next;
            }
            host.schedule_render();
        });

        let subscription = self.store.subscribe(Arc::clone(&check));
        check();
        *self.subscription.lock() = Some(subscription);
        tracing::trace!("store binding activated");
    }

    /// Unsubscribe from the store. The held snapshot is kept.
    pub fn deactivate(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            tracing::trace!("store binding deactivated");
        }
    }
}

impl<S> fmt::Debug for StoreBinding<S>
where
    S: ExternalStore,
    S::Snapshot: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBinding")
            .field("current", &self.current())
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn render_counter() -> (Arc<AtomicUsize>, impl Host + 'static) {
        let renders = Arc::new(AtomicUsize::new(0));
        let renders_clone = renders.clone();
        let host = move || {
            renders_clone.fetch_add(1, Ordering::SeqCst);
        };
        (renders, host)
    }

    #[test]
    fn binding_starts_with_store_snapshot() {
        let atom = Atom::new("idle".to_string());
        let binding = StoreBinding::new(atom);

        assert_eq!(binding.current(), "idle");
        assert!(!binding.is_active());
    }

    #[test]
    fn binding_renders_on_change() {
        let atom = Atom::new(1);
        let binding = StoreBinding::new(atom.clone());
        let (renders, host) = render_counter();

        binding.activate(host);
        assert_eq!(renders.load(Ordering::SeqCst), 0);

        atom.set(2);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert_eq!(binding.current(), 2);
    }

    #[test]
    fn binding_skips_render_for_equal_snapshot() {
        let atom = Atom::new(1);
        let binding = StoreBinding::new(atom.clone());
        let (renders, host) = render_counter();
        binding.activate(host);

        atom.set(1);
        atom.update(|v| *v);
        assert_eq!(renders.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn activation_catches_up_with_missed_changes() {
        let atom = Atom::new(1);
        let binding = StoreBinding::new(atom.clone());
        let (renders, host) = render_counter();

        atom.set(5);
        assert_eq!(binding.current(), 1);

        binding.activate(host);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert_eq!(binding.current(), 5);
    }

    #[test]
    fn deactivate_unsubscribes() {
        let atom = Atom::new(1);
        let binding = StoreBinding::new(atom.clone());
        let (renders, host) = render_counter();
        binding.activate(host);
        assert_eq!(atom.subscriber_count(), 1);

        binding.deactivate();
        assert!(!binding.is_active());
        assert_eq!(atom.subscriber_count(), 0);

        atom.set(3);
        assert_eq!(renders.load(Ordering::SeqCst), 0);
        assert_eq!(binding.current(), 1);
    }

    #[test]
    fn reactivation_keeps_one_subscription() {
        let atom = Atom::new(1);
        let binding = StoreBinding::new(atom.clone());
        let (_, first) = render_counter();
        let (renders, second) = render_counter();

        binding.activate(first);
        binding.activate(second);
        assert_eq!(atom.subscriber_count(), 1);

        atom.set(2);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_binding_unsubscribes() {
        let atom = Atom::new(1);
        let binding = StoreBinding::new(atom.clone());
        let (_, host) = render_counter();
        binding.activate(host);

        drop(binding);
        assert_eq!(atom.subscriber_count(), 0);
    }
}
