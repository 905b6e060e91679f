//! Atom Implementation
//!
//! An Atom is a unit of observable state. It holds a value, a rule for
//! computing that value, the callbacks subscribed to it and the upstream
//! atoms it follows.
//!
//! # How Atoms Work
//!
//! 1. A constant atom publishes whatever value it holds. `set` replaces the
//!    value and publishes it.
//!
//! 2. A derived atom runs its derivation with a [`Tracker`]. Every upstream
//!    atom read through the tracker is followed from then on.
//!
//! 3. When a followed upstream atom publishes a value different from the one
//!    last seen on that edge, the derived atom recomputes.
//!
//! 4. A recomputation that resolves synchronously is applied on the spot.
//!    One that returns a future is awaited on a tokio task and applied when
//!    it completes, subject to the atom's [`StaleResults`](super::StaleResults) policy.
//!
//! 5. Applying a value stores it and calls every subscriber once, in
//!    subscription order.
//!
//! # Thread Safety
//!
//! Atoms are `Send + Sync`. State lives behind `parking_lot` locks, and no
//! lock is held while a derivation or a subscriber callback runs.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use super::config::{AtomConfig, UpstreamPolicy};
use super::context::{Edges, Tracker, Trigger};
use super::rule::{self, Derivation, Derived, Rule, Update};
use super::runtime::{self, Generations, InFlight};
use super::subscriber::{AtomId, Callback, SubscriberSet, Subscription};

/// Shared state behind every clone of an atom.
struct AtomInner<T> {
    id: AtomId,
    config: AtomConfig,
    derivation: Option<Derivation<T>>,
    value: RwLock<T>,
    subscribers: Arc<SubscriberSet<T>>,
    upstream: Edges,
    trigger: Trigger,
    generations: Mutex<Generations>,
    in_flight: Arc<InFlight>,
}

/// A reactive state container holding a value of type `T`.
///
/// # Type Parameters
///
/// - `T`: The type of value stored in the atom. Must be Clone + PartialEq +
///   Send + Sync. The PartialEq bound lets downstream atoms skip
///   recomputation when an upstream value did not actually change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Atom::new(1);
///
/// let source = count.clone();
/// let next: Atom<i32> = Atom::derived(move |t| t.get(&source) + 1);
/// assert_eq!(next.get(), 2);
///
/// count.set(5);
/// assert_eq!(next.get(), 6);
/// ```
pub struct Atom<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<AtomInner<T>>,
}

impl<T> Atom<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an atom holding a constant value.
    pub fn new(value: T) -> Self {
        Self::build(value, None, AtomConfig::default())
    }

    /// Create a constant atom with an explicit configuration.
    pub fn with_config(value: T, config: AtomConfig) -> Self {
        Self::build(value, None, config)
    }

    /// Create a derived atom, using `T::default()` until the first
    /// derivation resolves.
    pub fn derived<F, D>(derive: F) -> Self
    where
        T: Default,
        F: Fn(&Tracker) -> D + Send + Sync + 'static,
        D: Into<Derived<T>> + 'static,
    {
        Self::from_rule(Rule::derive(derive), AtomConfig::default())
    }

    /// Create a derived atom that shows `placeholder` until the first
    /// derivation resolves.
    pub fn derived_or<F, D>(placeholder: T, derive: F) -> Self
    where
        F: Fn(&Tracker) -> D + Send + Sync + 'static,
        D: Into<Derived<T>> + 'static,
    {
        Self::derived_with_config(placeholder, derive, AtomConfig::default())
    }

    /// Create a derived atom with an explicit configuration.
    pub fn derived_with_config<F, D>(placeholder: T, derive: F, config: AtomConfig) -> Self
    where
        F: Fn(&Tracker) -> D + Send + Sync + 'static,
        D: Into<Derived<T>> + 'static,
    {
        Self::build(placeholder, Some(rule::derivation(derive)), config)
    }

    /// Create an atom from a tagged rule.
    ///
    /// Derived atoms start out holding `T::default()`.
    pub fn from_rule(rule: Rule<T>, config: AtomConfig) -> Self
    where
        T: Default,
    {
        match rule {
            Rule::Constant(value) => Self::build(value, None, config),
            Rule::Derivation(derivation) => Self::build(T::default(), Some(derivation), config),
        }
    }

    fn build(initial: T, derivation: Option<Derivation<T>>, config: AtomConfig) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<AtomInner<T>>| {
            let weak = weak.clone();
            let trigger: Trigger = Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Atom { inner }.recompute();
                }
            });

            AtomInner {
                id: AtomId::new(),
                config,
                derivation,
                value: RwLock::new(initial),
                subscribers: Arc::new(SubscriberSet::new()),
                upstream: Arc::new(Mutex::new(IndexMap::new())),
                trigger,
                generations: Mutex::new(Generations::new()),
                in_flight: InFlight::new(),
            }
        });

        let atom = Self { inner };
        tracing::trace!(
            atom = %atom.inner.id,
            label = atom.label(),
            derived = atom.is_derived(),
            "created atom"
        );
        atom.recompute();
        atom
    }

    /// Get the atom's unique ID.
    pub fn id(&self) -> AtomId {
        self.inner.id
    }

    /// Get the configuration the atom was created with.
    pub fn config(&self) -> &AtomConfig {
        &self.inner.config
    }

    /// Whether the atom computes its value from other atoms.
    pub fn is_derived(&self) -> bool {
        self.inner.derivation.is_some()
    }

    /// Get the last resolved value. Never triggers a computation.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Replace the value, then recompute.
    ///
    /// For a derived atom the recomputation runs the derivation again, so
    /// the value set here can be overwritten right away.
    pub fn set(&self, value: T) {
        self.apply(Update::Value(value));
    }

    /// Compute the next value from the current one, then recompute.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.apply(Update::updater(f));
    }

    /// Apply a tagged update, then recompute.
    ///
    /// The updater runs under the value's write lock, so concurrent updates
    /// never lose each other's writes. It must not read this atom.
    pub fn apply(&self, update: Update<T>) {
        {
            let mut value = self.inner.value.write();
            let next = update.resolve(&value);
            *value = next;
        }
        self.recompute();
    }

    /// Register a callback for every applied recomputation.
    ///
    /// Subscribing the same `Arc` twice keeps a single registration.
    pub fn subscribe(&self, callback: Callback<T>) -> Subscription {
        let key = self.inner.subscribers.insert(callback);
        self.inner.subscribers.subscription(key)
    }

    /// Get the number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Get the number of upstream atoms this atom follows.
    pub fn upstream_count(&self) -> usize {
        self.inner.upstream.lock().len()
    }

    /// Get the generation of the most recently started recomputation.
    pub fn generation(&self) -> u64 {
        self.inner.generations.lock().started()
    }

    /// Wait until no asynchronous recomputation of this atom is running.
    pub async fn settled(&self) {
        self.inner.in_flight.wait_idle().await;
    }

    fn label(&self) -> &str {
        self.inner.config.label.as_deref().unwrap_or("")
    }

    /// Run one recomputation.
    fn recompute(&self) {
        let generation = self.inner.generations.lock().begin();
        tracing::trace!(atom = %self.inner.id, label = self.label(), generation, "recomputing");

        let next = match &self.inner.derivation {
            Some(derivation) => self.derive(derivation),
            None => return self.commit(generation, None),
        };

        match next {
            Derived::Ready(value) => self.commit(generation, Some(value)),
            Derived::Pending(future) => {
                let guard = self.inner.in_flight.enter();
                let atom = self.clone();
                let task = async move {
                    let _guard = guard;
                    match future.await {
                        Ok(value) => atom.commit(generation, Some(value)),
                        Err(err) => tracing::error!(
                            atom = %atom.inner.id,
                            label = atom.label(),
                            generation,
                            error = %err,
                            "derivation failed"
                        ),
                    }
                };

                if let Err(err) = runtime::spawn(task) {
                    tracing::error!(
                        atom = %self.inner.id,
                        label = self.label(),
                        generation,
                        error = %err,
                        "cannot resolve pending derivation"
                    );
                }
            }
        }
    }

    /// Invoke the derivation with a fresh tracker.
    fn derive(&self, derivation: &Derivation<T>) -> Derived<T> {
        let tracker = Tracker::new(
            self.inner.id,
            Arc::clone(&self.inner.upstream),
            Arc::clone(&self.inner.trigger),
        );

        let next = derivation(&tracker);

        if self.inner.config.upstream == UpstreamPolicy::Prune {
            tracker.prune_untouched();
        }
        next
    }

    /// Store a finished recomputation's value and notify subscribers.
    ///
    /// `None` publishes the value already held, which is how a constant atom
    /// recomputes. Subscribers always receive the value current at the time
    /// they are called.
    fn commit(&self, generation: u64, value: Option<T>) {
        let policy = self.inner.config.stale_results;
        let admitted = self.inner.generations.lock().admit(generation, policy);
        if !admitted {
            tracing::debug!(
                atom = %self.inner.id,
                label = self.label(),
                generation,
                "discarding stale recomputation"
            );
            return;
        }

        if let Some(value) = value {
            *self.inner.value.write() = value;
        }
        self.inner.subscribers.notify(|| self.get());
    }
}

impl<T> Clone for Atom<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Atom<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Atoms compare by identity, not by value.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for Atom<T> where T: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Debug for Atom<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.inner.id)
            .field("label", &self.inner.config.label)
            .field("value", &self.get())
            .field("derived", &self.is_derived())
            .field("subscriber_count", &self.subscriber_count())
            .field("upstream_count", &self.upstream_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
