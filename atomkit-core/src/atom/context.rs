//! Tracking Context
//!
//! A [`Tracker`] is handed to a derivation every time it runs. Reading an
//! upstream atom through the tracker returns that atom's current value and,
//! the first time a given upstream atom is read, subscribes the derived atom
//! to it.
//!
//! # Implementation
//!
//! The tracker is an explicit value built for a single recomputation. It
//! holds the derived atom's edge map (upstream ID to subscription) and the
//! trigger that schedules the derived atom's next recomputation. Nothing is
//! stored in thread-local or global state, so atoms stay independent of one
//! another and of the thread they run on.
//!
//! Each edge keeps its own cache of the upstream value, seeded when the edge
//! is created. A notification carrying a value equal to that cache is
//! dropped; anything else refreshes the cache and fires the trigger.

use std::cell::RefCell;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::store::Atom;
use super::subscriber::{AtomId, Subscription};

/// Starts a recomputation of the atom that owns it.
pub(crate) type Trigger = Arc<dyn Fn() + Send + Sync>;

/// Upstream subscriptions of a derived atom, keyed by upstream atom.
pub(crate) type Edges = Arc<Mutex<IndexMap<AtomId, Subscription>>>;

/// Tracking accessor passed to a derivation.
pub struct Tracker {
    owner: AtomId,
    edges: Edges,
    trigger: Trigger,
    /// Upstream atoms read during this recomputation, in read order.
    touched: RefCell<SmallVec<[AtomId; 4]>>,
}

impl Tracker {
    pub(crate) fn new(owner: AtomId, edges: Edges, trigger: Trigger) -> Self {
        Self {
            owner,
            edges,
            trigger,
            touched: RefCell::new(SmallVec::new()),
        }
    }

    /// ID of the atom being recomputed.
    pub fn owner(&self) -> AtomId {
        self.owner
    }

    /// Read an upstream atom's value and follow it on first use.
    pub fn get<U>(&self, upstream: &Atom<U>) -> U
    where
        U: Clone + PartialEq + Send + Sync + 'static,
    {
        let current = upstream.get();
        let upstream_id = upstream.id();

        {
            let mut touched = self.touched.borrow_mut();
            if !touched.contains(&upstream_id) {
                touched.push(upstream_id);
            }
        }

        let already_tracked = self.edges.lock().contains_key(&upstream_id);
        if already_tracked {
            return current;
        }

        let cached = Mutex::new(current.clone());
        let trigger = Arc::clone(&self.trigger);
        let subscription = upstream.subscribe(Arc::new(move |next: &U| {
            {
                let mut edge_value = cached.lock();
                if *edge_value == *next {
                    return;
                }
                *edge_value = next.clone();
            }
            trigger();
        }));

        tracing::trace!(atom = %self.owner, upstream = %upstream_id, "tracking upstream atom");
        self.edges
            .lock()
            .entry(upstream_id)
            .or_insert(subscription);

        current
    }

    /// Number of distinct upstream atoms read so far in this recomputation.
    pub fn tracked_count(&self) -> usize {
        self.touched.borrow().len()
    }

    /// Drop every edge that this recomputation did not read.
    ///
    /// Returns the number of edges removed. The subscriptions are released
    /// after the edge lock is dropped.
    pub(crate) fn prune_untouched(self) -> usize {
        let touched = self.touched.into_inner();
        let stale: Vec<Subscription> = {
            let mut edges = self.edges.lock();
            let stale_ids: SmallVec<[AtomId; 4]> = edges
                .keys()
                .filter(|id| !touched.contains(*id))
                .copied()
                .collect();
            stale_ids
                .iter()
                .filter_map(|id| edges.shift_remove(id))
                .collect()
        };

        if !stale.is_empty() {
            tracing::debug!(atom = %self.owner, pruned = stale.len(), "dropping stale upstream atoms");
        }
        stale.len()
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("owner", &self.owner)
            .field("tracked", &self.tracked_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
