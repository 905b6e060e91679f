//! Recomputation Runtime
//!
//! Bookkeeping shared by every recomputation of one atom:
//!
//! 1. Each recomputation takes a generation number when it starts.
//!
//! 2. When it finishes, [`Generations::admit`] decides whether its result
//!    may still be applied. Under [`StaleResults::Discard`] a result older
//!    than the last applied one is dropped; under [`StaleResults::Apply`]
//!    the last result to finish wins.
//!
//! 3. Recomputations that resolve asynchronously run as tokio tasks and are
//!    counted in [`InFlight`] so callers can wait for an atom to settle.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Notify;

use super::config::StaleResults;
use super::error::{AtomError, Result};

/// Generation counters for one atom.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Generations {
    /// Highest generation handed out.
    started: u64,
    /// Highest generation whose result was applied.
    applied: u64,
}

impl Generations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stamp a new recomputation.
    pub(crate) fn begin(&mut self) -> u64 {
        self.started += 1;
        self.started
    }

    /// Decide whether the result of `generation` may be applied, and record it.
    pub(crate) fn admit(&mut self, generation: u64, policy: StaleResults) -> bool {
        if policy == StaleResults::Discard && generation <= self.applied {
            return false;
        }
        self.applied = self.applied.max(generation);
        true
    }

    pub(crate) fn started(&self) -> u64 {
        self.started
    }
}

/// Counts asynchronous recomputations that have not finished yet.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register one in-flight recomputation. Dropping the guard finishes it.
    pub(crate) fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            in_flight: Arc::clone(self),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until nothing is in flight.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let idle = self.idle.notified();
            if self.count() == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// Marks one recomputation as in flight for as long as it lives.
///
/// The guard is moved into the recomputation task, so the count drops even
/// when the derivation future fails or panics.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.in_flight.idle.notify_waiters();
        }
    }
}

/// Run a recomputation task on the ambient tokio runtime.
pub(crate) fn spawn<F>(task: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = Handle::try_current().map_err(|_| AtomError::NoRuntime)?;
    handle.spawn(task);
    Ok(())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
