//! Rules, derived values and updates.
//!
//! These are the tagged variants the atom works with instead of inspecting
//! the shape of a value at runtime:
//!
//! - [`Rule`] says how an atom gets its value: a constant, or a derivation
//!   over other atoms.
//! - [`Derived`] is what a derivation returns: a value that is ready now, or
//!   a future that resolves later.
//! - [`Update`] is what a setter receives: a replacement value, or an
//!   updater applied to the previous value.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::context::Tracker;
use super::error::{AtomError, BoxError};

/// A derivation function.
pub type Derivation<T> = Arc<dyn Fn(&Tracker) -> Derived<T> + Send + Sync>;

/// Erase a derivation closure into a [`Derivation`].
pub(crate) fn derivation<T, F, D>(derive: F) -> Derivation<T>
where
    T: 'static,
    F: Fn(&Tracker) -> D + Send + Sync + 'static,
    D: Into<Derived<T>> + 'static,
{
    Arc::new(move |tracker: &Tracker| -> Derived<T> { derive(tracker).into() })
}

/// How an atom computes its value.
pub enum Rule<T> {
    /// A plain value. Recomputation republishes whatever the atom holds.
    Constant(T),

    /// A function of other atoms, read through a [`Tracker`].
    Derivation(Derivation<T>),
}

impl<T: 'static> Rule<T> {
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    /// Wrap a derivation closure.
    pub fn derive<F, D>(derive: F) -> Self
    where
        F: Fn(&Tracker) -> D + Send + Sync + 'static,
        D: Into<Derived<T>> + 'static,
    {
        Self::Derivation(derivation(derive))
    }

    pub fn is_derivation(&self) -> bool {
        matches!(self, Self::Derivation(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Derivation(_) => f.write_str("Derivation(..)"),
        }
    }
}

/// The raw result of one derivation call.
pub enum Derived<T> {
    /// Resolved synchronously.
    Ready(T),

    /// Resolves asynchronously on the tokio runtime.
    Pending(BoxFuture<'static, Result<T, AtomError>>),
}

impl<T: Send + 'static> Derived<T> {
    pub fn ready(value: T) -> Self {
        Self::Ready(value)
    }

    /// A derivation that completes later and cannot fail.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self::Pending(future.map(Ok).boxed())
    }

    /// A derivation that completes later and may fail.
    ///
    /// A failure ends the recomputation without touching the value or
    /// notifying subscribers.
    pub fn try_pending<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::Pending(
            future
                .map(|result| result.map_err(AtomError::derivation))
                .boxed(),
        )
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl<T> From<T> for Derived<T> {
    fn from(value: T) -> Self {
        Self::Ready(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// A request to change an atom's value.
pub enum Update<T> {
    /// Replace the value.
    Value(T),

    /// Compute the next value from the previous one.
    Updater(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> Update<T> {
    pub fn value(value: T) -> Self {
        Self::Value(value)
    }

    pub fn updater<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        Self::Updater(Box::new(f))
    }

    /// Produce the next value given the current one.
    pub(crate) fn resolve(self, current: &T) -> T {
        match self {
            Self::Value(value) => value,
            Self::Updater(f) => f(current),
        }
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Updater(_) => f.write_str("Updater(..)"),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
