//! Atoms
//!
//! This module implements the atom: a unit of observable, independently
//! subscribable state that can be derived from other atoms.
//!
//! # Concepts
//!
//! ## Constant atoms
//!
//! A constant atom holds a value. `set` replaces it and every subscriber
//! hears about the new value.
//!
//! ## Derived atoms
//!
//! A derived atom computes its value with a derivation function. The
//! derivation reads other atoms through a [`Tracker`], which subscribes the
//! derived atom to each upstream atom the first time it is read. Whenever a
//! followed atom publishes a different value, the derived atom recomputes and
//! publishes its own result.
//!
//! A derivation may return a future instead of a value. The future is driven
//! on the tokio runtime and its result applied when it completes.
//!
//! # Implementation Notes
//!
//! Dependency tracking goes through an explicit tracker value created for
//! each recomputation rather than an ambient context. Recomputations carry
//! generation numbers so results that finish out of order can be detected.

mod config;
mod context;
mod error;
mod rule;
mod runtime;
mod store;
mod subscriber;

pub use config::{AtomConfig, StaleResults, UpstreamPolicy};
pub use context::Tracker;
pub use error::{AtomError, BoxError, Result};
pub use rule::{Derivation, Derived, Rule, Update};
pub use store::Atom;
pub use subscriber::{AtomId, Callback, Subscription};
