//! Store Bindings
//!
//! This module adapts atoms (and any other subscribable store) to a host UI
//! framework's render lifecycle.
//!
//! The host creates a [`StoreBinding`] when a component first renders, calls
//! [`StoreBinding::activate`] once the component is mounted and
//! [`StoreBinding::deactivate`] when it is unmounted. In between, the binding
//! asks the host to render again whenever the store's snapshot changes.
//!
//! [`use_atom`] and [`use_atom_value`] are the atom-flavored entry points.
//! Callers are expected to keep the same binding across renders; creating a
//! fresh one per render resubscribes every time.

mod external;
mod hooks;

pub use external::{ChangeCallback, ExternalStore, Host, StoreBinding};
pub use hooks::{use_atom, use_atom_value, Setter};
