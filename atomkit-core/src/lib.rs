//! Atomkit Core
//!
//! This crate provides the core runtime for the Atomkit reactive state
//! library. It implements:
//!
//! - Atoms: observable state containers, constant or derived
//! - Lazy dependency discovery between derived atoms and their upstream atoms
//! - Synchronous and asynchronous recomputation with generation tracking
//! - A subscription lifecycle object for binding stores to a host UI
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `atom`: Atoms, dependency tracking and recomputation
//! - `binding`: External store bindings and hook-style helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use atomkit_core::atom::Atom;
//! use atomkit_core::binding::use_atom_value;
//!
//! // Create an atom
//! let count = Atom::new(1);
//!
//! // Create a derived atom
//! let source = count.clone();
//! let doubled: Atom<i32> = Atom::derived(move |t| t.get(&source) * 2);
//!
//! // Bind it to a component
//! let value = use_atom_value(&doubled);
//! value.activate(|| println!("render"));
//!
//! // Update the atom
//! count.set(5);
//! // Prints "render"; value.current() is now 10
//! ```

pub mod atom;
pub mod binding;
