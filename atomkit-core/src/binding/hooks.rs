//! Hook-style helpers pairing an atom with a store binding.

use crate::atom::{Atom, Update};

use super::external::StoreBinding;

/// Write handle to an atom, handed out next to a read binding.
pub struct Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    atom: Atom<T>,
}

impl<T> Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn set(&self, value: T) {
        self.atom.set(value);
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.atom.update(f);
    }

    pub fn apply(&self, update: Update<T>) {
        self.atom.apply(update);
    }
}

impl<T> Clone for Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            atom: self.atom.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Setter<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setter").field("atom", &self.atom.id()).finish()
    }
}

/// Read-only binding to an atom.
pub fn use_atom_value<T>(atom: &Atom<T>) -> StoreBinding<Atom<T>>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    StoreBinding::new(atom.clone())
}

/// Read binding plus setter for an atom.
pub fn use_atom<T>(atom: &Atom<T>) -> (StoreBinding<Atom<T>>, Setter<T>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let setter = Setter { atom: atom.clone() };
    (use_atom_value(atom), setter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn use_atom_reads_and_writes() {
        let count = Atom::new(1);
        let (value, set_count) = use_atom(&count);
        let renders = Arc::new(AtomicUsize::new(0));
        let renders_clone = renders.clone();
        value.activate(move || {
            renders_clone.fetch_add(1, Ordering::SeqCst);
        });

        set_count.update(|prev| prev + 1);

        assert_eq!(count.get(), 2);
        assert_eq!(value.current(), 2);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn use_atom_value_tracks_derived_atoms() {
        let base = Atom::new(2);
        let source = base.clone();
        let squared: Atom<i32> = Atom::derived(move |t| {
            let v = t.get(&source);
            v * v
        });
        let value = use_atom_value(&squared);
        value.activate(|| {});

        base.set(3);
        assert_eq!(value.current(), 9);
    }

    #[test]
    fn setter_clones_write_same_atom() {
        let atom = Atom::new(0);
        let (_, setter) = use_atom(&atom);
        let other = setter.clone();

        setter.set(4);
        other.apply(Update::updater(|v: &i32| v * 2));
        assert_eq!(atom.get(), 8);
    }
}
