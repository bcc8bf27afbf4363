//! Identity cache and lazily computed properties.
//!
//! Every model is created through an [`Interner`]: equal keys always yield the
//! same `Rc`, so downstream code compares models by pointer. Derived
//! properties that may recurse through other models live in a [`Memo`], which
//! detects re-entrant evaluation instead of overflowing the stack.

use crate::error::{ModelError, Result};
use once_cell::unsync::OnceCell;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

/// Get-or-create table from a structural key to a shared model.
pub struct Interner<K, V> {
    table: RefCell<HashMap<K, Rc<V>>>,
}

impl<K, V> Default for Interner<K, V> {
    fn default() -> Self {
        Self {
            table: RefCell::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Interner<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the model for `key`, building it on first request.
    ///
    /// No borrow is held while `build` runs, so builders may intern other
    /// models (even through this same table). If a nested build raced us to the
    /// same key, the first stored instance wins and ours is dropped.
    pub fn get_or_create(&self, key: &K, build: impl FnOnce() -> V) -> Rc<V> {
        if let Some(existing) = self.table.borrow().get(key) {
            return Rc::clone(existing);
        }

        let value = Rc::new(build());
        let mut table = self.table.borrow_mut();
        Rc::clone(table.entry(key.clone()).or_insert(value))
    }

    pub fn get(&self, key: &K) -> Option<Rc<V>> {
        self.table.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }
}

/// Lazily computed value with explicit uninitialized / in-progress / ready
/// states.
pub struct Memo<T> {
    value: OnceCell<T>,
    in_progress: Cell<bool>,
    what: &'static str,
}

impl<T> Memo<T> {
    /// `what` names the property in re-entrancy errors
    pub fn new(what: &'static str) -> Self {
        Self {
            value: OnceCell::new(),
            in_progress: Cell::new(false),
            what,
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.get()
    }

    /// Computes the value once; forcing it again from inside `init` fails
    /// with [`ModelError::Reentrant`].
    pub fn get_or_compute(&self, init: impl FnOnce() -> T) -> Result<&T> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        if self.in_progress.replace(true) {
            return Err(ModelError::Reentrant(self.what.to_string()));
        }

        let value = init();
        self.in_progress.set(false);
        Ok(self.value.get_or_init(|| value))
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("what", &self.what)
            .field("value", &self.value.get())
            .field("in_progress", &self.in_progress.get())
            .finish()
    }
}
