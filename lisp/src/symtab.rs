use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use crate::value::Value;

/// Local scopes of the evaluator, one frame per active call or `let`. The
/// interpreter's global frame is a chain of its own that lookups fall back to.
pub type Env = Symtab<Value>;

struct Frame<T> {
    store: BTreeMap<String, T>,
    parent: Option<Symtab<T>>,
}

/// A symbol table that can be forked in constant time. A fork shadows its
/// parent without copying it; the parent stays shared, so later changes to it
/// are seen through every fork.
pub struct Symtab<T> {
    frame: Rc<RefCell<Frame<T>>>,
}

impl<T> Clone for Symtab<T> {
    fn clone(&self) -> Self {
        Symtab {
            frame: Rc::clone(&self.frame),
        }
    }
}

impl<T> Default for Symtab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Symtab<T> {
    pub fn new() -> Self {
        Symtab {
            frame: Rc::new(RefCell::new(Frame {
                store: BTreeMap::new(),
                parent: None,
            })),
        }
    }

    /// A new, empty scope whose lookups fall back to `self`.
    pub fn fork(&self) -> Self {
        Symtab {
            frame: Rc::new(RefCell::new(Frame {
                store: BTreeMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    pub fn parent(&self) -> Option<Self> {
        self.frame.borrow().parent.clone()
    }

    /// Check if current scope is top level.
    pub fn is_root(&self) -> bool {
        self.frame.borrow().parent.is_none()
    }

    /// Number of scopes between this one and the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self.clone();
        while let Some(parent) = scope.parent() {
            depth += 1;
            scope = parent;
        }
        depth
    }

    /// Whether both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }

    /// Inserts a key-value pair into the current scope, returning the value it
    /// replaced there, if any. Parent scopes are never touched.
    pub fn insert(&self, key: impl Into<String>, value: T) -> Option<T> {
        self.frame.borrow_mut().store.insert(key.into(), value)
    }

    /// Overwrite the nearest existing binding of `key`, searching from this
    /// scope towards the root. Gives the value back if no scope binds `key`.
    pub fn assign(&self, key: &str, value: T) -> Result<(), T> {
        let mut frame = self.frame.borrow_mut();
        if let Some(slot) = frame.store.get_mut(key) {
            *slot = value;
            return Ok(());
        }
        match &frame.parent {
            Some(parent) => parent.assign(key, value),
            None => Err(value),
        }
    }

    /// Check if a key is present in current scope or any parent scope.
    pub fn contains_key(&self, key: &str) -> bool {
        let frame = self.frame.borrow();
        frame.store.contains_key(key) || frame.parent.as_ref().map_or(false, |p| p.contains_key(key))
    }

    /// Check if a key is present in current scope only.
    pub fn contains_local(&self, key: &str) -> bool {
        self.frame.borrow().store.contains_key(key)
    }

    pub fn local_keys(&self) -> Vec<String> {
        self.frame.borrow().store.keys().cloned().collect()
    }
}

impl<T: Clone> Symtab<T> {
    /// Get the value associated with the given key. If the key is not present
    /// in the current scope, the parent scope is searched.
    pub fn get(&self, key: &str) -> Option<T> {
        let frame = self.frame.borrow();
        match frame.store.get(key) {
            Some(value) => Some(value.clone()),
            None => frame.parent.as_ref().and_then(|p| p.get(key)),
        }
    }

    /// Copy every binding visible from this scope into one fresh root scope.
    /// The copy no longer sees later changes to the scopes it was taken from,
    /// and writes to it are seen by nobody else.
    pub fn snapshot(&self) -> Self {
        let mut chain = vec![self.clone()];
        let mut scope = self.clone();
        while let Some(parent) = scope.parent() {
            chain.push(parent.clone());
            scope = parent;
        }
        let snapshot = Symtab::new();
        for outer_to_inner in chain.iter().rev() {
            for (key, value) in outer_to_inner.frame.borrow().store.iter() {
                snapshot.insert(key.clone(), value.clone());
            }
        }
        snapshot
    }
}

// Values may hold the scope they live in, so only this scope's keys are shown.
impl<T> Debug for Symtab<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Symtab")
            .field("depth", &self.depth())
            .field("keys", &self.local_keys())
            .finish()
    }
}
