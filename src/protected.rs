use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::value::{Fields, Value};

/// Mutable field bag shared by every descriptor and instance of one lineage.
///
/// It is created with the lineage root and handed by reference to every factory of
/// every descendant, so a value stored by one instance is visible to all others of the
/// lineage. It is class-level state, never per-instance.
#[derive(Clone, Default)]
pub struct ProtectedState(Arc<Mutex<Fields>>);

impl ProtectedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) -> Option<Value> {
        self.0.lock().insert(name, Arc::new(value))
    }

    pub fn set_value(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.lock().insert(name, value)
    }

    /// Returns the value stored under `name` as a shared handle of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.0.lock().get_arc(name)
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.0.lock().value(name).cloned()
    }

    /// Inserts the value produced by `init` unless `name` is already set, and returns
    /// the stored value.
    pub fn get_or_insert_with<T, F>(&self, name: &str, init: F) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut fields = self.0.lock();
        if !fields.contains(name) {
            fields.insert(name, Arc::new(init()));
        }
        fields.get_arc(name)
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.0.lock().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.lock().contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Runs `f` with the bag locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Fields) -> R) -> R {
        f(&mut self.0.lock())
    }

    /// Whether both handles point at the same bag.
    pub fn ptr_eq(&self, other: &ProtectedState) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ProtectedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProtectedState").field(&*self.0.lock()).finish()
    }
}
