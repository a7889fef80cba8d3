//! Type-erased field values, field maps and argument lists.

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ClassError, Result};

/// A type-erased, shareable value stored in fields, arguments and protected state.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wraps any thread-safe value into a [`Value`].
pub fn value<T: Any + Send + Sync>(inner: T) -> Value {
    Arc::new(inner)
}

/// Named fields declared by factories.
#[derive(Clone, Default)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the field downcast to `T`, or `None` if it is missing or of another type.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.0.get(name)?.downcast_ref::<T>()
    }

    /// Like [`Fields::get`], but tells a missing field apart from a type mismatch.
    pub fn try_get<T: Any>(&self, name: &str) -> Result<&T> {
        let value = self.0.get(name).ok_or_else(|| ClassError::FieldNotFound {
            field: name.to_string(),
        })?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| ClassError::FieldTypeMismatch {
                field: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Returns the field as a shared handle of type `T`.
    pub fn get_arc<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.0.get(name)?.clone().downcast::<T>().ok()
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Positional arguments handed to factories and initializers.
///
/// Ancestor levels always receive an empty list; only the leaf level sees the
/// caller's arguments.
#[derive(Clone, Default)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument, builder style.
    pub fn with<T: Any + Send + Sync>(mut self, arg: T) -> Self {
        self.0.push(Arc::new(arg));
        self
    }

    pub fn push(&mut self, arg: Value) {
        self.0.push(arg);
    }

    /// Returns the argument at `index` downcast to `T`.
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.0.get(index)?.downcast_ref::<T>()
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args").field("len", &self.0.len()).finish()
    }
}
