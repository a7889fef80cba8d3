//! Constructed objects and the parent snapshots they carry.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::{DescriptorId, Factory};
use crate::error::Result;
use crate::value::{Args, Fields, Value};

/// Setup logic run once, after the leaf factory, with the caller's arguments.
pub type Initializer = Arc<dyn Fn(&mut Instance, &Args) + Send + Sync>;

/// An object produced by a descriptor.
///
/// Every level of the inheritance chain declares its fields on the same instance. Once
/// construction finishes the instance is handed out as an `Arc<Instance>`; fields that
/// must change afterwards should hold their own interior mutability.
pub struct Instance {
    fields: Fields,
    init: Option<Initializer>,
    parent: Option<Arc<ParentView>>,
    constructor: Factory,
    lineage: Vec<DescriptorId>,
}

impl Instance {
    pub(crate) fn blank(constructor: Factory, lineage: Vec<DescriptorId>) -> Self {
        Self {
            fields: Fields::new(),
            init: None,
            parent: None,
            constructor,
            lineage,
        }
    }

    /// Declares (or overwrites) a field.
    pub fn set<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> &mut Self {
        self.fields.insert(name, Arc::new(value));
        self
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(name, value);
        self
    }

    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.fields.get(name)
    }

    pub fn try_get<T: Any>(&self, name: &str) -> Result<&T> {
        self.fields.try_get(name)
    }

    pub fn get_arc<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.fields.get_arc(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.value(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Installs the initializer for this level. Only the leaf level's initializer runs.
    pub fn set_init(&mut self, init: impl Fn(&mut Instance, &Args) + Send + Sync + 'static) {
        self.init = Some(Arc::new(init));
    }

    pub fn has_init(&self) -> bool {
        self.init.is_some()
    }

    /// Runs the instance's initializer again, if any. Returns whether one ran.
    pub fn call_init(&mut self, args: &Args) -> bool {
        match self.init.clone() {
            Some(init) => {
                init(self, args);
                true
            }
            None => false,
        }
    }

    pub(crate) fn discard_init(&mut self) {
        self.init = None;
    }

    /// State of the instance as it was when the parent level finished.
    pub fn parent(&self) -> Option<&ParentView> {
        self.parent.as_deref()
    }

    /// Runs the parent level's initializer against this instance ("super" call).
    /// Returns whether one ran.
    pub fn call_parent_init(&mut self, args: &Args) -> bool {
        match self.parent.clone() {
            Some(view) => view.call_init(self, args),
            None => false,
        }
    }

    pub(crate) fn capture_parent(&mut self) {
        let view = ParentView {
            fields: self.fields.clone(),
            init: self.init.clone(),
            parent: self.parent.take(),
        };
        self.parent = Some(Arc::new(view));
    }

    /// The leaf factory that produced this instance.
    pub fn constructor(&self) -> &Factory {
        &self.constructor
    }

    pub(crate) fn lineage(&self) -> &[DescriptorId] {
        &self.lineage
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("constructor", &self.constructor.name())
            .field("fields", &self.fields)
            .field("has_init", &self.init.is_some())
            .field("parent", &self.parent)
            .finish()
    }
}

/// Snapshot of an instance taken right after its parent level finished initializing.
///
/// Views chain: the parent view of a three-level instance exposes the grandparent
/// view through [`ParentView::parent`].
pub struct ParentView {
    fields: Fields,
    init: Option<Initializer>,
    parent: Option<Arc<ParentView>>,
}

impl ParentView {
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.fields.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.value(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn has_init(&self) -> bool {
        self.init.is_some()
    }

    /// Runs the parent level's initializer against `instance`. Returns whether one ran.
    pub fn call_init(&self, instance: &mut Instance, args: &Args) -> bool {
        match &self.init {
            Some(init) => {
                init(instance, args);
                true
            }
            None => false,
        }
    }

    pub fn parent(&self) -> Option<&ParentView> {
        self.parent.as_deref()
    }
}

impl fmt::Debug for ParentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentView")
            .field("fields", &self.fields)
            .field("has_init", &self.init.is_some())
            .field("parent", &self.parent)
            .finish()
    }
}
