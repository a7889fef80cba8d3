//! Class descriptors and the builder producing them.

use std::any::type_name;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::construction::{self, Invocation};
use crate::error::{ClassError, Result};
use crate::event::RegistryEvent;
use crate::instance::Instance;
use crate::protected::ProtectedState;
use crate::runtime::{Runtime, WeakRuntime};
use crate::value::{Args, Value};

/// Process-unique identity of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorId(u64);

impl DescriptorId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Body = dyn Fn(&mut Instance, &ProtectedState, &Args) + Send + Sync;

/// The field-declaring function of one class level.
///
/// A factory receives the instance under construction, the lineage's protected state
/// and the caller's arguments (always empty when it runs as an ancestor level).
#[derive(Clone)]
pub struct Factory {
    body: Arc<Body>,
    name: &'static str,
}

impl Factory {
    /// Wraps `body`, naming it after its type.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut Instance, &ProtectedState, &Args) + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
            name: type_name::<F>(),
        }
    }

    pub fn named<F>(name: &'static str, body: F) -> Self
    where
        F: Fn(&mut Instance, &ProtectedState, &Args) + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ptr_eq(&self, other: &Factory) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }

    pub(crate) fn call(&self, instance: &mut Instance, protected: &ProtectedState, args: &Args) {
        (self.body)(instance, protected, args)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Factory").field(&self.name).finish()
    }
}

/// A value that may or may not hold a [`Factory`].
///
/// Defining or extending a class from something that is not callable fails with
/// [`ClassError::Argument`].
pub trait IntoFactory {
    fn into_factory(self) -> Option<Factory>;
}

impl IntoFactory for Factory {
    fn into_factory(self) -> Option<Factory> {
        Some(self)
    }
}

impl IntoFactory for Option<Factory> {
    fn into_factory(self) -> Option<Factory> {
        self
    }
}

impl IntoFactory for Value {
    fn into_factory(self) -> Option<Factory> {
        self.downcast::<Factory>().ok().map(|factory| (*factory).clone())
    }
}

impl IntoFactory for &Value {
    fn into_factory(self) -> Option<Factory> {
        self.downcast_ref::<Factory>().cloned()
    }
}

/// Identity of a class or singleton class.
///
/// Cloning a descriptor clones a handle; all clones share the same identity.
#[derive(Clone)]
pub struct Descriptor {
    inner: Arc<DescriptorInner>,
}

struct DescriptorInner {
    id: DescriptorId,
    factory: Factory,
    parent: Option<Descriptor>,
    singleton: bool,
    runtime: WeakRuntime,
    protected: ProtectedState,
    /// This descriptor first, then its ancestors up to the lineage root.
    lineage: Vec<DescriptorId>,
    /// Held across a whole construction level.
    serial: ReentrantMutex<()>,
    building: AtomicBool,
    /// Keeps the singleton instance alive; the registry only tracks it.
    owned: Mutex<Option<Arc<Instance>>>,
}

/// Builds a descriptor below `parent` (or a lineage root) and registers it.
pub(crate) fn build(
    runtime: &Runtime,
    parent: Option<&Descriptor>,
    factory: Option<Factory>,
    singleton: bool,
    context: &'static str,
) -> Result<Descriptor> {
    runtime.ensure_active()?;
    let factory = factory.ok_or(ClassError::Argument { context })?;
    if singleton && !runtime.trace_mode().allows_singletons() {
        return Err(ClassError::Configuration {
            reason: "singleton not allowed by configuration settings",
        });
    }

    let id = DescriptorId::next();
    let (protected, mut lineage) = match parent {
        Some(parent) => (
            parent.inner.protected.clone(),
            parent.inner.lineage.clone(),
        ),
        None => (ProtectedState::new(), Vec::new()),
    };
    lineage.insert(0, id);

    let descriptor = Descriptor {
        inner: Arc::new(DescriptorInner {
            id,
            factory,
            parent: parent.cloned(),
            singleton,
            runtime: runtime.downgrade(),
            protected,
            lineage,
            serial: ReentrantMutex::new(()),
            building: AtomicBool::new(false),
            owned: Mutex::new(None),
        }),
    };

    if runtime.tracks(singleton) {
        runtime.registry().trace(&descriptor, None);
    }

    tracing::debug!(
        class = descriptor.name(),
        id = %id,
        parent = ?parent.map(Descriptor::id),
        singleton,
        "defined descriptor"
    );
    runtime.registry().emit(&RegistryEvent::Define {
        class: descriptor.name(),
        singleton,
    });

    Ok(descriptor)
}

impl Descriptor {
    pub fn id(&self) -> DescriptorId {
        self.inner.id
    }

    /// Name of the descriptor's own factory.
    pub fn name(&self) -> &'static str {
        self.inner.factory.name()
    }

    pub fn factory(&self) -> &Factory {
        &self.inner.factory
    }

    /// The descriptor this one extends, `None` for a lineage root.
    pub fn parent(&self) -> Option<&Descriptor> {
        self.inner.parent.as_ref()
    }

    /// The runtime that built this descriptor, while it is alive.
    pub fn runtime(&self) -> Result<Runtime> {
        self.inner.runtime.upgrade().ok_or(ClassError::RuntimeShutdown)
    }

    pub fn is_singleton(&self) -> bool {
        self.inner.singleton
    }

    pub fn is_registered(&self) -> bool {
        self.runtime()
            .is_ok_and(|runtime| runtime.registry().contains(self))
    }

    /// Whether `instance` was produced by this descriptor or one of its subclasses.
    pub fn is_instance(&self, instance: &Instance) -> bool {
        instance.lineage().contains(&self.inner.id)
    }

    /// Defines a subclass. Subclasses of singletons are singletons.
    pub fn extend<F>(&self, factory: F) -> Result<Descriptor>
    where
        F: Fn(&mut Instance, &ProtectedState, &Args) + Send + Sync + 'static,
    {
        self.extend_with(Factory::new(factory))
    }

    /// Defines a subclass from a value that should hold a factory.
    pub fn extend_with(&self, factory: impl IntoFactory) -> Result<Descriptor> {
        build(
            &self.runtime()?,
            Some(self),
            factory.into_factory(),
            self.inner.singleton,
            "extend",
        )
    }

    /// Builds an instance through the normal path. Singletons refuse it.
    pub fn new_instance(&self, args: Args) -> Result<Arc<Instance>> {
        construction::produce(self, Invocation::Normal, &args)
    }

    /// Builds an instance reflectively. Only plain classes allow it.
    pub fn construct(&self, args: Args) -> Result<Arc<Instance>> {
        if self.inner.singleton {
            return Err(ClassError::IllegalConstruction {
                class: self.name(),
                reason: "singletons are only available through get_instance",
            });
        }
        construction::produce(self, Invocation::Reflective, &args)
    }

    /// Returns the singleton instance, building it on first use.
    pub fn get_instance(&self) -> Result<Arc<Instance>> {
        if !self.inner.singleton {
            return Err(ClassError::IllegalConstruction {
                class: self.name(),
                reason: "get_instance is only available on singletons",
            });
        }
        let runtime = self.runtime()?;
        runtime.ensure_active()?;

        let _serial = self.inner.serial.lock();
        // Singletons are always traced (`build` refuses them when tracing is
        // disabled), so the registry slot is the memo.
        if let Some(existing) = runtime.registry().first_instance(self) {
            return Ok(existing);
        }

        let _building = BuildingGuard::enter(&self.inner.building).ok_or(
            ClassError::IllegalConstruction {
                class: self.name(),
                reason: "singleton is already being constructed",
            },
        )?;
        let instance = construction::produce(self, Invocation::Reflective, &Args::new())?;
        *self.inner.owned.lock() = Some(instance.clone());
        Ok(instance)
    }

    /// Live instances the registry tracks for this descriptor.
    pub fn instances(&self) -> Vec<Arc<Instance>> {
        self.runtime()
            .ok()
            .and_then(|runtime| runtime.registry().instances(self))
            .unwrap_or_default()
    }

    /// Unregisters the descriptor under the runtime's policy.
    ///
    /// A singleton whose slot was cleared also lets go of its instance, so the next
    /// `get_instance` builds a fresh one.
    pub fn unregister(&self) -> bool {
        let Ok(runtime) = self.runtime() else {
            return false;
        };
        let changed = runtime.registry().unregister(self);
        if changed && self.inner.singleton {
            let released = self.inner.owned.lock().take();
            drop(released);
        }
        changed
    }

    /// This descriptor, then each ancestor up to the lineage root.
    pub(crate) fn levels(&self) -> impl Iterator<Item = &Descriptor> {
        std::iter::successors(Some(self), |level| level.parent())
    }

    pub(crate) fn protected_state(&self) -> &ProtectedState {
        &self.inner.protected
    }

    pub(crate) fn lineage(&self) -> &[DescriptorId] {
        &self.inner.lineage
    }

    pub(crate) fn serial(&self) -> &ReentrantMutex<()> {
        &self.inner.serial
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Descriptor {}

impl Hash for Descriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.inner.id)
            .field("name", &self.name())
            .field("singleton", &self.inner.singleton)
            .field("parent", &self.parent().map(Descriptor::id))
            .finish()
    }
}

/// Marks a singleton as under construction; cleared on drop.
struct BuildingGuard<'a>(&'a AtomicBool);

impl<'a> BuildingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::SeqCst)).then_some(Self(flag))
    }
}

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
