//! The runtime service owning a registry and its configuration.
//!
//! A [`Runtime`] is the explicit home of what would otherwise be module-level global
//! state. The runtime owns its registry and, through it, every traced descriptor;
//! descriptors only keep a non-owning handle back, so dropping the last `Runtime`
//! handle frees the whole registry. Runtimes are cheap to clone and safe to share
//! across threads.
//!
//! A process-wide default runtime is available through [`global`]; it is initialized
//! lazily with [`RuntimeConfig::default`], or once with [`init_global`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use crate::config::{RuntimeConfig, TraceMode, UnregisterPolicy};
use crate::descriptor::{self, Descriptor, Factory, IntoFactory};
use crate::error::{ClassError, Result};
use crate::event::RegistryEvent;
use crate::instance::Instance;
use crate::protected::ProtectedState;
use crate::registry::Registry;
use crate::value::Args;

#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    config: RuntimeConfig,
    registry: Registry,
    active: AtomicBool,
}

impl Runtime {
    /// Starts a runtime. The configuration is fixed for its whole lifetime.
    pub fn init(config: RuntimeConfig) -> Self {
        tracing::debug!(trace = %config.trace, unregister = %config.unregister, "runtime initialized");
        Self {
            inner: Arc::new(RuntimeInner {
                config,
                registry: Registry::new(config.unregister),
                active: AtomicBool::new(true),
            }),
        }
    }

    /// Stops the runtime: the registry is emptied and every further definition or
    /// construction fails with [`ClassError::RuntimeShutdown`].
    ///
    /// Descriptors and instances already handed out stay valid as values.
    pub fn shutdown(&self) {
        if self.inner.active.swap(false, Ordering::SeqCst) {
            self.inner.registry.emit(&RegistryEvent::Shutdown {});
            self.inner.registry.clear();
            tracing::debug!("runtime shut down");
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ClassError::RuntimeShutdown)
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn trace_mode(&self) -> TraceMode {
        self.inner.config.trace
    }

    pub fn unregister_policy(&self) -> UnregisterPolicy {
        self.inner.config.unregister
    }

    /// Whether a lineage with the given singleton flag is traced by this runtime.
    pub fn tracks(&self, is_singleton: bool) -> bool {
        self.inner.config.trace.tracks(is_singleton)
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Defines a top-level class.
    pub fn define_class<F>(&self, factory: F) -> Result<Descriptor>
    where
        F: Fn(&mut Instance, &ProtectedState, &Args) + Send + Sync + 'static,
    {
        self.define_class_with(Factory::new(factory))
    }

    pub fn define_class_with(&self, factory: impl IntoFactory) -> Result<Descriptor> {
        descriptor::build(self, None, factory.into_factory(), false, "Class")
    }

    /// Defines a top-level singleton class.
    ///
    /// Fails with [`ClassError::Configuration`] when tracing is disabled.
    pub fn define_singleton<F>(&self, factory: F) -> Result<Descriptor>
    where
        F: Fn(&mut Instance, &ProtectedState, &Args) + Send + Sync + 'static,
    {
        self.define_singleton_with(Factory::new(factory))
    }

    pub fn define_singleton_with(&self, factory: impl IntoFactory) -> Result<Descriptor> {
        descriptor::build(self, None, factory.into_factory(), true, "Singleton")
    }

    /// Every descriptor the registry currently traces, in registration order.
    pub fn list_registered_descriptors(&self) -> Vec<Descriptor> {
        self.inner.registry.descriptors()
    }

    pub fn set_event_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        self.inner.registry.set_event_callback(callback);
    }

    pub fn clear_event_callback(&self) {
        self.inner.registry.clear_event_callback();
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Arc::downgrade(&self.inner))
    }

    /// Whether both handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Empties the registry without shutting the runtime down.
    ///
    /// Meant for tests sharing the default runtime.
    #[doc(hidden)]
    pub fn clear(&self) {
        self.inner.registry.clear();
    }
}

/// Non-owning runtime handle held by descriptors.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::init(RuntimeConfig::default())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("active", &self.is_active())
            .field("registry", &self.inner.registry)
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Default runtime
// -------------------------------------------------------------------------------------------------

static GLOBAL_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// The process-wide default runtime, initialized with the default configuration on
/// first use unless [`init_global`] ran before.
pub fn global() -> &'static Runtime {
    GLOBAL_RUNTIME.get_or_init(Runtime::default)
}

/// Initializes the default runtime with `config`.
///
/// Succeeds if the default runtime did not exist yet or already runs with the same
/// configuration; fails with [`ClassError::Configuration`] otherwise.
pub fn init_global(config: RuntimeConfig) -> Result<&'static Runtime> {
    let runtime = GLOBAL_RUNTIME.get_or_init(|| Runtime::init(config));
    if *runtime.config() == config {
        Ok(runtime)
    } else {
        Err(ClassError::Configuration {
            reason: "the default runtime is already initialized with another configuration",
        })
    }
}

/// Defines a top-level class on the default runtime.
pub fn define_class<F>(factory: F) -> Result<Descriptor>
where
    F: Fn(&mut Instance, &ProtectedState, &Args) + Send + Sync + 'static,
{
    global().define_class(factory)
}

/// Defines a top-level singleton class on the default runtime.
pub fn define_singleton<F>(factory: F) -> Result<Descriptor>
where
    F: Fn(&mut Instance, &ProtectedState, &Args) + Send + Sync + 'static,
{
    global().define_singleton(factory)
}

/// Descriptors traced by the default runtime.
pub fn list_registered_descriptors() -> Vec<Descriptor> {
    global().list_registered_descriptors()
}
