//! Macros for module-scoped runtimes and argument lists.

/// Creates a module owning a lazily initialized [`Runtime`](crate::Runtime).
///
/// The macro generates a module containing:
/// - The runtime static (hidden)
/// - A `runtime()` accessor
/// - Free functions delegating to the runtime
///
/// The configuration is given as variant names of [`TraceMode`](crate::TraceMode) and
/// [`UnregisterPolicy`](crate::UnregisterPolicy); both default as in
/// [`RuntimeConfig::default`](crate::RuntimeConfig).
///
/// # Examples
///
/// ```rust
/// use class_registry::{define_runtime, Args};
///
/// define_runtime!(app);
/// define_runtime!(plugins, trace = Singleton, unregister = AllInstances);
///
/// let base = app::define_class(|this, _, _| {
///     this.set("kind", "base");
/// })
/// .unwrap();
/// let instance = base.construct(Args::new()).unwrap();
/// assert_eq!(instance.get::<&str>("kind"), Some(&"base"));
///
/// // Each runtime keeps its own registry.
/// assert_eq!(app::list_registered_descriptors().len(), 1);
/// assert!(plugins::list_registered_descriptors().is_empty());
/// ```
#[macro_export]
macro_rules! define_runtime {
    ($name:ident) => {
        $crate::define_runtime!($name, trace = All, unregister = ClassInstances);
    };
    ($name:ident, trace = $trace:ident) => {
        $crate::define_runtime!($name, trace = $trace, unregister = ClassInstances);
    };
    ($name:ident, trace = $trace:ident, unregister = $unregister:ident) => {
        pub mod $name {
            use std::sync::LazyLock;

            // The runtime itself (module-private)
            static RUNTIME: LazyLock<$crate::Runtime> = LazyLock::new(|| {
                $crate::Runtime::init($crate::RuntimeConfig::new(
                    $crate::TraceMode::$trace,
                    $crate::UnregisterPolicy::$unregister,
                ))
            });

            /// The module's runtime.
            pub fn runtime() -> &'static $crate::Runtime {
                &RUNTIME
            }

            /// Define a top-level class.
            pub fn define_class<F>(factory: F) -> $crate::Result<$crate::Descriptor>
            where
                F: Fn(&mut $crate::Instance, &$crate::ProtectedState, &$crate::Args)
                    + Send
                    + Sync
                    + 'static,
            {
                RUNTIME.define_class(factory)
            }

            /// Define a top-level singleton class.
            pub fn define_singleton<F>(factory: F) -> $crate::Result<$crate::Descriptor>
            where
                F: Fn(&mut $crate::Instance, &$crate::ProtectedState, &$crate::Args)
                    + Send
                    + Sync
                    + 'static,
            {
                RUNTIME.define_singleton(factory)
            }

            /// Descriptors traced by this runtime.
            pub fn list_registered_descriptors() -> Vec<$crate::Descriptor> {
                RUNTIME.list_registered_descriptors()
            }

            /// Set an event callback for registry operations.
            pub fn set_event_callback(
                callback: impl Fn(&$crate::RegistryEvent) + Send + Sync + 'static,
            ) {
                RUNTIME.set_event_callback(callback)
            }

            /// Clear the event callback.
            pub fn clear_event_callback() {
                RUNTIME.clear_event_callback()
            }
        }
    };
}

/// Builds an [`Args`](crate::Args) list from values.
///
/// ```rust
/// use class_registry::args;
///
/// let args = args![1u32, "two", 3.0f64];
/// assert_eq!(args.len(), 3);
/// assert_eq!(args.get::<&str>(1), Some(&"two"));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::Args::new()$(.with($arg))+
    };
}
