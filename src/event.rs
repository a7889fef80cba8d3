/// Events emitted by a runtime's registry.
///
/// These events are passed to the callback set via `Runtime::set_event_callback`.
/// The `Clone` derive allows callbacks to store or forward events if needed.
///
/// # Examples
///
/// ```rust
/// use class_registry::RegistryEvent;
///
/// let event = RegistryEvent::Define { class: "Base", singleton: false };
/// assert_eq!(event.to_string(), "define { class: Base, singleton: false }");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A descriptor was built.
    Define {
        /// Name of the descriptor's factory
        class: &'static str,
        singleton: bool,
    },

    /// An instance was produced.
    Construct {
        class: &'static str,
        /// Whether the reflective path (`construct` / `get_instance`) was used
        reflective: bool,
    },

    /// A descriptor or instance was recorded in the registry.
    Track {
        class: &'static str,
        /// Number of instances held by the record afterwards
        instances: usize,
    },

    /// `unregister` was called on a descriptor.
    Unregister {
        class: &'static str,
        /// Whether the active policy allowed a mutation
        removed: bool,
    },

    /// The runtime was shut down and its registry emptied.
    Shutdown {},
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Define { class, singleton } => {
                write!(f, "define {{ class: {}, singleton: {} }}", class, singleton)
            }
            RegistryEvent::Construct { class, reflective } => {
                write!(
                    f,
                    "construct {{ class: {}, reflective: {} }}",
                    class, reflective
                )
            }
            RegistryEvent::Track { class, instances } => {
                write!(f, "track {{ class: {}, instances: {} }}", class, instances)
            }
            RegistryEvent::Unregister { class, removed } => {
                write!(f, "unregister {{ class: {}, removed: {} }}", class, removed)
            }
            RegistryEvent::Shutdown {} => write!(f, "Shutting down the Registry"),
        }
    }
}

/// Type alias for the user-supplied event callback.
///
/// It must be thread-safe because runtimes can be shared across threads.
pub type EventCallback = dyn Fn(&RegistryEvent) + Send + Sync + 'static;
