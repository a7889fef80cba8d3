use thiserror::Error;

/// Errors produced while defining descriptors or constructing instances.
///
/// Every failure is immediate: the requested descriptor or instance is not produced,
/// and the registry is left with all status transitions restored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassError {
    /// A value supplied where a factory was required is not callable.
    #[error("{context} argument must be a factory")]
    Argument { context: &'static str },

    /// The runtime configuration forbids the requested operation.
    #[error("configuration error: {reason}")]
    Configuration { reason: &'static str },

    /// An instance was requested through a path its descriptor does not allow.
    #[error("illegal construction of {class}: {reason}")]
    IllegalConstruction {
        class: &'static str,
        reason: &'static str,
    },

    /// A field lookup found nothing under the given name.
    #[error("field not found: {field}")]
    FieldNotFound { field: String },

    /// A field exists but holds a value of another type.
    #[error("field {field} is not a {expected}")]
    FieldTypeMismatch {
        field: String,
        expected: &'static str,
    },

    /// The runtime backing a descriptor has been shut down.
    #[error("runtime has been shut down")]
    RuntimeShutdown,
}

pub type Result<T, E = ClassError> = std::result::Result<T, E>;
