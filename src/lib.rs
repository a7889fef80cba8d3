//! # Class Registry
//!
//! Class descriptors built from plain factory functions, chained into inheritance
//! hierarchies by running every ancestor's factory against the same instance
//! ("constructor stealing"), with singleton descriptors and a queryable registry of
//! every descriptor and instance.
//!
//! ## Quick Start
//!
//! ```rust
//! use class_registry::{Args, Runtime, RuntimeConfig};
//!
//! let runtime = Runtime::init(RuntimeConfig::default());
//!
//! let animal = runtime
//!     .define_class(|this, _, _| {
//!         this.set("legs", 4u32);
//!     })
//!     .unwrap();
//! let bird = animal
//!     .extend(|this, _, _| {
//!         this.set("legs", 2u32);
//!     })
//!     .unwrap();
//!
//! let tweety = bird.construct(Args::new()).unwrap();
//! assert_eq!(tweety.get::<u32>("legs"), Some(&2));
//! assert_eq!(tweety.parent().unwrap().get::<u32>("legs"), Some(&4));
//! assert!(animal.is_instance(&tweety));
//!
//! let config = runtime.define_singleton(|_, _, _| {}).unwrap();
//! let a = config.get_instance().unwrap();
//! let b = config.get_instance().unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! ```
//!
//! ## Features
//!
//! - **Constructor stealing**: ancestors declare their defaults on the subclass instance
//! - **Protected state**: a field bag shared by a whole lineage
//! - **Singletons**: lazily built, memoized, never constructible through `new_instance`
//! - **Registry**: configurable tracing and unregistration policies
//! - **Events**: optional callback observing registry operations
//!
//! ## Main Entry Points
//!
//! - [`Runtime::init`] / [`Runtime::shutdown`] - Own a registry with a fixed configuration
//! - [`Runtime::define_class`] / [`Runtime::define_singleton`] - Define lineage roots
//! - [`Descriptor::extend`] - Define a subclass
//! - [`Descriptor::construct`], [`Descriptor::new_instance`], [`Descriptor::get_instance`] - Build instances
//! - [`define_class`], [`define_singleton`], [`list_registered_descriptors`] - Same, on the default runtime
//! - [`define_runtime!`] - A module-scoped runtime

mod config;
mod construction;
mod descriptor;
mod error;
mod event;
mod instance;
mod macros;
mod protected;
mod registry;
mod runtime;
mod value;

pub use config::{ParseModeError, RuntimeConfig, TraceMode, UnregisterPolicy};
pub use descriptor::{Descriptor, DescriptorId, Factory, IntoFactory};
pub use error::{ClassError, Result};
pub use event::{EventCallback, RegistryEvent};
pub use instance::{Initializer, Instance, ParentView};
pub use protected::ProtectedState;
pub use registry::{Registry, Status, TraceRecord};
pub use runtime::{
    define_class, define_singleton, global, init_global, list_registered_descriptors, Runtime,
};
pub use value::{value, Args, Fields, Value};
