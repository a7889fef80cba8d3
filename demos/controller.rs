//! Collaborators built on a module runtime.
//!
//! Demonstrates:
//! - An options-holder `Base` class whose subclasses declare the options they accept
//! - A subclass initializer calling its parent's initializer
//! - A `Controller` singleton registering sub-controllers by name
//!
//! Run with: `cargo run --example controller`

use class_registry::{args, define_runtime, Args, Descriptor, Instance, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

define_runtime!(plug);

pub type Options = BTreeMap<String, String>;

/// Declared options and their current values.
struct Config(Mutex<Options>);

/// Sub-controller instances by name.
struct SubControllers(Mutex<BTreeMap<String, Arc<Instance>>>);

// -------------------------------------------------------------------------------------------------
// Base
// -------------------------------------------------------------------------------------------------

/// Defines the options holder. Its initializer applies the `Options` passed as first
/// argument, keeping only declared keys.
pub fn define_base() -> Result<Descriptor> {
    plug::define_class(|this, _, _| {
        this.set("config", Config(Mutex::new(Options::new())));
        this.set_init(|this, args| {
            if let Some(options) = args.get::<Options>(0) {
                set_options(this, options);
            }
        });
    })
}

/// Declares an option with its default. Meant to be called from factories.
pub fn declare_option(this: &Instance, name: &str, default: &str) {
    if let Some(config) = this.get::<Config>("config") {
        config.0.lock().insert(name.to_string(), default.to_string());
    }
}

pub fn get_option(this: &Instance, name: &str) -> Option<String> {
    this.get::<Config>("config")?.0.lock().get(name).cloned()
}

/// Sets a declared option. Unknown options are ignored and `false` is returned.
pub fn set_option(this: &Instance, name: &str, value: &str) -> bool {
    let Some(config) = this.get::<Config>("config") else {
        return false;
    };
    let mut options = config.0.lock();
    match options.get_mut(name) {
        Some(slot) => {
            *slot = value.to_string();
            true
        }
        None => false,
    }
}

pub fn set_options(this: &Instance, options: &Options) {
    for (name, value) in options {
        set_option(this, name, value);
    }
}

// -------------------------------------------------------------------------------------------------
// Controller
// -------------------------------------------------------------------------------------------------

pub fn define_controller() -> Result<Descriptor> {
    plug::define_singleton(|this, _, _| {
        this.set_init(|this, _| {
            this.set("sub_controllers", SubControllers(Mutex::default()));
        });
    })
}

/// Builds an instance of `sub` and registers it under `name`.
///
/// Singletons are fetched with `get_instance`, plain classes get a fresh instance.
pub fn add_sub_controller(
    controller: &Instance,
    name: &str,
    sub: &Descriptor,
) -> Result<Arc<Instance>> {
    let registry = controller.try_get::<SubControllers>("sub_controllers")?;
    let instance = if sub.is_singleton() {
        sub.get_instance()?
    } else {
        sub.new_instance(Args::new())?
    };
    registry
        .0
        .lock()
        .insert(name.to_string(), instance.clone());
    Ok(instance)
}

pub fn get_sub_controller(controller: &Instance, name: &str) -> Option<Arc<Instance>> {
    controller
        .get::<SubControllers>("sub_controllers")?
        .0
        .lock()
        .get(name)
        .cloned()
}

fn main() -> Result<()> {
    println!("=== class-registry: Controller ===\n");

    // -------------------------------------------------------------------------
    // 1. An options holder and a subclass declaring its options
    // -------------------------------------------------------------------------
    println!("1. Defining Base and Logger...");

    let base = define_base()?;
    let logger = base.extend(|this, _, _| {
        declare_option(this, "level", "info");
        declare_option(this, "target", "stderr");
        this.set_init(|this, args| {
            this.call_parent_init(args);
        });
    })?;

    let options = Options::from([
        ("level".to_string(), "debug".to_string()),
        ("color".to_string(), "always".to_string()),
    ]);
    let verbose = logger.construct(args![options])?;

    println!("   level  = {:?}", get_option(&verbose, "level"));
    println!("   target = {:?}", get_option(&verbose, "target"));
    println!("   color  = {:?} (not declared)", get_option(&verbose, "color"));

    // -------------------------------------------------------------------------
    // 2. The controller singleton
    // -------------------------------------------------------------------------
    println!("\n2. Registering sub-controllers...");

    let controller = define_controller()?.get_instance()?;
    let router = plug::define_singleton(|this, _, _| {
        this.set("routes", 0u32);
    })?;

    add_sub_controller(&controller, "logger", &logger)?;
    let first = add_sub_controller(&controller, "router", &router)?;
    let again = add_sub_controller(&controller, "router-alias", &router)?;

    println!(
        "   router registered twice, same instance: {}",
        Arc::ptr_eq(&first, &again)
    );
    println!(
        "   logger found: {}",
        get_sub_controller(&controller, "logger").is_some()
    );
    println!(
        "   unknown found: {}",
        get_sub_controller(&controller, "unknown").is_some()
    );

    // -------------------------------------------------------------------------
    // 3. Registry contents
    // -------------------------------------------------------------------------
    println!("\n3. Registry contents...");

    for descriptor in plug::list_registered_descriptors() {
        println!(
            "   {} singleton={} instances={}",
            descriptor.id(),
            descriptor.is_singleton(),
            descriptor.instances().len()
        );
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
