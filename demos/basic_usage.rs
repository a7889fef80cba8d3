//! Basic usage example for class-registry.
//!
//! Demonstrates:
//! - Defining classes and subclasses from factory closures
//! - Building instances with `construct()` and `new_instance()`
//! - Reading parent defaults through `parent()`
//! - Singletons with `get_instance()`
//! - Querying and unregistering through the registry
//!
//! Run with: `cargo run --example basic_usage`

use class_registry::{args, define_runtime, Args, Result};
use std::sync::Arc;

// Create an isolated runtime for this example
define_runtime!(app);

fn main() -> Result<()> {
    println!("=== class-registry: Basic Usage ===\n");

    // -------------------------------------------------------------------------
    // 1. Define a class
    // -------------------------------------------------------------------------
    println!("1. Defining a class...");

    let animal = app::define_class(|this, _, _| {
        this.set("legs", 4u32);
        this.set("sound", "...");
        this.set_init(|this, args| {
            let name = args.get::<&str>(0).copied().unwrap_or("unnamed");
            this.set("name", name.to_string());
        });
    })?;

    let generic = animal.construct(args!["Generic"])?;
    println!(
        "   {} has {} legs",
        generic.get::<String>("name").map(String::as_str).unwrap_or("?"),
        generic.get::<u32>("legs").copied().unwrap_or_default()
    );

    // -------------------------------------------------------------------------
    // 2. Extend it
    // -------------------------------------------------------------------------
    println!("\n2. Extending the class...");

    let bird = animal.extend(|this, _, _| {
        this.set("legs", 2u32);
        this.set("sound", "tweet");
        this.set_init(|this, args| {
            // Reuse the parent's initializer, then refine.
            this.call_parent_init(args);
            this.set("can_fly", true);
        });
    })?;

    let tweety = bird.new_instance(args!["Tweety"])?;
    println!(
        "   {} says {:?}, parent default sound was {:?}",
        tweety.get::<String>("name").map(String::as_str).unwrap_or("?"),
        tweety.get::<&str>("sound"),
        tweety.parent().and_then(|p| p.get::<&str>("sound")),
    );
    println!("   tweety is an animal: {}", animal.is_instance(&tweety));

    // -------------------------------------------------------------------------
    // 3. Singletons
    // -------------------------------------------------------------------------
    println!("\n3. Singletons...");

    let settings = app::define_singleton(|this, _, _| {
        this.set("theme", "dark");
    })?;
    let a = settings.get_instance()?;
    let b = settings.get_instance()?;
    println!("   same instance: {}", Arc::ptr_eq(&a, &b));

    match settings.new_instance(Args::new()) {
        Ok(_) => println!("   unexpected: normal construction succeeded"),
        Err(err) => println!("   normal construction refused: {}", err),
    }

    // -------------------------------------------------------------------------
    // 4. Registry
    // -------------------------------------------------------------------------
    println!("\n4. Registry...");

    println!(
        "   {} descriptors registered",
        app::list_registered_descriptors().len()
    );
    println!("   animal instances: {}", animal.instances().len());
    println!("   unregister animal: {}", animal.unregister());
    println!("   animal instances: {}", animal.instances().len());

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
