//! Integration tests for registry event callbacks.
//!
//! Callbacks observe definitions, constructions, tracing, unregistration and shutdown,
//! which is useful for debugging and logging.

use class_registry::{
    args, define_runtime, Args, Factory, RegistryEvent, Runtime, RuntimeConfig, TraceMode,
    UnregisterPolicy,
};
use std::sync::{Arc, Mutex};

fn collect(rt: &Runtime) -> Arc<Mutex<Vec<String>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    rt.set_event_callback(move |event| {
        events_clone.lock().unwrap().push(format!("{}", event));
    });
    events
}

#[test]
fn test_define_and_construct_events() {
    let rt = Runtime::default();
    let events = collect(&rt);

    let base = rt
        .define_class_with(Factory::named("Base", |_, _, _| {}))
        .unwrap();
    let _first = base.construct(Args::new()).unwrap();
    let _second = base.new_instance(args![1u8]).unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(
        *captured,
        vec![
            "track { class: Base, instances: 0 }",
            "define { class: Base, singleton: false }",
            "track { class: Base, instances: 1 }",
            "construct { class: Base, reflective: true }",
            "track { class: Base, instances: 2 }",
            "construct { class: Base, reflective: false }",
        ]
    );
}

#[test]
fn test_untraced_definitions_emit_no_track_event() {
    let rt = Runtime::init(RuntimeConfig::default().with_trace(TraceMode::Disabled));
    let events = collect(&rt);

    let plain = rt
        .define_class_with(Factory::named("Plain", |_, _, _| {}))
        .unwrap();
    plain.construct(Args::new()).unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(
        *captured,
        vec![
            "define { class: Plain, singleton: false }",
            "construct { class: Plain, reflective: true }",
        ]
    );
}

#[test]
fn test_singleton_events() {
    let rt = Runtime::default();
    let single = rt
        .define_singleton_with(Factory::named("Config", |_, _, _| {}))
        .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    rt.set_event_callback(move |event| {
        events_clone.lock().unwrap().push(event.clone());
    });

    single.get_instance().unwrap();
    single.get_instance().unwrap();

    let captured = events.lock().unwrap();
    // The memoized second call does not construct.
    assert_eq!(
        *captured,
        vec![
            RegistryEvent::Track {
                class: "Config",
                instances: 1
            },
            RegistryEvent::Construct {
                class: "Config",
                reflective: true
            },
        ]
    );
}

#[test]
fn test_unregister_event_reports_removal() {
    let rt = Runtime::init(RuntimeConfig::new(
        TraceMode::All,
        UnregisterPolicy::ClassesOnly,
    ));
    let class = rt
        .define_class_with(Factory::named("Widget", |_, _, _| {}))
        .unwrap();
    let single = rt
        .define_singleton_with(Factory::named("Theme", |_, _, _| {}))
        .unwrap();
    let events = collect(&rt);

    class.unregister();
    single.unregister();

    let captured = events.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0], "unregister { class: Widget, removed: true }");
    assert_eq!(captured[1], "unregister { class: Theme, removed: false }");
}

#[test]
fn test_shutdown_event() {
    let rt = Runtime::default();
    let events = collect(&rt);

    rt.shutdown();
    rt.shutdown();

    let captured = events.lock().unwrap();
    assert_eq!(*captured, vec!["Shutting down the Registry"]);
}

#[test]
fn test_clear_event_callback() {
    let rt = Runtime::default();
    let events = collect(&rt);

    rt.define_class(|_, _, _| {}).unwrap();
    let count_before = events.lock().unwrap().len();

    rt.clear_event_callback();
    rt.define_class(|_, _, _| {}).unwrap();

    assert_eq!(events.lock().unwrap().len(), count_before);
}

#[test]
fn test_callback_replacement() {
    let rt = Runtime::default();
    let first = collect(&rt);
    let second = collect(&rt);

    rt.define_class(|_, _, _| {}).unwrap();

    assert!(first.lock().unwrap().is_empty());
    assert!(!second.lock().unwrap().is_empty());
}

#[test]
fn test_module_runtime_callback() {
    define_runtime!(observed);

    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    observed::set_event_callback(move |event| {
        if let RegistryEvent::Define { class, .. } = event {
            events_clone.lock().unwrap().push(*class);
        }
    });

    let base = observed::define_class(|_, _, _| {}).unwrap();
    base.extend_with(Factory::named("Child", |_, _, _| {})).unwrap();

    observed::clear_event_callback();
    observed::define_class(|_, _, _| {}).unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0], base.name());
    assert_eq!(captured[1], "Child");
}
