//! Integration tests for the process-wide default runtime.
//!
//! NOTE: All tests use #[serial] because they share the default runtime.
//! Running them in parallel could cause interference.

use class_registry::{
    define_class, define_singleton, global, init_global, list_registered_descriptors, Args,
    ClassError, RuntimeConfig, TraceMode, UnregisterPolicy,
};
use serial_test::serial;
use std::sync::Arc;

#[test]
#[serial]
fn test_free_functions_use_the_default_runtime() {
    global().clear();

    let class = define_class(|this, _, _| {
        this.set("answer", 42u32);
    })
    .unwrap();
    let single = define_singleton(|_, _, _| {}).unwrap();

    assert!(class.runtime().unwrap().ptr_eq(global()));
    assert_eq!(list_registered_descriptors(), vec![class.clone(), single.clone()]);

    let instance = class.construct(Args::new()).unwrap();
    assert_eq!(instance.get::<u32>("answer"), Some(&42));
    assert!(Arc::ptr_eq(
        &single.get_instance().unwrap(),
        &single.get_instance().unwrap()
    ));

    global().clear();
}

#[test]
#[serial]
fn test_default_configuration() {
    assert_eq!(*global().config(), RuntimeConfig::default());
    assert_eq!(global().trace_mode(), TraceMode::All);
    assert_eq!(global().unregister_policy(), UnregisterPolicy::ClassInstances);
}

#[test]
#[serial]
fn test_init_global_accepts_the_same_configuration() {
    let runtime = init_global(RuntimeConfig::default()).unwrap();
    assert!(runtime.ptr_eq(global()));
}

#[test]
#[serial]
fn test_init_global_refuses_another_configuration() {
    global();
    let err = init_global(RuntimeConfig::default().with_trace(TraceMode::Disabled)).unwrap_err();
    assert!(matches!(err, ClassError::Configuration { .. }));
    assert_eq!(global().trace_mode(), TraceMode::All);
}

#[test]
#[serial]
fn test_clear_keeps_the_runtime_active() {
    global().clear();
    let class = define_class(|_, _, _| {}).unwrap();
    class.construct(Args::new()).unwrap();

    global().clear();
    assert!(global().is_active());
    assert!(list_registered_descriptors().is_empty());
    assert!(!class.is_registered());
}
