//! The construction protocol.
//!
//! An instance is built by running every level of its lineage against the same
//! [`Instance`], root first. Each ancestor level runs without the caller's arguments
//! and only declares its own defaults; right after it finishes, the instance state is
//! snapshotted into [`Instance::parent`]. Initializers installed by ancestors are
//! discarded before the next level runs, so only the leaf's initializer fires, once,
//! with the caller's arguments.
//!
//! Which path requested the instance travels as an explicit [`Invocation`]; the
//! registry status is bookkeeping and never drives control flow.

use std::sync::Arc;

use crate::descriptor::Descriptor;
use crate::error::{ClassError, Result};
use crate::event::RegistryEvent;
use crate::instance::Instance;
use crate::registry::Status;
use crate::runtime::Runtime;
use crate::value::Args;

/// How a level is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Invocation {
    /// `new_instance`
    Normal,
    /// `construct` / `get_instance`
    Reflective,
    /// An ancestor level run on behalf of a subclass
    Extension,
}

pub(crate) fn produce(
    descriptor: &Descriptor,
    invocation: Invocation,
    args: &Args,
) -> Result<Arc<Instance>> {
    let runtime = descriptor.runtime()?;
    runtime.ensure_active()?;

    if descriptor.is_singleton() && invocation == Invocation::Normal {
        return Err(ClassError::IllegalConstruction {
            class: descriptor.name(),
            reason: "singleton instances must be retrieved through get_instance",
        });
    }

    let _serial = descriptor.serial().lock();
    let _status = (invocation == Invocation::Reflective)
        .then(|| runtime.registry().enter(descriptor, Status::Reflecting));

    let mut instance = Instance::blank(descriptor.factory().clone(), descriptor.lineage().to_vec());
    run_level(&runtime, descriptor, &mut instance, invocation, args);
    instance.call_init(args);

    let instance = Arc::new(instance);
    track(&runtime, descriptor, &instance);

    tracing::debug!(
        class = descriptor.name(),
        id = %descriptor.id(),
        ?invocation,
        "constructed instance"
    );
    runtime.registry().emit(&RegistryEvent::Construct {
        class: descriptor.name(),
        reflective: invocation == Invocation::Reflective,
    });

    Ok(instance)
}

/// Runs one level, after every level above it, against `instance`.
///
/// The level's own lock is taken before its status changes, so a concurrent
/// construction of the same descriptor never observes or restores a foreign status.
fn run_level(
    runtime: &Runtime,
    descriptor: &Descriptor,
    instance: &mut Instance,
    invocation: Invocation,
    args: &Args,
) {
    let _serial = descriptor.serial().lock();
    let _status = (invocation == Invocation::Extension)
        .then(|| runtime.registry().enter(descriptor, Status::Extending));

    if let Some(parent) = descriptor.parent() {
        run_level(runtime, parent, instance, Invocation::Extension, &Args::new());
        instance.capture_parent();
    }

    instance.discard_init();
    tracing::trace!(class = descriptor.name(), ?invocation, "running factory");
    descriptor
        .factory()
        .call(instance, descriptor.protected_state(), args);
}

/// Records the instance with every traced level of its lineage, root first.
///
/// An instance of a subclass is an instance of each ancestor, so ancestors count it
/// too. Each level is recorded under its own lock: a singleton ancestor's slot is
/// filled either by its own `get_instance` or by a descendant, never both.
fn track(runtime: &Runtime, descriptor: &Descriptor, instance: &Arc<Instance>) {
    let levels: Vec<&Descriptor> = descriptor.levels().collect();
    for level in levels.into_iter().rev() {
        if runtime.tracks(level.is_singleton()) {
            let _serial = level.serial().lock();
            runtime.registry().trace(level, Some(instance));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, RuntimeConfig, TraceMode, UnregisterPolicy};
    use std::sync::{Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    type Seen = Arc<Mutex<Vec<(String, Status)>>>;

    #[test]
    fn test_statuses_during_construction() {
        let rt = Runtime::init(RuntimeConfig::new(TraceMode::All, UnregisterPolicy::All));
        let seen: Seen = Arc::default();

        let parent_cell: Arc<Mutex<Option<Descriptor>>> = Arc::default();
        let child_cell: Arc<Mutex<Option<Descriptor>>> = Arc::default();

        let (s, p) = (seen.clone(), parent_cell.clone());
        let parent = rt
            .define_class(move |_, _, _| {
                let parent = p.lock().unwrap().clone().unwrap();
                let status = parent.runtime().unwrap().registry().status(&parent);
                s.lock().unwrap().push(("parent".into(), status));
            })
            .unwrap();
        *parent_cell.lock().unwrap() = Some(parent.clone());

        let (s, c) = (seen.clone(), child_cell.clone());
        let child = parent
            .extend(move |_, _, _| {
                let child = c.lock().unwrap().clone().unwrap();
                let status = child.runtime().unwrap().registry().status(&child);
                s.lock().unwrap().push(("child".into(), status));
            })
            .unwrap();
        *child_cell.lock().unwrap() = Some(child.clone());

        child.construct(Args::new()).unwrap();
        child.new_instance(Args::new()).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("parent".to_string(), Status::Extending),
                ("child".to_string(), Status::Reflecting),
                ("parent".to_string(), Status::Extending),
                ("child".to_string(), Status::Idle),
            ]
        );
        assert_eq!(rt.registry().status(&parent), Status::Idle);
        assert_eq!(rt.registry().status(&child), Status::Idle);

        // Break the descriptor -> closure -> descriptor cycles.
        parent_cell.lock().unwrap().take();
        child_cell.lock().unwrap().take();
    }

    #[test]
    fn test_status_restored_after_panicking_factory() {
        let rt = Runtime::init(RuntimeConfig::default());
        let parent = rt
            .define_class(|_, _, _| panic!("parent factory failed"))
            .unwrap();
        let child = parent.extend(|_, _, _| {}).unwrap();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            child.construct(Args::new())
        }));
        assert!(outcome.is_err());
        assert_eq!(rt.registry().status(&parent), Status::Idle);
        assert_eq!(rt.registry().status(&child), Status::Idle);
        assert!(child.instances().is_empty());
    }

    #[test]
    fn test_ancestors_receive_no_arguments() {
        let rt = Runtime::init(RuntimeConfig::default());
        let parent = rt
            .define_class(|this, _, args| {
                this.set("parent_args", args.len());
            })
            .unwrap();
        let child = parent
            .extend(|this, _, args| {
                this.set("child_args", args.len());
            })
            .unwrap();

        let instance = child
            .construct(Args::new().with(1u8).with(2u8))
            .unwrap();
        assert_eq!(instance.get::<usize>("parent_args"), Some(&0));
        assert_eq!(instance.get::<usize>("child_args"), Some(&2));
    }

    #[test]
    fn test_parent_status_settles_when_built_alongside_a_child() {
        let rt = Runtime::init(RuntimeConfig::default());
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let (e, r) = (entered.clone(), release.clone());
        let parent = rt
            .define_class(move |_, _, args| {
                // Only the direct construction with a marker blocks.
                if args.get::<u32>(0) == Some(&1) {
                    e.wait();
                    r.wait();
                }
            })
            .unwrap();
        let child = parent.extend(|_, _, _| {}).unwrap();

        let building_parent = {
            let parent = parent.clone();
            thread::spawn(move || parent.construct(args![1u32]).map(|_| ()))
        };
        entered.wait();
        assert_eq!(rt.registry().status(&parent), Status::Reflecting);

        let building_child = {
            let child = child.clone();
            thread::spawn(move || child.construct(Args::new()).map(|_| ()))
        };
        // Give the child time to queue up behind the parent level.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(rt.registry().status(&parent), Status::Reflecting);

        release.wait();
        building_parent.join().unwrap().unwrap();
        building_child.join().unwrap().unwrap();

        assert_eq!(rt.registry().status(&parent), Status::Idle);
        assert_eq!(rt.registry().status(&child), Status::Idle);
    }

    #[test]
    fn test_ancestors_track_descendant_instances() {
        let rt = Runtime::init(RuntimeConfig::new(
            TraceMode::All,
            UnregisterPolicy::ClassInstances,
        ));
        let a = rt.define_class(|_, _, _| {}).unwrap();
        let b = a.extend(|_, _, _| {}).unwrap();
        let c = b.extend(|_, _, _| {}).unwrap();

        let from_c = c.construct(Args::new()).unwrap();
        let from_b = b.new_instance(Args::new()).unwrap();

        assert_eq!(c.instances().len(), 1);
        assert_eq!(b.instances().len(), 2);
        assert_eq!(a.instances().len(), 2);
        assert!(Arc::ptr_eq(&a.instances()[0], &from_c));
        assert!(Arc::ptr_eq(&a.instances()[1], &from_b));

        // Clearing an ancestor leaves the subclasses' records alone.
        assert!(a.unregister());
        assert!(a.instances().is_empty());
        assert_eq!(b.instances().len(), 2);
    }
}
