//! Lifecycle bookkeeping for descriptors and their instances.
//!
//! Every [`Runtime`](crate::Runtime) owns one `Registry`. It maps each traced descriptor
//! to a [`TraceRecord`] holding its instances, its construction status and its
//! lineage's protected state. Records are kept in registration order.
//!
//! Instances are tracked, not owned: records keep weak handles, and an instance
//! dropped by every caller disappears from its records. Descriptors, on the other
//! hand, stay registered until they are unregistered (see [`UnregisterPolicy`]) or
//! the runtime goes away.
//!
//! The storage lock is never held while user code runs, so factories may define
//! classes or build instances on other descriptors.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::config::{Removal, UnregisterPolicy};
use crate::descriptor::Descriptor;
use crate::event::{EventCallback, RegistryEvent};
use crate::instance::Instance;
use crate::protected::ProtectedState;

/// Construction phase of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    /// The descriptor's level is running on behalf of a subclass.
    Extending,
    /// The descriptor is building an instance through `construct` / `get_instance`.
    Reflecting,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => write!(f, "IDLE"),
            Status::Extending => write!(f, "EXTENDING"),
            Status::Reflecting => write!(f, "REFLECTING"),
        }
    }
}

/// Registry entry for one descriptor.
#[derive(Clone)]
pub struct TraceRecord {
    descriptor: Descriptor,
    instances: Vec<Weak<Instance>>,
    singleton: bool,
    status: Status,
    protected: ProtectedState,
}

impl TraceRecord {
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Tracked instances still alive, in construction order.
    pub fn instances(&self) -> Vec<Arc<Instance>> {
        self.instances.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn protected_state(&self) -> &ProtectedState {
        &self.protected
    }
}

impl TraceRecord {
    fn live(&self) -> usize {
        self.instances
            .iter()
            .filter(|instance| instance.strong_count() > 0)
            .count()
    }

    fn prune(&mut self) {
        self.instances.retain(|instance| instance.strong_count() > 0);
    }
}

impl fmt::Debug for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceRecord")
            .field("descriptor", &self.descriptor)
            .field("instances", &self.live())
            .field("singleton", &self.singleton)
            .field("status", &self.status)
            .finish()
    }
}

pub struct Registry {
    records: Mutex<Vec<TraceRecord>>,
    policy: UnregisterPolicy,
    callback: Mutex<Option<Arc<EventCallback>>>,
}

impl Registry {
    pub(crate) fn new(policy: UnregisterPolicy) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            policy,
            callback: Mutex::new(None),
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------------------------------

    /// Sets a callback that will be invoked on every registry interaction.
    ///
    /// The callback must NOT call methods of this same registry, as it is invoked while
    /// holding the callback lock.
    pub fn set_event_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        let mut guard = self.callback.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(Arc::new(callback));
    }

    /// Clears the event callback.
    pub fn clear_event_callback(&self) {
        let mut guard = self.callback.lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    pub(crate) fn emit(&self, event: &RegistryEvent) {
        let guard = self.callback.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(callback) = guard.as_ref() {
            callback(event);
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------------------------------

    fn with_records<R>(&self, f: impl FnOnce(&mut Vec<TraceRecord>) -> R) -> R {
        // A panicking event callback or user Drop impl cannot leave a record half
        // written, so a poisoned lock is recovered.
        let mut records = self.records.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut records)
    }

    fn with_record<R>(
        &self,
        descriptor: &Descriptor,
        f: impl FnOnce(&mut TraceRecord) -> R,
    ) -> Option<R> {
        self.with_records(|records| {
            records
                .iter_mut()
                .find(|record| record.descriptor.id() == descriptor.id())
                .map(f)
        })
    }

    /// Records `descriptor`, and `instance` if given.
    ///
    /// Creates the record when missing. An existing record gets the instance appended,
    /// unless the descriptor is a singleton already holding a live one. Returns whether
    /// the instance was recorded.
    pub fn trace(&self, descriptor: &Descriptor, instance: Option<&Arc<Instance>>) -> bool {
        let offered = instance.is_some();
        let instance = instance.map(Arc::downgrade);
        let (recorded, count) = self.with_records(|records| {
            match records
                .iter_mut()
                .find(|record| record.descriptor.id() == descriptor.id())
            {
                Some(record) => {
                    record.prune();
                    match instance {
                        Some(instance) if record.instances.is_empty() || !record.singleton => {
                            record.instances.push(instance);
                            (true, record.instances.len())
                        }
                        _ => (false, record.instances.len()),
                    }
                }
                None => {
                    records.push(TraceRecord {
                        descriptor: descriptor.clone(),
                        instances: instance.into_iter().collect(),
                        singleton: descriptor.is_singleton(),
                        status: Status::Idle,
                        protected: descriptor.protected_state().clone(),
                    });
                    (offered, usize::from(offered))
                }
            }
        });

        if offered && !recorded {
            tracing::debug!(
                class = descriptor.name(),
                id = %descriptor.id(),
                "singleton slot already taken"
            );
        }

        self.emit(&RegistryEvent::Track {
            class: descriptor.name(),
            instances: count,
        });

        recorded
    }

    /// Returns a copy of the descriptor's record.
    pub fn trace_record(&self, descriptor: &Descriptor) -> Option<TraceRecord> {
        self.with_record(descriptor, |record| record.clone())
    }

    pub fn contains(&self, descriptor: &Descriptor) -> bool {
        self.with_record(descriptor, |_| ()).is_some()
    }

    /// Live instances recorded for the descriptor, or `None` if it is not traced.
    pub fn instances(&self, descriptor: &Descriptor) -> Option<Vec<Arc<Instance>>> {
        self.with_record(descriptor, |record| {
            record.prune();
            record.instances()
        })
    }

    pub(crate) fn first_instance(&self, descriptor: &Descriptor) -> Option<Arc<Instance>> {
        self.with_record(descriptor, |record| {
            record.prune();
            record.instances.first().and_then(Weak::upgrade)
        })
        .flatten()
    }

    /// Sets the status of a traced descriptor. Returns `false` if it is not traced.
    pub fn set_status(&self, descriptor: &Descriptor, status: Status) -> bool {
        self.with_record(descriptor, |record| record.status = status)
            .is_some()
    }

    /// Status of the descriptor; untraced descriptors are always idle.
    pub fn status(&self, descriptor: &Descriptor) -> Status {
        self.with_record(descriptor, |record| record.status)
            .unwrap_or_default()
    }

    /// Switches the descriptor to `status` until the returned guard is dropped.
    pub(crate) fn enter<'a>(&'a self, descriptor: &'a Descriptor, status: Status) -> StatusGuard<'a> {
        let previous = self.status(descriptor);
        let active = self.set_status(descriptor, status);
        if active {
            tracing::trace!(class = descriptor.name(), %previous, %status, "status transition");
        }
        StatusGuard {
            registry: self,
            descriptor,
            previous,
            active,
        }
    }

    /// Protected state of the descriptor's lineage.
    ///
    /// The traced record shares the bag with the lineage root, so this is the same
    /// object whether or not the descriptor is traced.
    pub fn protected_state(&self, descriptor: &Descriptor) -> ProtectedState {
        self.with_record(descriptor, |record| record.protected.clone())
            .unwrap_or_else(|| descriptor.protected_state().clone())
    }

    /// Traced descriptors, in registration order.
    pub fn descriptors(&self) -> Vec<Descriptor> {
        self.with_records(|records| {
            records
                .iter()
                .map(|record| record.descriptor.clone())
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.with_records(|records| records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn policy(&self) -> UnregisterPolicy {
        self.policy
    }

    /// Removes the descriptor's record or instances, as the unregister policy allows.
    ///
    /// Returns `true` only when something was changed.
    pub fn unregister(&self, descriptor: &Descriptor) -> bool {
        let (changed, removed) = self.with_records(|records| {
            let Some(index) = records
                .iter()
                .position(|record| record.descriptor.id() == descriptor.id())
            else {
                return (false, None);
            };

            match self.policy.removal(records[index].singleton) {
                Removal::Record => (true, Some(records.remove(index))),
                Removal::Instances => {
                    records[index].instances.clear();
                    (true, None)
                }
                Removal::Nothing => (false, None),
            }
        });
        // The record may hold the last handle to its descriptor; drop it unlocked.
        drop(removed);

        tracing::debug!(
            class = descriptor.name(),
            id = %descriptor.id(),
            policy = %self.policy,
            removed = changed,
            "unregister"
        );
        self.emit(&RegistryEvent::Unregister {
            class: descriptor.name(),
            removed: changed,
        });

        changed
    }

    /// Drops every record.
    pub(crate) fn clear(&self) {
        let records = self.with_records(std::mem::take);
        drop(records);
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("records", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Restores the previous status of a descriptor when dropped, panics included.
pub(crate) struct StatusGuard<'a> {
    registry: &'a Registry,
    descriptor: &'a Descriptor,
    previous: Status,
    active: bool,
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            self.registry.set_status(self.descriptor, self.previous);
        }
    }
}
