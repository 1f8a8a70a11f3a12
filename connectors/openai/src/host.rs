//! Host context: ties task lifetimes to the embedding application
//!
//! The host tracks its tasks without owning them. An activated task is kept
//! alive by its in-flight request; a task nobody holds drops out of the
//! registry. Shutting the host down tears down every task that was
//! registered with the teardown hook.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, info};
use uuid::Uuid;

use crate::task::RequestTask;

/// Type-erased view of a task, as the host sees it
pub(crate) trait HostedTask: Send + Sync {
    fn id(&self) -> Uuid;
    fn on_host_teardown(&self);
}

impl<T: RequestTask> HostedTask for T {
    fn id(&self) -> Uuid {
        self.core().id()
    }

    fn on_host_teardown(&self) {
        self.core().begin_host_teardown();
    }
}

struct Registration {
    task: Weak<dyn HostedTask>,
    teardown_hook: bool,
}

#[derive(Default)]
struct HostRegistry {
    tasks: HashMap<Uuid, Registration>,
}

impl HostRegistry {
    fn prune(&mut self) {
        self.tasks.retain(|_, registration| registration.task.strong_count() > 0);
    }
}

/// Registry of the tasks owned by one application context
#[derive(Clone, Default)]
pub struct HostContext {
    registry: Arc<Mutex<HostRegistry>>,
}

impl HostContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, task: Arc<dyn HostedTask>, teardown_hook: bool) {
        let id = task.id();
        let task = Arc::downgrade(&task);
        self.lock().tasks.insert(id, Registration { task, teardown_hook });
        debug!(task = %id, teardown_hook, "Registered task with host");
    }

    pub(crate) fn downgrade(&self) -> WeakHost {
        WeakHost(Arc::downgrade(&self.registry))
    }

    /// Tear down every task registered with the teardown hook.
    ///
    /// Returns the number of tasks torn down. Tasks created without the hook
    /// are left running.
    pub fn shutdown(&self) -> usize {
        let hooked: Vec<Arc<dyn HostedTask>> = self
            .lock()
            .tasks
            .values()
            .filter(|registration| registration.teardown_hook)
            .filter_map(|registration| registration.task.upgrade())
            .collect();

        info!("Host shutting down, tearing down {} tasks", hooked.len());
        for task in &hooked {
            task.on_host_teardown();
        }
        hooked.len()
    }

    pub fn is_registered(&self, id: Uuid) -> bool {
        self.lock().tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the registry, dropping entries whose task is gone
    fn lock(&self) -> std::sync::MutexGuard<'_, HostRegistry> {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.prune();
        registry
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext").field("tasks", &self.len()).finish()
    }
}

/// Non-owning link from a task back to its host
#[derive(Clone)]
pub(crate) struct WeakHost(Weak<Mutex<HostRegistry>>);

impl WeakHost {
    /// Drop the host's reference to a task
    pub(crate) fn release(&self, id: Uuid) {
        let Some(registry) = self.0.upgrade() else {
            return;
        };

        let removed = registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .remove(&id);

        if removed.is_some() {
            debug!(task = %id, "Released task from host");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubTask {
        id: Uuid,
        teardowns: AtomicUsize,
    }

    impl HostedTask for StubTask {
        fn id(&self) -> Uuid {
            self.id
        }

        fn on_host_teardown(&self) {
            self.teardowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stub() -> Arc<StubTask> {
        Arc::new(StubTask {
            id: Uuid::new_v4(),
            teardowns: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_shutdown_skips_unhooked_tasks() {
        let host = HostContext::new();
        let hooked = stub();
        let editor = stub();
        host.register(hooked.clone(), true);
        host.register(editor.clone(), false);

        assert_eq!(host.shutdown(), 1);
        assert_eq!(hooked.teardowns.load(Ordering::SeqCst), 1);
        assert_eq!(editor.teardowns.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_release_through_weak_link() {
        let host = HostContext::new();
        let task = stub();
        host.register(task.clone(), true);
        assert!(host.is_registered(task.id));

        let link = host.downgrade();
        link.release(task.id);
        assert!(host.is_empty());

        drop(host);
        // Releasing after the host is gone is a no-op
        link.release(task.id);
    }

    #[test]
    fn test_dropped_task_leaves_registry() {
        let host = HostContext::new();
        let kept = stub();
        let dropped = stub();
        let dropped_id = dropped.id;
        host.register(kept.clone(), false);
        host.register(dropped, false);

        assert_eq!(host.len(), 1);
        assert!(!host.is_registered(dropped_id));
        assert!(host.is_registered(kept.id));
        assert_eq!(host.shutdown(), 0);
    }
}
