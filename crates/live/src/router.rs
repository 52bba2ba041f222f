//! Subject-keyed fan-out of pushed updates.
//!
//! The registry is copy-on-write behind an [`ArcSwap`]: a dispatch pass works on the snapshot it
//! loaded, so listeners may register or unregister from inside their own callback without
//! deadlocking and without changing who is in the current pass. Each entry also carries an
//! `active` flag that is cleared on unregister, which keeps a listener removed mid-pass from
//! being called once its owner has let go of it.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;

use crate::error::{ListenerError, ListenerResult};
use crate::event::{SubjectId, UpdateEvent};

type Callback = Arc<dyn Fn(&UpdateEvent) -> ListenerResult + Send + Sync>;
type Registry = HashMap<SubjectId, Vec<Arc<ListenerEntry>>>;

/// Identifies one registration. Unregistering it more than once is harmless.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
    id: u64,
    subject_id: SubjectId,
}

impl RegistrationHandle {
    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }
}

/// Receives listener failures so they can be reported without interrupting delivery.
pub trait DeliveryObserver: Send + Sync {
    fn listener_failed(
        &self,
        handle: &RegistrationHandle,
        event: &UpdateEvent,
        error: &ListenerError,
    );
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DeliveryObserver for TracingObserver {
    fn listener_failed(
        &self,
        handle: &RegistrationHandle,
        event: &UpdateEvent,
        error: &ListenerError,
    ) {
        tracing::warn!(
            subject_id = %event.subject_id,
            kind = ?event.kind,
            registration = handle.id,
            error = %error,
            "update listener failed"
        );
    }
}

/// Outcome of one dispatch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
}

struct ListenerEntry {
    handle: RegistrationHandle,
    active: AtomicBool,
    callback: Callback,
}

struct RouterInner {
    listeners: ArcSwap<Registry>,
    next_id: AtomicU64,
    observer: Arc<dyn DeliveryObserver>,
}

/// Routes each update to every listener registered for its subject.
///
/// Cloning is cheap and every clone shares one registry, so a single router can be handed to
/// each rendered post that needs live content.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.listeners.load();
        formatter
            .debug_struct("EventRouter")
            .field("subjects", &registry.len())
            .finish()
    }
}

impl EventRouter {
    pub fn new() -> Self {
        Self::with_observer(Arc::new(TracingObserver))
    }

    pub fn with_observer(observer: Arc<dyn DeliveryObserver>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                listeners: ArcSwap::from_pointee(Registry::new()),
                next_id: AtomicU64::new(1),
                observer,
            }),
        }
    }

    /// Adds a listener for `subject_id`. Registrations for the same subject never collapse.
    pub fn register<F>(&self, subject_id: impl Into<SubjectId>, callback: F) -> RegistrationHandle
    where
        F: Fn(&UpdateEvent) -> ListenerResult + Send + Sync + 'static,
    {
        let handle = RegistrationHandle {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            subject_id: subject_id.into(),
        };
        let entry = Arc::new(ListenerEntry {
            handle: handle.clone(),
            active: AtomicBool::new(true),
            callback: Arc::new(callback),
        });

        self.inner.listeners.rcu(|current| {
            let mut next = Registry::clone(current);
            next.entry(handle.subject_id.clone())
                .or_default()
                .push(Arc::clone(&entry));
            next
        });

        tracing::trace!(subject_id = %handle.subject_id, registration = handle.id, "listener registered");
        handle
    }

    /// Like [`EventRouter::register`], but the returned guard unregisters when dropped.
    pub fn subscribe<F>(&self, subject_id: impl Into<SubjectId>, callback: F) -> Registration
    where
        F: Fn(&UpdateEvent) -> ListenerResult + Send + Sync + 'static,
    {
        let handle = self.register(subject_id, callback);
        Registration {
            router: Arc::downgrade(&self.inner),
            handle: Some(handle),
        }
    }

    /// Removes a registration. Returns `false` when it was already gone.
    pub fn unregister(&self, handle: &RegistrationHandle) -> bool {
        self.inner.unregister(handle)
    }

    /// Delivers `event` to the listeners registered for its subject when the pass starts.
    ///
    /// Events for subjects nobody listens to are dropped; nothing is buffered for late listeners.
    pub fn dispatch(&self, event: &UpdateEvent) -> DispatchSummary {
        let snapshot = self.inner.listeners.load_full();
        let Some(bucket) = snapshot.get(&event.subject_id) else {
            tracing::trace!(subject_id = %event.subject_id, "no listeners for update");
            return DispatchSummary::default();
        };

        let mut summary = DispatchSummary::default();
        for entry in bucket {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }

            summary.delivered += 1;
            if let Err(error) = invoke(entry, event) {
                summary.failed += 1;
                self.inner
                    .observer
                    .listener_failed(&entry.handle, event, &error);
            }
        }

        summary
    }

    pub fn listener_count(&self, subject_id: &SubjectId) -> usize {
        self.inner
            .listeners
            .load()
            .get(subject_id)
            .map_or(0, Vec::len)
    }
}

impl RouterInner {
    fn unregister(&self, handle: &RegistrationHandle) -> bool {
        let current = self.listeners.load();
        let Some(entry) = current
            .get(&handle.subject_id)
            .and_then(|bucket| bucket.iter().find(|entry| entry.handle.id == handle.id))
        else {
            return false;
        };

        // Flip the flag first so an in-flight pass skips this listener.
        if !entry.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        drop(current);

        self.listeners.rcu(|current| {
            let mut next = Registry::clone(current);
            if let Some(bucket) = next.get_mut(&handle.subject_id) {
                bucket.retain(|entry| entry.handle.id != handle.id);
                if bucket.is_empty() {
                    next.remove(&handle.subject_id);
                }
            }
            next
        });

        tracing::trace!(subject_id = %handle.subject_id, registration = handle.id, "listener unregistered");
        true
    }
}

fn invoke(entry: &ListenerEntry, event: &UpdateEvent) -> ListenerResult {
    match panic::catch_unwind(AssertUnwindSafe(|| (entry.callback)(event))) {
        Ok(result) => result,
        Err(payload) => Err(ListenerError::Panicked {
            stage: "dispatch-invoke-listener",
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A registration released on [`Registration::close`] or drop, whichever happens first.
pub struct Registration {
    router: Weak<RouterInner>,
    handle: Option<RegistrationHandle>,
}

impl Registration {
    pub fn handle(&self) -> Option<&RegistrationHandle> {
        self.handle.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Releases the registration. Later calls and the eventual drop do nothing.
    pub fn close(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        self.router
            .upgrade()
            .is_some_and(|router| router.unregister(&handle))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Registration")
            .field("handle", &self.handle)
            .finish()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.close();
    }
}
