#![forbid(unsafe_code)]

//! Ordered callback registries with RAII subscriptions.
//!
//! Both [`Store`](crate::Store) and [`Router`](crate::Router) notify their
//! listeners through a [`Subscribers`] registry.
//!
//! # Invariants
//!
//! 1. Callbacks run in registration order.
//! 2. A callback that fails (returns `Err` or panics) is logged; the rest of
//!    the list still runs.
//! 3. No registry borrow is held while a callback runs, so callbacks may
//!    subscribe, unsubscribe or trigger another notification.
//! 4. A callback removed during a notification cycle is not called later in
//!    that cycle. One added during the cycle waits for the next one.
//! 5. Dropping a [`Subscription`] unsubscribes; unsubscribing twice is a
//!    no-op.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::error::SubscriberError;

type Callback<T> = Rc<RefCell<dyn FnMut(&T) -> Result<(), SubscriberError>>>;

struct Entry<T> {
    id: u64,
    callback: Callback<T>,
}

struct Registry<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

trait Detach {
    fn detach(&self, id: u64);
    fn is_attached(&self, id: u64) -> bool;
}

impl<T> Detach for RefCell<Registry<T>> {
    fn detach(&self, id: u64) {
        self.borrow_mut().entries.retain(|entry| entry.id != id);
    }

    fn is_attached(&self, id: u64) -> bool {
        self.borrow().entries.iter().any(|entry| entry.id == id)
    }
}

/// Counts from one notification cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Callbacks that returned `Ok`.
    pub notified: usize,
    /// Callbacks that returned `Err` or panicked.
    pub failed: usize,
}

/// Ordered list of callbacks receiving `&T`.
pub(crate) struct Subscribers<T> {
    inner: Rc<RefCell<Registry<T>>>,
    /// Label used in log records (`"store"`, `"router"`).
    source: &'static str,
}

impl<T: 'static> Subscribers<T> {
    pub(crate) fn new(source: &'static str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
            source,
        }
    }

    pub(crate) fn subscribe(
        &self,
        callback: impl FnMut(&T) -> Result<(), SubscriberError> + 'static,
    ) -> Subscription {
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Entry {
            id,
            callback: Rc::new(RefCell::new(callback)),
        });
        let weak: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.inner);
        let registry: Weak<dyn Detach> = weak;
        Subscription {
            registry: Some(registry),
            id,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Call every registered callback with `value`.
    pub(crate) fn notify(&self, value: &T) -> NotifyReport {
        let snapshot: Vec<(u64, Callback<T>)> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|entry| (entry.id, Rc::clone(&entry.callback)))
            .collect();

        let mut report = NotifyReport::default();
        for (id, callback) in snapshot {
            if !self.inner.is_attached(id) {
                continue;
            }
            let Ok(mut callback) = callback.try_borrow_mut() else {
                tracing::warn!(source = self.source, subscriber = id, "subscriber re-entered, skipping");
                continue;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| (&mut *callback)(value))) {
                Ok(Ok(())) => report.notified += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    tracing::error!(source = self.source, subscriber = id, error = %err, "subscriber failed");
                }
                Err(payload) => {
                    report.failed += 1;
                    tracing::error!(
                        source = self.source,
                        subscriber = id,
                        panic = panic_message(payload.as_ref()),
                        "subscriber panicked"
                    );
                }
            }
        }
        report
    }
}

impl<T> fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("source", &self.source)
            .field("len", &self.inner.borrow().entries.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// RAII guard for a registered callback.
///
/// Dropping the guard unsubscribes. Use [`forget`](Self::forget) to keep the
/// callback registered for as long as its source lives.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Option<Weak<dyn Detach>>,
    id: u64,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the callback. Calling this more than once does nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.detach(self.id);
        }
    }

    /// Whether the callback is still registered with a live source.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|registry| registry.is_attached(self.id))
    }

    /// Give up the guard without unsubscribing.
    pub fn forget(mut self) {
        self.registry = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
