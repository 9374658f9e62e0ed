#![forbid(unsafe_code)]

//! Reactive application state.
//!
//! A [`Store`] holds a JSON object, notifies subscribers synchronously after
//! every change and, when built with [`Store::persistent`], writes the whole
//! object to a [`Storage`] backend on every change.
//!
//! # Invariants
//!
//! 1. Reads return copies; state only changes through `set_state`, `update`,
//!    `dispatch` or `replace_state`.
//! 2. `version` increments exactly once per applied change.
//! 3. Subscribers are notified in registration order with the new state,
//!    after persistence has been attempted.
//! 4. A change requested while another one is in progress (from inside an
//!    `update` closure or from a subscriber) is dropped
//!    ([`StateUpdate::Dropped`]) and logged. Work that must follow the
//!    current change goes through [`Store::defer`].
//!
//! # Failure Modes
//!
//! - **Storage write fails** (quota, I/O): logged at `warn`, the in-memory
//!   change and the notification still happen.
//! - **Persisted value unreadable** on construction (I/O, invalid JSON, not
//!   an object): logged at `warn`, the store starts from the given initial
//!   state.
//! - **Subscriber fails or panics**: logged at `error`, counted in
//!   [`StateUpdate::Applied::failed`]; the other subscribers still run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::action::{Action, merge};
use crate::error::{StorageError, SubscriberError};
use crate::storage::Storage;
use crate::subscribers::{NotifyReport, Subscribers, Subscription};

/// Application state: an ordered JSON object.
pub type State = serde_json::Map<String, Value>;

/// Outcome of a state change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum StateUpdate {
    /// The change was applied and subscribers were notified.
    Applied {
        version: u64,
        notified: usize,
        failed: usize,
    },
    /// The request arrived while another change was in progress and was
    /// ignored.
    Dropped,
}

impl StateUpdate {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

struct Persistence {
    key: String,
    storage: Box<dyn Storage>,
}

struct StoreInner {
    state: RefCell<State>,
    version: Cell<u64>,
    updating: Cell<bool>,
    deferred: RefCell<Vec<Box<dyn FnOnce()>>>,
    persistence: Option<Persistence>,
    subscribers: Subscribers<State>,
}

/// Shared handle to a state container.
///
/// Cloning a `Store` creates a new handle to the **same** state.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.inner.state.borrow())
            .field("version", &self.inner.version.get())
            .field(
                "persistence_key",
                &self.inner.persistence.as_ref().map(|p| p.key.as_str()),
            )
            .field("subscribers", &self.inner.subscribers)
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(State::new())
    }
}

impl Store {
    /// In-memory store starting from `initial`.
    #[must_use]
    pub fn new(initial: State) -> Self {
        Self::build(initial, None)
    }

    /// Store persisted under `key` in `storage`.
    ///
    /// A readable JSON object already stored under `key` replaces `initial`.
    pub fn persistent(
        initial: State,
        key: impl Into<String>,
        storage: impl Storage + 'static,
    ) -> Self {
        let key = key.into();
        let state = match load(&storage, &key) {
            Ok(Some(saved)) => {
                tracing::debug!(key = %key, "restored persisted state");
                saved
            }
            Ok(None) => initial,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "ignoring unreadable persisted state");
                initial
            }
        };
        Self::build(
            state,
            Some(Persistence {
                key,
                storage: Box::new(storage),
            }),
        )
    }

    fn build(state: State, persistence: Option<Persistence>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(state),
                version: Cell::new(0),
                updating: Cell::new(false),
                deferred: RefCell::new(Vec::new()),
                persistence,
                subscribers: Subscribers::new("store"),
            }),
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn get_state(&self) -> State {
        self.inner.state.borrow().clone()
    }

    /// Borrow the current state for the duration of `f`.
    ///
    /// `f` must not change the store.
    pub fn with_state<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Copy of one top-level value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.borrow().get(key).cloned()
    }

    /// Number of applied changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    #[must_use]
    pub fn persistence_key(&self) -> Option<&str> {
        self.inner.persistence.as_ref().map(|p| p.key.as_str())
    }

    /// Whether a change is being computed or its subscribers notified.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.inner.updating.get()
    }

    /// Run `task` once the change in progress has been applied and every
    /// subscriber notified, or right away when the store is idle.
    ///
    /// Deferred tasks run in the order they were queued and may change the
    /// store.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        if self.inner.updating.get() {
            self.inner.deferred.borrow_mut().push(Box::new(task));
        } else {
            task();
        }
    }

    /// Shallow-merge `partial` into the state, persist, then notify.
    pub fn set_state(&self, partial: State) -> StateUpdate {
        self.commit("set_state", |state| merge(state, &partial))
    }

    /// Replace the state with what `f` returns.
    pub fn update(&self, f: impl FnOnce(&State) -> State) -> StateUpdate {
        self.commit("update", f)
    }

    /// Replace the whole state.
    pub fn replace_state(&self, state: State) -> StateUpdate {
        self.commit("replace_state", move |_| state)
    }

    /// Apply a named transition.
    pub fn dispatch(&self, action: Action) -> StateUpdate {
        if let Action::Custom {
            name,
            transform: None,
        } = &action
        {
            tracing::debug!(action = %name, "custom action without a transform leaves state untouched");
        }
        let name = action.name().to_owned();
        self.commit(&name, |state| action.apply(state))
    }

    fn commit(&self, reason: &str, next: impl FnOnce(&State) -> State) -> StateUpdate {
        if self.inner.updating.get() {
            tracing::warn!(reason, "state update requested during another update, dropping it");
            return StateUpdate::Dropped;
        }
        let update = {
            let _updating = UpdatingGuard::enter(&self.inner.updating);
            let _span = tracing::debug_span!("store.set_state", reason).entered();

            // `next` may read the store, so no borrow is held while it runs.
            let snapshot = next(&self.get_state());
            *self.inner.state.borrow_mut() = snapshot.clone();
            let version = self.inner.version.get() + 1;
            self.inner.version.set(version);
            self.persist(&snapshot);

            let NotifyReport { notified, failed } = self.inner.subscribers.notify(&snapshot);
            tracing::debug!(version, notified, failed, "state updated");
            StateUpdate::Applied {
                version,
                notified,
                failed,
            }
        };
        self.run_deferred();
        update
    }

    fn run_deferred(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.inner.deferred.borrow_mut());
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                task();
            }
        }
    }

    fn persist(&self, state: &State) {
        let Some(persistence) = &self.inner.persistence else {
            return;
        };
        let result = serde_json::to_string(state)
            .map_err(|source| StorageError::Json {
                key: persistence.key.clone(),
                source,
            })
            .and_then(|json| persistence.storage.set_item(&persistence.key, &json));
        if let Err(err) = result {
            tracing::warn!(key = %persistence.key, error = %err, "failed to persist state");
        }
    }

    /// Delete the persisted copy of the state, if any. The in-memory state
    /// is left untouched.
    pub fn clear_persisted(&self) -> Result<(), StorageError> {
        match &self.inner.persistence {
            Some(persistence) => persistence.storage.remove_item(&persistence.key),
            None => Ok(()),
        }
    }

    /// Register `callback` for every applied change.
    pub fn subscribe(&self, mut callback: impl FnMut(&State) + 'static) -> Subscription {
        self.inner.subscribers.subscribe(move |state| {
            callback(state);
            Ok(())
        })
    }

    /// Register a fallible callback. An `Err` is logged and counted as a
    /// failure; it does not affect other subscribers.
    pub fn try_subscribe(
        &self,
        callback: impl FnMut(&State) -> Result<(), SubscriberError> + 'static,
    ) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

/// Clears the in-progress flag even if `next` or a subscriber unwinds.
struct UpdatingGuard<'a>(&'a Cell<bool>);

impl<'a> UpdatingGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for UpdatingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn load(storage: &dyn Storage, key: &str) -> Result<Option<State>, StorageError> {
    let Some(raw) = storage.get_item(key)? else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(&raw).map_err(|source| StorageError::Json {
        key: key.to_owned(),
        source,
    })?;
    match value {
        Value::Object(state) => Ok(Some(state)),
        _ => Err(StorageError::NotAnObject {
            key: key.to_owned(),
        }),
    }
}

/// Build a [`State`] from a `serde_json::json!` object literal.
///
/// Non-object values produce an empty state.
#[must_use]
pub fn state_from(value: Value) -> State {
    match value {
        Value::Object(map) => map,
        _ => State::new(),
    }
}
