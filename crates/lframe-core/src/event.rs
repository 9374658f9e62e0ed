#![forbid(unsafe_code)]

//! DOM events and listener handles.
//!
//! Dispatch is deliberately basic: an [`Event`] is delivered to listeners on
//! the target node and then bubbles through its ancestors until a listener
//! calls [`Event::stop_propagation`]. There is no capture phase and no
//! synthetic event pooling.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::dom::NodeId;

/// An event travelling through the document.
#[derive(Debug, Clone)]
pub struct Event {
    kind: String,
    value: Option<String>,
    target: Cell<Option<NodeId>>,
    current_target: Cell<Option<NodeId>>,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl Event {
    /// Create an event of the given type (`"click"`, `"input"`, ...).
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: None,
            target: Cell::new(None),
            current_target: Cell::new(None),
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    /// Attach a payload, e.g. the text of an input field or the key pressed.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Node the event was dispatched on. `None` before dispatch.
    #[must_use]
    pub fn target(&self) -> Option<NodeId> {
        self.target.get()
    }

    /// Node whose listener is currently running.
    #[must_use]
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    #[must_use]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub(crate) fn set_target(&self, node: NodeId) {
        self.target.set(Some(node));
    }

    pub(crate) fn set_current_target(&self, node: NodeId) {
        self.current_target.set(Some(node));
    }
}

/// A listener bound to one event type.
///
/// Handlers compare by identity: two handlers are equal only when they share
/// the same callback allocation. A view that builds a fresh closure on every
/// render therefore produces a "changed" handler each time, and the patcher
/// swaps the listener.
#[derive(Clone)]
pub struct EventHandler {
    event: Rc<str>,
    callback: Rc<dyn Fn(&Event)>,
}

impl EventHandler {
    #[must_use]
    pub fn new(event: impl AsRef<str>, callback: impl Fn(&Event) + 'static) -> Self {
        Self {
            event: Rc::from(event.as_ref().to_ascii_lowercase()),
            callback: Rc::new(callback),
        }
    }

    /// The event type this handler listens for, lowercased.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event
    }

    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }

    /// Identity comparison on the callback allocation.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.event == other.event
            && std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("event", &&*self.event)
            .field("callback", &Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// Summary of one [`Dom::dispatch`](crate::dom::Dom::dispatch) call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Number of listener callbacks invoked.
    pub handlers_called: usize,
    pub propagation_stopped: bool,
    pub default_prevented: bool,
}
