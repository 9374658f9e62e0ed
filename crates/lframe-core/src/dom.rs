#![forbid(unsafe_code)]

//! Headless platform DOM.
//!
//! [`Dom`] is an in-process document: an arena of element and text nodes
//! addressed by generational [`NodeId`] handles. It provides exactly the
//! platform surface the renderer and patcher need (create, attach, detach,
//! attributes, listeners) plus event dispatch and HTML serialization for
//! inspection.
//!
//! # Design
//!
//! `Dom` is a cheap, clonable handle over `Rc<RefCell<..>>` storage. No borrow
//! is held while a listener runs, so listeners may freely mutate the document
//! (which is what a state change followed by a re-render does).
//!
//! # Invariants
//!
//! 1. A node has at most one parent, and the parent lists it exactly once.
//! 2. A released node's slot is recycled with a bumped generation, so stale
//!    handles are reported as [`DomError::StaleNode`] rather than aliasing a
//!    new node.
//! 3. Listeners bound through [`Dom::bind_listener`] are tracked per binding
//!    name; rebinding the same name replaces the previous listener.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{DomError, Result};
use crate::event::{DispatchOutcome, Event, EventHandler};
use crate::vnode::{escape_attribute, escape_text};

/// Handle to a node in a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Handle to a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug)]
struct Listener {
    id: ListenerId,
    handler: EventHandler,
}

#[derive(Debug)]
struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    listeners: Vec<Listener>,
    /// Binding name (e.g. `onclick`) -> listener registered by the renderer.
    bindings: IndexMap<String, ListenerId>,
}

#[derive(Debug)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Default)]
struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next_listener: u64,
    live: usize,
}

impl Document {
    fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(DomError::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(DomError::StaleNode(id))
    }

    fn element_mut(&mut self, id: NodeId, operation: &'static str) -> Result<&mut ElementData> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Ok(el),
            NodeData::Text(_) => Err(DomError::NotAnElement { node: id, operation }),
        }
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> Result<bool> {
        let mut cursor = Some(of);
        while let Some(id) = cursor {
            if id == candidate {
                return Ok(true);
            }
            cursor = self.node(id)?.parent;
        }
        Ok(false)
    }

    fn detach(&mut self, child: NodeId) -> Result<()> {
        if let Some(parent) = self.node_mut(child)?.parent.take() {
            let siblings = &mut self.node_mut(parent)?.children;
            siblings.retain(|&c| c != child);
        }
        Ok(())
    }

    /// Prepare `child` for insertion under `parent`: validate both handles,
    /// reject cycles and detach `child` from any previous parent.
    fn adopt(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.element_mut(parent, "children")?;
        self.node(child)?;
        if self.is_ancestor_or_self(child, parent)? {
            return Err(DomError::Cycle { parent, child });
        }
        self.detach(child)
    }

    fn release(&mut self, id: NodeId) -> Result<()> {
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                self.live -= 1;
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    fn write_html(&self, id: NodeId, out: &mut String) -> Result<()> {
        let node = self.node(id)?;
        match &node.data {
            NodeData::Text(content) => out.push_str(&escape_text(content)),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                for &child in &node.children {
                    self.write_html(child, out)?;
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
        Ok(())
    }
}

/// Shared handle to a headless document.
#[derive(Clone, Default)]
pub struct Dom {
    inner: Rc<RefCell<Document>>,
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = self.inner.borrow();
        f.debug_struct("Dom")
            .field("live_nodes", &doc.live)
            .field("slots", &doc.slots.len())
            .finish()
    }
}

impl Dom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether two handles refer to the same document.
    #[must_use]
    pub fn same_document(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Creation ────────────────────────────────────────────────────────

    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().alloc(NodeData::Element(ElementData {
            tag: tag.into(),
            attributes: IndexMap::new(),
            listeners: Vec::new(),
            bindings: IndexMap::new(),
        }))
    }

    pub fn create_text(&self, content: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().alloc(NodeData::Text(content.into()))
    }

    // ── Tree structure ──────────────────────────────────────────────────

    /// Append `child` as the last child of `parent`, moving it if it is
    /// attached elsewhere.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        doc.adopt(parent, child)?;
        doc.node_mut(child)?.parent = Some(parent);
        doc.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Insert `child` at `index` among `parent`'s children (clamped to the
    /// end).
    pub fn insert_child(&self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        doc.adopt(parent, child)?;
        doc.node_mut(child)?.parent = Some(parent);
        let children = &mut doc.node_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, child);
        Ok(())
    }

    /// Put `new` where `old` is under `parent`. `old` is detached but stays
    /// alive; see [`release`](Self::release).
    pub fn replace_child(&self, parent: NodeId, new: NodeId, old: NodeId) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        if doc.node(old)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old });
        }
        doc.adopt(parent, new)?;
        let children = &mut doc.node_mut(parent)?.children;
        let Some(pos) = children.iter().position(|&c| c == old) else {
            return Err(DomError::NotAChild { parent, child: old });
        };
        children[pos] = new;
        doc.node_mut(new)?.parent = Some(parent);
        doc.node_mut(old)?.parent = None;
        Ok(())
    }

    /// Detach `child` from `parent`. The node stays alive.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        doc.node(parent)?;
        if doc.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        doc.detach(child)
    }

    /// Detach `node` and free it together with its whole subtree. Every
    /// handle into the subtree becomes stale.
    pub fn release(&self, node: NodeId) -> Result<()> {
        self.inner.borrow_mut().release(node)
    }

    /// Release every child of `parent`.
    pub fn clear_children(&self, parent: NodeId) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        let children = doc.node(parent)?.children.clone();
        for child in children {
            doc.release(child)?;
        }
        Ok(())
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.inner.borrow().node(node)?.parent)
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.inner.borrow().node(node)?.children.clone())
    }

    pub fn child_at(&self, node: NodeId, index: usize) -> Result<Option<NodeId>> {
        Ok(self.inner.borrow().node(node)?.children.get(index).copied())
    }

    pub fn child_count(&self, node: NodeId) -> Result<usize> {
        Ok(self.inner.borrow().node(node)?.children.len())
    }

    #[must_use]
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.inner.borrow().node(node).is_ok()
    }

    /// Number of live (not released) nodes.
    #[must_use]
    pub fn live_nodes(&self) -> usize {
        self.inner.borrow().live
    }

    // ── Node data ───────────────────────────────────────────────────────

    /// Tag name, or `None` for a text node.
    pub fn tag(&self, node: NodeId) -> Result<Option<String>> {
        Ok(match &self.inner.borrow().node(node)?.data {
            NodeData::Element(el) => Some(el.tag.clone()),
            NodeData::Text(_) => None,
        })
    }

    pub fn is_text(&self, node: NodeId) -> Result<bool> {
        Ok(matches!(
            self.inner.borrow().node(node)?.data,
            NodeData::Text(_)
        ))
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, node: NodeId) -> Result<String> {
        let doc = self.inner.borrow();
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let n = doc.node(current)?;
            if let NodeData::Text(content) = &n.data {
                out.push_str(content);
            }
            stack.extend(n.children.iter().rev());
        }
        Ok(out)
    }

    pub fn set_text(&self, node: NodeId, content: impl Into<String>) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        match &mut doc.node_mut(node)?.data {
            NodeData::Text(existing) => {
                *existing = content.into();
                Ok(())
            }
            NodeData::Element(_) => Err(DomError::NotText(node)),
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
        Ok(match &self.inner.borrow().node(node)?.data {
            NodeData::Element(el) => el.attributes.get(name).cloned(),
            NodeData::Text(_) => None,
        })
    }

    pub fn attributes(&self, node: NodeId) -> Result<Vec<(String, String)>> {
        Ok(match &self.inner.borrow().node(node)?.data {
            NodeData::Element(el) => el
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            NodeData::Text(_) => Vec::new(),
        })
    }

    pub fn set_attribute(
        &self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        let el = doc.element_mut(node, "attributes")?;
        el.attributes.insert(name.into(), value.into());
        Ok(())
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<bool> {
        let mut doc = self.inner.borrow_mut();
        let el = doc.element_mut(node, "attributes")?;
        Ok(el.attributes.shift_remove(name).is_some())
    }

    // ── Listeners ───────────────────────────────────────────────────────

    pub fn add_listener(&self, node: NodeId, handler: EventHandler) -> Result<ListenerId> {
        let mut doc = self.inner.borrow_mut();
        let id = ListenerId(doc.next_listener);
        doc.next_listener += 1;
        doc.element_mut(node, "listeners")?
            .listeners
            .push(Listener { id, handler });
        Ok(id)
    }

    /// Remove a listener. Returns whether it was registered on `node`.
    pub fn remove_listener(&self, node: NodeId, id: ListenerId) -> Result<bool> {
        let mut doc = self.inner.borrow_mut();
        let el = doc.element_mut(node, "listeners")?;
        let before = el.listeners.len();
        el.listeners.retain(|l| l.id != id);
        Ok(el.listeners.len() != before)
    }

    /// Register `handler` under a binding name, replacing whatever listener
    /// was previously bound under that name.
    pub fn bind_listener(
        &self,
        node: NodeId,
        binding: impl Into<String>,
        handler: EventHandler,
    ) -> Result<ListenerId> {
        let binding = binding.into();
        let mut doc = self.inner.borrow_mut();
        let id = ListenerId(doc.next_listener);
        doc.next_listener += 1;
        let el = doc.element_mut(node, "listeners")?;
        if let Some(previous) = el.bindings.insert(binding, id) {
            el.listeners.retain(|l| l.id != previous);
        }
        el.listeners.push(Listener { id, handler });
        Ok(id)
    }

    /// Remove the listener bound under `binding`. Returns whether one existed.
    pub fn unbind_listener(&self, node: NodeId, binding: &str) -> Result<bool> {
        let mut doc = self.inner.borrow_mut();
        let el = doc.element_mut(node, "listeners")?;
        match el.bindings.shift_remove(binding) {
            Some(previous) => {
                el.listeners.retain(|l| l.id != previous);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of listeners for `event` registered directly on `node`.
    pub fn listener_count(&self, node: NodeId, event: &str) -> Result<usize> {
        Ok(match &self.inner.borrow().node(node)?.data {
            NodeData::Element(el) => el
                .listeners
                .iter()
                .filter(|l| l.handler.event_type() == event)
                .count(),
            NodeData::Text(_) => 0,
        })
    }

    /// Deliver `event` to `target` and bubble it up through its ancestors.
    ///
    /// The propagation path and the listener list of every node on it are
    /// captured before the first listener runs. Listeners added or removed
    /// during dispatch take effect for the next event.
    pub fn dispatch(&self, target: NodeId, event: &Event) -> Result<DispatchOutcome> {
        let path: Vec<(NodeId, Vec<EventHandler>)> = {
            let doc = self.inner.borrow();
            let mut path = Vec::new();
            let mut cursor = Some(target);
            while let Some(id) = cursor {
                let node = doc.node(id)?;
                let handlers = match &node.data {
                    NodeData::Element(el) => el
                        .listeners
                        .iter()
                        .filter(|l| l.handler.event_type() == event.kind())
                        .map(|l| l.handler.clone())
                        .collect(),
                    NodeData::Text(_) => Vec::new(),
                };
                path.push((id, handlers));
                cursor = node.parent;
            }
            path
        };

        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("dom.dispatch", event = event.kind(), %target).entered();

        event.set_target(target);
        let mut outcome = DispatchOutcome::default();
        for (node, handlers) in path {
            event.set_current_target(node);
            for handler in handlers {
                handler.call(event);
                outcome.handlers_called += 1;
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        outcome.propagation_stopped = event.is_propagation_stopped();
        outcome.default_prevented = event.is_default_prevented();
        Ok(outcome)
    }

    /// Attach a listener on `container` that fires `callback` only for events
    /// whose target (or an ancestor below `container`) matches `selector`.
    ///
    /// Supported selectors: `tag`, `#id`, `.class` and `tag.class`.
    pub fn delegate(
        &self,
        container: NodeId,
        selector: &str,
        event: &str,
        callback: impl Fn(&Event, NodeId) + 'static,
    ) -> Result<ListenerId> {
        // Weak: the listener lives inside the document it queries.
        let doc = Rc::downgrade(&self.inner);
        let selector = Selector::parse(selector);
        let handler = EventHandler::new(event, move |ev: &Event| {
            let Some(inner) = doc.upgrade() else {
                return;
            };
            let dom = Dom { inner };
            let Some(mut cursor) = ev.target() else {
                return;
            };
            loop {
                if cursor == container {
                    return;
                }
                if dom.matches_selector(cursor, &selector) {
                    callback(ev, cursor);
                    return;
                }
                match dom.parent(cursor) {
                    Ok(Some(parent)) => cursor = parent,
                    _ => return,
                }
            }
        });
        self.add_listener(container, handler)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Whether `node` matches a simple selector (`tag`, `#id`, `.class`,
    /// `tag.class`).
    pub fn matches(&self, node: NodeId, selector: &str) -> bool {
        self.matches_selector(node, &Selector::parse(selector))
    }

    fn matches_selector(&self, node: NodeId, selector: &Selector) -> bool {
        let doc = self.inner.borrow();
        let Ok(node) = doc.node(node) else {
            return false;
        };
        let NodeData::Element(el) = &node.data else {
            return false;
        };
        if let Some(tag) = &selector.tag
            && !el.tag.eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(id) = &selector.id
            && el.attributes.get("id") != Some(id)
        {
            return false;
        }
        if let Some(class) = &selector.class {
            let classes = el.attributes.get("class").map(String::as_str).unwrap_or("");
            if !classes.split_whitespace().any(|c| c == class) {
                return false;
            }
        }
        true
    }

    /// First node in `root`'s subtree (document order, `root` included) that
    /// matches `selector`.
    pub fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(root, selector)?.into_iter().next())
    }

    /// All nodes in `root`'s subtree matching `selector`, in document order.
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let selector = Selector::parse(selector);
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if self.matches_selector(current, &selector) {
                found.push(current);
            }
            stack.extend(self.children(current)?.into_iter().rev());
        }
        Ok(found)
    }

    /// Serialize `node`'s subtree to HTML.
    pub fn to_html(&self, node: NodeId) -> Result<String> {
        let mut out = String::new();
        self.inner.borrow().write_html(node, &mut out)?;
        Ok(out)
    }

    /// Serialize the children of `node` (its "inner HTML").
    pub fn inner_html(&self, node: NodeId) -> Result<String> {
        let doc = self.inner.borrow();
        let mut out = String::new();
        for &child in &doc.node(node)?.children {
            doc.write_html(child, &mut out)?;
        }
        Ok(out)
    }
}

#[derive(Debug, Default)]
struct Selector {
    tag: Option<String>,
    id: Option<String>,
    class: Option<String>,
}

impl Selector {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix('#') {
            return Self {
                id: Some(id.to_string()),
                ..Self::default()
            };
        }
        match raw.split_once('.') {
            Some((tag, class)) => Self {
                tag: (!tag.is_empty()).then(|| tag.to_string()),
                class: Some(class.to_string()),
                ..Self::default()
            },
            None => Self {
                tag: Some(raw.to_string()),
                ..Self::default()
            },
        }
    }
}
