#![forbid(unsafe_code)]

//! Turning virtual trees into platform nodes.
//!
//! Mounting never looks at a previous tree: every call creates fresh nodes.
//! [`render`] is the cold-start path and the fallback for `Replace` patches.

use lframe_core::{AttrValue, Dom, KEY_ATTR, NodeId, VNode};

use crate::error::{RenderError, Result};

/// Create platform nodes for `vnode` and its whole subtree.
///
/// The returned node is detached; the caller decides where it goes.
pub fn mount(dom: &Dom, vnode: &VNode) -> Result<NodeId> {
    match vnode {
        VNode::Text(content) => Ok(dom.create_text(content.as_str())),
        VNode::Element(el) => {
            let node = dom.create_element(el.tag());
            let filled = fill_element(dom, node, vnode);
            if let Err(err) = filled {
                dom.release(node)?;
                return Err(err);
            }
            Ok(node)
        }
    }
}

fn fill_element(dom: &Dom, node: NodeId, vnode: &VNode) -> Result<()> {
    let Some(el) = vnode.as_element() else {
        return Ok(());
    };
    for (name, value) in el.attributes().iter() {
        if name == KEY_ATTR {
            continue;
        }
        match value {
            AttrValue::Listener(handler) => {
                dom.bind_listener(node, name, handler.clone())?;
            }
            other => {
                if let Some(text) = other.to_attribute_string() {
                    dom.set_attribute(node, name, text)?;
                }
            }
        }
    }
    for child in el.children() {
        let child_node = mount(dom, child)?;
        dom.append_child(node, child_node)?;
    }
    Ok(())
}

/// Clear `container` and mount `vnode` as its only child.
///
/// This throws away whatever the container held, listeners included.
pub fn render(dom: &Dom, vnode: &VNode, container: NodeId) -> Result<NodeId> {
    if dom.tag(container)?.is_none() {
        return Err(RenderError::ContainerNotElement(container));
    }
    let _span = tracing::debug_span!(
        "render.cold",
        %container,
        nodes = vnode.node_count()
    )
    .entered();
    dom.clear_children(container)?;
    let node = mount(dom, vnode)?;
    dom.append_child(container, node)?;
    Ok(node)
}

/// Apply one attribute to a live element, switching between listener and
/// static form when the kind of value under `name` changed.
pub(crate) fn set_attribute(dom: &Dom, node: NodeId, name: &str, value: &AttrValue) -> Result<()> {
    if name == KEY_ATTR {
        return Ok(());
    }
    match value {
        AttrValue::Listener(handler) => {
            dom.remove_attribute(node, name)?;
            dom.bind_listener(node, name, handler.clone())?;
        }
        other => {
            dom.unbind_listener(node, name)?;
            match other.to_attribute_string() {
                Some(text) => dom.set_attribute(node, name, text)?,
                None => {
                    dom.remove_attribute(node, name)?;
                }
            }
        }
    }
    Ok(())
}

/// Remove an attribute or the listener bound under `name`.
pub(crate) fn remove_attribute(dom: &Dom, node: NodeId, name: &str) -> Result<()> {
    if !dom.unbind_listener(node, name)? {
        dom.remove_attribute(node, name)?;
    }
    Ok(())
}
