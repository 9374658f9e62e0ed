#![forbid(unsafe_code)]

//! Replaying an edit script against live nodes.
//!
//! Child indices inside one `UpdateChildren` group are resolved against a
//! snapshot of the element's children taken before the group runs, so a
//! `Remove` at index 0 never shifts the target of a later `Recurse` at
//! index 2. `Add` always appends; the diff only emits it for the tail.
//!
//! Nodes that leave the tree through `Remove` or `Replace` are released,
//! listeners included, so stale handles into them fail loudly instead of
//! keeping detached subtrees alive.

use lframe_core::{Dom, NodeId};

use crate::diff::{AttrPatch, ChildPatch, Patch};
use crate::error::{RenderError, Result};
use crate::mount::{mount, remove_attribute, set_attribute};

/// Apply `patches` to `node`.
///
/// Returns the node standing in `node`'s place afterwards: `node` itself,
/// the replacement mounted by a `Replace`, or `None` after a `Remove`.
pub fn apply_patches(dom: &Dom, node: NodeId, patches: &[Patch<'_>]) -> Result<Option<NodeId>> {
    let mut current = node;
    for patch in patches {
        match patch {
            Patch::Replace(vnode) => {
                let parent = dom.parent(current)?.ok_or(RenderError::Detached {
                    node: current,
                    operation: "replace",
                })?;
                let fresh = mount(dom, vnode)?;
                dom.replace_child(parent, fresh, current)?;
                dom.release(current)?;
                tracing::trace!(old = %current, new = %fresh, "patch.replace");
                current = fresh;
            }
            Patch::Remove => {
                if dom.parent(current)?.is_none() {
                    return Err(RenderError::Detached {
                        node: current,
                        operation: "remove",
                    });
                }
                dom.release(current)?;
                tracing::trace!(node = %current, "patch.remove");
                return Ok(None);
            }
            Patch::UpdateAttrs(attrs) => {
                ensure_element(dom, current, "attribute")?;
                for attr in attrs {
                    match attr {
                        AttrPatch::Set { name, value } => set_attribute(dom, current, name, value)?,
                        AttrPatch::Remove { name } => remove_attribute(dom, current, name)?,
                    }
                }
            }
            Patch::UpdateChildren(children) => {
                ensure_element(dom, current, "children")?;
                apply_child_patches(dom, current, children)?;
            }
        }
    }
    Ok(Some(current))
}

fn apply_child_patches(dom: &Dom, parent: NodeId, patches: &[ChildPatch<'_>]) -> Result<()> {
    let snapshot = dom.children(parent)?;
    let at = |index: usize| {
        snapshot
            .get(index)
            .copied()
            .ok_or(RenderError::MissingChild {
                node: parent,
                index,
                len: snapshot.len(),
            })
    };
    for patch in patches {
        match patch {
            ChildPatch::Add { node, .. } => {
                let child = mount(dom, node)?;
                dom.append_child(parent, child)?;
            }
            ChildPatch::Remove { index } => {
                dom.release(at(*index)?)?;
            }
            ChildPatch::Recurse { index, patches } => {
                apply_patches(dom, at(*index)?, patches)?;
            }
        }
    }
    Ok(())
}

fn ensure_element(dom: &Dom, node: NodeId, patch: &'static str) -> Result<()> {
    if dom.is_text(node)? {
        return Err(RenderError::UnexpectedText { node, patch });
    }
    Ok(())
}
