#![forbid(unsafe_code)]

//! Tree diffing.
//!
//! [`diff`] compares two virtual trees and produces the ordered edit script
//! that turns a DOM mounted from the old tree into one equivalent to a fresh
//! mount of the new tree. Patches borrow from both trees; nothing is cloned
//! until the patcher mounts replacement nodes.
//!
//! # Algorithm
//!
//! - Missing old node: `Replace(new)`. Missing new node: `Remove`.
//! - Two text nodes: `Replace` when the content differs, nothing otherwise.
//! - Different node kinds or different tags: `Replace`. There is no
//!   cross-tag diffing.
//! - Same tag: attribute patches (`UpdateAttrs`) followed by child patches
//!   (`UpdateChildren`); empty groups are omitted.
//!
//! Children are matched **by index**. Keys are carried on elements but not
//! consulted here. Inserting or removing an item in the middle of a list
//! therefore shows up as a modification of every later sibling plus an
//! `Add`/`Remove` at the tail, and any state living in those DOM nodes (focus,
//! listeners bound outside the render cycle) stays with the position, not
//! with the logical item.
//!
//! # Invariants
//!
//! 1. `diff(Some(v), Some(v))` is empty for every tree `v`.
//! 2. Applying `diff(old, new)` to a mount of `old` yields the same
//!    serialized DOM as mounting `new`.
//! 3. Output is deterministic: attribute patches follow old-key order, then
//!    new-only keys in insertion order; child patches follow index order.

use lframe_core::{AttrValue, Attributes, KEY_ATTR, VNode};

/// One instruction of the edit script.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<'a> {
    /// Swap the live node for a fresh mount of this tree.
    Replace(&'a VNode),
    /// Detach the live node from its parent.
    Remove,
    /// Attribute and listener changes on the live element.
    UpdateAttrs(Vec<AttrPatch<'a>>),
    /// Per-index child changes on the live element.
    UpdateChildren(Vec<ChildPatch<'a>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrPatch<'a> {
    Set { name: &'a str, value: &'a AttrValue },
    Remove { name: &'a str },
}

/// Child-level patch. `index` refers to the child list as it was before the
/// enclosing `UpdateChildren` group started applying.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildPatch<'a> {
    /// Mount and append a new child.
    Add { index: usize, node: &'a VNode },
    Remove { index: usize },
    Recurse { index: usize, patches: Vec<Patch<'a>> },
}

/// Compute the patches turning `old` into `new`.
#[must_use]
pub fn diff<'a>(old: Option<&'a VNode>, new: Option<&'a VNode>) -> Vec<Patch<'a>> {
    match (old, new) {
        (None, None) => Vec::new(),
        (None, Some(new)) => vec![Patch::Replace(new)],
        (Some(_), None) => vec![Patch::Remove],
        (Some(old), Some(new)) => diff_nodes(old, new),
    }
}

fn diff_nodes<'a>(old: &'a VNode, new: &'a VNode) -> Vec<Patch<'a>> {
    match (old, new) {
        (VNode::Text(a), VNode::Text(b)) => {
            if a == b {
                Vec::new()
            } else {
                vec![Patch::Replace(new)]
            }
        }
        (VNode::Element(a), VNode::Element(b)) if a.tag() == b.tag() => {
            let mut patches = Vec::new();
            let attrs = diff_attributes(a.attributes(), b.attributes());
            if !attrs.is_empty() {
                patches.push(Patch::UpdateAttrs(attrs));
            }
            let children = diff_children(a.children(), b.children());
            if !children.is_empty() {
                patches.push(Patch::UpdateChildren(children));
            }
            patches
        }
        _ => vec![Patch::Replace(new)],
    }
}

fn diff_attributes<'a>(old: &'a Attributes, new: &'a Attributes) -> Vec<AttrPatch<'a>> {
    let mut patches = Vec::new();
    for (name, old_value) in old.iter() {
        if name == KEY_ATTR {
            continue;
        }
        match new.get(name) {
            Some(value) if value != old_value => patches.push(AttrPatch::Set { name, value }),
            Some(_) => {}
            None => patches.push(AttrPatch::Remove { name }),
        }
    }
    for (name, value) in new.iter() {
        if name != KEY_ATTR && !old.contains(name) {
            patches.push(AttrPatch::Set { name, value });
        }
    }
    patches
}

fn diff_children<'a>(old: &'a [VNode], new: &'a [VNode]) -> Vec<ChildPatch<'a>> {
    let mut patches = Vec::new();
    for index in 0..old.len().max(new.len()) {
        match (old.get(index), new.get(index)) {
            (None, Some(node)) => patches.push(ChildPatch::Add { index, node }),
            (Some(_), None) => patches.push(ChildPatch::Remove { index }),
            (Some(a), Some(b)) => {
                let nested = diff_nodes(a, b);
                if !nested.is_empty() {
                    patches.push(ChildPatch::Recurse {
                        index,
                        patches: nested,
                    });
                }
            }
            (None, None) => unreachable!("index is below the longer length"),
        }
    }
    patches
}

/// Counts per patch kind, recursively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub replaces: usize,
    pub removes: usize,
    pub attr_sets: usize,
    pub attr_removes: usize,
    pub child_adds: usize,
    pub child_removes: usize,
}

impl DiffStats {
    #[must_use]
    pub fn of(patches: &[Patch<'_>]) -> Self {
        let mut stats = Self::default();
        stats.count(patches);
        stats
    }

    fn count(&mut self, patches: &[Patch<'_>]) {
        for patch in patches {
            match patch {
                Patch::Replace(_) => self.replaces += 1,
                Patch::Remove => self.removes += 1,
                Patch::UpdateAttrs(attrs) => {
                    for attr in attrs {
                        match attr {
                            AttrPatch::Set { .. } => self.attr_sets += 1,
                            AttrPatch::Remove { .. } => self.attr_removes += 1,
                        }
                    }
                }
                Patch::UpdateChildren(children) => {
                    for child in children {
                        match child {
                            ChildPatch::Add { .. } => self.child_adds += 1,
                            ChildPatch::Remove { .. } => self.child_removes += 1,
                            ChildPatch::Recurse { patches, .. } => self.count(patches),
                        }
                    }
                }
            }
        }
    }

    /// Total number of DOM-level operations the patch list performs.
    #[must_use]
    pub fn total(&self) -> usize {
        self.replaces
            + self.removes
            + self.attr_sets
            + self.attr_removes
            + self.child_adds
            + self.child_removes
    }
}
