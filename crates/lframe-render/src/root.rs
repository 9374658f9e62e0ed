#![forbid(unsafe_code)]

//! Reconciling root for a single container.
//!
//! A [`Root`] remembers the tree it last rendered and the live node that tree
//! was mounted as. The first [`Root::render`] paints cold; every later call
//! diffs against the remembered tree and patches in place. The returned
//! [`RenderReport`] is the render-completion signal: once `render` returns,
//! the DOM reflects the new tree.
//!
//! # Failure Modes
//!
//! - **Live node gone** (the container was cleared behind the root's back):
//!   the next render falls back to a cold paint and logs a warning.
//! - **Patch failure**: the error is returned and the root forgets its
//!   previous tree, so the following render starts cold.

use lframe_core::{Dom, NodeId, VNode};

use crate::diff::{DiffStats, diff};
use crate::error::Result;
use crate::mount;
use crate::patch::apply_patches;

/// Outcome of one [`Root::render`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    /// 1-based render counter for this root.
    pub frame: u64,
    /// Number of top-level patches applied (0 on a cold paint).
    pub patches: usize,
    pub stats: DiffStats,
    /// Whether the frame was painted from scratch.
    pub cold: bool,
    /// Live node for the rendered tree.
    pub node: NodeId,
}

impl RenderReport {
    /// Whether the frame changed nothing in the DOM.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.cold && self.stats.total() == 0
    }
}

#[derive(Debug)]
struct Mounted {
    tree: VNode,
    node: NodeId,
}

/// Owns the render state of one container.
#[derive(Debug)]
pub struct Root {
    dom: Dom,
    container: NodeId,
    mounted: Option<Mounted>,
    frame: u64,
}

impl Root {
    #[must_use]
    pub fn new(dom: Dom, container: NodeId) -> Self {
        Self {
            dom,
            container,
            mounted: None,
            frame: 0,
        }
    }

    #[must_use]
    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    #[must_use]
    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Live node of the last rendered tree.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.mounted.as_ref().map(|m| m.node)
    }

    /// The last rendered tree.
    #[must_use]
    pub fn tree(&self) -> Option<&VNode> {
        self.mounted.as_ref().map(|m| &m.tree)
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Bring the container in line with `vnode`.
    pub fn render(&mut self, vnode: VNode) -> Result<RenderReport> {
        self.frame += 1;
        let frame = self.frame;
        let _span = tracing::debug_span!("reconcile", frame, container = %self.container).entered();

        let previous = self.mounted.take().filter(|m| {
            let alive = self.dom.is_alive(m.node)
                && matches!(self.dom.parent(m.node), Ok(Some(p)) if p == self.container);
            if !alive {
                tracing::warn!(node = %m.node, "mounted node left the container, repainting");
            }
            alive
        });

        let Some(previous) = previous else {
            let node = mount::render(&self.dom, &vnode, self.container)?;
            self.mounted = Some(Mounted { tree: vnode, node });
            tracing::debug!(cold = true, "render complete");
            return Ok(RenderReport {
                frame,
                patches: 0,
                stats: DiffStats::default(),
                cold: true,
                node,
            });
        };

        let (node, patches, stats) = {
            let patches = diff(Some(&previous.tree), Some(&vnode));
            let stats = DiffStats::of(&patches);
            let node = apply_patches(&self.dom, previous.node, &patches)?;
            (node, patches.len(), stats)
        };
        // Two present trees never diff to a bare `Remove`.
        let node = node.unwrap_or(previous.node);
        self.mounted = Some(Mounted { tree: vnode, node });
        tracing::debug!(
            cold = false,
            patches,
            replaces = stats.replaces,
            attr_sets = stats.attr_sets,
            child_adds = stats.child_adds,
            child_removes = stats.child_removes,
            "render complete"
        );
        Ok(RenderReport {
            frame,
            patches,
            stats,
            cold: false,
            node,
        })
    }

    /// Release whatever the root rendered and forget the previous tree.
    pub fn clear(&mut self) -> Result<()> {
        self.mounted = None;
        self.dom.clear_children(self.container)?;
        Ok(())
    }
}
