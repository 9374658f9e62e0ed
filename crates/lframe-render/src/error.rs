#![forbid(unsafe_code)]

use lframe_core::{DomError, NodeId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

/// Contract violations surfaced by mounting, patching and reconciling.
///
/// None of these are recoverable at runtime: they mean the caller handed
/// the kernel a node that is gone, a container of the wrong kind, or a live
/// subtree that drifted from the tree it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("container {0} is a text node")]
    ContainerNotElement(NodeId),

    #[error("cannot {operation} node {node}: it has no parent")]
    Detached { node: NodeId, operation: &'static str },

    #[error("child patch targets index {index} of {node}, which has {len} children")]
    MissingChild { node: NodeId, index: usize, len: usize },

    #[error("{patch} patch applied to text node {node}")]
    UnexpectedText { node: NodeId, patch: &'static str },
}
