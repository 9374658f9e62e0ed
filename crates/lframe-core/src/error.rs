#![forbid(unsafe_code)]

//! Errors raised by the platform DOM.
//!
//! Every variant is a caller contract violation: a handle that no longer
//! refers to a live node, or an operation the node kind does not support.
//! These are never recovered from internally.

use thiserror::Error;

use crate::dom::NodeId;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node {0} is stale or was never created by this document")]
    StaleNode(NodeId),

    #[error("node {node} is a text node and cannot hold {operation}")]
    NotAnElement { node: NodeId, operation: &'static str },

    #[error("node {0} is an element, not a text node")]
    NotText(NodeId),

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}
