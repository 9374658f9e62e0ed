#![forbid(unsafe_code)]

//! Core: virtual nodes, the headless platform DOM, and event dispatch.

pub mod dom;
pub mod error;
pub mod event;
pub mod vnode;

pub use dom::{Dom, NodeId};
pub use error::DomError;
pub use event::{DispatchOutcome, Event, EventHandler};
pub use vnode::{AttrValue, Attributes, Element, ElementBuilder, KEY_ATTR, VNode, el};
