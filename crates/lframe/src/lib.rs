#![forbid(unsafe_code)]

//! LightFrame public facade crate.
//!
//! Re-exports the workspace crates and adds the hyperscript helpers most
//! views are written with:
//!
//! ```
//! use lframe::prelude::*;
//!
//! let item = h("li", [("class", "completed")], ["Buy milk"]);
//! assert_eq!(item.to_html(), r#"<li class="completed">Buy milk</li>"#);
//! ```

use lframe_core::{AttrValue, Attributes, Event, EventHandler, VNode};

pub use lframe_core as core;
pub use lframe_render as render;
#[cfg(feature = "runtime")]
pub use lframe_runtime as runtime;

pub mod prelude {
    pub use crate::{h, on, text};
    pub use lframe_core::{AttrValue, Attributes, Dom, Event, NodeId, VNode, el};
    pub use lframe_render::{RenderReport, Root, diff};

    #[cfg(feature = "runtime")]
    pub use lframe_runtime::{
        Action, App, AppConfig, Component, ComponentHost, Navigation, RouteParams, Router, State,
        Store, Subscription, state_from,
    };
}

/// Build an element node from a tag, attributes and children.
///
/// A `"key"` attribute becomes the element key. Children may be nodes or
/// strings; strings become text nodes.
#[must_use]
pub fn h<C>(tag: &str, attributes: impl Into<Attributes>, children: C) -> VNode
where
    C: IntoIterator,
    C::Item: Into<VNode>,
{
    VNode::element(tag, attributes, children)
}

/// A text node.
#[must_use]
pub fn text(content: impl Into<String>) -> VNode {
    VNode::text(content)
}

/// A listener value for use in an [`h`] attribute list, stored under
/// `on<event>`.
///
/// ```
/// use lframe::prelude::*;
///
/// let button = h(
///     "button",
///     [("class", AttrValue::from("destroy")), ("onclick", on("click", |_| {}))],
///     Vec::<VNode>::new(),
/// );
/// assert_eq!(button.to_html(), r#"<button class="destroy"></button>"#);
/// ```
pub fn on(event: &str, callback: impl Fn(&Event) + 'static) -> AttrValue {
    AttrValue::Listener(EventHandler::new(event, callback))
}
