#![forbid(unsafe_code)]

//! Virtual node model.
//!
//! A [`VNode`] is an immutable description of an element or a text node.
//! Views build a fresh tree on every render; nothing in this crate hands out
//! `&mut` access to a tree once it is built.
//!
//! # Invariants
//!
//! 1. The attribute named [`KEY_ATTR`] never appears in [`Attributes`]; the
//!    element constructors move it into [`Element::key`].
//! 2. Event listeners are an explicit [`AttrValue::Listener`] variant chosen
//!    when the node is built. Nothing downstream inspects attribute names to
//!    decide whether a value is a listener.
//! 3. Bare strings in a child list are normalized to [`VNode::Text`].

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::event::{Event, EventHandler};

/// Reconciliation metadata attribute. Never rendered.
pub const KEY_ATTR: &str = "key";

/// An attribute value.
#[derive(Debug, Clone)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
    Number(f64),
    Listener(EventHandler),
}

impl AttrValue {
    #[must_use]
    pub fn is_listener(&self) -> bool {
        matches!(self, Self::Listener(_))
    }

    /// Platform string form of a static value, as `setAttribute` would store
    /// it. Listeners have no string form.
    #[must_use]
    pub fn to_attribute_string(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Listener(_) => None,
        }
    }
}

/// Static values compare by value (NaN equals NaN so that an unchanged tree
/// diffs clean); listeners compare by identity.
impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Listener(a), Self::Listener(b)) => a.same_as(b),
            _ => false,
        }
    }
}

/// Number formatting compatible with the browser's `String(number)`.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // Exponent form, with an explicit sign on non-negative exponents.
        let formatted = format!("{n:e}");
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        }
    } else {
        n.to_string()
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<EventHandler> for AttrValue {
    fn from(value: EventHandler) -> Self {
        Self::Listener(value)
    }
}

/// Ordered attribute map. Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: IndexMap<String, AttrValue>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an attribute, keeping the original position when
    /// overwriting.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn take(&mut self, name: &str) -> Option<AttrValue> {
        self.entries.shift_remove(name)
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<AttrValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Attributes
where
    K: Into<String>,
    V: Into<AttrValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Element payload of a [`VNode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: String,
    attributes: Attributes,
    children: Vec<VNode>,
    key: Option<String>,
}

impl Element {
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub fn children(&self) -> &[VNode] {
        &self.children
    }

    /// Sibling identity hint. Carried through the tree but reconciliation
    /// matches children by index, not by key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// A virtual DOM node.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Element(Element),
    Text(String),
}

impl VNode {
    /// Build an element node.
    ///
    /// A `"key"` attribute is lifted into the element's key. Children accept
    /// anything convertible into a node, so `"text".into()` and nested nodes
    /// mix freely.
    #[must_use]
    pub fn element<C>(tag: impl Into<String>, attributes: impl Into<Attributes>, children: C) -> Self
    where
        C: IntoIterator,
        C::Item: Into<VNode>,
    {
        let mut attributes = attributes.into();
        let key = attributes
            .take(KEY_ATTR)
            .and_then(|value| value.to_attribute_string());
        Self::Element(Element {
            tag: tag.into(),
            attributes,
            children: children.into_iter().map(Into::into).collect(),
            key,
        })
    }

    /// Build a text node.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element(_))
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(content) => Some(content),
            Self::Element(_) => None,
        }
    }

    /// Tag name for elements, `None` for text.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.as_element().map(Element::tag)
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Text(_) => 1,
            Self::Element(el) => 1 + el.children.iter().map(Self::node_count).sum::<usize>(),
        }
    }

    /// Serialize to HTML. Listeners and keys are omitted, matching what
    /// [`Dom::to_html`](crate::dom::Dom::to_html) produces for a node
    /// mounted from this tree.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Self::Text(content) => out.push_str(&escape_text(content)),
            Self::Element(el) => {
                let _ = write!(out, "<{}", el.tag);
                for (name, value) in el.attributes.iter() {
                    if let Some(value) = value.to_attribute_string() {
                        let _ = write!(out, " {name}=\"{}\"", escape_attribute(&value));
                    }
                }
                out.push('>');
                for child in &el.children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
        }
    }
}

impl From<&str> for VNode {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for VNode {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Element> for VNode {
    fn from(value: Element) -> Self {
        Self::Element(value)
    }
}

pub(crate) fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn escape_attribute(raw: &str) -> String {
    escape_text(raw).replace('"', "&quot;")
}

/// Fluent element builder.
///
/// ```
/// use lframe_core::vnode::el;
///
/// let item = el("li")
///     .key("7")
///     .attr("class", "completed")
///     .on("click", |_| {})
///     .child("Buy milk")
///     .build();
/// assert_eq!(item.to_html(), r#"<li class="completed">Buy milk</li>"#);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct ElementBuilder {
    tag: String,
    attributes: Attributes,
    children: Vec<VNode>,
    key: Option<String>,
}

/// Start building an element with the given tag.
pub fn el(tag: impl Into<String>) -> ElementBuilder {
    ElementBuilder {
        tag: tag.into(),
        attributes: Attributes::new(),
        children: Vec::new(),
        key: None,
    }
}

impl ElementBuilder {
    /// Set a static attribute. A `"key"` name sets the element key instead.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let name = name.into();
        let value = value.into();
        if name == KEY_ATTR {
            self.key = value.to_attribute_string();
        } else {
            self.attributes.insert(name, value);
        }
        self
    }

    /// Set an attribute only when `condition` holds.
    pub fn attr_if(
        self,
        condition: bool,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Self {
        if condition { self.attr(name, value) } else { self }
    }

    /// Register a listener for `event` under the attribute `on<event>`.
    pub fn on(mut self, event: &str, callback: impl Fn(&Event) + 'static) -> Self {
        let handler = EventHandler::new(event, callback);
        self.attributes
            .insert(format!("on{}", handler.event_type()), AttrValue::Listener(handler));
        self
    }

    /// Register an existing handler. Reusing one handler across renders keeps
    /// the listener untouched by patching.
    pub fn handler(mut self, handler: EventHandler) -> Self {
        self.attributes
            .insert(format!("on{}", handler.event_type()), AttrValue::Listener(handler));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn build(self) -> VNode {
        VNode::Element(Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
            key: self.key,
        })
    }
}

impl From<ElementBuilder> for VNode {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_normalizes_string_children() {
        let node = VNode::element("div", [("class", "test")], ["Hello"]);
        let el = node.as_element().unwrap();
        assert_eq!(el.tag(), "div");
        assert_eq!(el.attributes().get("class"), Some(&AttrValue::from("test")));
        assert_eq!(el.children()[0].as_text(), Some("Hello"));
    }

    #[test]
    fn element_children_take_anything_that_becomes_a_node() {
        let labels = vec![String::from("one"), String::from("two")];
        let list = VNode::element("ul", Attributes::new(), labels);
        assert_eq!(list.to_html(), "<ul>onetwo</ul>");

        let nested = VNode::element("div", Attributes::new(), [el("b").child("x")]);
        assert_eq!(nested.to_html(), "<div><b>x</b></div>");
    }

    #[test]
    fn key_attribute_is_lifted_out_of_attributes() {
        let node = VNode::element("li", [("key", AttrValue::from(7)), ("id", "x".into())], Vec::<VNode>::new());
        let el = node.as_element().unwrap();
        assert_eq!(el.key(), Some("7"));
        assert!(!el.attributes().contains(KEY_ATTR));
        assert_eq!(el.attributes().len(), 1);

        let built = el_with_key();
        assert_eq!(built.as_element().unwrap().key(), Some("a"));
        assert!(built.as_element().unwrap().attributes().is_empty());
    }

    fn el_with_key() -> VNode {
        el("li").attr("key", "a").build()
    }

    #[test]
    fn discriminators() {
        let t = VNode::text("hi");
        let e = el("p").build();
        assert!(t.is_text() && !t.is_element());
        assert!(e.is_element() && !e.is_text());
        assert_eq!(e.tag(), Some("p"));
        assert_eq!(t.tag(), None);
    }

    #[test]
    fn listeners_are_tagged_at_construction() {
        let node = el("button").on("Click", |_| {}).build();
        let attrs = node.as_element().unwrap().attributes();
        let value = attrs.get("onclick").unwrap();
        assert!(value.is_listener());
        assert_eq!(value.to_attribute_string(), None);
    }

    #[test]
    fn platform_stringification() {
        assert_eq!(AttrValue::Bool(true).to_attribute_string().as_deref(), Some("true"));
        assert_eq!(AttrValue::Bool(false).to_attribute_string().as_deref(), Some("false"));
        assert_eq!(AttrValue::Number(1.0).to_attribute_string().as_deref(), Some("1"));
        assert_eq!(AttrValue::Number(2.5).to_attribute_string().as_deref(), Some("2.5"));
        assert_eq!(AttrValue::Number(-0.0).to_attribute_string().as_deref(), Some("0"));
        assert_eq!(AttrValue::Number(f64::NAN).to_attribute_string().as_deref(), Some("NaN"));
        assert_eq!(
            AttrValue::Number(f64::NEG_INFINITY).to_attribute_string().as_deref(),
            Some("-Infinity")
        );
        assert_eq!(AttrValue::Number(1e21).to_attribute_string().as_deref(), Some("1e+21"));
        assert_eq!(AttrValue::Number(-2.5e30).to_attribute_string().as_deref(), Some("-2.5e+30"));
        assert_eq!(AttrValue::Number(1e-7).to_attribute_string().as_deref(), Some("1e-7"));
        assert_eq!(AttrValue::Number(1.5e-7).to_attribute_string().as_deref(), Some("1.5e-7"));
        assert_eq!(AttrValue::Number(1e20).to_attribute_string().as_deref(), Some("100000000000000000000"));
        assert_eq!(AttrValue::Number(0.000001).to_attribute_string().as_deref(), Some("0.000001"));
    }

    #[test]
    fn nan_values_compare_equal() {
        assert_eq!(AttrValue::Number(f64::NAN), AttrValue::Number(f64::NAN));
        assert_ne!(AttrValue::Number(1.0), AttrValue::Text("1".into()));
    }

    #[test]
    fn html_escapes_text_and_attributes() {
        let node = el("a")
            .attr("title", "say \"hi\" & <bye>")
            .child("1 < 2")
            .build();
        assert_eq!(
            node.to_html(),
            r#"<a title="say &quot;hi&quot; &amp; &lt;bye&gt;">1 &lt; 2</a>"#
        );
    }

    #[test]
    fn node_count_includes_root() {
        let node = el("ul").child(el("li").child("a")).child(el("li").child("b")).build();
        assert_eq!(node.node_count(), 5);
    }
}
