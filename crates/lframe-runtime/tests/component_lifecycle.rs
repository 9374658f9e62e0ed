use std::cell::RefCell;
use std::rc::Rc;

use lframe_core::{Dom, Event, VNode, el};
use lframe_runtime::{Component, ComponentHost, State, Store, state_from};
use pretty_assertions::assert_eq;
use serde_json::json;

#[derive(Default)]
struct Calls {
    mounted: usize,
    unmounted: usize,
}

struct Counter {
    store: Store,
    calls: Rc<RefCell<Calls>>,
}

impl Component for Counter {
    type Props = String;

    fn view(&self, label: &String, state: &State) -> VNode {
        let count = state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
        let store = self.store.clone();
        el("div")
            .attr("class", "counter")
            .child(el("span").attr("class", "label").child(label.clone()))
            .child(el("span").attr("class", "count").child(count.to_string()))
            .child(
                el("button")
                    .attr("class", "increment")
                    .on("click", move |_| {
                        let _ = store.update(|state| {
                            let mut next = state.clone();
                            let count = state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
                            next.insert("count".into(), json!(count + 1));
                            next
                        });
                    })
                    .child("+"),
            )
            .build()
    }

    fn on_mount(&mut self) {
        self.calls.borrow_mut().mounted += 1;
    }

    fn on_unmount(&mut self) {
        self.calls.borrow_mut().unmounted += 1;
    }
}

fn text_of(dom: &Dom, root: lframe_core::NodeId, selector: &str) -> String {
    let node = dom.query_selector(root, selector).unwrap().unwrap();
    dom.text_content(node).unwrap()
}

fn mount_counter() -> (Dom, lframe_core::NodeId, ComponentHost<Counter>, Rc<RefCell<Calls>>) {
    let dom = Dom::new();
    let container = dom.create_element("main");
    let store = Store::new(state_from(json!({"count": 0})));
    let calls = Rc::new(RefCell::new(Calls::default()));
    let counter = Counter {
        store: store.clone(),
        calls: Rc::clone(&calls),
    };
    let host =
        ComponentHost::mount_with_store(&dom, container, counter, "Clicks".to_owned(), store)
            .unwrap();
    (dom, container, host, calls)
}

#[test]
fn mount_renders_then_calls_on_mount_once() {
    let (dom, container, host, calls) = mount_counter();
    assert_eq!(calls.borrow().mounted, 1);
    assert_eq!(calls.borrow().unmounted, 0);
    host.with_component(|counter| assert_eq!(counter.store.version(), host.store().version()));
    assert_eq!(text_of(&dom, container, ".count"), "0");
    assert_eq!(text_of(&dom, container, ".label"), "Clicks");
    assert!(host.last_report().unwrap().cold);
    assert_eq!(dom.child_count(container).unwrap(), 1);
}

#[test]
fn click_updates_store_and_patches_in_place() {
    let (dom, container, host, _calls) = mount_counter();
    let view_node = host.node().unwrap();
    let button = dom.query_selector(container, ".increment").unwrap().unwrap();

    dom.dispatch(button, &Event::new("click")).unwrap();
    assert_eq!(host.store().get("count"), Some(json!(1)));
    assert_eq!(text_of(&dom, container, ".count"), "1");

    let report = host.last_report().unwrap();
    assert!(!report.cold);
    assert!(report.patches > 0);
    // The same element was patched, not replaced.
    assert_eq!(host.node(), Some(view_node));

    // The rebound listener is the fresh closure; one click, one increment.
    let button = dom.query_selector(container, ".increment").unwrap().unwrap();
    assert_eq!(dom.listener_count(button, "click").unwrap(), 1);
    dom.dispatch(button, &Event::new("click")).unwrap();
    assert_eq!(text_of(&dom, container, ".count"), "2");
}

#[test]
fn set_state_re_renders_before_returning() {
    let (dom, container, host, _calls) = mount_counter();
    let update = host.set_state(state_from(json!({"count": 41})));
    assert!(update.is_applied());
    assert_eq!(text_of(&dom, container, ".count"), "41");
}

#[test]
fn set_props_renders_new_label() {
    let (dom, container, host, _calls) = mount_counter();
    let report = host.set_props("Taps".to_owned()).unwrap();
    assert!(!report.cold);
    assert_eq!(text_of(&dom, container, ".label"), "Taps");
    assert_eq!(text_of(&dom, container, ".count"), "0");
}

#[test]
fn unmount_clears_container_and_stops_following_store() {
    let (dom, container, host, calls) = mount_counter();
    let store = host.store().clone();
    assert_eq!(store.subscriber_count(), 1);

    host.unmount().unwrap();
    assert_eq!(calls.borrow().unmounted, 1);
    assert_eq!(dom.child_count(container).unwrap(), 0);
    assert_eq!(store.subscriber_count(), 0);

    let _ = store.set_state(state_from(json!({"count": 9})));
    assert_eq!(dom.child_count(container).unwrap(), 0);
}

struct Greeting;

impl Component for Greeting {
    type Props = ();

    fn view(&self, _: &(), state: &State) -> VNode {
        let name = state.get("name").and_then(|v| v.as_str()).unwrap_or("world");
        el("p").child(format!("Hello, {name}!")).build()
    }
}

#[test]
fn mount_with_private_store() {
    let dom = Dom::new();
    let container = dom.create_element("section");
    let host =
        ComponentHost::mount(&dom, container, Greeting, (), state_from(json!({"name": "Ada"})))
            .unwrap();
    assert_eq!(dom.inner_html(container).unwrap(), "<p>Hello, Ada!</p>");

    let _ = host.set_state(state_from(json!({"name": "Grace"})));
    assert_eq!(dom.inner_html(container).unwrap(), "<p>Hello, Grace!</p>");
}
