use lframe_core::{Dom, Event, NodeId, el};
use lframe_runtime::{
    App, AppConfig, MemoryStorage, Navigation, RouteParams, RuntimeError, Store, state_from,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn document_with(container_id: &str) -> (Dom, NodeId) {
    let dom = Dom::new();
    let body = dom.create_element("body");
    let header = dom.create_element("header");
    let app = dom.create_element("div");
    dom.set_attribute(app, "id", container_id).unwrap();
    dom.append_child(body, header).unwrap();
    dom.append_child(body, app).unwrap();
    (dom, body)
}

fn text(dom: &Dom, root: NodeId, selector: &str) -> Option<String> {
    dom.query_selector(root, selector)
        .unwrap()
        .map(|node| dom.text_content(node).unwrap())
}

#[test]
fn mounts_into_configured_container() {
    let (dom, body) = document_with("root");
    let config = AppConfig::new().with_container_id("root");
    let store = Store::new(state_from(json!({"title": "Inbox"})));
    let app = App::mount(&dom, body, config, store, |state| {
        let title = state["title"].as_str().unwrap_or_default().to_owned();
        el("h1").child(title).build()
    })
    .unwrap();

    let container = dom.query_selector(body, "#root").unwrap().unwrap();
    assert_eq!(app.container(), container);
    assert_eq!(dom.inner_html(container).unwrap(), "<h1>Inbox</h1>");
    assert!(app.last_report().unwrap().cold);
}

#[test]
fn missing_container_is_an_error() {
    let (dom, body) = document_with("app");
    let config = AppConfig::new().with_container_id("nope");
    let err = App::mount(&dom, body, config, Store::default(), |_| el("p").build()).unwrap_err();
    assert!(matches!(err, RuntimeError::ContainerNotFound(ref id) if id == "nope"));
    assert_eq!(err.to_string(), "mount target #nope not found");
}

#[test]
fn state_change_is_painted_before_set_state_returns() {
    let (dom, body) = document_with("app");
    let store = Store::new(state_from(json!({"n": 1})));
    let app = App::mount(&dom, body, AppConfig::new(), store.clone(), |state| {
        el("p").child(state["n"].to_string()).build()
    })
    .unwrap();

    let update = store.set_state(state_from(json!({"n": 2})));
    assert!(update.is_applied());
    assert_eq!(text(&dom, body, "p").as_deref(), Some("2"));
    let report = app.last_report().unwrap();
    assert!(!report.cold);
    assert_eq!(report.frame, 2);
}

#[test]
fn unmount_clears_and_detaches() {
    let (dom, body) = document_with("app");
    let store = Store::new(state_from(json!({"n": 1})));
    let app = App::mount(&dom, body, AppConfig::new(), store.clone(), |_| {
        el("p").child("hi").build()
    })
    .unwrap();
    let container = app.container();
    app.unmount().unwrap();

    assert_eq!(dom.child_count(container).unwrap(), 0);
    assert_eq!(store.subscriber_count(), 0);
    let _ = store.set_state(state_from(json!({"n": 2})));
    assert_eq!(dom.child_count(container).unwrap(), 0);
}

fn routed_app(initial_path: &str) -> (Dom, NodeId, App, lframe_runtime::Router) {
    let (dom, body) = document_with("app");
    let config = AppConfig::new().with_initial_path(initial_path);
    let store = config.store(state_from(json!({"isLoading": true})), MemoryStorage::new());
    let router = config
        .router(&store)
        .route("/", |_| el("h1").child("Home").build())
        .route("/users/:id", |params: &RouteParams| {
            el("h1")
                .child(format!("User {}", params["id"]))
                .build()
        })
        .build();

    let view_router = router.clone();
    let app = App::mount(&dom, body, config, store, move |_| {
        view_router.view().unwrap_or_else(|| el("div").build())
    })
    .unwrap();
    (dom, body, app, router)
}

#[test]
fn router_transitions_re_render_through_the_store() {
    let (dom, body, app, router) = routed_app("/users/7");
    assert_eq!(text(&dom, body, "h1").as_deref(), Some("User 7"));
    assert_eq!(app.store().get("currentRoute"), Some(json!("/users/7")));
    assert_eq!(app.store().get("isLoading"), Some(json!(false)));

    assert_eq!(router.navigate("/"), Navigation::Matched);
    assert_eq!(text(&dom, body, "h1").as_deref(), Some("Home"));

    assert_eq!(router.navigate("/missing"), Navigation::NotFound);
    assert_eq!(app.store().get("route404"), Some(json!(true)));
    assert_eq!(text(&dom, body, "h1").as_deref(), Some("404"));
    assert_eq!(
        text(&dom, body, "p").as_deref(),
        Some("Route \"/missing\" not found")
    );
    let home = dom.query_selector(body, "a.home-link").unwrap().unwrap();
    assert_eq!(dom.attribute(home, "href").unwrap().as_deref(), Some("#/"));

    assert_eq!(router.back(), Some(Navigation::Matched));
    assert_eq!(text(&dom, body, "h1").as_deref(), Some("Home"));
}

#[test]
fn listener_in_view_can_navigate() {
    let (dom, body) = document_with("app");
    let store = Store::default();
    let router = AppConfig::new()
        .router(&store)
        .route("/", |_| el("p").attr("class", "page").child("home").build())
        .route("/about", |_| el("p").attr("class", "page").child("about").build())
        .build();

    let weak = router.downgrade();
    let view_router = router.clone();
    let _app = App::mount(&dom, body, AppConfig::new(), store, move |_| {
        let weak = weak.clone();
        el("div")
            .child(el("button").attr("class", "nav").on("click", move |_| {
                if let Some(router) = weak.upgrade() {
                    let _ = router.navigate("/about");
                }
            }))
            .child(view_router.view().unwrap_or_else(|| el("p").build()))
            .build()
    })
    .unwrap();

    assert_eq!(text(&dom, body, ".page").as_deref(), Some("home"));
    let button = dom.query_selector(body, ".nav").unwrap().unwrap();
    dom.dispatch(button, &Event::new("click")).unwrap();
    assert_eq!(text(&dom, body, ".page").as_deref(), Some("about"));
    assert_eq!(router.location_hash(), "#/about");
}
