#![forbid(unsafe_code)]

//! Hash-based router with dynamic segments and a not-found fallback.
//!
//! The router is a two-state machine: a path either matches one of the
//! registered [`RoutePattern`]s (first match in registration order wins) or
//! it does not, in which case the router is in the 404 state and the
//! attempted path is exposed as the `requestedPath` parameter.
//!
//! Transitions are triggered by [`Router::navigate`], by the platform's hash
//! change ([`Router::handle_hash_change`]) and by [`Router::back`] /
//! [`Router::forward`]. Each transition:
//!
//! 1. updates the current route and the history,
//! 2. if a [`Store`] is attached, issues exactly one `set_state` with
//!    `currentRoute`, `routeParams`, `route404` and `isLoading: false`,
//! 3. notifies router subscribers.
//!
//! Navigating to the path that is already current is a no-op and returns
//! [`Navigation::Unchanged`]; [`Router::refresh`] re-runs matching anyway.
//!
//! A transition requested while the attached store is computing or
//! announcing a change (a store subscriber redirecting, say) cannot reach the
//! store yet. It is queued with [`Store::defer`], runs once the store is idle,
//! and the request returns [`Navigation::Deferred`]. The router and the store
//! therefore never disagree about the current route. When a queued transition
//! overtakes the one that was in flight, router subscribers only hear about
//! the newer route.

mod history;
mod pattern;

pub use history::History;
pub use pattern::{RouteParams, RoutePattern, path_segments};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use lframe_core::{VNode, el};
use serde_json::{Value, json};

use crate::error::SubscriberError;
use crate::store::{Store, StateUpdate, state_from};
use crate::subscribers::{Subscribers, Subscription};

/// Builds the view for a matched route from its parameters.
pub type RouteHandler = Rc<dyn Fn(&RouteParams) -> VNode>;

/// Parameter carrying the unmatched path in the 404 state.
pub const REQUESTED_PATH: &str = "requestedPath";

/// Where the router currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentRoute {
    pub path: String,
    /// Pattern that matched, `None` in the 404 state.
    pub pattern: Option<String>,
    pub params: RouteParams,
    pub is_404: bool,
}

impl CurrentRoute {
    /// Route parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Navigation {
    Matched,
    NotFound,
    /// The path was already current; nothing happened.
    Unchanged,
    /// The store was busy; the transition runs as soon as it is idle.
    Deferred,
}

/// Transition waiting for a busy store.
#[derive(Debug)]
enum Pending {
    Navigate(String),
    Back,
    Forward,
    Refresh,
}

struct Route {
    pattern: RoutePattern,
    handler: RouteHandler,
}

struct RouterState {
    routes: Vec<Route>,
    not_found: Option<RouteHandler>,
    store: Option<Store>,
    history: History,
    current: Option<CurrentRoute>,
}

struct Shared {
    state: RefCell<RouterState>,
    subscribers: Subscribers<CurrentRoute>,
}

/// Shared handle to a router. Clones drive the same router.
#[derive(Clone)]
pub struct Router {
    shared: Rc<Shared>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Router")
            .field(
                "routes",
                &state.routes.iter().map(|r| r.pattern.as_str()).collect::<Vec<_>>(),
            )
            .field("current", &state.current)
            .field("history", &state.history)
            .field("store", &state.store.is_some())
            .finish()
    }
}

impl Router {
    /// Create a router and run the initial transition to `/`.
    pub fn new<I, P>(routes: I, not_found: Option<RouteHandler>, store: Option<Store>) -> Self
    where
        I: IntoIterator<Item = (P, RouteHandler)>,
        P: AsRef<str>,
    {
        let mut builder = RouterBuilder::default();
        for (pattern, handler) in routes {
            builder.routes.push(Route {
                pattern: RoutePattern::parse(pattern.as_ref()),
                handler,
            });
        }
        builder.not_found = not_found;
        builder.store = store;
        builder.build()
    }

    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Register another route. It has the lowest precedence so far.
    pub fn add_route(&self, pattern: &str, handler: impl Fn(&RouteParams) -> VNode + 'static) {
        self.shared.state.borrow_mut().routes.push(Route {
            pattern: RoutePattern::parse(pattern),
            handler: Rc::new(handler),
        });
    }

    /// Go to `path`, pushing a history entry.
    pub fn navigate(&self, path: &str) -> Navigation {
        let path = normalize(path);
        if let Some(store) = self.busy_store() {
            self.defer(&store, Pending::Navigate(path));
            return Navigation::Deferred;
        }
        if self.is_current(&path) {
            tracing::trace!(path = %path, "navigation to the current path ignored");
            return Navigation::Unchanged;
        }
        self.transition(path, true)
    }

    /// React to the platform's `hashchange`: `#/about` navigates to `/about`,
    /// an empty hash to `/`.
    pub fn handle_hash_change(&self, hash: &str) -> Navigation {
        self.navigate(hash.strip_prefix('#').unwrap_or(hash))
    }

    /// Step back in history. `None` at the oldest entry.
    pub fn back(&self) -> Option<Navigation> {
        if let Some(store) = self.busy_store() {
            if !self.can_go_back() {
                return None;
            }
            self.defer(&store, Pending::Back);
            return Some(Navigation::Deferred);
        }
        let path = self.shared.state.borrow_mut().history.back()?.to_owned();
        Some(self.transition(path, false))
    }

    /// Step forward in history. `None` at the newest entry.
    pub fn forward(&self) -> Option<Navigation> {
        if let Some(store) = self.busy_store() {
            if !self.can_go_forward() {
                return None;
            }
            self.defer(&store, Pending::Forward);
            return Some(Navigation::Deferred);
        }
        let path = self.shared.state.borrow_mut().history.forward()?.to_owned();
        Some(self.transition(path, false))
    }

    /// Re-match the current path, e.g. after [`add_route`](Self::add_route).
    pub fn refresh(&self) -> Navigation {
        if let Some(store) = self.busy_store() {
            self.defer(&store, Pending::Refresh);
            return Navigation::Deferred;
        }
        let path = self.shared.state.borrow().history.current().to_owned();
        self.transition(path, false)
    }

    #[must_use]
    pub fn current_route(&self) -> Option<CurrentRoute> {
        self.shared.state.borrow().current.clone()
    }

    /// `#`-prefixed location of the current route, as shown in the address bar.
    #[must_use]
    pub fn location_hash(&self) -> String {
        format!("#{}", self.shared.state.borrow().history.current())
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.shared.state.borrow().history.can_go_back()
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.shared.state.borrow().history.can_go_forward()
    }

    /// Render the current route: the matched handler, or the not-found
    /// handler (falling back to [`not_found_view`]) in the 404 state.
    #[must_use]
    pub fn view(&self) -> Option<VNode> {
        let (handler, params) = {
            let state = self.shared.state.borrow();
            let current = state.current.as_ref()?;
            let handler = if current.is_404 {
                state.not_found.clone()
            } else {
                state
                    .routes
                    .iter()
                    .find(|route| Some(route.pattern.as_str()) == current.pattern.as_deref())
                    .map(|route| Rc::clone(&route.handler))
            };
            (handler, current.params.clone())
        };
        Some(match handler {
            Some(handler) => handler(&params),
            None => not_found_view(&params),
        })
    }

    /// Register `callback` for every transition.
    pub fn subscribe(&self, mut callback: impl FnMut(&CurrentRoute) + 'static) -> Subscription {
        self.shared.subscribers.subscribe(move |route| {
            callback(route);
            Ok(())
        })
    }

    pub fn try_subscribe(
        &self,
        callback: impl FnMut(&CurrentRoute) -> Result<(), SubscriberError> + 'static,
    ) -> Subscription {
        self.shared.subscribers.subscribe(callback)
    }

    /// Handle that does not keep the router alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakRouter {
        WeakRouter {
            shared: Rc::downgrade(&self.shared),
        }
    }

    fn is_current(&self, path: &str) -> bool {
        self.shared
            .state
            .borrow()
            .current
            .as_ref()
            .is_some_and(|current| current.path == path)
    }

    /// The attached store, if it is in the middle of a change.
    fn busy_store(&self) -> Option<Store> {
        self.shared
            .state
            .borrow()
            .store
            .clone()
            .filter(Store::is_updating)
    }

    fn defer(&self, store: &Store, pending: Pending) {
        tracing::debug!(?pending, "store busy, route change deferred");
        let router = self.downgrade();
        store.defer(move || {
            if let Some(router) = router.upgrade() {
                let _ = router.run(pending);
            }
        });
    }

    fn run(&self, pending: Pending) -> Option<Navigation> {
        match pending {
            Pending::Navigate(path) => Some(self.navigate(&path)),
            Pending::Back => self.back(),
            Pending::Forward => self.forward(),
            Pending::Refresh => Some(self.refresh()),
        }
    }

    fn transition(&self, path: String, push: bool) -> Navigation {
        let _span = tracing::debug_span!("router.transition", path = %path).entered();
        let (route, store) = {
            let mut state = self.shared.state.borrow_mut();
            let route = match_route(&state.routes, &path);
            if push {
                state.history.push(path.clone());
            }
            state.current = Some(route.clone());
            (route, state.store.clone())
        };

        if let Some(store) = store {
            let update = store.set_state(route_state(&route));
            if update == StateUpdate::Dropped {
                tracing::warn!(path = %route.path, "route change reached the store during notification");
            }
        }

        let superseded = self.shared.state.borrow().current.as_ref() != Some(&route);
        if superseded {
            tracing::debug!(path = %route.path, "route change overtaken by a deferred one");
        } else {
            let report = self.shared.subscribers.notify(&route);
            tracing::debug!(
                pattern = route.pattern.as_deref().unwrap_or("<404>"),
                notified = report.notified,
                failed = report.failed,
                "route changed"
            );
        }
        if route.is_404 {
            Navigation::NotFound
        } else {
            Navigation::Matched
        }
    }
}

/// Non-owning router handle, for listeners living inside views the router
/// renders.
#[derive(Clone)]
pub struct WeakRouter {
    shared: Weak<Shared>,
}

impl WeakRouter {
    #[must_use]
    pub fn upgrade(&self) -> Option<Router> {
        self.shared.upgrade().map(|shared| Router { shared })
    }
}

impl fmt::Debug for WeakRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRouter")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Builder for [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
    not_found: Option<RouteHandler>,
    store: Option<Store>,
    initial_path: Option<String>,
}

impl RouterBuilder {
    #[must_use]
    pub fn route(
        mut self,
        pattern: &str,
        handler: impl Fn(&RouteParams) -> VNode + 'static,
    ) -> Self {
        self.routes.push(Route {
            pattern: RoutePattern::parse(pattern),
            handler: Rc::new(handler),
        });
        self
    }

    #[must_use]
    pub fn not_found(mut self, handler: impl Fn(&RouteParams) -> VNode + 'static) -> Self {
        self.not_found = Some(Rc::new(handler));
        self
    }

    /// Mirror every transition into `store`.
    #[must_use]
    pub fn store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    /// Path of the initial transition (default `/`).
    #[must_use]
    pub fn initial_path(mut self, path: impl Into<String>) -> Self {
        self.initial_path = Some(path.into());
        self
    }

    /// Create the router and run the initial transition, or queue it when
    /// the store is busy.
    #[must_use]
    pub fn build(self) -> Router {
        let initial = normalize(self.initial_path.as_deref().unwrap_or("/"));
        let router = Router {
            shared: Rc::new(Shared {
                state: RefCell::new(RouterState {
                    routes: self.routes,
                    not_found: self.not_found,
                    store: self.store,
                    history: History::new(initial),
                    current: None,
                }),
                subscribers: Subscribers::new("router"),
            }),
        };
        let _ = router.refresh();
        router
    }
}

fn normalize(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        "/".to_owned()
    } else if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

fn match_route(routes: &[Route], path: &str) -> CurrentRoute {
    for route in routes {
        if let Some(params) = route.pattern.matches(path) {
            return CurrentRoute {
                path: path.to_owned(),
                pattern: Some(route.pattern.as_str().to_owned()),
                params,
                is_404: false,
            };
        }
    }
    let mut params = RouteParams::new();
    params.insert(REQUESTED_PATH.to_owned(), path.to_owned());
    CurrentRoute {
        path: path.to_owned(),
        pattern: None,
        params,
        is_404: true,
    }
}

fn route_state(route: &CurrentRoute) -> crate::State {
    let params: serde_json::Map<String, Value> = route
        .params
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    state_from(json!({
        "currentRoute": route.path,
        "routeParams": params,
        "route404": route.is_404,
        "isLoading": false,
    }))
}

/// Default 404 view: a heading, the requested path and a link home.
#[must_use]
pub fn not_found_view(params: &RouteParams) -> VNode {
    let requested = params.get(REQUESTED_PATH).map_or("/", String::as_str);
    el("div")
        .attr("class", "not-found")
        .child(el("h1").child("404"))
        .child(el("p").child(format!("Route \"{requested}\" not found")))
        .child(
            el("a")
                .attr("class", "home-link")
                .attr("href", "#/")
                .child("\u{2190} Back to Home"),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn page(name: &'static str) -> impl Fn(&RouteParams) -> VNode {
        move |params| {
            let mut builder = el("div").attr("class", name);
            for (k, v) in params {
                builder = builder.attr(format!("data-{k}"), v.as_str());
            }
            builder.child(name).build()
        }
    }

    fn app_router() -> Router {
        Router::builder()
            .route("/", page("home"))
            .route("/game/:id", page("game"))
            .route("/about", page("about"))
            .build()
    }

    #[test]
    fn initial_transition_matches_root() {
        let router = app_router();
        let current = router.current_route().unwrap();
        assert_eq!(current.path, "/");
        assert_eq!(current.pattern.as_deref(), Some("/"));
        assert!(!current.is_404);
        assert_eq!(router.view().unwrap().to_html(), r#"<div class="home">home</div>"#);
    }

    #[test]
    fn params_are_bound() {
        let router = app_router();
        assert_eq!(router.navigate("/game/42"), Navigation::Matched);
        let current = router.current_route().unwrap();
        assert_eq!(current.param("id"), Some("42"));
        assert_eq!(
            router.view().unwrap().to_html(),
            r#"<div class="game" data-id="42">game</div>"#
        );
    }

    #[test]
    fn literal_route_is_not_swallowed_by_a_param_route() {
        let router = app_router();
        assert_eq!(router.navigate("/about"), Navigation::Matched);
        assert_eq!(
            router.current_route().unwrap().pattern.as_deref(),
            Some("/about")
        );
    }

    #[test]
    fn registration_order_breaks_ties() {
        let router = Router::builder()
            .route("/item/:id", page("param"))
            .route("/item/new", page("literal"))
            .build();
        let _ = router.navigate("/item/new");
        assert_eq!(
            router.current_route().unwrap().pattern.as_deref(),
            Some("/item/:id")
        );
    }

    #[test]
    fn miss_enters_404_with_requested_path() {
        let router = app_router();
        assert_eq!(router.navigate("/nope/deep"), Navigation::NotFound);
        let current = router.current_route().unwrap();
        assert!(current.is_404);
        assert_eq!(current.param(REQUESTED_PATH), Some("/nope/deep"));
        let html = router.view().unwrap().to_html();
        assert!(html.contains("Route \"/nope/deep\" not found"), "{html}");
    }

    #[test]
    fn custom_not_found_handler_gets_the_params() {
        let router = Router::builder()
            .route("/", page("home"))
            .not_found(|params| VNode::text(format!("missing {}", params[REQUESTED_PATH])))
            .build();
        let _ = router.navigate("/x");
        assert_eq!(router.view(), Some(VNode::text("missing /x")));
    }

    #[test]
    fn navigating_to_the_current_path_is_a_noop() {
        let router = app_router();
        let hits = Rc::new(RefCell::new(0));
        let h = Rc::clone(&hits);
        let _sub = router.subscribe(move |_| *h.borrow_mut() += 1);

        assert_eq!(router.navigate("/about"), Navigation::Matched);
        assert_eq!(router.navigate("/about"), Navigation::Unchanged);
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(router.refresh(), Navigation::Matched);
        assert_eq!(*hits.borrow(), 2);
    }

    #[test]
    fn hash_changes_strip_the_marker() {
        let router = app_router();
        assert_eq!(router.handle_hash_change("#/about"), Navigation::Matched);
        assert_eq!(router.location_hash(), "#/about");
        assert_eq!(router.handle_hash_change(""), Navigation::Matched);
        assert_eq!(router.current_route().unwrap().path, "/");
        assert_eq!(router.handle_hash_change("#"), Navigation::Unchanged);
    }

    #[test]
    fn back_and_forward_rematch() {
        let router = app_router();
        let _ = router.navigate("/game/1");
        let _ = router.navigate("/about");
        assert_eq!(router.back(), Some(Navigation::Matched));
        assert_eq!(router.current_route().unwrap().param("id"), Some("1"));
        assert_eq!(router.back(), Some(Navigation::Matched));
        assert_eq!(router.back(), None);
        assert_eq!(router.forward(), Some(Navigation::Matched));
        assert_eq!(router.current_route().unwrap().path, "/game/1");
    }

    #[test]
    fn added_routes_apply_after_refresh() {
        let router = app_router();
        assert_eq!(router.navigate("/late"), Navigation::NotFound);
        router.add_route("/late", page("late"));
        assert_eq!(router.refresh(), Navigation::Matched);
    }

    #[test]
    fn store_receives_one_consistent_update_per_transition() {
        let store = Store::default();
        let snapshots = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&snapshots);
        let _sub = store.subscribe(move |state| s.borrow_mut().push(state.clone()));

        let router = Router::builder()
            .route("/user/:id", page("user"))
            .store(store.clone())
            .build();
        let _ = router.navigate("/user/7");

        let snapshots = snapshots.borrow();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0]["currentRoute"], json!("/"));
        assert_eq!(snapshots[0]["route404"], json!(true));
        assert_eq!(snapshots[1]["currentRoute"], json!("/user/7"));
        assert_eq!(snapshots[1]["routeParams"], json!({"id": "7"}));
        assert_eq!(snapshots[1]["route404"], json!(false));
        assert_eq!(snapshots[1]["isLoading"], json!(false));
    }

    #[test]
    fn redirect_from_a_store_subscriber_lands_in_both() {
        let store = Store::default();
        let router = Router::builder()
            .route("/", page("home"))
            .route("/private", page("private"))
            .route("/login", page("login"))
            .store(store.clone())
            .build();

        let weak = router.downgrade();
        let redirects = Rc::new(RefCell::new(Vec::new()));
        let r = Rc::clone(&redirects);
        let _guard = store.subscribe(move |state| {
            if state.get("currentRoute") == Some(&json!("/private")) {
                if let Some(router) = weak.upgrade() {
                    r.borrow_mut().push(router.navigate("/login"));
                }
            }
        });
        let heard = Rc::new(RefCell::new(Vec::new()));
        let h = Rc::clone(&heard);
        let _sub = router.subscribe(move |route| h.borrow_mut().push(route.path.clone()));

        let _ = router.navigate("/private");

        assert_eq!(*redirects.borrow(), vec![Navigation::Deferred]);
        assert_eq!(router.current_route().unwrap().path, "/login");
        assert_eq!(store.get("currentRoute"), Some(json!("/login")));
        assert_eq!(*heard.borrow(), vec!["/login".to_owned()]);
        assert_eq!(router.location_hash(), "#/login");
        assert!(router.can_go_back());
        assert!(!store.is_updating());
    }

    #[test]
    fn back_requested_while_the_store_is_busy_runs_afterwards() {
        let store = Store::default();
        let router = Router::builder()
            .route("/", page("home"))
            .route("/a", page("a"))
            .store(store.clone())
            .build();
        let _ = router.navigate("/a");

        let weak = router.downgrade();
        let outcome = Rc::new(RefCell::new(None));
        let o = Rc::clone(&outcome);
        let _guard = store.subscribe(move |state| {
            let on_a = state.get("currentRoute") == Some(&json!("/a"));
            if on_a && state.get("flag") == Some(&json!(true)) {
                *o.borrow_mut() = weak.upgrade().and_then(|router| router.back());
            }
        });

        let _ = store.set_state(state_from(json!({"flag": true})));
        assert_eq!(*outcome.borrow(), Some(Navigation::Deferred));
        assert_eq!(router.current_route().unwrap().path, "/");
        assert_eq!(store.get("currentRoute"), Some(json!("/")));
    }

    #[test]
    fn router_built_during_a_store_change_starts_once_it_settles() {
        let store = Store::default();
        let slot: Rc<RefCell<Option<Router>>> = Rc::new(RefCell::new(None));
        let s = Rc::clone(&slot);
        let inner = store.clone();
        let _guard = store.subscribe(move |_| {
            if s.borrow().is_none() {
                let router = Router::builder()
                    .route("/", page("home"))
                    .store(inner.clone())
                    .build();
                assert_eq!(router.current_route(), None);
                *s.borrow_mut() = Some(router);
            }
        });

        let _ = store.set_state(state_from(json!({"boot": true})));
        let router = slot.borrow().clone().unwrap();
        assert_eq!(router.current_route().unwrap().path, "/");
        assert_eq!(store.get("currentRoute"), Some(json!("/")));
        assert_eq!(store.get("route404"), Some(json!(false)));
    }

    #[test]
    fn weak_handle_does_not_keep_the_router_alive() {
        let router = app_router();
        let weak = router.downgrade();
        assert!(weak.upgrade().is_some());
        drop(router);
        assert!(weak.upgrade().is_none());
    }
}
