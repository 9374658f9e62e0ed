#![forbid(unsafe_code)]

//! The application loop: store change, view, reconcile.
//!
//! [`App::mount`] finds the container named by [`AppConfig::container_id`],
//! paints the view once and subscribes a [`Root`] to the store. From then on
//! every applied `set_state` re-renders through diff and patch before it
//! returns, which makes the returned [`StateUpdate`] the signal that the DOM
//! is up to date.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lframe_core::{Dom, NodeId, VNode};
use lframe_render::{RenderReport, Root};

use crate::config::AppConfig;
use crate::error::{Result, RuntimeError, SubscriberError};
use crate::store::{State, Store};
use crate::subscribers::Subscription;

type View = Box<dyn Fn(&State) -> VNode>;

struct Loop {
    root: Root,
    view: View,
    last: Option<RenderReport>,
}

impl Loop {
    fn render(&mut self, state: &State) -> Result<RenderReport> {
        let vnode = (self.view)(state);
        let report = self.root.render(vnode)?;
        self.last = Some(report);
        Ok(report)
    }
}

/// A running application bound to one container.
pub struct App {
    render_loop: Rc<RefCell<Loop>>,
    store: Store,
    config: AppConfig,
    subscription: Subscription,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("container", &self.render_loop.borrow().root.container())
            .field("last", &self.render_loop.borrow().last)
            .finish()
    }
}

impl App {
    /// Mount `view` into the element with id `config.container_id` inside
    /// `document` (which may itself be that element).
    pub fn mount(
        dom: &Dom,
        document: NodeId,
        config: AppConfig,
        store: Store,
        view: impl Fn(&State) -> VNode + 'static,
    ) -> Result<Self> {
        let selector = format!("#{}", config.container_id);
        let container = dom
            .query_selector(document, &selector)?
            .ok_or_else(|| RuntimeError::ContainerNotFound(config.container_id.clone()))?;
        let _span = tracing::info_span!("app.mount", container_id = %config.container_id).entered();

        let mut render_loop = Loop {
            root: Root::new(dom.clone(), container),
            view: Box::new(view),
            last: None,
        };
        store.with_state(|state| render_loop.render(state))?;

        let render_loop = Rc::new(RefCell::new(render_loop));
        let weak = Rc::downgrade(&render_loop);
        let subscription = store.try_subscribe(move |state| {
            let Some(render_loop) = weak.upgrade() else {
                return Ok(());
            };
            let Ok(mut render_loop) = render_loop.try_borrow_mut() else {
                return Err(SubscriberError::new("app is already rendering"));
            };
            render_loop
                .render(state)
                .map(|_| ())
                .map_err(|err| SubscriberError::new(err.to_string()))
        });
        tracing::info!(%container, "app mounted");

        Ok(Self {
            render_loop,
            store,
            config,
            subscription,
        })
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn container(&self) -> NodeId {
        self.render_loop.borrow().root.container()
    }

    /// Report of the most recent frame.
    #[must_use]
    pub fn last_report(&self) -> Option<RenderReport> {
        self.render_loop.borrow().last
    }

    /// Render again without a state change, e.g. after the router moved.
    pub fn render(&self) -> Result<RenderReport> {
        let state = self.store.get_state();
        self.render_loop.borrow_mut().render(&state)
    }

    /// Stop following the store and clear the container.
    pub fn unmount(self) -> Result<()> {
        let Self {
            render_loop,
            mut subscription,
            ..
        } = self;
        subscription.unsubscribe();
        render_loop.borrow_mut().root.clear()?;
        tracing::info!("app unmounted");
        Ok(())
    }
}
