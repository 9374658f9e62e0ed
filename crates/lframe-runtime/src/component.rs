#![forbid(unsafe_code)]

//! Components: a view function over props and state, plus lifecycle hooks.
//!
//! A [`ComponentHost`] owns one mounted component. It renders the component
//! through a [`Root`], so every re-render is a diff and patch; listeners in
//! the view are rebound by the patcher, never by hand. The component's
//! [`Store`] drives re-renders: each applied change renders again before
//! `set_state` returns.
//!
//! Components that need to change their own state from event handlers keep
//! a clone of the store and are mounted with
//! [`ComponentHost::mount_with_store`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use lframe_core::{Dom, NodeId, VNode};
use lframe_render::{RenderReport, Root};

use crate::error::{Result, SubscriberError};
use crate::store::{State, StateUpdate, Store};
use crate::subscribers::Subscription;

/// A renderable unit with lifecycle hooks.
pub trait Component {
    type Props;

    /// Build the view. Must not change the store.
    fn view(&self, props: &Self::Props, state: &State) -> VNode;

    /// Called once after the first render is in the DOM.
    fn on_mount(&mut self) {}

    /// Called before the component's DOM is removed.
    fn on_unmount(&mut self) {}
}

struct Mounted<C: Component> {
    component: C,
    props: C::Props,
    root: Root,
    last: Option<RenderReport>,
}

impl<C: Component> Mounted<C> {
    fn render(&mut self, state: &State) -> Result<RenderReport> {
        let vnode = self.component.view(&self.props, state);
        let report = self.root.render(vnode)?;
        self.last = Some(report);
        Ok(report)
    }
}

/// A mounted component.
pub struct ComponentHost<C: Component> {
    mounted: Rc<RefCell<Mounted<C>>>,
    store: Store,
    subscription: Subscription,
}

impl<C> ComponentHost<C>
where
    C: Component + 'static,
    C::Props: 'static,
{
    /// Mount `component` into `container` with a fresh in-memory store.
    pub fn mount(
        dom: &Dom,
        container: NodeId,
        component: C,
        props: C::Props,
        initial_state: State,
    ) -> Result<Self> {
        Self::mount_with_store(dom, container, component, props, Store::new(initial_state))
    }

    /// Mount `component` into `container`, re-rendering on every change of
    /// `store`.
    pub fn mount_with_store(
        dom: &Dom,
        container: NodeId,
        component: C,
        props: C::Props,
        store: Store,
    ) -> Result<Self> {
        let _span = tracing::debug_span!("component.mount", %container).entered();
        let mut mounted = Mounted {
            component,
            props,
            root: Root::new(dom.clone(), container),
            last: None,
        };
        store.with_state(|state| mounted.render(state))?;
        mounted.component.on_mount();

        let mounted = Rc::new(RefCell::new(mounted));
        let weak: Weak<RefCell<Mounted<C>>> = Rc::downgrade(&mounted);
        let subscription = store.try_subscribe(move |state| {
            let Some(mounted) = weak.upgrade() else {
                return Ok(());
            };
            let Ok(mut mounted) = mounted.try_borrow_mut() else {
                return Err(SubscriberError::new("component is already rendering"));
            };
            mounted
                .render(state)
                .map(|_| ())
                .map_err(|err| SubscriberError::new(err.to_string()))
        });

        Ok(Self {
            mounted,
            store,
            subscription,
        })
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Shallow-merge into the component's state; re-renders before
    /// returning.
    pub fn set_state(&self, partial: State) -> StateUpdate {
        self.store.set_state(partial)
    }

    /// Replace the props and re-render.
    pub fn set_props(&self, props: C::Props) -> Result<RenderReport> {
        let state = self.store.get_state();
        let mut mounted = self.mounted.borrow_mut();
        mounted.props = props;
        mounted.render(&state)
    }

    /// Re-render with the current props and state.
    pub fn render(&self) -> Result<RenderReport> {
        let state = self.store.get_state();
        self.mounted.borrow_mut().render(&state)
    }

    /// Report of the most recent render.
    #[must_use]
    pub fn last_report(&self) -> Option<RenderReport> {
        self.mounted.borrow().last
    }

    /// Live node of the component's view.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.mounted.borrow().root.node()
    }

    pub fn with_component<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.mounted.borrow().component)
    }

    /// Run `on_unmount`, stop following the store and clear the container.
    pub fn unmount(self) -> Result<()> {
        let Self {
            mounted,
            mut subscription,
            ..
        } = self;
        subscription.unsubscribe();
        let mut mounted = mounted.borrow_mut();
        mounted.component.on_unmount();
        mounted.root.clear()?;
        tracing::debug!(container = %mounted.root.container(), "component unmounted");
        Ok(())
    }
}
