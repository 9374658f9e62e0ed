#![forbid(unsafe_code)]

//! Runtime for LightFrame: state, routing, components and the app loop.
//!
//! - [`Store`]: a JSON-object state container with synchronous subscribers,
//!   named [`Action`]s and optional persistence through a [`Storage`].
//! - [`Router`]: hash routing with `:param` segments, history and a 404
//!   state, optionally mirrored into a `Store`.
//! - [`Component`] / [`ComponentHost`]: view-plus-state units reconciled by
//!   diff and patch.
//! - [`App`]: subscribes a render root to a store.
//!
//! Everything is single-threaded (`Rc` handles). No borrow is held while a
//! user callback runs, so subscribers, route handlers and event listeners
//! may call back into the store, the router or the DOM.

pub mod action;
pub mod app;
pub mod component;
pub mod config;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod router;
pub mod storage;
pub mod store;
mod subscribers;

pub use action::{Action, Transform};
pub use app::App;
pub use component::{Component, ComponentHost};
pub use config::AppConfig;
pub use error::{RuntimeError, StorageError, SubscriberError};
pub use router::{
    CurrentRoute, History, Navigation, REQUESTED_PATH, RouteHandler, RouteParams, RoutePattern,
    Router, RouterBuilder, WeakRouter, not_found_view,
};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{State, StateUpdate, Store, state_from};
pub use subscribers::{NotifyReport, Subscription};
