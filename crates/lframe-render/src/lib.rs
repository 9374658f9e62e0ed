#![forbid(unsafe_code)]

//! Render kernel: mounting virtual trees, diffing them, and patching the
//! platform DOM.
//!
//! The pipeline is:
//!
//! 1. [`mount::render`] paints a tree into an empty container (cold start).
//! 2. [`diff::diff`] compares the previous tree with the next one and emits
//!    an ordered list of [`diff::Patch`]es.
//! 3. [`patch::apply_patches`] replays that list against the live nodes.
//!
//! [`root::Root`] ties the three together for a single container and is what
//! application loops drive.

pub mod diff;
pub mod error;
pub mod mount;
pub mod patch;
pub mod root;

pub use diff::{AttrPatch, ChildPatch, DiffStats, Patch, diff};
pub use error::RenderError;
pub use mount::{mount, render};
pub use patch::apply_patches;
pub use root::{RenderReport, Root};
