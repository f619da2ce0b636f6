//! # nuages-ui
//!
//! The retained half of nuages: a node store addressed by structural
//! paths, a two-phase refresh engine over a pluggable host [`Surface`],
//! element and widget declarations, keyed lists and validated inputs.
//!
//! ## Overview
//!
//! Application code is a plain function over [`Ui`]. Every refresh cycle
//! the engine runs it top to bottom; the traversal declares what should
//! exist and records deferred synchronization work, then the engine sweeps
//! state that went undeclared, reconciles child order and runs the
//! recorded work against the host. Host writes happen only where a
//! captured identity or a shadow value says something actually changed, so
//! a quiet cycle touches the host zero times.
//!
//! ## Architecture
//!
//! - [`path`] - structural keys that give retained state its address.
//! - [`surface`] - the host abstraction the engine renders into.
//! - [`context`] - the traversal context: elements, retained state,
//!   conditionals and memoized computations.
//! - [`element`] - attribute, property, text and event bindings.
//! - [`list`] - keyed iteration with state that follows item identity.
//! - [`widgets`] - inputs, checkboxes, buttons and links.
//! - [`engine`] - the refresh cycle, event dispatch and coalesced flush.
//! - [`testing`] - an in-memory host with full validation and an op log.

#![warn(missing_docs)]

pub mod context;
pub mod element;
pub mod engine;
pub mod error;
pub mod list;
pub mod path;
pub mod surface;
pub mod testing;
pub mod widgets;

mod store;
mod validation;

pub use context::{Cached, Ui};
pub use element::{ElementHandle, on_enter, on_escape};
pub use engine::{DispatchOutcome, Engine, EngineConfig};
pub use error::{SurfaceError, SurfaceResult, UiError, UiResult};
pub use list::ItemSignal;
pub use path::{ItemKey, KeySegment, PathKey};
pub use surface::{NodeRef, PropValue, Surface, SurfaceEvent};
pub use widgets::{button, checkbox, input, input_validated, link, text_node};
