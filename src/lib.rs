//! # Nuages
//!
//! A signal-driven, retained-mode UI composition engine with pluggable host
//! surfaces.
//!
//! Nuages lets you write UI as plain functions that run top-to-bottom on
//! every refresh cycle. The engine reconciles what those functions declare
//! against retained per-position state and an injected host surface, so
//! application code stays declarative while host mutations stay minimal.
//!
//! ## Core Principles
//!
//! - **Identity over equality**: signals carry identity tokens; the engine
//!   detects change by comparing tokens, never by diffing values.
//! - **Retained, not rebuilt**: component-local state and host nodes persist
//!   across refresh cycles, keyed by their position in the traversal.
//! - **Deferred effects**: event handlers perform [`Action`]s, which are
//!   gated behind `is_ready()` and never run during traversal.
//! - **Host-agnostic**: the engine drives any tree-shaped host through the
//!   [`Surface`] trait; a scripted in-memory surface ships for tests.
//!
//! ## Feature Flags
//!
//! - `ui` (default) - the retained tree, refresh engine, widgets and the
//!   test surface. Disable it to use the signal layer alone.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use nuages::prelude::*;
//! use nuages::testing::TestSurface;
//!
//! fn counter(ui: &mut Ui) -> UiResult<()> {
//! 	let count = ui.state(0i64)?;
//! 	let label = map(count.clone(), |n| format!("count: {n}"));
//! 	button(ui, constant("+1".to_string()), apply_to(count, |n| *n += 1))?;
//! 	ui.element("p")?.text(label)?;
//! 	Ok(())
//! }
//!
//! let mut engine = Engine::new(TestSurface::new(), counter);
//! engine.refresh()?;
//! ```

#![warn(missing_docs)]

pub mod core;
#[cfg(feature = "ui")]
pub mod ui;

// Re-export the signal layer
pub use nuages_core::{
	Action, ActionError, ActionResult, CapturedIdentity, CellId, Duplex, Identity, Readable,
	SignalError, SignalResult, State,
};

// Re-export combinators and action constructors
pub use nuages_core::{
	apply_to, as_text, callback, callback_ready, constant, duplex_map, erase_index, lazy_apply2,
	lens, map, mask, mask_writes, noop, push, select, set, toggle, with_default,
};

// Re-export the engine surface
#[cfg(feature = "ui")]
pub use nuages_ui::{
	Cached, DispatchOutcome, ElementHandle, Engine, EngineConfig, ItemKey, ItemSignal, NodeRef,
	PropValue, Surface, SurfaceError, SurfaceEvent, Ui, UiError, UiResult, on_enter, on_escape,
};

// Re-export widgets
#[cfg(feature = "ui")]
pub use nuages_ui::widgets::{button, checkbox, input, input_validated, link, text_node};

// Re-export the scripted surface for host-less tests
#[cfg(feature = "ui")]
pub use nuages_ui::testing;

pub mod prelude {
	//! Single-import surface for application code.

	pub use crate::{
		Action,
		ActionResult,
		CapturedIdentity,
		Duplex,
		Identity,
		Readable,
		SignalError,
		SignalResult,
		State,
		// Combinators
		apply_to,
		as_text,
		callback,
		callback_ready,
		constant,
		duplex_map,
		erase_index,
		lazy_apply2,
		lens,
		map,
		mask,
		mask_writes,
		noop,
		push,
		select,
		set,
		toggle,
		with_default,
	};

	#[cfg(feature = "ui")]
	pub use crate::{
		DispatchOutcome, ElementHandle, Engine, EngineConfig, ItemKey, NodeRef, PropValue,
		Surface, SurfaceEvent, Ui, UiError, UiResult,
		// Widgets
		button, checkbox, input, input_validated, link, text_node,
	};
}
