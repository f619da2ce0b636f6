//! Retained UI layer: node store, refresh engine, host surface, element
//! builders, widgets and the keyed list reconciler.
//!
//! This module re-exports `nuages-ui`.
//!
//! ## Architecture
//!
//! - **Traversal**: application components declare the tree into a [`Ui`]
//!   context; nothing retained on the host is mutated during this phase.
//! - **Synchronization**: the engine sweeps abandoned positions, reconciles
//!   child order, and pushes changed signal values to the host, comparing
//!   identity tokens to decide what changed.
//! - **Dispatch**: host events route back through [`Engine::dispatch`] and
//!   perform [`Action`](crate::Action)s or two-way input write-backs.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nuages::prelude::*;
//! use nuages::testing::TestSurface;
//!
//! fn app(ui: &mut Ui) -> UiResult<()> {
//! 	ui.element("p")?.text_literal("bonjour")?;
//! 	Ok(())
//! }
//!
//! let mut engine = Engine::new(TestSurface::new(), app);
//! engine.refresh().unwrap();
//! ```

pub use nuages_ui::*;
