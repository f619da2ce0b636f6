//! # nuages-core
//!
//! Signal abstraction for nuages: identity tokens, readable/duplex signal
//! traits, lazy combinators and the deferred action system.
//!
//! ## Overview
//!
//! This crate is the host-free half of nuages. Everything here is plain
//! single-threaded data-flow: values move through cheap cloneable signal
//! handles, and change detection runs on [`Identity`] tokens instead of
//! value diffs. The retained tree, the refresh engine and the widgets live
//! in `nuages-ui` and consume these primitives.
//!
//! ## Architecture
//!
//! - [`identity`] - change-detection tokens and the capture slot consumers
//!   remember them in.
//! - [`signal`] - the [`Readable`]/[`Duplex`] traits and the owned
//!   [`State`] cell.
//! - [`combinators`] - lazy adapters: [`map`], [`mask`], [`lens`],
//!   [`with_default`] and friends.
//! - [`action`] - deferred effects gated behind [`Action::is_ready`].
//! - [`error`] - signal and action error types.

#![warn(missing_docs)]

pub mod action;
pub mod combinators;
pub mod error;
pub mod identity;
pub mod signal;

pub use action::{
	Action, ApplyTo, Callback, CallbackReady, EraseIndex, Noop, Push, Set, Then, Toggle,
	apply_to, callback, callback_ready, erase_index, noop, push, set, toggle,
};
pub use combinators::{
	Constant, DuplexMap, LazyApply2, Lens, Map, Mask, MaskWrites, Select, WithDefault, as_text,
	constant, duplex_map, lazy_apply2, lens, map, mask, mask_writes, select, with_default,
};
pub use error::{ActionError, ActionResult, SignalError, SignalResult};
pub use identity::{CapturedIdentity, CellId, Identity};
pub use signal::{Duplex, Readable, State};
