//! Engine and surface error types.

use nuages_core::{ActionError, SignalError};
use thiserror::Error;

use crate::path::ItemKey;

/// Result type for engine operations.
pub type UiResult<T> = Result<T, UiError>;

/// Result type for host surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Engine errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UiError {
	/// A keyed list declared the same item key twice in one cycle. The
	/// cycle is rolled back; store and host keep their previous state.
	#[error("duplicate item key in keyed list: {key}")]
	DuplicateItemKey {
		/// The key that appeared more than once.
		key: ItemKey,
	},

	/// Coalesced refresh requests kept arriving past the configured cycle
	/// budget.
	#[error("refresh did not settle after {cycles} cycles")]
	RefreshDidNotSettle {
		/// Cycles run before giving up.
		cycles: usize,
	},

	/// A host surface operation failed.
	#[error("surface operation failed: {0}")]
	Surface(#[from] SurfaceError),

	/// A signal rejected an engine-side access.
	#[error("signal access failed: {0}")]
	Signal(#[from] SignalError),

	/// An action failed while handling an event.
	#[error("action failed: {0}")]
	Action(#[from] ActionError),
}

/// Host surface errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SurfaceError {
	/// Operation referenced a node the host does not know.
	#[error("unknown node: {node}")]
	UnknownNode {
		/// Raw id of the missing node.
		node: u64,
	},

	/// Child index out of range for an insert or move.
	#[error("invalid child index {index} for parent with {len} children")]
	InvalidIndex {
		/// Requested index.
		index: usize,
		/// Child count of the parent.
		len: usize,
	},

	/// Host-specific failure.
	#[error("host rejected operation: {0}")]
	Host(String),
}
