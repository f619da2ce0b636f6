//! Identity tokens for change detection.
//!
//! ## Overview
//!
//! Every signal exposes an [`Identity`] token alongside its value. Consumers
//! never diff values; they remember the token they last acted on (in a
//! [`CapturedIdentity`]) and re-act only when the current token stops
//! matching. A token therefore MUST change whenever the value may have
//! changed. The converse is allowed but wasteful: a token that changes while
//! the value did not merely triggers spare work downstream.
//!
//! Tokens are structural and compared by real equality. A hashed token would
//! be cheaper to store, but a collision would silently suppress an update,
//! which is the one failure mode this layer exists to rule out.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

/// Unique id for a mutable storage cell.
///
/// Allocated from a process-wide counter so two cells never share an id,
/// even across independent engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
	/// Allocates a fresh cell id.
	pub fn new() -> Self {
		Self(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for CellId {
	fn default() -> Self {
		Self::new()
	}
}

/// A signal's change-detection token.
///
/// Cheap to clone; composite tokens share their parts through an [`Rc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
	/// The value never changes.
	Constant,
	/// A storage cell at a specific write version.
	Versioned {
		/// The cell holding the value.
		cell: CellId,
		/// The cell's write counter at read time.
		version: u64,
	},
	/// Composite of the input identities of a derived signal.
	Tuple(Rc<[Identity]>),
	/// Identity injected by the application (list keys, host ids).
	Keyed(u64),
}

impl Identity {
	/// Builds a composite token from part tokens.
	pub fn tuple(parts: impl IntoIterator<Item = Identity>) -> Self {
		Self::Tuple(parts.into_iter().collect())
	}
}

/// A remembered [`Identity`], used to detect change between visits.
///
/// Starts empty; an empty capture matches nothing, so the first comparison
/// always reports a change.
#[derive(Debug, Clone, Default)]
pub struct CapturedIdentity {
	current: Option<Identity>,
}

impl CapturedIdentity {
	/// Creates an empty capture.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true when `id` equals the captured token.
	pub fn matches(&self, id: &Identity) -> bool {
		self.current.as_ref() == Some(id)
	}

	/// Remembers `id` as the token last acted on.
	pub fn capture(&mut self, id: Identity) {
		self.current = Some(id);
	}

	/// Forgets the captured token; the next comparison reports a change.
	pub fn clear(&mut self) {
		self.current = None;
	}

	/// Returns true when a token has been captured.
	pub fn is_captured(&self) -> bool {
		self.current.is_some()
	}
}
