//! Signal traits and the owned `State` cell.
//!
//! ## Overview
//!
//! A signal couples a value with an [`Identity`] token. [`Readable`] is the
//! consumer-facing side: ask for the current token, ask for the current
//! value. [`Duplex`] adds the producer-facing side: write a new value back.
//!
//! Availability and writability are independent axes. A signal may be
//! readable now and unavailable later (an upstream mask flipped), or
//! writable without being readable at all. Reading an unavailable signal
//! yields `None`, never a default.
//!
//! [`State`] is the one primitive storage cell: a cloneable handle over an
//! interior-mutable value with a write counter. Every write bumps the
//! counter, which moves the cell's [`Identity`], which is what downstream
//! consumers react to.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::SignalResult;
use crate::identity::{CellId, Identity};

/// The consumer side of a signal.
pub trait Readable {
	/// The value the signal carries.
	type Value: Clone + 'static;

	/// Returns the signal's current change-detection token.
	///
	/// The token MUST differ from any previously returned token whenever the
	/// value may have changed in between.
	fn identity(&self) -> Identity;

	/// Returns the current value, or `None` when the signal is unavailable.
	fn try_read(&self) -> Option<Self::Value>;

	/// Returns true when a value is currently available.
	///
	/// The default implementation reads and discards the value; adapters
	/// override it when they can answer cheaper.
	fn is_readable(&self) -> bool {
		self.try_read().is_some()
	}
}

/// The producer side of a signal.
pub trait Duplex: Readable {
	/// Returns true when writes are currently accepted.
	fn is_writable(&self) -> bool;

	/// Writes a new value into the signal.
	///
	/// # Returns
	///
	/// `Err(SignalError::NotWritable)` when the signal does not accept
	/// writes right now. Implementations never panic on rejected writes and
	/// never drop them silently.
	fn write(&self, value: Self::Value) -> SignalResult<()>;
}

struct StateCell<T> {
	value: T,
	version: u64,
}

/// An owned mutable cell with identity tracking.
///
/// Handles are cheap clones sharing one cell; the cell lives as long as any
/// handle does, independent of any engine or store.
///
/// # Examples
///
/// ```
/// use nuages_core::{Duplex, Readable, State};
///
/// let name = State::new("django".to_string());
/// assert_eq!(name.try_read(), Some("django".to_string()));
///
/// let before = name.identity();
/// name.set("stephane".to_string());
/// assert_ne!(name.identity(), before);
/// assert_eq!(name.get(), "stephane");
/// ```
pub struct State<T> {
	cell: Rc<RefCell<StateCell<T>>>,
	id: CellId,
}

impl<T> State<T> {
	/// Creates a cell holding `value` at version zero.
	pub fn new(value: T) -> Self {
		Self {
			cell: Rc::new(RefCell::new(StateCell { value, version: 0 })),
			id: CellId::new(),
		}
	}

	/// Replaces the value and bumps the version.
	pub fn set(&self, value: T) {
		let mut cell = self.cell.borrow_mut();
		cell.value = value;
		cell.version += 1;
	}

	/// Mutates the value in place, bumping the version exactly once.
	pub fn update(&self, f: impl FnOnce(&mut T)) {
		let mut cell = self.cell.borrow_mut();
		f(&mut cell.value);
		cell.version += 1;
	}

	/// Returns the cell's write counter.
	pub fn version(&self) -> u64 {
		self.cell.borrow().version
	}

	/// Returns the cell's id.
	pub fn cell_id(&self) -> CellId {
		self.id
	}
}

impl<T: Clone> State<T> {
	/// Returns a clone of the current value.
	pub fn get(&self) -> T {
		self.cell.borrow().value.clone()
	}
}

impl<T> Clone for State<T> {
	fn clone(&self) -> Self {
		Self {
			cell: Rc::clone(&self.cell),
			id: self.id,
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let cell = self.cell.borrow();
		f.debug_struct("State")
			.field("id", &self.id)
			.field("value", &cell.value)
			.field("version", &cell.version)
			.finish()
	}
}

impl<T: Clone + 'static> Readable for State<T> {
	type Value = T;

	fn identity(&self) -> Identity {
		Identity::Versioned {
			cell: self.id,
			version: self.cell.borrow().version,
		}
	}

	fn try_read(&self) -> Option<T> {
		Some(self.cell.borrow().value.clone())
	}

	fn is_readable(&self) -> bool {
		true
	}
}

impl<T: Clone + 'static> Duplex for State<T> {
	fn is_writable(&self) -> bool {
		true
	}

	fn write(&self, value: T) -> SignalResult<()> {
		self.set(value);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_state_reads_back_value() {
		let count = State::new(5i64);
		assert_eq!(count.try_read(), Some(5));
		assert!(count.is_readable());
		assert!(count.is_writable());
	}

	#[test]
	fn test_set_moves_identity() {
		let count = State::new(0i64);
		let before = count.identity();
		count.set(1);
		assert_ne!(count.identity(), before);
		assert_eq!(count.version(), 1);
	}

	#[test]
	fn test_update_bumps_version_once() {
		let items = State::new(vec![1, 2]);
		items.update(|v| {
			v.push(3);
			v.push(4);
		});
		assert_eq!(items.version(), 1);
		assert_eq!(items.get(), vec![1, 2, 3, 4]);
	}

	#[test]
	fn test_identity_stable_across_reads() {
		let count = State::new(9i64);
		assert_eq!(count.identity(), count.identity());
		let _ = count.try_read();
		assert_eq!(count.identity(), count.identity());
	}

	#[test]
	fn test_clones_share_the_cell() {
		let a = State::new(String::from("x"));
		let b = a.clone();
		b.set(String::from("y"));
		assert_eq!(a.get(), "y");
		assert_eq!(a.identity(), b.identity());
	}

	#[test]
	fn test_two_cells_never_share_identity() {
		let a = State::new(1i64);
		let b = State::new(1i64);
		assert_ne!(a.identity(), b.identity());
	}

	#[test]
	fn test_write_through_duplex_trait() {
		let count = State::new(0i64);
		count.write(42).unwrap();
		assert_eq!(count.get(), 42);
	}
}
