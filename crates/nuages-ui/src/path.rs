//! Tree-path addressing for retained state.
//!
//! ## Overview
//!
//! Every retained position is addressed by a [`PathKey`]: the sequence of
//! segments walked to reach it during traversal. Sequential declarations
//! take [`KeySegment::Slot`] positions; conditional arms isolate their
//! contents under a [`KeySegment::Branch`]; keyed list elements travel with
//! their [`KeySegment::Item`], which is what lets their state follow them
//! across reorders.
//!
//! Paths order lexicographically, so a parent sorts immediately before its
//! descendants. The store's sweep leans on that to find topmost removed
//! nodes.

use std::fmt;
use std::rc::Rc;

/// Identity of one keyed list element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
	/// Position-derived key, for lists that never reorder.
	Index(usize),
	/// Integer identity carried by the item itself.
	Int(i64),
	/// Text identity carried by the item itself.
	Text(Rc<str>),
}

impl From<usize> for ItemKey {
	fn from(value: usize) -> Self {
		Self::Index(value)
	}
}

impl From<i64> for ItemKey {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<&str> for ItemKey {
	fn from(value: &str) -> Self {
		Self::Text(Rc::from(value))
	}
}

impl From<String> for ItemKey {
	fn from(value: String) -> Self {
		Self::Text(Rc::from(value))
	}
}

impl fmt::Display for ItemKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Index(i) => write!(f, "[{i}]"),
			Self::Int(n) => write!(f, "{n}"),
			Self::Text(s) => write!(f, "{s}"),
		}
	}
}

/// One step of a retained-state path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySegment {
	/// Sequential position within the current scope.
	Slot(u32),
	/// Taken arm of a conditional.
	Branch(u32),
	/// Keyed list element.
	Item(ItemKey),
	/// Per-binding storage slot under an element.
	Binding(u32),
}

impl fmt::Display for KeySegment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Slot(n) => write!(f, "{n}"),
			Self::Branch(n) => write!(f, "b{n}"),
			Self::Item(key) => write!(f, "k:{key}"),
			Self::Binding(n) => write!(f, "@{n}"),
		}
	}
}

/// Address of one retained position in the traversal tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PathKey(Vec<KeySegment>);

impl PathKey {
	/// The empty path at the traversal root.
	pub fn root() -> Self {
		Self::default()
	}

	/// Returns this path extended by one segment.
	pub fn child(&self, segment: KeySegment) -> Self {
		let mut segments = self.0.clone();
		segments.push(segment);
		Self(segments)
	}

	/// The segments from the root down.
	pub fn segments(&self) -> &[KeySegment] {
		&self.0
	}

	/// Returns true when `prefix` is an ancestor of or equal to this path.
	pub fn starts_with(&self, prefix: &PathKey) -> bool {
		self.0.starts_with(&prefix.0)
	}
}

impl fmt::Display for PathKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.0.is_empty() {
			return write!(f, "/");
		}
		for segment in &self.0 {
			write!(f, "/{segment}")?;
		}
		Ok(())
	}
}
