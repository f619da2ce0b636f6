//! The injected host surface.
//!
//! ## Overview
//!
//! The engine never talks to a concrete host. It drives a [`Surface`]: a
//! tree of opaque nodes with attributes, properties, text and listeners.
//! Hosts implement the trait once (a DOM bridge, a terminal renderer, a
//! scene graph) and feed events back through `Engine::dispatch`.
//!
//! All methods are fallible; the engine treats a surface failure as fatal
//! to the running cycle and propagates it.

use serde::{Deserialize, Serialize};

use crate::error::SurfaceResult;

/// Opaque handle to one host node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef(u64);

impl NodeRef {
	/// Wraps a raw host id.
	pub fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// The raw host id.
	pub fn raw(self) -> u64 {
		self.0
	}
}

/// A host property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropValue {
	/// Text property, e.g. an input's `value`.
	Text(String),
	/// Boolean property, e.g. a checkbox's `checked`.
	Bool(bool),
	/// Numeric property.
	Number(f64),
}

impl From<String> for PropValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<&str> for PropValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<f64> for PropValue {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}

/// An event delivered by the host.
///
/// Only the fields relevant to the event kind are populated; the rest stay
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceEvent {
	/// Event kind, e.g. `"click"`, `"input"`, `"change"`, `"keydown"`.
	pub kind: String,
	/// Current text value, for input events.
	pub value: Option<String>,
	/// Current checked state, for change events on toggles.
	pub checked: Option<bool>,
	/// Key name, for keyboard events.
	pub key: Option<String>,
}

impl SurfaceEvent {
	/// An event of `kind` with no payload.
	pub fn new(kind: impl Into<String>) -> Self {
		Self { kind: kind.into(), value: None, checked: None, key: None }
	}

	/// A `click` event.
	pub fn click() -> Self {
		Self::new("click")
	}

	/// An `input` event carrying the field's current text.
	pub fn input(value: impl Into<String>) -> Self {
		Self { value: Some(value.into()), ..Self::new("input") }
	}

	/// A `change` event carrying a toggle's checked state.
	pub fn change_checked(checked: bool) -> Self {
		Self { checked: Some(checked), ..Self::new("change") }
	}

	/// A `keydown` event carrying the key name.
	pub fn keydown(key: impl Into<String>) -> Self {
		Self { key: Some(key.into()), ..Self::new("keydown") }
	}
}

/// A tree-shaped host the engine renders into.
///
/// Implementations are expected to be plain state holders: validate, apply,
/// remember. Anything clever (batching, diffing) belongs to the engine,
/// which already guarantees it only issues operations that change something.
pub trait Surface {
	/// The pre-existing node the engine renders under.
	fn root(&self) -> NodeRef;

	/// Creates a detached element node.
	fn create_element(&mut self, tag: &str) -> SurfaceResult<NodeRef>;

	/// Creates a detached text node.
	fn create_text(&mut self, text: &str) -> SurfaceResult<NodeRef>;

	/// Sets an attribute. Setting an attribute twice overwrites.
	fn set_attr(&mut self, node: NodeRef, name: &str, value: &str) -> SurfaceResult<()>;

	/// Removes an attribute. Removing an absent attribute is a no-op.
	fn remove_attr(&mut self, node: NodeRef, name: &str) -> SurfaceResult<()>;

	/// Sets a property.
	fn set_prop(&mut self, node: NodeRef, name: &str, value: PropValue) -> SurfaceResult<()>;

	/// Replaces a text node's content.
	fn set_text(&mut self, node: NodeRef, text: &str) -> SurfaceResult<()>;

	/// Inserts `child` so it ends up at `index` among `parent`'s children.
	fn insert_child(&mut self, parent: NodeRef, child: NodeRef, index: usize) -> SurfaceResult<()>;

	/// Moves an existing child of `parent` to `to_index`.
	fn move_child(&mut self, parent: NodeRef, child: NodeRef, to_index: usize) -> SurfaceResult<()>;

	/// Destroys a node and its whole subtree, detaching it first.
	fn destroy_node(&mut self, node: NodeRef) -> SurfaceResult<()>;

	/// Subscribes the engine to events of `kind` on `node`.
	fn add_listener(&mut self, node: NodeRef, kind: &str) -> SurfaceResult<()>;

	/// Drops the subscription for events of `kind` on `node`.
	fn remove_listener(&mut self, node: NodeRef, kind: &str) -> SurfaceResult<()>;
}
