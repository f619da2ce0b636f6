//! Element handles and binding machinery.
//!
//! ## Overview
//!
//! [`Ui::element`] returns an [`ElementHandle`]: a builder over the retained
//! host node that records attributes, properties, text children, event
//! handlers and nested content. Recording is all it does. Every binding
//! registers a deferred sync task that the engine runs in the cycle's
//! synchronization phase, where the captured-identity check and the shadow
//! value comparison decide whether the host is touched at all.
//!
//! Each binding owns a slot under the element's path (a `Binding` segment),
//! allocated in declaration order. Two-way bindings register the sync task
//! and the write-back handler against the same slot, which is what lets a
//! write-back mark its own echo as already synchronized.

use std::fmt;
use std::mem;
use std::rc::Rc;

use nuages_core::{Action, Duplex, Readable};
use tracing::warn;

use crate::context::{TEXT_TAG, Ui};
use crate::engine::{FlagWriteBack, Handler, HandlerEntry, OrderFrame, SyncTask, TextWriteBack};
use crate::error::UiResult;
use crate::path::{KeySegment, PathKey};
use crate::store::{BindingState, NodeStore, Shadow};
use crate::surface::{NodeRef, PropValue, Surface};

/// Builder over one declared element.
///
/// Methods record; the engine applies. Dropping the handle closes the
/// element's child list for this cycle, so keep it alive across everything
/// that should count as its content.
pub struct ElementHandle<'h, 'a> {
	ui: &'h mut Ui<'a>,
	node: NodeRef,
	path: PathKey,
	children: Vec<NodeRef>,
	child_cursor: u32,
	bindings: u32,
}

impl<'h, 'a> ElementHandle<'h, 'a> {
	pub(crate) fn new(ui: &'h mut Ui<'a>, node: NodeRef, path: PathKey) -> Self {
		Self {
			ui,
			node,
			path,
			children: Vec::new(),
			child_cursor: 0,
			bindings: 0,
		}
	}

	/// The retained host node, for host-integration code.
	pub fn node(&self) -> NodeRef {
		self.node
	}

	/// Allocates this element's next binding slot and keeps it alive.
	fn binding_path(&mut self) -> PathKey {
		let slot = self.bindings;
		self.bindings += 1;
		let path = self.path.child(KeySegment::Binding(slot));
		self.ui.store.acquire(&path);
		path
	}

	fn child_text_node(&mut self) -> UiResult<(PathKey, NodeRef)> {
		let slot = self.child_cursor;
		self.child_cursor += 1;
		let path = self.path.child(KeySegment::Slot(slot));
		let node = self
			.ui
			.materialize(&path, TEXT_TAG, |surface| surface.create_text(""))?;
		self.children.push(node);
		Ok((path, node))
	}

	/// A fixed attribute.
	///
	/// Applied when the node is created and re-applied only if the literal
	/// differs from what was last pushed.
	pub fn attr(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
		let path = self.binding_path();
		self.ui
			.out
			.tasks
			.push(literal_attr_task(path, self.node, name.to_string(), value.into()));
		self
	}

	/// A boolean attribute present while `condition` reads true.
	///
	/// False and unavailable both render as absent.
	pub fn attr_if<C>(&mut self, name: &str, condition: C) -> &mut Self
	where
		C: Readable<Value = bool> + 'static,
	{
		let path = self.binding_path();
		self.ui
			.out
			.tasks
			.push(presence_attr_task(path, self.node, name.to_string(), condition));
		self
	}

	/// An attribute bound to a string signal.
	///
	/// Synchronized through the captured-identity protocol; an unavailable
	/// signal removes the attribute.
	pub fn attr_signal<S>(&mut self, name: &str, content: S) -> &mut Self
	where
		S: Readable<Value = String> + 'static,
	{
		let path = self.binding_path();
		self.ui
			.out
			.tasks
			.push(bound_attr_task(path, self.node, name.to_string(), content));
		self
	}

	/// A boolean attribute re-evaluated every cycle by plain polling.
	///
	/// For conditions that have no identity to capture, such as action
	/// readiness; only the boolean shadow comparison keeps this cheap.
	pub(crate) fn attr_polled<F>(&mut self, name: &str, poll: F) -> &mut Self
	where
		F: FnOnce() -> bool + 'static,
	{
		let path = self.binding_path();
		self.ui
			.out
			.tasks
			.push(polled_attr_task(path, self.node, name.to_string(), poll));
		self
	}

	/// A property bound to a signal.
	///
	/// An unavailable signal pushes the property's empty-text form once.
	pub fn prop<S>(&mut self, name: &str, source: S) -> &mut Self
	where
		S: Readable + 'static,
		S::Value: Into<PropValue>,
	{
		let path = self.binding_path();
		self.ui
			.out
			.tasks
			.push(bound_prop_task(path, self.node, name.to_string(), source));
		self
	}

	/// A text child bound to a string signal.
	pub fn text<S>(&mut self, content: S) -> UiResult<&mut Self>
	where
		S: Readable<Value = String> + 'static,
	{
		let (path, node) = self.child_text_node()?;
		self.ui.out.tasks.push(bound_text_task(path, node, content));
		Ok(self)
	}

	/// A fixed text child.
	pub fn text_literal(&mut self, content: impl Into<String>) -> UiResult<&mut Self> {
		let (path, node) = self.child_text_node()?;
		self.ui
			.out
			.tasks
			.push(literal_text_task(path, node, content.into()));
		Ok(self)
	}

	/// Performs `action` when the host delivers an event of `kind`.
	///
	/// Readiness is checked at delivery time; an event for an action that
	/// is not ready is dropped with a warning.
	pub fn on<A>(&mut self, kind: &str, action: A) -> &mut Self
	where
		A: Action + 'static,
	{
		self.ui.out.handlers.push(HandlerEntry {
			node: self.node,
			kind: kind.to_string(),
			handler: Handler::Perform(Rc::new(action)),
		});
		self
	}

	/// Like [`ElementHandle::on`], but only for events whose key matches.
	pub fn on_key<A>(&mut self, kind: &str, key: &str, action: A) -> &mut Self
	where
		A: Action + 'static,
	{
		self.ui.out.handlers.push(HandlerEntry {
			node: self.node,
			kind: kind.to_string(),
			handler: Handler::PerformKey {
				key: key.to_string(),
				action: Rc::new(action),
			},
		});
		self
	}

	/// Two-way text binding over the `value` property and `input` events.
	///
	/// Each input event runs the write-back transaction: the signal is
	/// written, the binding's shadow takes the typed text, and the signal's
	/// post-write identity is captured, so the following cycle recognizes
	/// the change as the host's own and pushes nothing back.
	pub fn on_input<S>(&mut self, value: S) -> &mut Self
	where
		S: Duplex<Value = String> + Clone + 'static,
	{
		let path = self.binding_path();
		self.ui
			.out
			.tasks
			.push(value_binding_task(path.clone(), self.node, value.clone()));
		self.ui.out.handlers.push(HandlerEntry {
			node: self.node,
			kind: "input".to_string(),
			handler: Handler::WriteText(text_write_back(path, self.node, value)),
		});
		self
	}

	/// Two-way validated text binding.
	///
	/// `validate` parses each input event's text. A parse failure keeps the
	/// candidate in the retained entry, leaves the upstream signal alone
	/// and marks the element with a `data-invalid` attribute carrying the
	/// message; an upstream identity change discards the candidate.
	pub(crate) fn on_input_validated<S, T, V>(&mut self, value: S, validate: V) -> &mut Self
	where
		S: Duplex<Value = T> + Clone + 'static,
		T: Clone + fmt::Display + 'static,
		V: Fn(&str) -> Result<T, String> + 'static,
	{
		let path = self.binding_path();
		self.ui
			.out
			.tasks
			.push(validated_value_task(path.clone(), self.node, value.clone()));
		self.ui
			.out
			.tasks
			.push(invalid_marker_task(path.clone(), self.node));
		self.ui.out.handlers.push(HandlerEntry {
			node: self.node,
			kind: "input".to_string(),
			handler: Handler::WriteText(validated_write_back(path, self.node, value, validate)),
		});
		self
	}

	/// Two-way boolean binding over the `checked` property and `change`
	/// events.
	pub fn on_toggle<S>(&mut self, value: S) -> &mut Self
	where
		S: Duplex<Value = bool> + Clone + 'static,
	{
		let path = self.binding_path();
		self.ui
			.out
			.tasks
			.push(checked_binding_task(path.clone(), self.node, value.clone()));
		self.ui.out.handlers.push(HandlerEntry {
			node: self.node,
			kind: "change".to_string(),
			handler: Handler::WriteFlag(flag_write_back(path, self.node, value)),
		});
		self
	}

	/// Traverses nested content as this element's children.
	///
	/// May be called more than once; later calls continue the child
	/// positions where the previous one stopped.
	pub fn children<B>(&mut self, body: B) -> UiResult<&mut Self>
	where
		B: FnOnce(&mut Ui<'_>) -> UiResult<()>,
	{
		self.ui.out.frames.push(OrderFrame {
			node: self.node,
			children: mem::take(&mut self.children),
		});
		let saved_path = mem::replace(&mut self.ui.path, self.path.clone());
		let saved_cursor = mem::replace(&mut self.ui.cursor, self.child_cursor);
		let result = body(self.ui);
		self.child_cursor = self.ui.cursor;
		self.ui.path = saved_path;
		self.ui.cursor = saved_cursor;
		if let Some(frame) = self.ui.out.frames.pop() {
			self.children = frame.children;
		}
		result?;
		Ok(self)
	}
}

impl Drop for ElementHandle<'_, '_> {
	fn drop(&mut self) {
		self.ui.out.orders.push(OrderFrame {
			node: self.node,
			children: mem::take(&mut self.children),
		});
	}
}

/// Performs `action` when Enter is pressed inside the element.
pub fn on_enter<A>(handle: &mut ElementHandle<'_, '_>, action: A)
where
	A: Action + 'static,
{
	handle.on_key("keydown", "Enter", action);
}

/// Performs `action` when Escape is pressed inside the element.
pub fn on_escape<A>(handle: &mut ElementHandle<'_, '_>, action: A)
where
	A: Action + 'static,
{
	handle.on_key("keydown", "Escape", action);
}

// ==== sync task constructors ====

fn push_text_value(
	surface: &mut dyn Surface,
	node: NodeRef,
	binding: &mut BindingState,
	desired: Shadow,
) -> UiResult<()> {
	if binding.shadow != desired {
		let text = match &desired {
			Shadow::Value(PropValue::Text(text)) => text.clone(),
			_ => String::new(),
		};
		surface.set_prop(node, "value", PropValue::Text(text))?;
		binding.shadow = desired;
		binding.version += 1;
	}
	Ok(())
}

pub(crate) fn literal_attr_task(
	path: PathKey,
	node: NodeRef,
	name: String,
	value: String,
) -> SyncTask {
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let desired = Shadow::Value(PropValue::Text(value));
		if binding.shadow != desired {
			if let Shadow::Value(PropValue::Text(text)) = &desired {
				surface.set_attr(node, &name, text)?;
			}
			binding.shadow = desired;
			binding.version += 1;
		}
		Ok(())
	})
}

pub(crate) fn bound_attr_task<S>(path: PathKey, node: NodeRef, name: String, content: S) -> SyncTask
where
	S: Readable<Value = String> + 'static,
{
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let identity = content.identity();
		if binding.captured.matches(&identity) {
			return Ok(());
		}
		match content.try_read() {
			Some(text) => {
				let desired = Shadow::Value(PropValue::Text(text));
				if binding.shadow != desired {
					if let Shadow::Value(PropValue::Text(text)) = &desired {
						surface.set_attr(node, &name, text)?;
					}
					binding.shadow = desired;
					binding.version += 1;
				}
				binding.captured.capture(identity);
			}
			None => {
				if binding.shadow != Shadow::Absent {
					surface.remove_attr(node, &name)?;
					binding.shadow = Shadow::Absent;
					binding.version += 1;
				}
				binding.captured.clear();
			}
		}
		Ok(())
	})
}

pub(crate) fn presence_attr_task<C>(
	path: PathKey,
	node: NodeRef,
	name: String,
	condition: C,
) -> SyncTask
where
	C: Readable<Value = bool> + 'static,
{
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let identity = condition.identity();
		if binding.captured.matches(&identity) {
			return Ok(());
		}
		let read = condition.try_read();
		let desired = match read {
			Some(true) => Shadow::Value(PropValue::Bool(true)),
			Some(false) | None => Shadow::Absent,
		};
		if binding.shadow != desired {
			match &desired {
				Shadow::Value(_) => surface.set_attr(node, &name, "")?,
				_ => surface.remove_attr(node, &name)?,
			}
			binding.shadow = desired;
			binding.version += 1;
		}
		match read {
			Some(_) => binding.captured.capture(identity),
			None => binding.captured.clear(),
		}
		Ok(())
	})
}

pub(crate) fn polled_attr_task<F>(path: PathKey, node: NodeRef, name: String, poll: F) -> SyncTask
where
	F: FnOnce() -> bool + 'static,
{
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let desired = if poll() {
			Shadow::Value(PropValue::Bool(true))
		} else {
			Shadow::Absent
		};
		if binding.shadow != desired {
			match &desired {
				Shadow::Value(_) => surface.set_attr(node, &name, "")?,
				_ => surface.remove_attr(node, &name)?,
			}
			binding.shadow = desired;
			binding.version += 1;
		}
		Ok(())
	})
}

pub(crate) fn bound_prop_task<S>(path: PathKey, node: NodeRef, name: String, source: S) -> SyncTask
where
	S: Readable + 'static,
	S::Value: Into<PropValue>,
{
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let identity = source.identity();
		if binding.captured.matches(&identity) {
			return Ok(());
		}
		match source.try_read() {
			Some(value) => {
				let value: PropValue = value.into();
				let desired = Shadow::Value(value.clone());
				if binding.shadow != desired {
					surface.set_prop(node, &name, value)?;
					binding.shadow = desired;
					binding.version += 1;
				}
				binding.captured.capture(identity);
			}
			None => {
				if binding.shadow != Shadow::Absent {
					surface.set_prop(node, &name, PropValue::Text(String::new()))?;
					binding.shadow = Shadow::Absent;
					binding.version += 1;
				}
				binding.captured.clear();
			}
		}
		Ok(())
	})
}

pub(crate) fn bound_text_task<S>(path: PathKey, node: NodeRef, content: S) -> SyncTask
where
	S: Readable<Value = String> + 'static,
{
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let identity = content.identity();
		if binding.captured.matches(&identity) {
			return Ok(());
		}
		let read = content.try_read();
		let desired = match &read {
			Some(text) => Shadow::Value(PropValue::Text(text.clone())),
			None => Shadow::Absent,
		};
		if binding.shadow != desired {
			let text = match &desired {
				Shadow::Value(PropValue::Text(text)) => text.clone(),
				_ => String::new(),
			};
			surface.set_text(node, &text)?;
			binding.shadow = desired;
			binding.version += 1;
		}
		match read {
			Some(_) => binding.captured.capture(identity),
			None => binding.captured.clear(),
		}
		Ok(())
	})
}

pub(crate) fn literal_text_task(path: PathKey, node: NodeRef, content: String) -> SyncTask {
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let desired = Shadow::Value(PropValue::Text(content));
		if binding.shadow != desired {
			if let Shadow::Value(PropValue::Text(text)) = &desired {
				surface.set_text(node, text)?;
			}
			binding.shadow = desired;
			binding.version += 1;
		}
		Ok(())
	})
}

pub(crate) fn value_binding_task<S>(path: PathKey, node: NodeRef, value: S) -> SyncTask
where
	S: Duplex<Value = String> + 'static,
{
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let identity = value.identity();
		if binding.captured.matches(&identity) {
			return Ok(());
		}
		match value.try_read() {
			Some(text) => {
				push_text_value(surface, node, binding, Shadow::Value(PropValue::Text(text)))?;
				binding.captured.capture(identity);
			}
			None => {
				push_text_value(surface, node, binding, Shadow::Absent)?;
				binding.captured.clear();
			}
		}
		Ok(())
	})
}

pub(crate) fn validated_value_task<S, T>(path: PathKey, node: NodeRef, value: S) -> SyncTask
where
	S: Duplex<Value = T> + 'static,
	T: Clone + fmt::Display + 'static,
{
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let identity = value.identity();
		if binding.captured.matches(&identity) {
			// Unchanged upstream; a held candidate stays on display.
			return Ok(());
		}
		// The upstream moved, so it wins over any candidate.
		binding.validation.clear();
		match value.try_read() {
			Some(current) => {
				push_text_value(
					surface,
					node,
					binding,
					Shadow::Value(PropValue::Text(current.to_string())),
				)?;
				binding.captured.capture(identity);
			}
			None => {
				push_text_value(surface, node, binding, Shadow::Absent)?;
				binding.captured.clear();
			}
		}
		Ok(())
	})
}

pub(crate) fn invalid_marker_task(path: PathKey, node: NodeRef) -> SyncTask {
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let desired = match binding.validation.message() {
			Some(message) => Shadow::Value(PropValue::Text(message.to_string())),
			None => Shadow::Absent,
		};
		if binding.invalid_shadow == desired {
			return Ok(());
		}
		match &desired {
			Shadow::Value(PropValue::Text(message)) => {
				surface.set_attr(node, "data-invalid", message)?;
			}
			_ => surface.remove_attr(node, "data-invalid")?,
		}
		binding.invalid_shadow = desired;
		Ok(())
	})
}

pub(crate) fn checked_binding_task<S>(path: PathKey, node: NodeRef, value: S) -> SyncTask
where
	S: Duplex<Value = bool> + 'static,
{
	Box::new(move |store: &mut NodeStore, surface: &mut dyn Surface| {
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		let identity = value.identity();
		if binding.captured.matches(&identity) {
			return Ok(());
		}
		let read = value.try_read();
		let desired = match read {
			Some(flag) => Shadow::Value(PropValue::Bool(flag)),
			None => Shadow::Absent,
		};
		if binding.shadow != desired {
			let flag = matches!(desired, Shadow::Value(PropValue::Bool(true)));
			surface.set_prop(node, "checked", PropValue::Bool(flag))?;
			binding.shadow = desired;
			binding.version += 1;
		}
		match read {
			Some(_) => binding.captured.capture(identity),
			None => binding.captured.clear(),
		}
		Ok(())
	})
}

// ==== write-back constructors ====

fn text_write_back<S>(path: PathKey, node: NodeRef, value: S) -> TextWriteBack
where
	S: Duplex<Value = String> + Clone + 'static,
{
	Rc::new(move |store, surface, text| {
		if !value.is_writable() {
			warn!("dropping input event for an unwritable binding");
			return Ok(());
		}
		value.write(text.to_string())?;
		surface.set_prop(node, "value", PropValue::Text(text.to_string()))?;
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		binding.shadow = Shadow::Value(PropValue::Text(text.to_string()));
		binding.captured.capture(value.identity());
		binding.version += 1;
		binding.validation.clear();
		Ok(())
	})
}

fn validated_write_back<S, T, V>(path: PathKey, node: NodeRef, value: S, validate: V) -> TextWriteBack
where
	S: Duplex<Value = T> + Clone + 'static,
	T: Clone + 'static,
	V: Fn(&str) -> Result<T, String> + 'static,
{
	Rc::new(move |store, surface, text| {
		match validate(text) {
			Ok(parsed) => {
				if !value.is_writable() {
					warn!("dropping input event for an unwritable binding");
					return Ok(());
				}
				value.write(parsed)?;
				surface.set_prop(node, "value", PropValue::Text(text.to_string()))?;
				let Some(entry) = store.get_mut(&path) else {
					return Ok(());
				};
				let binding = entry.binding_mut();
				binding.shadow = Shadow::Value(PropValue::Text(text.to_string()));
				binding.captured.capture(value.identity());
				binding.version += 1;
				binding.validation.clear();
			}
			Err(message) => {
				// The candidate never reaches the signal; it lives in the
				// entry and stays on display. The capture is left alone:
				// upstream has not moved, so the next sync skips this
				// binding and the candidate survives it.
				surface.set_prop(node, "value", PropValue::Text(text.to_string()))?;
				let Some(entry) = store.get_mut(&path) else {
					return Ok(());
				};
				let binding = entry.binding_mut();
				binding.shadow = Shadow::Value(PropValue::Text(text.to_string()));
				binding.version += 1;
				binding.validation.reject(text.to_string(), message);
			}
		}
		Ok(())
	})
}

fn flag_write_back<S>(path: PathKey, node: NodeRef, value: S) -> FlagWriteBack
where
	S: Duplex<Value = bool> + Clone + 'static,
{
	Rc::new(move |store, surface, checked| {
		if !value.is_writable() {
			warn!("dropping change event for an unwritable binding");
			return Ok(());
		}
		value.write(checked)?;
		surface.set_prop(node, "checked", PropValue::Bool(checked))?;
		let Some(entry) = store.get_mut(&path) else {
			return Ok(());
		};
		let binding = entry.binding_mut();
		binding.shadow = Shadow::Value(PropValue::Bool(checked));
		binding.captured.capture(value.identity());
		binding.version += 1;
		Ok(())
	})
}
