//! Ready-made widgets.
//!
//! ## Overview
//!
//! Thin combinations of [`Ui::element`] and the [`ElementHandle`] binding
//! methods for the common form controls: text inputs, checkboxes, buttons
//! and links. Each returns the underlying handle so callers can stack
//! further attributes or handlers on top.

use std::fmt;
use std::rc::Rc;

use nuages_core::{Action, Duplex, Readable};

use crate::context::Ui;
use crate::element::ElementHandle;
use crate::error::UiResult;

/// A text input two-way bound to `value`.
pub fn input<'h, 'a, S>(ui: &'h mut Ui<'a>, value: S) -> UiResult<ElementHandle<'h, 'a>>
where
	S: Duplex<Value = String> + Clone + 'static,
{
	let mut handle = ui.element("input")?;
	handle.on_input(value);
	Ok(handle)
}

/// A text input whose edits must pass `validate` before reaching `value`.
///
/// Rejected text stays visible in the control and the element carries a
/// `data-invalid` attribute with the validation message until the text
/// parses again or the upstream value changes.
pub fn input_validated<'h, 'a, S, T, V>(
	ui: &'h mut Ui<'a>,
	value: S,
	validate: V,
) -> UiResult<ElementHandle<'h, 'a>>
where
	S: Duplex<Value = T> + Clone + 'static,
	T: Clone + fmt::Display + 'static,
	V: Fn(&str) -> Result<T, String> + 'static,
{
	let mut handle = ui.element("input")?;
	handle.on_input_validated(value, validate);
	Ok(handle)
}

/// A checkbox two-way bound to `value`.
pub fn checkbox<'h, 'a, S>(ui: &'h mut Ui<'a>, value: S) -> UiResult<ElementHandle<'h, 'a>>
where
	S: Duplex<Value = bool> + Clone + 'static,
{
	let mut handle = ui.element("input")?;
	handle.attr("type", "checkbox");
	handle.on_toggle(value);
	Ok(handle)
}

/// A button performing `action` on click.
///
/// The button carries a `disabled` attribute whenever the action is not
/// ready, so the control's availability tracks the same predicate that
/// gates delivery.
pub fn button<'h, 'a, L, A>(
	ui: &'h mut Ui<'a>,
	label: L,
	action: A,
) -> UiResult<ElementHandle<'h, 'a>>
where
	L: Readable<Value = String> + 'static,
	A: Action + 'static,
{
	let action = Rc::new(action);
	let ready = Rc::clone(&action);
	let mut handle = ui.element("button")?;
	handle.text(label)?;
	handle.attr_polled("disabled", move || !ready.is_ready());
	handle.on("click", action);
	Ok(handle)
}

/// An anchor performing `action` on click.
pub fn link<'h, 'a, L, A>(
	ui: &'h mut Ui<'a>,
	label: L,
	action: A,
) -> UiResult<ElementHandle<'h, 'a>>
where
	L: Readable<Value = String> + 'static,
	A: Action + 'static,
{
	let mut handle = ui.element("a")?;
	handle.text(label)?;
	handle.on("click", action);
	Ok(handle)
}

/// A bare text node bound to `content`.
pub fn text_node<S>(ui: &mut Ui<'_>, content: S) -> UiResult<()>
where
	S: Readable<Value = String> + 'static,
{
	ui.text(content)
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;
	use std::rc::Rc;

	use nuages_core::{State, callback_ready, constant};

	use super::*;
	use crate::engine::Engine;
	use crate::surface::{PropValue, SurfaceEvent};
	use crate::testing::TestSurface;

	// ==== input ====

	#[test]
	fn test_input_mirrors_signal_value() {
		let value = State::new("hello".to_string());
		let signal = value.clone();
		let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
			input(ui, signal.clone()).map(drop)
		});

		engine.refresh().unwrap();

		let node = engine.surface().find_by_tag("input")[0];
		assert_eq!(
			engine.surface().prop(node, "value"),
			Some(&PropValue::Text("hello".to_string()))
		);
		assert!(engine.surface().listeners(node).contains("input"));
	}

	// ==== checkbox ====

	#[test]
	fn test_checkbox_renders_type_and_checked() {
		let flag = State::new(true);
		let signal = flag.clone();
		let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
			checkbox(ui, signal.clone()).map(drop)
		});

		engine.refresh().unwrap();

		let node = engine.surface().find_by_tag("input")[0];
		assert_eq!(engine.surface().attr(node, "type"), Some("checkbox"));
		assert_eq!(
			engine.surface().prop(node, "checked"),
			Some(&PropValue::Bool(true))
		);

		engine
			.dispatch(node, SurfaceEvent::change_checked(false))
			.unwrap();
		assert!(!flag.get());
	}

	// ==== button ====

	#[test]
	fn test_button_disabled_follows_readiness() {
		let gate = State::new(false);
		let ready = gate.clone();
		let action = callback_ready(move || ready.get(), || {});
		let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
			button(ui, constant("save".to_string()), action.clone()).map(drop)
		});

		engine.refresh().unwrap();
		let node = engine.surface().find_by_tag("button")[0];
		assert_eq!(engine.surface().attr(node, "disabled"), Some(""));
		assert_eq!(engine.surface().text_content(node), "save");

		gate.set(true);
		engine.refresh().unwrap();
		assert_eq!(engine.surface().attr(node, "disabled"), None);
	}

	// ==== link ====

	#[test]
	fn test_link_click_performs_action() {
		let clicks = Rc::new(Cell::new(0u32));
		let counter = Rc::clone(&clicks);
		let action = nuages_core::callback(move || counter.set(counter.get() + 1));
		let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
			link(ui, constant("docs".to_string()), action.clone()).map(drop)
		});

		engine.refresh().unwrap();
		let node = engine.surface().find_by_tag("a")[0];
		engine.dispatch(node, SurfaceEvent::click()).unwrap();

		assert_eq!(clicks.get(), 1);
	}
}
