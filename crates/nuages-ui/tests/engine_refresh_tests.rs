//! Refresh cycle integration tests.
//!
//! # Properties Tested
//!
//! - A refresh with no upstream changes issues zero host operations.
//! - An upstream change issues exactly the write it requires.
//! - Conditional arms retain state independently; the untaken arm's
//!   state is swept once the condition switches.
//! - A tag change replaces the host node but keeps the retained state
//!   underneath the same structural position.

use std::cell::Cell;
use std::rc::Rc;

use nuages_core::State;
use nuages_ui::testing::{SurfaceOp, TestSurface};
use nuages_ui::{Engine, Ui};

// =============================================================================
// Quiet Cycles
// =============================================================================

#[test]
fn test_quiet_refresh_issues_zero_operations() {
	let value = State::new("bonjour".to_string());
	let signal = value.clone();
	let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
		ui.element("section")?
			.attr("class", "greeting")
			.text(signal.clone())?;
		Ok(())
	});

	engine.refresh().expect("initial refresh");
	engine.surface_mut().take_ops();

	engine.refresh().expect("quiet refresh");
	let ops = engine.surface_mut().take_ops();
	assert!(ops.is_empty(), "quiet cycle issued {ops:?}");
}

#[test]
fn test_upstream_change_issues_exactly_one_write() {
	let value = State::new("first".to_string());
	let signal = value.clone();
	let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
		ui.element("p")?.text(signal.clone())?;
		Ok(())
	});
	engine.refresh().expect("initial refresh");
	engine.surface_mut().take_ops();

	value.set("second".to_string());
	engine.refresh().expect("refresh after write");

	let ops = engine.surface_mut().take_ops();
	assert_eq!(ops.len(), 1, "expected one write, got {ops:?}");
	assert!(matches!(&ops[0], SurfaceOp::SetText { text, .. } if text == "second"));
}

// =============================================================================
// Conditionals
// =============================================================================

#[test]
fn test_conditional_arms_retain_state_independently() {
	let show = State::new(true);
	let seeds = Rc::new(Cell::new(0u32));
	let condition = show.clone();
	let counter = Rc::clone(&seeds);
	let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
		ui.when_else(
			condition.clone(),
			|ui| {
				ui.state_with(|| {
					counter.set(counter.get() + 1);
					0u32
				})?;
				ui.element("p").map(drop)
			},
			|ui| ui.element("span").map(drop),
		)
	});

	engine.refresh().expect("cycle 1");
	engine.refresh().expect("cycle 2");
	assert_eq!(seeds.get(), 1);
	assert_eq!(engine.surface().find_by_tag("p").len(), 1);

	show.set(false);
	engine.refresh().expect("cycle 3");
	assert!(engine.surface().find_by_tag("p").is_empty());
	assert_eq!(engine.surface().find_by_tag("span").len(), 1);

	// Switching back reseeds: the abandoned arm's state was swept.
	show.set(true);
	engine.refresh().expect("cycle 4");
	assert_eq!(seeds.get(), 2);
}

// =============================================================================
// Tag Changes
// =============================================================================

#[test]
fn test_tag_change_replaces_node_and_keeps_state() {
	let heading = State::new(false);
	let seeds = Rc::new(Cell::new(0u32));
	let flag = heading.clone();
	let counter = Rc::clone(&seeds);
	let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
		let tag = if flag.get() { "h1" } else { "p" };
		ui.element(tag)?.children(|ui| {
			ui.state_with(|| {
				counter.set(counter.get() + 1);
				0u32
			})?;
			ui.element("em").map(drop)
		})?;
		Ok(())
	});

	engine.refresh().expect("initial refresh");
	let old = engine.surface().find_by_tag("p")[0];
	let old_child = engine.surface().find_by_tag("em")[0];
	engine.surface_mut().take_ops();

	heading.set(true);
	engine.refresh().expect("refresh after tag change");

	let ops = engine.surface_mut().take_ops();
	assert!(ops.contains(&SurfaceOp::DestroyNode { node: old }));
	assert!(engine.surface().find_by_tag("p").is_empty());

	let new = engine.surface().find_by_tag("h1")[0];
	assert_ne!(new, old);
	// Descendants were rebuilt on fresh nodes under the replacement.
	let new_child = engine.surface().find_by_tag("em")[0];
	assert_ne!(new_child, old_child);
	assert_eq!(engine.surface().children(new), vec![new_child]);
	// Retained state at the same position survived the swap.
	assert_eq!(seeds.get(), 1);
}
