//! Retained state integration tests.
//!
//! # Properties Tested
//!
//! - A state slot seeds once and survives any number of refresh cycles.
//! - External writes to a retained handle reach the tree on the next
//!   flush.
//! - Named scopes keep their state when positional siblings shift.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use nuages_core::{State, as_text};
use nuages_ui::testing::TestSurface;
use nuages_ui::{Engine, Surface, Ui};

#[test]
fn test_state_slot_seeds_once_and_survives() {
	let seeds = Rc::new(Cell::new(0u32));
	let shared: Rc<RefCell<Option<State<i64>>>> = Rc::new(RefCell::new(None));
	let counter = Rc::clone(&seeds);
	let escape = Rc::clone(&shared);
	let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
		let count = ui.state_with(|| {
			counter.set(counter.get() + 1);
			0i64
		})?;
		*escape.borrow_mut() = Some(count.clone());
		ui.element("p")?.text(as_text(count))?;
		Ok(())
	});

	engine.refresh().expect("cycle 1");
	engine.refresh().expect("cycle 2");
	engine.refresh().expect("cycle 3");
	assert_eq!(seeds.get(), 1);

	let count = shared.borrow().clone().expect("captured handle");
	count.set(42);
	engine.refresh_external().expect("refresh after write");

	let p = engine.surface().find_by_tag("p")[0];
	assert_eq!(engine.surface().text_content(p), "42");
	assert_eq!(seeds.get(), 1);
}

#[test]
fn test_scoped_state_survives_positional_shifts() {
	let extra = State::new(false);
	let seeds = Rc::new(Cell::new(0u32));
	let flag = extra.clone();
	let counter = Rc::clone(&seeds);
	let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
		if flag.get() {
			ui.element("header").map(drop)?;
		}
		ui.scoped_key("footer", |ui| {
			ui.state_with(|| {
				counter.set(counter.get() + 1);
				0u32
			})?;
			ui.element("footer").map(drop)
		})
	});

	engine.refresh().expect("cycle 1");
	let footer = engine.surface().find_by_tag("footer")[0];

	extra.set(true);
	engine.refresh().expect("cycle 2");

	// The named scope kept its state and its node even though a sibling
	// appeared ahead of it in declaration order.
	assert_eq!(seeds.get(), 1);
	assert_eq!(engine.surface().find_by_tag("footer"), vec![footer]);
	let header = engine.surface().find_by_tag("header")[0];
	let root = engine.surface().root();
	assert_eq!(engine.surface().children(root), vec![header, footer]);
}
