//! Two-way input binding integration tests.
//!
//! # Properties Tested
//!
//! - A write-back never bounces: after the host reports typed text, the
//!   follow-up flush issues no host write for that binding.
//! - An upstream write between cycles overrides whatever the host
//!   displayed.
//! - Checkbox write-backs behave the same way in both directions.

use nuages_core::State;
use nuages_ui::testing::{SurfaceOp, TestSurface};
use nuages_ui::{Engine, PropValue, SurfaceEvent, Ui, checkbox, input};
use rstest::rstest;

#[test]
fn test_typed_text_does_not_bounce() {
	let value = State::new(String::new());
	let signal = value.clone();
	let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
		input(ui, signal.clone()).map(drop)
	});
	engine.refresh().expect("initial refresh");
	let field = engine.surface().find_by_tag("input")[0];
	engine.surface_mut().take_ops();

	engine
		.dispatch(field, SurfaceEvent::input("typed"))
		.expect("dispatch");

	assert_eq!(value.get(), "typed");
	// One display write at dispatch time; the flush cycle adds nothing.
	let ops = engine.surface_mut().take_ops();
	assert_eq!(
		ops,
		vec![SurfaceOp::SetProp {
			node: field,
			name: "value".to_string(),
			value: PropValue::Text("typed".to_string()),
		}]
	);

	engine.refresh().expect("quiet refresh");
	assert!(engine.surface_mut().take_ops().is_empty());
}

#[test]
fn test_upstream_write_wins_over_display() {
	let value = State::new("draft".to_string());
	let signal = value.clone();
	let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
		input(ui, signal.clone()).map(drop)
	});
	engine.refresh().expect("initial refresh");
	let field = engine.surface().find_by_tag("input")[0];

	engine
		.dispatch(field, SurfaceEvent::input("typing"))
		.expect("dispatch");
	assert_eq!(value.get(), "typing");

	value.set("authoritative".to_string());
	engine.refresh_external().expect("external refresh");

	assert_eq!(
		engine.surface().prop(field, "value"),
		Some(&PropValue::Text("authoritative".to_string()))
	);
}

#[rstest]
#[case(false, true)]
#[case(true, false)]
fn test_toggle_write_back_round_trip(#[case] initial: bool, #[case] toggled: bool) {
	let flag = State::new(initial);
	let signal = flag.clone();
	let mut engine = Engine::new(TestSurface::new(), move |ui: &mut Ui<'_>| {
		checkbox(ui, signal.clone()).map(drop)
	});
	engine.refresh().expect("initial refresh");
	let field = engine.surface().find_by_tag("input")[0];
	assert_eq!(
		engine.surface().prop(field, "checked"),
		Some(&PropValue::Bool(initial))
	);

	engine
		.dispatch(field, SurfaceEvent::change_checked(toggled))
		.expect("dispatch");

	assert_eq!(flag.get(), toggled);
	assert_eq!(
		engine.surface().prop(field, "checked"),
		Some(&PropValue::Bool(toggled))
	);

	engine.surface_mut().take_ops();
	engine.refresh().expect("quiet refresh");
	assert!(engine.surface_mut().take_ops().is_empty());
}
