//! The per-cycle traversal context.
//!
//! ## Overview
//!
//! A component is a function over [`Ui`]. Each refresh cycle the engine
//! re-runs it from the top; [`Ui`] turns that re-execution into retained
//! structure by walking a [`PathKey`](crate::path::PathKey) cursor along the
//! declarations. Sequential calls take consecutive `Slot` positions,
//! conditional arms descend into `Branch` segments, and keyed scopes attach
//! an `Item` segment, so every declaration site addresses a stable entry in
//! the node store no matter how often the function re-runs.
//!
//! Traversal declares; it does not synchronize. Signal-bound attributes,
//! properties and text register deferred tasks that the engine runs after
//! the structural work of the cycle, and brand-new host nodes stay detached
//! until the engine inserts them. The one host interaction traversal is
//! allowed is allocating those detached nodes.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use nuages_core::{CapturedIdentity, CellId, Identity, Readable, State};

use crate::element::{self, ElementHandle};
use crate::engine::{CycleOutput, ReplacedNode};
use crate::error::{SurfaceResult, UiResult};
use crate::path::{ItemKey, KeySegment, PathKey};
use crate::store::NodeStore;
use crate::surface::{NodeRef, Surface};

/// Tag under which retained text nodes are tracked, so a position can
/// switch between text and element content and be rebuilt cleanly.
pub(crate) const TEXT_TAG: &str = "#text";

/// The traversal context handed to component functions.
///
/// See the [module documentation](self) for the traversal model. All
/// methods advance the position cursor, so the ORDER of calls is part of a
/// component's identity: content that appears and disappears must do so
/// through [`Ui::when`], [`Ui::when_else`] or the keyed list operations,
/// never through a bare `if` around a declaration.
pub struct Ui<'a> {
	pub(crate) store: &'a mut NodeStore,
	pub(crate) surface: &'a mut dyn Surface,
	pub(crate) out: &'a mut CycleOutput,
	pub(crate) path: PathKey,
	pub(crate) cursor: u32,
}

impl<'a> Ui<'a> {
	pub(crate) fn new(
		store: &'a mut NodeStore,
		surface: &'a mut dyn Surface,
		out: &'a mut CycleOutput,
	) -> Self {
		Self {
			store,
			surface,
			out,
			path: PathKey::root(),
			cursor: 0,
		}
	}

	/// Path of the next sequential position in the current scope.
	pub(crate) fn next_slot(&mut self) -> PathKey {
		let slot = self.cursor;
		self.cursor += 1;
		self.path.child(KeySegment::Slot(slot))
	}

	/// Runs `f` with the traversal repositioned at `path`, then restores
	/// the previous position.
	pub(crate) fn enter<R>(&mut self, path: PathKey, f: impl FnOnce(&mut Ui<'a>) -> R) -> R {
		let saved_path = mem::replace(&mut self.path, path);
		let saved_cursor = mem::replace(&mut self.cursor, 0);
		let result = f(self);
		self.path = saved_path;
		self.cursor = saved_cursor;
		result
	}

	/// Returns the retained host node at `path`, creating a detached one
	/// through `create` on first visit. A tag mismatch schedules the old
	/// node (and everything retained under it) for replacement.
	pub(crate) fn materialize<F>(&mut self, path: &PathKey, tag: &str, create: F) -> UiResult<NodeRef>
	where
		F: FnOnce(&mut dyn Surface) -> SurfaceResult<NodeRef>,
	{
		let (existing, previous_tag) = {
			let entry = self.store.acquire(path);
			(entry.node, entry.tag.clone())
		};
		let mut node = existing;
		if let (Some(old), Some(previous)) = (existing, previous_tag) {
			if previous.as_ref() != tag {
				let orphans = self.store.orphan_subtree(path);
				self.out.orphaned.extend(orphans);
				self.out.replaced.push(ReplacedNode {
					path: path.clone(),
					node: old,
					tag: previous,
				});
				node = None;
			}
		}
		let node = match node {
			Some(node) => node,
			None => {
				let created = create(&mut *self.surface)?;
				self.out.created.push(created);
				created
			}
		};
		let entry = self.store.acquire(path);
		entry.node = Some(node);
		if entry.tag.as_deref() != Some(tag) {
			entry.tag = Some(Box::from(tag));
		}
		Ok(node)
	}

	/// Declares `node` as the next child of the innermost open element.
	pub(crate) fn declare_child(&mut self, node: NodeRef) {
		if let Some(frame) = self.out.frames.last_mut() {
			frame.children.push(node);
		}
	}

	/// Declares an element at the next position.
	///
	/// The element's host node is created on first visit and retained
	/// afterwards. Changing the tag at a position destroys the old node
	/// together with its retained subtree and starts over.
	///
	/// # Examples
	///
	/// ```rust,ignore
	/// ui.element("section")?
	/// 	.attr("id", "intro")
	/// 	.children(|ui| {
	/// 		ui.text(title.clone())?;
	/// 		Ok(())
	/// 	})?;
	/// ```
	pub fn element(&mut self, tag: &str) -> UiResult<ElementHandle<'_, 'a>> {
		let path = self.next_slot();
		let node = self.materialize(&path, tag, |surface| surface.create_element(tag))?;
		self.declare_child(node);
		Ok(ElementHandle::new(self, node, path))
	}

	/// Declares a text node bound to a string signal.
	///
	/// The content is synchronized through the captured-identity protocol:
	/// an unchanged signal costs one identity comparison and touches the
	/// host not at all. An unavailable signal renders as empty text.
	pub fn text<S>(&mut self, content: S) -> UiResult<()>
	where
		S: Readable<Value = String> + 'static,
	{
		let path = self.next_slot();
		let node = self.materialize(&path, TEXT_TAG, |surface| surface.create_text(""))?;
		self.declare_child(node);
		self.out
			.tasks
			.push(element::bound_text_task(path, node, content));
		Ok(())
	}

	/// Component-local state retained at the current position.
	///
	/// The first visit stores `State::new(initial)`; every later visit
	/// returns a clone of the same handle, so writes from actions and
	/// reads from bindings all see one cell. The state lives exactly as
	/// long as its position stays declared.
	pub fn state<T>(&mut self, initial: T) -> UiResult<State<T>>
	where
		T: Clone + 'static,
	{
		self.state_with(move || initial)
	}

	/// Like [`Ui::state`], initializing lazily on the first visit only.
	pub fn state_with<T>(&mut self, init: impl FnOnce() -> T) -> UiResult<State<T>>
	where
		T: Clone + 'static,
	{
		let path = self.next_slot();
		let entry = self.store.acquire(&path);
		Ok(entry.state_slot(|| State::new(init())).clone())
	}

	/// State that re-initializes from `source` whenever its identity moves.
	///
	/// Useful for edit buffers seeded from upstream data: local writes stay
	/// local, but an upstream change resets the cell to the fresh upstream
	/// value. While the source is unavailable the last value is kept and
	/// re-seeding waits for the source to return.
	pub fn state_from<S>(&mut self, source: S) -> UiResult<State<S::Value>>
	where
		S: Readable,
		S::Value: Default,
	{
		let path = self.next_slot();
		let entry = self.store.acquire(&path);
		let slot: &mut TransientSlot<S::Value> = entry.state_slot(TransientSlot::default);
		let identity = source.identity();
		if !slot.captured.matches(&identity) {
			if let Some(value) = source.try_read() {
				slot.state.set(value);
				slot.captured.capture(identity);
			}
		}
		Ok(slot.state.clone())
	}

	/// Traverses `body` only while `condition` reads true.
	///
	/// The body's content lives under its own branch of the path, so its
	/// retained state disappears when the condition turns false and starts
	/// fresh when it turns true again. An unavailable condition traverses
	/// nothing.
	pub fn when<C, B>(&mut self, condition: C, body: B) -> UiResult<()>
	where
		C: Readable<Value = bool>,
		B: FnOnce(&mut Ui<'_>) -> UiResult<()>,
	{
		self.when_else(condition, body, |_| Ok(()))
	}

	/// Two-armed conditional. Each arm owns a disjoint branch of the path;
	/// the untaken arm is simply not traversed. An unavailable condition
	/// takes neither arm.
	pub fn when_else<C, T, E>(&mut self, condition: C, then_body: T, else_body: E) -> UiResult<()>
	where
		C: Readable<Value = bool>,
		T: FnOnce(&mut Ui<'_>) -> UiResult<()>,
		E: FnOnce(&mut Ui<'_>) -> UiResult<()>,
	{
		let path = self.next_slot();
		match condition.try_read() {
			Some(true) => self.enter(path.child(KeySegment::Branch(0)), then_body),
			Some(false) => self.enter(path.child(KeySegment::Branch(1)), else_body),
			None => Ok(()),
		}
	}

	/// Traverses `body` under an explicit key instead of a sequential slot.
	///
	/// Scopes with different keys own disjoint retained state regardless of
	/// the order they are declared in, which is what the keyed list
	/// operations build on.
	pub fn scoped_key<B>(&mut self, key: impl Into<ItemKey>, body: B) -> UiResult<()>
	where
		B: FnOnce(&mut Ui<'_>) -> UiResult<()>,
	{
		let path = self.path.child(KeySegment::Item(key.into()));
		self.enter(path, body)
	}

	/// Memoized computation over one input signal.
	///
	/// `compute` runs only on cycles where the input's identity moved since
	/// the retained result was produced; otherwise the cached value is
	/// reused. The returned [`Cached`] is itself a readable signal whose
	/// identity moves exactly when the result was recomputed.
	pub fn apply<S, T, F>(&mut self, source: S, compute: F) -> UiResult<Cached<T>>
	where
		S: Readable,
		T: Clone + 'static,
		F: FnOnce(S::Value) -> T,
	{
		let path = self.next_slot();
		let entry = self.store.acquire(&path);
		let memo = entry
			.state_slot(|| Rc::new(RefCell::new(MemoCell::<T>::new())))
			.clone();
		{
			let mut memo = memo.borrow_mut();
			let identity = source.identity();
			if !memo.captured.matches(&identity) {
				match source.try_read() {
					Some(input) => {
						memo.value = Some(compute(input));
						memo.captured.capture(identity);
						memo.version += 1;
					}
					None => {
						if memo.value.take().is_some() {
							memo.version += 1;
						}
						memo.captured.clear();
					}
				}
			}
		}
		Ok(Cached { memo })
	}

	/// Memoized computation over two input signals.
	///
	/// The retained result is keyed on the pair of input identities;
	/// `compute` runs only when either moved. Both inputs must be readable
	/// for the result to exist.
	pub fn apply2<A, B, T, F>(&mut self, a: A, b: B, compute: F) -> UiResult<Cached<T>>
	where
		A: Readable,
		B: Readable,
		T: Clone + 'static,
		F: FnOnce(A::Value, B::Value) -> T,
	{
		let path = self.next_slot();
		let entry = self.store.acquire(&path);
		let memo = entry
			.state_slot(|| Rc::new(RefCell::new(MemoCell::<T>::new())))
			.clone();
		{
			let mut memo = memo.borrow_mut();
			let identity = Identity::tuple([a.identity(), b.identity()]);
			if !memo.captured.matches(&identity) {
				match (a.try_read(), b.try_read()) {
					(Some(x), Some(y)) => {
						memo.value = Some(compute(x, y));
						memo.captured.capture(identity);
						memo.version += 1;
					}
					_ => {
						if memo.value.take().is_some() {
							memo.version += 1;
						}
						memo.captured.clear();
					}
				}
			}
		}
		Ok(Cached { memo })
	}
}

struct TransientSlot<T> {
	state: State<T>,
	captured: CapturedIdentity,
}

impl<T: Clone + Default + 'static> Default for TransientSlot<T> {
	fn default() -> Self {
		Self {
			state: State::new(T::default()),
			captured: CapturedIdentity::new(),
		}
	}
}

pub(crate) struct MemoCell<T> {
	cell: CellId,
	version: u64,
	captured: CapturedIdentity,
	value: Option<T>,
}

impl<T> MemoCell<T> {
	fn new() -> Self {
		Self {
			cell: CellId::new(),
			version: 0,
			captured: CapturedIdentity::new(),
			value: None,
		}
	}
}

/// Readable handle to a result retained by [`Ui::apply`] / [`Ui::apply2`].
///
/// Its identity moves exactly when the computation re-ran, so downstream
/// bindings invalidate no more often than the memo itself.
pub struct Cached<T> {
	memo: Rc<RefCell<MemoCell<T>>>,
}

impl<T> Clone for Cached<T> {
	fn clone(&self) -> Self {
		Self {
			memo: Rc::clone(&self.memo),
		}
	}
}

impl<T> fmt::Debug for Cached<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let memo = self.memo.borrow();
		f.debug_struct("Cached")
			.field("cell", &memo.cell)
			.field("version", &memo.version)
			.finish_non_exhaustive()
	}
}

impl<T: Clone + 'static> Readable for Cached<T> {
	type Value = T;

	fn identity(&self) -> Identity {
		let memo = self.memo.borrow();
		Identity::Versioned {
			cell: memo.cell,
			version: memo.version,
		}
	}

	fn try_read(&self) -> Option<T> {
		self.memo.borrow().value.clone()
	}

	fn is_readable(&self) -> bool {
		self.memo.borrow().value.is_some()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use nuages_core::constant;

	use super::*;
	use crate::engine::OrderFrame;
	use crate::testing::TestSurface;

	fn run_pass<R>(
		store: &mut NodeStore,
		surface: &mut TestSurface,
		f: impl FnOnce(&mut Ui<'_>) -> R,
	) -> R {
		store.begin_pass();
		let mut out = CycleOutput::default();
		out.frames.push(OrderFrame {
			node: surface.root(),
			children: Vec::new(),
		});
		let result = {
			let mut ui = Ui::new(store, surface, &mut out);
			f(&mut ui)
		};
		store.end_pass();
		result
	}

	// ==== retention ====

	#[test]
	fn test_element_node_is_retained_across_passes() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();

		let first = run_pass(&mut store, &mut surface, |ui| {
			ui.element("div").map(|handle| handle.node())
		})
		.ok();
		let second = run_pass(&mut store, &mut surface, |ui| {
			ui.element("div").map(|handle| handle.node())
		})
		.ok();

		assert!(first.is_some());
		assert_eq!(first, second);
	}

	#[test]
	fn test_tag_change_schedules_replacement() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();

		run_pass(&mut store, &mut surface, |ui| ui.element("div").map(drop))
			.expect("first pass");
		store.begin_pass();
		let mut out = CycleOutput::default();
		out.frames.push(OrderFrame {
			node: surface.root(),
			children: Vec::new(),
		});
		{
			let mut ui = Ui::new(&mut store, &mut surface, &mut out);
			ui.element("span").map(drop).expect("second pass");
		}
		store.end_pass();

		assert_eq!(out.replaced.len(), 1);
		assert_eq!(out.replaced[0].tag.as_ref(), "div");
		assert_eq!(out.created.len(), 1);
	}

	#[test]
	fn test_state_survives_and_sees_writes() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();

		let handle = run_pass(&mut store, &mut surface, |ui| ui.state(1u32))
			.expect("state");
		handle.set(5);

		let again = run_pass(&mut store, &mut surface, |ui| ui.state(1u32))
			.expect("state");
		assert_eq!(again.get(), 5);
		assert_eq!(handle.cell_id(), again.cell_id());
	}

	#[test]
	fn test_state_from_reseeds_on_identity_change() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();
		let upstream = State::new(String::from("a"));

		let local = run_pass(&mut store, &mut surface, |ui| {
			ui.state_from(upstream.clone())
		})
		.expect("state_from");
		assert_eq!(local.get(), "a");

		// Local edits stick while upstream is quiet.
		local.set(String::from("edited"));
		let local = run_pass(&mut store, &mut surface, |ui| {
			ui.state_from(upstream.clone())
		})
		.expect("state_from");
		assert_eq!(local.get(), "edited");

		// An upstream write re-seeds.
		upstream.set(String::from("b"));
		let local = run_pass(&mut store, &mut surface, |ui| {
			ui.state_from(upstream.clone())
		})
		.expect("state_from");
		assert_eq!(local.get(), "b");
	}

	// ==== conditionals and keyed scopes ====

	#[test]
	fn test_when_else_keeps_arm_state_disjoint() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();
		let flag = State::new(true);

		let pass = |store: &mut NodeStore, surface: &mut TestSurface, flag: &State<bool>| {
			let seen = Rc::new(RefCell::new(None));
			let sink = seen.clone();
			run_pass(store, surface, |ui| {
				ui.when_else(
					flag.clone(),
					|ui| {
						*sink.borrow_mut() = Some(ui.state(10u32)?.get());
						Ok(())
					},
					|ui| {
						*sink.borrow_mut() = Some(ui.state(20u32)?.get());
						Ok(())
					},
				)
			})
			.expect("pass");
			seen.borrow().expect("arm ran")
		};

		assert_eq!(pass(&mut store, &mut surface, &flag), 10);
		flag.set(false);
		assert_eq!(pass(&mut store, &mut surface, &flag), 20);
		// Returning to the first arm finds fresh state: the untaken arm
		// was swept while the flag was false.
		flag.set(true);
		assert_eq!(pass(&mut store, &mut surface, &flag), 10);
	}

	#[test]
	fn test_scoped_key_isolates_by_key_not_order() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();

		let read = |store: &mut NodeStore, surface: &mut TestSurface, keys: [&'static str; 2]| {
			let seen = Rc::new(RefCell::new(Vec::new()));
			let sink = seen.clone();
			run_pass(store, surface, move |ui| {
				for key in keys {
					let sink = sink.clone();
					ui.scoped_key(key, move |ui| {
						let cell = ui.state_with(|| String::from(key))?;
						sink.borrow_mut().push(cell.get());
						Ok(())
					})?;
				}
				Ok::<_, crate::error::UiError>(())
			})
			.expect("pass");
			Rc::try_unwrap(seen).expect("sole owner").into_inner()
		};

		assert_eq!(read(&mut store, &mut surface, ["a", "b"]), ["a", "b"]);
		// Reordered declarations still find their own state.
		assert_eq!(read(&mut store, &mut surface, ["b", "a"]), ["b", "a"]);
	}

	// ==== memoization ====

	#[test]
	fn test_apply_recomputes_only_on_identity_change() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();
		let runs = Rc::new(Cell::new(0u32));
		let value = State::new(2u32);

		let cycle = |store: &mut NodeStore, surface: &mut TestSurface| {
			let runs = runs.clone();
			let value = value.clone();
			run_pass(store, surface, move |ui| {
				ui.apply(value, move |v| {
					runs.set(runs.get() + 1);
					v * 10
				})
			})
			.expect("apply")
		};

		let cached = cycle(&mut store, &mut surface);
		assert_eq!(cached.try_read(), Some(20));
		assert_eq!(runs.get(), 1);

		let quiet = cycle(&mut store, &mut surface);
		assert_eq!(runs.get(), 1);
		assert_eq!(quiet.identity(), cached.identity());

		value.set(3);
		let moved = cycle(&mut store, &mut surface);
		assert_eq!(moved.try_read(), Some(30));
		assert_eq!(runs.get(), 2);
		assert_ne!(moved.identity(), cached.identity());
	}

	#[test]
	fn test_apply2_keys_on_both_inputs() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();
		let runs = Rc::new(Cell::new(0u32));
		let a = State::new(1u32);

		let cycle = |store: &mut NodeStore, surface: &mut TestSurface| {
			let runs = runs.clone();
			let a = a.clone();
			run_pass(store, surface, move |ui| {
				ui.apply2(a, constant(100u32), move |x, y| {
					runs.set(runs.get() + 1);
					x + y
				})
			})
			.expect("apply2")
		};

		assert_eq!(cycle(&mut store, &mut surface).try_read(), Some(101));
		cycle(&mut store, &mut surface);
		assert_eq!(runs.get(), 1);

		a.set(2);
		assert_eq!(cycle(&mut store, &mut surface).try_read(), Some(102));
		assert_eq!(runs.get(), 2);
	}
}
