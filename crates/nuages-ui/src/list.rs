//! Keyed list traversal.
//!
//! ## Overview
//!
//! [`Ui::for_each`] iterates a duplex list signal and runs a body closure
//! once per item, scoping each item's retained state under a path segment
//! derived from the item's key rather than from its position. Reordering
//! the list therefore moves each item's nodes and state along with it; the
//! engine's child reconciliation turns the new declaration order into move
//! operations on the host.
//!
//! Keys must be unique within one traversal. A duplicate key makes the
//! containing refresh cycle fail and roll back, because two items sharing
//! a path would silently share retained state.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use nuages_core::{Duplex, Identity, Readable, SignalError, SignalResult};

use crate::context::Ui;
use crate::error::{UiError, UiResult};
use crate::path::{ItemKey, KeySegment};

impl<'a> Ui<'a> {
	/// Renders one body per list item, keyed by item identity.
	///
	/// `key_fn` extracts a stable key from each item. Everything the body
	/// declares for an item lives under that key, so an item keeps its
	/// host nodes, retained state and bindings across reorders, insertions
	/// and removals elsewhere in the list.
	///
	/// An unavailable list renders no items. Duplicate keys fail the cycle
	/// with [`UiError::DuplicateItemKey`].
	pub fn for_each<L, T, K, B>(&mut self, list: L, key_fn: K, mut body: B) -> UiResult<()>
	where
		L: Duplex<Value = Vec<T>> + Clone + 'static,
		T: Clone + 'static,
		K: Fn(&T) -> ItemKey,
		B: FnMut(&mut Ui<'_>, ItemSignal<L, T>, usize) -> UiResult<()>,
	{
		let base = self.next_slot();
		let Some(items) = list.try_read() else {
			return Ok(());
		};
		let mut seen: HashSet<ItemKey> = HashSet::with_capacity(items.len());
		for (index, item) in items.iter().enumerate() {
			let key = key_fn(item);
			if !seen.insert(key.clone()) {
				return Err(UiError::DuplicateItemKey { key });
			}
			let path = base.child(KeySegment::Item(key));
			let signal = ItemSignal::new(list.clone(), index);
			self.enter(path, |ui| body(ui, signal, index))?;
		}
		Ok(())
	}

	/// Renders one body per list item, keyed by position.
	///
	/// Suitable only for lists that grow and shrink at the tail. When
	/// items can reorder, positional keys hand each item the retained
	/// state of whatever previously sat at its index; use [`Ui::for_each`]
	/// with a real identity key instead.
	pub fn for_each_indexed<L, T, B>(&mut self, list: L, mut body: B) -> UiResult<()>
	where
		L: Duplex<Value = Vec<T>> + Clone + 'static,
		T: Clone + 'static,
		B: FnMut(&mut Ui<'_>, ItemSignal<L, T>, usize) -> UiResult<()>,
	{
		let base = self.next_slot();
		let Some(items) = list.try_read() else {
			return Ok(());
		};
		for index in 0..items.len() {
			let path = base.child(KeySegment::Item(ItemKey::Index(index)));
			let signal = ItemSignal::new(list.clone(), index);
			self.enter(path, |ui| body(ui, signal, index))?;
		}
		Ok(())
	}
}

/// Duplex view of one item inside a list signal.
///
/// Reading yields a clone of the item at the captured index; writing reads
/// the whole list, replaces that element and writes the list back, so the
/// list signal's version advances exactly once per item write.
///
/// The identity is the list's identity. That is coarser than strictly
/// necessary (any list edit resynchronizes every item binding), but it can
/// never go stale when items shift position between cycles.
pub struct ItemSignal<L, T> {
	list: L,
	index: usize,
	marker: PhantomData<fn() -> T>,
}

impl<L, T> ItemSignal<L, T> {
	fn new(list: L, index: usize) -> Self {
		Self {
			list,
			index,
			marker: PhantomData,
		}
	}

	/// Position of this item at the time the list was traversed.
	pub fn index(&self) -> usize {
		self.index
	}
}

impl<L: Clone, T> Clone for ItemSignal<L, T> {
	fn clone(&self) -> Self {
		Self {
			list: self.list.clone(),
			index: self.index,
			marker: PhantomData,
		}
	}
}

impl<L, T> fmt::Debug for ItemSignal<L, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ItemSignal")
			.field("index", &self.index)
			.finish_non_exhaustive()
	}
}

impl<L, T> Readable for ItemSignal<L, T>
where
	L: Duplex<Value = Vec<T>>,
	T: Clone + 'static,
{
	type Value = T;

	fn identity(&self) -> Identity {
		self.list.identity()
	}

	fn try_read(&self) -> Option<T> {
		self.list
			.try_read()
			.and_then(|items| items.get(self.index).cloned())
	}

	fn is_readable(&self) -> bool {
		self.list
			.try_read()
			.is_some_and(|items| self.index < items.len())
	}
}

impl<L, T> Duplex for ItemSignal<L, T>
where
	L: Duplex<Value = Vec<T>>,
	T: Clone + 'static,
{
	fn is_writable(&self) -> bool {
		self.list.is_writable() && self.is_readable()
	}

	fn write(&self, value: T) -> SignalResult<()> {
		let mut items = self.list.try_read().ok_or(SignalError::Unavailable)?;
		let slot = items
			.get_mut(self.index)
			.ok_or(SignalError::Unavailable)?;
		*slot = value;
		self.list.write(items)
	}
}

#[cfg(test)]
mod tests {
	use nuages_core::State;

	use super::*;
	use crate::engine::{CycleOutput, OrderFrame};
	use crate::store::NodeStore;
	use crate::surface::Surface;
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

	// ==== item signal semantics ====

	#[test]
	fn test_item_signal_reads_its_index() {
		let list = State::new(vec![10u32, 20, 30]);
		let item = ItemSignal::new(list, 1);

		assert_eq!(item.try_read(), Some(20));
		assert!(item.is_readable());
	}

	#[test]
	fn test_item_signal_write_replaces_one_element() {
		let list = State::new(vec![10u32, 20, 30]);
		let before = list.identity();
		let item = ItemSignal::new(list.clone(), 2);

		item.write(99).unwrap();

		assert_eq!(list.get(), vec![10, 20, 99]);
		assert_ne!(before, list.identity());
	}

	#[test]
	fn test_item_signal_write_past_end_fails() {
		let list = State::new(vec![1u32]);
		let item = ItemSignal::new(list.clone(), 5);

		assert!(!item.is_writable());
		assert_eq!(item.write(7), Err(SignalError::Unavailable));
		assert_eq!(list.get(), vec![1]);
	}

	// ==== keyed traversal ====

	#[test]
	fn test_for_each_duplicate_key_fails_the_pass() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();
		let list = State::new(vec!["a".to_string(), "b".to_string(), "a".to_string()]);

		let result = run_pass(&mut store, &mut surface, |ui| {
			ui.for_each(
				list.clone(),
				|item| ItemKey::from(item.as_str()),
				|ui, _, _| ui.element("li").map(drop),
			)
		});

		assert!(matches!(
			result,
			Err(UiError::DuplicateItemKey {
				key: ItemKey::Text(ref text)
			}) if &**text == "a"
		));
	}

	#[test]
	fn test_keyed_state_follows_key_across_reorder() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();
		let list = State::new(vec!["a".to_string(), "b".to_string()]);

		// Seed each item's retained slot with its first-pass index.
		let mut observe = |store: &mut NodeStore, surface: &mut TestSurface| {
			run_pass(store, surface, |ui| {
				let mut seen = Vec::new();
				ui.for_each(
					list.clone(),
					|item| ItemKey::from(item.as_str()),
					|ui, item, index| {
						let slot = ui.state_with(|| index)?;
						let name = item.try_read().ok_or(SignalError::Unavailable)?;
						seen.push((name, slot.get()));
						Ok(())
					},
				)?;
				Ok::<_, UiError>(seen)
			})
		};

		let first = observe(&mut store, &mut surface).unwrap();
		assert_eq!(first, vec![("a".to_string(), 0), ("b".to_string(), 1)]);

		list.set(vec!["b".to_string(), "a".to_string()]);
		let second = observe(&mut store, &mut surface).unwrap();
		assert_eq!(second, vec![("b".to_string(), 1), ("a".to_string(), 0)]);
	}

	#[test]
	fn test_indexed_state_stays_with_position() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();
		let list = State::new(vec!["a".to_string(), "b".to_string()]);

		let mut observe = |store: &mut NodeStore, surface: &mut TestSurface| {
			run_pass(store, surface, |ui| {
				let mut seen = Vec::new();
				ui.for_each_indexed(list.clone(), |ui, _, index| {
					let slot = ui.state_with(|| index)?;
					seen.push(slot.get());
					Ok(())
				})?;
				Ok::<_, UiError>(seen)
			})
		};

		let first = observe(&mut store, &mut surface).unwrap();
		list.set(vec!["b".to_string(), "a".to_string()]);
		let second = observe(&mut store, &mut surface).unwrap();

		// Positional keys hand the swapped items each other's state.
		assert_eq!(first, vec![0, 1]);
		assert_eq!(second, vec![0, 1]);
	}

	#[test]
	fn test_unavailable_list_renders_nothing() {
		let mut store = NodeStore::new();
		let mut surface = TestSurface::new();
		let list = State::new(vec![1i64]);
		let gate = State::new(false);
		let masked = nuages_core::mask(list, gate);

		let ran = std::cell::Cell::new(false);
		run_pass(&mut store, &mut surface, |ui| {
			ui.for_each(
				masked,
				|item| ItemKey::from(*item),
				|_, _, _| {
					ran.set(true);
					Ok(())
				},
			)
		})
		.unwrap();

		assert!(!ran.get());
	}
}
