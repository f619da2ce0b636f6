//! Retained node store keyed by tree path.
//!
//! ## Overview
//!
//! The store is the bridge between the declarative traversal and the
//! retained host tree. Each refresh cycle opens a pass with
//! [`NodeStore::begin_pass`], marks every position it walks through
//! [`NodeStore::acquire`], and closes with [`NodeStore::end_pass`], which
//! sweeps everything the traversal no longer mentioned. Entries carry the
//! pieces that must outlive a single cycle: the host node reference, typed
//! application state, and the synchronization shadow of a bound property.
//!
//! Sweeping reports removed nodes in two flavors. `removed_nodes` lists
//! every host reference that fell out of the tree, for bookkeeping cleanup.
//! `destroyed` lists only the topmost ones, because destroying a host node
//! destroys its whole subtree and issuing redundant destroys for the
//! descendants would hit already-dead references.

use std::any::Any;
use std::collections::HashMap;
use std::collections::HashSet;

use nuages_core::CapturedIdentity;
use tracing::warn;

use crate::path::PathKey;
use crate::surface::NodeRef;
use crate::surface::PropValue;
use crate::validation::ValidationState;

/// Last value pushed to a host property, as remembered by a binding.
///
/// The shadow is what the synchronization phase compares against before
/// touching the host. `Unset` forces the first push; `Absent` remembers
/// that the absent form of a presence attribute was applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum Shadow {
	/// Nothing has been pushed yet.
	#[default]
	Unset,
	/// The absent form was pushed (attribute removed, prop cleared).
	Absent,
	/// This concrete value was pushed.
	Value(PropValue),
}

/// Synchronization state of one value binding on an element.
#[derive(Debug, Default)]
pub(crate) struct BindingState {
	/// Identity of the upstream signal as of the last push or write-back.
	pub captured: CapturedIdentity,
	/// Last value pushed to the bound host property.
	pub shadow: Shadow,
	/// Bumped on every push and write-back; cycles read it to detect races.
	pub version: u64,
	/// Candidate-versus-committed bookkeeping for validated inputs.
	pub validation: ValidationState,
	/// Last value pushed for the validity marker attribute.
	pub invalid_shadow: Shadow,
}

/// One retained position in the traversal tree.
#[derive(Debug, Default)]
pub(crate) struct NodeEntry {
	visited: u64,
	created: u64,
	/// Host node held at this position, if the position renders one.
	pub node: Option<NodeRef>,
	/// Tag the node was created with; a mismatch forces recreation.
	pub tag: Option<Box<str>>,
	state: Option<Box<dyn Any>>,
	binding: Option<BindingState>,
}

impl NodeEntry {
	fn fresh(stamp: u64) -> Self {
		Self {
			visited: stamp,
			created: stamp,
			..Self::default()
		}
	}

	/// Typed state slot at this position, initialized on first use.
	///
	/// If the slot already holds a value of a different type, the position
	/// was redeclared with new meaning; the old value is dropped and the
	/// slot reinitializes.
	pub fn state_slot<T: 'static>(&mut self, init: impl FnOnce() -> T) -> &mut T {
		let stale = match &self.state {
			Some(existing) => !existing.is::<T>(),
			None => true,
		};
		if stale {
			if self.state.is_some() {
				warn!("retained state slot changed type; resetting");
			}
			self.state = Some(Box::new(init()));
		}
		match self.state.as_mut() {
			Some(slot) => match slot.downcast_mut::<T>() {
				Some(value) => value,
				None => unreachable!("slot holds the checked type"),
			},
			None => unreachable!("slot was populated above"),
		}
	}

	/// Binding state at this position, initialized on first use.
	pub fn binding_mut(&mut self) -> &mut BindingState {
		self.binding.get_or_insert_with(BindingState::default)
	}

	/// Binding state at this position, if any push or write-back created it.
	pub fn binding(&self) -> Option<&BindingState> {
		self.binding.as_ref()
	}
}

/// What a sweep removed from the store.
#[derive(Debug, Default)]
pub(crate) struct SweepReport {
	/// Topmost removed host nodes; destroying these destroys the rest.
	pub destroyed: Vec<NodeRef>,
	/// Every removed host node, topmost or covered.
	pub removed_nodes: Vec<NodeRef>,
	/// Number of entries dropped, node-bearing or not.
	pub swept: usize,
}

/// Mark-and-sweep store of retained entries, keyed by [`PathKey`].
#[derive(Debug, Default)]
pub(crate) struct NodeStore {
	entries: HashMap<PathKey, NodeEntry>,
	stamp: u64,
}

impl NodeStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// The current pass stamp.
	pub fn stamp(&self) -> u64 {
		self.stamp
	}

	/// Number of retained entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Opens a pass; every entry the traversal touches must be re-acquired
	/// before [`Self::end_pass`] or it is swept.
	pub fn begin_pass(&mut self) {
		self.stamp += 1;
	}

	/// Marks the entry at `path` as alive this pass, creating it if new.
	pub fn acquire(&mut self, path: &PathKey) -> &mut NodeEntry {
		let stamp = self.stamp;
		let entry = self
			.entries
			.entry(path.clone())
			.or_insert_with(|| NodeEntry::fresh(stamp));
		entry.visited = stamp;
		entry
	}

	pub fn get(&self, path: &PathKey) -> Option<&NodeEntry> {
		self.entries.get(path)
	}

	pub fn get_mut(&mut self, path: &PathKey) -> Option<&mut NodeEntry> {
		self.entries.get_mut(path)
	}

	/// Closes the pass, sweeping every entry the traversal did not touch.
	pub fn end_pass(&mut self) -> SweepReport {
		let stamp = self.stamp;
		let mut swept = 0usize;
		let mut dead: Vec<(PathKey, NodeRef)> = Vec::new();
		self.entries.retain(|path, entry| {
			if entry.visited == stamp {
				return true;
			}
			swept += 1;
			if let Some(node) = entry.node.take() {
				dead.push((path.clone(), node));
			}
			false
		});

		// Lexicographic path order puts an ancestor right before its
		// descendants, so one backward-looking prefix check finds the
		// topmost node of each removed subtree.
		dead.sort_by(|a, b| a.0.cmp(&b.0));
		let mut destroyed = Vec::new();
		let mut removed_nodes = Vec::with_capacity(dead.len());
		let mut last_top: Option<PathKey> = None;
		for (path, node) in dead {
			let covered = last_top
				.as_ref()
				.is_some_and(|top| path.starts_with(top));
			if !covered {
				destroyed.push(node);
				last_top = Some(path);
			}
			removed_nodes.push(node);
		}

		SweepReport {
			destroyed,
			removed_nodes,
			swept,
		}
	}

	/// Abandons the pass after a traversal failure.
	///
	/// Entries created during the failed pass are dropped; everything that
	/// existed before survives untouched, so retained state rolls back to
	/// the last committed cycle. Returns the number of dropped entries.
	pub fn abort_pass(&mut self) -> usize {
		let stamp = self.stamp;
		let before = self.entries.len();
		self.entries.retain(|_, entry| entry.created != stamp);
		before - self.entries.len()
	}

	/// Unlinks surviving entries from host nodes that are about to die.
	///
	/// Used together with [`Self::abort_pass`]: an aborted pass may have
	/// re-pointed a pre-existing entry at a node created during that pass.
	/// Clearing the link (and the binding shadow that described the dead
	/// node) lets the next successful pass recreate from scratch.
	pub fn forget_nodes(&mut self, doomed: &HashSet<NodeRef>) -> usize {
		let mut cleared = 0usize;
		for entry in self.entries.values_mut() {
			let Some(node) = entry.node else { continue };
			if doomed.contains(&node) {
				entry.node = None;
				entry.tag = None;
				entry.binding = None;
				cleared += 1;
			}
		}
		cleared
	}

	/// Unlinks every strict descendant of `prefix` from its host node.
	///
	/// Called when an element changes tag: destroying the old node takes
	/// its host subtree with it, so descendant entries must stop referring
	/// to those nodes and must resynchronize once new ones exist. Returns
	/// the paths and node references that were taken, for listener and
	/// mirror cleanup and for restoring the links if the cycle aborts.
	/// The retained state slots stay in place.
	pub fn orphan_subtree(&mut self, prefix: &PathKey) -> Vec<(PathKey, NodeRef)> {
		let mut taken = Vec::new();
		for (path, entry) in self.entries.iter_mut() {
			if path == prefix || !path.starts_with(prefix) {
				continue;
			}
			if let Some(node) = entry.node.take() {
				taken.push((path.clone(), node));
			}
			entry.tag = None;
			if let Some(binding) = entry.binding.as_mut() {
				binding.captured.clear();
				binding.shadow = Shadow::Unset;
				binding.invalid_shadow = Shadow::Unset;
			}
		}
		taken
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::path::KeySegment;

	fn slot(parts: &[u32]) -> PathKey {
		let mut path = PathKey::root();
		for &part in parts {
			path = path.child(KeySegment::Slot(part));
		}
		path
	}

	// ==== pass protocol ====

	#[test]
	fn test_acquire_retains_state_across_passes() {
		let mut store = NodeStore::new();
		store.begin_pass();
		*store.acquire(&slot(&[0])).state_slot(|| 0u32) = 41;
		store.end_pass();

		store.begin_pass();
		let value = store.acquire(&slot(&[0])).state_slot(|| 0u32);
		assert_eq!(*value, 41);
	}

	#[test]
	fn test_unvisited_entries_are_swept() {
		let mut store = NodeStore::new();
		store.begin_pass();
		store.acquire(&slot(&[0]));
		store.acquire(&slot(&[1]));
		store.end_pass();

		store.begin_pass();
		store.acquire(&slot(&[0]));
		let report = store.end_pass();
		assert_eq!(report.swept, 1);
		assert_eq!(store.len(), 1);
		assert!(store.get(&slot(&[1])).is_none());
	}

	// ==== sweep topology ====

	#[test]
	fn test_sweep_destroys_topmost_node_only() {
		let mut store = NodeStore::new();
		store.begin_pass();
		store.acquire(&slot(&[0])).node = Some(NodeRef::from_raw(1));
		store.acquire(&slot(&[0, 0])).node = Some(NodeRef::from_raw(2));
		store.acquire(&slot(&[0, 0, 1])).node = Some(NodeRef::from_raw(3));
		store.end_pass();

		store.begin_pass();
		let report = store.end_pass();
		assert_eq!(report.destroyed, vec![NodeRef::from_raw(1)]);
		assert_eq!(report.removed_nodes.len(), 3);
	}

	#[test]
	fn test_sweep_destroys_sibling_subtrees_independently() {
		let mut store = NodeStore::new();
		store.begin_pass();
		store.acquire(&slot(&[0])).node = Some(NodeRef::from_raw(1));
		store.acquire(&slot(&[0, 0])).node = Some(NodeRef::from_raw(2));
		store.acquire(&slot(&[1])).node = Some(NodeRef::from_raw(3));
		store.end_pass();

		store.begin_pass();
		let report = store.end_pass();
		assert_eq!(
			report.destroyed,
			vec![NodeRef::from_raw(1), NodeRef::from_raw(3)]
		);
	}

	#[test]
	fn test_nodeless_entries_do_not_shadow_siblings() {
		let mut store = NodeStore::new();
		store.begin_pass();
		store.acquire(&slot(&[0]));
		store.acquire(&slot(&[1])).node = Some(NodeRef::from_raw(7));
		store.end_pass();

		store.begin_pass();
		let report = store.end_pass();
		assert_eq!(report.destroyed, vec![NodeRef::from_raw(7)]);
		assert_eq!(report.swept, 2);
	}

	// ==== abort ====

	#[test]
	fn test_abort_drops_only_entries_from_failed_pass() {
		let mut store = NodeStore::new();
		store.begin_pass();
		*store.acquire(&slot(&[0])).state_slot(|| 0u32) = 9;
		store.end_pass();

		store.begin_pass();
		store.acquire(&slot(&[0]));
		store.acquire(&slot(&[1]));
		let dropped = store.abort_pass();
		assert_eq!(dropped, 1);
		assert!(store.get(&slot(&[1])).is_none());

		store.begin_pass();
		let value = store.acquire(&slot(&[0])).state_slot(|| 0u32);
		assert_eq!(*value, 9);
	}

	#[test]
	fn test_forget_nodes_unlinks_doomed_references() {
		let mut store = NodeStore::new();
		store.begin_pass();
		store.acquire(&slot(&[0])).node = Some(NodeRef::from_raw(1));
		store.acquire(&slot(&[1])).node = Some(NodeRef::from_raw(2));
		store.end_pass();

		let doomed: HashSet<NodeRef> = [NodeRef::from_raw(2)].into_iter().collect();
		let cleared = store.forget_nodes(&doomed);
		assert_eq!(cleared, 1);
		assert_eq!(
			store.get(&slot(&[0])).and_then(|entry| entry.node),
			Some(NodeRef::from_raw(1))
		);
		assert_eq!(store.get(&slot(&[1])).and_then(|entry| entry.node), None);
	}

	// ==== subtree orphaning ====

	#[test]
	fn test_orphan_subtree_clears_descendants_keeps_root() {
		let mut store = NodeStore::new();
		store.begin_pass();
		store.acquire(&slot(&[0])).node = Some(NodeRef::from_raw(1));
		store.acquire(&slot(&[0, 0])).node = Some(NodeRef::from_raw(2));
		store.acquire(&slot(&[0, 0, 0])).node = Some(NodeRef::from_raw(3));
		store.acquire(&slot(&[1])).node = Some(NodeRef::from_raw(4));

		let mut taken: Vec<NodeRef> = store
			.orphan_subtree(&slot(&[0]))
			.into_iter()
			.map(|(_, node)| node)
			.collect();
		taken.sort();
		assert_eq!(taken, vec![NodeRef::from_raw(2), NodeRef::from_raw(3)]);
		assert_eq!(
			store.get(&slot(&[0])).and_then(|entry| entry.node),
			Some(NodeRef::from_raw(1))
		);
		assert_eq!(store.get(&slot(&[0, 0])).and_then(|entry| entry.node), None);
		assert_eq!(
			store.get(&slot(&[1])).and_then(|entry| entry.node),
			Some(NodeRef::from_raw(4))
		);
	}

	// ==== typed state slots ====

	#[test]
	fn test_state_slot_resets_on_type_change() {
		let mut store = NodeStore::new();
		store.begin_pass();
		*store.acquire(&slot(&[0])).state_slot(|| 1u32) = 5;
		let text = store
			.acquire(&slot(&[0]))
			.state_slot(|| String::from("fresh"));
		assert_eq!(text, "fresh");
	}
}
