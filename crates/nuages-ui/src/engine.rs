//! The refresh engine.
//!
//! ## Overview
//!
//! [`Engine`] owns the node store, the host surface and the root component,
//! and runs the two-phase refresh cycle:
//!
//! 1. **Traversal** — re-run the component over a fresh [`Ui`]. This marks
//!    retained entries, allocates detached nodes for new positions, and
//!    records the cycle's child orders, sync tasks and handler
//!    registrations.
//! 2. **Synchronization** — sweep entries the traversal no longer mentions
//!    and destroy their topmost host nodes, reconcile each parent's child
//!    order against the engine's mirror of the host tree, run the deferred
//!    sync tasks, and diff event listener registrations.
//!
//! A traversal failure aborts the cycle: fresh entries and nodes are
//! discarded, replaced nodes are relinked, and the store and host stay at
//! the previous consistent state.
//!
//! ## Write-back
//!
//! Host events reach the engine through [`Engine::dispatch`]. A two-way
//! binding's write-back transaction writes the signal, pushes the typed
//! value, and captures the signal's post-write identity in the binding's
//! entry, so the refresh that follows recognizes the signal's new identity
//! as the host's own work and pushes nothing back. An event always ends
//! with a flush; flushes are bounded by [`EngineConfig::max_flush_cycles`]
//! and fail with [`UiError::RefreshDidNotSettle`] beyond it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use nuages_core::Action;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::Ui;
use crate::error::{UiError, UiResult};
use crate::path::PathKey;
use crate::store::NodeStore;
use crate::surface::{NodeRef, Surface, SurfaceEvent};

/// Deferred host synchronization recorded during traversal.
pub(crate) type SyncTask = Box<dyn FnOnce(&mut NodeStore, &mut dyn Surface) -> UiResult<()>>;

/// Write-back transaction of a two-way text binding.
pub(crate) type TextWriteBack = Rc<dyn Fn(&mut NodeStore, &mut dyn Surface, &str) -> UiResult<()>>;

/// Write-back transaction of a two-way boolean binding.
pub(crate) type FlagWriteBack = Rc<dyn Fn(&mut NodeStore, &mut dyn Surface, bool) -> UiResult<()>>;

/// One registered reaction to a host event.
#[derive(Clone)]
pub(crate) enum Handler {
	/// Perform an action, gated by its readiness.
	Perform(Rc<dyn Action>),
	/// Perform an action only for events whose key matches.
	PerformKey { key: String, action: Rc<dyn Action> },
	/// Run a text write-back with the event's value.
	WriteText(TextWriteBack),
	/// Run a boolean write-back with the event's checked state.
	WriteFlag(FlagWriteBack),
}

/// A handler registration recorded during traversal.
pub(crate) struct HandlerEntry {
	pub node: NodeRef,
	pub kind: String,
	pub handler: Handler,
}

/// Declared child order of one parent.
pub(crate) struct OrderFrame {
	pub node: NodeRef,
	pub children: Vec<NodeRef>,
}

/// A node displaced by a tag change, kept for destruction or rollback.
pub(crate) struct ReplacedNode {
	pub path: PathKey,
	pub node: NodeRef,
	pub tag: Box<str>,
}

/// Everything one traversal produces for the synchronization phase.
#[derive(Default)]
pub(crate) struct CycleOutput {
	/// Open child-order frames; the innermost is the current parent.
	pub frames: Vec<OrderFrame>,
	/// Completed child orders.
	pub orders: Vec<OrderFrame>,
	/// Host nodes created this cycle, in creation order.
	pub created: Vec<NodeRef>,
	/// Nodes displaced by tag changes this cycle.
	pub replaced: Vec<ReplacedNode>,
	/// Nodes unlinked under replaced ones, with the path that held them.
	pub orphaned: Vec<(PathKey, NodeRef)>,
	/// Deferred value synchronization.
	pub tasks: Vec<SyncTask>,
	/// Event handler registrations.
	pub handlers: Vec<HandlerEntry>,
}

/// Tuning knobs for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Upper bound on consecutive cycles one flush may run before the
	/// engine declares the system non-settling.
	pub max_flush_cycles: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			max_flush_cycles: 8,
		}
	}
}

/// What [`Engine::dispatch`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
	/// A handler consumed the event; the follow-up refresh has run.
	Handled,
	/// No handler matched; the event was dropped.
	Unhandled,
}

type Component = Box<dyn FnMut(&mut Ui<'_>) -> UiResult<()>>;

/// The retained-tree refresh engine over a host surface.
pub struct Engine<S: Surface> {
	store: NodeStore,
	surface: S,
	component: Component,
	config: EngineConfig,
	root: NodeRef,
	mirror: BTreeMap<NodeRef, Vec<NodeRef>>,
	listeners: BTreeMap<NodeRef, BTreeSet<String>>,
	handlers: HashMap<NodeRef, HashMap<String, Vec<Handler>>>,
	refresh_requested: bool,
}

impl<S: Surface> Engine<S> {
	/// Creates an engine rendering `component` into `surface`.
	pub fn new<C>(surface: S, component: C) -> Self
	where
		C: FnMut(&mut Ui<'_>) -> UiResult<()> + 'static,
	{
		Self::with_config(surface, EngineConfig::default(), component)
	}

	/// Creates an engine with explicit [`EngineConfig`].
	pub fn with_config<C>(surface: S, config: EngineConfig, component: C) -> Self
	where
		C: FnMut(&mut Ui<'_>) -> UiResult<()> + 'static,
	{
		let root = surface.root();
		Self {
			store: NodeStore::new(),
			surface,
			component: Box::new(component),
			config,
			root,
			mirror: BTreeMap::new(),
			listeners: BTreeMap::new(),
			handlers: HashMap::new(),
			refresh_requested: false,
		}
	}

	/// The host surface.
	pub fn surface(&self) -> &S {
		&self.surface
	}

	/// The host surface, mutably. Intended for host integration and tests;
	/// the engine assumes nothing else rewrites what it has synchronized.
	pub fn surface_mut(&mut self) -> &mut S {
		&mut self.surface
	}

	/// The active configuration.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Runs one full refresh cycle.
	///
	/// On a traversal error the cycle is rolled back and the error
	/// returned; the store and the host keep their previous state.
	pub fn refresh(&mut self) -> UiResult<()> {
		let mut out = CycleOutput::default();
		out.frames.push(OrderFrame {
			node: self.root,
			children: Vec::new(),
		});

		self.store.begin_pass();
		let traversal = {
			let mut ui = Ui::new(&mut self.store, &mut self.surface, &mut out);
			(self.component)(&mut ui)
		};
		if let Err(error) = traversal {
			self.roll_back(out);
			return Err(error);
		}
		while let Some(frame) = out.frames.pop() {
			out.orders.push(frame);
		}

		let report = self.store.end_pass();
		for replaced in &out.replaced {
			self.surface.destroy_node(replaced.node)?;
		}
		for node in &report.destroyed {
			self.surface.destroy_node(*node)?;
		}

		let mut removed: HashSet<NodeRef> = report.removed_nodes.iter().copied().collect();
		removed.extend(out.replaced.iter().map(|replaced| replaced.node));
		removed.extend(out.orphaned.iter().map(|(_, node)| *node));
		for node in &removed {
			self.mirror.remove(node);
			self.listeners.remove(node);
		}

		self.reconcile_children(&mut out, &removed)?;
		for task in out.tasks {
			task(&mut self.store, &mut self.surface)?;
		}
		self.sync_listeners(&out.handlers)?;
		self.handlers = fold_handlers(out.handlers);

		debug!(
			created = out.created.len(),
			swept = report.swept,
			"refresh cycle complete"
		);
		Ok(())
	}

	/// Delivers a host event to the node's registered handlers.
	///
	/// Unknown targets (including nodes destroyed in an earlier cycle,
	/// which lagging host queues can still report) are dropped with a
	/// warning. A handled event ends with a bounded flush, so the caller
	/// observes the settled tree.
	pub fn dispatch(&mut self, node: NodeRef, event: SurfaceEvent) -> UiResult<DispatchOutcome> {
		let Some(matched) = self
			.handlers
			.get(&node)
			.and_then(|kinds| kinds.get(&event.kind))
			.cloned()
		else {
			warn!(
				node = node.raw(),
				kind = %event.kind,
				"event for unknown target dropped"
			);
			return Ok(DispatchOutcome::Unhandled);
		};

		let mut handled = false;
		for handler in matched {
			match handler {
				Handler::Perform(action) => {
					self.perform(&*action)?;
					handled = true;
				}
				Handler::PerformKey { key, action } => {
					if event.key.as_deref() == Some(key.as_str()) {
						self.perform(&*action)?;
						handled = true;
					}
				}
				Handler::WriteText(apply) => {
					let text = event.value.clone().unwrap_or_default();
					apply(&mut self.store, &mut self.surface, &text)?;
					handled = true;
				}
				Handler::WriteFlag(apply) => {
					let checked = event.checked.unwrap_or(false);
					apply(&mut self.store, &mut self.surface, checked)?;
					handled = true;
				}
			}
		}

		if handled {
			self.refresh_requested = true;
			self.flush()?;
			Ok(DispatchOutcome::Handled)
		} else {
			Ok(DispatchOutcome::Unhandled)
		}
	}

	/// Marks the tree dirty; the next [`Engine::flush`] runs a cycle.
	pub fn request_refresh(&mut self) {
		self.refresh_requested = true;
	}

	/// Runs refresh cycles until no request is pending.
	///
	/// Requests are coalesced: any number of writes between flushes costs
	/// one cycle. An idempotent tree settles in a single cycle; the
	/// configured bound exists to turn a write-back loop into an error
	/// instead of a hang.
	pub fn flush(&mut self) -> UiResult<()> {
		let mut cycles = 0usize;
		while self.refresh_requested {
			if cycles >= self.config.max_flush_cycles {
				return Err(UiError::RefreshDidNotSettle { cycles });
			}
			self.refresh_requested = false;
			self.refresh()?;
			cycles += 1;
		}
		Ok(())
	}

	/// Entry point for out-of-band changes (timers, completions, external
	/// writes): requests a refresh and flushes immediately.
	pub fn refresh_external(&mut self) -> UiResult<()> {
		self.request_refresh();
		self.flush()
	}

	fn perform(&self, action: &dyn Action) -> UiResult<()> {
		if action.is_ready() {
			action.perform()?;
		} else {
			warn!("event dropped; its action is not ready");
		}
		Ok(())
	}

	fn roll_back(&mut self, out: CycleOutput) {
		let dropped = self.store.abort_pass();
		let doomed: HashSet<NodeRef> = out.created.iter().copied().collect();
		self.store.forget_nodes(&doomed);
		for replaced in &out.replaced {
			if let Some(entry) = self.store.get_mut(&replaced.path) {
				entry.node = Some(replaced.node);
				entry.tag = Some(replaced.tag.clone());
			}
		}
		for (path, node) in &out.orphaned {
			if let Some(entry) = self.store.get_mut(path) {
				entry.node = Some(*node);
			}
		}
		for node in out.created.iter().rev() {
			if let Err(error) = self.surface.destroy_node(*node) {
				warn!(%error, "failed to destroy a node while rolling back");
			}
		}
		debug!(
			dropped,
			created = out.created.len(),
			"rolled back failed cycle"
		);
	}

	fn reconcile_children(&mut self, out: &mut CycleOutput, removed: &HashSet<NodeRef>) -> UiResult<()> {
		let mut merged: Vec<(NodeRef, Vec<NodeRef>)> = Vec::new();
		let mut index: HashMap<NodeRef, usize> = HashMap::new();
		for frame in out.orders.drain(..) {
			match index.get(&frame.node) {
				Some(&at) => merged[at].1.extend(frame.children),
				None => {
					index.insert(frame.node, merged.len());
					merged.push((frame.node, frame.children));
				}
			}
		}

		for (parent, declared) in merged {
			let current = self.mirror.entry(parent).or_default();
			current.retain(|child| !removed.contains(child));
			// Invariant: after handling position `i`, the first `i + 1`
			// mirror entries equal the declared prefix, so a declared
			// child found further right has only moved left to do.
			for (position, &child) in declared.iter().enumerate() {
				match current.iter().position(|&existing| existing == child) {
					Some(found) if found == position => {}
					Some(found) => {
						self.surface.move_child(parent, child, position)?;
						current.remove(found);
						current.insert(position, child);
					}
					None => {
						self.surface.insert_child(parent, child, position)?;
						current.insert(position, child);
					}
				}
			}
			*current = declared;
		}
		Ok(())
	}

	fn sync_listeners(&mut self, entries: &[HandlerEntry]) -> UiResult<()> {
		let mut wanted: BTreeMap<NodeRef, BTreeSet<String>> = BTreeMap::new();
		for entry in entries {
			wanted
				.entry(entry.node)
				.or_default()
				.insert(entry.kind.clone());
		}

		for (node, kinds) in &wanted {
			let have = self.listeners.entry(*node).or_default();
			for kind in kinds {
				if !have.contains(kind) {
					self.surface.add_listener(*node, kind)?;
				}
			}
			let stale: Vec<String> = have.difference(kinds).cloned().collect();
			for kind in &stale {
				self.surface.remove_listener(*node, kind)?;
			}
			*have = kinds.clone();
		}

		let silent: Vec<NodeRef> = self
			.listeners
			.keys()
			.filter(|node| !wanted.contains_key(node))
			.copied()
			.collect();
		for node in silent {
			if let Some(kinds) = self.listeners.remove(&node) {
				for kind in kinds {
					self.surface.remove_listener(node, &kind)?;
				}
			}
		}
		Ok(())
	}
}

fn fold_handlers(entries: Vec<HandlerEntry>) -> HashMap<NodeRef, HashMap<String, Vec<Handler>>> {
	let mut table: HashMap<NodeRef, HashMap<String, Vec<Handler>>> = HashMap::new();
	for entry in entries {
		table
			.entry(entry.node)
			.or_default()
			.entry(entry.kind)
			.or_default()
			.push(entry.handler);
	}
	table
}
