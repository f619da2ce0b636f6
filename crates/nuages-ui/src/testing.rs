//! In-memory host surface for tests.
//!
//! ## Overview
//!
//! [`TestSurface`] is a strict, fully observable [`Surface`]: it keeps the
//! node tree in plain maps, validates every operation the way a real host
//! would, and appends each successful operation to an inspectable log.
//! Tests assert on the tree through the read helpers and on engine
//! behavior through [`TestSurface::take_ops`], which is how the no-op and
//! no-bounce guarantees become checkable ("this cycle issued zero
//! operations").

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::Serialize;

use crate::error::{SurfaceError, SurfaceResult};
use crate::surface::{NodeRef, PropValue, Surface};

/// Tag given to text nodes, mirroring the DOM's `#text`.
const TEXT_TAG: &str = "#text";

/// Tag given to the pre-existing root node.
const ROOT_TAG: &str = "#root";

/// One recorded host operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SurfaceOp {
	/// An element node was created, detached.
	CreateElement {
		/// The new node.
		node: NodeRef,
		/// Its tag.
		tag: String,
	},
	/// A text node was created, detached.
	CreateText {
		/// The new node.
		node: NodeRef,
	},
	/// An attribute was set.
	SetAttr {
		/// Target node.
		node: NodeRef,
		/// Attribute name.
		name: String,
		/// Attribute value.
		value: String,
	},
	/// An attribute was removed.
	RemoveAttr {
		/// Target node.
		node: NodeRef,
		/// Attribute name.
		name: String,
	},
	/// A property was set.
	SetProp {
		/// Target node.
		node: NodeRef,
		/// Property name.
		name: String,
		/// Property value.
		value: PropValue,
	},
	/// A text node's content was replaced.
	SetText {
		/// Target node.
		node: NodeRef,
		/// New content.
		text: String,
	},
	/// A child was inserted under a parent.
	InsertChild {
		/// Parent node.
		parent: NodeRef,
		/// Inserted child.
		child: NodeRef,
		/// Position among the parent's children.
		index: usize,
	},
	/// A child changed position under a parent.
	MoveChild {
		/// Parent node.
		parent: NodeRef,
		/// Moved child.
		child: NodeRef,
		/// Destination position.
		index: usize,
	},
	/// A node and its subtree were destroyed.
	DestroyNode {
		/// Destroyed node.
		node: NodeRef,
	},
	/// An event listener was attached.
	AddListener {
		/// Target node.
		node: NodeRef,
		/// Event kind.
		kind: String,
	},
	/// An event listener was detached.
	RemoveListener {
		/// Target node.
		node: NodeRef,
		/// Event kind.
		kind: String,
	},
}

/// One node of the in-memory tree.
#[derive(Debug, Clone, Default)]
pub struct TestNode {
	/// Element tag, `#text` for text nodes, `#root` for the root.
	pub tag: String,
	/// Text content, meaningful for text nodes.
	pub text: String,
	/// Attributes by name.
	pub attrs: BTreeMap<String, String>,
	/// Properties by name.
	pub props: BTreeMap<String, PropValue>,
	/// Attached listener kinds.
	pub listeners: BTreeSet<String>,
	/// Children in order.
	pub children: Vec<NodeRef>,
	/// Parent, `None` while detached.
	pub parent: Option<NodeRef>,
}

impl TestNode {
	fn with_tag(tag: &str) -> Self {
		Self {
			tag: tag.to_string(),
			..Self::default()
		}
	}
}

/// In-memory [`Surface`] with full validation and an operation log.
#[derive(Debug)]
pub struct TestSurface {
	nodes: BTreeMap<NodeRef, TestNode>,
	ops: Vec<SurfaceOp>,
	next_id: u64,
	root: NodeRef,
}

impl TestSurface {
	/// An empty surface holding only the root node.
	pub fn new() -> Self {
		let root = NodeRef::from_raw(0);
		let mut nodes = BTreeMap::new();
		nodes.insert(root, TestNode::with_tag(ROOT_TAG));
		Self {
			nodes,
			ops: Vec::new(),
			next_id: 1,
			root,
		}
	}

	/// The node behind a reference.
	///
	/// # Panics
	///
	/// Panics if the node does not exist; test helpers fail loudly.
	pub fn node(&self, node: NodeRef) -> &TestNode {
		match self.nodes.get(&node) {
			Some(found) => found,
			None => panic!("no such node: {}", node.raw()),
		}
	}

	/// All live nodes with the given tag, in creation order.
	pub fn find_by_tag(&self, tag: &str) -> Vec<NodeRef> {
		self.nodes
			.iter()
			.filter(|(_, entry)| entry.tag == tag)
			.map(|(&node, _)| node)
			.collect()
	}

	/// An attribute value, `None` when absent or the node is gone.
	pub fn attr(&self, node: NodeRef, name: &str) -> Option<&str> {
		self.nodes
			.get(&node)
			.and_then(|entry| entry.attrs.get(name))
			.map(String::as_str)
	}

	/// A property value, `None` when absent or the node is gone.
	pub fn prop(&self, node: NodeRef, name: &str) -> Option<&PropValue> {
		self.nodes.get(&node).and_then(|entry| entry.props.get(name))
	}

	/// The node's tag.
	pub fn tag_of(&self, node: NodeRef) -> &str {
		&self.node(node).tag
	}

	/// The node's children, in order.
	pub fn children(&self, node: NodeRef) -> Vec<NodeRef> {
		self.node(node).children.clone()
	}

	/// The node's attached listener kinds.
	pub fn listeners(&self, node: NodeRef) -> &BTreeSet<String> {
		&self.node(node).listeners
	}

	/// Concatenated text of the node's subtree.
	pub fn text_content(&self, node: NodeRef) -> String {
		let entry = self.node(node);
		let mut text = entry.text.clone();
		for &child in &entry.children {
			text.push_str(&self.text_content(child));
		}
		text
	}

	/// The operations applied so far, in order.
	pub fn ops(&self) -> &[SurfaceOp] {
		&self.ops
	}

	/// Drains the operation log, so the next assertion sees only what the
	/// code under test issued.
	pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
		std::mem::take(&mut self.ops)
	}

	/// Indented dump of the live tree, for failure messages.
	pub fn render(&self) -> String {
		let mut out = String::new();
		self.render_node(self.root, 0, &mut out);
		out
	}

	fn render_node(&self, node: NodeRef, depth: usize, out: &mut String) {
		let entry = self.node(node);
		for _ in 0..depth {
			out.push_str("  ");
		}
		if entry.tag == TEXT_TAG {
			let _ = writeln!(out, "{:?}({})", entry.text, node.raw());
			return;
		}
		let _ = write!(out, "{}({})", entry.tag, node.raw());
		for (name, value) in &entry.attrs {
			let _ = write!(out, " {name}={value:?}");
		}
		for kind in &entry.listeners {
			let _ = write!(out, " [{kind}]");
		}
		out.push('\n');
		for &child in &entry.children {
			self.render_node(child, depth + 1, out);
		}
	}

	fn get_mut(&mut self, node: NodeRef) -> SurfaceResult<&mut TestNode> {
		self.nodes
			.get_mut(&node)
			.ok_or(SurfaceError::UnknownNode { node: node.raw() })
	}

	fn ensure_known(&self, node: NodeRef) -> SurfaceResult<()> {
		if self.nodes.contains_key(&node) {
			Ok(())
		} else {
			Err(SurfaceError::UnknownNode { node: node.raw() })
		}
	}

	fn detach(&mut self, child: NodeRef) -> SurfaceResult<()> {
		let Some(parent) = self.get_mut(child)?.parent.take() else {
			return Ok(());
		};
		let siblings = &mut self.get_mut(parent)?.children;
		siblings.retain(|&existing| existing != child);
		Ok(())
	}

	/// Validates everything up front, so a rejected attach leaves the tree
	/// untouched, then detaches and reinserts. The index is interpreted
	/// against the child list with the child already removed, matching how
	/// the engine computes move destinations.
	fn attach(&mut self, parent: NodeRef, child: NodeRef, index: usize) -> SurfaceResult<()> {
		let current_parent = self
			.nodes
			.get(&child)
			.ok_or(SurfaceError::UnknownNode { node: child.raw() })?
			.parent;
		let mut len = self
			.nodes
			.get(&parent)
			.ok_or(SurfaceError::UnknownNode { node: parent.raw() })?
			.children
			.len();
		if current_parent == Some(parent) {
			len -= 1;
		}
		if index > len {
			return Err(SurfaceError::InvalidIndex { index, len });
		}
		self.detach(child)?;
		self.get_mut(parent)?.children.insert(index, child);
		self.get_mut(child)?.parent = Some(parent);
		Ok(())
	}

	fn allocate(&mut self, entry: TestNode) -> NodeRef {
		let node = NodeRef::from_raw(self.next_id);
		self.next_id += 1;
		self.nodes.insert(node, entry);
		node
	}
}

impl Default for TestSurface {
	fn default() -> Self {
		Self::new()
	}
}

impl Surface for TestSurface {
	fn root(&self) -> NodeRef {
		self.root
	}

	fn create_element(&mut self, tag: &str) -> SurfaceResult<NodeRef> {
		let node = self.allocate(TestNode::with_tag(tag));
		self.ops.push(SurfaceOp::CreateElement {
			node,
			tag: tag.to_string(),
		});
		Ok(node)
	}

	fn create_text(&mut self, text: &str) -> SurfaceResult<NodeRef> {
		let mut entry = TestNode::with_tag(TEXT_TAG);
		entry.text = text.to_string();
		let node = self.allocate(entry);
		self.ops.push(SurfaceOp::CreateText { node });
		Ok(node)
	}

	fn set_attr(&mut self, node: NodeRef, name: &str, value: &str) -> SurfaceResult<()> {
		self.get_mut(node)?
			.attrs
			.insert(name.to_string(), value.to_string());
		self.ops.push(SurfaceOp::SetAttr {
			node,
			name: name.to_string(),
			value: value.to_string(),
		});
		Ok(())
	}

	fn remove_attr(&mut self, node: NodeRef, name: &str) -> SurfaceResult<()> {
		self.get_mut(node)?.attrs.remove(name);
		self.ops.push(SurfaceOp::RemoveAttr {
			node,
			name: name.to_string(),
		});
		Ok(())
	}

	fn set_prop(&mut self, node: NodeRef, name: &str, value: PropValue) -> SurfaceResult<()> {
		self.get_mut(node)?
			.props
			.insert(name.to_string(), value.clone());
		self.ops.push(SurfaceOp::SetProp {
			node,
			name: name.to_string(),
			value,
		});
		Ok(())
	}

	fn set_text(&mut self, node: NodeRef, text: &str) -> SurfaceResult<()> {
		self.get_mut(node)?.text = text.to_string();
		self.ops.push(SurfaceOp::SetText {
			node,
			text: text.to_string(),
		});
		Ok(())
	}

	fn insert_child(&mut self, parent: NodeRef, child: NodeRef, index: usize) -> SurfaceResult<()> {
		self.attach(parent, child, index)?;
		self.ops.push(SurfaceOp::InsertChild {
			parent,
			child,
			index,
		});
		Ok(())
	}

	fn move_child(&mut self, parent: NodeRef, child: NodeRef, to_index: usize) -> SurfaceResult<()> {
		self.attach(parent, child, to_index)?;
		self.ops.push(SurfaceOp::MoveChild {
			parent,
			child,
			index: to_index,
		});
		Ok(())
	}

	fn destroy_node(&mut self, node: NodeRef) -> SurfaceResult<()> {
		self.ensure_known(node)?;
		self.detach(node)?;
		let mut doomed = vec![node];
		while let Some(next) = doomed.pop() {
			if let Some(entry) = self.nodes.remove(&next) {
				doomed.extend(entry.children);
			}
		}
		self.ops.push(SurfaceOp::DestroyNode { node });
		Ok(())
	}

	fn add_listener(&mut self, node: NodeRef, kind: &str) -> SurfaceResult<()> {
		self.get_mut(node)?.listeners.insert(kind.to_string());
		self.ops.push(SurfaceOp::AddListener {
			node,
			kind: kind.to_string(),
		});
		Ok(())
	}

	fn remove_listener(&mut self, node: NodeRef, kind: &str) -> SurfaceResult<()> {
		self.get_mut(node)?.listeners.remove(kind);
		self.ops.push(SurfaceOp::RemoveListener {
			node,
			kind: kind.to_string(),
		});
		Ok(())
	}
}
