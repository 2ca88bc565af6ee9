//! Tree store: the arena of mind-map nodes, root order and registered assets.
//!
//! Nodes live in a flat `id -> Node` map. Structure is expressed through ids
//! only: each node holds an ordered `children` list and an optional
//! `parent_id`, and the forest's roots are kept in `root_ids` (display order).
//! The store knows nothing about geometry policy; positions are plain fields
//! written by the layout engine and the drag gesture.
//!
//! Every mutation validates its inputs before touching the map, so a failed
//! call leaves the store exactly as it was.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{Point, Rect};
use crate::consts::{DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH};

/// Unique identifier for a node.
pub type NodeId = Uuid;

/// Unique identifier for a registered asset.
pub type AssetId = Uuid;

/// Opaque per-node style bag (color and friends).
pub type Style = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("cannot move {node} under {target}: target is the node or one of its descendants")]
    Cycle { node: NodeId, target: NodeId },
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),
    #[error("tree invariant violated: {0}")]
    Corrupt(String),
}

impl TreeError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NodeNotFound(_) => "E_NODE_NOT_FOUND",
            Self::Cycle { .. } => "E_CYCLE",
            Self::AssetNotFound(_) => "E_ASSET_NOT_FOUND",
            Self::Corrupt(_) => "E_CORRUPT",
        }
    }
}

/// Image attached to a node, referencing a registered asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeImage {
    pub asset_id: AssetId,
    /// Display width in world units.
    pub width: f64,
    /// Display height in world units.
    pub height: f64,
}

/// A binary asset (usually an image) registered once and shared by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: AssetId,
    pub filename: String,
    pub mime_type: String,
    /// Intrinsic width in pixels.
    pub width: f64,
    /// Intrinsic height in pixels.
    pub height: f64,
}

/// A single mind-map node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// `None` for roots.
    pub parent_id: Option<NodeId>,
    pub text: String,
    /// Child ids in sibling order.
    pub children: Vec<NodeId>,
    pub collapsed: bool,
    /// Left edge in world coordinates.
    pub x: f64,
    /// Top edge in world coordinates.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Set once the user fixed the width by hand; text then wraps instead of growing.
    pub width_constrained: bool,
    pub style: Option<Style>,
    pub image: Option<NodeImage>,
}

impl Node {
    /// A fresh node with default geometry at `(x, y)`.
    #[must_use]
    pub fn new(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            text: text.into(),
            children: Vec::new(),
            collapsed: false,
            x,
            y,
            width: DEFAULT_NODE_WIDTH,
            height: DEFAULT_NODE_HEIGHT,
            width_constrained: false,
            style: None,
            image: None,
        }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_box(self.x, self.y, self.width, self.height)
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Direction for sibling reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reorder {
    Up,
    Down,
}

/// In-memory forest of nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    nodes: HashMap<NodeId, Node>,
    root_ids: Vec<NodeId>,
    assets: Vec<Asset>,
}

impl Store {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a store from parts. The caller is responsible for consistency;
    /// run [`Store::check_invariants`] on untrusted input.
    #[must_use]
    pub fn from_parts(nodes: HashMap<NodeId, Node>, root_ids: Vec<NodeId>, assets: Vec<Asset>) -> Self {
        Self { nodes, root_ids, assets }
    }

    // --- Lookup ---

    /// Return a node by id.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(&id).ok_or(TreeError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn root_ids(&self) -> &[NodeId] {
        &self.root_ids
    }

    /// Number of nodes in the forest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate every node in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    // --- Creation ---

    /// Add a new root at `(x, y)`, appended to the root order.
    pub fn add_root(&mut self, text: impl Into<String>, x: f64, y: f64) -> NodeId {
        let node = Node::new(text, x, y);
        let id = node.id;
        self.root_ids.push(id);
        self.nodes.insert(id, node);
        tracing::debug!(%id, "root added");
        id
    }

    /// Append a new child under `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the parent does not exist.
    pub fn add_child(&mut self, parent_id: NodeId, text: impl Into<String>) -> Result<NodeId, TreeError> {
        let len = self.node(parent_id)?.children.len();
        self.insert_child(parent_id, len, text)
    }

    /// Insert a new child under `parent_id` at `index` (clamped to `[0, len]`).
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the parent does not exist.
    pub fn insert_child(
        &mut self,
        parent_id: NodeId,
        index: usize,
        text: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        let parent = self.node(parent_id)?;
        let mut node = Node::new(text, parent.x, parent.y);
        node.parent_id = Some(parent_id);
        let id = node.id;

        let parent = self.node_mut(parent_id)?;
        let index = index.min(parent.children.len());
        parent.children.insert(index, id);
        self.nodes.insert(id, node);
        tracing::debug!(%id, %parent_id, index, "child inserted");
        Ok(id)
    }

    // --- Deletion ---

    /// Remove `id` and its whole subtree. Returns the removed ids in pre-order.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn delete_node(&mut self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let removed = self.subtree(id)?;
        let parent_id = self.node(id)?.parent_id;

        match parent_id {
            Some(pid) => {
                if let Some(parent) = self.nodes.get_mut(&pid) {
                    parent.children.retain(|c| *c != id);
                }
            }
            None => self.root_ids.retain(|r| *r != id),
        }
        for rid in &removed {
            self.nodes.remove(rid);
        }
        tracing::debug!(%id, count = removed.len(), "subtree deleted");
        Ok(removed)
    }

    // --- Field updates ---

    /// Replace a node's text.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), TreeError> {
        self.node_mut(id)?.text = text.into();
        Ok(())
    }

    /// Move a single node (not its subtree) to `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn set_node_position(&mut self, id: NodeId, x: f64, y: f64) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        node.x = x;
        node.y = y;
        Ok(())
    }

    /// Fix a node's width by hand. Marks the node width-constrained.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn set_node_width(&mut self, id: NodeId, width: f64) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        node.width = width;
        node.width_constrained = true;
        Ok(())
    }

    /// Store a measured size without changing the width-constrained flag.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn set_node_size(&mut self, id: NodeId, width: f64, height: f64) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        node.width = width;
        node.height = height;
        Ok(())
    }

    /// Flip the collapsed flag. Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn toggle_collapse(&mut self, id: NodeId) -> Result<bool, TreeError> {
        let node = self.node_mut(id)?;
        node.collapsed = !node.collapsed;
        Ok(node.collapsed)
    }

    /// Set the collapsed flag explicitly.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn set_collapsed(&mut self, id: NodeId, collapsed: bool) -> Result<(), TreeError> {
        self.node_mut(id)?.collapsed = collapsed;
        Ok(())
    }

    /// Replace a node's style bag.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn set_style(&mut self, id: NodeId, style: Option<Style>) -> Result<(), TreeError> {
        self.node_mut(id)?.style = style;
        Ok(())
    }

    /// Attach or detach an image. The asset must already be registered.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown node and `AssetNotFound` for an
    /// unregistered asset.
    pub fn set_image(&mut self, id: NodeId, image: Option<NodeImage>) -> Result<(), TreeError> {
        self.node(id)?;
        if let Some(img) = &image {
            self.asset(img.asset_id)?;
        }
        self.node_mut(id)?.image = image;
        Ok(())
    }

    // --- Structure ---

    /// Reparent `id` under `new_parent` at `index` (appended when `None`).
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for unknown ids and `Cycle` when `new_parent`
    /// is `id` itself or one of its descendants.
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId, index: Option<usize>) -> Result<(), TreeError> {
        let old_parent = self.node(id)?.parent_id;
        self.node(new_parent)?;
        if new_parent == id || self.is_descendant(new_parent, id)? {
            tracing::warn!(%id, %new_parent, "move rejected: would create a cycle");
            return Err(TreeError::Cycle { node: id, target: new_parent });
        }

        match old_parent {
            Some(pid) => self.node_mut(pid)?.children.retain(|c| *c != id),
            None => self.root_ids.retain(|r| *r != id),
        }
        let parent = self.node_mut(new_parent)?;
        let index = index.unwrap_or(parent.children.len()).min(parent.children.len());
        parent.children.insert(index, id);
        self.node_mut(id)?.parent_id = Some(new_parent);
        tracing::debug!(%id, %new_parent, index, "node moved");
        Ok(())
    }

    /// Swap `id` with its previous or next sibling. Roots are never reordered.
    /// Returns `true` when the order changed.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn reorder_node(&mut self, id: NodeId, direction: Reorder) -> Result<bool, TreeError> {
        let Some(parent_id) = self.node(id)?.parent_id else {
            return Ok(false);
        };
        let siblings = &mut self.node_mut(parent_id)?.children;
        let Some(idx) = siblings.iter().position(|c| *c == id) else {
            return Err(TreeError::Corrupt(format!("{id} missing from its parent's children")));
        };
        let other = match direction {
            Reorder::Up if idx > 0 => idx - 1,
            Reorder::Down if idx + 1 < siblings.len() => idx + 1,
            _ => return Ok(false),
        };
        siblings.swap(idx, other);
        Ok(true)
    }

    // --- Traversal ---

    /// Ordered child ids.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(&self.node(id)?.children)
    }

    /// Parent id, `None` for a root.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.node(id)?.parent_id)
    }

    /// The full ordered sibling list the node belongs to (itself included).
    /// The siblings of a root are all roots.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn siblings(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        match self.node(id)?.parent_id {
            Some(pid) => self.children(pid),
            None => Ok(&self.root_ids),
        }
    }

    /// Ancestor chain from the parent up to the root, excluding `id`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn ancestors(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut chain = Vec::new();
        let mut cur = self.node(id)?.parent_id;
        while let Some(pid) = cur {
            if chain.len() > self.nodes.len() {
                return Err(TreeError::Corrupt(format!("parent chain of {id} does not terminate")));
            }
            chain.push(pid);
            cur = self.node(pid)?.parent_id;
        }
        Ok(chain)
    }

    /// The root of the tree containing `id`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn root_of(&self, id: NodeId) -> Result<NodeId, TreeError> {
        Ok(self.ancestors(id)?.last().copied().unwrap_or(id))
    }

    /// Whether `node` lies strictly below `ancestor`. False when they are equal.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if either node does not exist.
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> Result<bool, TreeError> {
        self.node(ancestor)?;
        Ok(self.ancestors(node)?.contains(&ancestor))
    }

    /// `id` followed by all its descendants, pre-order, ignoring collapse.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn subtree(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        self.node(id)?;
        Ok(self.walk(&[id], false))
    }

    /// `id` followed by the descendants reachable without entering a
    /// collapsed node, pre-order.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node does not exist.
    pub fn visible_subtree(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        self.node(id)?;
        Ok(self.walk(&[id], true))
    }

    /// Pre-order walk of all roots that does not descend into collapsed nodes.
    #[must_use]
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        self.walk(&self.root_ids, true)
    }

    fn walk(&self, start: &[NodeId], respect_collapse: bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = start.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            out.push(id);
            if respect_collapse && node.collapsed {
                continue;
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    // --- Assets ---

    /// Register an asset. Re-registering an existing id replaces its metadata.
    pub fn register_asset(&mut self, asset: Asset) {
        if let Some(existing) = self.assets.iter_mut().find(|a| a.id == asset.id) {
            *existing = asset;
        } else {
            self.assets.push(asset);
        }
    }

    /// Look up a registered asset.
    ///
    /// # Errors
    ///
    /// Returns `AssetNotFound` for an unregistered id.
    pub fn asset(&self, id: AssetId) -> Result<&Asset, TreeError> {
        self.assets.iter().find(|a| a.id == id).ok_or(TreeError::AssetNotFound(id))
    }

    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    // --- Validation ---

    /// Verify the structural invariants of the forest.
    ///
    /// # Errors
    ///
    /// Returns `Corrupt` describing the first violation found, or
    /// `AssetNotFound` when an image references an unregistered asset.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        for rid in &self.root_ids {
            let root = self.nodes.get(rid).ok_or_else(|| TreeError::Corrupt(format!("root {rid} missing")))?;
            if root.parent_id.is_some() {
                return Err(TreeError::Corrupt(format!("root {rid} has a parent")));
            }
            if !seen.insert(*rid) {
                return Err(TreeError::Corrupt(format!("root {rid} listed twice")));
            }
        }

        let mut stack: Vec<NodeId> = self.root_ids.clone();
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            for child in &node.children {
                let c = self.nodes.get(child).ok_or_else(|| TreeError::Corrupt(format!("child {child} missing")))?;
                if c.parent_id != Some(id) {
                    return Err(TreeError::Corrupt(format!("{child} does not point back at {id}")));
                }
                if !seen.insert(*child) {
                    return Err(TreeError::Corrupt(format!("{child} reachable twice")));
                }
                stack.push(*child);
            }
            if let Some(img) = &node.image {
                self.asset(img.asset_id)?;
            }
        }

        if seen.len() != self.nodes.len() {
            return Err(TreeError::Corrupt(format!(
                "{} node(s) unreachable from the roots",
                self.nodes.len() - seen.len()
            )));
        }
        Ok(())
    }
}
