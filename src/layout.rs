//! Incremental layout: sibling centering, rigid subtree moves and
//! cross-tree overlap resolution.
//!
//! The layout never recomputes the whole forest from scratch. Each structural
//! change re-centers the affected sibling groups bottom-up, moving subtrees as
//! rigid units, and then pushes neighbouring root trees out of the way. Node
//! `x`/`y` are the top-left corner of the node box; vertical centering uses the
//! box center.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use crate::camera::Rect;
use crate::config::LayoutConfig;
use crate::store::{NodeId, Store, TreeError};

/// Which side of its root a branch grows on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// `-1.0` for left, `+1.0` for right.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Horizontal clip range used for column-restricted bounding boxes.
pub type Span = (f64, f64);

/// Layout engine bound to a set of geometry rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Layout {
    cfg: LayoutConfig,
}

impl Layout {
    #[must_use]
    pub fn new(cfg: LayoutConfig) -> Self {
        Self { cfg }
    }

    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.cfg
    }

    /// Vertical footprint of the visible subtree rooted at `id`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn subtree_height(&self, store: &Store, id: NodeId) -> Result<f64, TreeError> {
        let node = store.node(id)?;
        if node.collapsed || node.is_leaf() {
            return Ok(node.height);
        }
        let mut total = 0.0;
        for child in &node.children {
            total += self.subtree_height(store, *child)?;
        }
        #[allow(clippy::cast_precision_loss)]
        let gaps = self.cfg.v_gap * (node.children.len() - 1) as f64;
        Ok(node.height.max(total + gaps))
    }

    /// Side of the parent a node sits on. Roots count as right.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn branch_direction(&self, store: &Store, id: NodeId) -> Result<Side, TreeError> {
        let node = store.node(id)?;
        let Some(parent_id) = node.parent_id else {
            return Ok(Side::Right);
        };
        let parent = store.node(parent_id)?;
        Ok(if node.x >= parent.x { Side::Right } else { Side::Left })
    }

    /// Place a freshly attached child one step out from its parent, then
    /// re-center the parent's children.
    ///
    /// Direction is `hint` if given, else the side of the nearest preceding
    /// (or following) sibling, else the parent's own side.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn position_new_child(&self, store: &mut Store, child: NodeId, hint: Option<Side>) -> Result<(), TreeError> {
        let Some(parent_id) = store.parent(child)? else {
            return Ok(());
        };
        let side = match hint {
            Some(side) => side,
            None => match neighbour_sibling(store, parent_id, child)? {
                Some(sibling) => self.branch_direction(store, sibling)?,
                None => self.branch_direction(store, parent_id)?,
            },
        };
        let parent = store.node(parent_id)?;
        let (x, y) = (parent.x + self.cfg.h_offset * side.sign(), parent.y);
        store.set_node_position(child, x, y)?;
        tracing::debug!(%child, %parent_id, ?side, "new child positioned");
        self.center_children(store, parent_id)
    }

    /// Place `new_id` directly below `ref_id` and re-center their parent's children.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn position_new_sibling(&self, store: &mut Store, new_id: NodeId, ref_id: NodeId) -> Result<(), TreeError> {
        let reference = store.node(ref_id)?;
        let (x, y) = (reference.x, reference.y + reference.height + self.cfg.v_gap);
        store.set_node_position(new_id, x, y)?;
        match store.parent(new_id)? {
            Some(parent_id) => self.center_children(store, parent_id),
            None => Ok(()),
        }
    }

    /// Re-center the children of `parent_id` around the parent's vertical center.
    ///
    /// Root children are split into a left group (`x < root.x`) and a right
    /// group, each centered on its own.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn center_children(&self, store: &mut Store, parent_id: NodeId) -> Result<(), TreeError> {
        let parent = store.node(parent_id)?;
        let center_y = parent.center().y;
        let children = parent.children.clone();

        if parent.parent_id.is_none() {
            let parent_x = parent.x;
            let mut left = Vec::new();
            let mut right = Vec::new();
            for child in children {
                if store.node(child)?.x < parent_x {
                    left.push(child);
                } else {
                    right.push(child);
                }
            }
            self.center_group(store, center_y, &left)?;
            self.center_group(store, center_y, &right)
        } else {
            self.center_group(store, center_y, &children)
        }
    }

    fn center_group(&self, store: &mut Store, center_y: f64, group: &[NodeId]) -> Result<(), TreeError> {
        if group.is_empty() {
            return Ok(());
        }
        let mut heights = Vec::with_capacity(group.len());
        for id in group {
            heights.push(self.subtree_height(store, *id)?);
        }
        #[allow(clippy::cast_precision_loss)]
        let total = heights.iter().sum::<f64>() + self.cfg.v_gap * (group.len() - 1) as f64;

        let mut band = center_y - total / 2.0;
        for (id, band_height) in group.iter().zip(heights) {
            let node = store.node(*id)?;
            let target = band + band_height / 2.0 - node.height / 2.0;
            let delta = target - node.y;
            if delta.abs() > self.cfg.epsilon {
                self.shift_subtree(store, *id, delta)?;
            }
            band += band_height + self.cfg.v_gap;
        }
        Ok(())
    }

    /// Move `id` and every descendant (collapsed ones included) down by `dy`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn shift_subtree(&self, store: &mut Store, id: NodeId, dy: f64) -> Result<(), TreeError> {
        self.translate_subtree(store, id, 0.0, dy)
    }

    /// Move `id` and every descendant by `(dx, dy)`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn translate_subtree(&self, store: &mut Store, id: NodeId, dx: f64, dy: f64) -> Result<(), TreeError> {
        for nid in store.subtree(id)? {
            let node = store.node(nid)?;
            let (x, y) = (node.x + dx, node.y + dy);
            store.set_node_position(nid, x, y)?;
        }
        Ok(())
    }

    /// Re-center `id`'s children and then every ancestor level, bottom-up.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn relayout_from_node(&self, store: &mut Store, id: NodeId) -> Result<(), TreeError> {
        let mut chain = vec![id];
        chain.extend(store.ancestors(id)?);
        for level in chain {
            self.center_children(store, level)?;
        }
        Ok(())
    }

    /// Re-center the former parent of a deleted node and all its ancestors.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn relayout_after_delete(&self, store: &mut Store, parent_id: NodeId) -> Result<(), TreeError> {
        self.relayout_from_node(store, parent_id)
    }

    /// Extent of the visible tree under `root_id`.
    ///
    /// With `clip`, only nodes whose horizontal extent intersects the range
    /// contribute. Returns `None` when no node contributes.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn tree_bounding_box(&self, store: &Store, root_id: NodeId, clip: Option<Span>) -> Result<Option<Rect>, TreeError> {
        let mut bbox: Option<Rect> = None;
        for id in store.visible_subtree(root_id)? {
            let node = store.node(id)?;
            if let Some((lo, hi)) = clip {
                if !(node.x < hi && node.x + node.width > lo) {
                    continue;
                }
            }
            let rect = node.rect();
            bbox = Some(match bbox {
                Some(b) => b.union(rect),
                None => rect,
            });
        }
        Ok(bbox)
    }

    /// Snap every descendant's `x` back to one `h_offset` step from its
    /// parent, on the side the branch now grows.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn reflow_subtree(&self, store: &mut Store, id: NodeId) -> Result<(), TreeError> {
        let mut stack = vec![id];
        while let Some(nid) = stack.pop() {
            let node = store.node(nid)?;
            let is_root = node.parent_id.is_none();
            let (x, children) = (node.x, node.children.clone());
            let own_side = self.branch_direction(store, nid)?;
            for child in children.iter().rev() {
                let side = if is_root { self.branch_direction(store, *child)? } else { own_side };
                let cy = store.node(*child)?.y;
                store.set_node_position(*child, x + self.cfg.h_offset * side.sign(), cy)?;
                stack.push(*child);
            }
        }
        Ok(())
    }

    /// Push every other root tree that overlaps the tree containing `changed`.
    ///
    /// Overlap is judged only inside the x-column both trees share, so a
    /// wide tree does not push away a neighbour that only meets it near a
    /// narrow root. Returns the roots that were moved.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id.
    pub fn resolve_tree_overlap(&self, store: &mut Store, changed: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let changed_root = store.root_of(changed)?;
        let mut moved = Vec::new();
        let others: Vec<NodeId> = store.root_ids().iter().copied().filter(|r| *r != changed_root).collect();

        for other in others {
            let (Some(mine), Some(theirs)) = (
                self.tree_bounding_box(store, changed_root, None)?,
                self.tree_bounding_box(store, other, None)?,
            ) else {
                continue;
            };
            if !mine.overlaps_x(&theirs) {
                continue;
            }
            let shared = (mine.min_x.max(theirs.min_x), mine.max_x.min(theirs.max_x));
            let (Some(a), Some(b)) = (
                self.tree_bounding_box(store, changed_root, Some(shared))?,
                self.tree_bounding_box(store, other, Some(shared))?,
            ) else {
                continue;
            };
            if !a.overlaps_y(&b) {
                continue;
            }
            let dy = if b.center().y >= a.center().y {
                (a.max_y - b.min_y) + self.cfg.padding
            } else {
                -((b.max_y - a.min_y) + self.cfg.padding)
            };
            tracing::debug!(%changed_root, %other, dy, "pushing overlapping tree");
            self.shift_subtree(store, other, dy)?;
            moved.push(other);
        }
        Ok(moved)
    }

    /// Center every tree bottom-up, then resolve overlaps root by root.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the store is inconsistent.
    pub fn relayout_all(&self, store: &mut Store) -> Result<(), TreeError> {
        let roots = store.root_ids().to_vec();
        for root in &roots {
            let order = store.subtree(*root)?;
            for id in order.iter().rev() {
                if !store.node(*id)?.is_leaf() {
                    self.center_children(store, *id)?;
                }
            }
        }
        for root in &roots {
            self.resolve_tree_overlap(store, *root)?;
        }
        Ok(())
    }
}

/// The sibling a new child should inherit its side from: the nearest one
/// before it in sibling order, else the nearest one after it.
fn neighbour_sibling(store: &Store, parent_id: NodeId, child: NodeId) -> Result<Option<NodeId>, TreeError> {
    let siblings = store.children(parent_id)?;
    let Some(idx) = siblings.iter().position(|s| *s == child) else {
        return Ok(None);
    };
    if idx > 0 {
        return Ok(Some(siblings[idx - 1]));
    }
    Ok(siblings.get(idx + 1).copied())
}
