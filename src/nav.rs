//! Spatial keyboard navigation.
//!
//! Navigation is a read-only query: given the current selection and an arrow
//! direction it picks the next node to select. Structural moves (parent,
//! child, sibling) are tried first; when they have nothing to offer, a
//! weighted spatial search over all visible nodes takes over. The weighted
//! score favours nodes aligned with the travel axis over nodes that are
//! closer but off to the side.

#[cfg(test)]
#[path = "nav_test.rs"]
mod nav_test;

use crate::camera::Point;
use crate::layout::{Layout, Side};
use crate::store::{Node, NodeId, Store, TreeError};

/// Arrow-key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

/// Outcome of a navigation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    /// Select this node.
    Select(NodeId),
    /// Expand the collapsed `expand` node first, then select its child `select`.
    ExpandAndSelect { expand: NodeId, select: NodeId },
}

impl NavTarget {
    /// The node that ends up selected.
    #[must_use]
    pub fn selected(self) -> NodeId {
        match self {
            Self::Select(id) | Self::ExpandAndSelect { select: id, .. } => id,
        }
    }
}

/// Navigation query bound to a store snapshot.
pub struct Navigator<'a> {
    store: &'a Store,
    layout: &'a Layout,
    cross_weight: f64,
}

impl<'a> Navigator<'a> {
    #[must_use]
    pub fn new(store: &'a Store, layout: &'a Layout, cross_weight: f64) -> Self {
        Self { store, layout, cross_weight }
    }

    /// Pick the node to select when moving from `current` in `dir`.
    /// Returns `None` when nothing lies in that direction.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `current` does not exist.
    pub fn navigate(&self, current: NodeId, dir: Direction) -> Result<Option<NavTarget>, TreeError> {
        let node = self.store.node(current)?;
        if dir.is_vertical() {
            if let Some(sibling) = self.sibling_in_direction(node, dir)? {
                return Ok(Some(NavTarget::Select(sibling)));
            }
            return self.spatial(node, dir);
        }

        let structural = match node.parent_id {
            None => self.root_child_on_side(node, dir)?,
            Some(parent_id) => {
                let side = self.layout.branch_direction(self.store, current)?;
                let backward = match side {
                    Side::Right => Direction::Left,
                    Side::Left => Direction::Right,
                };
                if dir == backward {
                    Some(NavTarget::Select(parent_id))
                } else {
                    self.nearest_child(node, |_| true)?
                }
            }
        };
        match structural {
            Some(target) => Ok(Some(target)),
            None => self.spatial(node, dir),
        }
    }

    /// The visible node whose center is nearest to `pt`.
    #[must_use]
    pub fn nearest_to(&self, pt: Point) -> Option<NodeId> {
        let mut best: Option<(f64, NodeId)> = None;
        for id in self.store.visible_nodes() {
            let Ok(node) = self.store.node(id) else {
                continue;
            };
            let d = node.center().distance(pt);
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Nearest same-side sibling strictly above/below `node`.
    fn sibling_in_direction(&self, node: &Node, dir: Direction) -> Result<Option<NodeId>, TreeError> {
        let Some(parent_id) = node.parent_id else {
            return Ok(None);
        };
        let parent = self.store.node(parent_id)?;
        let parent_is_root = parent.parent_id.is_none();
        let my_left = node.x < parent.x;
        let cy = node.center().y;

        let mut best: Option<(f64, NodeId)> = None;
        for sid in &parent.children {
            if *sid == node.id {
                continue;
            }
            let sibling = self.store.node(*sid)?;
            if parent_is_root && (sibling.x < parent.x) != my_left {
                continue;
            }
            let sy = sibling.center().y;
            let past = match dir {
                Direction::Down => sy > cy,
                _ => sy < cy,
            };
            if !past {
                continue;
            }
            let d = (sy - cy).abs();
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, *sid));
            }
        }
        Ok(best.map(|(_, id)| id))
    }

    /// Root + horizontal arrow: nearest-in-y child on that side.
    fn root_child_on_side(&self, root: &Node, dir: Direction) -> Result<Option<NavTarget>, TreeError> {
        let want_left = dir == Direction::Left;
        let mut on_side = Vec::new();
        for cid in &root.children {
            if (self.store.node(*cid)?.x < root.x) == want_left {
                on_side.push(*cid);
            }
        }
        self.nearest_child(root, |id| on_side.contains(&id))
    }

    /// The child of `node` (passing `filter`) whose center is nearest in y.
    fn nearest_child<F>(&self, node: &Node, filter: F) -> Result<Option<NavTarget>, TreeError>
    where
        F: Fn(NodeId) -> bool,
    {
        let cy = node.center().y;
        let mut best: Option<(f64, NodeId)> = None;
        for cid in &node.children {
            if !filter(*cid) {
                continue;
            }
            let d = (self.store.node(*cid)?.center().y - cy).abs();
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, *cid));
            }
        }
        Ok(best.map(|(_, child)| {
            if node.collapsed {
                NavTarget::ExpandAndSelect { expand: node.id, select: child }
            } else {
                NavTarget::Select(child)
            }
        }))
    }

    /// Lowest `primary + cross * weight` among visible nodes strictly on the
    /// requested side of `node`.
    fn spatial(&self, node: &Node, dir: Direction) -> Result<Option<NavTarget>, TreeError> {
        let origin = node.center();
        let mut best: Option<(f64, NodeId)> = None;
        for id in self.store.visible_nodes() {
            if id == node.id {
                continue;
            }
            let c = self.store.node(id)?.center();
            let (dx, dy) = (c.x - origin.x, c.y - origin.y);
            let (ahead, primary, cross) = match dir {
                Direction::Up => (dy < 0.0, -dy, dx.abs()),
                Direction::Down => (dy > 0.0, dy, dx.abs()),
                Direction::Left => (dx < 0.0, -dx, dy.abs()),
                Direction::Right => (dx > 0.0, dx, dy.abs()),
            };
            if !ahead {
                continue;
            }
            let score = primary + cross * self.cross_weight;
            if best.is_none_or(|(bs, _)| score < bs) {
                best = Some((score, id));
            }
        }
        Ok(best.map(|(_, id)| NavTarget::Select(id)))
    }
}
