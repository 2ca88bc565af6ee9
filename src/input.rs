//! Pointer gesture state: node drags and width resizes.
//!
//! `Gesture` is the active gesture tracked between pointer-down and
//! pointer-up. Each active variant carries everything needed to compute
//! incremental moves and to commit or roll back on release: the undo entry
//! captured at gesture start, which is only committed if the gesture actually
//! changed something.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::history::HistoryEntry;
use crate::store::NodeId;

/// Context of an in-progress node drag.
#[derive(Debug, Clone)]
pub struct DragState {
    /// Node being dragged; its subtree follows rigidly.
    pub id: NodeId,
    /// `pointer - node.position` at drag start, in world units.
    pub offset: Point,
    /// Top-left of the node after the last applied update.
    pub last_pos: Point,
    /// Snapshot taken at drag start; doubles as the cancel target.
    pub snapshot: HistoryEntry,
    /// Set once an update moved the node past the threshold.
    pub moved: bool,
    /// Set once the node swapped places with a sibling.
    pub reordered: bool,
    /// Node the dragged node would be attached under if dropped now.
    pub reparent_target: Option<NodeId>,
}

impl DragState {
    #[must_use]
    pub fn new(id: NodeId, offset: Point, start: Point, snapshot: HistoryEntry) -> Self {
        Self { id, offset, last_pos: start, snapshot, moved: false, reordered: false, reparent_target: None }
    }

    /// Whether releasing now would change the document.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.moved || self.reordered || self.reparent_target.is_some()
    }
}

/// Context of an in-progress width resize.
#[derive(Debug, Clone)]
pub struct ResizeState {
    pub id: NodeId,
    /// Width before the gesture began.
    pub orig_width: f64,
    /// Height before the gesture began.
    pub orig_height: f64,
    /// Whether the node was width-constrained before the gesture began.
    pub orig_constrained: bool,
    pub snapshot: HistoryEntry,
    pub changed: bool,
}

/// Active pointer gesture.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A node (with its subtree) follows the pointer.
    Dragging(DragState),
    /// A node's width follows the pointer.
    Resizing(ResizeState),
}

impl Gesture {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The node the gesture operates on.
    #[must_use]
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Self::Idle => None,
            Self::Dragging(d) => Some(d.id),
            Self::Resizing(r) => Some(r.id),
        }
    }

    /// Current reparent target of a drag, for drop-zone highlighting.
    #[must_use]
    pub fn reparent_target(&self) -> Option<NodeId> {
        match self {
            Self::Dragging(d) => d.reparent_target,
            _ => None,
        }
    }
}
