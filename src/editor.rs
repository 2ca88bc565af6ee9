//! Session controller.
//!
//! `Editor` is the single entry point for every mutation. Each public call
//! snapshots the store for undo when it is about to change it, mutates the
//! store, re-derives positions through the layout engine and finally tells
//! subscribers what changed. Selection, edit mode, camera, gestures and the
//! EasyMotion session are session state: they are never part of an undo
//! snapshot.

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;

use std::collections::HashSet;

use crate::camera::{Camera, Point};
use crate::config::EngineConfig;
use crate::document::{Document, DocumentError, Meta};
use crate::history::{History, HistoryEntry, text_label};
use crate::input::{DragState, Gesture, ResizeState};
use crate::labels::{self, EasyMotion, KeyOutcome};
use crate::layout::Layout;
use crate::measure::{MonospaceMeasurer, Size, TextMeasurer};
use crate::nav::{Direction, NavTarget, Navigator};
use crate::store::{Asset, NodeId, NodeImage, Reorder, Store, Style, TreeError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("a gesture is already in progress")]
    GestureInProgress,
}

impl EditorError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Tree(e) => e.error_code(),
            Self::Document(e) => e.error_code(),
            Self::GestureInProgress => "E_GESTURE_IN_PROGRESS",
        }
    }
}

/// Interaction mode derived from the session flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// The selected node's text is being edited.
    Editing,
    /// Jump labels are shown and keys select targets.
    EasyMotion,
}

/// Change notification delivered to subscribers after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    /// Nodes, structure or assets changed.
    DocumentChanged,
    SelectionChanged(Option<NodeId>),
    /// Camera or viewport changed.
    ViewChanged,
    ModeChanged(Mode),
}

pub type SubscriptionId = u64;

type Listener = Box<dyn FnMut(&EditorEvent)>;

/// Session state sampled before an operation, diffed afterwards.
#[derive(Clone, Copy)]
struct Observed {
    selection: Option<NodeId>,
    mode: Mode,
    camera: Camera,
    viewport: Size,
}

pub struct Editor {
    store: Store,
    layout: Layout,
    config: EngineConfig,
    measurer: Box<dyn TextMeasurer>,
    camera: Camera,
    viewport: Size,
    meta: Meta,
    selection: Option<NodeId>,
    editing: bool,
    gesture: Gesture,
    easymotion: Option<EasyMotion<NodeId>>,
    history: History,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EngineConfig::default(), Box::new(MonospaceMeasurer::default()))
    }
}

impl Editor {
    #[must_use]
    pub fn new(config: EngineConfig, measurer: Box<dyn TextMeasurer>) -> Self {
        Self {
            store: Store::new(),
            layout: Layout::new(config.layout),
            config,
            measurer,
            camera: Camera::default(),
            viewport: Size::new(0.0, 0.0),
            meta: Meta::default(),
            selection: None,
            editing: false,
            gesture: Gesture::Idle,
            easymotion: None,
            history: History::new(config.history_limit),
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    // --- Accessors ---

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    #[must_use]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    #[must_use]
    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.easymotion.is_some() {
            Mode::EasyMotion
        } else if self.editing {
            Mode::Editing
        } else {
            Mode::Normal
        }
    }

    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Active jump labels, nearest target first.
    #[must_use]
    pub fn easymotion_labels(&self) -> Option<&[(String, NodeId)]> {
        self.easymotion.as_ref().map(EasyMotion::labels)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// World point at the middle of the viewport.
    #[must_use]
    pub fn viewport_center(&self) -> Point {
        self.camera.screen_to_world(Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0))
    }

    // --- Subscribers ---

    /// Register a listener called after every operation that changed something.
    pub fn subscribe(&mut self, listener: impl FnMut(&EditorEvent) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` for an unknown id.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn observe(&self) -> Observed {
        Observed { selection: self.selection, mode: self.mode(), camera: self.camera, viewport: self.viewport }
    }

    fn notify(&mut self, before: Observed, document_changed: bool) {
        let after = self.observe();
        let mut events = Vec::new();
        if document_changed {
            events.push(EditorEvent::DocumentChanged);
        }
        if before.selection != after.selection {
            events.push(EditorEvent::SelectionChanged(after.selection));
        }
        if before.camera != after.camera || before.viewport != after.viewport {
            events.push(EditorEvent::ViewChanged);
        }
        if before.mode != after.mode {
            events.push(EditorEvent::ModeChanged(after.mode));
        }
        for event in &events {
            for (_, listener) in &mut self.listeners {
                listener(event);
            }
        }
    }

    // --- Documents ---

    /// Replace the whole session with `doc`. Clears selection, gestures and history.
    ///
    /// # Errors
    ///
    /// `Document` errors for invalid documents; the session is left untouched.
    pub fn load_document(&mut self, doc: Document) -> Result<(), EditorError> {
        let store = doc.to_store()?;
        let before = self.observe();
        self.store = store;
        self.camera = doc.camera;
        self.meta = doc.meta;
        self.selection = None;
        self.editing = false;
        self.gesture = Gesture::Idle;
        self.easymotion = None;
        self.history.clear();
        tracing::info!(nodes = self.store.len(), roots = self.store.root_ids().len(), "document loaded");
        self.notify(before, true);
        Ok(())
    }

    /// Parse and load a JSON document.
    ///
    /// # Errors
    ///
    /// `UnsupportedVersion` or `Validation`; the session is left untouched.
    pub fn load_json(&mut self, json: &str) -> Result<(), EditorError> {
        let doc = Document::from_json(json)?;
        self.load_document(doc)
    }

    #[must_use]
    pub fn to_document(&self) -> Document {
        Document::from_store(&self.store, self.camera, self.meta.clone())
    }

    /// Serialize the session's document.
    ///
    /// # Errors
    ///
    /// `Validation` if the store holds unrepresentable numbers.
    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(self.to_document().to_json()?)
    }

    // --- Node creation and deletion ---

    /// Add a new root at `at` (world coordinates), select it and start editing.
    ///
    /// # Errors
    ///
    /// Only on an inconsistent store.
    pub fn add_root(&mut self, text: &str, at: Point) -> Result<NodeId, EditorError> {
        let before = self.observe();
        self.history.record(&self.store, "add-root");
        let id = self.store.add_root(text, at.x, at.y);
        self.measure_node(id)?;
        self.settle(id)?;
        self.focus_new(id);
        self.notify(before, true);
        Ok(id)
    }

    /// Append a child under `parent`, select it and start editing. A collapsed
    /// parent is expanded so the new node is visible.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown parent.
    pub fn add_child(&mut self, parent: NodeId, text: &str) -> Result<NodeId, EditorError> {
        let collapsed = self.store.node(parent)?.collapsed;
        let before = self.observe();
        self.history.record(&self.store, "add-child");
        if collapsed {
            self.store.set_collapsed(parent, false)?;
        }
        let id = self.store.add_child(parent, text)?;
        self.measure_node(id)?;
        self.layout.position_new_child(&mut self.store, id, None)?;
        self.layout.relayout_from_node(&mut self.store, parent)?;
        self.settle(id)?;
        self.focus_new(id);
        self.notify(before, true);
        Ok(id)
    }

    /// Insert a sibling right after `reference`, select it and start editing.
    /// The sibling of a root is a new root placed below it.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown reference.
    pub fn add_sibling(&mut self, reference: NodeId, text: &str) -> Result<NodeId, EditorError> {
        let parent = self.store.parent(reference)?;
        let before = self.observe();
        self.history.record(&self.store, "add-sibling");
        let id = match parent {
            None => {
                let r = self.store.node(reference)?;
                let (x, y) = (r.x, r.y);
                self.store.add_root(text, x, y)
            }
            Some(parent_id) => {
                let index = self.store.children(parent_id)?.iter().position(|c| *c == reference).map_or(0, |i| i + 1);
                self.store.insert_child(parent_id, index, text)?
            }
        };
        self.measure_node(id)?;
        self.layout.position_new_sibling(&mut self.store, id, reference)?;
        if let Some(parent_id) = parent {
            self.layout.relayout_from_node(&mut self.store, parent_id)?;
        }
        self.settle(id)?;
        self.focus_new(id);
        self.notify(before, true);
        Ok(id)
    }

    /// Delete `id` and its subtree. A deleted selection moves to the parent.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown id.
    pub fn delete_node(&mut self, id: NodeId) -> Result<(), EditorError> {
        let parent = self.store.parent(id)?;
        let before = self.observe();
        self.history.record(&self.store, "delete");
        let removed = self.store.delete_node(id)?;
        if let Some(parent_id) = parent {
            self.layout.relayout_after_delete(&mut self.store, parent_id)?;
            self.settle(parent_id)?;
        }
        if self.selection.is_some_and(|s| removed.contains(&s)) {
            self.selection = parent;
            self.editing = false;
        }
        self.easymotion = None;
        self.notify(before, true);
        Ok(())
    }

    // --- Node content ---

    /// Replace a node's text and re-measure it. Consecutive edits of the same
    /// node share one undo entry.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown id.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), EditorError> {
        if self.store.node(id)?.text == text {
            return Ok(());
        }
        let before = self.observe();
        self.history.record(&self.store, &text_label(id));
        self.store.set_text(id, text)?;
        self.refit(id)?;
        self.notify(before, true);
        Ok(())
    }

    /// Replace a node's style and re-measure it.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown id.
    pub fn set_style(&mut self, id: NodeId, style: Option<Style>) -> Result<(), EditorError> {
        self.store.node(id)?;
        let before = self.observe();
        self.history.record(&self.store, "style");
        self.store.set_style(id, style)?;
        self.refit(id)?;
        self.notify(before, true);
        Ok(())
    }

    /// Register an asset so nodes can reference it.
    pub fn register_asset(&mut self, asset: Asset) {
        let before = self.observe();
        self.history.record(&self.store, "asset");
        tracing::debug!(asset = %asset.id, filename = %asset.filename, "asset registered");
        self.store.register_asset(asset);
        self.notify(before, true);
    }

    /// Attach or detach a node image.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown node, `AssetNotFound` for an unregistered asset.
    pub fn set_image(&mut self, id: NodeId, image: Option<NodeImage>) -> Result<(), EditorError> {
        self.store.node(id)?;
        if let Some(img) = &image {
            self.store.asset(img.asset_id)?;
        }
        let before = self.observe();
        self.history.record(&self.store, "image");
        self.store.set_image(id, image)?;
        self.refit(id)?;
        self.notify(before, true);
        Ok(())
    }

    // --- Structure ---

    /// Collapse or expand `id`. Returns the new collapsed state. A selection
    /// hidden by the collapse moves to `id`.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown id.
    pub fn toggle_collapse(&mut self, id: NodeId) -> Result<bool, EditorError> {
        self.store.node(id)?;
        let before = self.observe();
        self.history.record(&self.store, "collapse");
        let collapsed = self.store.toggle_collapse(id)?;
        if collapsed {
            if let Some(sel) = self.selection {
                if self.store.is_descendant(sel, id)? {
                    self.selection = Some(id);
                    self.editing = false;
                }
            }
        }
        self.layout.relayout_from_node(&mut self.store, id)?;
        self.settle(id)?;
        self.easymotion = None;
        self.notify(before, true);
        Ok(collapsed)
    }

    /// Swap `id` with its previous or next sibling. Returns whether anything moved;
    /// roots and list ends are no-ops and record nothing.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown id.
    pub fn reorder_node(&mut self, id: NodeId, direction: Reorder) -> Result<bool, EditorError> {
        let Some(parent) = self.store.parent(id)? else {
            return Ok(false);
        };
        let siblings = self.store.children(parent)?;
        let idx = siblings.iter().position(|c| *c == id).unwrap_or(0);
        let possible = match direction {
            Reorder::Up => idx > 0,
            Reorder::Down => idx + 1 < siblings.len(),
        };
        if !possible {
            return Ok(false);
        }
        let before = self.observe();
        self.history.record(&self.store, "reorder");
        self.store.reorder_node(id, direction)?;
        self.layout.relayout_from_node(&mut self.store, parent)?;
        self.settle(parent)?;
        self.notify(before, true);
        Ok(true)
    }

    /// Reparent `id` under `new_parent` at `index` (appended when `None`).
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for unknown ids, `Cycle` when `new_parent` is `id` or
    /// one of its descendants. Nothing changes on error.
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId, index: Option<usize>) -> Result<(), EditorError> {
        let old_parent = self.store.parent(id)?;
        self.store.node(new_parent)?;
        if new_parent == id || self.store.is_descendant(new_parent, id)? {
            tracing::warn!(%id, %new_parent, "move rejected: would create a cycle");
            return Err(TreeError::Cycle { node: id, target: new_parent }.into());
        }
        let before = self.observe();
        self.history.record(&self.store, "move");
        let old_root = self.store.root_of(id)?;
        self.store.move_node(id, new_parent, index)?;
        self.attach_moved(id, old_parent, old_root)?;
        self.notify(before, true);
        Ok(())
    }

    /// Re-measure every node and lay out the whole forest from scratch.
    /// Used after loading a document edited outside the engine.
    ///
    /// # Errors
    ///
    /// Only on an inconsistent store.
    pub fn relayout_all(&mut self) -> Result<(), EditorError> {
        let before = self.observe();
        self.history.record(&self.store, "relayout");
        let mut ids = Vec::with_capacity(self.store.len());
        for root in self.store.root_ids().to_vec() {
            ids.extend(self.store.subtree(root)?);
        }
        for id in ids {
            self.measure_node(id)?;
        }
        self.layout.relayout_all(&mut self.store)?;
        tracing::info!(nodes = self.store.len(), "full relayout");
        self.notify(before, true);
        Ok(())
    }

    // --- Selection and modes ---

    /// Select `id` (or clear the selection). Leaves edit mode and EasyMotion.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown id.
    pub fn select(&mut self, id: Option<NodeId>) -> Result<(), EditorError> {
        if let Some(id) = id {
            self.store.node(id)?;
        }
        let before = self.observe();
        if self.selection != id {
            self.leave_edit();
        }
        self.selection = id;
        self.easymotion = None;
        self.notify(before, false);
        Ok(())
    }

    /// Start editing the selected node. Returns `false` without a selection.
    pub fn enter_edit(&mut self) -> bool {
        if self.selection.is_none() {
            return false;
        }
        let before = self.observe();
        self.easymotion = None;
        self.editing = true;
        self.notify(before, false);
        true
    }

    /// Stop editing. The next text edit starts a new undo entry.
    pub fn exit_edit(&mut self) {
        let before = self.observe();
        self.leave_edit();
        self.notify(before, false);
    }

    fn leave_edit(&mut self) {
        self.editing = false;
        self.history.break_squash();
    }

    fn focus_new(&mut self, id: NodeId) {
        self.selection = Some(id);
        self.easymotion = None;
        self.history.break_squash();
        self.editing = true;
    }

    /// Move the selection in `dir`. Without a selection, the visible node
    /// nearest the viewport center is selected. Returns the new selection.
    ///
    /// # Errors
    ///
    /// Only on an inconsistent store.
    pub fn navigate(&mut self, dir: Direction) -> Result<Option<NodeId>, EditorError> {
        let target = {
            let nav = Navigator::new(&self.store, &self.layout, self.config.nav_cross_weight);
            match self.selection {
                None => nav.nearest_to(self.viewport_center()).map(NavTarget::Select),
                Some(current) => nav.navigate(current, dir)?,
            }
        };
        let Some(target) = target else {
            return Ok(self.selection);
        };

        let before = self.observe();
        let mut changed = false;
        if let NavTarget::ExpandAndSelect { expand, .. } = target {
            self.history.record(&self.store, "expand");
            self.store.set_collapsed(expand, false)?;
            self.layout.relayout_from_node(&mut self.store, expand)?;
            self.settle(expand)?;
            changed = true;
        }
        let selected = target.selected();
        if self.selection != Some(selected) {
            self.leave_edit();
        }
        self.selection = Some(selected);
        self.easymotion = None;
        self.notify(before, changed);
        Ok(self.selection)
    }

    // --- View ---

    /// Viewport size in screen pixels.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        let before = self.observe();
        self.viewport = Size::new(width, height);
        self.notify(before, false);
    }

    /// Pan the camera by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let before = self.observe();
        self.camera.pan_by(dx, dy);
        self.notify(before, false);
    }

    /// Zoom by `factor` around the screen point `anchor`.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        let before = self.observe();
        self.camera.zoom_at(anchor, factor);
        self.notify(before, false);
    }

    // --- Drag gesture ---

    /// Start dragging `id` from the screen point `pointer`.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown id, `GestureInProgress` while another
    /// gesture is active.
    pub fn begin_drag(&mut self, id: NodeId, pointer: Point) -> Result<(), EditorError> {
        if !self.gesture.is_idle() {
            return Err(EditorError::GestureInProgress);
        }
        let node = self.store.node(id)?;
        let world = self.camera.screen_to_world(pointer);
        let start = Point::new(node.x, node.y);
        let offset = Point::new(world.x - node.x, world.y - node.y);

        let before = self.observe();
        self.leave_edit();
        self.selection = Some(id);
        self.easymotion = None;
        let snapshot = HistoryEntry::new(self.store.clone(), "drag");
        self.gesture = Gesture::Dragging(DragState::new(id, offset, start, snapshot));
        tracing::debug!(%id, "drag started");
        self.notify(before, false);
        Ok(())
    }

    /// Follow the pointer. Moves below the drag threshold are ignored.
    ///
    /// # Errors
    ///
    /// Only on an inconsistent store.
    pub fn update_drag(&mut self, pointer: Point) -> Result<(), EditorError> {
        let (id, offset) = match &self.gesture {
            Gesture::Dragging(d) => (d.id, d.offset),
            _ => return Ok(()),
        };
        let world = self.camera.screen_to_world(pointer);
        let node = self.store.node(id)?;
        let (dx, dy) = (world.x - offset.x - node.x, world.y - offset.y - node.y);
        if dx.hypot(dy) < self.config.drag_threshold {
            return Ok(());
        }

        let before = self.observe();
        self.layout.translate_subtree(&mut self.store, id, dx, dy)?;
        let mut reordered = false;
        if let Some(parent) = self.store.parent(id)? {
            reordered = self.swap_past_siblings(id, parent)?;
            let held = self.store.node(id)?;
            let (hx, hy) = (held.x, held.y);
            self.layout.center_children(&mut self.store, parent)?;
            let now = self.store.node(id)?;
            let (rx, ry) = (hx - now.x, hy - now.y);
            self.layout.translate_subtree(&mut self.store, id, rx, ry)?;
        }
        let target = self.find_reparent_target(id)?;
        let node = self.store.node(id)?;
        let pos = Point::new(node.x, node.y);
        if let Gesture::Dragging(d) = &mut self.gesture {
            d.moved = true;
            d.reordered |= reordered;
            d.reparent_target = target;
            d.last_pos = pos;
        }
        self.notify(before, true);
        Ok(())
    }

    /// Drop the dragged node. Reparents onto the current target if any,
    /// otherwise snaps reordered siblings back into their centered layout.
    /// A drag that changed nothing records no undo entry.
    ///
    /// # Errors
    ///
    /// Layout or store failures; the pre-drag state is restored in that case.
    pub fn end_drag(&mut self) -> Result<(), EditorError> {
        let Gesture::Dragging(drag) = std::mem::take(&mut self.gesture) else {
            return Ok(());
        };
        if !drag.changed() {
            tracing::debug!(id = %drag.id, "drag ended without change");
            return Ok(());
        }
        let before = self.observe();
        if let Err(e) = self.finish_drag(&drag) {
            tracing::warn!(id = %drag.id, error = %e, "drag rolled back");
            self.store = drag.snapshot.store;
            self.notify(before, true);
            return Err(e);
        }
        self.history.commit(drag.snapshot);
        self.notify(before, true);
        Ok(())
    }

    fn finish_drag(&mut self, drag: &DragState) -> Result<(), EditorError> {
        let id = drag.id;
        let old_parent = self.store.parent(id)?;
        let old_root = self.store.root_of(id)?;
        match (drag.reparent_target, old_parent) {
            (Some(target), _) => {
                self.store.move_node(id, target, None)?;
                tracing::debug!(%id, %target, "drag reparented");
                self.attach_moved(id, old_parent, old_root)?;
            }
            (None, Some(parent)) => {
                self.layout.reflow_subtree(&mut self.store, parent)?;
                self.layout.relayout_from_node(&mut self.store, id)?;
                self.settle(id)?;
            }
            (None, None) => self.settle(id)?,
        }
        Ok(())
    }

    /// Abort the drag and restore the state from before it began.
    pub fn cancel_drag(&mut self) {
        let Gesture::Dragging(drag) = std::mem::take(&mut self.gesture) else {
            return;
        };
        let before = self.observe();
        let changed = drag.changed();
        self.store = drag.snapshot.store;
        self.notify(before, changed);
    }

    /// Swap the dragged node past siblings whose center it has crossed.
    /// Children of a root only trade places with siblings on the same side.
    fn swap_past_siblings(&mut self, id: NodeId, parent: NodeId) -> Result<bool, EditorError> {
        let parent_node = self.store.node(parent)?;
        let side_of_root = if parent_node.parent_id.is_none() { Some(parent_node.x) } else { None };
        let mut swapped = false;
        for _ in 0..=self.store.children(parent)?.len() {
            let node = self.store.node(id)?;
            let cy = node.center().y;
            let my_left = side_of_root.map(|px| node.x < px);
            let siblings = self.store.children(parent)?.to_vec();
            let Some(idx) = siblings.iter().position(|s| *s == id) else {
                break;
            };
            let same_side = |sid: &NodeId| -> Result<bool, TreeError> {
                Ok(match (side_of_root, my_left) {
                    (Some(px), Some(left)) => (self.store.node(*sid)?.x < px) == left,
                    _ => true,
                })
            };

            let mut above = None;
            for (j, sid) in siblings.iter().enumerate().take(idx).rev() {
                if same_side(sid)? {
                    above = Some((j, *sid));
                    break;
                }
            }
            let mut below = None;
            for (j, sid) in siblings.iter().enumerate().skip(idx + 1) {
                if same_side(sid)? {
                    below = Some((j, *sid));
                    break;
                }
            }

            let step = above
                .filter(|(_, s)| self.center_y(*s).is_ok_and(|y| cy < y))
                .or_else(|| below.filter(|(_, s)| self.center_y(*s).is_ok_and(|y| cy > y)));
            let Some((j, sid)) = step else {
                break;
            };
            self.store.move_node(id, parent, Some(j))?;
            tracing::debug!(%id, past = %sid, "drag reordered");
            swapped = true;
        }
        Ok(swapped)
    }

    fn center_y(&self, id: NodeId) -> Result<f64, TreeError> {
        Ok(self.store.node(id)?.center().y)
    }

    /// First visible node, other than the dragged subtree and its current
    /// parent, whose box contains the dragged node's center.
    fn find_reparent_target(&self, id: NodeId) -> Result<Option<NodeId>, EditorError> {
        let node = self.store.node(id)?;
        let center = node.center();
        let parent = node.parent_id;
        let excluded: HashSet<NodeId> = self.store.subtree(id)?.into_iter().collect();
        for candidate in self.store.visible_nodes() {
            if excluded.contains(&candidate) || Some(candidate) == parent {
                continue;
            }
            if self.store.node(candidate)?.rect().contains(center) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    // --- Resize gesture ---

    /// Start resizing the width of `id`.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown id, `GestureInProgress` while another
    /// gesture is active.
    pub fn begin_resize(&mut self, id: NodeId) -> Result<(), EditorError> {
        if !self.gesture.is_idle() {
            return Err(EditorError::GestureInProgress);
        }
        let node = self.store.node(id)?;
        let state = ResizeState {
            id,
            orig_width: node.width,
            orig_height: node.height,
            orig_constrained: node.width_constrained,
            snapshot: HistoryEntry::new(self.store.clone(), "resize"),
            changed: false,
        };
        let before = self.observe();
        self.leave_edit();
        self.selection = Some(id);
        self.easymotion = None;
        self.gesture = Gesture::Resizing(state);
        self.notify(before, false);
        Ok(())
    }

    /// Set the width so the node's right edge follows the screen point `pointer`.
    /// The width never drops below the configured minimum; height is reflowed.
    ///
    /// # Errors
    ///
    /// Only on an inconsistent store.
    pub fn update_resize(&mut self, pointer: Point) -> Result<(), EditorError> {
        let Gesture::Resizing(state) = &self.gesture else {
            return Ok(());
        };
        let id = state.id;
        let world = self.camera.screen_to_world(pointer);
        let node = self.store.node(id)?;
        let width = (world.x - node.x).max(self.config.min_node_width);
        if (width - node.width).abs() < self.config.layout.epsilon {
            return Ok(());
        }
        let size = self.measurer.reflow(&node.text, width, node.style.as_ref());
        let height = self.with_image_height(id, size.height)?;

        let before = self.observe();
        self.store.set_node_width(id, width)?;
        self.store.set_node_size(id, width, height)?;
        self.layout.relayout_from_node(&mut self.store, id)?;
        if let Gesture::Resizing(state) = &mut self.gesture {
            state.changed = true;
        }
        self.notify(before, true);
        Ok(())
    }

    /// Finish the resize. A resize that changed nothing records no undo entry.
    ///
    /// # Errors
    ///
    /// Only on an inconsistent store.
    pub fn end_resize(&mut self) -> Result<(), EditorError> {
        let Gesture::Resizing(state) = std::mem::take(&mut self.gesture) else {
            return Ok(());
        };
        let before = self.observe();
        let node = self.store.node(state.id)?;
        let unchanged = (node.width - state.orig_width).abs() < self.config.layout.epsilon
            && (node.height - state.orig_height).abs() < self.config.layout.epsilon
            && node.width_constrained == state.orig_constrained;
        if !state.changed || unchanged {
            self.store = state.snapshot.store;
            self.notify(before, state.changed);
            return Ok(());
        }
        self.settle(state.id)?;
        self.history.commit(state.snapshot);
        self.notify(before, true);
        Ok(())
    }

    /// Abort the resize and restore the original size.
    pub fn cancel_resize(&mut self) {
        let Gesture::Resizing(state) = std::mem::take(&mut self.gesture) else {
            return;
        };
        let before = self.observe();
        self.store = state.snapshot.store;
        self.notify(before, state.changed);
    }

    // --- EasyMotion ---

    /// Label every visible node except the selection, nearest to the
    /// selection (or the viewport center) first. Returns the number of labels.
    ///
    /// # Errors
    ///
    /// Only on an inconsistent store.
    pub fn enter_easymotion(&mut self) -> Result<usize, EditorError> {
        let reference = match self.selection {
            Some(id) => self.store.node(id)?.center(),
            None => self.viewport_center(),
        };
        let mut candidates = Vec::new();
        for id in self.store.visible_nodes() {
            if Some(id) != self.selection {
                candidates.push((id, self.store.node(id)?.center()));
            }
        }
        let ordered = labels::sort_by_distance(&candidates, reference);
        let before = self.observe();
        self.leave_edit();
        let session = EasyMotion::new(&ordered);
        let count = session.labels().len();
        self.easymotion = Some(session);
        tracing::debug!(count, "easymotion entered");
        self.notify(before, false);
        Ok(count)
    }

    /// Feed one key to the EasyMotion session. Anything other than a
    /// lowercase ASCII letter exits with the selection unchanged.
    pub fn easymotion_key(&mut self, key: char) -> KeyOutcome<NodeId> {
        let before = self.observe();
        let outcome = match self.easymotion.as_mut() {
            None => return KeyOutcome::Exit,
            Some(_) if !key.is_ascii_lowercase() => KeyOutcome::Exit,
            Some(session) => session.handle_key(key),
        };
        match outcome {
            KeyOutcome::Buffered => {}
            KeyOutcome::Jump(id) => {
                self.easymotion = None;
                self.selection = Some(id);
            }
            KeyOutcome::Exit => self.easymotion = None,
        }
        self.notify(before, false);
        outcome
    }

    /// Leave EasyMotion without selecting anything.
    pub fn exit_easymotion(&mut self) {
        let before = self.observe();
        self.easymotion = None;
        self.notify(before, false);
    }

    // --- History ---

    /// Restore the state before the last recorded mutation. Returns `false`
    /// when there is nothing to undo or a gesture is active.
    pub fn undo(&mut self) -> bool {
        if !self.gesture.is_idle() {
            return false;
        }
        let Some(restored) = self.history.undo(&self.store) else {
            return false;
        };
        self.restore(restored);
        true
    }

    /// Re-apply the last undone mutation. Returns `false` when there is
    /// nothing to redo or a gesture is active.
    pub fn redo(&mut self) -> bool {
        if !self.gesture.is_idle() {
            return false;
        }
        let Some(restored) = self.history.redo(&self.store) else {
            return false;
        };
        self.restore(restored);
        true
    }

    fn restore(&mut self, store: Store) {
        let before = self.observe();
        self.store = store;
        if self.selection.is_some_and(|s| !self.store.contains(s)) {
            self.selection = None;
            self.editing = false;
        }
        self.easymotion = None;
        self.notify(before, true);
    }

    // --- Internal helpers ---

    /// Size `id` from its content: natural size, or reflowed height for a
    /// width-constrained node. Images add their height below the text.
    fn measure_node(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.store.node(id)?;
        let size = if node.width_constrained {
            self.measurer.reflow(&node.text, node.width, node.style.as_ref())
        } else {
            self.measurer.measure(&node.text, node.style.as_ref())
        };
        let width = match &node.image {
            Some(img) if !node.width_constrained => size.width.max(img.width),
            _ => size.width,
        };
        let height = self.with_image_height(id, size.height)?;
        self.store.set_node_size(id, width, height)
    }

    fn with_image_height(&self, id: NodeId, text_height: f64) -> Result<f64, TreeError> {
        Ok(match &self.store.node(id)?.image {
            Some(img) => text_height + img.height,
            None => text_height,
        })
    }

    /// Re-measure `id`, re-center around it and push neighbouring trees away.
    fn refit(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.measure_node(id)?;
        self.layout.relayout_from_node(&mut self.store, id)?;
        self.settle(id)
    }

    /// Resolve overlaps caused by a change in the tree containing `id`.
    fn settle(&mut self, id: NodeId) -> Result<(), TreeError> {
        let pushed = self.layout.resolve_tree_overlap(&mut self.store, id)?;
        if !pushed.is_empty() {
            tracing::debug!(%id, count = pushed.len(), "neighbouring trees pushed");
        }
        Ok(())
    }

    /// Lay out a node that was just reparented: place it as a new child,
    /// snap its branch back to the grid and re-center both the old and the
    /// new parent chains.
    fn attach_moved(&mut self, id: NodeId, old_parent: Option<NodeId>, old_root: NodeId) -> Result<(), TreeError> {
        self.layout.position_new_child(&mut self.store, id, None)?;
        self.layout.reflow_subtree(&mut self.store, id)?;
        self.layout.relayout_from_node(&mut self.store, id)?;
        if let Some(old) = old_parent {
            self.layout.relayout_after_delete(&mut self.store, old)?;
        }
        self.settle(id)?;
        if self.store.contains(old_root) && self.store.root_of(id)? != old_root {
            self.settle(old_root)?;
        }
        Ok(())
    }
}
