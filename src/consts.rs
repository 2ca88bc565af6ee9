//! Shared numeric defaults for the engine.

// ── Node geometry ───────────────────────────────────────────────

/// Width given to a freshly created node before the measurer runs.
pub const DEFAULT_NODE_WIDTH: f64 = 120.0;

/// Height given to a freshly created node before the measurer runs.
pub const DEFAULT_NODE_HEIGHT: f64 = 40.0;

/// Narrowest width a resize gesture may produce.
pub const MIN_NODE_WIDTH: f64 = 40.0;

// ── Layout ──────────────────────────────────────────────────────

/// Horizontal step between a parent and its children.
pub const H_OFFSET: f64 = 200.0;

/// Vertical gap between adjacent sibling bands.
pub const V_GAP: f64 = 20.0;

/// Clearance kept between two root trees after overlap resolution.
pub const TREE_PADDING: f64 = 40.0;

/// Position deltas below this are treated as no change.
pub const LAYOUT_EPSILON: f64 = 0.01;

// ── Interaction ─────────────────────────────────────────────────

/// Weight applied to cross-axis distance in spatial navigation.
pub const NAV_CROSS_WEIGHT: f64 = 10.0;

/// Pointer movement (world units) below which a drag update is ignored.
pub const DRAG_THRESHOLD: f64 = 0.5;

/// Maximum number of undo levels kept.
pub const HISTORY_LIMIT: usize = 200;

// ── Camera ──────────────────────────────────────────────────────

/// Smallest zoom factor the camera accepts.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest zoom factor the camera accepts.
pub const MAX_ZOOM: f64 = 8.0;
