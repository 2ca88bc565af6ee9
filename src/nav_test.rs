use super::*;

fn nav<'a>(store: &'a Store, layout: &'a Layout) -> Navigator<'a> {
    Navigator::new(store, layout, 10.0)
}

fn place(store: &mut Store, parent: NodeId, text: &str, x: f64, y: f64) -> NodeId {
    let id = store.add_child(parent, text).unwrap();
    store.set_node_position(id, x, y).unwrap();
    id
}

struct Scenario {
    store: Store,
    root: NodeId,
    store_node: NodeId,
    layout_node: NodeId,
    svg: NodeId,
    test: NodeId,
}

/// Persistence (y=2) -> [Store (-200), Layout (0) -> [test (-10)], SVG (200)]
fn scenario() -> Scenario {
    let mut store = Store::new();
    let root = store.add_root("Persistence", 0.0, 2.0);
    let store_node = place(&mut store, root, "Store", 200.0, -200.0);
    let layout_node = place(&mut store, root, "Layout", 200.0, 0.0);
    let svg = place(&mut store, root, "SVG", 200.0, 200.0);
    let test = place(&mut store, layout_node, "test", 400.0, -10.0);
    Scenario { store, root, store_node, layout_node, svg, test }
}

fn selected(result: Option<NavTarget>) -> Option<NodeId> {
    result.map(NavTarget::selected)
}

// =============================================================
// Vertical
// =============================================================

#[test]
fn down_prefers_sibling_over_closer_parent() {
    let s = scenario();
    let layout = Layout::default();
    let got = nav(&s.store, &layout).navigate(s.layout_node, Direction::Down).unwrap();
    assert_eq!(got, Some(NavTarget::Select(s.svg)));
}

#[test]
fn up_prefers_sibling_over_closer_child() {
    let s = scenario();
    let layout = Layout::default();
    let got = nav(&s.store, &layout).navigate(s.layout_node, Direction::Up).unwrap();
    assert_eq!(got, Some(NavTarget::Select(s.store_node)));
}

#[test]
fn sibling_search_stays_on_same_side_of_root() {
    let mut s = scenario();
    let left = place(&mut s.store, s.root, "left", -200.0, 100.0);
    let layout = Layout::default();
    // from SVG going up must not jump to the left-side child even though it is nearer in y
    let got = nav(&s.store, &layout).navigate(s.svg, Direction::Up).unwrap();
    assert_eq!(got, Some(NavTarget::Select(s.layout_node)));
    // the lone left child has no same-side sibling: falls back to spatial search
    let up = nav(&s.store, &layout).navigate(left, Direction::Up).unwrap();
    assert!(up.is_some());
}

#[test]
fn vertical_from_last_sibling_falls_back_to_spatial() {
    let s = scenario();
    let layout = Layout::default();
    let got = nav(&s.store, &layout).navigate(s.svg, Direction::Down).unwrap();
    assert_eq!(got, None);
    let up_from_test = nav(&s.store, &layout).navigate(s.test, Direction::Up).unwrap();
    assert_eq!(selected(up_from_test), Some(s.store_node));
}

#[test]
fn spatial_score_prefers_axis_aligned_nodes() {
    let mut store = Store::new();
    let origin = store.add_root("origin", 0.0, 0.0);
    let aligned = store.add_root("aligned", 0.0, 100.0);
    let _near_but_off_axis = store.add_root("off", 30.0, 50.0);
    let layout = Layout::default();
    let got = nav(&store, &layout).navigate(origin, Direction::Down).unwrap();
    assert_eq!(got, Some(NavTarget::Select(aligned)));
}

#[test]
fn spatial_candidates_must_be_strictly_ahead() {
    let mut store = Store::new();
    let origin = store.add_root("origin", 0.0, 0.0);
    store.add_root("level", 300.0, 0.0);
    let layout = Layout::default();
    assert_eq!(nav(&store, &layout).navigate(origin, Direction::Down).unwrap(), None);
    assert_eq!(nav(&store, &layout).navigate(origin, Direction::Up).unwrap(), None);
}

// =============================================================
// Horizontal
// =============================================================

#[test]
fn root_right_selects_nearest_child_in_y() {
    let s = scenario();
    let layout = Layout::default();
    let got = nav(&s.store, &layout).navigate(s.root, Direction::Right).unwrap();
    assert_eq!(got, Some(NavTarget::Select(s.layout_node)));
}

#[test]
fn root_left_without_left_children_uses_spatial() {
    let mut s = scenario();
    let layout = Layout::default();
    assert_eq!(nav(&s.store, &layout).navigate(s.root, Direction::Left).unwrap(), None);

    let other = s.store.add_root("other", -500.0, 0.0);
    let got = nav(&s.store, &layout).navigate(s.root, Direction::Left).unwrap();
    assert_eq!(got, Some(NavTarget::Select(other)));
}

#[test]
fn collapsed_root_expands_before_descending() {
    let mut s = scenario();
    s.store.toggle_collapse(s.root).unwrap();
    let layout = Layout::default();
    let got = nav(&s.store, &layout).navigate(s.root, Direction::Right).unwrap();
    assert_eq!(got, Some(NavTarget::ExpandAndSelect { expand: s.root, select: s.layout_node }));
}

#[test]
fn right_branch_left_goes_to_parent_right_to_child() {
    let s = scenario();
    let layout = Layout::default();
    let n = nav(&s.store, &layout);
    assert_eq!(n.navigate(s.layout_node, Direction::Left).unwrap(), Some(NavTarget::Select(s.root)));
    assert_eq!(n.navigate(s.layout_node, Direction::Right).unwrap(), Some(NavTarget::Select(s.test)));
}

#[test]
fn left_branch_is_mirrored() {
    let mut store = Store::new();
    let root = store.add_root("root", 0.0, 0.0);
    let left = place(&mut store, root, "left", -200.0, 0.0);
    let leaf = place(&mut store, left, "leaf", -400.0, 0.0);
    let layout = Layout::default();
    let n = nav(&store, &layout);
    assert_eq!(n.navigate(left, Direction::Right).unwrap(), Some(NavTarget::Select(root)));
    assert_eq!(n.navigate(left, Direction::Left).unwrap(), Some(NavTarget::Select(leaf)));
    assert_eq!(n.navigate(root, Direction::Left).unwrap(), Some(NavTarget::Select(left)));
}

#[test]
fn collapsed_branch_expands_before_descending() {
    let mut s = scenario();
    s.store.toggle_collapse(s.layout_node).unwrap();
    let layout = Layout::default();
    let got = nav(&s.store, &layout).navigate(s.layout_node, Direction::Right).unwrap();
    assert_eq!(got, Some(NavTarget::ExpandAndSelect { expand: s.layout_node, select: s.test }));
}

#[test]
fn leaf_forward_falls_back_to_spatial() {
    let mut s = scenario();
    let layout = Layout::default();
    assert_eq!(nav(&s.store, &layout).navigate(s.test, Direction::Right).unwrap(), None);
    let far = s.store.add_root("far", 900.0, -10.0);
    let got = nav(&s.store, &layout).navigate(s.test, Direction::Right).unwrap();
    assert_eq!(got, Some(NavTarget::Select(far)));
}

// =============================================================
// No selection / errors
// =============================================================

#[test]
fn nearest_to_point_picks_closest_center() {
    let s = scenario();
    let layout = Layout::default();
    let n = nav(&s.store, &layout);
    assert_eq!(n.nearest_to(Point::new(260.0, 220.0)), Some(s.svg));
    assert_eq!(n.nearest_to(Point::new(0.0, 0.0)), Some(s.root));
}

#[test]
fn nearest_to_point_skips_hidden_nodes() {
    let mut s = scenario();
    s.store.toggle_collapse(s.layout_node).unwrap();
    let layout = Layout::default();
    assert_eq!(nav(&s.store, &layout).nearest_to(Point::new(460.0, 10.0)), Some(s.layout_node));
}

#[test]
fn nearest_to_point_on_empty_store() {
    let store = Store::new();
    let layout = Layout::default();
    assert_eq!(nav(&store, &layout).nearest_to(Point::new(0.0, 0.0)), None);
}

#[test]
fn navigate_unknown_node_errors() {
    let store = Store::new();
    let layout = Layout::default();
    let ghost = uuid::Uuid::new_v4();
    assert_eq!(
        nav(&store, &layout).navigate(ghost, Direction::Up),
        Err(TreeError::NodeNotFound(ghost))
    );
}
