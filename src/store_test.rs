#![allow(clippy::float_cmp)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::*;

fn sample_asset() -> Asset {
    Asset {
        id: Uuid::new_v4(),
        filename: "diagram.png".into(),
        mime_type: "image/png".into(),
        width: 640.0,
        height: 480.0,
    }
}

/// root -> [a -> [a1, a2], b]
fn small_tree() -> (Store, NodeId, NodeId, NodeId, NodeId, NodeId) {
    let mut store = Store::new();
    let root = store.add_root("root", 0.0, 0.0);
    let a = store.add_child(root, "a").unwrap();
    let a1 = store.add_child(a, "a1").unwrap();
    let a2 = store.add_child(a, "a2").unwrap();
    let b = store.add_child(root, "b").unwrap();
    (store, root, a, a1, a2, b)
}

// =============================================================
// Creation
// =============================================================

#[test]
fn new_store_is_empty() {
    let store = Store::new();
    assert!(store.is_empty());
    assert!(store.root_ids().is_empty());
    assert!(store.visible_nodes().is_empty());
}

#[test]
fn add_root_uses_default_geometry() {
    let mut store = Store::new();
    let id = store.add_root("Topic", 10.0, 20.0);
    let node = store.node(id).unwrap();
    assert_eq!(node.text, "Topic");
    assert_eq!(node.x, 10.0);
    assert_eq!(node.y, 20.0);
    assert_eq!(node.width, crate::consts::DEFAULT_NODE_WIDTH);
    assert_eq!(node.height, crate::consts::DEFAULT_NODE_HEIGHT);
    assert!(!node.collapsed);
    assert!(!node.width_constrained);
    assert_eq!(node.parent_id, None);
    assert_eq!(store.root_ids(), &[id]);
}

#[test]
fn add_child_links_both_directions() {
    let (store, root, a, _, _, b) = small_tree();
    assert_eq!(store.children(root).unwrap(), &[a, b]);
    assert_eq!(store.parent(a).unwrap(), Some(root));
    assert_eq!(store.parent(root).unwrap(), None);
    store.check_invariants().unwrap();
}

#[test]
fn add_child_unknown_parent_fails() {
    let mut store = Store::new();
    let ghost = Uuid::new_v4();
    assert_eq!(store.add_child(ghost, "x"), Err(TreeError::NodeNotFound(ghost)));
    assert!(store.is_empty());
}

#[test]
fn insert_child_clamps_index() {
    let (mut store, root, a, _, _, b) = small_tree();
    let first = store.insert_child(root, 0, "first").unwrap();
    let last = store.insert_child(root, 99, "last").unwrap();
    assert_eq!(store.children(root).unwrap(), &[first, a, b, last]);
}

// =============================================================
// Deletion
// =============================================================

#[test]
fn delete_removes_whole_subtree() {
    let (mut store, root, a, a1, a2, b) = small_tree();
    let removed = store.delete_node(a).unwrap();
    assert_eq!(removed, vec![a, a1, a2]);
    assert_eq!(store.children(root).unwrap(), &[b]);
    assert!(!store.contains(a1));
    assert_eq!(store.len(), 2);
    store.check_invariants().unwrap();
}

#[test]
fn delete_root_unlinks_from_roots() {
    let (mut store, root, ..) = small_tree();
    let other = store.add_root("other", 500.0, 0.0);
    store.delete_node(root).unwrap();
    assert_eq!(store.root_ids(), &[other]);
    assert_eq!(store.len(), 1);
}

#[test]
fn delete_unknown_fails_without_change() {
    let (mut store, ..) = small_tree();
    let before = store.clone();
    let ghost = Uuid::new_v4();
    assert_eq!(store.delete_node(ghost), Err(TreeError::NodeNotFound(ghost)));
    assert_eq!(store, before);
}

// =============================================================
// Field updates
// =============================================================

#[test]
fn set_node_width_marks_constrained() {
    let (mut store, root, ..) = small_tree();
    store.set_node_width(root, 300.0).unwrap();
    let node = store.node(root).unwrap();
    assert_eq!(node.width, 300.0);
    assert!(node.width_constrained);
}

#[test]
fn set_node_size_keeps_constraint_flag() {
    let (mut store, root, ..) = small_tree();
    store.set_node_size(root, 80.0, 30.0).unwrap();
    let node = store.node(root).unwrap();
    assert_eq!((node.width, node.height), (80.0, 30.0));
    assert!(!node.width_constrained);
}

#[test]
fn toggle_collapse_flips() {
    let (mut store, _, a, ..) = small_tree();
    assert!(store.toggle_collapse(a).unwrap());
    assert!(!store.toggle_collapse(a).unwrap());
}

#[test]
fn set_text_and_position() {
    let (mut store, _, a, ..) = small_tree();
    store.set_text(a, "renamed").unwrap();
    store.set_node_position(a, 5.0, 6.0).unwrap();
    let node = store.node(a).unwrap();
    assert_eq!(node.text, "renamed");
    assert_eq!((node.x, node.y), (5.0, 6.0));
}

#[test]
fn set_style_replaces_bag() {
    let (mut store, _, a, ..) = small_tree();
    let style = json!({"color": "#ff0000"}).as_object().cloned();
    store.set_style(a, style.clone()).unwrap();
    assert_eq!(store.node(a).unwrap().style, style);
    store.set_style(a, None).unwrap();
    assert_eq!(store.node(a).unwrap().style, None);
}

#[test]
fn set_image_requires_registered_asset() {
    let (mut store, _, a, ..) = small_tree();
    let asset = sample_asset();
    let image = NodeImage { asset_id: asset.id, width: 64.0, height: 48.0 };
    assert_eq!(store.set_image(a, Some(image.clone())), Err(TreeError::AssetNotFound(asset.id)));
    assert_eq!(store.node(a).unwrap().image, None);

    store.register_asset(asset);
    store.set_image(a, Some(image.clone())).unwrap();
    assert_eq!(store.node(a).unwrap().image, Some(image));
}

#[test]
fn register_asset_is_idempotent_by_id() {
    let mut store = Store::new();
    let mut asset = sample_asset();
    store.register_asset(asset.clone());
    asset.filename = "renamed.png".into();
    store.register_asset(asset.clone());
    assert_eq!(store.assets().len(), 1);
    assert_eq!(store.asset(asset.id).unwrap().filename, "renamed.png");
}

// =============================================================
// move_node / reorder_node
// =============================================================

#[test]
fn move_node_reparents() {
    let (mut store, root, a, a1, a2, b) = small_tree();
    store.move_node(a1, b, None).unwrap();
    assert_eq!(store.children(a).unwrap(), &[a2]);
    assert_eq!(store.children(b).unwrap(), &[a1]);
    assert_eq!(store.parent(a1).unwrap(), Some(b));
    assert_eq!(store.ancestors(a1).unwrap(), vec![b, root]);
    store.check_invariants().unwrap();
}

#[test]
fn move_node_at_index() {
    let (mut store, root, a, _, _, b) = small_tree();
    let c = store.add_root("c", 0.0, 300.0);
    store.move_node(c, root, Some(1)).unwrap();
    assert_eq!(store.children(root).unwrap(), &[a, c, b]);
    assert_eq!(store.root_ids(), &[root]);
    store.check_invariants().unwrap();
}

#[test]
fn move_node_into_self_is_cycle() {
    let (mut store, _, a, ..) = small_tree();
    let before = store.clone();
    assert_eq!(store.move_node(a, a, None), Err(TreeError::Cycle { node: a, target: a }));
    assert_eq!(store, before);
}

#[test]
fn move_node_into_descendant_is_cycle() {
    let (mut store, root, _, a1, ..) = small_tree();
    let before = store.clone();
    let err = store.move_node(root, a1, None).unwrap_err();
    assert_eq!(err, TreeError::Cycle { node: root, target: a1 });
    assert_eq!(err.error_code(), "E_CYCLE");
    assert_eq!(store, before);
}

#[test]
fn move_node_unknown_target_fails() {
    let (mut store, _, a, ..) = small_tree();
    let ghost = Uuid::new_v4();
    assert_eq!(store.move_node(a, ghost, None), Err(TreeError::NodeNotFound(ghost)));
}

#[test]
fn reorder_swaps_adjacent_siblings() {
    let (mut store, root, a, _, _, b) = small_tree();
    assert!(store.reorder_node(b, Reorder::Up).unwrap());
    assert_eq!(store.children(root).unwrap(), &[b, a]);
    assert!(store.reorder_node(b, Reorder::Down).unwrap());
    assert_eq!(store.children(root).unwrap(), &[a, b]);
}

#[test]
fn reorder_at_ends_is_noop() {
    let (mut store, root, a, _, _, b) = small_tree();
    assert!(!store.reorder_node(a, Reorder::Up).unwrap());
    assert!(!store.reorder_node(b, Reorder::Down).unwrap());
    assert_eq!(store.children(root).unwrap(), &[a, b]);
}

#[test]
fn reorder_root_is_noop() {
    let (mut store, root, ..) = small_tree();
    let other = store.add_root("other", 0.0, 0.0);
    assert!(!store.reorder_node(other, Reorder::Up).unwrap());
    assert_eq!(store.root_ids(), &[root, other]);
}

// =============================================================
// Traversal
// =============================================================

#[test]
fn siblings_of_root_are_roots() {
    let (mut store, root, a, _, _, b) = small_tree();
    let other = store.add_root("other", 0.0, 0.0);
    assert_eq!(store.siblings(root).unwrap(), &[root, other]);
    assert_eq!(store.siblings(a).unwrap(), &[a, b]);
}

#[test]
fn is_descendant_is_strict() {
    let (store, root, a, a1, _, b) = small_tree();
    assert!(store.is_descendant(a1, root).unwrap());
    assert!(store.is_descendant(a1, a).unwrap());
    assert!(!store.is_descendant(a, a).unwrap());
    assert!(!store.is_descendant(a1, b).unwrap());
    assert!(!store.is_descendant(root, a1).unwrap());
}

#[test]
fn root_of_climbs_to_top() {
    let (store, root, _, a1, ..) = small_tree();
    assert_eq!(store.root_of(a1).unwrap(), root);
    assert_eq!(store.root_of(root).unwrap(), root);
}

#[test]
fn visible_nodes_is_preorder_and_respects_collapse() {
    let (mut store, root, a, a1, a2, b) = small_tree();
    let other = store.add_root("other", 0.0, 0.0);
    assert_eq!(store.visible_nodes(), vec![root, a, a1, a2, b, other]);
    store.toggle_collapse(a).unwrap();
    assert_eq!(store.visible_nodes(), vec![root, a, b, other]);
    assert_eq!(store.subtree(root).unwrap(), vec![root, a, a1, a2, b]);
    assert_eq!(store.visible_subtree(root).unwrap(), vec![root, a, b]);
}

#[test]
fn lookups_on_unknown_ids_fail() {
    let (store, ..) = small_tree();
    let ghost = Uuid::new_v4();
    assert_eq!(store.children(ghost), Err(TreeError::NodeNotFound(ghost)));
    assert_eq!(store.parent(ghost), Err(TreeError::NodeNotFound(ghost)));
    assert_eq!(store.siblings(ghost), Err(TreeError::NodeNotFound(ghost)));
    assert_eq!(store.ancestors(ghost), Err(TreeError::NodeNotFound(ghost)));
    assert_eq!(store.is_descendant(ghost, ghost), Err(TreeError::NodeNotFound(ghost)));
    assert_eq!(store.node(ghost).unwrap_err().error_code(), "E_NODE_NOT_FOUND");
}

#[test]
fn check_invariants_detects_dangling_parent() {
    let (store, root, a, ..) = small_tree();
    let mut nodes: HashMap<NodeId, Node> = store.nodes().map(|n| (n.id, n.clone())).collect();
    if let Some(node) = nodes.get_mut(&a) {
        node.parent_id = None;
    }
    let broken = Store::from_parts(nodes, vec![root], Vec::new());
    assert!(matches!(broken.check_invariants(), Err(TreeError::Corrupt(_))));
}

// =============================================================
// Randomised add/delete sequences
// =============================================================

#[test]
fn random_add_delete_sequences_keep_invariants() {
    for seed in 0..20_u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut store = Store::new();
        for step in 0..200 {
            let ids: Vec<NodeId> = store.subtree_ids_for_test();
            if ids.is_empty() || rng.random_bool(0.1) {
                store.add_root(format!("r{step}"), 0.0, 0.0);
            } else if rng.random_bool(0.7) {
                let parent = ids[rng.random_range(0..ids.len())];
                store.add_child(parent, format!("n{step}")).unwrap();
            } else {
                let victim = ids[rng.random_range(0..ids.len())];
                let expected = store.subtree(victim).unwrap().len();
                let removed = store.delete_node(victim).unwrap();
                assert_eq!(removed.len(), expected);
            }
            store.check_invariants().unwrap();
        }
    }
}

impl Store {
    fn subtree_ids_for_test(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        for root in self.root_ids() {
            ids.extend(self.subtree(*root).unwrap());
        }
        ids
    }
}
