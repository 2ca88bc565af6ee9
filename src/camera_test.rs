#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

// --- Point ---

#[test]
fn point_distance() {
    assert!(approx_eq(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0));
}

// --- Rect ---

#[test]
fn rect_from_box_and_center() {
    let r = Rect::from_box(10.0, 20.0, 100.0, 40.0);
    assert_eq!(r.max_x, 110.0);
    assert_eq!(r.max_y, 60.0);
    assert!(point_approx_eq(r.center(), Point::new(60.0, 40.0)));
}

#[test]
fn rect_union_covers_both() {
    let a = Rect::from_box(0.0, 0.0, 10.0, 10.0);
    let b = Rect::from_box(-5.0, 20.0, 10.0, 10.0);
    let u = a.union(b);
    assert_eq!(u, Rect { min_x: -5.0, min_y: 0.0, max_x: 10.0, max_y: 30.0 });
}

#[test]
fn rect_contains_border() {
    let r = Rect::from_box(0.0, 0.0, 10.0, 10.0);
    assert!(r.contains(Point::new(10.0, 10.0)));
    assert!(r.contains(Point::new(5.0, 5.0)));
    assert!(!r.contains(Point::new(10.1, 5.0)));
}

#[test]
fn rect_touching_edges_do_not_overlap() {
    let a = Rect::from_box(0.0, 0.0, 10.0, 10.0);
    let b = Rect::from_box(10.0, 10.0, 10.0, 10.0);
    assert!(!a.overlaps_x(&b));
    assert!(!a.overlaps_y(&b));
    let c = Rect::from_box(9.0, 9.0, 10.0, 10.0);
    assert!(a.overlaps_x(&c));
    assert!(a.overlaps_y(&c));
}

// --- Camera ---

#[test]
fn camera_default_is_identity() {
    let cam = Camera::default();
    assert_eq!(cam.x, 0.0);
    assert_eq!(cam.y, 0.0);
    assert_eq!(cam.zoom, 1.0);
    assert!(point_approx_eq(cam.screen_to_world(Point::new(50.0, 75.0)), Point::new(50.0, 75.0)));
}

#[test]
fn screen_to_world_with_pan_and_zoom() {
    let cam = Camera { x: 100.0, y: 50.0, zoom: 2.0 };
    let world = cam.screen_to_world(Point::new(300.0, 250.0));
    assert!(point_approx_eq(world, Point::new(100.0, 100.0)));
}

#[test]
fn world_to_screen_inverts_screen_to_world() {
    let cam = Camera { x: -30.0, y: 12.5, zoom: 0.75 };
    let screen = Point::new(123.0, -45.0);
    let back = cam.world_to_screen(cam.screen_to_world(screen));
    assert!(point_approx_eq(back, screen));
}

#[test]
fn screen_dist_scales_with_zoom() {
    let cam = Camera { x: 0.0, y: 0.0, zoom: 4.0 };
    assert!(approx_eq(cam.screen_dist_to_world(8.0), 2.0));
}

#[test]
fn pan_by_accumulates() {
    let mut cam = Camera::default();
    cam.pan_by(10.0, -5.0);
    cam.pan_by(2.0, 1.0);
    assert_eq!(cam.x, 12.0);
    assert_eq!(cam.y, -4.0);
}

#[test]
fn zoom_at_keeps_anchor_fixed() {
    let mut cam = Camera { x: 40.0, y: 20.0, zoom: 1.0 };
    let anchor = Point::new(200.0, 100.0);
    let before = cam.screen_to_world(anchor);
    cam.zoom_at(anchor, 2.0);
    assert!(approx_eq(cam.zoom, 2.0));
    assert!(point_approx_eq(cam.screen_to_world(anchor), before));
}

#[test]
fn zoom_at_clamps() {
    let mut cam = Camera::default();
    cam.zoom_at(Point::new(0.0, 0.0), 1000.0);
    assert_eq!(cam.zoom, crate::consts::MAX_ZOOM);
    cam.zoom_at(Point::new(0.0, 0.0), 1e-6);
    assert_eq!(cam.zoom, crate::consts::MIN_ZOOM);
}

#[test]
fn zoom_at_ignores_degenerate_factors() {
    let start = Camera { x: 5.0, y: -7.0, zoom: 1.5 };
    for factor in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -2.0] {
        let mut cam = start;
        cam.zoom_at(Point::new(30.0, 40.0), factor);
        assert_eq!(cam, start, "factor {factor}");
    }
}

#[test]
fn camera_serializes_as_xy_zoom() {
    let cam = Camera { x: 1.0, y: 2.0, zoom: 1.5 };
    let json = serde_json::to_value(cam).unwrap();
    assert_eq!(json, serde_json::json!({"x": 1.0, "y": 2.0, "zoom": 1.5}));
}
