use std::collections::HashSet;

use super::*;

fn ids(n: usize) -> Vec<usize> {
    (0..n).collect()
}

fn label_of(labels: &[(String, usize)], id: usize) -> &str {
    labels.iter().find(|(_, t)| *t == id).map(|(l, _)| l.as_str()).unwrap()
}

// =============================================================
// generate_labels
// =============================================================

#[test]
fn labels_are_unique_and_cover_every_candidate() {
    for n in [0, 3, 26, 27, 51, 52, 100] {
        let labels = generate_labels(&ids(n));
        assert_eq!(labels.len(), n, "n={n}");
        let unique: HashSet<&str> = labels.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(unique.len(), n, "n={n}");
        let targets: HashSet<usize> = labels.iter().map(|(_, t)| *t).collect();
        assert_eq!(targets.len(), n, "n={n}");
    }
}

#[test]
fn up_to_26_candidates_get_single_letters_in_order() {
    for n in [0, 3, 26] {
        let labels = generate_labels(&ids(n));
        assert!(labels.iter().all(|(l, _)| l.len() == 1));
    }
    let labels = generate_labels(&ids(3));
    assert_eq!(label_of(&labels, 0), "a");
    assert_eq!(label_of(&labels, 1), "b");
    assert_eq!(label_of(&labels, 2), "c");
    assert_eq!(label_of(&generate_labels(&ids(26)), 25), "z");
}

#[test]
fn twenty_seven_candidates_reserve_a() {
    let labels = generate_labels(&ids(27));
    for id in 0..25 {
        let expected = char::from(b'b' + u8::try_from(id).unwrap()).to_string();
        assert_eq!(label_of(&labels, id), expected);
    }
    assert_eq!(label_of(&labels, 25), "aa");
    assert_eq!(label_of(&labels, 26), "ab");
}

#[test]
fn prefix_count_grows_with_candidates() {
    assert_eq!(reserved_prefixes(26), 0);
    assert_eq!(reserved_prefixes(27), 1);
    assert_eq!(reserved_prefixes(51), 1);
    assert_eq!(reserved_prefixes(52), 2);
    assert_eq!(reserved_prefixes(100), 3);
    assert_eq!(reserved_prefixes(10_000), 26);
}

#[test]
fn two_letter_labels_fill_a_before_b() {
    let labels = generate_labels(&ids(52));
    // 2 prefixes: singles are c..z for ids 0..24
    assert_eq!(label_of(&labels, 0), "c");
    assert_eq!(label_of(&labels, 23), "z");
    assert_eq!(label_of(&labels, 24), "aa");
    assert_eq!(label_of(&labels, 49), "az");
    assert_eq!(label_of(&labels, 50), "ba");
    assert_eq!(label_of(&labels, 51), "bb");
}

#[test]
fn single_letters_never_collide_with_prefixes() {
    let labels = generate_labels(&ids(100));
    let prefixes: HashSet<char> =
        labels.iter().filter(|(l, _)| l.len() == 2).filter_map(|(l, _)| l.chars().next()).collect();
    for (l, _) in labels.iter().filter(|(l, _)| l.len() == 1) {
        let c = l.chars().next().unwrap();
        assert!(!prefixes.contains(&c), "{c} is both a label and a prefix");
    }
}

#[test]
fn candidates_beyond_capacity_are_unlabelled() {
    let labels = generate_labels(&ids(700));
    assert_eq!(labels.len(), 676);
    assert!(labels.iter().all(|(l, _)| l.len() == 2));
}

// =============================================================
// sort_by_distance
// =============================================================

#[test]
fn sort_by_distance_is_nearest_first_and_stable() {
    let cands = [
        (1, Point::new(10.0, 0.0)),
        (2, Point::new(1.0, 0.0)),
        (3, Point::new(0.0, 10.0)),
        (4, Point::new(0.0, 5.0)),
    ];
    assert_eq!(sort_by_distance(&cands, Point::new(0.0, 0.0)), vec![2, 4, 1, 3]);
}

// =============================================================
// Key handling
// =============================================================

#[test]
fn single_letter_jumps_immediately() {
    let mut em = EasyMotion::new(&ids(3));
    assert_eq!(em.handle_key('b'), KeyOutcome::Jump(1));
}

#[test]
fn unknown_first_key_exits() {
    let mut em = EasyMotion::new(&ids(3));
    assert_eq!(em.handle_key('q'), KeyOutcome::Exit);
    assert_eq!(em.buffer(), None);
}

#[test]
fn prefix_buffers_then_second_letter_jumps() {
    let mut em = EasyMotion::new(&ids(27));
    assert_eq!(em.label_for(26), Some("ab"));
    assert_eq!(em.handle_key('a'), KeyOutcome::Buffered);
    assert_eq!(em.buffer(), Some('a'));
    assert_eq!(em.handle_key('b'), KeyOutcome::Jump(26));
}

#[test]
fn prefix_then_unknown_second_letter_exits() {
    let mut em = EasyMotion::new(&ids(27));
    assert_eq!(em.handle_key('a'), KeyOutcome::Buffered);
    assert_eq!(em.handle_key('z'), KeyOutcome::Exit);
}
