#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::geom::Rect;

const REGION: Rect = Rect { x: 0.0, y: 0.0, width: 1000.0, height: 1000.0 };

fn index() -> SpatialIndex {
    SpatialIndex::new(REGION, 10.0)
}

fn small(x: f64, y: f64) -> Rect {
    Rect::new(x, y, 10.0, 10.0)
}

// =============================================================
// Basics
// =============================================================

#[test]
fn new_index_is_empty_single_node() {
    let index = index();
    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
    assert_eq!(index.node_count(), 1);
    assert_eq!(index.region(), REGION);
}

#[test]
fn insert_and_contains() {
    let mut index = index();
    let id = Uuid::new_v4();
    index.insert(id, small(100.0, 100.0));
    assert!(index.contains(&id));
    assert_eq!(index.len(), 1);
}

#[test]
fn remove_drops_entry() {
    let mut index = index();
    let id = Uuid::new_v4();
    index.insert(id, small(100.0, 100.0));
    assert!(index.remove(&id));
    assert!(!index.contains(&id));
    assert!(index.is_empty());
}

#[test]
fn remove_missing_returns_false() {
    let mut index = index();
    assert!(!index.remove(&Uuid::new_v4()));
}

#[test]
fn proximity_bounds_expand_by_half_threshold() {
    let index = index();
    let prox = index.proximity_bounds(small(100.0, 100.0));
    assert_eq!(prox, Rect::new(95.0, 95.0, 20.0, 20.0));
}

#[test]
fn stored_bounds_match_proximity_expansion() {
    let mut index = index();
    let id = Uuid::new_v4();
    index.insert(id, small(100.0, 100.0));
    assert_eq!(index.stored_bounds(&id), Some(Rect::new(95.0, 95.0, 20.0, 20.0)));
}

#[test]
fn insert_outside_region_stays_at_root() {
    let mut index = index();
    let id = Uuid::new_v4();
    index.insert(id, small(-500.0, -500.0));
    assert!(index.contains(&id));
    let other = Uuid::new_v4();
    index.insert(other, small(100.0, 100.0));
    assert!(index.retrieve(&other).contains(&id));
}

// =============================================================
// Split threshold
// =============================================================

#[test]
fn ten_entries_do_not_split() {
    let mut index = index();
    for i in 0..10 {
        index.insert(Uuid::new_v4(), small(50.0 + f64::from(i) * 30.0, 50.0));
    }
    assert_eq!(index.node_count(), 1);
}

#[test]
fn eleventh_entry_splits_root_exactly_once() {
    let mut index = index();
    for i in 0..11 {
        index.insert(Uuid::new_v4(), small(50.0 + f64::from(i) * 30.0, 50.0));
    }
    // Root plus four quadrants; no recursive splitting.
    assert_eq!(index.node_count(), 5);
    assert_eq!(index.len(), 11);
}

#[test]
fn split_redistributes_into_quadrants() {
    let mut index = index();
    let nw = Uuid::new_v4();
    index.insert(nw, small(100.0, 100.0));
    let se = Uuid::new_v4();
    index.insert(se, small(800.0, 800.0));
    for i in 0..9 {
        index.insert(Uuid::new_v4(), small(600.0 + f64::from(i) * 30.0, 100.0));
    }
    assert_eq!(index.node_count(), 5);
    // Every object is still retrievable from either side of the split.
    assert_eq!(index.len(), 11);
    assert!(index.contains(&nw));
    assert!(index.contains(&se));
}

#[test]
fn entry_straddling_split_boundary_stays_visible_to_all() {
    let mut index = index();
    // Sits across the vertical midline at x = 500.
    let straddler = Uuid::new_v4();
    index.insert(straddler, small(495.0, 100.0));
    for i in 0..10 {
        index.insert(Uuid::new_v4(), small(50.0 + f64::from(i) * 30.0, 50.0));
    }
    assert_eq!(index.node_count(), 5);
    // The straddler stayed at the root, so every retrieval sees it.
    let probe = Uuid::new_v4();
    index.insert(probe, small(800.0, 800.0));
    assert!(index.retrieve(&probe).contains(&straddler));
}

// =============================================================
// Retrieve
// =============================================================

#[test]
fn retrieve_unsplit_root_returns_everything() {
    let mut index = index();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let c = Uuid::new_v4();
    index.insert(a, small(10.0, 10.0));
    index.insert(b, small(500.0, 500.0));
    index.insert(c, small(900.0, 900.0));
    let candidates = index.retrieve(&a);
    assert!(candidates.contains(&a));
    assert!(candidates.contains(&b));
    assert!(candidates.contains(&c));
}

#[test]
fn retrieve_after_split_skips_far_quadrants() {
    let mut index = index();
    let far = Uuid::new_v4();
    index.insert(far, small(800.0, 800.0));
    let mut near = Vec::new();
    for i in 0..10 {
        let id = Uuid::new_v4();
        near.push(id);
        index.insert(id, small(50.0 + f64::from(i) * 30.0, 50.0));
    }
    assert_eq!(index.node_count(), 5);
    let candidates = index.retrieve(&near[0]);
    for id in &near {
        assert!(candidates.contains(id));
    }
    assert!(!candidates.contains(&far));
}

#[test]
fn retrieve_unknown_is_empty() {
    let index = index();
    assert!(index.retrieve(&Uuid::new_v4()).is_empty());
}

// =============================================================
// Update
// =============================================================

#[test]
fn update_with_unchanged_bounds_is_noop() {
    let mut index = index();
    let id = Uuid::new_v4();
    let bounds = small(100.0, 100.0);
    index.insert(id, bounds);
    let before = index.stored_bounds(&id);
    index.update(|_| Some(bounds));
    assert_eq!(index.stored_bounds(&id), before);
}

#[test]
fn update_replaces_stored_bounds_on_move() {
    let mut index = index();
    let id = Uuid::new_v4();
    index.insert(id, small(100.0, 100.0));
    index.update(|_| Some(small(600.0, 600.0)));
    assert_eq!(index.stored_bounds(&id), Some(Rect::new(595.0, 595.0, 20.0, 20.0)));
}

#[test]
fn update_relocates_across_quadrants() {
    let mut index = index();
    let mut bounds_by_id = std::collections::HashMap::new();
    let mover = Uuid::new_v4();
    index.insert(mover, small(100.0, 100.0));
    bounds_by_id.insert(mover, small(100.0, 100.0));
    let mut fillers = Vec::new();
    for i in 0..10 {
        let id = Uuid::new_v4();
        let bounds = small(600.0 + f64::from(i) * 30.0, 700.0);
        fillers.push(id);
        index.insert(id, bounds);
        bounds_by_id.insert(id, bounds);
    }
    assert_eq!(index.node_count(), 5);
    // Move the tracked object from the NW quadrant into the SE one.
    bounds_by_id.insert(mover, small(700.0, 800.0));
    index.update(|id| bounds_by_id.get(&id).copied());
    assert!(index.contains(&mover));
    let candidates = index.retrieve(&fillers[0]);
    assert!(candidates.contains(&mover));
}

// =============================================================
// Threshold changes
// =============================================================

#[test]
fn set_threshold_leaves_stored_bounds_until_update() {
    let mut index = index();
    let id = Uuid::new_v4();
    let bounds = small(100.0, 100.0);
    index.insert(id, bounds);
    index.set_threshold(40.0);
    assert_eq!(index.threshold(), 40.0);
    assert_eq!(index.stored_bounds(&id), Some(Rect::new(95.0, 95.0, 20.0, 20.0)));
    index.update(|_| Some(bounds));
    assert_eq!(index.stored_bounds(&id), Some(Rect::new(80.0, 80.0, 50.0, 50.0)));
}

// =============================================================
// Region changes
// =============================================================

#[test]
fn set_region_rebuilds_and_keeps_entries() {
    let mut index = index();
    let ids: Vec<ObjectId> = (0..11).map(|_| Uuid::new_v4()).collect();
    for (i, id) in (0_u32..).zip(ids.iter()) {
        index.insert(*id, small(50.0 + f64::from(i) * 30.0, 50.0));
    }
    assert_eq!(index.node_count(), 5);
    index.set_region(Rect::new(0.0, 0.0, 400.0, 400.0));
    assert_eq!(index.region(), Rect::new(0.0, 0.0, 400.0, 400.0));
    assert_eq!(index.len(), 11);
    for id in &ids {
        assert!(index.contains(id));
    }
}
