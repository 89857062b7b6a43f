//! The pairwise relationship pass.
//!
//! DESIGN
//! ======
//! Broad phase: candidates come from the spatial index, unioned with each
//! object's current relationship partners so a pair that jumped far apart
//! in one tick still receives its left-event even when the index no longer
//! co-locates them. Narrow phase: inclusive rectangle intersection on the
//! raw bounds decides collision; intersection of the half-threshold-expanded
//! bounds decides proximity; otherwise the pair is apart. Each unordered
//! pair is visited at most once per tick, in insertion order of the first
//! partner, so the emitted batch is deterministic. Set updates are always
//! symmetric and a pair is never in both sets at once.

#[cfg(test)]
#[path = "contact_test.rs"]
mod contact_test;

use std::collections::HashSet;

use crate::events::{ContactEvent, ContactKind};
use crate::object::{ObjectId, ObjectStore};
use crate::quadtree::SpatialIndex;

enum Outcome {
    Colliding,
    InProximity,
    Apart,
}

/// Classify every candidate pair, update the symmetric relationship sets,
/// and return the derived event batch in visit order.
pub fn derive_contacts(store: &mut ObjectStore, index: &SpatialIndex, threshold: f64) -> Vec<ContactEvent> {
    let half = threshold / 2.0;
    let ids: Vec<ObjectId> = store.ids().collect();
    let mut visited: HashSet<(ObjectId, ObjectId)> = HashSet::new();
    let mut events = Vec::new();

    for a in ids {
        let mut candidates = index.retrieve(&a);
        if let Some(obj) = store.get(&a) {
            candidates.extend(obj.colliding_with().iter().copied());
            candidates.extend(obj.in_proximity_of().iter().copied());
        }
        for b in candidates {
            if b == a || !visited.insert(pair_key(a, b)) {
                continue;
            }
            let (Some(obj_a), Some(obj_b)) = (store.get(&a), store.get(&b)) else {
                continue;
            };
            let bounds_a = obj_a.bounds;
            let bounds_b = obj_b.bounds;
            let was_colliding = obj_a.colliding_with().contains(&b);
            let was_proximal = obj_a.in_proximity_of().contains(&b);

            let outcome = if bounds_a.intersects(&bounds_b) {
                Outcome::Colliding
            } else if bounds_a.expanded(half).intersects(&bounds_b.expanded(half)) {
                Outcome::InProximity
            } else {
                Outcome::Apart
            };

            match outcome {
                Outcome::Colliding => {
                    if was_proximal {
                        unlink_proximal(store, a, b);
                        events.extend(ContactEvent::pair(ContactKind::ProximityLeft, a, b));
                    }
                    if !was_colliding {
                        link_colliding(store, a, b);
                        events.extend(ContactEvent::pair(ContactKind::AreaEntered, a, b));
                    }
                    events.extend(ContactEvent::pair(ContactKind::InArea, a, b));
                }
                Outcome::InProximity => {
                    if was_colliding {
                        unlink_colliding(store, a, b);
                        events.extend(ContactEvent::pair(ContactKind::AreaLeft, a, b));
                    }
                    if !was_proximal {
                        link_proximal(store, a, b);
                        events.extend(ContactEvent::pair(ContactKind::ProximityEntered, a, b));
                    }
                    events.extend(ContactEvent::pair(ContactKind::InProximity, a, b));
                }
                Outcome::Apart => {
                    if was_colliding {
                        unlink_colliding(store, a, b);
                        events.extend(ContactEvent::pair(ContactKind::AreaLeft, a, b));
                    }
                    if was_proximal {
                        unlink_proximal(store, a, b);
                        events.extend(ContactEvent::pair(ContactKind::ProximityLeft, a, b));
                    }
                }
            }
        }
    }
    events
}

fn pair_key(a: ObjectId, b: ObjectId) -> (ObjectId, ObjectId) {
    if a < b { (a, b) } else { (b, a) }
}

fn link_colliding(store: &mut ObjectStore, a: ObjectId, b: ObjectId) {
    if let Some(obj) = store.get_mut(&a) {
        obj.colliding_with.insert(b);
    }
    if let Some(obj) = store.get_mut(&b) {
        obj.colliding_with.insert(a);
    }
}

fn unlink_colliding(store: &mut ObjectStore, a: ObjectId, b: ObjectId) {
    if let Some(obj) = store.get_mut(&a) {
        obj.colliding_with.remove(&b);
    }
    if let Some(obj) = store.get_mut(&b) {
        obj.colliding_with.remove(&a);
    }
}

fn link_proximal(store: &mut ObjectStore, a: ObjectId, b: ObjectId) {
    if let Some(obj) = store.get_mut(&a) {
        obj.in_proximity_of.insert(b);
    }
    if let Some(obj) = store.get_mut(&b) {
        obj.in_proximity_of.insert(a);
    }
}

fn unlink_proximal(store: &mut ObjectStore, a: ObjectId, b: ObjectId) {
    if let Some(obj) = store.get_mut(&a) {
        obj.in_proximity_of.remove(&b);
    }
    if let Some(obj) = store.get_mut(&b) {
        obj.in_proximity_of.remove(&a);
    }
}
