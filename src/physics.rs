//! Per-tick numeric passes: integration, anchors, bonds, border bounce.
//!
//! Pass order matters and is owned by [`Engine::tick`]: integration first,
//! then anchor resolution (so a chain of anchors settles within the same
//! tick), then bond forces, then border handling. Anchored objects bypass
//! integration entirely — their position is derived, not simulated.
//!
//! [`Engine::tick`]: crate::engine::Engine::tick

#[cfg(test)]
#[path = "physics_test.rs"]
mod physics_test;

use std::collections::HashSet;

use crate::geom::{self, Rect};
use crate::object::{ObjectId, ObjectStore};

/// Apply one step of velocity integration to every free object: move by
/// the velocity, decay it by `friction`, and snap it to zero below
/// `vector_threshold`. Dragged and anchored objects are skipped.
pub fn integrate(store: &mut ObjectStore, friction: f64, vector_threshold: f64) {
    let ids: Vec<ObjectId> = store.ids().collect();
    for id in ids {
        let Some(obj) = store.get_mut(&id) else {
            continue;
        };
        if obj.in_use || obj.anchor.is_some() {
            continue;
        }
        let velocity = obj.velocity;
        obj.bounds = obj.bounds.at(obj.bounds.origin() + velocity);
        obj.velocity = velocity * friction;
        if obj.velocity.magnitude() < vector_threshold {
            obj.velocity = geom::ZERO;
        }
    }
}

/// Pin every anchored object to its target's origin plus the anchor
/// offset, forcing its velocity to zero. Chains are walked base-first so
/// the whole chain settles in a single call; cycles cannot occur because
/// `set_anchor` rejects them.
pub fn resolve_anchors(store: &mut ObjectStore) {
    let ids: Vec<ObjectId> = store.ids().collect();
    let mut settled: HashSet<ObjectId> = HashSet::new();
    for id in ids {
        resolve_chain(store, &mut settled, id);
    }
}

fn resolve_chain(store: &mut ObjectStore, settled: &mut HashSet<ObjectId>, id: ObjectId) {
    // Collect the unsettled run of anchors from `id` toward its base.
    let mut chain = Vec::new();
    let mut cursor = id;
    while !settled.contains(&cursor) {
        settled.insert(cursor);
        match store.get(&cursor).and_then(|obj| obj.anchor) {
            Some(anchor) if store.contains(&anchor.target) => {
                chain.push(cursor);
                cursor = anchor.target;
            }
            _ => break,
        }
    }
    // Apply base-first so each link reads its target's settled origin.
    for link in chain.into_iter().rev() {
        let Some(anchor) = store.get(&link).and_then(|obj| obj.anchor) else {
            continue;
        };
        let Some(target_origin) = store.get(&anchor.target).map(|t| t.bounds.origin()) else {
            continue;
        };
        if let Some(obj) = store.get_mut(&link) {
            obj.bounds = obj.bounds.at(target_origin + anchor.offset);
            obj.velocity = geom::ZERO;
        }
    }
}

/// Apply every spring bond on objects not being dragged: each bond nudges
/// the owner's velocity toward (or away from) its target in proportion to
/// how far the pair sits from the bond's rest length. Coincident centers
/// have no defined direction and are skipped.
pub fn resolve_bonds(store: &mut ObjectStore) {
    let ids: Vec<ObjectId> = store.ids().collect();
    for id in ids {
        let Some(obj) = store.get(&id) else {
            continue;
        };
        if obj.in_use || obj.bonds().is_empty() {
            continue;
        }
        let center = obj.bounds.center();
        let bonds = obj.bonds().to_vec();
        let mut nudge = geom::ZERO;
        for bond in bonds {
            let Some(target) = store.get(&bond.target) else {
                continue;
            };
            let toward = target.bounds.center() - center;
            let Some(unit) = toward.normalized() else {
                continue;
            };
            let stretch = toward.magnitude() - bond.rest_length;
            nudge += unit * (bond.strength * stretch);
        }
        if let Some(obj) = store.get_mut(&id) {
            obj.velocity += nudge;
        }
    }
}

/// Bounce objects off the container borders: any non-anchored object whose
/// projected position (`origin + velocity`) would leave `container` has
/// that axis of velocity negated and scaled by `bounce_multiplier`, and its
/// position clamped to the border.
pub fn bounce(store: &mut ObjectStore, container: Rect, bounce_multiplier: f64) {
    let ids: Vec<ObjectId> = store.ids().collect();
    for id in ids {
        let Some(obj) = store.get_mut(&id) else {
            continue;
        };
        if obj.anchor.is_some() {
            continue;
        }
        let bounds = obj.bounds;
        let projected = bounds.at(bounds.origin() + obj.velocity);
        let mut velocity = obj.velocity;
        let mut hit = false;
        if projected.x < container.x || projected.max_x() > container.max_x() {
            velocity.x = -velocity.x * bounce_multiplier;
            hit = true;
        }
        if projected.y < container.y || projected.max_y() > container.max_y() {
            velocity.y = -velocity.y * bounce_multiplier;
            hit = true;
        }
        if hit {
            obj.velocity = velocity;
            obj.bounds = bounds.clamped_within(&container);
        }
    }
}
