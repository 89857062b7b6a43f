//! Tracked-object records and the in-memory store.
//!
//! Every object the engine tracks is a plain struct-of-fields record in an
//! arena keyed by a stable [`ObjectId`] — the host keeps the id, the engine
//! keeps the record. `ObjectStore` preserves insertion order so every pass
//! over the tracked set (and therefore every emitted event batch) is
//! deterministic.

#[cfg(test)]
#[path = "object_test.rs"]
mod object_test;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::{self, Point, Rect};

/// Unique identifier for a tracked object.
pub type ObjectId = Uuid;

/// A hard positional binding: while present, the owning object's position
/// is `target`'s origin plus `offset`, and physics is bypassed for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// The object being tracked.
    pub target: ObjectId,
    /// Offset from the target's origin to the anchored object's origin.
    pub offset: Point,
}

/// A soft spring constraint nudging the owning object's velocity so it
/// tends to sit at `rest_length` from `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    /// The object to keep at distance.
    pub target: ObjectId,
    /// Desired center-to-center distance.
    pub rest_length: f64,
    /// Spring stiffness in `[0, 1]`.
    pub strength: f64,
}

/// Per-object state owned by the engine.
///
/// `bounds` and `velocity` are host-readable at any time; mutation goes
/// through the engine so invariants (anchor acyclicity, drag claims,
/// relationship-set symmetry) hold.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    /// Stable handle for this record.
    pub id: ObjectId,
    /// Axis-aligned bounds in the shared coordinate space.
    pub bounds: Rect,
    /// Velocity applied during integration, in units per tick.
    pub velocity: Point,
    /// Stacking order; higher draws above lower.
    pub z_index: i64,
    /// Whether pointer input may drag this object.
    pub draggable: bool,
    /// Whether releasing a drag converts the last movement into velocity.
    pub slide_on_release: bool,
    /// Whether a drag start raises this object above all others.
    pub go_to_foreground_on_contact: bool,
    pub(crate) in_use: bool,
    pub(crate) anchor: Option<Anchor>,
    pub(crate) bonds: Vec<Bond>,
    pub(crate) colliding_with: BTreeSet<ObjectId>,
    pub(crate) in_proximity_of: BTreeSet<ObjectId>,
}

impl TrackedObject {
    #[must_use]
    pub fn new(id: ObjectId, bounds: Rect) -> Self {
        Self {
            id,
            bounds,
            velocity: geom::ZERO,
            z_index: 0,
            draggable: true,
            slide_on_release: false,
            go_to_foreground_on_contact: true,
            in_use: false,
            anchor: None,
            bonds: Vec::new(),
            colliding_with: BTreeSet::new(),
            in_proximity_of: BTreeSet::new(),
        }
    }

    /// Whether a pointer currently controls this object.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// The anchor binding, if any.
    #[must_use]
    pub fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    /// The spring bonds attached to this object.
    #[must_use]
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Objects whose bounds currently intersect this object's.
    #[must_use]
    pub fn colliding_with(&self) -> &BTreeSet<ObjectId> {
        &self.colliding_with
    }

    /// Objects within the proximity threshold but not intersecting.
    #[must_use]
    pub fn in_proximity_of(&self) -> &BTreeSet<ObjectId> {
        &self.in_proximity_of
    }

    /// Attach a bond, replacing any existing bond with the same target.
    pub(crate) fn upsert_bond(&mut self, bond: Bond) {
        self.bonds.retain(|b| b.target != bond.target);
        self.bonds.push(bond);
    }
}

/// Insertion-ordered arena of tracked objects.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: HashMap<ObjectId, TrackedObject>,
    order: Vec<ObjectId>,
}

impl ObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Re-inserting an existing id overwrites the record
    /// but keeps its original position in iteration order.
    pub fn insert(&mut self, obj: TrackedObject) {
        if !self.objects.contains_key(&obj.id) {
            self.order.push(obj.id);
        }
        self.objects.insert(obj.id, obj);
    }

    /// Remove a record by id, returning it if it was present.
    pub fn remove(&mut self, id: &ObjectId) -> Option<TrackedObject> {
        let removed = self.objects.remove(id);
        if removed.is_some() {
            self.order.retain(|o| o != id);
        }
        removed
    }

    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&TrackedObject> {
        self.objects.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &ObjectId) -> Option<&mut TrackedObject> {
        self.objects.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.order.iter().copied()
    }

    /// The highest z-index across all records, or 0 for an empty store.
    #[must_use]
    pub fn max_z(&self) -> i64 {
        self.objects.values().map(|o| o.z_index).max().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
