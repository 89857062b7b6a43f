//! The engine: object lifecycle, configuration, pointer feed, and the
//! simulation tick.
//!
//! `Engine` owns the object store, the spatial index, and the drag
//! controller, and is the single mutation seam for all of them. One logical
//! thread drives it: pointer handlers may interleave between ticks but
//! never inside one, and a concurrent host must serialize every entry
//! point before delegating here.
//!
//! Per tick, in order: velocity integration (with friction and the
//! snap-to-zero threshold), anchor resolution, bond forces, border bounce,
//! index re-placement, then the pairwise contact pass whose derived events
//! are returned to the caller. Events therefore always reflect this tick's
//! post-integration positions.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::consts::{
    DEFAULT_BOUNCE_MULTIPLIER, DEFAULT_FRICTION_MULTIPLIER, DEFAULT_PROXIMITY_THRESHOLD,
    DEFAULT_SLIDE_MULTIPLIER, DEFAULT_VECTOR_THRESHOLD,
};
use crate::contact;
use crate::drag::{DragContext, DragController, PointerId};
use crate::events::{ContactEvent, ContactKind};
use crate::geom::{Point, Rect};
use crate::object::{Anchor, Bond, ObjectId, ObjectStore, TrackedObject};
use crate::physics;
use crate::quadtree::SpatialIndex;

/// Errors surfaced synchronously at the engine boundary. None are retried;
/// a rejected configuration value leaves the prior value in place.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An out-of-range multiplier or threshold; the prior value is kept.
    #[error("invalid configuration: {setting} = {value}")]
    InvalidConfiguration { setting: &'static str, value: f64 },
    /// The operation referenced an object that is not registered.
    #[error("unknown object: {0}")]
    UnknownObject(ObjectId),
    /// The id passed to `register_with_id` is already tracked.
    #[error("object already registered: {0}")]
    AlreadyRegistered(ObjectId),
    /// Setting the anchor would make the anchor graph cyclic.
    #[error("anchoring {object} to {target} would create a cycle")]
    AnchorCycle { object: ObjectId, target: ObjectId },
}

/// Reject a configuration value, leaving the prior one in place.
fn invalid(setting: &'static str, value: f64) -> EngineError {
    warn!(setting, value, "rejected configuration value");
    EngineError::InvalidConfiguration { setting, value }
}

/// The spatial interaction engine. See the module docs for the threading
/// contract and tick order.
#[derive(Debug)]
pub struct Engine {
    store: ObjectStore,
    index: SpatialIndex,
    drag: DragController,
    container: Rect,
    friction_multiplier: f64,
    bounce_multiplier: f64,
    slide_multiplier: f64,
    vector_threshold: f64,
    borders_collide: bool,
}

impl Engine {
    /// Create an engine whose objects live inside `container`.
    #[must_use]
    pub fn new(container: Rect) -> Self {
        Self {
            store: ObjectStore::new(),
            index: SpatialIndex::new(container, DEFAULT_PROXIMITY_THRESHOLD),
            drag: DragController::new(),
            container,
            friction_multiplier: DEFAULT_FRICTION_MULTIPLIER,
            bounce_multiplier: DEFAULT_BOUNCE_MULTIPLIER,
            slide_multiplier: DEFAULT_SLIDE_MULTIPLIER,
            vector_threshold: DEFAULT_VECTOR_THRESHOLD,
            borders_collide: false,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Track a new object with a fresh id. Returns the handle the host
    /// uses for every further call.
    pub fn register(&mut self, bounds: Rect) -> ObjectId {
        let id = Uuid::new_v4();
        self.track(id, bounds);
        id
    }

    /// Track a new object under a host-supplied id.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if the id is already tracked.
    pub fn register_with_id(&mut self, id: ObjectId, bounds: Rect) -> Result<(), EngineError> {
        if self.store.contains(&id) {
            return Err(EngineError::AlreadyRegistered(id));
        }
        self.track(id, bounds);
        Ok(())
    }

    fn track(&mut self, id: ObjectId, bounds: Rect) {
        self.store.insert(TrackedObject::new(id, bounds));
        self.index.insert(id, bounds);
        debug!(%id, "object registered");
    }

    /// Stop tracking an object. Fires the symmetric left-events for every
    /// partner still in its relationship sets, clears all bookkeeping, and
    /// removes anchors and bonds other objects hold on it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if the id is not tracked.
    pub fn deregister(&mut self, id: ObjectId) -> Result<Vec<ContactEvent>, EngineError> {
        let obj = self.store.get(&id).ok_or(EngineError::UnknownObject(id))?;
        let colliding: Vec<ObjectId> = obj.colliding_with().iter().copied().collect();
        let proximal: Vec<ObjectId> = obj.in_proximity_of().iter().copied().collect();

        let mut events = Vec::new();
        for partner in colliding {
            if let Some(other) = self.store.get_mut(&partner) {
                other.colliding_with.remove(&id);
            }
            events.extend(ContactEvent::pair(ContactKind::AreaLeft, id, partner));
        }
        for partner in proximal {
            if let Some(other) = self.store.get_mut(&partner) {
                other.in_proximity_of.remove(&id);
            }
            events.extend(ContactEvent::pair(ContactKind::ProximityLeft, id, partner));
        }

        self.store.remove(&id);
        self.index.remove(&id);
        self.drag.forget(&id);

        // No dangling references: drop anchors and bonds aimed at the
        // removed object.
        let ids: Vec<ObjectId> = self.store.ids().collect();
        for other_id in ids {
            if let Some(other) = self.store.get_mut(&other_id) {
                if other.anchor.is_some_and(|a| a.target == id) {
                    other.anchor = None;
                }
                other.bonds.retain(|b| b.target != id);
            }
        }
        debug!(%id, "object deregistered");
        Ok(events)
    }

    // ── Simulation ──────────────────────────────────────────────

    /// Run one fixed simulation step and return the relationship events it
    /// derived. The host calls this at its own cadence; all multipliers
    /// are per-tick.
    pub fn tick(&mut self) -> Vec<ContactEvent> {
        physics::integrate(&mut self.store, self.friction_multiplier, self.vector_threshold);
        physics::resolve_anchors(&mut self.store);
        physics::resolve_bonds(&mut self.store);
        if self.borders_collide {
            physics::bounce(&mut self.store, self.container, self.bounce_multiplier);
        }
        let store = &self.store;
        self.index.update(|id| store.get(&id).map(|o| o.bounds));
        contact::derive_contacts(&mut self.store, &self.index, self.index.threshold())
    }

    // ── Pointer feed ────────────────────────────────────────────

    /// Feed a press targeting `target`. Starts a drag when the object is
    /// draggable and both it and the pointer are unclaimed; otherwise the
    /// press is ignored for this object.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if `target` is not tracked.
    pub fn on_pointer_down(&mut self, pointer: PointerId, target: ObjectId, position: Point) -> Result<(), EngineError> {
        self.ensure_known(target)?;
        self.drag.press(&mut self.store, pointer, target, position);
        Ok(())
    }

    /// Feed a move for `target`. Ignored unless `pointer` holds the
    /// object's claim.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if `target` is not tracked.
    pub fn on_pointer_move(&mut self, pointer: PointerId, target: ObjectId, position: Point) -> Result<(), EngineError> {
        self.ensure_known(target)?;
        self.drag
            .moved(&mut self.store, pointer, target, position, self.borders_collide, self.container);
        Ok(())
    }

    /// Feed a release for `target`. Ends the drag when `pointer` holds the
    /// claim; converts the last movement into velocity when the object
    /// slides on release.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if `target` is not tracked.
    pub fn on_pointer_up(&mut self, pointer: PointerId, target: ObjectId) -> Result<(), EngineError> {
        self.ensure_known(target)?;
        self.drag.release(&mut self.store, pointer, target, self.slide_multiplier);
        Ok(())
    }

    /// Feed a cancellation. Identical to a release.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if `target` is not tracked.
    pub fn on_pointer_cancel(&mut self, pointer: PointerId, target: ObjectId) -> Result<(), EngineError> {
        self.on_pointer_up(pointer, target)
    }

    /// Hand the drag of `target` over to a different pointer in response
    /// to a fresh press on it; re-derives the grab offset from `position`
    /// and changes nothing else.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if `target` is not tracked.
    pub fn rebind_pointer(&mut self, pointer: PointerId, target: ObjectId, position: Point) -> Result<(), EngineError> {
        self.ensure_known(target)?;
        self.drag.rebind(&mut self.store, pointer, target, position);
        Ok(())
    }

    // ── Engine-wide configuration ───────────────────────────────

    /// Set how close two objects must be to count as in proximity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless `value > 0`.
    pub fn set_proximity_threshold(&mut self, value: f64) -> Result<(), EngineError> {
        if value.is_nan() || value <= 0.0 {
            return Err(invalid("proximity_threshold", value));
        }
        self.index.set_threshold(value);
        Ok(())
    }

    /// Set the per-tick velocity decay factor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless `value` is in `[0, 1]`.
    pub fn set_friction_multiplier(&mut self, value: f64) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid("friction_multiplier", value));
        }
        self.friction_multiplier = value;
        Ok(())
    }

    /// Set the energy kept when bouncing off a border.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless `value` is in `[0, 1]`.
    pub fn set_bounce_multiplier(&mut self, value: f64) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid("bounce_multiplier", value));
        }
        self.bounce_multiplier = value;
        Ok(())
    }

    /// Set the scale applied to the release movement of a sliding object.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless `value >= 0`.
    pub fn set_slide_multiplier(&mut self, value: f64) -> Result<(), EngineError> {
        if value.is_nan() || value < 0.0 {
            return Err(invalid("slide_multiplier", value));
        }
        self.slide_multiplier = value;
        Ok(())
    }

    /// Set the magnitude below which a velocity snaps to zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless `value >= 0`.
    pub fn set_vector_threshold(&mut self, value: f64) -> Result<(), EngineError> {
        if value.is_nan() || value < 0.0 {
            return Err(invalid("vector_threshold", value));
        }
        self.vector_threshold = value;
        Ok(())
    }

    /// Whether objects collide with the container borders.
    pub fn set_borders_collide(&mut self, value: bool) {
        self.borders_collide = value;
    }

    /// Replace the container bounds; the spatial index is rebuilt over the
    /// new region.
    pub fn set_container_bounds(&mut self, container: Rect) {
        self.container = container;
        self.index.set_region(container);
    }

    #[must_use]
    pub fn proximity_threshold(&self) -> f64 {
        self.index.threshold()
    }

    #[must_use]
    pub fn friction_multiplier(&self) -> f64 {
        self.friction_multiplier
    }

    #[must_use]
    pub fn bounce_multiplier(&self) -> f64 {
        self.bounce_multiplier
    }

    #[must_use]
    pub fn slide_multiplier(&self) -> f64 {
        self.slide_multiplier
    }

    #[must_use]
    pub fn vector_threshold(&self) -> f64 {
        self.vector_threshold
    }

    #[must_use]
    pub fn borders_collide(&self) -> bool {
        self.borders_collide
    }

    #[must_use]
    pub fn container_bounds(&self) -> Rect {
        self.container
    }

    // ── Per-object state ────────────────────────────────────────

    /// Look up a tracked object by id.
    #[must_use]
    pub fn object(&self, id: &ObjectId) -> Option<&TrackedObject> {
        self.store.get(id)
    }

    /// Ids of all tracked objects in registration order.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.store.ids()
    }

    /// The drag context of an object, if it has ever received a press.
    #[must_use]
    pub fn drag_context(&self, id: &ObjectId) -> Option<&DragContext> {
        self.drag.context(id)
    }

    /// Overwrite an object's bounds. The index picks the change up on the
    /// next tick.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if the id is not tracked.
    pub fn set_bounds(&mut self, id: ObjectId, bounds: Rect) -> Result<(), EngineError> {
        self.object_mut(id)?.bounds = bounds;
        Ok(())
    }

    /// Overwrite an object's velocity.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if the id is not tracked.
    pub fn set_velocity(&mut self, id: ObjectId, velocity: Point) -> Result<(), EngineError> {
        self.object_mut(id)?.velocity = velocity;
        Ok(())
    }

    /// Allow or forbid dragging. Forbidding also releases the object from
    /// use; a drag in progress stops moving it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if the id is not tracked.
    pub fn set_draggable(&mut self, id: ObjectId, draggable: bool) -> Result<(), EngineError> {
        let obj = self.object_mut(id)?;
        obj.draggable = draggable;
        if !draggable {
            // An object that is not draggable cannot be in use.
            obj.in_use = false;
        }
        Ok(())
    }

    /// Whether releasing a drag turns the last movement into velocity.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if the id is not tracked.
    pub fn set_slide_on_release(&mut self, id: ObjectId, value: bool) -> Result<(), EngineError> {
        self.object_mut(id)?.slide_on_release = value;
        Ok(())
    }

    /// Whether a drag start raises the object above all others.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if the id is not tracked.
    pub fn set_go_to_foreground_on_contact(&mut self, id: ObjectId, value: bool) -> Result<(), EngineError> {
        self.object_mut(id)?.go_to_foreground_on_contact = value;
        Ok(())
    }

    /// Anchor `id` to `target` at a fixed offset. While anchored the
    /// object's position is derived from the target and physics bypasses
    /// it entirely.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if either id is not tracked, and
    /// `AnchorCycle` if following `target`'s anchor chain would lead back
    /// to `id`.
    pub fn set_anchor(&mut self, id: ObjectId, target: ObjectId, offset: Point) -> Result<(), EngineError> {
        self.ensure_known(id)?;
        self.ensure_known(target)?;
        // Walk the chain from the target; reaching `id` means a cycle.
        let mut cursor = target;
        loop {
            if cursor == id {
                return Err(EngineError::AnchorCycle { object: id, target });
            }
            match self.store.get(&cursor).and_then(TrackedObject::anchor) {
                Some(next) => cursor = next.target,
                None => break,
            }
        }
        self.object_mut(id)?.anchor = Some(Anchor { target, offset });
        Ok(())
    }

    /// Remove an anchor, returning the object to normal physics.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if the id is not tracked.
    pub fn clear_anchor(&mut self, id: ObjectId) -> Result<(), EngineError> {
        self.object_mut(id)?.anchor = None;
        Ok(())
    }

    /// Attach a spring bond, replacing any existing bond with the same
    /// target.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if either id is not tracked, and
    /// `InvalidConfiguration` for a strength outside `[0, 1]` or a
    /// negative rest length.
    pub fn add_bond(&mut self, id: ObjectId, bond: Bond) -> Result<(), EngineError> {
        self.ensure_known(id)?;
        self.ensure_known(bond.target)?;
        if !(0.0..=1.0).contains(&bond.strength) {
            return Err(invalid("bond_strength", bond.strength));
        }
        if bond.rest_length.is_nan() || bond.rest_length < 0.0 {
            return Err(invalid("bond_rest_length", bond.rest_length));
        }
        self.object_mut(id)?.upsert_bond(bond);
        Ok(())
    }

    /// Remove the bond on `id` whose target is `target`. Returns whether
    /// one existed.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if `id` is not tracked.
    pub fn remove_bond(&mut self, id: ObjectId, target: ObjectId) -> Result<bool, EngineError> {
        let obj = self.object_mut(id)?;
        let before = obj.bonds.len();
        obj.bonds.retain(|b| b.target != target);
        Ok(obj.bonds.len() != before)
    }

    // ── Internals ───────────────────────────────────────────────

    fn ensure_known(&self, id: ObjectId) -> Result<(), EngineError> {
        if self.store.contains(&id) {
            Ok(())
        } else {
            Err(EngineError::UnknownObject(id))
        }
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut TrackedObject, EngineError> {
        self.store.get_mut(&id).ok_or(EngineError::UnknownObject(id))
    }
}
