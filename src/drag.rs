//! Pointer claims and the drag state machine.
//!
//! Each draggable object has at most one [`DragContext`], created lazily on
//! its first press and kept across drags. A context claims exactly one
//! pointer at a time; presses on an already-claimed object are ignored, and
//! a pointer driving one object ignores presses on others. Takeover by a
//! second pointer happens only through the explicit [`rebind`] entry point,
//! fed by a fresh press on the same object.
//!
//! [`rebind`]: DragController::rebind

#[cfg(test)]
#[path = "drag_test.rs"]
mod drag_test;

use std::collections::HashMap;

use crate::geom::{self, Point, Rect};
use crate::object::{ObjectId, ObjectStore};

/// Identifies the physical pointer driving a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerId {
    /// The mouse cursor.
    Mouse,
    /// A touch point, by platform-assigned id.
    Touch(u64),
}

/// Per-object drag bookkeeping. Lives as long as the object is registered.
#[derive(Debug, Clone, Copy)]
pub struct DragContext {
    /// The pointer currently driving the object, if any.
    pub pointer: Option<PointerId>,
    /// Press position relative to the object's origin.
    pub grab_offset: Point,
    /// Movement applied by the most recent move event; feeds
    /// slide-on-release.
    pub last_delta: Point,
}

impl DragContext {
    fn new() -> Self {
        Self { pointer: None, grab_offset: geom::ZERO, last_delta: geom::ZERO }
    }
}

/// Translates normalized press/move/release events into position updates
/// and drag state mutations.
#[derive(Debug, Default)]
pub struct DragController {
    contexts: HashMap<ObjectId, DragContext>,
}

impl DragController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The drag context for an object, if it has received a press.
    #[must_use]
    pub fn context(&self, id: &ObjectId) -> Option<&DragContext> {
        self.contexts.get(id)
    }

    /// The object a pointer currently drives, if any.
    #[must_use]
    pub fn claim_of(&self, pointer: PointerId) -> Option<ObjectId> {
        self.contexts
            .iter()
            .find(|(_, ctx)| ctx.pointer == Some(pointer))
            .map(|(id, _)| *id)
    }

    /// Drop all bookkeeping for a deregistered object.
    pub fn forget(&mut self, id: &ObjectId) {
        self.contexts.remove(id);
    }

    /// Handle a press on `target`. Starts a drag when the object is
    /// draggable, unclaimed, and the pointer is free; otherwise the press
    /// is ignored for this object.
    pub fn press(&mut self, store: &mut ObjectStore, pointer: PointerId, target: ObjectId, position: Point) {
        let Some(obj) = store.get(&target) else {
            return;
        };
        if !obj.draggable {
            return;
        }
        let claimed = self.contexts.get(&target).is_some_and(|c| c.pointer.is_some());
        if claimed || self.claim_of(pointer).is_some() {
            return;
        }

        self.grab(store, pointer, target, position);
    }

    /// Bind a different pointer to an object already being dragged,
    /// re-deriving the grab offset from the fresh press position. The rest
    /// of the drag state is untouched.
    pub fn rebind(&mut self, store: &mut ObjectStore, pointer: PointerId, target: ObjectId, position: Point) {
        let Some(obj) = store.get(&target) else {
            return;
        };
        if self.claim_of(pointer).is_some_and(|held| held != target) {
            return;
        }
        let Some(ctx) = self.contexts.get_mut(&target) else {
            return;
        };
        if ctx.pointer.is_none() || ctx.pointer == Some(pointer) {
            return;
        }
        ctx.pointer = Some(pointer);
        ctx.grab_offset = position - obj.bounds.origin();
    }

    /// Handle a move for `target`. Ignored unless `pointer` holds the
    /// object's claim. Clamps against `container` when borders collide.
    pub fn moved(
        &mut self,
        store: &mut ObjectStore,
        pointer: PointerId,
        target: ObjectId,
        position: Point,
        borders_collide: bool,
        container: Rect,
    ) {
        let Some(ctx) = self.contexts.get_mut(&target) else {
            return;
        };
        if ctx.pointer != Some(pointer) {
            return;
        }
        let Some(obj) = store.get_mut(&target) else {
            return;
        };
        // Anchored objects follow their anchor, not the pointer. A press
        // clears the anchor, so this only triggers when the host re-anchors
        // mid-drag. Objects made non-draggable mid-drag stop moving too.
        if !obj.draggable || obj.anchor.is_some() {
            return;
        }

        let mut target_bounds = obj.bounds.at(position - ctx.grab_offset);
        if borders_collide {
            target_bounds = target_bounds.clamped_within(&container);
        }
        ctx.last_delta = target_bounds.origin() - obj.bounds.origin();
        obj.bounds = target_bounds;
    }

    /// Handle a release for `target`. Ignored unless `pointer` holds the
    /// claim. Converts the last movement into velocity when the object
    /// slides on release.
    pub fn release(&mut self, store: &mut ObjectStore, pointer: PointerId, target: ObjectId, slide_multiplier: f64) {
        let Some(ctx) = self.contexts.get_mut(&target) else {
            return;
        };
        if ctx.pointer != Some(pointer) {
            return;
        }
        ctx.pointer = None;
        let Some(obj) = store.get_mut(&target) else {
            return;
        };
        obj.in_use = false;
        if obj.slide_on_release {
            obj.velocity = ctx.last_delta * slide_multiplier;
        }
    }

    fn grab(&mut self, store: &mut ObjectStore, pointer: PointerId, target: ObjectId, position: Point) {
        let raise_to = store.max_z() + 1;
        let Some(obj) = store.get_mut(&target) else {
            return;
        };
        // Dragging breaks any anchor.
        obj.anchor = None;
        obj.in_use = true;
        obj.velocity = geom::ZERO;
        if obj.go_to_foreground_on_contact {
            obj.z_index = raise_to;
        }
        let grab_offset = position - obj.bounds.origin();
        let ctx = self.contexts.entry(target).or_insert_with(DragContext::new);
        ctx.pointer = Some(pointer);
        ctx.grab_offset = grab_offset;
        ctx.last_delta = geom::ZERO;
    }
}
