//! Relationship events emitted by the simulation tick.
//!
//! Events are returned to the host in batches — from [`tick`] and from
//! [`deregister`] — rather than through per-object handler properties. Every
//! notification is emitted twice, once per partner, with `source` and
//! `other` swapped, so a host dispatching per-object sees a symmetric feed.
//!
//! [`tick`]: crate::engine::Engine::tick
//! [`deregister`]: crate::engine::Engine::deregister

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use serde::{Deserialize, Serialize};

use crate::object::ObjectId;

/// What happened between a pair of tracked objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// The pair's bounds started intersecting this tick.
    AreaEntered,
    /// The pair's bounds intersect; fired every tick while they do.
    InArea,
    /// The pair's bounds stopped intersecting.
    AreaLeft,
    /// The pair entered the proximity band this tick.
    ProximityEntered,
    /// The pair is within the proximity threshold without intersecting;
    /// fired every tick while it is.
    InProximity,
    /// The pair left the proximity band.
    ProximityLeft,
}

/// One half of a symmetric pair notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub kind: ContactKind,
    /// The object this notification is addressed to.
    pub source: ObjectId,
    /// The partner object.
    pub other: ObjectId,
}

impl ContactEvent {
    #[must_use]
    pub fn new(kind: ContactKind, source: ObjectId, other: ObjectId) -> Self {
        Self { kind, source, other }
    }

    /// Both halves of a pair notification, `a`'s first.
    #[must_use]
    pub fn pair(kind: ContactKind, a: ObjectId, b: ObjectId) -> [Self; 2] {
        [Self::new(kind, a, b), Self::new(kind, b, a)]
    }
}
