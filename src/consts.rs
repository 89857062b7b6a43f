//! Shared numeric constants for the interaction engine.

// ── Physics ─────────────────────────────────────────────────────

/// Scalar applied to every velocity each tick; controls how quickly a
/// sliding object comes to rest.
pub const DEFAULT_FRICTION_MULTIPLIER: f64 = 0.95;

/// Scalar applied to the reflected velocity axis when an object bounces
/// off a container border.
pub const DEFAULT_BOUNCE_MULTIPLIER: f64 = 0.70;

/// Scalar applied to the last drag movement when a released object slides.
pub const DEFAULT_SLIDE_MULTIPLIER: f64 = 1.6;

/// Minimum velocity magnitude; anything below snaps to zero.
pub const DEFAULT_VECTOR_THRESHOLD: f64 = 1.6;

// ── Proximity ───────────────────────────────────────────────────

/// Maximum gap between two objects that still counts as "in proximity".
pub const DEFAULT_PROXIMITY_THRESHOLD: f64 = 25.0;

// ── Spatial index ───────────────────────────────────────────────

/// Entries a quadtree node may hold before it splits into quadrants.
pub const NODE_CAPACITY: usize = 10;

/// Maximum quadtree depth; the root is level 0.
pub const MAX_DEPTH: usize = 5;
