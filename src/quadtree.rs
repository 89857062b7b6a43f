//! Region quadtree used as the broad-phase neighbor index.
//!
//! DESIGN
//! ======
//! Objects are indexed by their *proximity bounds* — bounds expanded by half
//! the proximity threshold on every side — so one structure answers both
//! "touching" and "nearby" queries. Nodes live in an index arena (no
//! reference cycles); each entry is stored in exactly one node, the deepest
//! whose region fully contains its proximity bounds. A leaf that outgrows
//! its capacity splits into four equal quadrants and hands down the entries
//! that fit; entries straddling a split boundary stay at the parent.
//! Re-indexing is incremental: `update` re-places only entries whose
//! proximity bounds changed since they were stored. Nodes are never merged;
//! for the tens of moving objects this serves, lazy splitting keeps updates
//! cheap without rebalancing.

#[cfg(test)]
#[path = "quadtree_test.rs"]
mod quadtree_test;

use std::collections::HashMap;

use crate::consts::{MAX_DEPTH, NODE_CAPACITY};
use crate::geom::Rect;
use crate::object::ObjectId;

#[derive(Debug)]
struct Node {
    region: Rect,
    level: usize,
    parent: Option<usize>,
    children: Option<[usize; 4]>,
    /// Entry order is stable, which keeps retrieval deterministic.
    entries: Vec<(ObjectId, Rect)>,
}

impl Node {
    fn root(region: Rect) -> Self {
        Self { region, level: 0, parent: None, children: None, entries: Vec::new() }
    }
}

/// Broad-phase spatial index over moving axis-aligned regions.
#[derive(Debug)]
pub struct SpatialIndex {
    /// Node arena; index 0 is always the root.
    nodes: Vec<Node>,
    /// Which node currently stores each object.
    locations: HashMap<ObjectId, usize>,
    threshold: f64,
}

impl SpatialIndex {
    /// Create an index covering `region`. `threshold` must already be
    /// validated as positive by the caller.
    #[must_use]
    pub fn new(region: Rect, threshold: f64) -> Self {
        Self { nodes: vec![Node::root(region)], locations: HashMap::new(), threshold }
    }

    /// The current proximity threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The region covered by the root node.
    #[must_use]
    pub fn region(&self) -> Rect {
        self.nodes[0].region
    }

    /// Replace the threshold. Stored proximity bounds become stale; the
    /// next [`update`](Self::update) re-places everything that changed.
    pub(crate) fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    /// Bounds expanded by half the threshold on every side.
    #[must_use]
    pub fn proximity_bounds(&self, bounds: Rect) -> Rect {
        bounds.expanded(self.threshold / 2.0)
    }

    /// Index an object by its current bounds.
    pub fn insert(&mut self, id: ObjectId, bounds: Rect) {
        let prox = self.proximity_bounds(bounds);
        self.place(id, prox, 0);
    }

    /// Drop an object from the index. Returns whether it was present.
    pub fn remove(&mut self, id: &ObjectId) -> bool {
        let Some(node) = self.locations.remove(id) else {
            return false;
        };
        self.nodes[node].entries.retain(|(o, _)| o != id);
        true
    }

    /// Whether an object is currently indexed.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.locations.contains_key(id)
    }

    /// Number of indexed objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Number of nodes in the arena (1 until the first split).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The proximity bounds an object was last indexed under.
    #[must_use]
    pub fn stored_bounds(&self, id: &ObjectId) -> Option<Rect> {
        let node = *self.locations.get(id)?;
        self.nodes[node]
            .entries
            .iter()
            .find(|(o, _)| o == id)
            .map(|(_, b)| *b)
    }

    /// Re-derive proximity bounds for every entry and re-place the ones
    /// that changed. Called once per tick, before the contact pass.
    pub fn update(&mut self, mut current: impl FnMut(ObjectId) -> Option<Rect>) {
        self.update_node(0, &mut current);
    }

    /// Broad-phase candidates for `id`: the contents of every node on the
    /// path from the root down to the node storing `id`, plus the entire
    /// subtree below it. Includes `id` itself; callers skip it.
    #[must_use]
    pub fn retrieve(&self, id: &ObjectId) -> Vec<ObjectId> {
        let Some(&node) = self.locations.get(id) else {
            return Vec::new();
        };
        let mut path = Vec::new();
        let mut cursor = self.nodes[node].parent;
        while let Some(idx) = cursor {
            path.push(idx);
            cursor = self.nodes[idx].parent;
        }
        let mut out = Vec::new();
        for idx in path.into_iter().rev() {
            out.extend(self.nodes[idx].entries.iter().map(|(o, _)| *o));
        }
        self.collect_subtree(node, &mut out);
        out
    }

    /// Re-root the index over a new region and re-place every entry.
    /// Used when the container is resized.
    pub fn set_region(&mut self, region: Rect) {
        let mut entries = Vec::new();
        for node in &mut self.nodes {
            entries.append(&mut node.entries);
        }
        self.nodes.clear();
        self.nodes.push(Node::root(region));
        self.locations.clear();
        for (id, prox) in entries {
            self.place(id, prox, 0);
        }
    }

    // ── Internals ───────────────────────────────────────────────

    /// Store an entry in the node derived from `start`, splitting the
    /// destination if it outgrows its capacity.
    fn place(&mut self, id: ObjectId, prox: Rect, start: usize) {
        let node = self.target_node(start, &prox);
        self.nodes[node].entries.push((id, prox));
        self.locations.insert(id, node);
        self.maybe_split(node);
    }

    /// Climb from `start` to a node whose region contains `bounds` (the
    /// root acts as a catch-all for bounds outside its region), then
    /// descend into the deepest child that fully contains them.
    fn target_node(&self, start: usize, bounds: &Rect) -> usize {
        let mut idx = start;
        while !self.nodes[idx].region.contains(bounds) {
            match self.nodes[idx].parent {
                Some(parent) => idx = parent,
                None => return idx,
            }
        }
        'descend: loop {
            if let Some(children) = self.nodes[idx].children {
                for child in children {
                    if self.nodes[child].region.contains(bounds) {
                        idx = child;
                        continue 'descend;
                    }
                }
            }
            return idx;
        }
    }

    /// Split a leaf holding more than `NODE_CAPACITY` entries into four
    /// quadrants and redistribute the entries that fit fully inside one.
    fn maybe_split(&mut self, idx: usize) {
        if self.nodes[idx].entries.len() <= NODE_CAPACITY
            || self.nodes[idx].children.is_some()
            || self.nodes[idx].level >= MAX_DEPTH
        {
            return;
        }
        let region = self.nodes[idx].region;
        let level = self.nodes[idx].level;
        let half_w = region.width / 2.0;
        let half_h = region.height / 2.0;
        let quadrants = [
            Rect::new(region.x, region.y, half_w, half_h),
            Rect::new(region.x + half_w, region.y, half_w, half_h),
            Rect::new(region.x + half_w, region.y + half_h, half_w, half_h),
            Rect::new(region.x, region.y + half_h, half_w, half_h),
        ];
        let mut children = [0usize; 4];
        for (slot, quadrant) in quadrants.into_iter().enumerate() {
            children[slot] = self.nodes.len();
            self.nodes.push(Node {
                region: quadrant,
                level: level + 1,
                parent: Some(idx),
                children: None,
                entries: Vec::new(),
            });
        }
        self.nodes[idx].children = Some(children);

        let entries = std::mem::take(&mut self.nodes[idx].entries);
        for (id, prox) in entries {
            let mut dest = idx;
            for child in children {
                if self.nodes[child].region.contains(&prox) {
                    dest = child;
                    break;
                }
            }
            self.nodes[dest].entries.push((id, prox));
            if dest != idx {
                self.locations.insert(id, dest);
            }
        }
    }

    fn update_node(&mut self, idx: usize, current: &mut impl FnMut(ObjectId) -> Option<Rect>) {
        let half = self.threshold / 2.0;
        let mut moved: Vec<(ObjectId, Rect)> = Vec::new();
        self.nodes[idx].entries.retain(|&(id, stored)| match current(id) {
            Some(bounds) => {
                let prox = bounds.expanded(half);
                if prox == stored {
                    true
                } else {
                    moved.push((id, prox));
                    false
                }
            }
            // Unknown to the caller: leave the entry alone; deregistration
            // is the only path that drops entries.
            None => true,
        });
        for (id, prox) in moved {
            self.place(id, prox, idx);
        }
        // Children may have just been created by a split during
        // re-placement; their entries are already current.
        if let Some(children) = self.nodes[idx].children {
            for child in children {
                self.update_node(child, current);
            }
        }
    }

    fn collect_subtree(&self, idx: usize, out: &mut Vec<ObjectId>) {
        out.extend(self.nodes[idx].entries.iter().map(|(o, _)| *o));
        if let Some(children) = self.nodes[idx].children {
            for child in children {
                self.collect_subtree(child, out);
            }
        }
    }
}
