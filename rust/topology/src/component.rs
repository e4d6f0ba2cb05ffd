// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Components: same-kind element sets backed by a spatial index.
//!
//! A component's counters and flags are snapshots. They are refreshed by the
//! explicit update operations in `statistics` or at the end of an update
//! bracket on the owning net, never implicitly by a mutation. The element
//! count and the bounding box are always current.

use crate::bounds::Bounds;
use crate::keys::{ComponentId, ElementKey, ElementKind};
use crate::spatial::{RTreeIndex, SpatialIndex};

/// A set of same-kind elements linked by adjacency.
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) id: ComponentId,
    pub(crate) kind: ElementKind,
    pub(crate) index: RTreeIndex<ElementKey>,
    pub(crate) entry: Option<ElementKey>,
    pub(crate) bounds: Option<Bounds>,

    pub(crate) oriented: bool,
    pub(crate) oriented_outward: bool,
    pub(crate) connected: bool,
    pub(crate) closed: bool,

    pub(crate) vertices: usize,
    pub(crate) edges: usize,
    pub(crate) faces: usize,
}

impl Component {
    pub(crate) fn new(id: ComponentId, kind: ElementKind, index: RTreeIndex<ElementKey>) -> Self {
        Self {
            id,
            kind,
            index,
            entry: None,
            bounds: None,
            oriented: false,
            oriented_outward: false,
            connected: true,
            closed: false,
            vertices: 0,
            edges: 0,
            faces: 0,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Root of graph walks; `Some` iff the component is non-empty.
    pub fn entry(&self) -> Option<ElementKey> {
        self.entry
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn index(&self) -> &RTreeIndex<ElementKey> {
        &self.index
    }

    /// Keys of every element, in index order.
    pub fn elements(&self) -> Vec<ElementKey> {
        self.index.entries()
    }

    pub fn count_elements(&self) -> usize {
        self.index.count()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn is_oriented(&self) -> bool {
        self.oriented
    }

    pub fn is_oriented_outward(&self) -> bool {
        self.oriented_outward
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn count_vertices(&self) -> usize {
        self.vertices
    }

    pub fn count_edges(&self) -> usize {
        self.edges
    }

    /// Distinct triangles: the elements of a triangle component, the
    /// distinct tetrahedron faces of a solid, zero for segments.
    pub fn count_faces(&self) -> usize {
        self.faces
    }

    /// `vertices - edges + faces` from the last statistics refresh.
    pub fn euler(&self) -> i64 {
        self.vertices as i64 - self.edges as i64 + self.faces as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_component_is_empty() {
        let c = Component::new(ComponentId(4), ElementKind::Triangle, RTreeIndex::new(1e-9));
        assert!(c.is_empty());
        assert_eq!(c.entry(), None);
        assert_eq!(c.bounds(), None);
        assert_eq!(c.euler(), 0);
        assert!(!c.is_closed());
        assert_eq!(c.id(), ComponentId(4));
    }
}
