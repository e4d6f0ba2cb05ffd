// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Explicit refresh of component counters, flags, entry and bounds.

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::keys::{ComponentKey, ElementKind};
use crate::net::Net;
use crate::spatial::{PointWelder, SpatialIndex};
use crate::traversal::WalkOrder;

fn sorted2(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn sorted3(mut f: [usize; 3]) -> [usize; 3] {
    f.sort_unstable();
    f
}

impl Net {
    /// Recounts distinct vertices, edges and faces (corners welded within
    /// tolerance) and refreshes the `closed` and `connected` flags.
    pub fn update_statistics(&mut self, key: ComponentKey) -> Result<()> {
        let eps = self.epsilon();
        let component = self.component_ref(key)?;
        let kind = component.kind;
        let keys = component.index.entries();
        let entry = component.entry.or_else(|| keys.first().copied());

        let mut welder = PointWelder::new(eps);
        let mut edges: FxHashSet<(usize, usize)> = FxHashSet::default();
        let mut faces: FxHashSet<[usize; 3]> = FxHashSet::default();
        let mut closed = !keys.is_empty();

        for &k in &keys {
            let element = self.elements.get(k).ok_or(Error::ElementNotFound)?;
            let v: Vec<usize> = element.shape.corners().iter().map(|p| welder.weld(p)).collect();
            for i in 0..v.len() {
                for j in (i + 1)..v.len() {
                    edges.insert(sorted2(v[i], v[j]));
                }
            }
            match kind {
                ElementKind::Segment => {}
                ElementKind::Triangle => {
                    faces.insert(sorted3([v[0], v[1], v[2]]));
                }
                ElementKind::Tetrahedron => {
                    for skip in 0..4 {
                        let mut f = [0; 3];
                        for (slot, i) in (0..4).filter(|i| *i != skip).enumerate() {
                            f[slot] = v[i];
                        }
                        faces.insert(sorted3(f));
                    }
                }
            }
            if !element.is_interior() {
                closed = false;
            }
        }

        let connected = match entry {
            Some(start) if keys.len() > 1 => self.walk(start, WalkOrder::BreadthFirst).count() == keys.len(),
            _ => true,
        };

        let component = self.component_mut(key)?;
        component.vertices = welder.len();
        component.edges = edges.len();
        component.faces = faces.len();
        component.closed = closed;
        component.connected = connected;
        tracing::trace!(
            component = %component.id,
            vertices = component.vertices,
            edges = component.edges,
            faces = component.faces,
            closed,
            connected,
            "statistics updated"
        );
        Ok(())
    }

    /// Repoints the entry to a live element of the component, or `None` when
    /// the component is empty.
    pub fn update_entry(&mut self, key: ComponentKey) -> Result<()> {
        let component = self.component_ref(key)?;
        let valid = component
            .entry
            .and_then(|e| self.elements.get(e))
            .is_some_and(|e| e.component == key);
        if !valid {
            let first = component.index.entries().first().copied();
            self.component_mut(key)?.entry = first;
        }
        Ok(())
    }

    /// Recomputes the cached bounds from the index.
    pub fn update_bounds(&mut self, key: ComponentKey) -> Result<()> {
        let component = self.component_mut(key)?;
        component.bounds = component.index.bounding_box();
        Ok(())
    }

    /// Entry, bounds and statistics in one go.
    pub fn refresh(&mut self, key: ComponentKey) -> Result<()> {
        self.update_entry(key)?;
        self.update_bounds(key)?;
        self.update_statistics(key)?;
        self.clear_dirty(key);
        Ok(())
    }

    /// Refreshes every component.
    pub fn refresh_all(&mut self) -> Result<()> {
        let keys = self.component_keys().to_vec();
        for key in keys {
            self.refresh(key)?;
        }
        Ok(())
    }
}
