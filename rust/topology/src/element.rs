// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Elements stored in a net and their neighbour slots.
//!
//! An element is a [`Shape`] plus one neighbour slot per corner. Slot `i`
//! points to the element sharing the facet opposite corner `i`, and links are
//! always symmetric once an operation on the owning [`Net`] returns.

use crate::geometry::Shape;
use crate::keys::{ComponentKey, ElementId, ElementKey, ElementKind};
use crate::net::Net;

/// A segment, triangle or tetrahedron with its neighbour slots.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) id: ElementId,
    pub(crate) component: ComponentKey,
    pub(crate) shape: Shape,
    pub(crate) neighbours: [Option<ElementKey>; 4],
}

impl Element {
    pub(crate) fn new(id: ElementId, component: ComponentKey, shape: Shape) -> Self {
        Self {
            id,
            component,
            shape,
            neighbours: [None; 4],
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Key of the owning component.
    pub fn component(&self) -> ComponentKey {
        self.component
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn kind(&self) -> ElementKind {
        self.shape.kind()
    }

    pub fn slot_count(&self) -> usize {
        self.kind().slot_count()
    }

    /// Neighbour across slot `slot`; `None` for empty or out-of-range slots.
    pub fn neighbour(&self, slot: usize) -> Option<ElementKey> {
        if slot < self.slot_count() {
            self.neighbours[slot]
        } else {
            None
        }
    }

    pub fn has_neighbour(&self, slot: usize) -> bool {
        self.neighbour(slot).is_some()
    }

    /// Filled slots with their neighbour keys.
    pub fn neighbours(&self) -> impl Iterator<Item = (usize, ElementKey)> + '_ {
        self.neighbours[..self.slot_count()]
            .iter()
            .enumerate()
            .filter_map(|(slot, n)| n.map(|k| (slot, k)))
    }

    pub fn count_neighbours(&self) -> usize {
        self.neighbours().count()
    }

    /// `true` when every slot is filled.
    pub fn is_interior(&self) -> bool {
        self.count_neighbours() == self.slot_count()
    }

    /// Slot pointing at `key`, if any.
    pub fn slot_of(&self, key: ElementKey) -> Option<usize> {
        self.neighbours[..self.slot_count()]
            .iter()
            .position(|n| *n == Some(key))
    }

    pub(crate) fn set_neighbour(&mut self, slot: usize, key: Option<ElementKey>) {
        if slot < self.slot_count() {
            self.neighbours[slot] = key;
        }
    }

    /// Reverses the winding and permutes the slots with the corners, so
    /// slot `i` stays opposite corner `i`.
    pub(crate) fn flip(&mut self) {
        let (a, b) = self.shape.inversion();
        self.shape.invert();
        self.neighbours.swap(a, b);
    }
}

impl Net {
    /// Nulls the slot of `key` that points at an element geometrically
    /// equivalent to `other`, returning the slot index.
    ///
    /// Only `key`'s side of the link is touched.
    pub fn clear_neighbour_if_equivalent(&mut self, key: ElementKey, other: &Shape) -> Option<usize> {
        let eps = self.epsilon();
        let element = self.elements.get(key)?;
        let slot = element.neighbours().find_map(|(slot, n)| {
            self.elements
                .get(n)
                .filter(|e| e.shape.is_equivalent(other, &eps))
                .map(|_| slot)
        })?;
        self.elements.get_mut(key)?.set_neighbour(slot, None);
        Some(slot)
    }

    /// Reverses an element's winding.
    ///
    /// The owning component is no longer known to be consistently oriented,
    /// so its `oriented` and `oriented_outward` flags are cleared.
    pub fn invert_orientation(&mut self, key: ElementKey) -> bool {
        let Some(element) = self.elements.get_mut(key) else {
            return false;
        };
        element.flip();
        let component = element.component;
        if let Some(c) = self.components.get_mut(component) {
            c.oriented = false;
            c.oriented_outward = false;
        }
        true
    }

    /// Sets a symmetric link between `a` (through `slot_a`) and `b` (through
    /// `slot_b`).
    pub(crate) fn link(&mut self, a: ElementKey, slot_a: usize, b: ElementKey, slot_b: usize) {
        if let Some(e) = self.elements.get_mut(a) {
            e.set_neighbour(slot_a, Some(b));
        }
        if let Some(e) = self.elements.get_mut(b) {
            e.set_neighbour(slot_b, Some(a));
        }
    }

    /// `true` when every link in the net has a matching back link.
    pub fn adjacency_is_symmetric(&self) -> bool {
        self.elements.iter().all(|(key, e)| {
            e.neighbours().all(|(_, n)| {
                self.elements
                    .get(n)
                    .is_some_and(|other| other.slot_of(key).is_some())
            })
        })
    }
}
