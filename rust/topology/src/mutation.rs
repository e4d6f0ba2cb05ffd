// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental insertion and removal of elements.
//!
//! Both operations are atomic: they either commit completely or leave the
//! net exactly as it was.
//!
//! Insertion classifies the intersection of the new element with every
//! range-query candidate:
//!
//! | intersection | legal when                                        | link                  |
//! |--------------|---------------------------------------------------|-----------------------|
//! | empty        | always                                            | no                    |
//! | point        | it is a corner of either element                  | segments, if shared   |
//! | segment      | triangles and tetrahedra, an edge of both         | triangles             |
//! | planar       | tetrahedra sharing exactly three corners           | yes                   |
//! | volume       | never                                             |                       |
//!
//! Removal refuses to disconnect the remaining neighbours.

use nalgebra::Point3;

use crate::clip::{self, Intersection};
use crate::error::{Error, Result};
use crate::geometry::Shape;
use crate::keys::{ComponentKey, ElementId, ElementKey, ElementKind};
use crate::net::Net;
use crate::spatial::SpatialIndex;
use crate::traversal::WalkOrder;

/// A link to create on commit: new element slot, candidate, candidate slot.
type PendingLink = (usize, ElementKey, usize);

impl Net {
    /// Stored element of `component` geometrically equivalent to `shape`.
    pub fn find_equivalent(&self, component: ComponentKey, shape: &Shape) -> Option<ElementKey> {
        let eps = self.epsilon();
        let c = self.components.get(component)?;
        let bounds = shape.bounds().ok()?;
        c.index.intersects(&bounds).into_iter().find(|&k| {
            self.elements
                .get(k)
                .is_some_and(|e| e.shape.is_equivalent(shape, &eps))
        })
    }

    /// Adds an element to a component after checking it against every
    /// overlapping element.
    pub fn add_element(&mut self, component: ComponentKey, shape: Shape) -> Result<ElementKey> {
        self.check_shape(&shape)?;
        let bounds = shape.bounds()?;
        let c = self.component_ref(component)?;

        if c.is_empty() {
            let key = self.allocate_element(component, shape);
            let c = self.component_mut(component)?;
            c.index.insert(key, bounds);
            c.entry = Some(key);
            c.bounds = Some(bounds);
            self.mark_dirty(component);
            return Ok(key);
        }

        if self.find_equivalent(component, &shape).is_some() {
            tracing::warn!(component = %c.id, "rejected duplicate element");
            return Err(Error::InvalidGeometry("duplicate element".into()));
        }

        let candidates = c.index.intersects(&bounds);
        let links = match self.plan_links(&shape, &candidates) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(component = %c.id, error = %e, "rejected element");
                return Err(e);
            }
        };

        let key = self.allocate_element(component, shape);
        for &(slot, other, back) in &links {
            self.link(key, slot, other, back);
        }
        if let Some(&(_, first, _)) = links.first() {
            self.orient_to_neighbours(component, key, first)?;
        }

        let c = self.component_mut(component)?;
        c.index.insert(key, bounds);
        c.bounds = Some(c.bounds.map_or(bounds, |b| b.union(&bounds)));
        if links.is_empty() {
            c.connected = false;
        }
        tracing::trace!(component = %c.id, element = ?key, links = links.len(), "added element");
        self.mark_dirty(component);
        Ok(key)
    }

    /// Checks `shape` against every candidate and collects the links to
    /// create, failing on the first illegal contact.
    fn plan_links(&self, shape: &Shape, candidates: &[ElementKey]) -> Result<Vec<PendingLink>> {
        let eps = self.epsilon();
        let kind = shape.kind();
        let mut links: Vec<PendingLink> = Vec::new();

        for &candidate in candidates {
            let Some(other) = self.elements.get(candidate) else {
                continue;
            };
            let theirs = &other.shape;
            let corner_of_both = |p: &Point3<f64>| shape.has_corner(p, &eps) && theirs.has_corner(p, &eps);

            // shared facet, if any: slot on the new element, slot on the candidate
            let shared_facet = || -> Option<(usize, usize)> {
                let facet: Vec<Point3<f64>> = shape
                    .corners()
                    .iter()
                    .filter(|p| theirs.has_corner(p, &eps))
                    .copied()
                    .collect();
                Some((shape.slot_for_facet(&facet, &eps)?, theirs.slot_for_facet(&facet, &eps)?))
            };

            let link = match clip::intersect(shape, theirs, &eps)? {
                Intersection::Empty => None,
                Intersection::Point(p) => {
                    if !shape.has_corner(&p, &eps) && !theirs.has_corner(&p, &eps) {
                        return Err(illegal(kind, "touches another element away from any corner"));
                    }
                    if kind == ElementKind::Segment && corner_of_both(&p) {
                        shared_facet()
                    } else {
                        None
                    }
                }
                Intersection::Segment(s) => {
                    let shared_edge = corner_of_both(&s.start()) && corner_of_both(&s.end());
                    match kind {
                        ElementKind::Triangle if shared_edge => shared_facet(),
                        ElementKind::Tetrahedron if shared_edge => None,
                        _ => return Err(illegal(kind, "overlaps another element along a segment")),
                    }
                }
                Intersection::Planar(_) => {
                    if kind == ElementKind::Tetrahedron && shape.shared_corner_count(theirs, &eps) == 3 {
                        shared_facet()
                    } else {
                        return Err(illegal(kind, "overlaps another element over an area"));
                    }
                }
                Intersection::Volume => return Err(illegal(kind, "overlaps another element in volume")),
            };

            if let Some((slot, back)) = link {
                let free = !other.has_neighbour(back) && links.iter().all(|l| l.0 != slot);
                if free {
                    links.push((slot, candidate, back));
                }
            }
        }
        Ok(links)
    }

    /// Keeps an oriented component oriented: the new element is turned to
    /// agree with `first`, and any remaining disagreement clears the flag.
    fn orient_to_neighbours(&mut self, component: ComponentKey, key: ElementKey, first: ElementKey) -> Result<()> {
        if !self.component_ref(component)?.oriented {
            return Ok(());
        }
        if self.orientations_agree(key, first) == Some(false) {
            if let Some(e) = self.elements.get_mut(key) {
                e.flip();
            }
        }
        let disagrees = self.elements.get(key).is_some_and(|e| {
            e.neighbours()
                .any(|(_, n)| self.orientations_agree(key, n) == Some(false))
        });
        if disagrees {
            let c = self.component_mut(component)?;
            c.oriented = false;
            c.oriented_outward = false;
        }
        Ok(())
    }

    /// Removes the element of `component` geometrically equivalent to
    /// `shape`.
    pub fn remove_element(&mut self, component: ComponentKey, shape: &Shape) -> Result<()> {
        self.component_ref(component)?;
        let key = self
            .find_equivalent(component, shape)
            .ok_or(Error::ElementNotFound)?;
        self.remove_key(component, key)
    }

    /// Removes the element carrying `id`.
    pub fn remove_element_by_id(&mut self, id: ElementId) -> Result<()> {
        let key = self.element_key(id).ok_or(Error::ElementIdNotFound(id))?;
        let component = self.elements.get(key).ok_or(Error::ElementIdNotFound(id))?.component;
        self.remove_key(component, key)
    }

    fn remove_key(&mut self, component: ComponentKey, key: ElementKey) -> Result<()> {
        let element = self.elements.get(key).ok_or(Error::ElementNotFound)?;
        let bounds = element.shape.bounds()?;
        let neighbours: Vec<ElementKey> = element.neighbours().map(|(_, n)| n).collect();

        // clear back links, remembering them for a rollback
        let mut cleared: Vec<(ElementKey, usize)> = Vec::with_capacity(neighbours.len());
        for &n in &neighbours {
            if let Some(other) = self.elements.get_mut(n) {
                if let Some(slot) = other.slot_of(key) {
                    other.set_neighbour(slot, None);
                    cleared.push((n, slot));
                }
            }
        }

        if let Some((&first, rest)) = neighbours.split_first() {
            let mut walk = self.walk_excluding(first, key, WalkOrder::BreadthFirst);
            let mut pending: Vec<ElementKey> = rest.to_vec();
            pending.retain(|n| !walk.has_reached(*n));
            while !pending.is_empty() && walk.next().is_some() {
                pending.retain(|n| !walk.has_reached(*n));
            }
            drop(walk);
            if !pending.is_empty() {
                for &(n, slot) in &cleared {
                    if let Some(other) = self.elements.get_mut(n) {
                        other.set_neighbour(slot, Some(key));
                    }
                }
                let id = self.component_ref(component)?.id;
                tracing::warn!(component = %id, element = ?key, "removal would disconnect component");
                return Err(Error::TopologyViolation(
                    "removing the element would disconnect its neighbours".into(),
                ));
            }
        }

        let c = self.component_mut(component)?;
        c.index.remove(key, &bounds);
        if c.entry == Some(key) {
            let fallback = c.index.entries().first().copied();
            c.entry = neighbours.first().copied().or(fallback);
        }
        c.bounds = c.index.bounding_box();
        self.drop_element(key);
        self.mark_dirty(component);
        Ok(())
    }
}

fn illegal(kind: ElementKind, what: &str) -> Error {
    Error::InvalidGeometry(format!("{kind} {what}"))
}
