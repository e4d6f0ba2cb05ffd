// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bulk construction of components and their adjacency.
//!
//! Bulk loading trusts its input: the elements of one batch are expected to
//! be pairwise disjoint except for shared corners, edges or faces, and free
//! of duplicates. Incremental insertion with full overlap checks lives in
//! `mutation`.

use crate::component::Component;
use crate::error::{Error, Result};
use crate::geometry::Shape;
use crate::keys::{ComponentKey, ElementKey};
use crate::net::Net;
use crate::spatial::SpatialIndex;

impl Net {
    /// Appends a component bulk-loaded from `shapes`, with adjacency built
    /// and statistics refreshed.
    pub fn build_component(&mut self, shapes: Vec<Shape>) -> Result<ComponentKey> {
        for shape in &shapes {
            self.check_shape(shape)?;
        }
        let key = self.create_component();
        if let Err(e) = self.fill(key, shapes) {
            self.remove_component(key)?;
            return Err(e);
        }
        Ok(key)
    }

    /// Bulk-loads an empty component. A component is loaded at most once;
    /// afterwards elements are added one at a time.
    pub fn load_component(&mut self, key: ComponentKey, shapes: Vec<Shape>) -> Result<()> {
        if !self.component_ref(key)?.is_empty() {
            return Err(Error::TopologyViolation(
                "bulk load into a non-empty component".into(),
            ));
        }
        for shape in &shapes {
            self.check_shape(shape)?;
        }
        self.fill(key, shapes)
    }

    /// Allocates, indexes and links `shapes`. On failure every element
    /// allocated here is dropped and the component is left empty.
    fn fill(&mut self, key: ComponentKey, shapes: Vec<Shape>) -> Result<()> {
        let count = shapes.len();
        let keys: Vec<ElementKey> = shapes
            .into_iter()
            .map(|shape| self.allocate_element(key, shape))
            .collect();
        let links = match self.index_and_link(key, &keys) {
            Ok(links) => links,
            Err(e) => {
                for &k in &keys {
                    self.drop_element(k);
                }
                let (kind, fresh) = (self.kind(), self.new_index());
                if let Ok(component) = self.component_mut(key) {
                    *component = Component::new(component.id, kind, fresh);
                }
                tracing::warn!(component = ?key, elements = count, error = %e, "bulk load rolled back");
                return Err(e);
            }
        };

        let id = self.component_ref(key)?.id;
        tracing::debug!(component = %id, elements = count, links, "bulk-loaded component");
        Ok(())
    }

    fn index_and_link(&mut self, key: ComponentKey, keys: &[ElementKey]) -> Result<usize> {
        let index = self.build_index(keys)?;
        let component = self.component_mut(key)?;
        component.index = index;
        component.entry = keys.first().copied();

        let links = self.link_adjacency(key)?;
        self.refresh(key)?;
        Ok(links)
    }

    /// Links every pair of elements in a component that share a facet.
    ///
    /// For each unfilled slot, the facet opposite it is looked up among the
    /// range-query candidates; a candidate holding exactly those corners gets
    /// a symmetric link and is not considered again for this element. A
    /// shared corner alone never links triangles or tetrahedra. Returns the
    /// number of links created.
    pub fn link_adjacency(&mut self, key: ComponentKey) -> Result<usize> {
        let eps = self.epsilon();
        let keys = self.component_ref(key)?.index.entries();
        let mut links = 0;

        for &k in &keys {
            let Some(element) = self.elements.get(k) else {
                continue;
            };
            if element.is_interior() {
                continue;
            }
            let bounds = element.shape.bounds()?;
            let mut candidates: Vec<ElementKey> = self
                .component_ref(key)?
                .index
                .intersects(&bounds)
                .into_iter()
                .filter(|&c| c != k && element.slot_of(c).is_none())
                .collect();

            for slot in 0..element.slot_count() {
                let Some(element) = self.elements.get(k) else {
                    break;
                };
                if element.has_neighbour(slot) {
                    continue;
                }
                let facet = element.shape.facet(slot);
                let found = candidates.iter().enumerate().find_map(|(i, &c)| {
                    let other = self.elements.get(c)?;
                    let back = other.shape.slot_for_facet(&facet, &eps)?;
                    (!other.has_neighbour(back)).then_some((i, c, back))
                });
                if let Some((i, c, back)) = found {
                    candidates.swap_remove(i);
                    self.link(k, slot, c, back);
                    links += 1;
                    tracing::trace!(element = ?k, neighbour = ?c, slot, back, "linked");
                }
            }
        }
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Segment, Tetrahedron, Triangle};
    use crate::keys::ElementKind;
    use nalgebra::Point3;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    fn tet_hull() -> Vec<Shape> {
        let (a, b, c, d) = (p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0));
        vec![
            Triangle::new(a, c, b).into(),
            Triangle::new(a, b, d).into(),
            Triangle::new(a, d, c).into(),
            Triangle::new(b, c, d).into(),
        ]
    }

    #[test]
    fn closed_hull_is_fully_linked() {
        let mut net = Net::new(ElementKind::Triangle);
        let c = net.build_component(tet_hull()).unwrap();
        let component = net.component(c).unwrap();
        assert_eq!(component.count_elements(), 4);
        for e in component.elements() {
            assert!(net.element(e).unwrap().is_interior());
        }
        assert!(net.adjacency_is_symmetric());
        assert!(component.is_closed());
        assert_eq!(component.euler(), 2);
    }

    #[test]
    fn shared_vertex_does_not_link_triangles() {
        let mut net = Net::new(ElementKind::Triangle);
        let c = net
            .build_component(vec![
                Triangle::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)).into(),
                Triangle::new(p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 1.0, 0.0)).into(),
            ])
            .unwrap();
        for e in net.component(c).unwrap().elements() {
            assert_eq!(net.element(e).unwrap().count_neighbours(), 0);
        }
        assert!(!net.component(c).unwrap().is_connected());
    }

    #[test]
    fn reverse_slot_is_opposite_the_unshared_corner() {
        let mut net = Net::new(ElementKind::Triangle);
        let c = net
            .build_component(vec![
                Triangle::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)).into(),
                Triangle::new(p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 0.0, 0.0)).into(),
            ])
            .unwrap();
        for e in net.component(c).unwrap().elements() {
            let element = net.element(e).unwrap();
            let (slot, _) = element.neighbours().next().unwrap();
            // the unshared corner is (0,0,0) on one side and (1,1,0) on the other
            let corner = element.shape().corners()[slot];
            assert!(corner == p(0.0, 0.0, 0.0) || corner == p(1.0, 1.0, 0.0));
        }
    }

    #[test]
    fn segments_link_through_endpoints() {
        let mut net = Net::new(ElementKind::Segment);
        let c = net
            .build_component(vec![
                Segment::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)).into(),
                Segment::new(p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)).into(),
                Segment::new(p(1.0, 1.0, 0.0), p(0.0, 0.0, 0.0)).into(),
            ])
            .unwrap();
        let component = net.component(c).unwrap();
        assert!(component.is_closed());
        assert_eq!(component.euler(), 0);
    }

    #[test]
    fn tetrahedra_link_through_shared_face() {
        let mut net = Net::new(ElementKind::Tetrahedron);
        let (a, b, c, d, e) = (
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
        );
        let key = net
            .build_component(vec![Tetrahedron::new(a, b, c, d).into(), Tetrahedron::new(b, c, d, e).into()])
            .unwrap();
        let total: usize = net
            .component(key)
            .unwrap()
            .elements()
            .iter()
            .map(|&k| net.element(k).unwrap().count_neighbours())
            .sum();
        assert_eq!(total, 2);
        assert!(net.component(key).unwrap().is_connected());
    }

    #[test]
    fn wrong_kind_and_degenerate_are_rejected() {
        let mut net = Net::new(ElementKind::Triangle);
        let seg: Shape = Segment::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)).into();
        assert!(matches!(net.build_component(vec![seg]), Err(Error::KindMismatch { .. })));
        let flat: Shape = Triangle::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0)).into();
        assert!(matches!(net.build_component(vec![flat]), Err(Error::DegenerateGeometry(_))));
        assert_eq!(net.count_components(), 0);
    }

    #[test]
    fn load_only_into_empty_component() {
        let mut net = Net::new(ElementKind::Triangle);
        let key = net.create_component();
        net.load_component(key, tet_hull()).unwrap();
        assert!(matches!(
            net.load_component(key, tet_hull()),
            Err(Error::TopologyViolation(_))
        ));
    }

    #[test]
    fn non_finite_corner_leaves_no_elements_behind() {
        let mut net = Net::new(ElementKind::Triangle);
        let ok: Shape = Triangle::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)).into();
        let far: Shape = Triangle::new(p(0.0, 0.0, 0.0), p(f64::INFINITY, 1.0, 0.0), p(0.0, 1.0, 0.0)).into();

        assert!(matches!(
            net.build_component(vec![ok, far]),
            Err(Error::InvalidBoundingBox { .. })
        ));
        assert_eq!(net.count_components(), 0);
        assert_eq!(net.count_elements(), 0);

        let key = net.create_component();
        assert!(net.load_component(key, vec![ok, far]).is_err());
        assert_eq!(net.count_elements(), 0);
        assert!(net.component(key).unwrap().is_empty());
        assert!(net.element_keys().next().is_none());

        net.load_component(key, vec![ok]).unwrap();
        assert_eq!(net.count_elements(), 1);
    }
}
