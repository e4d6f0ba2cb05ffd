// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tetrahedral solids: boundary extraction and point containment.

use nalgebra::Point3;

use crate::error::{Error, Result};
use crate::geometry::{Shape, Simplex, Tetrahedron, Triangle};
use crate::hull::ClosedHull;
use crate::keys::{ComponentKey, ElementKind};
use crate::net::Net;
use crate::spatial::SpatialIndex;

/// Face opposite `slot`, wound away from the tetrahedron's interior.
fn outward_face(t: &Tetrahedron, slot: usize) -> Triangle {
    let mut face = t.face(slot);
    if t.signed_volume() < 0.0 {
        face.invert();
    }
    face
}

impl Net {
    fn check_solid(&self, key: ComponentKey) -> Result<()> {
        let kind = self.component_ref(key)?.kind;
        if kind != ElementKind::Tetrahedron {
            return Err(Error::KindMismatch {
                expected: ElementKind::Tetrahedron,
                actual: kind,
            });
        }
        Ok(())
    }

    /// Faces of a tetrahedron component that no neighbour shares, each
    /// facing out of the solid.
    pub fn outer_faces(&self, key: ComponentKey) -> Result<Vec<Triangle>> {
        self.check_solid(key)?;
        let mut faces = Vec::new();
        for k in self.component_ref(key)?.index.entries() {
            let Some(element) = self.elements.get(k) else {
                continue;
            };
            let Some(t) = element.shape.as_tetrahedron() else {
                continue;
            };
            for slot in (0..4).filter(|&s| !element.has_neighbour(s)) {
                faces.push(outward_face(t, slot));
            }
        }
        Ok(faces)
    }

    /// Boundary surface of a tetrahedron component as a single-component
    /// hull with the same configuration.
    pub fn extract_hull(&self, key: ComponentKey) -> Result<ClosedHull> {
        let faces = self.outer_faces(key)?;
        let mut surface = Net::with_config(ElementKind::Triangle, self.config().clone())?;
        surface.build_component(faces.into_iter().map(Shape::Triangle).collect())?;
        tracing::debug!(
            component = %self.component_ref(key)?.id,
            faces = surface.count_elements(),
            "extracted solid boundary"
        );
        ClosedHull::new(surface)
    }

    /// `true` if `p` lies in a tetrahedron of the component. Points on the
    /// outer boundary count unless `strict`; shared interior faces are
    /// inside.
    pub fn solid_contains(&self, key: ComponentKey, p: &Point3<f64>, strict: bool) -> Result<bool> {
        self.check_solid(key)?;
        let eps = self.epsilon();
        let mut inside = false;
        for k in self.component_ref(key)?.index.contains(p) {
            let Some(element) = self.elements.get(k) else {
                continue;
            };
            let Some(t) = element.shape.as_tetrahedron() else {
                continue;
            };
            if !t.contains_point(p, &eps) {
                continue;
            }
            let on_boundary = (0..4)
                .filter(|&s| !element.has_neighbour(s))
                .any(|s| t.face(s).contains_point(p, &eps));
            if !on_boundary {
                return Ok(true);
            }
            inside = true;
        }
        Ok(inside && !strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    fn two_tets() -> (Net, ComponentKey) {
        let (a, b, c, d, e) = (
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
        );
        let mut net = Net::new(ElementKind::Tetrahedron);
        let key = net
            .build_component(vec![Tetrahedron::new(a, b, c, d).into(), Tetrahedron::new(b, d, c, e).into()])
            .unwrap();
        (net, key)
    }

    #[test]
    fn shared_face_is_not_outer() {
        let (net, key) = two_tets();
        assert_eq!(net.outer_faces(key).unwrap().len(), 6);
    }

    #[test]
    fn extracted_hull_encloses_same_volume() {
        let (net, key) = two_tets();
        let solid: f64 = net
            .component(key)
            .unwrap()
            .elements()
            .iter()
            .map(|&k| net.element(k).unwrap().shape().measure())
            .sum();
        let mut hull = net.extract_hull(key).unwrap();
        let surface = hull.net().component_keys()[0];
        assert!(hull.is_closed(surface));
        assert_relative_eq!(hull.volume(surface).unwrap(), solid, epsilon = 1e-12);
    }

    #[test]
    fn point_in_solid() {
        let (net, key) = two_tets();
        assert!(net.solid_contains(key, &p(0.1, 0.1, 0.1), true).unwrap());
        // on the shared interior face
        let shared = Triangle::new(p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)).centroid();
        assert!(net.solid_contains(key, &shared, true).unwrap());
        // on the outer boundary
        assert!(!net.solid_contains(key, &p(0.2, 0.2, 0.0), true).unwrap());
        assert!(net.solid_contains(key, &p(0.2, 0.2, 0.0), false).unwrap());
        assert!(!net.solid_contains(key, &p(2.0, 2.0, 2.0), false).unwrap());
    }

    #[test]
    fn triangle_component_is_not_a_solid() {
        let mut net = Net::new(ElementKind::Triangle);
        let key = net.create_component();
        assert!(matches!(net.outer_faces(key), Err(Error::KindMismatch { .. })));
    }
}
