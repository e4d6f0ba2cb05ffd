// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Net construction from raw coordinate arrays.
//!
//! [`NetBuilder`] collects one shape batch per component and bulk-loads them
//! into a fresh [`Net`]. Ids are assigned monotonically; a batch may carry
//! an explicit component id when importing a stored net, which must not be
//! below the ids already handed out.

use nalgebra::Point3;

use crate::config::Config;
use crate::error::Result;
use crate::geometry::{Segment, Shape, Tetrahedron, Triangle};
use crate::keys::{ComponentId, ElementKind};
use crate::net::Net;

fn point(c: &[f64; 3]) -> Point3<f64> {
    Point3::new(c[0], c[1], c[2])
}

#[derive(Debug, Clone)]
struct Batch {
    id: Option<ComponentId>,
    shapes: Vec<Shape>,
}

/// Builder for a [`Net`] of one element kind.
#[derive(Debug, Clone)]
pub struct NetBuilder {
    kind: ElementKind,
    config: Config,
    orient: bool,
    batches: Vec<Batch>,
}

impl NetBuilder {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            config: Config::default(),
            orient: false,
            batches: Vec::new(),
        }
    }

    /// Tolerance for every comparison in the built net.
    pub fn epsilon(mut self, value: f64) -> Self {
        self.config.epsilon = value;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Orient every component consistently after loading.
    pub fn orient(mut self, orient: bool) -> Self {
        self.orient = orient;
        self
    }

    /// Adds a component holding `shapes`.
    pub fn component(mut self, shapes: Vec<Shape>) -> Self {
        self.batches.push(Batch { id: None, shapes });
        self
    }

    /// Adds a component with an explicit id.
    pub fn component_with_id(mut self, id: ComponentId, shapes: Vec<Shape>) -> Self {
        self.batches.push(Batch { id: Some(id), shapes });
        self
    }

    /// Adds a component of segments given as endpoint pairs.
    pub fn segments(self, coords: &[[[f64; 3]; 2]]) -> Self {
        let shapes = coords
            .iter()
            .map(|[a, b]| Segment::new(point(a), point(b)).into())
            .collect();
        self.component(shapes)
    }

    /// Adds a component of triangles given as corner triples.
    pub fn triangles(self, coords: &[[[f64; 3]; 3]]) -> Self {
        let shapes = coords
            .iter()
            .map(|[a, b, c]| Triangle::new(point(a), point(b), point(c)).into())
            .collect();
        self.component(shapes)
    }

    /// Adds a component of tetrahedra given as corner quadruples.
    pub fn tetrahedra(self, coords: &[[[f64; 3]; 4]]) -> Self {
        let shapes = coords
            .iter()
            .map(|[a, b, c, d]| Tetrahedron::new(point(a), point(b), point(c), point(d)).into())
            .collect();
        self.component(shapes)
    }

    /// Builds the net. Fails on the first batch that does not load; nothing
    /// is returned in that case.
    pub fn build(self) -> Result<Net> {
        let mut net = Net::with_config(self.kind, self.config)?;
        for batch in self.batches {
            let key = match batch.id {
                Some(id) => net.create_component_with_id(id)?,
                None => net.create_component(),
            };
            net.load_component(key, batch.shapes)?;
            if self.orient {
                net.make_orientation_consistent(key)?;
            }
        }
        tracing::debug!(
            kind = %net.kind(),
            components = net.count_components(),
            elements = net.count_elements(),
            "built net"
        );
        Ok(net)
    }
}

/// Surface of an axis-aligned box as twelve outward-facing triangles.
pub fn box_surface(min: [f64; 3], max: [f64; 3]) -> Vec<Shape> {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let quads = [
        // bottom, -Z
        [[x0, y0, z0], [x0, y1, z0], [x1, y1, z0], [x1, y0, z0]],
        // top, +Z
        [[x0, y0, z1], [x1, y0, z1], [x1, y1, z1], [x0, y1, z1]],
        // front, -Y
        [[x0, y0, z0], [x1, y0, z0], [x1, y0, z1], [x0, y0, z1]],
        // back, +Y
        [[x0, y1, z0], [x0, y1, z1], [x1, y1, z1], [x1, y1, z0]],
        // left, -X
        [[x0, y0, z0], [x0, y0, z1], [x0, y1, z1], [x0, y1, z0]],
        // right, +X
        [[x1, y0, z0], [x1, y1, z0], [x1, y1, z1], [x1, y0, z1]],
    ];
    quads
        .iter()
        .flat_map(|[a, b, c, d]| {
            [
                Shape::Triangle(Triangle::new(point(a), point(b), point(c))),
                Shape::Triangle(Triangle::new(point(a), point(c), point(d))),
            ]
        })
        .collect()
}

/// An axis-aligned box split into six tetrahedra around its main diagonal.
pub fn box_solid(min: [f64; 3], max: [f64; 3]) -> Vec<Shape> {
    let size = [max[0] - min[0], max[1] - min[1], max[2] - min[2]];
    let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    orders
        .iter()
        .map(|order| {
            let mut corners = [point(&min); 4];
            for (step, &axis) in order.iter().enumerate() {
                let mut next = corners[step];
                next[axis] += size[axis];
                corners[step + 1] = next;
            }
            Tetrahedron::new(corners[0], corners[1], corners[2], corners[3]).into()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_relative_eq;

    #[test]
    fn builds_components_in_order() {
        let net = NetBuilder::new(ElementKind::Segment)
            .segments(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]])
            .segments(&[[[5.0, 0.0, 0.0], [6.0, 0.0, 0.0]]])
            .build()
            .unwrap();
        assert_eq!(net.count_components(), 2);
        assert_eq!(net.count_elements(), 3);
        let ids: Vec<u64> = net.components().map(|(_, c)| c.id().0).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_relative_eq!(net.total_length().unwrap(), 3.0);
    }

    #[test]
    fn explicit_ids_must_not_go_backwards() {
        let net = NetBuilder::new(ElementKind::Triangle)
            .component_with_id(ComponentId(7), box_surface([0.0; 3], [1.0; 3]))
            .component(box_surface([2.0; 3], [3.0; 3]))
            .build()
            .unwrap();
        let ids: Vec<u64> = net.components().map(|(_, c)| c.id().0).collect();
        assert_eq!(ids, vec![7, 8]);

        let result = NetBuilder::new(ElementKind::Triangle)
            .component(box_surface([0.0; 3], [1.0; 3]))
            .component_with_id(ComponentId(0), box_surface([2.0; 3], [3.0; 3]))
            .build();
        assert!(matches!(result, Err(Error::IdCollision { .. })));
    }

    #[test]
    fn box_surface_is_closed_and_outward() {
        let net = NetBuilder::new(ElementKind::Triangle)
            .component(box_surface([0.0; 3], [2.0, 1.0, 1.0]))
            .build()
            .unwrap();
        let key = net.component_keys()[0];
        let c = net.component(key).unwrap();
        assert!(c.is_closed());
        assert_eq!(c.euler(), 2);
        assert!(net.signed_volume(key).is_err());

        let net = NetBuilder::new(ElementKind::Triangle)
            .component(box_surface([0.0; 3], [2.0, 1.0, 1.0]))
            .orient(true)
            .build()
            .unwrap();
        assert_relative_eq!(net.signed_volume(net.component_keys()[0]).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn box_solid_fills_the_box() {
        let net = NetBuilder::new(ElementKind::Tetrahedron)
            .component(box_solid([0.0; 3], [1.0, 2.0, 3.0]))
            .build()
            .unwrap();
        let key = net.component_keys()[0];
        assert_relative_eq!(net.volume(key).unwrap(), 6.0, epsilon = 1e-12);
        assert_eq!(net.outer_faces(key).unwrap().len(), 12);
        assert!(net.component(key).unwrap().is_connected());
    }

    #[test]
    fn invalid_epsilon_fails_to_build() {
        let result = NetBuilder::new(ElementKind::Segment).epsilon(-1.0).build();
        assert!(result.is_err());
    }
}
