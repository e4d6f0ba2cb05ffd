// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Affine transformations of components.
//!
//! Corners are moved in place; adjacency is untouched since an invertible
//! affine map keeps shared corners shared. A mirroring map would turn every
//! element inside out, so elements are inverted afterwards to keep their
//! orientation. The component index and bounds are rebuilt; counters are
//! refreshed with the next update.

use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3};

use crate::error::{Error, Result};
use crate::geometry::{Shape, Simplex};
use crate::keys::ComponentKey;
use crate::net::Net;
use crate::spatial::SpatialIndex;

fn corners_mut(shape: &mut Shape) -> &mut [Point3<f64>] {
    match shape {
        Shape::Segment(s) => s.corners_mut(),
        Shape::Triangle(t) => t.corners_mut(),
        Shape::Tetrahedron(t) => t.corners_mut(),
    }
}

impl Net {
    /// Translates every element of a component.
    pub fn translate(&mut self, key: ComponentKey, dx: f64, dy: f64, dz: f64) -> Result<()> {
        self.transform(key, &Matrix4::new_translation(&Vector3::new(dx, dy, dz)))
    }

    /// Rotates a component around an axis through `origin`.
    ///
    /// `axis` is normalized; `angle` is in radians.
    pub fn rotate(&mut self, key: ComponentKey, origin: &Point3<f64>, axis: &Vector3<f64>, angle: f64) -> Result<()> {
        let unit_axis =
            Unit::try_new(*axis, self.epsilon().value()).ok_or(Error::DegenerateGeometry("zero rotation axis"))?;
        let rotation = Rotation3::from_axis_angle(&unit_axis, angle).to_homogeneous();
        let matrix = Matrix4::new_translation(&origin.coords)
            * rotation
            * Matrix4::new_translation(&-origin.coords);
        self.transform(key, &matrix)
    }

    /// Scales a component relative to `origin`. Negative factors mirror it.
    pub fn scale(&mut self, key: ComponentKey, origin: &Point3<f64>, sx: f64, sy: f64, sz: f64) -> Result<()> {
        let matrix = Matrix4::new_translation(&origin.coords)
            * Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
            * Matrix4::new_translation(&-origin.coords);
        self.transform(key, &matrix)
    }

    /// Applies a 4x4 affine matrix to every element of a component.
    ///
    /// A non-finite or singular matrix is rejected with `DegenerateGeometry`
    /// before anything moves. The moved shapes are validated as a whole; on
    /// failure the component is left as it was.
    pub fn transform(&mut self, key: ComponentKey, matrix: &Matrix4<f64>) -> Result<()> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(Error::DegenerateGeometry("non-finite transform"));
        }
        let det = matrix.fixed_view::<3, 3>(0, 0).determinant();
        if self.epsilon().is_zero(det) {
            return Err(Error::DegenerateGeometry("singular transform"));
        }
        let mirrored = det < 0.0;
        let keys = self.component_ref(key)?.index.entries();

        let mut moved = Vec::with_capacity(keys.len());
        for &k in &keys {
            let Some(element) = self.elements.get(k) else {
                continue;
            };
            let mut shape = element.shape;
            for corner in corners_mut(&mut shape) {
                *corner = matrix.transform_point(corner);
            }
            self.check_shape(&shape)?;
            moved.push((k, shape));
        }

        for (k, shape) in moved {
            if let Some(element) = self.elements.get_mut(k) {
                element.shape = shape;
                if mirrored {
                    element.flip();
                }
            }
        }
        let index = self.build_index(&keys)?;
        let component = self.component_mut(key)?;
        component.index = index;
        let id = component.id;
        self.update_bounds(key)?;
        self.mark_dirty(key);
        tracing::debug!(component = %id, elements = keys.len(), mirrored, "transformed component");
        Ok(())
    }

    /// Applies a 4x4 affine matrix to every component of the net.
    pub fn transform_all(&mut self, matrix: &Matrix4<f64>) -> Result<()> {
        let keys = self.component_keys().to_vec();
        for key in keys {
            self.transform(key, matrix)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{box_surface, NetBuilder};
    use crate::geometry::Segment;
    use crate::keys::ElementKind;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    fn oriented_box() -> (Net, ComponentKey) {
        let net = NetBuilder::new(ElementKind::Triangle)
            .component(box_surface([0.0; 3], [1.0, 2.0, 3.0]))
            .orient(true)
            .build()
            .unwrap();
        let key = net.component_keys()[0];
        (net, key)
    }

    #[test]
    fn translation_moves_bounds_and_keeps_volume() {
        let (mut net, key) = oriented_box();
        let before = net.signed_volume(key).unwrap();
        net.translate(key, 10.0, -5.0, 2.0).unwrap();
        let bounds = net.component(key).unwrap().bounds().unwrap();
        assert_relative_eq!(bounds.min().x, 10.0);
        assert_relative_eq!(bounds.max().z, 5.0);
        assert_relative_eq!(net.signed_volume(key).unwrap(), before, epsilon = 1e-9);
        assert!(net.contains_point(key, &p(10.5, -5.0, 3.0)).unwrap());
    }

    #[test]
    fn rotation_quarter_turn() {
        let mut net = Net::new(ElementKind::Segment);
        let key = net
            .build_component(vec![Segment::new(p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0)).into()])
            .unwrap();
        net.rotate(key, &Point3::origin(), &Vector3::z(), std::f64::consts::FRAC_PI_2)
            .unwrap();
        assert!(net.contains_point(key, &p(0.0, 1.5, 0.0)).unwrap());
        assert!(!net.contains_point(key, &p(1.5, 0.0, 0.0)).unwrap());
        assert!(matches!(
            net.rotate(key, &Point3::origin(), &Vector3::zeros(), 1.0),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn mirroring_keeps_orientation() {
        let (mut net, key) = oriented_box();
        let before = net.signed_volume(key).unwrap();
        net.scale(key, &Point3::origin(), -1.0, 1.0, 1.0).unwrap();
        assert!(net.adjacency_is_symmetric());
        assert_relative_eq!(net.signed_volume(key).unwrap(), before, epsilon = 1e-9);
        assert!(net.contains_point(key, &p(-0.5, 0.0, 1.0)).unwrap());
    }

    #[test]
    fn uniform_scale_scales_volume() {
        let (mut net, key) = oriented_box();
        net.scale(key, &p(0.5, 1.0, 1.5), 2.0, 2.0, 2.0).unwrap();
        assert_relative_eq!(net.signed_volume(key).unwrap(), 48.0, epsilon = 1e-9);
        assert!(matches!(
            net.scale(key, &Point3::origin(), 0.0, 1.0, 1.0),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn failed_transform_leaves_component_in_place() {
        let (mut net, key) = oriented_box();
        let snapshot = |net: &Net| -> Vec<Shape> {
            net.component(key)
                .unwrap()
                .elements()
                .iter()
                .map(|&k| *net.element(k).unwrap().shape())
                .collect()
        };
        let shapes = snapshot(&net);
        let bounds = net.component(key).unwrap().bounds();

        assert!(matches!(
            net.translate(key, f64::INFINITY, 0.0, 0.0),
            Err(Error::DegenerateGeometry(_))
        ));
        let mut nan = Matrix4::identity();
        nan[(0, 1)] = f64::NAN;
        assert!(net.transform(key, &nan).is_err());
        // huge but finite: corners overflow to infinity once moved
        assert!(net.scale(key, &Point3::origin(), 1e308, 1e308, 1e308).is_err());

        assert_eq!(snapshot(&net), shapes);
        assert_eq!(net.component(key).unwrap().bounds(), bounds);
        assert!(net.contains_point(key, &p(0.5, 1.0, 3.0)).unwrap());
    }
}
