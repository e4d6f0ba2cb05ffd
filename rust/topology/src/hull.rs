// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed triangle hulls: outward orientation, enclosed volume and
//! point-in-solid containment.
//!
//! ## Containment
//!
//! A point strictly inside the bounds and off the surface is classified by
//! casting a ray to just beyond the nearest bounding-box face and looking at
//! the first triangle it crosses: the crossing runs along the outward normal
//! exactly when the point is inside.
//!
//! A ray that hits the closest triangle on an edge or vertex says nothing
//! reliable, so the probe is redirected through the centroid of that
//! triangle and repeated until a clean hit is found. Probes never revisit a
//! triangle; when a direction is exhausted the next-nearest box face is
//! tried.

use nalgebra::Point3;
use rustc_hash::FxHashSet;

use crate::bounds::Bounds;
use crate::clip;
use crate::component::Component;
use crate::epsilon::Epsilon;
use crate::error::{Error, Result};
use crate::geometry::{Segment, SegmentHit, Shape, Simplex, Triangle};
use crate::keys::{ComponentKey, ElementKey, ElementKind};
use crate::net::Net;
use crate::spatial::SpatialIndex;

impl Net {
    /// Signed volume enclosed by a closed, consistently oriented triangle
    /// component. Positive when the triangles face outward.
    ///
    /// Each triangle contributes the signed volume of the tetrahedron it
    /// spans with the bounding-box centre.
    pub fn signed_volume(&self, key: ComponentKey) -> Result<f64> {
        let c = self.component_ref(key)?;
        if c.kind != ElementKind::Triangle {
            return Err(Error::KindMismatch {
                expected: ElementKind::Triangle,
                actual: c.kind,
            });
        }
        if !c.closed {
            return Err(Error::TopologyViolation(format!("component {} is not closed", c.id)));
        }
        if !c.oriented {
            return Err(Error::TopologyViolation(format!(
                "component {} is not consistently oriented",
                c.id
            )));
        }
        let reference = c.bounds.map(|b| b.center()).unwrap_or_else(Point3::origin);
        let mut sum = 0.0;
        for k in c.index.entries() {
            if let Some(t) = self.shape_of(k).and_then(Shape::as_triangle) {
                let [a, b, d] = [0, 1, 2].map(|i| t.corners()[i] - reference);
                sum += a.dot(&b.cross(&d));
            }
        }
        Ok(sum / 6.0)
    }
}

/// A triangle net whose components are closed surfaces with outward
/// normals.
#[derive(Debug, Clone)]
pub struct ClosedHull {
    net: Net,
}

impl ClosedHull {
    /// Wraps a triangle net. Every component must be closed; each one is
    /// oriented consistently and turned to face outward.
    pub fn new(mut net: Net) -> Result<Self> {
        if net.kind() != ElementKind::Triangle {
            return Err(Error::KindMismatch {
                expected: ElementKind::Triangle,
                actual: net.kind(),
            });
        }
        net.refresh_all()?;
        let mut hull = Self { net };
        let keys = hull.net.component_keys().to_vec();
        for key in keys {
            hull.make_outward(key)?;
        }
        Ok(hull)
    }

    pub fn net(&self) -> &Net {
        &self.net
    }

    /// Mutable access to the underlying net. Containment queries refuse
    /// components that are no longer closed and outward until
    /// [`ClosedHull::revalidate`] is called.
    pub fn net_mut(&mut self) -> &mut Net {
        &mut self.net
    }

    pub fn into_net(self) -> Net {
        self.net
    }

    /// Refreshes every component and restores outward orientation.
    pub fn revalidate(&mut self) -> Result<()> {
        self.net.refresh_all()?;
        let keys = self.net.component_keys().to_vec();
        for key in keys {
            self.make_outward(key)?;
        }
        Ok(())
    }

    pub fn is_closed(&self, key: ComponentKey) -> bool {
        self.net.component(key).is_some_and(Component::is_closed)
    }

    pub fn is_oriented_outward(&self, key: ComponentKey) -> bool {
        self.net.component(key).is_some_and(Component::is_oriented_outward)
    }

    /// Orients a closed component consistently and inverts it if its signed
    /// volume is negative.
    pub fn make_outward(&mut self, key: ComponentKey) -> Result<()> {
        let c = self.net.component_ref(key)?;
        if !c.closed {
            return Err(Error::TopologyViolation(format!("component {} is not closed", c.id)));
        }
        if !c.oriented {
            self.net.make_orientation_consistent(key)?;
        }
        if self.net.signed_volume(key)? < 0.0 {
            self.net.invert_component(key)?;
            tracing::debug!(component = %self.net.component_ref(key)?.id, "hull inverted to face outward");
        }
        let c = self.net.component_mut(key)?;
        c.oriented = true;
        c.oriented_outward = true;
        Ok(())
    }

    /// Enclosed volume, never negative.
    pub fn volume(&mut self, key: ComponentKey) -> Result<f64> {
        if !self.is_oriented_outward(key) {
            self.make_outward(key)?;
        }
        self.net.signed_volume(key)
    }

    /// Sum of the enclosed volumes of every component.
    pub fn total_volume(&mut self) -> Result<f64> {
        let keys = self.net.component_keys().to_vec();
        let mut total = 0.0;
        for key in keys {
            total += self.volume(key)?;
        }
        Ok(total)
    }

    fn ready(&self, key: ComponentKey) -> Result<&Component> {
        let c = self.net.component_ref(key)?;
        if !c.closed || !c.oriented_outward {
            return Err(Error::TopologyViolation(format!(
                "component {} is not a closed outward hull",
                c.id
            )));
        }
        Ok(c)
    }

    /// `true` if `p` lies in the solid bounded by the component. Points on
    /// the surface count as inside unless `strict`.
    pub fn contains_inside(&self, key: ComponentKey, p: &Point3<f64>, strict: bool) -> Result<bool> {
        let eps = self.net.epsilon();
        let c = self.ready(key)?;
        let Some(bounds) = c.bounds else {
            return Ok(false);
        };
        if !bounds.contains_point(p, &eps) {
            return Ok(false);
        }
        let on_surface = c.index.contains(p).into_iter().any(|k| {
            self.net
                .shape_of(k)
                .is_some_and(|s| s.contains_point(p, &eps))
        });
        if on_surface {
            return Ok(!strict);
        }

        let mut budget = self.net.config().ray_probe_limit;
        for target in ray_targets(&bounds, p, &eps) {
            let mut target = target;
            let mut visited: FxHashSet<ElementKey> = FxHashSet::default();
            while budget > 0 {
                budget -= 1;
                let Some((k, triangle, hit)) = self.closest_hit(c, p, &target) else {
                    // nothing between the point and the outside
                    return Ok(false);
                };
                if !triangle.on_border(&hit.point, &eps) {
                    return Ok((hit.point - p).dot(&triangle.cross()) > 0.0);
                }
                if !visited.insert(k) {
                    break;
                }
                tracing::trace!(element = ?k, "ray grazes an edge, probing through centroid");
                target = triangle.centroid();
            }
            if budget == 0 {
                break;
            }
        }
        tracing::warn!(component = %c.id, "containment ray did not resolve");
        Err(Error::TopologyViolation("containment ray did not resolve".into()))
    }

    /// `true` if `p` is inside any component.
    pub fn contains_inside_any(&self, p: &Point3<f64>, strict: bool) -> Result<bool> {
        for &key in self.net.component_keys() {
            if self.contains_inside(key, p, strict)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `true` if the segment lies strictly inside the solid.
    ///
    /// A segment touching the surface from inside is reported as not
    /// contained.
    pub fn contains_segment_inside(&self, key: ComponentKey, segment: &Segment) -> Result<bool> {
        self.contains_shape_inside(key, &Shape::Segment(*segment))
    }

    /// `true` if the triangle lies strictly inside the solid, with the same
    /// surface-contact caveat as [`ClosedHull::contains_segment_inside`].
    pub fn contains_triangle_inside(&self, key: ComponentKey, triangle: &Triangle) -> Result<bool> {
        self.contains_shape_inside(key, &Shape::Triangle(*triangle))
    }

    fn contains_shape_inside(&self, key: ComponentKey, shape: &Shape) -> Result<bool> {
        for corner in shape.corners() {
            if !self.contains_inside(key, corner, true)? {
                return Ok(false);
            }
        }
        let eps = self.net.epsilon();
        let c = self.ready(key)?;
        for k in c.index.intersects(&shape.bounds()?) {
            let Some(surface) = self.net.shape_of(k) else {
                continue;
            };
            if !clip::intersect(shape, surface, &eps)?.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Closest triangle crossed by the segment from `from` to `to`.
    fn closest_hit(
        &self,
        c: &Component,
        from: &Point3<f64>,
        to: &Point3<f64>,
    ) -> Option<(ElementKey, Triangle, SegmentHit)> {
        let eps = self.net.epsilon();
        let query = Bounds::from_points([*from, *to].iter()).ok()?;
        c.index
            .intersects(&query)
            .into_iter()
            .filter_map(|k| {
                let t = *self.net.shape_of(k)?.as_triangle()?;
                let hit = t.segment_hit(from, to, &eps)?;
                Some((k, t, hit))
            })
            .min_by(|a, b| a.2.t.total_cmp(&b.2.t))
    }
}

/// Ray end points just beyond each bounding-box face, nearest face first.
fn ray_targets(bounds: &Bounds, p: &Point3<f64>, eps: &Epsilon) -> Vec<Point3<f64>> {
    let (min, max) = (bounds.min(), bounds.max());
    let margin = eps.margin(bounds.diagonal(), 1e-2);
    let mut faces: Vec<(f64, usize, f64)> = Vec::with_capacity(6);
    for axis in 0..3 {
        faces.push((p[axis] - min[axis], axis, min[axis] - margin));
        faces.push((max[axis] - p[axis], axis, max[axis] + margin));
    }
    faces.sort_by(|a, b| a.0.total_cmp(&b.0));
    faces
        .into_iter()
        .map(|(_, axis, value)| {
            let mut target = *p;
            target[axis] = value;
            target
        })
        .collect()
}
