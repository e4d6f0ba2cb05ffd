// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric queries over components and whole nets: measures,
//! intersection tests, containment and nearest elements.
//!
//! Every query takes `&Net` and consults the component's range index
//! before running exact tests. An unknown component is an error; a query
//! that finds nothing answers `false` or an empty list.

use nalgebra::Point3;

use crate::bounds::Bounds;
use crate::clip;
use crate::component::Component;
use crate::error::{Error, Result};
use crate::geometry::{Line, Plane, Segment, Shape, Simplex, Triangle};
use crate::keys::{ComponentKey, ElementKey, ElementKind};
use crate::net::Net;
use crate::spatial::SpatialIndex;

impl Net {
    fn expect_kind(&self, key: ComponentKey, expected: ElementKind) -> Result<&Component> {
        let c = self.component_ref(key)?;
        if c.kind != expected {
            return Err(Error::KindMismatch {
                expected,
                actual: c.kind,
            });
        }
        Ok(c)
    }

    fn sum_measures(&self, c: &Component) -> f64 {
        c.index
            .entries()
            .into_iter()
            .filter_map(|k| self.shape_of(k))
            .map(Shape::measure)
            .sum()
    }

    // =========================================================================
    // Measures
    // =========================================================================

    /// Returns the total length of a segment component.
    pub fn length(&self, key: ComponentKey) -> Result<f64> {
        let c = self.expect_kind(key, ElementKind::Segment)?;
        Ok(self.sum_measures(c))
    }

    /// Returns the surface area of a component: the summed triangle areas,
    /// or for tetrahedra the area of the outer boundary.
    pub fn area(&self, key: ComponentKey) -> Result<f64> {
        let c = self.component_ref(key)?;
        match c.kind {
            ElementKind::Triangle => Ok(self.sum_measures(c)),
            ElementKind::Tetrahedron => Ok(self.outer_faces(key)?.iter().map(Triangle::area).sum()),
            ElementKind::Segment => Err(Error::KindMismatch {
                expected: ElementKind::Triangle,
                actual: c.kind,
            }),
        }
    }

    /// Returns the volume of a component: the summed tetrahedron volumes, or
    /// for a closed, consistently oriented triangle surface the enclosed
    /// volume.
    pub fn volume(&self, key: ComponentKey) -> Result<f64> {
        let c = self.component_ref(key)?;
        match c.kind {
            ElementKind::Tetrahedron => Ok(self.sum_measures(c)),
            ElementKind::Triangle => Ok(self.signed_volume(key)?.abs()),
            ElementKind::Segment => Err(Error::KindMismatch {
                expected: ElementKind::Tetrahedron,
                actual: c.kind,
            }),
        }
    }

    pub fn total_length(&self) -> Result<f64> {
        self.component_keys().iter().map(|&k| self.length(k)).sum()
    }

    pub fn total_area(&self) -> Result<f64> {
        self.component_keys().iter().map(|&k| self.area(k)).sum()
    }

    pub fn total_volume(&self) -> Result<f64> {
        self.component_keys().iter().map(|&k| self.volume(k)).sum()
    }

    // =========================================================================
    // Intersection
    // =========================================================================

    /// Returns `true` if any element of the component meets the closed box.
    pub fn intersects_bounds(&self, key: ComponentKey, bounds: &Bounds) -> Result<bool> {
        let eps = self.epsilon();
        let c = self.component_ref(key)?;
        Ok(c.index
            .intersects(bounds)
            .into_iter()
            .filter_map(|k| self.shape_of(k))
            .any(|s| clip::meets_bounds(s, bounds, &eps)))
    }

    /// Returns `true` if the infinite line meets any element.
    pub fn intersects_line(&self, key: ComponentKey, line: &Line) -> Result<bool> {
        let eps = self.epsilon();
        let c = self.component_ref(key)?;
        let Some(bounds) = c.bounds else {
            return Ok(false);
        };
        let margin = eps.margin(bounds.diagonal(), 1e-3);
        let Some(segment) = line.clip_to_bounds(&bounds.expanded(margin)) else {
            return Ok(false);
        };
        if segment.length() <= eps.value() {
            // the line only grazes a box corner
            return self.contains_point(key, &segment.start());
        }
        let probe = Shape::Segment(segment);
        for k in c.index.intersects(&segment.bounds()?) {
            let Some(shape) = self.shape_of(k) else {
                continue;
            };
            if !clip::intersect(&probe, shape, &eps)?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns `true` if the plane touches or cuts any element.
    pub fn intersects_plane(&self, key: ComponentKey, plane: &Plane) -> Result<bool> {
        let eps = self.epsilon();
        let c = self.component_ref(key)?;
        let Some(bounds) = c.bounds else {
            return Ok(false);
        };
        let (min, max) = (bounds.min(), bounds.max());
        let corners: Vec<Point3<f64>> = (0..8)
            .map(|i| {
                Point3::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                )
            })
            .collect();
        if !plane.touches(&corners, &eps) {
            return Ok(false);
        }
        Ok(c.index
            .entries()
            .into_iter()
            .filter_map(|k| self.shape_of(k))
            .any(|s| s.intersects_plane(plane, &eps)))
    }

    // =========================================================================
    // Containment
    // =========================================================================

    /// Returns `true` if some element contains the point (boundary included).
    pub fn contains_point(&self, key: ComponentKey, p: &Point3<f64>) -> Result<bool> {
        let eps = self.epsilon();
        let c = self.component_ref(key)?;
        Ok(c.index
            .contains(p)
            .into_iter()
            .filter_map(|k| self.shape_of(k))
            .any(|s| s.contains_point(p, &eps)))
    }

    /// Returns `true` if the segment is covered by the union of the
    /// component's elements.
    pub fn contains_segment(&self, key: ComponentKey, segment: &Segment) -> Result<bool> {
        let eps = self.epsilon();
        let c = self.component_ref(key)?;
        let len = segment.length();
        if len <= eps.value() {
            return self.contains_point(key, &segment.start());
        }
        let mut intervals = Vec::new();
        for k in c.index.intersects(&segment.bounds()?) {
            let Some(shape) = self.shape_of(k) else {
                continue;
            };
            if let Some(interval) = clip::segment_overlap(segment, shape, &eps)? {
                intervals.push(interval);
            }
        }
        intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

        let slack = eps.value() / len;
        let mut reached = 0.0_f64;
        for (lo, hi) in intervals {
            if lo > reached + slack {
                return Ok(false);
            }
            reached = reached.max(hi);
        }
        Ok(reached >= 1.0 - slack)
    }

    /// Returns `true` if the triangle is covered by the component's
    /// elements. Segment components never contain a triangle.
    ///
    /// Coverage is measured as the summed overlap area, which relies on
    /// the elements not overlapping one another.
    pub fn contains_triangle(&self, key: ComponentKey, triangle: &Triangle) -> Result<bool> {
        let eps = self.epsilon();
        let c = self.component_ref(key)?;
        if c.kind == ElementKind::Segment {
            return Ok(false);
        }
        let area = triangle.area();
        let mut covered = 0.0;
        for k in c.index.intersects(&triangle.bounds()?) {
            let Some(shape) = self.shape_of(k) else {
                continue;
            };
            covered += clip::planar_overlap_area(triangle.corners(), shape, &eps)?;
        }
        Ok(eps.greater_eq(covered, area))
    }

    // =========================================================================
    // Nearest
    // =========================================================================

    /// Returns up to `k` elements closest to `p` with their exact distances,
    /// nearest first.
    ///
    /// The index orders candidates by box distance, a lower bound of the
    /// exact distance; candidates are fetched in doubling batches until the
    /// `k`-th exact distance is no larger than that bound.
    pub fn nearest(&self, key: ComponentKey, p: &Point3<f64>, k: usize) -> Result<Vec<(ElementKey, f64)>> {
        let c = self.component_ref(key)?;
        let total = c.index.count();
        if k == 0 || total == 0 {
            return Ok(Vec::new());
        }
        let mut batch = k.min(total);
        loop {
            let candidates = c.index.nearest(batch, p);
            let bound = candidates.last().map_or(f64::INFINITY, |&(_, d)| d);
            let mut exact: Vec<(ElementKey, f64)> = candidates
                .iter()
                .filter_map(|&(e, _)| Some((e, self.shape_of(e)?.distance_to_point(p))))
                .collect();
            exact.sort_by(|a, b| a.1.total_cmp(&b.1));
            let settled = exact.len() >= k && exact[k - 1].1 <= bound;
            if settled || batch >= total {
                exact.truncate(k);
                return Ok(exact);
            }
            batch = (batch * 2).min(total);
        }
    }

    // =========================================================================
    // Net-wide variants
    // =========================================================================

    pub fn net_intersects_bounds(&self, bounds: &Bounds) -> Result<bool> {
        for &key in self.component_keys() {
            if self.intersects_bounds(key, bounds)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn net_intersects_line(&self, line: &Line) -> Result<bool> {
        for &key in self.component_keys() {
            if self.intersects_line(key, line)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn net_intersects_plane(&self, plane: &Plane) -> Result<bool> {
        for &key in self.component_keys() {
            if self.intersects_plane(key, plane)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn net_contains_point(&self, p: &Point3<f64>) -> Result<bool> {
        for &key in self.component_keys() {
            if self.contains_point(key, p)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns `true` if a single component covers the segment.
    pub fn net_contains_segment(&self, segment: &Segment) -> Result<bool> {
        for &key in self.component_keys() {
            if self.contains_segment(key, segment)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns `true` if a single component covers the triangle.
    pub fn net_contains_triangle(&self, triangle: &Triangle) -> Result<bool> {
        for &key in self.component_keys() {
            if self.contains_triangle(key, triangle)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns the `k` elements of the whole net closest to `p`.
    pub fn net_nearest(&self, p: &Point3<f64>, k: usize) -> Result<Vec<(ElementKey, f64)>> {
        let mut all = Vec::new();
        for &key in self.component_keys() {
            all.extend(self.nearest(key, p, k)?);
        }
        all.sort_by(|a, b| a.1.total_cmp(&b.1));
        all.truncate(k);
        Ok(all)
    }
}
