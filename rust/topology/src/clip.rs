// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convex clipping and intersection classification between simplices.
//!
//! Every simplex is the intersection of a few halfspaces, so the intersection
//! of two simplices is found by clipping one against the other's halfspaces
//! (Sutherland–Hodgman, with the tolerance as slack). The clipped point cloud
//! is then classified by the dimension of its affine hull.

use nalgebra::{Point3, Vector3};

use crate::bounds::Bounds;
use crate::epsilon::Epsilon;
use crate::error::Result;
use crate::geometry::{Segment, Shape, Simplex};

/// The set `normal · x <= offset`, with unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfSpace {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl HalfSpace {
    /// Halfspace bounded by the plane through `p` with outward `normal`.
    pub fn through(normal: Vector3<f64>, p: &Point3<f64>) -> Self {
        Self {
            normal,
            offset: normal.dot(&p.coords),
        }
    }

    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) - self.offset
    }

    pub fn contains(&self, p: &Point3<f64>, eps: &Epsilon) -> bool {
        self.distance(p) <= eps.value()
    }
}

/// Result of intersecting two convex shapes, by dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Intersection {
    Empty,
    Point(Point3<f64>),
    Segment(Segment),
    /// A planar patch with at least three non-collinear points.
    Planar(Vec<Point3<f64>>),
    Volume,
}

impl Intersection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Intersection::Empty)
    }
}

/// Clips a closed polygon (or a degenerate one: a point or a two-point
/// segment) against one halfspace.
pub fn clip_polygon(polygon: &[Point3<f64>], hs: &HalfSpace, eps: &Epsilon) -> Vec<Point3<f64>> {
    let n = polygon.len();
    let mut out = Vec::with_capacity(n + 2);
    for i in 0..n {
        let cur = polygon[i];
        let next = polygon[(i + 1) % n];
        let dc = hs.distance(&cur);
        let dn = hs.distance(&next);
        let cur_in = dc <= eps.value();
        let next_in = dn <= eps.value();
        if cur_in {
            out.push(cur);
        }
        if cur_in != next_in && (dc - dn).abs() > 0.0 {
            let t = dc / (dc - dn);
            if (0.0..=1.0).contains(&t) {
                out.push(cur + (next - cur) * t);
            }
        }
    }
    out
}

/// Clips a polygon against every halfspace in turn.
pub fn clip_by_all(polygon: &[Point3<f64>], halfspaces: &[HalfSpace], eps: &Epsilon) -> Vec<Point3<f64>> {
    let mut current = polygon.to_vec();
    for hs in halfspaces {
        if current.is_empty() {
            break;
        }
        current = clip_polygon(&current, hs, eps);
    }
    current
}

/// Intersection of two shapes of any kinds.
pub fn intersect(a: &Shape, b: &Shape, eps: &Epsilon) -> Result<Intersection> {
    let points = intersection_points(a, b, eps)?;
    Ok(classify(&points, eps))
}

fn intersection_points(a: &Shape, b: &Shape, eps: &Epsilon) -> Result<Vec<Point3<f64>>> {
    match (a, b) {
        (Shape::Tetrahedron(ta), Shape::Tetrahedron(tb)) => {
            let ha = a.halfspaces(eps)?;
            let hb = b.halfspaces(eps)?;
            let mut points = Vec::new();
            for face in ta.faces() {
                points.extend(clip_by_all(face.corners(), &hb, eps));
            }
            for face in tb.faces() {
                points.extend(clip_by_all(face.corners(), &ha, eps));
            }
            Ok(points)
        }
        (Shape::Tetrahedron(_), _) => {
            let ha = a.halfspaces(eps)?;
            Ok(clip_by_all(b.corners(), &ha, eps))
        }
        _ => {
            let hb = b.halfspaces(eps)?;
            Ok(clip_by_all(a.corners(), &hb, eps))
        }
    }
}

/// `true` if `shape` meets the closed box.
pub fn meets_bounds(shape: &Shape, bounds: &Bounds, eps: &Epsilon) -> bool {
    let (min, max) = (bounds.min(), bounds.max());
    let mut hs = Vec::with_capacity(6);
    for axis in [Vector3::x(), Vector3::y(), Vector3::z()] {
        hs.push(HalfSpace::through(axis, &max));
        hs.push(HalfSpace::through(-axis, &min));
    }
    match shape {
        Shape::Tetrahedron(t) => {
            t.faces()
                .iter()
                .any(|f| !clip_by_all(f.corners(), &hs, eps).is_empty())
                // no face crosses the box, so the box is inside or apart
                || t.contains_point(&bounds.center(), eps)
        }
        _ => !clip_by_all(shape.corners(), &hs, eps).is_empty(),
    }
}

/// Part of `segment` inside `shape`, as a parameter interval on the segment.
pub fn segment_overlap(segment: &Segment, shape: &Shape, eps: &Epsilon) -> Result<Option<(f64, f64)>> {
    let hs = shape.halfspaces(eps)?;
    let clipped = clip_by_all(segment.corners(), &hs, eps);
    if clipped.is_empty() {
        return Ok(None);
    }
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for p in &clipped {
        let t = segment.project(p);
        lo = lo.min(t);
        hi = hi.max(t);
    }
    Ok(Some((lo.max(0.0), hi.min(1.0))))
}

/// Area of the part of `polygon` inside `shape`. `polygon` must be planar.
pub fn planar_overlap_area(polygon: &[Point3<f64>], shape: &Shape, eps: &Epsilon) -> Result<f64> {
    let hs = shape.halfspaces(eps)?;
    let clipped = clip_by_all(polygon, &hs, eps);
    Ok(polygon_area(&clipped))
}

/// Area of a planar polygon given in boundary order.
pub fn polygon_area(points: &[Point3<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let p0 = points[0];
    let mut total = Vector3::zeros();
    for i in 1..points.len() - 1 {
        total += (points[i] - p0).cross(&(points[i + 1] - p0));
    }
    total.norm() * 0.5
}

/// Classifies a point cloud by the dimension of its affine hull.
pub fn classify(points: &[Point3<f64>], eps: &Epsilon) -> Intersection {
    let mut unique: Vec<Point3<f64>> = Vec::with_capacity(points.len());
    for p in points {
        if !unique.iter().any(|u| eps.points_eq(u, p)) {
            unique.push(*p);
        }
    }
    match unique.len() {
        0 => return Intersection::Empty,
        1 => return Intersection::Point(unique[0]),
        _ => {}
    }

    // farthest pair spans the cloud's main direction
    let (mut a, mut b, mut best) = (0, 0, -1.0);
    for i in 0..unique.len() {
        for j in (i + 1)..unique.len() {
            let d = (unique[j] - unique[i]).norm_squared();
            if d > best {
                best = d;
                a = i;
                b = j;
            }
        }
    }
    if eps.is_zero(best.sqrt()) {
        return Intersection::Point(unique[a]);
    }
    let axis = Segment::new(unique[a], unique[b]);
    let dir = axis.direction() / axis.length();

    let off_line = |p: &Point3<f64>| {
        let v = p - unique[a];
        (v - dir * v.dot(&dir)).norm()
    };
    let (c, off) = unique
        .iter()
        .enumerate()
        .map(|(i, p)| (i, off_line(p)))
        .fold((a, 0.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
    if eps.is_zero(off) {
        return Intersection::Segment(axis);
    }

    let normal = dir.cross(&(unique[c] - unique[a])).normalize();
    let planar = unique
        .iter()
        .all(|p| eps.is_zero(normal.dot(&(p - unique[a]))));
    if planar {
        Intersection::Planar(unique)
    } else {
        Intersection::Volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Tetrahedron, Triangle};

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Shape {
        Triangle::new(Point3::from(a), Point3::from(b), Point3::from(c)).into()
    }

    #[test]
    fn clip_polygon_halves_square() {
        let eps = Epsilon::default();
        let square = [p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 2.0, 0.0), p(0.0, 2.0, 0.0)];
        let hs = HalfSpace::through(Vector3::x(), &p(1.0, 0.0, 0.0));
        let clipped = clip_polygon(&square, &hs, &eps);
        assert!((polygon_area(&clipped) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn classify_dimensions() {
        let eps = Epsilon::default();
        assert_eq!(classify(&[], &eps), Intersection::Empty);
        assert!(matches!(classify(&[p(1.0, 1.0, 1.0), p(1.0, 1.0, 1.0)], &eps), Intersection::Point(_)));
        assert!(matches!(
            classify(&[p(0.0, 0.0, 0.0), p(0.5, 0.0, 0.0), p(1.0, 0.0, 0.0)], &eps),
            Intersection::Segment(_)
        ));
        assert!(matches!(
            classify(&[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)], &eps),
            Intersection::Planar(_)
        ));
        assert_eq!(
            classify(
                &[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)],
                &eps
            ),
            Intersection::Volume
        );
    }

    #[test]
    fn triangles_sharing_edge_meet_in_segment() {
        let eps = Epsilon::default();
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]);
        match intersect(&a, &b, &eps).unwrap() {
            Intersection::Segment(s) => assert!((s.length() - 2f64.sqrt()).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn triangles_sharing_corner_meet_in_point() {
        let eps = Epsilon::default();
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 1.0, 0.0]);
        match intersect(&a, &b, &eps).unwrap() {
            Intersection::Point(q) => assert!(eps.points_eq(&q, &p(1.0, 0.0, 0.0))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overlapping_coplanar_triangles_are_planar() {
        let eps = Epsilon::default();
        let a = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        let b = tri([0.5, 0.5, 0.0], [3.0, 0.5, 0.0], [0.5, 3.0, 0.0]);
        assert!(matches!(intersect(&a, &b, &eps).unwrap(), Intersection::Planar(_)));
    }

    #[test]
    fn crossing_triangles_meet_in_segment() {
        let eps = Epsilon::default();
        let a = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        let b = tri([0.5, 0.5, -1.0], [0.5, 0.5, 1.0], [1.5, 0.2, 0.0]);
        assert!(matches!(intersect(&a, &b, &eps).unwrap(), Intersection::Segment(_)));
    }

    #[test]
    fn disjoint_triangles() {
        let eps = Epsilon::default();
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]);
        assert!(intersect(&a, &b, &eps).unwrap().is_empty());
    }

    #[test]
    fn tetrahedra_sharing_face_meet_in_plane() {
        let eps = Epsilon::default();
        let a: Shape = Tetrahedron::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)).into();
        let b: Shape = Tetrahedron::new(p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0), p(1.0, 1.0, 1.0)).into();
        assert!(matches!(intersect(&a, &b, &eps).unwrap(), Intersection::Planar(_)));
    }

    #[test]
    fn overlapping_tetrahedra_have_volume() {
        let eps = Epsilon::default();
        let a: Shape = Tetrahedron::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)).into();
        let b: Shape = Tetrahedron::new(p(0.1, 0.1, 0.1), p(2.0, 0.0, 0.0), p(0.0, 2.0, 0.0), p(0.0, 0.0, 2.0)).into();
        assert_eq!(intersect(&a, &b, &eps).unwrap(), Intersection::Volume);
    }

    #[test]
    fn box_contact() {
        let eps = Epsilon::default();
        let t: Shape = Triangle::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)).into();
        let near = Bounds::new([0.4, 0.4, -1.0], [2.0, 2.0, 1.0]).unwrap();
        let apart = Bounds::new([0.6, 0.6, -1.0], [2.0, 2.0, 1.0]).unwrap();
        assert!(meets_bounds(&t, &near, &eps));
        assert!(!meets_bounds(&t, &apart, &eps));

        let tet: Shape =
            Tetrahedron::new(p(0.0, 0.0, 0.0), p(4.0, 0.0, 0.0), p(0.0, 4.0, 0.0), p(0.0, 0.0, 4.0)).into();
        let inner = Bounds::new([0.5; 3], [0.6; 3]).unwrap();
        assert!(meets_bounds(&tet, &inner, &eps));
    }

    #[test]
    fn segment_overlap_interval() {
        let eps = Epsilon::default();
        let t = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        let s = Segment::new(p(-1.0, 0.5, 0.0), p(3.0, 0.5, 0.0));
        let (lo, hi) = segment_overlap(&s, &t, &eps).unwrap().unwrap();
        assert!((lo - 0.25).abs() < 1e-9);
        assert!((hi - 0.625).abs() < 1e-9);
    }

    #[test]
    fn collinear_segments_overlap() {
        let eps = Epsilon::default();
        let a: Shape = Segment::new(p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0)).into();
        let b: Shape = Segment::new(p(1.0, 0.0, 0.0), p(3.0, 0.0, 0.0)).into();
        let c: Shape = Segment::new(p(2.0, 0.0, 0.0), p(3.0, 1.0, 0.0)).into();
        assert!(matches!(intersect(&a, &b, &eps).unwrap(), Intersection::Segment(_)));
        match intersect(&a, &c, &eps).unwrap() {
            Intersection::Point(q) => assert!(eps.points_eq(&q, &p(2.0, 0.0, 0.0))),
            other => panic!("unexpected {other:?}"),
        }
    }
}
