// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric primitives: segments, triangles, tetrahedra, lines and planes.
//!
//! The three simplex kinds share the [`Simplex`] trait, parameterized by the
//! number of corners (and therefore neighbour slots). [`Shape`] is the closed
//! set of variants a net stores.
//!
//! Corner `i` of a simplex is opposite neighbour slot `i`; the facet shared
//! through slot `i` is every corner except `i`, in ascending order.

use nalgebra::{Point3, Vector3};

use crate::bounds::Bounds;
use crate::clip::HalfSpace;
use crate::epsilon::Epsilon;
use crate::error::{Error, Result};
use crate::keys::ElementKind;

/// Shared behaviour of the simplex kinds.
pub trait Simplex {
    /// Number of corners, equal to the number of neighbour slots.
    const SLOTS: usize;
    const KIND: ElementKind;
    /// Corner pair swapped by [`Simplex::invert`]; the same pair of neighbour
    /// slots must be swapped alongside.
    const INVERSION: (usize, usize);

    fn corners(&self) -> &[Point3<f64>];

    fn corners_mut(&mut self) -> &mut [Point3<f64>];

    /// Length, area or volume.
    fn measure(&self) -> f64;

    /// Halfspaces whose intersection is this simplex, with outward normals.
    fn halfspaces(&self, eps: &Epsilon) -> Result<Vec<HalfSpace>>;

    /// Reverses the winding by swapping the [`Simplex::INVERSION`] corners.
    fn invert(&mut self) {
        let (a, b) = Self::INVERSION;
        self.corners_mut().swap(a, b);
    }

    fn bounds(&self) -> Result<Bounds> {
        Bounds::from_points(self.corners())
    }

    fn centroid(&self) -> Point3<f64> {
        let corners = self.corners();
        let sum = corners
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / corners.len() as f64)
    }

    /// Index of the corner equal to `p`, if any.
    fn corner_index(&self, p: &Point3<f64>, eps: &Epsilon) -> Option<usize> {
        self.corners().iter().position(|c| eps.points_eq(c, p))
    }

    fn has_corner(&self, p: &Point3<f64>, eps: &Epsilon) -> bool {
        self.corner_index(p, eps).is_some()
    }

    /// Corners of the facet opposite slot `slot`.
    fn facet(&self, slot: usize) -> Vec<Point3<f64>> {
        self.corners()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != slot)
            .map(|(_, p)| *p)
            .collect()
    }

    /// `true` if the simplex collapses (zero measure within tolerance).
    fn is_degenerate(&self, eps: &Epsilon) -> bool {
        eps.is_zero(self.measure())
    }

    /// `true` if `p` lies in the closed simplex.
    fn contains_point(&self, p: &Point3<f64>, eps: &Epsilon) -> bool {
        match self.halfspaces(eps) {
            Ok(hs) => hs.iter().all(|h| h.contains(p, eps)),
            Err(_) => false,
        }
    }
}

/// A straight segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    p: [Point3<f64>; 2],
}

impl Segment {
    pub fn new(p0: Point3<f64>, p1: Point3<f64>) -> Self {
        Self { p: [p0, p1] }
    }

    pub fn start(&self) -> Point3<f64> {
        self.p[0]
    }

    pub fn end(&self) -> Point3<f64> {
        self.p[1]
    }

    pub fn direction(&self) -> Vector3<f64> {
        self.p[1] - self.p[0]
    }

    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Point at parameter `t` (0 = start, 1 = end).
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.p[0] + self.direction() * t
    }

    /// Parameter of the orthogonal projection of `p` on the supporting line.
    pub fn project(&self, p: &Point3<f64>) -> f64 {
        let d = self.direction();
        let len_sq = d.norm_squared();
        if len_sq == 0.0 {
            return 0.0;
        }
        (p - self.p[0]).dot(&d) / len_sq
    }

    /// Euclidean distance from `p` to the closed segment.
    pub fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        let t = self.project(p).clamp(0.0, 1.0);
        (p - self.at(t)).norm()
    }
}

impl Simplex for Segment {
    const SLOTS: usize = 2;
    const KIND: ElementKind = ElementKind::Segment;
    const INVERSION: (usize, usize) = (0, 1);

    fn corners(&self) -> &[Point3<f64>] {
        &self.p
    }

    fn corners_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.p
    }

    fn measure(&self) -> f64 {
        self.length()
    }

    fn halfspaces(&self, eps: &Epsilon) -> Result<Vec<HalfSpace>> {
        let d = eps.normalize(&self.direction())?;
        let u = any_perpendicular(&d);
        let v = d.cross(&u);
        let a = self.p[0];
        let b = self.p[1];
        Ok(vec![
            HalfSpace::through(u, &a),
            HalfSpace::through(-u, &a),
            HalfSpace::through(v, &a),
            HalfSpace::through(-v, &a),
            HalfSpace::through(-d, &a),
            HalfSpace::through(d, &b),
        ])
    }

    fn contains_point(&self, p: &Point3<f64>, eps: &Epsilon) -> bool {
        eps.is_zero(self.distance_to_point(p))
    }
}

/// A triangle with counter-clockwise winding defining its normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    p: [Point3<f64>; 3],
}

impl Triangle {
    pub fn new(p0: Point3<f64>, p1: Point3<f64>, p2: Point3<f64>) -> Self {
        Self { p: [p0, p1, p2] }
    }

    /// Unnormalized normal, `(p1 - p0) × (p2 - p0)`.
    pub fn cross(&self) -> Vector3<f64> {
        (self.p[1] - self.p[0]).cross(&(self.p[2] - self.p[0]))
    }

    /// Unit normal following the right-hand rule on the winding.
    pub fn normal(&self, eps: &Epsilon) -> Result<Vector3<f64>> {
        eps.normalize(&self.cross())
    }

    pub fn area(&self) -> f64 {
        self.cross().norm() * 0.5
    }

    pub fn plane(&self, eps: &Epsilon) -> Result<Plane> {
        Ok(Plane::from_point_normal(&self.p[0], &self.normal(eps)?))
    }

    /// Edge opposite corner `i`, traversed in winding order.
    pub fn edge(&self, i: usize) -> Segment {
        Segment::new(self.p[(i + 1) % 3], self.p[(i + 2) % 3])
    }

    pub fn edges(&self) -> [Segment; 3] {
        [self.edge(0), self.edge(1), self.edge(2)]
    }

    /// `true` if `p` lies on one of the three edges.
    pub fn on_border(&self, p: &Point3<f64>, eps: &Epsilon) -> bool {
        self.edges()
            .iter()
            .any(|e| eps.is_zero(e.distance_to_point(p)))
    }

    /// Euclidean distance from `p` to the closed triangle.
    pub fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        let n = self.cross();
        let len = n.norm();
        let edge_distance = || {
            self.edges()
                .iter()
                .map(|e| e.distance_to_point(p))
                .fold(f64::INFINITY, f64::min)
        };
        if len == 0.0 {
            return edge_distance();
        }
        let n = n / len;
        let height = n.dot(&(p - self.p[0]));
        let foot = p - n * height;
        let inside = (0..3).all(|i| {
            let a = self.p[i];
            let b = self.p[(i + 1) % 3];
            (b - a).cross(&(foot - a)).dot(&n) >= 0.0
        });
        if inside {
            height.abs()
        } else {
            edge_distance()
        }
    }

    /// Intersection of the closed segment `[a, b]` with this triangle when it
    /// is a single point (Möller–Trumbore). Segments parallel to the plane
    /// yield `None`, even when they lie inside it.
    pub fn segment_hit(&self, a: &Point3<f64>, b: &Point3<f64>, eps: &Epsilon) -> Option<SegmentHit> {
        let dir = b - a;
        let len = dir.norm();
        if len == 0.0 {
            return None;
        }
        let edge1 = self.p[1] - self.p[0];
        let edge2 = self.p[2] - self.p[0];

        let h = dir.cross(&edge2);
        let det = edge1.dot(&h);
        let normal_len = edge1.cross(&edge2).norm();

        // |det| = |dir| * |n| * |cos|; parallel when the cosine is within tolerance
        if normal_len == 0.0 || eps.is_zero(det / (len * normal_len)) {
            return None;
        }

        let f = 1.0 / det;
        let s = a - self.p[0];
        let u = f * s.dot(&h);
        let q = s.cross(&edge1);
        let v = f * dir.dot(&q);
        let t = f * edge2.dot(&q);

        let point = a + dir * t;
        // Parameter slack expressed in length units along the segment.
        let t_slack = eps.value() / len;
        if t < -t_slack || t > 1.0 + t_slack {
            return None;
        }
        let inside = (u >= 0.0 && v >= 0.0 && u + v <= 1.0) || self.on_border(&point, eps);
        if !inside {
            return None;
        }
        Some(SegmentHit { point, t })
    }
}

impl Simplex for Triangle {
    const SLOTS: usize = 3;
    const KIND: ElementKind = ElementKind::Triangle;
    const INVERSION: (usize, usize) = (1, 2);

    fn corners(&self) -> &[Point3<f64>] {
        &self.p
    }

    fn corners_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.p
    }

    fn measure(&self) -> f64 {
        self.area()
    }

    fn halfspaces(&self, eps: &Epsilon) -> Result<Vec<HalfSpace>> {
        let n = self.normal(eps)?;
        let mut hs = Vec::with_capacity(5);
        hs.push(HalfSpace::through(n, &self.p[0]));
        hs.push(HalfSpace::through(-n, &self.p[0]));
        for i in 0..3 {
            let a = self.p[(i + 1) % 3];
            let b = self.p[(i + 2) % 3];
            let mut m = eps.normalize(&n.cross(&(b - a)))?;
            if m.dot(&(self.p[i] - a)) > 0.0 {
                m = -m;
            }
            hs.push(HalfSpace::through(m, &a));
        }
        Ok(hs)
    }
}

/// A tetrahedron. Positive orientation means
/// `(p1 - p0) · ((p2 - p0) × (p3 - p0)) > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tetrahedron {
    p: [Point3<f64>; 4],
}

impl Tetrahedron {
    pub fn new(p0: Point3<f64>, p1: Point3<f64>, p2: Point3<f64>, p3: Point3<f64>) -> Self {
        Self {
            p: [p0, p1, p2, p3],
        }
    }

    pub fn signed_volume(&self) -> f64 {
        let a = self.p[1] - self.p[0];
        let b = self.p[2] - self.p[0];
        let c = self.p[3] - self.p[0];
        a.dot(&b.cross(&c)) / 6.0
    }

    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Face opposite corner `i`, wound so its normal points away from that
    /// corner when the tetrahedron is positively oriented.
    pub fn face(&self, i: usize) -> Triangle {
        let f = self.facet(i);
        if i % 2 == 0 {
            Triangle::new(f[0], f[1], f[2])
        } else {
            Triangle::new(f[0], f[2], f[1])
        }
    }

    pub fn faces(&self) -> [Triangle; 4] {
        [self.face(0), self.face(1), self.face(2), self.face(3)]
    }

    /// Euclidean distance from `p` to the solid tetrahedron.
    pub fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        let sign = if self.signed_volume() < 0.0 { -1.0 } else { 1.0 };
        let faces = self.faces();
        let inside = faces
            .iter()
            .all(|f| sign * f.cross().dot(&(p - f.corners()[0])) <= 0.0);
        if inside {
            return 0.0;
        }
        faces
            .iter()
            .map(|f| f.distance_to_point(p))
            .fold(f64::INFINITY, f64::min)
    }
}

impl Simplex for Tetrahedron {
    const SLOTS: usize = 4;
    const KIND: ElementKind = ElementKind::Tetrahedron;
    const INVERSION: (usize, usize) = (2, 3);

    fn corners(&self) -> &[Point3<f64>] {
        &self.p
    }

    fn corners_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.p
    }

    fn measure(&self) -> f64 {
        self.volume()
    }

    fn halfspaces(&self, eps: &Epsilon) -> Result<Vec<HalfSpace>> {
        if self.is_degenerate(eps) {
            return Err(Error::DegenerateGeometry("flat tetrahedron"));
        }
        let mut hs = Vec::with_capacity(4);
        for i in 0..4 {
            let f = self.facet(i);
            let mut n = eps.normalize(&(f[1] - f[0]).cross(&(f[2] - f[0])))?;
            if n.dot(&(self.p[i] - f[0])) > 0.0 {
                n = -n;
            }
            hs.push(HalfSpace::through(n, &f[0]));
        }
        Ok(hs)
    }
}

/// Where a segment crosses a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub point: Point3<f64>,
    /// Segment parameter of the hit (0 = start, 1 = end).
    pub t: f64,
}

/// An infinite straight line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    origin: Point3<f64>,
    direction: Vector3<f64>,
}

impl Line {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>, eps: &Epsilon) -> Result<Self> {
        Ok(Self {
            origin,
            direction: eps.normalize(&direction)?,
        })
    }

    pub fn through(a: &Point3<f64>, b: &Point3<f64>, eps: &Epsilon) -> Result<Self> {
        Self::new(*a, b - a, eps)
    }

    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    pub fn direction(&self) -> Vector3<f64> {
        self.direction
    }

    /// The part of the line inside `bounds` (slab method), or `None` when the
    /// line misses the box.
    pub fn clip_to_bounds(&self, bounds: &Bounds) -> Option<Segment> {
        let min = bounds.min();
        let max = bounds.max();
        let mut t0 = f64::NEG_INFINITY;
        let mut t1 = f64::INFINITY;
        for axis in 0..3 {
            let o = self.origin[axis];
            let d = self.direction[axis];
            // exact: a tiny non-zero component still gives finite slab bounds
            if d == 0.0 {
                if o < min[axis] || o > max[axis] {
                    return None;
                }
                continue;
            }
            let mut ta = (min[axis] - o) / d;
            let mut tb = (max[axis] - o) / d;
            if ta > tb {
                std::mem::swap(&mut ta, &mut tb);
            }
            t0 = t0.max(ta);
            t1 = t1.min(tb);
            if t0 > t1 {
                return None;
            }
        }
        Some(Segment::new(
            self.origin + self.direction * t0,
            self.origin + self.direction * t1,
        ))
    }
}

/// A plane `normal · x = offset` with unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vector3<f64>,
    offset: f64,
}

impl Plane {
    /// `normal` is expected to be unit length.
    pub fn from_point_normal(p: &Point3<f64>, normal: &Vector3<f64>) -> Self {
        Self {
            normal: *normal,
            offset: normal.dot(&p.coords),
        }
    }

    pub fn new(p: &Point3<f64>, normal: &Vector3<f64>, eps: &Epsilon) -> Result<Self> {
        Ok(Self::from_point_normal(p, &eps.normalize(normal)?))
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) - self.offset
    }

    /// `true` if the corners do not all lie strictly on one side.
    pub fn touches(&self, corners: &[Point3<f64>], eps: &Epsilon) -> bool {
        let mut below = false;
        let mut above = false;
        for p in corners {
            match eps.sign(self.signed_distance(p)) {
                0 => return true,
                s if s < 0 => below = true,
                _ => above = true,
            }
        }
        below && above
    }
}

/// The element shapes a net can hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Segment(Segment),
    Triangle(Triangle),
    Tetrahedron(Tetrahedron),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Shape::Segment($s) => $body,
            Shape::Triangle($s) => $body,
            Shape::Tetrahedron($s) => $body,
        }
    };
}

impl Shape {
    pub fn kind(&self) -> ElementKind {
        match self {
            Shape::Segment(_) => ElementKind::Segment,
            Shape::Triangle(_) => ElementKind::Triangle,
            Shape::Tetrahedron(_) => ElementKind::Tetrahedron,
        }
    }

    pub fn corners(&self) -> &[Point3<f64>] {
        dispatch!(self, s => s.corners())
    }

    pub fn measure(&self) -> f64 {
        dispatch!(self, s => s.measure())
    }

    pub fn bounds(&self) -> Result<Bounds> {
        dispatch!(self, s => s.bounds())
    }

    pub fn centroid(&self) -> Point3<f64> {
        dispatch!(self, s => s.centroid())
    }

    pub fn halfspaces(&self, eps: &Epsilon) -> Result<Vec<HalfSpace>> {
        dispatch!(self, s => s.halfspaces(eps))
    }

    pub fn invert(&mut self) {
        dispatch!(self, s => s.invert())
    }

    /// Slot pair permuted alongside [`Shape::invert`].
    pub fn inversion(&self) -> (usize, usize) {
        match self {
            Shape::Segment(_) => Segment::INVERSION,
            Shape::Triangle(_) => Triangle::INVERSION,
            Shape::Tetrahedron(_) => Tetrahedron::INVERSION,
        }
    }

    pub fn corner_index(&self, p: &Point3<f64>, eps: &Epsilon) -> Option<usize> {
        dispatch!(self, s => s.corner_index(p, eps))
    }

    pub fn has_corner(&self, p: &Point3<f64>, eps: &Epsilon) -> bool {
        self.corner_index(p, eps).is_some()
    }

    pub fn facet(&self, slot: usize) -> Vec<Point3<f64>> {
        dispatch!(self, s => s.facet(slot))
    }

    pub fn is_degenerate(&self, eps: &Epsilon) -> bool {
        dispatch!(self, s => s.is_degenerate(eps))
    }

    pub fn contains_point(&self, p: &Point3<f64>, eps: &Epsilon) -> bool {
        dispatch!(self, s => s.contains_point(p, eps))
    }

    pub fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        dispatch!(self, s => s.distance_to_point(p))
    }

    /// Same kind and the same corner set, in any order.
    pub fn is_equivalent(&self, other: &Shape, eps: &Epsilon) -> bool {
        self.kind() == other.kind()
            && self
                .corners()
                .iter()
                .all(|c| other.has_corner(c, eps))
            && other
                .corners()
                .iter()
                .all(|c| self.has_corner(c, eps))
    }

    /// Number of corners of `self` that are also corners of `other`.
    pub fn shared_corner_count(&self, other: &Shape, eps: &Epsilon) -> usize {
        self.corners()
            .iter()
            .filter(|c| other.has_corner(c, eps))
            .count()
    }

    /// Slot whose facet is exactly `points` (in any order), if any.
    pub fn slot_for_facet(&self, points: &[Point3<f64>], eps: &Epsilon) -> Option<usize> {
        let n = self.corners().len();
        if points.len() + 1 != n {
            return None;
        }
        let mut used = [false; 4];
        for p in points {
            let i = self.corner_index(p, eps)?;
            if used[i] {
                return None;
            }
            used[i] = true;
        }
        (0..n).find(|i| !used[*i])
    }

    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Shape::Segment(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_triangle(&self) -> Option<&Triangle> {
        match self {
            Shape::Triangle(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tetrahedron(&self) -> Option<&Tetrahedron> {
        match self {
            Shape::Tetrahedron(t) => Some(t),
            _ => None,
        }
    }

    /// `true` if the plane passes through or between the corners.
    pub fn intersects_plane(&self, plane: &Plane, eps: &Epsilon) -> bool {
        plane.touches(self.corners(), eps)
    }
}

impl From<Segment> for Shape {
    fn from(s: Segment) -> Self {
        Shape::Segment(s)
    }
}

impl From<Triangle> for Shape {
    fn from(t: Triangle) -> Self {
        Shape::Triangle(t)
    }
}

impl From<Tetrahedron> for Shape {
    fn from(t: Tetrahedron) -> Self {
        Shape::Tetrahedron(t)
    }
}

/// A unit vector perpendicular to the unit vector `d`.
fn any_perpendicular(d: &Vector3<f64>) -> Vector3<f64> {
    let axis = if d.x.abs() <= d.y.abs() && d.x.abs() <= d.z.abs() {
        Vector3::x()
    } else if d.y.abs() <= d.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    d.cross(&axis).normalize()
}
