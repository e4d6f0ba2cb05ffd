// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned minimum bounding boxes.

use nalgebra::{Point3, Vector3};
use rstar::AABB;
use serde::{Deserialize, Serialize};

use crate::epsilon::Epsilon;
use crate::error::{Error, Result};

/// An axis-aligned bounding box.
///
/// Zero extent along an axis is allowed (a triangle in the XY plane has a flat
/// box). A maximum below its minimum is not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min: [f64; 3],
    max: [f64; 3],
}

impl Bounds {
    /// Creates a box, rejecting inverted or non-finite corners.
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Result<Self> {
        for axis in 0..3 {
            if !min[axis].is_finite() || !max[axis].is_finite() || max[axis] < min[axis] {
                return Err(Error::InvalidBoundingBox { min, max });
            }
        }
        Ok(Self { min, max })
    }

    /// The smallest box enclosing all `points`.
    pub fn from_points<'a, I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for p in points {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Self::new(min, max)
    }

    /// A zero-extent box at `p`.
    pub fn from_point(p: &Point3<f64>) -> Self {
        let c = [p.x, p.y, p.z];
        Self { min: c, max: c }
    }

    pub fn min(&self) -> Point3<f64> {
        Point3::from(self.min)
    }

    pub fn max(&self) -> Point3<f64> {
        Point3::from(self.max)
    }

    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        )
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vector3<f64> {
        self.max() - self.min()
    }

    /// Length of the main diagonal.
    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..3 {
            min[axis] = min[axis].min(other.min[axis]);
            max[axis] = max[axis].max(other.max[axis]);
        }
        Bounds { min, max }
    }

    /// Grows the box by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Bounds {
        let margin = margin.max(0.0);
        Bounds {
            min: [self.min[0] - margin, self.min[1] - margin, self.min[2] - margin],
            max: [self.max[0] + margin, self.max[1] + margin, self.max[2] + margin],
        }
    }

    /// `true` if the boxes overlap or touch within tolerance.
    pub fn intersects(&self, other: &Bounds, eps: &Epsilon) -> bool {
        (0..3).all(|axis| {
            eps.less_eq(self.min[axis], other.max[axis]) && eps.less_eq(other.min[axis], self.max[axis])
        })
    }

    /// `true` if `p` lies inside or on the box within tolerance.
    pub fn contains_point(&self, p: &Point3<f64>, eps: &Epsilon) -> bool {
        (0..3).all(|axis| eps.less_eq(self.min[axis], p[axis]) && eps.less_eq(p[axis], self.max[axis]))
    }

    /// `true` if `other` lies entirely inside this box within tolerance.
    pub fn contains_bounds(&self, other: &Bounds, eps: &Epsilon) -> bool {
        (0..3).all(|axis| {
            eps.less_eq(self.min[axis], other.min[axis]) && eps.less_eq(other.max[axis], self.max[axis])
        })
    }

    pub(crate) fn to_aabb(self) -> AABB<[f64; 3]> {
        AABB::from_corners(self.min, self.max)
    }

    pub(crate) fn from_aabb(aabb: &AABB<[f64; 3]>) -> Result<Bounds> {
        Bounds::new(aabb.lower(), aabb.upper())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_box() {
        let err = Bounds::new([0.0, 0.0, 0.0], [1.0, -1.0, 1.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidBoundingBox { .. }));
        assert!(Bounds::new([0.0; 3], [f64::NAN, 1.0, 1.0]).is_err());
    }

    #[test]
    fn flat_box_is_legal() {
        let b = Bounds::new([0.0, 0.0, 0.0], [1.0, 1.0, 0.0]).unwrap();
        assert_eq!(b.size().z, 0.0);
    }

    #[test]
    fn from_points_and_center() {
        let pts = [
            Point3::new(1.0, -2.0, 0.0),
            Point3::new(3.0, 2.0, 4.0),
            Point3::new(2.0, 0.0, 1.0),
        ];
        let b = Bounds::from_points(pts.iter()).unwrap();
        assert_eq!(b.min(), Point3::new(1.0, -2.0, 0.0));
        assert_eq!(b.max(), Point3::new(3.0, 2.0, 4.0));
        assert_eq!(b.center(), Point3::new(2.0, 0.0, 2.0));
    }

    #[test]
    fn from_no_points_is_invalid() {
        let empty: [Point3<f64>; 0] = [];
        assert!(Bounds::from_points(empty.iter()).is_err());
    }

    #[test]
    fn touching_boxes_intersect() {
        let eps = Epsilon::default();
        let a = Bounds::new([0.0; 3], [1.0; 3]).unwrap();
        let b = Bounds::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]).unwrap();
        let c = Bounds::new([1.5, 0.0, 0.0], [2.0, 1.0, 1.0]).unwrap();
        assert!(a.intersects(&b, &eps));
        assert!(!a.intersects(&c, &eps));
        assert!(a.union(&c).contains_bounds(&b, &eps));
    }

    #[test]
    fn contains_point_on_face() {
        let eps = Epsilon::default();
        let a = Bounds::new([0.0; 3], [1.0; 3]).unwrap();
        assert!(a.contains_point(&Point3::new(1.0, 0.5, 0.0), &eps));
        assert!(!a.contains_point(&Point3::new(1.1, 0.5, 0.0), &eps));
    }
}
