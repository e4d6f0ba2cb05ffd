// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerance-based comparison of coordinates, lengths, areas and volumes.
//!
//! Nothing in this crate compares floating-point geometry with `==`. Every
//! equality or ordering decision goes through an [`Epsilon`].

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default tolerance used by [`Epsilon::default`].
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// A tolerance comparator. `Copy`, so every holder owns an independent value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Epsilon {
    value: f64,
}

impl Epsilon {
    /// Creates a comparator. The tolerance must be finite and non-negative.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidTolerance(value));
        }
        Ok(Self { value })
    }

    /// The raw tolerance.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.value
    }

    pub fn less(&self, a: f64, b: f64) -> bool {
        a < b - self.value
    }

    pub fn less_eq(&self, a: f64, b: f64) -> bool {
        a <= b + self.value
    }

    pub fn greater(&self, a: f64, b: f64) -> bool {
        a > b + self.value
    }

    pub fn greater_eq(&self, a: f64, b: f64) -> bool {
        a >= b - self.value
    }

    pub fn is_zero(&self, a: f64) -> bool {
        a.abs() <= self.value
    }

    /// Component-wise equality of two points.
    pub fn points_eq(&self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        self.equal(a.x, b.x) && self.equal(a.y, b.y) && self.equal(a.z, b.z)
    }

    /// Clearance for probes that must end outside a region of size
    /// `extent`: a `fraction` of the extent (at least one unit), and always
    /// well beyond the tolerance.
    pub fn margin(&self, extent: f64, fraction: f64) -> f64 {
        (extent.max(1.0) * fraction).max(self.value * 4.0)
    }

    /// Normalizes `v`, failing when it collapses to zero.
    pub fn normalize(&self, v: &Vector3<f64>) -> Result<Vector3<f64>> {
        let len = v.norm();
        if self.is_zero(len) || len == 0.0 {
            return Err(Error::DegenerateGeometry("zero-length vector"));
        }
        Ok(v / len)
    }

    /// Sign of `a` with a dead zone of one tolerance around zero.
    pub fn sign(&self, a: f64) -> i8 {
        if self.is_zero(a) {
            0
        } else if a > 0.0 {
            1
        } else {
            -1
        }
    }
}

impl Default for Epsilon {
    fn default() -> Self {
        Self {
            value: DEFAULT_EPSILON,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_nan() {
        assert!(Epsilon::new(-1.0).is_err());
        assert!(Epsilon::new(f64::NAN).is_err());
        assert!(Epsilon::new(f64::INFINITY).is_err());
        assert!(Epsilon::new(0.0).is_ok());
    }

    #[test]
    fn predicates_use_tolerance() {
        let eps = Epsilon::new(1e-3).unwrap();
        assert!(eps.equal(1.0, 1.0005));
        assert!(!eps.equal(1.0, 1.01));
        assert!(!eps.less(1.0, 1.0005));
        assert!(eps.less(1.0, 1.01));
        assert!(eps.less_eq(1.0005, 1.0));
        assert!(eps.greater(1.01, 1.0));
        assert!(eps.greater_eq(0.9995, 1.0));
        assert!(eps.is_zero(-0.0009));
        assert_eq!(eps.sign(0.0009), 0);
        assert_eq!(eps.sign(-0.5), -1);
    }

    #[test]
    fn margin_clears_the_tolerance() {
        let eps = Epsilon::default();
        assert!((eps.margin(10.0, 1e-2) - 0.1).abs() < 1e-15);
        assert_eq!(eps.margin(0.0, 1e-2), 1e-2);
        let coarse = Epsilon::new(0.5).unwrap();
        assert_eq!(coarse.margin(10.0, 1e-2), 2.0);
    }

    #[test]
    fn copies_do_not_alias() {
        let a = Epsilon::new(0.5).unwrap();
        let mut b = a;
        assert_eq!(b, a);
        b = Epsilon::new(0.1).unwrap();
        assert_eq!(a.value(), 0.5);
        assert_eq!(b.value(), 0.1);
    }

    #[test]
    fn normalize_fails_on_zero_vector() {
        let eps = Epsilon::default();
        assert!(matches!(
            eps.normalize(&Vector3::zeros()),
            Err(Error::DegenerateGeometry(_))
        ));
        let n = eps.normalize(&Vector3::new(0.0, 3.0, 4.0)).unwrap();
        assert!(eps.equal(n.norm(), 1.0));
    }
}
