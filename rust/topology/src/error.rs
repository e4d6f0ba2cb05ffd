// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for component and net operations.
//!
//! Every variant is recovered at the boundary of the call that raised it:
//! either the whole operation took effect or nothing did. "Nothing found"
//! during a query is an empty result, never one of these.

use crate::keys::{ComponentId, ComponentKey, ElementId};
use crate::ElementKind;

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during topology operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A bounding box would have its maximum below its minimum, or a
    /// non-finite corner.
    #[error("invalid bounding box: min {min:?} max {max:?}")]
    InvalidBoundingBox { min: [f64; 3], max: [f64; 3] },

    /// A normalization or measure collapsed to zero within tolerance.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),

    /// A new element overlaps an existing one in a way that is neither a
    /// shared corner nor a shared edge/face.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The operation would disconnect a component, or a structural
    /// precondition does not hold.
    #[error("topology violation: {0}")]
    TopologyViolation(String),

    /// No geometrically equivalent element exists in the target.
    #[error("element not found")]
    ElementNotFound,

    /// No element carries the given id.
    #[error("element id not found: {0}")]
    ElementIdNotFound(ElementId),

    /// Component key not found in the net.
    #[error("component not found: {0:?}")]
    ComponentNotFound(ComponentKey),

    /// An element of the wrong kind was handed to a net.
    #[error("element kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: ElementKind,
        actual: ElementKind,
    },

    /// An explicit component id is below the net's counter.
    #[error("component id {requested} collides with counter {next}")]
    IdCollision {
        requested: ComponentId,
        next: ComponentId,
    },

    /// Tolerance must be finite and non-negative.
    #[error("invalid tolerance: {0}")]
    InvalidTolerance(f64),

    /// Configuration could not be parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),
}
