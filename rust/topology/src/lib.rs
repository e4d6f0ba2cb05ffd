// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Geostore Topology
//!
//! Topological mesh components for an embedded geometric store.
//!
//! A [`Net`] holds same-kind elements (segments, triangles or tetrahedra)
//! grouped into components. Each component is backed by an R*-tree range
//! index and keeps a neighbour graph between elements sharing a facet: the
//! endpoint of a segment, the edge of a triangle, the face of a
//! tetrahedron. On top of that graph the crate derives orientation,
//! vertex/edge/face counts, Euler characteristic and closure, and answers
//! measure, intersection and containment queries.
//!
//! Elements and components live in slot-map arenas and refer to each other
//! through keys, so adjacency has no reference cycles. All geometric
//! comparisons go through one [`Epsilon`] tolerance.
//!
//! ## Modules
//!
//! - [`geometry`], [`clip`]: simplices, lines, planes and convex clipping
//! - [`spatial`]: the range index and the vertex welder
//! - [`net`], [`element`], [`component`]: the arenas and their records
//! - [`hull`]: closed triangle surfaces and point-in-solid tests
//! - [`builders`]: constructing nets from coordinate arrays
//!
//! ## Example
//!
//! ```
//! use geostore_topology::{box_surface, ClosedHull, ElementKind, NetBuilder};
//! use nalgebra::Point3;
//!
//! let net = NetBuilder::new(ElementKind::Triangle)
//!     .component(box_surface([0.0; 3], [1.0; 3]))
//!     .build()?;
//! let key = net.component_keys()[0];
//! let mut hull = ClosedHull::new(net)?;
//! assert!((hull.volume(key)? - 1.0).abs() < 1e-9);
//! assert!(hull.contains_inside(key, &Point3::new(0.5, 0.5, 0.5), true)?);
//! # Ok::<(), geostore_topology::Error>(())
//! ```

pub mod bounds;
pub mod builders;
pub mod clip;
pub mod component;
pub mod config;
mod construction;
pub mod element;
pub mod epsilon;
pub mod error;
pub mod geometry;
pub mod hull;
pub mod keys;
mod mutation;
pub mod net;
mod orientation;
mod query;
mod solid;
pub mod spatial;
mod statistics;
mod transform;
pub mod traversal;

pub use bounds::Bounds;
pub use builders::{box_solid, box_surface, NetBuilder};
pub use clip::Intersection;
pub use component::Component;
pub use config::Config;
pub use element::Element;
pub use epsilon::Epsilon;
pub use error::{Error, Result};
pub use geometry::{Line, Plane, Segment, SegmentHit, Shape, Simplex, Tetrahedron, Triangle};
pub use hull::ClosedHull;
pub use keys::{ComponentId, ComponentKey, ElementId, ElementKey, ElementKind};
pub use net::{DetachedComponent, Net};
pub use spatial::{IndexEntry, PointWelder, RTreeIndex, SpatialIndex};
pub use traversal::{Walk, WalkOrder};
