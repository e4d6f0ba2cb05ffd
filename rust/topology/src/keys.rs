// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key and identifier types for arena-based storage.
//!
//! Two kinds of handles exist side by side:
//!
//! - **Keys** ([`ElementKey`], [`ComponentKey`]) are `slotmap` generational
//!   indices into the arenas owned by a [`Net`](crate::Net). They are cheap,
//!   stay valid after unrelated removals, and are what adjacency links store.
//! - **Ids** ([`ElementId`], [`ComponentId`]) are monotonic numbers handed out
//!   by the net's counters. They are never reused and survive splitting a net,
//!   which keys do not.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Key for an element (segment, triangle or tetrahedron) in a net.
    pub struct ElementKey;

    /// Key for a component in a net.
    pub struct ComponentKey;
}

/// Net-unique, monotonic element identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// Net-unique, monotonic component identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Discriminant for the element kinds a net can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Segment = 1,
    Triangle = 2,
    Tetrahedron = 3,
}

impl ElementKind {
    /// Number of neighbour slots (one per corner).
    pub fn slot_count(&self) -> usize {
        match self {
            ElementKind::Segment => 2,
            ElementKind::Triangle => 3,
            ElementKind::Tetrahedron => 4,
        }
    }

    /// Topological dimension of the element.
    pub fn dimension(&self) -> usize {
        *self as usize
    }

    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Segment => "Segment",
            ElementKind::Triangle => "Triangle",
            ElementKind::Tetrahedron => "Tetrahedron",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
