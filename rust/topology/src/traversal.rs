// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Graph walks over element adjacency.
//!
//! Walks are iterative and lazy. A [`Walk`] borrows the net and owns its
//! frontier and visited set; both are released when the iterator is dropped,
//! including when a caller stops early.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::error::Result;
use crate::keys::{ComponentKey, ElementKey};
use crate::net::Net;
use crate::spatial::SpatialIndex;

/// Visiting order of a [`Walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOrder {
    BreadthFirst,
    DepthFirst,
}

/// Iterator over the elements reachable from a start element through
/// neighbour links.
#[derive(Debug)]
pub struct Walk<'a> {
    net: &'a Net,
    order: WalkOrder,
    frontier: VecDeque<ElementKey>,
    visited: FxHashSet<ElementKey>,
    excluded: Option<ElementKey>,
}

impl<'a> Walk<'a> {
    fn new(net: &'a Net, start: ElementKey, order: WalkOrder, excluded: Option<ElementKey>) -> Self {
        let mut walk = Self {
            net,
            order,
            frontier: VecDeque::new(),
            visited: FxHashSet::default(),
            excluded,
        };
        if Some(start) != excluded && net.element(start).is_some() {
            walk.visited.insert(start);
            walk.frontier.push_back(start);
        }
        walk
    }

    /// `true` once `key` has been reached (it may not be yielded yet).
    pub fn has_reached(&self, key: ElementKey) -> bool {
        self.visited.contains(&key)
    }
}

impl Iterator for Walk<'_> {
    type Item = ElementKey;

    fn next(&mut self) -> Option<ElementKey> {
        let current = match self.order {
            WalkOrder::BreadthFirst => self.frontier.pop_front()?,
            WalkOrder::DepthFirst => self.frontier.pop_back()?,
        };
        if let Some(element) = self.net.element(current) {
            for (_, n) in element.neighbours() {
                if Some(n) != self.excluded && self.visited.insert(n) {
                    self.frontier.push_back(n);
                }
            }
        }
        Some(current)
    }
}

impl Net {
    /// Walks the elements reachable from `start`.
    pub fn walk(&self, start: ElementKey, order: WalkOrder) -> Walk<'_> {
        Walk::new(self, start, order, None)
    }

    /// Walks the elements reachable from `start` without passing through
    /// `excluded`.
    pub fn walk_excluding(&self, start: ElementKey, excluded: ElementKey, order: WalkOrder) -> Walk<'_> {
        Walk::new(self, start, order, Some(excluded))
    }

    /// `true` if `to` can be reached from `from`, optionally avoiding one
    /// element.
    pub fn is_reachable(&self, from: ElementKey, to: ElementKey, excluded: Option<ElementKey>) -> bool {
        let mut walk = Walk::new(self, from, WalkOrder::BreadthFirst, excluded);
        if walk.has_reached(to) {
            return true;
        }
        while walk.next().is_some() {
            if walk.has_reached(to) {
                return true;
            }
        }
        false
    }

    /// Splits a component into its linked pieces, each in walk order from
    /// its first element. The piece holding the entry comes first.
    pub fn connected_pieces(&self, component: ComponentKey) -> Result<Vec<Vec<ElementKey>>> {
        let c = self.component_ref(component)?;
        let mut keys = c.index.entries();
        if let Some(entry) = c.entry {
            if let Some(pos) = keys.iter().position(|&k| k == entry) {
                keys.swap(0, pos);
            }
        }

        let mut seen: FxHashSet<ElementKey> = FxHashSet::default();
        let mut pieces = Vec::new();
        for key in keys {
            if seen.contains(&key) {
                continue;
            }
            let piece: Vec<ElementKey> = self.walk(key, WalkOrder::BreadthFirst).collect();
            seen.extend(piece.iter().copied());
            pieces.push(piece);
        }
        Ok(pieces)
    }
}
