// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial indexing for elements and vertices.
//!
//! Two structures live here:
//!
//! - [`RTreeIndex`], an R*-tree over element bounding boxes implementing the
//!   [`SpatialIndex`] range-query interface every component is backed by.
//! - [`PointWelder`], a grid-based spatial hash that identifies vertices
//!   within tolerance. Statistics use it to count distinct vertices and edges.

use nalgebra::Point3;
use rstar::{Envelope, PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;

use crate::bounds::Bounds;
use crate::epsilon::Epsilon;

/// Range-query interface over keyed bounding boxes.
pub trait SpatialIndex<K> {
    fn insert(&mut self, key: K, bounds: Bounds);

    /// Removes `key`, stored under `bounds`. Returns `false` if absent.
    fn remove(&mut self, key: K, bounds: &Bounds) -> bool;

    /// Keys whose box intersects `bounds`.
    fn intersects(&self, bounds: &Bounds) -> Vec<K>;

    /// Keys whose box contains `p`.
    fn contains(&self, p: &Point3<f64>) -> Vec<K>;

    /// Up to `k` keys ordered by box distance to `p`, with that distance.
    fn nearest(&self, k: usize, p: &Point3<f64>) -> Vec<(K, f64)>;

    fn entries(&self) -> Vec<K>;

    /// Aggregate box of every entry, `None` when empty.
    fn bounding_box(&self) -> Option<Bounds>;

    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// A key stored in the tree together with its envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry<K> {
    pub key: K,
    envelope: AABB<[f64; 3]>,
}

impl<K> IndexEntry<K> {
    pub fn new(key: K, bounds: Bounds) -> Self {
        Self {
            key,
            envelope: bounds.to_aabb(),
        }
    }
}

impl<K> RTreeObject for IndexEntry<K> {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl<K> PointDistance for IndexEntry<K> {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        self.envelope.distance_2(point)
    }

    fn contains_point(&self, point: &[f64; 3]) -> bool {
        self.envelope.contains_point(point)
    }
}

/// R*-tree index. Query boxes are grown by `slack` so that elements touching
/// within tolerance are reported.
#[derive(Clone)]
pub struct RTreeIndex<K> {
    tree: RTree<IndexEntry<K>>,
    slack: f64,
}

impl<K> RTreeIndex<K>
where
    K: Copy + PartialEq,
{
    pub fn new(slack: f64) -> Self {
        Self {
            tree: RTree::new(),
            slack: slack.max(0.0),
        }
    }

    /// Builds a balanced tree in one pass.
    pub fn bulk_load(entries: Vec<IndexEntry<K>>, slack: f64) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
            slack: slack.max(0.0),
        }
    }

    fn query_box(&self, bounds: &Bounds) -> AABB<[f64; 3]> {
        bounds.expanded(self.slack).to_aabb()
    }
}

impl<K> std::fmt::Debug for RTreeIndex<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RTreeIndex")
            .field("size", &self.tree.size())
            .field("slack", &self.slack)
            .finish()
    }
}

impl<K> SpatialIndex<K> for RTreeIndex<K>
where
    K: Copy + PartialEq,
{
    fn insert(&mut self, key: K, bounds: Bounds) {
        self.tree.insert(IndexEntry::new(key, bounds));
    }

    fn remove(&mut self, key: K, bounds: &Bounds) -> bool {
        self.tree.remove(&IndexEntry::new(key, *bounds)).is_some()
    }

    fn intersects(&self, bounds: &Bounds) -> Vec<K> {
        let query = self.query_box(bounds);
        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(|e| e.key)
            .collect()
    }

    fn contains(&self, p: &Point3<f64>) -> Vec<K> {
        let query = self.query_box(&Bounds::from_point(p));
        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(|e| e.key)
            .collect()
    }

    fn nearest(&self, k: usize, p: &Point3<f64>) -> Vec<(K, f64)> {
        let query = [p.x, p.y, p.z];
        self.tree
            .nearest_neighbor_iter(&query)
            .take(k)
            .map(|e| (e.key, e.envelope.distance_2(&query).sqrt()))
            .collect()
    }

    fn entries(&self) -> Vec<K> {
        self.tree.iter().map(|e| e.key).collect()
    }

    fn bounding_box(&self) -> Option<Bounds> {
        let mut iter = self.tree.iter();
        let first = iter.next()?.envelope;
        let merged = iter.fold(first, |acc, e| acc.merged(&e.envelope));
        Bounds::from_aabb(&merged).ok()
    }

    fn count(&self) -> usize {
        self.tree.size()
    }
}

/// A spatial hash grid assigning one index to every cluster of points equal
/// within tolerance, axis by axis, as [`Epsilon::points_eq`] compares them.
///
/// The grid divides space into cubic cells of side `tolerance`; a lookup
/// checks the 3x3x3 neighbourhood of the query cell.
#[derive(Debug)]
pub struct PointWelder {
    cell_size: f64,
    eps: Epsilon,
    grid: FxHashMap<(i64, i64, i64), Vec<usize>>,
    points: Vec<Point3<f64>>,
}

impl PointWelder {
    pub fn new(eps: Epsilon) -> Self {
        Self {
            cell_size: eps.value().max(1e-12),
            eps,
            grid: FxHashMap::default(),
            points: Vec::new(),
        }
    }

    /// Returns the index of a welded point within tolerance of `p`, adding
    /// `p` as a new one if none exists.
    pub fn weld(&mut self, p: &Point3<f64>) -> usize {
        if let Some(existing) = self.find(p) {
            return existing;
        }
        let index = self.points.len();
        self.points.push(*p);
        let cell = self.cell_coords(p);
        self.grid.entry(cell).or_default().push(index);
        index
    }

    /// Index of a welded point within tolerance of `p`.
    pub fn find(&self, p: &Point3<f64>) -> Option<usize> {
        let (cx, cy, cz) = self.cell_coords(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(indices) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &i in indices {
                        if self.eps.points_eq(&self.points[i], p) {
                            return Some(i);
                        }
                    }
                }
            }
        }
        None
    }

    /// Number of distinct points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn cell_coords(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(min: f64, max: f64) -> Bounds {
        Bounds::new([min; 3], [max; 3]).unwrap()
    }

    #[test]
    fn insert_query_remove() {
        let mut index: RTreeIndex<u32> = RTreeIndex::new(1e-9);
        index.insert(1, cube(0.0, 1.0));
        index.insert(2, cube(2.0, 3.0));
        index.insert(3, cube(0.5, 2.5));
        assert_eq!(index.count(), 3);

        let mut hits = index.intersects(&cube(0.9, 1.1));
        hits.sort();
        assert_eq!(hits, vec![1, 3]);

        assert!(index.remove(3, &cube(0.5, 2.5)));
        assert!(!index.remove(3, &cube(0.5, 2.5)));
        assert_eq!(index.intersects(&cube(0.9, 1.1)), vec![1]);
    }

    #[test]
    fn touching_boxes_are_reported() {
        let mut index: RTreeIndex<u32> = RTreeIndex::new(1e-9);
        index.insert(1, cube(0.0, 1.0));
        assert_eq!(index.intersects(&cube(1.0, 2.0)), vec![1]);
        assert_eq!(index.contains(&Point3::new(1.0, 1.0, 1.0)), vec![1]);
        assert!(index.contains(&Point3::new(1.5, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn bulk_load_and_bounding_box() {
        let entries = vec![
            IndexEntry::new(1u32, cube(0.0, 1.0)),
            IndexEntry::new(2u32, cube(4.0, 5.0)),
        ];
        let index = RTreeIndex::bulk_load(entries, 0.0);
        let bb = index.bounding_box().unwrap();
        assert_eq!(bb.min(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bb.max(), Point3::new(5.0, 5.0, 5.0));

        let empty: RTreeIndex<u32> = RTreeIndex::new(0.0);
        assert!(empty.bounding_box().is_none());
        assert!(empty.is_empty());
    }

    #[test]
    fn nearest_orders_by_distance() {
        let mut index: RTreeIndex<u32> = RTreeIndex::new(0.0);
        index.insert(1, cube(0.0, 1.0));
        index.insert(2, cube(4.0, 5.0));
        let near = index.nearest(2, &Point3::new(3.0, 4.5, 4.5));
        assert_eq!(near[0].0, 2);
        assert_eq!(near[1].0, 1);
        assert!((near[0].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn welder_merges_within_tolerance() {
        let mut welder = PointWelder::new(Epsilon::new(1e-3).unwrap());
        let a = welder.weld(&Point3::new(0.0, 0.0, 0.0));
        let b = welder.weld(&Point3::new(0.0005, 0.0, 0.0));
        let c = welder.weld(&Point3::new(5.0, 5.0, 5.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(welder.len(), 2);
    }

    #[test]
    fn welder_looks_across_cell_borders() {
        let mut welder = PointWelder::new(Epsilon::new(0.01).unwrap());
        let a = welder.weld(&Point3::new(0.0099, 0.0, 0.0));
        let b = welder.weld(&Point3::new(0.0101, 0.0, 0.0));
        assert_eq!(a, b);
        assert!(welder.find(&Point3::new(1.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn welder_compares_axis_by_axis() {
        let mut welder = PointWelder::new(Epsilon::new(1e-3).unwrap());
        let a = welder.weld(&Point3::new(0.0, 0.0, 0.0));
        // farther than the tolerance in length, within it on every axis
        assert_eq!(welder.find(&Point3::new(9e-4, 9e-4, 9e-4)), Some(a));
        assert!(welder.find(&Point3::new(1.1e-3, 0.0, 0.0)).is_none());
    }
}
