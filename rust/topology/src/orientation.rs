// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Consistent orientation of linked elements.
//!
//! Two linked triangles agree when they traverse their shared edge in
//! opposite directions; two linked segments agree when they chain head to
//! tail; two tetrahedra agree when their signed volumes have the same sign.

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::geometry::Shape;
use crate::keys::{ComponentKey, ElementKey, ElementKind};
use crate::net::Net;
use crate::spatial::SpatialIndex;

impl Net {
    /// Whether two linked elements agree on orientation. `None` if they are
    /// not linked both ways.
    pub fn orientations_agree(&self, a: ElementKey, b: ElementKey) -> Option<bool> {
        let eps = self.epsilon();
        let ea = self.elements.get(a)?;
        let eb = self.elements.get(b)?;
        let sa = ea.slot_of(b)?;
        let sb = eb.slot_of(a)?;
        match (&ea.shape, &eb.shape) {
            (Shape::Triangle(ta), Shape::Triangle(tb)) => {
                let (x, y) = (ta.edge(sa), tb.edge(sb));
                Some(eps.points_eq(&x.start(), &y.end()) && eps.points_eq(&x.end(), &y.start()))
            }
            // slot i shares the corner 1 - i, so head-to-tail uses different slots
            (Shape::Segment(_), Shape::Segment(_)) => Some(sa != sb),
            (Shape::Tetrahedron(ta), Shape::Tetrahedron(tb)) => {
                Some((ta.signed_volume() > 0.0) == (tb.signed_volume() > 0.0))
            }
            _ => None,
        }
    }

    /// Orients every element of a component consistently with its
    /// neighbours.
    ///
    /// Segments and triangles are walked from the entry (and from the first
    /// element of every unlinked piece), inverting neighbours that disagree.
    /// The operation is all-or-nothing: a surface that cannot be oriented
    /// (a Möbius strip) is restored and reported as a `TopologyViolation`.
    /// Tetrahedra are each flipped to positive signed volume, which orients
    /// a solid's boundary outward.
    pub fn make_orientation_consistent(&mut self, key: ComponentKey) -> Result<()> {
        let component = self.component_ref(key)?;
        let id = component.id;
        if component.kind == ElementKind::Tetrahedron {
            let keys = component.index.entries();
            let mut flipped = 0;
            for k in keys {
                if let Some(e) = self.elements.get_mut(k) {
                    if e.shape.as_tetrahedron().is_some_and(|t| t.signed_volume() < 0.0) {
                        e.flip();
                        flipped += 1;
                    }
                }
            }
            let component = self.component_mut(key)?;
            component.oriented = true;
            component.oriented_outward = true;
            tracing::debug!(component = %id, flipped, "tetrahedra canonicalised");
            return Ok(());
        }

        let roots: Vec<ElementKey> = self.connected_pieces(key)?.iter().map(|p| p[0]).collect();
        let mut visited: FxHashSet<ElementKey> = FxHashSet::default();
        let mut flipped: Vec<ElementKey> = Vec::new();

        for root in roots {
            if !visited.insert(root) {
                continue;
            }
            let mut stack = vec![root];
            while let Some(current) = stack.pop() {
                let neighbours: Vec<ElementKey> = match self.elements.get(current) {
                    Some(e) => e.neighbours().map(|(_, n)| n).collect(),
                    None => continue,
                };
                for n in neighbours {
                    let agrees = self.orientations_agree(current, n).unwrap_or(true);
                    if visited.insert(n) {
                        if !agrees {
                            if let Some(e) = self.elements.get_mut(n) {
                                e.flip();
                            }
                            flipped.push(n);
                        }
                        stack.push(n);
                    } else if !agrees {
                        for &f in flipped.iter().rev() {
                            if let Some(e) = self.elements.get_mut(f) {
                                e.flip();
                            }
                        }
                        self.component_mut(key)?.oriented = false;
                        tracing::warn!(component = %id, element = ?n, "surface is not orientable");
                        return Err(Error::TopologyViolation(format!(
                            "component {id} is not orientable"
                        )));
                    }
                }
            }
        }

        let component = self.component_mut(key)?;
        component.oriented = true;
        if !flipped.is_empty() {
            component.oriented_outward = false;
        }
        tracing::debug!(component = %id, flipped = flipped.len(), "orientation made consistent");
        Ok(())
    }

    /// Inverts every element of a component. Consistency is preserved; the
    /// outward flag is cleared.
    pub fn invert_component(&mut self, key: ComponentKey) -> Result<()> {
        let keys = self.component_ref(key)?.index.entries();
        for k in keys {
            if let Some(e) = self.elements.get_mut(k) {
                e.flip();
            }
        }
        let component = self.component_mut(key)?;
        if component.kind == ElementKind::Tetrahedron {
            component.oriented = false;
        }
        component.oriented_outward = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Segment, Simplex, Tetrahedron, Triangle};
    use nalgebra::Point3;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    fn all_agree(net: &Net, key: ComponentKey) -> bool {
        net.component(key).unwrap().elements().iter().all(|&a| {
            net.element(a)
                .unwrap()
                .neighbours()
                .all(|(_, b)| net.orientations_agree(a, b) == Some(true))
        })
    }

    #[test]
    fn fan_with_mixed_winding_becomes_consistent() {
        let o = p(0.0, 0.0, 0.0);
        let ring = [p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(-1.0, 0.0, 0.0), p(0.0, -1.0, 0.0)];
        let mut shapes: Vec<Shape> = Vec::new();
        for i in 0..4 {
            let (a, b) = (ring[i], ring[(i + 1) % 4]);
            // every other triangle wound clockwise
            let t = if i % 2 == 0 { Triangle::new(o, a, b) } else { Triangle::new(o, b, a) };
            shapes.push(t.into());
        }
        let mut net = Net::new(ElementKind::Triangle);
        let c = net.build_component(shapes).unwrap();
        assert!(!all_agree(&net, c));

        net.make_orientation_consistent(c).unwrap();
        assert!(all_agree(&net, c));
        assert!(net.component(c).unwrap().is_oriented());
        assert!(net.adjacency_is_symmetric());
    }

    #[test]
    fn segments_chain_head_to_tail() {
        let mut net = Net::new(ElementKind::Segment);
        let c = net
            .build_component(vec![
                Segment::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)).into(),
                Segment::new(p(2.0, 0.0, 0.0), p(1.0, 0.0, 0.0)).into(),
                Segment::new(p(2.0, 0.0, 0.0), p(3.0, 0.0, 0.0)).into(),
            ])
            .unwrap();
        net.make_orientation_consistent(c).unwrap();
        assert!(all_agree(&net, c));
        let total: f64 = net
            .component(c)
            .unwrap()
            .elements()
            .iter()
            .map(|&k| net.element(k).unwrap().shape().as_segment().unwrap().direction().x)
            .sum();
        assert!(total.abs() == 3.0);
    }

    #[test]
    fn mobius_strip_is_rejected_and_restored() {
        // a triangulated band with a half twist
        let n = 6;
        let mut top = Vec::new();
        let mut bottom = Vec::new();
        for i in 0..n {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            let twist = a / 2.0;
            let (c, s) = (a.cos() * 3.0, a.sin() * 3.0);
            let (dr, dz) = (twist.cos() * 0.5, twist.sin() * 0.5);
            top.push(p(c + dr * a.cos(), s + dr * a.sin(), dz));
            bottom.push(p(c - dr * a.cos(), s - dr * a.sin(), -dz));
        }
        let mut shapes: Vec<Shape> = Vec::new();
        for i in 0..n {
            let j = (i + 1) % n;
            // the last quad reconnects with swapped sides
            let (tj, bj) = if j == 0 { (bottom[0], top[0]) } else { (top[j], bottom[j]) };
            shapes.push(Triangle::new(top[i], bottom[i], tj).into());
            shapes.push(Triangle::new(bottom[i], bj, tj).into());
        }
        let mut net = Net::new(ElementKind::Triangle);
        let c = net.build_component(shapes).unwrap();
        let before: Vec<Shape> = net
            .component(c)
            .unwrap()
            .elements()
            .iter()
            .map(|&k| *net.element(k).unwrap().shape())
            .collect();

        assert!(matches!(
            net.make_orientation_consistent(c),
            Err(Error::TopologyViolation(_))
        ));
        assert!(!net.component(c).unwrap().is_oriented());
        let after: Vec<Shape> = net
            .component(c)
            .unwrap()
            .elements()
            .iter()
            .map(|&k| *net.element(k).unwrap().shape())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn tetrahedra_get_positive_volume() {
        let mut net = Net::new(ElementKind::Tetrahedron);
        let c = net
            .build_component(vec![Tetrahedron::new(
                p(0.0, 0.0, 0.0),
                p(0.0, 1.0, 0.0),
                p(1.0, 0.0, 0.0),
                p(0.0, 0.0, 1.0),
            )
            .into()])
            .unwrap();
        net.make_orientation_consistent(c).unwrap();
        let e = net.component(c).unwrap().entry().unwrap();
        let tet = *net.element(e).unwrap().shape().as_tetrahedron().unwrap();
        assert!(tet.signed_volume() > 0.0);
        assert!(net.component(c).unwrap().is_oriented_outward());
        assert!(tet.measure() > 0.0);
    }
}
