// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The net: arena owner for elements and components.
//!
//! A [`Net`] holds an ordered list of same-kind components. Elements and
//! components live in `slotmap` arenas addressed by generational keys, and
//! adjacency links are keys into the element arena, so there are no
//! reference cycles and cloning a net is a plain deep copy.
//!
//! Two monotonic counters hand out [`ElementId`]s and [`ComponentId`]s. Ids
//! are never reused, not even after removal, and travel with components
//! when a net is split.
//!
//! Behaviour is spread over several modules as separate `impl Net` blocks:
//! construction, orientation, statistics, traversal, mutation and queries.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::bounds::Bounds;
use crate::component::Component;
use crate::config::Config;
use crate::element::Element;
use crate::epsilon::Epsilon;
use crate::error::{Error, Result};
use crate::geometry::Shape;
use crate::keys::{ComponentId, ComponentKey, ElementId, ElementKey, ElementKind};
use crate::spatial::{IndexEntry, RTreeIndex, SpatialIndex};

/// An ordered collection of same-kind components.
#[derive(Debug, Clone)]
pub struct Net {
    kind: ElementKind,
    config: Config,
    epsilon: Epsilon,

    pub(crate) elements: SlotMap<ElementKey, Element>,
    pub(crate) components: SlotMap<ComponentKey, Component>,
    order: Vec<ComponentKey>,
    ids: FxHashMap<ElementId, ElementKey>,

    next_element_id: u64,
    next_component_id: u64,

    update_depth: usize,
    dirty: FxHashSet<ComponentKey>,
}

impl Net {
    /// Creates an empty net with the default configuration.
    pub fn new(kind: ElementKind) -> Self {
        Self::from_parts(kind, Config::default(), Epsilon::default())
    }

    /// Creates an empty net, validating `config`.
    pub fn with_config(kind: ElementKind, config: Config) -> Result<Self> {
        config.validate()?;
        let epsilon = config.tolerance()?;
        Ok(Self::from_parts(kind, config, epsilon))
    }

    fn from_parts(kind: ElementKind, config: Config, epsilon: Epsilon) -> Self {
        Self {
            kind,
            config,
            epsilon,
            elements: SlotMap::with_key(),
            components: SlotMap::with_key(),
            order: Vec::new(),
            ids: FxHashMap::default(),
            next_element_id: 0,
            next_component_id: 0,
            update_depth: 0,
            dirty: FxHashSet::default(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn epsilon(&self) -> Epsilon {
        self.epsilon
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Id the next element will receive.
    pub fn next_element_id(&self) -> ElementId {
        ElementId(self.next_element_id)
    }

    /// Id the next component will receive.
    pub fn next_component_id(&self) -> ComponentId {
        ComponentId(self.next_component_id)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Component keys in net order.
    pub fn component_keys(&self) -> &[ComponentKey] {
        &self.order
    }

    /// Components in net order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentKey, &Component)> + '_ {
        self.order
            .iter()
            .filter_map(|&k| self.components.get(k).map(|c| (k, c)))
    }

    pub fn component(&self, key: ComponentKey) -> Option<&Component> {
        self.components.get(key)
    }

    pub fn component_by_id(&self, id: ComponentId) -> Option<ComponentKey> {
        self.components().find(|(_, c)| c.id == id).map(|(k, _)| k)
    }

    pub fn count_components(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn component_ref(&self, key: ComponentKey) -> Result<&Component> {
        self.components.get(key).ok_or(Error::ComponentNotFound(key))
    }

    pub(crate) fn component_mut(&mut self, key: ComponentKey) -> Result<&mut Component> {
        self.components.get_mut(key).ok_or(Error::ComponentNotFound(key))
    }

    /// Appends a new empty component.
    pub fn create_component(&mut self) -> ComponentKey {
        let id = ComponentId(self.next_component_id);
        self.next_component_id += 1;
        self.push_component(id)
    }

    /// Appends a new empty component with an explicit id, which must not be
    /// below the component counter.
    pub fn create_component_with_id(&mut self, id: ComponentId) -> Result<ComponentKey> {
        if id.0 < self.next_component_id {
            return Err(Error::IdCollision {
                requested: id,
                next: self.next_component_id(),
            });
        }
        self.next_component_id = id.0 + 1;
        Ok(self.push_component(id))
    }

    fn push_component(&mut self, id: ComponentId) -> ComponentKey {
        let component = Component::new(id, self.kind, self.new_index());
        let key = self.components.insert(component);
        self.order.push(key);
        key
    }

    /// Removes a component and every element it owns.
    pub fn remove_component(&mut self, key: ComponentKey) -> Result<()> {
        let component = self.components.remove(key).ok_or(Error::ComponentNotFound(key))?;
        for element in component.index.entries() {
            self.drop_element(element);
        }
        self.order.retain(|&k| k != key);
        self.dirty.remove(&key);
        tracing::debug!(component = %component.id, elements = component.count_elements(), "removed component");
        Ok(())
    }

    // =========================================================================
    // Elements
    // =========================================================================

    pub fn element(&self, key: ElementKey) -> Option<&Element> {
        self.elements.get(key)
    }

    pub fn element_by_id(&self, id: ElementId) -> Option<&Element> {
        self.ids.get(&id).and_then(|&k| self.elements.get(k))
    }

    pub fn element_key(&self, id: ElementId) -> Option<ElementKey> {
        self.ids.get(&id).copied()
    }

    /// Every element key, in arena order.
    pub fn element_keys(&self) -> impl Iterator<Item = ElementKey> + '_ {
        self.elements.keys()
    }

    pub(crate) fn shape_of(&self, key: ElementKey) -> Option<&Shape> {
        self.elements.get(key).map(|e| &e.shape)
    }

    pub(crate) fn check_kind(&self, shape: &Shape) -> Result<()> {
        if shape.kind() != self.kind {
            return Err(Error::KindMismatch {
                expected: self.kind,
                actual: shape.kind(),
            });
        }
        Ok(())
    }

    /// Rejects shapes of the wrong kind, with non-finite corners, or
    /// collapsing to zero measure.
    pub(crate) fn check_shape(&self, shape: &Shape) -> Result<()> {
        self.check_kind(shape)?;
        shape.bounds()?;
        if shape.is_degenerate(&self.epsilon) {
            return Err(Error::DegenerateGeometry(match shape.kind() {
                ElementKind::Segment => "zero-length segment",
                ElementKind::Triangle => "zero-area triangle",
                ElementKind::Tetrahedron => "zero-volume tetrahedron",
            }));
        }
        Ok(())
    }

    /// Allocates an element with the next id. The element is not indexed.
    pub(crate) fn allocate_element(&mut self, component: ComponentKey, shape: Shape) -> ElementKey {
        let id = ElementId(self.next_element_id);
        self.next_element_id += 1;
        self.allocate_with_id(component, shape, id)
    }

    fn allocate_with_id(&mut self, component: ComponentKey, shape: Shape, id: ElementId) -> ElementKey {
        let key = self.elements.insert(Element::new(id, component, shape));
        self.ids.insert(id, key);
        key
    }

    pub(crate) fn drop_element(&mut self, key: ElementKey) -> Option<Element> {
        let element = self.elements.remove(key)?;
        self.ids.remove(&element.id);
        Some(element)
    }

    pub(crate) fn new_index(&self) -> RTreeIndex<ElementKey> {
        RTreeIndex::new(self.epsilon.value())
    }

    /// Index over `keys`, bulk-loaded when there are enough of them.
    pub(crate) fn build_index(&self, keys: &[ElementKey]) -> Result<RTreeIndex<ElementKey>> {
        let mut boxes = Vec::with_capacity(keys.len());
        for &key in keys {
            if let Some(e) = self.elements.get(key) {
                boxes.push((key, e.shape.bounds()?));
            }
        }
        if boxes.len() >= self.config.rtree_bulk_threshold {
            let entries = boxes
                .into_iter()
                .map(|(key, bounds)| IndexEntry::new(key, bounds))
                .collect();
            return Ok(RTreeIndex::bulk_load(entries, self.epsilon.value()));
        }
        let mut index = self.new_index();
        for (key, bounds) in boxes {
            index.insert(key, bounds);
        }
        Ok(index)
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Union of every component's bounds.
    pub fn bounds(&self) -> Option<Bounds> {
        self.components()
            .filter_map(|(_, c)| c.bounds)
            .reduce(|a, b| a.union(&b))
    }

    pub fn count_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn count_vertices(&self) -> usize {
        self.components().map(|(_, c)| c.vertices).sum()
    }

    pub fn count_edges(&self) -> usize {
        self.components().map(|(_, c)| c.edges).sum()
    }

    pub fn count_faces(&self) -> usize {
        self.components().map(|(_, c)| c.faces).sum()
    }

    /// Sum of the component Euler characteristics.
    pub fn euler(&self) -> i64 {
        self.components().map(|(_, c)| c.euler()).sum()
    }

    // =========================================================================
    // Update bracket
    // =========================================================================

    /// Opens an update bracket. Brackets nest.
    pub fn begin_update(&mut self) {
        self.update_depth += 1;
    }

    /// Closes an update bracket. Closing the outermost bracket refreshes the
    /// entry, bounds and statistics of every component touched inside it.
    pub fn end_update(&mut self) -> Result<()> {
        if self.update_depth == 0 {
            return Err(Error::TopologyViolation(
                "end_update without matching begin_update".into(),
            ));
        }
        self.update_depth -= 1;
        if self.update_depth > 0 {
            return Ok(());
        }
        let dirty: Vec<ComponentKey> = self.dirty.drain().collect();
        for &key in &dirty {
            if self.components.contains_key(key) {
                self.refresh(key)?;
            }
        }
        tracing::debug!(components = dirty.len(), "update bracket closed");
        Ok(())
    }

    pub fn is_updating(&self) -> bool {
        self.update_depth > 0
    }

    pub(crate) fn mark_dirty(&mut self, key: ComponentKey) {
        self.dirty.insert(key);
    }

    pub(crate) fn clear_dirty(&mut self, key: ComponentKey) {
        self.dirty.remove(&key);
    }

    // =========================================================================
    // Cloning, attaching, splitting
    // =========================================================================

    /// Deep copy of one component, detached from any net.
    ///
    /// Adjacency is preserved by remapping keys to positions in the copy.
    pub fn clone_component(&self, key: ComponentKey) -> Result<DetachedComponent> {
        let component = self.component_ref(key)?;
        let keys = component.index.entries();
        let position: FxHashMap<ElementKey, usize> =
            keys.iter().enumerate().map(|(i, &k)| (k, i)).collect();

        let mut shapes = Vec::with_capacity(keys.len());
        let mut ids = Vec::with_capacity(keys.len());
        let mut neighbours = Vec::with_capacity(keys.len());
        for &k in &keys {
            let element = self.elements.get(k).ok_or(Error::ElementNotFound)?;
            shapes.push(element.shape);
            ids.push(element.id);
            let mut slots = [None; 4];
            for (slot, n) in element.neighbours() {
                slots[slot] = position.get(&n).copied();
            }
            neighbours.push(slots);
        }

        Ok(DetachedComponent {
            id: component.id,
            kind: component.kind,
            shapes,
            ids,
            neighbours,
            entry: component.entry.and_then(|e| position.get(&e).copied()),
            oriented: component.oriented,
            oriented_outward: component.oriented_outward,
            connected: component.connected,
            closed: component.closed,
            vertices: component.vertices,
            edges: component.edges,
            faces: component.faces,
        })
    }

    /// Attaches a detached component as a new component with fresh ids.
    pub fn attach_component(&mut self, detached: DetachedComponent) -> Result<ComponentKey> {
        self.attach(detached, false)
    }

    fn attach(&mut self, detached: DetachedComponent, keep_ids: bool) -> Result<ComponentKey> {
        if detached.kind != self.kind {
            return Err(Error::KindMismatch {
                expected: self.kind,
                actual: detached.kind,
            });
        }
        let key = if keep_ids {
            if self.component_by_id(detached.id).is_some() {
                return Err(Error::IdCollision {
                    requested: detached.id,
                    next: self.next_component_id(),
                });
            }
            self.next_component_id = self.next_component_id.max(detached.id.0 + 1);
            self.push_component(detached.id)
        } else {
            self.create_component()
        };

        let mut keys = Vec::with_capacity(detached.shapes.len());
        for (shape, id) in detached.shapes.iter().zip(&detached.ids) {
            let k = if keep_ids && !self.ids.contains_key(id) {
                self.next_element_id = self.next_element_id.max(id.0 + 1);
                self.allocate_with_id(key, *shape, *id)
            } else {
                self.allocate_element(key, *shape)
            };
            keys.push(k);
        }
        for (i, slots) in detached.neighbours.iter().enumerate() {
            if let Some(e) = self.elements.get_mut(keys[i]) {
                for (slot, n) in slots.iter().enumerate() {
                    e.set_neighbour(slot, n.map(|j| keys[j]));
                }
            }
        }

        let index = self.build_index(&keys)?;
        let component = self.component_mut(key)?;
        component.bounds = index.bounding_box();
        component.index = index;
        component.entry = detached.entry.map(|i| keys[i]);
        component.oriented = detached.oriented;
        component.oriented_outward = detached.oriented_outward;
        component.connected = detached.connected;
        component.closed = detached.closed;
        component.vertices = detached.vertices;
        component.edges = detached.edges;
        component.faces = detached.faces;
        Ok(key)
    }

    /// Moves the given components, with their ids, into a new net.
    ///
    /// The new net continues both id counters from this one, so ids stay
    /// unique across the two nets. Unknown or repeated keys are rejected
    /// before anything moves.
    pub fn split_off(&mut self, keys: &[ComponentKey]) -> Result<Net> {
        let mut seen = FxHashSet::default();
        for &key in keys {
            let id = self.component_ref(key)?.id;
            if !seen.insert(key) {
                return Err(Error::TopologyViolation(format!("component {id} listed twice")));
            }
        }
        let mut other = Self::from_parts(self.kind, self.config.clone(), self.epsilon);
        other.next_element_id = self.next_element_id;
        other.next_component_id = self.next_component_id;

        for &key in keys {
            let detached = self.clone_component(key)?;
            other.attach(detached, true)?;
            self.remove_component(key)?;
        }
        tracing::debug!(moved = keys.len(), remaining = self.count_components(), "split net");
        Ok(other)
    }
}

/// A deep copy of a component that belongs to no net.
///
/// Produced by [`Net::clone_component`] and turned back into a live
/// component by [`Net::attach_component`].
#[derive(Debug, Clone)]
pub struct DetachedComponent {
    id: ComponentId,
    kind: ElementKind,
    shapes: Vec<Shape>,
    ids: Vec<ElementId>,
    neighbours: Vec<[Option<usize>; 4]>,
    entry: Option<usize>,
    oriented: bool,
    oriented_outward: bool,
    connected: bool,
    closed: bool,
    vertices: usize,
    edges: usize,
    faces: usize,
}

impl DetachedComponent {
    /// Id of the component this copy was taken from.
    pub fn source_id(&self) -> ComponentId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Neighbour slots of the `i`-th shape, as positions in [`Self::shapes`].
    pub fn neighbours(&self, i: usize) -> Option<&[Option<usize>; 4]> {
        self.neighbours.get(i)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
