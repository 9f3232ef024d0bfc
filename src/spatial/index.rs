//! Proximity index over traceable network elements
//!
//! Each indexed element contributes one R-tree entry per vertex (point layers)
//! or per segment (polyline layers). Entries carry only the element's arena
//! key; hit tests resolve keys back to element data through a caller-supplied
//! lookup so results always reflect the store's current state.

use rstar::{RTree, RTreeObject, AABB};
use std::collections::{BTreeSet, HashMap};

use super::distance::{point_distance, point_segment_distance};
use crate::model::{Coordinate, ElementKey, GeographyType, LayerElement};

#[derive(Clone, Debug, PartialEq)]
enum Shape {
    Point([f64; 2]),
    Segment([f64; 2], [f64; 2]),
}

/// One R-tree entry: a vertex or segment of an indexed element
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedPart {
    pub key: ElementKey,
    shape: Shape,
}

impl IndexedPart {
    fn distance_to(&self, p: [f64; 2]) -> f64 {
        match self.shape {
            Shape::Point(q) => point_distance(p, q),
            Shape::Segment(a, b) => point_segment_distance(p, a, b).0,
        }
    }
}

impl RTreeObject for IndexedPart {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        match self.shape {
            Shape::Point(p) => AABB::from_point(p),
            Shape::Segment(a, b) => AABB::from_corners(a, b),
        }
    }
}

/// R-tree of element parts plus the per-element part list used for eviction
pub struct SpatialHitIndex {
    tree: RTree<IndexedPart>,
    parts: HashMap<ElementKey, Vec<IndexedPart>>,
    tolerance: f64,
}

impl SpatialHitIndex {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tree: RTree::new(),
            parts: HashMap::new(),
            tolerance,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of indexed elements
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn contains(&self, key: ElementKey) -> bool {
        self.parts.contains_key(&key)
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.parts.clear();
    }

    /// Index an element's geometry. Re-adding replaces the previous entries.
    pub fn add(&mut self, key: ElementKey, element: &LayerElement, geography: GeographyType) {
        self.remove(key);

        let parts = split_geometry(key, &element.points, geography);
        if parts.is_empty() {
            return;
        }
        for part in &parts {
            self.tree.insert(part.clone());
        }
        self.parts.insert(key, parts);
    }

    /// Drop every entry of an element. Returns false if it was not indexed.
    pub fn remove(&mut self, key: ElementKey) -> bool {
        let Some(parts) = self.parts.remove(&key) else {
            return false;
        };
        for part in &parts {
            self.tree.remove(part);
        }
        true
    }

    /// Keys of every indexed element within tolerance of the coordinate, ascending
    pub fn hit_keys(&self, latitude: f64, longitude: f64) -> Vec<ElementKey> {
        let p = [latitude, longitude];
        let tol = self.tolerance;
        let envelope = AABB::from_corners([p[0] - tol, p[1] - tol], [p[0] + tol, p[1] + tol]);

        let keys: BTreeSet<ElementKey> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|part| part.distance_to(p) <= tol)
            .map(|part| part.key)
            .collect();
        keys.into_iter().collect()
    }

    /// Append every element within tolerance of the coordinate to `result`,
    /// resolving keys through `lookup`. With `exclude_routed`, elements already
    /// visited by the tracer are skipped. Returns how many were appended.
    pub fn hit_test<'a, F>(
        &self,
        latitude: f64,
        longitude: f64,
        lookup: F,
        result: &mut Vec<LayerElement>,
        exclude_routed: bool,
    ) -> usize
    where
        F: Fn(ElementKey) -> Option<&'a LayerElement>,
    {
        let before = result.len();
        for key in self.hit_keys(latitude, longitude) {
            let Some(element) = lookup(key) else {
                continue;
            };
            if exclude_routed && element.routed {
                continue;
            }
            result.push(element.clone());
        }
        result.len() - before
    }
}

fn split_geometry(key: ElementKey, points: &[Coordinate], geography: GeographyType) -> Vec<IndexedPart> {
    let vertices: Vec<[f64; 2]> = points
        .iter()
        .map(Coordinate::as_array)
        .filter(|p| p[0].is_finite() && p[1].is_finite())
        .collect();

    let shapes: Vec<Shape> = match (geography, vertices.len()) {
        (_, 0) => Vec::new(),
        (GeographyType::Polyline, n) if n >= 2 => vertices
            .windows(2)
            .map(|w| Shape::Segment(w[0], w[1]))
            .collect(),
        _ => vertices.into_iter().map(Shape::Point).collect(),
    };

    shapes
        .into_iter()
        .map(|shape| IndexedPart { key, shape })
        .collect()
}
