use crate::format::Vertex;
use crate::tiles::Bounds;

use log::debug;
use rayon::prelude::*;

/// OSM node with its projected planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    pub x: f64,
    pub y: f64,
}

impl Node {
    /// Planar coordinates in output precision.
    #[inline]
    pub fn vertex(&self) -> Vertex {
        Vertex::new(self.x as f32, self.y as f32)
    }
}

/// Collects nodes in input order; sorted once in [`NodeIndexBuilder::build`].
#[derive(Debug, Default)]
pub struct NodeIndexBuilder {
    nodes: Vec<Node>,
}

impl NodeIndexBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn build(mut self) -> NodeIndex {
        // stable, so the first occurrence of a duplicated id survives the dedup
        self.nodes.par_sort_by_key(|node| node.id);
        let len_before = self.nodes.len();
        self.nodes.dedup_by_key(|node| node.id);
        if self.nodes.len() != len_before {
            debug!(
                "Dropped {} nodes with duplicated ids",
                len_before - self.nodes.len()
            );
        }
        NodeIndex { nodes: self.nodes }
    }
}

/// Read-only lookup of nodes by OSM id.
#[derive(Debug)]
pub struct NodeIndex {
    // sorted by id, ids are unique
    nodes: Vec<Node>,
}

impl NodeIndex {
    /// Finds the node with the given id in O(log n).
    pub fn get(&self, id: u64) -> Option<&Node> {
        self.nodes
            .binary_search_by_key(&id, |node| node.id)
            .ok()
            .map(|pos| &self.nodes[pos])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Bounding box of all projected coordinates, in output precision, so that
    /// any emitted vertex is guaranteed to fall inside of it.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut nodes = self.nodes.iter().map(|node| node.vertex());
        let first = nodes.next()?;
        Some(nodes.fold(Bounds::from_vertex(first), |bounds, v| bounds.extend(v)))
    }
}
