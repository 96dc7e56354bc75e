//! Triangulation of simple polygon rings for solid fill rendering.

use crate::format::Vertex;

use itertools::Itertools;
use lyon::math::{point, Point};
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, TessellationError, VertexBuffers,
};
use thiserror::Error;

/// Smallest absolute ring area (in squared projected units) that is
/// considered a surface.
const MIN_AREA: f64 = 1e-9;

#[derive(Error, Debug)]
pub enum TessellateError {
    #[error("ring has {0} vertices, at least 3 are needed")]
    TooFewVertices(usize),
    #[error("ring does not enclose any area")]
    Degenerate,
    #[error("tessellator failed: {0:?}")]
    Failed(TessellationError),
    #[error("tessellator did not produce any triangles")]
    Empty,
}

/// Turns a ring into a triangle list, three consecutive vertices per
/// triangle.
///
/// The ring is given without the closing vertex; the segment from its last
/// to its first vertex is implied.
pub trait Tessellator {
    fn tessellate(&mut self, ring: &[(f64, f64)]) -> Result<Vec<Vertex>, TessellateError>;
}

/// Choice of the polygon triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Triangulation {
    /// Proper triangulation of concave and self-touching rings.
    #[default]
    Tessellate,
    /// Fan around the first vertex. Only correct for convex rings.
    Fan,
}

impl Triangulation {
    pub fn tessellator(self) -> Box<dyn Tessellator> {
        match self {
            Triangulation::Tessellate => Box::<LyonTessellator>::default(),
            Triangulation::Fan => Box::new(FanTessellator),
        }
    }
}

/// Twice the signed area of the ring, in a frame local to its first vertex.
fn double_area(ring: &[(f64, f64)]) -> f64 {
    let (ox, oy) = ring[0];
    ring.iter()
        .circular_tuple_windows()
        .map(|(&(x0, y0), &(x1, y1))| (x0 - ox) * (y1 - oy) - (x1 - ox) * (y0 - oy))
        .sum()
}

fn check_ring(ring: &[(f64, f64)]) -> Result<(), TessellateError> {
    if ring.len() < 3 {
        return Err(TessellateError::TooFewVertices(ring.len()));
    }
    if double_area(ring).abs() < 2.0 * MIN_AREA {
        return Err(TessellateError::Degenerate);
    }
    Ok(())
}

/// Fill tessellator from `lyon`.
///
/// Coordinates are shifted to a frame local to the first vertex before they
/// are narrowed to `f32`, which keeps sub-meter precision far away from the
/// projection origin.
pub struct LyonTessellator {
    tessellator: FillTessellator,
    options: FillOptions,
    buffers: VertexBuffers<Point, u32>,
}

impl Default for LyonTessellator {
    fn default() -> Self {
        Self {
            tessellator: FillTessellator::new(),
            options: FillOptions::default(),
            buffers: VertexBuffers::new(),
        }
    }
}

impl Tessellator for LyonTessellator {
    fn tessellate(&mut self, ring: &[(f64, f64)]) -> Result<Vec<Vertex>, TessellateError> {
        check_ring(ring)?;
        let (ox, oy) = ring[0];

        let mut builder = Path::builder();
        builder.begin(point(0.0, 0.0));
        for &(x, y) in &ring[1..] {
            builder.line_to(point((x - ox) as f32, (y - oy) as f32));
        }
        builder.end(true);
        let path = builder.build();

        self.buffers.vertices.clear();
        self.buffers.indices.clear();
        self.tessellator
            .tessellate_path(
                &path,
                &self.options,
                &mut BuffersBuilder::new(&mut self.buffers, |vertex: FillVertex| {
                    vertex.position()
                }),
            )
            .map_err(TessellateError::Failed)?;
        if self.buffers.indices.is_empty() {
            return Err(TessellateError::Empty);
        }

        let vertices = &self.buffers.vertices;
        Ok(self
            .buffers
            .indices
            .iter()
            .map(|&idx| {
                let p = vertices[idx as usize];
                Vertex::new((ox + f64::from(p.x)) as f32, (oy + f64::from(p.y)) as f32)
            })
            .collect())
    }
}

/// Triangle fan sharing the first vertex of the ring.
#[derive(Debug, Default)]
pub struct FanTessellator;

impl Tessellator for FanTessellator {
    fn tessellate(&mut self, ring: &[(f64, f64)]) -> Result<Vec<Vertex>, TessellateError> {
        check_ring(ring)?;
        let vertex = |&(x, y): &(f64, f64)| Vertex::new(x as f32, y as f32);
        let first = vertex(&ring[0]);
        Ok(ring[1..]
            .iter()
            .map(vertex)
            .tuple_windows()
            .flat_map(|(b, c)| [first, b, c])
            .collect())
    }
}
