//! Partitioning of features into a regular grid of square tiles.

use crate::error::{Error, Result};
use crate::format::{LineFeature, PolygonFeature, Vertex};

use log::trace;

use std::collections::BTreeMap;

/// Axis aligned bounding box in output coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vertex,
    pub max: Vertex,
}

impl Bounds {
    pub fn from_vertex(v: Vertex) -> Self {
        Self { min: v, max: v }
    }

    pub fn extend(self, v: Vertex) -> Self {
        Self {
            min: Vertex::new(self.min.x.min(v.x), self.min.y.min(v.y)),
            max: Vertex::new(self.max.x.max(v.x), self.max.y.max(v.y)),
        }
    }

    pub fn contains(&self, v: Vertex) -> bool {
        self.min.x <= v.x && v.x <= self.max.x && self.min.y <= v.y && v.y <= self.max.y
    }
}

/// One cell of the grid with the features anchored in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub grid_x: i32,
    pub grid_y: i32,
    pub lines: Vec<LineFeature>,
    pub polygons: Vec<PolygonFeature>,
}

impl Tile {
    fn new(grid_x: i32, grid_y: i32) -> Self {
        Self {
            grid_x,
            grid_y,
            lines: Vec::new(),
            polygons: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.polygons.is_empty()
    }
}

/// Grid index of `coord` for tiles of edge length `edge`, or `None` if it
/// does not fit into an `i32`.
#[inline]
pub fn cell(coord: f32, edge: f64) -> Option<i32> {
    let pos = (f64::from(coord) / edge).floor();
    if pos.is_finite() && f64::from(i32::MIN) <= pos && pos <= f64::from(i32::MAX) {
        Some(pos as i32)
    } else {
        None
    }
}

/// First cell and number of cells covering `min..=max` along one axis.
fn extent(min: f32, max: f32, edge: f64) -> Option<(i32, i32)> {
    let start = cell(min, edge)?;
    let count = cell(max, edge)?.checked_add(1)?.checked_sub(start)?;
    Some((start, count))
}

/// Grid covering a bounding box with tiles of fixed edge length.
///
/// Tiles are created lazily when the first feature is anchored in them, so
/// only non-empty tiles are ever materialized. Features are never split:
/// each one belongs to the tile that contains its anchor.
#[derive(Debug)]
pub struct TileGrid {
    edge: f64,
    start: (i32, i32),
    count: (i32, i32),
    tiles: BTreeMap<(i32, i32), Tile>,
}

impl TileGrid {
    /// Creates an empty grid covering `bounds`.
    ///
    /// Fails with [`Error::TileSize`] if `edge` is not a positive finite
    /// number, or if it is so small that the grid coordinates of `bounds` do
    /// not fit into an `i32`.
    pub fn new(bounds: Bounds, edge: f64) -> Result<Self> {
        if !(edge.is_finite() && edge > 0.0) {
            return Err(Error::TileSize { edge });
        }
        let (start_x, count_x) =
            extent(bounds.min.x, bounds.max.x, edge).ok_or(Error::TileSize { edge })?;
        let (start_y, count_y) =
            extent(bounds.min.y, bounds.max.y, edge).ok_or(Error::TileSize { edge })?;
        Ok(Self {
            edge,
            start: (start_x, start_y),
            count: (count_x, count_y),
            tiles: BTreeMap::new(),
        })
    }

    pub fn edge(&self) -> f64 {
        self.edge
    }

    /// Grid coordinates of the first column and row.
    pub fn start(&self) -> (i32, i32) {
        self.start
    }

    /// Number of columns and rows.
    pub fn count(&self) -> (i32, i32) {
        self.count
    }

    fn tile_mut(&mut self, anchor: Vertex) -> Result<&mut Tile> {
        let outside = || Error::OutsideGrid {
            x: anchor.x,
            y: anchor.y,
        };
        let x = cell(anchor.x, self.edge).ok_or_else(outside)?;
        let y = cell(anchor.y, self.edge).ok_or_else(outside)?;
        let inside = |pos: i32, start: i32, count: i32| {
            start <= pos && i64::from(pos) < i64::from(start) + i64::from(count)
        };
        if !inside(x, self.start.0, self.count.0) || !inside(y, self.start.1, self.count.1) {
            return Err(outside());
        }
        Ok(self.tiles.entry((x, y)).or_insert_with(|| {
            trace!("New tile {}_{}", x, y);
            Tile::new(x, y)
        }))
    }

    /// Adds a line to the tile containing its first vertex.
    ///
    /// Lines without vertices cannot be anchored and are rejected with
    /// [`Error::OutsideGrid`] at `NaN`.
    pub fn insert_line(&mut self, line: LineFeature) -> Result<()> {
        let anchor = match line.vertices.first() {
            Some(&v) => v,
            None => {
                return Err(Error::OutsideGrid {
                    x: f32::NAN,
                    y: f32::NAN,
                })
            }
        };
        self.tile_mut(anchor)?.lines.push(line);
        Ok(())
    }

    /// Adds a polygon to the tile containing `anchor`, the first vertex of its
    /// source ring.
    pub fn insert_polygon(&mut self, anchor: Vertex, polygon: PolygonFeature) -> Result<()> {
        self.tile_mut(anchor)?.polygons.push(polygon);
        Ok(())
    }

    /// Number of non-empty tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, grid_x: i32, grid_y: i32) -> Option<&Tile> {
        self.tiles.get(&(grid_x, grid_y))
    }

    /// Non-empty tiles ordered by `(grid_x, grid_y)`.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn into_tiles(self) -> Vec<Tile> {
        self.tiles.into_values().collect()
    }
}
