//! Turns ways into styled line or polygon features.

use crate::format::{LineFeature, PolygonFeature, Vertex};
use crate::nodes::NodeIndex;
use crate::osmxml::RawWay;
use crate::style::{line_style, polygon_color};
use crate::tags::Tag;
use crate::tagsets::TagSet;
use crate::tessellate::{TessellateError, Tessellator, Triangulation};

use std::fmt;

/// Why a way did not produce a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    /// The way references a node which is not in the input.
    UnresolvedNode(u64),
    /// An `<nd>` child of the way has a missing or invalid `ref`.
    MalformedNodeRef,
    /// A line with less than 2 vertices.
    TooFewVertices,
    /// An area tagged way whose last node differs from its first one.
    OpenRing,
    /// A ring with less than 3 distinct vertices or without area.
    DegenerateRing,
    /// The tessellator rejected the ring.
    Tessellation,
    /// Neither a used highway nor a used area class.
    Unclassified,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DropReason::UnresolvedNode(id) => write!(f, "unresolved node {}", id),
            DropReason::MalformedNodeRef => write!(f, "malformed node reference"),
            DropReason::TooFewVertices => write!(f, "too few vertices"),
            DropReason::OpenRing => write!(f, "open ring"),
            DropReason::DegenerateRing => write!(f, "degenerate ring"),
            DropReason::Tessellation => write!(f, "tessellation failed"),
            DropReason::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Outcome of classifying a single way.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Line(LineFeature),
    /// A filled area; `anchor` is the first vertex of its ring and decides the
    /// tile the polygon is stored in.
    Polygon {
        anchor: Vertex,
        feature: PolygonFeature,
    },
    Dropped(DropReason),
}

/// Height offset of a highway: its base offset, moved by the explicit layer of
/// a bridge or tunnel, or by one step up (bridge) resp. down (tunnel) if no
/// layer is given.
fn line_height(base: f32, tags: &TagSet) -> f32 {
    let bridge = tags.contains(Tag::BridgeYes);
    let tunnel = tags.contains(Tag::TunnelYes);
    if !bridge && !tunnel {
        return base;
    }
    match tags.iter().find_map(Tag::layer) {
        Some(layer) => base + f32::from(layer),
        None => base + f32::from(bridge as u8) - f32::from(tunnel as u8),
    }
}

/// Classifies and styles ways.
///
/// Highways take priority: a way tagged with a used highway class is always a
/// line, even if it carries an area class as well. Among several classes of
/// the same kind, the one listed first in the tag catalog wins.
pub struct Classifier<'a> {
    nodes: &'a NodeIndex,
    tessellator: Box<dyn Tessellator>,
    ring: Vec<(f64, f64)>,
}

impl<'a> Classifier<'a> {
    pub fn new(nodes: &'a NodeIndex, triangulation: Triangulation) -> Self {
        Self::with_tessellator(nodes, triangulation.tessellator())
    }

    pub fn with_tessellator(nodes: &'a NodeIndex, tessellator: Box<dyn Tessellator>) -> Self {
        Self {
            nodes,
            tessellator,
            ring: Vec::new(),
        }
    }

    pub fn classify(&mut self, way: &RawWay, tags: &TagSet) -> Classified {
        if way.malformed_refs > 0 {
            return Classified::Dropped(DropReason::MalformedNodeRef);
        }
        if let Some(class) = tags.iter().find(|tag| tag.is_used_highway()) {
            return match self.line(class, way, tags) {
                Ok(line) => Classified::Line(line),
                Err(reason) => Classified::Dropped(reason),
            };
        }
        if let Some(class) = tags.iter().find(|tag| tag.is_used_polygon()) {
            return match self.polygon(class, way) {
                Ok((anchor, feature)) => Classified::Polygon { anchor, feature },
                Err(reason) => Classified::Dropped(reason),
            };
        }
        Classified::Dropped(DropReason::Unclassified)
    }

    fn line(&self, class: Tag, way: &RawWay, tags: &TagSet) -> Result<LineFeature, DropReason> {
        let style = line_style(class).ok_or(DropReason::Unclassified)?;
        let vertices = way
            .nodes
            .iter()
            .map(|&id| {
                self.nodes
                    .get(id)
                    .map(|node| node.vertex())
                    .ok_or(DropReason::UnresolvedNode(id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if vertices.len() < 2 {
            return Err(DropReason::TooFewVertices);
        }
        Ok(LineFeature {
            width: style.width,
            height: line_height(style.height, tags),
            outline: style.outline,
            fill: style.fill,
            bridge: tags.contains(Tag::BridgeYes),
            tunnel: tags.contains(Tag::TunnelYes),
            vertices,
        })
    }

    fn polygon(&mut self, class: Tag, way: &RawWay) -> Result<(Vertex, PolygonFeature), DropReason> {
        let rgba = polygon_color(class).ok_or(DropReason::Unclassified)?;
        self.ring.clear();
        for &id in &way.nodes {
            let node = self.nodes.get(id).ok_or(DropReason::UnresolvedNode(id))?;
            self.ring.push((node.x, node.y));
        }

        match (way.nodes.first(), way.nodes.last()) {
            (Some(first), Some(last)) if first != last => return Err(DropReason::OpenRing),
            (None, _) | (_, None) => return Err(DropReason::DegenerateRing),
            _ => (),
        }
        // the closing vertex repeats the first one
        self.ring.pop();
        if self.ring.len() < 3 {
            return Err(DropReason::DegenerateRing);
        }

        let triangles = self.tessellator.tessellate(&self.ring).map_err(|e| match e {
            TessellateError::TooFewVertices(_) | TessellateError::Degenerate => {
                DropReason::DegenerateRing
            }
            TessellateError::Failed(_) | TessellateError::Empty => DropReason::Tessellation,
        })?;
        let (x, y) = self.ring[0];
        let anchor = Vertex::new(x as f32, y as f32);
        Ok((anchor, PolygonFeature::new(rgba, triangles)))
    }
}
