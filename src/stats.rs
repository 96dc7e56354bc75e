use crate::classify::DropReason;

use std::fmt;
use std::ops::AddAssign;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub num_nodes: usize,
    pub num_ways: usize,
    pub num_oneway: usize,
    pub num_tag_sets: usize,
    pub num_lines: usize,
    pub num_polygons: usize,
    pub num_tiles: usize,
    pub num_unresolved_node_ids: usize,
    pub num_malformed_node_refs: usize,
    pub num_short_lines: usize,
    pub num_open_rings: usize,
    pub num_degenerate_rings: usize,
    pub num_failed_tessellations: usize,
    pub num_unclassified: usize,
}

impl Stats {
    pub fn record_drop(&mut self, reason: DropReason) {
        let counter = match reason {
            DropReason::UnresolvedNode(_) => &mut self.num_unresolved_node_ids,
            DropReason::MalformedNodeRef => &mut self.num_malformed_node_refs,
            DropReason::TooFewVertices => &mut self.num_short_lines,
            DropReason::OpenRing => &mut self.num_open_rings,
            DropReason::DegenerateRing => &mut self.num_degenerate_rings,
            DropReason::Tessellation => &mut self.num_failed_tessellations,
            DropReason::Unclassified => &mut self.num_unclassified,
        };
        *counter += 1;
    }

    /// Ways that were classified but could not be turned into a feature.
    pub fn num_dropped(&self) -> usize {
        self.num_unresolved_node_ids
            + self.num_malformed_node_refs
            + self.num_short_lines
            + self.num_open_rings
            + self.num_degenerate_rings
            + self.num_failed_tessellations
    }
}

impl AddAssign for Stats {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.num_nodes += other.num_nodes;
        self.num_ways += other.num_ways;
        self.num_oneway += other.num_oneway;
        self.num_tag_sets += other.num_tag_sets;
        self.num_lines += other.num_lines;
        self.num_polygons += other.num_polygons;
        self.num_tiles += other.num_tiles;
        self.num_unresolved_node_ids += other.num_unresolved_node_ids;
        self.num_malformed_node_refs += other.num_malformed_node_refs;
        self.num_short_lines += other.num_short_lines;
        self.num_open_rings += other.num_open_rings;
        self.num_degenerate_rings += other.num_degenerate_rings;
        self.num_failed_tessellations += other.num_failed_tessellations;
        self.num_unclassified += other.num_unclassified;
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            r#"Converted:
  nodes:        {}
  ways:         {} ({} oneway)
  tag sets:     {}
Features:
  lines:        {}
  polygons:     {}
  tiles:        {}
Dropped ways:
  unresolved:   {}
  malformed:    {}
  short lines:  {}
  open rings:   {}
  degenerate:   {}
  tessellation: {}
  unclassified: {}"#,
            self.num_nodes,
            self.num_ways,
            self.num_oneway,
            self.num_tag_sets,
            self.num_lines,
            self.num_polygons,
            self.num_tiles,
            self.num_unresolved_node_ids,
            self.num_malformed_node_refs,
            self.num_short_lines,
            self.num_open_rings,
            self.num_degenerate_rings,
            self.num_failed_tessellations,
            self.num_unclassified
        )
    }
}
