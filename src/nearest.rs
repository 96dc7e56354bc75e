//! Proximity queries on the node index.
//!
//! Nodes are kept in a second order, sorted by latitude. A query binary
//! searches the query latitude and then walks outwards in both directions.
//! Since the distance between two points is at least the distance between
//! their latitudes, the walk in one direction stops as soon as the latitude
//! difference alone exceeds the best (resp. the requested) distance.

use crate::nodes::{Node, NodeIndex};

use rayon::prelude::*;

use std::f64::consts::PI;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS: f64 = 6_371_009.0;

/// Degrees of latitude per meter along a meridian.
const DISTANCE_TO_LAT_FACTOR: f64 = 180.0 / (PI * EARTH_RADIUS);

/// Distance in meters between two points given in degrees.
///
/// Uses the equirectangular (flat Earth) approximation, which is accurate for
/// the short distances inside of a tile but not over long ranges.
pub fn distance(from_lat: f64, from_lon: f64, to_lat: f64, to_lon: f64) -> f64 {
    let phi_m = (to_lat + from_lat) / 360.0 * PI;
    let phi = (to_lat - from_lat) / 180.0 * PI;
    let lambda = (to_lon - from_lon) / 180.0 * PI;
    EARTH_RADIUS * (phi * phi + (phi_m.cos() * lambda).powi(2)).sqrt()
}

/// Latitude-sorted view of a [`NodeIndex`].
pub struct LatitudeIndex<'a> {
    nodes: &'a [Node],
    by_lat: Vec<usize>,
}

impl<'a> LatitudeIndex<'a> {
    pub fn new(index: &'a NodeIndex) -> Self {
        let nodes = index.nodes();
        let mut by_lat: Vec<usize> = (0..nodes.len()).collect();
        by_lat.par_sort_unstable_by(|&a, &b| nodes[a].lat.total_cmp(&nodes[b].lat));
        Self { nodes, by_lat }
    }

    #[inline]
    fn at(&self, pos: usize) -> &'a Node {
        &self.nodes[self.by_lat[pos]]
    }

    /// Position of the first node with latitude not less than `lat`.
    fn insertion_point(&self, lat: f64) -> usize {
        self.by_lat
            .partition_point(|&idx| self.nodes[idx].lat < lat)
    }

    /// Returns the node closest to `(lat, lon)`, or `None` if the index is
    /// empty.
    ///
    /// If several nodes are at exactly the same distance, the first one met by
    /// the scan wins: the node at the insertion point, then nodes below it,
    /// then nodes above it. Callers needing a stable choice among equidistant
    /// nodes should break ties themselves, e.g. by id.
    pub fn closest(&self, lat: f64, lon: f64) -> Option<&'a Node> {
        if self.by_lat.is_empty() {
            return None;
        }
        let start = self.insertion_point(lat).min(self.by_lat.len() - 1);

        let mut closest = self.at(start);
        let mut min_d = distance(lat, lon, closest.lat, closest.lon);

        let mut visit = |node: &'a Node, min_d: &mut f64| -> bool {
            if (node.lat - lat).abs() >= *min_d * DISTANCE_TO_LAT_FACTOR {
                return false;
            }
            let d = distance(lat, lon, node.lat, node.lon);
            if d < *min_d {
                closest = node;
                *min_d = d;
            }
            true
        };

        for pos in (0..start).rev() {
            if !visit(self.at(pos), &mut min_d) {
                break;
            }
        }
        for pos in start + 1..self.by_lat.len() {
            if !visit(self.at(pos), &mut min_d) {
                break;
            }
        }
        Some(closest)
    }

    /// Returns the ids of all nodes strictly closer than `radius` meters to
    /// `(lat, lon)`, in ascending order.
    pub fn within_radius(&self, lat: f64, lon: f64, radius: f64) -> Vec<u64> {
        let max_lat_diff = radius * DISTANCE_TO_LAT_FACTOR;
        let start = self.insertion_point(lat);
        let in_band = |node: &&Node| (node.lat - lat).abs() < max_lat_diff;

        let below = (0..start).rev().map(|pos| self.at(pos)).take_while(in_band);
        let above = (start..self.by_lat.len())
            .map(|pos| self.at(pos))
            .take_while(in_band);

        let mut result: Vec<u64> = below
            .chain(above)
            .filter(|node| distance(lat, lon, node.lat, node.lon) < radius)
            .map(|node| node.id)
            .collect();
        result.sort_unstable();
        result
    }
}
