//! The compilation pipeline from OSM XML to tile files.

use crate::classify::{Classified, Classifier, DropReason};
use crate::error::{Error, Result};
use crate::format::{self, TileReader, Vertex};
use crate::osmxml::{self, FileSource, OsmSource, DEFAULT_BUFFER_SIZE};
use crate::projection::SphericalMercator;
use crate::stats::Stats;
use crate::tagsets::TagSetTable;
use crate::tessellate::Triangulation;
use crate::tiles::{Bounds, Tile, TileGrid};

use log::{info, trace, warn};
use rayon::prelude::*;

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default edge length of a tile in projected meters.
pub const DEFAULT_TILE_SIZE: f64 = 5000.0;

#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Edge length of the square tiles.
    pub tile_size: f64,
    pub triangulation: Triangulation,
    /// Size of the read buffer used for input files.
    pub buffer_size: usize,
    /// Show progress bars on stderr while reading input files.
    pub progress: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            triangulation: Triangulation::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            progress: false,
        }
    }
}

/// Compiles the OSM XML file at `path` into tiles.
pub fn compile_file(path: &Path, config: &CompileConfig) -> Result<(TileGrid, Stats)> {
    let source = FileSource::new(path)
        .with_buffer_size(config.buffer_size)
        .with_progress(config.progress);
    compile(&source, config)
}

/// Runs both passes over `source` and buckets the resulting features.
///
/// Ways that cannot be turned into a feature are skipped and counted in the
/// returned statistics; malformed input aborts with an error.
pub fn compile<S: OsmSource + ?Sized>(source: &S, config: &CompileConfig) -> Result<(TileGrid, Stats)> {
    let mut stats = Stats::default();

    info!("Reading nodes...");
    let nodes = osmxml::read_nodes(source.open()?, &SphericalMercator)?;
    info!("Building node index...");
    let index = nodes.build();
    stats.num_nodes = index.len();
    info!("Node index built: {} nodes.", index.len());

    let bounds = index.bounds().unwrap_or_else(|| {
        warn!("Input does not contain any nodes");
        Bounds::from_vertex(Vertex::default())
    });
    let mut grid = TileGrid::new(bounds, config.tile_size)?;
    let (count_x, count_y) = grid.count();
    info!("Tile grid: {} x {} tiles of size {}", count_x, count_y, grid.edge());

    info!("Reading ways...");
    let mut classifier = Classifier::new(&index, config.triangulation);
    let mut tagsets = TagSetTable::new();
    let mut way_stats = Stats::default();
    let num_ways = osmxml::read_ways(source.open()?, &mut tagsets, |way, tagsets| {
        way_stats.num_oneway += way.oneway as usize;
        match classifier.classify(&way, tagsets.get(way.tagset)) {
            Classified::Line(line) => {
                grid.insert_line(line)?;
                way_stats.num_lines += 1;
            }
            Classified::Polygon { anchor, feature } => {
                grid.insert_polygon(anchor, feature)?;
                way_stats.num_polygons += 1;
            }
            Classified::Dropped(reason) => {
                if reason != DropReason::Unclassified {
                    trace!(
                        "Dropped way starting at node {:?}: {}",
                        way.nodes.first(),
                        reason
                    );
                }
                way_stats.record_drop(reason);
            }
        }
        Ok(())
    })?;
    way_stats.num_ways = num_ways;
    way_stats.num_tag_sets = tagsets.len();
    stats += way_stats;
    info!("Ways converted.");

    stats.num_tiles = grid.len();
    Ok((grid, stats))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Writes a file under a temporary name and renames it into place.
///
/// On failure the temporary file is removed again.
fn write_atomically<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let tmp = tmp_path(path);
    let mut writer = BufWriter::new(File::create(&tmp)?);
    let result = write(&mut writer)
        .and_then(|_| writer.flush())
        .and_then(|_| writer.into_inner().map_err(|e| e.into_error()))
        .and_then(|file| file.sync_all())
        .and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!("Failed to remove {}: {}", tmp.display(), e);
        }
    }
    result
}

fn write_tile(dir: &Path, tile: &Tile) -> Result<()> {
    let (x, y) = (tile.grid_x, tile.grid_y);
    write_atomically(&format::line_path(dir, x, y), |w| {
        format::write_lines(w, &tile.lines)
    })?;
    write_atomically(&format::poly_path(dir, x, y), |w| {
        format::write_polygons(w, &tile.polygons)
    })?;

    let reader = TileReader::open(dir, x, y)?;
    let (lines, polygons) = (reader.lines()?, reader.polygons()?);
    if lines.len() != tile.lines.len() || polygons.len() != tile.polygons.len() {
        return Err(Error::Format(format!(
            "tile {}_{} does not read back: {} lines and {} polygons instead of {} and {}",
            x,
            y,
            lines.len(),
            polygons.len(),
            tile.lines.len(),
            tile.polygons.len()
        )));
    }
    Ok(())
}

/// Writes the `.line` and `.poly` file of every non-empty tile into `dir`.
///
/// Tiles are written in parallel, each one only once its feature lists are
/// complete, and verified by reading them back. Returns the number of tiles.
pub fn write_tiles(grid: &TileGrid, dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)?;
    let tiles: Vec<&Tile> = grid.tiles().filter(|tile| !tile.is_empty()).collect();
    info!("Writing {} tiles to {}", tiles.len(), dir.display());
    tiles
        .par_iter()
        .try_for_each(|tile| write_tile(dir, tile))?;
    info!("Verified that all tiles can be read.");
    Ok(tiles.len())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::style::{line_style, polygon_color};
    use crate::tags::Tag;

    use std::collections::BTreeSet;

    // Four nodes of a lake and two nodes of a road, all within a few hundred
    // meters in Stockholm.
    const SCENARIO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <node id="1" lat="59.3300" lon="18.0600"/>
  <node id="2" lat="59.3300" lon="18.0610"/>
  <node id="3" lat="59.3305" lon="18.0610"/>
  <node id="4" lat="59.3305" lon="18.0600"/>
  <node id="5" lat="59.3302" lon="18.0620"/>
  <node id="6" lat="59.3304" lon="18.0625"/>
  <way id="100">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
    <tag k="natural" v="water"/>
  </way>
  <way id="101">
    <nd ref="5"/><nd ref="6"/>
    <tag k="highway" v="primary"/>
    <tag k="name" v="Sveavägen"/>
  </way>
</osm>
"#;

    fn config() -> CompileConfig {
        CompileConfig {
            tile_size: 10_000_000.0,
            ..Default::default()
        }
    }

    fn file_names(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_end_to_end() {
        let (grid, stats) = compile(SCENARIO.as_bytes(), &config()).unwrap();
        assert_eq!(stats.num_nodes, 6);
        assert_eq!(stats.num_ways, 2);
        assert_eq!(stats.num_lines, 1);
        assert_eq!(stats.num_polygons, 1);
        assert_eq!(stats.num_tiles, 1);

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(write_tiles(&grid, dir.path()).unwrap(), 1);

        let tile = grid.tiles().next().unwrap();
        let (x, y) = (tile.grid_x, tile.grid_y);
        let expected: BTreeSet<String> = [
            format::tile_file_name(x, y, "line"),
            format::tile_file_name(x, y, "poly"),
        ]
        .into_iter()
        .collect();
        assert_eq!(file_names(dir.path()), expected);

        let reader = TileReader::open(dir.path(), x, y).unwrap();
        let lines = reader.lines().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].vertex_count(), 2);
        assert_eq!(
            lines[0].width,
            line_style(Tag::HighwayPrimary).unwrap().width
        );

        let polygons = reader.polygons().unwrap();
        assert_eq!(polygons.len(), 1);
        assert_eq!(Some(polygons[0].rgba), polygon_color(Tag::NaturalWater));
        assert_eq!(polygons[0].triangle_count(), 2);

        // raw headers as seen by the renderer
        let data = fs::read(format::line_path(dir.path(), x, y)).unwrap();
        assert_eq!(&data[0..4], &1i32.to_le_bytes());
        assert_eq!(&data[4..8], &2i32.to_le_bytes());
        let data = fs::read(format::poly_path(dir.path(), x, y)).unwrap();
        assert_eq!(&data[0..4], &1i32.to_le_bytes());
        assert_eq!(&data[4..8], &6i32.to_le_bytes());
    }

    #[test]
    fn test_small_tiles() {
        let config = CompileConfig {
            tile_size: 50.0,
            triangulation: Triangulation::Fan,
            ..Default::default()
        };
        let (grid, stats) = compile(SCENARIO.as_bytes(), &config).unwrap();
        assert_eq!(stats.num_lines + stats.num_polygons, 2);
        // lake and road start more than 50m apart
        assert_eq!(grid.len(), 2);
        for tile in grid.tiles() {
            assert_eq!(tile.lines.len() + tile.polygons.len(), 1);
        }
    }

    #[test]
    fn test_broken_ways_are_skipped() {
        let input = r#"<osm>
          <node id="1" lat="10.0" lon="10.0"/>
          <node id="2" lat="10.001" lon="10.0"/>
          <node id="3" lat="10.001" lon="10.001"/>
          <way id="1"><nd ref="1"/><nd ref="99"/><tag k="highway" v="residential"/></way>
          <way id="2"><nd ref="1"/><nd ref="2"/><nd ref="3"/><tag k="landuse" v="grass"/></way>
          <way id="3"><nd ref="1"/><nd ref="2"/><nd ref="1"/><tag k="building" v="yes"/></way>
          <way id="4"><nd ref="1"/><nd ref="2"/><tag k="waterway" v="river"/></way>
          <way id="5"><nd ref="1"/><nd ref="2"/><tag k="highway" v="residential"/><tag k="natural" v="water"/><tag k="oneway" v="yes"/></way>
        </osm>"#;
        let (grid, stats) = compile(input.as_bytes(), &config()).unwrap();
        assert_eq!(stats.num_ways, 5);
        assert_eq!(stats.num_oneway, 1);
        assert_eq!(stats.num_unresolved_node_ids, 1);
        assert_eq!(stats.num_open_rings, 1);
        assert_eq!(stats.num_degenerate_rings, 1);
        assert_eq!(stats.num_unclassified, 1);
        assert_eq!(stats.num_lines, 1);
        assert_eq!(stats.num_polygons, 0);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_malformed_node_refs_skip_the_way() {
        let input = r#"<osm>
          <node id="1" lat="10.0" lon="10.0"/>
          <node id="2" lat="10.001" lon="10.0"/>
          <way id="1"><nd ref="-3"/><nd ref="1"/><nd ref="2"/><tag k="highway" v="residential"/></way>
          <way id="2"><nd ref="1"/><nd ref="2"/><tag k="highway" v="residential"/></way>
        </osm>"#;
        let (grid, stats) = compile(input.as_bytes(), &config()).unwrap();
        assert_eq!(stats.num_ways, 2);
        assert_eq!(stats.num_malformed_node_refs, 1);
        assert_eq!(stats.num_dropped(), 1);
        assert_eq!(stats.num_lines, 1);
        assert_eq!(grid.tiles().map(|t| t.lines.len()).sum::<usize>(), 1);
    }

    #[test]
    fn test_too_small_tile_size() {
        let config = CompileConfig {
            tile_size: 0.0001,
            ..Default::default()
        };
        assert!(matches!(
            compile(SCENARIO.as_bytes(), &config),
            Err(Error::TileSize { .. })
        ));
    }

    #[test]
    fn test_failed_write_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0_0.line");
        let result = write_atomically(&path, |w| {
            w.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        });
        assert_eq!(result.unwrap_err().to_string(), "disk full");
        assert!(file_names(dir.path()).is_empty());

        // an existing tile is kept untouched
        fs::write(&path, b"old").unwrap();
        let result = write_atomically(&path, |_| Err(io::Error::new(io::ErrorKind::Other, "stop")));
        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), b"old");
        assert_eq!(file_names(dir.path()).len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let (grid, stats) = compile(b"<osm></osm>".as_slice(), &config()).unwrap();
        assert!(grid.is_empty());
        assert_eq!(stats, Stats::default());

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(write_tiles(&grid, dir.path()).unwrap(), 0);
        assert!(file_names(dir.path()).is_empty());
    }

    #[test]
    fn test_malformed_input_is_fatal() {
        let input = r#"<osm><node id="1" lat="10.0" lon="x"/></osm>"#;
        assert!(matches!(
            compile(input.as_bytes(), &config()),
            Err(Error::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_compile_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scenario.osm");
        fs::write(&input, SCENARIO).unwrap();
        let (_, stats) = compile_file(&input, &config()).unwrap();
        assert_eq!(stats.num_lines, 1);
        assert_eq!(stats.num_polygons, 1);
    }

    #[test]
    fn test_overwrites_tiles() {
        let (grid, _) = compile(SCENARIO.as_bytes(), &config()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_tiles(&grid, dir.path()).unwrap();
        write_tiles(&grid, dir.path()).unwrap();
        // no temporary files are left behind
        assert_eq!(file_names(dir.path()).len(), 2);
    }
}
