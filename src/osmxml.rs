//! Streaming passes over OSM XML.
//!
//! The input is read twice: the node pass collects the coordinates of all
//! nodes, the way pass collects node references and recognized tags of all
//! ways. Neither pass builds a document tree; memory use is bounded by the
//! largest single element.

use crate::error::{Error, Result};
use crate::nodes::{Node, NodeIndexBuilder};
use crate::projection::Projection;
use crate::tags::Tag;
use crate::tagsets::{TagSet, TagSetId, TagSetTable};

use flate2::read::MultiGzDecoder;
use log::{debug, trace};
use pbr::{ProgressBar, Units};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Stderr};
use std::path::{Path, PathBuf};
use std::str::{self, FromStr};
use std::time::Duration;

/// Default size of the read buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 20;

/// Input that can be streamed more than once.
pub trait OsmSource {
    /// Opens a new stream positioned at the start of the input.
    fn open(&self) -> Result<Box<dyn BufRead + '_>>;
}

impl OsmSource for [u8] {
    fn open(&self) -> Result<Box<dyn BufRead + '_>> {
        Ok(Box::new(self))
    }
}

/// OSM XML file, gzip compressed if its name ends with `.gz`.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    buffer_size: usize,
    progress: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            progress: false,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Shows a progress bar on stderr while a pass reads the file.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_gzip(&self) -> bool {
        self.path.extension().map_or(false, |ext| ext == "gz")
    }
}

impl OsmSource for FileSource {
    fn open(&self) -> Result<Box<dyn BufRead + '_>> {
        let file = File::open(&self.path)?;
        let raw: Box<dyn Read> = if self.progress {
            let len = file.metadata()?.len();
            Box::new(ProgressReader::new(file, len))
        } else {
            Box::new(file)
        };
        let reader: Box<dyn BufRead> = if self.is_gzip() {
            let decoder = MultiGzDecoder::new(BufReader::new(raw));
            Box::new(BufReader::with_capacity(self.buffer_size, decoder))
        } else {
            Box::new(BufReader::with_capacity(self.buffer_size, raw))
        };
        Ok(reader)
    }
}

/// Counts the bytes read from the underlying file on a progress bar.
struct ProgressReader<R> {
    inner: R,
    pb: ProgressBar<Stderr>,
}

impl<R> ProgressReader<R> {
    fn new(inner: R, len: u64) -> Self {
        let mut pb = ProgressBar::on(io::stderr(), len);
        pb.set_units(Units::Bytes);
        pb.set_max_refresh_rate(Some(Duration::from_millis(200)));
        pb.message("Reading input... ");
        Self { inner, pb }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pb.add(n as u64);
        Ok(n)
    }
}

impl<R> Drop for ProgressReader<R> {
    fn drop(&mut self) {
        self.pb.finish();
    }
}

fn parse_number<T: FromStr>(attribute: &'static str, value: &[u8], position: usize) -> Result<T> {
    str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::InvalidNumber {
            attribute,
            value: String::from_utf8_lossy(value).into_owned(),
            position,
        })
}

/// Like `parse_number`, but also rejects `NaN` and infinite values.
fn parse_coordinate(attribute: &'static str, value: &[u8], position: usize) -> Result<f64> {
    let coord: f64 = parse_number(attribute, value, position)?;
    if !coord.is_finite() {
        return Err(Error::InvalidNumber {
            attribute,
            value: String::from_utf8_lossy(value).into_owned(),
            position,
        });
    }
    Ok(coord)
}

fn missing(element: &'static str, attribute: &'static str, position: usize) -> Error {
    Error::MissingAttribute {
        element,
        attribute,
        position,
    }
}

fn parse_node(e: &BytesStart, projection: &dyn Projection, position: usize) -> Result<Node> {
    let mut id = None;
    let mut lat = None;
    let mut lon = None;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"id" => id = Some(parse_number("id", &attr.value, position)?),
            b"lat" => lat = Some(parse_coordinate("lat", &attr.value, position)?),
            b"lon" => lon = Some(parse_coordinate("lon", &attr.value, position)?),
            _ => (),
        }
    }
    let id = id.ok_or_else(|| missing("node", "id", position))?;
    let lat = lat.ok_or_else(|| missing("node", "lat", position))?;
    let lon = lon.ok_or_else(|| missing("node", "lon", position))?;
    let (x, y) = projection.project(lat, lon);
    Ok(Node { id, lat, lon, x, y })
}

fn xml_reader<R: BufRead>(input: R) -> Reader<R> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);
    reader
}

/// Node pass: collects every `<node>` with its projected coordinates.
///
/// Missing or malformed `id`, `lat` or `lon` attributes abort the pass.
pub fn read_nodes<R: BufRead>(input: R, projection: &dyn Projection) -> Result<NodeIndexBuilder> {
    let mut reader = xml_reader(input);
    let mut buf = Vec::new();
    let mut nodes = NodeIndexBuilder::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"node" => {
                nodes.insert(parse_node(&e, projection, reader.buffer_position())?);
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    debug!("Read {} nodes", nodes.len());
    Ok(nodes)
}

/// A way as read from the input, before its node references are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWay {
    /// Referenced node ids in path order.
    pub nodes: Vec<u64>,
    pub tagset: TagSetId,
    pub oneway: bool,
    /// Number of `<nd>` children whose `ref` was missing or not a node id.
    pub malformed_refs: usize,
}

/// Way being assembled from the children of an open `<way>` element.
#[derive(Debug, Default)]
struct PendingWay {
    nodes: Vec<u64>,
    tags: TagSet,
    oneway: bool,
    malformed_refs: usize,
}

/// Parser state of the way pass.
#[derive(Debug, Default)]
struct WayPass {
    // `Some` between `<way>` and `</way>`
    current: Option<PendingWay>,
    num_ways: usize,
}

impl WayPass {
    fn start(&mut self, e: &BytesStart, position: usize) -> Result<()> {
        match e.name().as_ref() {
            b"way" => self.current = Some(PendingWay::default()),
            b"nd" => {
                if let Some(way) = &mut self.current {
                    let mut node_ref = Err(missing("nd", "ref", position));
                    for attr in e.attributes() {
                        let attr = attr?;
                        if attr.key.as_ref() == b"ref" {
                            node_ref = parse_number("ref", &attr.value, position);
                        }
                    }
                    match node_ref {
                        Ok(id) => way.nodes.push(id),
                        Err(err) => {
                            trace!("Skipping node reference: {}", err);
                            way.malformed_refs += 1;
                        }
                    }
                }
            }
            b"tag" => {
                if let Some(way) = &mut self.current {
                    let mut key = None;
                    let mut value = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"k" => key = Some(attr.unescape_value()?),
                            b"v" => value = Some(attr.unescape_value()?),
                            _ => (),
                        }
                    }
                    if let (Some(key), Some(value)) = (key, value) {
                        if key == "oneway" && (value == "yes" || value == "true") {
                            way.oneway = true;
                        }
                        if let Some(tag) = Tag::lookup(&key, &value) {
                            way.tags.insert(tag);
                        }
                    }
                }
            }
            _ => (),
        }
        Ok(())
    }

    fn end<F>(&mut self, name: &[u8], tagsets: &mut TagSetTable, on_way: &mut F) -> Result<()>
    where
        F: FnMut(RawWay, &TagSetTable) -> Result<()>,
    {
        if name != b"way" {
            return Ok(());
        }
        if let Some(way) = self.current.take() {
            self.num_ways += 1;
            let tagset = tagsets.intern(way.tags);
            let raw = RawWay {
                nodes: way.nodes,
                tagset,
                oneway: way.oneway,
                malformed_refs: way.malformed_refs,
            };
            on_way(raw, tagsets)?;
        }
        Ok(())
    }
}

/// Way pass: hands every `<way>` to `on_way` as soon as it is closed.
///
/// Recognized tags are interned into `tagsets`, all other tags are ignored.
/// Errors returned by `on_way` abort the pass. Returns the number of ways.
pub fn read_ways<R, F>(input: R, tagsets: &mut TagSetTable, mut on_way: F) -> Result<usize>
where
    R: BufRead,
    F: FnMut(RawWay, &TagSetTable) -> Result<()>,
{
    let mut reader = xml_reader(input);
    let mut buf = Vec::new();
    let mut pass = WayPass::default();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => pass.start(&e, reader.buffer_position())?,
            Event::Empty(e) => {
                pass.start(&e, reader.buffer_position())?;
                pass.end(e.name().as_ref(), tagsets, &mut on_way)?;
            }
            Event::End(e) => pass.end(e.name().as_ref(), tagsets, &mut on_way)?,
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    debug!("Read {} ways", pass.num_ways);
    Ok(pass.num_ways)
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    /// Uses `(lon, lat)` as planar coordinates.
    struct Identity;

    impl Projection for Identity {
        fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
            (lon, lat)
        }
    }

    const OSM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <bounds minlat="59.0" minlon="18.0" maxlat="59.1" maxlon="18.1"/>
  <node id="1" version="2" lat="59.0" lon="18.0"/>
  <node id="2" lat="59.01" lon="18.02">
    <tag k="highway" v="traffic_signals"/>
  </node>
  <node id="3" lat="59.02" lon="18.04"/>
  <way id="10">
    <nd ref="1"/>
    <nd ref="3"/>
    <nd ref="2"/>
    <tag k="highway" v="primary"/>
    <tag k="name" v="Main &amp; Street"/>
    <tag k="oneway" v="yes"/>
  </way>
  <way id="11">
    <nd ref="2"/>
    <nd ref="1"/>
    <tag k="oneway" v="no"/>
    <tag k="bridge" v="yes"/>
    <tag k="highway" v="primary"/>
  </way>
  <way id="12"/>
  <relation id="20">
    <member type="way" ref="10" role="outer"/>
    <tag k="natural" v="water"/>
  </relation>
</osm>
"#;

    fn ways(input: &str) -> Result<(Vec<RawWay>, TagSetTable)> {
        let mut tagsets = TagSetTable::new();
        let mut ways = Vec::new();
        read_ways(input.as_bytes(), &mut tagsets, |way, _| {
            ways.push(way);
            Ok(())
        })?;
        Ok((ways, tagsets))
    }

    #[test]
    fn test_read_nodes() {
        let index = read_nodes(OSM.as_bytes(), &Identity).unwrap().build();
        assert_eq!(index.len(), 3);
        let node = index.get(2).unwrap();
        assert_eq!((node.lat, node.lon), (59.01, 18.02));
        assert_eq!((node.x, node.y), (18.02, 59.01));
    }

    #[test]
    fn test_nodes_are_projected() {
        let input = r#"<osm><node id="7" lat="0" lon="180"/></osm>"#;
        let index = read_nodes(input.as_bytes(), &crate::projection::SphericalMercator)
            .unwrap()
            .build();
        let node = index.get(7).unwrap();
        assert!((node.x - 20_037_508.342_789_244).abs() < 1e-6);
        assert!(node.y.abs() < 1e-6);
    }

    #[test]
    fn test_malformed_nodes_are_fatal() {
        let input = r#"<osm><node id="1" lat="north" lon="18.0"/></osm>"#;
        match read_nodes(input.as_bytes(), &Identity) {
            Err(Error::InvalidNumber {
                attribute, value, ..
            }) => {
                assert_eq!(attribute, "lat");
                assert_eq!(value, "north");
            }
            other => panic!("unexpected result: {:?}", other.map(|n| n.len())),
        }

        let input = r#"<osm><node id="1" lat="59.0"/></osm>"#;
        assert!(matches!(
            read_nodes(input.as_bytes(), &Identity),
            Err(Error::MissingAttribute {
                element: "node",
                attribute: "lon",
                ..
            })
        ));

        let input = r#"<osm><node id="-1" lat="59.0" lon="18.0"/></osm>"#;
        assert!(matches!(
            read_nodes(input.as_bytes(), &Identity),
            Err(Error::InvalidNumber { attribute: "id", .. })
        ));

        for (lat, lon, attribute) in [
            ("NaN", "18.0", "lat"),
            ("59.0", "inf", "lon"),
            ("1e400", "18.0", "lat"),
            ("59.0", "-infinity", "lon"),
        ] {
            let input = format!(r#"<osm><node id="1" lat="{}" lon="{}"/></osm>"#, lat, lon);
            match read_nodes(input.as_bytes(), &Identity) {
                Err(Error::InvalidNumber { attribute: a, .. }) => assert_eq!(a, attribute),
                other => panic!("{} {}: unexpected result {:?}", lat, lon, other.map(|n| n.len())),
            }
        }
    }

    #[test]
    fn test_malformed_xml_is_fatal() {
        let input = r#"<osm><node id="1" lat="59.0" lon="18.0"></way></osm>"#;
        assert!(matches!(
            read_nodes(input.as_bytes(), &Identity),
            Err(Error::Xml(_))
        ));
        assert!(matches!(ways(input), Err(Error::Xml(_))));
    }

    #[test]
    fn test_read_ways() {
        let (ways, tagsets) = ways(OSM).unwrap();
        assert_eq!(ways.len(), 3);

        assert_eq!(ways[0].nodes, vec![1, 3, 2]);
        assert!(ways[0].oneway);
        assert_eq!(tagsets.get(ways[0].tagset).as_slice(), &[Tag::HighwayPrimary]);

        assert_eq!(ways[1].nodes, vec![2, 1]);
        assert!(!ways[1].oneway);
        assert_eq!(
            tagsets.get(ways[1].tagset).as_slice(),
            &[Tag::HighwayPrimary, Tag::BridgeYes]
        );

        // self-closing way without children
        assert!(ways[2].nodes.is_empty());
        assert!(tagsets.get(ways[2].tagset).is_empty());

        // node and relation tags are not collected
        assert_eq!(tagsets.len(), 3);
    }

    #[test]
    fn test_equal_tag_sets_are_shared() {
        let input = r#"<osm>
            <way id="1"><nd ref="1"/><tag k="highway" v="motorway"/><tag k="bridge" v="yes"/></way>
            <way id="2"><tag k="bridge" v="yes"/><tag k="highway" v="motorway"/><tag k="oneway" v="true"/></way>
            <way id="3"><tag k="highway" v="motorway"/></way>
        </osm>"#;
        let (ways, tagsets) = ways(input).unwrap();
        assert_eq!(ways[0].tagset, ways[1].tagset);
        assert_ne!(ways[0].tagset, ways[2].tagset);
        assert!(ways[1].oneway);
        assert_eq!(tagsets.len(), 2);
    }

    #[test]
    fn test_malformed_node_refs_are_skipped() {
        let input = r#"<osm>
            <way id="1"><nd ref="-3"/><nd ref="1"/><nd/><tag k="highway" v="primary"/></way>
            <way id="2"><nd ref="x"/></way>
            <way id="3"><nd ref="1"/><nd ref="2"/><tag k="highway" v="primary"/></way>
        </osm>"#;
        let (ways, tagsets) = ways(input).unwrap();
        assert_eq!(ways.len(), 3);
        assert_eq!(ways[0].nodes, vec![1]);
        assert_eq!(ways[0].malformed_refs, 2);
        assert_eq!(ways[1].malformed_refs, 1);
        assert_eq!(ways[2].nodes, vec![1, 2]);
        assert_eq!(ways[2].malformed_refs, 0);
        assert_eq!(ways[0].tagset, ways[2].tagset);
        assert_eq!(tagsets.get(ways[2].tagset).as_slice(), &[Tag::HighwayPrimary]);
    }

    #[test]
    fn test_way_pass_errors() {
        let input = r#"<osm><way id="1"><nd ref="1" ref="2"/></way></osm>"#;
        assert!(matches!(ways(input), Err(Error::Attr(_))));

        // errors of the callback abort the pass
        let mut tagsets = TagSetTable::new();
        let mut calls = 0;
        let result = read_ways(OSM.as_bytes(), &mut tagsets, |_, _| {
            calls += 1;
            Err(Error::Format("stop".into()))
        });
        assert!(matches!(result, Err(Error::Format(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_gzip_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.osm.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(OSM.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let source = FileSource::new(&path).with_buffer_size(64);
        assert_eq!(source.path(), path.as_path());
        // both passes can open the source
        let nodes = read_nodes(source.open().unwrap(), &Identity).unwrap();
        assert_eq!(nodes.len(), 3);
        let mut tagsets = TagSetTable::new();
        let count = read_ways(source.open().unwrap(), &mut tagsets, |_, _| Ok(())).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_plain_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.osm");
        std::fs::write(&path, OSM).unwrap();
        let nodes = read_nodes(FileSource::new(&path).open().unwrap(), &Identity).unwrap();
        assert_eq!(nodes.len(), 3);

        assert!(matches!(
            FileSource::new(dir.path().join("missing.osm")).open(),
            Err(Error::Io(_))
        ));
    }
}
