//! Binary tile format read by the renderer.
//!
//! Every non-empty tile is stored as two files, `<x>_<y>.line` and
//! `<x>_<y>.poly`. Both are little-endian and consist of a count header, an
//! array of fixed size per-feature headers and finally the vertex data of all
//! features in the same order. A reader sizes its buffers from the headers
//! before it reads any vertex.
//!
//! `.line`:
//!
//! ```text
//! i32   feature_count
//! i32   total_vertex_count
//! feature_count × { i32 vertex_count, f32 width, f32 height,
//!                   u8[4] outline_rgba, u8[4] fill_rgba,
//!                   i32 bridge, i32 tunnel }
//! feature_count × f32[2 × vertex_count]
//! ```
//!
//! `.poly`:
//!
//! ```text
//! i32   feature_count
//! i32   total_triangle_vertex_count
//! feature_count × { i32 triangle_count, u8[4] rgba }
//! feature_count × f32[6 × triangle_count]
//! ```

use crate::error::{Error, Result};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use memmap2::Mmap;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// RGBA color, 8 bits per channel.
pub type Rgba = [u8; 4];

/// Size in bytes of a line feature header.
pub const LINE_HEADER_SIZE: usize = 28;
/// Size in bytes of a polygon feature header.
pub const POLYGON_HEADER_SIZE: usize = 8;

const VERTEX_SIZE: usize = 8;

/// Planar point as stored in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Styled path, rendered by the client as a thick line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub width: f32,
    /// Height offset used by the renderer to order overlapping lines.
    pub height: f32,
    pub outline: Rgba,
    pub fill: Rgba,
    pub bridge: bool,
    pub tunnel: bool,
    pub vertices: Vec<Vertex>,
}

impl LineFeature {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Filled area, stored as a plain triangle list.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    pub rgba: Rgba,
    // three consecutive vertices per triangle
    triangles: Vec<Vertex>,
}

impl PolygonFeature {
    /// Creates a polygon from a list of triangle corners.
    ///
    /// Panics if the number of corners is not a multiple of 3.
    pub fn new(rgba: Rgba, triangles: Vec<Vertex>) -> Self {
        assert_eq!(triangles.len() % 3, 0, "incomplete triangle");
        Self { rgba, triangles }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn triangles(&self) -> &[Vertex] {
        &self.triangles
    }
}

fn to_i32(count: usize, what: &str) -> io::Result<i32> {
    i32::try_from(count).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} {} do not fit into the tile format", count, what),
        )
    })
}

fn write_vertices<W: Write>(writer: &mut W, vertices: &[Vertex]) -> io::Result<()> {
    for v in vertices {
        writer.write_f32::<LittleEndian>(v.x)?;
        writer.write_f32::<LittleEndian>(v.y)?;
    }
    Ok(())
}

/// Writes line features in `.line` layout.
pub fn write_lines<W: Write>(writer: &mut W, lines: &[LineFeature]) -> io::Result<()> {
    let total: usize = lines.iter().map(LineFeature::vertex_count).sum();
    writer.write_i32::<LittleEndian>(to_i32(lines.len(), "lines")?)?;
    writer.write_i32::<LittleEndian>(to_i32(total, "line vertices")?)?;
    for line in lines {
        writer.write_i32::<LittleEndian>(to_i32(line.vertex_count(), "line vertices")?)?;
        writer.write_f32::<LittleEndian>(line.width)?;
        writer.write_f32::<LittleEndian>(line.height)?;
        writer.write_all(&line.outline)?;
        writer.write_all(&line.fill)?;
        writer.write_i32::<LittleEndian>(line.bridge as i32)?;
        writer.write_i32::<LittleEndian>(line.tunnel as i32)?;
    }
    for line in lines {
        write_vertices(writer, &line.vertices)?;
    }
    Ok(())
}

/// Writes polygon features in `.poly` layout.
pub fn write_polygons<W: Write>(writer: &mut W, polygons: &[PolygonFeature]) -> io::Result<()> {
    let total: usize = polygons.iter().map(|p| p.triangles.len()).sum();
    writer.write_i32::<LittleEndian>(to_i32(polygons.len(), "polygons")?)?;
    writer.write_i32::<LittleEndian>(to_i32(total, "triangle vertices")?)?;
    for polygon in polygons {
        writer.write_i32::<LittleEndian>(to_i32(polygon.triangle_count(), "triangles")?)?;
        writer.write_all(&polygon.rgba)?;
    }
    for polygon in polygons {
        write_vertices(writer, &polygon.triangles)?;
    }
    Ok(())
}

/// Reads little-endian values from a byte slice, failing on truncation.
struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.data.len() < len {
            return Err(Error::Format(format!(
                "unexpected end of data: need {} bytes, {} left",
                len,
                self.data.len()
            )));
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    fn i32(&mut self) -> Result<i32> {
        self.take(4).map(LittleEndian::read_i32)
    }

    fn f32(&mut self) -> Result<f32> {
        self.take(4).map(LittleEndian::read_f32)
    }

    fn count(&mut self, what: &str) -> Result<usize> {
        let value = self.i32()?;
        usize::try_from(value).map_err(|_| Error::Format(format!("negative {}: {}", what, value)))
    }

    fn flag(&mut self, what: &str) -> Result<bool> {
        match self.i32()? {
            0 => Ok(false),
            1 => Ok(true),
            x => Err(Error::Format(format!("invalid {} flag: {}", what, x))),
        }
    }

    fn rgba(&mut self) -> Result<Rgba> {
        let mut rgba = [0; 4];
        rgba.copy_from_slice(self.take(4)?);
        Ok(rgba)
    }

    fn vertices(&mut self, count: usize) -> Result<Vec<Vertex>> {
        let len = count
            .checked_mul(VERTEX_SIZE)
            .ok_or_else(|| Error::Format(format!("vertex count overflow: {}", count)))?;
        let data = self.take(len)?;
        Ok(data
            .chunks_exact(VERTEX_SIZE)
            .map(|v| Vertex::new(LittleEndian::read_f32(v), LittleEndian::read_f32(&v[4..])))
            .collect())
    }

    /// Checks that the header array fits before allocating for it.
    fn expect_headers(&self, count: usize, header_size: usize) -> Result<()> {
        if count.saturating_mul(header_size) > self.data.len() {
            return Err(Error::Format(format!(
                "{} feature headers do not fit into {} bytes",
                count,
                self.data.len()
            )));
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(Error::Format(format!("{} trailing bytes", self.data.len())))
        }
    }
}

fn check_total(what: &str, header: usize, sum: usize) -> Result<()> {
    if header != sum {
        return Err(Error::Format(format!(
            "{} count mismatch: header says {}, features have {}",
            what, header, sum
        )));
    }
    Ok(())
}

/// Decodes a complete `.line` file.
pub fn read_lines(data: &[u8]) -> Result<Vec<LineFeature>> {
    let mut decoder = Decoder { data };
    let count = decoder.count("line count")?;
    let total = decoder.count("line vertex count")?;
    decoder.expect_headers(count, LINE_HEADER_SIZE)?;

    let mut headers = Vec::with_capacity(count);
    for _ in 0..count {
        let vertex_count = decoder.count("vertex count")?;
        let line = LineFeature {
            width: decoder.f32()?,
            height: decoder.f32()?,
            outline: decoder.rgba()?,
            fill: decoder.rgba()?,
            bridge: decoder.flag("bridge")?,
            tunnel: decoder.flag("tunnel")?,
            vertices: Vec::new(),
        };
        headers.push((vertex_count, line));
    }
    let sum = headers
        .iter()
        .try_fold(0usize, |sum, (n, _)| sum.checked_add(*n))
        .unwrap_or(usize::MAX);
    check_total("line vertex", total, sum)?;

    let mut lines = Vec::with_capacity(count);
    for (vertex_count, mut line) in headers {
        line.vertices = decoder.vertices(vertex_count)?;
        lines.push(line);
    }
    decoder.finish()?;
    Ok(lines)
}

/// Decodes a complete `.poly` file.
pub fn read_polygons(data: &[u8]) -> Result<Vec<PolygonFeature>> {
    let mut decoder = Decoder { data };
    let count = decoder.count("polygon count")?;
    let total = decoder.count("triangle vertex count")?;
    decoder.expect_headers(count, POLYGON_HEADER_SIZE)?;

    let mut headers = Vec::with_capacity(count);
    for _ in 0..count {
        let triangle_count = decoder.count("triangle count")?;
        let rgba = decoder.rgba()?;
        headers.push((triangle_count, rgba));
    }
    let sum = headers
        .iter()
        .try_fold(0usize, |sum, (n, _)| n.checked_mul(3)?.checked_add(sum))
        .unwrap_or(usize::MAX);
    check_total("triangle vertex", total, sum)?;

    let mut polygons = Vec::with_capacity(count);
    for (triangle_count, rgba) in headers {
        let triangles = decoder.vertices(triangle_count * 3)?;
        polygons.push(PolygonFeature { rgba, triangles });
    }
    decoder.finish()?;
    Ok(polygons)
}

/// File name of a tile's line or polygon file, e.g. `-3_12.line`.
pub fn tile_file_name(grid_x: i32, grid_y: i32, extension: &str) -> String {
    format!("{}_{}.{}", grid_x, grid_y, extension)
}

pub fn line_path(dir: &Path, grid_x: i32, grid_y: i32) -> PathBuf {
    dir.join(tile_file_name(grid_x, grid_y, "line"))
}

pub fn poly_path(dir: &Path, grid_x: i32, grid_y: i32) -> PathBuf {
    dir.join(tile_file_name(grid_x, grid_y, "poly"))
}

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path)?;
    // Tile files are written once via rename and never modified in place.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(mmap)
}

/// Memory-mapped view of the two files of a written tile.
pub struct TileReader {
    lines: Mmap,
    polygons: Mmap,
}

impl TileReader {
    pub fn open(dir: &Path, grid_x: i32, grid_y: i32) -> Result<Self> {
        Ok(Self {
            lines: map_file(&line_path(dir, grid_x, grid_y))?,
            polygons: map_file(&poly_path(dir, grid_x, grid_y))?,
        })
    }

    pub fn lines(&self) -> Result<Vec<LineFeature>> {
        read_lines(&self.lines)
    }

    pub fn polygons(&self) -> Result<Vec<PolygonFeature>> {
        read_polygons(&self.polygons)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn line(vertices: &[(f32, f32)]) -> LineFeature {
        LineFeature {
            width: 16.0,
            height: 1.5,
            outline: [1, 2, 3, 4],
            fill: [5, 6, 7, 8],
            bridge: true,
            tunnel: false,
            vertices: vertices.iter().map(|&(x, y)| Vertex::new(x, y)).collect(),
        }
    }

    fn encode_lines(lines: &[LineFeature]) -> Vec<u8> {
        let mut data = Vec::new();
        write_lines(&mut data, lines).unwrap();
        data
    }

    fn encode_polygons(polygons: &[PolygonFeature]) -> Vec<u8> {
        let mut data = Vec::new();
        write_polygons(&mut data, polygons).unwrap();
        data
    }

    #[test]
    fn test_line_layout() {
        let data = encode_lines(&[line(&[(1.0, 2.0), (3.0, 4.0)])]);
        assert_eq!(data.len(), 8 + LINE_HEADER_SIZE + 2 * VERTEX_SIZE);

        let mut expected = Vec::new();
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(&16.0f32.to_le_bytes());
        expected.extend_from_slice(&1.5f32.to_le_bytes());
        expected.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&0i32.to_le_bytes());
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            expected.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(data, expected);
    }

    #[test]
    fn test_headers_precede_vertices() {
        let data = encode_lines(&[line(&[(1.0, 1.0)]), line(&[(2.0, 2.0), (3.0, 3.0)])]);
        let vertices_at = 8 + 2 * LINE_HEADER_SIZE;
        assert_eq!(LittleEndian::read_f32(&data[vertices_at..]), 1.0);
        assert_eq!(LittleEndian::read_f32(&data[vertices_at + 8..]), 2.0);
        assert_eq!(data.len(), vertices_at + 3 * VERTEX_SIZE);
    }

    #[test]
    fn test_polygon_layout() {
        let triangle = vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(1.0, 0.0),
            Vertex::new(0.0, 1.0),
        ];
        let data = encode_polygons(&[PolygonFeature::new([9, 8, 7, 255], triangle.clone())]);
        assert_eq!(LittleEndian::read_i32(&data[0..]), 1);
        assert_eq!(LittleEndian::read_i32(&data[4..]), 3);
        assert_eq!(LittleEndian::read_i32(&data[8..]), 1);
        assert_eq!(&data[12..16], &[9, 8, 7, 255]);
        assert_eq!(data.len(), 8 + POLYGON_HEADER_SIZE + 3 * VERTEX_SIZE);

        let decoded = read_polygons(&data).unwrap();
        assert_eq!(decoded[0].triangles(), &triangle[..]);
        assert_eq!(decoded[0].triangle_count(), 1);
    }

    #[test]
    fn test_empty_tile_files() {
        let data = encode_lines(&[]);
        assert_eq!(data, vec![0; 8]);
        assert!(read_lines(&data).unwrap().is_empty());

        let data = encode_polygons(&[]);
        assert_eq!(data, vec![0; 8]);
        assert!(read_polygons(&data).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_data() {
        let data = encode_lines(&[line(&[(1.0, 2.0), (3.0, 4.0)])]);

        // truncated anywhere
        for len in 0..data.len() {
            assert!(
                matches!(read_lines(&data[..len]), Err(Error::Format(_))),
                "accepted {} bytes",
                len
            );
        }

        let mut trailing = data.clone();
        trailing.push(0);
        assert!(matches!(read_lines(&trailing), Err(Error::Format(_))));

        let mut wrong_total = data.clone();
        wrong_total[4] = 3;
        assert!(matches!(read_lines(&wrong_total), Err(Error::Format(_))));

        let mut negative = data.clone();
        negative[0..4].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(read_lines(&negative), Err(Error::Format(_))));

        let mut bad_flag = data;
        bad_flag[8 + 20] = 2;
        assert!(matches!(read_lines(&bad_flag), Err(Error::Format(_))));

        // huge count must not allocate
        let mut huge = Vec::new();
        huge.extend_from_slice(&i32::MAX.to_le_bytes());
        huge.extend_from_slice(&0i32.to_le_bytes());
        assert!(matches!(read_polygons(&huge), Err(Error::Format(_))));
    }

    #[test]
    fn test_tile_reader() {
        let dir = tempfile::tempdir().unwrap();
        let lines = vec![line(&[(-1.0, 5.0), (2.5, 7.0)])];
        let polygons = vec![PolygonFeature::new(
            [1, 1, 1, 1],
            vec![Vertex::new(0.0, 0.0); 6],
        )];
        std::fs::write(line_path(dir.path(), -2, 3), encode_lines(&lines)).unwrap();
        std::fs::write(poly_path(dir.path(), -2, 3), encode_polygons(&polygons)).unwrap();
        assert!(dir.path().join("-2_3.line").exists());

        let reader = TileReader::open(dir.path(), -2, 3).unwrap();
        assert_eq!(reader.lines().unwrap(), lines);
        assert_eq!(reader.polygons().unwrap(), polygons);

        assert!(matches!(
            TileReader::open(dir.path(), 0, 0),
            Err(Error::Io(_))
        ));
    }

    fn any_rgba() -> impl Strategy<Value = Rgba> {
        any::<[u8; 4]>()
    }

    fn any_vertex() -> impl Strategy<Value = Vertex> {
        (-1e7f32..1e7, -1e7f32..1e7).prop_map(|(x, y)| Vertex::new(x, y))
    }

    prop_compose! {
        fn any_line()(
            width in 0.0f32..50.0,
            height in -10.0f32..10.0,
            outline in any_rgba(),
            fill in any_rgba(),
            bridge in any::<bool>(),
            tunnel in any::<bool>(),
            vertices in prop::collection::vec(any_vertex(), 0..20),
        ) -> LineFeature {
            LineFeature { width, height, outline, fill, bridge, tunnel, vertices }
        }
    }

    prop_compose! {
        fn any_polygon()(
            rgba in any_rgba(),
            triangles in prop::collection::vec([any_vertex(), any_vertex(), any_vertex()], 0..10),
        ) -> PolygonFeature {
            PolygonFeature::new(rgba, triangles.into_iter().flatten().collect())
        }
    }

    proptest! {
        #[test]
        fn lines_survive_encoding(ref lines in prop::collection::vec(any_line(), 0..20)) {
            let data = encode_lines(lines);
            prop_assert_eq!(&read_lines(&data).unwrap(), lines);
        }

        #[test]
        fn polygons_survive_encoding(ref polygons in prop::collection::vec(any_polygon(), 0..20)) {
            let data = encode_polygons(polygons);
            prop_assert_eq!(&read_polygons(&data).unwrap(), polygons);
        }
    }
}
