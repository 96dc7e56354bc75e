//! Compiler of OpenStreetMap XML extracts into tiles for a real-time map
//! renderer.
//!
//! The input is streamed twice. The first pass collects all nodes into a
//! [`nodes::NodeIndex`]; the second pass reads the ways, interns their
//! recognized tags and classifies each way into a styled line or a
//! tessellated polygon. Features are bucketed into a [`tiles::TileGrid`] by
//! their first vertex, and every non-empty tile is written as a pair of
//! `<x>_<y>.line` and `<x>_<y>.poly` files (see [`format`]).
//!
//! ```no_run
//! use glmap::compile::{compile_file, write_tiles, CompileConfig};
//! use std::path::Path;
//!
//! # fn main() -> glmap::Result<()> {
//! let (grid, stats) = compile_file(Path::new("stockholm.osm"), &CompileConfig::default())?;
//! write_tiles(&grid, Path::new("tiles"))?;
//! println!("{}", stats);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod compile;
mod error;
pub mod format;
pub mod nearest;
pub mod nodes;
pub mod osmxml;
pub mod projection;
pub mod stats;
pub mod style;
pub mod tags;
pub mod tagsets;
pub mod tessellate;
pub mod tiles;

pub use crate::error::{Error, Result};
