use std::path::PathBuf;

use clap::Parser;

/// Compiler of OpenStreetMap XML into tiles of line and polygon features
#[derive(Debug, Parser)]
#[clap(about, version, author)]
pub struct Args {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Do not show progress bars
    #[clap(short, long)]
    pub quiet: bool,

    /// Input OSM XML file, optionally gzip compressed (.osm.gz)
    pub input: PathBuf,

    /// Output directory for the .line and .poly tile files
    #[arg(default_value = ".")]
    pub output: PathBuf,

    /// Edge length of a tile in projected meters
    #[arg(long = "tile-size", default_value_t = glmap::compile::DEFAULT_TILE_SIZE)]
    pub tile_size: f64,

    /// Triangulate polygons as a fan around their first vertex
    #[arg(long = "fan")]
    pub fan: bool,

    /// Size of the input read buffer in bytes
    #[arg(long = "buffer-size", default_value_t = glmap::osmxml::DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,
}
