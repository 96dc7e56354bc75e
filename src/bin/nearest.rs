use glmap::nearest::{distance, LatitudeIndex};
use glmap::osmxml::{read_nodes, FileSource, OsmSource};
use glmap::projection::SphericalMercator;

use clap::Parser;
use colored::*;
use log::info;

use std::path::PathBuf;

type Error = Box<dyn std::error::Error>;

/// Finds the OSM nodes closest to a location
#[derive(Debug, Parser)]
#[clap(about, version, author)]
struct Args {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Input OSM XML file, optionally gzip compressed (.osm.gz)
    input: PathBuf,

    /// Latitude of the location in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude of the location in degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Also list all nodes closer than this many meters
    #[arg(long)]
    radius: Option<f64>,
}

fn run(args: Args) -> Result<(), Error> {
    let source = FileSource::new(&args.input);
    info!("Reading nodes...");
    let index = read_nodes(source.open()?, &SphericalMercator)?.build();
    info!("Read {} nodes.", index.len());
    let by_lat = LatitudeIndex::new(&index);

    let closest = by_lat
        .closest(args.lat, args.lon)
        .ok_or("input does not contain any nodes")?;
    println!(
        "closest node: {} at ({}, {}), {:.1} m away",
        closest.id,
        closest.lat,
        closest.lon,
        distance(args.lat, args.lon, closest.lat, closest.lon)
    );

    if let Some(radius) = args.radius {
        let ids = by_lat.within_radius(args.lat, args.lon, radius);
        println!("{} nodes within {} m:", ids.len(), radius);
        for id in ids {
            println!("  {}", id);
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_module_path(false)
        .format_timestamp_nanos()
        .init();

    if let Err(e) = run(args) {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }
}
