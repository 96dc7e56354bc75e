mod args;

use glmap::compile::{compile_file, write_tiles, CompileConfig};
use glmap::tessellate::Triangulation;

use clap::Parser;
use colored::*;
use log::info;

type Error = Box<dyn std::error::Error>;

fn run(args: args::Args) -> Result<(), Error> {
    if !(args.tile_size.is_finite() && args.tile_size > 0.0) {
        return Err(format!("tile size must be positive, got {}", args.tile_size).into());
    }
    let config = CompileConfig {
        tile_size: args.tile_size,
        triangulation: if args.fan {
            Triangulation::Fan
        } else {
            Triangulation::Tessellate
        },
        buffer_size: args.buffer_size,
        progress: !args.quiet,
    };

    info!("Compiling {} ...", args.input.display());
    let (grid, mut stats) = compile_file(&args.input, &config)?;
    stats.num_tiles = write_tiles(&grid, &args.output)?;
    info!("Tiles written to {}", args.output.display());

    println!("{stats}");
    Ok(())
}

fn main() {
    let args = args::Args::parse();
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
