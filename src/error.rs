use std::io;

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// Fatal errors. Any of these aborts the whole compilation run.
///
/// Problems with a single way (unresolved or malformed node references,
/// degenerate rings, failed tessellation) are not errors; they are reported
/// through [`crate::classify::Classified::Dropped`] and counted in the run
/// statistics.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attr(#[from] AttrError),

    #[error("<{element}> at byte {position} is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
        position: usize,
    },

    #[error("invalid value '{value}' for attribute '{attribute}' at byte {position}")]
    InvalidNumber {
        attribute: &'static str,
        value: String,
        position: usize,
    },

    #[error("malformed tile data: {0}")]
    Format(String),

    #[error("tile size {edge} is not positive or too small to grid the input")]
    TileSize { edge: f64 },

    #[error("feature anchored at ({x}, {y}) lies outside of the tile grid")]
    OutsideGrid { x: f32, y: f32 },
}

pub type Result<T> = std::result::Result<T, Error>;
