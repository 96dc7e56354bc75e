//! Conversion of geographic coordinates to the planar coordinates stored in
//! tiles.

use std::f64::consts::PI;

/// Maps `(lat, lon)` in degrees to planar `(x, y)`.
pub trait Projection: Sync {
    fn project(&self, lat: f64, lon: f64) -> (f64, f64);
}

/// Spherical ("web") Mercator on a sphere with the WGS84 semi-major axis.
///
/// Equivalent to `+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +k=1
/// +units=m`. Output is in meters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalMercator;

impl SphericalMercator {
    pub const RADIUS: f64 = 6_378_137.0;
    /// Latitude at which the projected plane becomes a square.
    pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
}

impl Projection for SphericalMercator {
    fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let lat = lat.clamp(-Self::MAX_LATITUDE, Self::MAX_LATITUDE);
        let x = Self::RADIUS * lon.to_radians();
        let y = Self::RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }
}
