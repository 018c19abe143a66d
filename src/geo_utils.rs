/// Great-circle helpers shared by the segment builder and the elevation lookup
use geo::point;
use geo::HaversineDistance;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A WGS84 position, rounded to a fixed number of decimals so that
/// identical road vertices compare equal across roads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// Exact lookup key: the bit patterns of the (already rounded) components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordKey {
    lat: u64,
    lon: u64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(Error::InvalidCoordinate { lat, lon });
        }
        Ok(Coordinate { lat, lon })
    }

    /// Round both components to `decimals` places.
    pub fn rounded(lat: f64, lon: f64, decimals: u32) -> Result<Self> {
        let coord = Self::new(lat, lon)?;
        Ok(Coordinate {
            lat: round_to(coord.lat, decimals),
            lon: round_to(coord.lon, decimals),
        })
    }

    pub fn key(&self) -> CoordKey {
        // -0.0 and 0.0 are the same position
        CoordKey {
            lat: (self.lat + 0.0).to_bits(),
            lon: (self.lon + 0.0).to_bits(),
        }
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Great-circle distance in meters.
pub fn haversine_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let pa = point!(x: a.lon, y: a.lat);
    let pb = point!(x: b.lon, y: b.lat);
    pa.haversine_distance(&pb)
}

/// Sum of great-circle distances along a polyline.
pub fn path_length_m(coords: &[Coordinate]) -> f64 {
    coords.windows(2).map(|w| haversine_m(&w[0], &w[1])).sum()
}
