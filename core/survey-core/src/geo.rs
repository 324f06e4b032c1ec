//! Surface positions and great-circle distances on a body.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LatLong {
    pub lat: f64,
    pub long: f64,
}

impl LatLong {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Great-circle distance in meters on a sphere of `radius` meters.
    pub fn distance_to(&self, other: &LatLong, radius: f64) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = lat2 - lat1;
        let d_long = (other.long - self.long).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_long / 2.0).sin().powi(2);
        2.0 * radius * a.sqrt().min(1.0).asin()
    }
}

impl fmt::Display for LatLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.6}, {:+.6}", self.lat, self.long)
    }
}
