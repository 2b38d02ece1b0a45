//! Geographic primitives: WGS-84 coordinates and great-circle distance.
//!
//! Distances are computed with the haversine formula over a spherical earth.
//! The visit and breach thresholds elsewhere in the crate are expressed in
//! meters, so everything here returns meters.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters (IUGG spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters (haversine).
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Initial bearing toward `other` in degrees, 0..360 clockwise from north.
    /// Used by the simulated walk to advance along a heading.
    pub fn bearing_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let y = delta_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }

    /// Destination point after traveling `distance_m` meters on `bearing_deg`.
    pub fn offset(&self, distance_m: f64, bearing_deg: f64) -> Coordinate {
        let angular = distance_m / EARTH_RADIUS_M;
        let bearing = bearing_deg.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 =
            (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
        let lon2 = lon1
            + (bearing.sin() * angular.sin() * lat1.cos())
                .atan2(angular.cos() - lat1.sin() * lat2.sin());

        Coordinate {
            latitude: lat2.to_degrees(),
            longitude: lon2.to_degrees(),
        }
    }
}
