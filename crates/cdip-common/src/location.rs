//! Buoy positions and great-circle geometry

use std::fmt;

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6372.8;

/// Kilometers to nautical miles
const KM_TO_NM: f64 = 0.539957;

/// A latitude/longitude position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// A position broken into whole degrees and decimal minutes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeMinutes {
    pub lat_degrees: i32,
    pub lat_minutes: f64,
    pub lon_degrees: i32,
    pub lon_minutes: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Haversine distance to `other` in nautical miles
    pub fn distance_nm(&self, other: &Location) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c * KM_TO_NM
    }

    /// Initial great-circle bearing to `other` in degrees clockwise from north
    pub fn bearing_deg(&self, other: &Location) -> f64 {
        let d_lon = (other.longitude - self.longitude).to_radians();
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();

        let y = d_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }

    /// Split into whole degrees and decimal minutes. The sign stays on the
    /// degrees; minutes are the fractional magnitude in [0, 60).
    pub fn degree_minutes(&self) -> DegreeMinutes {
        let (lat_degrees, lat_minutes) = split_degrees(self.latitude);
        let (lon_degrees, lon_minutes) = split_degrees(self.longitude);
        DegreeMinutes {
            lat_degrees,
            lat_minutes,
            lon_degrees,
            lon_minutes,
        }
    }
}

fn split_degrees(value: f64) -> (i32, f64) {
    let whole = value.abs().trunc();
    let minutes = 60.0 * (value.abs() - whole);
    (value.signum() as i32 * whole as i32, minutes)
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} N {}", self.latitude, self.longitude)
    }
}

impl fmt::Display for DegreeMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.3} {} {:.3}",
            self.lat_degrees, self.lat_minutes, self.lon_degrees, self.lon_minutes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_one_degree_of_longitude_at_equator() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(0.0, 1.0);
        let nm = a.distance_nm(&b);
        assert!((nm - 60.06).abs() < 0.1, "got {nm}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let scripps = Location::new(32.867, -117.257);
        let torrey = Location::new(32.933, -117.279);
        let d1 = scripps.distance_nm(&torrey);
        let d2 = torrey.distance_nm(&scripps);
        assert!((d1 - d2).abs() < 1e-9);
        assert!(d1 > 3.0 && d1 < 5.0, "got {d1}");
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = Location::new(0.0, 0.0);
        assert!((origin.bearing_deg(&Location::new(1.0, 0.0)) - 0.0).abs() < 1e-6);
        assert!((origin.bearing_deg(&Location::new(0.0, 1.0)) - 90.0).abs() < 1e-6);
        assert!((origin.bearing_deg(&Location::new(-1.0, 0.0)) - 180.0).abs() < 1e-6);
        assert!((origin.bearing_deg(&Location::new(0.0, -1.0)) - 270.0).abs() < 1e-6);
    }

    #[test]
    fn test_degree_minutes_western_longitude() {
        let loc = Location::new(32.5, -117.25);
        let dm = loc.degree_minutes();
        assert_eq!(dm.lat_degrees, 32);
        assert!((dm.lat_minutes - 30.0).abs() < 1e-9);
        assert_eq!(dm.lon_degrees, -117);
        assert!((dm.lon_minutes - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_formats() {
        let loc = Location::new(32.5, -117.25);
        assert_eq!(loc.to_string(), "32.5 N -117.25");
        assert_eq!(loc.degree_minutes().to_string(), "32 30.000 -117 15.000");
    }
}
