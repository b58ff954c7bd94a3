//! Geographic coordinates in signed decimal degrees.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Builds coordinates, rejecting non-finite or out-of-range values
    /// (latitude outside [-90, 90], longitude outside [-180, 180]).
    pub fn new(latitude: f64, longitude: f64) -> Option<Coordinates> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Coordinates {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to `other` in kilometers (haversine formula).
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let lat_d = (other.latitude - self.latitude).to_radians();
        let lon_d = (other.longitude - self.longitude).to_radians();
        let a = (lat_d / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (lon_d / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        c * EARTH_RADIUS_KM
    }

    pub(crate) fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_f64::<LittleEndian>(self.latitude)?;
        w.write_f64::<LittleEndian>(self.longitude)
    }

    pub(crate) fn read_from<R: Read>(r: &mut R) -> io::Result<Coordinates> {
        let latitude = r.read_f64::<LittleEndian>()?;
        let longitude = r.read_f64::<LittleEndian>()?;
        Ok(Coordinates {
            latitude,
            longitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Coordinates::new(91.0, 0.0).is_none());
        assert!(Coordinates::new(0.0, -181.0).is_none());
        assert!(Coordinates::new(f64::NAN, 0.0).is_none());
        assert!(Coordinates::new(45.0, 90.0).is_some());
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let c = Coordinates::new(52.52, 13.405).unwrap();
        assert!(c.distance_km(&c) < 1e-9);
    }

    #[test]
    fn test_distance_known_pair() {
        // Berlin to Paris is roughly 878 km.
        let berlin = Coordinates::new(52.52, 13.405).unwrap();
        let paris = Coordinates::new(48.8566, 2.3522).unwrap();
        let d = berlin.distance_km(&paris);
        assert!((850.0..910.0).contains(&d), "unexpected distance {d}");
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Coordinates::new(10.0, 20.0).unwrap();
        let b = Coordinates::new(-33.0, 151.0).unwrap();
        assert!((a.distance_km(&b) - b.distance_km(&a)).abs() < 1e-9);
    }
}
