use thiserror::Error;

// WGS-84
const EARTH_A_M: f64 = 6_378_137.0;
const EARTH_E2: f64 = 0.006_694_379_990_14;

#[derive(Debug, Error, PartialEq)]
pub enum ObserverError {
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("coordinates must be finite numbers")]
    NotFinite,
}

/// A geodetic observer location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl Observer {
    /// Validates latitude and normalizes longitude into (-180, 180].
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Result<Self, ObserverError> {
        if !(latitude_deg.is_finite() && longitude_deg.is_finite() && altitude_m.is_finite()) {
            return Err(ObserverError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(ObserverError::LatitudeOutOfRange(latitude_deg));
        }
        Ok(Self {
            latitude_deg,
            longitude_deg: normalize_longitude(longitude_deg),
            altitude_m,
        })
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_m(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = EARTH_A_M / (1.0 - EARTH_E2 * sin_lat * sin_lat).sqrt();
        let x = (n + self.altitude_m) * cos_lat * lon.cos();
        let y = (n + self.altitude_m) * cos_lat * lon.sin();
        let z = (n * (1.0 - EARTH_E2) + self.altitude_m) * sin_lat;
        [x, y, z]
    }
}

fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longitude_is_normalized() {
        assert_eq!(Observer::new(45.5, 170.5, 0.0).unwrap().longitude_deg, 170.5);
        assert_eq!(Observer::new(0.0, 190.0, 0.0).unwrap().longitude_deg, -170.0);
        assert_eq!(Observer::new(0.0, -180.0, 0.0).unwrap().longitude_deg, 180.0);
    }

    #[test]
    fn rejects_bad_latitude() {
        assert_eq!(
            Observer::new(91.0, 0.0, 0.0),
            Err(ObserverError::LatitudeOutOfRange(91.0))
        );
        assert_eq!(Observer::new(f64::NAN, 0.0, 0.0), Err(ObserverError::NotFinite));
    }

    #[test]
    fn equator_observer_sits_on_x_axis() {
        let pos = Observer::new(0.0, 0.0, 0.0).unwrap().position_ecef_m();
        assert!((pos[0] - EARTH_A_M).abs() < 1e-6);
        assert!(pos[1].abs() < 1e-6);
        assert!(pos[2].abs() < 1e-6);
    }
}
