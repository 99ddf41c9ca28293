use chrono::{DateTime, Utc};

use super::observer::Observer;

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;

/// Range and pointing from an observer to a target.
#[derive(Debug, Clone, Copy)]
pub struct Horizontal {
    pub range_m: f64,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
}

/// Greenwich mean sidereal time (radians) at `timestamp`.
pub fn sidereal_time(timestamp: DateTime<Utc>) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp.naive_utc()))
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn teme_to_ecef_velocity(pos_teme: [f64; 3], vel_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let pos = teme_to_ecef_position(pos_teme, gmst);
    let rotated = teme_to_ecef_position(vel_teme, gmst);
    [
        rotated[0] + EARTH_ROTATION_RAD_S * pos[1],
        rotated[1] - EARTH_ROTATION_RAD_S * pos[0],
        rotated[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

pub fn horizontal(observer: &Observer, target_ecef_m: [f64; 3]) -> Horizontal {
    let station = observer.position_ecef_m();
    let dr = [
        target_ecef_m[0] - station[0],
        target_ecef_m[1] - station[1],
        target_ecef_m[2] - station[2],
    ];
    let range_m = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let (east, north, up) = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
    let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
    let elevation_deg = if range_m > 0.0 {
        (up / range_m).clamp(-1.0, 1.0).asin().to_degrees()
    } else {
        90.0
    };

    Horizontal {
        range_m,
        elevation_deg,
        azimuth_deg,
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_overhead_has_ninety_degree_elevation() {
        let observer = Observer::new(0.0, 0.0, 0.0).unwrap();
        let mut target = observer.position_ecef_m();
        target[0] += 20_000_000.0;
        let h = horizontal(&observer, target);
        assert!((h.elevation_deg - 90.0).abs() < 1e-9);
        assert!((h.range_m - 20_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn azimuth_follows_compass_convention() {
        let observer = Observer::new(0.0, 0.0, 0.0).unwrap();
        let base = observer.position_ecef_m();
        let north = horizontal(&observer, [base[0], base[1], base[2] + 1000.0]);
        let east = horizontal(&observer, [base[0], base[1] + 1000.0, base[2]]);
        assert!(north.azimuth_deg.abs() < 1e-9);
        assert!((east.azimuth_deg - 90.0).abs() < 1e-9);
        assert!(north.elevation_deg.abs() < 1e-9);
    }

    #[test]
    fn earth_fixed_point_has_no_ecef_velocity() {
        // a point co-rotating with the Earth, expressed in TEME
        let gmst: f64 = 1.2;
        let ecef = [7_000.0, 0.0, 0.0];
        let teme = [ecef[0] * gmst.cos(), ecef[0] * gmst.sin(), 0.0];
        let vel_teme = [
            -EARTH_ROTATION_RAD_S * teme[1],
            EARTH_ROTATION_RAD_S * teme[0],
            0.0,
        ];
        let pos = teme_to_ecef_position(teme, gmst);
        let vel = teme_to_ecef_velocity(teme, vel_teme, gmst);
        assert!((pos[0] - 7_000.0).abs() < 1e-9);
        assert!(vel.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn rounds_to_requested_decimals() {
        assert_eq!(round_to(12.345_678_91, 6), 12.345_679);
        assert_eq!(round_to(20_183_456.789, 1), 20_183_456.8);
    }
}
