use chrono::{DateTime, Utc};

use super::error::PropagationError;
use super::geometry::{sidereal_time, teme_to_ecef_position, EARTH_ROTATION_RAD_S};
use super::parsed::{EcefState, Ephemeris};

const AU_M: f64 = 1.495_978_707e11;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const J2000_JD: f64 = 2_451_545.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / 648_000.0;

/// The sun as a pseudo-record of the solar catalogue.
///
/// Low-precision analytic model (apparent ecliptic longitude plus mean
/// obliquity), good to a small fraction of a degree.
pub struct Sun;

impl Ephemeris for Sun {
    fn name(&self) -> &str {
        "Sun"
    }

    fn state_at(&self, timestamp: DateTime<Utc>) -> Result<EcefState, PropagationError> {
        let position_m = sun_ecef_m(timestamp);
        Ok(EcefState {
            position_m,
            // apparent motion is dominated by the Earth's rotation
            velocity_m_s: [
                EARTH_ROTATION_RAD_S * position_m[1],
                -EARTH_ROTATION_RAD_S * position_m[0],
                0.0,
            ],
        })
    }
}

fn julian_centuries(timestamp: DateTime<Utc>) -> f64 {
    let jd = timestamp.timestamp_millis() as f64 / 86_400_000.0 + UNIX_EPOCH_JD;
    (jd - J2000_JD) / DAYS_PER_JULIAN_CENTURY
}

/// (apparent longitude, obliquity) in radians and distance in AU.
fn solar_ecliptic_coords(t: f64) -> (f64, f64, f64) {
    let l0 = 280.46646 + 36000.76983 * t + 0.0003032 * t * t;
    let m = 357.52911 + 35999.05029 * t - 0.0001537 * t * t;
    let m_rad = m.to_radians();
    let e = 0.016708634 - 0.000042037 * t - 0.0000001267 * t * t;

    let c = (1.914602 - 0.004817 * t - 0.000014 * t * t) * m_rad.sin()
        + (0.019993 - 0.000101 * t) * (2.0 * m_rad).sin()
        + 0.000289 * (3.0 * m_rad).sin();

    let omega_rad = (125.04 - 1934.136 * t).to_radians();
    let apparent_lon = (l0 + c - 0.00569 - 0.00478 * omega_rad.sin()).to_radians();

    let eps0_arcsec = 84381.448 - 46.8150 * t - 0.00059 * t * t + 0.001813 * t * t * t;
    let obliquity = eps0_arcsec * ARCSEC_TO_RAD;

    let true_anomaly = m_rad + c.to_radians();
    let distance_au = 1.000001018 * (1.0 - e * e) / (1.0 + e * true_anomaly.cos());

    (apparent_lon, obliquity, distance_au)
}

fn sun_ecef_m(timestamp: DateTime<Utc>) -> [f64; 3] {
    let (lon, obliquity, distance_au) = solar_ecliptic_coords(julian_centuries(timestamp));
    let r = distance_au * AU_M;
    let equatorial = [
        r * lon.cos(),
        r * lon.sin() * obliquity.cos(),
        r * lon.sin() * obliquity.sin(),
    ];
    teme_to_ecef_position(equatorial, sidereal_time(timestamp))
}
