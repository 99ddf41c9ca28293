use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};
use std::fmt;

use super::error::PropagationError;
use super::geometry::{
    horizontal, round_to, sidereal_time, teme_to_ecef_position, teme_to_ecef_velocity,
};
use super::kind::CacheKey;
use super::observer::Observer;
use super::types::{AzElResult, PositionResult, Provenance};

/// Earth-fixed state of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EcefState {
    pub position_m: [f64; 3],
    pub velocity_m_s: [f64; 3],
}

/// One named object whose state can be evaluated at any instant.
pub trait Ephemeris: Send + Sync {
    fn name(&self) -> &str;
    fn state_at(&self, timestamp: DateTime<Utc>) -> Result<EcefState, PropagationError>;
}

/// A satellite element set, propagated with SGP4.
#[derive(Debug)]
pub struct SatelliteRecord {
    name: String,
    elements: Elements,
    constants: Constants,
}

impl SatelliteRecord {
    pub fn new(name: String, elements: Elements, constants: Constants) -> Self {
        Self {
            name,
            elements,
            constants,
        }
    }
}

impl Ephemeris for SatelliteRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_at(&self, timestamp: DateTime<Utc>) -> Result<EcefState, PropagationError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
            .map_err(|e| PropagationError(e.to_string()))?;
        let prediction = self.constants.propagate(minutes)?;

        let gmst = sidereal_time(timestamp);
        let position_km = teme_to_ecef_position(prediction.position, gmst);
        let velocity_km_s = teme_to_ecef_velocity(prediction.position, prediction.velocity, gmst);

        Ok(EcefState {
            position_m: position_km.map(|v| v * 1000.0),
            velocity_m_s: velocity_km_s.map(|v| v * 1000.0),
        })
    }
}

/// Immutable set of records loaded for one cache key.
pub struct ParsedCatalogue {
    key: CacheKey,
    jy: f64,
    provenance: Provenance,
    records: Vec<Box<dyn Ephemeris>>,
}

impl ParsedCatalogue {
    pub fn new(
        key: CacheKey,
        jy: f64,
        provenance: Provenance,
        records: Vec<Box<dyn Ephemeris>>,
    ) -> Self {
        Self {
            key,
            jy,
            provenance,
            records,
        }
    }

    pub fn key(&self) -> CacheKey {
        self.key
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name())
    }

    /// ECEF positions of every record at `timestamp`, in catalogue order.
    pub fn positions(&self, timestamp: DateTime<Utc>) -> Vec<PositionResult> {
        self.states(timestamp)
            .map(|(record, state)| PositionResult {
                name: record.name().to_string(),
                ecef: state.position_m,
                ecef_dot: state.velocity_m_s,
                jy: self.jy,
            })
            .collect()
    }

    /// Horizontal coordinates of every record at or above `min_elevation_deg`.
    pub fn az_el(
        &self,
        timestamp: DateTime<Utc>,
        observer: &Observer,
        min_elevation_deg: f64,
    ) -> Vec<AzElResult> {
        self.states(timestamp)
            .filter_map(|(record, state)| {
                let h = horizontal(observer, state.position_m);
                let el = round_to(h.elevation_deg, 6);
                (el >= min_elevation_deg).then(|| AzElResult {
                    name: record.name().to_string(),
                    r: round_to(h.range_m, 1),
                    el,
                    az: round_to(h.azimuth_deg, 6),
                    jy: self.jy,
                })
            })
            .collect()
    }

    fn states(
        &self,
        timestamp: DateTime<Utc>,
    ) -> impl Iterator<Item = (&dyn Ephemeris, EcefState)> + '_ {
        self.records
            .iter()
            .filter_map(move |record| match record.state_at(timestamp) {
                Ok(state) => Some((&**record, state)),
                Err(e) => {
                    log::warn!(
                        "Skipping {} in {} catalogue: {}",
                        record.name(),
                        self.key,
                        e
                    );
                    None
                }
            })
    }
}

impl fmt::Debug for ParsedCatalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedCatalogue")
            .field("key", &self.key)
            .field("jy", &self.jy)
            .field("provenance", &self.provenance)
            .field("records", &self.records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::kind::{CatalogueKind, RefreshPeriod};
    use crate::catalogue::tle_loader::parse_catalogue;
    use chrono::TimeZone;

    const RANGE_M: f64 = 20_000_000.0;

    /// Object held at a fixed elevation due north of an observer at (0, 0).
    struct FixedElevation {
        name: &'static str,
        elevation_deg: f64,
    }

    impl Ephemeris for FixedElevation {
        fn name(&self) -> &str {
            self.name
        }

        fn state_at(&self, _timestamp: DateTime<Utc>) -> Result<EcefState, PropagationError> {
            let base = Observer::new(0.0, 0.0, 0.0).unwrap().position_ecef_m();
            let el = self.elevation_deg.to_radians();
            Ok(EcefState {
                position_m: [base[0] + RANGE_M * el.sin(), 0.0, RANGE_M * el.cos()],
                velocity_m_s: [0.0; 3],
            })
        }
    }

    struct Decayed;

    impl Ephemeris for Decayed {
        fn name(&self) -> &str {
            "DECAYED"
        }

        fn state_at(&self, _timestamp: DateTime<Utc>) -> Result<EcefState, PropagationError> {
            Err(PropagationError("satellite has decayed".into()))
        }
    }

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 12, 7, 9, 25, 55).unwrap()
    }

    fn catalogue(records: Vec<Box<dyn Ephemeris>>) -> ParsedCatalogue {
        let key = CacheKey::new(CatalogueKind::Gps, RefreshPeriod::Day, date());
        ParsedCatalogue::new(key, 1.5e6, Provenance::Cached, records)
    }

    #[test]
    fn records_below_threshold_are_excluded() {
        let cat = catalogue(vec![Box::new(FixedElevation {
            name: "LOW",
            elevation_deg: -10.0,
        })]);
        let observer = Observer::new(0.0, 0.0, 0.0).unwrap();
        assert!(cat.az_el(date(), &observer, 0.0).is_empty());
    }

    #[test]
    fn records_above_threshold_are_populated() {
        let cat = catalogue(vec![Box::new(FixedElevation {
            name: "HIGH",
            elevation_deg: 10.0,
        })]);
        let observer = Observer::new(0.0, 0.0, 0.0).unwrap();
        let results = cat.az_el(date(), &observer, 0.0);

        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.name, "HIGH");
        assert!((r.el - 10.0).abs() < 1e-6);
        assert!(r.az.abs() < 1e-6 || (r.az - 360.0).abs() < 1e-6);
        assert!((r.r - RANGE_M).abs() < 1.0);
        assert_eq!(r.jy, 1.5e6);
    }

    #[test]
    fn failing_record_is_skipped_not_fatal() {
        let cat = catalogue(vec![
            Box::new(Decayed),
            Box::new(FixedElevation {
                name: "HIGH",
                elevation_deg: 45.0,
            }),
        ]);
        let positions = cat.positions(date());
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].name, "HIGH");
    }

    #[test]
    fn sgp4_positions_are_at_gps_altitude() {
        let records = parse_catalogue(include_str!("../../testdata/gps.tle"), "gps.tle", &[])
            .unwrap()
            .into_iter()
            .map(|r| Box::new(r) as Box<dyn Ephemeris>)
            .collect();
        let cat = catalogue(records);
        let positions = cat.positions(date());

        assert_eq!(positions.len(), 2);
        for p in &positions {
            let radius = p.ecef.iter().map(|v| v * v).sum::<f64>().sqrt();
            // semi-synchronous orbit, ~26 600 km
            assert!((25_000_000.0..28_000_000.0).contains(&radius), "{}", radius);
            let speed = p.ecef_dot.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!(speed > 1_000.0 && speed < 5_000.0, "{}", speed);
        }
        assert_eq!(cat.names().collect::<Vec<_>>()[1], "GPS BIIF-1  (PRN 25)");
    }
}
