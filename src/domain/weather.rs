use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Orientation;

/// Weather timeseries at a fixed resolution starting at `start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSeries {
    pub name: String,
    pub start: NaiveDateTime,
    pub timestep_minutes: u32,
    pub ambient_air_temperature_c: Vec<f64>,
    /// Total irradiation on a surface of each orientation (W/m²)
    #[serde(default)]
    pub irradiation_w_per_m2: BTreeMap<Orientation, Vec<f64>>,
}

impl WeatherSeries {
    pub fn len(&self) -> usize {
        self.ambient_air_temperature_c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ambient_air_temperature_c.is_empty()
    }
}

/// Occupancy/usage profile scaling a zone's internal gain density
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalGainSchedule {
    pub name: String,
    pub start: NaiveDateTime,
    pub timestep_minutes: u32,
    pub values: Vec<f64>,
}

/// Index of `start` within a series beginning at `series_start` with the given
/// resolution, or `None` if `start` does not fall on a series timestep.
pub fn aligned_offset(
    series_start: NaiveDateTime,
    series_timestep_minutes: u32,
    start: NaiveDateTime,
) -> Option<usize> {
    if series_timestep_minutes == 0 {
        return None;
    }
    let minutes = start.signed_duration_since(series_start).num_minutes();
    let step = i64::from(series_timestep_minutes);
    if minutes < 0 || minutes % step != 0 {
        return None;
    }
    usize::try_from(minutes / step).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_aligned_offset() {
        assert_eq!(aligned_offset(at(0, 0), 30, at(6, 0)), Some(12));
        assert_eq!(aligned_offset(at(0, 0), 30, at(0, 0)), Some(0));
        assert_eq!(aligned_offset(at(0, 0), 30, at(6, 15)), None);
        assert_eq!(aligned_offset(at(6, 0), 30, at(0, 0)), None);
        assert_eq!(aligned_offset(at(0, 0), 0, at(0, 0)), None);
    }

    #[test]
    fn test_irradiation_keyed_by_orientation() {
        let json = r#"{
            "name": "singapore",
            "start": "2017-01-02T00:00:00",
            "timestep_minutes": 60,
            "ambient_air_temperature_c": [26.0, 27.0],
            "irradiation_w_per_m2": { "south": [0.0, 120.0] }
        }"#;
        let weather: WeatherSeries = serde_json::from_str(json).unwrap();
        assert_eq!(weather.len(), 2);
        assert_eq!(weather.irradiation_w_per_m2[&Orientation::South][1], 120.0);
    }
}
