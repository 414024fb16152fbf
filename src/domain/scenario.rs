use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::PricingMethod;

/// Scenario table entry as stored in the parameter store
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScenarioRecord {
    #[validate(length(min = 1))]
    pub name: String,
    pub building_name: String,
    pub storage_type: Option<String>,
    pub weather_name: String,
    pub tariff_name: String,
    pub start: NaiveDateTime,
    #[validate(range(min = 1))]
    pub timestep_minutes: u32,
    #[validate(range(min = 1))]
    pub horizon_steps: usize,
    pub initial_temperature_c: f64,
}

/// Resolved, immutable description of one model run.
///
/// Baseline and storage runs are two separate values; nothing in the store is
/// modified to switch between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub building_name: String,
    pub storage_type: Option<String>,
    pub weather_name: String,
    pub tariff_name: String,
    pub pricing_method: PricingMethod,
    pub start: NaiveDateTime,
    pub timestep_minutes: u32,
    pub horizon_steps: usize,
    pub initial_temperature_c: f64,
}

impl Scenario {
    pub fn from_record(record: ScenarioRecord, pricing_method: PricingMethod) -> Self {
        Self {
            name: record.name,
            building_name: record.building_name,
            storage_type: record.storage_type,
            weather_name: record.weather_name,
            tariff_name: record.tariff_name,
            pricing_method,
            start: record.start,
            timestep_minutes: record.timestep_minutes,
            horizon_steps: record.horizon_steps,
            initial_temperature_c: record.initial_temperature_c,
        }
    }

    pub fn without_storage(&self) -> Self {
        Self {
            storage_type: None,
            ..self.clone()
        }
    }

    pub fn with_storage(&self, storage_type: impl Into<String>) -> Self {
        Self {
            storage_type: Some(storage_type.into()),
            ..self.clone()
        }
    }

    pub fn with_horizon_steps(self, horizon_steps: usize) -> Self {
        Self {
            horizon_steps,
            ..self
        }
    }

    pub fn with_timestep_minutes(self, timestep_minutes: u32) -> Self {
        Self {
            timestep_minutes,
            ..self
        }
    }

    pub fn timestep_hours(&self) -> f64 {
        f64::from(self.timestep_minutes) / 60.0
    }

    /// Start time of every step in the horizon
    pub fn timesteps(&self) -> Vec<NaiveDateTime> {
        let step = Duration::minutes(i64::from(self.timestep_minutes));
        (0..self.horizon_steps)
            .map(|t| self.start + step * t as i32)
            .collect()
    }
}
