//! In-memory parameter store loaded from a JSON snapshot of the tables

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{debug, info};
use validator::Validate;

use super::ParameterRepository;
use crate::domain::{
    BuildingRecord, HvacSystemRecord, InternalGainSchedule, ScenarioRecord, StorageTypeRecord,
    SurfaceRecord, TariffRecord, WeatherSeries, ZoneRecord,
};
use crate::error::{Component, ModelError};

/// All parameter tables, one `Vec` per table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(default)]
    pub scenarios: Vec<ScenarioRecord>,
    #[serde(default)]
    pub buildings: Vec<BuildingRecord>,
    #[serde(default)]
    pub zones: Vec<ZoneRecord>,
    #[serde(default)]
    pub surfaces: Vec<SurfaceRecord>,
    #[serde(default)]
    pub hvac_systems: Vec<HvacSystemRecord>,
    #[serde(default)]
    pub storage_types: Vec<StorageTypeRecord>,
    #[serde(default)]
    pub weather: Vec<WeatherSeries>,
    #[serde(default)]
    pub internal_gain_schedules: Vec<InternalGainSchedule>,
    #[serde(default)]
    pub tariffs: Vec<TariffRecord>,
}

impl ParameterSet {
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json).map_err(|e| {
            ModelError::configuration("", Component::ParameterStore, format!("invalid parameter JSON: {e}"))
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let body = fs::read_to_string(path).map_err(|e| {
            ModelError::configuration(
                "",
                Component::ParameterStore,
                format!("cannot read {}: {e}", path.display()),
            )
        })?;
        let set = Self::from_json_str(&body)?;
        info!(
            path = %path.display(),
            scenarios = set.scenarios.len(),
            buildings = set.buildings.len(),
            "loaded parameter set"
        );
        Ok(set)
    }

    /// Field-level validation of every record that carries constraints
    pub fn validate(&self) -> Result<(), ModelError> {
        fn check<T: Validate>(table: &str, name: &str, record: &T) -> Result<(), ModelError> {
            record.validate().map_err(|e| {
                ModelError::configuration(
                    "",
                    Component::ParameterStore,
                    format!("{table} '{name}' is invalid: {e}"),
                )
            })
        }

        for r in &self.scenarios {
            check("scenarios", &r.name, r)?;
        }
        for r in &self.buildings {
            check("buildings", &r.name, r)?;
        }
        for r in &self.zones {
            check("zones", &r.name, r)?;
        }
        for r in &self.surfaces {
            check("surfaces", &r.name, r)?;
        }
        for r in &self.hvac_systems {
            check("hvac_systems", &r.name, r)?;
        }
        for r in &self.storage_types {
            check("storage_types", &r.name, r)?;
        }
        Ok(())
    }
}

/// Read-only repository over a validated [`ParameterSet`]
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    tables: ParameterSet,
}

impl InMemoryRepository {
    pub fn new(tables: ParameterSet) -> Result<Self, ModelError> {
        tables.validate()?;
        debug!(zones = tables.zones.len(), surfaces = tables.surfaces.len(), "parameter store ready");
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &ParameterSet {
        &self.tables
    }
}

fn find_by_name<'a, T>(
    rows: &'a [T],
    name: &str,
    key: impl Fn(&T) -> &str,
    table: &'static str,
) -> Result<&'a T, ModelError> {
    rows.iter()
        .find(|row| key(row) == name)
        .ok_or_else(|| ModelError::not_found("", table, name))
}

impl ParameterRepository for InMemoryRepository {
    fn find_scenario(&self, name: &str) -> Result<ScenarioRecord, ModelError> {
        find_by_name(&self.tables.scenarios, name, |r| r.name.as_str(), "scenarios").cloned()
    }

    fn find_building(&self, name: &str) -> Result<BuildingRecord, ModelError> {
        find_by_name(&self.tables.buildings, name, |r| r.name.as_str(), "buildings").cloned()
    }

    fn find_zones(&self, building_name: &str) -> Result<Vec<ZoneRecord>, ModelError> {
        Ok(self
            .tables
            .zones
            .iter()
            .filter(|z| z.building_name == building_name)
            .cloned()
            .collect())
    }

    fn find_surfaces(&self, building_name: &str) -> Result<Vec<SurfaceRecord>, ModelError> {
        let zones = self.find_zones(building_name)?;
        Ok(self
            .tables
            .surfaces
            .iter()
            .filter(|s| zones.iter().any(|z| z.name == s.zone_name))
            .cloned()
            .collect())
    }

    fn find_hvac_system(&self, name: &str) -> Result<HvacSystemRecord, ModelError> {
        find_by_name(&self.tables.hvac_systems, name, |r| r.name.as_str(), "hvac_systems").cloned()
    }

    fn find_storage_type(&self, name: &str) -> Result<StorageTypeRecord, ModelError> {
        find_by_name(&self.tables.storage_types, name, |r| r.name.as_str(), "storage_types").cloned()
    }

    fn find_weather(&self, name: &str) -> Result<WeatherSeries, ModelError> {
        find_by_name(&self.tables.weather, name, |r| r.name.as_str(), "weather").cloned()
    }

    fn find_internal_gain_schedule(&self, name: &str) -> Result<InternalGainSchedule, ModelError> {
        find_by_name(
            &self.tables.internal_gain_schedules,
            name,
            |r| r.name.as_str(),
            "internal_gain_schedules",
        )
        .cloned()
    }

    fn find_tariff(&self, name: &str) -> Result<TariffRecord, ModelError> {
        find_by_name(&self.tables.tariffs, name, |r| r.name.as_str(), "tariffs").cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"{
        "buildings": [{ "name": "b1", "chiller_cop": 3.5 }],
        "zones": [
            {
                "name": "office", "building_name": "b1",
                "floor_area_m2": 50.0, "ceiling_height_m": 3.0,
                "infiltration_ach": 0.5, "internal_gain_w_per_m2": 10.0,
                "internal_gain_schedule": null, "hvac_system": null,
                "min_temperature_c": 22.0, "max_temperature_c": 26.0
            },
            {
                "name": "lobby", "building_name": "b2",
                "floor_area_m2": 20.0, "ceiling_height_m": 3.0,
                "infiltration_ach": 0.5, "internal_gain_w_per_m2": 10.0,
                "internal_gain_schedule": null, "hvac_system": null,
                "min_temperature_c": 22.0, "max_temperature_c": 26.0
            }
        ],
        "surfaces": [
            {
                "name": "office_wall", "zone_name": "office", "kind": "exterior",
                "orientation": "south", "area_m2": 15.0, "u_value_w_per_m2k": 0.8
            }
        ]
    }"#;

    #[test]
    fn test_find_zones_filters_by_building() {
        let repo = InMemoryRepository::new(ParameterSet::from_json_str(TABLES).unwrap()).unwrap();
        let zones = repo.find_zones("b1").unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "office");
        assert_eq!(repo.find_surfaces("b1").unwrap().len(), 1);
        assert!(repo.find_surfaces("b2").unwrap().is_empty());
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let repo = InMemoryRepository::new(ParameterSet::from_json_str(TABLES).unwrap()).unwrap();
        let err = repo.find_storage_type("tank").unwrap_err();
        assert!(matches!(err, ModelError::NotFound { table: "storage_types", .. }));
    }

    #[test]
    fn test_invalid_record_rejected_on_load() {
        let mut set = ParameterSet::from_json_str(TABLES).unwrap();
        set.buildings[0].chiller_cop = 0.0;
        let err = InMemoryRepository::new(set).unwrap_err();
        assert!(err.to_string().contains("buildings 'b1'"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(ParameterSet::from_json_str("{ not json").is_err());
    }
}
