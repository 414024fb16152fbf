//! Typed read-only access to the building parameter tables.
//!
//! The model builder only sees [`ParameterRepository`]; where the tables live
//! (a JSON snapshot, a database) is decided by the implementation.

use crate::domain::{
    BuildingRecord, HvacSystemRecord, InternalGainSchedule, ScenarioRecord, StorageTypeRecord,
    SurfaceRecord, TariffRecord, WeatherSeries, ZoneRecord,
};
use crate::error::ModelError;

pub mod memory;

pub use memory::{InMemoryRepository, ParameterSet};

#[cfg_attr(test, mockall::automock)]
pub trait ParameterRepository: Send + Sync {
    fn find_scenario(&self, name: &str) -> Result<ScenarioRecord, ModelError>;

    fn find_building(&self, name: &str) -> Result<BuildingRecord, ModelError>;

    /// Zones of a building in table order
    fn find_zones(&self, building_name: &str) -> Result<Vec<ZoneRecord>, ModelError>;

    /// Surfaces attached to any zone of the building, in table order
    fn find_surfaces(&self, building_name: &str) -> Result<Vec<SurfaceRecord>, ModelError>;

    fn find_hvac_system(&self, name: &str) -> Result<HvacSystemRecord, ModelError>;

    fn find_storage_type(&self, name: &str) -> Result<StorageTypeRecord, ModelError>;

    fn find_weather(&self, name: &str) -> Result<WeatherSeries, ModelError>;

    fn find_internal_gain_schedule(&self, name: &str)
        -> Result<InternalGainSchedule, ModelError>;

    fn find_tariff(&self, name: &str) -> Result<TariffRecord, ModelError>;
}
