use serde::{Deserialize, Serialize};
use strum_macros::Display;
use validator::Validate;

/// Building-level parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BuildingRecord {
    #[validate(length(min = 1))]
    pub name: String,
    /// Coefficient of performance of the central chiller plant
    #[validate(range(exclusive_min = 0.0))]
    pub chiller_cop: f64,
}

/// One thermal zone (lumped air node)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ZoneRecord {
    #[validate(length(min = 1))]
    pub name: String,
    pub building_name: String,
    #[validate(range(exclusive_min = 0.0))]
    pub floor_area_m2: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub ceiling_height_m: f64,
    /// Furniture and other fast mass lumped with the air node (J/K)
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub extra_heat_capacity_j_per_k: f64,
    #[validate(range(min = 0.0))]
    pub infiltration_ach: f64,
    #[validate(range(min = 0.0))]
    pub internal_gain_w_per_m2: f64,
    /// Occupancy schedule that scales the internal gain density (0..1)
    pub internal_gain_schedule: Option<String>,
    pub hvac_system: Option<String>,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
}

impl ZoneRecord {
    pub fn volume_m3(&self) -> f64 {
        self.floor_area_m2 * self.ceiling_height_m
    }
}

/// Facade orientation, used to pick the irradiation disturbance
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    North,
    East,
    South,
    West,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceType {
    /// Opaque element between the zone and ambient air
    Exterior,
    /// Glazing between the zone and ambient air; always massless
    Window,
    /// Partition to another zone
    Interior { adjacent_zone: String },
    /// Internal mass exchanging heat with its own zone only
    Adiabatic,
}

/// Envelope element attached to a zone
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SurfaceRecord {
    #[validate(length(min = 1))]
    pub name: String,
    pub zone_name: String,
    #[serde(flatten)]
    pub surface_type: SurfaceType,
    pub orientation: Orientation,
    #[validate(range(exclusive_min = 0.0))]
    pub area_m2: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub u_value_w_per_m2k: f64,
    /// Zero makes the surface a pure conductance without a state
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub heat_capacity_j_per_m2k: f64,
    /// Solar absorptance of the outer face
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub absorptance: f64,
    /// Solar transmittance for windows
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub solar_transmittance: f64,
}

impl SurfaceRecord {
    /// True when this surface contributes its own temperature state
    pub fn is_massive(&self) -> bool {
        !matches!(self.surface_type, SurfaceType::Window) && self.heat_capacity_j_per_m2k > 0.0
    }

    pub fn conductance_w_per_k(&self) -> f64 {
        self.u_value_w_per_m2k * self.area_m2
    }

    pub fn receives_irradiation(&self) -> bool {
        match self.surface_type {
            SurfaceType::Window => self.solar_transmittance > 0.0,
            SurfaceType::Exterior => self.is_massive() && self.absorptance > 0.0,
            _ => false,
        }
    }
}

/// Ideal zone HVAC terminal
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HvacSystemRecord {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub max_heating_power_kw: f64,
    #[validate(range(min = 0.0))]
    pub max_cooling_power_kw: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub heating_cop: f64,
}
