//! Assembles a [`BuildingModel`] for one scenario from the parameter tables.
//!
//! Vector layouts are deterministic:
//!
//! - states: zone air temperatures (table order), massive surface temperatures
//!   (table order), `storage_energy`
//! - controls: per zone with HVAC `{zone}_heat_thermal_power`,
//!   `{zone}_cool_thermal_power`; then `storage_charge_thermal_power`,
//!   `storage_discharge_thermal_power`
//! - disturbances: `ambient_air_temperature`, `irradiation_{orientation}` in
//!   orientation order, `internal_gain_{schedule}` sorted by name
//! - outputs: zone temperatures, per HVAC zone heat/cool thermal and heat electric
//!   power, chiller plant thermal/electric power, `storage_energy`,
//!   `grid_electric_power`

use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::building::{BuildingModel, StorageLayout};
use super::discretize::zero_order_hold;
use super::thermal::{
    infiltration_conductance_kw_per_k, surface_capacitance_kwh_per_k, surface_link,
    zone_capacitance_kwh_per_k, SurfaceLink, ThermalNetwork, WATT_PER_KW,
};
use super::{LinearSystem, Timeseries};
use crate::domain::{
    aligned_offset, HvacSystemRecord, Orientation, PricingMethod, Scenario, SurfaceType,
    ZoneRecord,
};
use crate::error::{Component, ModelError};
use crate::optimizer::OperatingBounds;
use crate::repo::ParameterRepository;

pub const AMBIENT_AIR_TEMPERATURE: &str = "ambient_air_temperature";
pub const STORAGE_ENERGY: &str = "storage_energy";
pub const STORAGE_CHARGE: &str = "storage_charge_thermal_power";
pub const STORAGE_DISCHARGE: &str = "storage_discharge_thermal_power";
pub const PLANT_COOL_THERMAL: &str = "plant_cool_thermal_power";
pub const PLANT_COOL_ELECTRIC: &str = "plant_cool_electric_power";
pub const GRID_ELECTRIC: &str = "grid_electric_power";

/// Source of an internal gain disturbance column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GainSource {
    Schedule(String),
    /// Zone with a gain density but no schedule: always on
    Constant,
}

impl GainSource {
    fn of(zone: &ZoneRecord) -> Option<Self> {
        if zone.internal_gain_w_per_m2 <= 0.0 {
            return None;
        }
        Some(match &zone.internal_gain_schedule {
            Some(name) => GainSource::Schedule(name.clone()),
            None => GainSource::Constant,
        })
    }

    fn column(&self) -> String {
        match self {
            GainSource::Schedule(name) => format!("internal_gain_{name}"),
            GainSource::Constant => "internal_gain_constant".to_string(),
        }
    }
}

struct ZoneHvac {
    zone: usize,
    record: HvacSystemRecord,
    heat: usize,
    cool: usize,
}

pub struct ModelBuilder<'a> {
    repo: &'a dyn ParameterRepository,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(repo: &'a dyn ParameterRepository) -> Self {
        Self { repo }
    }

    /// Build the discrete-time model and realized timeseries for `scenario`.
    ///
    /// Unknown references and inconsistent data fail with a configuration error;
    /// nothing is partially built.
    #[instrument(skip(self, scenario), fields(scenario = %scenario.name))]
    pub fn build(&self, scenario: &Scenario) -> Result<BuildingModel, ModelError> {
        let model = self.assemble(scenario).map_err(|e| match e {
            ModelError::NotFound { table, name, .. } => ModelError::configuration(
                scenario.name.clone(),
                Component::ModelBuilder,
                format!("unknown {table} '{name}'"),
            ),
            other => other.in_scenario(&scenario.name),
        })?;

        info!(
            scenario = %scenario.name,
            states = model.system.n_states(),
            controls = model.system.n_controls(),
            disturbances = model.system.n_disturbances(),
            outputs = model.system.n_outputs(),
            horizon = model.horizon(),
            "building model built"
        );
        Ok(model)
    }

    fn assemble(&self, scenario: &Scenario) -> Result<BuildingModel, ModelError> {
        let config_err = |message: String| {
            ModelError::configuration(scenario.name.clone(), Component::ModelBuilder, message)
        };

        if scenario.horizon_steps == 0 {
            return Err(config_err("horizon must have at least one step".into()));
        }
        if scenario.timestep_minutes == 0 {
            return Err(config_err("timestep must be positive".into()));
        }
        let horizon = scenario.horizon_steps;
        let dt = scenario.timestep_hours();

        let building = self.repo.find_building(&scenario.building_name)?;
        let zones = self.repo.find_zones(&building.name)?;
        let surfaces = self.repo.find_surfaces(&building.name)?;
        if zones.is_empty() {
            return Err(config_err(format!("building '{}' has no zones", building.name)));
        }
        if building.chiller_cop <= 0.0 {
            return Err(config_err(format!(
                "building '{}' has a non-positive chiller COP",
                building.name
            )));
        }
        for zone in &zones {
            if zone.min_temperature_c > zone.max_temperature_c {
                return Err(config_err(format!(
                    "zone '{}' has minimum temperature above maximum",
                    zone.name
                )));
            }
        }
        let zone_index: HashMap<&str, usize> = zones
            .iter()
            .enumerate()
            .map(|(i, z)| (z.name.as_str(), i))
            .collect();
        let lookup_zone = |name: &str, surface: &str| {
            zone_index.get(name).copied().ok_or_else(|| {
                config_err(format!("surface '{surface}' refers to unknown zone '{name}'"))
            })
        };

        let storage = scenario
            .storage_type
            .as_deref()
            .map(|name| self.repo.find_storage_type(name))
            .transpose()?;

        // States
        let mut states: Vec<String> = zones.iter().map(|z| format!("{}_temperature", z.name)).collect();
        let mut surface_nodes: Vec<Option<usize>> = Vec::with_capacity(surfaces.len());
        for surface in &surfaces {
            if surface.is_massive() {
                surface_nodes.push(Some(states.len()));
                states.push(format!("{}_temperature", surface.name));
            } else {
                surface_nodes.push(None);
            }
        }
        let storage_state = storage.as_ref().map(|_| {
            states.push(STORAGE_ENERGY.to_string());
            states.len() - 1
        });

        // Controls
        let mut controls = Vec::new();
        let mut hvac = Vec::new();
        for (i, zone) in zones.iter().enumerate() {
            if let Some(name) = &zone.hvac_system {
                let record = self.repo.find_hvac_system(name)?;
                if record.heating_cop <= 0.0 {
                    return Err(config_err(format!(
                        "HVAC system '{name}' has a non-positive heating COP"
                    )));
                }
                controls.push(format!("{}_heat_thermal_power", zone.name));
                controls.push(format!("{}_cool_thermal_power", zone.name));
                hvac.push(ZoneHvac {
                    zone: i,
                    record,
                    heat: controls.len() - 2,
                    cool: controls.len() - 1,
                });
            }
        }
        let storage_controls = storage.as_ref().map(|_| {
            controls.push(STORAGE_CHARGE.to_string());
            controls.push(STORAGE_DISCHARGE.to_string());
            (controls.len() - 2, controls.len() - 1)
        });

        // Disturbances
        let orientations: BTreeSet<Orientation> = surfaces
            .iter()
            .filter(|s| s.receives_irradiation())
            .map(|s| s.orientation)
            .collect();
        let gain_sources: Vec<GainSource> = zones
            .iter()
            .filter_map(GainSource::of)
            .sorted_by_key(|source| source.column())
            .dedup()
            .collect();
        if let Some(column) = gain_sources.iter().map(GainSource::column).duplicates().next() {
            return Err(config_err(format!("internal gain column '{column}' is ambiguous")));
        }

        let mut disturbances = vec![AMBIENT_AIR_TEMPERATURE.to_string()];
        let irradiation_index: HashMap<Orientation, usize> = orientations
            .iter()
            .map(|o| {
                disturbances.push(format!("irradiation_{o}"));
                (*o, disturbances.len() - 1)
            })
            .collect();
        let gain_index: HashMap<GainSource, usize> = gain_sources
            .iter()
            .map(|source| {
                disturbances.push(source.column());
                (source.clone(), disturbances.len() - 1)
            })
            .collect();

        let (n, m, p) = (states.len(), controls.len(), disturbances.len());
        debug!(n, m, p, "vector layout resolved");

        // Continuous-time network
        let mut network = ThermalNetwork::new(n, m, p);
        for (i, zone) in zones.iter().enumerate() {
            let capacitance = zone_capacitance_kwh_per_k(zone);
            if capacitance <= 0.0 || !capacitance.is_finite() {
                return Err(config_err(format!(
                    "zone '{}' has a non-positive heat capacity",
                    zone.name
                )));
            }
            network.set_capacitance(i, capacitance);
            network.connect_boundary(i, 0, infiltration_conductance_kw_per_k(zone));
            if let Some(source) = GainSource::of(zone) {
                let gain_kw = zone.internal_gain_w_per_m2 * zone.floor_area_m2 / WATT_PER_KW;
                network.add_disturbance_gain(i, gain_index[&source], gain_kw);
            }
        }

        for (surface, node) in surfaces.iter().zip(&surface_nodes) {
            let zone = lookup_zone(&surface.zone_name, &surface.name)?;
            let adjacent = match &surface.surface_type {
                SurfaceType::Interior { adjacent_zone } => {
                    let other = lookup_zone(adjacent_zone, &surface.name)?;
                    if other == zone {
                        return Err(config_err(format!(
                            "interior surface '{}' connects zone '{}' to itself",
                            surface.name, surface.zone_name
                        )));
                    }
                    Some(other)
                }
                _ => None,
            };

            if let Some(node) = node {
                let capacitance = surface_capacitance_kwh_per_k(surface);
                if capacitance <= 0.0 || !capacitance.is_finite() {
                    return Err(config_err(format!(
                        "surface '{}' has a non-positive heat capacity",
                        surface.name
                    )));
                }
                network.set_capacitance(*node, capacitance);
            }

            match surface_link(surface, zone, *node, adjacent) {
                SurfaceLink::ZoneToAmbient { zone, h } => network.connect_boundary(zone, 0, h),
                SurfaceLink::ZoneToZone { zone, other, h } => network.connect(zone, other, h),
                SurfaceLink::Node {
                    node,
                    zones,
                    to_ambient,
                    h_side,
                } => {
                    for z in zones {
                        network.connect(node, z, h_side);
                    }
                    if to_ambient {
                        network.connect_boundary(node, 0, h_side);
                    }
                }
                SurfaceLink::None => {}
            }

            if surface.receives_irradiation() {
                let column = irradiation_index[&surface.orientation];
                match (&surface.surface_type, node) {
                    (SurfaceType::Window, _) => network.add_disturbance_gain(
                        zone,
                        column,
                        surface.solar_transmittance * surface.area_m2 / WATT_PER_KW,
                    ),
                    (_, Some(node)) => network.add_disturbance_gain(
                        *node,
                        column,
                        surface.absorptance * surface.area_m2 / WATT_PER_KW,
                    ),
                    _ => {}
                }
            }
        }

        for unit in &hvac {
            network.add_control_gain(unit.zone, unit.heat, 1.0);
            network.add_control_gain(unit.zone, unit.cool, -1.0);
        }
        if let (Some(record), Some(node), Some((charge, discharge))) =
            (&storage, storage_state, storage_controls)
        {
            network.add_storage(node, charge, discharge, record);
        }

        let (a, b, e) = network.into_continuous();
        let (ad, bd, ed) = zero_order_hold(&a, &b, &e, dt);

        // Outputs
        let mut outputs: Vec<String> = zones.iter().map(|z| format!("{}_temperature", z.name)).collect();
        let mut c_rows: Vec<(usize, usize, f64)> = (0..zones.len()).map(|i| (i, i, 1.0)).collect();
        let mut d_rows: Vec<(usize, usize, f64)> = Vec::new();
        let mut heat_electric = Vec::new();
        for unit in &hvac {
            let zone = &zones[unit.zone].name;
            outputs.push(format!("{zone}_heat_thermal_power"));
            d_rows.push((outputs.len() - 1, unit.heat, 1.0));
            outputs.push(format!("{zone}_cool_thermal_power"));
            d_rows.push((outputs.len() - 1, unit.cool, 1.0));
            outputs.push(format!("{zone}_heat_electric_power"));
            d_rows.push((outputs.len() - 1, unit.heat, 1.0 / unit.record.heating_cop));
            heat_electric.push((unit.heat, 1.0 / unit.record.heating_cop));
        }

        let mut plant_load: Vec<(usize, f64)> = hvac.iter().map(|unit| (unit.cool, 1.0)).collect();
        if let Some((charge, discharge)) = storage_controls {
            plant_load.push((charge, 1.0));
            plant_load.push((discharge, -1.0));
        }
        outputs.push(PLANT_COOL_THERMAL.to_string());
        let plant_thermal = outputs.len() - 1;
        outputs.push(PLANT_COOL_ELECTRIC.to_string());
        let plant_electric = outputs.len() - 1;
        for &(k, sign) in &plant_load {
            d_rows.push((plant_thermal, k, sign));
            d_rows.push((plant_electric, k, sign / building.chiller_cop));
        }

        let storage_output = storage_state.map(|node| {
            outputs.push(STORAGE_ENERGY.to_string());
            c_rows.push((outputs.len() - 1, node, 1.0));
            outputs.len() - 1
        });

        outputs.push(GRID_ELECTRIC.to_string());
        let grid_output = outputs.len() - 1;
        for &(k, coefficient) in &heat_electric {
            d_rows.push((grid_output, k, coefficient));
        }
        for &(k, sign) in &plant_load {
            d_rows.push((grid_output, k, sign / building.chiller_cop));
        }

        let q = outputs.len();
        let mut c = DMatrix::zeros(q, n);
        for (row, col, value) in c_rows {
            c[(row, col)] += value;
        }
        let mut d = DMatrix::zeros(q, m);
        for (row, col, value) in d_rows {
            d[(row, col)] += value;
        }
        let f = DMatrix::zeros(q, p);

        let system = LinearSystem::new(
            scenario.name.clone(),
            states,
            controls,
            disturbances,
            outputs,
            [ad, bd, ed, c, d, f],
        )?;

        // Realized disturbances over the horizon
        let weather = self.repo.find_weather(&scenario.weather_name)?;
        let mut values = DMatrix::zeros(horizon, p);
        let ambient = aligned_window(
            &format!("weather '{}'", weather.name),
            &weather.ambient_air_temperature_c,
            weather.start,
            weather.timestep_minutes,
            scenario,
        )
        .map_err(&config_err)?;
        values.column_mut(0).copy_from_slice(ambient);

        for (orientation, &column) in &irradiation_index {
            let series = weather
                .irradiation_w_per_m2
                .get(orientation)
                .ok_or_else(|| {
                    config_err(format!(
                        "weather '{}' has no irradiation for orientation '{orientation}'",
                        weather.name
                    ))
                })?;
            let window = aligned_window(
                &format!("weather '{}' irradiation_{orientation}", weather.name),
                series,
                weather.start,
                weather.timestep_minutes,
                scenario,
            )
            .map_err(&config_err)?;
            values.column_mut(column).copy_from_slice(window);
        }

        for (source, &column) in &gain_index {
            match source {
                GainSource::Constant => values.column_mut(column).fill(1.0),
                GainSource::Schedule(name) => {
                    let schedule = self.repo.find_internal_gain_schedule(name)?;
                    let window = aligned_window(
                        &format!("internal gain schedule '{name}'"),
                        &schedule.values,
                        schedule.start,
                        schedule.timestep_minutes,
                        scenario,
                    )
                    .map_err(&config_err)?;
                    values.column_mut(column).copy_from_slice(window);
                }
            }
        }
        let disturbance_timeseries = Timeseries::new(system.disturbances.clone(), values)
            .ok_or_else(|| config_err("disturbance table does not match the system".into()))?;

        // Prices
        let tariff = self.repo.find_tariff(&scenario.tariff_name)?;
        let timesteps = scenario.timesteps();
        let prices = match scenario.pricing_method {
            PricingMethod::WholesaleMarket => aligned_window(
                &format!("tariff '{}'", tariff.name),
                &tariff.wholesale_prices,
                tariff.start,
                tariff.timestep_minutes,
                scenario,
            )
            .map_err(&config_err)?
            .to_vec(),
            PricingMethod::RetailerPeakOffpeak => timesteps
                .iter()
                .map(|t| tariff.time_of_use_price(*t))
                .collect(),
        };

        // Initial state: everything at the initial temperature, storage empty
        let mut initial_state = DVector::from_element(n, scenario.initial_temperature_c);
        if let Some(node) = storage_state {
            initial_state[node] = 0.0;
        }

        // Operating limits with the tabulated storage size
        let mut bounds = OperatingBounds::unbounded(horizon, m, q);
        for unit in &hvac {
            bounds = bounds
                .with_control(unit.heat, 0.0, unit.record.max_heating_power_kw)
                .with_control(unit.cool, 0.0, unit.record.max_cooling_power_kw);
        }
        for (i, zone) in zones.iter().enumerate() {
            bounds = bounds.with_output(i, zone.min_temperature_c, zone.max_temperature_c);
        }
        bounds = bounds
            .with_output(plant_thermal, 0.0, f64::INFINITY)
            .with_output(plant_electric, 0.0, f64::INFINITY);

        let storage = match (storage, storage_state, storage_controls, storage_output) {
            (Some(record), Some(state), Some((charge, discharge)), Some(energy_output)) => {
                bounds = bounds
                    .with_control(charge, 0.0, record.max_rate_kw())
                    .with_control(discharge, 0.0, record.max_rate_kw())
                    .with_output(energy_output, 0.0, record.capacity_kwh);
                Some(StorageLayout {
                    record,
                    state,
                    charge_control: charge,
                    discharge_control: discharge,
                    energy_output,
                })
            }
            _ => None,
        };

        Ok(BuildingModel {
            scenario: scenario.clone(),
            system: Arc::new(system),
            disturbance_timeseries,
            prices,
            timesteps,
            initial_state,
            bounds,
            grid_output,
            storage,
        })
    }
}

/// Slice of a tabulated series covering the scenario horizon
fn aligned_window<'v>(
    label: &str,
    values: &'v [f64],
    series_start: chrono::NaiveDateTime,
    series_timestep_minutes: u32,
    scenario: &Scenario,
) -> Result<&'v [f64], String> {
    if series_timestep_minutes != scenario.timestep_minutes {
        return Err(format!(
            "{label} has a {series_timestep_minutes} min timestep, scenario uses {} min",
            scenario.timestep_minutes
        ));
    }
    let offset = aligned_offset(series_start, series_timestep_minutes, scenario.start)
        .ok_or_else(|| {
            format!(
                "{label} starting {series_start} is not aligned with scenario start {}",
                scenario.start
            )
        })?;
    let end = offset + scenario.horizon_steps;
    values.get(offset..end).ok_or_else(|| {
        format!(
            "{label} has {} steps, horizon needs steps {offset}..{end}",
            values.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BuildingRecord, InternalGainSchedule, StorageTypeRecord, SurfaceRecord, TariffRecord,
        WeatherSeries,
    };
    use crate::repo::MockParameterRepository;
    use chrono::{NaiveDate, NaiveDateTime};
    use rstest::rstest;
    use std::collections::BTreeMap;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn scenario(horizon_steps: usize) -> Scenario {
        Scenario {
            name: "office".into(),
            building_name: "tower".into(),
            storage_type: None,
            weather_name: "singapore".into(),
            tariff_name: "retail".into(),
            pricing_method: PricingMethod::RetailerPeakOffpeak,
            start: start(),
            timestep_minutes: 60,
            horizon_steps,
            initial_temperature_c: 24.0,
        }
    }

    fn zone(name: &str) -> ZoneRecord {
        ZoneRecord {
            name: name.into(),
            building_name: "tower".into(),
            floor_area_m2: 100.0,
            ceiling_height_m: 3.0,
            extra_heat_capacity_j_per_k: 2.0e6,
            infiltration_ach: 0.5,
            internal_gain_w_per_m2: 10.0,
            internal_gain_schedule: Some("office_hours".into()),
            hvac_system: Some("fan_coil".into()),
            min_temperature_c: 21.0,
            max_temperature_c: 25.0,
        }
    }

    fn surface(name: &str, surface_type: SurfaceType, heat_capacity: f64) -> SurfaceRecord {
        SurfaceRecord {
            name: name.into(),
            zone_name: "level_1".into(),
            surface_type,
            orientation: Orientation::South,
            area_m2: 30.0,
            u_value_w_per_m2k: 0.8,
            heat_capacity_j_per_m2k: heat_capacity,
            absorptance: 0.6,
            solar_transmittance: 0.5,
        }
    }

    fn weather(steps: usize) -> WeatherSeries {
        WeatherSeries {
            name: "singapore".into(),
            start: start(),
            timestep_minutes: 60,
            ambient_air_temperature_c: vec![30.0; steps],
            irradiation_w_per_m2: BTreeMap::from([(Orientation::South, vec![200.0; steps])]),
        }
    }

    fn tank() -> StorageTypeRecord {
        StorageTypeRecord {
            name: "chilled_water".into(),
            capacity_kwh: 50.0,
            max_capacity_kwh: Some(500.0),
            max_rate_per_capacity: 0.5,
            charge_efficiency: 0.95,
            discharge_efficiency: 0.95,
            self_discharge_time_constant_h: Some(100.0),
            investment_cost_per_kwh: 40.0,
            lifetime_years: 20.0,
        }
    }

    /// Mock store with one zone, a massive wall, a window and an occupancy schedule
    fn mock_repo(weather_steps: usize) -> MockParameterRepository {
        let mut repo = MockParameterRepository::new();
        repo.expect_find_building().returning(|name| {
            Ok(BuildingRecord {
                name: name.to_string(),
                chiller_cop: 4.0,
            })
        });
        repo.expect_find_zones()
            .returning(|_| Ok(vec![zone("level_1")]));
        repo.expect_find_surfaces().returning(|_| {
            Ok(vec![
                surface("south_wall", SurfaceType::Exterior, 150_000.0),
                surface("south_window", SurfaceType::Window, 0.0),
            ])
        });
        repo.expect_find_hvac_system().returning(|name| {
            Ok(HvacSystemRecord {
                name: name.to_string(),
                max_heating_power_kw: 20.0,
                max_cooling_power_kw: 40.0,
                heating_cop: 3.0,
            })
        });
        repo.expect_find_storage_type().returning(|name| {
            if name == "chilled_water" {
                Ok(tank())
            } else {
                Err(ModelError::not_found("", "storage_types", name))
            }
        });
        repo.expect_find_weather()
            .returning(move |_| Ok(weather(weather_steps)));
        repo.expect_find_internal_gain_schedule()
            .returning(move |name| {
                Ok(InternalGainSchedule {
                    name: name.to_string(),
                    start: start(),
                    timestep_minutes: 60,
                    values: (0..weather_steps).map(|t| if t % 24 >= 8 { 1.0 } else { 0.0 }).collect(),
                })
            });
        repo.expect_find_tariff().returning(|name| {
            Ok(TariffRecord {
                name: name.to_string(),
                start: start(),
                timestep_minutes: 60,
                wholesale_prices: vec![0.1, 0.2, 0.3],
                peak_price: 0.3,
                offpeak_price: 0.1,
                peak_start_hour: 8,
                peak_end_hour: 18,
            })
        });
        repo
    }

    #[test]
    fn test_vector_layout_without_storage() {
        let repo = mock_repo(48);
        let model = ModelBuilder::new(&repo).build(&scenario(24)).unwrap();
        let sys = &model.system;

        assert_eq!(sys.states, vec!["level_1_temperature", "south_wall_temperature"]);
        assert_eq!(
            sys.controls,
            vec!["level_1_heat_thermal_power", "level_1_cool_thermal_power"]
        );
        assert_eq!(
            sys.disturbances,
            vec![
                "ambient_air_temperature",
                "irradiation_south",
                "internal_gain_office_hours"
            ]
        );
        assert_eq!(sys.outputs.last().map(String::as_str), Some(GRID_ELECTRIC));
        assert!(sys.output_index(STORAGE_ENERGY).is_none());
        assert!(!model.has_storage());
        assert_eq!(model.horizon(), 24);
        assert_eq!(model.disturbance_timeseries.len(), 24);
        assert_eq!(model.prices.len(), 24);
        assert_eq!(model.prices[0], 0.1);
        assert_eq!(model.prices[9], 0.3);
    }

    #[test]
    fn test_vector_layout_with_storage() {
        let repo = mock_repo(48);
        let with_storage = scenario(24).with_storage("chilled_water");
        let model = ModelBuilder::new(&repo).build(&with_storage).unwrap();
        let sys = &model.system;

        assert_eq!(sys.states.last().map(String::as_str), Some(STORAGE_ENERGY));
        assert_eq!(sys.control_index(STORAGE_CHARGE), Some(2));
        assert_eq!(sys.control_index(STORAGE_DISCHARGE), Some(3));
        assert!(sys.output_index(STORAGE_ENERGY).is_some());
        assert_eq!(model.initial_state[2], 0.0);
        assert_eq!(model.initial_state[0], 24.0);

        let storage = model.storage.as_ref().unwrap();
        assert_eq!(model.bounds.control_max[(0, storage.charge_control)], 25.0);
        assert_eq!(model.bounds.output_max[(0, storage.energy_output)], 50.0);

        let sizing_bounds = model.operating_bounds(true);
        assert_eq!(sizing_bounds.control_max[(0, storage.charge_control)], 250.0);
        assert_eq!(
            sizing_bounds.output_max[(0, storage.energy_output)],
            f64::INFINITY
        );
    }

    #[test]
    fn test_shapes_are_consistent() {
        let repo = mock_repo(48);
        let model = ModelBuilder::new(&repo)
            .build(&scenario(24).with_storage("chilled_water"))
            .unwrap();
        let sys = &model.system;
        let (n, m, p, q) = (sys.n_states(), sys.n_controls(), sys.n_disturbances(), sys.n_outputs());

        assert_eq!(sys.state_matrix.shape(), (n, n));
        assert_eq!(sys.control_matrix.shape(), (n, m));
        assert_eq!(sys.disturbance_matrix.shape(), (n, p));
        assert_eq!(sys.state_output_matrix.shape(), (q, n));
        assert_eq!(sys.control_output_matrix.shape(), (q, m));
        assert_eq!(sys.disturbance_output_matrix.shape(), (q, p));
    }

    #[test]
    fn test_steady_state_without_inputs() {
        // All nodes at ambient with no gains, no solar and no HVAC stay at ambient
        let repo = mock_repo(48);
        let model = ModelBuilder::new(&repo).build(&scenario(4)).unwrap();
        let sys = &model.system;

        let x = DVector::from_element(sys.n_states(), 30.0);
        let mut d = DVector::zeros(sys.n_disturbances());
        d[0] = 30.0;
        let next = &sys.state_matrix * &x + &sys.disturbance_matrix * &d;
        assert!((next - x).norm() < 1e-9);
    }

    #[test]
    fn test_heating_raises_zone_temperature() {
        let repo = mock_repo(48);
        let model = ModelBuilder::new(&repo).build(&scenario(4)).unwrap();
        let sys = &model.system;
        let heat = sys.control_index("level_1_heat_thermal_power").unwrap();
        let cool = sys.control_index("level_1_cool_thermal_power").unwrap();
        assert!(sys.control_matrix[(0, heat)] > 0.0);
        assert!(sys.control_matrix[(0, cool)] < 0.0);
    }

    #[test]
    fn test_grid_output_prices_heat_and_plant() {
        let repo = mock_repo(48);
        let model = ModelBuilder::new(&repo).build(&scenario(4)).unwrap();
        let sys = &model.system;
        let grid = sys.output_index(GRID_ELECTRIC).unwrap();
        let heat = sys.control_index("level_1_heat_thermal_power").unwrap();
        let cool = sys.control_index("level_1_cool_thermal_power").unwrap();

        assert!((sys.control_output_matrix[(grid, heat)] - 1.0 / 3.0).abs() < 1e-12);
        assert!((sys.control_output_matrix[(grid, cool)] - 0.25).abs() < 1e-12);
        let cost = model.cost_structure();
        assert_eq!(cost.output_weights[grid], 1.0);
    }

    #[rstest]
    #[case::horizon_exceeds_weather(scenario(72), "72")]
    #[case::empty_horizon(scenario(0), "at least one step")]
    #[case::unknown_storage(scenario(4).with_storage("ice"), "storage_types 'ice'")]
    #[case::weather_resolution(scenario(4).with_timestep_minutes(30), "timestep")]
    fn test_configuration_errors(#[case] scenario: Scenario, #[case] needle: &str) {
        let repo = mock_repo(48);
        let err = ModelBuilder::new(&repo).build(&scenario).unwrap_err();
        assert!(
            matches!(
                err,
                ModelError::Configuration {
                    component: Component::ModelBuilder,
                    ..
                }
            ),
            "{err}"
        );
        assert_eq!(err.scenario(), "office");
        assert!(err.to_string().contains(needle), "{err}");
    }

    #[test]
    fn test_misaligned_start_rejected() {
        let repo = mock_repo(48);
        let mut late = scenario(4);
        late.start = start() + chrono::Duration::minutes(15);
        let err = ModelBuilder::new(&repo).build(&late).unwrap_err();
        assert!(err.to_string().contains("not aligned"), "{err}");
    }

    #[test]
    fn test_wholesale_prices_are_sliced() {
        let repo = mock_repo(48);
        let mut wholesale = scenario(2);
        wholesale.pricing_method = PricingMethod::WholesaleMarket;
        wholesale.start = start() + chrono::Duration::hours(1);
        let model = ModelBuilder::new(&repo).build(&wholesale).unwrap();
        assert_eq!(model.prices, vec![0.2, 0.3]);
    }

    #[test]
    fn test_self_referencing_partition_rejected() {
        let mut repo = MockParameterRepository::new();
        repo.expect_find_building().returning(|name| {
            Ok(BuildingRecord {
                name: name.to_string(),
                chiller_cop: 4.0,
            })
        });
        repo.expect_find_zones().returning(|_| Ok(vec![zone("level_1")]));
        repo.expect_find_surfaces().returning(|_| {
            Ok(vec![surface(
                "loop",
                SurfaceType::Interior {
                    adjacent_zone: "level_1".into(),
                },
                0.0,
            )])
        });
        repo.expect_find_hvac_system().returning(|name| {
            Ok(HvacSystemRecord {
                name: name.to_string(),
                max_heating_power_kw: 1.0,
                max_cooling_power_kw: 1.0,
                heating_cop: 1.0,
            })
        });

        let err = ModelBuilder::new(&repo).build(&scenario(4)).unwrap_err();
        assert!(err.to_string().contains("to itself"), "{err}");
    }

    #[test]
    fn test_sizing_requires_storage() {
        let repo = mock_repo(48);
        let model = ModelBuilder::new(&repo).build(&scenario(4)).unwrap();
        assert!(model.optimization_problem(true, 260.0).is_err());
        let problem = model.optimization_problem(false, 260.0).unwrap();
        assert!(problem.validate().is_ok());
    }
}
