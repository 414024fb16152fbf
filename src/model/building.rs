use chrono::NaiveDateTime;
use nalgebra::DVector;
use serde::Serialize;
use std::sync::Arc;

use super::{LinearSystem, Timeseries};
use crate::domain::{Scenario, StorageTypeRecord};
use crate::error::{Component, ModelError};
use crate::optimizer::{
    CostStructure, InvestmentCost, OperatingBounds, OptimizationProblem, SolveMode, StorageSizing,
};
use crate::simulation::{simulate, Simulation};

/// Where the storage device sits in the system vectors
#[derive(Debug, Clone, Serialize)]
pub struct StorageLayout {
    pub record: StorageTypeRecord,
    pub state: usize,
    pub charge_control: usize,
    pub discharge_control: usize,
    pub energy_output: usize,
}

/// A built scenario: the discrete-time system plus everything realized over the
/// horizon (disturbances, prices, initial state and operating limits).
#[derive(Debug, Clone)]
pub struct BuildingModel {
    pub scenario: Scenario,
    pub system: Arc<LinearSystem>,
    /// T rows, one column per disturbance
    pub disturbance_timeseries: Timeseries,
    /// Electricity price per kWh for each step
    pub prices: Vec<f64>,
    pub timesteps: Vec<NaiveDateTime>,
    pub initial_state: DVector<f64>,
    /// Limits for operation with the storage size fixed
    pub bounds: OperatingBounds,
    /// Output billed at `prices`
    pub grid_output: usize,
    pub storage: Option<StorageLayout>,
}

impl BuildingModel {
    pub fn horizon(&self) -> usize {
        self.timesteps.len()
    }

    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// Operating limits; with `storage_sizing` the storage limits scale with the
    /// capacity decision instead of the tabulated capacity
    pub fn operating_bounds(&self, storage_sizing: bool) -> OperatingBounds {
        let mut bounds = self.bounds.clone();
        if let (true, Some(storage)) = (storage_sizing, &self.storage) {
            let max_rate = storage
                .record
                .max_capacity_kwh
                .map_or(f64::INFINITY, |cap| cap * storage.record.max_rate_per_capacity);
            bounds = bounds
                .with_control(storage.charge_control, 0.0, max_rate)
                .with_control(storage.discharge_control, 0.0, max_rate)
                .with_output(storage.energy_output, 0.0, f64::INFINITY);
        }
        bounds
    }

    /// Grid energy billed at the scenario prices
    pub fn cost_structure(&self) -> CostStructure {
        let mut output_weights = DVector::zeros(self.system.n_outputs());
        output_weights[self.grid_output] = self.scenario.timestep_hours();
        CostStructure {
            prices: self.prices.clone(),
            output_weights,
            control_weights: DVector::zeros(self.system.n_controls()),
        }
    }

    pub fn storage_sizing(&self, periods_per_year: f64) -> Option<StorageSizing> {
        self.storage.as_ref().map(|storage| StorageSizing {
            state: storage.state,
            rate_controls: vec![storage.charge_control, storage.discharge_control],
            rate_per_capacity: storage.record.max_rate_per_capacity,
            max_capacity: storage.record.max_capacity_kwh,
            investment: InvestmentCost {
                cost_per_unit: storage.record.investment_cost_per_kwh,
                lifetime_years: storage.record.lifetime_years,
                periods_per_year,
            },
        })
    }

    /// Problem for the control engine, optionally with the storage capacity as a
    /// decision variable
    pub fn optimization_problem(
        &self,
        storage_sizing: bool,
        periods_per_year: f64,
    ) -> Result<OptimizationProblem, ModelError> {
        let mode = if storage_sizing {
            let sizing = self.storage_sizing(periods_per_year).ok_or_else(|| {
                ModelError::configuration(
                    self.scenario.name.clone(),
                    Component::Optimizer,
                    "storage sizing requested for a scenario without storage",
                )
            })?;
            SolveMode::StorageSizing(sizing)
        } else {
            SolveMode::Operation
        };

        Ok(OptimizationProblem {
            system: Arc::clone(&self.system),
            disturbances: self.disturbance_timeseries.clone(),
            initial_state: self.initial_state.clone(),
            bounds: self.operating_bounds(storage_sizing),
            cost: self.cost_structure(),
            mode,
        })
    }

    pub fn simulate(&self, controls: &Timeseries) -> Result<Simulation, ModelError> {
        simulate(
            &self.system,
            &self.initial_state,
            &self.disturbance_timeseries,
            controls,
        )
    }

    /// All controls at 1 kW, for inspecting the model response
    pub fn unit_controls(&self) -> Timeseries {
        Timeseries::filled(self.system.controls.clone(), self.horizon(), 1.0)
    }
}
