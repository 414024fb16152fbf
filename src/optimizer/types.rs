use async_trait::async_trait;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::OperatingBounds;
use crate::error::{Component, ModelError};
use crate::model::{LinearSystem, Timeseries};

/// Price-weighted operating cost: Σ_t price[t]·(w_y·y[t] + w_u·u[t])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostStructure {
    /// Price per unit of weighted quantity, one entry per timestep
    pub prices: Vec<f64>,
    /// Weight per output (e.g. the step length in hours for a power output)
    pub output_weights: DVector<f64>,
    /// Weight per control
    pub control_weights: DVector<f64>,
}

impl CostStructure {
    /// Operating cost of a given output/control trajectory pair
    pub fn evaluate(&self, outputs: &Timeseries, controls: &Timeseries) -> f64 {
        self.prices
            .iter()
            .enumerate()
            .map(|(t, price)| {
                let y = outputs.row(t);
                let u = controls.row(t);
                price * (self.output_weights.dot(&y) + self.control_weights.dot(&u))
            })
            .sum()
    }
}

/// Capital cost of storage capacity, amortized over its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvestmentCost {
    pub cost_per_unit: f64,
    pub lifetime_years: f64,
    /// Number of optimization horizons per year (e.g. 260 working days)
    pub periods_per_year: f64,
}

impl InvestmentCost {
    /// Share of the per-unit cost charged to one horizon
    pub fn amortized_per_period(&self) -> f64 {
        self.cost_per_unit / (self.lifetime_years * self.periods_per_year)
    }
}

/// Storage capacity as a decision variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSizing {
    /// State bounded above by the capacity
    pub state: usize,
    /// Controls bounded above by `rate_per_capacity · capacity`
    pub rate_controls: Vec<usize>,
    pub rate_per_capacity: f64,
    pub max_capacity: Option<f64>,
    pub investment: InvestmentCost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SolveMode {
    /// Fixed equipment, optimize operation only
    Operation,
    /// Optimize operation and storage capacity jointly
    StorageSizing(StorageSizing),
}

/// Everything a control strategy needs for one finite-horizon solve
#[derive(Debug, Clone)]
pub struct OptimizationProblem {
    pub system: Arc<LinearSystem>,
    pub disturbances: Timeseries,
    pub initial_state: DVector<f64>,
    pub bounds: OperatingBounds,
    pub cost: CostStructure,
    pub mode: SolveMode,
}

impl OptimizationProblem {
    pub fn horizon(&self) -> usize {
        self.disturbances.len()
    }

    pub fn scenario(&self) -> &str {
        &self.system.scenario
    }

    /// Check all shapes against the system before handing the problem to a solver
    pub fn validate(&self) -> Result<(), ModelError> {
        let sys = &self.system;
        let horizon = self.horizon();
        let err = |message: String| {
            Err(ModelError::dimension(sys.scenario.clone(), Component::Optimizer, message))
        };

        if horizon == 0 {
            return err("empty horizon".into());
        }
        if self.disturbances.width() != sys.n_disturbances() {
            return err(format!(
                "disturbance timeseries has {} columns, system has {} disturbances",
                self.disturbances.width(),
                sys.n_disturbances()
            ));
        }
        if self.initial_state.len() != sys.n_states() {
            return err(format!(
                "initial state has {} entries, system has {} states",
                self.initial_state.len(),
                sys.n_states()
            ));
        }
        let b = &self.bounds;
        if b.control_min.shape() != (horizon, sys.n_controls())
            || b.control_max.shape() != (horizon, sys.n_controls())
        {
            return err(format!(
                "control bounds are {:?}, expected {:?}",
                b.control_min.shape(),
                (horizon, sys.n_controls())
            ));
        }
        if b.output_min.shape() != (horizon, sys.n_outputs())
            || b.output_max.shape() != (horizon, sys.n_outputs())
        {
            return err(format!(
                "output bounds are {:?}, expected {:?}",
                b.output_min.shape(),
                (horizon, sys.n_outputs())
            ));
        }
        if self.cost.prices.len() != horizon {
            return err(format!(
                "{} prices for a horizon of {horizon} steps",
                self.cost.prices.len()
            ));
        }
        if self.cost.output_weights.len() != sys.n_outputs()
            || self.cost.control_weights.len() != sys.n_controls()
        {
            return err("cost weights do not match output/control dimensions".into());
        }
        if let SolveMode::StorageSizing(sizing) = &self.mode {
            if sizing.state >= sys.n_states()
                || sizing.rate_controls.iter().any(|&k| k >= sys.n_controls())
            {
                return err("storage sizing refers to a state or control outside the system".into());
            }
        }
        if let Some((kind, t, index)) = b.first_crossed() {
            return Err(ModelError::Infeasible {
                scenario: sys.scenario.clone(),
                component: Component::Optimizer,
                message: format!("{kind} {index} has lower bound above upper bound at step {t}"),
            });
        }
        Ok(())
    }
}

/// Optimal trajectories and costs for one solve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveResult {
    pub scenario: String,
    pub control_timeseries: Timeseries,
    /// T+1 rows, starting with the initial state
    pub state_timeseries: Timeseries,
    pub output_timeseries: Timeseries,
    pub operation_cost: f64,
    /// Zero unless the storage capacity was optimized
    pub investment_cost: f64,
    /// Zero unless the storage capacity was optimized
    pub storage_size: f64,
}

impl SolveResult {
    pub fn horizon(&self) -> usize {
        self.control_timeseries.len()
    }
}

#[async_trait]
pub trait ControlStrategy: Send + Sync {
    async fn solve(&self, problem: OptimizationProblem) -> Result<SolveResult, ModelError>;
}

pub struct Optimizer {
    pub strategy: Box<dyn ControlStrategy>,
}

impl Optimizer {
    pub fn new(strategy: Box<dyn ControlStrategy>) -> Self {
        Self { strategy }
    }

    pub async fn solve(&self, problem: OptimizationProblem) -> Result<SolveResult, ModelError> {
        self.strategy.solve(problem).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amortized_investment() {
        let investment = InvestmentCost {
            cost_per_unit: 2600.0,
            lifetime_years: 10.0,
            periods_per_year: 260.0,
        };
        assert!((investment.amortized_per_period() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cost_evaluation() {
        let cost = CostStructure {
            prices: vec![1.0, 2.0],
            output_weights: DVector::from_vec(vec![0.5]),
            control_weights: DVector::from_vec(vec![1.0]),
        };
        let outputs = Timeseries::filled(vec!["y".into()], 2, 4.0);
        let controls = Timeseries::filled(vec!["u".into()], 2, 1.0);
        // 1·(2 + 1) + 2·(2 + 1)
        assert!((cost.evaluate(&outputs, &controls) - 9.0).abs() < 1e-12);
    }
}
