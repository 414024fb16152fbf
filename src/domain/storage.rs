use serde::{Deserialize, Serialize};
use validator::Validate;

/// Thermal energy storage type (e.g. a chilled-water tank)
///
/// Energies are in kWh of stored cooling, rates in kW thermal.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageTypeRecord {
    #[validate(length(min = 1))]
    pub name: String,
    /// Capacity used when the size is fixed (operation mode)
    #[validate(range(min = 0.0))]
    pub capacity_kwh: f64,
    /// Upper bound on the capacity decision in sizing mode
    pub max_capacity_kwh: Option<f64>,
    /// Maximum charge/discharge rate per kWh of capacity (1/h)
    #[validate(range(exclusive_min = 0.0))]
    pub max_rate_per_capacity: f64,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub charge_efficiency: f64,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub discharge_efficiency: f64,
    /// Self-discharge time constant (h); `None` means lossless
    pub self_discharge_time_constant_h: Option<f64>,
    #[validate(range(min = 0.0))]
    pub investment_cost_per_kwh: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub lifetime_years: f64,
}

impl StorageTypeRecord {
    /// Continuous-time decay rate (1/h) of the stored energy
    pub fn self_discharge_rate(&self) -> f64 {
        match self.self_discharge_time_constant_h {
            Some(tau) if tau > 0.0 && tau.is_finite() => 1.0 / tau,
            _ => 0.0,
        }
    }

    pub fn max_rate_kw(&self) -> f64 {
        self.capacity_kwh * self.max_rate_per_capacity
    }

    /// Capital cost of a tank with the tabulated capacity
    pub fn capital_cost(&self) -> f64 {
        self.capacity_kwh * self.investment_cost_per_kwh
    }
}
