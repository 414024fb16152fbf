//! Payback of a storage investment from a baseline and a storage-augmented solve.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::StorageTypeRecord;
use crate::error::{Component, ModelError};
use crate::optimizer::SolveResult;

/// Payback time in years, or `Never` when savings do not recover the investment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payback {
    Years(f64),
    Never,
}

impl Payback {
    pub fn years(&self) -> Option<f64> {
        match self {
            Payback::Years(years) => Some(*years),
            Payback::Never => None,
        }
    }
}

/// Investment divided by annual savings; `Never` for non-positive savings
pub fn simple_payback(investment: f64, annual_savings: f64) -> Payback {
    if annual_savings <= 0.0 || !annual_savings.is_finite() {
        return Payback::Never;
    }
    Payback::Years(investment / annual_savings)
}

/// Smallest whole number of years whose discounted savings cover the investment,
/// searched up to `max_years`
pub fn discounted_payback(
    investment: f64,
    annual_savings: f64,
    discount_rate: f64,
    max_years: u32,
) -> Payback {
    if annual_savings <= 0.0 || !annual_savings.is_finite() {
        return Payback::Never;
    }
    if investment <= 0.0 {
        return Payback::Years(0.0);
    }
    let mut cumulative = 0.0;
    for year in 1..=max_years {
        cumulative += annual_savings / (1.0 + discount_rate).powi(year as i32);
        if cumulative >= investment {
            return Payback::Years(f64::from(year));
        }
    }
    Payback::Never
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaybackReport {
    pub scenario: String,
    pub baseline_operation_cost: f64,
    pub storage_operation_cost: f64,
    pub savings_per_period: f64,
    pub annual_savings: f64,
    pub investment_cost: f64,
    pub storage_size: f64,
    pub simple_payback: Payback,
    pub discounted_payback: Payback,
}

impl PaybackReport {
    /// Simple payback in years, for callers that cannot handle `Never`
    pub fn require_simple_payback(&self) -> Result<f64, ModelError> {
        self.simple_payback
            .years()
            .ok_or_else(|| ModelError::PaybackUndefined {
                scenario: self.scenario.clone(),
                component: Component::PaybackAnalyzer,
                message: format!(
                    "annual savings of {:.2} do not recover an investment of {:.2}",
                    self.annual_savings, self.investment_cost
                ),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaybackAnalyzer {
    pub discount_rate: f64,
    /// How many optimization horizons make up a year
    pub periods_per_year: f64,
    /// Search limit for discounted payback (storage lifetime)
    pub lifetime_years: u32,
}

impl PaybackAnalyzer {
    pub fn new(discount_rate: f64, periods_per_year: f64, lifetime_years: u32) -> Self {
        Self {
            discount_rate,
            periods_per_year,
            lifetime_years,
        }
    }

    /// Payback of the storage size and investment chosen by a sizing solve
    pub fn analyze(
        &self,
        baseline: &SolveResult,
        storage: &SolveResult,
    ) -> Result<PaybackReport, ModelError> {
        self.evaluate(baseline, storage, storage.storage_size, storage.investment_cost)
    }

    /// Payback of a tank with the tabulated capacity, operated without sizing.
    ///
    /// An operation-mode solve reports no investment, so the capital comes from
    /// the storage record.
    pub fn analyze_fixed_storage(
        &self,
        baseline: &SolveResult,
        storage: &SolveResult,
        record: &StorageTypeRecord,
    ) -> Result<PaybackReport, ModelError> {
        self.evaluate(baseline, storage, record.capacity_kwh, record.capital_cost())
    }

    fn evaluate(
        &self,
        baseline: &SolveResult,
        storage: &SolveResult,
        storage_size: f64,
        investment: f64,
    ) -> Result<PaybackReport, ModelError> {
        if baseline.horizon() != storage.horizon() {
            return Err(ModelError::dimension(
                storage.scenario.clone(),
                Component::PaybackAnalyzer,
                format!(
                    "baseline covers {} steps, storage run covers {}",
                    baseline.horizon(),
                    storage.horizon()
                ),
            ));
        }

        let savings_per_period = baseline.operation_cost - storage.operation_cost;
        let annual_savings = savings_per_period * self.periods_per_year;

        let report = PaybackReport {
            scenario: storage.scenario.clone(),
            baseline_operation_cost: baseline.operation_cost,
            storage_operation_cost: storage.operation_cost,
            savings_per_period,
            annual_savings,
            investment_cost: investment,
            storage_size,
            simple_payback: simple_payback(investment, annual_savings),
            discounted_payback: discounted_payback(
                investment,
                annual_savings,
                self.discount_rate,
                self.lifetime_years,
            ),
        };

        info!(
            scenario = %report.scenario,
            annual_savings = report.annual_savings,
            investment_cost = report.investment_cost,
            simple_payback = ?report.simple_payback,
            discounted_payback = ?report.discounted_payback,
            "payback analyzed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timeseries;
    use rstest::rstest;

    fn result(operation_cost: f64, investment_cost: f64, horizon: usize) -> SolveResult {
        SolveResult {
            scenario: "office".into(),
            control_timeseries: Timeseries::zeros(vec!["u".into()], horizon),
            state_timeseries: Timeseries::zeros(vec!["x".into()], horizon + 1),
            output_timeseries: Timeseries::zeros(vec!["y".into()], horizon),
            operation_cost,
            investment_cost,
            storage_size: investment_cost / 10.0,
        }
    }

    #[rstest]
    #[case(1000.0, 500.0, Payback::Years(2.0))]
    #[case(1000.0, 0.0, Payback::Never)]
    #[case(1000.0, -10.0, Payback::Never)]
    #[case(0.0, 10.0, Payback::Years(0.0))]
    fn test_simple_payback(#[case] investment: f64, #[case] savings: f64, #[case] expected: Payback) {
        assert_eq!(simple_payback(investment, savings), expected);
    }

    #[test]
    fn test_discounted_payback() {
        // Undiscounted: exactly two years
        assert_eq!(discounted_payback(1000.0, 500.0, 0.0, 20), Payback::Years(2.0));
        // 500/1.1 + 500/1.21 = 867.8 < 1000, third year brings it to 1243.4
        assert_eq!(discounted_payback(1000.0, 500.0, 0.1, 20), Payback::Years(3.0));
        // Lifetime too short
        assert_eq!(discounted_payback(1000.0, 500.0, 0.1, 2), Payback::Never);
        assert_eq!(discounted_payback(1000.0, 0.0, 0.1, 20), Payback::Never);
    }

    #[test]
    fn test_analyze_savings() {
        let analyzer = PaybackAnalyzer::new(0.0, 260.0, 20);
        let report = analyzer
            .analyze(&result(12.0, 0.0, 24), &result(10.0, 1040.0, 24))
            .unwrap();

        assert_eq!(report.savings_per_period, 2.0);
        assert_eq!(report.annual_savings, 520.0);
        assert_eq!(report.simple_payback, Payback::Years(2.0));
        assert_eq!(report.discounted_payback, Payback::Years(2.0));
        assert_eq!(report.require_simple_payback().unwrap(), 2.0);
        assert_eq!(report.storage_size, 104.0);
    }

    #[test]
    fn test_no_savings_is_undefined() {
        let analyzer = PaybackAnalyzer::new(0.05, 260.0, 20);
        let report = analyzer
            .analyze(&result(10.0, 0.0, 24), &result(10.0, 500.0, 24))
            .unwrap();

        assert_eq!(report.simple_payback, Payback::Never);
        let err = report.require_simple_payback().unwrap_err();
        assert!(matches!(
            err,
            ModelError::PaybackUndefined {
                component: Component::PaybackAnalyzer,
                ..
            }
        ));
    }

    #[test]
    fn test_fixed_storage_uses_tabulated_capital() {
        let tank = StorageTypeRecord {
            name: "chilled_water_tank".into(),
            capacity_kwh: 100.0,
            max_capacity_kwh: None,
            max_rate_per_capacity: 0.25,
            charge_efficiency: 0.95,
            discharge_efficiency: 0.95,
            self_discharge_time_constant_h: None,
            investment_cost_per_kwh: 40.0,
            lifetime_years: 20.0,
        };
        let analyzer = PaybackAnalyzer::new(0.0, 260.0, 20);
        // operation-mode result: no investment of its own
        let report = analyzer
            .analyze_fixed_storage(&result(12.0, 0.0, 24), &result(10.0, 0.0, 24), &tank)
            .unwrap();

        assert_eq!(report.investment_cost, 4000.0);
        assert_eq!(report.storage_size, 100.0);
        assert_eq!(report.simple_payback, Payback::Years(4000.0 / 520.0));
        assert_eq!(report.discounted_payback, Payback::Years(8.0));
    }

    #[test]
    fn test_horizon_mismatch() {
        let analyzer = PaybackAnalyzer::new(0.05, 260.0, 20);
        let err = analyzer
            .analyze(&result(10.0, 0.0, 24), &result(9.0, 500.0, 48))
            .unwrap_err();
        assert!(matches!(err, ModelError::Dimension { .. }));
    }
}
