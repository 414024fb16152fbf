//! Serializable views of a built model and of solve results, as tables indexed by
//! variable name and timestep. Writing them somewhere is left to the caller.

use chrono::NaiveDateTime;
use nalgebra::DMatrix;
use serde::Serialize;

use crate::model::{BuildingModel, Timeseries};
use crate::optimizer::SolveResult;
use crate::payback::PaybackReport;

/// Matrix with named rows and columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedMatrix {
    pub name: &'static str,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// Row-major values
    pub values: Vec<Vec<f64>>,
}

impl NamedMatrix {
    fn new(name: &'static str, rows: &[String], columns: &[String], matrix: &DMatrix<f64>) -> Self {
        Self {
            name,
            rows: rows.to_vec(),
            columns: columns.to_vec(),
            values: matrix
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
        }
    }
}

/// Timeseries with its timestep labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub index: Vec<NaiveDateTime>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Table {
    pub fn new(index: Vec<NaiveDateTime>, timeseries: &Timeseries) -> Self {
        Self {
            index,
            columns: timeseries.columns().to_vec(),
            values: timeseries
                .values()
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelReport {
    pub scenario: String,
    pub matrices: Vec<NamedMatrix>,
    pub disturbances: Table,
    pub prices: Vec<f64>,
}

impl ModelReport {
    pub fn from_model(model: &BuildingModel) -> Self {
        let sys = &model.system;
        let layout = [
            (&sys.states, &sys.states),
            (&sys.states, &sys.controls),
            (&sys.states, &sys.disturbances),
            (&sys.outputs, &sys.states),
            (&sys.outputs, &sys.controls),
            (&sys.outputs, &sys.disturbances),
        ];
        let matrices = sys
            .named_matrices()
            .into_iter()
            .zip(layout)
            .map(|((name, matrix), (rows, columns))| NamedMatrix::new(name, rows, columns, matrix))
            .collect();

        Self {
            scenario: model.scenario.name.clone(),
            matrices,
            disturbances: Table::new(model.timesteps.clone(), &model.disturbance_timeseries),
            prices: model.prices.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveReport {
    pub scenario: String,
    pub controls: Table,
    /// One more row than the controls: the state after the last step
    pub states: Table,
    pub outputs: Table,
    pub operation_cost: f64,
    pub investment_cost: f64,
    pub storage_size: f64,
}

impl SolveReport {
    /// `timesteps` are the start times of the T control steps
    pub fn new(result: &SolveResult, timesteps: &[NaiveDateTime]) -> Self {
        let state_index = match (timesteps.first(), timesteps.get(1)) {
            (Some(first), Some(second)) => {
                let step = *second - *first;
                timesteps
                    .iter()
                    .copied()
                    .chain(timesteps.last().map(|last| *last + step))
                    .collect()
            }
            _ => timesteps.to_vec(),
        };
        Self {
            scenario: result.scenario.clone(),
            controls: Table::new(timesteps.to_vec(), &result.control_timeseries),
            states: Table::new(state_index, &result.state_timeseries),
            outputs: Table::new(timesteps.to_vec(), &result.output_timeseries),
            operation_cost: result.operation_cost,
            investment_cost: result.investment_cost,
            storage_size: result.storage_size,
        }
    }
}

/// Everything one run of the binary produces
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub baseline_model: ModelReport,
    pub storage_model: Option<ModelReport>,
    pub baseline: SolveReport,
    pub storage: Option<SolveReport>,
    pub payback: Option<PaybackReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_state_table_gets_terminal_timestamp() {
        let t0 = NaiveDate::from_ymd_opt(2017, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timesteps = vec![t0, t0 + chrono::Duration::minutes(30)];
        let result = SolveResult {
            scenario: "office".into(),
            control_timeseries: Timeseries::zeros(vec!["u".into()], 2),
            state_timeseries: Timeseries::filled(vec!["x".into()], 3, 22.0),
            output_timeseries: Timeseries::zeros(vec!["y".into()], 2),
            operation_cost: 1.5,
            investment_cost: 0.0,
            storage_size: 0.0,
        };

        let report = SolveReport::new(&result, &timesteps);
        assert_eq!(report.states.index.len(), 3);
        assert_eq!(report.states.index[2], t0 + chrono::Duration::hours(1));
        assert_eq!(report.states.values[2], vec![22.0]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["operation_cost"], 1.5);
        assert_eq!(json["controls"]["columns"][0], "u");
    }
}
