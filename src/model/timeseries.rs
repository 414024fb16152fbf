use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Table of values indexed by timestep (rows) and variable name (columns)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeseries {
    columns: Vec<String>,
    values: DMatrix<f64>,
}

impl Timeseries {
    /// Returns `None` if the number of columns does not match the matrix width
    pub fn new(columns: Vec<String>, values: DMatrix<f64>) -> Option<Self> {
        (columns.len() == values.ncols()).then_some(Self { columns, values })
    }

    pub fn zeros(columns: Vec<String>, len: usize) -> Self {
        Self::filled(columns, len, 0.0)
    }

    pub fn filled(columns: Vec<String>, len: usize, value: f64) -> Self {
        let width = columns.len();
        Self {
            columns,
            values: DMatrix::from_element(len, width, value),
        }
    }

    /// Build from one vector per timestep. All rows must have `columns.len()` entries.
    pub fn from_rows(columns: Vec<String>, rows: &[DVector<f64>]) -> Option<Self> {
        if rows.iter().any(|r| r.len() != columns.len()) {
            return None;
        }
        let values = DMatrix::from_fn(rows.len(), columns.len(), |t, j| rows[t][j]);
        Some(Self { columns, values })
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn row(&self, t: usize) -> DVector<f64> {
        self.values.row(t).transpose()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.column_index(name)?;
        Some(self.values.column(j).iter().copied().collect())
    }

    pub fn value(&self, t: usize, name: &str) -> Option<f64> {
        let j = self.column_index(name)?;
        (t < self.len()).then(|| self.values[(t, j)])
    }

    /// Largest absolute element-wise difference; `None` if the shapes differ
    pub fn max_abs_difference(&self, other: &Timeseries) -> Option<f64> {
        if self.values.shape() != other.values.shape() {
            return None;
        }
        Some(
            (&self.values - &other.values)
                .iter()
                .fold(0.0_f64, |acc, v| acc.max(v.abs())),
        )
    }
}
