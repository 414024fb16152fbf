use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::{Component, ModelError};

/// Discrete-time linear time-invariant system
///
/// ```text
/// x[t+1] = A·x[t] + B·u[t] + E·d[t]
/// y[t]   = C·x[t] + D·u[t] + F·d[t]
/// ```
///
/// The name vectors give every row/column a fixed meaning; matrices never change
/// after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearSystem {
    pub scenario: String,
    pub states: Vec<String>,
    pub controls: Vec<String>,
    pub disturbances: Vec<String>,
    pub outputs: Vec<String>,
    /// A (n×n)
    pub state_matrix: DMatrix<f64>,
    /// B (n×m)
    pub control_matrix: DMatrix<f64>,
    /// E (n×p)
    pub disturbance_matrix: DMatrix<f64>,
    /// C (q×n)
    pub state_output_matrix: DMatrix<f64>,
    /// D (q×m)
    pub control_output_matrix: DMatrix<f64>,
    /// F (q×p)
    pub disturbance_output_matrix: DMatrix<f64>,
}

/// The six system matrices in A, B, E, C, D, F order
pub type SystemMatrices = [DMatrix<f64>; 6];

impl LinearSystem {
    /// Assemble a system, checking every matrix against the vector dimensions
    pub fn new(
        scenario: impl Into<String>,
        states: Vec<String>,
        controls: Vec<String>,
        disturbances: Vec<String>,
        outputs: Vec<String>,
        matrices: SystemMatrices,
    ) -> Result<Self, ModelError> {
        let scenario = scenario.into();
        let [a, b, e, c, d, f] = matrices;
        let (n, m, p, q) = (states.len(), controls.len(), disturbances.len(), outputs.len());

        let expected = [
            ("state_matrix", &a, (n, n)),
            ("control_matrix", &b, (n, m)),
            ("disturbance_matrix", &e, (n, p)),
            ("state_output_matrix", &c, (q, n)),
            ("control_output_matrix", &d, (q, m)),
            ("disturbance_output_matrix", &f, (q, p)),
        ];
        for (name, matrix, shape) in expected {
            if matrix.shape() != shape {
                return Err(ModelError::dimension(
                    scenario,
                    Component::ModelBuilder,
                    format!("{name} is {:?}, expected {:?}", matrix.shape(), shape),
                ));
            }
        }

        Ok(Self {
            scenario,
            states,
            controls,
            disturbances,
            outputs,
            state_matrix: a,
            control_matrix: b,
            disturbance_matrix: e,
            state_output_matrix: c,
            control_output_matrix: d,
            disturbance_output_matrix: f,
        })
    }

    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    pub fn n_controls(&self) -> usize {
        self.controls.len()
    }

    pub fn n_disturbances(&self) -> usize {
        self.disturbances.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s == name)
    }

    pub fn control_index(&self, name: &str) -> Option<usize> {
        self.controls.iter().position(|s| s == name)
    }

    pub fn disturbance_index(&self, name: &str) -> Option<usize> {
        self.disturbances.iter().position(|s| s == name)
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|s| s == name)
    }

    /// Matrices in A, B, E, C, D, F order with their conventional names
    pub fn named_matrices(&self) -> [(&'static str, &DMatrix<f64>); 6] {
        [
            ("state_matrix", &self.state_matrix),
            ("control_matrix", &self.control_matrix),
            ("disturbance_matrix", &self.disturbance_matrix),
            ("state_output_matrix", &self.state_output_matrix),
            ("control_output_matrix", &self.control_output_matrix),
            ("disturbance_output_matrix", &self.disturbance_output_matrix),
        ]
    }
}
