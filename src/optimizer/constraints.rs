use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Per-timestep lower/upper bounds on controls (T×m) and outputs (T×q).
///
/// Infinite entries mean "unbounded" and produce no constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingBounds {
    pub control_min: DMatrix<f64>,
    pub control_max: DMatrix<f64>,
    pub output_min: DMatrix<f64>,
    pub output_max: DMatrix<f64>,
}

impl OperatingBounds {
    pub fn unbounded(horizon: usize, n_controls: usize, n_outputs: usize) -> Self {
        Self {
            control_min: DMatrix::from_element(horizon, n_controls, f64::NEG_INFINITY),
            control_max: DMatrix::from_element(horizon, n_controls, f64::INFINITY),
            output_min: DMatrix::from_element(horizon, n_outputs, f64::NEG_INFINITY),
            output_max: DMatrix::from_element(horizon, n_outputs, f64::INFINITY),
        }
    }

    pub fn horizon(&self) -> usize {
        self.control_min.nrows()
    }

    /// Same bounds on control `k` at every timestep
    pub fn with_control(mut self, k: usize, min: f64, max: f64) -> Self {
        self.control_min.column_mut(k).fill(min);
        self.control_max.column_mut(k).fill(max);
        self
    }

    /// Same bounds on output `j` at every timestep
    pub fn with_output(mut self, j: usize, min: f64, max: f64) -> Self {
        self.output_min.column_mut(j).fill(min);
        self.output_max.column_mut(j).fill(max);
        self
    }

    pub fn set_output_at(&mut self, t: usize, j: usize, min: f64, max: f64) {
        self.output_min[(t, j)] = min;
        self.output_max[(t, j)] = max;
    }

    /// Lower bound above upper bound anywhere, as (kind, timestep, index)
    pub fn first_crossed(&self) -> Option<(&'static str, usize, usize)> {
        let crossed = |lo: &DMatrix<f64>, hi: &DMatrix<f64>| {
            (0..lo.nrows())
                .flat_map(|t| (0..lo.ncols()).map(move |j| (t, j)))
                .find(|&(t, j)| lo[(t, j)] > hi[(t, j)])
        };
        crossed(&self.control_min, &self.control_max)
            .map(|(t, k)| ("control", t, k))
            .or_else(|| crossed(&self.output_min, &self.output_max).map(|(t, j)| ("output", t, j)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_builders() {
        let bounds = OperatingBounds::unbounded(3, 2, 1)
            .with_control(1, 0.0, 10.0)
            .with_output(0, 20.0, 24.0);

        assert_eq!(bounds.horizon(), 3);
        assert_eq!(bounds.control_min[(2, 1)], 0.0);
        assert_eq!(bounds.control_max[(0, 1)], 10.0);
        assert_eq!(bounds.control_min[(0, 0)], f64::NEG_INFINITY);
        assert_eq!(bounds.output_max[(1, 0)], 24.0);
        assert_eq!(bounds.first_crossed(), None);
    }

    #[test]
    fn test_crossed_bounds_detected() {
        let mut bounds = OperatingBounds::unbounded(2, 1, 1).with_output(0, 20.0, 24.0);
        bounds.set_output_at(1, 0, 25.0, 24.0);
        assert_eq!(bounds.first_crossed(), Some(("output", 1, 0)));
    }
}
