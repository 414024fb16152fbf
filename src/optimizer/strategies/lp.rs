//! LP (Linear Programming) Controller
//!
//! Exact finite-horizon optimal control of a linear building model. The formulation
//! considers:
//! - Dynamics x[t+1] = A·x[t] + B·u[t] + E·d[t] as equality constraints
//! - Control bounds (HVAC and storage powers) at every timestep
//! - Output bounds (comfort band, plant power, storage energy) at every timestep;
//!   outputs that depend on the state alone are also bounded at the terminal state
//! - Price-weighted outputs and controls in the objective
//! - Optionally a storage capacity variable with amortized investment cost
//!
//! Solved with good_lp on the pure-Rust minilp backend. The solve runs on the
//! blocking thread pool and is bounded by a wall-clock time limit.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{Component, ModelError};
use crate::optimizer::{ControlStrategy, OptimizationProblem, SolveResult};

/// Horizons longer than this are solved but may be slow on small machines
const LARGE_HORIZON_STEPS: usize = 500;

/// Tolerance for bounds on outputs that do not depend on any decision variable
const CONSTANT_BOUND_TOLERANCE: f64 = 1e-9;

/// LP controller solving one horizon per call
pub struct LpController {
    time_limit: Duration,
}

impl Default for LpController {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
        }
    }
}

impl LpController {
    pub fn new(time_limit: Duration) -> Self {
        Self { time_limit }
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }
}

#[async_trait]
impl ControlStrategy for LpController {
    #[instrument(skip(self, problem), fields(scenario = %problem.scenario()))]
    async fn solve(&self, problem: OptimizationProblem) -> Result<SolveResult, ModelError> {
        problem.validate()?;

        let scenario = problem.scenario().to_string();
        let horizon = problem.horizon();
        if horizon > LARGE_HORIZON_STEPS {
            warn!(
                scenario = %scenario,
                horizon,
                "LP received a long horizon; consider a coarser timestep"
            );
        }

        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || solve_lp(&problem));

        let result = match timeout(self.time_limit, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(ModelError::Solver {
                    scenario,
                    component: Component::Optimizer,
                    message: format!("solver task failed: {join_error}"),
                })
            }
            Err(_) => {
                warn!(scenario = %scenario, limit = ?self.time_limit, "LP solve timed out");
                return Err(ModelError::SolverTimeout {
                    scenario,
                    component: Component::Optimizer,
                    limit_seconds: self.time_limit.as_secs_f64(),
                });
            }
        };

        info!(
            scenario = %scenario,
            horizon,
            operation_cost = result.operation_cost,
            investment_cost = result.investment_cost,
            storage_size = result.storage_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "LP solve finished"
        );
        Ok(result)
    }
}

#[cfg(feature = "optimization")]
fn solve_lp(problem: &OptimizationProblem) -> Result<SolveResult, ModelError> {
    use good_lp::{
        constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
        Solution, SolverModel, Variable,
    };
    use nalgebra::DVector;

    use crate::model::Timeseries;
    use crate::optimizer::SolveMode;
    use crate::simulation::output_equation;

    /// Affine expression kept alongside a flag telling whether it has any variable terms
    struct Affine {
        expr: Expression,
        constant: f64,
        has_terms: bool,
    }

    impl Affine {
        fn constant(value: f64) -> Self {
            Self {
                expr: Expression::from(0.0),
                constant: value,
                has_terms: false,
            }
        }

        fn add_term(&mut self, coefficient: f64, var: Variable) {
            if coefficient != 0.0 {
                self.expr.add_mul(coefficient, var);
                self.has_terms = true;
            }
        }

        fn into_expression(self) -> Expression {
            self.expr + self.constant
        }
    }

    let sys = &problem.system;
    let scenario = sys.scenario.as_str();
    let horizon = problem.horizon();
    let (n, m, p, q) = (sys.n_states(), sys.n_controls(), sys.n_disturbances(), sys.n_outputs());
    let bounds = &problem.bounds;
    let disturbances = problem.disturbances.values();
    let x0 = &problem.initial_state;

    let infeasible = |message: String| ModelError::Infeasible {
        scenario: scenario.to_string(),
        component: Component::Optimizer,
        message,
    };

    let mut vars = ProblemVariables::new();

    // u[t][k] with the control bounds folded into the variable definition
    let controls: Vec<Vec<Variable>> = (0..horizon)
        .map(|t| {
            (0..m)
                .map(|k| {
                    vars.add(
                        variable()
                            .min(bounds.control_min[(t, k)])
                            .max(bounds.control_max[(t, k)]),
                    )
                })
                .collect()
        })
        .collect();

    // x[t] for t = 1..=T; x[0] is the fixed initial state
    let states: Vec<Vec<Variable>> = (0..horizon)
        .map(|_| vars.add_vector(variable(), n))
        .collect();

    let sizing = match &problem.mode {
        SolveMode::Operation => None,
        SolveMode::StorageSizing(sizing) => Some(sizing),
    };
    let capacity = sizing.map(|s| {
        vars.add(
            variable()
                .min(0.0)
                .max(s.max_capacity.unwrap_or(f64::INFINITY)),
        )
    });

    // State i at step t as an affine expression
    let state_term = |affine: &mut Affine, coefficient: f64, t: usize, i: usize| {
        if t == 0 {
            affine.constant += coefficient * x0[i];
        } else {
            affine.add_term(coefficient, states[t - 1][i]);
        }
    };

    let output_form = |t: usize, j: usize| {
        let mut y = Affine::constant(0.0);
        for i in 0..n {
            state_term(&mut y, sys.state_output_matrix[(j, i)], t, i);
        }
        for k in 0..m {
            y.add_term(sys.control_output_matrix[(j, k)], controls[t][k]);
        }
        for l in 0..p {
            y.constant += sys.disturbance_output_matrix[(j, l)] * disturbances[(t, l)];
        }
        y
    };

    // Objective: Σ_t price[t]·(w_y·y[t] + w_u·u[t]) + amortized investment
    let mut objective = Expression::from(0.0);
    for t in 0..horizon {
        let price = problem.cost.prices[t];
        if price == 0.0 {
            continue;
        }
        for j in 0..q {
            let weight = problem.cost.output_weights[j];
            if weight != 0.0 {
                objective.add_mul(price * weight, output_form(t, j).into_expression());
            }
        }
        for k in 0..m {
            let weight = problem.cost.control_weights[k];
            if weight != 0.0 {
                objective.add_mul(price * weight, controls[t][k]);
            }
        }
    }
    if let (Some(sizing), Some(cap)) = (sizing, capacity) {
        objective.add_mul(sizing.investment.amortized_per_period(), cap);
    }

    let mut model = vars.minimise(objective).using(default_solver);
    let mut n_constraints = 0usize;

    // Dynamics
    for t in 0..horizon {
        for i in 0..n {
            let mut next = Affine::constant(0.0);
            for j in 0..n {
                state_term(&mut next, sys.state_matrix[(i, j)], t, j);
            }
            for k in 0..m {
                next.add_term(sys.control_matrix[(i, k)], controls[t][k]);
            }
            for l in 0..p {
                next.constant += sys.disturbance_matrix[(i, l)] * disturbances[(t, l)];
            }
            model.add_constraint(constraint!(states[t][i] == next.into_expression()));
            n_constraints += 1;
        }
    }

    // Output bounds
    for t in 0..horizon {
        for j in 0..q {
            let (lo, hi) = (bounds.output_min[(t, j)], bounds.output_max[(t, j)]);
            if !lo.is_finite() && !hi.is_finite() {
                continue;
            }
            let y = output_form(t, j);
            if !y.has_terms {
                if y.constant < lo - CONSTANT_BOUND_TOLERANCE || y.constant > hi + CONSTANT_BOUND_TOLERANCE {
                    return Err(infeasible(format!(
                        "output '{}' is fixed at {:.4} at step {t}, outside [{lo}, {hi}]",
                        sys.outputs[j], y.constant
                    )));
                }
                continue;
            }
            let expr = y.into_expression();
            if lo.is_finite() {
                model.add_constraint(constraint!(expr.clone() >= lo));
                n_constraints += 1;
            }
            if hi.is_finite() {
                model.add_constraint(constraint!(expr <= hi));
                n_constraints += 1;
            }
        }
    }

    // Terminal state: bound the outputs that are functions of the state alone
    let terminal_rows = (0..q).filter(|&j| {
        sys.control_output_matrix.row(j).iter().all(|v| *v == 0.0)
            && sys.disturbance_output_matrix.row(j).iter().all(|v| *v == 0.0)
    });
    for j in terminal_rows.collect::<Vec<_>>() {
        let (lo, hi) = (
            bounds.output_min[(horizon - 1, j)],
            bounds.output_max[(horizon - 1, j)],
        );
        let mut y = Affine::constant(0.0);
        for i in 0..n {
            state_term(&mut y, sys.state_output_matrix[(j, i)], horizon, i);
        }
        if !y.has_terms {
            continue;
        }
        let expr = y.into_expression();
        if lo.is_finite() {
            model.add_constraint(constraint!(expr.clone() >= lo));
            n_constraints += 1;
        }
        if hi.is_finite() {
            model.add_constraint(constraint!(expr <= hi));
            n_constraints += 1;
        }
    }

    // Storage capacity couples the storage state and its charge/discharge rates
    if let (Some(sizing), Some(cap)) = (sizing, capacity) {
        model.add_constraint(constraint!(cap >= x0[sizing.state]));
        for t in 0..horizon {
            model.add_constraint(constraint!(states[t][sizing.state] <= cap));
            for &k in &sizing.rate_controls {
                model.add_constraint(constraint!(
                    controls[t][k] <= cap * sizing.rate_per_capacity
                ));
            }
        }
        n_constraints += 1 + horizon * (1 + sizing.rate_controls.len());
    }

    debug!(
        scenario,
        horizon,
        variables = horizon * (n + m) + usize::from(capacity.is_some()),
        constraints = n_constraints,
        "LP assembled"
    );

    let solution = model.solve().map_err(|e| match e {
        ResolutionError::Infeasible => {
            infeasible("no trajectory satisfies the dynamics and bounds".into())
        }
        other => ModelError::Solver {
            scenario: scenario.to_string(),
            component: Component::Optimizer,
            message: other.to_string(),
        },
    })?;

    let control_rows: Vec<DVector<f64>> = controls
        .iter()
        .map(|row| DVector::from_iterator(m, row.iter().map(|v| solution.value(*v))))
        .collect();
    let state_rows: Vec<DVector<f64>> = std::iter::once(x0.clone())
        .chain(
            states
                .iter()
                .map(|row| DVector::from_iterator(n, row.iter().map(|v| solution.value(*v)))),
        )
        .collect();
    let output_rows: Vec<DVector<f64>> = (0..horizon)
        .map(|t| {
            output_equation(
                sys,
                &state_rows[t],
                &control_rows[t],
                &problem.disturbances.row(t),
            )
        })
        .collect();

    let reshape = |names: &[String], rows: &[DVector<f64>]| {
        Timeseries::from_rows(names.to_vec(), rows).ok_or_else(|| {
            ModelError::dimension(scenario, Component::Optimizer, "solution has ragged rows")
        })
    };
    let control_timeseries = reshape(&sys.controls, &control_rows)?;
    let state_timeseries = reshape(&sys.states, &state_rows)?;
    let output_timeseries = reshape(&sys.outputs, &output_rows)?;

    let operation_cost = problem.cost.evaluate(&output_timeseries, &control_timeseries);
    let (storage_size, investment_cost) = match (sizing, capacity) {
        (Some(sizing), Some(cap)) => {
            let size = solution.value(cap).max(0.0);
            (size, size * sizing.investment.cost_per_unit)
        }
        _ => (0.0, 0.0),
    };

    Ok(SolveResult {
        scenario: scenario.to_string(),
        control_timeseries,
        state_timeseries,
        output_timeseries,
        operation_cost,
        investment_cost,
        storage_size,
    })
}

#[cfg(not(feature = "optimization"))]
fn solve_lp(problem: &OptimizationProblem) -> Result<SolveResult, ModelError> {
    Err(ModelError::Solver {
        scenario: problem.scenario().to_string(),
        component: Component::Optimizer,
        message: "LP optimization requires the 'optimization' feature to be enabled".into(),
    })
}
