use nalgebra::DVector;
use serde::Serialize;
use tracing::debug;

use crate::error::{Component, ModelError};
use crate::model::{LinearSystem, Timeseries};

/// State trajectory (T+1 rows, first row is the initial state) and output
/// trajectory (T rows)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub state_timeseries: Timeseries,
    pub output_timeseries: Timeseries,
}

/// x[t+1] = A·x[t] + B·u[t] + E·d[t]
pub fn state_equation(
    system: &LinearSystem,
    state: &DVector<f64>,
    control: &DVector<f64>,
    disturbance: &DVector<f64>,
) -> DVector<f64> {
    &system.state_matrix * state
        + &system.control_matrix * control
        + &system.disturbance_matrix * disturbance
}

/// y[t] = C·x[t] + D·u[t] + F·d[t]
pub fn output_equation(
    system: &LinearSystem,
    state: &DVector<f64>,
    control: &DVector<f64>,
    disturbance: &DVector<f64>,
) -> DVector<f64> {
    &system.state_output_matrix * state
        + &system.control_output_matrix * control
        + &system.disturbance_output_matrix * disturbance
}

/// Run the system forward over the length of the control trajectory.
///
/// Disturbance and control timeseries must have the same length and carry the
/// system's column names in order.
pub fn simulate(
    system: &LinearSystem,
    initial_state: &DVector<f64>,
    disturbances: &Timeseries,
    controls: &Timeseries,
) -> Result<Simulation, ModelError> {
    check_dimensions(system, initial_state, disturbances, controls)?;

    let horizon = controls.len();
    let mut states = Vec::with_capacity(horizon + 1);
    let mut outputs = Vec::with_capacity(horizon);
    states.push(initial_state.clone());

    for t in 0..horizon {
        let u = controls.row(t);
        let d = disturbances.row(t);
        let x = &states[t];
        outputs.push(output_equation(system, x, &u, &d));
        let next = state_equation(system, x, &u, &d);
        states.push(next);
    }

    debug!(
        scenario = %system.scenario,
        horizon,
        n_states = system.n_states(),
        "simulation finished"
    );

    let state_timeseries = Timeseries::from_rows(system.states.clone(), &states)
        .ok_or_else(|| simulator_error(system, "state trajectory has ragged rows"))?;
    let output_timeseries = Timeseries::from_rows(system.outputs.clone(), &outputs)
        .ok_or_else(|| simulator_error(system, "output trajectory has ragged rows"))?;

    Ok(Simulation {
        state_timeseries,
        output_timeseries,
    })
}

fn simulator_error(system: &LinearSystem, message: impl Into<String>) -> ModelError {
    ModelError::dimension(system.scenario.clone(), Component::Simulator, message)
}

fn check_dimensions(
    system: &LinearSystem,
    initial_state: &DVector<f64>,
    disturbances: &Timeseries,
    controls: &Timeseries,
) -> Result<(), ModelError> {
    if initial_state.len() != system.n_states() {
        return Err(simulator_error(
            system,
            format!(
                "initial state has {} entries, system has {} states",
                initial_state.len(),
                system.n_states()
            ),
        ));
    }
    if controls.columns() != system.controls.as_slice() {
        return Err(simulator_error(
            system,
            format!(
                "control columns {:?} do not match system controls {:?}",
                controls.columns(),
                system.controls
            ),
        ));
    }
    if disturbances.columns() != system.disturbances.as_slice() {
        return Err(simulator_error(
            system,
            format!(
                "disturbance columns {:?} do not match system disturbances {:?}",
                disturbances.columns(),
                system.disturbances
            ),
        ));
    }
    if disturbances.len() != controls.len() {
        return Err(simulator_error(
            system,
            format!(
                "{} disturbance rows for {} control rows",
                disturbances.len(),
                controls.len()
            ),
        ));
    }
    Ok(())
}
