//! # Simulation Module
//!
//! Forward recursion of a discrete-time building model for a given control
//! trajectory. Used for model inspection (e.g. all-ones controls), for checking
//! optimizer results and for reconstructing outputs after a solve.
//!
//! ## Usage
//!
//! ```text
//! let controls = Timeseries::filled(system.controls.clone(), horizon, 1.0);
//! let run = simulate(&system, &initial_state, &disturbances, &controls)?;
//! let zone_temperature = run.state_timeseries.column("office_temperature");
//! ```

pub mod simulator;

pub use simulator::{output_equation, simulate, state_equation, Simulation};
