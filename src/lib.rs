//! Building thermal state-space modelling, predictive control and thermal storage
//! sizing.
//!
//! Parameter store → model builder → {simulator, LP control engine} → payback
//! analyzer → reports.

pub mod config;
pub mod domain;
pub mod error;
pub mod model;
pub mod optimizer;
pub mod payback;
pub mod repo;
pub mod report;
pub mod simulation;
pub mod telemetry;

pub use error::{Component, ModelError};
