//! Control strategies
//!
//! - LP: exact finite-horizon optimal control over the linear building model,
//!   optionally sizing a storage device jointly with its operation

pub mod lp;

pub use lp::*;
