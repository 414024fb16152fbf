//! Building thermal model: RC network assembly, discretization and the resulting
//! linear state-space system.

pub mod builder;
pub mod building;
pub mod discretize;
pub mod system;
pub mod thermal;
pub mod timeseries;

pub use builder::*;
pub use building::*;
pub use discretize::zero_order_hold;
pub use system::*;
pub use timeseries::*;
