use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::domain::PricingMethod;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub run: RunConfig,
    #[validate(nested)]
    pub solver: SolverConfig,
    #[validate(nested)]
    pub payback: PaybackConfig,
    pub store: StoreConfig,
}

/// Which scenario to evaluate and how
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RunConfig {
    #[validate(length(min = 1))]
    pub scenario: String,
    pub pricing_method: PricingMethod,
    /// Optimize the storage capacity instead of using the tabulated one
    #[serde(default)]
    pub storage_sizing: bool,
    #[validate(range(min = 1))]
    pub horizon_steps: Option<usize>,
    #[validate(range(min = 1))]
    pub timestep_minutes: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SolverConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub time_limit_seconds: f64,
}

impl SolverConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.time_limit_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaybackConfig {
    #[validate(range(min = 0.0))]
    pub discount_rate: f64,
    /// Optimization horizons per year, e.g. 260 working days for a one-day horizon
    #[validate(range(exclusive_min = 0.0))]
    pub periods_per_year: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// JSON file with the parameter tables
    pub parameters_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("BTO__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().context("invalid configuration")?;
        config.validate().context("configuration out of range")?;
        Ok(config)
    }
}
