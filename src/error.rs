use serde::Serialize;
use strum_macros::Display;
use thiserror::Error;

/// Part of the pipeline an error originated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Component {
    ParameterStore,
    ModelBuilder,
    Simulator,
    Optimizer,
    PaybackAnalyzer,
}

/// Errors raised while building, simulating or optimizing a building model.
///
/// Every variant names the scenario and the component at fault.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("[{scenario}] {component}: record not found: {table} '{name}'")]
    NotFound {
        scenario: String,
        component: Component,
        table: &'static str,
        name: String,
    },

    #[error("[{scenario}] {component}: configuration error: {message}")]
    Configuration {
        scenario: String,
        component: Component,
        message: String,
    },

    #[error("[{scenario}] {component}: dimension mismatch: {message}")]
    Dimension {
        scenario: String,
        component: Component,
        message: String,
    },

    #[error("[{scenario}] {component}: infeasible problem: {message}")]
    Infeasible {
        scenario: String,
        component: Component,
        message: String,
    },

    #[error("[{scenario}] {component}: solver exceeded time limit of {limit_seconds:.1}s")]
    SolverTimeout {
        scenario: String,
        component: Component,
        limit_seconds: f64,
    },

    #[error("[{scenario}] {component}: solver failed: {message}")]
    Solver {
        scenario: String,
        component: Component,
        message: String,
    },

    #[error("[{scenario}] {component}: payback undefined: {message}")]
    PaybackUndefined {
        scenario: String,
        component: Component,
        message: String,
    },
}

impl ModelError {
    pub fn configuration(
        scenario: impl Into<String>,
        component: Component,
        message: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            scenario: scenario.into(),
            component,
            message: message.into(),
        }
    }

    pub fn dimension(
        scenario: impl Into<String>,
        component: Component,
        message: impl Into<String>,
    ) -> Self {
        Self::Dimension {
            scenario: scenario.into(),
            component,
            message: message.into(),
        }
    }

    pub fn not_found(
        scenario: impl Into<String>,
        table: &'static str,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            scenario: scenario.into(),
            component: Component::ParameterStore,
            table,
            name: name.into(),
        }
    }

    /// Scenario the error belongs to
    pub fn scenario(&self) -> &str {
        match self {
            ModelError::NotFound { scenario, .. }
            | ModelError::Configuration { scenario, .. }
            | ModelError::Dimension { scenario, .. }
            | ModelError::Infeasible { scenario, .. }
            | ModelError::SolverTimeout { scenario, .. }
            | ModelError::Solver { scenario, .. }
            | ModelError::PaybackUndefined { scenario, .. } => scenario,
        }
    }

    /// Attach a scenario name to errors raised below the scenario level (store lookups)
    pub fn in_scenario(mut self, name: &str) -> Self {
        match &mut self {
            ModelError::NotFound { scenario, .. }
            | ModelError::Configuration { scenario, .. }
            | ModelError::Dimension { scenario, .. }
            | ModelError::Infeasible { scenario, .. }
            | ModelError::SolverTimeout { scenario, .. }
            | ModelError::Solver { scenario, .. }
            | ModelError::PaybackUndefined { scenario, .. } => {
                if scenario.is_empty() {
                    *scenario = name.to_string();
                }
            }
        }
        self
    }

    /// Component the error originated in
    pub fn component(&self) -> Component {
        match self {
            ModelError::NotFound { component, .. }
            | ModelError::Configuration { component, .. }
            | ModelError::Dimension { component, .. }
            | ModelError::Infeasible { component, .. }
            | ModelError::SolverTimeout { component, .. }
            | ModelError::Solver { component, .. }
            | ModelError::PaybackUndefined { component, .. } => *component,
        }
    }

    /// True for errors that describe the problem itself rather than a solver fault
    pub fn is_infeasible(&self) -> bool {
        matches!(self, ModelError::Infeasible { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_names_scenario_and_component() {
        let err = ModelError::configuration("scenario_default", Component::ModelBuilder, "bad horizon");
        let msg = err.to_string();
        assert!(msg.contains("scenario_default"));
        assert!(msg.contains("model_builder"));
        assert!(msg.contains("bad horizon"));
        assert_eq!(err.component(), Component::ModelBuilder);
        assert_eq!(err.scenario(), "scenario_default");
    }

    #[test]
    fn test_not_found_attributed_to_store() {
        let err = ModelError::not_found("s", "zones", "office");
        assert_eq!(err.component(), Component::ParameterStore);
        assert!(!err.is_infeasible());
    }

    #[test]
    fn test_in_scenario_only_fills_missing_name() {
        let err = ModelError::not_found("", "zones", "office").in_scenario("baseline");
        assert_eq!(err.scenario(), "baseline");

        let err = err.in_scenario("other");
        assert_eq!(err.scenario(), "baseline");
    }
}
