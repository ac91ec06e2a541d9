use crate::timeseries::Time;
use crate::units::Unit;
use thiserror::Error;

/// Error type for invalid operations.
///
/// Every variant is fatal to the run that raised it. The message identifies
/// the component, capability and date involved where those are known.
#[derive(Error, Debug)]
pub enum NboxError {
    #[error("{component}: contract violated: {message}")]
    ContractViolation { component: String, message: String },
    #[error("No component provides capability '{0}'")]
    UnknownCapability(String),
    #[error("{component}: caller is requesting unknown variable '{name}'")]
    UnknownVariable { component: String, name: String },
    #[error("{component}: mass not conserved at {date}: masstot={masstot} sum={sum} diff={diff}")]
    MassNotConserved {
        component: String,
        date: Time,
        masstot: f64,
        sum: f64,
        diff: f64,
    },
    #[error("{component}: date constraint violated: {message}")]
    DateConstraint { component: String, message: String },
    #[error("Unit mismatch. Expected {expected}, got {got}")]
    UnitMismatch { expected: Unit, got: Unit },
    #[error("Extrapolation is not allowed. Target={target}, {series} data range=[{first}, {last}]")]
    ExtrapolationNotAllowed {
        target: Time,
        series: String,
        first: Time,
        last: Time,
    },
    #[error("Capability '{capability}' is already provided by '{existing}'")]
    CapabilityConflict { capability: String, existing: String },
    #[error("Component dependencies form a cycle through '{0}'")]
    DependencyCycle(String),
    #[error("{component}: solver failed: {message}")]
    SolverFailure { component: String, message: String },
    #[error("Spinup did not converge within {steps} steps")]
    SpinupNotConverged { steps: usize },
    #[error("Component '{0}' is busy and cannot answer a message about itself")]
    ReentrantMessage(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl NboxError {
    pub fn contract(component: &str, message: impl Into<String>) -> Self {
        NboxError::ContractViolation {
            component: component.to_string(),
            message: message.into(),
        }
    }

    pub fn date(component: &str, message: impl Into<String>) -> Self {
        NboxError::DateConstraint {
            component: component.to_string(),
            message: message.into(),
        }
    }

    pub fn unknown_variable(component: &str, name: impl ToString) -> Self {
        NboxError::UnknownVariable {
            component: component.to_string(),
            name: name.to_string(),
        }
    }
}

impl From<toml::de::Error> for NboxError {
    fn from(err: toml::de::Error) -> Self {
        NboxError::Config(err.to_string())
    }
}

/// Convenience type for `Result<T, NboxError>`.
pub type NboxResult<T> = Result<T, NboxError>;

/// Fail with a contract violation unless `$cond` holds.
#[macro_export]
macro_rules! ensure_contract {
    ($component:expr, $cond:expr, $($arg:tt)+) => {
        if !($cond) {
            return Err($crate::errors::NboxError::contract($component, format!($($arg)+)));
        }
    };
}
