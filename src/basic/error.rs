use thiserror::Error;

use super::{elements::SequenceNetwork, fault::FaultType, newtonpf::BusState};

/// Problems detected while the network is being configured.
///
/// These are raised by the [`Network`](super::network::Network) builder at the point the bad
/// input is supplied, so a network that was built successfully is structurally usable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("bus `{0}` is already defined")]
    DuplicateBus(String),
    #[error("element `{0}` is already defined")]
    DuplicateElement(String),
    #[error("element `{element}` references unknown bus `{bus}`")]
    UnknownBus { element: String, bus: String },
    #[error("bus `{0}` has no voltage-controlling generator")]
    NoGenerator(String),
    #[error("network has no slack bus")]
    MissingSlack,
    #[error("buses {0} and {1} are both slack buses")]
    MultipleSlack(usize, usize),
    #[error("network has no buses")]
    EmptyNetwork,
    #[error("element `{element}`: {reason}")]
    InvalidParameter { element: String, reason: String },
}

/// A sequence admittance matrix that could not be inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{sequence} admittance matrix is singular")]
pub struct SingularNetwork {
    pub sequence: SequenceNetwork,
}

/// Terminal failure states of the Newton-Raphson solver.
///
/// The numeric failures keep the last state reached so callers can inspect it.
#[derive(Debug, Clone, Error)]
pub enum PowerFlowError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("singular Jacobian at iteration {iteration}")]
    SingularJacobian { iteration: usize, state: BusState },
    #[error("power mismatch is not finite at iteration {iteration}")]
    NonFiniteMismatch { iteration: usize, state: BusState },
    #[error("no convergence after {iterations} iterations (max mismatch {max_mismatch:.3e} p.u.)")]
    MaxIterationsExceeded {
        iterations: usize,
        max_mismatch: f64,
        state: BusState,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FaultError {
    #[error("invalid fault selection: {0}")]
    InvalidFaultSelection(String),
    #[error("{sequence} network is not invertible")]
    NetworkNotInvertible { sequence: SequenceNetwork },
    #[error("{fault_type} fault at bus {bus} has zero total impedance")]
    ZeroFaultImpedance { bus: usize, fault_type: FaultType },
}

impl From<SingularNetwork> for FaultError {
    fn from(err: SingularNetwork) -> Self {
        FaultError::NetworkNotInvertible {
            sequence: err.sequence,
        }
    }
}

/// Errors from loading a [`SystemConfig`](super::config::SystemConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
