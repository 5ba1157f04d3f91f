use bevy_ecs::{component::Tick, prelude::*, system::SystemChangeTick};
use log::{info, warn};
use nalgebra::DVector;
use num_complex::Complex64;

use crate::basic::{
    config::SystemConfig,
    error::{FaultError, PowerFlowError},
    fault::{FaultRequest, FaultResult},
    network::Network,
    newtonpf::{PowerFlowSolution, newton_pf},
    solver::DefaultSolver,
    system::SystemMatrices,
};

/// Linear solver kept between power-flow runs.
#[derive(Default, Resource)]
pub struct PowerFlowSolver {
    pub solver: DefaultSolver,
}

/// Resource for storing the results of the last power flow calculation.
#[derive(Debug, Clone, Resource)]
pub struct PowerFlowResult {
    /// Bus voltage phasors, the last state reached when the solve failed.
    pub v: DVector<Complex64>,
    pub iterations: usize,
    pub converged: bool,
    pub max_mismatch: f64,
    /// Calculated injections at the solution; empty when the solve failed.
    pub s_calc: DVector<Complex64>,
    pub error: Option<PowerFlowError>,
}

impl From<Result<PowerFlowSolution, PowerFlowError>> for PowerFlowResult {
    fn from(outcome: Result<PowerFlowSolution, PowerFlowError>) -> Self {
        let err = match outcome {
            Ok(sol) => {
                return PowerFlowResult {
                    v: sol.voltages(),
                    iterations: sol.iterations,
                    converged: true,
                    max_mismatch: sol.max_mismatch,
                    s_calc: sol.s_calc,
                    error: None,
                };
            }
            Err(err) => err,
        };
        let (v, iterations, max_mismatch) = match &err {
            PowerFlowError::SingularJacobian { iteration, state }
            | PowerFlowError::NonFiniteMismatch { iteration, state } => {
                (state.voltages(), *iteration, f64::NAN)
            }
            PowerFlowError::MaxIterationsExceeded {
                iterations,
                max_mismatch,
                state,
            } => (state.voltages(), *iterations, *max_mismatch),
            PowerFlowError::Configuration(_) => (DVector::zeros(0), 0, f64::NAN),
        };
        PowerFlowResult {
            v,
            iterations,
            converged: false,
            max_mismatch,
            s_calc: DVector::zeros(0),
            error: Some(err),
        }
    }
}

/// Fault requests waiting to be evaluated and the outcomes of those already run.
#[derive(Debug, Default, Resource)]
pub struct FaultStudies {
    pub pending: Vec<FaultRequest>,
    pub results: Vec<(FaultRequest, Result<FaultResult, FaultError>)>,
}

/// Decides a rebuild from the change ticks of the network, the configuration and the matrices.
pub(crate) fn needs_rebuild(
    network: Option<Tick>,
    config: Option<Tick>,
    built: Option<Tick>,
    this_run: Tick,
) -> bool {
    match (network, built) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(network), Some(built)) => {
            network.is_newer_than(built, this_run)
                || config.is_some_and(|c| c.is_newer_than(built, this_run))
        }
    }
}

/// True when the network or configuration changed after the matrices were last built.
pub fn matrices_outdated(
    network: Option<Res<Network>>,
    config: Res<SystemConfig>,
    matrices: Option<Res<SystemMatrices>>,
    ticks: SystemChangeTick,
) -> bool {
    needs_rebuild(
        network.map(|n| n.last_changed()),
        Some(config.last_changed()),
        matrices.map(|m| m.last_changed()),
        ticks.this_run(),
    )
}

/// Assembles every Ybus and inverts the sequence matrices of the current network.
pub fn init_matrices(mut cmd: Commands, network: Res<Network>, config: Res<SystemConfig>) {
    cmd.insert_resource(SystemMatrices::build(&network, &config));
}

/// ECS system that runs the power flow calculation based on the current configuration and matrices.
pub fn ecs_run_pf(
    mut cmd: Commands,
    network: Res<Network>,
    matrices: Res<SystemMatrices>,
    cfg: Res<SystemConfig>,
    mut solver: ResMut<PowerFlowSolver>,
) {
    let outcome = network.partition().map_err(PowerFlowError::from).and_then(|partition| {
        newton_pf(
            &matrices.composite,
            &network.specified_injections(&cfg),
            network.initial_state(&cfg),
            &partition,
            Some(cfg.tolerance),
            Some(cfg.max_iterations),
            &mut solver.solver,
        )
    });
    if let Err(err) = &outcome {
        warn!("power flow failed: {err}");
    }
    cmd.insert_resource(PowerFlowResult::from(outcome));
}

/// Evaluates every pending fault request against the current sequence impedances.
pub fn ecs_run_faults(mut studies: ResMut<FaultStudies>, matrices: Res<SystemMatrices>) {
    if studies.pending.is_empty() {
        return;
    }
    let pending = std::mem::take(&mut studies.pending);
    info!("running {} fault studies", pending.len());
    for request in pending {
        let outcome = matrices.run_fault(&request);
        studies.results.push((request, outcome));
    }
}
