mod admittance;
mod impedance;

pub use admittance::*;
pub use impedance::*;

use bevy_ecs::prelude::*;
use log::info;

use super::{
    config::SystemConfig,
    elements::SequenceNetwork,
    error::{FaultError, PowerFlowError, SingularNetwork},
    fault::{FaultRequest, FaultResult, analyze_fault},
    network::Network,
    newtonpf::{PowerFlowSolution, newton_pf},
    solver::DefaultSolver,
};

/// Positive-, negative- and zero-sequence impedance matrices.
///
/// Each inversion is attempted on its own; a singular network in one sequence does not
/// prevent the others from being available.
#[derive(Debug, Clone)]
pub struct SequenceImpedances {
    /// Number of buses of the network the matrices were built from.
    pub n_bus: usize,
    pub positive: Result<ZBus, SingularNetwork>,
    pub negative: Result<ZBus, SingularNetwork>,
    pub zero: Result<ZBus, SingularNetwork>,
}

impl SequenceImpedances {
    pub fn get(&self, sequence: SequenceNetwork) -> Result<&ZBus, SingularNetwork> {
        match sequence {
            SequenceNetwork::Positive => self.positive.as_ref(),
            SequenceNetwork::Negative => self.negative.as_ref(),
            SequenceNetwork::Zero => self.zero.as_ref(),
            SequenceNetwork::Composite => return Err(SingularNetwork { sequence }),
        }
        .map_err(|e| *e)
    }
}

/// Every admittance matrix of a network together with the sequence impedance matrices.
#[derive(Debug, Clone, Resource)]
pub struct SystemMatrices {
    pub composite: YBus,
    pub positive: YBus,
    pub negative: YBus,
    pub zero: YBus,
    pub impedances: SequenceImpedances,
    /// Bus names in canonical order.
    pub bus_names: Vec<String>,
}

impl SystemMatrices {
    pub fn build(network: &Network, config: &SystemConfig) -> Self {
        let composite = assemble_ybus(network, config, SequenceNetwork::Composite);
        let positive = assemble_ybus(network, config, SequenceNetwork::Positive);
        let negative = assemble_ybus(network, config, SequenceNetwork::Negative);
        let zero = assemble_ybus(network, config, SequenceNetwork::Zero);
        let impedances = SequenceImpedances {
            n_bus: network.n_bus(),
            positive: invert_ybus(&positive),
            negative: invert_ybus(&negative),
            zero: invert_ybus(&zero),
        };
        info!(
            "system matrices built for {} buses (Zbus available: +{} -{} 0{})",
            network.n_bus(),
            impedances.positive.is_ok(),
            impedances.negative.is_ok(),
            impedances.zero.is_ok()
        );
        Self {
            composite,
            positive,
            negative,
            zero,
            impedances,
            bus_names: network.lookup().forward.clone(),
        }
    }

    pub fn ybus(&self, kind: SequenceNetwork) -> &YBus {
        match kind {
            SequenceNetwork::Composite => &self.composite,
            SequenceNetwork::Positive => &self.positive,
            SequenceNetwork::Negative => &self.negative,
            SequenceNetwork::Zero => &self.zero,
        }
    }

    pub fn zbus(&self, kind: SequenceNetwork) -> Result<&ZBus, SingularNetwork> {
        self.impedances.get(kind)
    }

    /// Runs a fault study, resolving the bus name of `request` against this network.
    pub fn run_fault(&self, request: &FaultRequest) -> Result<FaultResult, FaultError> {
        let bus = self
            .bus_names
            .iter()
            .position(|b| *b == request.bus)
            .ok_or_else(|| FaultError::InvalidFaultSelection(format!("unknown bus `{}`", request.bus)))?;
        analyze_fault(bus, request, &self.impedances)
    }
}

/// Builds the composite network of `network` and solves its power flow with the default
/// linear solver.
pub fn solve_power_flow(
    network: &Network,
    config: &SystemConfig,
) -> Result<PowerFlowSolution, PowerFlowError> {
    let partition = network.partition()?;
    let ybus = assemble_ybus(network, config, SequenceNetwork::Composite);
    let s_spec = network.specified_injections(config);
    newton_pf(
        &ybus,
        &s_spec,
        network.initial_state(config),
        &partition,
        Some(config.tolerance),
        Some(config.max_iterations),
        &mut DefaultSolver::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::elements::*;
    use crate::testcases;

    #[test]
    fn seven_bus_sequences_are_invertible() {
        let (net, cfg) = testcases::seven_bus();
        let m = SystemMatrices::build(&net, &cfg);
        for seq in SequenceNetwork::SEQUENCES {
            let z = m.zbus(seq).unwrap();
            assert_eq!(z.n_bus(), 7);
            assert_eq!(m.ybus(seq).kind, seq);
        }
        assert!(m.zbus(SequenceNetwork::Composite).is_err());
    }

    #[test]
    fn ungrounded_zero_sequence_fails_alone() {
        let mut net = Network::new();
        net.add_bus("A", 20.0).unwrap();
        net.add_bus("B", 20.0).unwrap();
        net.add_line("AB", "A", "B", LineParams::new(0.01, 0.1, 0.0)).unwrap();
        net.add_generator(
            "G",
            "A",
            GeneratorParams {
                grounding: Grounding::Ungrounded,
                ..Default::default()
            },
        )
        .unwrap();
        let m = SystemMatrices::build(&net, &SystemConfig::default());
        assert!(m.impedances.positive.is_ok());
        assert!(m.impedances.negative.is_ok());
        assert_eq!(
            m.impedances.zero.as_ref().unwrap_err().sequence,
            SequenceNetwork::Zero
        );
    }

    #[test]
    fn missing_slack_is_a_configuration_error() {
        let mut net = Network::new();
        net.add_bus("A", 20.0).unwrap();
        assert!(matches!(
            solve_power_flow(&net, &SystemConfig::default()),
            Err(PowerFlowError::Configuration(_))
        ));
    }
}
