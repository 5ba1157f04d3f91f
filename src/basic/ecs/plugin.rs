use bevy_app::prelude::*;
use bevy_ecs::prelude::*;

use crate::basic::{config::SystemConfig, system::SystemMatrices};

use super::{network::SolverStage, systems::*};

/// Represents the matrix initialization stage for Bevy's ECS system.
#[derive(Debug, SystemSet, Hash, Eq, PartialEq, Clone)]
pub struct PFInitStage;

/// Base plugin for power flow and fault calculations.
///
/// Builds the network matrices at startup, rebuilds them whenever the [`Network`] or the
/// [`SystemConfig`] resource changes, solves the power flow on every update and then runs any
/// queued fault studies.
///
/// [`Network`]: crate::basic::network::Network
pub struct BasePFPlugin;

impl Plugin for BasePFPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SystemConfig>()
            .init_resource::<PowerFlowSolver>()
            .init_resource::<FaultStudies>();

        app.configure_sets(
            Update,
            (
                SolverStage::BeforeSolve,
                SolverStage::Solve,
                SolverStage::AfterSolve,
            )
                .chain(),
        );
        app.add_systems(
            Startup,
            init_matrices.run_if(matrices_outdated).in_set(PFInitStage),
        );
        app.add_systems(
            Update,
            (
                init_matrices
                    .run_if(matrices_outdated)
                    .in_set(SolverStage::BeforeSolve),
                ecs_run_pf
                    .run_if(resource_exists::<SystemMatrices>)
                    .in_set(SolverStage::Solve),
                ecs_run_faults
                    .run_if(resource_exists::<SystemMatrices>)
                    .in_set(SolverStage::AfterSolve),
            ),
        );
    }
}

/// Creates a default Bevy application with the base power flow plugin.
///
/// Insert a [`Network`](crate::basic::network::Network) resource (and optionally a
/// [`SystemConfig`]) before the first update.
pub fn default_app() -> App {
    let mut app = App::new();
    app.add_plugins(BasePFPlugin);
    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testcases;

    #[test]
    fn default_app_runs_power_flow() {
        let (net, cfg) = testcases::two_bus();
        let mut app = default_app();
        app.world_mut().insert_resource(cfg);
        app.world_mut().insert_resource(net);
        app.update();
        let res = app.world().resource::<PowerFlowResult>();
        assert!(res.converged);
        assert!(res.iterations < 10);
    }

    #[test]
    fn nothing_runs_without_a_network() {
        let mut app = default_app();
        app.update();
        assert!(app.world().get_resource::<PowerFlowResult>().is_none());
    }
}
