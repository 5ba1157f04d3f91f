use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use log::warn;

use crate::basic::{
    config::SystemConfig,
    error::FaultError,
    fault::{FaultRequest, FaultResult},
    network::Network,
    system::SystemMatrices,
};

use super::{plugin::BasePFPlugin, systems::*};

#[derive(Clone, SystemSet, Debug, Hash, PartialEq, Eq)]
pub enum SolverStage {
    BeforeSolve,
    Solve,
    AfterSolve,
}

/// Represents the power grid, managing the ECS world for power flow and fault calculations.
pub struct PowerGrid {
    data_storage: App,
}

impl Default for PowerGrid {
    fn default() -> Self {
        let mut app = App::new();
        app.add_plugins(BasePFPlugin);
        Self { data_storage: app }
    }
}

/// Trait for defining power flow operations, such as initializing and running the power flow calculation.
pub trait PowerFlow {
    /// Builds the admittance and impedance matrices and stores them as ECS resources.
    fn init_pf_net(&mut self);

    /// Runs the power flow calculation using the Newton-Raphson method.
    fn run_pf(&mut self);
}

/// Fault studies on top of the matrices held by the ECS world.
pub trait FaultStudy {
    fn run_fault(&mut self, request: &FaultRequest) -> Result<FaultResult, FaultError>;
}

impl PowerGrid {
    pub fn new(network: Network, config: SystemConfig) -> Self {
        let mut grid = Self::default();
        grid.world_mut().insert_resource(config);
        grid.world_mut().insert_resource(network);
        grid
    }

    pub fn app(&self) -> &App {
        &self.data_storage
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.data_storage
    }

    pub fn world(&self) -> &World {
        self.app().world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app_mut().world_mut()
    }

    pub fn network(&self) -> Option<&Network> {
        self.world().get_resource::<Network>()
    }

    /// Mutable access to the network; matrices are rebuilt on the next run or fault study.
    pub fn network_mut(&mut self) -> Option<Mut<'_, Network>> {
        let world = self.world_mut();
        // a change made outside a schedule must not share a tick with the last build
        world.increment_change_tick();
        world.get_resource_mut::<Network>()
    }

    pub fn matrices(&self) -> Option<&SystemMatrices> {
        self.world().get_resource::<SystemMatrices>()
    }

    pub fn result(&self) -> Option<&PowerFlowResult> {
        self.world().get_resource::<PowerFlowResult>()
    }

    /// Rebuilds [`SystemMatrices`] if the network or configuration changed since the last build.
    fn refresh_matrices(&mut self) {
        let world = self.world_mut();
        let this_run = world.change_tick();
        let outdated = needs_rebuild(
            world.get_resource_ref::<Network>().map(|n| n.last_changed()),
            world.get_resource_ref::<SystemConfig>().map(|c| c.last_changed()),
            world.get_resource_ref::<SystemMatrices>().map(|m| m.last_changed()),
            this_run,
        );
        if !outdated {
            return;
        }
        let Some(network) = world.get_resource::<Network>() else {
            return;
        };
        let config = world.get_resource::<SystemConfig>().cloned().unwrap_or_default();
        let matrices = SystemMatrices::build(network, &config);
        world.insert_resource(matrices);
    }
}

impl PowerFlow for PowerGrid {
    fn init_pf_net(&mut self) {
        if let Err(err) = self.world_mut().try_run_schedule(Startup) {
            warn!("startup schedule could not run: {err}");
        }
    }

    fn run_pf(&mut self) {
        self.app_mut().update();
    }
}

impl FaultStudy for PowerGrid {
    fn run_fault(&mut self, request: &FaultRequest) -> Result<FaultResult, FaultError> {
        self.refresh_matrices();
        self.matrices()
            .ok_or_else(|| FaultError::InvalidFaultSelection("no network has been loaded".into()))?
            .run_fault(request)
    }
}
