mod basic;
pub mod testcases;
pub mod prelude {
    use crate::basic;
    pub use basic::*;

    pub use basic::{
        config::SystemConfig,
        ecs::{
            network::{FaultStudy, PowerFlow, PowerGrid},
            plugin::default_app,
            systems::{FaultStudies, PowerFlowResult},
        },
        elements::*,
        error::*,
        fault::{FaultRequest, FaultResult, FaultType},
        network::Network,
        system::{SystemMatrices, assemble_ybus, invert_ybus, solve_power_flow},
    };
}
