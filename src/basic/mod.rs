pub mod config;
pub mod ecs;
pub mod elements;
pub mod error;
pub mod fault;
pub(crate) mod jacobian;
pub mod network;
pub(crate) mod newtonpf;
pub mod solver;
pub mod system;

pub use jacobian::build_jacobian;
pub use newtonpf::{BusPartition, BusState, PowerFlowSolution, newton_pf};
