pub mod network;
pub mod plugin;
pub mod systems;
