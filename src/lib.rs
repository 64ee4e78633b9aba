pub mod backup;
pub mod config;
pub mod firewall;
pub mod plugins;
pub mod scheduler;
pub mod setup;
pub mod store;
pub mod supervisor;
