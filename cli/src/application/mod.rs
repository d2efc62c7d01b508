//! Application layer: port traits and the services that drive them.

pub mod ports;
pub mod services;
