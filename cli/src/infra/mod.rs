//! Infrastructure adapters: Docker CLI, flat-file store, config, sockets.

pub mod config;
pub mod docker;
pub mod network;
pub mod store;
