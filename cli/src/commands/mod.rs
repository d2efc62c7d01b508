//! Command handlers. Each module owns one subcommand: argument structs plus
//! a `run` function taking `&AppContext`.

pub mod build;
pub mod forward;
pub mod harden;
pub mod passwd;
pub mod remove;
pub mod start;
pub mod status;
pub mod stop;
