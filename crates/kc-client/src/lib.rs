//! HTTP adapter, configuration and multi-step workflows for the interview
//! console. The `kc` binary is a thin CLI over [`workflow::ConsoleService`].

pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod polling;
pub mod repository;
pub mod versions;
pub mod workflow;

#[cfg(test)]
mod testing;
