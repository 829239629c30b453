//! Core library for the ipcm IP-core management toolchain.
//!
//! This crate provides the configuration-driven entity model and the
//! simulation machinery. The pipeline is roughly:
//!
//!   *.ini configuration
//!     -> config     (layered INI with interpolation)
//!     -> entity     (library/namespace/IP-core graph, lazy metadata)
//!     -> fqn        (name resolution with wildcards)
//!     -> simulator  (tool flows, output filters, test suite report)
//!
//! Higher-level tools (CLI, CI wrappers, etc.) should depend on this
//! crate rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and logging
// ---------------------------------------------------------------------

pub mod error;
pub mod logging;

// ---------------------------------------------------------------------
// Configuration and entity model
// ---------------------------------------------------------------------

pub mod config;
pub mod entity;
pub mod fqn;

// ---------------------------------------------------------------------
// Simulation: processes, output filters, results, orchestration
// ---------------------------------------------------------------------

pub mod filter;
pub mod process;
pub mod project;
pub mod simulator;
pub mod testcase;

#[cfg(test)]
pub(crate) mod testutil;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use config::Config;
pub use entity::{EntityGraph, SimulationResult, TestbenchKinds, Visibility};
pub use error::{ConfigError, SimulatorError};
pub use fqn::{EntityKind, Fqn};
pub use logging::{Logger, Severity};
pub use process::Runner;
pub use simulator::{SimulationStep, SimulationSteps, Simulator, Toolchain};
pub use testcase::TestSuite;
