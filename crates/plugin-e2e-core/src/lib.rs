//! plugin-e2e core library
//!
//! Execution and verification core for declarative end-to-end tests of agent-runtime
//! plugins: case registry, sandbox provisioning, session driving, transcript projection,
//! assertion evaluation and report aggregation.

pub mod case;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod report;
pub mod runner;
pub mod sandbox;
pub mod session;
pub mod transcript;
