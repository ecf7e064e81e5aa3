//! Follow-up Service Library Crate
//!
//! This library wires the I/O-free orchestrator from `followup-core` to the
//! outside world: the question backend over HTTP, the realtime session's
//! outbound event channel, configuration from the environment, and logging.
//! Host applications spawn an [`runtime::OrchestratorRuntime`] and feed it
//! through the returned [`runtime::OrchestratorHandle`].

pub mod backend;
pub mod config;
pub mod runtime;
pub mod sink;
pub mod telemetry;
