//! Configuration module for the voting core.
//! Reads settings from the environment and wires up the storage dependencies.
mod dependencies;
mod settings;
mod telemetry;

pub use dependencies::Dependencies;
pub use settings::VotingConfig;
pub use telemetry::init_tracing;
