pub mod config;
pub mod error;
pub mod executor;
pub mod observability;
pub mod orchestrator;
pub mod recipe;
pub mod sandbox;
pub mod script;

pub use error::{exit_code, BuildError};
pub use orchestrator::{BuildRequest, Orchestrator, RunOutcome};
