// src/config/mod.rs

//! Workflow file loading and validation for wavedag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a workflow file from disk (`loader.rs`).
//! - Validate ids, agents and `[config]` bounds (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{
    AgentConfig, ConfigSection, RawWorkflowFile, TaskConfig, WorkflowFile, WorkflowSection,
};
pub use validate::validate_config;
