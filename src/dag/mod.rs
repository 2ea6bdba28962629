// src/dag/mod.rs

//! Dependency graph and wave resolution.
//!
//! - [`graph`] holds the petgraph-backed dependency graph of a task set.
//! - [`resolver`] validates a task set (missing references, cycles) and
//!   computes the greedy wave partition.

pub mod graph;
pub mod resolver;

pub use graph::DagGraph;
pub use resolver::{ValidationError, ValidationResult, WavePlan, compute_waves, validate};
