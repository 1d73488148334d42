//! Domain model for single-cell embedding workflows.
//!
//! Pure types and transition functions with no I/O: the intake wizard,
//! the workflow specification it builds, server-side workflow snapshots,
//! the compatible-model catalog and the result projection.

pub mod catalog;
pub mod error;
pub mod format;
pub mod result_set;
pub mod types;
pub mod wizard;
pub mod workflow;
pub mod workflow_spec;
