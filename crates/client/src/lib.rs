//! HTTP client engine for the single-cell workflow service.
//!
//! Agents for uploading input files and fetching the model catalog, a
//! submission controller that never creates the same job twice, and a
//! cancellable status poller that follows a job until it finishes.
//! All of them share an explicitly injected [`config::ClientConfig`].

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod poller;
pub mod service;
pub mod submission;
pub mod transfer;
pub mod wire;
