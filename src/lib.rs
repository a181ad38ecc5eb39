//! depwright - Dependency update orchestration library
//!
//! This library decides what a dependency-update job should do:
//! - Which dependencies a job allows, ignores or treats as security fixes
//! - How dependencies are classified into update groups
//! - Which change sets to compute and when a pull request already exists
//! - What to report: pull requests to create, update or close, and errors
//!
//! Parsing manifests and resolving versions is left to the ecosystem
//! collaborators behind the traits in [`ecosystem`].

pub mod attribution;
pub mod change;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ecosystem;
pub mod error;
pub mod group;
pub mod job;
pub mod logging;
pub mod output;
pub mod progress;
pub mod service;
pub mod snapshot;
pub mod updater;
