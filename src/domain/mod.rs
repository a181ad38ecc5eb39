//! Core domain models for depwright
//!
//! This module contains the value types shared by every stage of a run:
//! - Package manager identifiers and name normalisation
//! - Dependencies, their manifest requirements and dependency files
//! - Lenient versions, version requirements and semver update types
//! - Pull request identity used for idempotency checks

mod dependency;
mod dependency_file;
mod package_manager;
mod pull_request;
mod requirement;
mod update_type;
mod version;

pub use dependency::{Dependency, Requirement};
pub use dependency_file::{normalize_directory, DependencyFile};
pub use package_manager::PackageManager;
pub use pull_request::{ExistingGroupPullRequest, PullRequest, PullRequestDependency};
pub use requirement::VersionRequirement;
pub use update_type::{SemverParts, UpdateType};
pub use version::{Segment, Version};
