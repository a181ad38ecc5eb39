//! Change computation
//!
//! - [`DependencyChangeBuilder`]: turns updated dependencies into a [`DependencyChange`]
//! - [`DependencyChange`]: output aggregate and pull request identity checks
//! - [`ChangeBatch`]: iterative working copy for group updates

mod batch;
mod builder;
mod dependency_change;

pub use batch::ChangeBatch;
pub use builder::{ChangeSource, DependencyChangeBuilder};
pub use dependency_change::{DependencyChange, Notice};
