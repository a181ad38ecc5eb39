//! Dependency groups
//!
//! - [`DependencyGroup`]: immutable group definition and its match rules
//! - [`DependencyGroupEngine`]: assigns dependencies to groups per directory
//! - [`GroupDependencySelector`]: merges and filters a group's per-directory changes

mod dependency_group;
mod engine;
mod selector;
pub mod specificity;

pub use dependency_group::{AppliesTo, DependencyGroup, GroupRules};
pub(crate) use dependency_group::RawDependencyGroup;
pub use engine::{warn_group_is_empty, DependencyGroupEngine, GroupMember, GROUP_MEMBERSHIP_ENFORCEMENT};
pub use selector::GroupDependencySelector;
