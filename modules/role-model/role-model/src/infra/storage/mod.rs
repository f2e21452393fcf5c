//! Relational policy store.
//!
//! One table per policy kind and per grouping kind, plus the directory
//! tables the enforcer and grant lifecycle join against. Repositories are
//! stateless and generic over [`sea_orm::ConnectionTrait`], so the same
//! method runs against a pooled connection or inside a caller transaction.

pub mod entity;
pub mod migrations;

mod custom_repo;
mod directory_repo;
mod policy_repo;

pub use custom_repo::CustomPolicyRepository;
pub use directory_repo::{DirectoryRepository, OWNERS_TEAM};
pub use policy_repo::PolicyRepository;
