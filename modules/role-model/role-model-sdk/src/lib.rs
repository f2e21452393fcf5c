//! Public surface of the role-model module.
//!
//! The SDK carries the vocabulary (actions, roles, custom privileges), the
//! narrow request types consumed by the authorization facade, and the error
//! enum other modules are allowed to see. Everything stateful lives in the
//! `role-model` module crate.

pub mod errors;
pub mod models;

pub use errors::RoleModelError;
pub use models::{
    composite_name, merge_composites, parse_composite, Action, CustomPrivilege, EnrichedPrivilege,
    OrgAccessRequest, OrgInfo, RepoAccessRequest, Role, UserAccessRequest, UserInfo, Visibility,
};
