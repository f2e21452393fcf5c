//! Multi-tenant role-based authorization subsystem.
//!
//! Two evaluation layers share one relational policy store:
//!
//! - coarse role grants at the organization level (`Owner`, `Manager`,
//!   `Writer`, `Reader`, the global `TechnicalUser`, and configured custom
//!   groups), evaluated by the [`domain::enforcer::Enforcer`];
//! - fine custom-privilege bundles attached to a team over a single
//!   repository, managed by [`domain::custom::CustomPrivilegeService`].
//!
//! [`module::RoleModel`] wires everything together: it runs the startup
//! bootstrap (built-in role inheritance plus custom-group reconciliation) and
//! exposes the facade, the grant lifecycle, and the IAM ingestion pipeline.

pub mod config;
pub mod domain;
pub mod infra;
pub mod module;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{CustomGroupConfig, RoleModelConfig};
pub use module::RoleModel;
