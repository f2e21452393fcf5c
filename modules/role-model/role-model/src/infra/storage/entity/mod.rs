//! `SeaORM` entity definitions.
//!
//! Policy kinds: `role_grant` (user/tenant/org role), `inner_source_project`
//! (cross-tenant read pool), `global_grant` (technical users), `team_grant`
//! (custom-privilege carrier team membership), `repo_privilege` (per-team
//! composite bundle over one repository).
//!
//! Grouping kinds: `role_action` (role-to-action inheritance),
//! `inner_source_action`, `team_bundle`.

pub mod custom_group;
pub mod global_grant;
pub mod inner_source_action;
pub mod inner_source_project;
pub mod organization;
pub mod repo_privilege;
pub mod role_action;
pub mod role_grant;
pub mod team;
pub mod team_bundle;
pub mod team_grant;
pub mod team_user;
pub mod tenant;
pub mod tenant_organization;
pub mod user;
