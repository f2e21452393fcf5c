//! Vocabulary and request types for the role model.
//!
//! String codes are stable: they are written into policy rows and compared on
//! every authorization check, so they must never change once deployed.

use serde::{Deserialize, Serialize};

use crate::errors::RoleModelError;

/// The finest operation a policy can permit at the organization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Own,
    Create,
    Edit,
    EditProject,
    Read,
    ReadPrivate,
    Write,
    Delete,
    MergeWithoutCheck,
    ManageComments,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Own,
        Action::Create,
        Action::Edit,
        Action::EditProject,
        Action::Read,
        Action::ReadPrivate,
        Action::Write,
        Action::Delete,
        Action::MergeWithoutCheck,
        Action::ManageComments,
    ];

    /// Canonical string code used in stored policy rows.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Action::Own => "own",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::EditProject => "editProject",
            Action::Read => "read",
            Action::ReadPrivate => "readPrivate",
            Action::Write => "write",
            Action::Delete => "delete",
            Action::MergeWithoutCheck => "mergeWithoutCheck",
            Action::ManageComments => "manageComments",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.code() == code)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A named bundle of actions.
///
/// The first four user-role slots (`Owner`..`Reader`) are reserved; custom
/// roles get ranks starting at 5, allocated by the vocabulary registry in
/// configuration order. `TechnicalUser` sits outside the user-role order and
/// inherits `Owner` everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    TechnicalUser,
    Owner,
    Manager,
    Writer,
    Reader,
    Custom(String),
}

impl Role {
    /// String code written into policy rows.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Role::TechnicalUser => "tuz",
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Writer => "writer",
            Role::Reader => "reader",
            Role::Custom(code) => code,
        }
    }

    /// Resolve a built-in role by code. Custom roles are only known to the
    /// vocabulary registry.
    #[must_use]
    pub fn from_builtin_code(code: &str) -> Option<Role> {
        match code {
            "tuz" => Some(Role::TechnicalUser),
            "owner" => Some(Role::Owner),
            "manager" => Some(Role::Manager),
            "writer" => Some(Role::Writer),
            "reader" => Some(Role::Reader),
            _ => None,
        }
    }

    /// Rank inside the user-role order; lower wins when IAM privileges are
    /// reduced to a single grant per project. Custom roles have no rank here.
    #[must_use]
    pub fn builtin_rank(&self) -> Option<u16> {
        match self {
            Role::TechnicalUser => Some(0),
            Role::Owner => Some(1),
            Role::Manager => Some(2),
            Role::Writer => Some(3),
            Role::Reader => Some(4),
            Role::Custom(_) => None,
        }
    }

    #[must_use]
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Role::Custom(_))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Repository-scoped capability granted to a team through a composite bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomPrivilege {
    ViewBranch,
    ChangeBranch,
    CreatePr,
    ApprovePr,
    MergePr,
}

impl CustomPrivilege {
    pub const ALL: [CustomPrivilege; 5] = [
        CustomPrivilege::ViewBranch,
        CustomPrivilege::ChangeBranch,
        CustomPrivilege::CreatePr,
        CustomPrivilege::ApprovePr,
        CustomPrivilege::MergePr,
    ];

    /// Full code, used in configuration and check requests.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            CustomPrivilege::ViewBranch => "viewBranch",
            CustomPrivilege::ChangeBranch => "changeBranch",
            CustomPrivilege::CreatePr => "createPR",
            CustomPrivilege::ApprovePr => "approvePR",
            CustomPrivilege::MergePr => "mergePR",
        }
    }

    /// Short code, used inside composite policy names.
    #[must_use]
    pub fn short_code(self) -> &'static str {
        match self {
            CustomPrivilege::ViewBranch => "vB",
            CustomPrivilege::ChangeBranch => "chB",
            CustomPrivilege::CreatePr => "cPR",
            CustomPrivilege::ApprovePr => "aPr",
            CustomPrivilege::MergePr => "mPr",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<CustomPrivilege> {
        CustomPrivilege::ALL.into_iter().find(|p| p.code() == code)
    }

    #[must_use]
    pub fn from_short_code(code: &str) -> Option<CustomPrivilege> {
        CustomPrivilege::ALL
            .into_iter()
            .find(|p| p.short_code() == code)
    }
}

impl std::fmt::Display for CustomPrivilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Canonical composite name for a set of custom privileges: short codes,
/// sorted by the privilege order, deduplicated, joined with `_`.
///
/// Returns an empty string for an empty set.
#[must_use]
pub fn composite_name(privileges: &[CustomPrivilege]) -> String {
    let mut sorted: Vec<CustomPrivilege> = privileges.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
        .iter()
        .map(|p| p.short_code())
        .collect::<Vec<_>>()
        .join("_")
}

/// Parse a composite name back into the privilege set it encodes.
///
/// # Errors
///
/// Returns [`RoleModelError::Validation`] when any segment is not a known
/// short code.
pub fn parse_composite(name: &str) -> Result<Vec<CustomPrivilege>, RoleModelError> {
    let mut privileges = Vec::new();
    for part in name.split('_').filter(|p| !p.is_empty()) {
        let privilege = CustomPrivilege::from_short_code(part).ok_or_else(|| {
            RoleModelError::validation(format!("unknown custom privilege short code '{part}'"))
        })?;
        privileges.push(privilege);
    }
    privileges.sort_unstable();
    privileges.dedup();
    Ok(privileges)
}

/// Union two composite names into a single canonical one.
///
/// # Errors
///
/// Returns [`RoleModelError::Validation`] when either side fails to parse.
pub fn merge_composites(old: &str, new: &str) -> Result<String, RoleModelError> {
    let mut merged = parse_composite(old)?;
    merged.extend(parse_composite(new)?);
    Ok(composite_name(&merged))
}

/// User/organization visibility, shared by the directory views and the pure
/// user-access predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Limited,
    Private,
}

/// Org-level access check: does `doer_id` hold `action` on the organization
/// inside the tenant?
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgAccessRequest {
    pub doer_id: i64,
    pub target_tenant_id: String,
    pub target_org_id: i64,
    pub action: Action,
}

/// Repo-level access check through team custom-privilege bundles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoAccessRequest {
    pub doer_id: i64,
    pub org_id: i64,
    pub repo_id: i64,
    pub target_tenant_id: String,
    pub custom_privilege: CustomPrivilege,
    /// Set when the caller already knows the carrier team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

/// Profile-visibility check; evaluated without touching the policy store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccessRequest {
    pub doer_id: i64,
    pub doer_tenant_ids: Vec<String>,
    pub target_user_id: i64,
    pub target_tenant_ids: Vec<String>,
    pub visibility: Visibility,
}

/// Directory view of a user, resolved during privilege enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub login: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub visibility: Visibility,
}

/// Directory view of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgInfo {
    pub id: i64,
    pub name: String,
    pub lower_name: String,
    pub is_active: bool,
    pub visibility: Visibility,
}

/// A stored role grant resolved against the directory, as shown to UI
/// consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedPrivilege {
    pub user: UserInfo,
    pub tenant_id: String,
    pub org: OrgInfo,
    pub role: Role,
}
