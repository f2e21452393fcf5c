//! Public error types for the role-model module.
//!
//! These are safe to expose to other modules: store failures are collapsed to
//! an opaque `Internal` before they cross the crate boundary.

use thiserror::Error;

/// Errors returned by the role-model public API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleModelError {
    /// No tenant with the given name or key.
    #[error("tenant '{name}' not found")]
    TenantNotFound { name: String },

    /// No matching active organization.
    #[error("organization '{name}' not found")]
    OrganizationNotFound { name: String },

    /// Custom privilege group is not registered.
    #[error("custom privilege group '{code}' not found")]
    CustomGroupNotFound { code: String },

    /// Role code is not part of the vocabulary.
    #[error("role '{code}' does not exist")]
    NonExistentRole { code: String },

    /// The same `(user, org, role)` grant already exists.
    #[error("user {user_id} already holds role '{role}' on organization {org_id} in tenant {tenant_id}")]
    RoleAlreadyExists {
        user_id: i64,
        tenant_id: String,
        org_id: i64,
        role: String,
    },

    /// A custom group with active role grants cannot be removed.
    #[error("custom privilege group '{code}' is not empty")]
    GroupNotEmpty { code: String },

    /// A config update may not shrink the privileges of an assigned group.
    #[error("custom privilege group '{code}' has assignees; privileges can only be extended")]
    PrivilegeSetShrinkForbidden { code: String },

    /// Removing the membership would leave the organization without owners.
    #[error("organization {org_id} would be left without an owner")]
    LastOwner { org_id: i64 },

    /// Malformed input: empty subject, unparsable composite, bad privilege
    /// string, and so on.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Opaque internal failure (policy store, directory).
    #[error("internal error")]
    Internal,

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl RoleModelError {
    pub fn tenant_not_found(name: impl Into<String>) -> Self {
        Self::TenantNotFound { name: name.into() }
    }

    pub fn organization_not_found(name: impl Into<String>) -> Self {
        Self::OrganizationNotFound { name: name.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Grants skipped by the IAM ingestor: an identical grant already exists,
    /// or the replacement would demote the last owner.
    #[must_use]
    pub fn is_benign_grant_conflict(&self) -> bool {
        matches!(
            self,
            Self::RoleAlreadyExists { .. } | Self::LastOwner { .. }
        )
    }
}
