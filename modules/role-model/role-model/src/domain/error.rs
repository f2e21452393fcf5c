use role_model_sdk::RoleModelError;

/// Internal error type for domain services and repositories. Store failures
/// keep their `DbErr` detail here; the conversion to [`RoleModelError`]
/// collapses them to an opaque `Internal` before they leave the crate.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("tenant '{name}' not found")]
    TenantNotFound { name: String },

    #[error("organization '{name}' not found")]
    OrganizationNotFound { name: String },

    #[error("custom privilege group '{code}' not found")]
    CustomGroupNotFound { code: String },

    #[error("role '{code}' does not exist")]
    NonExistentRole { code: String },

    #[error(
        "user {user_id} already holds role '{role}' on organization {org_id} in tenant {tenant_id}"
    )]
    RoleAlreadyExists {
        user_id: i64,
        tenant_id: String,
        org_id: i64,
        role: String,
    },

    #[error("custom privilege group '{code}' is not empty")]
    GroupNotEmpty { code: String },

    #[error("custom privilege group '{code}' has assignees; privileges can only be extended")]
    PrivilegeSetShrinkForbidden { code: String },

    #[error("organization {org_id} would be left without an owner")]
    LastOwner { org_id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("operation cancelled")]
    Cancelled,
}

impl DomainError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn tenant_not_found(name: impl Into<String>) -> Self {
        Self::TenantNotFound { name: name.into() }
    }

    pub fn organization_not_found(name: impl Into<String>) -> Self {
        Self::OrganizationNotFound { name: name.into() }
    }

    pub fn non_existent_role(code: impl Into<String>) -> Self {
        Self::NonExistentRole { code: code.into() }
    }

    /// Conflicts the IAM ingestor treats as benign no-ops.
    #[must_use]
    pub fn is_benign_grant_conflict(&self) -> bool {
        matches!(self, Self::RoleAlreadyExists { .. } | Self::LastOwner { .. })
    }
}

impl From<DomainError> for RoleModelError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidInput { message } => Self::Validation { message },
            DomainError::TenantNotFound { name } => Self::TenantNotFound { name },
            DomainError::OrganizationNotFound { name } => Self::OrganizationNotFound { name },
            DomainError::CustomGroupNotFound { code } => Self::CustomGroupNotFound { code },
            DomainError::NonExistentRole { code } => Self::NonExistentRole { code },
            DomainError::RoleAlreadyExists {
                user_id,
                tenant_id,
                org_id,
                role,
            } => Self::RoleAlreadyExists {
                user_id,
                tenant_id,
                org_id,
                role,
            },
            DomainError::GroupNotEmpty { code } => Self::GroupNotEmpty { code },
            DomainError::PrivilegeSetShrinkForbidden { code } => {
                Self::PrivilegeSetShrinkForbidden { code }
            }
            DomainError::LastOwner { org_id } => Self::LastOwner { org_id },
            DomainError::Database(err) => {
                tracing::error!(error = %err, "policy store failure");
                Self::Internal
            }
            DomainError::Cancelled => Self::Cancelled,
        }
    }
}
