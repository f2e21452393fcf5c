//! Batch grant/revoke application.
//!
//! Callers submit per-user lists of privilege groups to grant and revoke,
//! keyed by `(tenant key, project key, group code)`. Each user's changes run
//! in one transaction; individual entries that fail to resolve or apply are
//! accumulated per user instead of aborting the batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use role_model_sdk::Role;
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::domain::audit::{AuditActor, AuditEvent, AuditEventKind, AuditSink};
use crate::domain::error::DomainError;
use crate::domain::grants::GrantService;
use crate::domain::vocabulary::RoleRegistry;
use crate::infra::storage::DirectoryRepository;

/// One privilege group to grant or revoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeAssignment {
    pub tenant_key: String,
    pub project_key: String,
    pub group_code: String,
}

/// All changes requested for one user. Duplicate entries for the same user
/// are merged before application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPrivilegeChange {
    pub user_id: i64,
    #[serde(default)]
    pub grant: Vec<PrivilegeAssignment>,
    #[serde(default)]
    pub revoke: Vec<PrivilegeAssignment>,
}

/// Per-user application result.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    pub user_id: i64,
    pub applied: usize,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct ApplyService {
    grants: GrantService,
    directory: DirectoryRepository,
    registry: Arc<RoleRegistry>,
    audit: Arc<dyn AuditSink>,
}

impl ApplyService {
    #[must_use]
    pub fn new(
        grants: GrantService,
        registry: Arc<RoleRegistry>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            grants,
            directory: DirectoryRepository::new(),
            registry,
            audit,
        }
    }

    pub async fn apply<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        changes: &[UserPrivilegeChange],
    ) -> Result<Vec<ApplyOutcome>, DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut merged: BTreeMap<i64, (Vec<&PrivilegeAssignment>, Vec<&PrivilegeAssignment>)> =
            BTreeMap::new();
        for change in changes {
            if change.user_id <= 0 {
                return Err(DomainError::invalid_input("user id must be positive"));
            }
            let entry = merged.entry(change.user_id).or_default();
            entry.0.extend(change.grant.iter());
            entry.1.extend(change.revoke.iter());
        }

        let mut outcomes = Vec::with_capacity(merged.len());
        for (user_id, (grants, revokes)) in merged {
            let outcome = self.apply_for_user(db, actor, user_id, &grants, &revokes).await?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn apply_for_user<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        user_id: i64,
        grants: &[&PrivilegeAssignment],
        revokes: &[&PrivilegeAssignment],
    ) -> Result<ApplyOutcome, DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        let mut applied = 0usize;
        let mut errors = Vec::new();

        for assignment in revokes {
            match self.resolve_target(&txn, assignment).await {
                Ok((tenant_id, org_id, role)) => {
                    match self
                        .grants
                        .revoke_role_tx(&txn, user_id, &tenant_id, org_id, &role)
                        .await
                    {
                        Ok(()) => applied += 1,
                        Err(e) => errors.push(format!(
                            "revoke {}/{}/{}: {e}",
                            assignment.tenant_key, assignment.project_key, assignment.group_code
                        )),
                    }
                }
                Err(e) => errors.push(format!(
                    "revoke {}/{}/{}: {e}",
                    assignment.tenant_key, assignment.project_key, assignment.group_code
                )),
            }
        }

        for assignment in grants {
            match self.resolve_target(&txn, assignment).await {
                Ok((tenant_id, org_id, role)) => {
                    match self
                        .grants
                        .grant_role_tx(&txn, user_id, &tenant_id, org_id, &role)
                        .await
                    {
                        Ok(()) => applied += 1,
                        Err(e) => errors.push(format!(
                            "grant {}/{}/{}: {e}",
                            assignment.tenant_key, assignment.project_key, assignment.group_code
                        )),
                    }
                }
                Err(e) => errors.push(format!(
                    "grant {}/{}/{}: {e}",
                    assignment.tenant_key, assignment.project_key, assignment.group_code
                )),
            }
        }

        txn.commit().await?;

        let kind = if grants.is_empty() {
            AuditEventKind::RoleRevoked
        } else {
            AuditEventKind::RoleGranted
        };
        let event = if errors.is_empty() {
            AuditEvent::success(kind, actor)
        } else {
            AuditEvent::failure(kind, actor)
        };
        self.audit.emit(
            &event
                .with_param("user_id", user_id)
                .with_param("applied", applied)
                .with_param("errors", errors.len())
                .with_param("source", "batch"),
        );

        Ok(ApplyOutcome {
            user_id,
            applied,
            errors,
        })
    }

    /// Resolve `(tenant key, project key, group code)` to the stored
    /// identifiers a grant needs.
    async fn resolve_target<C: ConnectionTrait>(
        &self,
        conn: &C,
        assignment: &PrivilegeAssignment,
    ) -> Result<(String, i64, Role), DomainError> {
        let tenant = self
            .directory
            .tenant_by_org_key(conn, &assignment.tenant_key)
            .await?
            .ok_or_else(|| DomainError::tenant_not_found(&assignment.tenant_key))?;

        let project = assignment.project_key.to_lowercase();
        let candidates = self
            .directory
            .active_orgs_by_lower_names(conn, std::slice::from_ref(&project))
            .await?;
        let mut org_id = None;
        for candidate in candidates {
            let linked = self
                .directory
                .tenant_id_for_org(conn, candidate.id)
                .await?;
            if linked.as_deref() == Some(tenant.id.as_str()) {
                org_id = Some(candidate.id);
                break;
            }
        }
        let org_id = org_id
            .ok_or_else(|| DomainError::organization_not_found(&assignment.project_key))?;

        let role = self.registry.resolve(&assignment.group_code)?;
        Ok((tenant.id, org_id, role))
    }
}
