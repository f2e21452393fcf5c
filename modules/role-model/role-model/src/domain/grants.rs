//! Grant/revoke lifecycle.
//!
//! Every grant keeps three things consistent inside one transaction: the
//! conflicting prior grant is replaced, the grantee is a member of the
//! organization's `Owners` team, and exactly one policy row exists for the
//! `(user, tenant, org)` triple. The `*_tx` variants run against a caller
//! transaction so multiple changes commit once; the plain variants open
//! their own transaction and emit audit afterwards.

use std::sync::Arc;

use role_model_sdk::Role;
use sea_orm::{ConnectionTrait, TransactionTrait};
use tokio_util::sync::CancellationToken;

use crate::domain::audit::{AuditActor, AuditEvent, AuditEventKind, AuditSink};
use crate::domain::error::DomainError;
use crate::domain::vocabulary::{RoleRegistry, INNER_SOURCE};
use crate::infra::storage::{
    CustomPolicyRepository, DirectoryRepository, PolicyRepository, OWNERS_TEAM,
};

#[derive(Clone)]
pub struct GrantService {
    policy: PolicyRepository,
    custom: CustomPolicyRepository,
    directory: DirectoryRepository,
    registry: Arc<RoleRegistry>,
    audit: Arc<dyn AuditSink>,
    multi_tenant_enabled: bool,
}

impl GrantService {
    #[must_use]
    pub fn new(
        registry: Arc<RoleRegistry>,
        audit: Arc<dyn AuditSink>,
        multi_tenant_enabled: bool,
    ) -> Self {
        Self {
            policy: PolicyRepository::new(),
            custom: CustomPolicyRepository::new(),
            directory: DirectoryRepository::new(),
            registry,
            audit,
            multi_tenant_enabled,
        }
    }

    /// Grant a role on an organization. Replaces a conflicting grant for the
    /// same `(user, org)` pair; fails with `RoleAlreadyExists` when the same
    /// triple already carries the role.
    pub async fn grant_role<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        user_id: i64,
        tenant_id: &str,
        org_id: i64,
        role: &Role,
    ) -> Result<(), DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        let result = self
            .grant_role_tx(&txn, user_id, tenant_id, org_id, role)
            .await;
        match result {
            Ok(()) => {
                txn.commit().await?;
                self.audit.emit(
                    &AuditEvent::success(AuditEventKind::RoleGranted, actor)
                        .with_param("user_id", user_id)
                        .with_param("tenant_id", tenant_id)
                        .with_param("org_id", org_id)
                        .with_param("role", role.code()),
                );
                Ok(())
            }
            Err(e) => {
                txn.rollback().await?;
                self.audit.emit(
                    &AuditEvent::failure(AuditEventKind::RoleGranted, actor)
                        .with_param("user_id", user_id)
                        .with_param("org_id", org_id)
                        .with_param("error", &e),
                );
                Err(e)
            }
        }
    }

    /// Transactional grant: the caller owns the transaction and commits
    /// once after batching multiple changes.
    pub async fn grant_role_tx<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        tenant_id: &str,
        org_id: i64,
        role: &Role,
    ) -> Result<(), DomainError> {
        self.grant_inner(conn, user_id, tenant_id, org_id, role, true)
            .await
    }

    /// Grant without the duplicate-role check, for callers that already
    /// cleared existing grants in the same transaction.
    pub async fn grant_role_without_validation_tx<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        tenant_id: &str,
        org_id: i64,
        role: &Role,
    ) -> Result<(), DomainError> {
        self.grant_inner(conn, user_id, tenant_id, org_id, role, false)
            .await
    }

    async fn grant_inner<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        tenant_id: &str,
        org_id: i64,
        role: &Role,
        check_duplicate: bool,
    ) -> Result<(), DomainError> {
        if user_id <= 0 || org_id <= 0 {
            return Err(DomainError::invalid_input(
                "user and organization ids must be positive",
            ));
        }
        if tenant_id.is_empty() {
            return Err(DomainError::invalid_input("tenant id must not be empty"));
        }
        self.registry.resolve(role.code())?;

        if let Some(existing) = self
            .policy
            .find_grant_by_user_org(conn, user_id, org_id)
            .await?
        {
            if check_duplicate && existing.role == role.code() && existing.tenant_id == tenant_id {
                return Err(DomainError::RoleAlreadyExists {
                    user_id,
                    tenant_id: tenant_id.to_owned(),
                    org_id,
                    role: role.code().to_owned(),
                });
            }
            // Replace the conflicting grant; the prior row's tenant is the
            // one removed, not the requested one.
            self.policy
                .delete_grant(
                    conn,
                    existing.subject_id,
                    &existing.tenant_id,
                    existing.org_id,
                    &existing.role,
                )
                .await?;
        }

        let owners = self.directory.ensure_team(conn, org_id, OWNERS_TEAM).await?;
        self.directory.add_team_member(conn, owners.id, user_id).await?;

        self.policy
            .insert_grant(conn, user_id, tenant_id, org_id, role.code())
            .await?;
        Ok(())
    }

    /// Revoke a role. With `permanent_remove` the user also leaves every
    /// team of the organization, guarded against removing the last owner.
    pub async fn revoke_role<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        user_id: i64,
        tenant_id: &str,
        org_id: i64,
        role: &Role,
        permanent_remove: bool,
    ) -> Result<(), DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        let result = self
            .revoke_inner(&txn, user_id, tenant_id, org_id, role.code(), permanent_remove)
            .await;
        match result {
            Ok(()) => {
                txn.commit().await?;
                self.audit.emit(
                    &AuditEvent::success(AuditEventKind::RoleRevoked, actor)
                        .with_param("user_id", user_id)
                        .with_param("tenant_id", tenant_id)
                        .with_param("org_id", org_id)
                        .with_param("role", role.code())
                        .with_param("permanent", permanent_remove),
                );
                Ok(())
            }
            Err(e) => {
                txn.rollback().await?;
                self.audit.emit(
                    &AuditEvent::failure(AuditEventKind::RoleRevoked, actor)
                        .with_param("user_id", user_id)
                        .with_param("org_id", org_id)
                        .with_param("error", &e),
                );
                Err(e)
            }
        }
    }

    /// Transactional revoke. Always removes organization membership, which
    /// is what the IAM ingestion and batch apply pipelines need.
    pub async fn revoke_role_tx<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        tenant_id: &str,
        org_id: i64,
        role: &Role,
    ) -> Result<(), DomainError> {
        self.revoke_inner(conn, user_id, tenant_id, org_id, role.code(), true)
            .await
    }

    async fn revoke_inner<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        tenant_id: &str,
        org_id: i64,
        role_code: &str,
        permanent_remove: bool,
    ) -> Result<(), DomainError> {
        if user_id <= 0 || org_id <= 0 {
            return Err(DomainError::invalid_input(
                "user and organization ids must be positive",
            ));
        }
        if tenant_id.is_empty() {
            return Err(DomainError::invalid_input("tenant id must not be empty"));
        }

        self.policy
            .delete_grant(conn, user_id, tenant_id, org_id, role_code)
            .await?;

        if permanent_remove {
            let teams = self
                .directory
                .teams_of_user_in_org(conn, user_id, org_id)
                .await?;
            for team in &teams {
                if team.name == OWNERS_TEAM
                    && self.directory.team_member_count(conn, team.id).await? <= 1
                {
                    return Err(DomainError::LastOwner { org_id });
                }
            }
            for team in teams {
                self.directory.remove_team_member(conn, team.id, user_id).await?;
            }
        }
        Ok(())
    }

    /// Install the global technical-user grant. Idempotent.
    pub async fn grant_technical_user<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        user_id: i64,
    ) -> Result<(), DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if user_id <= 0 {
            return Err(DomainError::invalid_input("user id must be positive"));
        }
        let txn = db.begin().await?;
        self.policy
            .insert_global_grant(&txn, user_id, Role::TechnicalUser.code())
            .await?;
        txn.commit().await?;
        self.audit.emit(
            &AuditEvent::success(AuditEventKind::TechnicalUserGranted, actor)
                .with_param("user_id", user_id),
        );
        Ok(())
    }

    pub async fn add_project_to_inner_source<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
    ) -> Result<(), DomainError> {
        if org_id <= 0 {
            return Err(DomainError::invalid_input("organization id must be positive"));
        }
        self.policy.add_inner_source(conn, org_id, INNER_SOURCE).await
    }

    pub async fn remove_project_from_inner_source<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
    ) -> Result<(), DomainError> {
        if org_id <= 0 {
            return Err(DomainError::invalid_input("organization id must be positive"));
        }
        self.policy.remove_inner_source(conn, org_id).await?;
        Ok(())
    }

    /// Remove every grant a user holds in a tenant, inside the caller's
    /// transaction. Conflicts that only signal a no-op are skipped.
    pub async fn remove_privileges_by_user_tenant_tx<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        tenant_id: &str,
    ) -> Result<(), DomainError> {
        let grants = self
            .policy
            .grants_by_user_tenant(conn, user_id, tenant_id)
            .await?;
        for grant in grants {
            match self
                .revoke_inner(conn, user_id, &grant.tenant_id, grant.org_id, &grant.role, true)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_benign_grant_conflict() => {
                    tracing::debug!(user_id, org_id = grant.org_id, error = %e, "revoke skipped");
                }
                Err(e) => return Err(e),
            }
        }
        self.custom
            .delete_team_grants_by_user_tenant(conn, user_id, tenant_id)
            .await?;
        Ok(())
    }

    /// Cascading revoke for tenant deletion: every role grant, carrier-team
    /// membership and repository bundle scoped to the tenant goes away.
    /// Cancellable between grants; the transaction rolls back as a whole.
    pub async fn remove_privileges_by_tenant<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        tenant_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if !self.multi_tenant_enabled {
            return Err(DomainError::invalid_input(
                "multi-tenant support is disabled",
            ));
        }
        if tenant_id.is_empty() {
            return Err(DomainError::invalid_input("tenant id must not be empty"));
        }

        let txn = db.begin().await?;
        let result = self
            .remove_tenant_scope(&txn, tenant_id, None, cancel)
            .await;
        match result {
            Ok(removed) => {
                txn.commit().await?;
                self.audit.emit(
                    &AuditEvent::success(AuditEventKind::TenantDeleted, actor)
                        .with_param("tenant_id", tenant_id)
                        .with_param("grants_removed", removed),
                );
                Ok(())
            }
            Err(e) => {
                txn.rollback().await?;
                self.audit.emit(
                    &AuditEvent::failure(AuditEventKind::TenantDeleted, actor)
                        .with_param("tenant_id", tenant_id)
                        .with_param("error", &e),
                );
                Err(e)
            }
        }
    }

    /// Cascading revoke for deleting a single organization of a tenant.
    pub async fn remove_privileges_by_tenant_and_org<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        tenant_id: &str,
        org_id: i64,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if tenant_id.is_empty() || org_id <= 0 {
            return Err(DomainError::invalid_input(
                "tenant id and organization id are required",
            ));
        }
        let txn = db.begin().await?;
        let result = self
            .remove_tenant_scope(&txn, tenant_id, Some(org_id), cancel)
            .await;
        match result {
            Ok(removed) => {
                txn.commit().await?;
                self.audit.emit(
                    &AuditEvent::success(AuditEventKind::RoleRevoked, actor)
                        .with_param("tenant_id", tenant_id)
                        .with_param("org_id", org_id)
                        .with_param("grants_removed", removed)
                        .with_param("cascade", true),
                );
                Ok(())
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn remove_tenant_scope<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: &str,
        org_id: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        let grants = match org_id {
            Some(org) => self.policy.grants_by_tenant_org(conn, tenant_id, org).await?,
            None => self.policy.grants_by_tenant(conn, tenant_id).await?,
        };

        let mut removed = 0u64;
        for grant in grants {
            if cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            match self
                .revoke_inner(
                    conn,
                    grant.subject_id,
                    &grant.tenant_id,
                    grant.org_id,
                    &grant.role,
                    true,
                )
                .await
            {
                Ok(()) => removed += 1,
                Err(e) if e.is_benign_grant_conflict() => {
                    tracing::debug!(
                        user_id = grant.subject_id,
                        org_id = grant.org_id,
                        error = %e,
                        "cascading revoke skipped"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        match org_id {
            Some(org) => {
                self.custom
                    .delete_team_grants_by_tenant_org(conn, tenant_id, org)
                    .await?;
                self.custom.delete_repo_privileges_by_org(conn, org).await?;
            }
            None => {
                self.custom.delete_team_grants_by_tenant(conn, tenant_id).await?;
                for org in self.directory.org_ids_by_tenant(conn, tenant_id).await? {
                    self.custom.delete_repo_privileges_by_org(conn, org).await?;
                }
            }
        }
        Ok(removed)
    }
}
