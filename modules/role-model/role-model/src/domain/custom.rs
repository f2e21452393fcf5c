//! Custom-privilege manager: carrier-team membership and per-repository
//! composite bundles.

use std::sync::Arc;

use role_model_sdk::{composite_name, merge_composites, parse_composite};
use sea_orm::{ConnectionTrait, TransactionTrait};

use crate::domain::audit::{AuditActor, AuditEvent, AuditEventKind, AuditSink};
use crate::domain::error::DomainError;
use crate::infra::storage::CustomPolicyRepository;

#[derive(Clone)]
pub struct CustomPrivilegeService {
    custom: CustomPolicyRepository,
    audit: Arc<dyn AuditSink>,
}

impl CustomPrivilegeService {
    #[must_use]
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            custom: CustomPolicyRepository::new(),
            audit,
        }
    }

    /// Put a user into the custom-privilege carrier team of an organization.
    /// Idempotent.
    pub async fn add_user_to_team<C: ConnectionTrait>(
        &self,
        conn: &C,
        actor: &AuditActor,
        user_id: i64,
        tenant_id: &str,
        org_id: i64,
        team_name: &str,
    ) -> Result<(), DomainError> {
        validate_team_target(user_id, tenant_id, org_id, team_name)?;
        self.custom
            .ensure_team_grant(conn, user_id, tenant_id, org_id, team_name)
            .await?;
        self.audit.emit(
            &AuditEvent::success(AuditEventKind::CustomPrivilegesAdded, actor)
                .with_param("user_id", user_id)
                .with_param("tenant_id", tenant_id)
                .with_param("org_id", org_id)
                .with_param("team", team_name),
        );
        Ok(())
    }

    pub async fn remove_user_from_team<C: ConnectionTrait>(
        &self,
        conn: &C,
        actor: &AuditActor,
        user_id: i64,
        tenant_id: &str,
        org_id: i64,
        team_name: &str,
    ) -> Result<(), DomainError> {
        validate_team_target(user_id, tenant_id, org_id, team_name)?;
        self.custom
            .remove_team_grant(conn, user_id, tenant_id, org_id, team_name)
            .await?;
        self.audit.emit(
            &AuditEvent::success(AuditEventKind::CustomPrivilegesRemoved, actor)
                .with_param("user_id", user_id)
                .with_param("tenant_id", tenant_id)
                .with_param("org_id", org_id)
                .with_param("team", team_name),
        );
        Ok(())
    }

    /// Attach composite bundles to a team, one entry per repository. An
    /// existing bundle for the same `(team, org, repo)` is unioned with the
    /// new short codes; the replaced row is deleted before the merged one is
    /// inserted, so one canonical row remains.
    pub async fn assign_team_repo_privileges<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        team_name: &str,
        org_id: i64,
        assignments: &[(i64, String)],
    ) -> Result<(), DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if team_name.is_empty() || org_id <= 0 {
            return Err(DomainError::invalid_input(
                "team name and organization id are required",
            ));
        }

        let txn = db.begin().await?;
        let mut merged_any = false;
        for (repo_id, composite) in assignments {
            if *repo_id <= 0 {
                txn.rollback().await?;
                return Err(DomainError::invalid_input("repository id must be positive"));
            }
            let requested = parse_composite(composite)
                .map_err(|e| DomainError::invalid_input(e.to_string()))?;
            if requested.is_empty() {
                txn.rollback().await?;
                return Err(DomainError::invalid_input("composite name must not be empty"));
            }
            let canonical = composite_name(&requested);

            let bundle = match self
                .custom
                .find_repo_privilege(&txn, team_name, org_id, *repo_id)
                .await?
            {
                Some(existing) => {
                    let merged = merge_composites(&existing.bundle, &canonical)
                        .map_err(|e| DomainError::invalid_input(e.to_string()))?;
                    self.custom
                        .delete_repo_privilege(&txn, team_name, org_id, *repo_id)
                        .await?;
                    // The old grouping row stays while another repository of
                    // the team still carries the same bundle.
                    let still_carried = self
                        .custom
                        .repo_privileges_by_team(&txn, team_name)
                        .await?
                        .iter()
                        .any(|row| row.bundle == existing.bundle);
                    if !still_carried {
                        self.custom
                            .remove_team_bundle(&txn, team_name, &existing.bundle)
                            .await?;
                    }
                    merged_any = true;
                    merged
                }
                None => canonical,
            };

            self.custom
                .insert_repo_privilege(&txn, team_name, org_id, *repo_id, &bundle)
                .await?;
            self.custom.ensure_team_bundle(&txn, team_name, &bundle).await?;
        }
        txn.commit().await?;

        let kind = if merged_any {
            AuditEventKind::CustomPrivilegesUpdated
        } else {
            AuditEventKind::CustomPrivilegesAdded
        };
        self.audit.emit(
            &AuditEvent::success(kind, actor)
                .with_param("team", team_name)
                .with_param("org_id", org_id)
                .with_param("repositories", assignments.len()),
        );
        Ok(())
    }

    /// Drop every bundle a team carries. Fails while any user still acts
    /// through the team.
    pub async fn remove_team_custom_privileges<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        team_name: &str,
    ) -> Result<(), DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if team_name.is_empty() {
            return Err(DomainError::invalid_input("team name must not be empty"));
        }

        let dependents = self.custom.team_grants_by_team(db, team_name).await?;
        if !dependents.is_empty() {
            return Err(DomainError::GroupNotEmpty {
                code: team_name.to_owned(),
            });
        }

        let txn = db.begin().await?;
        self.custom.delete_repo_privileges_by_team(&txn, team_name).await?;
        self.custom.delete_team_bundles(&txn, team_name).await?;
        txn.commit().await?;

        self.audit.emit(
            &AuditEvent::success(AuditEventKind::CustomPrivilegesRemoved, actor)
                .with_param("team", team_name),
        );
        Ok(())
    }
}

fn validate_team_target(
    user_id: i64,
    tenant_id: &str,
    org_id: i64,
    team_name: &str,
) -> Result<(), DomainError> {
    if user_id <= 0 || org_id <= 0 {
        return Err(DomainError::invalid_input(
            "user and organization ids must be positive",
        ));
    }
    if tenant_id.is_empty() || team_name.is_empty() {
        return Err(DomainError::invalid_input(
            "tenant id and team name must not be empty",
        ));
    }
    Ok(())
}
