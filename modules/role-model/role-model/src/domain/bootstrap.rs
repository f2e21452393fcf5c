//! Startup bootstrap: built-in role inheritance, the inner-source grouping,
//! and reconciliation of configured custom groups.
//!
//! The whole pass runs in one transaction and is idempotent; a validation
//! failure aborts startup.

use std::collections::BTreeSet;
use std::sync::Arc;

use role_model_sdk::{Action, Role};
use sea_orm::{ConnectionTrait, TransactionTrait};

use crate::config::RoleModelConfig;
use crate::domain::error::DomainError;
use crate::domain::vocabulary::{RoleRegistry, INNER_SOURCE};
use crate::infra::storage::{CustomPolicyRepository, PolicyRepository};

pub struct Bootstrap {
    policy: PolicyRepository,
    custom: CustomPolicyRepository,
    registry: Arc<RoleRegistry>,
    config: RoleModelConfig,
}

impl Bootstrap {
    #[must_use]
    pub fn new(registry: Arc<RoleRegistry>, config: RoleModelConfig) -> Self {
        Self {
            policy: PolicyRepository::new(),
            custom: CustomPolicyRepository::new(),
            registry,
            config,
        }
    }

    pub async fn run<C>(&self, db: &C) -> Result<(), DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        self.install_builtin_groupings(&txn).await?;
        self.reconcile_custom_groups(&txn).await?;
        self.validate_stored_roles(&txn).await?;
        txn.commit().await?;
        tracing::info!("role model bootstrap complete");
        Ok(())
    }

    /// Built-in role-to-action rows. Owner covers everything; the technical
    /// user inherits owner through a role-to-role row.
    async fn install_builtin_groupings<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<(), DomainError> {
        let owner = Role::Owner.code();
        for action in Action::ALL {
            self.policy.ensure_role_action(conn, owner, action.code()).await?;
        }

        let manager = Role::Manager.code();
        for action in Action::ALL {
            if matches!(action, Action::Own | Action::MergeWithoutCheck) {
                continue;
            }
            self.policy.ensure_role_action(conn, manager, action.code()).await?;
        }

        let writer = Role::Writer.code();
        for action in [Action::Read, Action::Write] {
            self.policy.ensure_role_action(conn, writer, action.code()).await?;
        }
        self.policy
            .ensure_role_action(conn, Role::Reader.code(), Action::Read.code())
            .await?;

        self.policy
            .ensure_role_action(conn, Role::TechnicalUser.code(), owner)
            .await?;
        self.policy
            .ensure_inner_source_action(conn, INNER_SOURCE, Action::Read.code())
            .await?;
        Ok(())
    }

    /// Reconcile configured groups against the store: create new ones,
    /// update existing ones in place, prune groups that left the config and
    /// have no assignees. Groups that still have assignees stay registered
    /// so their stored grants keep resolving.
    async fn reconcile_custom_groups<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<(), DomainError> {
        if self.config.custom_groups_enabled {
            for (code, group) in &self.config.custom_groups {
                if RoleRegistry::is_reserved_code(code) {
                    return Err(DomainError::invalid_input(format!(
                        "custom group code '{code}' is reserved"
                    )));
                }
                let privileges = group.privilege_codes();
                if privileges.is_empty() {
                    return Err(DomainError::invalid_input(format!(
                        "custom group '{code}' has no privileges"
                    )));
                }
                for privilege in &privileges {
                    if !RoleRegistry::is_known_privilege_code(privilege) {
                        return Err(DomainError::non_existent_role(privilege));
                    }
                }

                let rank = self.registry.register_custom(code, &group.name);
                let new_set: BTreeSet<&str> = privileges.iter().map(String::as_str).collect();

                if self.custom.find_group(conn, code).await?.is_some() {
                    let has_assignees =
                        !self.policy.grants_by_role(conn, code).await?.is_empty();
                    if has_assignees {
                        let installed = self.policy.children_of(conn, code).await?;
                        let shrinks = installed.iter().any(|p| !new_set.contains(p.as_str()));
                        if shrinks {
                            return Err(DomainError::PrivilegeSetShrinkForbidden {
                                code: code.clone(),
                            });
                        }
                    }
                    self.policy.delete_role_actions(conn, code).await?;
                    self.custom.update_group(conn, code, &group.name, rank).await?;
                } else {
                    self.custom.insert_group(conn, code, &group.name, rank).await?;
                }
                for privilege in &privileges {
                    self.policy.ensure_role_action(conn, code, privilege).await?;
                }
            }
        }

        for stored in self.custom.all_groups(conn).await? {
            let configured = self.config.custom_groups_enabled
                && self.config.custom_groups.contains_key(&stored.code);
            if configured {
                continue;
            }
            if self.policy.grants_by_role(conn, &stored.code).await?.is_empty() {
                self.policy.delete_role_actions(conn, &stored.code).await?;
                self.custom.delete_group(conn, &stored.code).await?;
                tracing::info!(code = %stored.code, "pruned unconfigured custom group");
            } else {
                self.registry.register_custom(&stored.code, &stored.name);
                tracing::warn!(
                    code = %stored.code,
                    "custom group left the configuration but still has assignees"
                );
            }
        }
        Ok(())
    }

    /// Every role code present in a stored grant must resolve against the
    /// vocabulary after reconciliation.
    async fn validate_stored_roles<C: ConnectionTrait>(&self, conn: &C) -> Result<(), DomainError> {
        let codes: BTreeSet<String> = self
            .policy
            .all_grants(conn)
            .await?
            .into_iter()
            .map(|g| g.role)
            .collect();
        for code in codes {
            self.registry.resolve(&code)?;
        }
        Ok(())
    }
}
