//! Read-side queries: enriched privileges, tenant resolution, assignment
//! candidates.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use role_model_sdk::{Action, EnrichedPrivilege, OrgInfo, Role, UserInfo, Visibility};
use sea_orm::ConnectionTrait;

use crate::domain::enforcer::Enforcer;
use crate::domain::error::DomainError;
use crate::domain::vocabulary::RoleRegistry;
use crate::infra::storage::entity::{organization, role_grant, user};
use crate::infra::storage::{DirectoryRepository, PolicyRepository};

#[derive(Clone)]
pub struct PrivilegeQueryService {
    policy: PolicyRepository,
    directory: DirectoryRepository,
    enforcer: Enforcer,
    registry: Arc<RoleRegistry>,
}

impl PrivilegeQueryService {
    #[must_use]
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self {
            policy: PolicyRepository::new(),
            directory: DirectoryRepository::new(),
            enforcer: Enforcer::new(),
            registry,
        }
    }

    pub async fn all_privileges<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<Vec<EnrichedPrivilege>, DomainError> {
        let rows = self.policy.all_grants(conn).await?;
        self.enrich(conn, rows).await
    }

    pub async fn privileges_by_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
    ) -> Result<Vec<EnrichedPrivilege>, DomainError> {
        let rows = self.policy.grants_by_user(conn, user_id).await?;
        self.enrich(conn, rows).await
    }

    pub async fn privileges_by_tenant<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: &str,
    ) -> Result<Vec<EnrichedPrivilege>, DomainError> {
        let rows = self.policy.grants_by_tenant(conn, tenant_id).await?;
        self.enrich(conn, rows).await
    }

    pub async fn privileges_by_org<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
    ) -> Result<Vec<EnrichedPrivilege>, DomainError> {
        let rows = self.policy.grants_by_org(conn, org_id).await?;
        self.enrich(conn, rows).await
    }

    /// Bulk-resolve grant rows against the directory. Rows whose user or
    /// organization is gone, or whose role code left the vocabulary, are
    /// skipped with a warning rather than failing the whole listing.
    async fn enrich<C: ConnectionTrait>(
        &self,
        conn: &C,
        rows: Vec<role_grant::Model>,
    ) -> Result<Vec<EnrichedPrivilege>, DomainError> {
        let user_ids: Vec<i64> = rows
            .iter()
            .map(|r| r.subject_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let org_ids: Vec<i64> = rows
            .iter()
            .map(|r| r.org_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let users: HashMap<i64, user::Model> = self
            .directory
            .users_by_ids(conn, &user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let orgs: HashMap<i64, organization::Model> = self
            .directory
            .orgs_by_ids(conn, &org_ids)
            .await?
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let mut enriched = Vec::with_capacity(rows.len());
        for row in rows {
            let (Some(user), Some(org)) = (users.get(&row.subject_id), orgs.get(&row.org_id))
            else {
                tracing::warn!(
                    subject_id = row.subject_id,
                    org_id = row.org_id,
                    "grant references a missing directory entry"
                );
                continue;
            };
            let Ok(role) = self.registry.resolve(&row.role) else {
                tracing::warn!(role = %row.role, "grant carries an unregistered role code");
                continue;
            };
            enriched.push(EnrichedPrivilege {
                user: user_info(user),
                tenant_id: row.tenant_id,
                org: org_info(org),
                role,
            });
        }
        Ok(enriched)
    }

    pub async fn role_for_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        org_id: i64,
        tenant_id: &str,
    ) -> Result<Option<Role>, DomainError> {
        let Some(grant) = self
            .policy
            .find_grant(conn, user_id, tenant_id, org_id)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.registry.resolve(&grant.role).ok())
    }

    pub async fn actions_for_role<C: ConnectionTrait>(
        &self,
        conn: &C,
        role: &Role,
    ) -> Result<Vec<Action>, DomainError> {
        self.enforcer.action_closure(conn, role.code()).await
    }

    pub async fn is_technical_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
    ) -> Result<bool, DomainError> {
        self.policy
            .has_global_grant(conn, user_id, Role::TechnicalUser.code())
            .await
    }

    /// The tenant of a user's first grant, falling back to the default
    /// tenant.
    pub async fn user_tenant_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
    ) -> Result<Option<String>, DomainError> {
        let grants = self.policy.grants_by_user(conn, user_id).await?;
        if let Some(first) = grants.into_iter().next() {
            return Ok(Some(first.tenant_id));
        }
        Ok(self.directory.default_tenant(conn).await?.map(|t| t.id))
    }

    /// Every tenant a user reaches through organization membership, falling
    /// back to the default tenant when there are none.
    pub async fn user_tenant_ids_or_default<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
    ) -> Result<Vec<String>, DomainError> {
        let org_ids = self.directory.org_ids_for_user(conn, user_id).await?;
        let tenants = self.directory.tenant_ids_for_orgs(conn, &org_ids).await?;
        if !tenants.is_empty() {
            return Ok(tenants);
        }
        Ok(self
            .directory
            .default_tenant(conn)
            .await?
            .map(|t| vec![t.id])
            .unwrap_or_default())
    }

    /// Candidates for a role assignment dialog: active users matching the
    /// login filter, minus users already granted in the organization, users
    /// outside the current or default tenant, and technical users.
    pub async fn users_for_assignment<C: ConnectionTrait>(
        &self,
        conn: &C,
        login_filter: &str,
        org_id: i64,
        current_tenant_id: &str,
    ) -> Result<Vec<UserInfo>, DomainError> {
        if org_id <= 0 {
            return Err(DomainError::invalid_input("organization id must be positive"));
        }

        let already_granted: BTreeSet<i64> = self
            .policy
            .grants_by_org(conn, org_id)
            .await?
            .into_iter()
            .map(|g| g.subject_id)
            .collect();
        let default_tenant = self.directory.default_tenant(conn).await?.map(|t| t.id);

        let mut candidates = Vec::new();
        for user in self.directory.search_active_users(conn, login_filter).await? {
            if already_granted.contains(&user.id) {
                continue;
            }
            if self.is_technical_user(conn, user.id).await? {
                continue;
            }
            let tenant = self.user_tenant_id(conn, user.id).await?;
            let in_scope = tenant
                .as_deref()
                .is_some_and(|t| t == current_tenant_id || Some(t) == default_tenant.as_deref());
            if !in_scope {
                continue;
            }
            candidates.push(user_info(&user));
        }
        Ok(candidates)
    }
}

fn visibility_from_str(value: &str) -> Visibility {
    match value {
        "limited" => Visibility::Limited,
        "private" => Visibility::Private,
        _ => Visibility::Public,
    }
}

fn user_info(model: &user::Model) -> UserInfo {
    UserInfo {
        id: model.id,
        login: model.login.clone(),
        is_active: model.is_active,
        is_admin: model.is_admin,
        visibility: visibility_from_str(&model.visibility),
    }
}

fn org_info(model: &organization::Model) -> OrgInfo {
    OrgInfo {
        id: model.id,
        name: model.name.clone(),
        lower_name: model.lower_name.clone(),
        is_active: model.is_active,
        visibility: visibility_from_str(&model.visibility),
    }
}
