//! Request evaluation against the policy store.
//!
//! Three independent tracks feed an org-level decision: the direct role
//! grant (with role-to-action inheritance), the technical-user track, and
//! the inner-source pool guarded by a tenant match. Repo-level decisions
//! combine carrier-team membership with the team's composite bundle for the
//! target repository, first matching team wins.

use std::collections::{BTreeSet, VecDeque};

use role_model_sdk::{parse_composite, Action, OrgAccessRequest, RepoAccessRequest, Role};
use sea_orm::ConnectionTrait;

use crate::domain::error::DomainError;
use crate::domain::vocabulary::INNER_SOURCE;
use crate::infra::storage::{CustomPolicyRepository, DirectoryRepository, PolicyRepository};

#[derive(Clone, Copy, Debug, Default)]
pub struct Enforcer {
    policy: PolicyRepository,
    custom: CustomPolicyRepository,
    directory: DirectoryRepository,
}

impl Enforcer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a role's inheritance closure covers an action code. The
    /// closure may pass through other role codes (the technical user
    /// inherits the owner's set).
    pub async fn role_covers<C: ConnectionTrait>(
        &self,
        conn: &C,
        role_code: &str,
        action_code: &str,
    ) -> Result<bool, DomainError> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([role_code.to_owned()]);
        while let Some(code) = queue.pop_front() {
            if !seen.insert(code.clone()) {
                continue;
            }
            for child in self.policy.children_of(conn, &code).await? {
                if child == action_code {
                    return Ok(true);
                }
                queue.push_back(child);
            }
        }
        Ok(false)
    }

    /// Every action code reachable from a role through the inheritance
    /// closure.
    pub async fn action_closure<C: ConnectionTrait>(
        &self,
        conn: &C,
        role_code: &str,
    ) -> Result<Vec<Action>, DomainError> {
        let mut actions = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([role_code.to_owned()]);
        while let Some(code) = queue.pop_front() {
            if !seen.insert(code.clone()) {
                continue;
            }
            for child in self.policy.children_of(conn, &code).await? {
                if let Some(action) = Action::from_code(&child) {
                    actions.insert(action);
                } else {
                    queue.push_back(child);
                }
            }
        }
        Ok(actions.into_iter().collect())
    }

    /// Org-level check: direct grant, technical user, or inner source.
    ///
    /// The tenant guard on the inner-source track only runs when the first
    /// two tracks denied; inner-source visibility must not leak across
    /// tenants.
    pub async fn is_access_granted<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: &OrgAccessRequest,
    ) -> Result<bool, DomainError> {
        if request.doer_id <= 0 || request.target_org_id <= 0 {
            return Err(DomainError::invalid_input(
                "doer and organization ids must be positive",
            ));
        }
        if request.target_tenant_id.is_empty() {
            return Err(DomainError::invalid_input("tenant id must not be empty"));
        }

        let action_code = request.action.code();

        if let Some(grant) = self
            .policy
            .find_grant(
                conn,
                request.doer_id,
                &request.target_tenant_id,
                request.target_org_id,
            )
            .await?
            && self.role_covers(conn, &grant.role, action_code).await?
        {
            return Ok(true);
        }

        let tuz = Role::TechnicalUser.code();
        if self
            .policy
            .has_global_grant(conn, request.doer_id, tuz)
            .await?
            && self.role_covers(conn, tuz, action_code).await?
        {
            return Ok(true);
        }

        if self
            .policy
            .is_inner_source(conn, request.target_org_id)
            .await?
        {
            let covered = self
                .policy
                .inner_source_actions(conn, INNER_SOURCE)
                .await?
                .iter()
                .any(|a| a == action_code);
            if covered
                && let Some(project_tenant) = self
                    .directory
                    .tenant_id_for_org(conn, request.target_org_id)
                    .await?
            {
                return Ok(project_tenant == request.target_tenant_id);
            }
        }

        Ok(false)
    }

    /// Repo-level check through custom-privilege bundles. When the request
    /// names a team, only that team is considered; otherwise all carrier
    /// teams the doer belongs to in the organization are tried in order.
    /// A repository row only counts while the team still carries its bundle
    /// in the grouping table.
    pub async fn is_custom_granted<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: &RepoAccessRequest,
    ) -> Result<bool, DomainError> {
        if request.doer_id <= 0 || request.org_id <= 0 || request.repo_id <= 0 {
            return Err(DomainError::invalid_input(
                "doer, organization and repository ids must be positive",
            ));
        }
        if request.target_tenant_id.is_empty() {
            return Err(DomainError::invalid_input("tenant id must not be empty"));
        }

        let teams = match &request.team {
            Some(team) => {
                if team.is_empty() {
                    return Err(DomainError::invalid_input("team name must not be empty"));
                }
                if self
                    .custom
                    .has_team_grant(
                        conn,
                        request.doer_id,
                        &request.target_tenant_id,
                        request.org_id,
                        team,
                    )
                    .await?
                {
                    vec![team.clone()]
                } else {
                    Vec::new()
                }
            }
            None => {
                self.custom
                    .team_names_for_user(
                        conn,
                        request.doer_id,
                        &request.target_tenant_id,
                        request.org_id,
                    )
                    .await?
            }
        };

        for team in teams {
            if let Some(row) = self
                .custom
                .find_repo_privilege(conn, &team, request.org_id, request.repo_id)
                .await?
                && self.custom.has_team_bundle(conn, &team, &row.bundle).await?
            {
                let bundle = parse_composite(&row.bundle)
                    .map_err(|e| DomainError::invalid_input(e.to_string()))?;
                if bundle.contains(&request.custom_privilege) {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}
