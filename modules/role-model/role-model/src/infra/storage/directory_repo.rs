use std::collections::BTreeSet;

use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::domain::error::DomainError;
use crate::infra::storage::entity::{organization, team, team_user, tenant, tenant_organization, user};

/// Name of the team every role grant keeps the grantee in.
pub const OWNERS_TEAM: &str = "Owners";

/// Read/write access to the directory tables: tenants, organizations and
/// their tenant links, users, teams, and team membership.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectoryRepository;

impl DirectoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub async fn tenant_by_name<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
    ) -> Result<Option<tenant::Model>, DomainError> {
        let found = tenant::Entity::find()
            .filter(tenant::Column::Name.eq(name))
            .one(conn)
            .await?;
        Ok(found)
    }

    pub async fn tenant_by_org_key<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_key: &str,
    ) -> Result<Option<tenant::Model>, DomainError> {
        let found = tenant::Entity::find()
            .filter(tenant::Column::OrgKey.eq(org_key))
            .one(conn)
            .await?;
        Ok(found)
    }

    pub async fn default_tenant<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<Option<tenant::Model>, DomainError> {
        let found = tenant::Entity::find()
            .filter(tenant::Column::IsDefault.eq(true))
            .one(conn)
            .await?;
        Ok(found)
    }

    pub async fn orgs_by_ids<C: ConnectionTrait>(
        &self,
        conn: &C,
        ids: &[i64],
    ) -> Result<Vec<organization::Model>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = organization::Entity::find()
            .filter(organization::Column::Id.is_in(ids.iter().copied()))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn active_orgs_by_lower_names<C: ConnectionTrait>(
        &self,
        conn: &C,
        lower_names: &[String],
    ) -> Result<Vec<organization::Model>, DomainError> {
        if lower_names.is_empty() {
            return Ok(Vec::new());
        }
        let rows = organization::Entity::find()
            .filter(organization::Column::IsActive.eq(true))
            .filter(organization::Column::LowerName.is_in(lower_names.iter().cloned()))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn tenant_id_for_org<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
    ) -> Result<Option<String>, DomainError> {
        let found = tenant_organization::Entity::find()
            .filter(tenant_organization::Column::OrgId.eq(org_id))
            .one(conn)
            .await?;
        Ok(found.map(|link| link.tenant_id))
    }

    pub async fn tenant_ids_for_orgs<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_ids: &[i64],
    ) -> Result<Vec<String>, DomainError> {
        if org_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = tenant_organization::Entity::find()
            .filter(tenant_organization::Column::OrgId.is_in(org_ids.iter().copied()))
            .all(conn)
            .await?;
        let distinct: BTreeSet<String> = rows.into_iter().map(|link| link.tenant_id).collect();
        Ok(distinct.into_iter().collect())
    }

    pub async fn org_ids_by_tenant<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: &str,
    ) -> Result<Vec<i64>, DomainError> {
        let rows = tenant_organization::Entity::find()
            .filter(tenant_organization::Column::TenantId.eq(tenant_id))
            .all(conn)
            .await?;
        Ok(rows.into_iter().map(|link| link.org_id).collect())
    }

    pub async fn user_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i64,
    ) -> Result<Option<user::Model>, DomainError> {
        let found = user::Entity::find_by_id(id).one(conn).await?;
        Ok(found)
    }

    pub async fn users_by_ids<C: ConnectionTrait>(
        &self,
        conn: &C,
        ids: &[i64],
    ) -> Result<Vec<user::Model>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn search_active_users<C: ConnectionTrait>(
        &self,
        conn: &C,
        login_filter: &str,
    ) -> Result<Vec<user::Model>, DomainError> {
        let mut query = user::Entity::find().filter(user::Column::IsActive.eq(true));
        if !login_filter.is_empty() {
            query = query.filter(user::Column::Login.contains(login_filter));
        }
        let rows = query.all(conn).await?;
        Ok(rows)
    }

    pub async fn find_team<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
        name: &str,
    ) -> Result<Option<team::Model>, DomainError> {
        let found = team::Entity::find()
            .filter(team::Column::OrgId.eq(org_id))
            .filter(team::Column::Name.eq(name))
            .one(conn)
            .await?;
        Ok(found)
    }

    /// Returns the team, creating it when missing.
    pub async fn ensure_team<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
        name: &str,
    ) -> Result<team::Model, DomainError> {
        if let Some(found) = self.find_team(conn, org_id, name).await? {
            return Ok(found);
        }
        let row = team::ActiveModel {
            id: NotSet,
            org_id: Set(org_id),
            name: Set(name.to_owned()),
        };
        let inserted = team::Entity::insert(row).exec(conn).await?;
        Ok(team::Model {
            id: inserted.last_insert_id,
            org_id,
            name: name.to_owned(),
        })
    }

    pub async fn is_team_member<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_id: i64,
        user_id: i64,
    ) -> Result<bool, DomainError> {
        let found = team_user::Entity::find()
            .filter(team_user::Column::TeamId.eq(team_id))
            .filter(team_user::Column::UserId.eq(user_id))
            .one(conn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn add_team_member<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_id: i64,
        user_id: i64,
    ) -> Result<(), DomainError> {
        if self.is_team_member(conn, team_id, user_id).await? {
            return Ok(());
        }
        let row = team_user::ActiveModel {
            id: NotSet,
            team_id: Set(team_id),
            user_id: Set(user_id),
        };
        team_user::Entity::insert(row).exec(conn).await?;
        Ok(())
    }

    pub async fn remove_team_member<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_id: i64,
        user_id: i64,
    ) -> Result<u64, DomainError> {
        let result = team_user::Entity::delete_many()
            .filter(team_user::Column::TeamId.eq(team_id))
            .filter(team_user::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn team_member_count<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_id: i64,
    ) -> Result<u64, DomainError> {
        let count = team_user::Entity::find()
            .filter(team_user::Column::TeamId.eq(team_id))
            .count(conn)
            .await?;
        Ok(count)
    }

    pub async fn teams_of_user_in_org<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        org_id: i64,
    ) -> Result<Vec<team::Model>, DomainError> {
        let org_teams = team::Entity::find()
            .filter(team::Column::OrgId.eq(org_id))
            .all(conn)
            .await?;
        if org_teams.is_empty() {
            return Ok(Vec::new());
        }
        let team_ids: Vec<i64> = org_teams.iter().map(|t| t.id).collect();
        let memberships = team_user::Entity::find()
            .filter(team_user::Column::UserId.eq(user_id))
            .filter(team_user::Column::TeamId.is_in(team_ids))
            .all(conn)
            .await?;
        let member_of: BTreeSet<i64> = memberships.into_iter().map(|m| m.team_id).collect();
        Ok(org_teams
            .into_iter()
            .filter(|t| member_of.contains(&t.id))
            .collect())
    }

    /// Organizations a user belongs to through any team.
    pub async fn org_ids_for_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
    ) -> Result<Vec<i64>, DomainError> {
        let memberships = team_user::Entity::find()
            .filter(team_user::Column::UserId.eq(user_id))
            .all(conn)
            .await?;
        if memberships.is_empty() {
            return Ok(Vec::new());
        }
        let team_ids: Vec<i64> = memberships.into_iter().map(|m| m.team_id).collect();
        let teams = team::Entity::find()
            .filter(team::Column::Id.is_in(team_ids))
            .all(conn)
            .await?;
        let distinct: BTreeSet<i64> = teams.into_iter().map(|t| t.org_id).collect();
        Ok(distinct.into_iter().collect())
    }
}
