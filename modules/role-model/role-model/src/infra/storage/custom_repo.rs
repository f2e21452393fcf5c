use sea_orm::{ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::domain::error::DomainError;
use crate::infra::storage::entity::{custom_group, repo_privilege, team_bundle, team_grant};

/// Repository for the fine-grained policy kinds: carrier-team membership,
/// per-repository composite bundles, team/bundle grouping rows, and the
/// persisted custom privilege groups.
#[derive(Clone, Copy, Debug, Default)]
pub struct CustomPolicyRepository;

impl CustomPolicyRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub async fn has_team_grant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        tenant_id: &str,
        org_id: i64,
        team_name: &str,
    ) -> Result<bool, DomainError> {
        let found = team_grant::Entity::find()
            .filter(team_grant::Column::SubjectId.eq(subject_id))
            .filter(team_grant::Column::TenantId.eq(tenant_id))
            .filter(team_grant::Column::OrgId.eq(org_id))
            .filter(team_grant::Column::TeamName.eq(team_name))
            .one(conn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn ensure_team_grant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        tenant_id: &str,
        org_id: i64,
        team_name: &str,
    ) -> Result<(), DomainError> {
        if self
            .has_team_grant(conn, subject_id, tenant_id, org_id, team_name)
            .await?
        {
            return Ok(());
        }
        let row = team_grant::ActiveModel {
            id: NotSet,
            subject_id: Set(subject_id),
            tenant_id: Set(tenant_id.to_owned()),
            org_id: Set(org_id),
            team_name: Set(team_name.to_owned()),
        };
        team_grant::Entity::insert(row).exec(conn).await?;
        Ok(())
    }

    pub async fn remove_team_grant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        tenant_id: &str,
        org_id: i64,
        team_name: &str,
    ) -> Result<u64, DomainError> {
        let result = team_grant::Entity::delete_many()
            .filter(team_grant::Column::SubjectId.eq(subject_id))
            .filter(team_grant::Column::TenantId.eq(tenant_id))
            .filter(team_grant::Column::OrgId.eq(org_id))
            .filter(team_grant::Column::TeamName.eq(team_name))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Team names a user may act through in an organization.
    pub async fn team_names_for_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        tenant_id: &str,
        org_id: i64,
    ) -> Result<Vec<String>, DomainError> {
        let rows = team_grant::Entity::find()
            .filter(team_grant::Column::SubjectId.eq(subject_id))
            .filter(team_grant::Column::TenantId.eq(tenant_id))
            .filter(team_grant::Column::OrgId.eq(org_id))
            .all(conn)
            .await?;
        Ok(rows.into_iter().map(|r| r.team_name).collect())
    }

    pub async fn team_grants_by_team<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
    ) -> Result<Vec<team_grant::Model>, DomainError> {
        let rows = team_grant::Entity::find()
            .filter(team_grant::Column::TeamName.eq(team_name))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn delete_team_grants_by_tenant<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: &str,
    ) -> Result<u64, DomainError> {
        let result = team_grant::Entity::delete_many()
            .filter(team_grant::Column::TenantId.eq(tenant_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_team_grants_by_tenant_org<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: &str,
        org_id: i64,
    ) -> Result<u64, DomainError> {
        let result = team_grant::Entity::delete_many()
            .filter(team_grant::Column::TenantId.eq(tenant_id))
            .filter(team_grant::Column::OrgId.eq(org_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_team_grants_by_user_tenant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        tenant_id: &str,
    ) -> Result<u64, DomainError> {
        let result = team_grant::Entity::delete_many()
            .filter(team_grant::Column::SubjectId.eq(subject_id))
            .filter(team_grant::Column::TenantId.eq(tenant_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn find_repo_privilege<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
        org_id: i64,
        repo_id: i64,
    ) -> Result<Option<repo_privilege::Model>, DomainError> {
        let found = repo_privilege::Entity::find()
            .filter(repo_privilege::Column::TeamName.eq(team_name))
            .filter(repo_privilege::Column::OrgId.eq(org_id))
            .filter(repo_privilege::Column::RepoId.eq(repo_id))
            .one(conn)
            .await?;
        Ok(found)
    }

    pub async fn insert_repo_privilege<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
        org_id: i64,
        repo_id: i64,
        bundle: &str,
    ) -> Result<(), DomainError> {
        let row = repo_privilege::ActiveModel {
            id: NotSet,
            team_name: Set(team_name.to_owned()),
            org_id: Set(org_id),
            repo_id: Set(repo_id),
            bundle: Set(bundle.to_owned()),
        };
        repo_privilege::Entity::insert(row).exec(conn).await?;
        Ok(())
    }

    pub async fn delete_repo_privilege<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
        org_id: i64,
        repo_id: i64,
    ) -> Result<u64, DomainError> {
        let result = repo_privilege::Entity::delete_many()
            .filter(repo_privilege::Column::TeamName.eq(team_name))
            .filter(repo_privilege::Column::OrgId.eq(org_id))
            .filter(repo_privilege::Column::RepoId.eq(repo_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn repo_privileges_by_team<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
    ) -> Result<Vec<repo_privilege::Model>, DomainError> {
        let rows = repo_privilege::Entity::find()
            .filter(repo_privilege::Column::TeamName.eq(team_name))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn delete_repo_privileges_by_team<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
    ) -> Result<u64, DomainError> {
        let result = repo_privilege::Entity::delete_many()
            .filter(repo_privilege::Column::TeamName.eq(team_name))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_repo_privileges_by_org<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
    ) -> Result<u64, DomainError> {
        let result = repo_privilege::Entity::delete_many()
            .filter(repo_privilege::Column::OrgId.eq(org_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn has_team_bundle<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
        bundle: &str,
    ) -> Result<bool, DomainError> {
        let found = team_bundle::Entity::find()
            .filter(team_bundle::Column::TeamName.eq(team_name))
            .filter(team_bundle::Column::Bundle.eq(bundle))
            .one(conn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn ensure_team_bundle<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
        bundle: &str,
    ) -> Result<(), DomainError> {
        if self.has_team_bundle(conn, team_name, bundle).await? {
            return Ok(());
        }
        let row = team_bundle::ActiveModel {
            id: NotSet,
            team_name: Set(team_name.to_owned()),
            bundle: Set(bundle.to_owned()),
        };
        team_bundle::Entity::insert(row).exec(conn).await?;
        Ok(())
    }

    pub async fn remove_team_bundle<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
        bundle: &str,
    ) -> Result<u64, DomainError> {
        let result = team_bundle::Entity::delete_many()
            .filter(team_bundle::Column::TeamName.eq(team_name))
            .filter(team_bundle::Column::Bundle.eq(bundle))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_team_bundles<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_name: &str,
    ) -> Result<u64, DomainError> {
        let result = team_bundle::Entity::delete_many()
            .filter(team_bundle::Column::TeamName.eq(team_name))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn all_groups<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<Vec<custom_group::Model>, DomainError> {
        let rows = custom_group::Entity::find().all(conn).await?;
        Ok(rows)
    }

    pub async fn find_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
    ) -> Result<Option<custom_group::Model>, DomainError> {
        let found = custom_group::Entity::find_by_id(code.to_owned())
            .one(conn)
            .await?;
        Ok(found)
    }

    pub async fn insert_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
        name: &str,
        rank: i64,
    ) -> Result<(), DomainError> {
        let row = custom_group::ActiveModel {
            code: Set(code.to_owned()),
            name: Set(name.to_owned()),
            rank: Set(rank),
        };
        custom_group::Entity::insert(row).exec(conn).await?;
        Ok(())
    }

    pub async fn update_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
        name: &str,
        rank: i64,
    ) -> Result<(), DomainError> {
        let row = custom_group::ActiveModel {
            code: Set(code.to_owned()),
            name: Set(name.to_owned()),
            rank: Set(rank),
        };
        custom_group::Entity::update(row).exec(conn).await?;
        Ok(())
    }

    pub async fn delete_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
    ) -> Result<u64, DomainError> {
        let result = custom_group::Entity::delete_many()
            .filter(custom_group::Column::Code.eq(code))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }
}
