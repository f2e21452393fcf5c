use sea_orm::{ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::domain::error::DomainError;
use crate::infra::storage::entity::{
    global_grant, inner_source_action, inner_source_project, role_action, role_grant,
};

/// Repository for the coarse policy kinds: role grants, the inner-source
/// pool, global grants, and the role/action grouping rows.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolicyRepository;

impl PolicyRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub async fn find_grant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        tenant_id: &str,
        org_id: i64,
    ) -> Result<Option<role_grant::Model>, DomainError> {
        let found = role_grant::Entity::find()
            .filter(role_grant::Column::SubjectId.eq(subject_id))
            .filter(role_grant::Column::TenantId.eq(tenant_id))
            .filter(role_grant::Column::OrgId.eq(org_id))
            .one(conn)
            .await?;
        Ok(found)
    }

    /// The grant a user holds on an organization regardless of tenant. Used
    /// to locate a conflicting prior grant whose tenant must be preserved.
    pub async fn find_grant_by_user_org<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        org_id: i64,
    ) -> Result<Option<role_grant::Model>, DomainError> {
        let found = role_grant::Entity::find()
            .filter(role_grant::Column::SubjectId.eq(subject_id))
            .filter(role_grant::Column::OrgId.eq(org_id))
            .one(conn)
            .await?;
        Ok(found)
    }

    pub async fn insert_grant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        tenant_id: &str,
        org_id: i64,
        role: &str,
    ) -> Result<(), DomainError> {
        let row = role_grant::ActiveModel {
            id: NotSet,
            subject_id: Set(subject_id),
            tenant_id: Set(tenant_id.to_owned()),
            org_id: Set(org_id),
            role: Set(role.to_owned()),
        };
        role_grant::Entity::insert(row).exec(conn).await?;
        Ok(())
    }

    pub async fn delete_grant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        tenant_id: &str,
        org_id: i64,
        role: &str,
    ) -> Result<u64, DomainError> {
        let result = role_grant::Entity::delete_many()
            .filter(role_grant::Column::SubjectId.eq(subject_id))
            .filter(role_grant::Column::TenantId.eq(tenant_id))
            .filter(role_grant::Column::OrgId.eq(org_id))
            .filter(role_grant::Column::Role.eq(role))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn grants_by_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
    ) -> Result<Vec<role_grant::Model>, DomainError> {
        let rows = role_grant::Entity::find()
            .filter(role_grant::Column::SubjectId.eq(subject_id))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn grants_by_user_tenant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        tenant_id: &str,
    ) -> Result<Vec<role_grant::Model>, DomainError> {
        let rows = role_grant::Entity::find()
            .filter(role_grant::Column::SubjectId.eq(subject_id))
            .filter(role_grant::Column::TenantId.eq(tenant_id))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn grants_by_tenant<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: &str,
    ) -> Result<Vec<role_grant::Model>, DomainError> {
        let rows = role_grant::Entity::find()
            .filter(role_grant::Column::TenantId.eq(tenant_id))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn grants_by_org<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
    ) -> Result<Vec<role_grant::Model>, DomainError> {
        let rows = role_grant::Entity::find()
            .filter(role_grant::Column::OrgId.eq(org_id))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn grants_by_tenant_org<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: &str,
        org_id: i64,
    ) -> Result<Vec<role_grant::Model>, DomainError> {
        let rows = role_grant::Entity::find()
            .filter(role_grant::Column::TenantId.eq(tenant_id))
            .filter(role_grant::Column::OrgId.eq(org_id))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn grants_by_role<C: ConnectionTrait>(
        &self,
        conn: &C,
        role: &str,
    ) -> Result<Vec<role_grant::Model>, DomainError> {
        let rows = role_grant::Entity::find()
            .filter(role_grant::Column::Role.eq(role))
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn all_grants<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<Vec<role_grant::Model>, DomainError> {
        let rows = role_grant::Entity::find().all(conn).await?;
        Ok(rows)
    }

    pub async fn is_inner_source<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
    ) -> Result<bool, DomainError> {
        let found = inner_source_project::Entity::find()
            .filter(inner_source_project::Column::OrgId.eq(org_id))
            .one(conn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn add_inner_source<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
        action: &str,
    ) -> Result<(), DomainError> {
        if self.is_inner_source(conn, org_id).await? {
            return Ok(());
        }
        let row = inner_source_project::ActiveModel {
            id: NotSet,
            org_id: Set(org_id),
            action: Set(action.to_owned()),
        };
        inner_source_project::Entity::insert(row).exec(conn).await?;
        Ok(())
    }

    pub async fn remove_inner_source<C: ConnectionTrait>(
        &self,
        conn: &C,
        org_id: i64,
    ) -> Result<u64, DomainError> {
        let result = inner_source_project::Entity::delete_many()
            .filter(inner_source_project::Column::OrgId.eq(org_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn has_global_grant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        role: &str,
    ) -> Result<bool, DomainError> {
        let found = global_grant::Entity::find()
            .filter(global_grant::Column::SubjectId.eq(subject_id))
            .filter(global_grant::Column::Role.eq(role))
            .one(conn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn insert_global_grant<C: ConnectionTrait>(
        &self,
        conn: &C,
        subject_id: i64,
        role: &str,
    ) -> Result<(), DomainError> {
        if self.has_global_grant(conn, subject_id, role).await? {
            return Ok(());
        }
        let row = global_grant::ActiveModel {
            id: NotSet,
            subject_id: Set(subject_id),
            role: Set(role.to_owned()),
        };
        global_grant::Entity::insert(row).exec(conn).await?;
        Ok(())
    }

    /// Direct children of a role code in the inheritance graph: action codes
    /// and, for the technical user, other role codes.
    pub async fn children_of<C: ConnectionTrait>(
        &self,
        conn: &C,
        role: &str,
    ) -> Result<Vec<String>, DomainError> {
        let rows = role_action::Entity::find()
            .filter(role_action::Column::Role.eq(role))
            .all(conn)
            .await?;
        Ok(rows.into_iter().map(|r| r.action).collect())
    }

    pub async fn ensure_role_action<C: ConnectionTrait>(
        &self,
        conn: &C,
        role: &str,
        action: &str,
    ) -> Result<(), DomainError> {
        let found = role_action::Entity::find()
            .filter(role_action::Column::Role.eq(role))
            .filter(role_action::Column::Action.eq(action))
            .one(conn)
            .await?;
        if found.is_some() {
            return Ok(());
        }
        let row = role_action::ActiveModel {
            id: NotSet,
            role: Set(role.to_owned()),
            action: Set(action.to_owned()),
        };
        role_action::Entity::insert(row).exec(conn).await?;
        Ok(())
    }

    pub async fn delete_role_actions<C: ConnectionTrait>(
        &self,
        conn: &C,
        role: &str,
    ) -> Result<u64, DomainError> {
        let result = role_action::Entity::delete_many()
            .filter(role_action::Column::Role.eq(role))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn inner_source_actions<C: ConnectionTrait>(
        &self,
        conn: &C,
        source: &str,
    ) -> Result<Vec<String>, DomainError> {
        let rows = inner_source_action::Entity::find()
            .filter(inner_source_action::Column::Source.eq(source))
            .all(conn)
            .await?;
        Ok(rows.into_iter().map(|r| r.action).collect())
    }

    pub async fn ensure_inner_source_action<C: ConnectionTrait>(
        &self,
        conn: &C,
        source: &str,
        action: &str,
    ) -> Result<(), DomainError> {
        let found = inner_source_action::Entity::find()
            .filter(inner_source_action::Column::Source.eq(source))
            .filter(inner_source_action::Column::Action.eq(action))
            .one(conn)
            .await?;
        if found.is_some() {
            return Ok(());
        }
        let row = inner_source_action::ActiveModel {
            id: NotSet,
            source: Set(source.to_owned()),
            action: Set(action.to_owned()),
        };
        inner_source_action::Entity::insert(row).exec(conn).await?;
        Ok(())
    }
}
