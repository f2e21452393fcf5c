use sea_orm::entity::prelude::*;

/// A user holds a role on an organization within a tenant.
///
/// At most one row exists per `(subject_id, tenant_id, org_id)`; granting a
/// different role replaces the previous row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "role_grants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub subject_id: i64,
    pub tenant_id: String,
    pub org_id: i64,
    pub role: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
