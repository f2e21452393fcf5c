use sea_orm::entity::prelude::*;

/// Tenant directory entry. `org_key` is invariant under renames and is the
/// key incoming IAM privileges are matched against. At most one row has
/// `is_default` set.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub org_key: String,
    pub is_active: bool,
    pub is_default: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
