use sea_orm::entity::prelude::*;

/// A configured custom privilege group. The privileges themselves are stored
/// as `role_actions` rows keyed by `code`; this table carries the display
/// name and the allocated role rank.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "custom_privilege_groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub name: String,
    pub rank: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
