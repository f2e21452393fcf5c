use sea_orm::entity::prelude::*;

/// A team owns a composite custom-privilege bundle.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "team_bundles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub team_name: String,
    pub bundle: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
