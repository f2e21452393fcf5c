use sea_orm::entity::prelude::*;

/// A team carries a composite custom-privilege bundle over one repository.
///
/// `bundle` is the canonical composite name (sorted, deduplicated short
/// codes joined with `_`, e.g. `vB_chB_cPR`). One row per
/// `(team_name, org_id, repo_id)`; conflicting assignments are merged by
/// short-code union.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "repo_privileges")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub team_name: String,
    pub org_id: i64,
    pub repo_id: i64,
    pub bundle: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
