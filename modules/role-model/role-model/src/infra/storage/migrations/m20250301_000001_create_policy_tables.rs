use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RoleGrants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoleGrants::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoleGrants::SubjectId).big_integer().not_null())
                    .col(ColumnDef::new(RoleGrants::TenantId).string().not_null())
                    .col(ColumnDef::new(RoleGrants::OrgId).big_integer().not_null())
                    .col(ColumnDef::new(RoleGrants::Role).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_role_grants_triple")
                    .table(RoleGrants::Table)
                    .col(RoleGrants::SubjectId)
                    .col(RoleGrants::TenantId)
                    .col(RoleGrants::OrgId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_role_grants_org")
                    .table(RoleGrants::Table)
                    .col(RoleGrants::OrgId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InnerSourceProjects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InnerSourceProjects::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InnerSourceProjects::OrgId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(InnerSourceProjects::Action).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GlobalGrants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GlobalGrants::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GlobalGrants::SubjectId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(GlobalGrants::Role).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TeamGrants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TeamGrants::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TeamGrants::SubjectId).big_integer().not_null())
                    .col(ColumnDef::new(TeamGrants::TenantId).string().not_null())
                    .col(ColumnDef::new(TeamGrants::OrgId).big_integer().not_null())
                    .col(ColumnDef::new(TeamGrants::TeamName).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_team_grants_quad")
                    .table(TeamGrants::Table)
                    .col(TeamGrants::SubjectId)
                    .col(TeamGrants::TenantId)
                    .col(TeamGrants::OrgId)
                    .col(TeamGrants::TeamName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RepoPrivileges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RepoPrivileges::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RepoPrivileges::TeamName).string().not_null())
                    .col(ColumnDef::new(RepoPrivileges::OrgId).big_integer().not_null())
                    .col(ColumnDef::new(RepoPrivileges::RepoId).big_integer().not_null())
                    .col(ColumnDef::new(RepoPrivileges::Bundle).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repo_privileges_target")
                    .table(RepoPrivileges::Table)
                    .col(RepoPrivileges::TeamName)
                    .col(RepoPrivileges::OrgId)
                    .col(RepoPrivileges::RepoId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoleActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoleActions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoleActions::Role).string().not_null())
                    .col(ColumnDef::new(RoleActions::Action).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_role_actions_pair")
                    .table(RoleActions::Table)
                    .col(RoleActions::Role)
                    .col(RoleActions::Action)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InnerSourceActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InnerSourceActions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InnerSourceActions::Source).string().not_null())
                    .col(ColumnDef::new(InnerSourceActions::Action).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TeamBundles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TeamBundles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TeamBundles::TeamName).string().not_null())
                    .col(ColumnDef::new(TeamBundles::Bundle).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomPrivilegeGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomPrivilegeGroups::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CustomPrivilegeGroups::Name).string().not_null())
                    .col(
                        ColumnDef::new(CustomPrivilegeGroups::Rank)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomPrivilegeGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TeamBundles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InnerSourceActions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoleActions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RepoPrivileges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TeamGrants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GlobalGrants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InnerSourceProjects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoleGrants::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum RoleGrants {
    Table,
    Id,
    SubjectId,
    TenantId,
    OrgId,
    Role,
}

#[derive(DeriveIden)]
enum InnerSourceProjects {
    Table,
    Id,
    OrgId,
    Action,
}

#[derive(DeriveIden)]
enum GlobalGrants {
    Table,
    Id,
    SubjectId,
    Role,
}

#[derive(DeriveIden)]
enum TeamGrants {
    Table,
    Id,
    SubjectId,
    TenantId,
    OrgId,
    TeamName,
}

#[derive(DeriveIden)]
enum RepoPrivileges {
    Table,
    Id,
    TeamName,
    OrgId,
    RepoId,
    Bundle,
}

#[derive(DeriveIden)]
enum RoleActions {
    Table,
    Id,
    Role,
    Action,
}

#[derive(DeriveIden)]
enum InnerSourceActions {
    Table,
    Id,
    Source,
    Action,
}

#[derive(DeriveIden)]
enum TeamBundles {
    Table,
    Id,
    TeamName,
    Bundle,
}

#[derive(DeriveIden)]
enum CustomPrivilegeGroups {
    Table,
    Code,
    Name,
    Rank,
}
