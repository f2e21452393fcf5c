use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tenants::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Tenants::Name).string().not_null())
                    .col(ColumnDef::new(Tenants::OrgKey).string().not_null())
                    .col(ColumnDef::new(Tenants::IsActive).boolean().not_null())
                    .col(ColumnDef::new(Tenants::IsDefault).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tenants_org_key")
                    .table(Tenants::Table)
                    .col(Tenants::OrgKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organizations::Name).string().not_null())
                    .col(ColumnDef::new(Organizations::LowerName).string().not_null())
                    .col(ColumnDef::new(Organizations::Visibility).string().not_null())
                    .col(ColumnDef::new(Organizations::IsActive).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TenantOrganizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TenantOrganizations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TenantOrganizations::TenantId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TenantOrganizations::OrgId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).big_integer().not_null().primary_key())
                    .col(ColumnDef::new(Users::Login).string().not_null())
                    .col(ColumnDef::new(Users::IsActive).boolean().not_null())
                    .col(ColumnDef::new(Users::Visibility).string().not_null())
                    .col(ColumnDef::new(Users::IsAdmin).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Teams::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Teams::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Teams::OrgId).big_integer().not_null())
                    .col(ColumnDef::new(Teams::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_teams_org_name")
                    .table(Teams::Table)
                    .col(Teams::OrgId)
                    .col(Teams::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TeamUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TeamUsers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TeamUsers::TeamId).big_integer().not_null())
                    .col(ColumnDef::new(TeamUsers::UserId).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_team_users_pair")
                    .table(TeamUsers::Table)
                    .col(TeamUsers::TeamId)
                    .col(TeamUsers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TeamUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Teams::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TenantOrganizations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    Name,
    OrgKey,
    IsActive,
    IsDefault,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    LowerName,
    Visibility,
    IsActive,
}

#[derive(DeriveIden)]
enum TenantOrganizations {
    Table,
    Id,
    TenantId,
    OrgId,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Login,
    IsActive,
    Visibility,
    IsAdmin,
}

#[derive(DeriveIden)]
enum Teams {
    Table,
    Id,
    OrgId,
    Name,
}

#[derive(DeriveIden)]
enum TeamUsers {
    Table,
    Id,
    TeamId,
    UserId,
}
