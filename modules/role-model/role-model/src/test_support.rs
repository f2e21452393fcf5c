#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Shared helpers for service tests: an in-memory `SQLite` database with the
//! crate's migrations applied, plus directory seeding.

use std::collections::BTreeMap;

use sea_orm::{ActiveValue::NotSet, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;

use crate::config::{CustomGroupConfig, RoleModelConfig};
use crate::infra::storage::entity::{organization, team, team_user, tenant, tenant_organization, user};
use crate::infra::storage::migrations::Migrator;
use crate::module::RoleModel;

/// In-memory database with a single connection so every query sees the same
/// `SQLite` instance.
pub(crate) async fn inmem_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1);
    let db = Database::connect(opts)
        .await
        .expect("failed to connect to in-memory database");
    Migrator::up(&db, None).await.expect("failed to run migrations");
    db
}

pub(crate) fn enabled_config() -> RoleModelConfig {
    RoleModelConfig {
        tenant_with_role_model_enabled: true,
        multi_tenant_enabled: true,
        ..RoleModelConfig::default()
    }
}

pub(crate) fn config_with_groups(groups: &[(&str, &str, &str)]) -> RoleModelConfig {
    let custom_groups: BTreeMap<String, CustomGroupConfig> = groups
        .iter()
        .map(|(code, name, privileges)| {
            (
                (*code).to_owned(),
                CustomGroupConfig {
                    name: (*name).to_owned(),
                    privileges: (*privileges).to_owned(),
                },
            )
        })
        .collect();
    RoleModelConfig {
        custom_groups_enabled: true,
        custom_groups,
        ..enabled_config()
    }
}

/// A bootstrapped module over a fresh in-memory database.
pub(crate) async fn bootstrapped_module(config: RoleModelConfig) -> (RoleModel, DatabaseConnection) {
    let db = inmem_db().await;
    let module = RoleModel::new(config);
    module.init(&db).await.expect("bootstrap failed");
    (module, db)
}

pub(crate) async fn seed_tenant(
    db: &DatabaseConnection,
    id: &str,
    name: &str,
    org_key: &str,
    is_default: bool,
) {
    let row = tenant::ActiveModel {
        id: Set(id.to_owned()),
        name: Set(name.to_owned()),
        org_key: Set(org_key.to_owned()),
        is_active: Set(true),
        is_default: Set(is_default),
    };
    tenant::Entity::insert(row).exec(db).await.expect("failed to seed tenant");
}

pub(crate) async fn seed_org(db: &DatabaseConnection, id: i64, name: &str, tenant_id: &str) {
    let row = organization::ActiveModel {
        id: Set(id),
        name: Set(name.to_owned()),
        lower_name: Set(name.to_lowercase()),
        visibility: Set("public".to_owned()),
        is_active: Set(true),
    };
    organization::Entity::insert(row)
        .exec(db)
        .await
        .expect("failed to seed organization");
    let link = tenant_organization::ActiveModel {
        id: NotSet,
        tenant_id: Set(tenant_id.to_owned()),
        org_id: Set(id),
    };
    tenant_organization::Entity::insert(link)
        .exec(db)
        .await
        .expect("failed to seed tenant link");
}

pub(crate) async fn seed_user(db: &DatabaseConnection, id: i64, login: &str) {
    seed_user_with_flags(db, id, login, false).await;
}

pub(crate) async fn seed_user_with_flags(
    db: &DatabaseConnection,
    id: i64,
    login: &str,
    is_admin: bool,
) {
    let row = user::ActiveModel {
        id: Set(id),
        login: Set(login.to_owned()),
        is_active: Set(true),
        visibility: Set("public".to_owned()),
        is_admin: Set(is_admin),
    };
    user::Entity::insert(row).exec(db).await.expect("failed to seed user");
}

pub(crate) async fn seed_team(db: &DatabaseConnection, org_id: i64, name: &str) -> i64 {
    let row = team::ActiveModel {
        id: NotSet,
        org_id: Set(org_id),
        name: Set(name.to_owned()),
    };
    let inserted = team::Entity::insert(row).exec(db).await.expect("failed to seed team");
    inserted.last_insert_id
}

pub(crate) async fn seed_team_member(db: &DatabaseConnection, team_id: i64, user_id: i64) {
    let row = team_user::ActiveModel {
        id: NotSet,
        team_id: Set(team_id),
        user_id: Set(user_id),
    };
    team_user::Entity::insert(row)
        .exec(db)
        .await
        .expect("failed to seed team member");
}
