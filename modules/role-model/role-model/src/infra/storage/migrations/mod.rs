//! Schema migrations for the role-model policy store.

use sea_orm_migration::prelude::*;

mod m20250301_000001_create_policy_tables;
mod m20250301_000002_create_directory_tables;

pub struct Migrator;

impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_policy_tables::Migration),
            Box::new(m20250301_000002_create_directory_tables::Migration),
        ]
    }
}
