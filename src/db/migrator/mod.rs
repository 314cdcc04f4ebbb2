use sea_orm_migration::prelude::*;

mod m20261001_initial;
mod m20261008_add_superuser_invites;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_initial::Migration),
            Box::new(m20261008_add_superuser_invites::Migration),
        ]
    }
}
