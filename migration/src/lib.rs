pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_currencies;
mod m20240601_000002_create_exchange_rates;
mod m20240601_000003_create_sync_status;
mod m20240601_000004_seed_currencies;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_currencies::Migration),
            Box::new(m20240601_000002_create_exchange_rates::Migration),
            Box::new(m20240601_000003_create_sync_status::Migration),
            Box::new(m20240601_000004_seed_currencies::Migration),
        ]
    }
}
