pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_bulk_import_tables;
mod m20260301_000002_create_pipeline_batches;
mod m20260302_000003_create_pipeline_leases;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_bulk_import_tables::Migration),
            Box::new(m20260301_000002_create_pipeline_batches::Migration),
            Box::new(m20260302_000003_create_pipeline_leases::Migration),
        ]
    }
}
