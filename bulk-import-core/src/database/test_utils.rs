use chrono::Utc;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

use crate::database::entities::{bulk_import_entities, bulk_imports, pipeline_trackers};

pub async fn setup_test_db() -> DatabaseConnection {
    // Create an in-memory SQLite database for testing
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");

    // Run migrations
    use sea_orm_migration::MigratorTrait;
    crate::database::migrations::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Insert a bulk import with one project entity in the given status
pub async fn seed_entity(db: &DatabaseConnection, status: &str) -> bulk_import_entities::Model {
    let now = Utc::now();
    let bulk_import = bulk_imports::ActiveModel {
        source_url: Set("https://source.example.com".to_string()),
        source_version: Set(Some("17.1.0".to_string())),
        status: Set("started".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create bulk import");

    bulk_import_entities::ActiveModel {
        bulk_import_id: Set(bulk_import.id),
        source_type: Set("project_entity".to_string()),
        source_full_path: Set("acme/widgets".to_string()),
        status: Set(status.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create entity")
}

pub async fn seed_tracker(
    db: &DatabaseConnection,
    entity_id: i32,
    pipeline_name: &str,
    status: &str,
) -> pipeline_trackers::Model {
    let now = Utc::now();
    pipeline_trackers::ActiveModel {
        entity_id: Set(entity_id),
        pipeline_name: Set(pipeline_name.to_string()),
        stage: Set(0),
        status: Set(status.to_string()),
        batched: Set(false),
        jid: Set(None),
        created_at: Set(Some(now)),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create tracker")
}
