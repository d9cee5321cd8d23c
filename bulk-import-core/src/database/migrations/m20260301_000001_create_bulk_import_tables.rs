use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BulkImports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BulkImports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BulkImports::SourceUrl).string().not_null())
                    .col(ColumnDef::new(BulkImports::SourceVersion).string())
                    .col(
                        ColumnDef::new(BulkImports::Status)
                            .string_len(32)
                            .not_null()
                            .default("created"),
                    )
                    .col(
                        ColumnDef::new(BulkImports::CreatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BulkImports::UpdatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BulkImportEntities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BulkImportEntities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BulkImportEntities::BulkImportId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BulkImportEntities::SourceType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BulkImportEntities::SourceFullPath)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BulkImportEntities::Status)
                            .string_len(32)
                            .not_null()
                            .default("created"),
                    )
                    .col(
                        ColumnDef::new(BulkImportEntities::CreatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BulkImportEntities::UpdatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bulk_import_entities_bulk_import")
                            .from(BulkImportEntities::Table, BulkImportEntities::BulkImportId)
                            .to(BulkImports::Table, BulkImports::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PipelineTrackers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PipelineTrackers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PipelineTrackers::EntityId).integer().not_null())
                    .col(
                        ColumnDef::new(PipelineTrackers::PipelineName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PipelineTrackers::Stage)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PipelineTrackers::Status)
                            .string_len(32)
                            .not_null()
                            .default("created"),
                    )
                    .col(
                        ColumnDef::new(PipelineTrackers::Batched)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PipelineTrackers::Jid).string())
                    .col(ColumnDef::new(PipelineTrackers::CreatedAt).timestamp())
                    .col(
                        ColumnDef::new(PipelineTrackers::UpdatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pipeline_trackers_entity")
                            .from(PipelineTrackers::Table, PipelineTrackers::EntityId)
                            .to(BulkImportEntities::Table, BulkImportEntities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pipeline_trackers_entity_stage")
                    .table(PipelineTrackers::Table)
                    .col(PipelineTrackers::EntityId)
                    .col(PipelineTrackers::Stage)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ImportFailures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImportFailures::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ImportFailures::EntityId).integer().not_null())
                    .col(
                        ColumnDef::new(ImportFailures::PipelineClass)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ImportFailures::PipelineStep)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ImportFailures::ExceptionClass)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ImportFailures::ExceptionMessage)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ImportFailures::CorrelationIdValue)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ImportFailures::CreatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_import_failures_entity")
                            .from(ImportFailures::Table, ImportFailures::EntityId)
                            .to(BulkImportEntities::Table, BulkImportEntities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ImportFailures::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PipelineTrackers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BulkImportEntities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BulkImports::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BulkImports {
    Table,
    Id,
    SourceUrl,
    SourceVersion,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum BulkImportEntities {
    Table,
    Id,
    BulkImportId,
    SourceType,
    SourceFullPath,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PipelineTrackers {
    Table,
    Id,
    EntityId,
    PipelineName,
    Stage,
    Status,
    Batched,
    Jid,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ImportFailures {
    Table,
    Id,
    EntityId,
    PipelineClass,
    PipelineStep,
    ExceptionClass,
    ExceptionMessage,
    CorrelationIdValue,
    CreatedAt,
}
