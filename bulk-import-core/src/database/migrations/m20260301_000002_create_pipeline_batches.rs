use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PipelineBatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PipelineBatches::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PipelineBatches::TrackerId).integer().not_null())
                    .col(
                        ColumnDef::new(PipelineBatches::BatchNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PipelineBatches::Status)
                            .string_len(32)
                            .not_null()
                            .default("created"),
                    )
                    .col(
                        ColumnDef::new(PipelineBatches::CreatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PipelineBatches::UpdatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pipeline_batches_tracker")
                            .from(PipelineBatches::Table, PipelineBatches::TrackerId)
                            .to(PipelineTrackers::Table, PipelineTrackers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per batch number keeps find-or-create idempotent across workers
        manager
            .create_index(
                Index::create()
                    .name("idx_pipeline_batches_tracker_number")
                    .table(PipelineBatches::Table)
                    .col(PipelineBatches::TrackerId)
                    .col(PipelineBatches::BatchNumber)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PipelineBatches::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PipelineBatches {
    Table,
    Id,
    TrackerId,
    BatchNumber,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PipelineTrackers {
    Table,
    Id,
}
