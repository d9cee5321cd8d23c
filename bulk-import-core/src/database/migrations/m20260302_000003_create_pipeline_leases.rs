use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PipelineLeases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PipelineLeases::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PipelineLeases::LeaseKey)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PipelineLeases::Token).string_len(64).not_null())
                    .col(
                        ColumnDef::new(PipelineLeases::ExpiresAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PipelineLeases::CreatedAt)
                            .timestamp()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PipelineLeases::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PipelineLeases {
    Table,
    Id,
    LeaseKey,
    Token,
    ExpiresAt,
    CreatedAt,
}
