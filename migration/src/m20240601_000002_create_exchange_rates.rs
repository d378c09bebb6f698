use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

/// Fractional digits kept for every rate.
const RATE_SCALE: u32 = 6;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite keeps decimals as `real` and caps the declared precision at 16
        let rate_precision = match manager.get_database_backend() {
            DatabaseBackend::Sqlite => 16,
            _ => 19,
        };

        manager
            .create_table(
                Table::create()
                    .table(ExchangeRates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExchangeRates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::BaseCurrencyId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::QuoteCurrencyId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::Rate)
                            .decimal_len(rate_precision, RATE_SCALE)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::Timestamp)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExchangeRates::Source).string_len(50).null())
                    .col(
                        ColumnDef::new(ExchangeRates::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(ColumnDef::new(ExchangeRates::CreatedBy).string_len(100).null())
                    .col(ColumnDef::new(ExchangeRates::UpdatedBy).string_len(100).null())
                    // Currencies with rates attached cannot be deleted
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_exchange_rates_base_currency")
                            .from(ExchangeRates::Table, ExchangeRates::BaseCurrencyId)
                            .to(Currencies::Table, Currencies::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_exchange_rates_quote_currency")
                            .from(ExchangeRates::Table, ExchangeRates::QuoteCurrencyId)
                            .to(Currencies::Table, Currencies::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique constraint: one rate per pair per timestamp
        manager
            .create_index(
                Index::create()
                    .name("idx_exchange_rates_pair_timestamp_unique")
                    .table(ExchangeRates::Table)
                    .col(ExchangeRates::BaseCurrencyId)
                    .col(ExchangeRates::QuoteCurrencyId)
                    .col(ExchangeRates::Timestamp)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExchangeRates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ExchangeRates {
    Table,
    Id,
    BaseCurrencyId,
    QuoteCurrencyId,
    Rate,
    Timestamp,
    Source,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}

#[derive(DeriveIden)]
enum Currencies {
    Table,
    Id,
}
