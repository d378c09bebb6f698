use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Currencies the default sync matrix quotes against each other.
const SEED_CURRENCIES: [(&str, &str); 4] = [
    ("USD", "US Dollar"),
    ("EUR", "Euro"),
    ("JPY", "Japanese Yen"),
    ("GBP", "British Pound"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert
            .into_table(Currencies::Table)
            .columns([Currencies::Code, Currencies::Name])
            .on_conflict(OnConflict::column(Currencies::Code).do_nothing().to_owned());

        for (code, name) in SEED_CURRENCIES {
            insert.values_panic([code.into(), name.into()]);
        }

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let codes: Vec<&str> = SEED_CURRENCIES.iter().map(|(code, _)| *code).collect();

        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Currencies::Table)
                    .and_where(Expr::col(Currencies::Code).is_in(codes))
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Currencies {
    Table,
    Code,
    Name,
}
