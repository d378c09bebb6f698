//! `SeaORM` Entity for exchange_rates table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exchange_rates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub base_currency_id: i32,
    pub quote_currency_id: i32,
    /// Units of quote currency per one unit of base currency
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub rate: Decimal,
    /// Observation time; midday of the quote date for provider rates
    pub timestamp: DateTime,
    /// "MANUAL" or the provider name
    pub source: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::currencies::Entity",
        from = "Column::BaseCurrencyId",
        to = "super::currencies::Column::Id",
        on_delete = "Restrict"
    )]
    BaseCurrency,
    #[sea_orm(
        belongs_to = "super::currencies::Entity",
        from = "Column::QuoteCurrencyId",
        to = "super::currencies::Column::Id",
        on_delete = "Restrict"
    )]
    QuoteCurrency,
}

impl ActiveModelBehavior for ActiveModel {}
