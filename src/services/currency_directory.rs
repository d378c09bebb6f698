//! Currency lookups by ISO code or id.

use moka::future::Cache;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use std::time::Duration;

use crate::entities::{currencies, prelude::*};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct CurrencyDirectory {
    db: DatabaseConnection,
    by_code: Arc<Cache<String, currencies::Model>>,
}

impl CurrencyDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        // Identities never change once created, only misses hit the database
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(600))
            .build();

        Self {
            db,
            by_code: Arc::new(cache),
        }
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<currencies::Model>, DbErr> {
        let code = code.trim().to_uppercase();

        if let Some(cached) = self.by_code.get(&code).await {
            return Ok(Some(cached));
        }

        let found = Currencies::find()
            .filter(currencies::Column::Code.eq(code.as_str()))
            .one(&self.db)
            .await?;

        if let Some(currency) = &found {
            self.by_code.insert(code, currency.clone()).await;
        }

        Ok(found)
    }

    /// Like [`find_by_code`](Self::find_by_code) but absence is an error.
    pub async fn require_code(&self, code: &str) -> AppResult<currencies::Model> {
        self.find_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Currency not found with code: {}", code)))
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<currencies::Model> {
        Currencies::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Currency not found with id: {}", id)))
    }

    pub async fn list_all(&self) -> Result<Vec<currencies::Model>, DbErr> {
        Currencies::find()
            .order_by_asc(currencies::Column::Code)
            .all(&self.db)
            .await
    }
}
