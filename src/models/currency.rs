use serde::{Deserialize, Serialize};

use crate::entities::currencies;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyResponse {
    pub id: i32,
    pub code: String,
    pub name: String,
}

impl From<currencies::Model> for CurrencyResponse {
    fn from(model: currencies::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
        }
    }
}
