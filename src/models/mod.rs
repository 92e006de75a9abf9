pub mod branch;
pub mod fixed_asset;
pub mod inventory;
pub mod logistics;
pub mod notification;
pub mod party;
pub mod product;
pub mod purchase;
pub mod quote;
pub mod sale;
pub mod user;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method")]
pub enum PaymentMethod {
    #[sqlx(rename = "Efectivo")]
    #[serde(rename = "Efectivo")]
    Cash,
    #[sqlx(rename = "Transferencia")]
    #[serde(rename = "Transferencia")]
    Transfer,
    #[sqlx(rename = "Tarjeta")]
    #[serde(rename = "Tarjeta")]
    Card,
    #[sqlx(rename = "Crédito")]
    #[serde(rename = "Crédito", alias = "Credito")]
    Credit,
}

impl PaymentMethod {
    pub fn is_credit(self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }
}
