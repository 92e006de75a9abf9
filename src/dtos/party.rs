use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreatePartyRequest {
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub credit_limit: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePartyRequest {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub credit_limit: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreditPaymentRequest {
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct CreditPaymentResponse {
    pub id: i64,
    pub amount_paid: f64,
    pub credit_limit: f64,
    pub credit_used: f64,
    pub credit_available: f64,
}
