use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LotQueryParams {
    pub product_id: Option<i64>,
    pub branch_id: Option<i64>,
    #[serde(default)]
    pub only_available: bool,
}

#[derive(Debug, Deserialize)]
pub struct StockQueryParams {
    pub branch_id: Option<i64>,
}
