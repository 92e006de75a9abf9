use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

#[derive(Debug, Deserialize)]
pub struct StatementQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub branch_id: Option<i64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct IncomeStatement {
    pub revenue: f64,
    pub tax_collected: f64,
    pub cost_of_sales: f64,
    pub gross_margin: f64,
    pub logistics_expenses: f64,
    pub depreciation: f64,
    pub net_result: f64,
}

#[derive(Debug, Serialize)]
pub struct FinancialPosition {
    pub receivables: f64,
    pub payables: f64,
    pub inventory_valuation: f64,
    pub fixed_assets_book_value: f64,
}

#[derive(Debug, Serialize)]
pub struct FinancialStatement {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub branch_id: Option<i64>,
    pub income: IncomeStatement,
    pub position: FinancialPosition,
}
