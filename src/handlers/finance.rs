//! Income statement and financial position built from stored records.

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;

use crate::dtos::finance::{FinancialPosition, FinancialStatement, IncomeStatement, StatementQuery};
use crate::error::AppError;
use crate::models::fixed_asset::FixedAsset;
use crate::services::costing::round2;
use crate::services::depreciation;
use crate::state::AppState;

/// Period totals the income statement is derived from.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
struct SalesTotals {
    revenue: f64,
    tax: f64,
    cost: f64,
}

fn build_income_statement(sales: SalesTotals, logistics_expenses: f64, depreciation: f64) -> IncomeStatement {
    let gross_margin = sales.revenue - sales.cost;
    IncomeStatement {
        revenue: round2(sales.revenue),
        tax_collected: round2(sales.tax),
        cost_of_sales: round2(sales.cost),
        gross_margin: round2(gross_margin),
        logistics_expenses: round2(logistics_expenses),
        depreciation: round2(depreciation),
        net_result: round2(gross_margin - logistics_expenses - depreciation),
    }
}

/// Depreciation expense over the period and book value at its end.
fn asset_figures(assets: &[FixedAsset], from: NaiveDate, to: NaiveDate) -> (f64, f64) {
    assets
        .iter()
        .filter(|a| a.acquisition_date <= to)
        .fold((0.0, 0.0), |(expense, book), a| {
            let period = depreciation::expense_between(
                a.acquisition_cost,
                a.useful_life_years,
                a.acquisition_date,
                from,
                to,
            );
            let value = depreciation::snapshot(a.acquisition_cost, a.useful_life_years, a.acquisition_date, to)
                .current_value;
            (expense + period, book + value)
        })
}

pub async fn get_statement(
    State(state): State<AppState>,
    Query(params): Query<StatementQuery>,
) -> Result<Json<FinancialStatement>, AppError> {
    if params.from > params.to {
        return Err(AppError::validation("'from' must not be after 'to'"));
    }

    let pool = &state.db_pool;

    let sales = sqlx::query_as::<_, SalesTotals>(
        r#"SELECT COALESCE(SUM(subtotal), 0) AS revenue,
                  COALESCE(SUM(tax), 0) AS tax,
                  COALESCE(SUM(cost), 0) AS cost
           FROM sales
           WHERE status = 'Completada'
             AND sale_date BETWEEN $1 AND $2
             AND ($3::BIGINT IS NULL OR branch_id = $3)"#,
    )
    .bind(params.from)
    .bind(params.to)
    .bind(params.branch_id)
    .fetch_one(pool)
    .await?;

    // Vehicles are not tied to a branch, so expenses are company-wide
    let expenses: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM logistics_expenses WHERE expense_date BETWEEN $1 AND $2",
    )
    .bind(params.from)
    .bind(params.to)
    .fetch_one(pool)
    .await?;

    let assets = sqlx::query_as::<_, FixedAsset>(
        r#"SELECT id, name, category, branch_id, acquisition_cost, acquisition_date, useful_life_years, created_at
           FROM fixed_assets
           WHERE ($1::BIGINT IS NULL OR branch_id = $1)"#,
    )
    .bind(params.branch_id)
    .fetch_all(pool)
    .await?;
    let (depreciation_expense, book_value) = asset_figures(&assets, params.from, params.to);

    let receivables: f64 = sqlx::query_scalar("SELECT COALESCE(SUM(credit_used), 0) FROM clients")
        .fetch_one(pool)
        .await?;
    let payables: f64 = sqlx::query_scalar("SELECT COALESCE(SUM(credit_used), 0) FROM suppliers")
        .fetch_one(pool)
        .await?;
    let inventory_valuation: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity * unit_price), 0) FROM inventory_lots WHERE ($1::BIGINT IS NULL OR branch_id = $1)",
    )
    .bind(params.branch_id)
    .fetch_one(pool)
    .await?;

    tracing::debug!(from = %params.from, to = %params.to, branch_id = ?params.branch_id, "Financial statement built");

    Ok(Json(FinancialStatement {
        from: params.from,
        to: params.to,
        branch_id: params.branch_id,
        income: build_income_statement(sales, expenses, depreciation_expense),
        position: FinancialPosition {
            receivables: round2(receivables),
            payables: round2(payables),
            inventory_valuation: round2(inventory_valuation),
            fixed_assets_book_value: round2(book_value),
        },
    }))
}
