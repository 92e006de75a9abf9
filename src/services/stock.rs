//! FIFO consumption of inventory lots.

use sqlx::PgConnection;
use thiserror::Error;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum StockError {
    #[error("Insufficient stock: requested {requested}, available {available}")]
    Insufficient { available: f64, requested: f64 },
    #[error("Quantity must be greater than 0 (got {0})")]
    NonPositiveQuantity(f64),
}

/// A lot as seen by the consumption planner.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct LotBalance {
    pub id: i64,
    pub quantity: f64,
    #[sqlx(rename = "unit_price")]
    pub unit_cost: f64,
}

/// Quantity taken from one lot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotDraw {
    pub lot_id: i64,
    pub quantity: f64,
    pub unit_cost: f64,
}

impl LotDraw {
    pub fn cost(&self) -> f64 {
        self.quantity * self.unit_cost
    }
}

/// Cost of goods for a set of draws.
pub fn draws_cost(draws: &[LotDraw]) -> f64 {
    draws.iter().map(LotDraw::cost).sum()
}

/// Plan which lots satisfy `needed`, oldest first.
///
/// `lots` must already be in FIFO order; empty lots are skipped.
pub fn plan_consumption(lots: &[LotBalance], needed: f64) -> Result<Vec<LotDraw>, StockError> {
    if needed.is_nan() || needed <= 0.0 {
        return Err(StockError::NonPositiveQuantity(needed));
    }

    let available: f64 = lots.iter().map(|l| l.quantity.max(0.0)).sum();
    if available + EPSILON < needed {
        return Err(StockError::Insufficient { available, requested: needed });
    }

    let mut remaining = needed;
    let mut draws = Vec::new();
    for lot in lots.iter().filter(|l| l.quantity > 0.0) {
        if remaining <= EPSILON {
            break;
        }
        let take = lot.quantity.min(remaining);
        draws.push(LotDraw { lot_id: lot.id, quantity: take, unit_cost: lot.unit_cost });
        remaining -= take;
    }
    Ok(draws)
}

/// Lock every lot of `product_ids` at a branch, in ascending lot id.
///
/// Call once before any [`consume`] in the same transaction. Taking all the
/// locks up front in one global order keeps two sales over the same
/// products from deadlocking, whatever order their lines come in.
pub async fn lock_lots(conn: &mut PgConnection, branch_id: i64, product_ids: &[i64]) -> Result<(), sqlx::Error> {
    let mut ids = product_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    sqlx::query(
        r#"SELECT id FROM inventory_lots
           WHERE branch_id = $1 AND product_id = ANY($2) AND quantity > 0
           ORDER BY id
           FOR UPDATE"#,
    )
    .bind(branch_id)
    .bind(ids)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lock the product's lots at a branch, plan a FIFO draw and apply it.
pub async fn consume(
    conn: &mut PgConnection,
    product_id: i64,
    branch_id: i64,
    needed: f64,
) -> Result<Vec<LotDraw>, crate::error::AppError> {
    let lots = sqlx::query_as::<_, LotBalance>(
        r#"SELECT id, quantity, unit_price
           FROM inventory_lots
           WHERE product_id = $1 AND branch_id = $2 AND quantity > 0
           ORDER BY entry_date ASC, id ASC
           FOR UPDATE"#,
    )
    .bind(product_id)
    .bind(branch_id)
    .fetch_all(&mut *conn)
    .await?;

    let draws = plan_consumption(&lots, needed)?;

    for draw in &draws {
        sqlx::query("UPDATE inventory_lots SET quantity = GREATEST(quantity - $2, 0) WHERE id = $1")
            .bind(draw.lot_id)
            .bind(draw.quantity)
            .execute(&mut *conn)
            .await?;
    }

    Ok(draws)
}

/// Put drawn quantities back onto their lots, in ascending lot id.
pub async fn restore(conn: &mut PgConnection, draws: &[LotDraw]) -> Result<(), sqlx::Error> {
    for draw in restore_order(draws) {
        sqlx::query(
            "UPDATE inventory_lots SET quantity = LEAST(quantity + $2, initial_quantity) WHERE id = $1",
        )
        .bind(draw.lot_id)
        .bind(draw.quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Draws sorted by lot id, the order every writer takes lot locks in.
fn restore_order(draws: &[LotDraw]) -> Vec<LotDraw> {
    let mut ordered = draws.to_vec();
    ordered.sort_by_key(|d| d.lot_id);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(id: i64, quantity: f64, unit_cost: f64) -> LotBalance {
        LotBalance { id, quantity, unit_cost }
    }

    #[test]
    fn draws_oldest_lots_first() {
        let lots = [lot(1, 5.0, 10.0), lot(2, 10.0, 12.0), lot(3, 10.0, 15.0)];
        let draws = plan_consumption(&lots, 12.0).unwrap();

        assert_eq!(
            draws,
            vec![
                LotDraw { lot_id: 1, quantity: 5.0, unit_cost: 10.0 },
                LotDraw { lot_id: 2, quantity: 7.0, unit_cost: 12.0 },
            ]
        );
        assert_eq!(draws_cost(&draws), 134.0);
    }

    #[test]
    fn skips_empty_lots() {
        let lots = [lot(1, 0.0, 1.0), lot(2, 3.0, 2.0)];
        let draws = plan_consumption(&lots, 3.0).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].lot_id, 2);
    }

    #[test]
    fn never_draws_more_than_a_lot_holds() {
        let lots = [lot(1, 2.5, 1.0), lot(2, 2.5, 1.0)];
        let draws = plan_consumption(&lots, 5.0).unwrap();
        for (draw, lot) in draws.iter().zip(lots.iter()) {
            assert!(draw.quantity <= lot.quantity);
        }
    }

    #[test]
    fn short_stock_is_an_error() {
        let lots = [lot(1, 2.0, 1.0), lot(2, 1.0, 1.0)];
        assert_eq!(
            plan_consumption(&lots, 4.0),
            Err(StockError::Insufficient { available: 3.0, requested: 4.0 })
        );
        assert_eq!(plan_consumption(&[], 1.0), Err(StockError::Insufficient { available: 0.0, requested: 1.0 }));
    }

    #[test]
    fn restores_in_lot_id_order() {
        let draws = [
            LotDraw { lot_id: 9, quantity: 1.0, unit_cost: 1.0 },
            LotDraw { lot_id: 2, quantity: 2.0, unit_cost: 1.0 },
            LotDraw { lot_id: 5, quantity: 3.0, unit_cost: 1.0 },
        ];
        let ids: Vec<i64> = restore_order(&draws).iter().map(|d| d.lot_id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn rejects_non_positive_requests() {
        assert_eq!(plan_consumption(&[lot(1, 1.0, 1.0)], 0.0), Err(StockError::NonPositiveQuantity(0.0)));
    }
}
