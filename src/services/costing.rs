//! Purchase cost proration.
//!
//! Associated costs flagged for proration are spread over the purchase
//! lines in proportion to each line's subtotal. The resulting real unit cost
//! is what a received lot is valued at and what the product's `cost` is
//! overwritten with.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CostingError {
    #[error("Purchase must contain at least one item")]
    NoLines,
    #[error("Quantity must be greater than 0 (line {0})")]
    NonPositiveQuantity(usize),
    #[error("Unit cost cannot be negative (line {0})")]
    NegativeUnitCost(usize),
    #[error("Associated cost '{0}' cannot be negative")]
    NegativeCost(String),
}

#[derive(Debug, Clone, Copy)]
pub struct CostLine {
    pub quantity: f64,
    pub unit_cost: f64,
}

impl CostLine {
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_cost
    }
}

#[derive(Debug, Clone)]
pub struct AssociatedCost {
    pub description: String,
    pub amount: f64,
    pub prorate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProratedLine {
    pub subtotal: f64,
    /// This line's part of the prorated associated costs
    pub prorated_share: f64,
    /// (subtotal + share) / quantity, 4 decimals
    pub real_unit_cost: f64,
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sum of the associated costs that are spread over the lines.
pub fn prorated_total(costs: &[AssociatedCost]) -> f64 {
    costs.iter().filter(|c| c.prorate).map(|c| c.amount).sum()
}

/// Purchase total: every line subtotal plus every associated cost, prorated or not.
pub fn purchase_total(lines: &[CostLine], costs: &[AssociatedCost]) -> f64 {
    let items: f64 = lines.iter().map(CostLine::subtotal).sum();
    let extra: f64 = costs.iter().map(|c| c.amount).sum();
    items + extra
}

pub fn validate(lines: &[CostLine], costs: &[AssociatedCost]) -> Result<(), CostingError> {
    if lines.is_empty() {
        return Err(CostingError::NoLines);
    }
    for (idx, line) in lines.iter().enumerate() {
        if line.quantity.is_nan() || line.quantity <= 0.0 {
            return Err(CostingError::NonPositiveQuantity(idx));
        }
        if line.unit_cost < 0.0 {
            return Err(CostingError::NegativeUnitCost(idx));
        }
    }
    if let Some(bad) = costs.iter().find(|c| c.amount < 0.0) {
        return Err(CostingError::NegativeCost(bad.description.clone()));
    }
    Ok(())
}

/// Spread prorated associated costs over `lines`.
///
/// Weights are subtotal shares. When every subtotal is zero (all lines free)
/// the weights fall back to quantity shares so the costs still land somewhere.
pub fn prorate(lines: &[CostLine], costs: &[AssociatedCost]) -> Result<Vec<ProratedLine>, CostingError> {
    validate(lines, costs)?;

    let to_spread = prorated_total(costs);
    let subtotal_sum: f64 = lines.iter().map(CostLine::subtotal).sum();
    let quantity_sum: f64 = lines.iter().map(|l| l.quantity).sum();

    Ok(lines
        .iter()
        .map(|line| {
            let subtotal = line.subtotal();
            let weight = if subtotal_sum > 0.0 {
                subtotal / subtotal_sum
            } else {
                line.quantity / quantity_sum
            };
            let prorated_share = to_spread * weight;
            let real_unit_cost = round4((subtotal + prorated_share) / line.quantity).max(0.0);
            ProratedLine { subtotal, prorated_share, real_unit_cost }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost(amount: f64, prorate: bool) -> AssociatedCost {
        AssociatedCost { description: format!("cost {amount}"), amount, prorate }
    }

    #[test]
    fn shares_add_up_to_prorated_costs() {
        let lines = [
            CostLine { quantity: 3.0, unit_cost: 17.35 },
            CostLine { quantity: 11.0, unit_cost: 2.2 },
            CostLine { quantity: 7.0, unit_cost: 101.9 },
        ];
        let costs = [cost(95.5, true), cost(12.25, true), cost(40.0, false)];

        let result = prorate(&lines, &costs).unwrap();
        let sum: f64 = result.iter().map(|l| l.prorated_share).sum();
        assert!((sum - 107.75).abs() < 1e-9);
    }

    #[test]
    fn real_cost_is_proportional_and_rounded() {
        // Subtotals 100 and 300, freight 40 -> shares 10 and 30
        let lines = [
            CostLine { quantity: 10.0, unit_cost: 10.0 },
            CostLine { quantity: 3.0, unit_cost: 100.0 },
        ];
        let result = prorate(&lines, &[cost(40.0, true)]).unwrap();

        assert!((result[0].prorated_share - 10.0).abs() < 1e-9);
        assert!((result[1].prorated_share - 30.0).abs() < 1e-9);
        assert_eq!(result[0].real_unit_cost, 11.0);
        assert_eq!(result[1].real_unit_cost, 110.0);
    }

    #[test]
    fn rounds_to_four_decimals() {
        let lines = [CostLine { quantity: 3.0, unit_cost: 1.0 }];
        let result = prorate(&lines, &[cost(1.0, true)]).unwrap();
        assert_eq!(result[0].real_unit_cost, 1.3333);
    }

    #[test]
    fn non_prorated_costs_only_affect_total() {
        let lines = [CostLine { quantity: 2.0, unit_cost: 5.0 }];
        let costs = [cost(7.0, false)];
        let result = prorate(&lines, &costs).unwrap();
        assert_eq!(result[0].prorated_share, 0.0);
        assert_eq!(result[0].real_unit_cost, 5.0);
        assert_eq!(purchase_total(&lines, &costs), 17.0);
    }

    #[test]
    fn free_lines_fall_back_to_quantity_weights() {
        let lines = [
            CostLine { quantity: 1.0, unit_cost: 0.0 },
            CostLine { quantity: 3.0, unit_cost: 0.0 },
        ];
        let result = prorate(&lines, &[cost(8.0, true)]).unwrap();
        assert_eq!(result[0].prorated_share, 2.0);
        assert_eq!(result[1].prorated_share, 6.0);
        assert!(result.iter().all(|l| l.real_unit_cost >= 0.0));
    }

    #[test]
    fn rejects_invalid_lines() {
        assert_eq!(prorate(&[], &[]), Err(CostingError::NoLines));
        assert_eq!(
            prorate(&[CostLine { quantity: 0.0, unit_cost: 1.0 }], &[]),
            Err(CostingError::NonPositiveQuantity(0))
        );
        assert_eq!(
            prorate(&[CostLine { quantity: 1.0, unit_cost: -1.0 }], &[]),
            Err(CostingError::NegativeUnitCost(0))
        );
        assert!(matches!(
            prorate(&[CostLine { quantity: 1.0, unit_cost: 1.0 }], &[cost(-2.0, true)]),
            Err(CostingError::NegativeCost(_))
        ));
    }
}
