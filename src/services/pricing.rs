//! Sale line and sale total arithmetic.

use serde::{Deserialize, Serialize};

use super::costing::round2;

/// Unit a sale line is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleUnit {
    #[default]
    Base,
    /// Bulk package; one bulk unit is `bulk_factor` base units
    Bulk,
}

impl SaleUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            SaleUnit::Base => "base",
            SaleUnit::Bulk => "bulk",
        }
    }
}

/// Product fields the pricing rules need.
#[derive(Debug, Clone, Copy)]
pub struct PriceInfo {
    pub price: f64,
    pub taxable: bool,
    pub tax_rate: f64,
    pub bulk_factor: f64,
}

impl PriceInfo {
    /// Quantity in base units for stock consumption.
    pub fn base_quantity(&self, quantity: f64, unit: SaleUnit) -> f64 {
        match unit {
            SaleUnit::Base => quantity,
            SaleUnit::Bulk => quantity * self.bulk_factor,
        }
    }

    /// Default price for one `unit`.
    pub fn default_unit_price(&self, unit: SaleUnit) -> f64 {
        match unit {
            SaleUnit::Base => self.price,
            SaleUnit::Bulk => self.price * self.bulk_factor,
        }
    }

    pub fn tax_for(&self, subtotal: f64) -> f64 {
        if self.taxable { subtotal * self.tax_rate } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineAmounts {
    pub subtotal: f64,
    pub tax: f64,
    pub cost: f64,
}

pub fn line_amounts(info: &PriceInfo, quantity: f64, unit_price: f64, cost_of_goods: f64) -> LineAmounts {
    let subtotal = quantity * unit_price;
    LineAmounts { subtotal, tax: info.tax_for(subtotal), cost: cost_of_goods }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SaleTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub cost: f64,
    /// Subtotal minus cost of goods; tax is not income
    pub margin: f64,
}

pub fn sale_totals(lines: &[LineAmounts]) -> SaleTotals {
    let subtotal: f64 = lines.iter().map(|l| l.subtotal).sum();
    let tax: f64 = lines.iter().map(|l| l.tax).sum();
    let cost: f64 = lines.iter().map(|l| l.cost).sum();
    SaleTotals {
        subtotal: round2(subtotal),
        tax: round2(tax),
        total: round2(subtotal + tax),
        cost: round2(cost),
        margin: round2(subtotal - cost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FERTILIZER: PriceInfo = PriceInfo { price: 2.5, taxable: true, tax_rate: 0.16, bulk_factor: 50.0 };

    #[test]
    fn bulk_units_convert_to_base() {
        assert_eq!(FERTILIZER.base_quantity(3.0, SaleUnit::Bulk), 150.0);
        assert_eq!(FERTILIZER.base_quantity(3.0, SaleUnit::Base), 3.0);
        assert_eq!(FERTILIZER.default_unit_price(SaleUnit::Bulk), 125.0);
    }

    #[test]
    fn totals_include_tax_but_margin_does_not() {
        let lines = [
            line_amounts(&FERTILIZER, 2.0, 125.0, 180.0),
            line_amounts(&PriceInfo { taxable: false, ..FERTILIZER }, 10.0, 2.5, 15.0),
        ];
        let totals = sale_totals(&lines);

        assert_eq!(totals.subtotal, 275.0);
        assert_eq!(totals.tax, 40.0);
        assert_eq!(totals.total, 315.0);
        assert_eq!(totals.cost, 195.0);
        assert_eq!(totals.margin, 80.0);
    }
}
