//! Straight-line depreciation for fixed assets.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepreciationSnapshot {
    pub monthly_depreciation: f64,
    pub months_elapsed: u32,
    pub accumulated_depreciation: f64,
    pub current_value: f64,
}

pub fn monthly_depreciation(acquisition_cost: f64, useful_life_years: i32) -> f64 {
    if useful_life_years <= 0 {
        return acquisition_cost;
    }
    acquisition_cost / (useful_life_years as f64 * 12.0)
}

/// Whole calendar months from `acquired` to `as_of`; 0 before acquisition.
///
/// A month counts once the day of month is reached again, so Jan 31 to
/// Feb 28 is still 0 months.
pub fn months_elapsed(acquired: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of <= acquired {
        return 0;
    }
    let mut months = (as_of.year() - acquired.year()) * 12 + as_of.month() as i32 - acquired.month() as i32;
    if as_of.day() < acquired.day() {
        months -= 1;
    }
    months.max(0) as u32
}

pub fn current_value(acquisition_cost: f64, useful_life_years: i32, months: u32) -> f64 {
    let monthly = monthly_depreciation(acquisition_cost, useful_life_years);
    (acquisition_cost - monthly * months as f64).max(0.0)
}

pub fn snapshot(
    acquisition_cost: f64,
    useful_life_years: i32,
    acquired: NaiveDate,
    as_of: NaiveDate,
) -> DepreciationSnapshot {
    let months = months_elapsed(acquired, as_of);
    let value = current_value(acquisition_cost, useful_life_years, months);
    DepreciationSnapshot {
        monthly_depreciation: monthly_depreciation(acquisition_cost, useful_life_years),
        months_elapsed: months,
        accumulated_depreciation: acquisition_cost - value,
        current_value: value,
    }
}

/// Depreciation booked between two dates (book value drop over the period).
pub fn expense_between(
    acquisition_cost: f64,
    useful_life_years: i32,
    acquired: NaiveDate,
    from: NaiveDate,
    to: NaiveDate,
) -> f64 {
    let start = current_value(acquisition_cost, useful_life_years, months_elapsed(acquired, from));
    let end = current_value(acquisition_cost, useful_life_years, months_elapsed(acquired, to));
    (start - end).max(0.0)
}
