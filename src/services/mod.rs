pub mod costing;
pub mod credit;
pub mod depreciation;
pub mod notify;
pub mod pricing;
pub mod stock;
