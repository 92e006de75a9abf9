pub mod branch;
pub mod finance;
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
