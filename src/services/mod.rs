pub mod auth;
pub mod catalog;
pub mod invoicing;
pub mod payments;
pub mod pdf;
pub mod reports;
pub mod sessions;
pub mod storage;
pub mod tokens;
pub mod webhooks;
