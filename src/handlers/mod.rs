pub mod accounts;
pub mod admin;
pub mod exports;
pub mod health;
pub mod market;
pub mod payments;
pub mod site;
