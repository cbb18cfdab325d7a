pub mod health;
pub mod transactions;
