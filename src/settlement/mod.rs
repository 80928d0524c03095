//! Balances, minimization, the obligation ledger and payment links.

pub mod balance;
pub mod ledger;
pub mod links;
pub mod minimizer;
