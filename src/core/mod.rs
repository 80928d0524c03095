//! Foundational types: money, members, expenses, shares, obligations, errors.

pub mod error;
pub mod expense;
pub mod member;
pub mod money;
pub mod obligation;
