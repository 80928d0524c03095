//! # splitsmart-engine
//!
//! Expense splitting and settlement minimization for shared-expense groups.
//!
//! An expense is divided into per-member shares under one of five allocation
//! modes. The group's net balances are then reduced by a greedy two-heap
//! algorithm to a short list of payment obligations, recomputed every time
//! the group's shares change.
//!
//! ## Architecture
//!
//! - **core**: Foundational types: money, members, expenses, shares, obligations, errors
//! - **split**: Allocation modes and the split calculator
//! - **settlement**: Net balances, the minimizer, the obligation ledger, payment links
//! - **group**: Per-group state and the registry that serializes access to it
//! - **simulation**: Random scenario generation
//! - **config**: Engine configuration

pub mod config;
pub mod core;
pub mod group;
pub mod settlement;
pub mod simulation;
pub mod split;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::core::error::{NotFound, SplitError, ValidationError};
    pub use crate::core::expense::{AllocationMode, Category, Expense, ExpenseId, PaymentMethod, Share};
    pub use crate::core::member::{GroupId, Member, MemberId};
    pub use crate::core::money::MoneyAmount;
    pub use crate::core::obligation::{Obligation, ObligationStatus};
    pub use crate::group::registry::GroupRegistry;
    pub use crate::group::state::{ExpenseReceipt, ExpenseRequest, MemberTotals};
    pub use crate::settlement::balance::{BalanceAggregator, BalanceSheet};
    pub use crate::settlement::links::PaymentLinks;
    pub use crate::settlement::minimizer::{SettlementMinimizer, Transfer};
    pub use crate::split::allocation::{Allocation, CustomEntry, LineItem, PercentageEntry};
    pub use crate::split::calculator::SplitCalculator;
}
