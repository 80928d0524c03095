use crate::core::error::ValidationError;
use crate::core::expense::AllocationMode;
use crate::core::member::MemberId;
use crate::core::money::MoneyAmount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Allocation parameters for one expense, one variant per mode.
///
/// Each variant carries exactly the inputs its mode needs. On the wire the
/// mode is the `mode` tag:
///
/// ```
/// use splitsmart_engine::split::allocation::Allocation;
///
/// let allocation: Allocation = serde_json::from_str(
///     r#"{ "mode": "EQUAL", "participants": ["asha", "ravi", "meera"] }"#,
/// ).unwrap();
/// assert_eq!(allocation.mode().as_str(), "EQUAL");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Allocation {
    /// Divide the total equally among the participants.
    Equal { participants: Vec<MemberId> },
    /// Each item is divided among the members assigned to it.
    Itemized { items: Vec<LineItem> },
    /// Only the consuming subset shares the cost; only the payer is credited.
    Partial { consumers: Vec<MemberId> },
    /// Each member owes a percentage of the total.
    Percentage { entries: Vec<PercentageEntry> },
    /// Each member owes an explicit amount.
    Custom { entries: Vec<CustomEntry> },
}

impl Allocation {
    pub fn mode(&self) -> AllocationMode {
        match self {
            Allocation::Equal { .. } => AllocationMode::Equal,
            Allocation::Itemized { .. } => AllocationMode::Itemized,
            Allocation::Partial { .. } => AllocationMode::Partial,
            Allocation::Percentage { .. } => AllocationMode::Percentage,
            Allocation::Custom { .. } => AllocationMode::Custom,
        }
    }

    /// Every member referenced by the allocation, in input order, with repeats.
    pub fn referenced_members(&self) -> Vec<&MemberId> {
        match self {
            Allocation::Equal { participants } => participants.iter().collect(),
            Allocation::Partial { consumers } => consumers.iter().collect(),
            Allocation::Itemized { items } => items.iter().flat_map(|i| i.assignees.iter()).collect(),
            Allocation::Percentage { entries } => entries.iter().map(|e| &e.member).collect(),
            Allocation::Custom { entries } => entries.iter().map(|e| &e.member).collect(),
        }
    }
}

/// One line of an itemized bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Unit price.
    pub price: MoneyAmount,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub assignees: Vec<MemberId>,
}

fn default_quantity() -> u32 {
    1
}

impl LineItem {
    pub fn new(name: impl Into<String>, price: MoneyAmount, assignees: Vec<MemberId>) -> Self {
        Self {
            name: name.into(),
            price,
            quantity: 1,
            assignees,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// `price × quantity`.
    pub fn line_total(&self) -> Result<MoneyAmount, ValidationError> {
        self.price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageEntry {
    pub member: MemberId,
    #[serde(with = "rust_decimal::serde::str")]
    pub percentage: Decimal,
}

impl PercentageEntry {
    pub fn new(member: MemberId, percentage: Decimal) -> Self {
        Self { member, percentage }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEntry {
    pub member: MemberId,
    pub amount: MoneyAmount,
}

impl CustomEntry {
    pub fn new(member: MemberId, amount: MoneyAmount) -> Self {
        Self { member, amount }
    }
}
