use crate::core::member::{GroupId, MemberId};
use crate::core::money::MoneyAmount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(Uuid);

impl ExpenseId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The rule used to divide an expense among members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationMode {
    Equal,
    Itemized,
    Partial,
    Percentage,
    Custom,
}

impl AllocationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationMode::Equal => "EQUAL",
            AllocationMode::Itemized => "ITEMIZED",
            AllocationMode::Partial => "PARTIAL",
            AllocationMode::Percentage => "PERCENTAGE",
            AllocationMode::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spending category attached to an expense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    #[default]
    General,
    Food,
    Transport,
    Entertainment,
    Shopping,
    Utilities,
    Medical,
    Travel,
    Rent,
    Education,
    Other,
}

/// How a share or an obligation was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    GooglePay,
    #[serde(rename = "PHONEPE")]
    PhonePe,
    Paytm,
    Cash,
    BankTransfer,
    Other,
}

/// Payment metadata recorded when a share or obligation is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// A shared expense paid by one member on behalf of a group.
///
/// The expense is immutable once its shares are computed; only
/// `settled` changes, when every share has been paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    id: ExpenseId,
    group: GroupId,
    description: String,
    /// Total amount. Always positive.
    amount: MoneyAmount,
    mode: AllocationMode,
    category: Category,
    payer: MemberId,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    settled: bool,
}

impl Expense {
    /// Create a new expense.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is not positive.
    pub fn new(
        group: GroupId,
        description: impl Into<String>,
        amount: MoneyAmount,
        mode: AllocationMode,
        payer: MemberId,
    ) -> Self {
        assert!(
            amount.is_positive(),
            "Expense amount must be positive, got {}",
            amount
        );
        Self {
            id: ExpenseId::new_v4(),
            group,
            description: description.into(),
            amount,
            mode,
            category: Category::default(),
            payer,
            notes: None,
            created_at: Utc::now(),
            settled: false,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Pin the creation time (useful for testing / replaying history).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub(crate) fn mark_settled(&mut self) {
        self.settled = true;
    }

    // --- Accessors ---

    pub fn id(&self) -> ExpenseId {
        self.id
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn mode(&self) -> AllocationMode {
        self.mode
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn payer(&self) -> &MemberId {
        &self.payer
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

/// One member's owed portion of one expense.
///
/// A share is identified by its `(expense, member)` pair. Its amount never
/// changes after creation; only the paid flag and payment metadata do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    expense: ExpenseId,
    member: MemberId,
    amount: MoneyAmount,
    percentage: Option<Decimal>,
    paid: bool,
    payment: Option<PaymentRecord>,
}

impl Share {
    pub(crate) fn new(expense: ExpenseId, member: MemberId, amount: MoneyAmount) -> Self {
        Self {
            expense,
            member,
            amount,
            percentage: None,
            paid: false,
            payment: None,
        }
    }

    pub(crate) fn with_percentage(mut self, percentage: Decimal) -> Self {
        self.percentage = Some(percentage);
        self
    }

    /// Mark the share as paid without payment metadata (the payer's own share).
    pub(crate) fn prepaid(mut self, at: DateTime<Utc>) -> Self {
        self.paid = true;
        self.payment = Some(PaymentRecord {
            method: None,
            reference: None,
            paid_at: at,
        });
        self
    }

    pub(crate) fn record_payment(&mut self, record: PaymentRecord) {
        self.paid = true;
        self.payment = Some(record);
    }

    // --- Accessors ---

    pub fn expense(&self) -> ExpenseId {
        self.expense
    }

    pub fn member(&self) -> &MemberId {
        &self.member
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn percentage(&self) -> Option<Decimal> {
        self.percentage
    }

    pub fn is_paid(&self) -> bool {
        self.paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.payment.as_ref().map(|p| p.paid_at)
    }

    pub fn payment(&self) -> Option<&PaymentRecord> {
        self.payment.as_ref()
    }
}
