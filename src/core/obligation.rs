use crate::core::error::SplitError;
use crate::core::expense::{PaymentMethod, PaymentRecord};
use crate::core::member::{GroupId, MemberId};
use crate::core::money::MoneyAmount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of an obligation. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationStatus {
    Pending,
    Completed,
    Cancelled,
}

impl fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObligationStatus::Pending => "PENDING",
            ObligationStatus::Completed => "COMPLETED",
            ObligationStatus::Cancelled => "CANCELLED",
        })
    }
}

/// A directed payment obligation between two members of a group.
///
/// Represents the fact that `debtor` should pay `creditor` a specific
/// `amount`. Obligations are derived from aggregate group balances and never
/// reference a particular expense.
///
/// # Examples
///
/// ```
/// use splitsmart_engine::core::member::{GroupId, MemberId};
/// use splitsmart_engine::core::money::money;
/// use splitsmart_engine::core::obligation::{Obligation, ObligationStatus};
///
/// let obligation = Obligation::new(
///     GroupId::new("flat"),
///     MemberId::new("ravi"),
///     MemberId::new("asha"),
///     money("30"),
/// );
///
/// assert_eq!(obligation.amount(), money("30"));
/// assert_eq!(obligation.status(), ObligationStatus::Pending);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obligation {
    /// Unique identifier for this obligation.
    id: Uuid,
    group: GroupId,
    /// The member who owes the amount.
    debtor: MemberId,
    /// The member who is owed the amount.
    creditor: MemberId,
    /// The amount owed. Must be positive.
    amount: MoneyAmount,
    status: ObligationStatus,
    /// Set once the obligation is completed.
    payment: Option<PaymentRecord>,
    reminder_count: u32,
    last_reminded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Obligation {
    /// Create a new pending obligation.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is not positive.
    pub fn new(group: GroupId, debtor: MemberId, creditor: MemberId, amount: MoneyAmount) -> Self {
        Self::with_id(Uuid::new_v4(), group, debtor, creditor, amount, Utc::now())
    }

    /// Create an obligation with a specific ID and creation time (useful for testing / determinism).
    pub fn with_id(
        id: Uuid,
        group: GroupId,
        debtor: MemberId,
        creditor: MemberId,
        amount: MoneyAmount,
        created_at: DateTime<Utc>,
    ) -> Self {
        assert!(
            amount.is_positive(),
            "Obligation amount must be positive, got {}",
            amount
        );
        Self {
            id,
            group,
            debtor,
            creditor,
            amount,
            status: ObligationStatus::Pending,
            payment: None,
            reminder_count: 0,
            last_reminded_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// `PENDING -> COMPLETED`, recording how it was paid.
    pub fn settle(
        &mut self,
        method: Option<PaymentMethod>,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SplitError> {
        self.ensure_pending()?;
        self.status = ObligationStatus::Completed;
        self.payment = Some(PaymentRecord {
            method,
            reference,
            paid_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// `PENDING -> CANCELLED`.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), SplitError> {
        self.ensure_pending()?;
        self.status = ObligationStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Count a reminder without changing the state.
    pub fn remind(&mut self, now: DateTime<Utc>) -> Result<u32, SplitError> {
        self.ensure_pending()?;
        self.reminder_count += 1;
        self.last_reminded_at = Some(now);
        self.updated_at = now;
        Ok(self.reminder_count)
    }

    fn ensure_pending(&self) -> Result<(), SplitError> {
        if self.status == ObligationStatus::Pending {
            Ok(())
        } else {
            Err(SplitError::InvalidTransition {
                obligation: self.id,
                from: self.status,
            })
        }
    }

    /// Whether this obligation connects the same members for the same amount.
    pub fn same_terms(&self, other: &Obligation) -> bool {
        self.debtor == other.debtor && self.creditor == other.creditor && self.amount == other.amount
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn debtor(&self) -> &MemberId {
        &self.debtor
    }

    pub fn creditor(&self) -> &MemberId {
        &self.creditor
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn status(&self) -> ObligationStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == ObligationStatus::Pending
    }

    pub fn payment(&self) -> Option<&PaymentRecord> {
        self.payment.as_ref()
    }

    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.payment.as_ref().map(|p| p.paid_at)
    }

    pub fn reminder_count(&self) -> u32 {
        self.reminder_count
    }

    pub fn last_reminded_at(&self) -> Option<DateTime<Utc>> {
        self.last_reminded_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl fmt::Display for Obligation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} {} [{}]",
            self.debtor, self.creditor, self.amount, self.status
        )
    }
}
