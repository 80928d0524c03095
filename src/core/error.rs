use crate::core::expense::ExpenseId;
use crate::core::member::{GroupId, MemberId};
use crate::core::money::MoneyAmount;
use crate::core::obligation::ObligationStatus;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Malformed or constraint-violating input.
///
/// A validation error aborts the enclosing operation; nothing it would have
/// produced is persisted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("expense amount must be positive, got {0}")]
    NonPositiveAmount(MoneyAmount),
    #[error("money amounts carry at most two decimal places, got {0}")]
    Precision(Decimal),
    #[error("amount {0} is out of the representable range")]
    OutOfRange(Decimal),
    #[error("participants are required for an {mode} split")]
    MissingParticipants { mode: &'static str },
    #[error("items are required for an itemized split")]
    MissingItems,
    #[error("item '{item}' has no assigned members")]
    ItemWithoutAssignees { item: String },
    #[error("item '{item}' must have a quantity of at least 1")]
    ZeroQuantity { item: String },
    #[error("item '{item}' has a negative price {price}")]
    NegativePrice { item: String, price: MoneyAmount },
    #[error("itemized prices add up to {items_total}, expected the expense total {expected}")]
    ItemizedTotalMismatch {
        items_total: MoneyAmount,
        expected: MoneyAmount,
    },
    #[error("percentages must add up to 100, current total: {0}")]
    PercentageSum(Decimal),
    #[error("percentage for {member} must not be negative, got {percentage}")]
    NegativePercentage { member: MemberId, percentage: Decimal },
    #[error("custom amounts add up to {total}, expected the expense total {expected}")]
    CustomSum {
        total: MoneyAmount,
        expected: MoneyAmount,
    },
    #[error("custom amount for {member} must not be negative, got {amount}")]
    NegativeShare { member: MemberId, amount: MoneyAmount },
    #[error("member {0} appears more than once in the same allocation")]
    DuplicateMember(MemberId),
    #[error("member {0} is not an active member of this group")]
    UnknownMember(MemberId),
    #[error("member {member} is not a member of group {group}")]
    NotAGroupMember { group: GroupId, member: MemberId },
    #[error("member {member} is not a party to {subject}")]
    NotAParty { member: MemberId, subject: String },
    #[error("member {member} cannot leave while their balance is {balance}")]
    OutstandingBalance { member: MemberId, balance: MoneyAmount },
    #[error("member {member} cannot leave while {open} shares they owe or are owed are unpaid")]
    OpenShares { member: MemberId, open: usize },
    #[error("member {0} already exists in this group")]
    MemberExists(MemberId),
    #[error("group {0} already exists")]
    GroupExists(GroupId),
}

/// A referenced entity does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("group {0} not found")]
    Group(GroupId),
    #[error("member {0} not found")]
    Member(MemberId),
    #[error("expense {0} not found")]
    Expense(ExpenseId),
    #[error("no share of expense {expense} belongs to {member}")]
    Share { expense: ExpenseId, member: MemberId },
    #[error("obligation {0} not found")]
    Obligation(Uuid),
}

/// Errors surfaced by the split and settlement engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFound),
    /// Net balances did not sum to zero. This is a defect in balance
    /// computation or rounding, never a user error.
    #[error("conservation violated: balances leave a residual of {residual}")]
    ConservationViolation { residual: MoneyAmount },
    #[error("obligation {obligation} is {from} and can no longer change")]
    InvalidTransition {
        obligation: Uuid,
        from: ObligationStatus,
    },
}

impl SplitError {
    /// Whether the error reports a broken internal invariant rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, SplitError::ConservationViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::money;

    #[test]
    fn test_validation_converts_into_split_error() {
        let err: SplitError = ValidationError::MissingItems.into();
        assert!(matches!(err, SplitError::Validation(ValidationError::MissingItems)));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_messages_name_the_reason() {
        let err = ValidationError::CustomSum {
            total: money("99.99"),
            expected: money("100"),
        };
        assert_eq!(
            err.to_string(),
            "custom amounts add up to 99.99, expected the expense total 100.00"
        );

        let err = SplitError::ConservationViolation {
            residual: money("0.01"),
        };
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "conservation violated: balances leave a residual of 0.01");
    }
}
