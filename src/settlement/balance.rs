use crate::core::expense::{Expense, ExpenseId, Share};
use crate::core::member::{Member, MemberId};
use crate::core::money::MoneyAmount;
use crate::core::obligation::{Obligation, ObligationStatus};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Net balance of each member of one group.
///
/// A positive balance means the member is owed (net creditor).
/// A negative balance means the member owes (net debtor).
///
/// Balances produced by [`BalanceAggregator`] always sum to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BalanceSheet {
    balances: BTreeMap<MemberId, MoneyAmount>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure the member has an entry, even if it stays at zero.
    pub fn open(&mut self, member: &MemberId) {
        self.balances.entry(member.clone()).or_insert(MoneyAmount::ZERO);
    }

    pub fn credit(&mut self, member: &MemberId, amount: MoneyAmount) {
        *self.balances.entry(member.clone()).or_insert(MoneyAmount::ZERO) += amount;
    }

    pub fn debit(&mut self, member: &MemberId, amount: MoneyAmount) {
        *self.balances.entry(member.clone()).or_insert(MoneyAmount::ZERO) -= amount;
    }

    /// Net balance of a member; zero for members without an entry.
    pub fn get(&self, member: &MemberId) -> MoneyAmount {
        self.balances.get(member).copied().unwrap_or(MoneyAmount::ZERO)
    }

    pub fn contains(&self, member: &MemberId) -> bool {
        self.balances.contains_key(member)
    }

    /// All entries, ordered by member id.
    pub fn iter(&self) -> impl Iterator<Item = (&MemberId, MoneyAmount)> {
        self.balances.iter().map(|(m, a)| (m, *a))
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Sum of all balances. Zero for a balanced sheet.
    pub fn residual(&self) -> MoneyAmount {
        self.balances.values().sum()
    }

    /// Verify the conservation law: balances sum to exactly zero.
    pub fn is_balanced(&self) -> bool {
        self.residual().is_zero()
    }

    /// Total that actually needs to change hands (sum of positive balances).
    pub fn total_outstanding(&self) -> MoneyAmount {
        self.balances.values().filter(|a| a.is_positive()).sum()
    }

    /// Members who are owed money.
    pub fn creditors(&self) -> impl Iterator<Item = (&MemberId, MoneyAmount)> {
        self.iter().filter(|(_, a)| a.is_positive())
    }

    /// Members who owe money.
    pub fn debtors(&self) -> impl Iterator<Item = (&MemberId, MoneyAmount)> {
        self.iter().filter(|(_, a)| a.is_negative())
    }

    /// Number of members whose balance is not zero.
    pub fn unsettled_count(&self) -> usize {
        self.balances.values().filter(|a| !a.is_zero()).count()
    }
}

impl FromIterator<(MemberId, MoneyAmount)> for BalanceSheet {
    fn from_iter<T: IntoIterator<Item = (MemberId, MoneyAmount)>>(iter: T) -> Self {
        let mut sheet = BalanceSheet::new();
        for (member, amount) in iter {
            sheet.credit(&member, amount);
        }
        sheet
    }
}

/// Computes net balances from a group's persisted records.
///
/// Balances are derived fresh every time and never cached. For member `m`:
///
/// ```text
///   Σ unpaid shares of expenses m paid      (m's outlay still owed by others)
/// − Σ unpaid shares owed by m
/// + Σ completed obligations m paid as debtor
/// − Σ completed obligations m received as creditor
/// ```
///
/// Each term credits one member and debits another by the same amount, so
/// the sheet is zero-sum by construction. Because completed obligations are
/// part of the sum, a debt settled through an obligation is never
/// regenerated by a later recomputation.
pub struct BalanceAggregator;

impl BalanceAggregator {
    /// Net balances of every active member (zero balances included), plus any
    /// inactive member who still carries a balance.
    pub fn net_balances<'a>(
        members: impl IntoIterator<Item = &'a Member>,
        expenses: impl IntoIterator<Item = &'a Expense>,
        shares: impl IntoIterator<Item = &'a Share>,
        obligations: impl IntoIterator<Item = &'a Obligation>,
    ) -> BalanceSheet {
        let payers: HashMap<ExpenseId, &MemberId> =
            expenses.into_iter().map(|e| (e.id(), e.payer())).collect();

        let mut sheet = BalanceSheet::new();
        let mut inactive = Vec::new();
        for member in members {
            sheet.open(member.id());
            if !member.is_active() {
                inactive.push(member.id().clone());
            }
        }

        for share in shares {
            if share.is_paid() {
                continue;
            }
            let Some(payer) = payers.get(&share.expense()) else {
                continue;
            };
            sheet.credit(payer, share.amount());
            sheet.debit(share.member(), share.amount());
        }

        for obligation in obligations {
            if obligation.status() == ObligationStatus::Completed {
                sheet.credit(obligation.debtor(), obligation.amount());
                sheet.debit(obligation.creditor(), obligation.amount());
            }
        }

        // Inactive members leave only with a zero balance, so dropping them keeps the sum.
        for member in &inactive {
            if sheet.get(member).is_zero() {
                sheet.balances.remove(member);
            }
        }

        debug!(
            "computed {} balances, outstanding {}",
            sheet.len(),
            sheet.total_outstanding()
        );
        sheet
    }
}
