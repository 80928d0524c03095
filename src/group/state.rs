use crate::core::error::{NotFound, SplitError, ValidationError};
use crate::core::expense::{Category, Expense, ExpenseId, PaymentMethod, PaymentRecord, Share};
use crate::core::member::{GroupId, Member, MemberId};
use crate::core::money::MoneyAmount;
use crate::core::obligation::Obligation;
use crate::settlement::balance::{BalanceAggregator, BalanceSheet};
use crate::settlement::ledger::SettlementLedger;
use crate::settlement::links::PaymentLinks;
use crate::settlement::minimizer::SettlementMinimizer;
use crate::split::allocation::Allocation;
use crate::split::calculator::SplitCalculator;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::iter;
use uuid::Uuid;

/// A new expense as submitted by the member who paid it.
///
/// ```
/// use splitsmart_engine::group::state::ExpenseRequest;
///
/// let request: ExpenseRequest = serde_json::from_str(r#"{
///     "description": "Groceries",
///     "amount": "90.00",
///     "category": "FOOD",
///     "split": { "mode": "EQUAL", "participants": ["asha", "ravi", "meera"] }
/// }"#).unwrap();
/// assert_eq!(request.split.mode().as_str(), "EQUAL");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRequest {
    pub description: String,
    pub amount: MoneyAmount,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub split: Allocation,
}

impl ExpenseRequest {
    pub fn new(description: impl Into<String>, amount: MoneyAmount, split: Allocation) -> Self {
        Self {
            description: description.into(),
            amount,
            category: Category::default(),
            notes: None,
            split,
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
}

/// Everything a successful expense creation produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseReceipt {
    pub expense: Expense,
    pub shares: Vec<Share>,
    /// The group's PENDING obligations after recomputation.
    pub obligations: Vec<Obligation>,
}

/// A member's position across all PENDING obligations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTotals {
    pub you_owe: MoneyAmount,
    pub you_get: MoneyAmount,
}

/// The records of one group: members, expenses, shares and obligations.
///
/// Every mutating method computes its full outcome (shares, balances,
/// minimized transfers) before touching any field, so a failed call leaves
/// the state exactly as it was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupState {
    id: GroupId,
    name: String,
    members: BTreeMap<MemberId, Member>,
    /// In creation order.
    expenses: Vec<Expense>,
    shares: Vec<Share>,
    ledger: SettlementLedger,
}

impl GroupState {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: BTreeMap::new(),
            expenses: Vec::new(),
            shares: Vec::new(),
            ledger: SettlementLedger::new(),
        }
    }

    /// Add a member. A returning inactive member is reactivated with their
    /// previous details.
    pub fn add_member(&mut self, member: Member) -> Result<(), ValidationError> {
        match self.members.get_mut(member.id()) {
            Some(existing) if existing.is_active() => {
                Err(ValidationError::MemberExists(member.id().clone()))
            }
            Some(existing) => {
                existing.activate();
                Ok(())
            }
            None => {
                self.members.insert(member.id().clone(), member);
                Ok(())
            }
        }
    }

    /// Deactivate a member whose net balance is zero and who is on neither
    /// side of an unpaid share.
    pub fn deactivate_member(&mut self, member: &MemberId) -> Result<(), SplitError> {
        let balance = self.balances().get(member);
        let open = self.open_shares_of(member);
        let entry = self
            .members
            .get_mut(member)
            .ok_or_else(|| NotFound::Member(member.clone()))?;
        if !balance.is_zero() {
            return Err(ValidationError::OutstandingBalance {
                member: member.clone(),
                balance,
            }
            .into());
        }
        if open > 0 {
            return Err(ValidationError::OpenShares {
                member: member.clone(),
                open,
            }
            .into());
        }
        entry.deactivate();
        Ok(())
    }

    /// Unpaid shares that `member` owes, or that are owed to them as payer.
    fn open_shares_of(&self, member: &MemberId) -> usize {
        let paid_by: HashSet<ExpenseId> = self
            .expenses
            .iter()
            .filter(|e| e.payer() == member)
            .map(Expense::id)
            .collect();
        self.shares
            .iter()
            .filter(|s| !s.is_paid())
            .filter(|s| s.member() == member || paid_by.contains(&s.expense()))
            .count()
    }

    /// Ids of the active members.
    pub fn roster(&self) -> BTreeSet<MemberId> {
        self.members
            .values()
            .filter(|m| m.is_active())
            .map(|m| m.id().clone())
            .collect()
    }

    pub fn ensure_active(&self, member: &MemberId) -> Result<&Member, ValidationError> {
        self.members
            .get(member)
            .filter(|m| m.is_active())
            .ok_or_else(|| ValidationError::NotAGroupMember {
                group: self.id.clone(),
                member: member.clone(),
            })
    }

    /// Net balances derived from the current records.
    pub fn balances(&self) -> BalanceSheet {
        BalanceAggregator::net_balances(
            self.members.values(),
            &self.expenses,
            &self.shares,
            self.ledger.history(),
        )
    }

    /// Re-minimize the balances and replace the PENDING obligations.
    pub fn recompute(&mut self, now: DateTime<Utc>) -> Result<Vec<Obligation>, SplitError> {
        let transfers = SettlementMinimizer::minimize(&self.balances())?;
        Ok(self.ledger.replace_pending(&self.id, transfers, now))
    }

    /// Split a new expense paid by `payer`, store it and recompute.
    pub fn add_expense(
        &mut self,
        payer: &MemberId,
        request: ExpenseRequest,
        now: DateTime<Utc>,
    ) -> Result<ExpenseReceipt, SplitError> {
        self.ensure_active(payer)?;
        if !request.amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount(request.amount).into());
        }
        request.amount.to_minor_units()?;

        let mut expense = Expense::new(
            self.id.clone(),
            request.description,
            request.amount,
            request.split.mode(),
            payer.clone(),
        )
        .with_category(request.category)
        .with_created_at(now);
        if let Some(notes) = request.notes {
            expense = expense.with_notes(notes);
        }

        let shares = SplitCalculator::compute_shares(&expense, &request.split, &self.roster())?;
        let sheet = BalanceAggregator::net_balances(
            self.members.values(),
            self.expenses.iter().chain(iter::once(&expense)),
            self.shares.iter().chain(&shares),
            self.ledger.history(),
        );
        let transfers = SettlementMinimizer::minimize(&sheet)?;

        if shares.iter().all(Share::is_paid) {
            expense.mark_settled();
        }
        self.expenses.push(expense.clone());
        self.shares.extend(shares.iter().cloned());
        let obligations = self.ledger.replace_pending(&self.id, transfers, now);

        info!(
            "group {}: {} paid {} for '{}' ({}, {} shares), {} obligations pending",
            self.id,
            payer,
            expense.amount(),
            expense.description(),
            expense.mode(),
            shares.len(),
            obligations.len()
        );
        Ok(ExpenseReceipt {
            expense,
            shares,
            obligations,
        })
    }

    /// Record a direct payment of one share, then recompute.
    ///
    /// `actor` must own the share or have paid the expense. Paying an
    /// already paid share changes nothing.
    pub fn mark_share_paid(
        &mut self,
        expense: ExpenseId,
        member: &MemberId,
        actor: &MemberId,
        method: Option<PaymentMethod>,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Share, SplitError> {
        let payer = self
            .expenses
            .iter()
            .find(|e| e.id() == expense)
            .map(|e| e.payer().clone())
            .ok_or(NotFound::Expense(expense))?;
        let index = self
            .shares
            .iter()
            .position(|s| s.expense() == expense && s.member() == member)
            .ok_or_else(|| NotFound::Share {
                expense,
                member: member.clone(),
            })?;

        if actor != member && *actor != payer {
            return Err(ValidationError::NotAParty {
                member: actor.clone(),
                subject: format!("the share of {} in expense {}", member, expense),
            }
            .into());
        }
        if self.shares[index].is_paid() {
            return Ok(self.shares[index].clone());
        }

        let mut updated = self.shares[index].clone();
        updated.record_payment(PaymentRecord {
            method,
            reference,
            paid_at: now,
        });
        let sheet = BalanceAggregator::net_balances(
            self.members.values(),
            &self.expenses,
            self.shares
                .iter()
                .enumerate()
                .map(|(i, s)| if i == index { &updated } else { s }),
            self.ledger.history(),
        );
        let transfers = SettlementMinimizer::minimize(&sheet)?;

        self.shares[index] = updated.clone();
        let all_paid = self
            .shares
            .iter()
            .filter(|s| s.expense() == expense)
            .all(Share::is_paid);
        if all_paid {
            if let Some(e) = self.expenses.iter_mut().find(|e| e.id() == expense) {
                e.mark_settled();
            }
        }
        self.ledger.replace_pending(&self.id, transfers, now);

        info!("group {}: share of {} in expense {} paid", self.id, member, expense);
        Ok(updated)
    }

    pub fn settle_obligation(
        &mut self,
        id: Uuid,
        actor: &MemberId,
        method: Option<PaymentMethod>,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Obligation, SplitError> {
        self.ensure_party(id, actor)?;
        Ok(self.ledger.settle(id, method, reference, now)?.clone())
    }

    pub fn cancel_obligation(
        &mut self,
        id: Uuid,
        actor: &MemberId,
        now: DateTime<Utc>,
    ) -> Result<Obligation, SplitError> {
        self.ensure_party(id, actor)?;
        Ok(self.ledger.cancel(id, now)?.clone())
    }

    /// Any active member may send a reminder.
    pub fn remind(&mut self, id: Uuid, actor: &MemberId, now: DateTime<Utc>) -> Result<u32, SplitError> {
        self.ensure_active(actor)?;
        self.ledger.remind(id, now)
    }

    fn ensure_party(&self, id: Uuid, actor: &MemberId) -> Result<(), SplitError> {
        let obligation = self.ledger.get(id)?;
        if obligation.debtor() == actor || obligation.creditor() == actor {
            Ok(())
        } else {
            Err(ValidationError::NotAParty {
                member: actor.clone(),
                subject: format!("obligation {}", id),
            }
            .into())
        }
    }

    /// Deep links for paying an obligation's creditor, if they have a
    /// payment identifier.
    pub fn payment_links(&self, id: Uuid) -> Result<Option<PaymentLinks>, SplitError> {
        let obligation = self.ledger.get(id)?;
        let creditor = self.member(obligation.creditor())?;
        Ok(PaymentLinks::for_creditor(creditor, obligation.amount()))
    }

    // --- Accessors ---

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All members, active or not, ordered by id.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn member(&self, id: &MemberId) -> Result<&Member, NotFound> {
        self.members
            .get(id)
            .ok_or_else(|| NotFound::Member(id.clone()))
    }

    /// Expenses, newest first.
    pub fn expenses(&self) -> Vec<&Expense> {
        let mut expenses: Vec<&Expense> = self.expenses.iter().rev().collect();
        expenses.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        expenses
    }

    pub fn shares_of(&self, expense: ExpenseId) -> Result<Vec<&Share>, NotFound> {
        if !self.expenses.iter().any(|e| e.id() == expense) {
            return Err(NotFound::Expense(expense));
        }
        Ok(self.shares.iter().filter(|s| s.expense() == expense).collect())
    }

    pub fn ledger(&self) -> &SettlementLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::money;
    use crate::core::obligation::ObligationStatus;
    use crate::split::allocation::CustomEntry;

    fn ids(names: &[&str]) -> Vec<MemberId> {
        names.iter().map(|n| MemberId::new(*n)).collect()
    }

    fn flat() -> GroupState {
        let mut state = GroupState::new(GroupId::new("flat"), "Flat 4B");
        for name in ["a", "b", "c"] {
            state
                .add_member(Member::new(MemberId::new(name), name.to_uppercase()))
                .unwrap();
        }
        state
    }

    fn equal(amount: &str, names: &[&str]) -> ExpenseRequest {
        ExpenseRequest::new(
            "dinner",
            money(amount),
            Allocation::Equal {
                participants: ids(names),
            },
        )
    }

    #[test]
    fn test_add_expense_recomputes() {
        let mut state = flat();
        let receipt = state
            .add_expense(&MemberId::new("a"), equal("90", &["a", "b", "c"]), Utc::now())
            .unwrap();

        assert_eq!(receipt.shares.len(), 3);
        assert_eq!(receipt.obligations.len(), 2);
        assert!(!receipt.expense.is_settled());
        assert_eq!(state.balances().get(&MemberId::new("a")), money("60"));
    }

    #[test]
    fn test_failed_expense_persists_nothing() {
        let mut state = flat();
        state
            .add_expense(&MemberId::new("a"), equal("90", &["a", "b", "c"]), Utc::now())
            .unwrap();
        let before = state.ledger().history().len();

        let bad = ExpenseRequest::new(
            "taxi",
            money("100"),
            Allocation::Custom {
                entries: vec![
                    CustomEntry::new(MemberId::new("a"), money("40")),
                    CustomEntry::new(MemberId::new("b"), money("35")),
                ],
            },
        );
        let err = state.add_expense(&MemberId::new("a"), bad, Utc::now()).unwrap_err();
        assert!(matches!(err, SplitError::Validation(ValidationError::CustomSum { .. })));
        assert_eq!(state.expenses().len(), 1);
        assert_eq!(state.ledger().history().len(), before);
        assert_eq!(state.ledger().pending().count(), 2);
    }

    #[test]
    fn test_payer_must_be_active_member() {
        let mut state = flat();
        let err = state
            .add_expense(&MemberId::new("zed"), equal("10", &["a"]), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            SplitError::Validation(ValidationError::NotAGroupMember { .. })
        ));
    }

    #[test]
    fn test_mark_share_paid_settles_expense() {
        let mut state = flat();
        let receipt = state
            .add_expense(&MemberId::new("a"), equal("20", &["a", "b"]), Utc::now())
            .unwrap();
        let expense = receipt.expense.id();

        // c is neither the owner nor the payer.
        let err = state
            .mark_share_paid(expense, &MemberId::new("b"), &MemberId::new("c"), None, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, SplitError::Validation(ValidationError::NotAParty { .. })));

        let share = state
            .mark_share_paid(
                expense,
                &MemberId::new("b"),
                &MemberId::new("b"),
                Some(PaymentMethod::Cash),
                None,
                Utc::now(),
            )
            .unwrap();
        assert!(share.is_paid());
        assert!(state.expenses()[0].is_settled());
        assert_eq!(state.ledger().pending().count(), 0);
        assert!(state.balances().iter().all(|(_, b)| b.is_zero()));
    }

    #[test]
    fn test_settle_requires_party_and_is_not_regenerated() {
        let mut state = flat();
        let receipt = state
            .add_expense(&MemberId::new("a"), equal("90", &["a", "b", "c"]), Utc::now())
            .unwrap();
        let b_to_a = receipt
            .obligations
            .iter()
            .find(|o| o.debtor() == &MemberId::new("b"))
            .unwrap()
            .id();

        assert!(state
            .settle_obligation(b_to_a, &MemberId::new("c"), None, None, Utc::now())
            .is_err());
        let settled = state
            .settle_obligation(b_to_a, &MemberId::new("b"), Some(PaymentMethod::GooglePay), None, Utc::now())
            .unwrap();
        assert_eq!(settled.status(), ObligationStatus::Completed);

        let pending = state.recompute(Utc::now()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].debtor(), &MemberId::new("c"));
    }

    #[test]
    fn test_deactivate_requires_zero_balance() {
        let mut state = flat();
        state
            .add_expense(&MemberId::new("a"), equal("20", &["a", "b"]), Utc::now())
            .unwrap();

        assert!(matches!(
            state.deactivate_member(&MemberId::new("b")),
            Err(SplitError::Validation(ValidationError::OutstandingBalance { .. }))
        ));
        state.deactivate_member(&MemberId::new("c")).unwrap();
        assert!(!state.roster().contains(&MemberId::new("c")));

        state
            .add_member(Member::new(MemberId::new("c"), "C"))
            .unwrap();
        assert!(state.roster().contains(&MemberId::new("c")));
        assert!(matches!(
            state.add_member(Member::new(MemberId::new("c"), "C")),
            Err(ValidationError::MemberExists(_))
        ));
    }

    #[test]
    fn test_deactivate_refuses_offsetting_unpaid_shares() {
        let mut state = flat();
        let (a, b, c) = (MemberId::new("a"), MemberId::new("b"), MemberId::new("c"));
        state.add_expense(&a, equal("60", &["a", "b"]), Utc::now()).unwrap();
        let second = state.add_expense(&b, equal("60", &["b", "c"]), Utc::now()).unwrap();
        assert!(state.balances().get(&b).is_zero());

        assert_eq!(
            state.deactivate_member(&b),
            Err(SplitError::Validation(ValidationError::OpenShares {
                member: b.clone(),
                open: 2,
            }))
        );

        // c pays b back; b still owes a.
        state
            .mark_share_paid(second.expense.id(), &c, &c, None, None, Utc::now())
            .unwrap();
        assert_eq!(state.balances().get(&b), money("-30"));
        assert!(state.roster().contains(&b));
        assert!(state.balances().is_balanced());
    }

    #[test]
    fn test_payment_links_need_creditor_payment_id() {
        let mut state = GroupState::new(GroupId::new("trip"), "Goa");
        state
            .add_member(Member::new(MemberId::new("asha"), "Asha Rao").with_payment_id("asha@upi"))
            .unwrap();
        state
            .add_member(Member::new(MemberId::new("ravi"), "Ravi"))
            .unwrap();

        let receipt = state
            .add_expense(&MemberId::new("asha"), equal("50", &["asha", "ravi"]), Utc::now())
            .unwrap();
        let links = state
            .payment_links(receipt.obligations[0].id())
            .unwrap()
            .unwrap();
        assert_eq!(links.paytm, "paytmmp://pay?pa=asha@upi&pn=Asha%20Rao&am=25.00");
    }
}
