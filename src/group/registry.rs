use crate::config::EngineConfig;
use crate::core::error::{NotFound, SplitError, ValidationError};
use crate::core::expense::{Expense, ExpenseId, PaymentMethod, Share};
use crate::core::member::{GroupId, Member, MemberId};
use crate::core::obligation::Obligation;
use crate::group::state::{ExpenseReceipt, ExpenseRequest, GroupState, MemberTotals};
use crate::settlement::balance::BalanceSheet;
use crate::settlement::links::PaymentLinks;
use chrono::Utc;
use log::{error, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

/// All groups known to the engine.
///
/// Each group sits behind its own mutex: every operation on a group,
/// expense creation, recomputation and obligation transitions alike, runs
/// while holding that group's lock. Operations on different groups never
/// contend. The outer `RwLock` only guards the group map itself.
///
/// The acting member is always an explicit argument.
///
/// # Examples
///
/// ```
/// use splitsmart_engine::core::member::{GroupId, Member, MemberId};
/// use splitsmart_engine::core::money::money;
/// use splitsmart_engine::group::registry::GroupRegistry;
/// use splitsmart_engine::group::state::ExpenseRequest;
/// use splitsmart_engine::split::allocation::Allocation;
///
/// let registry = GroupRegistry::new();
/// let flat = GroupId::new("flat");
/// registry.create_group(flat.clone(), "Flat 4B").unwrap();
/// for name in ["asha", "ravi", "meera"] {
///     registry.add_member(&flat, Member::new(MemberId::new(name), name)).unwrap();
/// }
///
/// let participants = vec![MemberId::new("asha"), MemberId::new("ravi"), MemberId::new("meera")];
/// let receipt = registry
///     .create_expense(
///         &flat,
///         &MemberId::new("asha"),
///         ExpenseRequest::new("Groceries", money("90"), Allocation::Equal { participants }),
///     )
///     .unwrap();
///
/// assert_eq!(receipt.obligations.len(), 2);
/// assert_eq!(registry.net_balances(&flat).unwrap().get(&MemberId::new("asha")), money("60"));
/// ```
#[derive(Debug, Default)]
pub struct GroupRegistry {
    config: EngineConfig,
    groups: RwLock<HashMap<GroupId, Arc<Mutex<GroupState>>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            groups: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn create_group(&self, id: GroupId, name: impl Into<String>) -> Result<(), SplitError> {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        if groups.contains_key(&id) {
            warn!("group {} already exists", id);
            return Err(ValidationError::GroupExists(id).into());
        }
        let state = GroupState::new(id.clone(), name);
        info!("created group {} ({})", id, state.name());
        groups.insert(id, Arc::new(Mutex::new(state)));
        Ok(())
    }

    /// Ids of every group, sorted.
    pub fn group_ids(&self) -> Vec<GroupId> {
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<GroupId> = groups.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// A copy of the group's current records.
    pub fn snapshot(&self, group: &GroupId) -> Result<GroupState, SplitError> {
        self.with_group(group, |state| Ok(state.clone()))
    }

    pub fn add_member(&self, group: &GroupId, member: Member) -> Result<(), SplitError> {
        let id = member.id().clone();
        logged(
            "add member",
            self.with_group(group, |state| Ok(state.add_member(member)?)),
        )?;
        info!("group {}: member {} joined", group, id);
        Ok(())
    }

    /// Deactivate a member. Fails while the member has a balance or unpaid shares.
    pub fn deactivate_member(&self, group: &GroupId, member: &MemberId) -> Result<(), SplitError> {
        logged(
            "deactivate member",
            self.with_group(group, |state| state.deactivate_member(member)),
        )?;
        info!("group {}: member {} deactivated", group, member);
        Ok(())
    }

    pub fn members(&self, group: &GroupId) -> Result<Vec<Member>, SplitError> {
        self.with_group(group, |state| Ok(state.members().cloned().collect()))
    }

    /// Split a new expense paid by `actor` and recompute the group's
    /// obligations, all under the group's lock.
    pub fn create_expense(
        &self,
        group: &GroupId,
        actor: &MemberId,
        request: ExpenseRequest,
    ) -> Result<ExpenseReceipt, SplitError> {
        logged(
            "create expense",
            self.with_group(group, |state| state.add_expense(actor, request, Utc::now())),
        )
    }

    /// Expenses of the group, newest first.
    pub fn expenses(&self, group: &GroupId) -> Result<Vec<Expense>, SplitError> {
        self.with_group(group, |state| {
            Ok(state.expenses().into_iter().cloned().collect())
        })
    }

    pub fn shares_of(&self, group: &GroupId, expense: ExpenseId) -> Result<Vec<Share>, SplitError> {
        self.with_group(group, |state| {
            Ok(state.shares_of(expense)?.into_iter().cloned().collect())
        })
    }

    /// Record a direct payment of `member`'s share of `expense`.
    pub fn mark_share_paid(
        &self,
        group: &GroupId,
        expense: ExpenseId,
        member: &MemberId,
        actor: &MemberId,
        method: Option<PaymentMethod>,
        reference: Option<String>,
    ) -> Result<Share, SplitError> {
        logged(
            "mark share paid",
            self.with_group(group, |state| {
                state.mark_share_paid(expense, member, actor, method, reference, Utc::now())
            }),
        )
    }

    pub fn net_balances(&self, group: &GroupId) -> Result<BalanceSheet, SplitError> {
        self.with_group(group, |state| Ok(state.balances()))
    }

    /// Replace the group's PENDING obligations with a fresh minimization.
    pub fn recompute(&self, group: &GroupId) -> Result<Vec<Obligation>, SplitError> {
        logged(
            "recompute",
            self.with_group(group, |state| state.recompute(Utc::now())),
        )
    }

    /// PENDING obligations of the group.
    pub fn group_obligations(&self, group: &GroupId) -> Result<Vec<Obligation>, SplitError> {
        self.with_group(group, |state| Ok(state.ledger().pending().cloned().collect()))
    }

    /// Every obligation the group ever had, in creation order.
    pub fn obligation_history(&self, group: &GroupId) -> Result<Vec<Obligation>, SplitError> {
        self.with_group(group, |state| Ok(state.ledger().history().to_vec()))
    }

    pub fn settle_obligation(
        &self,
        group: &GroupId,
        id: Uuid,
        actor: &MemberId,
        method: Option<PaymentMethod>,
        reference: Option<String>,
    ) -> Result<Obligation, SplitError> {
        logged(
            "settle obligation",
            self.with_group(group, |state| {
                state.settle_obligation(id, actor, method, reference, Utc::now())
            }),
        )
    }

    pub fn cancel_obligation(
        &self,
        group: &GroupId,
        id: Uuid,
        actor: &MemberId,
    ) -> Result<Obligation, SplitError> {
        logged(
            "cancel obligation",
            self.with_group(group, |state| state.cancel_obligation(id, actor, Utc::now())),
        )
    }

    /// Count a reminder on a PENDING obligation. Returns the new count.
    pub fn remind(&self, group: &GroupId, id: Uuid, actor: &MemberId) -> Result<u32, SplitError> {
        logged(
            "remind",
            self.with_group(group, |state| state.remind(id, actor, Utc::now())),
        )
    }

    pub fn payment_links(&self, group: &GroupId, id: Uuid) -> Result<Option<PaymentLinks>, SplitError> {
        self.with_group(group, |state| state.payment_links(id))
    }

    /// PENDING obligations in any group where `member` pays or is paid,
    /// newest first.
    pub fn pending_for_member(&self, member: &MemberId) -> Vec<Obligation> {
        let mut pending = Vec::new();
        for group in self.all_groups() {
            let state = group.lock().unwrap_or_else(PoisonError::into_inner);
            pending.extend(
                state
                    .ledger()
                    .pending()
                    .filter(|o| o.debtor() == member || o.creditor() == member)
                    .cloned(),
            );
        }
        pending.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        pending
    }

    /// What `member` owes and is owed across all PENDING obligations.
    pub fn member_totals(&self, member: &MemberId) -> MemberTotals {
        let mut totals = MemberTotals::default();
        for obligation in self.pending_for_member(member) {
            if obligation.debtor() == member {
                totals.you_owe += obligation.amount();
            } else {
                totals.you_get += obligation.amount();
            }
        }
        totals
    }

    /// Members owing PENDING obligations that were reminded more often than
    /// the configured threshold, with the number of such obligations,
    /// highest count first.
    pub fn frequent_delayers(&self) -> Vec<(MemberId, usize)> {
        let mut counts: BTreeMap<MemberId, usize> = BTreeMap::new();
        for group in self.all_groups() {
            let state = group.lock().unwrap_or_else(PoisonError::into_inner);
            for (member, count) in state.ledger().delayed_debtors(self.config.delayer_threshold) {
                *counts.entry(member).or_insert(0) += count;
            }
        }
        let mut delayers: Vec<(MemberId, usize)> = counts.into_iter().collect();
        // Stable sort keeps ties in member order.
        delayers.sort_by(|a, b| b.1.cmp(&a.1));
        delayers
    }

    fn group(&self, id: &GroupId) -> Result<Arc<Mutex<GroupState>>, NotFound> {
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        groups
            .get(id)
            .cloned()
            .ok_or_else(|| NotFound::Group(id.clone()))
    }

    fn all_groups(&self) -> Vec<Arc<Mutex<GroupState>>> {
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        groups.values().cloned().collect()
    }

    /// Run `op` inside the group's critical section.
    fn with_group<T>(
        &self,
        id: &GroupId,
        op: impl FnOnce(&mut GroupState) -> Result<T, SplitError>,
    ) -> Result<T, SplitError> {
        let group = self.group(id)?;
        let mut state = group.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut state)
    }
}

fn logged<T>(operation: &str, result: Result<T, SplitError>) -> Result<T, SplitError> {
    if let Err(e) = &result {
        if e.is_internal() {
            error!("{} failed: {}", operation, e);
        } else {
            warn!("{} rejected: {}", operation, e);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::money;
    use crate::split::allocation::Allocation;

    fn registry_with(group: &str, names: &[&str]) -> (GroupRegistry, GroupId) {
        let registry = GroupRegistry::new();
        let id = GroupId::new(group);
        registry.create_group(id.clone(), group).unwrap();
        for name in names {
            registry
                .add_member(&id, Member::new(MemberId::new(*name), name.to_uppercase()))
                .unwrap();
        }
        (registry, id)
    }

    fn equal(amount: &str, names: &[&str]) -> ExpenseRequest {
        ExpenseRequest::new(
            "dinner",
            money(amount),
            Allocation::Equal {
                participants: names.iter().map(|n| MemberId::new(*n)).collect(),
            },
        )
    }

    #[test]
    fn test_unknown_group() {
        let registry = GroupRegistry::new();
        let err = registry.net_balances(&GroupId::new("nope")).unwrap_err();
        assert_eq!(err, SplitError::NotFound(NotFound::Group(GroupId::new("nope"))));
    }

    #[test]
    fn test_duplicate_group() {
        let (registry, id) = registry_with("flat", &[]);
        assert!(matches!(
            registry.create_group(id, "again"),
            Err(SplitError::Validation(ValidationError::GroupExists(_)))
        ));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let (registry, flat) = registry_with("flat", &["a", "b"]);
        registry.create_group(GroupId::new("attic"), "Attic").unwrap();
        assert_eq!(registry.group_ids(), vec![GroupId::new("attic"), flat.clone()]);

        let before = registry.snapshot(&flat).unwrap();
        registry
            .create_expense(&flat, &MemberId::new("a"), equal("20", &["a", "b"]))
            .unwrap();
        assert!(before.expenses().is_empty());
        assert_eq!(registry.snapshot(&flat).unwrap().expenses().len(), 1);
    }

    #[test]
    fn test_member_totals_across_groups() {
        let (registry, flat) = registry_with("flat", &["a", "b", "c"]);
        let trip = GroupId::new("trip");
        registry.create_group(trip.clone(), "Trip").unwrap();
        registry.add_member(&trip, Member::new(MemberId::new("a"), "A")).unwrap();
        registry.add_member(&trip, Member::new(MemberId::new("b"), "B")).unwrap();

        registry
            .create_expense(&flat, &MemberId::new("a"), equal("90", &["a", "b", "c"]))
            .unwrap();
        registry
            .create_expense(&trip, &MemberId::new("b"), equal("40", &["a", "b"]))
            .unwrap();

        let totals = registry.member_totals(&MemberId::new("a"));
        assert_eq!(totals.you_get, money("60"));
        assert_eq!(totals.you_owe, money("20"));
        assert_eq!(registry.pending_for_member(&MemberId::new("a")).len(), 3);
    }

    #[test]
    fn test_frequent_delayers() {
        let (registry, flat) = registry_with("flat", &["a", "b", "c"]);
        let receipt = registry
            .create_expense(&flat, &MemberId::new("a"), equal("90", &["a", "b", "c"]))
            .unwrap();
        let owed_by_c = receipt
            .obligations
            .iter()
            .find(|o| o.debtor() == &MemberId::new("c"))
            .unwrap()
            .id();

        for _ in 0..3 {
            registry.remind(&flat, owed_by_c, &MemberId::new("a")).unwrap();
        }
        assert_eq!(registry.frequent_delayers(), vec![(MemberId::new("c"), 1)]);
    }

    #[test]
    fn test_cancel_requires_party() {
        let (registry, flat) = registry_with("flat", &["a", "b", "c"]);
        let receipt = registry
            .create_expense(&flat, &MemberId::new("a"), equal("20", &["a", "b"]))
            .unwrap();
        let id = receipt.obligations[0].id();

        assert!(registry.cancel_obligation(&flat, id, &MemberId::new("c")).is_err());
        let cancelled = registry.cancel_obligation(&flat, id, &MemberId::new("a")).unwrap();
        assert!(!cancelled.is_pending());
        assert!(registry.group_obligations(&flat).unwrap().is_empty());

        // The debt itself is still there, so recomputation brings it back.
        let pending = registry.recompute(&flat).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(registry.obligation_history(&flat).unwrap().len(), 2);
    }
}
