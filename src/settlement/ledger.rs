use crate::core::error::{NotFound, SplitError};
use crate::core::expense::PaymentMethod;
use crate::core::member::{GroupId, MemberId};
use crate::core::obligation::{Obligation, ObligationStatus};
use crate::settlement::minimizer::Transfer;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The obligation set of one group, pending and resolved.
///
/// Recomputation is replace-all: [`SettlementLedger::replace_pending`]
/// cancels every PENDING obligation and installs the freshly minimized set.
/// COMPLETED and CANCELLED obligations stay in the ledger as history and are
/// never regenerated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementLedger {
    /// Obligations in creation order.
    obligations: Vec<Obligation>,
}

impl SettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every PENDING obligation and install `transfers` as the new
    /// PENDING set. Returns the installed obligations.
    pub fn replace_pending(
        &mut self,
        group: &GroupId,
        transfers: Vec<Transfer>,
        now: DateTime<Utc>,
    ) -> Vec<Obligation> {
        let mut discarded = 0usize;
        for obligation in self.obligations.iter_mut().filter(|o| o.is_pending()) {
            // Pending obligations always accept a cancel.
            if obligation.cancel(now).is_ok() {
                discarded += 1;
            }
        }

        let installed: Vec<Obligation> = transfers
            .into_iter()
            .map(|t| Obligation::with_id(Uuid::new_v4(), group.clone(), t.debtor, t.creditor, t.amount, now))
            .collect();
        self.obligations.extend(installed.iter().cloned());

        debug!(
            "group {}: discarded {} pending obligations, installed {}",
            group,
            discarded,
            installed.len()
        );
        installed
    }

    /// Mark a PENDING obligation COMPLETED.
    pub fn settle(
        &mut self,
        id: Uuid,
        method: Option<PaymentMethod>,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Obligation, SplitError> {
        let obligation = self.get_mut(id)?;
        obligation.settle(method, reference, now)?;
        info!("obligation {} settled: {}", id, obligation);
        Ok(obligation)
    }

    /// Mark a PENDING obligation CANCELLED.
    pub fn cancel(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<&Obligation, SplitError> {
        let obligation = self.get_mut(id)?;
        obligation.cancel(now)?;
        info!("obligation {} cancelled", id);
        Ok(obligation)
    }

    /// Count a reminder on a PENDING obligation. Returns the new count.
    pub fn remind(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<u32, SplitError> {
        let obligation = self.get_mut(id)?;
        let count = obligation.remind(now)?;
        debug!("obligation {} reminded ({} so far)", id, count);
        Ok(count)
    }

    pub fn get(&self, id: Uuid) -> Result<&Obligation, NotFound> {
        self.obligations
            .iter()
            .find(|o| o.id() == id)
            .ok_or(NotFound::Obligation(id))
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Obligation, NotFound> {
        self.obligations
            .iter_mut()
            .find(|o| o.id() == id)
            .ok_or(NotFound::Obligation(id))
    }

    /// The current PENDING obligations.
    pub fn pending(&self) -> impl Iterator<Item = &Obligation> {
        self.obligations.iter().filter(|o| o.is_pending())
    }

    /// Every obligation ever installed, COMPLETED and CANCELLED included.
    pub fn history(&self) -> &[Obligation] {
        &self.obligations
    }

    pub fn completed(&self) -> impl Iterator<Item = &Obligation> {
        self.obligations
            .iter()
            .filter(|o| o.status() == ObligationStatus::Completed)
    }

    /// For each debtor, the number of their PENDING obligations reminded
    /// more than `threshold` times.
    pub fn delayed_debtors(&self, threshold: u32) -> BTreeMap<MemberId, usize> {
        let mut delayed = BTreeMap::new();
        for obligation in self.pending().filter(|o| o.reminder_count() > threshold) {
            *delayed.entry(obligation.debtor().clone()).or_insert(0) += 1;
        }
        delayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::money;

    fn group() -> GroupId {
        GroupId::new("flat")
    }

    fn transfer(debtor: &str, creditor: &str, amount: &str) -> Transfer {
        Transfer {
            debtor: MemberId::new(debtor),
            creditor: MemberId::new(creditor),
            amount: money(amount),
        }
    }

    #[test]
    fn test_replace_pending_keeps_history() {
        let mut ledger = SettlementLedger::new();
        let first = ledger.replace_pending(&group(), vec![transfer("b", "a", "30")], Utc::now());
        let second = ledger.replace_pending(
            &group(),
            vec![transfer("b", "a", "45"), transfer("c", "a", "15")],
            Utc::now(),
        );

        assert_eq!(ledger.pending().count(), 2);
        assert_eq!(ledger.history().len(), 3);
        assert_eq!(
            ledger.get(first[0].id()).unwrap().status(),
            ObligationStatus::Cancelled
        );
        assert!(second.iter().all(|o| o.is_pending()));
    }

    #[test]
    fn test_settled_obligation_survives_replacement() {
        let mut ledger = SettlementLedger::new();
        let installed = ledger.replace_pending(&group(), vec![transfer("b", "a", "30")], Utc::now());
        let id = installed[0].id();
        ledger
            .settle(id, Some(PaymentMethod::Cash), None, Utc::now())
            .unwrap();

        ledger.replace_pending(&group(), Vec::new(), Utc::now());
        assert_eq!(ledger.get(id).unwrap().status(), ObligationStatus::Completed);
        assert_eq!(ledger.completed().count(), 1);
        assert_eq!(ledger.pending().count(), 0);
    }

    #[test]
    fn test_unknown_obligation() {
        let mut ledger = SettlementLedger::new();
        let id = Uuid::new_v4();
        assert_eq!(
            ledger.cancel(id, Utc::now()).unwrap_err(),
            SplitError::NotFound(NotFound::Obligation(id))
        );
    }

    #[test]
    fn test_settle_twice_is_invalid() {
        let mut ledger = SettlementLedger::new();
        let id = ledger.replace_pending(&group(), vec![transfer("b", "a", "30")], Utc::now())[0].id();
        ledger.settle(id, None, None, Utc::now()).unwrap();
        assert!(matches!(
            ledger.settle(id, None, None, Utc::now()),
            Err(SplitError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_delayed_debtors_above_threshold() {
        let mut ledger = SettlementLedger::new();
        let installed = ledger.replace_pending(
            &group(),
            vec![transfer("b", "a", "30"), transfer("c", "a", "30")],
            Utc::now(),
        );
        for _ in 0..3 {
            ledger.remind(installed[0].id(), Utc::now()).unwrap();
        }
        ledger.remind(installed[1].id(), Utc::now()).unwrap();
        ledger.remind(installed[1].id(), Utc::now()).unwrap();

        let delayed = ledger.delayed_debtors(2);
        assert_eq!(delayed.len(), 1);
        assert_eq!(delayed.get(&MemberId::new("b")), Some(&1));
    }
}
