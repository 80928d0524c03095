use crate::core::error::SplitError;
use crate::core::member::MemberId;
use crate::core::money::MoneyAmount;
use crate::settlement::balance::BalanceSheet;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A proposed payment: `debtor` pays `creditor` `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub debtor: MemberId,
    pub creditor: MemberId,
    pub amount: MoneyAmount,
}

impl std::fmt::Display for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {} {}", self.debtor, self.creditor, self.amount)
    }
}

/// Heap entry: magnitude in minor units, ties broken by ascending member id.
type Entry = (i64, Reverse<MemberId>);

/// Reduces a group's net balances to a small set of payments.
///
/// # Algorithm
///
/// 1. Convert every non-zero balance to integer minor units.
/// 2. Push creditors and debtors onto two max-heaps keyed by magnitude.
/// 3. Repeatedly pop the largest creditor and the largest debtor, emit a
///    transfer of the smaller magnitude, and push back whichever side still
///    has a remainder. When both magnitudes are equal, both are resolved.
///
/// Runs in O(n log n) and emits at most `n - 1` transfers for `n` members
/// with non-zero balances. It is a greedy heuristic: it does not search for
/// the global minimum number of transfers.
///
/// # Examples
///
/// ```
/// use splitsmart_engine::core::member::MemberId;
/// use splitsmart_engine::core::money::money;
/// use splitsmart_engine::settlement::balance::BalanceSheet;
/// use splitsmart_engine::settlement::minimizer::SettlementMinimizer;
///
/// let sheet: BalanceSheet = [
///     (MemberId::new("a"), money("60")),
///     (MemberId::new("b"), money("-30")),
///     (MemberId::new("c"), money("-30")),
/// ].into_iter().collect();
///
/// let transfers = SettlementMinimizer::minimize(&sheet).unwrap();
/// assert_eq!(transfers.len(), 2);
/// assert!(transfers.iter().all(|t| t.creditor == MemberId::new("a")));
/// ```
pub struct SettlementMinimizer;

impl SettlementMinimizer {
    pub fn minimize(balances: &BalanceSheet) -> Result<Vec<Transfer>, SplitError> {
        let residual = balances.residual();
        if !residual.is_zero() {
            error!("refusing to minimize unbalanced sheet, residual {}", residual);
            return Err(SplitError::ConservationViolation { residual });
        }

        let mut creditors: BinaryHeap<Entry> = BinaryHeap::new();
        let mut debtors: BinaryHeap<Entry> = BinaryHeap::new();

        for (member, amount) in balances.iter() {
            let units = amount.to_minor_units()?;
            if units > 0 {
                creditors.push((units, Reverse(member.clone())));
            } else if units < 0 {
                debtors.push((-units, Reverse(member.clone())));
            }
        }

        let mut transfers = Vec::new();
        while !creditors.is_empty() && !debtors.is_empty() {
            let (Some((credit, Reverse(creditor))), Some((debt, Reverse(debtor)))) =
                (creditors.pop(), debtors.pop())
            else {
                break;
            };
            let settled = credit.min(debt);
            transfers.push(Transfer {
                debtor: debtor.clone(),
                creditor: creditor.clone(),
                amount: MoneyAmount::from_minor_units(settled),
            });

            if credit > settled {
                creditors.push((credit - settled, Reverse(creditor)));
            }
            if debt > settled {
                debtors.push((debt - settled, Reverse(debtor)));
            }
        }

        let leftover: i64 = creditors.iter().map(|(u, _)| *u).sum::<i64>()
            - debtors.iter().map(|(u, _)| *u).sum::<i64>();
        if !creditors.is_empty() || !debtors.is_empty() {
            let residual = MoneyAmount::from_minor_units(leftover);
            error!("minimization left unmatched balances, residual {}", residual);
            return Err(SplitError::ConservationViolation { residual });
        }

        debug!(
            "minimized {} non-zero balances into {} transfers",
            balances.unsettled_count(),
            transfers.len()
        );
        Ok(transfers)
    }
}
