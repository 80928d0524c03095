use crate::core::error::ValidationError;
use crate::core::expense::{AllocationMode, Expense, Share};
use crate::core::member::MemberId;
use crate::core::money::MoneyAmount;
use crate::split::allocation::{Allocation, CustomEntry, LineItem, PercentageEntry};
use log::debug;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Turns one expense plus its allocation into per-member shares.
///
/// Computation is pure: the same expense, allocation and roster always
/// produce the same shares, and nothing outside the return value changes.
///
/// # Rounding
///
/// Per-member amounts are rounded half-up to two places. Whatever residue
/// that leaves against the total (at most half a cent per member, either
/// sign) is absorbed by the payer's share when the payer is a recipient,
/// otherwise by the first recipient in input order. If a negative residue
/// is larger than that share, it is taken one cent at a time from the
/// recipients in turn, starting with that share. The shares of an expense
/// therefore always add up to its total exactly.
///
/// # Examples
///
/// ```
/// use splitsmart_engine::core::expense::{AllocationMode, Expense};
/// use splitsmart_engine::core::member::{GroupId, MemberId};
/// use splitsmart_engine::core::money::money;
/// use splitsmart_engine::split::allocation::Allocation;
/// use splitsmart_engine::split::calculator::SplitCalculator;
/// use std::collections::BTreeSet;
///
/// let members: Vec<MemberId> = ["a", "b", "c"].into_iter().map(MemberId::new).collect();
/// let roster: BTreeSet<MemberId> = members.iter().cloned().collect();
/// let expense = Expense::new(
///     GroupId::new("g"), "Dinner", money("100"), AllocationMode::Equal, members[0].clone(),
/// );
///
/// let shares = SplitCalculator::compute_shares(
///     &expense,
///     &Allocation::Equal { participants: members },
///     &roster,
/// ).unwrap();
///
/// // 33.33 each, the payer absorbs the leftover cent.
/// assert_eq!(shares[0].amount(), money("33.34"));
/// assert_eq!(shares[1].amount(), money("33.33"));
/// assert!(shares[0].is_paid());
/// ```
pub struct SplitCalculator;

impl SplitCalculator {
    /// Compute the shares of `expense` under `allocation`.
    ///
    /// `roster` is the set of active members of the expense's group; every
    /// member referenced by the allocation must belong to it.
    pub fn compute_shares(
        expense: &Expense,
        allocation: &Allocation,
        roster: &BTreeSet<MemberId>,
    ) -> Result<Vec<Share>, ValidationError> {
        debug_assert_eq!(expense.mode(), allocation.mode());

        if !expense.amount().is_positive() {
            return Err(ValidationError::NonPositiveAmount(expense.amount()));
        }
        // Totals must fit in minor units.
        expense.amount().to_minor_units()?;

        let amounts = match allocation {
            Allocation::Equal { participants } => {
                Self::even_split(expense, AllocationMode::Equal, participants, roster)?
            }
            Allocation::Partial { consumers } => {
                Self::even_split(expense, AllocationMode::Partial, consumers, roster)?
            }
            Allocation::Itemized { items } => Self::itemized_split(expense, items, roster)?,
            Allocation::Percentage { entries } => {
                Self::percentage_split(expense, entries, roster)?
            }
            Allocation::Custom { entries } => Self::custom_split(expense, entries, roster)?,
        };

        debug_assert_eq!(
            amounts.iter().map(|a| a.amount).sum::<MoneyAmount>(),
            expense.amount(),
            "shares must add up to the expense total"
        );
        debug!(
            "split {} of {} ({}) into {} shares",
            expense.id(),
            expense.amount(),
            allocation.mode(),
            amounts.len()
        );

        Ok(amounts
            .into_iter()
            .map(|a| {
                let mut share = Share::new(expense.id(), a.member, a.amount);
                if let Some(percentage) = a.percentage {
                    share = share.with_percentage(percentage);
                }
                if share.member() == expense.payer() {
                    share = share.prepaid(expense.created_at());
                }
                share
            })
            .collect())
    }

    /// EQUAL and PARTIAL: the total divided evenly among a set of members.
    fn even_split(
        expense: &Expense,
        mode: AllocationMode,
        members: &[MemberId],
        roster: &BTreeSet<MemberId>,
    ) -> Result<Vec<Allotted>, ValidationError> {
        if members.is_empty() {
            return Err(ValidationError::MissingParticipants {
                mode: mode.as_str(),
            });
        }
        check_members(members.iter(), roster)?;

        let anchor = anchor_index(members.iter(), expense.payer());
        let amounts = divide_evenly(expense.amount(), members.len(), anchor)?;
        let percentage = (mode == AllocationMode::Equal).then(|| {
            (Decimal::ONE_HUNDRED / Decimal::from(members.len()))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        });

        Ok(members
            .iter()
            .zip(amounts)
            .map(|(member, amount)| Allotted {
                member: member.clone(),
                amount,
                percentage,
            })
            .collect())
    }

    /// ITEMIZED: each line is divided among its assignees, accumulated per member.
    fn itemized_split(
        expense: &Expense,
        items: &[LineItem],
        roster: &BTreeSet<MemberId>,
    ) -> Result<Vec<Allotted>, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::MissingItems);
        }

        for item in items {
            if item.assignees.is_empty() {
                return Err(ValidationError::ItemWithoutAssignees {
                    item: item.name.clone(),
                });
            }
            if item.quantity == 0 {
                return Err(ValidationError::ZeroQuantity {
                    item: item.name.clone(),
                });
            }
            if item.price.is_negative() {
                return Err(ValidationError::NegativePrice {
                    item: item.name.clone(),
                    price: item.price,
                });
            }
            check_members(item.assignees.iter(), roster)?;
        }

        let lines = items
            .iter()
            .map(LineItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        let items_total = MoneyAmount::checked_sum(lines.iter().copied())?;
        if items_total != expense.amount() {
            return Err(ValidationError::ItemizedTotalMismatch {
                items_total,
                expected: expense.amount(),
            });
        }

        // Members in order of first appearance.
        let mut order: Vec<MemberId> = Vec::new();
        let mut totals: HashMap<MemberId, MoneyAmount> = HashMap::new();

        for (item, line) in items.iter().zip(lines) {
            let anchor = anchor_index(item.assignees.iter(), expense.payer());
            let amounts = divide_evenly(line, item.assignees.len(), anchor)?;
            for (member, amount) in item.assignees.iter().zip(amounts) {
                let total = totals.entry(member.clone()).or_insert_with(|| {
                    order.push(member.clone());
                    MoneyAmount::ZERO
                });
                *total += amount;
            }
        }

        Ok(order
            .into_iter()
            .map(|member| {
                let amount = totals.get(&member).copied().unwrap_or(MoneyAmount::ZERO);
                Allotted {
                    member,
                    amount,
                    percentage: None,
                }
            })
            .collect())
    }

    /// PERCENTAGE: percentages must add up to exactly 100.
    fn percentage_split(
        expense: &Expense,
        entries: &[PercentageEntry],
        roster: &BTreeSet<MemberId>,
    ) -> Result<Vec<Allotted>, ValidationError> {
        if entries.is_empty() {
            return Err(ValidationError::MissingParticipants {
                mode: AllocationMode::Percentage.as_str(),
            });
        }
        check_members(entries.iter().map(|e| &e.member), roster)?;
        if let Some(entry) = entries.iter().find(|e| e.percentage < Decimal::ZERO) {
            return Err(ValidationError::NegativePercentage {
                member: entry.member.clone(),
                percentage: entry.percentage,
            });
        }

        let total_percent = entries.iter().try_fold(Decimal::ZERO, |sum, e| {
            sum.checked_add(e.percentage)
                .ok_or(ValidationError::OutOfRange(e.percentage))
        })?;
        if total_percent != Decimal::ONE_HUNDRED {
            return Err(ValidationError::PercentageSum(total_percent));
        }

        let total = expense.amount();
        let mut units = entries
            .iter()
            .map(|e| {
                let part = total
                    .as_decimal()
                    .checked_mul(e.percentage)
                    .ok_or(ValidationError::OutOfRange(e.percentage))?;
                MoneyAmount::round_half_up(part / Decimal::ONE_HUNDRED).to_minor_units()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let allotted = units
            .iter()
            .try_fold(0i64, |sum, u| sum.checked_add(*u))
            .ok_or(ValidationError::OutOfRange(total.as_decimal()))?;
        let residue = total.to_minor_units()? - allotted;
        let anchor = anchor_index(entries.iter().map(|e| &e.member), expense.payer());
        absorb_residue(&mut units, anchor, residue);

        Ok(entries
            .iter()
            .zip(units)
            .map(|(e, units)| Allotted {
                member: e.member.clone(),
                amount: MoneyAmount::from_minor_units(units),
                percentage: Some(e.percentage),
            })
            .collect())
    }

    /// CUSTOM: explicit amounts must add up to exactly the total.
    fn custom_split(
        expense: &Expense,
        entries: &[CustomEntry],
        roster: &BTreeSet<MemberId>,
    ) -> Result<Vec<Allotted>, ValidationError> {
        if entries.is_empty() {
            return Err(ValidationError::MissingParticipants {
                mode: AllocationMode::Custom.as_str(),
            });
        }
        check_members(entries.iter().map(|e| &e.member), roster)?;
        if let Some(entry) = entries.iter().find(|e| e.amount.is_negative()) {
            return Err(ValidationError::NegativeShare {
                member: entry.member.clone(),
                amount: entry.amount,
            });
        }

        let total = MoneyAmount::checked_sum(entries.iter().map(|e| e.amount))?;
        if total != expense.amount() {
            return Err(ValidationError::CustomSum {
                total,
                expected: expense.amount(),
            });
        }

        Ok(entries
            .iter()
            .map(|e| Allotted {
                member: e.member.clone(),
                amount: e.amount,
                percentage: None,
            })
            .collect())
    }
}

/// A member's computed portion, before it becomes a [`Share`].
struct Allotted {
    member: MemberId,
    amount: MoneyAmount,
    percentage: Option<Decimal>,
}

/// Reject repeated members and members outside the roster.
fn check_members<'a>(
    members: impl Iterator<Item = &'a MemberId>,
    roster: &BTreeSet<MemberId>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for member in members {
        if !roster.contains(member) {
            return Err(ValidationError::UnknownMember(member.clone()));
        }
        if !seen.insert(member) {
            return Err(ValidationError::DuplicateMember(member.clone()));
        }
    }
    Ok(())
}

/// Position of the payer among the recipients, or the first recipient.
fn anchor_index<'a>(mut members: impl Iterator<Item = &'a MemberId>, payer: &MemberId) -> usize {
    members.position(|m| m == payer).unwrap_or(0)
}

/// Divide `total` into `n` half-up rounded parts that add back up to `total`.
fn divide_evenly(total: MoneyAmount, n: usize, anchor: usize) -> Result<Vec<MoneyAmount>, ValidationError> {
    let per_member = MoneyAmount::round_half_up(total.as_decimal() / Decimal::from(n)).to_minor_units()?;
    let mut units = vec![per_member; n];
    let allotted = per_member
        .checked_mul(n as i64)
        .ok_or(ValidationError::OutOfRange(total.as_decimal()))?;
    let residue = total.to_minor_units()? - allotted;
    absorb_residue(&mut units, anchor, residue);
    Ok(units.into_iter().map(MoneyAmount::from_minor_units).collect())
}

/// Fold a signed residue (in minor units) into `units` so they sum to the target.
///
/// The anchor absorbs it whole when it can; otherwise single units are taken
/// round-robin from the anchor onwards, never driving a part below zero.
/// Callers guarantee `sum(units) + residue >= 0`.
fn absorb_residue(units: &mut [i64], anchor: usize, residue: i64) {
    if residue == 0 || units.is_empty() {
        return;
    }
    if units[anchor] + residue >= 0 {
        units[anchor] += residue;
        return;
    }

    let mut remaining = residue;
    let mut i = anchor;
    while remaining < 0 {
        if units[i] > 0 {
            units[i] -= 1;
            remaining += 1;
        }
        i = (i + 1) % units.len();
    }
}
