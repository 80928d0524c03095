//! Random group scenarios for benchmarks, property tests and the CLI.
//!
//! A [`Scenario`] is also the JSON input format of `splitsmart-engine settle`.

use crate::core::error::SplitError;
use crate::core::expense::Category;
use crate::core::member::{GroupId, Member, MemberId};
use crate::core::money::MoneyAmount;
use crate::group::registry::GroupRegistry;
use crate::group::state::ExpenseRequest;
use crate::split::allocation::{Allocation, CustomEntry, LineItem, PercentageEntry};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A group with its members and the expenses to record, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub group: GroupId,
    #[serde(default)]
    pub name: String,
    pub members: Vec<Member>,
    pub expenses: Vec<ScenarioExpense>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioExpense {
    /// The member who paid, and who records the expense.
    pub payer: MemberId,
    pub expense: ExpenseRequest,
}

impl Scenario {
    /// Create the group in `registry` and record every expense.
    pub fn replay(&self, registry: &GroupRegistry) -> Result<(), SplitError> {
        let name = if self.name.is_empty() {
            self.group.as_str()
        } else {
            self.name.as_str()
        };
        registry.create_group(self.group.clone(), name)?;
        for member in &self.members {
            registry.add_member(&self.group, member.clone())?;
        }
        for entry in &self.expenses {
            registry.create_expense(&self.group, &entry.payer, entry.expense.clone())?;
        }
        Ok(())
    }
}

/// Configuration for generating a random scenario.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub group: GroupId,
    /// Number of members in the group.
    pub member_count: usize,
    /// Number of expenses to generate.
    pub expense_count: usize,
    /// Upper bound for one expense, in minor units.
    pub max_amount_minor: i64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            group: GroupId::new("generated"),
            member_count: 6,
            expense_count: 20,
            max_amount_minor: 500_000,
        }
    }
}

const CATEGORIES: [Category; 6] = [
    Category::Food,
    Category::Transport,
    Category::Entertainment,
    Category::Utilities,
    Category::Travel,
    Category::Rent,
];

/// Generate a random, valid scenario. Every allocation mode is used.
///
/// # Panics
///
/// Panics if `config.member_count` is zero or `config.max_amount_minor` is
/// below 100.
pub fn generate_scenario<R: Rng>(config: &ScenarioConfig, rng: &mut R) -> Scenario {
    assert!(config.member_count > 0, "a scenario needs at least one member");
    assert!(config.max_amount_minor >= 100, "max amount must be at least 1.00");

    let members: Vec<Member> = (0..config.member_count)
        .map(|i| {
            let member = Member::new(MemberId::new(format!("member-{:02}", i)), format!("Member {:02}", i));
            if i % 2 == 0 {
                member.with_payment_id(format!("member{:02}@upi", i))
            } else {
                member
            }
        })
        .collect();
    let ids: Vec<MemberId> = members.iter().map(|m| m.id().clone()).collect();

    let expenses = (0..config.expense_count)
        .map(|n| {
            let payer = ids[rng.gen_range(0..ids.len())].clone();
            let total = rng.gen_range(100..=config.max_amount_minor);
            let (amount, split) = match n % 5 {
                0 => (total, Allocation::Equal { participants: pick(&ids, rng) }),
                1 => (total, Allocation::Partial { consumers: pick(&ids, rng) }),
                2 => itemized(&ids, total, rng),
                3 => (total, percentage(&ids, rng)),
                _ => (total, custom(&ids, total, rng)),
            };
            let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
            ScenarioExpense {
                payer,
                expense: ExpenseRequest::new(
                    format!("expense #{}", n + 1),
                    MoneyAmount::from_minor_units(amount),
                    split,
                )
                .with_category(category),
            }
        })
        .collect();

    Scenario {
        group: config.group.clone(),
        name: format!("Generated group {}", config.group),
        members,
        expenses,
    }
}

/// A random non-empty subset, in random order.
fn pick<R: Rng>(ids: &[MemberId], rng: &mut R) -> Vec<MemberId> {
    let count = rng.gen_range(1..=ids.len());
    ids.choose_multiple(rng, count).cloned().collect()
}

/// Split `total` into `parts` non-negative pieces at random cut points.
fn cut<R: Rng>(total: i64, parts: usize, rng: &mut R) -> Vec<i64> {
    let mut points: Vec<i64> = (1..parts).map(|_| rng.gen_range(0..=total)).collect();
    points.sort_unstable();
    points.push(total);

    let mut previous = 0;
    points
        .into_iter()
        .map(|p| {
            let piece = p - previous;
            previous = p;
            piece
        })
        .collect()
}

/// Items whose line totals define the expense amount, so the bill always
/// adds up.
fn itemized<R: Rng>(ids: &[MemberId], total: i64, rng: &mut R) -> (i64, Allocation) {
    let count = rng.gen_range(1..=4usize);
    let mut amount = 0;
    let items = cut(total, count, rng)
        .into_iter()
        .enumerate()
        .map(|(i, budget)| {
            let quantity = rng.gen_range(1..=3u32);
            let price = (budget / i64::from(quantity)).max(1);
            amount += price * i64::from(quantity);
            LineItem::new(format!("item {}", i + 1), MoneyAmount::from_minor_units(price), pick(ids, rng))
                .with_quantity(quantity)
        })
        .collect();
    (amount, Allocation::Itemized { items })
}

/// Percentages in hundredths that add up to exactly 100.
fn percentage<R: Rng>(ids: &[MemberId], rng: &mut R) -> Allocation {
    let members = pick(ids, rng);
    let basis_points = cut(10_000, members.len(), rng);
    let entries = members
        .into_iter()
        .zip(basis_points)
        .map(|(member, bp)| PercentageEntry::new(member, Decimal::new(bp, 2)))
        .collect();
    Allocation::Percentage { entries }
}

fn custom<R: Rng>(ids: &[MemberId], total: i64, rng: &mut R) -> Allocation {
    let members = pick(ids, rng);
    let amounts = cut(total, members.len(), rng);
    let entries = members
        .into_iter()
        .zip(amounts)
        .map(|(member, units)| CustomEntry::new(member, MoneyAmount::from_minor_units(units)))
        .collect();
    Allocation::Custom { entries }
}
