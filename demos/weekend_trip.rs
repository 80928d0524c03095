//! A weekend trip, split five different ways.
//!
//! Records one expense per allocation mode, then prints the balances,
//! the minimized obligations and the payment links for each one.

use rust_decimal_macros::dec;
use splitsmart_engine::prelude::*;
use splitsmart_engine::core::money::money;

fn main() -> Result<(), SplitError> {
    println!("╔═══════════════════════════════════════════╗");
    println!("║  splitsmart-engine: Weekend Trip Example  ║");
    println!("╚═══════════════════════════════════════════╝\n");

    let registry = GroupRegistry::new();
    let trip = GroupId::new("goa-2026");
    registry.create_group(trip.clone(), "Goa weekend")?;

    let asha = MemberId::new("asha");
    let ravi = MemberId::new("ravi");
    let meera = MemberId::new("meera");
    let kabir = MemberId::new("kabir");
    registry.add_member(&trip, Member::new(asha.clone(), "Asha Rao").with_payment_id("asha@okicici"))?;
    registry.add_member(&trip, Member::new(ravi.clone(), "Ravi Menon").with_payment_id("ravi@ybl"))?;
    registry.add_member(&trip, Member::new(meera.clone(), "Meera Nair"))?;
    registry.add_member(&trip, Member::new(kabir.clone(), "Kabir"))?;
    let everyone = vec![asha.clone(), ravi.clone(), meera.clone(), kabir.clone()];

    // --- Equal: the villa ---
    registry.create_expense(
        &trip,
        &asha,
        ExpenseRequest::new("Villa", money("12000"), Allocation::Equal { participants: everyone.clone() })
            .with_category(Category::Rent),
    )?;

    // --- Itemized: dinner at the shack ---
    registry.create_expense(
        &trip,
        &ravi,
        ExpenseRequest::new(
            "Beach shack dinner",
            money("2350"),
            Allocation::Itemized {
                items: vec![
                    LineItem::new("Fish thali", money("450"), vec![asha.clone(), ravi.clone()]).with_quantity(2),
                    LineItem::new("Prawn curry", money("650"), vec![meera.clone(), kabir.clone()]),
                    LineItem::new("Feni", money("200"), everyone.clone()).with_quantity(4),
                ],
            },
        )
        .with_category(Category::Food),
    )?;

    // --- Partial: only two went scuba diving ---
    registry.create_expense(
        &trip,
        &meera,
        ExpenseRequest::new(
            "Scuba diving",
            money("7000"),
            Allocation::Partial { consumers: vec![meera.clone(), kabir.clone()] },
        )
        .with_category(Category::Entertainment),
    )?;

    // --- Percentage: the car, by distance driven ---
    registry.create_expense(
        &trip,
        &kabir,
        ExpenseRequest::new(
            "Car rental",
            money("4500"),
            Allocation::Percentage {
                entries: vec![
                    PercentageEntry::new(asha.clone(), dec!(33.33)),
                    PercentageEntry::new(ravi.clone(), dec!(33.33)),
                    PercentageEntry::new(kabir.clone(), dec!(33.34)),
                ],
            },
        )
        .with_category(Category::Transport),
    )?;

    // --- Custom: souvenirs ---
    registry.create_expense(
        &trip,
        &asha,
        ExpenseRequest::new(
            "Souvenirs",
            money("1800"),
            Allocation::Custom {
                entries: vec![
                    CustomEntry::new(asha.clone(), money("300")),
                    CustomEntry::new(ravi.clone(), money("1000")),
                    CustomEntry::new(meera.clone(), money("500")),
                ],
            },
        )
        .with_category(Category::Shopping),
    )?;

    println!("━━━ Balances ━━━\n");
    let balances = registry.net_balances(&trip)?;
    for (member, balance) in balances.iter() {
        println!("  {:<8} {:>10}", member.to_string(), balance.to_string());
    }
    println!("\n  Balanced: {}\n", balances.is_balanced());

    println!("━━━ Who pays whom ━━━\n");
    for obligation in registry.group_obligations(&trip)? {
        println!("  {}", obligation);
        if let Some(links) = registry.payment_links(&trip, obligation.id())? {
            println!("    {}", links.upi);
        }
    }

    let totals = registry.member_totals(&meera);
    println!("\nMeera owes {} and gets back {}.", totals.you_owe, totals.you_get);
    Ok(())
}
