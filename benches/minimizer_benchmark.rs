use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use splitsmart_engine::core::member::MemberId;
use splitsmart_engine::core::money::MoneyAmount;
use splitsmart_engine::group::registry::GroupRegistry;
use splitsmart_engine::settlement::balance::BalanceSheet;
use splitsmart_engine::settlement::minimizer::SettlementMinimizer;
use splitsmart_engine::simulation::scenario::{generate_scenario, ScenarioConfig};

/// A zero-sum sheet of `members` random balances.
fn random_sheet(members: usize, seed: u64) -> BalanceSheet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut units: Vec<i64> = (1..members).map(|_| rng.gen_range(-500_000..500_000)).collect();
    units.push(-units.iter().sum::<i64>());
    units
        .into_iter()
        .enumerate()
        .map(|(i, u)| (MemberId::new(format!("member-{:05}", i)), MoneyAmount::from_minor_units(u)))
        .collect()
}

fn bench_minimize_10_members(c: &mut Criterion) {
    let sheet = random_sheet(10, 1);
    c.bench_function("minimize_10_members", |b| {
        b.iter(|| SettlementMinimizer::minimize(black_box(&sheet)))
    });
}

fn bench_minimize_1000_members(c: &mut Criterion) {
    let sheet = random_sheet(1_000, 2);
    c.bench_function("minimize_1000_members", |b| {
        b.iter(|| SettlementMinimizer::minimize(black_box(&sheet)))
    });
}

fn bench_minimize_100000_members(c: &mut Criterion) {
    let sheet = random_sheet(100_000, 3);
    c.bench_function("minimize_100000_members", |b| {
        b.iter(|| SettlementMinimizer::minimize(black_box(&sheet)))
    });
}

fn bench_recompute_group(c: &mut Criterion) {
    let config = ScenarioConfig {
        member_count: 20,
        expense_count: 500,
        ..Default::default()
    };
    let scenario = generate_scenario(&config, &mut StdRng::seed_from_u64(4));
    let registry = GroupRegistry::new();
    if let Err(e) = scenario.replay(&registry) {
        panic!("benchmark scenario failed to replay: {}", e);
    }

    c.bench_function("recompute_20_members_500_expenses", |b| {
        b.iter(|| registry.recompute(black_box(&config.group)))
    });
}

criterion_group!(
    benches,
    bench_minimize_10_members,
    bench_minimize_1000_members,
    bench_minimize_100000_members,
    bench_recompute_group
);
criterion_main!(benches);
