//! splitsmart-engine CLI
//!
//! Replay a group's expenses and print who pays whom.
//!
//! # Usage
//!
//! ```bash
//! # Settle a scenario file
//! splitsmart-engine settle --input trip.json
//!
//! # Output as JSON, with a config file
//! splitsmart-engine settle --input trip.json --format json --config engine.json
//!
//! # Generate a random scenario for testing
//! splitsmart-engine generate --members 6 --expenses 20
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;
use splitsmart_engine::config::EngineConfig;
use splitsmart_engine::core::member::Member;
use splitsmart_engine::core::money::MoneyAmount;
use splitsmart_engine::core::obligation::Obligation;
use splitsmart_engine::group::registry::GroupRegistry;
use splitsmart_engine::settlement::balance::BalanceSheet;
use splitsmart_engine::settlement::links::PaymentLinks;
use splitsmart_engine::simulation::scenario::{generate_scenario, Scenario, ScenarioConfig};
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"splitsmart-engine: expense splitting and settlement minimization

USAGE:
    splitsmart-engine <COMMAND> [OPTIONS]

COMMANDS:
    settle      Replay a scenario and print balances and obligations
    generate    Generate a random scenario (for testing)
    help        Show this message

OPTIONS (settle):
    --input <FILE>      Path to a JSON scenario file
    --format <FORMAT>   Output format: text (default) or json
    --config <FILE>     Path to a JSON engine config file

OPTIONS (generate):
    --members <N>       Number of members (default: 6)
    --expenses <N>      Number of expenses (default: 20)
    --seed <N>          Seed for reproducible output
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    splitsmart-engine settle --input trip.json
    splitsmart-engine settle --input trip.json --format json
    splitsmart-engine generate --members 8 --expenses 50 --output trip.json"#
    );
}

/// JSON output schema for a settled scenario.
#[derive(serde::Serialize)]
struct SettleOutput {
    group: String,
    currency: String,
    balanced: bool,
    total_outstanding: MoneyAmount,
    balances: BalanceSheet,
    obligations: Vec<ObligationOutput>,
}

#[derive(serde::Serialize)]
struct ObligationOutput {
    id: String,
    debtor: String,
    creditor: String,
    amount: MoneyAmount,
    links: Option<PaymentLinks>,
}

fn init_logging(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

fn links_for(members: &[Member], obligation: &Obligation) -> Option<PaymentLinks> {
    members
        .iter()
        .find(|m| m.id() == obligation.creditor())
        .and_then(|m| PaymentLinks::for_creditor(m, obligation.amount()))
}

fn load_scenario(path: &str) -> Scenario {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "group": "goa-trip",
  "members": [
    {{ "id": "asha", "name": "Asha Rao", "payment_id": "asha@upi" }},
    {{ "id": "ravi", "name": "Ravi" }}
  ],
  "expenses": [
    {{
      "payer": "asha",
      "expense": {{
        "description": "Dinner",
        "amount": "90.00",
        "split": {{ "mode": "EQUAL", "participants": ["asha", "ravi"] }}
      }}
    }}
  ]
}}"#
        );
        process::exit(1);
    })
}

fn cmd_settle(args: &[String]) {
    let mut input_path = None;
    let mut config_path = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            "--config" => {
                i += 1;
                config_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => EngineConfig::from_file(&path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        }),
        None => EngineConfig::default(),
    };
    init_logging(&config.log_filter);

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let scenario = load_scenario(&path);
    let registry = GroupRegistry::with_config(config);
    if let Err(e) = scenario.replay(&registry) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let group = &scenario.group;
    let (balances, obligations, members) = match (
        registry.net_balances(group),
        registry.group_obligations(group),
        registry.members(group),
    ) {
        (Ok(b), Ok(o), Ok(m)) => (b, o, m),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let currency = registry.config().currency.clone();

    if format == "json" {
        let output = SettleOutput {
            group: group.to_string(),
            currency,
            balanced: balances.is_balanced(),
            total_outstanding: balances.total_outstanding(),
            obligations: obligations
                .iter()
                .map(|o| ObligationOutput {
                    id: o.id().to_string(),
                    debtor: o.debtor().to_string(),
                    creditor: o.creditor().to_string(),
                    amount: o.amount(),
                    links: links_for(&members, o),
                })
                .collect(),
            balances,
        };

        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("Group: {}", group);
        println!("  Expenses recorded: {}", scenario.expenses.len());
        println!("  Outstanding:       {} {}", balances.total_outstanding(), currency);
        println!();
        println!("Balances:");
        for (member, balance) in balances.iter() {
            let status = if balance.is_positive() {
                "gets back"
            } else if balance.is_negative() {
                "owes"
            } else {
                "settled"
            };
            println!("  {:<16} {:>12}  {}", member.to_string(), balance.to_string(), status);
        }
        println!();
        if obligations.is_empty() {
            println!("Everyone is settled up.");
        } else {
            println!("Obligations ({}):", obligations.len());
            for o in &obligations {
                println!("  {} pays {} {} {}", o.debtor(), o.creditor(), o.amount(), currency);
                if let Some(links) = links_for(&members, o) {
                    println!("    UPI:     {}", links.upi);
                    println!("    PhonePe: {}", links.phonepe);
                    println!("    Paytm:   {}", links.paytm);
                }
            }
        }
    }
}

fn cmd_generate(args: &[String]) {
    init_logging(&EngineConfig::default().log_filter);

    let mut config = ScenarioConfig::default();
    let mut seed: Option<u64> = None;
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--members" => {
                i += 1;
                config.member_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or_else(|| {
                        eprintln!("--members requires a positive number");
                        process::exit(1);
                    });
            }
            "--expenses" => {
                i += 1;
                config.expense_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--expenses requires a number");
                        process::exit(1);
                    });
            }
            "--seed" => {
                i += 1;
                seed = Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--seed requires a number");
                    process::exit(1);
                }));
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let scenario = generate_scenario(&config, &mut rng);

    let json = serde_json::to_string_pretty(&scenario).unwrap_or_else(|e| {
        eprintln!("Error serializing scenario: {}", e);
        process::exit(1);
    });

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} expenses across {} members → {}",
            scenario.expenses.len(),
            scenario.members.len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "settle" => cmd_settle(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
