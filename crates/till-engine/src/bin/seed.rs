//! # Demo Shift Generator
//!
//! Populates a database with one demo shift for development.
//!
//! ## Usage
//! ```bash
//! # Use till.toml / TILL_* settings
//! cargo run -p till-engine --bin seed
//!
//! # Specify a config file
//! cargo run -p till-engine --bin seed -- --config ./till.toml
//!
//! # Specify database path
//! cargo run -p till-engine --bin seed -- --db ./data/till_dev.db
//! ```
//!
//! The shift opens a register, records card and cash sales, an expense and a
//! refund, runs a cash audit and prints the register summary as JSON.

use std::env;
use std::path::PathBuf;

use till_core::{
    DenominationInput, Money, MovementType, NewMovement, OpenRegister, PaymentMethod, Scope,
};
use till_engine::{AuditRequest, CashEngine, EngineConfig, OrderPayment};

const TENANT_ID: &str = "demo-tenant";
const BRANCH_ID: &str = "main-street";
const ACTOR: &str = "seed";

/// Order payments of the demo shift: (order number, cents, method).
const ORDERS: &[(&str, i64, PaymentMethod)] = &[
    ("1001", 1_250, PaymentMethod::Cash),
    ("1002", 3_480, PaymentMethod::Card),
    ("1003", 899, PaymentMethod::Cash),
    ("1004", 5_600, PaymentMethod::App),
    ("1005", 2_175, PaymentMethod::Transfer),
    ("1006", 4_320, PaymentMethod::Cash),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    till_engine::init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Demo Shift Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform till.toml)");
                println!("  -d, --db <PATH>      Database path (overrides config)");
                println!("  -h, --help           Show this help");
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                return Ok(());
            }
        }
        i += 1;
    }

    let mut config = EngineConfig::load_or_default(config_path);
    if let Some(path) = db_path {
        config.database.path = path;
    }
    // A demo shift may run next to a real one.
    config.registers.enforce_single_open = false;

    let engine = CashEngine::connect(config).await?;
    let scope = Scope::new(TENANT_ID, BRANCH_ID);

    let register = engine
        .registers()
        .open(
            &scope,
            ACTOR,
            OpenRegister::new(Money::from_cents(20_000))
                .with_name("Demo Register")
                .with_notes("Seeded demo shift"),
        )
        .await?;
    println!("✓ Opened {} ({})", register.name, register.id);

    for (number, cents, method) in ORDERS {
        engine
            .ledger()
            .register_sale(
                &scope,
                ACTOR,
                OrderPayment {
                    register_id: register.id.clone(),
                    order_id: format!("order-{number}"),
                    order_number: Some((*number).to_string()),
                    amount: Money::from_cents(*cents),
                    payment_method: *method,
                },
            )
            .await?;
    }
    println!("✓ Recorded {} sales", ORDERS.len());

    engine
        .ledger()
        .register_refund(
            &scope,
            ACTOR,
            OrderPayment {
                register_id: register.id.clone(),
                order_id: "order-1003".to_string(),
                order_number: Some("1003".to_string()),
                amount: Money::from_cents(899),
                payment_method: PaymentMethod::Cash,
            },
            "Wrong item",
        )
        .await?;

    engine
        .ledger()
        .append(
            &scope,
            ACTOR,
            NewMovement::new(
                &register.id,
                MovementType::Expense,
                Money::from_cents(1_500),
                PaymentMethod::Cash,
                "Cleaning supplies",
            )
            .with_reference("receipt-7731"),
        )
        .await?;
    println!("✓ Recorded refund and expense");

    let mut count = DenominationInput::default();
    count.bills.insert(2_000, Some(2));
    count.bills.insert(500, Some(1));
    count.coins.insert(25, Some(3));
    count.coins.insert(10, None);

    let audit = engine
        .audits()
        .perform_audit(
            &scope,
            ACTOR,
            AuditRequest::new(&register.id, Money::from_cents(4_575))
                .with_notes("Mid-shift count")
                .with_denominations(count),
        )
        .await?;
    println!(
        "✓ Audit {}: expected {}, counted {} ({})",
        audit.id,
        audit.expected_cash(),
        audit.actual_cash(),
        audit.status
    );

    let summary = engine.balances().summarize(&scope, &register.id).await?;
    println!();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
