// Thin CLI driver over the budget engine. Presentation only: all write
// logic lives in the library's mutation service.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use budget_engine::{db, entities::budget, StoreConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        print_usage();
        return Ok(());
    }

    let config = StoreConfig::new(&args[1]);
    let command = args[2].as_str();
    let rest = &args[3..];

    match command {
        "init" => {
            let conn = db::open(&config)?;
            db::setup_schema(&conn)?;
            println!("Initialized budget store at {}", config.path.display());
        }
        "ingest" => {
            let [path] = rest else {
                bail!("usage: <db> ingest <document.json>");
            };
            let mut conn = db::open(&config)?;
            let doc = budget_engine::load_document(Path::new(path))
                .with_context(|| format!("loading {path}"))?;
            let id = budget_engine::insert_budget_graph(&mut conn, &doc)?;
            println!("Ingested '{}' as budget {}", doc.title, id);
        }
        "list" => {
            let conn = db::open(&config)?;
            for b in budget::list_all(&conn)? {
                println!(
                    "{:>4}  {}  FY{}  revenue {}  expenses {}  result {}",
                    b.id, b.title, b.fiscal_year, b.total_revenue, b.total_expenses, b.result
                );
            }
        }
        "set" => {
            let [budget_id, code, amount] = rest else {
                bail!("usage: <db> set <budget-id> <revenue-code> <amount>");
            };
            let budget_id: i64 = budget_id.parse().context("budget id")?;
            let amount: i64 = amount.parse().context("amount")?;

            let mut conn = db::open(&config)?;
            let mut edits = BTreeMap::new();
            edits.insert(code.clone(), amount);
            let rows =
                budget_engine::update_budget_amounts(&mut conn, budget_id, &edits, &BTreeMap::new())?;
            println!("Updated {rows} rows");
        }
        "clone" => {
            let [source_id, title] = rest else {
                bail!("usage: <db> clone <source-id> <new-title>");
            };
            let source_id: i64 = source_id.parse().context("source id")?;

            let mut conn = db::open(&config)?;
            let new_id = budget_engine::clone_budget(&mut conn, source_id, title)?;
            println!("Cloned budget {source_id} -> {new_id}");
        }
        "delete" => {
            let [budget_id] = rest else {
                bail!("usage: <db> delete <budget-id>");
            };
            let budget_id: i64 = budget_id.parse().context("budget id")?;

            let mut conn = db::open(&config)?;
            let rows = budget_engine::delete_budget(&mut conn, budget_id)?;
            println!("Deleted budget {budget_id} ({rows} rows)");
        }
        "sequences" => {
            let conn = db::open(&config)?;
            for row in db::last_issued_ids(&conn)? {
                println!("{:<24} last id {}", row.table, row.last_id);
            }
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    eprintln!("budget-engine {}", budget_engine::VERSION);
    eprintln!("usage: budget-engine <db-path> <command> [args]");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  init                          create the schema");
    eprintln!("  ingest <document.json>        load an extracted budget document");
    eprintln!("  list                          list budgets with their totals");
    eprintln!("  set <budget> <code> <amount>  set a revenue amount (propagates)");
    eprintln!("  clone <budget> <title>        duplicate a whole budget");
    eprintln!("  delete <budget>               delete a budget and its children");
    eprintln!("  sequences                     show last-issued ids per table");
}
