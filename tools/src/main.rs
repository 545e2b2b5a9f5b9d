//! desk-runner: headless command runner for the client desk.
//!
//! Usage:
//!   desk-runner --db desk.db import clients.json
//!   desk-runner --db desk.db --today 2024-01-01 analytics
//!   desk-runner --db desk.db clients update <id> client.json
//!   desk-runner --db desk.db clients delete <id>
//!   desk-runner --db desk.db reminders check|send [client ids..]|history|stats
//!   desk-runner --db desk.db reminders fail <reminder id>
//!   desk-runner --db desk.db expenses import expenses.json
//!   desk-runner --db desk.db expenses update <id> expense.json
//!   desk-runner --db desk.db expenses delete <id>
//!   desk-runner --db desk.db expenses summary|categories

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clientdesk_core::{
    client::ClientInput,
    clock::{DateSource, FixedClock, SystemClock},
    config::DeskConfig,
    desk::{Desk, DEFAULT_HISTORY_LIMIT},
    expense::{ExpenseInput, EXPENSE_CATEGORIES},
    store::DeskStore,
};
use serde::Serialize;
use std::env;
use std::path::Path;

/// Flags that take a value; everything else is positional.
const VALUE_FLAGS: [&str; 3] = ["--db", "--data-dir", "--today"];

#[derive(Serialize)]
struct ImportReport {
    imported: usize,
    ids:      Vec<i64>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let db = flag_value(&args, "--db").unwrap_or("desk.db");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let today = flag_value(&args, "--today")
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .context("--today must be YYYY-MM-DD")?;

    let config = if Path::new(&format!("{data_dir}/desk.json")).exists() {
        DeskConfig::load(data_dir)?
    } else {
        log::info!("No {data_dir}/desk.json, using default config");
        DeskConfig::default()
    };

    let store = DeskStore::open(db)?;
    store.migrate()?;

    let clock: Box<dyn DateSource> = match today {
        Some(date) => Box::new(FixedClock::on(date)),
        None => Box::new(SystemClock),
    };
    let desk = Desk::new(store, config, clock);

    let positional = positional(&args);
    let words: Vec<&str> = positional.iter().map(String::as_str).collect();

    match words.as_slice() {
        ["import", file] => {
            let inputs: Vec<ClientInput> = read_json(file)?;
            let mut ids = Vec::with_capacity(inputs.len());
            for input in inputs {
                ids.push(desk.add_client(input)?.id);
            }
            print_json(&ImportReport { imported: ids.len(), ids })
        }
        ["clients", "update", id, file] => {
            let input: ClientInput = read_json(file)?;
            print_json(&desk.update_client(parse_id(id)?, input)?)
        }
        ["clients", "delete", id] => {
            let id = parse_id(id)?;
            desk.delete_client(id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        ["analytics"] => print_json(&desk.business_analytics()?),
        ["reminders", "check"] => {
            let candidates = desk.check_reminders()?;
            let preview: Vec<serde_json::Value> = candidates
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "client_id": c.client_id,
                        "client_name": c.client_name,
                        "client_phone": c.client_phone,
                        "expiry_date": c.expiry_date,
                        "days_remaining": c.days_remaining,
                        "reminder_type": c.tier,
                        "message_preview": c.message_preview(),
                        "project_value": c.project_value,
                    })
                })
                .collect();
            print_json(&serde_json::json!({
                "eligible_clients": preview,
                "total_count": candidates.len(),
            }))
        }
        ["reminders", "send", ids @ ..] => {
            let ids = ids
                .iter()
                .map(|id| parse_id(id))
                .collect::<Result<Vec<_>>>()?;
            let sent = desk.send_reminders(&ids)?;
            print_json(&serde_json::json!({
                "total_sent": sent.len(),
                "message": format!("Generated {} reminder(s) ready to send via WhatsApp", sent.len()),
                "sent_reminders": sent,
            }))
        }
        ["reminders", "fail", id] => {
            let id = parse_id(id)?;
            desk.mark_reminder_failed(id)?;
            print_json(&serde_json::json!({ "failed": id }))
        }
        ["reminders", "history"] => print_json(&desk.reminder_history(DEFAULT_HISTORY_LIMIT)?),
        ["reminders", "stats"] => print_json(&desk.reminder_stats()?),
        ["expenses", "import", file] => {
            let inputs: Vec<ExpenseInput> = read_json(file)?;
            let mut ids = Vec::with_capacity(inputs.len());
            for input in inputs {
                ids.push(desk.add_expense(input)?.id);
            }
            print_json(&ImportReport { imported: ids.len(), ids })
        }
        ["expenses", "update", id, file] => {
            let input: ExpenseInput = read_json(file)?;
            print_json(&desk.update_expense(parse_id(id)?, input)?)
        }
        ["expenses", "delete", id] => {
            let id = parse_id(id)?;
            desk.delete_expense(id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        ["expenses", "summary"] => print_json(&desk.expense_summary()?),
        ["expenses", "categories"] => print_json(&EXPENSE_CATEGORIES),
        other => bail!("unknown command {other:?}; see the usage in desk-runner's docs"),
    }
}

fn parse_id(id: &str) -> Result<i64> {
    id.parse().with_context(|| format!("bad id '{id}'"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn positional(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else {
            out.push(arg.clone());
        }
    }
    out
}
