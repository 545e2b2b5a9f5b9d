//! Desk service — snapshots from the store through the engine and back.

use chrono::{NaiveDate, NaiveDateTime};
use clientdesk_core::{
    client::ClientInput,
    clock::FixedClock,
    config::DeskConfig,
    desk::{Desk, TierCount},
    error::DeskError,
    expense::ExpenseInput,
    reminder::{ReminderStatus, ReminderTier},
    store::{ClientSource, DeskStore},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn make_desk() -> Desk {
    let _ = env_logger::builder().is_test(true).try_init();
    Desk::build_test(today()).unwrap()
}

/// Desk whose clock sits part-way through a second.
fn make_desk_at(at: NaiveDateTime, store: DeskStore) -> Desk {
    Desk::new(store, DeskConfig::default_test(), Box::new(FixedClock { at }))
}

fn mid_second() -> NaiveDateTime {
    today().and_hms_nano_opt(14, 30, 15, 123_456_789).unwrap()
}

fn migrated_memory_store() -> DeskStore {
    let store = DeskStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn expense_input(name: &str, amount: f64) -> ExpenseInput {
    ExpenseInput {
        expense_name: name.into(),
        amount,
        expense_date: "2023-12-01".into(),
        category: "Equipment".into(),
        description: None,
        is_tax_deductible: true,
    }
}

fn input(name: &str, cost: f64, expiry: Option<&str>, status: &str) -> ClientInput {
    ClientInput {
        client_name: name.into(),
        client_email: None,
        client_phone: Some("07700 900456".into()),
        website_url: Some(format!("https://{}.test", name.to_lowercase().replace(' ', "-"))),
        date_built: Some("2023-01-15".into()),
        expiry_date: expiry.map(str::to_string),
        cost,
        project_cost: Some(cost / 4.0),
        invoice_status: status.into(),
        custom_notes: None,
        tax_percent: None,
        currency: None,
    }
}

fn seed(desk: &Desk) {
    desk.add_client(input("Four Days", 1000.0, Some("2024-01-05"), "Paid")).unwrap();
    desk.add_client(input("Nineteen Days", 800.0, Some("2024-01-20"), "Unpaid")).unwrap();
    desk.add_client(input("Fifty Days", 600.0, Some("2024-02-20"), "Paid")).unwrap();
    desk.add_client(input("Far Away", 400.0, Some("2024-04-01"), "Paid")).unwrap();
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn add_client_parses_and_stores() {
    let desk = make_desk();
    let c = desk
        .add_client(input("Acme", 500.0, Some("2024-06-30"), "Paid"))
        .unwrap();

    assert!(c.id > 0);
    assert_eq!(c.currency, "GBP", "currency defaults when absent");
    assert_eq!(c.expiry_date, NaiveDate::from_ymd_opt(2024, 6, 30));
    assert_eq!(desk.store().get_client(c.id).unwrap(), Some(c));
}

#[test]
fn add_client_rejects_bad_dates() {
    let desk = make_desk();
    let result = desk.add_client(input("Acme", 500.0, Some("30/06/2024"), "Paid"));
    match result {
        Err(DeskError::Validation { field, record, .. }) => {
            assert_eq!(field, "expiry_date");
            assert_eq!(record, "new client record");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(desk.store().all_clients().unwrap().is_empty());
}

#[test]
fn analytics_over_stored_clients() {
    let desk = make_desk();
    seed(&desk);
    let report = desk.business_analytics().unwrap();

    assert_eq!(report.summary.total_projects, 4);
    assert_eq!(report.summary.total_revenue, 2800.0);
    assert_eq!(report.summary.total_profit, 2100.0);
    assert_eq!(report.summary.payment_rate, 75.0);
    assert_eq!(report.outlook.expiring_soon.len(), 3);
    assert_eq!(
        report.outlook.high_priority_renewals,
        vec!["Nineteen Days", "Four Days"],
        "snapshot order is newest first"
    );
}

#[test]
fn check_reminders_proposes_one_per_record() {
    let desk = make_desk();
    seed(&desk);
    let candidates = desk.check_reminders().unwrap();

    let tiers: Vec<ReminderTier> = candidates.iter().map(|c| c.tier).collect();
    assert_eq!(
        tiers,
        vec![ReminderTier::SevenDay, ReminderTier::ThirtyDay, ReminderTier::SixtyDay]
    );
    assert_eq!(desk.store().reminder_count().unwrap(), 0, "checking never records");
}

#[test]
fn sending_records_reminders_once() {
    let desk = make_desk();
    seed(&desk);

    let sent = desk.send_reminders(&[]).unwrap();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|s| s.whatsapp_url.starts_with("https://wa.me/447700900456?text=")));
    assert_eq!(desk.store().reminder_count().unwrap(), 3);

    assert!(desk.check_reminders().unwrap().is_empty());
    assert!(desk.send_reminders(&[]).unwrap().is_empty(), "second send is a no-op");
    assert_eq!(desk.store().reminder_count().unwrap(), 3);
}

#[test]
fn sending_can_target_specific_clients() {
    let desk = make_desk();
    seed(&desk);
    let target = desk
        .store()
        .all_clients()
        .unwrap()
        .into_iter()
        .find(|c| c.client_name == "Fifty Days")
        .unwrap();

    let sent = desk.send_reminders(&[target.id]).unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].client_id, target.id);
    assert_eq!(sent[0].tier, ReminderTier::SixtyDay);
    assert_eq!(sent[0].days_remaining, 50);
    assert_eq!(desk.check_reminders().unwrap().len(), 2);
}

#[test]
fn stats_and_history_reflect_sent_reminders() {
    let desk = make_desk();
    seed(&desk);
    desk.send_reminders(&[]).unwrap();
    desk.add_client(input("Late Joiner", 300.0, Some("2024-01-03"), "Paid")).unwrap();

    let stats = desk.reminder_stats().unwrap();
    assert_eq!(stats.total_sent, 3);
    assert_eq!(stats.sent_last_30_days, 3);
    assert_eq!(stats.pending, 1, "only the new client is still due");
    assert_eq!(
        stats.breakdown,
        vec![
            TierCount { tier: ReminderTier::SixtyDay, count: 1 },
            TierCount { tier: ReminderTier::ThirtyDay, count: 1 },
            TierCount { tier: ReminderTier::SevenDay, count: 1 },
        ]
    );

    let history = desk.reminder_history(10).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|h| !h.reminder.message.is_empty()));
}

#[test]
fn expense_summary_through_desk() {
    let desk = make_desk();
    desk.add_expense(ExpenseInput {
        expense_name: "Laptop".into(),
        amount: 900.0,
        expense_date: "2023-12-01".into(),
        category: "Equipment".into(),
        description: None,
        is_tax_deductible: true,
    })
    .unwrap();
    desk.add_expense(ExpenseInput {
        expense_name: "Lunch".into(),
        amount: 15.5,
        expense_date: "2023-12-02".into(),
        category: "Other".into(),
        description: Some("client meeting".into()),
        is_tax_deductible: false,
    })
    .unwrap();

    let summary = desk.expense_summary().unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.total, 915.5);
    assert_eq!(summary.tax_deductible_total, 900.0);
    assert_eq!(summary.by_category[0].category, "Equipment");
}

#[test]
fn stored_timestamps_match_returned_records() {
    let desk = make_desk_at(mid_second(), migrated_memory_store());
    let c = desk.add_client(input("Acme", 500.0, Some("2024-01-20"), "Paid")).unwrap();
    let e = desk.add_expense(expense_input("Laptop", 900.0)).unwrap();

    assert_eq!(c.created_at, today().and_hms_opt(14, 30, 15).unwrap(), "sub-second part dropped");
    assert_eq!(desk.store().all_clients().unwrap(), vec![c.clone()]);
    assert_eq!(desk.store().all_expenses().unwrap(), vec![e]);

    desk.send_reminders(&[]).unwrap();
    let sent = desk.store().find_reminder(c.id, ReminderTier::ThirtyDay).unwrap().unwrap();
    assert_eq!(sent.sent_at, c.created_at);
}

#[test]
fn update_client_keeps_identity_and_creation_time() {
    let desk = make_desk();
    let original = desk.add_client(input("Acme", 500.0, Some("2024-06-30"), "Unpaid")).unwrap();

    let updated = desk
        .update_client(original.id, input("Acme Ltd", 650.0, Some("2024-07-31"), "Paid"))
        .unwrap();
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.created_at, original.created_at);
    assert_eq!(desk.store().get_client(original.id).unwrap(), Some(updated));

    assert!(matches!(
        desk.update_client(999, input("Ghost", 1.0, None, "Paid")),
        Err(DeskError::ClientNotFound { client_id: 999 })
    ));
}

#[test]
fn delete_client_drops_its_reminders() {
    let desk = make_desk();
    seed(&desk);
    desk.send_reminders(&[]).unwrap();
    let doomed = desk.store().all_reminders().unwrap()[0].client_id;

    desk.delete_client(doomed).unwrap();
    assert_eq!(desk.store().reminder_count().unwrap(), 2);
    assert!(desk.store().get_client(doomed).unwrap().is_none());
    assert!(matches!(
        desk.delete_client(doomed),
        Err(DeskError::ClientNotFound { .. })
    ));
}

#[test]
fn expenses_can_be_edited_and_removed() {
    let desk = make_desk();
    let e = desk.add_expense(expense_input("Laptop", 900.0)).unwrap();

    let edited = desk.update_expense(e.id, expense_input("Laptop stand", 45.0)).unwrap();
    assert_eq!(edited.created_at, e.created_at);
    assert_eq!(desk.expense_summary().unwrap().total, 45.0);

    desk.delete_expense(e.id).unwrap();
    assert_eq!(desk.expense_summary().unwrap().count, 0);
    assert!(matches!(
        desk.update_expense(e.id, expense_input("Laptop", 900.0)),
        Err(DeskError::ExpenseNotFound { .. })
    ));
}

#[test]
fn failed_reminders_are_counted_but_not_resent() {
    let desk = make_desk();
    seed(&desk);
    desk.send_reminders(&[]).unwrap();
    let first = desk.store().all_reminders().unwrap()[0].clone();
    let reminder_id = first.id.unwrap();

    desk.mark_reminder_failed(reminder_id).unwrap();
    let stats = desk.reminder_stats().unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total_sent, 3);
    assert_eq!(stats.pending, 0, "a failed reminder still holds its slot");

    let stored = desk.store().find_reminder(first.client_id, first.tier).unwrap().unwrap();
    assert_eq!(stored.status, ReminderStatus::Failed);
    assert!(matches!(
        desk.mark_reminder_failed(reminder_id + 100),
        Err(DeskError::ReminderNotFound { .. })
    ));
}

#[test]
fn two_connections_never_record_the_same_reminder_twice() {
    // Both desks share one named in-memory database.
    let uri = "file:desk_two_senders?mode=memory&cache=shared";
    let first = DeskStore::open(uri).unwrap();
    first.migrate().unwrap();
    let second = DeskStore::open(uri).unwrap();

    let desk_a = make_desk_at(mid_second(), first);
    let desk_b = make_desk_at(mid_second(), second);
    seed(&desk_a);

    let pending_b = desk_b.check_reminders().unwrap();
    assert_eq!(pending_b.len(), 3, "second connection sees the shared clients");

    assert_eq!(desk_a.send_reminders(&[]).unwrap().len(), 3);
    assert!(desk_b.send_reminders(&[]).unwrap().is_empty());

    // A stale candidate list from before the first send still cannot land.
    let sent_at = today().and_hms_opt(15, 0, 0).unwrap();
    for candidate in &pending_b {
        assert!(!desk_b.store().insert_reminder(&candidate.to_record(sent_at)).unwrap());
    }
    assert_eq!(desk_a.store().reminder_count().unwrap(), 3);
    assert_eq!(desk_b.store().reminder_count().unwrap(), 3);
}
