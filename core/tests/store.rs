//! SQLite store — client records, reminder history, expenses.

use chrono::{NaiveDate, NaiveDateTime};
use clientdesk_core::{
    client::{ClientRecord, InvoiceStatus},
    error::DeskError,
    expense::ExpenseRecord,
    reminder::{ReminderHistory, ReminderRecord, ReminderStatus, ReminderTier},
    store::{ClientSource, DeskStore, NEW_CLIENT_ID},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_store() -> DeskStore {
    let store = DeskStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn new_client(name: &str, status: &str, expiry: Option<&str>, created: &str) -> ClientRecord {
    let mut c = ClientRecord::new(NEW_CLIENT_ID, name, 750.0, InvoiceStatus::from(status), at(created));
    c.expiry_date = expiry.map(date);
    c
}

fn reminder(client_id: i64, tier: ReminderTier, sent: &str) -> ReminderRecord {
    ReminderRecord {
        id: None,
        client_id,
        tier,
        sent_at: at(sent),
        message: format!("{tier} reminder"),
        status: ReminderStatus::Sent,
    }
}

// ── Clients ──────────────────────────────────────────────────────────────────

#[test]
fn client_round_trips_every_field() {
    let store = make_store();
    let mut c = new_client("Acme", "Overdue", Some("2024-03-01"), "2023-05-06 07:08:09");
    c.client_email = Some("owner@acme.test".into());
    c.client_phone = Some("07700 900111".into());
    c.website_url = Some("https://acme.test".into());
    c.date_built = Some(date("2023-03-01"));
    c.project_cost = Some(120.5);
    c.custom_notes = Some("likes blue".into());
    c.tax_percent = Some(20.0);
    c.currency = "EUR".into();

    let id = store.insert_client(&c).unwrap();
    let loaded = store.get_client(id).unwrap().expect("client should exist");

    assert_eq!(loaded, ClientRecord { id, ..c });
    assert_eq!(loaded.invoice_status, InvoiceStatus::Other("Overdue".into()));
}

#[test]
fn missing_client_is_none() {
    let store = make_store();
    assert!(store.get_client(42).unwrap().is_none());
}

#[test]
fn invalid_client_is_not_stored() {
    let store = make_store();
    let mut c = new_client("Broken", "Paid", None, "2023-01-01 00:00:00");
    c.cost = -10.0;
    assert!(matches!(
        store.insert_client(&c),
        Err(DeskError::Validation { field: "cost", .. })
    ));
    assert_eq!(store.client_count().unwrap(), 0);
}

#[test]
fn all_clients_lists_newest_first() {
    let store = make_store();
    store.insert_client(&new_client("Old", "Paid", None, "2023-01-01 00:00:00")).unwrap();
    store.insert_client(&new_client("New", "Paid", None, "2023-06-01 00:00:00")).unwrap();
    store.insert_client(&new_client("Mid", "Paid", None, "2023-03-01 00:00:00")).unwrap();

    let names: Vec<String> = store.all_clients().unwrap().into_iter().map(|c| c.client_name).collect();
    assert_eq!(names, vec!["New", "Mid", "Old"]);
}

#[test]
fn filter_by_status_and_expiry_range() {
    let store = make_store();
    store.insert_client(&new_client("A", "Paid", Some("2024-01-01"), "2023-01-01 00:00:00")).unwrap();
    store.insert_client(&new_client("B", "Unpaid", Some("2024-01-31"), "2023-01-02 00:00:00")).unwrap();
    store.insert_client(&new_client("C", "Paid", Some("2024-02-01"), "2023-01-03 00:00:00")).unwrap();
    store.insert_client(&new_client("D", "Paid", None, "2023-01-04 00:00:00")).unwrap();

    let paid = store.clients_by_status(&InvoiceStatus::Paid).unwrap();
    assert_eq!(paid.len(), 3);
    let unpaid = store.clients_by_status(&InvoiceStatus::Unpaid).unwrap();
    assert_eq!(unpaid.len(), 1);
    assert_eq!(unpaid[0].client_name, "B");

    let expiring = store
        .clients_expiring_between(date("2024-01-01"), date("2024-01-31"))
        .unwrap();
    let names: Vec<&str> = expiring.iter().map(|c| c.client_name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"], "range is inclusive at both ends");
}

#[test]
fn slice_source_filters_like_the_store() {
    let clients = vec![
        ClientRecord { id: 1, ..new_client("A", "Paid", Some("2024-01-10"), "2023-01-01 00:00:00") },
        ClientRecord { id: 2, ..new_client("B", "Unpaid", Some("2024-03-10"), "2023-01-01 00:00:00") },
    ];
    let source: &[ClientRecord] = &clients;
    assert_eq!(source.clients_by_status(&InvoiceStatus::Unpaid).unwrap()[0].id, 2);
    assert_eq!(
        source
            .clients_expiring_between(date("2024-01-01"), date("2024-01-31"))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn update_and_delete_unknown_client_fail() {
    let store = make_store();
    let ghost = ClientRecord { id: 99, ..new_client("Ghost", "Paid", None, "2023-01-01 00:00:00") };
    assert!(matches!(
        store.update_client(&ghost, at("2023-02-01 00:00:00")),
        Err(DeskError::ClientNotFound { client_id: 99 })
    ));
    assert!(matches!(
        store.delete_client(99),
        Err(DeskError::ClientNotFound { client_id: 99 })
    ));
}

#[test]
fn update_changes_the_stored_record() {
    let store = make_store();
    let id = store
        .insert_client(&new_client("Acme", "Unpaid", None, "2023-01-01 00:00:00"))
        .unwrap();
    let mut c = store.get_client(id).unwrap().unwrap();
    c.invoice_status = InvoiceStatus::Paid;
    c.expiry_date = Some(date("2025-01-01"));
    store.update_client(&c, at("2023-02-01 00:00:00")).unwrap();

    assert_eq!(store.get_client(id).unwrap().unwrap(), c);
}

// ── Reminder history ─────────────────────────────────────────────────────────

#[test]
fn one_reminder_per_client_and_tier() {
    let store = make_store();
    let id = store
        .insert_client(&new_client("Acme", "Paid", Some("2024-01-20"), "2023-01-01 00:00:00"))
        .unwrap();

    assert!(store.insert_reminder(&reminder(id, ReminderTier::ThirtyDay, "2024-01-01 09:00:00")).unwrap());
    assert!(
        !store.insert_reminder(&reminder(id, ReminderTier::ThirtyDay, "2024-01-02 09:00:00")).unwrap(),
        "duplicate (client, tier) must be ignored"
    );
    assert!(store.insert_reminder(&reminder(id, ReminderTier::SevenDay, "2024-01-14 09:00:00")).unwrap());

    assert_eq!(store.reminder_count().unwrap(), 2);
    let kept = store.find_reminder(id, ReminderTier::ThirtyDay).unwrap().unwrap();
    assert_eq!(kept.sent_at, at("2024-01-01 09:00:00"), "first record wins");

    assert!(store.has_reminder(id, ReminderTier::SevenDay).unwrap());
    assert!(!store.has_reminder(id, ReminderTier::SixtyDay).unwrap());
}

#[test]
fn reminder_requires_existing_client() {
    let store = make_store();
    let result = store.insert_reminder(&reminder(404, ReminderTier::SevenDay, "2024-01-01 00:00:00"));
    assert!(matches!(result, Err(DeskError::Database(_))));
}

#[test]
fn deleting_a_client_removes_its_reminders() {
    let store = make_store();
    let id = store
        .insert_client(&new_client("Acme", "Paid", None, "2023-01-01 00:00:00"))
        .unwrap();
    store.insert_reminder(&reminder(id, ReminderTier::SixtyDay, "2024-01-01 00:00:00")).unwrap();

    store.delete_client(id).unwrap();
    assert_eq!(store.reminder_count().unwrap(), 0);
}

#[test]
fn history_stats_queries() {
    let store = make_store();
    let a = store.insert_client(&new_client("A", "Paid", None, "2023-01-01 00:00:00")).unwrap();
    let b = store.insert_client(&new_client("B", "Paid", None, "2023-01-01 00:00:00")).unwrap();
    store.insert_reminder(&reminder(a, ReminderTier::SixtyDay, "2023-11-01 00:00:00")).unwrap();
    store.insert_reminder(&reminder(a, ReminderTier::ThirtyDay, "2023-12-10 00:00:00")).unwrap();
    store.insert_reminder(&reminder(b, ReminderTier::ThirtyDay, "2023-12-20 00:00:00")).unwrap();

    assert_eq!(store.reminder_count_since(at("2023-12-01 00:00:00")).unwrap(), 2);
    assert_eq!(
        store.reminder_breakdown().unwrap(),
        vec![(ReminderTier::SixtyDay, 1), (ReminderTier::ThirtyDay, 2)]
    );

    let recent = store.recent_reminders(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].client_name, "B");
    assert_eq!(recent[0].reminder.sent_at, at("2023-12-20 00:00:00"));
    assert_eq!(recent[1].client_name, "A");

    assert_eq!(store.all_reminders().unwrap().len(), 3);
}

// ── Expenses ─────────────────────────────────────────────────────────────────

#[test]
fn expense_crud() {
    let store = make_store();
    let mut e = ExpenseRecord {
        id: 0,
        expense_name: "Hosting".into(),
        amount: 12.5,
        expense_date: date("2024-01-03"),
        category: "Software & Tools".into(),
        description: None,
        is_tax_deductible: true,
        created_at: at("2024-01-03 08:00:00"),
    };
    e.id = store.insert_expense(&e).unwrap();
    assert_eq!(store.all_expenses().unwrap(), vec![e.clone()]);

    e.amount = 15.0;
    e.is_tax_deductible = false;
    store.update_expense(&e).unwrap();
    assert_eq!(store.all_expenses().unwrap()[0], e);

    store.delete_expense(e.id).unwrap();
    assert!(store.all_expenses().unwrap().is_empty());
    assert!(matches!(
        store.delete_expense(e.id),
        Err(DeskError::ExpenseNotFound { .. })
    ));
}
