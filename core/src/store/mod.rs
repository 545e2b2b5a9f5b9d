//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine works on record snapshots handed to it; the `Desk` service
//! fetches those snapshots here and writes reminder records back.

use crate::{
    client::{parse_date, parse_optional_date, ClientRecord, InvoiceStatus},
    error::{DeskError, DeskResult},
    types::ClientId,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::time::Duration;

mod client;
mod expense;
mod reminder;

pub use client::NEW_CLIENT_ID;
pub use reminder::ReminderHistoryEntry;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// How long a writer waits on another connection's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DeskStore {
    conn: Connection,
}

impl DeskStore {
    /// Open a database file, or a `file:` URI. Several stores may open the
    /// same database; SQLite serialises their writes.
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // In-memory URIs reject WAL; that is fine.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Private in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        log::debug!("Migrations applied");
        Ok(())
    }

    /// Run `f` inside one transaction; commit on `Ok`, roll back on `Err`.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> DeskResult<T>) -> DeskResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Query side of the client-record store.
pub trait ClientSource {
    fn all_clients(&self) -> DeskResult<Vec<ClientRecord>>;
    fn clients_by_status(&self, status: &InvoiceStatus) -> DeskResult<Vec<ClientRecord>>;
    /// Records whose expiry date falls in `from..=to`.
    fn clients_expiring_between(&self, from: NaiveDate, to: NaiveDate)
        -> DeskResult<Vec<ClientRecord>>;
}

impl ClientSource for [ClientRecord] {
    fn all_clients(&self) -> DeskResult<Vec<ClientRecord>> {
        Ok(self.to_vec())
    }

    fn clients_by_status(&self, status: &InvoiceStatus) -> DeskResult<Vec<ClientRecord>> {
        Ok(self.iter().filter(|c| &c.invoice_status == status).cloned().collect())
    }

    fn clients_expiring_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DeskResult<Vec<ClientRecord>> {
        Ok(self
            .iter()
            .filter(|c| c.expiry_date.is_some_and(|d| d >= from && d <= to))
            .cloned()
            .collect())
    }
}

// ── Row types ────────────────────────────────────────────────────────────────
// Raw column values; dates are parsed after the row leaves rusqlite.

#[derive(Debug, Clone)]
pub(crate) struct ClientRow {
    pub id:             ClientId,
    pub client_name:    String,
    pub client_email:   Option<String>,
    pub client_phone:   Option<String>,
    pub website_url:    Option<String>,
    pub date_built:     Option<String>,
    pub expiry_date:    Option<String>,
    pub cost:           f64,
    pub project_cost:   Option<f64>,
    pub invoice_status: String,
    pub custom_notes:   Option<String>,
    pub tax_percent:    Option<f64>,
    pub currency:       String,
    pub created_at:     String,
}

impl ClientRow {
    pub(crate) fn into_record(self) -> DeskResult<ClientRecord> {
        let label = format!("client record {}", self.id);
        Ok(ClientRecord {
            id:             self.id,
            date_built:     parse_optional_date(&label, "date_built", self.date_built.as_deref())?,
            expiry_date:    parse_optional_date(&label, "expiry_date", self.expiry_date.as_deref())?,
            created_at:     parse_timestamp(&label, "created_at", &self.created_at)?,
            client_name:    self.client_name,
            client_email:   self.client_email,
            client_phone:   self.client_phone,
            website_url:    self.website_url,
            cost:           self.cost,
            project_cost:   self.project_cost,
            invoice_status: InvoiceStatus::from(self.invoice_status),
            custom_notes:   self.custom_notes,
            tax_percent:    self.tax_percent,
            currency:       self.currency,
        })
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(crate::client::DATE_FORMAT).to_string()
}

pub(crate) fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(
    record: &str,
    field: &'static str,
    value: &str,
) -> DeskResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| parse_date(record, field, value).map(|d| d.and_time(chrono::NaiveTime::MIN)))
        .map_err(|_| {
            DeskError::validation(record, field, format!("'{value}' is not a timestamp"))
        })
}
