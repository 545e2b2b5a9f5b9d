use super::{format_date, format_timestamp, ClientRow, ClientSource, DeskStore};
use crate::{
    client::{ClientRecord, InvoiceStatus},
    error::{DeskError, DeskResult},
    types::ClientId,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, OptionalExtension, Row};

/// Pass as `ClientRecord::id` to let SQLite assign the id.
pub const NEW_CLIENT_ID: ClientId = 0;

const CLIENT_COLUMNS: &str = "id, client_name, client_email, client_phone, website_url,
    date_built, expiry_date, cost, project_cost, invoice_status,
    custom_notes, tax_percent, currency, created_at";

fn client_row(r: &Row<'_>) -> rusqlite::Result<ClientRow> {
    Ok(ClientRow {
        id:             r.get(0)?,
        client_name:    r.get(1)?,
        client_email:   r.get(2)?,
        client_phone:   r.get(3)?,
        website_url:    r.get(4)?,
        date_built:     r.get(5)?,
        expiry_date:    r.get(6)?,
        cost:           r.get(7)?,
        project_cost:   r.get(8)?,
        invoice_status: r.get(9)?,
        custom_notes:   r.get(10)?,
        tax_percent:    r.get(11)?,
        currency:       r.get(12)?,
        created_at:     r.get(13)?,
    })
}

impl DeskStore {
    // ── Client ────────────────────────────────────────────────────────────

    /// Insert a validated record. Returns the stored id.
    pub fn insert_client(&self, c: &ClientRecord) -> DeskResult<ClientId> {
        c.validate()?;
        let id = (c.id != NEW_CLIENT_ID).then_some(c.id);
        self.conn.execute(
            "INSERT INTO client_website (
                id, client_name, client_email, client_phone, website_url,
                date_built, expiry_date, cost, project_cost, invoice_status,
                custom_notes, tax_percent, currency, created_at, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?14)",
            params![
                id,
                c.client_name,
                c.client_email,
                c.client_phone,
                c.website_url,
                c.date_built.map(format_date),
                c.expiry_date.map(format_date),
                c.cost,
                c.project_cost,
                c.invoice_status.as_str(),
                c.custom_notes,
                c.tax_percent,
                c.currency,
                format_timestamp(c.created_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_client(&self, c: &ClientRecord, updated_at: NaiveDateTime) -> DeskResult<()> {
        c.validate()?;
        let changed = self.conn.execute(
            "UPDATE client_website SET
                client_name = ?2, client_email = ?3, client_phone = ?4, website_url = ?5,
                date_built = ?6, expiry_date = ?7, cost = ?8, project_cost = ?9,
                invoice_status = ?10, custom_notes = ?11, tax_percent = ?12,
                currency = ?13, updated_at = ?14
             WHERE id = ?1",
            params![
                c.id,
                c.client_name,
                c.client_email,
                c.client_phone,
                c.website_url,
                c.date_built.map(format_date),
                c.expiry_date.map(format_date),
                c.cost,
                c.project_cost,
                c.invoice_status.as_str(),
                c.custom_notes,
                c.tax_percent,
                c.currency,
                format_timestamp(updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(DeskError::ClientNotFound { client_id: c.id });
        }
        Ok(())
    }

    /// Delete a client and, via cascade, its reminder history.
    pub fn delete_client(&self, client_id: ClientId) -> DeskResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM client_website WHERE id = ?1", params![client_id])?;
        if changed == 0 {
            return Err(DeskError::ClientNotFound { client_id });
        }
        Ok(())
    }

    pub fn get_client(&self, client_id: ClientId) -> DeskResult<Option<ClientRecord>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM client_website WHERE id = ?1");
        self.conn
            .query_row(&sql, params![client_id], client_row)
            .optional()?
            .map(ClientRow::into_record)
            .transpose()
    }

    pub fn client_count(&self) -> DeskResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM client_website", [], |r| r.get(0))?)
    }

    fn query_clients(&self, sql: &str, args: impl rusqlite::Params) -> DeskResult<Vec<ClientRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, client_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ClientRow::into_record).collect()
    }
}

impl ClientSource for DeskStore {
    /// Newest engagement first.
    fn all_clients(&self) -> DeskResult<Vec<ClientRecord>> {
        self.query_clients(
            &format!("SELECT {CLIENT_COLUMNS} FROM client_website ORDER BY created_at DESC, id DESC"),
            [],
        )
    }

    fn clients_by_status(&self, status: &InvoiceStatus) -> DeskResult<Vec<ClientRecord>> {
        self.query_clients(
            &format!(
                "SELECT {CLIENT_COLUMNS} FROM client_website
                 WHERE invoice_status = ?1 ORDER BY created_at DESC, id DESC"
            ),
            params![status.as_str()],
        )
    }

    fn clients_expiring_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DeskResult<Vec<ClientRecord>> {
        self.query_clients(
            &format!(
                "SELECT {CLIENT_COLUMNS} FROM client_website
                 WHERE expiry_date IS NOT NULL AND expiry_date >= ?1 AND expiry_date <= ?2
                 ORDER BY expiry_date ASC, id ASC"
            ),
            params![format_date(from), format_date(to)],
        )
    }
}
