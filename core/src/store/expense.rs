use super::{format_date, format_timestamp, parse_timestamp, DeskStore};
use crate::{
    client::parse_date,
    error::{DeskError, DeskResult},
    expense::ExpenseRecord,
    types::ExpenseId,
};
use rusqlite::{params, OptionalExtension, Row};

const EXPENSE_COLUMNS: &str = "id, expense_name, amount, expense_date, category,
    description, is_tax_deductible, created_at";

struct ExpenseRow {
    id:                ExpenseId,
    expense_name:      String,
    amount:            f64,
    expense_date:      String,
    category:          String,
    description:       Option<String>,
    is_tax_deductible: bool,
    created_at:        String,
}

fn expense_row(r: &Row<'_>) -> rusqlite::Result<ExpenseRow> {
    Ok(ExpenseRow {
        id:                r.get(0)?,
        expense_name:      r.get(1)?,
        amount:            r.get(2)?,
        expense_date:      r.get(3)?,
        category:          r.get(4)?,
        description:       r.get(5)?,
        is_tax_deductible: r.get::<_, i32>(6)? != 0,
        created_at:        r.get(7)?,
    })
}

impl ExpenseRow {
    fn into_record(self) -> DeskResult<ExpenseRecord> {
        let label = format!("expense {}", self.id);
        Ok(ExpenseRecord {
            id:                self.id,
            expense_date:      parse_date(&label, "expense_date", &self.expense_date)?,
            created_at:        parse_timestamp(&label, "created_at", &self.created_at)?,
            expense_name:      self.expense_name,
            amount:            self.amount,
            category:          self.category,
            description:       self.description,
            is_tax_deductible: self.is_tax_deductible,
        })
    }
}

impl DeskStore {
    // ── Expenses ──────────────────────────────────────────────────────────

    /// Insert a validated expense; `e.id` is ignored. Returns the new id.
    pub fn insert_expense(&self, e: &ExpenseRecord) -> DeskResult<ExpenseId> {
        e.validate()?;
        self.conn.execute(
            "INSERT INTO business_expense (
                expense_name, amount, expense_date, category,
                description, is_tax_deductible, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                e.expense_name,
                e.amount,
                format_date(e.expense_date),
                e.category,
                e.description,
                if e.is_tax_deductible { 1 } else { 0 },
                format_timestamp(e.created_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_expense(&self, e: &ExpenseRecord) -> DeskResult<()> {
        e.validate()?;
        let changed = self.conn.execute(
            "UPDATE business_expense SET
                expense_name = ?2, amount = ?3, expense_date = ?4, category = ?5,
                description = ?6, is_tax_deductible = ?7
             WHERE id = ?1",
            params![
                e.id,
                e.expense_name,
                e.amount,
                format_date(e.expense_date),
                e.category,
                e.description,
                if e.is_tax_deductible { 1 } else { 0 },
            ],
        )?;
        if changed == 0 {
            return Err(DeskError::ExpenseNotFound { expense_id: e.id });
        }
        Ok(())
    }

    pub fn delete_expense(&self, expense_id: ExpenseId) -> DeskResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM business_expense WHERE id = ?1", params![expense_id])?;
        if changed == 0 {
            return Err(DeskError::ExpenseNotFound { expense_id });
        }
        Ok(())
    }

    pub fn get_expense(&self, expense_id: ExpenseId) -> DeskResult<Option<ExpenseRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {EXPENSE_COLUMNS} FROM business_expense WHERE id = ?1"),
                params![expense_id],
                expense_row,
            )
            .optional()?
            .map(ExpenseRow::into_record)
            .transpose()
    }

    /// Most recent expense date first.
    pub fn all_expenses(&self) -> DeskResult<Vec<ExpenseRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM business_expense ORDER BY expense_date DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([], expense_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ExpenseRow::into_record).collect()
    }
}
