use super::{format_timestamp, parse_timestamp, DeskStore};
use crate::{
    error::{DeskError, DeskResult},
    reminder::{ReminderHistory, ReminderRecord, ReminderStatus, ReminderTier},
    types::{ClientId, ReminderId},
};
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// A recorded reminder with the client's current name, for history views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderHistoryEntry {
    pub client_name: String,
    #[serde(flatten)]
    pub reminder:    ReminderRecord,
}

struct ReminderRow {
    id:        i64,
    client_id: ClientId,
    tier:      String,
    sent_at:   String,
    message:   String,
    status:    String,
}

fn reminder_row(r: &Row<'_>) -> rusqlite::Result<ReminderRow> {
    Ok(ReminderRow {
        id:        r.get(0)?,
        client_id: r.get(1)?,
        tier:      r.get(2)?,
        sent_at:   r.get(3)?,
        message:   r.get(4)?,
        status:    r.get(5)?,
    })
}

impl ReminderRow {
    fn into_record(self) -> DeskResult<ReminderRecord> {
        let label = format!("reminder {}", self.id);
        let tier = ReminderTier::parse(&self.tier).ok_or_else(|| {
            DeskError::validation(&label, "reminder_type", format!("unknown tier '{}'", self.tier))
        })?;
        let status = ReminderStatus::parse(&self.status).ok_or_else(|| {
            DeskError::validation(&label, "status", format!("unknown status '{}'", self.status))
        })?;
        Ok(ReminderRecord {
            id: Some(self.id),
            client_id: self.client_id,
            tier,
            sent_at: parse_timestamp(&label, "sent_at", &self.sent_at)?,
            message: self.message,
            status,
        })
    }
}

const REMINDER_COLUMNS: &str = "id, client_id, reminder_type, sent_at, message_content, status";

impl DeskStore {
    // ── Reminder history ──────────────────────────────────────────────────

    /// Record a reminder. Returns `false` when the (client, tier) pair was
    /// already recorded; the existing row is left untouched.
    pub fn insert_reminder(&self, r: &ReminderRecord) -> DeskResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO client_reminder (
                client_id, reminder_type, sent_at, message_content, status
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                r.client_id,
                r.tier.as_str(),
                format_timestamp(r.sent_at),
                r.message,
                r.status.as_str(),
            ],
        )?;
        Ok(inserted == 1)
    }

    pub fn all_reminders(&self) -> DeskResult<Vec<ReminderRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REMINDER_COLUMNS} FROM client_reminder ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map([], reminder_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ReminderRow::into_record).collect()
    }

    pub fn find_reminder(
        &self,
        client_id: ClientId,
        tier: ReminderTier,
    ) -> DeskResult<Option<ReminderRecord>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {REMINDER_COLUMNS} FROM client_reminder
                     WHERE client_id = ?1 AND reminder_type = ?2"
                ),
                params![client_id, tier.as_str()],
                reminder_row,
            )
            .optional()?
            .map(ReminderRow::into_record)
            .transpose()
    }

    /// Most recently sent first.
    pub fn recent_reminders(&self, limit: usize) -> DeskResult<Vec<ReminderHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.client_id, r.reminder_type, r.sent_at, r.message_content, r.status,
                    c.client_name
             FROM client_reminder r
             JOIN client_website c ON c.id = r.client_id
             ORDER BY r.sent_at DESC, r.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |r| {
                Ok((reminder_row(r)?, r.get::<_, String>(6)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(row, client_name)| {
                Ok(ReminderHistoryEntry {
                    client_name,
                    reminder: row.into_record()?,
                })
            })
            .collect()
    }

    pub fn reminder_count(&self) -> DeskResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM client_reminder", [], |r| r.get(0))?)
    }

    pub fn reminder_count_with_status(&self, status: ReminderStatus) -> DeskResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM client_reminder WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?)
    }

    pub fn set_reminder_status(&self, reminder_id: ReminderId, status: ReminderStatus) -> DeskResult<()> {
        let changed = self.conn.execute(
            "UPDATE client_reminder SET status = ?2 WHERE id = ?1",
            params![reminder_id, status.as_str()],
        )?;
        if changed == 0 {
            return Err(DeskError::ReminderNotFound { reminder_id });
        }
        Ok(())
    }

    pub fn reminder_count_since(&self, since: NaiveDateTime) -> DeskResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM client_reminder WHERE sent_at >= ?1",
            params![format_timestamp(since)],
            |r| r.get(0),
        )?)
    }

    /// Count per tier, in tier order. Tiers with no reminders are omitted.
    pub fn reminder_breakdown(&self) -> DeskResult<Vec<(ReminderTier, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT reminder_type, COUNT(*) FROM client_reminder GROUP BY reminder_type",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut breakdown = rows
            .into_iter()
            .map(|(label, count)| {
                ReminderTier::parse(&label)
                    .map(|tier| (tier, count))
                    .ok_or_else(|| {
                        DeskError::validation(
                            "reminder breakdown",
                            "reminder_type",
                            format!("unknown tier '{label}'"),
                        )
                    })
            })
            .collect::<DeskResult<Vec<_>>>()?;
        breakdown.sort_by_key(|(tier, _)| *tier);
        Ok(breakdown)
    }
}

impl ReminderHistory for DeskStore {
    fn has_reminder(&self, client_id: ClientId, tier: ReminderTier) -> DeskResult<bool> {
        Ok(self.find_reminder(client_id, tier)?.is_some())
    }
}
