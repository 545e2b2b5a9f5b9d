//! The desk service — wires the store, the clock and the engine together.
//!
//! Every call fetches a fresh snapshot from the store and hands it to the
//! pure engine functions. Reminder records are written inside one
//! transaction against the store's UNIQUE(client, tier) key.

use crate::{
    analytics::{compute_business_analytics, BusinessAnalytics},
    client::{ClientInput, ClientRecord},
    clock::{DateSource, FixedClock},
    config::DeskConfig,
    error::{DeskError, DeskResult},
    expense::{summarize_expenses, ExpenseInput, ExpenseRecord, ExpenseSummary},
    reminder::{
        compute_reminder_candidates, whatsapp_link, ReminderCandidate, ReminderStatus,
        ReminderTier, REMINDER_WINDOW_DAYS,
    },
    store::{ClientSource, DeskStore, ReminderHistoryEntry, NEW_CLIENT_ID},
    types::{ClientId, ExpenseId, ReminderId},
};
use chrono::{Days, NaiveDate, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
/// "Recent" in reminder stats.
pub const RECENT_REMINDER_DAYS: u64 = 30;

/// A reminder that was recorded and is ready for a person to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchedReminder {
    pub client_id:      ClientId,
    pub client_name:    String,
    pub tier:           ReminderTier,
    pub days_remaining: i64,
    pub whatsapp_url:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCount {
    pub tier:  ReminderTier,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderStats {
    pub total_sent:        i64,
    /// Recorded reminders later marked as not delivered.
    pub failed:            i64,
    pub sent_last_30_days: i64,
    pub pending:           usize,
    pub breakdown:         Vec<TierCount>,
}

pub struct Desk {
    store:  DeskStore,
    config: DeskConfig,
    clock:  Box<dyn DateSource>,
}

impl Desk {
    pub fn new(store: DeskStore, config: DeskConfig, clock: Box<dyn DateSource>) -> Self {
        Self { store, config, clock }
    }

    /// In-memory, migrated desk with test config, pinned to `today`.
    pub fn build_test(today: NaiveDate) -> DeskResult<Self> {
        let store = DeskStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(store, DeskConfig::default_test(), Box::new(FixedClock::on(today))))
    }

    pub fn store(&self) -> &DeskStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Current time at whole-second precision, the resolution the store keeps.
    fn now(&self) -> NaiveDateTime {
        self.clock.now().trunc_subsecs(0)
    }

    // ── Records ───────────────────────────────────────────────────────────

    pub fn add_client(&self, input: ClientInput) -> DeskResult<ClientRecord> {
        let mut record = input.into_record(NEW_CLIENT_ID, self.now())?;
        record.id = self.store.insert_client(&record)?;
        log::debug!("Client {} added: {}", record.id, record.client_name);
        Ok(record)
    }

    /// Replace a stored client's fields; `created_at` is kept.
    pub fn update_client(&self, client_id: ClientId, input: ClientInput) -> DeskResult<ClientRecord> {
        let existing = self
            .store
            .get_client(client_id)?
            .ok_or(DeskError::ClientNotFound { client_id })?;
        let record = input.into_record(client_id, existing.created_at)?;
        self.store.update_client(&record, self.now())?;
        log::debug!("Client {client_id} updated");
        Ok(record)
    }

    /// Delete a client together with its reminder history.
    pub fn delete_client(&self, client_id: ClientId) -> DeskResult<()> {
        self.store.delete_client(client_id)?;
        log::debug!("Client {client_id} deleted");
        Ok(())
    }

    pub fn add_expense(&self, input: ExpenseInput) -> DeskResult<ExpenseRecord> {
        let mut record = input.into_record(0, self.now())?;
        record.id = self.store.insert_expense(&record)?;
        Ok(record)
    }

    pub fn update_expense(&self, expense_id: ExpenseId, input: ExpenseInput) -> DeskResult<ExpenseRecord> {
        let existing = self
            .store
            .get_expense(expense_id)?
            .ok_or(DeskError::ExpenseNotFound { expense_id })?;
        let record = input.into_record(expense_id, existing.created_at)?;
        self.store.update_expense(&record)?;
        Ok(record)
    }

    pub fn delete_expense(&self, expense_id: ExpenseId) -> DeskResult<()> {
        self.store.delete_expense(expense_id)
    }

    // ── Analytics ─────────────────────────────────────────────────────────

    pub fn business_analytics(&self) -> DeskResult<BusinessAnalytics> {
        let clients = self.store.all_clients()?;
        compute_business_analytics(&clients, self.today())
    }

    pub fn expense_summary(&self) -> DeskResult<ExpenseSummary> {
        summarize_expenses(&self.store.all_expenses()?)
    }

    // ── Reminders ─────────────────────────────────────────────────────────

    /// Reminders due today that have not been recorded yet.
    pub fn check_reminders(&self) -> DeskResult<Vec<ReminderCandidate>> {
        let today = self.today();
        let horizon = today + Days::new(REMINDER_WINDOW_DAYS.unsigned_abs());
        let clients = self.store.clients_expiring_between(today, horizon)?;
        compute_reminder_candidates(&clients, &self.store, today, &self.config)
    }

    /// Record every due reminder (or only those for `client_ids`, when
    /// non-empty) and return a pre-filled link for each one recorded.
    ///
    /// Eligibility is re-read inside the transaction; a pair recorded by a
    /// concurrent sender in between is skipped by the unique key.
    pub fn send_reminders(&self, client_ids: &[ClientId]) -> DeskResult<Vec<DispatchedReminder>> {
        let sent_at = self.now();
        let dispatched = self.store.with_transaction(|store| {
            let mut dispatched = Vec::new();
            for candidate in self.check_reminders()? {
                if !client_ids.is_empty() && !client_ids.contains(&candidate.client_id) {
                    continue;
                }
                if !store.insert_reminder(&candidate.to_record(sent_at))? {
                    log::warn!(
                        "Reminder {} for client {} already recorded, skipping",
                        candidate.tier,
                        candidate.client_id
                    );
                    continue;
                }
                dispatched.push(DispatchedReminder {
                    whatsapp_url: whatsapp_link(
                        candidate.client_phone.as_deref(),
                        &candidate.message,
                        &self.config,
                    ),
                    client_id: candidate.client_id,
                    client_name: candidate.client_name,
                    tier: candidate.tier,
                    days_remaining: candidate.days_remaining,
                });
            }
            Ok(dispatched)
        })?;
        log::info!("Recorded {} reminder(s) ready to send", dispatched.len());
        Ok(dispatched)
    }

    /// Mark a recorded reminder as not delivered. The (client, tier) slot
    /// stays taken.
    pub fn mark_reminder_failed(&self, reminder_id: ReminderId) -> DeskResult<()> {
        self.store.set_reminder_status(reminder_id, ReminderStatus::Failed)?;
        log::warn!("Reminder {reminder_id} marked as failed");
        Ok(())
    }

    pub fn reminder_history(&self, limit: usize) -> DeskResult<Vec<ReminderHistoryEntry>> {
        self.store.recent_reminders(limit)
    }

    pub fn reminder_stats(&self) -> DeskResult<ReminderStats> {
        let since = self.now() - Days::new(RECENT_REMINDER_DAYS);
        Ok(ReminderStats {
            total_sent: self.store.reminder_count()?,
            failed: self.store.reminder_count_with_status(ReminderStatus::Failed)?,
            sent_last_30_days: self.store.reminder_count_since(since)?,
            pending: self.check_reminders()?.len(),
            breakdown: self
                .store
                .reminder_breakdown()?
                .into_iter()
                .map(|(tier, count)| TierCount { tier, count })
                .collect(),
        })
    }
}
