use crate::types::{ClientId, ExpenseId, ReminderId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid {record}: field '{field}' {reason}")]
    Validation {
        record: String,
        field:  &'static str,
        reason: String,
    },

    #[error("Client {client_id} not found")]
    ClientNotFound { client_id: ClientId },

    #[error("Reminder {reminder_id} not found")]
    ReminderNotFound { reminder_id: ReminderId },

    #[error("Expense {expense_id} not found")]
    ExpenseNotFound { expense_id: ExpenseId },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DeskError {
    pub fn validation(
        record: impl Into<String>,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            record: record.into(),
            field,
            reason: reason.into(),
        }
    }
}

pub type DeskResult<T> = Result<T, DeskError>;
