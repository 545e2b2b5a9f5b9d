//! Shared primitive types used across the desk.

/// Primary key of a client engagement record.
pub type ClientId = i64;

/// Primary key of a persisted reminder.
pub type ReminderId = i64;

/// Primary key of a business expense.
pub type ExpenseId = i64;

/// Monetary amounts. Rounded to 2dp only when a derived value is emitted.
pub type Money = f64;
