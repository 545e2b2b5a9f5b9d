//! Client engagement records — one row per website-building project.
//!
//! Records are owned by the store. The engine only ever sees an
//! immutable slice of them and checks the slice with `validate_snapshot`
//! before deriving anything.

use crate::{
    error::{DeskError, DeskResult},
    types::{ClientId, Money},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_CURRENCY: &str = "GBP";
/// Slack for binary representation when checking an amount is whole pennies.
const PENNY_TOLERANCE: f64 = 1e-6;

// ── Invoice status ───────────────────────────────────────────────────────────

/// Invoice state of an engagement. Values other than `Paid`/`Unpaid`
/// are carried through untouched and count as "not paid".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "Paid",
            Self::Unpaid => "Unpaid",
            Self::Other(s) => s,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl From<String> for InvoiceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Paid" => Self::Paid,
            "Unpaid" => Self::Unpaid,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for InvoiceStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Client record ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id:             ClientId,
    pub client_name:    String,
    pub client_email:   Option<String>,
    pub client_phone:   Option<String>,
    pub website_url:    Option<String>,
    pub date_built:     Option<NaiveDate>,
    pub expiry_date:    Option<NaiveDate>,
    /// Revenue: what the client pays.
    pub cost:           Money,
    /// What the project actually cost us. `None` counts as 0.
    pub project_cost:   Option<Money>,
    pub invoice_status: InvoiceStatus,
    pub custom_notes:   Option<String>,
    pub tax_percent:    Option<f64>,
    pub currency:       String,
    pub created_at:     NaiveDateTime,
}

impl ClientRecord {
    /// Minimal record; optional fields empty, currency defaulted.
    pub fn new(
        id: ClientId,
        client_name: impl Into<String>,
        cost: Money,
        invoice_status: InvoiceStatus,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            client_name: client_name.into(),
            client_email: None,
            client_phone: None,
            website_url: None,
            date_built: None,
            expiry_date: None,
            cost,
            project_cost: None,
            invoice_status,
            custom_notes: None,
            tax_percent: None,
            currency: DEFAULT_CURRENCY.to_string(),
            created_at,
        }
    }

    pub fn project_cost_or_zero(&self) -> Money {
        self.project_cost.unwrap_or(0.0)
    }

    /// Unrounded `cost - project_cost`.
    pub fn profit(&self) -> Money {
        self.cost - self.project_cost_or_zero()
    }

    /// Profit as a percentage of revenue, 2dp. Zero-revenue records report 0.
    pub fn profit_margin(&self) -> f64 {
        round2(ratio_pct(self.profit(), self.cost))
    }

    /// Whole days from `today` to expiry; negative once expired.
    pub fn days_to_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|d| (d - today).num_days())
    }

    pub fn label(&self) -> String {
        record_label(self.id)
    }

    pub fn validate(&self) -> DeskResult<()> {
        let label = self.label();
        if self.client_name.trim().is_empty() {
            return Err(DeskError::validation(label, "client_name", "must not be empty"));
        }
        check_amount(&label, "cost", self.cost)?;
        if let Some(project_cost) = self.project_cost {
            check_amount(&label, "project_cost", project_cost)?;
        }
        if let Some(tax) = self.tax_percent {
            if !tax.is_finite() || !(0.0..=100.0).contains(&tax) {
                return Err(DeskError::validation(
                    label,
                    "tax_percent",
                    format!("must be between 0 and 100, got {tax}"),
                ));
            }
        }
        Ok(())
    }
}

/// Fail on the first malformed record in the snapshot.
pub fn validate_snapshot(clients: &[ClientRecord]) -> DeskResult<()> {
    clients.iter().try_for_each(ClientRecord::validate)
}

// ── Raw input ────────────────────────────────────────────────────────────────

/// Client data as submitted by a form or import file: dates are still text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    pub client_name:    String,
    #[serde(default)]
    pub client_email:   Option<String>,
    #[serde(default)]
    pub client_phone:   Option<String>,
    #[serde(default)]
    pub website_url:    Option<String>,
    #[serde(default)]
    pub date_built:     Option<String>,
    #[serde(default)]
    pub expiry_date:    Option<String>,
    pub cost:           Money,
    #[serde(default)]
    pub project_cost:   Option<Money>,
    pub invoice_status: String,
    #[serde(default)]
    pub custom_notes:   Option<String>,
    #[serde(default)]
    pub tax_percent:    Option<f64>,
    #[serde(default)]
    pub currency:       Option<String>,
}

impl ClientInput {
    /// Parse and validate into a record with the given identity.
    pub fn into_record(self, id: ClientId, created_at: NaiveDateTime) -> DeskResult<ClientRecord> {
        let label = record_label(id);
        let record = ClientRecord {
            id,
            date_built: parse_optional_date(&label, "date_built", self.date_built.as_deref())?,
            expiry_date: parse_optional_date(&label, "expiry_date", self.expiry_date.as_deref())?,
            client_name: self.client_name,
            client_email: non_blank(self.client_email),
            client_phone: non_blank(self.client_phone),
            website_url: non_blank(self.website_url),
            cost: self.cost,
            project_cost: self.project_cost,
            invoice_status: InvoiceStatus::from(self.invoice_status),
            custom_notes: non_blank(self.custom_notes),
            tax_percent: self.tax_percent,
            currency: non_blank(self.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            created_at,
        };
        record.validate()?;
        Ok(record)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// How validation errors name a client record; id 0 is one not stored yet.
fn record_label(id: ClientId) -> String {
    if id == 0 {
        "new client record".to_string()
    } else {
        format!("client record {id}")
    }
}

pub(crate) fn parse_date(record: &str, field: &'static str, value: &str) -> DeskResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        DeskError::validation(record, field, format!("'{value}' is not a YYYY-MM-DD date: {e}"))
    })
}

pub(crate) fn parse_optional_date(
    record: &str,
    field: &'static str,
    value: Option<&str>,
) -> DeskResult<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(record, field, v).map(Some),
    }
}

pub(crate) fn check_amount(record: &str, field: &'static str, amount: Money) -> DeskResult<()> {
    if !amount.is_finite() {
        return Err(DeskError::validation(record, field, "must be a finite number"));
    }
    if amount < 0.0 {
        return Err(DeskError::validation(record, field, format!("must be >= 0, got {amount}")));
    }
    // Whole pennies only.
    let pennies = amount * 100.0;
    if (pennies - pennies.round()).abs() > PENNY_TOLERANCE {
        return Err(DeskError::validation(
            record,
            field,
            format!("must have at most 2 decimal places, got {amount}"),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Round half away from zero to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round half away from zero to 1 decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part / whole * 100`, or 0 when `whole` is not positive.
pub(crate) fn ratio_pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
