//! Renewal reminders — eligibility, suppression and message templates.
//!
//! Lifecycle of a reminder:
//!   eligible → rendered → proposed → (sent by a person) → recorded
//!
//! This module stops at "proposed": it returns candidates with their
//! message text. Recording a `ReminderRecord` and building the outbound
//! deep link belong to the caller (see `desk.rs`).
//!
//! A (client, tier) pair is reminded at most once. Eligibility reads the
//! existing history through `ReminderHistory` and drops pairs already
//! recorded; it never writes.

use crate::{
    client::{validate_snapshot, ClientRecord},
    config::DeskConfig,
    error::DeskResult,
    types::{ClientId, Money, ReminderId},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Candidates are only produced this many days ahead of expiry.
pub const REMINDER_WINDOW_DAYS: i64 = 60;
pub const MESSAGE_PREVIEW_CHARS: usize = 100;

// ── Tier ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReminderTier {
    #[serde(rename = "60_day")]
    SixtyDay,
    #[serde(rename = "30_day")]
    ThirtyDay,
    #[serde(rename = "7_day")]
    SevenDay,
}

impl ReminderTier {
    pub const ALL: [ReminderTier; 3] = [Self::SixtyDay, Self::ThirtyDay, Self::SevenDay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SixtyDay => "60_day",
            Self::ThirtyDay => "30_day",
            Self::SevenDay => "7_day",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }

    /// The single most urgent tier covering `days` before expiry.
    pub fn for_days(days: i64) -> Option<Self> {
        match days {
            d if d < 0 => None,
            d if d <= 7 => Some(Self::SevenDay),
            d if d <= 30 => Some(Self::ThirtyDay),
            d if d <= REMINDER_WINDOW_DAYS => Some(Self::SixtyDay),
            _ => None,
        }
    }
}

impl fmt::Display for ReminderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Records and candidates ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Sent,
    Failed,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A reminder that has been recorded as sent (or attempted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub id:        Option<ReminderId>,
    pub client_id: ClientId,
    pub tier:      ReminderTier,
    pub sent_at:   NaiveDateTime,
    pub message:   String,
    pub status:    ReminderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderCandidate {
    pub client_id:      ClientId,
    pub client_name:    String,
    pub client_phone:   Option<String>,
    pub expiry_date:    NaiveDate,
    pub tier:           ReminderTier,
    pub days_remaining: i64,
    pub project_value:  Money,
    pub message:        String,
}

impl ReminderCandidate {
    /// First `MESSAGE_PREVIEW_CHARS` characters, with "..." when cut.
    pub fn message_preview(&self) -> String {
        if self.message.chars().count() > MESSAGE_PREVIEW_CHARS {
            let head: String = self.message.chars().take(MESSAGE_PREVIEW_CHARS).collect();
            format!("{head}...")
        } else {
            self.message.clone()
        }
    }

    pub fn to_record(&self, sent_at: NaiveDateTime) -> ReminderRecord {
        ReminderRecord {
            id: None,
            client_id: self.client_id,
            tier: self.tier,
            sent_at,
            message: self.message.clone(),
            status: ReminderStatus::Sent,
        }
    }
}

/// Read side of the reminder history.
pub trait ReminderHistory {
    fn has_reminder(&self, client_id: ClientId, tier: ReminderTier) -> DeskResult<bool>;
}

impl ReminderHistory for [ReminderRecord] {
    fn has_reminder(&self, client_id: ClientId, tier: ReminderTier) -> DeskResult<bool> {
        Ok(self.iter().any(|r| r.client_id == client_id && r.tier == tier))
    }
}

impl ReminderHistory for Vec<ReminderRecord> {
    fn has_reminder(&self, client_id: ClientId, tier: ReminderTier) -> DeskResult<bool> {
        self.as_slice().has_reminder(client_id, tier)
    }
}

// ── Eligibility ──────────────────────────────────────────────────────────────

/// Records due a reminder today, minus (client, tier) pairs already in `history`.
///
/// One candidate at most per record, in input order.
pub fn compute_reminder_candidates<H>(
    clients: &[ClientRecord],
    history: &H,
    today: NaiveDate,
    config: &DeskConfig,
) -> DeskResult<Vec<ReminderCandidate>>
where
    H: ReminderHistory + ?Sized,
{
    validate_snapshot(clients)?;

    let mut candidates = Vec::new();
    for client in clients {
        let Some(expiry_date) = client.expiry_date else { continue };
        let days = (expiry_date - today).num_days();
        let Some(tier) = ReminderTier::for_days(days) else { continue };

        if history.has_reminder(client.id, tier)? {
            continue;
        }

        candidates.push(ReminderCandidate {
            client_id:      client.id,
            client_name:    client.client_name.clone(),
            client_phone:   client.client_phone.clone(),
            expiry_date,
            tier,
            days_remaining: days,
            project_value:  client.cost,
            message:        render_reminder_message(client, tier, days, config),
        });
    }
    Ok(candidates)
}

// ── Templates ────────────────────────────────────────────────────────────────

/// Values substituted into every template.
pub struct MessageContext<'a> {
    pub client_name:    &'a str,
    pub days_remaining: i64,
    pub expiry_date:    String,
    pub amount:         String,
    pub account_url:    String,
    pub config:         &'a DeskConfig,
}

type Template = fn(&MessageContext<'_>) -> String;

/// One entry per tier. A new tier is a new row here.
const TEMPLATES: [(ReminderTier, Template); 3] = [
    (ReminderTier::SixtyDay, sixty_day_message),
    (ReminderTier::ThirtyDay, thirty_day_message),
    (ReminderTier::SevenDay, seven_day_message),
];

fn template_for(tier: ReminderTier) -> Template {
    TEMPLATES
        .iter()
        .find(|(t, _)| *t == tier)
        .map(|(_, f)| *f)
        .unwrap_or(thirty_day_message)
}

pub fn render_reminder_message(
    client: &ClientRecord,
    tier: ReminderTier,
    days_remaining: i64,
    config: &DeskConfig,
) -> String {
    let ctx = MessageContext {
        client_name: &client.client_name,
        days_remaining,
        expiry_date: client
            .expiry_date
            .map(|d| d.format("%B %d, %Y").to_string())
            .unwrap_or_else(|| "a date still to be confirmed".to_string()),
        amount: format_amount(client.cost, &client.currency),
        account_url: config.account_url(client.id),
        config,
    };
    template_for(tier)(&ctx)
}

/// Same as `render_reminder_message` for a tier given as text.
/// Unrecognised labels get the 30-day wording.
pub fn render_reminder_message_for_label(
    client: &ClientRecord,
    tier_label: &str,
    days_remaining: i64,
    config: &DeskConfig,
) -> String {
    let tier = ReminderTier::parse(tier_label).unwrap_or(ReminderTier::ThirtyDay);
    render_reminder_message(client, tier, days_remaining, config)
}

fn sixty_day_message(ctx: &MessageContext<'_>) -> String {
    let c = &ctx.config.contact;
    format!(
        "Hello {name}!\n\n\
         Just a friendly note that your project with us expires in {days} days, on {expiry}.\n\n\
         We'd be glad to talk through renewal options so your service carries on without a gap.\n\n\
         Would a short call suit you to see how we can keep supporting your business?\n\n\
         Your account: {url}\n\n\
         Kind regards,\n\
         {contact} - {title}\n\
         Phone: {phone}\n\
         Email: {email}\n\n\
         Just reply here to get started.",
        name = ctx.client_name,
        days = ctx.days_remaining,
        expiry = ctx.expiry_date,
        url = ctx.account_url,
        contact = c.name,
        title = c.title,
        phone = c.phone,
        email = c.email,
    )
}

fn thirty_day_message(ctx: &MessageContext<'_>) -> String {
    let c = &ctx.config.contact;
    format!(
        "Hi {name}!\n\n\
         Your project expires in {days} days ({expiry}).\n\n\
         Let's agree a renewal that works for your business so nothing is interrupted.\n\n\
         We can:\n\
         - Review your current setup\n\
         - Suggest improvements\n\
         - Offer competitive renewal pricing\n\n\
         Your account: {url}\n\n\
         Ready to confirm your renewal?\n\n\
         Kind regards,\n\
         {contact} - {title}\n\
         Phone: {phone}\n\
         Email: {email}",
        name = ctx.client_name,
        days = ctx.days_remaining,
        expiry = ctx.expiry_date,
        url = ctx.account_url,
        contact = c.name,
        title = c.title,
        phone = c.phone,
        email = c.email,
    )
}

fn seven_day_message(ctx: &MessageContext<'_>) -> String {
    let c = &ctx.config.contact;
    format!(
        "URGENT: {name}\n\n\
         Your project expires in just {days} days, on {expiry}.\n\n\
         To avoid any interruption we need to finalise your renewal now.\n\n\
         Current project value: {amount}\n\n\
         What we need from you before {expiry}:\n\
         1. Confirm you want to renew\n\
         2. Review the updated terms\n\
         3. Process payment\n\n\
         Your account: {url}\n\n\
         Contact us today:\n\
         {contact} - {title}\n\
         Phone: {phone} (Call/WhatsApp)\n\
         Email: {email}\n\n\
         Don't let your project lapse!",
        name = ctx.client_name,
        days = ctx.days_remaining,
        expiry = ctx.expiry_date,
        amount = ctx.amount,
        url = ctx.account_url,
        contact = c.name,
        title = c.title,
        phone = c.phone,
        email = c.email,
    )
}

fn format_amount(amount: Money, currency: &str) -> String {
    match currency {
        "GBP" => format!("£{amount:.2}"),
        "USD" => format!("${amount:.2}"),
        "EUR" => format!("€{amount:.2}"),
        other => format!("{other} {amount:.2}"),
    }
}

// ── Outbound link ────────────────────────────────────────────────────────────

/// Pre-filled WhatsApp link for a person to send `message` by hand.
///
/// A missing phone falls back to the business number; a local number
/// gets the configured dial code in place of its leading zeros.
pub fn whatsapp_link(phone: Option<&str>, message: &str, config: &DeskConfig) -> String {
    let phone = phone
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(config.contact.phone.as_str());
    format!(
        "https://wa.me/{}?text={}",
        international_digits(phone, &config.default_dial_code),
        urlencoding::encode(message)
    )
}

fn international_digits(phone: &str, dial_code: &str) -> String {
    let full = if phone.starts_with('+') {
        phone.to_string()
    } else {
        format!("{dial_code}{}", phone.trim_start_matches('0'))
    };
    full.chars().filter(char::is_ascii_digit).collect()
}
