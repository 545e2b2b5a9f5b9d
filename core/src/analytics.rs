//! Business analytics — margins, lifetime value, renewal outlook.
//!
//! Pure functions over an immutable snapshot of client records. Nothing
//! here touches the store or the clock: callers fetch the records, pick
//! `today`, and get freshly derived values back on every call.
//!
//! Clients are grouped by exact `client_name`. Two spellings of the same
//! business are two clients, and two businesses sharing a name are one.
//! Records carry no stable client identity beyond the name, so the
//! collision is reported as-is rather than guessed around.

use crate::{
    client::{ratio_pct, round1, round2, validate_snapshot, ClientRecord, InvoiceStatus},
    error::DeskResult,
    types::{ClientId, Money},
};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Records expiring within this many days are "expiring soon".
pub const EXPIRY_WINDOW_DAYS: i64 = 60;
/// Expiring records at or under this many days are high-priority renewals.
pub const HIGH_PRIORITY_DAYS: i64 = 30;
pub const TOP_CLIENT_LIMIT: usize = 10;
pub const EXPIRY_ALERT_LIMIT: usize = 10;
pub const FORECAST_MONTHS: u64 = 3;
/// Forecast buckets step by a fixed 30 days, not calendar months.
pub const FORECAST_STEP_DAYS: u64 = 30;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_revenue:          Money,
    pub total_project_costs:    Money,
    pub total_profit:           Money,
    pub overall_profit_margin:  f64,

    pub paid_revenue:           Money,
    pub paid_project_costs:     Money,
    pub paid_profit:            Money,
    pub paid_profit_margin:     f64,
    /// Revenue on records whose invoice is explicitly `Unpaid`.
    pub outstanding_revenue:    Money,

    pub total_projects:         usize,
    pub paid_projects:          usize,
    pub unpaid_projects:        usize,
    pub payment_rate:           f64,

    pub avg_project_value:      Money,
    pub avg_profit_per_project: Money,
}

/// Renewal prediction from project count alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenewalLikelihood {
    High,
    Medium,
    Low,
    Unknown,
}

impl RenewalLikelihood {
    pub fn from_project_count(count: usize) -> Self {
        match count {
            c if c >= 3 => Self::High,
            2 => Self::Medium,
            1 => Self::Low,
            // Every group has at least one record; kept for completeness.
            _ => Self::Unknown,
        }
    }

    /// Expected fraction of at-risk revenue that renews.
    pub fn renewal_multiplier(&self) -> f64 {
        match self {
            Self::High => 0.8,
            Self::Medium => 0.5,
            Self::Low => 0.2,
            Self::Unknown => 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientValueProfile {
    pub client_name:        String,
    pub total_revenue:      Money,
    pub total_projects:     usize,
    pub avg_project_value:  Money,
    pub total_profit:       Money,
    pub avg_profit_margin:  f64,
    pub first_project:      NaiveDateTime,
    pub last_project:       NaiveDateTime,
    pub renewal_likelihood: RenewalLikelihood,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryAlert {
    pub client_id:          ClientId,
    pub client_name:        String,
    pub days_to_expiry:     i64,
    pub revenue_at_risk:    Money,
    pub profit_at_risk:     Money,
    pub renewal_likelihood: RenewalLikelihood,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastConfidence {
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMonth {
    /// e.g. "January 2024".
    pub month:             String,
    pub expected_renewals: f64,
    pub expected_revenue:  Money,
    pub confidence:        ForecastConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewalOutlook {
    /// Soonest first, at most `EXPIRY_ALERT_LIMIT`.
    pub expiring_soon:          Vec<ExpiryAlert>,
    /// Names in input order. A client with several expiring records
    /// appears once per record.
    pub high_priority_renewals: Vec<String>,
    pub revenue_forecast:       Vec<ForecastMonth>,
}

/// Everything the analytics dashboard shows, from one pass over the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessAnalytics {
    #[serde(flatten)]
    pub summary:                FinancialSummary,
    pub client_lifetime_values: Vec<ClientValueProfile>,
    #[serde(flatten)]
    pub outlook:                RenewalOutlook,
}

// ── Operations ───────────────────────────────────────────────────────────────

pub fn compute_summary(clients: &[ClientRecord]) -> DeskResult<FinancialSummary> {
    validate_snapshot(clients)?;
    Ok(summarize(clients))
}

/// Top clients by lifetime revenue.
pub fn compute_client_values(clients: &[ClientRecord]) -> DeskResult<Vec<ClientValueProfile>> {
    validate_snapshot(clients)?;
    Ok(top_clients(&group_by_client(clients)))
}

pub fn compute_expiry_and_forecast(
    clients: &[ClientRecord],
    today: NaiveDate,
) -> DeskResult<RenewalOutlook> {
    validate_snapshot(clients)?;
    Ok(outlook(clients, &group_by_client(clients), today))
}

pub fn compute_business_analytics(
    clients: &[ClientRecord],
    today: NaiveDate,
) -> DeskResult<BusinessAnalytics> {
    validate_snapshot(clients)?;
    let groups = group_by_client(clients);
    Ok(BusinessAnalytics {
        summary: summarize(clients),
        client_lifetime_values: top_clients(&groups),
        outlook: outlook(clients, &groups, today),
    })
}

// ── Financial summary ────────────────────────────────────────────────────────

#[derive(Default)]
struct Totals {
    revenue:       Money,
    project_costs: Money,
    count:         usize,
}

impl Totals {
    fn add(&mut self, c: &ClientRecord) {
        self.revenue += c.cost;
        self.project_costs += c.project_cost_or_zero();
        self.count += 1;
    }

    fn profit(&self) -> Money {
        self.revenue - self.project_costs
    }

    /// Difference of the rounded totals, so the reported figures add up.
    fn rounded_profit(&self) -> Money {
        round2(round2(self.revenue) - round2(self.project_costs))
    }

    fn per_record(&self, amount: Money) -> Money {
        if self.count > 0 {
            amount / self.count as f64
        } else {
            0.0
        }
    }
}

fn summarize(clients: &[ClientRecord]) -> FinancialSummary {
    let mut all = Totals::default();
    let mut paid = Totals::default();
    let mut outstanding = 0.0;

    for c in clients {
        all.add(c);
        if c.invoice_status.is_paid() {
            paid.add(c);
        } else if c.invoice_status == InvoiceStatus::Unpaid {
            outstanding += c.cost;
        }
    }

    let payment_rate = if all.count > 0 {
        paid.count as f64 / all.count as f64 * 100.0
    } else {
        0.0
    };

    FinancialSummary {
        total_revenue:          round2(all.revenue),
        total_project_costs:    round2(all.project_costs),
        total_profit:           all.rounded_profit(),
        overall_profit_margin:  round2(ratio_pct(all.profit(), all.revenue)),
        paid_revenue:           round2(paid.revenue),
        paid_project_costs:     round2(paid.project_costs),
        paid_profit:            paid.rounded_profit(),
        paid_profit_margin:     round2(ratio_pct(paid.profit(), paid.revenue)),
        outstanding_revenue:    round2(outstanding),
        total_projects:         all.count,
        paid_projects:          paid.count,
        unpaid_projects:        all.count - paid.count,
        payment_rate:           round2(payment_rate),
        avg_project_value:      round2(all.per_record(all.revenue)),
        avg_profit_per_project: round2(all.per_record(all.profit())),
    }
}

// ── Lifetime value ───────────────────────────────────────────────────────────

/// Unrounded per-name accumulator.
struct ClientGroup<'a> {
    name:          &'a str,
    revenue:       Money,
    profit:        Money,
    projects:      usize,
    first_project: NaiveDateTime,
    last_project:  NaiveDateTime,
}

impl ClientGroup<'_> {
    fn likelihood(&self) -> RenewalLikelihood {
        RenewalLikelihood::from_project_count(self.projects)
    }

    fn to_profile(&self) -> ClientValueProfile {
        let avg_project_value = if self.projects > 0 {
            self.revenue / self.projects as f64
        } else {
            0.0
        };
        ClientValueProfile {
            client_name:        self.name.to_string(),
            total_revenue:      round2(self.revenue),
            total_projects:     self.projects,
            avg_project_value:  round2(avg_project_value),
            total_profit:       round2(self.profit),
            avg_profit_margin:  round2(ratio_pct(self.profit, self.revenue)),
            first_project:      self.first_project,
            last_project:       self.last_project,
            renewal_likelihood: self.likelihood(),
        }
    }
}

/// Groups in first-seen order.
fn group_by_client(clients: &[ClientRecord]) -> Vec<ClientGroup<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<ClientGroup<'_>> = Vec::new();

    for c in clients {
        let name = c.client_name.as_str();
        match index.get(name) {
            Some(&i) => {
                let g = &mut groups[i];
                g.revenue += c.cost;
                g.profit += c.profit();
                g.projects += 1;
                g.first_project = g.first_project.min(c.created_at);
                g.last_project = g.last_project.max(c.created_at);
            }
            None => {
                index.insert(name, groups.len());
                groups.push(ClientGroup {
                    name,
                    revenue: c.cost,
                    profit: c.profit(),
                    projects: 1,
                    first_project: c.created_at,
                    last_project: c.created_at,
                });
            }
        }
    }
    groups
}

/// Descending revenue; ties keep first-seen order.
fn top_clients(groups: &[ClientGroup<'_>]) -> Vec<ClientValueProfile> {
    let mut ranked: Vec<&ClientGroup<'_>> = groups.iter().collect();
    ranked.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    ranked
        .into_iter()
        .take(TOP_CLIENT_LIMIT)
        .map(|g| g.to_profile())
        .collect()
}

// ── Expiry and forecast ──────────────────────────────────────────────────────

fn outlook(clients: &[ClientRecord], groups: &[ClientGroup<'_>], today: NaiveDate) -> RenewalOutlook {
    let likelihood: HashMap<&str, RenewalLikelihood> =
        groups.iter().map(|g| (g.name, g.likelihood())).collect();

    let mut alerts = Vec::new();
    let mut high_priority_renewals = Vec::new();

    for c in clients {
        let Some(days) = c.days_to_expiry(today) else { continue };
        if !(0..=EXPIRY_WINDOW_DAYS).contains(&days) {
            continue;
        }
        alerts.push(ExpiryAlert {
            client_id:          c.id,
            client_name:        c.client_name.clone(),
            days_to_expiry:     days,
            revenue_at_risk:    c.cost,
            profit_at_risk:     round2(c.profit()),
            renewal_likelihood: likelihood
                .get(c.client_name.as_str())
                .copied()
                .unwrap_or(RenewalLikelihood::Unknown),
        });
        if days <= HIGH_PRIORITY_DAYS {
            high_priority_renewals.push(c.client_name.clone());
        }
    }

    // The forecast looks at every alert, not only the ten reported.
    let revenue_forecast = forecast(&alerts, today);

    alerts.sort_by_key(|a| a.days_to_expiry);
    alerts.truncate(EXPIRY_ALERT_LIMIT);

    RenewalOutlook {
        expiring_soon: alerts,
        high_priority_renewals,
        revenue_forecast,
    }
}

fn forecast(alerts: &[ExpiryAlert], today: NaiveDate) -> Vec<ForecastMonth> {
    (0..FORECAST_MONTHS)
        .map(|i| {
            let bucket = today + Days::new(FORECAST_STEP_DAYS * i);
            let mut expected_renewals = 0.0;
            let mut expected_revenue = 0.0;

            for alert in alerts {
                // days_to_expiry is within 0..=EXPIRY_WINDOW_DAYS here.
                let expires = today + Days::new(alert.days_to_expiry.unsigned_abs());
                if expires.month() == bucket.month() && expires.year() == bucket.year() {
                    let m = alert.renewal_likelihood.renewal_multiplier();
                    expected_renewals += m;
                    expected_revenue += alert.revenue_at_risk * m;
                }
            }

            ForecastMonth {
                month: bucket.format("%B %Y").to_string(),
                expected_renewals: round1(expected_renewals),
                expected_revenue: round2(expected_revenue),
                confidence: if expected_renewals > 0.0 {
                    ForecastConfidence::Medium
                } else {
                    ForecastConfidence::Low
                },
            }
        })
        .collect()
}
