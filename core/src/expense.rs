//! Business expenses and their roll-up.

use crate::{
    client::{check_amount, parse_date, round2},
    error::{DeskError, DeskResult},
    types::{ExpenseId, Money},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Categories offered by the expense form. Free text is still accepted.
pub const EXPENSE_CATEGORIES: [&str; 11] = [
    "Office Supplies",
    "Software & Tools",
    "Marketing",
    "Travel",
    "Equipment",
    "Professional Services",
    "Training",
    "Utilities",
    "Internet & Phone",
    "Insurance",
    "Other",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id:                ExpenseId,
    pub expense_name:      String,
    pub amount:            Money,
    pub expense_date:      NaiveDate,
    pub category:          String,
    pub description:       Option<String>,
    pub is_tax_deductible: bool,
    pub created_at:        NaiveDateTime,
}

impl ExpenseRecord {
    pub fn validate(&self) -> DeskResult<()> {
        let label = format!("expense {}", self.id);
        if self.expense_name.trim().is_empty() {
            return Err(DeskError::validation(label, "expense_name", "must not be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(DeskError::validation(label, "category", "must not be empty"));
        }
        check_amount(&label, "amount", self.amount)
    }
}

/// Expense as submitted; the date is still text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseInput {
    pub expense_name:      String,
    pub amount:            Money,
    pub expense_date:      String,
    pub category:          String,
    #[serde(default)]
    pub description:       Option<String>,
    #[serde(default = "default_true")]
    pub is_tax_deductible: bool,
}

fn default_true() -> bool {
    true
}

impl ExpenseInput {
    pub fn into_record(self, id: ExpenseId, created_at: NaiveDateTime) -> DeskResult<ExpenseRecord> {
        let label = format!("expense {id}");
        let record = ExpenseRecord {
            id,
            expense_date: parse_date(&label, "expense_date", &self.expense_date)?,
            expense_name: self.expense_name,
            amount: self.amount,
            category: self.category,
            description: self.description.filter(|d| !d.trim().is_empty()),
            is_tax_deductible: self.is_tax_deductible,
            created_at,
        };
        record.validate()?;
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total:    Money,
    pub count:    usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    pub total:                Money,
    pub tax_deductible_total: Money,
    pub count:                usize,
    /// Largest category first; equal totals by name.
    pub by_category:          Vec<CategoryTotal>,
}

pub fn summarize_expenses(expenses: &[ExpenseRecord]) -> DeskResult<ExpenseSummary> {
    expenses.iter().try_for_each(ExpenseRecord::validate)?;

    let mut total = 0.0;
    let mut deductible = 0.0;
    let mut categories: HashMap<&str, (Money, usize)> = HashMap::new();

    for e in expenses {
        total += e.amount;
        if e.is_tax_deductible {
            deductible += e.amount;
        }
        let entry = categories.entry(e.category.as_str()).or_insert((0.0, 0));
        entry.0 += e.amount;
        entry.1 += 1;
    }

    let mut by_category: Vec<CategoryTotal> = categories
        .into_iter()
        .map(|(category, (sum, count))| CategoryTotal {
            category: category.to_string(),
            total: round2(sum),
            count,
        })
        .collect();
    by_category.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });

    Ok(ExpenseSummary {
        total: round2(total),
        tax_deductible_total: round2(deductible),
        count: expenses.len(),
        by_category,
    })
}
