//! Pure installment arithmetic: how many installments, when each one is due and what each row
//! looks like. Nothing here touches the store.

use crate::model::{installment_description, LedgerEntry, SettlementStatus};
use crate::settlement::SettleInstruction;
use crate::utils;
use anyhow::{Context, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// The installment count exactly as a caller supplied it. Forms send strings, scripts send
/// numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawInstallments {
    Whole(i64),
    Fractional(f64),
    Text(String),
}

impl RawInstallments {
    /// The number of installments to create. Anything that does not read as a whole number of at
    /// least one means a single payment.
    pub fn count(&self) -> u32 {
        let n = match self {
            RawInstallments::Whole(n) => *n,
            RawInstallments::Fractional(f) if f.is_finite() => f.trunc() as i64,
            RawInstallments::Fractional(_) => return 1,
            RawInstallments::Text(s) => return parse_installments(s),
        };
        clamp_count(n)
    }
}

impl From<u32> for RawInstallments {
    fn from(value: u32) -> Self {
        RawInstallments::Whole(i64::from(value))
    }
}

/// Reads the leading integer of `s` (after optional whitespace and sign), the way web forms
/// submit it: `"3"`, `" 12x"` and `"2.5"` give 3, 12 and 2. Empty, non-numeric, zero or negative
/// input gives 1.
pub fn parse_installments(s: &str) -> u32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if negative || end == 0 {
        return 1;
    }
    // Saturates on absurdly long digit runs.
    let n = digits[..end].parse::<u64>().unwrap_or(u64::MAX);
    clamp_count(i64::try_from(n).unwrap_or(i64::MAX))
}

fn clamp_count(n: i64) -> u32 {
    if n < 1 {
        1
    } else {
        u32::try_from(n).unwrap_or(u32::MAX)
    }
}

/// Adds `months` calendar months to `date`, keeping the day of the month. When that day does not
/// exist in the target month the surplus days spill into the following month, so Jan 31 plus one
/// month is Mar 3 (Mar 2 in a leap year). Returns `None` past the end of `NaiveDate`'s range.
pub fn add_months_overflowing(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let month0 = i64::from(date.month0()) + i64::from(months);
    let year = i64::from(date.year()) + month0.div_euclid(12);
    let month = u32::try_from(month0.rem_euclid(12)).ok()? + 1;
    let first = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, 1)?;
    first.checked_add_days(Days::new(u64::from(date.day0())))
}

/// Builds the `instruction.installments` rows that replace `entry`. Every row shares `group_id`,
/// the first is paid on the payment date and the rest follow at monthly intervals, pending.
///
/// The per-installment amount is the plain quotient of the entry amount, with no rounding and
/// no remainder carried to any row.
pub(crate) fn plan_installments(
    entry: &LedgerEntry,
    instruction: &SettleInstruction,
    group_id: &str,
) -> Result<Vec<LedgerEntry>> {
    let count = instruction.installments;
    let per = entry
        .amount
        .split(count)
        .with_context(|| format!("Unable to divide {} into {count} installments", entry.amount))?;

    (0..count)
        .map(|k| {
            let due_date = add_months_overflowing(instruction.payment_date, k).with_context(|| {
                format!(
                    "Installment {} of {count} falls outside the supported date range",
                    k + 1
                )
            })?;
            Ok(LedgerEntry {
                id: utils::generate_id(),
                description: installment_description(&entry.description, k + 1, count),
                amount: per,
                flow: entry.flow,
                category: entry.category.clone(),
                status: if k == 0 {
                    SettlementStatus::Paid
                } else {
                    SettlementStatus::Pending
                },
                due_date,
                bank: instruction.bank.clone(),
                payment_method: instruction.payment_method.clone(),
                installment_index: k + 1,
                installment_count: count,
                account_class: entry.account_class,
                group_id: Some(group_id.to_string()),
            })
        })
        .collect()
}
