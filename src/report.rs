//! Read-only views over the ledger: filtered listings, dashboard totals, the daily digest and CSV
//! export.

use crate::db::LedgerStore;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Amount, EntryFilter, Flow, LedgerEntry, SettlementStatus};
use crate::{utils, Result};
use anyhow::Context;
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Dates in reports are written the way users read them, `dd/mm/yyyy`.
const REPORT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Returns the entries matching `filter`, ordered by due date and installment index.
pub async fn list_entries<S>(store: &S, filter: &EntryFilter) -> Result<Vec<LedgerEntry>>
where
    S: LedgerStore + ?Sized,
{
    store.list(filter).await.pub_result(ErrorType::Database)
}

/// Dashboard totals.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Summary {
    pub paid_inflow: Amount,
    pub paid_outflow: Amount,
    /// `paid_inflow - paid_outflow`
    pub balance: Amount,
    pub pending_total: Amount,
    pub count: usize,
}

impl Summary {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let mut summary = Summary::default();
        for entry in entries {
            summary.count += 1;
            match (entry.status, entry.flow) {
                (SettlementStatus::Paid, Flow::Inflow) => {
                    summary.paid_inflow = summary.paid_inflow + entry.amount
                }
                (SettlementStatus::Paid, Flow::Outflow) => {
                    summary.paid_outflow = summary.paid_outflow + entry.amount
                }
                (SettlementStatus::Pending, _) => {
                    summary.pending_total = summary.pending_total + entry.amount
                }
                (SettlementStatus::Open, _) => {}
            }
        }
        summary.balance = summary.paid_inflow - summary.paid_outflow;
        summary
    }
}

pub async fn summary<S>(store: &S, filter: &EntryFilter) -> Result<Summary>
where
    S: LedgerStore + ?Sized,
{
    let entries = list_entries(store, filter).await?;
    Ok(Summary::from_entries(&entries))
}

/// The daily report: overall paid and pending totals plus the pending items that are due.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Digest {
    pub as_of: NaiveDate,
    pub total_paid: Amount,
    pub total_pending: Amount,
    /// Pending entries due on or before `as_of`, oldest first.
    pub due: Vec<DigestItem>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DigestItem {
    pub id: String,
    pub due_date: NaiveDate,
    pub description: String,
    pub amount: Amount,
}

impl Digest {
    pub fn from_entries<'a>(
        as_of: NaiveDate,
        entries: impl IntoIterator<Item = &'a LedgerEntry>,
    ) -> Self {
        let mut digest = Digest {
            as_of,
            total_paid: Amount::ZERO,
            total_pending: Amount::ZERO,
            due: Vec::new(),
        };
        for entry in entries {
            match entry.status {
                SettlementStatus::Paid => digest.total_paid = digest.total_paid + entry.amount,
                SettlementStatus::Pending => {
                    digest.total_pending = digest.total_pending + entry.amount;
                    if entry.due_date <= as_of {
                        digest.due.push(DigestItem {
                            id: entry.id.clone(),
                            due_date: entry.due_date,
                            description: entry.description.clone(),
                            amount: entry.amount,
                        });
                    }
                }
                SettlementStatus::Open => {}
            }
        }
        digest.due.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        digest
    }

    /// A plain-text rendering suitable for a terminal or a message body.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Daily report for {}\nPaid: {}\nPending: {}\n",
            self.as_of.format(REPORT_DATE_FORMAT),
            self.total_paid.brl(),
            self.total_pending.brl()
        );
        if self.due.is_empty() {
            out.push_str("Nothing pending is due.\n");
        }
        for item in &self.due {
            out.push_str(&format!(
                "  {}  {}  {}\n",
                item.due_date.format(REPORT_DATE_FORMAT),
                item.description,
                item.amount.brl()
            ));
        }
        out
    }
}

pub async fn digest<S>(store: &S, as_of: NaiveDate) -> Result<Digest>
where
    S: LedgerStore + ?Sized,
{
    let entries = list_entries(store, &EntryFilter::default()).await?;
    let digest = Digest::from_entries(as_of, &entries);
    debug!("{} pending item(s) due by {as_of}", digest.due.len());
    Ok(digest)
}

/// Totals for the period covered by an exported report. Unlike `Summary` these count every
/// entry regardless of status.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportTotals {
    pub rows: usize,
    pub inflow: Amount,
    pub outflow: Amount,
    pub balance: Amount,
}

#[derive(Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Flow")]
    flow: Flow,
    #[serde(rename = "Status")]
    status: SettlementStatus,
    #[serde(rename = "Amount")]
    amount: String,
}

/// Writes `entries` as CSV to `w` and returns their totals.
pub fn write_csv<'a, W: Write>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
    w: W,
) -> anyhow::Result<ReportTotals> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(w);
    let mut totals = ReportTotals::default();
    for entry in entries {
        writer
            .serialize(ReportRow {
                date: entry.due_date.format(REPORT_DATE_FORMAT).to_string(),
                description: &entry.description,
                category: &entry.category,
                flow: entry.flow,
                status: entry.status,
                amount: entry.amount.value().round_dp(2).to_string(),
            })
            .with_context(|| format!("Unable to write report row for entry '{}'", entry.id))?;
        totals.rows += 1;
        match entry.flow {
            Flow::Inflow => totals.inflow = totals.inflow + entry.amount,
            Flow::Outflow => totals.outflow = totals.outflow + entry.amount,
        }
    }
    writer.flush().context("Unable to flush report")?;
    totals.balance = totals.inflow - totals.outflow;
    Ok(totals)
}

/// Renders the entries matching `filter` as a CSV document.
pub async fn render_csv<S>(store: &S, filter: &EntryFilter) -> Result<(String, ReportTotals)>
where
    S: LedgerStore + ?Sized,
{
    let entries = list_entries(store, filter).await?;
    let mut buf = Vec::new();
    let totals = write_csv(&entries, &mut buf).pub_result(ErrorType::Internal)?;
    let csv = String::from_utf8(buf)
        .context("Report is not valid UTF-8")
        .pub_result(ErrorType::Internal)?;
    Ok((csv, totals))
}

/// Writes the entries matching `filter` to a CSV file at `path`.
pub async fn export_csv<S>(store: &S, filter: &EntryFilter, path: &Path) -> Result<ReportTotals>
where
    S: LedgerStore + ?Sized,
{
    let (csv, totals) = render_csv(store, filter).await?;
    utils::write(path, csv).await.pub_result(ErrorType::Io)?;
    info!("Wrote {} row(s) to {}", totals.rows, path.display());
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::tests::sample_entry;
    use crate::test::TestEnv;
    use std::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(
        id: &str,
        flow: Flow,
        status: SettlementStatus,
        value: &str,
        due: NaiveDate,
    ) -> LedgerEntry {
        let mut e = sample_entry(id);
        e.flow = flow;
        e.status = status;
        e.amount = amount(value);
        e.due_date = due;
        e
    }

    fn fixture() -> Vec<LedgerEntry> {
        vec![
            entry("a", Flow::Inflow, SettlementStatus::Paid, "5000", date(2026, 3, 1)),
            entry("b", Flow::Outflow, SettlementStatus::Pending, "200", date(2026, 3, 2)),
            entry("c", Flow::Outflow, SettlementStatus::Pending, "150", date(2026, 3, 20)),
            entry("d", Flow::Outflow, SettlementStatus::Paid, "1000.50", date(2026, 2, 1)),
            entry("e", Flow::Inflow, SettlementStatus::Open, "99", date(2026, 2, 1)),
        ]
    }

    #[test]
    fn test_summary_totals() {
        let summary = Summary::from_entries(&fixture());
        assert_eq!(summary.paid_inflow, amount("5000"));
        assert_eq!(summary.paid_outflow, amount("1000.50"));
        assert_eq!(summary.balance, amount("3999.50"));
        assert_eq!(summary.pending_total, amount("350"));
        assert_eq!(summary.count, 5);
    }

    #[test]
    fn test_digest_lists_due_pending_items() {
        let digest = Digest::from_entries(date(2026, 3, 10), &fixture());
        assert_eq!(digest.total_paid, amount("6000.50"));
        assert_eq!(digest.total_pending, amount("350"));
        assert_eq!(digest.due.len(), 1);
        assert_eq!(digest.due[0].id, "b");
        assert!(digest.render().contains("R$ 6.000,50"));
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        let totals = write_csv(&fixture()[..2], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Description,Category,Flow,Status,Amount")
        );
        assert_eq!(
            lines.next(),
            Some("01/03/2026,Caminhão,FINANCIAMENTO,INFLOW,PAID,5000")
        );
        assert_eq!(
            lines.next(),
            Some("02/03/2026,Caminhão,FINANCIAMENTO,OUTFLOW,PENDING,200")
        );
        assert_eq!(totals.rows, 2);
        assert_eq!(totals.balance, amount("4800"));
    }

    #[tokio::test]
    async fn test_export_csv_to_file() {
        let env = TestEnv::new().await;
        let config = env.config();
        env.insert_pending("x", "Pneus", "800", date(2026, 5, 5))
            .await;
        env.insert_pending("y", "Óleo", "120", date(2026, 7, 5))
            .await;

        let path = config.reports_dir().join("may.csv");
        let filter = EntryFilter {
            to: Some(date(2026, 5, 31)),
            ..Default::default()
        };
        let totals = export_csv(config.db(), &filter, &path).await.unwrap();
        assert_eq!(totals.rows, 1);
        assert_eq!(totals.outflow, amount("800"));

        let written = utils::read(&path).await.unwrap();
        assert!(written.contains("Pneus"));
        assert!(!written.contains("Óleo"));
    }
}
