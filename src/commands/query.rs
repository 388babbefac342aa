//! Read-only commands: listing, dashboard totals, the daily digest and report export.

use crate::commands::{plural, Out};
use crate::model::{EntryFilter, LedgerEntry};
use crate::report::{self, Digest, ReportTotals, Summary};
use crate::{Config, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Lists entries matching `filter`. The message is a table with one line per entry.
pub async fn list(config: &Config, filter: EntryFilter) -> Result<Out<Vec<LedgerEntry>>> {
    let entries = report::list_entries(config.db(), &filter).await?;
    let mut message = format!("Found {}", plural(entries.len() as u64, "entry", "entries"));
    for e in &entries {
        message.push_str(&format!(
            "\n{}  {:<8} {:<8} {:>16}  {}  [{}]",
            e.due_date().format("%d/%m/%Y"),
            e.flow(),
            e.status(),
            e.amount().brl(),
            e.description(),
            e.id()
        ));
    }
    Ok(Out::new(message, entries))
}

pub async fn summary(config: &Config, filter: EntryFilter) -> Result<Out<Summary>> {
    let summary = report::summary(config.db(), &filter).await?;
    let message = format!(
        "Paid in: {}, paid out: {}, balance: {}, pending: {} ({})",
        summary.paid_inflow.brl(),
        summary.paid_outflow.brl(),
        summary.balance.brl(),
        summary.pending_total.brl(),
        plural(summary.count as u64, "entry", "entries")
    );
    Ok(Out::new(message, summary))
}

/// Builds the daily digest as of `as_of`.
pub async fn digest(config: &Config, as_of: NaiveDate) -> Result<Out<Digest>> {
    let digest = report::digest(config.db(), as_of).await?;
    Ok(Out::new(digest.render(), digest))
}

/// Exports the entries matching `filter` to `output`, or to a dated file in the reports
/// directory when `output` is `None`.
pub async fn report(
    config: &Config,
    filter: EntryFilter,
    output: Option<PathBuf>,
) -> Result<Out<ReportTotals>> {
    let path = output.unwrap_or_else(|| {
        config.reports_dir().join(format!(
            "report_{}.csv",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ))
    });
    let totals = report::export_csv(config.db(), &filter, &path).await?;
    let message = format!(
        "Wrote {} to {} (in: {}, out: {}, balance: {})",
        plural(totals.rows as u64, "row", "rows"),
        path.display(),
        totals.inflow.brl(),
        totals.outflow.brl(),
        totals.balance.brl()
    );
    Ok(Out::new(message, totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_list_and_summary() {
        let env = TestEnv::new().await;
        let config = env.config();
        let due = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        env.insert_pending("a", "Frete", "150", due).await;
        env.insert_pending("b", "Pedágio", "40", due).await;

        let out = list(&config, EntryFilter::default()).await.unwrap();
        assert!(out.message().starts_with("Found 2 entries"));
        assert_eq!(out.structure().map(Vec::len), Some(2));

        let out = summary(&config, EntryFilter::default()).await.unwrap();
        let summary = out.structure().unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.pending_total.brl(), "R$ 190,00");
    }

    #[tokio::test]
    async fn test_report_default_path() {
        let env = TestEnv::new().await;
        let config = env.config();
        let out = report(&config, EntryFilter::default(), None).await.unwrap();
        assert_eq!(out.structure().map(|t| t.rows), Some(0));
        let files = std::fs::read_dir(config.reports_dir()).unwrap().count();
        assert_eq!(files, 1);
    }
}
