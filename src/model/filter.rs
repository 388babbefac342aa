use crate::model::{Flow, LedgerEntry, SettlementStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Criteria for listing entries. Every field is optional and unset fields match everything.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EntryFilter {
    /// Case-insensitive substring of the description.
    #[serde(default)]
    pub search: Option<String>,
    /// Earliest due date, inclusive.
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Latest due date, inclusive.
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub flow: Option<Flow>,
    #[serde(default)]
    pub status: Option<SettlementStatus>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    /// Only return non-split entries and the first installment of each group.
    #[serde(default)]
    pub primary_only: bool,
}

impl EntryFilter {
    /// The text search criterion. The store applies the structured criteria in SQL and uses this
    /// for the rest, since SQLite's `LOWER` only folds ASCII.
    pub(crate) fn matches_search(&self, entry: &LedgerEntry) -> bool {
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => entry
                .description
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}
