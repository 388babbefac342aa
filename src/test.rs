//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::db::LedgerStore;
use crate::model::{
    installment_description, AccountClass, Amount, Flow, LedgerEntry, SettlementStatus,
    UNSET_BANK, UNSET_PAYMENT_METHOD,
};
use crate::Config;
use chrono::NaiveDate;
use std::str::FromStr;
use tempfile::TempDir;

/// Test environment that sets up a pillar home directory with Config and database.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment with Config and initialized database.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::create(temp_dir.path().join("pillar")).await.unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// Inserts a pending, unsettled entry and returns it.
    pub async fn insert_pending(
        &self,
        id: &str,
        description: &str,
        amount: &str,
        due: NaiveDate,
    ) -> LedgerEntry {
        let entry = LedgerEntry {
            id: id.to_string(),
            description: description.to_string(),
            amount: Amount::from_str(amount).unwrap(),
            flow: Flow::Outflow,
            category: "OUTROS".to_string(),
            status: SettlementStatus::Pending,
            due_date: due,
            bank: UNSET_BANK.to_string(),
            payment_method: UNSET_PAYMENT_METHOD.to_string(),
            installment_index: 1,
            installment_count: 1,
            account_class: AccountClass::LegalEntity,
            group_id: None,
        };
        self.config.db().insert(&entry).await.unwrap();
        entry
    }

    /// Inserts a group of `count` installments the way older versions wrote them: suffixed
    /// descriptions, a shared bank and no `group_id`. Ids are `{prefix}-1`..`{prefix}-{count}`.
    pub async fn insert_legacy_group(
        &self,
        prefix: &str,
        description: &str,
        amount: &str,
        bank: &str,
        count: u32,
    ) -> Vec<LedgerEntry> {
        let first = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        let entries: Vec<LedgerEntry> = (1..=count)
            .map(|k| LedgerEntry {
                id: format!("{prefix}-{k}"),
                description: installment_description(description, k, count),
                amount: Amount::from_str(amount).unwrap(),
                flow: Flow::Outflow,
                category: "FINANCIAMENTO".to_string(),
                status: if k == 1 {
                    SettlementStatus::Paid
                } else {
                    SettlementStatus::Pending
                },
                due_date: first + chrono::Months::new(k - 1),
                bank: bank.to_string(),
                payment_method: "BOLETO".to_string(),
                installment_index: k,
                installment_count: count,
                account_class: AccountClass::LegalEntity,
                group_id: None,
            })
            .collect();
        self.config.db().insert_many(&entries).await.unwrap();
        entries
    }
}
