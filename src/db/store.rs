//! The storage contract that the settlement engine is written against.

use crate::model::{EntryFilter, EntryUpdate, GroupKey, LedgerEntry};
use anyhow::Result;
use async_trait::async_trait;

/// A write that can be grouped with others in `LedgerStore::transaction`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Mutation {
    /// Delete the entry with this id. Inside a transaction a delete that matches no row aborts
    /// the whole transaction.
    Delete(String),
    /// Insert all of these entries.
    InsertMany(Vec<LedgerEntry>),
}

/// Create, read, update and delete access to ledger entries.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns the entry with `id`, or `None` if there is no such entry.
    async fn find(&self, id: &str) -> Result<Option<LedgerEntry>>;

    /// Applies `update` to the entry with `id` and returns the updated entry, or `None` if there
    /// is no such entry.
    async fn update(&self, id: &str, update: &EntryUpdate) -> Result<Option<LedgerEntry>>;

    async fn insert(&self, entry: &LedgerEntry) -> Result<()>;

    /// Deletes the entry with `id` and returns the number of rows removed. Deleting a missing
    /// entry is not an error.
    async fn delete(&self, id: &str) -> Result<u64>;

    /// Deletes every installment matching `key` and returns the number of rows removed.
    async fn delete_where(&self, key: &GroupKey) -> Result<u64>;

    /// Deletes every entry carrying `group_id` and returns the number of rows removed.
    async fn delete_group(&self, group_id: &str) -> Result<u64>;

    async fn insert_many(&self, entries: &[LedgerEntry]) -> Result<u64>;

    /// Applies all `mutations` atomically: either all of them take effect or none does.
    async fn transaction(&self, mutations: Vec<Mutation>) -> Result<()>;

    /// Returns the entries matching `filter`, ordered by due date and installment index.
    async fn list(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>>;
}
