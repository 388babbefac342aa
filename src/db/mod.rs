//! This module is responsible for reading, writing and managing the SQLite database.

mod migrations;
mod store;

pub use store::{LedgerStore, Mutation};

use crate::model::{
    AccountClass, Amount, EntryFilter, EntryUpdate, Flow, GroupKey, LedgerEntry,
    SettlementStatus,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace};

/// Dates are stored as ISO-8601 text.
const DATE_FORMAT: &str = "%Y-%m-%d";

macro_rules! entry_columns {
    () => {
        "id, description, amount, flow, category, status, due_date, bank, payment_method, \
         installment_index, installment_count, account_class, group_id"
    };
}

const SELECT_BY_ID: &str = concat!("SELECT ", entry_columns!(), " FROM entries WHERE id = ?");

const SELECT_INSTALLMENTS_BY_BANK: &str = concat!(
    "SELECT ",
    entry_columns!(),
    " FROM entries WHERE installment_count > 1 AND bank = ?"
);

const INSERT: &str = concat!(
    "INSERT INTO entries (",
    entry_columns!(),
    ") VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
);

const UPDATE: &str = "UPDATE entries SET description = ?, amount = ?, flow = ?, category = ?, \
    status = ?, due_date = ?, bank = ?, payment_method = ?, account_class = ? WHERE id = ?";

/// A handle to the SQLite database. Cloning is cheap and shares the underlying pool.
#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at '{}'", path.display());
        }
        let pool = connect(path, true).await?;
        let migrated = async {
            migrations::bootstrap(&pool).await?;
            migrations::run(&pool, 0, migrations::CURRENT_VERSION).await
        }
        .await;
        if let Err(e) = migrated {
            pool.close().await;
            return Err(e);
        }
        debug!("Created database at {}", path.display());
        Ok(Self { pool })
    }

    /// Closes every connection in the pool.
    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Updates the database schema with migrations if it is out-of-date
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing '{}'", path.display());
        }
        let pool = connect(path, false).await?;
        migrations::bootstrap(&pool).await?;
        let version = migrations::current_version(&pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "The database schema is at version {version} but this program only understands \
                up to version {}",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open SQLite database at {}", path.display()))
}

/// The shape of a row in the `entries` table.
#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: String,
    description: String,
    amount: String,
    flow: String,
    category: String,
    status: String,
    due_date: String,
    bank: String,
    payment_method: String,
    installment_index: i64,
    installment_count: i64,
    account_class: String,
    group_id: Option<String>,
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = anyhow::Error;

    fn try_from(row: EntryRow) -> Result<Self> {
        let id = row.id;
        let bad = |column: &str| format!("Invalid {column} stored for entry '{id}'");
        Ok(LedgerEntry {
            // Stored amounts are plain decimals, so skip the input separator rules.
            amount: Decimal::from_str(&row.amount)
                .map(Amount::from)
                .with_context(|| bad("amount"))?,
            flow: Flow::from_str(&row.flow).with_context(|| bad("flow"))?,
            status: SettlementStatus::from_str(&row.status).with_context(|| bad("status"))?,
            due_date: NaiveDate::parse_from_str(&row.due_date, DATE_FORMAT)
                .with_context(|| bad("due_date"))?,
            installment_index: u32::try_from(row.installment_index)
                .with_context(|| bad("installment_index"))?,
            installment_count: u32::try_from(row.installment_count)
                .with_context(|| bad("installment_count"))?,
            account_class: AccountClass::from_str(&row.account_class)
                .with_context(|| bad("account_class"))?,
            description: row.description,
            category: row.category,
            bank: row.bank,
            payment_method: row.payment_method,
            group_id: row.group_id,
            id,
        })
    }
}

async fn fetch_entry(conn: &mut SqliteConnection, id: &str) -> Result<Option<LedgerEntry>> {
    let row: Option<EntryRow> = sqlx::query_as(SELECT_BY_ID)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("Failed to load entry '{id}'"))?;
    row.map(LedgerEntry::try_from).transpose()
}

async fn insert_row(conn: &mut SqliteConnection, entry: &LedgerEntry) -> Result<()> {
    trace!("Inserting entry {}", entry.id);
    sqlx::query(INSERT)
        .bind(&entry.id)
        .bind(&entry.description)
        .bind(entry.amount.to_string())
        .bind(entry.flow.to_string())
        .bind(&entry.category)
        .bind(entry.status.to_string())
        .bind(entry.due_date.format(DATE_FORMAT).to_string())
        .bind(&entry.bank)
        .bind(&entry.payment_method)
        .bind(i64::from(entry.installment_index))
        .bind(i64::from(entry.installment_count))
        .bind(entry.account_class.to_string())
        .bind(entry.group_id.as_deref())
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to insert entry '{}'", entry.id))?;
    Ok(())
}

async fn delete_row(conn: &mut SqliteConnection, id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM entries WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to delete entry '{id}'"))?;
    Ok(result.rows_affected())
}

#[async_trait]
impl LedgerStore for Db {
    async fn find(&self, id: &str) -> Result<Option<LedgerEntry>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire a database connection")?;
        fetch_entry(&mut conn, id).await
    }

    async fn update(&self, id: &str, update: &EntryUpdate) -> Result<Option<LedgerEntry>> {
        let mut tx = self.pool.begin().await.context("Failed to begin update")?;
        let Some(mut entry) = fetch_entry(&mut tx, id).await? else {
            return Ok(None);
        };
        update.apply(&mut entry);

        sqlx::query(UPDATE)
            .bind(&entry.description)
            .bind(entry.amount.to_string())
            .bind(entry.flow.to_string())
            .bind(&entry.category)
            .bind(entry.status.to_string())
            .bind(entry.due_date.format(DATE_FORMAT).to_string())
            .bind(&entry.bank)
            .bind(&entry.payment_method)
            .bind(entry.account_class.to_string())
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to update entry '{id}'"))?;

        tx.commit().await.context("Failed to commit update")?;
        Ok(Some(entry))
    }

    async fn insert(&self, entry: &LedgerEntry) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire a database connection")?;
        insert_row(&mut conn, entry).await
    }

    async fn delete(&self, id: &str) -> Result<u64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire a database connection")?;
        delete_row(&mut conn, id).await
    }

    async fn delete_where(&self, key: &GroupKey) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin delete")?;
        let rows: Vec<EntryRow> = sqlx::query_as(SELECT_INSTALLMENTS_BY_BANK)
            .bind(&key.bank)
            .fetch_all(&mut *tx)
            .await
            .context("Failed to scan installments")?;

        let mut removed = 0;
        for row in rows {
            let entry = LedgerEntry::try_from(row)?;
            if key.matches(&entry) {
                removed += delete_row(&mut tx, &entry.id).await?;
            }
        }
        tx.commit().await.context("Failed to commit delete")?;
        Ok(removed)
    }

    async fn delete_group(&self, group_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM entries WHERE group_id = ?")
            .bind(group_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete installment group '{group_id}'"))?;
        Ok(result.rows_affected())
    }

    async fn insert_many(&self, entries: &[LedgerEntry]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin insert")?;
        for entry in entries {
            insert_row(&mut tx, entry).await?;
        }
        tx.commit().await.context("Failed to commit insert")?;
        Ok(entries.len() as u64)
    }

    async fn transaction(&self, mutations: Vec<Mutation>) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        // Returning early drops `tx`, which rolls everything back.
        for mutation in mutations {
            match mutation {
                Mutation::Delete(id) => {
                    if delete_row(&mut tx, &id).await? == 0 {
                        bail!(
                            "Entry '{id}' was removed by someone else before it could be replaced"
                        );
                    }
                }
                Mutation::InsertMany(entries) => {
                    for entry in &entries {
                        insert_row(&mut tx, entry).await?;
                    }
                }
            }
        }

        tx.commit().await.context("Failed to commit transaction")
    }

    async fn list(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(concat!("SELECT ", entry_columns!(), " FROM entries WHERE 1 = 1"));

        if let Some(from) = filter.from {
            qb.push(" AND due_date >= ")
                .push_bind(from.format(DATE_FORMAT).to_string());
        }
        if let Some(to) = filter.to {
            qb.push(" AND due_date <= ")
                .push_bind(to.format(DATE_FORMAT).to_string());
        }
        if let Some(flow) = filter.flow {
            qb.push(" AND flow = ").push_bind(flow.to_string());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(group_id) = &filter.group_id {
            qb.push(" AND group_id = ").push_bind(group_id.clone());
        }
        if filter.primary_only {
            qb.push(" AND (installment_index = 1 OR installment_count <= 1)");
        }
        qb.push(" ORDER BY due_date, installment_index, description, id");

        let rows: Vec<EntryRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list entries")?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = LedgerEntry::try_from(row)?;
            if filter.matches_search(&entry) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
