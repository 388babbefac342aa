//! The ledger settlement engine.
//!
//! Settling a pending entry either marks it paid in place or, when the payment is financed,
//! replaces it with a group of dated installments whose amounts add up to the settled amount. This
//! module also owns the other lifecycle operations on a single entry: creating a commitment,
//! editing it, reversing a settlement and deleting an entry or a whole installment group.
//!
//! Every operation is written against the `LedgerStore` trait and returns the public `Result`,
//! tagging failures as `NotFound`, `Validation` or `Database`.

mod schedule;

pub use schedule::{add_months_overflowing, parse_installments, RawInstallments};

use crate::db::{LedgerStore, Mutation};
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{
    EntryChanges, EntryUpdate, LedgerEntry, NewEntry, SettlementStatus, UNSET_BANK,
    UNSET_PAYMENT_METHOD,
};
use crate::{utils, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Fifty years of monthly payments. Larger counts are rejected rather than materialized.
pub const MAX_INSTALLMENTS: u32 = 600;

const DEFAULT_CATEGORY: &str = "OUTROS";

/// A settlement instruction as received from a caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettleRequest {
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub installments: Option<RawInstallments>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl SettleRequest {
    /// Validates the request. A missing bank or payment method falls back to the given defaults,
    /// and is an error when there is no default either.
    pub fn into_instruction(
        self,
        default_bank: Option<&str>,
        default_payment_method: Option<&str>,
    ) -> Result<SettleInstruction> {
        let payment_date = self
            .payment_date
            .ok_or_else(|| Error::validation("A payment date is required to settle an entry"))?;
        let bank = non_blank(self.bank)
            .or_else(|| default_bank.map(str::to_string))
            .ok_or_else(|| Error::validation("A bank is required to settle an entry"))?;
        let payment_method = non_blank(self.payment_method)
            .or_else(|| default_payment_method.map(str::to_string))
            .ok_or_else(|| Error::validation("A payment method is required to settle an entry"))?;
        let installments = self.installments.as_ref().map_or(1, RawInstallments::count);
        if installments > MAX_INSTALLMENTS {
            return Err(Error::validation(format!(
                "At most {MAX_INSTALLMENTS} installments are supported, got {installments}"
            )));
        }
        Ok(SettleInstruction {
            payment_date,
            installments,
            bank,
            payment_method,
        })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// A validated settlement instruction.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettleInstruction {
    pub payment_date: NaiveDate,
    /// Always at least 1.
    pub installments: u32,
    pub bank: String,
    pub payment_method: String,
}

/// What `settle` did.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Settlement {
    /// The entry was paid in full and kept its id.
    Paid { entry: LedgerEntry },
    /// The entry was replaced by `count` installments.
    Split {
        count: u32,
        group_id: String,
        entries: Vec<LedgerEntry>,
    },
}

/// What `delete_entry` did.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Deletion {
    pub removed: u64,
    /// True when a whole installment group was removed.
    pub group: bool,
}

/// Logs a persistence failure and tags it as a `Database` error.
fn persisted<T>(result: anyhow::Result<T>, action: &str) -> Result<T> {
    result
        .map_err(|e| {
            error!("Failed to {action}: {e:#}");
            e
        })
        .pub_result(ErrorType::Database)
}

fn not_found(id: &str) -> Error {
    Error::not_found(format!("Entry '{id}' not found"))
}

/// Settles the entry with `id`.
///
/// With a single installment the entry is marked paid in place: same id, new bank and payment
/// method, and the due date moved to the payment date. With `N > 1` installments the entry is
/// deleted and `N` new entries are inserted in one transaction; see `Settlement::Split`.
pub async fn settle<S>(store: &S, id: &str, instruction: &SettleInstruction) -> Result<Settlement>
where
    S: LedgerStore + ?Sized,
{
    let entry = persisted(store.find(id).await, "load entry")?.ok_or_else(|| not_found(id))?;
    if entry.status == SettlementStatus::Paid {
        warn!("Entry '{id}' is already paid, settling it again");
    }

    let count = instruction.installments.max(1);
    if count == 1 {
        let update = EntryUpdate {
            changes: EntryChanges {
                due_date: Some(instruction.payment_date),
                ..Default::default()
            },
            status: Some(SettlementStatus::Paid),
            bank: Some(instruction.bank.clone()),
            payment_method: Some(instruction.payment_method.clone()),
        };
        let entry = persisted(store.update(id, &update).await, "settle entry")?
            .ok_or_else(|| not_found(id))?;
        info!("Settled '{}' in full on {}", entry.description, instruction.payment_date);
        return Ok(Settlement::Paid { entry });
    }

    let group_id = utils::generate_id();
    let instruction = SettleInstruction {
        installments: count,
        ..instruction.clone()
    };
    let entries = schedule::plan_installments(&entry, &instruction, &group_id)
        .pub_result(ErrorType::Validation)?;
    debug!(
        "Replacing entry '{id}' with {count} installments of {}",
        entries[0].amount
    );

    persisted(
        store
            .transaction(vec![
                Mutation::Delete(id.to_string()),
                Mutation::InsertMany(entries.clone()),
            ])
            .await,
        "replace entry with installments",
    )?;
    info!(
        "Financed '{}' in {count} installments, group {group_id}",
        entry.description
    );
    Ok(Settlement::Split {
        count,
        group_id,
        entries,
    })
}

/// Undoes a settlement: the entry goes back to pending and loses its bank and payment method.
/// Reversing an entry that is already pending succeeds and changes nothing else.
pub async fn reverse<S>(store: &S, id: &str) -> Result<LedgerEntry>
where
    S: LedgerStore + ?Sized,
{
    let update = EntryUpdate {
        status: Some(SettlementStatus::Pending),
        bank: Some(UNSET_BANK.to_string()),
        payment_method: Some(UNSET_PAYMENT_METHOD.to_string()),
        ..Default::default()
    };
    let entry =
        persisted(store.update(id, &update).await, "reverse entry")?.ok_or_else(|| not_found(id))?;
    info!("Reversed settlement of '{}'", entry.description);
    Ok(entry)
}

/// Deletes the entry with `id`. If it is an installment, every installment of its group is
/// deleted with it. Deleting an entry that does not exist is not an error.
pub async fn delete_entry<S>(store: &S, id: &str) -> Result<Deletion>
where
    S: LedgerStore + ?Sized,
{
    let Some(entry) = persisted(store.find(id).await, "load entry")? else {
        debug!("Entry '{id}' was already gone");
        return Ok(Deletion {
            removed: 0,
            group: false,
        });
    };

    let deletion = if !entry.is_installment() {
        Deletion {
            removed: persisted(store.delete(id).await, "delete entry")?,
            group: false,
        }
    } else if let Some(group_id) = entry.group_id() {
        Deletion {
            removed: persisted(store.delete_group(group_id).await, "delete installment group")?,
            group: true,
        }
    } else {
        // Rows written before groups had ids are matched by content.
        let key = entry.group_key();
        Deletion {
            removed: persisted(store.delete_where(&key).await, "delete installment group")?,
            group: true,
        }
    };

    info!(
        "Deleted {} row(s) for '{}'",
        deletion.removed,
        entry.description()
    );
    Ok(deletion)
}

/// Records a new pending commitment: a single, unsettled entry.
pub async fn create_commitment<S>(store: &S, data: NewEntry) -> Result<LedgerEntry>
where
    S: LedgerStore + ?Sized,
{
    let description = non_blank(data.description)
        .ok_or_else(|| Error::validation("A description is required"))?;
    let amount = data
        .amount
        .ok_or_else(|| Error::validation("An amount is required"))?;
    let due_date = data
        .due_date
        .ok_or_else(|| Error::validation("A due date is required"))?;

    let entry = LedgerEntry {
        id: utils::generate_id(),
        description,
        amount,
        flow: data.flow,
        category: non_blank(data.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        status: SettlementStatus::Pending,
        due_date,
        bank: UNSET_BANK.to_string(),
        payment_method: UNSET_PAYMENT_METHOD.to_string(),
        installment_index: 1,
        installment_count: 1,
        account_class: data.account_class,
        group_id: None,
    };
    persisted(store.insert(&entry).await, "create entry")?;
    info!("Created commitment '{}' due {}", entry.description, entry.due_date);
    Ok(entry)
}

/// Changes the descriptive fields of an entry. Settlement state and installment position are
/// left alone.
pub async fn edit_entry<S>(store: &S, id: &str, changes: EntryChanges) -> Result<LedgerEntry>
where
    S: LedgerStore + ?Sized,
{
    if changes.is_empty() {
        return Err(Error::validation("Nothing to change"));
    }
    if changes
        .description
        .as_deref()
        .is_some_and(|d| d.trim().is_empty())
    {
        return Err(Error::validation("The description cannot be blank"));
    }
    let update = EntryUpdate::from(changes);
    let entry =
        persisted(store.update(id, &update).await, "edit entry")?.ok_or_else(|| not_found(id))?;
    info!("Edited entry '{}'", entry.description);
    Ok(entry)
}
