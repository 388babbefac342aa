use crate::commands::Out;
use crate::model::{EntryChanges, LedgerEntry};
use crate::{settlement, Config, Result};

/// Changes the description, amount, flow, category, account class or due date of an entry.
pub async fn edit(config: &Config, id: &str, changes: EntryChanges) -> Result<Out<LedgerEntry>> {
    let entry = settlement::edit_entry(config.db(), id, changes).await?;
    let message = format!("Updated '{}'", entry.description());
    Ok(Out::new(message, entry))
}
