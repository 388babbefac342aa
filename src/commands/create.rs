use crate::commands::Out;
use crate::model::{LedgerEntry, NewEntry};
use crate::{settlement, Config, Result};

/// Records a new pending commitment.
pub async fn create(config: &Config, data: NewEntry) -> Result<Out<LedgerEntry>> {
    let entry = settlement::create_commitment(config.db(), data).await?;
    let message = format!(
        "Created '{}' for {} due {}",
        entry.description(),
        entry.amount().brl(),
        entry.due_date()
    );
    Ok(Out::new(message, entry))
}
