use crate::commands::{plural, Out};
use crate::settlement::{self, Deletion};
use crate::{Config, Result};

/// Deletes an entry, or its whole installment group if it is an installment. Deleting an entry
/// that does not exist succeeds and reports zero rows.
pub async fn delete(config: &Config, id: &str) -> Result<Out<Deletion>> {
    let deletion = settlement::delete_entry(config.db(), id).await?;
    let message = match deletion {
        Deletion { removed: 0, .. } => format!("Entry '{id}' was already removed"),
        Deletion { removed, group: true } => format!(
            "Deleted an installment group of {}",
            plural(removed, "entry", "entries")
        ),
        Deletion { removed, .. } => format!("Deleted {}", plural(removed, "entry", "entries")),
    };
    Ok(Out::new(message, deletion))
}
