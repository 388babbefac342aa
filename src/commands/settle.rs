//! Settle and reverse command handlers.

use crate::commands::{plural, Out};
use crate::model::LedgerEntry;
use crate::settlement::{self, SettleRequest, Settlement};
use crate::{Config, Result};

/// Settles an entry. Missing bank and payment method fall back to the configured defaults.
pub async fn settle(config: &Config, id: &str, request: SettleRequest) -> Result<Out<Settlement>> {
    let instruction =
        request.into_instruction(config.default_bank(), config.default_payment_method())?;
    let outcome = settlement::settle(config.db(), id, &instruction).await?;
    let message = match &outcome {
        Settlement::Paid { entry } => format!(
            "Paid '{}' ({}) via {} / {}",
            entry.description(),
            entry.amount().brl(),
            entry.bank(),
            entry.payment_method()
        ),
        Settlement::Split { count, entries, .. } => format!(
            "Financed in {} of {}",
            plural(u64::from(*count), "installment", "installments"),
            entries
                .first()
                .map(|e| e.amount().brl())
                .unwrap_or_default()
        ),
    };
    Ok(Out::new(message, outcome))
}

/// Puts a settled entry back to pending.
pub async fn reverse(config: &Config, id: &str) -> Result<Out<LedgerEntry>> {
    let entry = settlement::reverse(config.db(), id).await?;
    let message = format!("'{}' is pending again", entry.description());
    Ok(Out::new(message, entry))
}
