use crate::commands::Out;
use crate::model::{BANK_SUGGESTIONS, CATEGORY_SUGGESTIONS, PAYMENT_METHOD_SUGGESTIONS};
use crate::{Config, Result};
use serde::Serialize;

/// Values offered to users when they pick a category, bank or payment method. None of them is
/// enforced.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Suggestions {
    pub categories: Vec<String>,
    pub banks: Vec<String>,
    pub payment_methods: Vec<String>,
    /// From `config.json`, used by `settle` when no bank is given.
    pub default_bank: Option<String>,
    /// From `config.json`, used by `settle` when no payment method is given.
    pub default_payment_method: Option<String>,
}

pub async fn suggestions(config: &Config) -> Result<Out<Suggestions>> {
    let owned = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
    let suggestions = Suggestions {
        categories: owned(CATEGORY_SUGGESTIONS),
        banks: owned(BANK_SUGGESTIONS),
        payment_methods: owned(PAYMENT_METHOD_SUGGESTIONS),
        default_bank: config.default_bank().map(str::to_string),
        default_payment_method: config.default_payment_method().map(str::to_string),
    };
    let message = format!(
        "Categories: {}\nBanks: {}\nPayment methods: {}",
        suggestions.categories.join(", "),
        suggestions.banks.join(", "),
        suggestions.payment_methods.join(", ")
    );
    Ok(Out::new(message, suggestions))
}
