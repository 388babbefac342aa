use crate::model::Amount;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder stored in `bank` until an entry is settled.
pub const UNSET_BANK: &str = "AWAITING";

/// Placeholder stored in `payment_method` until an entry is settled.
pub const UNSET_PAYMENT_METHOD: &str = "TBD";

/// Categories offered to users. Any other value is accepted as well.
pub const CATEGORY_SUGGESTIONS: &[&str] = &[
    "COMBUSTIVEL",
    "MANUTENCAO",
    "PECAS",
    "SALARIOS",
    "ALIMENTACAO",
    "ALUGUEL",
    "IMPOSTOS",
    "SERVICOS",
    "VENDAS",
    "FINANCIAMENTO",
    "OUTROS",
];

/// Banks offered to users when settling.
pub const BANK_SUGGESTIONS: &[&str] = &["CAIXA", "ITAU", "BRADESCO", "SANTANDER"];

/// Payment methods offered to users when settling.
pub const PAYMENT_METHOD_SUGGESTIONS: &[&str] = &[
    "PIX",
    "BOLETO",
    "TED",
    "CARTAO DEBITO",
    "CREDITO",
    "DINHEIRO",
    "DEBITO EM CONTA",
];

/// Whether money comes in or goes out.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flow {
    #[serde(alias = "ENTRADA")]
    Inflow,
    #[default]
    #[serde(alias = "SAIDA")]
    Outflow,
}

serde_plain::derive_display_from_serialize!(Flow);
serde_plain::derive_fromstr_from_deserialize!(Flow);

/// The settlement state of an entry.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    #[default]
    #[serde(alias = "PENDENTE")]
    Pending,
    #[serde(alias = "PAGO")]
    Paid,
    #[serde(alias = "ABERTO")]
    Open,
}

serde_plain::derive_display_from_serialize!(SettlementStatus);
serde_plain::derive_fromstr_from_deserialize!(SettlementStatus);

/// Classification of the account an entry belongs to. Has no effect on settlement.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountClass {
    #[default]
    #[serde(alias = "PJ")]
    LegalEntity,
    #[serde(alias = "PF")]
    Individual,
}

serde_plain::derive_display_from_serialize!(AccountClass);
serde_plain::derive_fromstr_from_deserialize!(AccountClass);

/// One ledger line: an amount owed or received, with a due date and a settlement status.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LedgerEntry {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) amount: Amount,
    pub(crate) flow: Flow,
    pub(crate) category: String,
    pub(crate) status: SettlementStatus,
    pub(crate) due_date: NaiveDate,
    pub(crate) bank: String,
    pub(crate) payment_method: String,
    pub(crate) installment_index: u32,
    pub(crate) installment_count: u32,
    pub(crate) account_class: AccountClass,
    /// Shared by every installment produced by the same split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) group_id: Option<String>,
}

impl LedgerEntry {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn status(&self) -> SettlementStatus {
        self.status
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn bank(&self) -> &str {
        &self.bank
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn installment_index(&self) -> u32 {
        self.installment_index
    }

    pub fn installment_count(&self) -> u32 {
        self.installment_count
    }

    pub fn account_class(&self) -> AccountClass {
        self.account_class
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// True when this entry is one installment of a split group.
    pub fn is_installment(&self) -> bool {
        self.installment_count > 1
    }

    /// True for non-split entries and for the first installment of a group. Listings show only
    /// these rows and fold the remaining installments under them.
    pub fn is_group_head(&self) -> bool {
        self.installment_index == 1 || self.installment_count <= 1
    }

    /// The key used to find the siblings of a legacy installment that has no `group_id`.
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            base_description: base_description(&self.description).to_string(),
            amount: self.amount,
            bank: self.bank.clone(),
        }
    }
}

/// Identifies an installment group by content rather than by id: entries sharing a base
/// description, a per-installment amount and a bank.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub(crate) base_description: String,
    pub(crate) amount: Amount,
    pub(crate) bank: String,
}

impl GroupKey {
    /// Whether `entry` belongs to the group described by this key.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        entry.is_installment()
            && entry.amount == self.amount
            && entry.bank == self.bank
            && base_description(&entry.description) == self.base_description
    }
}

/// Formats the description of installment `index` of `count`, e.g. `Truck (2/12)`.
pub fn installment_description(base: &str, index: u32, count: u32) -> String {
    format!("{base} ({index}/{count})")
}

/// Strips a trailing ` (k/N)` installment suffix from `description`, if there is one.
pub fn base_description(description: &str) -> &str {
    let Some(inner) = description.strip_suffix(')') else {
        return description;
    };
    let Some(open) = inner.rfind(" (") else {
        return description;
    };
    let Some((k, n)) = inner[open + 2..].split_once('/') else {
        return description;
    };
    let is_number = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if is_number(k) && is_number(n) {
        &description[..open]
    } else {
        description
    }
}

/// The data needed to record a new commitment.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NewEntry {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub flow: Flow,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub account_class: AccountClass,
}

/// Field changes applied by a plain edit. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EntryChanges {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub flow: Option<Flow>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub account_class: Option<AccountClass>,
}

impl EntryChanges {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount.is_none()
            && self.flow.is_none()
            && self.category.is_none()
            && self.due_date.is_none()
            && self.account_class.is_none()
    }
}

/// Field writes issued to the store by the engine. Unlike `EntryChanges` these may touch the
/// settlement fields.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct EntryUpdate {
    pub(crate) changes: EntryChanges,
    pub(crate) status: Option<SettlementStatus>,
    pub(crate) bank: Option<String>,
    pub(crate) payment_method: Option<String>,
}

impl From<EntryChanges> for EntryUpdate {
    fn from(changes: EntryChanges) -> Self {
        Self {
            changes,
            ..Default::default()
        }
    }
}

impl EntryUpdate {
    /// Applies the update to an in-memory entry. Stores that keep entries in memory, or that
    /// re-read a row before writing it back, use this to implement `LedgerStore::update`.
    ///
    /// ```
    /// # use pillar_ledger::model::{EntryChanges, EntryUpdate, LedgerEntry};
    /// let mut entry: LedgerEntry = serde_json::from_value(serde_json::json!({
    ///     "id": "e1",
    ///     "description": "Diesel",
    ///     "amount": "350.00",
    ///     "flow": "OUTFLOW",
    ///     "category": "COMBUSTIVEL",
    ///     "status": "PENDING",
    ///     "due_date": "2026-01-10",
    ///     "bank": "AWAITING",
    ///     "payment_method": "TBD",
    ///     "installment_index": 1,
    ///     "installment_count": 1,
    ///     "account_class": "LEGAL_ENTITY"
    /// }))
    /// .unwrap();
    /// let update = EntryUpdate::from(EntryChanges {
    ///     category: Some("MANUTENCAO".to_string()),
    ///     ..Default::default()
    /// });
    /// update.apply(&mut entry);
    /// assert_eq!(entry.category(), "MANUTENCAO");
    /// assert_eq!(entry.description(), "Diesel");
    /// ```
    pub fn apply(&self, entry: &mut LedgerEntry) {
        let c = &self.changes;
        if let Some(v) = &c.description {
            entry.description = v.clone();
        }
        if let Some(v) = c.amount {
            entry.amount = v;
        }
        if let Some(v) = c.flow {
            entry.flow = v;
        }
        if let Some(v) = &c.category {
            entry.category = v.clone();
        }
        if let Some(v) = c.due_date {
            entry.due_date = v;
        }
        if let Some(v) = c.account_class {
            entry.account_class = v;
        }
        if let Some(v) = self.status {
            entry.status = v;
        }
        if let Some(v) = &self.bank {
            entry.bank = v.clone();
        }
        if let Some(v) = &self.payment_method {
            entry.payment_method = v.clone();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::str::FromStr;

    pub(crate) fn sample_entry(id: &str) -> LedgerEntry {
        LedgerEntry {
            id: id.to_string(),
            description: "Caminhão".to_string(),
            amount: Amount::from_str("1200.00").unwrap(),
            flow: Flow::Outflow,
            category: "FINANCIAMENTO".to_string(),
            status: SettlementStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            bank: UNSET_BANK.to_string(),
            payment_method: UNSET_PAYMENT_METHOD.to_string(),
            installment_index: 1,
            installment_count: 1,
            account_class: AccountClass::LegalEntity,
            group_id: None,
        }
    }

    #[test]
    fn test_base_description_strips_suffix() {
        assert_eq!(base_description("Aluguel (3/12)"), "Aluguel");
        assert_eq!(base_description("Peças (Motor) (1/2)"), "Peças (Motor)");
    }

    #[test]
    fn test_base_description_leaves_other_parens() {
        assert_eq!(base_description("Aluguel"), "Aluguel");
        assert_eq!(base_description("Peças (Motor)"), "Peças (Motor)");
        assert_eq!(base_description("Nota (a/b)"), "Nota (a/b)");
        assert_eq!(base_description("Nota (/2)"), "Nota (/2)");
    }

    #[test]
    fn test_installment_description_round_trips_base() {
        let d = installment_description("Caminhão", 2, 12);
        assert_eq!(d, "Caminhão (2/12)");
        assert_eq!(base_description(&d), "Caminhão");
    }

    #[test]
    fn test_enums_accept_portuguese_labels() {
        assert_eq!(Flow::from_str("ENTRADA").unwrap(), Flow::Inflow);
        assert_eq!(Flow::from_str("OUTFLOW").unwrap(), Flow::Outflow);
        assert_eq!(
            SettlementStatus::from_str("PAGO").unwrap(),
            SettlementStatus::Paid
        );
        assert_eq!(
            AccountClass::from_str("PF").unwrap(),
            AccountClass::Individual
        );
        assert_eq!(SettlementStatus::Paid.to_string(), "PAID");
        assert_eq!(AccountClass::LegalEntity.to_string(), "LEGAL_ENTITY");
    }

    #[test]
    fn test_group_key_matches_only_installments() {
        let mut a = sample_entry("a");
        a.description = "Caminhão (1/3)".to_string();
        a.installment_count = 3;
        a.bank = "ITAU".to_string();
        let key = a.group_key();

        let mut b = a.clone();
        b.description = "Caminhão (2/3)".to_string();
        b.installment_index = 2;
        assert!(key.matches(&b));

        let mut other_bank = b.clone();
        other_bank.bank = "CAIXA".to_string();
        assert!(!key.matches(&other_bank));

        let mut single = b.clone();
        single.installment_count = 1;
        assert!(!key.matches(&single));
    }

    #[test]
    fn test_update_apply() {
        let mut e = sample_entry("a");
        let update = EntryUpdate {
            changes: EntryChanges {
                category: Some("PECAS".to_string()),
                ..Default::default()
            },
            status: Some(SettlementStatus::Paid),
            bank: Some("ITAU".to_string()),
            payment_method: None,
        };
        update.apply(&mut e);
        assert_eq!(e.category, "PECAS");
        assert_eq!(e.status, SettlementStatus::Paid);
        assert_eq!(e.bank, "ITAU");
        assert_eq!(e.payment_method, UNSET_PAYMENT_METHOD);
        assert_eq!(e.description, "Caminhão");
    }

    #[test]
    fn test_changes_is_empty() {
        assert!(EntryChanges::default().is_empty());
        let c = EntryChanges {
            due_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            ..Default::default()
        };
        assert!(!c.is_empty());
    }
}
