//! These structs provide the CLI interface for the pillar CLI.

use crate::model::{
    AccountClass, Amount, EntryChanges, EntryFilter, Flow, NewEntry, SettlementStatus,
};
use crate::settlement::{RawInstallments, SettleRequest};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// pillar: a small business ledger.
///
/// Record income and expenses as pending commitments, settle them in full or finance them in
/// monthly installments, and look at totals and reports. Everything is stored in a SQLite
/// database in the pillar home directory.
///
/// Run `pillar init` once, then use the other subcommands or `pillar serve` for the HTTP API.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the pillar home directory, its configuration file and an empty database.
    Init,
    /// Record a new pending commitment.
    Create(CreateArgs),
    /// Settle an entry, in full or in monthly installments.
    Settle(SettleArgs),
    /// Put a settled entry back to pending.
    Reverse(IdArgs),
    /// Delete an entry. Deleting an installment deletes its whole group.
    Delete(IdArgs),
    /// Change the description, amount, flow, category, account class or due date of an entry.
    Edit(EditArgs),
    /// List entries.
    List(FilterArgs),
    /// Show paid and pending totals.
    Summary(FilterArgs),
    /// Show the daily report: totals and the pending items that are due.
    Digest(DigestArgs),
    /// Export entries to a CSV file.
    Report(ReportArgs),
    /// Show the suggested categories, banks and payment methods.
    Suggestions,
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where pillar data and configuration is held. Defaults to ~/pillar
    #[arg(long, env = "PILLAR_HOME", default_value_t = default_pillar_home())]
    pillar_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, pillar_home: PathBuf) -> Self {
        Self {
            log_level,
            pillar_home: pillar_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn pillar_home(&self) -> &DisplayPath {
        &self.pillar_home
    }
}

/// Args for `pillar create`.
#[derive(Debug, Parser, Clone)]
pub struct CreateArgs {
    #[arg(long)]
    description: String,

    /// e.g. 1200.00, 1.200,00 or "R$ 1.200,00"
    #[arg(long)]
    amount: Amount,

    /// The due date, YYYY-MM-DD.
    #[arg(long)]
    due_date: NaiveDate,

    /// INFLOW or OUTFLOW (ENTRADA / SAIDA also work).
    #[arg(long, default_value_t = Flow::Outflow)]
    flow: Flow,

    #[arg(long)]
    category: Option<String>,

    /// LEGAL_ENTITY or INDIVIDUAL (PJ / PF also work).
    #[arg(long, default_value_t = AccountClass::LegalEntity)]
    account_class: AccountClass,
}

impl CreateArgs {
    pub fn new_entry(&self) -> NewEntry {
        NewEntry {
            description: Some(self.description.clone()),
            amount: Some(self.amount),
            flow: self.flow,
            category: self.category.clone(),
            due_date: Some(self.due_date),
            account_class: self.account_class,
        }
    }
}

/// Args for `pillar settle`.
#[derive(Debug, Parser, Clone)]
pub struct SettleArgs {
    /// The id of the entry to settle.
    id: String,

    /// The payment date, YYYY-MM-DD.
    #[arg(long)]
    payment_date: NaiveDate,

    /// The number of monthly installments. Anything that is not a whole number of at least one
    /// means a single payment.
    #[arg(long)]
    installments: Option<String>,

    /// Defaults to `default_bank` from config.json.
    #[arg(long)]
    bank: Option<String>,

    /// Defaults to `default_payment_method` from config.json.
    #[arg(long)]
    payment_method: Option<String>,
}

impl SettleArgs {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request(&self) -> SettleRequest {
        SettleRequest {
            payment_date: Some(self.payment_date),
            installments: self.installments.clone().map(RawInstallments::Text),
            bank: self.bank.clone(),
            payment_method: self.payment_method.clone(),
        }
    }
}

/// Args for subcommands that take nothing but an entry id.
#[derive(Debug, Parser, Clone)]
pub struct IdArgs {
    id: String,
}

impl IdArgs {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Args for `pillar edit`. Only the given fields change.
#[derive(Debug, Parser, Clone)]
pub struct EditArgs {
    id: String,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    amount: Option<Amount>,

    #[arg(long)]
    flow: Option<Flow>,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    due_date: Option<NaiveDate>,

    #[arg(long)]
    account_class: Option<AccountClass>,
}

impl EditArgs {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn changes(&self) -> EntryChanges {
        EntryChanges {
            description: self.description.clone(),
            amount: self.amount,
            flow: self.flow,
            category: self.category.clone(),
            due_date: self.due_date,
            account_class: self.account_class,
        }
    }
}

/// Criteria shared by `list`, `summary` and `report`.
#[derive(Debug, Parser, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive text to look for in descriptions.
    #[arg(long)]
    search: Option<String>,

    /// Earliest due date, YYYY-MM-DD, inclusive.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest due date, YYYY-MM-DD, inclusive.
    #[arg(long)]
    to: Option<NaiveDate>,

    #[arg(long)]
    flow: Option<Flow>,

    #[arg(long)]
    status: Option<SettlementStatus>,

    #[arg(long)]
    category: Option<String>,

    /// Only the entries of one installment group.
    #[arg(long)]
    group_id: Option<String>,

    /// Hide all but the first installment of each group.
    #[arg(long)]
    primary_only: bool,
}

impl FilterArgs {
    pub fn filter(&self) -> EntryFilter {
        EntryFilter {
            search: self.search.clone(),
            from: self.from,
            to: self.to,
            flow: self.flow,
            status: self.status,
            category: self.category.clone(),
            group_id: self.group_id.clone(),
            primary_only: self.primary_only,
        }
    }
}

/// Args for `pillar digest`.
#[derive(Debug, Parser, Clone)]
pub struct DigestArgs {
    /// Report on pending items due on or before this date. Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

impl DigestArgs {
    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }
}

/// Args for `pillar report`.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    #[clap(flatten)]
    filter: FilterArgs,

    /// Where to write the CSV. Defaults to a timestamped file in the reports directory.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl ReportArgs {
    pub fn filter(&self) -> EntryFilter {
        self.filter.filter()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// Args for `pillar serve`.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The address to listen on. Defaults to `bind_address` from config.json.
    #[arg(long)]
    bind: Option<String>,
}

impl ServeArgs {
    pub fn bind(&self) -> Option<&str> {
        self.bind.as_deref()
    }
}

fn default_pillar_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("pillar"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --pillar-home or PILLAR_HOME instead of relying on the default \
                pillar home directory.",
            );
            PathBuf::from("pillar")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["pillar", "--pillar-home", "/tmp/pillar-test"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_create_with_portuguese_labels() {
        let args = parse(&[
            "create",
            "--description",
            "Frete",
            "--amount",
            "1.200,50",
            "--due-date",
            "2026-03-01",
            "--flow",
            "ENTRADA",
            "--account-class",
            "PF",
        ]);
        let Command::Create(create) = args.command() else {
            panic!("expected create");
        };
        let entry = create.new_entry();
        assert_eq!(entry.flow, Flow::Inflow);
        assert_eq!(entry.account_class, AccountClass::Individual);
        assert_eq!(entry.amount, Some(Amount::from_str("1200.50").unwrap()));
        assert_eq!(args.common().pillar_home().path(), Path::new("/tmp/pillar-test"));
    }

    #[test]
    fn test_parse_settle() {
        let args = parse(&[
            "settle",
            "abc",
            "--payment-date",
            "2026-01-31",
            "--installments",
            "12",
            "--bank",
            "ITAU",
        ]);
        let Command::Settle(settle) = args.command() else {
            panic!("expected settle");
        };
        assert_eq!(settle.id(), "abc");
        let request = settle.request();
        assert_eq!(request.installments.map(|i| i.count()), Some(12));
        assert!(request.payment_method.is_none());
    }

    #[test]
    fn test_parse_list_filter() {
        let args = parse(&["list", "--status", "PAGO", "--primary-only"]);
        let Command::List(list) = args.command() else {
            panic!("expected list");
        };
        let filter = list.filter();
        assert_eq!(filter.status, Some(SettlementStatus::Paid));
        assert!(filter.primary_only);
    }

    #[test]
    fn test_parse_suggestions() {
        let args = parse(&["suggestions"]);
        assert!(matches!(args.command(), Command::Suggestions));
    }

    #[test]
    fn test_log_level_default() {
        let args = parse(&["init"]);
        assert_eq!(args.common().log_level(), LevelFilter::INFO);
    }
}
