//! These structs provide the CLI interface for the ledger CLI.

use crate::model::{NewTransaction, Period, TransactionEdit, TransactionId, TransactionType};
use crate::Result;
use anyhow::bail;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// ledger: keep a local view of your monthly transactions in sync with a ledger server.
///
/// Every command first loads the current month (or the month you choose) from the server. Changes
/// are sent to the server and then read back, so what is printed is always what the server holds.
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
    /// Create the ledger home directory and its configuration file.
    Init(InitArgs),
    /// Load the transactions of a month and print them.
    Fetch(FetchArgs),
    /// Create a transaction, then print the refreshed month.
    Create(Box<CreateArgs>),
    /// Change fields of an existing transaction, then print the refreshed month.
    Update(Box<UpdateArgs>),
    /// Delete a transaction, then print the refreshed month.
    Delete(DeleteArgs),
    /// Read intents as JSON lines from stdin and print every status change.
    ///
    /// Each line looks like `{"intent": "fetch", "payload": {"month": 2, "year": 2024}}` or
    /// `{"intent": "delete", "payload": "<id>"}`.
    Watch,
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

    /// The directory where the ledger configuration is held. Defaults to ~/ledger
    #[arg(long, env = "LEDGER_HOME", default_value_t = default_ledger_home())]
    ledger_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, ledger_home: PathBuf) -> Self {
        Self {
            log_level,
            ledger_home: ledger_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn ledger_home(&self) -> &DisplayPath {
        &self.ledger_home
    }
}

/// Args for the `ledger init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The root of the ledger server's API, e.g. http://localhost:3000/api
    #[arg(long)]
    base_url: String,

    /// The summary to request along with month data: monthStatus or debitDistribution
    #[arg(long)]
    metadata: Option<String>,
}

impl InitArgs {
    pub fn new(base_url: impl Into<String>, metadata: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            metadata,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }
}

/// Selects a month. When neither option is given the current month is used.
#[derive(Debug, Default, Parser, Clone)]
pub struct PeriodArgs {
    /// The month, 1 to 12
    #[arg(long)]
    month: Option<u32>,

    /// The year. Defaults to the current year when only --month is given
    #[arg(long, requires = "month")]
    year: Option<i32>,
}

impl PeriodArgs {
    pub fn new(month: Option<u32>, year: Option<i32>) -> Self {
        Self { month, year }
    }

    /// The chosen period, or `None` for the current one.
    pub fn period(&self) -> Result<Option<Period>> {
        match (self.month, self.year) {
            (None, None) => Ok(None),
            (Some(month), Some(year)) => Ok(Some(Period::new(month, year)?)),
            (Some(month), None) => Ok(Some(Period::new(month, Period::current().year())?)),
            (None, Some(_)) => bail!("A year was given without a month"),
        }
    }
}

/// Args for the `ledger fetch` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct FetchArgs {
    #[clap(flatten)]
    period: PeriodArgs,
}

impl FetchArgs {
    pub fn new(period: PeriodArgs) -> Self {
        Self { period }
    }

    pub fn period(&self) -> &PeriodArgs {
        &self.period
    }
}

/// Args for the `ledger create` command.
#[derive(Debug, Parser, Clone)]
pub struct CreateArgs {
    /// debit or credit
    #[arg(long = "type")]
    transaction_type: TransactionType,

    #[arg(long)]
    description: String,

    /// The amount, a positive whole number
    #[arg(long)]
    total: u64,

    /// The date as YYYY-MM-DD
    #[arg(long)]
    date: NaiveDate,

    #[arg(long)]
    payment_method: String,

    #[arg(long)]
    category: String,
}

impl CreateArgs {
    pub fn new(
        transaction_type: TransactionType,
        description: impl Into<String>,
        total: u64,
        date: NaiveDate,
        payment_method: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            transaction_type,
            description: description.into(),
            total,
            date,
            payment_method: payment_method.into(),
            category: category.into(),
        }
    }

    /// Validates the arguments into a `NewTransaction`.
    pub fn transaction(&self) -> Result<NewTransaction> {
        NewTransaction::new(
            self.transaction_type,
            &self.description,
            self.total,
            self.date,
            &self.payment_method,
            &self.category,
        )
    }
}

/// Args for the `ledger update` command.
#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    /// The id of the transaction to change
    #[arg(long)]
    id: String,

    /// The month that holds the transaction, if it is not the current one
    #[clap(flatten)]
    period: PeriodArgs,

    /// debit or credit
    #[arg(long = "type")]
    transaction_type: Option<TransactionType>,

    #[arg(long)]
    description: Option<String>,

    /// The amount, a positive whole number
    #[arg(long)]
    total: Option<u64>,

    /// The date as YYYY-MM-DD
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long)]
    payment_method: Option<String>,

    #[arg(long)]
    category: Option<String>,
}

impl UpdateArgs {
    pub fn new(id: impl Into<String>, period: PeriodArgs, edit: TransactionEdit) -> Self {
        Self {
            id: id.into(),
            period,
            transaction_type: edit.transaction_type,
            description: edit.description,
            total: edit.total_payment,
            date: edit.date,
            payment_method: edit.payment_method,
            category: edit.category,
        }
    }

    pub fn id(&self) -> TransactionId {
        TransactionId::new(&self.id)
    }

    pub fn period(&self) -> &PeriodArgs {
        &self.period
    }

    /// The requested changes. Fails when no field was given.
    pub fn edit(&self) -> Result<TransactionEdit> {
        let edit = TransactionEdit {
            transaction_type: self.transaction_type,
            description: self.description.clone(),
            total_payment: self.total,
            date: self.date,
            payment_method: self.payment_method.clone(),
            category: self.category.clone(),
        };
        if edit == TransactionEdit::default() {
            bail!("Nothing to update, pass at least one field to change");
        }
        Ok(edit)
    }
}

/// Args for the `ledger delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the transaction to delete
    #[arg(long)]
    id: String,

    /// The month to show afterwards, if it is not the current one
    #[clap(flatten)]
    period: PeriodArgs,
}

impl DeleteArgs {
    pub fn new(id: impl Into<String>, period: PeriodArgs) -> Self {
        Self {
            id: id.into(),
            period,
        }
    }

    pub fn id(&self) -> TransactionId {
        TransactionId::new(&self.id)
    }

    pub fn period(&self) -> &PeriodArgs {
        &self.period
    }
}

fn default_ledger_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --ledger-home or LEDGER_HOME instead of relying on the default \
                ledger home directory.",
            );
            PathBuf::from("ledger")
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

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
