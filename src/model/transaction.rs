use crate::Result;
use anyhow::bail;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Whether money left the account (`Debit`) or came into it (`Credit`).
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Debit,
    Credit,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

/// The server-assigned identifier of a transaction. Opaque to this program.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A transaction that has not been stored by the server yet, i.e. one without an id. This is the
/// payload for creating a transaction and also the body of every stored `Transaction`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawNewTransaction")]
pub struct NewTransaction {
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    description: String,
    total_payment: u64,
    date: NaiveDate,
    payment_method: String,
    category: String,
}

impl NewTransaction {
    /// Creates a validated `NewTransaction`.
    ///
    /// # Errors
    /// - The description is empty or only whitespace.
    /// - `total_payment` is zero.
    pub fn new(
        transaction_type: TransactionType,
        description: impl Into<String>,
        total_payment: u64,
        date: NaiveDate,
        payment_method: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Self> {
        let t = Self {
            transaction_type,
            description: description.into(),
            total_payment,
            date,
            payment_method: payment_method.into(),
            category: category.into(),
        };
        t.validate()?;
        Ok(t)
    }

    /// Checks the same rules as `new`. Useful after a transaction has been edited field by field.
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            bail!("A transaction description must contain at least one character");
        }
        if self.total_payment < 1 {
            bail!("A transaction total payment must be a positive integer");
        }
        Ok(())
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn total_payment(&self) -> u64 {
        self.total_payment
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Attaches a server-assigned id.
    pub fn with_id(self, id: TransactionId) -> Transaction {
        Transaction { id, details: self }
    }
}

/// Unvalidated wire form of a `NewTransaction`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNewTransaction {
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    description: String,
    total_payment: u64,
    date: NaiveDate,
    payment_method: String,
    category: String,
}

impl TryFrom<RawNewTransaction> for NewTransaction {
    type Error = anyhow::Error;

    fn try_from(raw: RawNewTransaction) -> Result<Self> {
        Self::new(
            raw.transaction_type,
            raw.description,
            raw.total_payment,
            raw.date,
            raw.payment_method,
            raw.category,
        )
    }
}

/// A transaction as stored by the server.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    id: TransactionId,
    #[serde(flatten)]
    details: NewTransaction,
}

impl Transaction {
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn details(&self) -> &NewTransaction {
        &self.details
    }

    /// Applies `edit` to a copy of this transaction's fields, keeping the id, and validates the
    /// result.
    pub fn edited(&self, edit: TransactionEdit) -> Result<Transaction> {
        let mut details = self.details.clone();
        if let Some(v) = edit.transaction_type {
            details.transaction_type = v;
        }
        if let Some(v) = edit.description {
            details.description = v;
        }
        if let Some(v) = edit.total_payment {
            details.total_payment = v;
        }
        if let Some(v) = edit.date {
            details.date = v;
        }
        if let Some(v) = edit.payment_method {
            details.payment_method = v;
        }
        if let Some(v) = edit.category {
            details.category = v;
        }
        details.validate()?;
        Ok(details.with_id(self.id.clone()))
    }
}

/// A set of optional field changes for an existing transaction.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct TransactionEdit {
    pub transaction_type: Option<TransactionType>,
    pub description: Option<String>,
    pub total_payment: Option<u64>,
    pub date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub category: Option<String>,
}
