//! The contract with the ledger server and its implementations.
//!
//! `Remote` is the seam between the sync controller and the network. `HttpRemote` talks to a real
//! server over HTTP, `MemoryRemote` keeps everything in memory so that the whole program can run,
//! top-to-bottom, without one.

mod http;
mod memory;

use crate::model::{NewTransaction, Period, Snapshot, Transaction, TransactionId};
use crate::{Config, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::debug;

pub use http::HttpRemote;
pub use memory::{MemoryRemote, MemoryState, RemoteCall};

/// When this environment variable is set to a non-empty value, the program uses `MemoryRemote`
/// instead of an HTTP server.
pub const TEST_MODE_ENV: &str = "LEDGER_SYNC_IN_TEST_MODE";

/// Opaque query parameters that are forwarded with every month data request, e.g.
/// `metadata=monthStatus`.
pub type FetchQuery = BTreeMap<String, String>;

/// The operations that the ledger server offers for a collection of transactions.
///
/// Errors that originate in the transport layer must carry a `crate::TransportError` so that the
/// controller can recover from them. Any other error is treated as fatal.
#[async_trait::async_trait]
pub trait Remote: Debug + Send {
    /// Gets the transactions and metadata for `period`, or for the current period when `None`.
    async fn get_month_data(
        &mut self,
        query: &FetchQuery,
        period: Option<Period>,
    ) -> Result<MonthResponse>;

    async fn post_transaction(&mut self, transaction: &NewTransaction) -> Result<()>;

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<()>;

    async fn delete_transaction(&mut self, id: &TransactionId) -> Result<()>;
}

/// The answer to a month data request.
#[derive(Debug, Clone, PartialEq)]
pub enum MonthResponse {
    /// The server has no data for the period (HTTP 204).
    NoContent,
    Data(MonthBody),
}

/// The body of a month data response.
///
/// ```json
/// {
///   "metadata": {"income": 5000, "expense": 1200, "balance": 3800},
///   "transactionsList": {"data": [ ... ]}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBody {
    #[serde(default)]
    pub metadata: Value,
    pub transactions_list: TransactionsList,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionsList {
    pub data: Vec<Transaction>,
}

impl From<MonthBody> for Snapshot {
    fn from(body: MonthBody) -> Self {
        Snapshot::new(body.transactions_list.data, body.metadata)
    }
}

/// Selects which `Remote` implementation the program uses.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Http,
    Test,
}

impl Mode {
    /// `Mode::Test` when `LEDGER_SYNC_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Http`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(s) if !s.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Creates the `Remote` for `mode`.
pub fn remote(config: &Config, mode: Mode) -> Result<Box<dyn Remote>> {
    debug!("Creating a remote in {mode:?} mode");
    Ok(match mode {
        Mode::Http => Box::new(HttpRemote::new(config.base_url().clone(), config.timeout())?),
        Mode::Test => Box::new(MemoryRemote::seeded(Local::now().date_naive())?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_body_json() {
        let json = r#"{
            "metadata": {"balance": 10},
            "transactionsList": {"data": []}
        }"#;
        let body: MonthBody = serde_json::from_str(json).unwrap();
        let snapshot = Snapshot::from(body);
        assert!(snapshot.transactions().is_empty());
        assert_eq!(snapshot.metadata()["balance"], 10);
    }

    #[test]
    fn test_month_body_without_metadata() {
        let json = r#"{"transactionsList": {"data": []}}"#;
        let body: MonthBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.metadata, Value::Null);
    }
}
