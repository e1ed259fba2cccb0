//! Implements the `Remote` trait with in-memory data.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the
//! whole app, top-to-bottom, without a ledger server. It is also what the controller tests run
//! against: calls are recorded, and failures can be scheduled for a given kind of call.

use crate::api::{FetchQuery, MonthBody, MonthResponse, Remote, TransactionsList};
use crate::error::TransportError;
use crate::model::{NewTransaction, Period, Transaction, TransactionId, TransactionType};
use crate::queue::IntentKind;
use crate::Result;
use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tracing::trace;
use uuid::Uuid;

/// The query key that selects which summary the month data metadata carries.
const METADATA_KEY: &str = "metadata";
const MONTH_STATUS: &str = "monthStatus";
const DEBIT_DISTRIBUTION: &str = "debitDistribution";

/// A call that was made against a `MemoryRemote`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RemoteCall {
    GetMonthData(Option<Period>),
    PostTransaction(String),
    UpdateTransaction(TransactionId),
    DeleteTransaction(TransactionId),
}

impl RemoteCall {
    pub fn kind(&self) -> IntentKind {
        match self {
            RemoteCall::GetMonthData(_) => IntentKind::Fetch,
            RemoteCall::PostTransaction(_) => IntentKind::Create,
            RemoteCall::UpdateTransaction(_) => IntentKind::Update,
            RemoteCall::DeleteTransaction(_) => IntentKind::Delete,
        }
    }
}

/// A failure scheduled for the next call of some kind.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Injected {
    Transport,
    Fault,
}

/// The data held by a `MemoryRemote`.
#[derive(Debug)]
pub struct MemoryState {
    transactions: Vec<Transaction>,
    today: NaiveDate,
    calls: Vec<RemoteCall>,
    injected: VecDeque<(IntentKind, Injected)>,
}

impl MemoryState {
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn calls(&self) -> &[RemoteCall] {
        &self.calls
    }

    /// Removes the first failure scheduled for `kind`, if any.
    fn take_injected(&mut self, kind: IntentKind) -> Option<Injected> {
        let ix = self.injected.iter().position(|(k, _)| *k == kind)?;
        self.injected.remove(ix).map(|(_, injected)| injected)
    }

    fn position(&self, id: &TransactionId) -> std::result::Result<usize, TransportError> {
        self.transactions
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| TransportError::Status {
                code: 404,
                body: format!("Transaction {id} not found"),
            })
    }
}

/// An implementation of the `Remote` trait that does not use a server. Clones share the same
/// state, so a test can keep a handle to inspect calls and schedule failures.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryState>>,
    gate: Option<Arc<Semaphore>>,
}

impl MemoryRemote {
    /// Creates an empty `MemoryRemote` whose current period is the one containing `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                transactions: Vec::new(),
                today,
                calls: Vec::new(),
                injected: VecDeque::new(),
            })),
            gate: None,
        }
    }

    /// Creates a `MemoryRemote` holding the seed transactions from this module, dated within the
    /// month of `today`.
    pub fn seeded(today: NaiveDate) -> Result<Self> {
        let remote = Self::new(today);
        for t in seed_transactions(Period::of(today))? {
            remote.insert(t);
        }
        Ok(remote)
    }

    /// Stores `transaction` and returns it with its newly assigned id.
    pub fn insert(&self, transaction: NewTransaction) -> Transaction {
        let stored = transaction.with_id(TransactionId::new(Uuid::new_v4().simple().to_string()));
        self.lock().transactions.push(stored.clone());
        stored
    }

    /// Makes the next call of `kind` fail with a `TransportError`.
    pub fn fail_next(&self, kind: IntentKind) {
        self.lock().injected.push_back((kind, Injected::Transport));
    }

    /// Makes the next call of `kind` fail with an error that is *not* a transport error.
    pub fn fault_next(&self, kind: IntentKind) {
        self.lock().injected.push_back((kind, Injected::Fault));
    }

    /// Returns a copy of this remote whose calls each wait for a permit from the returned
    /// semaphore after being recorded. The semaphore starts without permits.
    pub fn gated(&self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let remote = Self {
            state: self.state.clone(),
            gate: Some(gate.clone()),
        };
        (remote, gate)
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    pub fn today(&self) -> NaiveDate {
        self.lock().today
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock can only come from a failing test; keep going with the
        // data as it was.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records `call`, waits at the gate if there is one, then reports any failure scheduled for
    /// this kind of call.
    async fn begin(&self, call: RemoteCall) -> Result<()> {
        trace!("MemoryRemote {call:?}");
        let kind = call.kind();
        self.lock().calls.push(call);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .context("The gate for the memory remote was closed")?
                .forget();
        }
        match self.lock().take_injected(kind) {
            None => Ok(()),
            Some(Injected::Transport) => Err(TransportError::Injected(kind.to_string()))
                .with_context(|| format!("Failed to {kind}")),
            Some(Injected::Fault) => Err(anyhow!("Injected fault during {kind}")),
        }
    }
}

impl Default for MemoryRemote {
    /// An empty remote whose current period is today's.
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

#[async_trait::async_trait]
impl Remote for MemoryRemote {
    async fn get_month_data(
        &mut self,
        query: &FetchQuery,
        period: Option<Period>,
    ) -> Result<MonthResponse> {
        self.begin(RemoteCall::GetMonthData(period)).await?;
        let state = self.lock();
        let period = period.unwrap_or_else(|| Period::of(state.today));
        let mut data: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| period.contains(t.details().date()))
            .cloned()
            .collect();
        if data.is_empty() {
            return Ok(MonthResponse::NoContent);
        }
        data.sort_by(|a, b| b.details().date().cmp(&a.details().date()));
        let metadata = metadata(query.get(METADATA_KEY).map(String::as_str), &data);
        Ok(MonthResponse::Data(MonthBody {
            metadata,
            transactions_list: TransactionsList { data },
        }))
    }

    async fn post_transaction(&mut self, transaction: &NewTransaction) -> Result<()> {
        self.begin(RemoteCall::PostTransaction(
            transaction.description().to_string(),
        ))
        .await?;
        self.insert(transaction.clone());
        Ok(())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        self.begin(RemoteCall::UpdateTransaction(transaction.id().clone()))
            .await?;
        let mut state = self.lock();
        let ix = state
            .position(transaction.id())
            .context("Failed to update")?;
        state.transactions[ix] = transaction.clone();
        Ok(())
    }

    async fn delete_transaction(&mut self, id: &TransactionId) -> Result<()> {
        self.begin(RemoteCall::DeleteTransaction(id.clone())).await?;
        let mut state = self.lock();
        let ix = state.position(id).context("Failed to delete")?;
        state.transactions.remove(ix);
        Ok(())
    }
}

/// Builds the summary that the ledger server attaches to month data.
fn metadata(kind: Option<&str>, data: &[Transaction]) -> Value {
    match kind {
        Some(MONTH_STATUS) => {
            let total = |tt: TransactionType| -> u64 {
                data.iter()
                    .filter(|t| t.details().transaction_type() == tt)
                    .map(|t| t.details().total_payment())
                    .sum()
            };
            let income = total(TransactionType::Credit);
            let expense = total(TransactionType::Debit);
            json!({
                "income": income,
                "expense": expense,
                "balance": income as i64 - expense as i64,
            })
        }
        Some(DEBIT_DISTRIBUTION) => {
            let mut distribution: BTreeMap<&str, u64> = BTreeMap::new();
            for t in data
                .iter()
                .filter(|t| t.details().transaction_type() == TransactionType::Debit)
            {
                *distribution.entry(t.details().category()).or_default() +=
                    t.details().total_payment();
            }
            json!(distribution)
        }
        _ => Value::Object(Map::new()),
    }
}

/// One row of the seed data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SeedRow {
    day: u32,
    #[serde(rename = "Type")]
    transaction_type: TransactionType,
    description: String,
    #[serde(rename = "Total Payment")]
    total_payment: u64,
    #[serde(rename = "Payment Method")]
    payment_method: String,
    category: String,
}

/// Parses the seed data, placing each row on its day within `period`.
fn seed_transactions(period: Period) -> Result<Vec<NewTransaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(SEED_DATA.as_bytes()));
    let mut transactions = Vec::new();
    for result in rdr.deserialize() {
        let row: SeedRow = result.context("Invalid seed row")?;
        let date = NaiveDate::from_ymd_opt(period.year(), period.month(), row.day)
            .with_context(|| format!("Invalid seed day {} for {period}", row.day))?;
        transactions.push(NewTransaction::new(
            row.transaction_type,
            row.description,
            row.total_payment,
            date,
            row.payment_method,
            row.category,
        )?);
    }
    Ok(transactions)
}

/// Seed transaction data. Days are kept below 29 so that every month can hold them.
const SEED_DATA: &str = r##"Day,Type,Description,Total Payment,Payment Method,Category
1,credit,Salary,5200,Transfer,Income
1,debit,Rent,1450,Transfer,Housing
3,debit,Whole Foods Market,87,Credit Card,Groceries
4,debit,Starbucks,7,Credit Card,Coffee Shops
6,debit,Shell Gas Station,52,Credit Card,Gas & Fuel
9,debit,PG&E Electric,143,Checking,Utilities
12,debit,Trader Joe's,63,Credit Card,Groceries
15,credit,Freelance Project,800,Transfer,Income
18,debit,Comcast Internet,90,Checking,Utilities
21,debit,Olive Garden,42,Credit Card,Restaurants
24,debit,Costco Wholesale,119,Debit Card,Groceries
27,debit,City Water District,46,Checking,Utilities
"##;

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 20).unwrap()
    }

    fn query(kind: &str) -> FetchQuery {
        let mut q = FetchQuery::new();
        q.insert(METADATA_KEY.to_string(), kind.to_string());
        q
    }

    #[tokio::test]
    async fn test_seeded_current_month() {
        let mut remote = MemoryRemote::seeded(today()).unwrap();
        let response = remote
            .get_month_data(&query(MONTH_STATUS), None)
            .await
            .unwrap();
        let MonthResponse::Data(body) = response else {
            panic!("expected data for the seeded month");
        };
        assert_eq!(body.transactions_list.data.len(), 12);
        assert_eq!(body.metadata["income"], 6000);
        assert_eq!(body.metadata["expense"], 2099);
        assert_eq!(body.metadata["balance"], 3901);
        // Newest first
        assert_eq!(
            body.transactions_list.data[0].details().date(),
            NaiveDate::from_ymd_opt(2024, 2, 27).unwrap()
        );
    }

    #[tokio::test]
    async fn test_debit_distribution() {
        let mut remote = MemoryRemote::seeded(today()).unwrap();
        let MonthResponse::Data(body) = remote
            .get_month_data(&query(DEBIT_DISTRIBUTION), None)
            .await
            .unwrap()
        else {
            panic!("expected data for the seeded month");
        };
        assert_eq!(body.metadata["Groceries"], 87 + 63 + 119);
        assert!(body.metadata.get("Income").is_none());
    }

    #[tokio::test]
    async fn test_empty_period_is_no_content() {
        let mut remote = MemoryRemote::seeded(today()).unwrap();
        let response = remote
            .get_month_data(&FetchQuery::new(), Some(Period::new(3, 2024).unwrap()))
            .await
            .unwrap();
        assert_eq!(response, MonthResponse::NoContent);
    }

    #[tokio::test]
    async fn test_mutations_and_calls() {
        let mut remote = MemoryRemote::new(today());
        let handle = remote.clone();
        let new = NewTransaction::new(
            TransactionType::Debit,
            "Books",
            30,
            today(),
            "Cash",
            "Education",
        )
        .unwrap();
        remote.post_transaction(&new).await.unwrap();
        let stored = handle.transactions().pop().unwrap();
        assert_eq!(stored.details(), &new);

        remote.delete_transaction(stored.id()).await.unwrap();
        assert!(handle.transactions().is_empty());

        let e = remote.delete_transaction(stored.id()).await.unwrap_err();
        assert!(crate::error::transport_error(&e).is_some());

        assert_eq!(
            handle.calls(),
            vec![
                RemoteCall::PostTransaction("Books".to_string()),
                RemoteCall::DeleteTransaction(stored.id().clone()),
                RemoteCall::DeleteTransaction(stored.id().clone()),
            ]
        );
    }

    #[tokio::test]
    async fn test_injected_failures_apply_once() {
        let mut remote = MemoryRemote::new(today());
        remote.fail_next(IntentKind::Fetch);
        remote.fault_next(IntentKind::Fetch);

        let e = remote
            .get_month_data(&FetchQuery::new(), None)
            .await
            .unwrap_err();
        assert!(crate::error::transport_error(&e).is_some());

        let e = remote
            .get_month_data(&FetchQuery::new(), None)
            .await
            .unwrap_err();
        assert!(crate::error::transport_error(&e).is_none());

        let ok = remote.get_month_data(&FetchQuery::new(), None).await;
        assert_eq!(ok.unwrap(), MonthResponse::NoContent);
    }
}
