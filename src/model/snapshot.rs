use crate::model::Transaction;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The locally held copy of one period's transactions together with the server's summary of
/// them. A `Snapshot` is only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    transactions_list: Vec<Transaction>,
    /// Server-supplied summary, e.g. month totals or a per-category distribution. Not interpreted
    /// by this program.
    metadata: Value,
}

impl Snapshot {
    pub fn new(transactions_list: Vec<Transaction>, metadata: Value) -> Self {
        Self {
            transactions_list,
            metadata,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions_list
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn find(&self, id: &crate::model::TransactionId) -> Option<&Transaction> {
        self.transactions_list.iter().find(|t| t.id() == id)
    }
}

impl Default for Snapshot {
    /// No transactions and an empty metadata object.
    fn default() -> Self {
        Self::new(Vec::new(), Value::Object(Default::default()))
    }
}
