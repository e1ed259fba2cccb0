//! Types that represent the data model, such as `Transaction`, `Period` and `Snapshot`.
mod period;
mod snapshot;
mod transaction;

pub use period::Period;
pub use snapshot::Snapshot;
pub use transaction::{NewTransaction, Transaction, TransactionEdit, TransactionId, TransactionType};
