//! Intents and the single-slot queue that holds the next one to run.

use crate::model::{NewTransaction, Period, Transaction, TransactionId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::debug;

/// A description of one network operation for the controller to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "payload", rename_all = "snake_case")]
pub enum Intent {
    /// Load a period, or the current period when `None`.
    Fetch(Option<Period>),
    Create(NewTransaction),
    Update(Transaction),
    Delete(TransactionId),
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::Fetch(_) => IntentKind::Fetch,
            Intent::Create(_) => IntentKind::Create,
            Intent::Update(_) => IntentKind::Update,
            Intent::Delete(_) => IntentKind::Delete,
        }
    }
}

/// The tag of an `Intent`, without its payload.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Fetch,
    Create,
    Update,
    Delete,
}

impl IntentKind {
    /// True for the intents that change server state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, IntentKind::Fetch)
    }
}

serde_plain::derive_display_from_serialize!(IntentKind);

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Fetch(Some(period)) => write!(f, "fetch {period}"),
            Intent::Fetch(None) => write!(f, "fetch current period"),
            Intent::Create(t) => write!(f, "create '{}'", t.description()),
            Intent::Update(t) => write!(f, "update {}", t.id()),
            Intent::Delete(id) => write!(f, "delete {id}"),
        }
    }
}

/// Holds at most one pending `Intent`. Enqueueing over a pending intent replaces it, and draining
/// empties the queue so that an intent runs at most once.
#[derive(Debug, Default, Clone)]
pub struct RequestQueue {
    pending: Option<Intent>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `intent` the pending intent, discarding any intent that has not been drained yet.
    pub fn enqueue(&mut self, intent: Intent) {
        if let Some(replaced) = self.pending.replace(intent) {
            debug!("Pending intent '{replaced}' was replaced before it ran");
        }
    }

    /// Takes the pending intent, leaving the queue empty.
    pub fn drain(&mut self) -> Option<Intent> {
        self.pending.take()
    }

    pub fn peek(&self) -> Option<&Intent> {
        self.pending.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch(month: u32) -> Intent {
        Intent::Fetch(Some(Period::new(month, 2024).unwrap()))
    }

    #[test]
    fn test_last_write_wins() {
        let mut queue = RequestQueue::new();
        queue.enqueue(fetch(2));
        queue.enqueue(fetch(3));
        assert_eq!(queue.drain(), Some(fetch(3)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_runs_once() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Intent::Delete("t1".into()));
        assert_eq!(queue.peek(), Some(&Intent::Delete("t1".into())));
        assert!(queue.drain().is_some());
        assert!(queue.drain().is_none());
    }

    #[test]
    fn test_intent_json() {
        let intent: Intent = serde_json::from_str(
            r#"{"intent": "fetch", "payload": {"month": 2, "year": 2024}}"#,
        )
        .unwrap();
        assert_eq!(intent, fetch(2));

        let current: Intent = serde_json::from_str(r#"{"intent": "fetch", "payload": null}"#).unwrap();
        assert_eq!(current, Intent::Fetch(None));

        let delete: Intent =
            serde_json::from_str(r#"{"intent": "delete", "payload": "abc"}"#).unwrap();
        assert_eq!(delete, Intent::Delete("abc".into()));
        assert_eq!(delete.kind(), IntentKind::Delete);
        assert!(delete.kind().is_mutation());
    }

    #[test]
    fn test_create_intent_json_is_validated() {
        let line = r#"{"intent": "create", "payload": {"type": "debit", "description": "  ",
            "totalPayment": 0, "date": "2024-02-10", "paymentMethod": "Cash", "category": "Food"}}"#;
        assert!(serde_json::from_str::<Intent>(line).is_err());

        let line = line
            .replace(r#""  ""#, r#""Lunch""#)
            .replace(r#""totalPayment": 0"#, r#""totalPayment": 12"#);
        let intent: Intent = serde_json::from_str(&line).unwrap();
        let Intent::Create(t) = intent else {
            panic!("expected a create intent");
        };
        assert_eq!(t.description(), "Lunch");
        assert_eq!(t.total_payment(), 12);
    }

    #[test]
    fn test_display() {
        assert_eq!(fetch(2).to_string(), "fetch 2024-02");
        assert_eq!(Intent::Fetch(None).to_string(), "fetch current period");
        assert_eq!(IntentKind::Update.to_string(), "update");
    }
}
