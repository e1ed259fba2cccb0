//! The status of the locally held collection and the pure function that advances it.

use crate::model::Snapshot;
use serde::Serialize;

/// What the presentation layer sees: the last good data plus loading and error indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStatus {
    data: Snapshot,
    is_loading: bool,
    is_error: bool,
}

/// The events that move a `CollectionStatus` from one state to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A network operation started.
    Init,
    /// A fetch completed with a new snapshot.
    Success(Snapshot),
    /// A network operation failed at the transport layer.
    Failure,
}

impl CollectionStatus {
    /// The status before any network operation has run: `data` is `fallback`, nothing is loading
    /// and there is no error.
    pub fn new(fallback: Snapshot) -> Self {
        Self {
            data: fallback,
            is_loading: false,
            is_error: false,
        }
    }

    pub fn data(&self) -> &Snapshot {
        &self.data
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

/// Computes the status that follows `status` when `event` happens.
///
/// - `Init` starts loading and clears the error, keeping the data.
/// - `Success` replaces the data wholesale and clears both indicators.
/// - `Failure` stops loading and raises the error, keeping the last good data so that it can
///   still be displayed.
pub fn reduce(status: CollectionStatus, event: Event) -> CollectionStatus {
    match event {
        Event::Init => CollectionStatus {
            is_loading: true,
            is_error: false,
            ..status
        },
        Event::Success(snapshot) => CollectionStatus {
            data: snapshot,
            is_loading: false,
            is_error: false,
        },
        Event::Failure => CollectionStatus {
            is_loading: false,
            is_error: true,
            ..status
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(tag: &str) -> Snapshot {
        Snapshot::new(Vec::new(), json!({ "tag": tag }))
    }

    #[test]
    fn test_init_keeps_data() {
        let start = reduce(CollectionStatus::new(snapshot("a")), Event::Failure);
        let next = reduce(start, Event::Init);
        assert!(next.is_loading());
        assert!(!next.is_error());
        assert_eq!(next.data(), &snapshot("a"));
    }

    #[test]
    fn test_success_replaces_data() {
        let loading = reduce(CollectionStatus::new(snapshot("a")), Event::Init);
        let next = reduce(loading, Event::Success(snapshot("b")));
        assert_eq!(next, {
            let mut expected = CollectionStatus::new(snapshot("b"));
            expected.is_loading = false;
            expected
        });
    }

    #[test]
    fn test_failure_keeps_data() {
        let loading = reduce(CollectionStatus::new(snapshot("a")), Event::Init);
        let next = reduce(loading, Event::Failure);
        assert!(!next.is_loading());
        assert!(next.is_error());
        assert_eq!(next.data(), &snapshot("a"));
    }

    #[test]
    fn test_only_success_changes_data() {
        let events = vec![
            Event::Init,
            Event::Failure,
            Event::Init,
            Event::Init,
            Event::Failure,
        ];
        let mut status = CollectionStatus::new(snapshot("a"));
        for event in events {
            status = reduce(status, event);
            assert_eq!(status.data(), &snapshot("a"));
        }
        status = reduce(status, Event::Success(snapshot("z")));
        assert_eq!(status.data(), &snapshot("z"));
    }

    #[test]
    fn test_status_json() {
        let status = CollectionStatus::new(Snapshot::default());
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "data": {"transactionsList": [], "metadata": {}},
                "isLoading": false,
                "isError": false
            })
        );
    }
}
