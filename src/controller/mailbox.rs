//! A capacity-one mailbox for handing intents to a controller that runs on another task.
//!
//! Posting replaces whatever has not been picked up yet, so while the controller is busy with a
//! network call only the latest posted intent survives.

use crate::queue::Intent;
use tokio::sync::watch;
use tracing::debug;

/// Creates a connected `Mailbox` and `Inbox`.
pub fn mailbox() -> (Mailbox, Inbox) {
    let (tx, rx) = watch::channel(None);
    (Mailbox { tx }, Inbox { rx })
}

/// The sending side. Dropping it closes the `Inbox` once any posted intent has been read.
#[derive(Debug)]
pub struct Mailbox {
    tx: watch::Sender<Option<Intent>>,
}

impl Mailbox {
    /// Posts `intent`, replacing any intent that the controller has not picked up yet.
    pub fn post(&self, intent: Intent) {
        debug!("Posting intent '{intent}'");
        self.tx.send_replace(Some(intent));
    }
}

/// The receiving side, read by `SyncController::serve`.
#[derive(Debug)]
pub struct Inbox {
    rx: watch::Receiver<Option<Intent>>,
}

impl Inbox {
    /// Waits for the next posted intent. Returns `None` when the `Mailbox` has been dropped and
    /// nothing is left to read.
    pub async fn next(&mut self) -> Option<Intent> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            if let Some(intent) = self.rx.borrow_and_update().clone() {
                return Some(intent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Period;

    fn fetch(month: u32) -> Intent {
        Intent::Fetch(Some(Period::new(month, 2024).unwrap()))
    }

    #[tokio::test]
    async fn test_latest_post_wins() {
        let (mailbox, mut inbox) = mailbox();
        mailbox.post(fetch(2));
        mailbox.post(fetch(3));
        assert_eq!(inbox.next().await, Some(fetch(3)));
    }

    #[tokio::test]
    async fn test_intent_is_read_once_then_closed() {
        let (mailbox, mut inbox) = mailbox();
        mailbox.post(fetch(2));
        drop(mailbox);
        assert_eq!(inbox.next().await, Some(fetch(2)));
        assert_eq!(inbox.next().await, None);
    }
}
