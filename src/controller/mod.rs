//! The sync controller keeps a local `CollectionStatus` in step with the ledger server.
//!
//! Intents are run one at a time. A fetch replaces the local snapshot; a create, update or delete
//! never touches it directly but invalidates it, which schedules a fetch of the active period
//! before anything else runs. Transport failures are recorded in the status and the last good
//! data is kept; every other error is returned to the caller.

mod freshness;
mod mailbox;

use crate::api::{FetchQuery, MonthResponse, Remote};
use crate::error::{transport_error, TransportError};
use crate::model::{Period, Snapshot};
use crate::queue::{Intent, IntentKind, RequestQueue};
use crate::status::{reduce, CollectionStatus, Event};
use crate::Result;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

pub use freshness::Freshness;
pub use mailbox::{mailbox, Inbox, Mailbox};

/// The fixed inputs of a controller: what to show before anything has been fetched (and when a
/// period has no data), and the query parameters sent with every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    default_snapshot: Snapshot,
    fetch_query: FetchQuery,
}

impl ControllerSettings {
    pub fn new(default_snapshot: Snapshot, fetch_query: FetchQuery) -> Self {
        Self {
            default_snapshot,
            fetch_query,
        }
    }

    pub fn default_snapshot(&self) -> &Snapshot {
        &self.default_snapshot
    }

    pub fn fetch_query(&self) -> &FetchQuery {
        &self.fetch_query
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::new(Snapshot::default(), FetchQuery::new())
    }
}

/// Whether a network call is outstanding.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Running(IntentKind),
}

/// How a completed intent ended.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    Succeeded,
    TransportFailed(TransportError),
}

/// The record of one intent that ran to completion.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Completion {
    kind: IntentKind,
    /// True when the controller scheduled this intent itself to refresh stale data.
    automatic: bool,
    outcome: Outcome,
}

impl Completion {
    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    pub fn is_automatic(&self) -> bool {
        self.automatic
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }
}

/// Returns true if, in `completions`, a mutation succeeded but the refresh that followed it failed.
///
/// The status alone cannot tell this apart from a failed mutation: both end with `is_error` set
/// and the previous data in place.
pub fn refresh_failed_after_mutation(completions: &[Completion]) -> bool {
    completions.windows(2).any(|pair| {
        pair[0].kind.is_mutation()
            && pair[0].succeeded()
            && pair[1].automatic
            && !pair[1].succeeded()
    })
}

/// Runs intents against a `Remote` and maintains the resulting `CollectionStatus`.
///
/// Every operation takes `&mut self`, so at most one remote call is in flight and nothing can be
/// enqueued while it is. To feed intents from another task use `mailbox` and `serve`.
#[derive(Debug)]
pub struct SyncController {
    remote: Box<dyn Remote>,
    settings: ControllerSettings,
    status: CollectionStatus,
    queue: RequestQueue,
    /// The fetch scheduled when a mutation succeeds. It runs before anything in `queue`.
    refetch: Option<Intent>,
    freshness: Freshness,
    active_period: Option<Period>,
    state: ControllerState,
    observer: watch::Sender<CollectionStatus>,
}

impl SyncController {
    /// Creates a controller showing the default snapshot. Nothing has been fetched yet, so the
    /// first run will fetch the current period.
    pub fn new(remote: Box<dyn Remote>, settings: ControllerSettings) -> Self {
        let status = CollectionStatus::new(settings.default_snapshot.clone());
        let (observer, _) = watch::channel(status.clone());
        Self {
            remote,
            settings,
            status,
            queue: RequestQueue::new(),
            refetch: None,
            freshness: Freshness::new(),
            active_period: None,
            state: ControllerState::Idle,
            observer,
        }
    }

    pub fn status(&self) -> &CollectionStatus {
        &self.status
    }

    /// Returns a receiver that sees every status change.
    pub fn subscribe(&self) -> watch::Receiver<CollectionStatus> {
        self.observer.subscribe()
    }

    pub fn is_fresh(&self) -> bool {
        self.freshness.is_fresh()
    }

    /// The period of the most recent fetch, `None` meaning the current period.
    pub fn active_period(&self) -> Option<Period> {
        self.active_period
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The caller's intent that has not run yet.
    pub fn pending(&self) -> Option<&Intent> {
        self.queue.peek()
    }

    /// The fetch that will run before `pending`, if a mutation has just succeeded.
    pub fn scheduled_refetch(&self) -> Option<&Intent> {
        self.refetch.as_ref()
    }

    /// Queues `intent` to run next, replacing any intent that has not run yet.
    pub fn enqueue(&mut self, intent: Intent) {
        debug!("Enqueue '{intent}'");
        self.queue.enqueue(intent);
    }

    /// Runs the next intent, if there is one. The refetch scheduled by a successful mutation
    /// always runs first. The initial fetch of a new controller runs only when the caller has
    /// nothing pending, since a caller fetch takes its place.
    ///
    /// # Errors
    /// Transport failures are recorded in the status and are not errors here. Any other failure
    /// from the remote is returned, leaving the status loading.
    pub async fn step(&mut self) -> Result<Option<Completion>> {
        let (intent, automatic) = if let Some(intent) = self.refetch.take() {
            (intent, true)
        } else if let Some(intent) = self.queue.drain() {
            (intent, false)
        } else if self.freshness.take_refetch() {
            let intent = Intent::Fetch(self.active_period);
            debug!("Nothing has been fetched yet, running '{intent}'");
            (intent, true)
        } else {
            return Ok(None);
        };
        let kind = intent.kind();
        debug!("Running '{intent}'");
        trace!("{intent:?}");

        self.state = ControllerState::Running(kind);
        self.dispatch(Event::Init);
        let outcome = match self.perform(intent).await {
            Ok(()) => Outcome::Succeeded,
            Err(e) => {
                let Some(transport) = transport_error(&e).cloned() else {
                    // No event is dispatched for a fault that is not a transport failure, so the
                    // status keeps the `is_loading` that `Init` set until the next intent runs.
                    self.state = ControllerState::Idle;
                    return Err(e);
                };
                warn!("{kind} failed: {e:#}");
                if kind == IntentKind::Fetch {
                    // The attempt settles any refetch that was due; it is not retried.
                    self.freshness.take_refetch();
                }
                self.dispatch(Event::Failure);
                Outcome::TransportFailed(transport)
            }
        };
        self.state = ControllerState::Idle;
        if kind.is_mutation() && outcome == Outcome::Succeeded {
            self.schedule_refetch();
        }
        Ok(Some(Completion {
            kind,
            automatic,
            outcome,
        }))
    }

    /// Runs intents until nothing is pending and no refetch is due. Returns what ran, in order.
    pub async fn run_until_idle(&mut self) -> Result<Vec<Completion>> {
        let mut completions = Vec::new();
        while let Some(completion) = self.step().await? {
            completions.push(completion);
        }
        Ok(completions)
    }

    /// Runs intents posted to `inbox` until its `Mailbox` is dropped.
    ///
    /// The inbox is only read while idle, after any due refetch, so a posted intent never runs
    /// before the refresh that follows a mutation. Intents posted while a call is in flight
    /// replace one another; only the latest runs.
    pub async fn serve(&mut self, inbox: &mut Inbox) -> Result<()> {
        loop {
            let completions = self.run_until_idle().await?;
            if refresh_failed_after_mutation(&completions) {
                warn!("A change was saved but the refreshed data could not be loaded");
            }
            match inbox.next().await {
                Some(intent) => self.enqueue(intent),
                None => {
                    debug!("Mailbox closed, stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Schedules a fetch of the active period ahead of any caller intent, once per invalidation.
    fn schedule_refetch(&mut self) {
        if !self.freshness.take_refetch() {
            return;
        }
        let intent = Intent::Fetch(self.active_period);
        debug!("Local data is stale, scheduling '{intent}'");
        self.refetch = Some(intent);
    }

    /// Makes the remote call for `intent` and applies its result.
    async fn perform(&mut self, intent: Intent) -> Result<()> {
        match intent {
            Intent::Fetch(period) => {
                self.active_period = period;
                let response = self
                    .remote
                    .get_month_data(&self.settings.fetch_query, period)
                    .await?;
                let snapshot = match response {
                    MonthResponse::NoContent => {
                        debug!("No data for the requested period, using the default snapshot");
                        self.settings.default_snapshot.clone()
                    }
                    MonthResponse::Data(body) => body.into(),
                };
                self.dispatch(Event::Success(snapshot));
                self.freshness.mark_fresh();
            }
            Intent::Create(transaction) => {
                self.remote.post_transaction(&transaction).await?;
                self.freshness.invalidate();
            }
            Intent::Update(transaction) => {
                self.remote.update_transaction(&transaction).await?;
                self.freshness.invalidate();
            }
            Intent::Delete(id) => {
                self.remote.delete_transaction(&id).await?;
                self.freshness.invalidate();
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) {
        trace!("Dispatch {event:?}");
        self.status = reduce(self.status.clone(), event);
        self.observer.send_replace(self.status.clone());
    }
}
