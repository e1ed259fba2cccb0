//! Command handlers for the ledger CLI.
//!
//! Each handler drives a `SyncController` the way a user interface would: it enqueues intents,
//! lets the controller run them, and reports the resulting status.

mod change;
mod fetch;
mod init;
mod watch;

use crate::api::Remote;
use crate::controller::{refresh_failed_after_mutation, Completion, Outcome, SyncController};
use crate::model::Period;
use crate::queue::Intent;
use crate::status::CollectionStatus;
use crate::{Config, Result};
use anyhow::bail;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, warn};

pub use change::{create, delete, update};
pub use fetch::fetch;
pub use init::init;
pub use watch::{read_intents, watch, watch_input};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,

    /// True when the command could not do what was asked, e.g. the server was unreachable.
    failed: bool,
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
            failed: false,
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
            failed: false,
        }
    }

    /// Create a new `Out` object for a command that failed but still has data to show.
    pub fn failure<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
            failed: true,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    pub fn is_failure(&self) -> bool {
        self.failed
    }

    /// Print the message and the structured data (if it exists) as JSON to stdout. The message is
    /// logged at `warn!` for failures and `info!` otherwise.
    pub fn print(&self) {
        if self.failed {
            warn!("{}", self.message);
        } else {
            info!("{}", self.message);
        }
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output follows");
                println!("{json}");
            }
        }
    }

    /// Turns a failed `Out` into an error carrying its message.
    pub fn check(&self) -> Result<()> {
        if self.failed {
            bail!("{}", self.message);
        }
        Ok(())
    }
}

/// Creates a controller and loads `period`, or the current period when `None`, into it.
async fn open(
    config: &Config,
    remote: Box<dyn Remote>,
    period: Option<Period>,
) -> Result<SyncController> {
    let mut controller = SyncController::new(remote, config.settings());
    if period.is_some() {
        controller.enqueue(Intent::Fetch(period));
    }
    controller.run_until_idle().await?;
    Ok(controller)
}

/// Describes a period for messages.
fn describe(period: Option<Period>) -> String {
    match period {
        Some(p) => p.to_string(),
        None => "the current month".to_string(),
    }
}

/// Builds the output of a command whose first completion is a mutation. `action` reads like
/// "create transaction 'Rent'" and `done` like "Created transaction 'Rent'".
fn mutation_out(
    action: &str,
    done: &str,
    completions: &[Completion],
    status: &CollectionStatus,
) -> Out<CollectionStatus> {
    match completions.first().map(Completion::outcome) {
        Some(Outcome::TransportFailed(e)) => {
            Out::failure(format!("Unable to {action}: {e}"), status.clone())
        }
        _ if refresh_failed_after_mutation(completions) => Out::failure(
            format!("{done}, but the refreshed data could not be loaded"),
            status.clone(),
        ),
        _ => Out::new(
            format!(
                "{done}, the month now has {} transaction{}",
                status.data().transactions().len(),
                if status.data().transactions().len() == 1 { "" } else { "s" }
            ),
            status.clone(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_check() {
        let ok: Out<()> = Out::new_message("fine");
        assert!(ok.check().is_ok());
        let failed = Out::failure("Unable to reach the server", 5u32);
        assert!(failed.is_failure());
        assert_eq!(failed.structure(), Some(&5));
        assert_eq!(
            failed.check().unwrap_err().to_string(),
            "Unable to reach the server"
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(None), "the current month");
        assert_eq!(describe(Some(Period::new(2, 2024).unwrap())), "2024-02");
    }
}
