//! The long-running `watch` command.
//!
//! Intents arrive as JSON lines and are posted to the controller's mailbox while it serves. Every
//! status change is printed to stdout as one line of JSON.

use crate::api::Remote;
use crate::commands::Out;
use crate::controller::{mailbox, Mailbox, SyncController};
use crate::queue::Intent;
use crate::status::CollectionStatus;
use crate::{Config, Result};
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

/// Serves intents read from stdin until it is closed.
pub async fn watch(config: Config, remote: Box<dyn Remote>) -> Result<Out<CollectionStatus>> {
    info!("Reading intents from stdin, one JSON object per line");
    watch_input(config, remote, tokio::io::stdin()).await
}

/// Serves intents read from `input` until it ends, printing each status change. Returns the final
/// status.
pub async fn watch_input<R>(
    config: Config,
    remote: Box<dyn Remote>,
    input: R,
) -> Result<Out<CollectionStatus>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut controller = SyncController::new(remote, config.settings());

    let mut updates = controller.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().clone();
            match serde_json::to_string(&status) {
                Ok(json) => {
                    println!("{json}");
                    printed += 1;
                }
                Err(e) => warn!("Unable to serialize the status: {e}"),
            }
        }
        printed
    });

    let (mailbox, mut inbox) = mailbox();
    let reader = tokio::spawn(read_intents(input, mailbox));

    if let Err(e) = controller.serve(&mut inbox).await {
        reader.abort();
        printer.abort();
        return Err(e);
    }
    let read = reader.await.context("The intent reader panicked")??;

    let status = controller.status().clone();
    // Dropping the controller closes the status channel, which ends the printer.
    drop(controller);
    let printed = printer.await.context("The status printer panicked")?;

    let message = format!("Read {read} intents and printed {printed} status updates");
    if status.is_error() {
        Ok(Out::failure(
            format!("{message}, the last request failed"),
            status,
        ))
    } else {
        Ok(Out::new(message, status))
    }
}

/// Reads JSON lines from `input` and posts each intent to `mailbox`. Blank lines are skipped, and
/// lines that are not a valid intent are logged and skipped. Returns the number of intents posted.
///
/// The mailbox is dropped when `input` ends, which lets the controller stop.
///
/// # Example lines
/// ```text
/// {"intent": "fetch", "payload": null}
/// {"intent": "fetch", "payload": {"month": 2, "year": 2024}}
/// {"intent": "delete", "payload": "65d7c1f0"}
/// ```
pub async fn read_intents<R>(input: R, mailbox: Mailbox) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut posted = 0;
    let mut line_number = 0;
    while let Some(line) = lines
        .next_line()
        .await
        .context("Unable to read the next intent")?
    {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Intent>(line) {
            Ok(intent) => {
                mailbox.post(intent);
                posted += 1;
            }
            Err(e) => warn!("Skipping line {line_number}, it is not a valid intent: {e}"),
        }
    }
    debug!("Input ended after {line_number} lines");
    Ok(posted)
}
