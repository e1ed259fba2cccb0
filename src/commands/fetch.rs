use crate::api::Remote;
use crate::args::FetchArgs;
use crate::commands::{describe, open, Out};
use crate::status::CollectionStatus;
use crate::{Config, Result};

/// Loads the transactions of the chosen month and returns the resulting status.
///
/// A transport failure is not an error here: the output is marked as failed and carries the status,
/// which holds whatever data was shown before the attempt.
pub async fn fetch(
    config: Config,
    remote: Box<dyn Remote>,
    args: FetchArgs,
) -> Result<Out<CollectionStatus>> {
    let period = args.period().period()?;
    let controller = open(&config, remote, period).await?;
    let status = controller.status().clone();

    if status.is_error() {
        return Ok(Out::failure(
            format!("Unable to load {}", describe(period)),
            status,
        ));
    }

    let count = status.data().transactions().len();
    Ok(Out::new(
        format!(
            "Loaded {count} transaction{} for {}",
            if count == 1 { "" } else { "s" },
            describe(period)
        ),
        status,
    ))
}
