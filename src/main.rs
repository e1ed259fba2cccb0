use clap::Parser;
use ledger_sync::api::{self, Remote};
use ledger_sync::args::{Args, Command};
use ledger_sync::{commands, Config, Mode, Result};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().ledger_home().path();

    let out = match args.command() {
        Command::Init(init_args) => {
            let out = commands::init(home, init_args).await?;
            out.print();
            return out.check();
        }
        Command::Fetch(fetch_args) => {
            let (config, remote) = connect(home).await?;
            commands::fetch(config, remote, fetch_args.clone()).await?
        }
        Command::Create(create_args) => {
            let (config, remote) = connect(home).await?;
            commands::create(config, remote, *create_args.clone()).await?
        }
        Command::Update(update_args) => {
            let (config, remote) = connect(home).await?;
            commands::update(config, remote, *update_args.clone()).await?
        }
        Command::Delete(delete_args) => {
            let (config, remote) = connect(home).await?;
            commands::delete(config, remote, delete_args.clone()).await?
        }
        Command::Watch => {
            let (config, remote) = connect(home).await?;
            commands::watch(config, remote).await?
        }
    };
    out.print();
    out.check()
}

/// Loads the config and creates the remote that commands talk to.
async fn connect(home: &Path) -> Result<(Config, Box<dyn Remote>)> {
    let config = Config::load(home).await?;

    // This allows for running the program without a ledger server. When LEDGER_SYNC_IN_TEST_MODE
    // is set and non-zero in length, then the mode will be Mode::Test, otherwise Mode::Http.
    let mode = Mode::from_env();
    let remote = api::remote(&config, mode)?;
    Ok((config, remote))
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for the library and this binary.
            EnvFilter::new(format!(
                "ledger_sync={},{}={}",
                level,
                env!("CARGO_CRATE_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
