use crate::args::InitArgs;
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the ledger home directory and an initial `config.json` pointing at the server.
///
/// # Arguments
/// - `ledger_home` - The directory that will hold the configuration, e.g. `$HOME/ledger`
/// - `args` - The server's base URL and, optionally, the summary to request with month data.
///
/// # Errors
/// - Returns an error if the URL is invalid or if any file operation fails.
pub async fn init(ledger_home: &Path, args: &InitArgs) -> Result<Out<()>> {
    let config = Config::create(ledger_home, args.base_url(), args.metadata())
        .await
        .context("Unable to create the ledger home directory and config")?;
    Ok(Out::new_message(format!(
        "Successfully created {}",
        config.config_path().display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("ledger");
        let args = InitArgs::new("https://ledger.example.com/api", None);

        let out = init(&home, &args).await.unwrap();
        assert!(out.message().starts_with("Successfully created"));

        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.base_url().as_str(), "https://ledger.example.com/api");
        assert!(config.fetch_query().is_empty());
    }

    #[tokio::test]
    async fn test_init_bad_url() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs::new("localhost:3000", None);
        assert!(init(dir.path(), &args).await.is_err());
    }
}
