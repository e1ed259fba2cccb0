//! Configuration file handling.
//!
//! The configuration file is stored at `$LEDGER_HOME/config.json` and holds the address of the
//! ledger server along with the settings that the sync controller is constructed with.

use crate::api::FetchQuery;
use crate::controller::ControllerSettings;
use crate::model::Snapshot;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "ledger";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$LEDGER_HOME` and from there it loads `$LEDGER_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    base_url: Url,
}

impl Config {
    /// Creates the home directory, if needed, and writes an initial `config.json` to it.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the home directory, e.g. `$HOME/ledger`
    /// - `base_url` - The root of the ledger server's API, e.g. `http://localhost:3000/api`
    /// - `metadata` - The kind of summary to request with month data, e.g. `monthStatus`
    ///
    /// # Errors
    /// - Returns an error if the URL is not a valid http(s) URL or if any file operation fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        base_url: &str,
        metadata: Option<&str>,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the ledger home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let config_path = root.join(CONFIG_JSON);

        let fetch_query = metadata.map(|m| {
            let mut q = FetchQuery::new();
            q.insert("metadata".to_string(), m.to_string());
            q
        });
        let config_file = ConfigFile {
            base_url: base_url.to_string(),
            fetch_query,
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
            base_url,
        })
    }

    /// This will
    /// - validate that `ledger_home` and its config file exist
    /// - load and validate the config file
    /// - return the loaded configuration object
    pub async fn load(ledger_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = ledger_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Ledger home is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let base_url = parse_base_url(&config_file.base_url)?;

        Ok(Self {
            root,
            config_path,
            config_file,
            base_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// How long an HTTP request may take before it fails with a transport error.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn fetch_query(&self) -> FetchQuery {
        self.config_file.fetch_query.clone().unwrap_or_default()
    }

    pub fn default_snapshot(&self) -> Snapshot {
        self.config_file.default_snapshot.clone().unwrap_or_default()
    }

    /// The settings that a `SyncController` is constructed with.
    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings::new(self.default_snapshot(), self.fetch_query())
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "ledger",
///   "config_version": 1,
///   "base_url": "http://localhost:3000/api",
///   "fetch_query": {"metadata": "monthStatus"},
///   "timeout_secs": 30,
///   "default_snapshot": {"transactionsList": [], "metadata": {}}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "ledger"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The root of the ledger server's API
    base_url: String,

    /// Query parameters sent with every month data request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fetch_query: Option<FetchQuery>,

    /// Request timeout in seconds, defaults to 30
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,

    /// What to show before anything is fetched and for periods without data. Defaults to no
    /// transactions and empty metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_snapshot: Option<Snapshot>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            base_url: String::new(),
            fetch_query: None,
            timeout_secs: None,
            default_snapshot: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if `app_name` is wrong
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

/// Parses the ledger server URL, which must use http or https.
fn parse_base_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid base URL '{url}'"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => bail!("Unsupported scheme '{other}' in base URL '{url}', expected http or https"),
    }
}
