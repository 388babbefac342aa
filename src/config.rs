//! Configuration file handling for Pillar.
//!
//! The configuration file is stored at `$PILLAR_HOME/config.json` and contains settings for the
//! application such as the address the HTTP server binds to and where CSV reports are written.

use crate::db::Db;
use crate::error::{ErrorType, IntoResult};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_NAME: &str = "pillar";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const PILLAR_SQLITE: &str = "pillar.sqlite";
const REPORTS: &str = "reports";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$PILLAR_HOME` and from there it loads `$PILLAR_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the pillar home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory and:
    /// - Writes an initial `config.json` file with default settings
    /// - Creates the reports directory
    /// - Creates and migrates the SQLite database
    ///
    /// # Errors
    /// - Returns an error if any file operations fail or if a database already exists in `dir`.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::create_inner(dir.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(maybe_relative: PathBuf) -> anyhow::Result<Self> {
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the pillar home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!("Pillar is already initialized at '{}'", root.display());
        }
        let sqlite_path = root.join(PILLAR_SQLITE);
        if sqlite_path.exists() {
            bail!("A database already exists at '{}'", sqlite_path.display());
        }

        match Self::populate(root, config_path.clone(), sqlite_path.clone()).await {
            Ok(config) => {
                debug!("Created pillar home at {}", config.root.display());
                Ok(config)
            }
            Err(e) => {
                // Leave nothing behind that would make the next `pillar init` refuse to run.
                let mut partial = vec![config_path, sqlite_path.clone()];
                for suffix in ["-wal", "-shm"] {
                    let mut p = sqlite_path.as_os_str().to_owned();
                    p.push(suffix);
                    partial.push(PathBuf::from(p));
                }
                for path in partial.iter().filter(|p| p.exists()) {
                    if let Err(cleanup) = utils::remove_file(path).await {
                        warn!("{cleanup:#}");
                    }
                }
                Err(e)
            }
        }
    }

    /// Creates the database, the config file and the reports directory in an empty home.
    async fn populate(
        root: PathBuf,
        config_path: PathBuf,
        sqlite_path: PathBuf,
    ) -> anyhow::Result<Self> {
        let db = Db::init(&sqlite_path)
            .await
            .context("Unable to create SQLite DB")?;
        let config = Self {
            root,
            config_path,
            config_file: ConfigFile::default(),
            db,
            sqlite_path,
        };
        let finished = async {
            config.config_file.save(&config.config_path).await?;
            utils::make_dir(config.reports_dir()).await
        }
        .await;
        match finished {
            Ok(()) => Ok(config),
            Err(e) => {
                // The database files are removed next, so no connection may still hold them.
                config.db.close().await;
                Err(e)
            }
        }
    }

    /// This will
    /// - validate that `pillar_home` exists and that the config file exists
    /// - load the config file
    /// - open the database, migrating it if needed
    /// - return the loaded configuration object
    pub async fn load(pillar_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(pillar_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> anyhow::Result<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Pillar home is missing, run 'pillar init' first")?;
        utils::read_dir(&root)
            .await
            .context("Pillar home is not readable")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let sqlite_path = root.join(PILLAR_SQLITE);
        let db = Db::load(&sqlite_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    /// The socket address `pillar serve` listens on unless overridden on the command line.
    pub fn bind_address(&self) -> &str {
        &self.config_file.bind_address
    }

    /// Where CSV reports are written. A relative path in `config.json` is resolved against the
    /// home directory.
    pub fn reports_dir(&self) -> PathBuf {
        let p = self.config_file.reports_dir();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }

    /// The bank used by `settle` when the caller does not name one.
    pub fn default_bank(&self) -> Option<&str> {
        self.config_file.default_bank.as_deref()
    }

    /// The payment method used by `settle` when the caller does not name one.
    pub fn default_payment_method(&self) -> Option<&str> {
        self.config_file.default_payment_method.as_deref()
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "pillar",
///   "config_version": 1,
///   "bind_address": "127.0.0.1:3000",
///   "reports_dir": "reports",
///   "default_bank": "ITAU",
///   "default_payment_method": "PIX"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "pillar"
    app_name: String,

    config_version: u8,

    #[serde(default = "default_bind_address")]
    bind_address: String,

    /// Relative to the home directory, or absolute. Defaults to `reports`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reports_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_bank: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_payment_method: Option<String>,
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            bind_address: default_bind_address(),
            reports_dir: None,
            default_bank: None,
            default_payment_method: None,
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile from `path`.
    async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .with_context(|| format!("Failed to load config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version <= CONFIG_VERSION,
            "Unsupported config_version {} in config file, the newest known version is {}",
            config.config_version,
            CONFIG_VERSION
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }

    fn reports_dir(&self) -> PathBuf {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(REPORTS))
    }
}
