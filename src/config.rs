//! Configuration file handling.
//!
//! The configuration file is stored at `$EXPENSE_LEDGER_HOME/config.json`. Next to it live the two
//! vocabulary documents and the `data` directory that holds one SQLite database per user.

use crate::db::{Ledger, Store};
use crate::error::{ErrorType, IntoResult, Res, Result};
use crate::tenant::TenantId;
use crate::utils;
use crate::vocabulary::{
    FileVocabulary, VocabularySource, DEFAULT_CATEGORIES_JSON, DEFAULT_SAVING_SOURCES_JSON,
};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const APP_NAME: &str = "expense-ledger";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const CATEGORIES_JSON: &str = "categories.json";
const SAVING_SOURCES_JSON: &str = "saving_sources.json";
const DATA: &str = "data";
const DEFAULT_USER: &str = "default_user";
const OPERATION_TIMEOUT_SECS: u64 = 30;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$EXPENSE_LEDGER_HOME` and from there it loads `config.json`. It owns the tenant
/// `Store` and the `VocabularySource` that every command uses.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    default_user: TenantId,
    store: Store,
    vocabulary: Arc<dyn VocabularySource>,
}

impl Config {
    /// Creates the home directory and:
    /// - writes an initial `config.json` with `default_user` and default settings
    /// - writes the default `categories.json` and `saving_sources.json` unless they already exist
    /// - creates the `data` directory
    ///
    /// # Errors
    /// - Returns a `Validation` error if `default_user` is not a valid user id.
    /// - Returns a `Config` error if any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, default_user: &str) -> Result<Self> {
        let default_user = TenantId::new(default_user)?;
        Self::create_inner(dir.into(), default_user)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(maybe_relative: PathBuf, default_user: TenantId) -> Res<Self> {
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        utils::make_dir(&root.join(DATA)).await?;

        for (name, contents) in [
            (CATEGORIES_JSON, DEFAULT_CATEGORIES_JSON),
            (SAVING_SOURCES_JSON, DEFAULT_SAVING_SOURCES_JSON),
        ] {
            let path = root.join(name);
            if path.is_file() {
                debug!("Keeping the existing {}", path.display());
            } else {
                utils::write(&path, contents).await?;
            }
        }

        let config_file = ConfigFile {
            default_user: default_user.to_string(),
            ..ConfigFile::default()
        };
        let config_path = root.join(CONFIG_JSON);
        config_file.save(&config_path).await?;

        Ok(Self::assemble(root, config_path, config_file, default_user))
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load and validate the config file
    /// - validate that the data directory exists
    ///
    /// The vocabulary documents are not read here. They are read, and validated, each time a
    /// command needs them.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The home directory is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let default_user = TenantId::new(&config_file.default_user)
            .context("Invalid default_user in config file")?;

        let config = Self::assemble(root, config_path, config_file, default_user);
        if !config.data_dir().is_dir() {
            bail!(
                "The data directory is missing '{}'",
                config.data_dir().display()
            )
        }
        Ok(config)
    }

    fn assemble(
        root: PathBuf,
        config_path: PathBuf,
        config_file: ConfigFile,
        default_user: TenantId,
    ) -> Self {
        let store = Store::new(
            root.join(DATA),
            config_file.operation_timeout(),
            config_file.enable_wal,
        );
        let vocabulary = FileVocabulary::new(
            resolve(&root, config_file.categories_path()),
            resolve(&root, config_file.saving_sources_path()),
        );
        Self {
            root,
            config_path,
            config_file,
            default_user,
            store,
            vocabulary: Arc::new(vocabulary),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn data_dir(&self) -> &Path {
        self.store.data_dir()
    }

    /// The user that a new session starts out with.
    pub fn default_user(&self) -> &TenantId {
        &self.default_user
    }

    pub fn operation_timeout(&self) -> Duration {
        self.config_file.operation_timeout()
    }

    /// The path of the SQLite database that holds `tenant`'s ledger.
    pub fn ledger_path(&self, tenant: &TenantId) -> PathBuf {
        self.store.tenant_path(tenant)
    }

    /// Opens the ledger for `tenant`, provisioning it first if necessary.
    pub(crate) async fn ledger(&self, tenant: &TenantId) -> Result<Ledger> {
        self.store.ensure(tenant).await
    }

    pub(crate) fn vocabulary(&self) -> &dyn VocabularySource {
        self.vocabulary.as_ref()
    }

    /// Replaces the vocabulary source, e.g. with an in-memory `Vocabulary`.
    pub fn with_vocabulary(mut self, vocabulary: Arc<dyn VocabularySource>) -> Self {
        self.vocabulary = vocabulary;
        self
    }
}

/// Returns `p` if it is absolute, otherwise `root` joined with `p`.
fn resolve(root: &Path, p: PathBuf) -> PathBuf {
    if p.is_absolute() {
        return p;
    }
    root.join(p)
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "expense-ledger",
///   "config_version": 1,
///   "default_user": "default_user",
///   "operation_timeout_secs": 30,
///   "enable_wal": true,
///   "categories_path": "categories.json",
///   "saving_sources_path": "saving_sources.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "expense-ledger"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The user id that is used when a request does not name one
    default_user: String,

    /// The upper bound, in seconds, for any single storage operation
    #[serde(default = "default_timeout_secs")]
    operation_timeout_secs: u64,

    /// Whether SQLite databases use write-ahead logging
    #[serde(default = "default_enable_wal")]
    enable_wal: bool,

    /// Path to the categories document (optional, relative to the home directory or absolute)
    /// Defaults to $EXPENSE_LEDGER_HOME/categories.json if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    categories_path: Option<PathBuf>,

    /// Path to the saving sources document (optional, relative to the home directory or absolute)
    /// Defaults to $EXPENSE_LEDGER_HOME/saving_sources.json if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    saving_sources_path: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    OPERATION_TIMEOUT_SECS
}

fn default_enable_wal() -> bool {
    true
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            default_user: DEFAULT_USER.to_string(),
            operation_timeout_secs: OPERATION_TIMEOUT_SECS,
            enable_wal: true,
            categories_path: None,
            saving_sources_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if its values are invalid
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        ensure!(
            config.operation_timeout_secs > 0,
            "operation_timeout_secs must be greater than zero in {}",
            path.display()
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    fn categories_path(&self) -> PathBuf {
        self.categories_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(CATEGORIES_JSON))
    }

    fn saving_sources_path(&self) -> PathBuf {
        self.saving_sources_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SAVING_SOURCES_JSON))
    }
}
