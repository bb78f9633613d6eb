//! Process-wide storage connection.
//!
//! Settings are looked up in priority order:
//!
//! 1. explicit arguments given to [`ConnectionResolver::explicit`]
//! 2. the `DOCMODEL_CONNECTION_STRING` and `DOCMODEL_DATABASE_NAME` environment variables
//! 3. the `[docmodel]` table of `docmodel.toml`
//!
//! ```toml
//! [docmodel]
//! connection_string = "mongodb://localhost:27017"
//! database_name = "app"
//! ```
//!
//! A [`Connector`] turns each candidate into a backend; the first one that connects wins.
//! [`connect`] caches that handle for the rest of the process. Concurrent first calls
//! may both connect, but only one handle is ever cached.

use async_trait::async_trait;
use serde::Deserialize;
use std::{
    fmt,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};
use tracing::{debug, warn};

use crate::{
    backend::StoreBackend,
    error::{DocumentError, DocumentResult},
    store::Database,
};

pub const ENV_CONNECTION_STRING: &str = "DOCMODEL_CONNECTION_STRING";
pub const ENV_DATABASE_NAME: &str = "DOCMODEL_DATABASE_NAME";
pub const CONFIG_FILE: &str = "docmodel.toml";

static CONNECTION: OnceLock<Database> = OnceLock::new();

/// Storage address and database name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionSettings {
    pub connection_string: String,
    pub database_name: String,
}

impl ConnectionSettings {
    pub fn new(connection_string: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database_name: database_name.into(),
        }
    }
}

/// Where a set of [`ConnectionSettings`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    Explicit,
    Environment,
    ConfigFile,
}

impl fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsSource::Explicit => write!(f, "explicit arguments"),
            SettingsSource::Environment => write!(f, "environment"),
            SettingsSource::ConfigFile => write!(f, "config file"),
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    docmodel: Option<ConnectionSettings>,
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Collects connection candidates from every source.
pub struct ConnectionResolver {
    explicit: Option<ConnectionSettings>,
    env: EnvLookup,
    config_path: PathBuf,
}

impl ConnectionResolver {
    /// Reads the process environment and `docmodel.toml` in the working directory.
    pub fn new() -> Self {
        Self {
            explicit: None,
            env: Box::new(|key| std::env::var(key).ok()),
            config_path: PathBuf::from(CONFIG_FILE),
        }
    }

    /// Sets explicit settings, tried before the environment and the config file.
    pub fn explicit(mut self, connection_string: impl Into<String>, database_name: impl Into<String>) -> Self {
        self.explicit = Some(ConnectionSettings::new(connection_string, database_name));
        self
    }

    /// Replaces the environment lookup.
    pub fn env_lookup(mut self, lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Box::new(lookup);
        self
    }

    /// Reads the config file from `path` instead of `docmodel.toml`.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = path.as_ref().to_path_buf();
        self
    }

    /// Returns every complete set of settings found, highest priority first.
    pub fn candidates(&self) -> Vec<(SettingsSource, ConnectionSettings)> {
        let mut candidates = Vec::new();

        if let Some(settings) = &self.explicit {
            candidates.push((SettingsSource::Explicit, settings.clone()));
        }
        if let Some(settings) = self.from_env() {
            candidates.push((SettingsSource::Environment, settings));
        }
        if let Some(settings) = self.from_file() {
            candidates.push((SettingsSource::ConfigFile, settings));
        }

        candidates
    }

    fn from_env(&self) -> Option<ConnectionSettings> {
        let connection_string = (self.env)(ENV_CONNECTION_STRING)?;
        let database_name = (self.env)(ENV_DATABASE_NAME)?;

        Some(ConnectionSettings::new(connection_string, database_name))
    }

    fn from_file(&self) -> Option<ConnectionSettings> {
        let text = match std::fs::read_to_string(&self.config_path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.config_path.display(), %err, "could not read config file");
                return None;
            }
        };

        match toml::from_str::<ConfigFile>(&text) {
            Ok(config) => config.docmodel,
            Err(err) => {
                warn!(path = %self.config_path.display(), %err, "could not parse config file");
                None
            }
        }
    }
}

impl Default for ConnectionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionResolver")
            .field("explicit", &self.explicit)
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}

/// Opens a storage backend from connection settings.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, settings: &ConnectionSettings) -> DocumentResult<Arc<dyn StoreBackend>>;
}

/// Connects using the first candidate that works, without caching.
///
/// # Errors
///
/// Returns [`DocumentError::Connection`] if no candidate was found or none connected.
pub async fn open(connector: &dyn Connector, resolver: &ConnectionResolver) -> DocumentResult<Database> {
    let mut failures = Vec::new();

    for (source, settings) in resolver.candidates() {
        match connector.connect(&settings).await {
            Ok(backend) => {
                debug!(%source, database = %settings.database_name, "connected to storage");
                return Ok(Database::from_shared(settings.database_name, backend));
            }
            Err(err) => {
                warn!(%source, %err, "connection candidate failed");
                failures.push(format!("{source}: {err}"));
            }
        }
    }

    if failures.is_empty() {
        return Err(DocumentError::Connection(format!(
            "no settings found in arguments, environment ({ENV_CONNECTION_STRING}, {ENV_DATABASE_NAME}) or {}",
            resolver.config_path.display()
        )));
    }

    Err(DocumentError::Connection(failures.join("; ")))
}

/// Returns the cached process-wide handle, connecting first if there is none.
pub async fn connect(connector: &dyn Connector, resolver: &ConnectionResolver) -> DocumentResult<Database> {
    if let Some(database) = CONNECTION.get() {
        return Ok(database.clone());
    }

    let database = open(connector, resolver).await?;
    Ok(CONNECTION.get_or_init(|| database).clone())
}

/// Returns the cached process-wide handle, if one has been established.
pub fn get_connection() -> Option<Database> {
    CONNECTION.get().cloned()
}

/// Installs `database` as the process-wide handle. Returns false if one is already set.
pub fn install(database: Database) -> bool {
    CONNECTION.set(database).is_ok()
}
