use crate::sources::{DurableStore, FileSource, FileStore, HttpSource, MemoryStore, RemoteSource, UnavailableSource};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

pub const SOURCE_VAR: &str = "TZ_GLOBE_SOURCE";
pub const CACHE_DIR_VAR: &str = "TZ_GLOBE_CACHE_DIR";
pub const NO_CACHE_VAR: &str = "TZ_GLOBE_NO_CACHE";
pub const USER_AGENT_VAR: &str = "TZ_GLOBE_USER_AGENT";
pub const VERBOSE_VAR: &str = "VERBOSE_LOGGING";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid dataset URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },

    #[error("Invalid value '{value}' for {name}, expected true or false")]
    InvalidFlag {
        name: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceLocation {
    Http(Url),
    File(PathBuf),
}

impl SourceLocation {
    /// `http(s)://` locations are fetched over the network, anything else is a file path.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let lower = value.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Url::parse(value)
                .map(SourceLocation::Http)
                .map_err(|source| ConfigError::InvalidUrl { value: value.to_string(), source })
        } else {
            Ok(SourceLocation::File(PathBuf::from(value)))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source: Option<SourceLocation>,
    /// Directory of the durable cache, `None` keeps the cache in memory only.
    pub cache_dir: Option<PathBuf>,
    pub user_agent: String,
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: None,
            cache_dir: Some(default_cache_dir(std::env::var_os("HOME").map(PathBuf::from))),
            user_agent: default_user_agent(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let source = lookup(SOURCE_VAR)
            .filter(|value| !value.trim().is_empty())
            .map(|value| SourceLocation::parse(value.trim()))
            .transpose()?;

        let cache_dir = if parse_flag(NO_CACHE_VAR, lookup(NO_CACHE_VAR))? {
            None
        } else {
            Some(lookup(CACHE_DIR_VAR)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| default_cache_dir(lookup("HOME").map(PathBuf::from))))
        };

        Ok(Config {
            source,
            cache_dir,
            user_agent: lookup(USER_AGENT_VAR).unwrap_or_else(default_user_agent),
            verbose_logging: parse_flag(VERBOSE_VAR, lookup(VERBOSE_VAR))?,
        })
    }

    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connection_verbose(self.verbose_logging)
            .build()
    }

    pub fn remote_source(&self) -> Result<Arc<dyn RemoteSource>, reqwest::Error> {
        let source: Arc<dyn RemoteSource> = match &self.source {
            Some(SourceLocation::Http(url)) => Arc::new(HttpSource::new(self.http_client()?, url.clone())),
            Some(SourceLocation::File(path)) => Arc::new(FileSource::new(path.clone())),
            None => Arc::new(UnavailableSource),
        };
        Ok(source)
    }

    pub fn durable_store(&self) -> Arc<dyn DurableStore> {
        let store: Arc<dyn DurableStore> = match &self.cache_dir {
            Some(dir) => Arc::new(FileStore::new(dir.clone())),
            None => Arc::new(MemoryStore::new()),
        };
        store
    }
}

fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(text) => text.to_ascii_lowercase()
            .parse::<bool>()
            .map_err(|_| ConfigError::InvalidFlag { name, value: text.to_string() }),
    }
}

fn default_cache_dir(home: Option<PathBuf>) -> PathBuf {
    match home {
        Some(home) => home.join(".cache").join("tz-globe"),
        None => PathBuf::from(".tz-globe-cache"),
    }
}

fn default_user_agent() -> String {
    format!("tz-globe/{}", env!("CARGO_PKG_VERSION"))
}
