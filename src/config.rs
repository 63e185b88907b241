use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::is_valid_table_name;
use crate::error::{AppError, Result};
use crate::feed::parse_opml_file;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "FEED_HARVESTER_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the database file, or `:memory:`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_db_name")]
    pub db_name: String,

    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    #[serde(default = "default_feeds")]
    pub feeds: Vec<String>,

    pub feeds_opml: Option<PathBuf>,

    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_database_url() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feed-harvester")
        .to_string_lossy()
        .to_string()
}

fn default_db_name() -> String {
    "rss_harvest".to_string()
}

fn default_collection_name() -> String {
    "rss_items".to_string()
}

fn default_feeds() -> Vec<String> {
    vec![
        "https://feeds.feedburner.com/TechCrunch".to_string(),
        "https://rss.cnn.com/rss/edition.rss".to_string(),
    ]
}

fn default_check_interval_ms() -> u64 {
    300_000
}

fn default_fetch_concurrency() -> usize {
    1
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            db_name: default_db_name(),
            collection_name: default_collection_name(),
            feeds: default_feeds(),
            feeds_opml: None,
            check_interval_ms: default_check_interval_ms(),
            fetch_concurrency: default_fetch_concurrency(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Config file (if any) with environment overrides applied on top.
    ///
    /// Also returns a warning for every override that was ignored, to be logged once
    /// logging is up.
    pub fn load() -> Result<(Self, Vec<String>)> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Config::default()
        };

        let warnings = config.apply_env_overrides();
        Ok((config, warnings))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feed-harvester")
            .join("config.toml")
    }

    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values are ignored; unparsable numbers are
    /// ignored too and reported in the returned warnings.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = get("DB_NAME") {
            self.db_name = v;
        }
        if let Some(v) = get("COLLECTION_NAME") {
            self.collection_name = v;
        }
        if let Some(v) = get("RSS_FEEDS") {
            self.feeds = split_feed_list(&v);
        }
        if let Some(v) = get("RSS_FEEDS_OPML") {
            self.feeds_opml = Some(PathBuf::from(v));
        }
        if let Some(v) = get("CHECK_INTERVAL") {
            match v.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.check_interval_ms = ms,
                _ => warnings.push(format!("Ignoring invalid CHECK_INTERVAL {:?}", v)),
            }
        }
        if let Some(v) = get("FETCH_CONCURRENCY") {
            match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.fetch_concurrency = n,
                _ => warnings.push(format!("Ignoring invalid FETCH_CONCURRENCY {:?}", v)),
            }
        }
        if let Some(v) = get("HOST") {
            self.host = v;
        }
        if let Some(v) = get("PORT") {
            match v.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warnings.push(format!("Ignoring invalid PORT {:?}", v)),
            }
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v;
        }

        warnings
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_table_name(&self.collection_name) {
            return Err(AppError::Config(format!(
                "collection name {:?} must be a plain identifier",
                self.collection_name
            )));
        }
        if self.db_name.is_empty() || self.db_name.contains(['/', '\\']) {
            return Err(AppError::Config(format!(
                "database name {:?} must be a plain file name",
                self.db_name
            )));
        }
        if self.check_interval_ms == 0 {
            return Err(AppError::Config(
                "check interval must be greater than zero".to_string(),
            ));
        }
        if self.feeds.is_empty() && self.feeds_opml.is_none() {
            return Err(AppError::Config("no feeds configured".to_string()));
        }
        for feed in &self.feeds {
            validate_feed_url(feed)?;
        }
        Ok(())
    }

    /// Configured feeds followed by any from the OPML file, without duplicates.
    pub fn resolve_feeds(&self) -> Result<Vec<String>> {
        let mut feeds = self.feeds.clone();

        if let Some(path) = &self.feeds_opml {
            for url in parse_opml_file(path)? {
                validate_feed_url(&url)?;
                if !feeds.contains(&url) {
                    feeds.push(url);
                }
            }
        }

        if feeds.is_empty() {
            return Err(AppError::Config("no feeds configured".to_string()));
        }
        Ok(feeds)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Path of the SQLite file, or `:memory:`.
    pub fn database_location(&self) -> String {
        if self.database_url == crate::db::IN_MEMORY {
            return self.database_url.clone();
        }
        Path::new(&self.database_url)
            .join(format!("{}.db", self.db_name))
            .to_string_lossy()
            .to_string()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Split a comma-separated feed list, dropping blanks and repeats.
pub fn split_feed_list(list: &str) -> Vec<String> {
    let mut feeds: Vec<String> = Vec::new();
    for url in list.split(',').map(str::trim).filter(|u| !u.is_empty()) {
        if !feeds.iter().any(|f| f == url) {
            feeds.push(url.to_string());
        }
    }
    feeds
}

fn validate_feed_url(feed: &str) -> Result<()> {
    let parsed = url::Url::parse(feed)
        .map_err(|e| AppError::Config(format!("invalid feed URL {:?}: {}", feed, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::Config(format!(
            "unsupported scheme {:?} in feed URL {:?}",
            scheme, feed
        ))),
    }
}
