use crate::api::{DirFetcher, HttpFetcher};
use crate::internal::fixture::{FixtureLoader, LoadOptions};
use crate::internal::sink::{DEFAULT_CONTAINER_ID, DocumentSink, HtmlSink, MemorySink};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default file name looked up by [`FixtureConfig::load`].
pub const CONFIG_FILE_NAME: &str = "fixture.ron";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FixtureConfig {
    /// Name of the fixture container, e.g. "testArea"
    #[serde(default = "default_container_id")]
    pub container_id: String,
    /// Base URL fragments are fetched from (e.g. "http://127.0.0.1:8080/fixtures/")
    pub base_url: Option<String>,
    /// Local directory fragments are read from when no base URL is set
    pub fixture_dir: Option<String>,
    /// Upper bound for one fetch. Unbounded when unset.
    pub timeout_ms: Option<u64>,
    /// Keep loaded fragments this long. Caching is off when unset.
    pub cache_ttl_secs: Option<u64>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level for the filter, e.g. "info" or "debug". RUST_LOG overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Extra per-module directives, e.g. {"html_fixture::api": "debug"}
    pub module_levels: HashMap<String, String>,
    /// Write logs to a daily rotating file in this directory instead of the test writer
    pub log_directory: Option<String>,
}

fn default_container_id() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            container_id: default_container_id(),
            base_url: None,
            fixture_dir: None,
            timeout_ms: None,
            cache_ttl_secs: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            module_levels: HashMap::new(),
            log_directory: None,
        }
    }
}

impl FixtureConfig {
    /// Load `fixture.ron` from the current directory, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        if !path.exists() {
            tracing::info!("No fixture config found, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded fixture config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::error!("{:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture config at {}", path.display()))?;
        Self::from_ron(&content)
            .with_context(|| format!("failed to parse fixture config at {}", path.display()))
    }

    pub fn from_ron(content: &str) -> Result<Self> {
        ron::from_str(content).context("invalid fixture config")
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            timeout: self.timeout(),
            cancel: None,
        }
    }

    /// Apply the configured timeout and cache to a loader over any sink and fetcher.
    pub fn configure<S, F>(&self, loader: FixtureLoader<S, F>) -> FixtureLoader<S, F>
    where
        S: DocumentSink,
        F: crate::api::ResourceFetcher,
    {
        let loader = loader.with_default_options(self.load_options());
        match self.cache_ttl() {
            Some(ttl) => loader.with_cache(ttl),
            None => loader,
        }
    }

    /// Loader fetching over HTTP from `base_url`, writing into an [`HtmlSink`].
    pub fn http_loader(&self) -> Result<FixtureLoader<HtmlSink, HttpFetcher>> {
        let base_url = self
            .base_url
            .as_deref()
            .context("fixture config has no base_url")?;
        let fetcher = HttpFetcher::new(base_url)?;
        Ok(self.configure(FixtureLoader::new(
            HtmlSink::new(&self.container_id),
            fetcher,
        )))
    }

    /// Loader reading from `fixture_dir` (or the current directory), writing verbatim.
    pub fn dir_loader(&self) -> FixtureLoader<MemorySink, DirFetcher> {
        let root = self.fixture_dir.as_deref().unwrap_or(".");
        self.configure(FixtureLoader::new(
            MemorySink::new(&self.container_id),
            DirFetcher::new(root),
        ))
    }
}
