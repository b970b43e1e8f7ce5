//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\music-dedupe\config.toml
//! - macOS: ~/Library/Application Support/music-dedupe/config.toml
//! - Linux: ~/.config/music-dedupe/config.toml
//!
//! Every section defaults independently, so a file that only sets the
//! remote store credentials is a complete configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::batch::BatchConfig;
use crate::canonical::CompletenessRules;
use crate::fingerprint::{FingerprintCache, FingerprintGenerator, FingerprintSettings};
use crate::matcher::{MatcherConfig, MultiSourceMatcher};
use crate::sources::SourceAdapter;
use crate::sources::library::{self, AssetLibrary, LibraryClient, TagConventions};
use crate::sources::remote::{self, RemoteSchema, RemoteStore, RemoteStoreClient};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials (keep separate for potential future encryption)
    pub credentials: Credentials,

    /// Remote metadata store connection and property names
    pub remote_store: RemoteStoreConfig,

    /// Local asset library connection
    pub library: LibraryConfig,

    /// Matching thresholds
    pub matching: MatchingConfig,

    /// Fingerprint generation
    pub fingerprint: FingerprintConfig,

    /// Batch runs
    pub batch: BatchSection,
}

/// API credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Integration token for the remote store
    pub remote_store_token: Option<String>,

    /// Database holding one page per track
    pub remote_database_id: Option<String>,
}

/// Remote metadata store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStoreConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_version: String,
    pub title_field: String,
    pub artist_field: String,
    pub external_id_field: Option<String>,
    /// One per audio format
    pub fingerprint_fields: Vec<String>,
    pub url_fields: Vec<String>,
    pub file_fields: Vec<String>,
    pub downloaded_field: Option<String>,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        let schema = RemoteSchema::default();
        Self {
            enabled: true,
            base_url: remote::DEFAULT_BASE_URL.to_string(),
            api_version: remote::DEFAULT_API_VERSION.to_string(),
            title_field: schema.title_field,
            artist_field: schema.artist_field,
            external_id_field: schema.external_id_field,
            fingerprint_fields: schema.fingerprint_fields,
            url_fields: schema.url_fields,
            file_fields: schema.file_fields,
            downloaded_field: schema.downloaded_field,
        }
    }
}

impl From<&RemoteStoreConfig> for RemoteSchema {
    fn from(config: &RemoteStoreConfig) -> Self {
        RemoteSchema {
            title_field: config.title_field.clone(),
            artist_field: config.artist_field.clone(),
            external_id_field: config.external_id_field.clone(),
            fingerprint_fields: config.fingerprint_fields.clone(),
            url_fields: config.url_fields.clone(),
            file_fields: config.file_fields.clone(),
            downloaded_field: config.downloaded_field.clone(),
        }
    }
}

impl From<&RemoteStoreConfig> for CompletenessRules {
    fn from(config: &RemoteStoreConfig) -> Self {
        CompletenessRules {
            file_fields: config.file_fields.clone(),
            fingerprint_fields: config.fingerprint_fields.clone(),
            downloaded_field: config.downloaded_field.clone(),
        }
    }
}

/// Local asset library settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub enabled: bool,
    pub base_url: String,
    pub fingerprint_tag_prefix: String,
    pub external_id_tag_prefix: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let tags = TagConventions::default();
        Self {
            enabled: false,
            base_url: library::DEFAULT_BASE_URL.to_string(),
            fingerprint_tag_prefix: tags.fingerprint_prefix,
            external_id_tag_prefix: tags.external_id_prefix,
        }
    }
}

impl From<&LibraryConfig> for TagConventions {
    fn from(config: &LibraryConfig) -> Self {
        TagConventions {
            fingerprint_prefix: config.fingerprint_tag_prefix.clone(),
            external_id_prefix: config.external_id_tag_prefix.clone(),
        }
    }
}

/// Matching thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum combined title/artist similarity for a fuzzy hit
    pub fuzzy_threshold: f64,
    /// Minimum best score for a duplicate verdict
    pub duplicate_threshold: f64,
    pub query_timeout_secs: u64,
    pub title_prefix_len: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let matcher = MatcherConfig::default();
        Self {
            fuzzy_threshold: matcher.fuzzy_threshold,
            duplicate_threshold: matcher.duplicate_threshold,
            query_timeout_secs: matcher.query_timeout.as_secs(),
            title_prefix_len: matcher.title_prefix_len,
        }
    }
}

impl From<&MatchingConfig> for MatcherConfig {
    fn from(config: &MatchingConfig) -> Self {
        MatcherConfig {
            fuzzy_threshold: config.fuzzy_threshold,
            duplicate_threshold: config.duplicate_threshold,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            title_prefix_len: config.title_prefix_len,
        }
    }
}

/// Fingerprint generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    pub use_chromaprint: bool,
    pub sample_rate: u32,
    pub workers: usize,
    pub cache_enabled: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        let settings = FingerprintSettings::default();
        Self {
            use_chromaprint: settings.use_chromaprint,
            sample_rate: settings.sample_rate,
            workers: settings.workers,
            cache_enabled: settings.cache_enabled,
        }
    }
}

impl From<&FingerprintConfig> for FingerprintSettings {
    fn from(config: &FingerprintConfig) -> Self {
        FingerprintSettings {
            use_chromaprint: config.use_chromaprint,
            sample_rate: config.sample_rate,
            workers: config.workers,
            cache_enabled: config.cache_enabled,
        }
    }
}

/// Batch run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    pub max_concurrent: usize,
    pub compare_within_batch: bool,
}

impl Default for BatchSection {
    fn default() -> Self {
        let batch = BatchConfig::default();
        Self {
            max_concurrent: batch.max_concurrent,
            compare_within_batch: batch.compare_within_batch,
        }
    }
}

impl From<&BatchSection> for BatchConfig {
    fn from(config: &BatchSection) -> Self {
        BatchConfig {
            max_concurrent: config.max_concurrent,
            compare_within_batch: config.compare_within_batch,
        }
    }
}

impl Config {
    /// Check the configuration is usable before any adapter is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_store.enabled {
            if is_blank(&self.credentials.remote_store_token) {
                return Err(ConfigError::MissingCredential("remote_store_token"));
            }
            if is_blank(&self.credentials.remote_database_id) {
                return Err(ConfigError::MissingCredential("remote_database_id"));
            }
        }

        for (name, value) in [
            ("matching.fuzzy_threshold", self.matching.fuzzy_threshold),
            ("matching.duplicate_threshold", self.matching.duplicate_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if self.matching.query_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "matching.query_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.batch.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "batch.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.fingerprint.workers == 0 {
            return Err(ConfigError::Invalid(
                "fingerprint.workers must be at least 1".to_string(),
            ));
        }
        if self.fingerprint.sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "fingerprint.sample_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn completeness_rules(&self) -> CompletenessRules {
        (&self.remote_store).into()
    }

    /// Build the enabled adapters, remote store first.
    pub fn build_adapters(&self) -> crate::error::Result<Vec<Arc<dyn SourceAdapter>>> {
        self.validate()?;
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

        if self.remote_store.enabled {
            let client = RemoteStoreClient::new(
                &self.remote_store.base_url,
                self.credentials.remote_store_token.clone().unwrap_or_default(),
                self.credentials.remote_database_id.clone().unwrap_or_default(),
                &self.remote_store.api_version,
            )?;
            adapters.push(Arc::new(RemoteStore::new(client, (&self.remote_store).into())));
        }

        if self.library.enabled {
            let client = LibraryClient::new(&self.library.base_url)?;
            adapters.push(Arc::new(AssetLibrary::new(client, (&self.library).into())));
        }

        tracing::info!(adapters = adapters.len(), "Built source adapters");
        Ok(adapters)
    }

    /// A matcher over the enabled adapters with a fingerprint generator
    /// sharing `cache`.
    pub fn build_matcher(
        &self,
        cache: Arc<FingerprintCache>,
    ) -> crate::error::Result<MultiSourceMatcher> {
        let generator = FingerprintGenerator::new((&self.fingerprint).into(), cache)?;
        Ok(
            MultiSourceMatcher::new(self.build_adapters()?, (&self.matching).into())
                .with_fingerprinter(generator),
        )
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("music-dedupe"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file found, using defaults");
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Loaded config");
            config
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            tracing::warn!("Using default configuration");
            Config::default()
        }
    }
}

/// Load configuration from a specific file.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to `path`, creating its directory if needed.
///
/// Writes to a temp file and renames it over the target.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
