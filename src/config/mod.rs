use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{AgencyError, Result};

pub const GENERATION_KEY_VAR: &str = "GROQ_API_KEY";
pub const SEARCH_KEY_VAR: &str = "SERPAPI_API_KEY";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub batch: BatchConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub pages: PageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub per_call_timeout_ms: u64,
    pub on_limit: OnLimit,
    pub max_wait_ms: u64, // upper bound on a single rate-limit wait
}

/// What a gateway call does when its provider's window is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnLimit {
    Wait,
    FailFast,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    pub deadline_ms: u64,
}

/// Settings for fetching the pages some agents read before their request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    pub generation: GenerationProviderConfig,
    pub search: SearchProviderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationProviderConfig {
    pub rate_limit: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    pub max_concurrency: usize,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchProviderConfig {
    pub rate_limit: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    pub max_concurrency: usize,
    pub base_url: String,
    pub location: String,
    pub result_count: u32,
}

/// Quota settings shared by both provider kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderLimits {
    pub rate_limit: u32,
    pub window: Duration,
    pub max_concurrency: usize,
}

impl GatewayConfig {
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_millis(self.per_call_timeout_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

impl PageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

impl BatchConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl GenerationProviderConfig {
    pub fn limits(&self) -> ProviderLimits {
        ProviderLimits {
            rate_limit: self.rate_limit,
            window: self.window,
            max_concurrency: self.max_concurrency,
        }
    }
}

impl SearchProviderConfig {
    pub fn limits(&self) -> ProviderLimits {
        ProviderLimits {
            rate_limit: self.rate_limit,
            window: self.window,
            max_concurrency: self.max_concurrency,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 250,
            backoff_max_ms: 8_000,
            per_call_timeout_ms: 30_000,
            on_limit: OnLimit::Wait,
            max_wait_ms: 10_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            batch: BatchConfig { deadline_ms: 120_000 },
            providers: ProvidersConfig {
                generation: GenerationProviderConfig {
                    rate_limit: 30,
                    window: Duration::from_secs(60),
                    max_concurrency: 4,
                    base_url: "https://api.groq.com/openai/v1".to_string(),
                    model: "mistral-saba-24b".to_string(),
                    max_tokens: 1000,
                    temperature: 0.7,
                },
                search: SearchProviderConfig {
                    rate_limit: 1,
                    window: Duration::from_secs(1),
                    max_concurrency: 2,
                    base_url: "https://serpapi.com/search.json".to_string(),
                    location: "United States".to_string(),
                    result_count: 10,
                },
            },
            pages: PageConfig::default(),
        }
    }
}

/// API keys for the two providers. Loaded once at process start.
#[derive(Clone)]
pub struct Credentials {
    pub generation_api_key: String,
    pub search_api_key: String,
}

impl Credentials {
    pub fn new(generation_api_key: impl Into<String>, search_api_key: impl Into<String>) -> Self {
        Self {
            generation_api_key: generation_api_key.into(),
            search_api_key: search_api_key.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from any variable source; blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let missing: Vec<&str> = [GENERATION_KEY_VAR, SEARCH_KEY_VAR]
            .into_iter()
            .filter(|name| read(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(AgencyError::CredentialError(format!(
                "Missing {} in environment variables",
                missing.join(" or ")
            ))
            .into());
        }

        Ok(Self {
            generation_api_key: read(GENERATION_KEY_VAR).unwrap_or_default(),
            search_api_key: read(SEARCH_KEY_VAR).unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("generation_api_key", &"<redacted>")
            .field("search_api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait::async_trait]
pub trait ConfigManager {
    async fn load_config(&self) -> Result<Config>;
    async fn save_config(&self, config: &Config) -> Result<()>;
    fn validate_config(&self, config: &Config) -> Result<()>;
}

pub struct FileConfigManager {
    config_path: PathBuf,
}

impl FileConfigManager {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }
}

#[async_trait::async_trait]
impl ConfigManager for FileConfigManager {
    async fn load_config(&self) -> Result<Config> {
        info!("Loading configuration from {:?}", self.config_path);

        // check if config file exists, create default if not
        if !self.config_path.exists() {
            warn!("Configuration file not found, creating default config at {:?}", self.config_path);
            self.create_default_config().await?;
        }

        let config_content = fs::read_to_string(&self.config_path)
            .map_err(|e| AgencyError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&config_content)
            .map_err(|e| AgencyError::ConfigError(format!("Failed to parse TOML config: {}", e)))?;

        self.validate_config(&config)?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    fn validate_config(&self, config: &Config) -> Result<()> {
        debug!("Validating configuration");

        // checking gateway policy
        let gateway = &config.gateway;
        if gateway.max_attempts == 0 {
            return Err(AgencyError::ConfigError("max_attempts must be greater than 0".to_string()).into());
        }
        if gateway.max_attempts > 10 {
            return Err(AgencyError::ConfigError("max_attempts cannot exceed 10".to_string()).into());
        }
        if gateway.backoff_base_ms == 0 {
            return Err(AgencyError::ConfigError("backoff_base_ms must be greater than 0".to_string()).into());
        }
        if gateway.backoff_max_ms < gateway.backoff_base_ms {
            return Err(AgencyError::ConfigError("backoff_max_ms cannot be less than backoff_base_ms".to_string()).into());
        }
        if gateway.per_call_timeout_ms == 0 {
            return Err(AgencyError::ConfigError("per_call_timeout_ms must be greater than 0".to_string()).into());
        }

        // checking batch deadline
        if config.batch.deadline_ms == 0 {
            return Err(AgencyError::ConfigError("deadline_ms must be greater than 0".to_string()).into());
        }

        // checking provider quotas
        let generation = &config.providers.generation;
        let search = &config.providers.search;
        Self::validate_limits("generation", &generation.limits())?;
        Self::validate_limits("search", &search.limits())?;
        Self::validate_base_url("generation", &generation.base_url)?;
        Self::validate_base_url("search", &search.base_url)?;

        if generation.model.trim().is_empty() {
            return Err(AgencyError::ConfigError("generation model cannot be empty".to_string()).into());
        }
        if generation.max_tokens == 0 {
            return Err(AgencyError::ConfigError("generation max_tokens must be greater than 0".to_string()).into());
        }
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(AgencyError::ConfigError(format!(
                "generation temperature {} must be between 0.0 and 2.0",
                generation.temperature
            ))
            .into());
        }
        if search.result_count == 0 || search.result_count > 100 {
            return Err(AgencyError::ConfigError("search result_count must be between 1 and 100".to_string()).into());
        }

        if config.pages.timeout_ms == 0 {
            return Err(AgencyError::ConfigError("pages timeout_ms must be greater than 0".to_string()).into());
        }

        debug!("Configuration validation passed");
        Ok(())
    }

    async fn save_config(&self, config: &Config) -> Result<()> {
        info!("Saving configuration to {:?}", self.config_path);

        let toml_content = toml::to_string_pretty(config)
            .map_err(|e| AgencyError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(&self.config_path, toml_content)
            .map_err(|e| AgencyError::ConfigError(format!("Failed to write config file: {}", e)))?;

        info!("Configuration saved successfully");
        Ok(())
    }
}

impl FileConfigManager {
    /// Create a default configuration file
    async fn create_default_config(&self) -> Result<()> {
        let default_config = Config::default();
        let toml_content = toml::to_string_pretty(&default_config)
            .map_err(|e| AgencyError::ConfigError(format!("Failed to serialize default config: {}", e)))?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AgencyError::ConfigError(format!("Failed to create config directory: {}", e)))?;
        }

        fs::write(&self.config_path, toml_content)
            .map_err(|e| AgencyError::ConfigError(format!("Failed to write default config: {}", e)))?;

        info!("Default configuration file created at {:?}", self.config_path);
        Ok(())
    }

    fn validate_limits(provider: &str, limits: &ProviderLimits) -> Result<()> {
        if limits.rate_limit == 0 {
            return Err(AgencyError::ConfigError(format!("{} rate_limit must be greater than 0", provider)).into());
        }
        if limits.window.is_zero() {
            return Err(AgencyError::ConfigError(format!("{} window must be longer than zero", provider)).into());
        }
        if limits.max_concurrency == 0 {
            return Err(AgencyError::ConfigError(format!("{} max_concurrency must be greater than 0", provider)).into());
        }
        if limits.max_concurrency > 64 {
            return Err(AgencyError::ConfigError(format!("{} max_concurrency cannot exceed 64", provider)).into());
        }
        Ok(())
    }

    fn validate_base_url(provider: &str, base_url: &str) -> Result<()> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AgencyError::ConfigError(format!(
                "{} base_url must start with http:// or https://",
                provider
            ))
            .into());
        }
        Ok(())
    }
}
