use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

pub const DEFAULT_CONFIG_PATH: &str = "config.ini";
pub const DEFAULT_PROXIES_PATH: &str = "proxies.txt";
pub const CONFIG_SECTION: &str = "bot";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HTTP_RETRIES: u32 = 3;
pub const DEFAULT_EMPTY_POOL_BACKOFF_SECS: u64 = 5;
pub const DEFAULT_EXHAUSTED_BACKOFF_SECS: u64 = 5;

pub const KEY_HTTP_TIMEOUT: &str = "translate_http_timeout";
pub const KEY_HTTP_RETRIES: &str = "translate_http_retries";
pub const KEY_HOP_ATTEMPTS: &str = "translate_hop_attempts";
pub const KEY_EMPTY_POOL_BACKOFF: &str = "translate_empty_pool_backoff";
pub const KEY_EXHAUSTED_BACKOFF: &str = "translate_exhausted_backoff";

pub const ENV_CONFIG_PATH: &str = "TRANSLATE_RELAY_CONFIG";
pub const ENV_PROXIES_PATH: &str = "TRANSLATE_RELAY_PROXIES";
pub const ENV_HTTP_TIMEOUT: &str = "TRANSLATE_HTTP_TIMEOUT";
pub const ENV_HTTP_RETRIES: &str = "TRANSLATE_HTTP_RETRIES";
pub const ENV_HOP_ATTEMPTS: &str = "TRANSLATE_HOP_ATTEMPTS";

/// Tunables shared by the chain driver, the race coordinator and every hop
/// worker. Built once at startup and passed down by value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    /// Per-call timeout for one request through one proxy.
    pub http_timeout: Duration,
    /// Transient failures a worker tolerates before giving up on its proxy.
    pub http_retries: u32,
    /// Upper bound on reload-and-retry rounds for a single hop. `None` retries
    /// forever.
    pub hop_attempts: Option<u32>,
    /// Wait between proxy reloads while the pool is empty.
    pub empty_pool_backoff: Duration,
    /// Wait before reloading the pool after every proxy in it failed.
    pub exhausted_backoff: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            http_retries: DEFAULT_HTTP_RETRIES,
            hop_attempts: None,
            empty_pool_backoff: Duration::from_secs(DEFAULT_EMPTY_POOL_BACKOFF_SECS),
            exhausted_backoff: Duration::from_secs(DEFAULT_EXHAUSTED_BACKOFF_SECS),
        }
    }
}

impl RelayConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.http_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.http_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        Ok(self)
    }

    /// Reads the `[bot]` section of an INI file, then applies environment
    /// overrides. Keys absent from both keep their defaults.
    pub fn load(path: &Path, env: &impl Env) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::new(
                &path.to_string_lossy(),
                ::config::FileFormat::Ini,
            ))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let mut cfg = Self::default();
        if let Some(secs) = section_u64(&settings, KEY_HTTP_TIMEOUT)? {
            cfg.http_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = section_u64(&settings, KEY_HTTP_RETRIES)? {
            cfg.http_retries = to_u32(KEY_HTTP_RETRIES, retries)?;
        }
        if let Some(attempts) = section_u64(&settings, KEY_HOP_ATTEMPTS)? {
            cfg.hop_attempts = hop_ceiling(to_u32(KEY_HOP_ATTEMPTS, attempts)?);
        }
        if let Some(secs) = section_u64(&settings, KEY_EMPTY_POOL_BACKOFF)? {
            cfg.empty_pool_backoff = Duration::from_secs(secs);
        }
        if let Some(secs) = section_u64(&settings, KEY_EXHAUSTED_BACKOFF)? {
            cfg.exhausted_backoff = Duration::from_secs(secs);
        }

        cfg.apply_env(env)?.validate()
    }

    pub fn apply_env(mut self, env: &impl Env) -> Result<Self, ConfigError> {
        if let Some(secs) = env_u64(env, ENV_HTTP_TIMEOUT)? {
            self.http_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = env_u64(env, ENV_HTTP_RETRIES)? {
            self.http_retries = to_u32(ENV_HTTP_RETRIES, retries)?;
        }
        if let Some(attempts) = env_u64(env, ENV_HOP_ATTEMPTS)? {
            self.hop_attempts = hop_ceiling(to_u32(ENV_HOP_ATTEMPTS, attempts)?);
        }
        Ok(self)
    }
}

// 0 means "no ceiling".
fn hop_ceiling(attempts: u32) -> Option<u32> {
    (attempts > 0).then_some(attempts)
}

fn section_u64(settings: &::config::Config, key: &str) -> Result<Option<u64>, ConfigError> {
    let full_key = format!("{CONFIG_SECTION}.{key}");
    match settings.get_string(&full_key) {
        Ok(raw) => parse_u64(key, &raw).map(Some),
        Err(::config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ConfigError::Load(e.to_string())),
    }
}

fn env_u64(env: &impl Env, key: &str) -> Result<Option<u64>, ConfigError> {
    env.var(key).map(|raw| parse_u64(key, &raw)).transpose()
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: raw.to_owned(),
    })
}

fn to_u32(key: &str, value: u64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_string(),
    })
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("translate_http_timeout must be > 0 seconds")]
    ZeroTimeout,
    #[error("translate_http_retries must be > 0")]
    ZeroRetries,
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}
