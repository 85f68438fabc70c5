use matchmate_schema::FeatureEncoder;
use matchmate_similarity::DEFAULT_LIMIT;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TRAIN_TIMEOUT: Duration = Duration::from_secs(120);
/// Every day at 03:00 UTC
pub const DEFAULT_REFRESH_CRON: &str = "0 3 * * *";
pub const DEFAULT_LEDGER_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Connection settings for the AI recommendation service
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub train_timeout: Duration,
    /// Extra attempts after a timeout or 5xx
    pub max_retries: u32,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            train_timeout: DEFAULT_TRAIN_TIMEOUT,
            max_retries: 1,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries are capped at one
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(1);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FacadeConfig {
    /// Used when a request asks for 0 results
    pub default_limit: usize,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl FacadeConfig {
    pub fn resolve_limit(&self, limit: usize) -> usize {
        if limit == 0 {
            self.default_limit
        } else {
            limit
        }
    }
}

/// Which fields go into the feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureSet {
    #[default]
    Standard,
    Extended,
}

impl FeatureSet {
    pub fn encoder(self) -> FeatureEncoder {
        match self {
            FeatureSet::Standard => FeatureEncoder::standard(),
            FeatureSet::Extended => FeatureEncoder::extended(),
        }
    }
}

/// Everything the server needs to start
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs on the local path only
    pub ai: Option<ClientConfig>,
    pub facade: FacadeConfig,
    pub feature_set: FeatureSet,
    pub profiles_path: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
    /// How often expired entries are purged and the ledger file rewritten
    pub ledger_flush_interval: Duration,
    pub refresh_cron: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            ai: None,
            facade: FacadeConfig::default(),
            feature_set: FeatureSet::Standard,
            profiles_path: None,
            ledger_path: None,
            ledger_flush_interval: DEFAULT_LEDGER_FLUSH_INTERVAL,
            refresh_cron: DEFAULT_REFRESH_CRON.to_string(),
        }
    }
}
