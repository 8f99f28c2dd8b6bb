//! Configuration types for video-analyzer

use crate::acquisition::{AcquisitionStrategy, default_strategies};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Main configuration for [`VideoAnalyzer`](crate::VideoAnalyzer)
///
/// Built from the process environment with [`Config::from_env`] by the binary,
/// or assembled in code (every sub-config implements `Default`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP surface settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Strategy chain settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Remote analysis service settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Optional object-storage staging
    #[serde(default)]
    pub storage: StorageConfig,

    /// Parent directory for per-task workspaces (default: `<temp>/video-analyzer`)
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// API key compared against the `X-API-Key` header
    ///
    /// `None` disables authentication; [`Config::validate`] rejects that for
    /// the binary.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Acquisition (strategy chain) configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Upper bound for a single probe or download call (default: 15 minutes)
    #[serde(default = "default_attempt_timeout", with = "duration_serde")]
    pub attempt_timeout: Duration,

    /// Strategies in priority order
    #[serde(default = "default_strategies")]
    pub strategies: Vec<AcquisitionStrategy>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: None,
            search_path: true,
            attempt_timeout: default_attempt_timeout(),
            strategies: default_strategies(),
        }
    }
}

/// Remote analysis service configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Credential for the analysis service
    #[serde(default)]
    pub api_key: String,

    /// Service endpoint (default: https://generativelanguage.googleapis.com)
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Generative model name (default: gemini-1.5-flash)
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Interval between processing-state polls (default: 10 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Maximum number of polls before giving up (default: 180)
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Wall-clock bound for the model invocation (default: 600 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            poll_interval: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Object storage backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Google Cloud Storage JSON API
    #[default]
    Gcs,
    /// Buckets as directories below [`StorageConfig::root`]
    Filesystem,
}

impl std::str::FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcs" => Ok(StorageBackend::Gcs),
            "filesystem" | "fs" => Ok(StorageBackend::Filesystem),
            other => Err(Error::Config {
                message: format!(
                    "unknown storage backend '{}' (expected gcs or filesystem)",
                    other
                ),
                key: Some("STORAGE_BACKEND".to_string()),
            }),
        }
    }
}

/// Object storage staging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Stage artifacts through object storage (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Which object store to use
    #[serde(default)]
    pub backend: StorageBackend,

    /// Staging bucket (default: youtube-analyzer-temp-files)
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Project billed for storage requests (required for the gcs backend)
    #[serde(default)]
    pub project: Option<String>,

    /// Static OAuth access token; the metadata server is used when absent
    #[serde(default)]
    pub access_token: Option<String>,

    /// Storage API endpoint (default: https://storage.googleapis.com)
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,

    /// Root directory for the filesystem backend
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: StorageBackend::default(),
            bucket: default_bucket(),
            project: None,
            access_token: None,
            endpoint: default_storage_endpoint(),
            root: default_storage_root(),
        }
    }
}

/// Retry configuration for one acquisition strategy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 1.0, a fixed interval)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl RetryConfig {
    /// Fixed-interval policy: `retries` retries, `delay` apart
    pub fn fixed(retries: u32, delay: Duration) -> Self {
        Self {
            max_attempts: retries,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// Call `dotenvy::dotenv()` first to honour a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source and validate it
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Config::default();

        config.api.api_key = get("API_KEY");
        if let Some(addr) = get("BIND_ADDRESS") {
            config.api.bind_address = parse_value("BIND_ADDRESS", &addr)?;
        }

        if let Some(key) = get("GEMINI_API_KEY") {
            config.analysis.api_key = key;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            config.analysis.model = model;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            config.analysis.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("ANALYSIS_POLL_INTERVAL_SECS") {
            config.analysis.poll_interval =
                Duration::from_secs(parse_value("ANALYSIS_POLL_INTERVAL_SECS", &secs)?);
        }
        if let Some(secs) = get("ANALYSIS_TIMEOUT_SECS") {
            config.analysis.request_timeout =
                Duration::from_secs(parse_value("ANALYSIS_TIMEOUT_SECS", &secs)?);
        }

        if let Some(flag) = get("USE_GCS_STORAGE") {
            config.storage.enabled = parse_bool("USE_GCS_STORAGE", &flag)?;
        }
        if let Some(backend) = get("STORAGE_BACKEND") {
            config.storage.backend = backend.parse()?;
        }
        if let Some(bucket) = get("GCS_BUCKET_NAME") {
            config.storage.bucket = bucket;
        }
        config.storage.project = get("GOOGLE_CLOUD_PROJECT");
        config.storage.access_token = get("GCS_ACCESS_TOKEN");
        if let Some(root) = get("STORAGE_ROOT") {
            config.storage.root = PathBuf::from(root);
        }

        if let Some(dir) = get("WORK_DIR") {
            config.work_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("YT_DLP_PATH") {
            config.acquisition.yt_dlp_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that required settings are present
    pub fn validate(&self) -> Result<()> {
        if self.api.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Config {
                message: "API_KEY must be set".to_string(),
                key: Some("API_KEY".to_string()),
            });
        }

        if self.analysis.api_key.is_empty() {
            return Err(Error::Config {
                message: "GEMINI_API_KEY must be set".to_string(),
                key: Some("GEMINI_API_KEY".to_string()),
            });
        }

        if self.acquisition.strategies.is_empty() {
            return Err(Error::Config {
                message: "at least one acquisition strategy is required".to_string(),
                key: None,
            });
        }

        if self.analysis.max_poll_attempts == 0 {
            return Err(Error::Config {
                message: "max_poll_attempts must be at least 1".to_string(),
                key: None,
            });
        }

        if self.storage.enabled {
            if self.storage.bucket.is_empty() {
                return Err(Error::Config {
                    message: "GCS_BUCKET_NAME must not be empty when storage is enabled"
                        .to_string(),
                    key: Some("GCS_BUCKET_NAME".to_string()),
                });
            }
            if self.storage.backend == StorageBackend::Gcs && self.storage.project.is_none() {
                return Err(Error::Config {
                    message: "GOOGLE_CLOUD_PROJECT must be set when USE_GCS_STORAGE is enabled"
                        .to_string(),
                    key: Some("GOOGLE_CLOUD_PROJECT".to_string()),
                });
            }
        }

        Ok(())
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| Error::Config {
        message: format!("invalid value '{}' for {}: {}", raw, key, e),
        key: Some(key.to_string()),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::Config {
            message: format!("invalid boolean '{}' for {}", raw, key),
            key: Some(key.to_string()),
        }),
    }
}

fn default_true() -> bool {
    true
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("video-analyzer")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_max_poll_attempts() -> u32 {
    180
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_bucket() -> String {
    "youtube-analyzer-temp-files".to_string()
}

fn default_storage_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_storage_root() -> PathBuf {
    std::env::temp_dir().join("video-analyzer-buckets")
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

// Duration serialization helper (whole seconds)
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
