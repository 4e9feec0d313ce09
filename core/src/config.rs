use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Key model that routes image decryption to node-local keys.
pub const KEY_MODEL_NODE: &str = "node";

/// Snapshotter used when neither config nor runtime handler names one.
pub const DEFAULT_SNAPSHOTTER: &str = "overlayfs";

/// Image backing pod sandboxes; pinned in the store so GC never removes it.
pub const DEFAULT_SANDBOX_IMAGE: &str = "registry.k8s.io/pause:3.9";

/// Berth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BerthConfig {
    /// Registry mirrors and per-registry credentials
    pub registry: RegistryConfig,

    /// Runtime handler table, keyed by the handler name pods request
    pub runtimes: HashMap<String, RuntimeConfig>,

    /// Snapshotter for pods whose handler does not override it
    pub snapshotter: String,

    /// Pod sandbox (pause) image
    pub sandbox_image: String,

    /// Image decryption settings
    pub image_decryption: ImageDecryption,

    /// Directory backing unpacked image snapshots
    pub image_fs_path: PathBuf,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for BerthConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            runtimes: Self::default_runtimes(),
            snapshotter: DEFAULT_SNAPSHOTTER.to_string(),
            sandbox_image: DEFAULT_SANDBOX_IMAGE.to_string(),
            image_decryption: ImageDecryption::default(),
            image_fs_path: PathBuf::from("/var/lib/berth/images"),
            log_level: LogLevel::Info,
        }
    }
}

impl BerthConfig {
    /// Default runtime handler table
    fn default_runtimes() -> HashMap<String, RuntimeConfig> {
        let mut runtimes = HashMap::new();

        // Default handler, inherits the global snapshotter
        runtimes.insert(
            "runc".to_string(),
            RuntimeConfig {
                runtime_type: "io.berth.runc.v2".to_string(),
                snapshotter: String::new(),
            },
        );

        runtimes
    }
}

/// Registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Mirror table, keyed by registry host; "*" matches any host
    /// without its own entry
    pub mirrors: HashMap<String, Mirror>,

    /// Per-registry settings, keyed by host[:port] with an optional
    /// scheme prefix
    pub configs: HashMap<String, RegistryHostConfig>,
}

/// Mirror endpoints for one registry host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mirror {
    /// Endpoint URLs or bare hosts, tried in order
    pub endpoints: Vec<String>,
}

/// Settings for a single registry host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryHostConfig {
    /// Static credentials used when a pull carries none
    pub auth: Option<AuthEntry>,
}

/// Static registry credentials
///
/// Empty strings mean unset, matching the wire form pulls carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthEntry {
    pub username: String,
    pub password: String,

    /// Base64-encoded "username:password" blob
    pub auth: String,

    /// Bearer token minted by the registry
    pub identity_token: String,
}

/// Runtime handler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Runtime implementation name
    pub runtime_type: String,

    /// Snapshotter override; empty inherits the global default
    pub snapshotter: String,
}

/// Image decryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDecryption {
    /// Where decryption keys live; only "node" is recognized
    pub key_model: String,
}

impl Default for ImageDecryption {
    fn default() -> Self {
        Self {
            key_model: KEY_MODEL_NODE.to_string(),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
