use std::time::Duration;
use std::{fs, path::PathBuf};

use common::prelude::SecretKey;
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "sealshare";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "key.pem";
pub const LOGS_DIR_NAME: &str = "logs";

/// Placeholder substituted with the content locator in gateway templates
pub const CID_PLACEHOLDER: &str = "{cid}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Viewer page that share links are composed onto
    #[serde(default = "default_link_base")]
    pub link_base: Url,
    /// IPFS HTTP API `add` endpoint used for uploads
    #[serde(default)]
    pub upload_url: Option<Url>,
    /// Gateway URL templates tried in order; `{cid}` is replaced by the locator
    #[serde(default = "default_gateways")]
    pub gateways: Vec<String>,
    /// Directory mirroring every upload, read before the network
    #[serde(default)]
    pub local_store: Option<PathBuf>,
    /// Token lifetime when `share` is not given one
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    /// How long a viewer has to complete an identity challenge
    #[serde(default = "default_identity_timeout_secs")]
    pub identity_timeout_secs: u64,
    /// Write daily log files under the config directory
    #[serde(default)]
    pub file_logging: bool,
}

fn default_link_base() -> Url {
    Url::parse("https://sealshare.app/view").expect("hardcoded URL must parse")
}

fn default_gateways() -> Vec<String> {
    vec![
        "https://{cid}.ipfs.w3s.link".to_string(),
        "https://{cid}.ipfs.dweb.link".to_string(),
        "https://ipfs.io/ipfs/{cid}".to_string(),
        "https://gateway.pinata.cloud/ipfs/{cid}".to_string(),
    ]
}

fn default_ttl_secs() -> u64 {
    common::token::DEFAULT_TTL.as_secs()
}

fn default_identity_timeout_secs() -> u64 {
    120
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            link_base: default_link_base(),
            upload_url: None,
            gateways: default_gateways(),
            local_store: None,
            default_ttl_secs: default_ttl_secs(),
            identity_timeout_secs: default_identity_timeout_secs(),
            file_logging: false,
        }
    }
}

impl AppConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn identity_timeout(&self) -> Duration {
        Duration::from_secs(self.identity_timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the sealshare directory (~/.sealshare)
    pub app_dir: PathBuf,
    /// Path to the issuer key PEM file
    pub key_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the sealshare directory path (custom or default ~/.sealshare)
    pub fn app_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Directory for log files, when file logging is enabled
    pub fn logs_dir(&self) -> Option<PathBuf> {
        self.config
            .file_logging
            .then(|| self.app_dir.join(LOGS_DIR_NAME))
    }

    /// Initialize a new sealshare state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;

        if app_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&app_dir)?;

        // Generate and save the issuer key
        let key = SecretKey::generate().map_err(|e| StateError::InvalidKey(e.to_string()))?;
        let key_path = app_dir.join(KEY_FILE_NAME);
        fs::write(&key_path, key.to_pem())?;

        let config = config.unwrap_or_default();
        let config_path = app_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            app_dir,
            key_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the sealshare directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;

        if !app_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = app_dir.join(KEY_FILE_NAME);
        let config_path = app_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            app_dir,
            key_path,
            config_path,
            config,
        })
    }

    /// Load the issuer key from the key file
    pub fn load_key(&self) -> Result<SecretKey, StateError> {
        let pem = fs::read_to_string(&self.key_path)?;
        let key = SecretKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))?;
        Ok(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("sealshare directory not initialized. Run 'sealshare init' first")]
    NotInitialized,

    #[error("sealshare directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
