use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const APP_DIR: &str = "NoSmoke";
const CONFIG_FILE: &str = "config.toml";

pub const ENV_API_URL: &str = "NOSMOKE_API_URL";
pub const ENV_STREAM_URL: &str = "NOSMOKE_STREAM_URL";
pub const ENV_DATA_DIR: &str = "NOSMOKE_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Dashboard configuration.
///
/// Read from `<config dir>/NoSmoke/config.toml` when present, then
/// overridden by `NOSMOKE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Backend HTTP origin.
    pub api_url: String,
    /// Live detection WebSocket. Derived from `api_url` when unset.
    pub stream_url: Option<String>,
    pub frame_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// Where the session file and logs live.
    pub data_dir: Option<PathBuf>,
    pub alerts_enabled: bool,
    pub dashboard: DashboardConfig,
    pub camera: CameraConfig,
}

/// Figures shown on the home page that the backend does not report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub uptime: String,
    pub active_cameras: u32,
}

/// Default camera for live detection. A snapshot URL wins over a folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub snapshot_url: Option<String>,
    pub directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            stream_url: None,
            frame_interval_ms: 500,
            request_timeout_secs: 30,
            data_dir: None,
            alerts_enabled: true,
            dashboard: DashboardConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            uptime: "99.8%".to_string(),
            active_cameras: 8,
        }
    }
}

impl Config {
    /// Load from the default location plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match default_config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(std::env::vars());
        config.validate()?;
        Ok(config)
    }

    /// A missing file is not an error; it yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            match key.as_ref() {
                ENV_API_URL => self.api_url = value.into(),
                ENV_STREAM_URL => self.stream_url = Some(value.into()),
                ENV_DATA_DIR => self.data_dir = Some(PathBuf::from(value.into())),
                _ => {}
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let api = self.api_url.trim();
        if !(api.starts_with("http://") || api.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url must be an http(s) URL, got {api:?}"
            )));
        }
        if let Some(stream) = &self.stream_url {
            if !(stream.starts_with("ws://") || stream.starts_with("wss://")) {
                return Err(ConfigError::Invalid(format!(
                    "stream_url must be a ws(s) URL, got {stream:?}"
                )));
            }
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("frame_interval_ms must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// `ws://host/ws/detect` for `http://host`, `wss://` for `https://`.
    pub fn stream_url(&self) -> String {
        if let Some(url) = &self.stream_url {
            return url.clone();
        }
        let base = self.api_url.trim().trim_end_matches('/');
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws}/ws/detect")
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
