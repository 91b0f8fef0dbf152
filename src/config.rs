use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{ViduError, ViduResult};
use crate::tasks::poll::{PollConfig, POLL_INTERVAL};
use crate::vidu::DEFAULT_BASE_URL;

const APP_IDENTIFIER: &str = "com.vidunodes.app";

// ---------------------------------------------------------------------------
// Credentials — {"api_key": "..."}
// ---------------------------------------------------------------------------

#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("api_key", &"<redacted>").finish()
    }
}

impl Credentials {
    /// Read the credential file. A missing file, malformed JSON or an
    /// absent/empty `api_key` are all configuration errors.
    pub fn load(path: &Path) -> ViduResult<Self> {
        info!(path = %path.display(), "loading API key");
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ViduError::configuration(format!(
                "cannot read credential file {}: {e}",
                path.display()
            ))
        })?;
        let creds: Credentials = serde_json::from_str(&contents).map_err(|e| {
            ViduError::configuration(format!(
                "credential file {} is not valid JSON: {e}",
                path.display()
            ))
        })?;
        if creds.api_key.trim().is_empty() {
            return Err(ViduError::configuration(format!(
                "credential file {} has no 'api_key' field",
                path.display()
            )));
        }
        Ok(creds)
    }
}

// ---------------------------------------------------------------------------
// Settings — read from {dataDir}/settings.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_base_url")]
    #[serde(alias = "baseURL", alias = "api_base")]
    pub base_url: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_poll_timeout_secs() -> u64 {
    3600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            output_dir: default_output_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            credentials_path: None,
        }
    }
}

impl Settings {
    /// Missing or unparseable settings fall back to defaults.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("settings.json");
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), "ignoring malformed settings: {e}");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    pub fn credentials_path(&self, data_dir: &Path) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(|| data_dir.join("api.json"))
    }

    /// A zero interval would poll back-to-back; it falls back to the default.
    pub fn poll_config(&self) -> PollConfig {
        let interval = if self.poll_interval_secs == 0 {
            warn!(
                default_secs = POLL_INTERVAL.as_secs(),
                "pollIntervalSecs must be at least 1, using the default"
            );
            POLL_INTERVAL
        } else {
            Duration::from_secs(self.poll_interval_secs)
        };
        PollConfig {
            interval,
            timeout: Duration::from_secs(self.poll_timeout_secs),
        }
    }
}

/// Resolve the app data directory cross-platform.
pub fn resolve_data_dir() -> ViduResult<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let home = dirs::home_dir()
            .ok_or_else(|| ViduError::configuration("could not determine home directory"))?;
        Ok(home.join("Library/Application Support").join(APP_IDENTIFIER))
    }

    #[cfg(not(target_os = "macos"))]
    {
        let data = dirs::data_dir()
            .ok_or_else(|| ViduError::configuration("could not determine data directory"))?;
        Ok(data.join(APP_IDENTIFIER))
    }
}
