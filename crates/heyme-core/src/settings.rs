use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::SettingsError;
use crate::login::AuthMode;

pub const DEFAULT_API_BASE_URL: &str = "https://server.heyme.uk";
pub const DEFAULT_SERVER_URL: &str = "https://livekit.heyme.uk";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    /// Base of the HeyMe identity and meetings API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// LiveKit server every session connects to.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub default_auth_mode: AuthMode,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            server_url: default_server_url(),
            default_auth_mode: AuthMode::default(),
        }
    }
}

impl Settings {
    pub fn api_base(&self) -> Result<Url, SettingsError> {
        parse_url("api_base_url", &self.api_base_url)
    }

    /// The LiveKit signaling URL, with http(s) mapped to ws(s).
    pub fn livekit_ws_url(&self) -> Result<String, SettingsError> {
        let url = parse_url("server_url", &self.server_url)?;
        let url = url.as_str().trim_end_matches('/');
        Ok(url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1))
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(raw.trim()).map_err(|e| SettingsError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(url),
        other => Err(SettingsError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Settings persisted as `settings.json` in the app data directory.
///
/// Credentials and tokens are never written here.
pub struct SettingsStore {
    settings: Mutex<Settings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let file_path = data_dir.as_ref().join("settings.json");
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> Settings {
        self.lock().clone()
    }

    pub fn set_api_base_url(&self, url: &str) -> Result<(), SettingsError> {
        parse_url("api_base_url", url)?;
        self.lock().api_base_url = url.trim().to_string();
        self.save()
    }

    pub fn set_server_url(&self, url: &str) -> Result<(), SettingsError> {
        parse_url("server_url", url)?;
        self.lock().server_url = url.trim().to_string();
        self.save()
    }

    pub fn set_default_auth_mode(&self, mode: AuthMode) -> Result<(), SettingsError> {
        self.lock().default_auth_mode = mode;
        self.save()
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let settings = self.get();
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.file_path, serde_json::to_string_pretty(&settings)?)?;
        Ok(())
    }

    fn load(path: &Path) -> Settings {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable {}: {e}", path.display());
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }
}
