//! Runtime configuration: an optional RON file, then environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chat_engine::{EngineSettings, TransportSettings, UpstreamSettings, DEFAULT_OPENAI_BASE_URL};
use chat_logging::chat_info;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "chat.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("unknown log destination {0:?} (expected file, terminal or both)")]
    LogDestination(String),
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDestination {
    /// Write to ./chat.log in current directory.
    File,
    /// Write to terminal (stderr for the console, stdout otherwise).
    #[default]
    Terminal,
    /// Write to both file and terminal.
    Both,
}

impl std::str::FromStr for LogDestination {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(LogDestination::File),
            "terminal" => Ok(LogDestination::Terminal),
            "both" => Ok(LogDestination::Both),
            _ => Err(ConfigError::LogDestination(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address `serve` listens on.
    pub bind: String,
    /// Root url the console talks to.
    pub server_url: String,
    /// Host used to tell internal from external sources. Defaults to the
    /// host of `server_url`.
    pub page_host: Option<String>,
    /// JSON fixture of citation sources for the console.
    pub sources_file: Option<PathBuf>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub login_password: Option<String>,
    pub proxy: Option<String>,
    /// Hides error details in server responses.
    pub production: bool,
    pub log: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            server_url: "http://127.0.0.1:3000".to_string(),
            page_host: None,
            sources_file: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            login_password: None,
            proxy: None,
            production: false,
            log: LogDestination::default(),
        }
    }
}

impl AppConfig {
    /// Applies environment overrides; `lookup` is `std::env::var` outside tests.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.openai_base_url = url;
        }
        if let Some(password) = var("LOGIN_PASSWORD") {
            self.login_password = Some(password);
        }
        if let Some(proxy) = var("HTTPS_PROXY").or_else(|| var("HTTP_PROXY")) {
            self.proxy = Some(proxy);
        }
        if let Some(env) = var("APP_ENV") {
            self.production = env.trim().eq_ignore_ascii_case("production");
        }
        if let Some(bind) = var("CHAT_BIND") {
            self.bind = bind;
        }
        if let Some(url) = var("CHAT_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(host) = var("CHAT_PAGE_HOST") {
            self.page_host = Some(host);
        }
        if let Some(path) = var("CHAT_SOURCES_FILE") {
            self.sources_file = Some(PathBuf::from(path));
        }
        if let Some(log) = var("CHAT_LOG") {
            self.log = log.parse()?;
        }
        Ok(())
    }

    pub fn page_host(&self) -> String {
        if let Some(host) = self.page_host.as_deref().filter(|h| !h.trim().is_empty()) {
            return host.trim().to_string();
        }
        url::Url::parse(&self.server_url)
            .ok()
            .and_then(|url| url.host_str().map(ToOwned::to_owned))
            .unwrap_or_default()
    }

    pub fn upstream_settings(&self) -> UpstreamSettings {
        UpstreamSettings {
            api_key: self.openai_api_key.clone(),
            base_url: self.openai_base_url.clone(),
            proxy: self.proxy.clone(),
            ..UpstreamSettings::default()
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            server_url: self.server_url.clone(),
            transport: TransportSettings::default(),
            login_timeout: Duration::from_secs(15),
        }
    }
}

/// Loads the config file (explicit path, or `chat.ron` when present) and
/// applies the process environment on top.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match explicit {
        Some(path) => read_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILENAME);
            if default_path.exists() {
                read_file(default_path)?
            } else {
                AppConfig::default()
            }
        }
    };
    config.apply_env(|name| std::env::var(name).ok())?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    chat_info!("Loaded config from {:?}", path);
    Ok(config)
}
