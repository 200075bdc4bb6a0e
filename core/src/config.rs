use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use qtube_gemini::DEFAULT_BASE_URL;
use qtube_gemini::DEFAULT_MODEL;
use qtube_gemini::GeminiSettings;
use serde::Deserialize;

use crate::coordinator::CoordinatorSettings;
use crate::overlay::AnalysisRoute;
use crate::overlay::OverlaySettings;
use crate::player_bridge::PlayerSettings;

pub const CONFIG_TOML_FILE: &str = "config.toml";
pub const QTUBE_HOME_ENV: &str = "QTUBE_HOME";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONNECT_HOST: &str = "127.0.0.1";
const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;
const DEFAULT_CONNECT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigToml {
    pub gemini: GeminiToml,
    pub coordinator: CoordinatorToml,
    pub overlay: OverlayToml,
    pub player: PlayerToml,
    pub browser: BrowserToml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiToml {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorToml {
    pub handshake_timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub max_question_chars: Option<usize>,
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayToml {
    pub analysis_route: Option<AnalysisRoute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerToml {
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserToml {
    pub connect_host: Option<String>,
    pub connect_port: Option<u16>,
    pub connect_ws: Option<String>,
    pub connect_attempts: Option<u32>,
    pub connect_attempt_timeout_ms: Option<u64>,
}

/// Values supplied on the command line; they win over `config.toml`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub analysis_route: Option<AnalysisRoute>,
    pub connect_port: Option<u16>,
    pub connect_ws: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub model: String,
    pub base_url: String,
    /// Key from `config.toml`, or from the environment variable named by
    /// `api_key_env`.
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    /// Client settings, or `None` when no API key is configured.
    pub fn settings(&self) -> Option<GeminiSettings> {
        let api_key = self.api_key.clone()?;
        Some(GeminiSettings {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key,
            request_timeout: Some(self.request_timeout),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConnectConfig {
    pub host: String,
    pub port: Option<u16>,
    pub ws: Option<String>,
    pub attempts: u32,
    pub attempt_timeout: Duration,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub qtube_home: PathBuf,
    pub gemini: GeminiConfig,
    pub coordinator: CoordinatorSettings,
    pub overlay: OverlaySettings,
    pub player: PlayerSettings,
    pub browser: BrowserConnectConfig,
}

impl Config {
    /// Loads `config.toml` from `config_file`, or from `$QTUBE_HOME` when no
    /// file is given, and applies `overrides`.
    pub fn load(config_file: Option<&Path>, overrides: ConfigOverrides) -> std::io::Result<Self> {
        let qtube_home = find_qtube_home()?;
        let path = match config_file {
            Some(path) => path.to_path_buf(),
            None => qtube_home.join(CONFIG_TOML_FILE),
        };
        let cfg = load_config_toml(&path)?;
        Ok(Self::load_from_base_config_with_overrides(
            cfg,
            overrides,
            qtube_home,
            |name| std::env::var(name).ok(),
        ))
    }

    /// Resolves a parsed `config.toml`. `env` looks up environment variables.
    pub fn load_from_base_config_with_overrides(
        cfg: ConfigToml,
        overrides: ConfigOverrides,
        qtube_home: PathBuf,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let ConfigToml {
            gemini,
            coordinator,
            overlay,
            player,
            browser,
        } = cfg;

        let api_key_env = gemini
            .api_key_env
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = gemini
            .api_key
            .or_else(|| env(&api_key_env))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let gemini = GeminiConfig {
            model: overrides
                .model
                .or(gemini.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: overrides
                .base_url
                .or(gemini.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            api_key_env,
            request_timeout: gemini
                .request_timeout_ms
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis),
        };

        let defaults = CoordinatorSettings::default();
        let coordinator = CoordinatorSettings {
            handshake_timeout: coordinator
                .handshake_timeout_ms
                .map_or(defaults.handshake_timeout, Duration::from_millis),
            max_retries: coordinator.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff: coordinator
                .retry_backoff_ms
                .map_or(defaults.retry_backoff, Duration::from_millis),
            max_question_chars: coordinator
                .max_question_chars
                .unwrap_or(defaults.max_question_chars),
            placeholder: coordinator.placeholder.unwrap_or(defaults.placeholder),
        };

        let overlay = OverlaySettings {
            analysis_route: overrides
                .analysis_route
                .or(overlay.analysis_route)
                .unwrap_or_default(),
        };

        let player = PlayerSettings {
            poll_interval: player
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .map_or(PlayerSettings::default().poll_interval, Duration::from_millis),
        };

        let browser = BrowserConnectConfig {
            host: browser
                .connect_host
                .unwrap_or_else(|| DEFAULT_CONNECT_HOST.to_string()),
            port: overrides.connect_port.or(browser.connect_port),
            ws: overrides.connect_ws.or(browser.connect_ws),
            attempts: browser
                .connect_attempts
                .unwrap_or(DEFAULT_CONNECT_ATTEMPTS)
                .max(1),
            attempt_timeout: browser
                .connect_attempt_timeout_ms
                .map_or(DEFAULT_CONNECT_ATTEMPT_TIMEOUT, Duration::from_millis),
        };

        Self {
            qtube_home,
            gemini,
            coordinator,
            overlay,
            player,
            browser,
        }
    }
}

/// Returns the qtube configuration directory: `$QTUBE_HOME` when set (it must
/// exist), otherwise `~/.qtube`, which is not required to exist.
pub fn find_qtube_home() -> std::io::Result<PathBuf> {
    if let Ok(value) = std::env::var(QTUBE_HOME_ENV)
        && !value.trim().is_empty()
    {
        return PathBuf::from(value).canonicalize();
    }
    let mut home = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(ErrorKind::NotFound, "Could not find home directory")
    })?;
    home.push(".qtube");
    Ok(home)
}

/// Reads and parses `path`. A missing file yields the defaults.
pub fn load_config_toml(path: &Path) -> std::io::Result<ConfigToml> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!("no config at {}; using defaults", path.display());
            return Ok(ConfigToml::default());
        }
        Err(err) => return Err(err),
    };
    toml::from_str(&contents).map_err(|err| {
        tracing::error!("failed to parse {}: {err}", path.display());
        std::io::Error::new(ErrorKind::InvalidData, err)
    })
}
