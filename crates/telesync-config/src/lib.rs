//! Shared configuration for telesync tools.
//!
//! TOML profiles merged with `TELESYNC_`-prefixed environment variables,
//! and translation of a profile into the endpoints and `SyncConfig` the
//! sync store runs with.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use telesync_core::SyncConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Rows per channel for pulls.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            limit: default_limit(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_limit() -> u32 {
    SyncConfig::DEFAULT_LIMIT
}

/// A named telemetry server profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "http://localhost:5000").
    pub server: String,

    /// Push channel URL. Derived from `server` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,

    /// Override request timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override rows per channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_threshold_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_base_delay_ms: Option<u64>,
}

impl Profile {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "telesync", "telesync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("telesync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// A missing file yields the defaults. Nested keys use a double
/// underscore: `TELESYNC_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TELESYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML and write it to `path`, creating parents.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

/// Everything needed to build the collaborators and the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub name: String,
    pub server: Url,
    pub push_url: Url,
    pub timeout: Duration,
    pub insecure: bool,
    pub sync: SyncConfig,
}

impl Config {
    /// Look up `name`, falling back to the configured default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");

        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

/// Translate a profile plus global defaults into concrete settings.
///
/// This is the single boundary where config types cross into core types.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ResolvedProfile, ConfigError> {
    let server = parse_url("server", &profile.server)?;
    let push_url = match profile.push_url.as_deref() {
        Some(raw) => parse_url("push_url", raw)?,
        None => derive_push_url(&server)?,
    };

    let base = SyncConfig::default();
    let sync = SyncConfig {
        default_limit: profile.limit.unwrap_or(defaults.limit),
        stale_threshold: profile
            .stale_threshold_secs
            .map_or(base.stale_threshold, Duration::from_secs),
        max_retries: profile.max_retries.unwrap_or(base.max_retries),
        retry_base_delay: profile
            .retry_base_delay_ms
            .map_or(base.retry_base_delay, Duration::from_millis),
    };

    if sync.default_limit == 0 {
        return Err(ConfigError::Validation {
            field: "limit".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(ResolvedProfile {
        name: profile_name.into(),
        server,
        push_url,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        insecure: profile.insecure.unwrap_or(defaults.insecure),
        sync,
    })
}

/// Push channel endpoint for a server: same host, `ws`/`wss` scheme, `/ws` path.
pub fn derive_push_url(server: &Url) -> Result<Url, ConfigError> {
    let scheme = match server.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConfigError::Validation {
                field: "server".into(),
                reason: format!("unsupported scheme '{other}'"),
            });
        }
    };

    let mut url = server.clone();
    url.set_scheme(scheme).map_err(|()| ConfigError::Validation {
        field: "server".into(),
        reason: format!("cannot derive push URL from {server}"),
    })?;
    let path = format!("{}/ws", server.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn push_url_follows_server_scheme_and_path() {
        let http: Url = "http://localhost:5000".parse().unwrap();
        assert_eq!(derive_push_url(&http).unwrap().as_str(), "ws://localhost:5000/ws");

        let https: Url = "https://telemetry.example.com/api/?x=1".parse().unwrap();
        assert_eq!(
            derive_push_url(&https).unwrap().as_str(),
            "wss://telemetry.example.com/api/ws"
        );

        let ftp: Url = "ftp://example.com".parse().unwrap();
        assert!(matches!(
            derive_push_url(&ftp),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn resolve_applies_defaults() {
        let resolved =
            resolve_profile(&Profile::new("http://car.local:5000"), "car", &Defaults::default())
                .unwrap();

        assert_eq!(resolved.name, "car");
        assert_eq!(resolved.push_url.as_str(), "ws://car.local:5000/ws");
        assert_eq!(resolved.timeout, Duration::from_secs(30));
        assert!(!resolved.insecure);
        assert_eq!(resolved.sync, SyncConfig::default());
    }

    #[test]
    fn resolve_applies_profile_overrides() {
        let profile = Profile {
            server: "https://pit.example.com".into(),
            push_url: Some("wss://push.example.com/live".into()),
            timeout: Some(5),
            insecure: Some(true),
            limit: Some(50),
            stale_threshold_secs: Some(10),
            max_retries: Some(1),
            retry_base_delay_ms: Some(500),
        };

        let resolved = resolve_profile(&profile, "pit", &Defaults::default()).unwrap();

        assert_eq!(resolved.push_url.as_str(), "wss://push.example.com/live");
        assert_eq!(resolved.timeout, Duration::from_secs(5));
        assert!(resolved.insecure);
        assert_eq!(
            resolved.sync,
            SyncConfig {
                default_limit: 50,
                stale_threshold: Duration::from_secs(10),
                max_retries: 1,
                retry_base_delay: Duration::from_millis(500),
            }
        );
    }

    #[test]
    fn resolve_rejects_bad_values() {
        let bad_url = resolve_profile(&Profile::new("not a url"), "x", &Defaults::default());
        assert!(matches!(bad_url, Err(ConfigError::Validation { field, .. }) if field == "server"));

        let zero = Profile {
            limit: Some(0),
            ..Profile::new("http://localhost:5000")
        };
        let zero = resolve_profile(&zero, "x", &Defaults::default());
        assert!(matches!(zero, Err(ConfigError::Validation { field, .. }) if field == "limit"));
    }

    #[test]
    fn profile_lookup_uses_default_name() {
        let mut config = Config::default();
        config
            .profiles
            .insert("default".into(), Profile::new("http://localhost:5000"));

        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "default");
        assert_eq!(profile.server, "http://localhost:5000");

        assert!(matches!(
            config.profile(Some("missing")),
            Err(ConfigError::ProfileNotFound { name }) if name == "missing"
        ));
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.defaults.limit = 40;
        config.profiles.insert(
            "car".into(),
            Profile {
                max_retries: Some(5),
                ..Profile::new("http://car.local:5000")
            },
        );
        save_config_to(&config, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[profiles.car]"));
        assert!(!text.contains("push_url"));

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.defaults.limit, 40);
        assert_eq!(loaded.profiles["car"].max_retries, Some(5));
        assert_eq!(loaded.default_profile.as_deref(), Some("default"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert!(loaded.profiles.is_empty());
        assert_eq!(loaded.defaults.output, "table");
    }
}
