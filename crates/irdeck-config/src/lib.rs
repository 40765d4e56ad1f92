//! Configuration for the irdeck bridge.
//!
//! A flat TOML file layered under `IRDECK_*` environment variables,
//! credential resolution (env + keyring + plaintext), and translation to
//! `irdeck_core::BridgeConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use irdeck_core::{BackendKind, BridgeConfig, ButtonRefresh, TlsVerification};

const KEYRING_SERVICE: &str = "irdeck";
const KEYRING_USER: &str = "api-token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{field} is not set")]
    Missing { field: String },

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

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Remote catalogue service base URL.
    pub aim_url: Option<String>,

    /// Transmitter service base URL. Required for the relay backend.
    pub pirem_url: Option<String>,

    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,

    /// Per-request RPC timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Reconcile as soon as the backend reports a change.
    #[serde(default)]
    pub change_feed: bool,

    /// Re-fetch button maps of known remotes on every pass.
    #[serde(default)]
    pub refresh_buttons: bool,

    /// Accessory cache file. Defaults to the platform data directory.
    pub cache_path: Option<PathBuf>,

    /// Bearer token (plaintext, prefer keyring or env var).
    pub api_token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub api_token_env: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aim_url: None,
            pirem_url: None,
            backend: BackendKind::default(),
            polling_interval_ms: default_polling_interval_ms(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
            change_feed: false,
            refresh_buttons: false,
            cache_path: None,
            api_token: None,
            api_token_env: None,
        }
    }
}

fn default_polling_interval_ms() -> u64 {
    10_000
}
fn default_timeout() -> u64 {
    30
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "irdeck", "irdeck")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "irdeck", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the accessory cache lives unless `cache_path` overrides it.
pub fn default_cache_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "irdeck", "accessories.json"]),
        |dirs| dirs.data_dir().join("accessories.json"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load config from `path` (or the platform default) plus environment.
///
/// A missing file is not an error; every key may come from `IRDECK_*`
/// variables instead.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("IRDECK_"));

    Ok(figment.extract()?)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credentials ─────────────────────────────────────────────────────

/// Resolve the optional bearer token: `api_token_env`, then the system
/// keyring, then plaintext in the file.
pub fn resolve_api_token(cfg: &Config) -> Option<SecretString> {
    if let Some(ref env_name) = cfg.api_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    cfg.api_token.clone().map(SecretString::from)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Validate and build a `BridgeConfig`, then resolve the token.
    pub fn to_bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        let mut config = self.to_bridge_config_with_token(None)?;
        config.api_token = resolve_api_token(self);
        Ok(config)
    }

    /// Validate and build a `BridgeConfig` with an already-resolved token.
    pub fn to_bridge_config_with_token(
        &self,
        api_token: Option<SecretString>,
    ) -> Result<BridgeConfig, ConfigError> {
        let aim_url = parse_url(
            "aim_url",
            self.aim_url.as_deref().ok_or_else(|| ConfigError::Missing {
                field: "aim_url".into(),
            })?,
        )?;
        let pirem_url = self
            .pirem_url
            .as_deref()
            .map(|raw| parse_url("pirem_url", raw))
            .transpose()?;

        if self.backend == BackendKind::Relay && pirem_url.is_none() {
            return Err(ConfigError::Missing {
                field: "pirem_url".into(),
            });
        }
        if self.polling_interval_ms == 0 {
            return Err(ConfigError::invalid("polling_interval_ms", "must be positive"));
        }
        if self.timeout == 0 {
            return Err(ConfigError::invalid("timeout", "must be positive"));
        }

        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        let button_refresh = if self.refresh_buttons {
            ButtonRefresh::Always
        } else {
            ButtonRefresh::OnCreate
        };

        Ok(BridgeConfig {
            aim_url,
            pirem_url,
            backend: self.backend,
            api_token,
            tls,
            timeout: Duration::from_secs(self.timeout),
            polling_interval: Duration::from_millis(self.polling_interval_ms),
            change_feed: self.change_feed,
            button_refresh,
        })
    }

    /// The accessory cache file in effect.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(default_cache_path)
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw
        .parse()
        .map_err(|e| ConfigError::invalid(field, format!("invalid URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            field,
            format!("expected an http(s) URL, got '{raw}'"),
        ));
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn relay() -> Config {
        Config {
            aim_url: Some("http://hub.local:8080".into()),
            pirem_url: Some("http://hub.local:8081".into()),
            ..Config::default()
        }
    }

    #[test]
    fn loads_toml_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
aim_url = "http://hub.local:8080"
backend = "direct"
polling_interval_ms = 2500
change_feed = true
"#,
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.aim_url.as_deref(), Some("http://hub.local:8080"));
        assert_eq!(cfg.backend, BackendKind::Direct);
        assert_eq!(cfg.polling_interval_ms, 2500);
        assert!(cfg.change_feed);
        assert_eq!(cfg.timeout, 30);
        assert!(!cfg.refresh_buttons);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(cfg.polling_interval_ms, 10_000);
        assert_eq!(cfg.backend, BackendKind::Relay);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "backend = \"carrier-pigeon\"\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            refresh_buttons: true,
            cache_path: Some(dir.path().join("cache.json")),
            ..relay()
        };

        save_config(&cfg, &path).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), cfg);
    }

    #[test]
    fn relay_translates_to_bridge_config() {
        let bridge = relay().to_bridge_config_with_token(None).unwrap();
        assert_eq!(bridge.aim_url.as_str(), "http://hub.local:8080/");
        assert_eq!(bridge.pirem_url.unwrap().as_str(), "http://hub.local:8081/");
        assert_eq!(bridge.polling_interval, Duration::from_secs(10));
        assert_eq!(bridge.timeout, Duration::from_secs(30));
        assert_eq!(bridge.tls, TlsVerification::SystemDefaults);
        assert_eq!(bridge.button_refresh, ButtonRefresh::OnCreate);
    }

    #[test]
    fn relay_requires_pirem_url() {
        let cfg = Config {
            pirem_url: None,
            ..relay()
        };
        let err = cfg.to_bridge_config_with_token(None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref field } if field == "pirem_url"));
    }

    #[test]
    fn direct_does_not_need_pirem_url() {
        let cfg = Config {
            backend: BackendKind::Direct,
            pirem_url: None,
            ..relay()
        };
        assert!(cfg.to_bridge_config_with_token(None).is_ok());
    }

    #[test]
    fn zero_polling_interval_is_rejected() {
        let cfg = Config {
            polling_interval_ms: 0,
            ..relay()
        };
        let err = cfg.to_bridge_config_with_token(None).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "polling_interval_ms")
        );
    }

    #[test]
    fn aim_url_is_required_and_validated() {
        let cfg = Config {
            aim_url: None,
            ..relay()
        };
        assert!(matches!(
            cfg.to_bridge_config_with_token(None),
            Err(ConfigError::Missing { .. })
        ));

        let cfg = Config {
            aim_url: Some("ftp://hub.local".into()),
            ..relay()
        };
        assert!(matches!(
            cfg.to_bridge_config_with_token(None),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn tls_options_map_to_verification() {
        let cfg = Config {
            ca_cert: Some(PathBuf::from("/etc/irdeck/ca.pem")),
            ..relay()
        };
        assert_eq!(
            cfg.to_bridge_config_with_token(None).unwrap().tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/irdeck/ca.pem"))
        );

        let cfg = Config {
            insecure: true,
            ..cfg
        };
        assert_eq!(
            cfg.to_bridge_config_with_token(None).unwrap().tls,
            TlsVerification::DangerAcceptInvalid
        );
    }

    #[test]
    fn refresh_buttons_selects_always() {
        let cfg = Config {
            refresh_buttons: true,
            ..relay()
        };
        assert_eq!(
            cfg.to_bridge_config_with_token(None).unwrap().button_refresh,
            ButtonRefresh::Always
        );
    }

    #[test]
    fn cache_path_override_wins() {
        let cfg = Config {
            cache_path: Some(PathBuf::from("/tmp/acc.json")),
            ..Config::default()
        };
        assert_eq!(cfg.cache_path(), PathBuf::from("/tmp/acc.json"));
        assert!(Config::default().cache_path().ends_with("accessories.json"));
    }
}
