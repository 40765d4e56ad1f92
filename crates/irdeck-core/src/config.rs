// ── Runtime bridge configuration ──
//
// These types describe *how* to reach the backend and how often to
// reconcile. They never touch disk: the binary loads a config file,
// builds a `BridgeConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which backend generation resolves and transmits button presses.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    /// Resolve the signal on aim, transmit through pirem.
    #[default]
    Relay,
    /// aim pushes the button itself; no pirem endpoint needed.
    Direct,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed hubs).
    DangerAcceptInvalid,
}

/// When the registry refreshes a known remote's button map.
///
/// An embedded button list on the fetched record is always applied.
/// This only governs whether a separate `GetButtons` call is made for
/// remotes that are already registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonRefresh {
    /// Fetch buttons once, when the remote is first seen.
    #[default]
    OnCreate,
    /// Re-fetch buttons for every known remote on every pass.
    Always,
}

/// Configuration for one bridge instance.
///
/// Built by the binary and passed to [`Bridge::connect`](crate::Bridge::connect).
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Remote catalogue service (aim).
    pub aim_url: Url,
    /// Transmitter service (pirem). Required for [`BackendKind::Relay`].
    pub pirem_url: Option<Url>,
    pub backend: BackendKind,
    /// Optional bearer token sent to both services.
    pub api_token: Option<SecretString>,
    pub tls: TlsVerification,
    /// Per-request RPC timeout.
    pub timeout: Duration,
    /// Period of the reconciliation timer. Never zero.
    pub polling_interval: Duration,
    /// Subscribe to `NotifyUpdate` and reconcile as soon as a change lands.
    pub change_feed: bool,
    pub button_refresh: ButtonRefresh,
}

impl BridgeConfig {
    /// Relay backend with default tuning. Set `pirem_url` before connecting.
    pub fn new(aim_url: Url) -> Self {
        Self {
            aim_url,
            pirem_url: None,
            backend: BackendKind::default(),
            api_token: None,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            change_feed: false,
            button_refresh: ButtonRefresh::default(),
        }
    }
}
