// ── Backend seams ──
//
// `RemoteClient` is everything the registry needs from the catalogue;
// `SignalDispatch` is the one capability a `Remote` needs to fire a
// button. Both backend generations implement the same pair, so nothing
// above this module knows which one is in use.

use std::sync::Arc;

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use irdeck_api::{AimClient, ChangeFeed, FeedBackoff, PiremClient, TlsMode, TransportConfig};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{BackendKind, BridgeConfig, TlsVerification};
use crate::convert::button_map;
use crate::error::CoreError;
use crate::model::{ButtonId, ButtonMap, DeviceId, RemoteChange, RemoteId, RemoteRecord};

/// Lazily-produced catalogue changes. Infinite unless the backend goes away.
pub type ChangeStream = BoxStream<'static, RemoteChange>;

/// Read side of the remote catalogue.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// The whole catalogue, all-or-nothing.
    async fn list_remotes(&self) -> Result<Vec<RemoteRecord>, CoreError>;

    async fn list_buttons(&self, remote_id: &RemoteId) -> Result<ButtonMap, CoreError>;

    /// Change notifications, if the backend offers them. Polling stays
    /// correct without this; it only shortens the time to react.
    fn subscribe_to_changes(&self, _cancel: CancellationToken) -> Option<ChangeStream> {
        None
    }
}

/// Resolve a button to its signal and transmit it.
#[async_trait]
pub trait SignalDispatch: Send + Sync {
    async fn resolve_and_send(
        &self,
        remote_id: &RemoteId,
        device_id: &DeviceId,
        button_id: &ButtonId,
    ) -> Result<(), CoreError>;
}

// ── aim catalogue ────────────────────────────────────────────────────

/// [`RemoteClient`] over `aim.api.v1.AimService`.
#[derive(Clone)]
pub struct AimRemoteClient {
    aim: AimClient,
    change_feed: bool,
    backoff: FeedBackoff,
}

impl AimRemoteClient {
    pub fn new(aim: AimClient, change_feed: bool) -> Self {
        Self {
            aim,
            change_feed,
            backoff: FeedBackoff::default(),
        }
    }
}

#[async_trait]
impl RemoteClient for AimRemoteClient {
    async fn list_remotes(&self) -> Result<Vec<RemoteRecord>, CoreError> {
        let remotes = self.aim.get_remotes().await?;
        debug!(count = remotes.len(), "fetched remotes");
        Ok(remotes.into_iter().map(RemoteRecord::from).collect())
    }

    async fn list_buttons(&self, remote_id: &RemoteId) -> Result<ButtonMap, CoreError> {
        let buttons = self.aim.get_buttons(remote_id.as_str()).await?;
        debug!(%remote_id, count = buttons.len(), "fetched buttons");
        Ok(button_map(buttons))
    }

    fn subscribe_to_changes(&self, cancel: CancellationToken) -> Option<ChangeStream> {
        if !self.change_feed {
            return None;
        }

        let feed = ChangeFeed::spawn(self.aim.clone(), self.backoff, cancel);
        let changes = BroadcastStream::new(feed.subscribe()).filter_map(|item| {
            futures_util::future::ready(match item {
                Ok(change) => Some(RemoteChange::from(change.as_ref().clone())),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "change feed lagged, next poll will catch up");
                    None
                }
            })
        });
        Some(changes.boxed())
    }
}

// ── Dispatch variants ────────────────────────────────────────────────

/// Resolve on aim (`GetIrData`), transmit on pirem (`SendIr`).
#[derive(Clone)]
pub struct RelayDispatch {
    aim: AimClient,
    pirem: PiremClient,
}

impl RelayDispatch {
    pub fn new(aim: AimClient, pirem: PiremClient) -> Self {
        Self { aim, pirem }
    }
}

#[async_trait]
impl SignalDispatch for RelayDispatch {
    async fn resolve_and_send(
        &self,
        remote_id: &RemoteId,
        device_id: &DeviceId,
        button_id: &ButtonId,
    ) -> Result<(), CoreError> {
        let signal = self
            .aim
            .get_ir_data(remote_id.as_str(), button_id.as_str())
            .await?;
        self.pirem.send_ir(device_id.as_str(), &signal).await?;
        Ok(())
    }
}

/// `PushButton` on aim: one round trip, the backend transmits itself.
#[derive(Clone)]
pub struct DirectDispatch {
    aim: AimClient,
}

impl DirectDispatch {
    pub fn new(aim: AimClient) -> Self {
        Self { aim }
    }
}

#[async_trait]
impl SignalDispatch for DirectDispatch {
    async fn resolve_and_send(
        &self,
        _remote_id: &RemoteId,
        _device_id: &DeviceId,
        button_id: &ButtonId,
    ) -> Result<(), CoreError> {
        self.aim.push_button(button_id.as_str()).await?;
        Ok(())
    }
}

// ── Construction ─────────────────────────────────────────────────────

/// The catalogue client and dispatch for one configured backend.
#[derive(Clone)]
pub struct Backend {
    pub client: Arc<dyn RemoteClient>,
    pub dispatch: Arc<dyn SignalDispatch>,
}

/// Build RPC clients for the configured backend shape.
pub fn build_backend(config: &BridgeConfig) -> Result<Backend, CoreError> {
    let transport = build_transport(config);
    let aim = AimClient::new(config.aim_url.clone(), &transport)?;

    let dispatch: Arc<dyn SignalDispatch> = match config.backend {
        BackendKind::Relay => {
            let url = config.pirem_url.clone().ok_or_else(|| CoreError::Config {
                message: "the relay backend needs a pirem URL".into(),
            })?;
            let pirem = PiremClient::new(url, &transport)?;
            Arc::new(RelayDispatch::new(aim.clone(), pirem))
        }
        BackendKind::Direct => Arc::new(DirectDispatch::new(aim.clone())),
    };

    debug!(backend = %config.backend, aim = %config.aim_url, "backend ready");

    Ok(Backend {
        client: Arc::new(AimRemoteClient::new(aim, config.change_feed)),
        dispatch,
    })
}

fn build_transport(config: &BridgeConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        bearer_token: config.api_token.clone(),
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
