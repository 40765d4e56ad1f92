// ── Bridge ──
//
// Full lifecycle of one bridge: backend clients, registry, binder,
// scheduler and the background task that drives them. The binary and
// tests only talk to this type.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::{Backend, RemoteClient, SignalDispatch, build_backend};
use crate::binder::{AccessoryBinder, BindSummary};
use crate::config::{BridgeConfig, ButtonRefresh};
use crate::controls::ControlContext;
use crate::error::CoreError;
use crate::host::AccessoryHost;
use crate::model::{Accessory, AccessoryId, Remote};
use crate::scheduler::{PassRunner, PollScheduler, SchedulerState};
use crate::store::{ReconcileSummary, RemoteRegistry};

/// Outcome of one full reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub remotes: ReconcileSummary,
    pub accessories: BindSummary,
}

/// Tuning that is not about reaching the backend.
#[derive(Debug, Clone, Copy)]
pub struct BridgeOptions {
    pub polling_interval: std::time::Duration,
    pub button_refresh: ButtonRefresh,
}

impl From<&BridgeConfig> for BridgeOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            polling_interval: config.polling_interval,
            button_refresh: config.button_refresh,
        }
    }
}

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. Create with
/// [`new`](Self::new) or [`connect`](Self::connect), optionally
/// [`restore`](Self::restore) cached accessories, then
/// [`start`](Self::start) the scheduler.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    client: Arc<dyn RemoteClient>,
    dispatch: Arc<dyn SignalDispatch>,
    host: Arc<dyn AccessoryHost>,
    registry: Arc<RemoteRegistry>,
    binder: AccessoryBinder,
    scheduler: PollScheduler,
    button_refresh: ButtonRefresh,
    /// Serializes passes from the timer, the change feed and callers.
    pass_lock: Mutex<()>,
    last_pass: watch::Sender<Option<DateTime<Utc>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Assemble a bridge around an existing backend. Does not contact it.
    pub fn new(backend: Backend, host: Arc<dyn AccessoryHost>, options: BridgeOptions) -> Self {
        let (last_pass, _) = watch::channel(None);

        Self {
            inner: Arc::new(BridgeInner {
                client: backend.client,
                dispatch: backend.dispatch,
                binder: AccessoryBinder::new(Arc::clone(&host)),
                host,
                registry: Arc::new(RemoteRegistry::new()),
                scheduler: PollScheduler::new(options.polling_interval),
                button_refresh: options.button_refresh,
                pass_lock: Mutex::new(()),
                last_pass,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Build RPC clients from `config` and assemble a bridge.
    pub fn connect(config: &BridgeConfig, host: Arc<dyn AccessoryHost>) -> Result<Self, CoreError> {
        let backend = build_backend(config)?;
        Ok(Self::new(backend, host, BridgeOptions::from(config)))
    }

    /// Track accessories recovered from the host's cache.
    pub fn restore(&self, cached: Vec<Accessory>) {
        let count = cached.len();
        self.inner.binder.restore(cached);
        if count > 0 {
            info!(count, "restored cached accessories");
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the scheduler (and the change feed, if the backend has one).
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("bridge already started");
            return;
        }

        let cancel = self.inner.cancel.clone();
        let changes = self.inner.client.subscribe_to_changes(cancel.child_token());
        if changes.is_some() {
            info!("change feed enabled");
        }

        let bridge = self.clone();
        handles.push(tokio::spawn(async move {
            bridge.inner.scheduler.run(&bridge, cancel, changes).await;
        }));
    }

    /// Stop background tasks. A pass in flight finishes first.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.binder.shutdown_controls();
        debug!("bridge stopped");
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Fetch the catalogue and reconcile only the registry.
    pub async fn sync_registry(&self) -> Result<ReconcileSummary, CoreError> {
        let _pass = self.inner.pass_lock.lock().await;
        self.reconcile_registry().await
    }

    /// One full pass: fetch, reconcile the registry, bind accessories.
    ///
    /// A failed fetch leaves both the registry and the accessories
    /// untouched.
    pub async fn reconcile(&self) -> Result<PassSummary, CoreError> {
        let _pass = self.inner.pass_lock.lock().await;

        let remotes = self.reconcile_registry().await?;
        let accessories = self
            .inner
            .binder
            .reconcile(&self.inner.registry, &self.control_context())
            .await;

        self.inner.last_pass.send_replace(Some(Utc::now()));

        let summary = PassSummary {
            remotes,
            accessories,
        };
        debug!(?summary, "reconciliation pass complete");
        Ok(summary)
    }

    async fn reconcile_registry(&self) -> Result<ReconcileSummary, CoreError> {
        let fetched = self.inner.client.list_remotes().await?;
        Ok(self
            .inner
            .registry
            .reconcile(fetched, self.inner.client.as_ref(), self.inner.button_refresh)
            .await)
    }

    // ── Characteristic access ────────────────────────────────────────

    /// Host `set` on an accessory's on/off characteristic.
    pub async fn set_on(&self, accessory: AccessoryId, value: bool) -> Result<(), CoreError> {
        let control = self
            .inner
            .binder
            .control(&accessory)
            .ok_or_else(|| CoreError::not_found("accessory", accessory))?;
        control.on_set(value).await
    }

    /// Host `get` on an accessory's on/off characteristic.
    pub fn get_on(&self, accessory: AccessoryId) -> Result<bool, CoreError> {
        self.inner
            .binder
            .control(&accessory)
            .map(|control| control.on_get())
            .ok_or_else(|| CoreError::not_found("accessory", accessory))
    }

    /// Press a button on a registered remote, matched by id or name.
    ///
    /// Unlike a press through an accessory, an unknown remote or button
    /// is reported to the caller.
    pub async fn press(&self, remote: &str, button: &str) -> Result<(), CoreError> {
        let target = self
            .inner
            .registry
            .find(remote)
            .ok_or_else(|| CoreError::not_found("remote", remote))?;
        if !target.has_button(button) {
            return Err(CoreError::not_found(
                "button",
                format!("{button} on {}", target.name),
            ));
        }
        target.send_signal(self.inner.dispatch.as_ref(), button).await
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn registry(&self) -> &Arc<RemoteRegistry> {
        &self.inner.registry
    }

    pub fn binder(&self) -> &AccessoryBinder {
        &self.inner.binder
    }

    /// Registered remotes, sorted by name.
    pub fn remotes(&self) -> Vec<Arc<Remote>> {
        self.inner.registry.remotes()
    }

    /// Tracked accessories, sorted by display name.
    pub fn accessories(&self) -> Vec<Accessory> {
        self.inner.binder.accessories()
    }

    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.inner.scheduler.state()
    }

    /// When the last successful pass finished.
    pub fn last_pass(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_pass.borrow()
    }

    fn control_context(&self) -> ControlContext {
        ControlContext {
            registry: Arc::clone(&self.inner.registry),
            dispatch: Arc::clone(&self.inner.dispatch),
            host: Arc::clone(&self.inner.host),
        }
    }
}

#[async_trait]
impl PassRunner for Bridge {
    async fn run_pass(&self) -> Result<PassSummary, CoreError> {
        self.reconcile().await
    }
}
