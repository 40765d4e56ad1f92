// Shared fakes for irdeck-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use irdeck_core::{
    Accessory, AccessoryHost, AccessoryId, Backend, Bridge, BridgeOptions, ButtonId, ButtonMap,
    ButtonRefresh, ControlTag, CoreError, DeviceId, RemoteClient, RemoteId, RemoteRecord,
    SignalDispatch,
};

// ── Records ─────────────────────────────────────────────────────────

pub fn buttons(pairs: &[(&str, &str)]) -> ButtonMap {
    pairs
        .iter()
        .map(|(name, id)| ((*name).to_owned(), ButtonId::from(*id)))
        .collect()
}

/// A record without embedded buttons.
pub fn record(id: &str, name: &str, tag: &str) -> RemoteRecord {
    RemoteRecord {
        id: RemoteId::from(id),
        name: name.into(),
        device_id: DeviceId::from("pirem-1"),
        tag: ControlTag::from(tag),
        buttons: None,
    }
}

pub fn record_with_buttons(id: &str, name: &str, tag: &str, pairs: &[(&str, &str)]) -> RemoteRecord {
    RemoteRecord {
        buttons: Some(buttons(pairs)),
        ..record(id, name, tag)
    }
}

pub fn accessory_id(remote: &str) -> AccessoryId {
    AccessoryId::for_remote(&RemoteId::from(remote))
}

// ── Catalogue ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeCatalogue {
    remotes: Mutex<Vec<RemoteRecord>>,
    buttons: Mutex<HashMap<RemoteId, ButtonMap>>,
    failing_buttons: Mutex<HashSet<RemoteId>>,
    fail_listing: AtomicBool,
    pub list_calls: AtomicUsize,
    pub button_calls: AtomicUsize,
}

impl FakeCatalogue {
    pub fn set_remotes(&self, remotes: Vec<RemoteRecord>) {
        *self.remotes.lock().unwrap() = remotes;
    }

    pub fn set_buttons(&self, remote: &str, pairs: &[(&str, &str)]) {
        self.buttons
            .lock()
            .unwrap()
            .insert(RemoteId::from(remote), buttons(pairs));
    }

    pub fn fail_buttons_for(&self, remote: &str, fail: bool) {
        let mut failing = self.failing_buttons.lock().unwrap();
        if fail {
            failing.insert(RemoteId::from(remote));
        } else {
            failing.remove(&RemoteId::from(remote));
        }
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn button_calls(&self) -> usize {
        self.button_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteClient for FakeCatalogue {
    async fn list_remotes(&self) -> Result<Vec<RemoteRecord>, CoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(CoreError::Transport {
                message: "connection refused".into(),
            });
        }
        Ok(self.remotes.lock().unwrap().clone())
    }

    async fn list_buttons(&self, remote_id: &RemoteId) -> Result<ButtonMap, CoreError> {
        self.button_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_buttons.lock().unwrap().contains(remote_id) {
            return Err(CoreError::Transport {
                message: format!("GetButtons {remote_id} failed"),
            });
        }
        Ok(self
            .buttons
            .lock()
            .unwrap()
            .get(remote_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ── Dispatch ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Succeed,
    Transport,
    NotFound,
}

pub struct RecordingDispatch {
    mode: Mutex<DispatchMode>,
    latency: Mutex<Duration>,
    sent: Mutex<Vec<(RemoteId, DeviceId, ButtonId)>>,
}

impl Default for RecordingDispatch {
    fn default() -> Self {
        Self {
            mode: Mutex::new(DispatchMode::Succeed),
            latency: Mutex::new(Duration::ZERO),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingDispatch {
    pub fn set_mode(&self, mode: DispatchMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Delay every send by `latency`, after it is recorded.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Button ids of every attempted send, in order.
    pub fn sent_buttons(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, b)| b.as_str().to_owned())
            .collect()
    }
}

#[async_trait]
impl SignalDispatch for RecordingDispatch {
    async fn resolve_and_send(
        &self,
        remote_id: &RemoteId,
        device_id: &DeviceId,
        button_id: &ButtonId,
    ) -> Result<(), CoreError> {
        self.sent
            .lock()
            .unwrap()
            .push((remote_id.clone(), device_id.clone(), button_id.clone()));
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match *self.mode.lock().unwrap() {
            DispatchMode::Succeed => Ok(()),
            DispatchMode::Transport => Err(CoreError::Transport {
                message: "SendIr timed out".into(),
            }),
            DispatchMode::NotFound => Err(CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: format!("no signal for {button_id}"),
            }),
        }
    }
}

// ── Host ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingHost {
    pub registered: Mutex<Vec<AccessoryId>>,
    pub updated: Mutex<Vec<Accessory>>,
    pub unregistered: Mutex<Vec<AccessoryId>>,
    pub notified: Mutex<Vec<(AccessoryId, bool)>>,
    reject_register: Mutex<HashSet<AccessoryId>>,
    fail_unregister: AtomicBool,
}

impl RecordingHost {
    pub fn reject_register(&self, id: AccessoryId, reject: bool) {
        let mut rejected = self.reject_register.lock().unwrap();
        if reject {
            rejected.insert(id);
        } else {
            rejected.remove(&id);
        }
    }

    pub fn fail_unregister(&self, fail: bool) {
        self.fail_unregister.store(fail, Ordering::SeqCst);
    }

    pub fn registered(&self) -> Vec<AccessoryId> {
        self.registered.lock().unwrap().clone()
    }

    pub fn unregistered(&self) -> Vec<AccessoryId> {
        self.unregistered.lock().unwrap().clone()
    }

    pub fn notified(&self) -> Vec<(AccessoryId, bool)> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessoryHost for RecordingHost {
    async fn register(&self, accessories: &[Accessory]) -> Result<(), CoreError> {
        let rejected = self.reject_register.lock().unwrap().clone();
        if let Some(bad) = accessories.iter().find(|a| rejected.contains(&a.id)) {
            return Err(CoreError::Host {
                message: format!("platform rejected {}", bad.id),
            });
        }
        self.registered
            .lock()
            .unwrap()
            .extend(accessories.iter().map(|a| a.id));
        Ok(())
    }

    async fn update(&self, accessories: &[Accessory]) -> Result<(), CoreError> {
        self.updated.lock().unwrap().extend_from_slice(accessories);
        Ok(())
    }

    async fn unregister(&self, accessories: &[Accessory]) -> Result<(), CoreError> {
        if self.fail_unregister.load(Ordering::SeqCst) {
            return Err(CoreError::Host {
                message: "platform busy".into(),
            });
        }
        self.unregistered
            .lock()
            .unwrap()
            .extend(accessories.iter().map(|a| a.id));
        Ok(())
    }

    fn notify_on(&self, accessory: AccessoryId, on: bool) {
        self.notified.lock().unwrap().push((accessory, on));
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub catalogue: Arc<FakeCatalogue>,
    pub dispatch: Arc<RecordingDispatch>,
    pub host: Arc<RecordingHost>,
    pub bridge: Bridge,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_refresh(ButtonRefresh::OnCreate)
    }

    pub fn with_refresh(button_refresh: ButtonRefresh) -> Self {
        let catalogue = Arc::new(FakeCatalogue::default());
        let dispatch = Arc::new(RecordingDispatch::default());
        let host = Arc::new(RecordingHost::default());
        let bridge = Bridge::new(
            Backend {
                client: catalogue.clone(),
                dispatch: dispatch.clone(),
            },
            host.clone(),
            BridgeOptions {
                polling_interval: Duration::from_secs(10),
                button_refresh,
            },
        );
        Self {
            catalogue,
            dispatch,
            host,
            bridge,
        }
    }
}
