// ── Control state machines ──
//
// Translate host set/get requests on an accessory's on/off
// characteristic into button presses on the bound remote.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::SignalDispatch;
use crate::error::CoreError;
use crate::host::AccessoryHost;
use crate::model::{AccessoryId, ControlTag};
use crate::store::RemoteRegistry;

/// How long a button reads as pressed before it is forced back off.
pub const REVERT_DELAY: Duration = Duration::from_millis(100);

const PUSH: &str = "push";
const ON: &str = "on";
const OFF: &str = "off";

/// Behaviour attached to an accessory's boolean characteristic.
#[async_trait]
pub trait SwitchControl: Send + Sync {
    async fn on_set(&self, value: bool) -> Result<(), CoreError>;

    fn on_get(&self) -> bool;

    /// Release timers. Called when the accessory is removed.
    fn shutdown(&self) {}
}

/// Shared handles every control needs to reach its remote.
#[derive(Clone)]
pub struct ControlContext {
    pub registry: Arc<RemoteRegistry>,
    pub dispatch: Arc<dyn SignalDispatch>,
    pub host: Arc<dyn AccessoryHost>,
}

impl ControlContext {
    /// Press `button` on whatever remote currently sits under `accessory`.
    async fn press(&self, accessory: AccessoryId, button: &str) -> Result<(), CoreError> {
        let Some(remote) = self.registry.get(&accessory) else {
            debug!(%accessory, button, "remote no longer registered, ignoring");
            return Ok(());
        };
        remote.send_signal(self.dispatch.as_ref(), button).await
    }
}

/// Pick the state machine for `tag`. Unrecognized tags get none and the
/// remote stays unexposed.
pub fn attach(
    tag: &ControlTag,
    accessory: AccessoryId,
    ctx: &ControlContext,
) -> Option<Arc<dyn SwitchControl>> {
    match tag {
        ControlTag::Button => Some(Arc::new(ButtonControl::new(accessory, ctx.clone()))),
        ControlTag::Toggle => Some(Arc::new(ToggleControl::new(accessory, ctx.clone()))),
        ControlTag::Unrecognized(_) => None,
    }
}

// ── Button ───────────────────────────────────────────────────────────

/// Momentary press. Always reads `off`; the host is re-synced to `off`
/// shortly after each press.
pub struct ButtonControl {
    accessory: AccessoryId,
    ctx: ControlContext,
    on: Arc<AtomicBool>,
    revert: Mutex<Option<JoinHandle<()>>>,
}

impl ButtonControl {
    pub fn new(accessory: AccessoryId, ctx: ControlContext) -> Self {
        Self {
            accessory,
            ctx,
            on: Arc::new(AtomicBool::new(false)),
            revert: Mutex::new(None),
        }
    }

    fn cancel_revert(&self) {
        let mut slot = self.revert.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.take() {
            pending.abort();
        }
    }

    /// One-shot re-sync of `off` to the host. Any pending revert is
    /// aborted before the new one is stored.
    fn arm_revert(&self) {
        let on = Arc::clone(&self.on);
        let host = Arc::clone(&self.ctx.host);
        let accessory = self.accessory;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(REVERT_DELAY).await;
            on.store(false, Ordering::SeqCst);
            host.notify_on(accessory, false);
        });

        let mut slot = self.revert.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }
}

#[async_trait]
impl SwitchControl for ButtonControl {
    async fn on_set(&self, value: bool) -> Result<(), CoreError> {
        if !value {
            return Ok(());
        }

        self.cancel_revert();
        self.on.store(false, Ordering::SeqCst);

        let result = self.ctx.press(self.accessory, PUSH).await;
        self.arm_revert();

        if let Err(ref e) = result {
            warn!(accessory = %self.accessory, error = %e, "button press failed");
        }
        result
    }

    fn on_get(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    fn shutdown(&self) {
        self.cancel_revert();
    }
}

impl Drop for ButtonControl {
    fn drop(&mut self) {
        self.cancel_revert();
    }
}

// ── Toggle ───────────────────────────────────────────────────────────

/// Sticky on/off. `get` reports the last requested state, not the
/// device's.
pub struct ToggleControl {
    accessory: AccessoryId,
    ctx: ControlContext,
    on: AtomicBool,
}

impl ToggleControl {
    pub fn new(accessory: AccessoryId, ctx: ControlContext) -> Self {
        Self {
            accessory,
            ctx,
            on: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SwitchControl for ToggleControl {
    async fn on_set(&self, value: bool) -> Result<(), CoreError> {
        self.on.store(value, Ordering::SeqCst);

        let button = if value { ON } else { OFF };
        let result = self.ctx.press(self.accessory, button).await;

        if let Err(ref e) = result {
            warn!(accessory = %self.accessory, button, error = %e, "toggle press failed");
        }
        result
    }

    fn on_get(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}
