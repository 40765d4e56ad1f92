// irdeck-core: Reconciliation engine between irdeck-api and a host platform.

pub mod backend;
pub mod binder;
pub mod bridge;
pub mod config;
pub mod controls;
pub mod convert;
pub mod error;
pub mod host;
pub mod model;
pub mod scheduler;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{
    AimRemoteClient, Backend, ChangeStream, DirectDispatch, RelayDispatch, RemoteClient,
    SignalDispatch, build_backend,
};
pub use binder::{AccessoryBinder, BindSummary, TrackedAccessory};
pub use bridge::{Bridge, BridgeOptions, PassSummary};
pub use config::{BackendKind, BridgeConfig, ButtonRefresh, TlsVerification};
pub use controls::{ButtonControl, ControlContext, REVERT_DELAY, SwitchControl, ToggleControl};
pub use error::CoreError;
pub use host::{AccessoryHost, FileHost};
pub use scheduler::{PassRunner, PollScheduler, SchedulerState};
pub use store::{ReconcileSummary, RemoteRegistry};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Accessory, AccessoryContext, AccessoryId, ButtonId, ButtonMap, ControlTag, DeviceId, Remote,
    RemoteChange, RemoteId, RemoteRecord,
};
