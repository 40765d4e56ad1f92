// ── Domain model ──
//
// Types shared by the registry, the binder and the control state
// machines. Nothing here talks to the network.

mod accessory;
mod ids;
mod remote;

pub use accessory::{Accessory, AccessoryContext};
pub use ids::{AccessoryId, ButtonId, DeviceId, RemoteId};
pub use remote::{ButtonMap, ControlTag, Remote, RemoteChange, RemoteRecord};
