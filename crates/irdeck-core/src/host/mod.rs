// ── Host platform seam ──
//
// The host owns exposed accessories: it registers them, persists them
// across restarts and pushes characteristic values to its own clients.
// The core only drives it through this trait.

mod file;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{Accessory, AccessoryId};

pub use file::{FileHost, read_cache};

/// Accessory lifecycle primitives the binder depends on.
///
/// Registration is a one-time operation per accessory; accessories
/// handed back from the host's cache at startup are never registered
/// again.
#[async_trait]
pub trait AccessoryHost: Send + Sync {
    async fn register(&self, accessories: &[Accessory]) -> Result<(), CoreError>;

    /// Persist a refreshed context or display name.
    async fn update(&self, accessories: &[Accessory]) -> Result<(), CoreError>;

    async fn unregister(&self, accessories: &[Accessory]) -> Result<(), CoreError>;

    /// Push a new value of the accessory's on/off characteristic to
    /// observers without going through `set`.
    fn notify_on(&self, accessory: AccessoryId, on: bool);
}
