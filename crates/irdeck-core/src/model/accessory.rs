// ── Exposed accessory types ──

use serde::{Deserialize, Serialize};

use super::ids::{AccessoryId, RemoteId};
use super::remote::{ControlTag, Remote};

/// What an accessory carries about the remote it is bound to.
///
/// Only the join key and the tag are stored; the remote itself is always
/// looked up in the registry, so a refreshed remote is visible to the
/// accessory without touching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryContext {
    pub remote_id: RemoteId,
    pub tag: ControlTag,
    /// Set once the accessory has been seen again after registration,
    /// i.e. it survived at least one pass or a restart.
    #[serde(default)]
    pub is_stored: bool,
}

/// A control object exposed on the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub id: AccessoryId,
    pub display_name: String,
    pub context: AccessoryContext,
}

impl Accessory {
    pub fn for_remote(remote: &Remote) -> Self {
        Self {
            id: remote.accessory_id(),
            display_name: remote.name.clone(),
            context: AccessoryContext {
                remote_id: remote.id.clone(),
                tag: remote.tag.clone(),
                is_stored: false,
            },
        }
    }

    /// This accessory re-bound to the current state of `remote`.
    pub(crate) fn rebound(&self, remote: &Remote) -> Self {
        Self {
            id: self.id,
            display_name: remote.name.clone(),
            context: AccessoryContext {
                remote_id: remote.id.clone(),
                tag: remote.tag.clone(),
                is_stored: true,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ButtonMap, DeviceId, RemoteRecord};

    fn remote() -> Remote {
        Remote::new(
            RemoteRecord {
                id: RemoteId::from("r1"),
                name: "Ceiling Fan".into(),
                device_id: DeviceId::from("pirem-1"),
                tag: ControlTag::Toggle,
                buttons: None,
            },
            ButtonMap::new(),
        )
    }

    #[test]
    fn cache_format_is_camel_case() {
        let accessory = Accessory::for_remote(&remote());
        let json = serde_json::to_value(&accessory).unwrap();
        assert_eq!(json["displayName"], "Ceiling Fan");
        assert_eq!(json["context"]["remoteId"], "r1");
        assert_eq!(json["context"]["tag"], "toggle");
        assert_eq!(json["context"]["isStored"], false);
    }

    #[test]
    fn rebound_marks_stored_and_keeps_id() {
        let accessory = Accessory::for_remote(&remote());
        let mut renamed = remote();
        renamed.name = "Fan".into();

        let next = accessory.rebound(&renamed);
        assert_eq!(next.id, accessory.id);
        assert_eq!(next.display_name, "Fan");
        assert!(next.context.is_stored);
    }
}
