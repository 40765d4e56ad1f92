// ── API-to-domain type conversions ──
//
// Bridges raw `irdeck_api` wire types into canonical `irdeck_core::model`
// types. Empty strings from proto3 defaults pass through unchanged.

use irdeck_api::{ButtonResponse, RemoteResponse};

use crate::model::{ButtonId, ButtonMap, ControlTag, DeviceId, RemoteChange, RemoteId, RemoteRecord};

/// Build a name -> id map. A duplicated name keeps its last id.
pub(crate) fn button_map(buttons: Vec<ButtonResponse>) -> ButtonMap {
    buttons
        .into_iter()
        .map(|b| (b.name, ButtonId::from(b.id)))
        .collect()
}

impl From<RemoteResponse> for RemoteRecord {
    fn from(r: RemoteResponse) -> Self {
        RemoteRecord {
            id: RemoteId::from(r.id),
            name: r.name,
            device_id: DeviceId::from(r.device_id),
            tag: ControlTag::from(r.tag),
            buttons: r.buttons.map(button_map),
        }
    }
}

impl From<irdeck_api::RemoteChange> for RemoteChange {
    fn from(change: irdeck_api::RemoteChange) -> Self {
        match change {
            irdeck_api::RemoteChange::Added(r) => RemoteChange::Added(r.into()),
            irdeck_api::RemoteChange::Removed { remote_id } => {
                RemoteChange::Removed(RemoteId::from(remote_id))
            }
            irdeck_api::RemoteChange::Updated(r) => RemoteChange::Updated(r.into()),
        }
    }
}
