// Wire types for the aim and pirem services.
//
// Field names follow the proto3 JSON mapping (lowerCamelCase). Proto3
// omits default values on the wire, so every scalar carries a serde
// default.

use serde::{Deserialize, Serialize};

// ── Remotes & buttons ────────────────────────────────────────────────

/// A remote as returned by `AimService/GetRemotes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub tag: String,
    /// Embedded button list. Only newer backends populate this; older
    /// ones require a separate `GetButtons` call per remote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<ButtonResponse>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Opaque signal payload resolved for a button.
///
/// The bridge never inspects it; it is handed back verbatim to
/// `PiRemService/SendIr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IrData(pub serde_json::Value);

// ── Request / response envelopes ─────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Empty {}

#[derive(Debug, Deserialize)]
pub(crate) struct GetRemotesResponse {
    #[serde(default)]
    pub remotes: Vec<RemoteResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetButtonsRequest<'a> {
    pub remote_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetButtonsResponse {
    #[serde(default)]
    pub buttons: Vec<ButtonResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetIrDataRequest<'a> {
    pub remote_id: &'a str,
    pub button_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PushButtonRequest<'a> {
    pub button_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendIrRequest<'a> {
    pub device_id: &'a str,
    pub ir_data: &'a IrData,
}

/// Error body returned with non-2xx statuses and in end-of-stream trailers.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ── Change notifications ─────────────────────────────────────────────

/// One message of the `AimService/NotifyUpdate` stream.
///
/// Modelled after a proto `oneof`, but every member is checked so a
/// message carrying more than one is still fully applied.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct NotifyUpdateResponse {
    #[serde(default)]
    pub add: Option<RemoteNotice>,
    #[serde(default)]
    pub delete: Option<DeleteNotice>,
    #[serde(default)]
    pub update: Option<RemoteNotice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteNotice {
    #[serde(default)]
    pub remote: Option<RemoteResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteNotice {
    #[serde(default)]
    pub remote_id: String,
}

/// A change to the remote catalogue pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteChange {
    Added(RemoteResponse),
    Removed { remote_id: String },
    Updated(RemoteResponse),
}

impl RemoteChange {
    /// The backend id of the remote this change refers to.
    pub fn remote_id(&self) -> &str {
        match self {
            Self::Added(r) | Self::Updated(r) => &r.id,
            Self::Removed { remote_id } => remote_id,
        }
    }
}

impl NotifyUpdateResponse {
    /// Flatten into the changes it carries, skipping empty members.
    pub(crate) fn into_changes(self) -> Vec<RemoteChange> {
        let mut changes = Vec::new();
        if let Some(remote) = self.add.and_then(|n| n.remote) {
            changes.push(RemoteChange::Added(remote));
        }
        if let Some(notice) = self.delete.filter(|d| !d.remote_id.is_empty()) {
            changes.push(RemoteChange::Removed {
                remote_id: notice.remote_id,
            });
        }
        if let Some(remote) = self.update.and_then(|n| n.remote) {
            changes.push(RemoteChange::Updated(remote));
        }
        changes
    }
}
